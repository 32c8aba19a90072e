use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Timestamp format the backend stores in `time.created_at` / `time.updated_at`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a fee issue date.
///
/// Fees carry either the compact `YYMMDD` form (always 20YY) or an ISO date, and
/// occasionally a full RFC 3339 timestamp. Returns `None` for anything else.
pub fn parse_issue_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let expanded = format!("20{}-{}-{}", &raw[0..2], &raw[2..4], &raw[4..6]);
        return NaiveDate::parse_from_str(&expanded, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_rfc3339_parses_back() {
        assert!(DateTime::parse_from_rfc3339(&now_rfc3339()).is_ok());
    }

    #[test]
    fn compact_form_expands_to_twenty_first_century() {
        let parsed = parse_issue_date("250720").expect("compact date");
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 7, 20).unwrap());
    }

    #[test]
    fn iso_and_rfc3339_forms() {
        let iso = parse_issue_date("2025-06-01").expect("iso date");
        assert_eq!(iso.date(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let full = parse_issue_date("2025-06-01T10:30:00Z").expect("rfc3339");
        assert_eq!(full.date(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_issue_date("").is_none());
        assert!(parse_issue_date("251399").is_none());
        assert!(parse_issue_date("next week").is_none());
    }
}
