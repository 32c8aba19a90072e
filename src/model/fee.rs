use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, TimeStamps, Validate};
use crate::identity::RecordId;
use crate::time::parse_issue_date;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Revision {
    pub revision_number: i32,
    pub revision_date: String,
    pub author_email: String,
    pub author_name: String,
    pub notes: String,
}

/// A fee proposal (RFP).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fee {
    pub id: RecordId,
    pub name: String,
    pub number: String,
    pub rev: i32,
    /// Draft, Prepared, Active, Sent, Under Review, Clarification, Negotiation,
    /// Awarded, Lost, Cancelled.
    pub status: String,
    /// `YYMMDD` for most records, ISO dates on newer ones.
    pub issue_date: String,
    pub activity: String,
    pub package: String,
    pub project_id: RecordId,
    pub company_id: RecordId,
    pub contact_id: RecordId,
    pub staff_name: String,
    pub staff_email: String,
    pub staff_phone: String,
    pub staff_position: String,
    pub strap_line: String,
    pub revisions: Vec<Revision>,
    pub time: Option<TimeStamps>,
}

impl Fee {
    pub fn issued_at(&self) -> Option<NaiveDateTime> {
        parse_issue_date(&self.issue_date)
    }
}

impl Entity for Fee {
    const KIND: EntityKind = EntityKind::Fee;
    type Draft = FeeCreate;
    type Patch = FeeUpdate;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeCreate {
    pub name: String,
    pub number: String,
    pub rev: i32,
    pub status: String,
    pub issue_date: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub package: String,
    pub project_id: RecordId,
    pub company_id: RecordId,
    pub contact_id: RecordId,
    #[serde(default)]
    pub staff_name: String,
    #[serde(default)]
    pub staff_email: String,
    #[serde(default)]
    pub staff_phone: String,
    #[serde(default)]
    pub staff_position: String,
    #[serde(default)]
    pub strap_line: String,
    #[serde(default)]
    pub revisions: Vec<Revision>,
}

fn check_issue_date(issue_date: &str, errors: &mut Vec<String>) {
    if issue_date.len() != 6 || !issue_date.bytes().all(|b| b.is_ascii_digit()) {
        errors.push("Issue date must be 6 digits in YYMMDD format".to_string());
    } else if parse_issue_date(issue_date).is_none() {
        errors.push("Issue date is not a valid calendar date".to_string());
    }
}

impl Validate for FeeCreate {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("RFP name cannot be empty".to_string());
        }
        check_issue_date(&self.issue_date, &mut errors);
        if self.project_id.is_missing() {
            errors.push("RFP must reference a project".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strap_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<Vec<Revision>>,
}

impl Validate for FeeUpdate {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.push("RFP name cannot be empty".to_string());
            }
        }
        if let Some(issue_date) = &self.issue_date {
            check_issue_date(issue_date, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
