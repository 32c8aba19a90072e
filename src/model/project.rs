use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Entity, EntityKind, TimeStamps, Validate};
use crate::identity::RecordId;

/// Highest sequence number available per year and country.
pub const MAX_PROJECT_SEQ: u32 = 99;
pub const MAX_COUNTRY_CODE: u32 = 999;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectNumberError {
    #[error("project number must look like YY-CCCNN: {0}")]
    Format(String),
    #[error("maximum of 99 projects reached for year {year} country {country}")]
    Exhausted { year: u32, country: u32 },
    #[error("country dial code must be between 1 and 999, got {0}")]
    Country(u32),
}

/// `YY-CCCNN`: two-digit year, three-digit country dial code, two-digit sequence.
/// Shorter dial codes are zero-padded (`44` becomes `044`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectNumber {
    pub year: u32,
    pub country: u32,
    pub seq: u32,
    /// Formatted number, e.g. `25-97105`.
    pub id: String,
}

impl ProjectNumber {
    pub fn new(year: u32, country: u32, seq: u32) -> Self {
        let id = format!("{year:02}-{country:03}{seq:02}");
        Self {
            year,
            country,
            seq,
            id,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ProjectNumberError> {
        let format_err = || ProjectNumberError::Format(raw.to_string());
        let (year, rest) = raw.split_once('-').ok_or_else(format_err)?;
        if year.len() != 2 || rest.len() != 5 || !rest.is_ascii() {
            return Err(format_err());
        }
        let year = year.parse::<u32>().map_err(|_| format_err())?;
        let country = rest[..3].parse::<u32>().map_err(|_| format_err())?;
        let seq = rest[3..].parse::<u32>().map_err(|_| format_err())?;
        Ok(Self::new(year, country, seq))
    }

    /// Record key the backend uses for the project, `-` replaced by `_`.
    pub fn record_key(&self) -> String {
        self.id.replace('-', "_")
    }
}

impl fmt::Display for ProjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    pub name_short: String,
    /// Draft, RFP, Active, On Hold, Completed, Cancelled.
    pub status: String,
    pub area: String,
    pub city: String,
    pub country: String,
    pub folder: String,
    pub number: ProjectNumber,
    pub time: Option<TimeStamps>,
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;
    type Draft = NewProject;
    type Patch = ProjectUpdate;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub name_short: String,
    pub status: String,
    pub area: String,
    pub city: String,
    pub country: String,
    pub folder: String,
    pub number: ProjectNumber,
}

impl Validate for NewProject {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Project name cannot be empty".to_string());
        }
        if !(20..=50).contains(&self.number.year) {
            errors.push("Year must be between 20 and 50".to_string());
        }
        if !(1..=MAX_COUNTRY_CODE).contains(&self.number.country) {
            errors.push(format!("Country code must be between 1 and {MAX_COUNTRY_CODE}"));
        }
        if !(1..=MAX_PROJECT_SEQ).contains(&self.number.seq) {
            errors.push(format!("Sequence must be between 1 and {MAX_PROJECT_SEQ}"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

impl Validate for ProjectUpdate {
    fn validate(&self) -> Result<(), Vec<String>> {
        match &self.name {
            Some(name) if name.trim().is_empty() => {
                Err(vec!["Project name cannot be empty".to_string()])
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_and_parses_numbers() {
        let number = ProjectNumber::new(25, 971, 5);
        assert_eq!(number.id, "25-97105");
        assert_eq!(number.record_key(), "25_97105");
        assert_eq!(ProjectNumber::parse("25-97105"), Ok(number));
        assert_eq!(ProjectNumber::parse("24-96601").unwrap().country, 966);
        assert_eq!(ProjectNumber::parse("25-00101"), Ok(ProjectNumber::new(25, 1, 1)));
    }

    #[test]
    fn rejects_malformed_numbers() {
        for raw in ["2597105", "25-9710", "2-597105", "25-97a05", "xx-97105"] {
            assert!(ProjectNumber::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn new_project_validation() {
        let mut draft = NewProject {
            name: "Hotel".into(),
            number: ProjectNumber::new(25, 971, 1),
            ..NewProject::default()
        };
        assert!(draft.validate().is_ok());
        draft.name.clear();
        draft.number = ProjectNumber::new(19, 971, 0);
        assert_eq!(draft.validate().unwrap_err().len(), 3);
    }
}
