use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, TimeStamps, Validate};
use crate::identity::RecordId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    pub id: RecordId,
    pub name: String,
    pub name_short: String,
    /// Short code, also the record key (e.g. `CHE`).
    pub abbreviation: String,
    pub city: String,
    pub country: String,
    pub reg_no: Option<String>,
    pub tax_no: Option<String>,
    pub time: Option<TimeStamps>,
}

impl Entity for Company {
    const KIND: EntityKind = EntityKind::Company;
    type Draft = CompanyCreate;
    type Patch = CompanyUpdate;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCreate {
    pub name: String,
    pub name_short: String,
    pub abbreviation: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub reg_no: Option<String>,
    #[serde(default)]
    pub tax_no: Option<String>,
}

impl Validate for CompanyCreate {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Company name cannot be empty".to_string());
        }
        if self.abbreviation.trim().is_empty() {
            errors.push("Company abbreviation cannot be empty".to_string());
        } else if !self
            .abbreviation
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            errors.push("Company abbreviation must be alphanumeric".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_no: Option<String>,
}

impl Validate for CompanyUpdate {
    fn validate(&self) -> Result<(), Vec<String>> {
        match &self.name {
            Some(name) if name.trim().is_empty() => {
                Err(vec!["Company name cannot be empty".to_string()])
            }
            _ => Ok(()),
        }
    }
}
