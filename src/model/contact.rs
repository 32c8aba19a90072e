use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, TimeStamps, Validate};
use crate::identity::RecordId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub id: RecordId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Computed by the backend as "first last".
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub company: RecordId,
    pub time: Option<TimeStamps>,
}

impl Contact {
    pub fn display_name(&self) -> String {
        if let Some(full) = self.full_name.as_deref().filter(|s| !s.trim().is_empty()) {
            return full.to_string();
        }
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Entity for Contact {
    const KIND: EntityKind = EntityKind::Contact;
    type Draft = ContactCreate;
    type Patch = ContactUpdate;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub company: RecordId,
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if !email.contains('@') {
        errors.push("Invalid email format".to_string());
    }
}

fn check_phone(phone: &str, errors: &mut Vec<String>) {
    if phone.is_empty() || !phone.contains('+') {
        errors.push("Phone must contain '+' and not be empty".to_string());
    }
}

impl Validate for ContactCreate {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        check_phone(&self.phone, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<RecordId>,
}

impl Validate for ContactUpdate {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if let Some(email) = &self.email {
            check_email(email, &mut errors);
        }
        if let Some(phone) = &self.phone {
            check_phone(phone, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
