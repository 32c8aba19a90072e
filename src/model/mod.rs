use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::RecordId;

mod company;
mod contact;
mod fee;
mod project;

pub use company::{Company, CompanyCreate, CompanyUpdate};
pub use contact::{Contact, ContactCreate, ContactUpdate};
pub use fee::{Fee, FeeCreate, FeeUpdate, Revision};
pub use project::{
    NewProject, Project, ProjectNumber, ProjectNumberError, ProjectUpdate, MAX_COUNTRY_CODE,
    MAX_PROJECT_SEQ,
};

/// The four collections the app synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Company,
    Contact,
    Fee,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Project,
        EntityKind::Company,
        EntityKind::Contact,
        EntityKind::Fee,
    ];

    /// Backend table name. Not uniformly pluralised; these are the live names.
    pub const fn table(self) -> &'static str {
        match self {
            EntityKind::Project => "projects",
            EntityKind::Company => "company",
            EntityKind::Contact => "contacts",
            EntityKind::Fee => "fee",
        }
    }

    /// Prefix carried by fully-qualified ids of this kind, e.g. `contacts:`.
    pub fn prefix(self) -> String {
        format!("{}:", self.table())
    }

    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Company => "company",
            EntityKind::Contact => "contact",
            EntityKind::Fee => "fee proposal",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projects" | "project" => Ok(EntityKind::Project),
            "company" | "companies" => Ok(EntityKind::Company),
            "contacts" | "contact" => Ok(EntityKind::Contact),
            "fee" | "fees" | "rfp" | "rfps" => Ok(EntityKind::Fee),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStamps {
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A record type held by an entity store.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: EntityKind;
    /// Payload for `create`.
    type Draft: Serialize + Send + Sync;
    /// Partial payload for `update`; `None` fields are left untouched.
    type Patch: Serialize + Send + Sync;

    fn id(&self) -> &RecordId;
}

/// Backend-side payload checks. Stores never call this; the backend does.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<String>>;
}

fn decode_and_validate<T: Validate + DeserializeOwned>(
    data: &Map<String, Value>,
) -> Result<(), Vec<String>> {
    let draft: T = serde_json::from_value(Value::Object(data.clone()))
        .map_err(|err| vec![format!("Malformed payload: {err}")])?;
    draft.validate()
}

/// Validates a create payload of the given kind.
pub fn validate_draft(kind: EntityKind, data: &Map<String, Value>) -> Result<(), Vec<String>> {
    match kind {
        EntityKind::Project => decode_and_validate::<NewProject>(data),
        EntityKind::Company => decode_and_validate::<CompanyCreate>(data),
        EntityKind::Contact => decode_and_validate::<ContactCreate>(data),
        EntityKind::Fee => decode_and_validate::<FeeCreate>(data),
    }
}

/// Validates an update payload of the given kind.
pub fn validate_patch(kind: EntityKind, data: &Map<String, Value>) -> Result<(), Vec<String>> {
    match kind {
        EntityKind::Project => decode_and_validate::<ProjectUpdate>(data),
        EntityKind::Company => decode_and_validate::<CompanyUpdate>(data),
        EntityKind::Contact => decode_and_validate::<ContactUpdate>(data),
        EntityKind::Fee => decode_and_validate::<FeeUpdate>(data),
    }
}
