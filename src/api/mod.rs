//! The backend boundary.
//!
//! Everything the sync layer knows about the database goes through [`FeeApi`].
//! Payloads are JSON documents so that the wire variability of record ids stays
//! visible to the identity normalizer instead of being hidden in a typed client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::ApiResult;
use crate::model::EntityKind;

mod memory;

pub use memory::{Fixture, MemoryApi};

/// Backend answer to a connectivity probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../ui/bindings/")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    /// RFC 3339 timestamp of the backend's own last check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub last_check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error_message: Option<String>,
}

#[async_trait]
pub trait FeeApi: Send + Sync {
    async fn connection_status(&self) -> ApiResult<ConnectionStatus>;

    /// Full collection of one kind, in backend order.
    async fn list(&self, kind: EntityKind) -> ApiResult<Vec<Value>>;

    /// Creates a record and returns the canonical stored document.
    async fn create(&self, kind: EntityKind, data: Map<String, Value>) -> ApiResult<Value>;

    /// Merges `data` into the record addressed by `key`.
    async fn update(&self, kind: EntityKind, key: &str, data: Map<String, Value>)
        -> ApiResult<Value>;

    /// `Ok(false)` when nothing was deleted.
    async fn delete(&self, kind: EntityKind, key: &str) -> ApiResult<bool>;
}

pub type SharedApi = Arc<dyn FeeApi>;
