//! Data synchronization core of FeePro.
//!
//! Entity stores cache the backend's collections, the relationship resolver derives
//! associations between them, and the connection monitor keeps both in step with
//! backend availability.

pub mod api;
pub mod config;
mod error;
pub mod identity;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod relations;
pub mod search;
pub mod state;
pub mod store;
pub mod time;
pub mod views;

pub use api::{ConnectionStatus, FeeApi, Fixture, MemoryApi, SharedApi};
pub use config::{ConfigError, SyncConfig};
pub use error::{ApiError, ApiResult, AppError, AppResult};
pub use identity::{equals_ignoring_prefix, normalize, record_key, same_record, RecordId};
pub use model::EntityKind;
pub use monitor::{ConnectionMonitor, ConnectionPhase, ConnectionState, MonitorSubscription};
pub use state::AppState;
pub use store::{BulkReload, EntityStore, LoadReport, Stores};
pub use views::DerivedView;
