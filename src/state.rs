use std::sync::Arc;

use crate::api::SharedApi;
use crate::config::SyncConfig;
use crate::monitor::ConnectionMonitor;
use crate::store::{BulkReload, Stores};

/// Everything the presentation layer needs, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub api: SharedApi,
    pub stores: Stores,
    pub monitor: ConnectionMonitor,
    pub config: SyncConfig,
}

impl AppState {
    pub fn new(api: SharedApi, config: SyncConfig) -> Self {
        let stores = Stores::new(api.clone());
        let reloader: Arc<dyn BulkReload> = Arc::new(stores.clone());
        let monitor = ConnectionMonitor::new(api.clone(), reloader, config);
        Self {
            api,
            stores,
            monitor,
            config,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn monitor(&self) -> ConnectionMonitor {
        self.monitor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::model::EntityKind;
    use serde_json::json;

    #[tokio::test]
    async fn monitor_reloads_the_shared_stores() -> anyhow::Result<()> {
        let api = Arc::new(MemoryApi::new());
        api.insert_raw(EntityKind::Company, json!({"id": "company:CHE", "name": "Conrad"}));
        let state = AppState::new(api.clone(), SyncConfig::default());

        let connected = state.monitor().check_now().await;
        assert!(connected.is_connected);
        assert_eq!(state.stores().companies.len(), 1);
        assert_eq!(api.list_calls(EntityKind::Fee), 1);
        Ok(())
    }
}
