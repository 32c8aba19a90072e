//! Client-side caches, one per entity kind.
//!
//! Each [`EntityStore`] owns the authoritative in-memory copy of a collection and
//! publishes every change through a `watch` channel. Mutations go to the backend
//! first; the cache is only touched once the backend has answered successfully.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::api::SharedApi;
use crate::error::{ApiError, ApiResult};
use crate::identity::{record_key, same_record, RecordId};
use crate::model::{Company, Contact, Entity, EntityKind, Fee, Project};

pub type Snapshot<E> = Arc<Vec<E>>;

pub struct EntityStore<E: Entity> {
    api: SharedApi,
    cache: watch::Sender<Snapshot<E>>,
}

fn to_payload<T: Serialize>(kind: EntityKind, payload: &T) -> ApiResult<Map<String, Value>> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::Decode {
            kind: kind.table().to_string(),
            message: "payload did not serialize to an object".to_string(),
        }),
        Err(err) => Err(ApiError::decode(kind.table(), &err)),
    }
}

fn decode_one<E: Entity>(doc: Value) -> ApiResult<E> {
    serde_json::from_value(doc).map_err(|err| ApiError::decode(E::KIND.table(), &err))
}

impl<E: Entity> EntityStore<E> {
    pub fn new(api: SharedApi) -> Self {
        let (cache, _) = watch::channel(Arc::new(Vec::new()));
        Self { api, cache }
    }

    /// Current cached collection.
    pub fn snapshot(&self) -> Snapshot<E> {
        self.cache.borrow().clone()
    }

    /// Change feed; the receiver starts with the current collection marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<E>> {
        self.cache.subscribe()
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached entity whose id matches `id`, with or without the table prefix.
    pub fn find(&self, id: &RecordId) -> Option<E> {
        let prefix = E::KIND.prefix();
        self.cache
            .borrow()
            .iter()
            .find(|item| same_record(item.id(), id, &prefix))
            .cloned()
    }

    /// Replaces the cache with the backend's full collection.
    ///
    /// Documents that fail to decode are skipped with a warning; the rest of the
    /// collection is still published. On error the cache is left untouched.
    pub async fn load(&self) -> ApiResult<Snapshot<E>> {
        let kind = E::KIND;
        let rows = self.api.list(kind).await.map_err(|err| {
            error!(target: "feepro", event = "store_load_failed", kind = %kind, error = %err);
            err
        })?;

        let total = rows.len();
        let mut items = Vec::with_capacity(total);
        for row in rows {
            match serde_json::from_value::<E>(row) {
                Ok(item) => items.push(item),
                Err(err) => warn!(
                    target: "feepro",
                    event = "store_row_skipped",
                    kind = %kind,
                    error = %err
                ),
            }
        }

        let snapshot = Arc::new(items);
        self.cache.send_replace(snapshot.clone());
        info!(
            target: "feepro",
            event = "store_loaded",
            kind = %kind,
            count = snapshot.len(),
            skipped = total - snapshot.len()
        );
        Ok(snapshot)
    }

    pub async fn create(&self, draft: &E::Draft) -> ApiResult<E> {
        let kind = E::KIND;
        let payload = to_payload(kind, draft)?;
        let doc = self.api.create(kind, payload).await.map_err(|err| {
            error!(target: "feepro", event = "store_create_failed", kind = %kind, error = %err);
            err
        })?;
        let created: E = decode_one(doc)?;
        self.cache
            .send_modify(|items| Arc::make_mut(items).push(created.clone()));
        info!(target: "feepro", event = "store_created", kind = %kind, id = %created.id());
        Ok(created)
    }

    /// Sends a partial update and swaps the returned record into the cache.
    pub async fn update(&self, id: &RecordId, patch: &E::Patch) -> ApiResult<E> {
        let kind = E::KIND;
        let key = record_key(id);
        let payload = to_payload(kind, patch)?;
        let doc = self.api.update(kind, &key, payload).await.map_err(|err| {
            error!(
                target: "feepro",
                event = "store_update_failed",
                kind = %kind,
                key = %key,
                error = %err
            );
            err
        })?;
        let updated: E = decode_one(doc)?;

        let prefix = kind.prefix();
        self.cache.send_modify(|items| {
            let items = Arc::make_mut(items);
            let position = items.iter().position(|item| {
                same_record(item.id(), updated.id(), &prefix)
                    || same_record(item.id(), id, &prefix)
            });
            match position {
                Some(index) => items[index] = updated.clone(),
                None => items.push(updated.clone()),
            }
        });
        info!(target: "feepro", event = "store_updated", kind = %kind, id = %updated.id());
        Ok(updated)
    }

    /// Deletes on the backend, then drops every cached entry matching `id`.
    pub async fn delete(&self, id: &RecordId) -> ApiResult<()> {
        let kind = E::KIND;
        let key = record_key(id);
        let deleted = self.api.delete(kind, &key).await.map_err(|err| {
            error!(
                target: "feepro",
                event = "store_delete_failed",
                kind = %kind,
                key = %key,
                error = %err
            );
            err
        })?;
        if !deleted {
            warn!(target: "feepro", event = "store_delete_missing", kind = %kind, key = %key);
            return Err(ApiError::not_found(kind.table(), key));
        }

        let prefix = kind.prefix();
        self.cache.send_modify(|items| {
            Arc::make_mut(items).retain(|item| !same_record(item.id(), id, &prefix));
        });
        info!(target: "feepro", event = "store_deleted", kind = %kind, key = %key);
        Ok(())
    }
}

/// Outcome of a bulk reload: one entry per kind, in [`EntityKind::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub results: Vec<(EntityKind, Result<usize, ApiError>)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (EntityKind, &ApiError)> + '_ {
        self.results
            .iter()
            .filter_map(|(kind, result)| result.as_ref().err().map(|err| (*kind, err)))
    }
}

/// Anything that can refresh every collection at once.
#[async_trait]
pub trait BulkReload: Send + Sync {
    async fn reload_all(&self) -> LoadReport;
}

/// The four stores of the application.
#[derive(Clone)]
pub struct Stores {
    pub projects: Arc<EntityStore<Project>>,
    pub companies: Arc<EntityStore<Company>>,
    pub contacts: Arc<EntityStore<Contact>>,
    pub fees: Arc<EntityStore<Fee>>,
}

impl Stores {
    pub fn new(api: SharedApi) -> Self {
        Self {
            projects: Arc::new(EntityStore::new(api.clone())),
            companies: Arc::new(EntityStore::new(api.clone())),
            contacts: Arc::new(EntityStore::new(api.clone())),
            fees: Arc::new(EntityStore::new(api)),
        }
    }

    /// Loads all four collections concurrently. Failures are reported, not raised.
    pub async fn load_all(&self) -> LoadReport {
        let (projects, companies, contacts, fees) = futures::join!(
            self.projects.load(),
            self.companies.load(),
            self.contacts.load(),
            self.fees.load()
        );
        let report = LoadReport {
            results: vec![
                (EntityKind::Project, projects.map(|items| items.len())),
                (EntityKind::Company, companies.map(|items| items.len())),
                (EntityKind::Contact, contacts.map(|items| items.len())),
                (EntityKind::Fee, fees.map(|items| items.len())),
            ],
        };
        info!(
            target: "feepro",
            event = "stores_loaded",
            complete = report.is_complete(),
            failed = report.failures().count()
        );
        report
    }
}

#[async_trait]
impl BulkReload for Stores {
    async fn reload_all(&self) -> LoadReport {
        self.load_all().await
    }
}
