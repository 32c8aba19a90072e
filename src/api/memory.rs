use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{ConnectionStatus, FeeApi};
use crate::error::{ApiError, ApiResult};
use crate::identity::{normalize_value, record_key, RecordId};
use crate::model::{validate_draft, validate_patch, EntityKind};
use crate::time::now_rfc3339;

/// Seed data for [`MemoryApi`], one array of raw backend documents per table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub projects: Vec<Value>,
    pub companies: Vec<Value>,
    pub contacts: Vec<Value>,
    pub fees: Vec<Value>,
}

impl Fixture {
    fn into_tables(self) -> HashMap<EntityKind, Vec<Value>> {
        HashMap::from([
            (EntityKind::Project, self.projects),
            (EntityKind::Company, self.companies),
            (EntityKind::Contact, self.contacts),
            (EntityKind::Fee, self.fees),
        ])
    }
}

/// In-process backend with the same id, validation and merge rules as the database
/// service. Used by the CLI and the test-suite.
#[derive(Debug, Default)]
pub struct MemoryApi {
    tables: Mutex<HashMap<EntityKind, Vec<Value>>>,
    offline: AtomicBool,
    probe_script: Mutex<VecDeque<bool>>,
    probe_calls: AtomicUsize,
    list_calls: Mutex<HashMap<EntityKind, usize>>,
}

const OFFLINE_MESSAGE: &str = "connection refused";

fn foreign_keys(kind: EntityKind) -> &'static [(&'static str, EntityKind)] {
    match kind {
        EntityKind::Contact => &[("company", EntityKind::Company)],
        EntityKind::Fee => &[
            ("project_id", EntityKind::Project),
            ("company_id", EntityKind::Company),
            ("contact_id", EntityKind::Contact),
        ],
        EntityKind::Project | EntityKind::Company => &[],
    }
}

fn thing_value(kind: EntityKind, key: &str) -> Value {
    json!({ "tb": kind.table(), "id": { "String": key } })
}

fn document_key(doc: &Value) -> String {
    record_key(&RecordId::from_value(&doc["id"]))
}

/// Rewrites reference fields into the structured form the database stores.
fn link_references(kind: EntityKind, data: &mut Map<String, Value>) {
    for (field, target) in foreign_keys(kind) {
        let Some(value) = data.get_mut(*field) else {
            continue;
        };
        if normalize_value(value).is_empty() {
            *value = Value::Null;
            continue;
        }
        let key = record_key(&RecordId::from_value(value));
        *value = thing_value(*target, &key);
    }
}

fn string_field<'a>(data: &'a Map<String, Value>, field: &str) -> &'a str {
    data.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn full_name(data: &Map<String, Value>) -> String {
    format!(
        "{} {}",
        string_field(data, "first_name"),
        string_field(data, "last_name")
    )
    .trim()
    .to_string()
}

fn assign_key(kind: EntityKind, data: &Map<String, Value>) -> ApiResult<String> {
    let key = match kind {
        EntityKind::Project => data
            .get("number")
            .and_then(|number| number.get("id"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .replace('-', "_"),
        EntityKind::Company => string_field(data, "abbreviation").to_string(),
        EntityKind::Contact => Uuid::new_v4().simple().to_string(),
        EntityKind::Fee => {
            let project = record_key(&RecordId::from_value(
                data.get("project_id").unwrap_or(&Value::Null),
            ));
            let rev = data.get("rev").and_then(Value::as_i64).unwrap_or_default();
            format!("{}_{rev}", project.replace('-', "_"))
        }
    };
    if key.is_empty() || key.starts_with('_') {
        return Err(ApiError::Validation(format!(
            "Cannot derive a record id for {}",
            kind.label()
        )));
    }
    Ok(key)
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        Self {
            tables: Mutex::new(fixture.into_tables()),
            ..Self::default()
        }
    }

    /// Stores a document exactly as given, bypassing id assignment and validation.
    pub fn insert_raw(&self, kind: EntityKind, doc: Value) {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.entry(kind).or_default().push(doc);
    }

    /// Simulates the backend going away (or coming back).
    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Queues probe answers that take precedence over the online flag, one per probe.
    pub fn script_probes(&self, answers: impl IntoIterator<Item = bool>) {
        let mut script = self.probe_script.lock().unwrap_or_else(|e| e.into_inner());
        script.extend(answers);
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self, kind: EntityKind) -> usize {
        let calls = self.list_calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.get(&kind).copied().unwrap_or_default()
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.get(&kind).map(Vec::len).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }

    fn ensure_online(&self) -> ApiResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ApiError::Connectivity(OFFLINE_MESSAGE.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FeeApi for MemoryApi {
    async fn connection_status(&self) -> ApiResult<ConnectionStatus> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = {
            let mut script = self.probe_script.lock().unwrap_or_else(|e| e.into_inner());
            script.pop_front()
        };
        let is_connected = scripted.unwrap_or_else(|| !self.offline.load(Ordering::SeqCst));
        Ok(ConnectionStatus {
            is_connected,
            last_check: Some(now_rfc3339()),
            error_message: (!is_connected).then(|| OFFLINE_MESSAGE.to_string()),
        })
    }

    async fn list(&self, kind: EntityKind) -> ApiResult<Vec<Value>> {
        {
            let mut calls = self.list_calls.lock().unwrap_or_else(|e| e.into_inner());
            *calls.entry(kind).or_default() += 1;
        }
        self.ensure_online()?;
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        Ok(tables.get(&kind).cloned().unwrap_or_default())
    }

    async fn create(&self, kind: EntityKind, mut data: Map<String, Value>) -> ApiResult<Value> {
        self.ensure_online()?;
        validate_draft(kind, &data).map_err(|errors| ApiError::Validation(errors.join("; ")))?;
        let key = assign_key(kind, &data)?;

        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let rows = tables.entry(kind).or_default();
        if rows.iter().any(|doc| document_key(doc) == key) {
            return Err(ApiError::Validation(format!(
                "Database record `{}:{key}` already exists",
                kind.table()
            )));
        }

        link_references(kind, &mut data);
        if kind == EntityKind::Contact {
            data.insert("full_name".into(), Value::String(full_name(&data)));
        }
        let now = now_rfc3339();
        data.insert("time".into(), json!({ "created_at": now, "updated_at": now }));
        data.insert("id".into(), thing_value(kind, &key));

        let doc = Value::Object(data);
        rows.push(doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        kind: EntityKind,
        key: &str,
        mut data: Map<String, Value>,
    ) -> ApiResult<Value> {
        self.ensure_online()?;
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let doc = tables
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|doc| document_key(doc) == key))
            .ok_or_else(|| ApiError::not_found(kind.table(), key))?;
        validate_patch(kind, &data).map_err(|errors| ApiError::Validation(errors.join("; ")))?;

        data.remove("id");
        data.remove("time");
        link_references(kind, &mut data);

        let Some(record) = doc.as_object_mut() else {
            return Err(ApiError::Decode {
                kind: kind.table().to_string(),
                message: format!("stored record '{key}' is not an object"),
            });
        };
        record.extend(data);
        if kind == EntityKind::Contact {
            let name = full_name(record);
            record.insert("full_name".into(), Value::String(name));
        }
        let time = record
            .entry("time")
            .or_insert_with(|| json!({ "created_at": now_rfc3339() }));
        if let Some(time) = time.as_object_mut() {
            time.insert("updated_at".into(), Value::String(now_rfc3339()));
        }
        Ok(doc.clone())
    }

    async fn delete(&self, kind: EntityKind, key: &str) -> ApiResult<bool> {
        self.ensure_online()?;
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let Some(rows) = tables.get_mut(&kind) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|doc| document_key(doc) != key);
        Ok(rows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn fee_ids_derive_from_project_and_revision() -> anyhow::Result<()> {
        let api = MemoryApi::new();
        let created = api
            .create(
                EntityKind::Fee,
                object(json!({
                    "name": "Lighting design",
                    "number": "25-97105-FP",
                    "rev": 2,
                    "status": "Draft",
                    "issue_date": "250720",
                    "project_id": "projects:25_97105",
                    "company_id": "EMT",
                    "contact_id": null
                })),
            )
            .await?;

        assert_eq!(normalize_value(&created["id"]), "fee:25_97105_2");
        assert_eq!(normalize_value(&created["company_id"]), "company:EMT");
        assert!(created["contact_id"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn contact_create_fills_full_name_and_rejects_bad_phone() -> anyhow::Result<()> {
        let api = MemoryApi::new();
        let mut draft = object(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@example.com",
            "phone": "+971 50 123 4567",
            "position": "PM",
            "company": "company:CHE"
        }));
        let created = api.create(EntityKind::Contact, draft.clone()).await?;
        assert_eq!(created["full_name"], "Jane Doe");

        draft.insert("phone".into(), json!("050"));
        let err = api.create(EntityKind::Contact, draft).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(api.len(EntityKind::Contact), 1);
        Ok(())
    }

    #[tokio::test]
    async fn offline_backend_fails_requests_but_answers_probes() -> anyhow::Result<()> {
        let api = MemoryApi::new();
        api.set_online(false);
        assert!(api.list(EntityKind::Company).await.unwrap_err().is_connectivity());
        let status = api.connection_status().await?;
        assert!(!status.is_connected);
        assert_eq!(status.error_message.as_deref(), Some(OFFLINE_MESSAGE));
        Ok(())
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() -> anyhow::Result<()> {
        let api = MemoryApi::new();
        api.insert_raw(EntityKind::Company, json!({"id": "company:CHE", "name": "CHE"}));
        assert!(!api.delete(EntityKind::Company, "EMT").await?);
        assert!(api.delete(EntityKind::Company, "CHE").await?);
        assert!(api.is_empty());
        Ok(())
    }
}
