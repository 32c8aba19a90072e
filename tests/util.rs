#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::Arc;

use feepro_lib::model::EntityKind;
use feepro_lib::{Fixture, MemoryApi};
use serde_json::{json, Value};

/// Records in the shapes the backend actually sends: bare `table:key` strings,
/// `{tb, id}` objects and `{tb, id: {String}}` objects, mixed on purpose.
pub fn sample_fixture() -> Fixture {
    Fixture {
        projects: vec![
            json!({
                "id": {"tb": "projects", "id": {"String": "25_97105"}},
                "name": "Marina Tower Lighting",
                "name_short": "Marina Tower",
                "status": "Active",
                "city": "Dubai",
                "country": "U.A.E.",
                "number": {"year": 25, "country": 971, "seq": 5, "id": "25-97105"},
                "time": {"created_at": "2025-03-01T08:00:00Z", "updated_at": "2025-03-01T08:00:00Z"}
            }),
            json!({
                "id": "projects:24_96601",
                "name": "Riyadh Museum",
                "name_short": "Museum",
                "status": "Completed",
                "city": "Riyadh",
                "country": "Saudi Arabia",
                "number": {"year": 24, "country": 966, "seq": 1, "id": "24-96601"},
                "time": {"created_at": "2024-05-10T08:00:00Z", "updated_at": "2024-05-10T08:00:00Z"}
            }),
        ],
        companies: vec![
            json!({
                "id": {"tb": "company", "id": {"String": "EMT"}},
                "name": "Emittiv",
                "name_short": "Emittiv",
                "abbreviation": "EMT",
                "city": "Dubai",
                "country": "U.A.E."
            }),
            json!({
                "id": "company:CHE",
                "name": "Conrad Hilton Etihad",
                "name_short": "Conrad",
                "abbreviation": "CHE",
                "city": "Abu Dhabi",
                "country": "U.A.E."
            }),
        ],
        contacts: vec![
            json!({
                "id": "contacts:c1",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "full_name": "Ada Lovelace",
                "email": "ada@emittiv.com",
                "phone": "+971 50 000 0001",
                "company": "company:EMT"
            }),
            json!({
                "id": {"tb": "contacts", "id": "c2"},
                "first_name": "Grace",
                "last_name": "Hopper",
                "full_name": "Grace Hopper",
                "email": "grace@emittiv.com",
                "phone": "+971 50 000 0002",
                "company": {"tb": "company", "id": {"String": "EMT"}}
            }),
            json!({
                "id": "contacts:c3",
                "first_name": "Hedy",
                "last_name": "Lamarr",
                "email": "hedy@conrad.com",
                "phone": "+971 50 000 0003",
                "company": "CHE"
            }),
        ],
        fees: vec![
            json!({
                "id": "fee:⟨24_96601_1⟩",
                "name": "Museum lighting",
                "number": "24-96601-FP",
                "rev": 1,
                "status": "Awarded",
                "issue_date": "2025-06-01",
                "project_id": "projects:24_96601",
                "company_id": {"tb": "company", "id": {"String": "EMT"}},
                "contact_id": "contacts:c1"
            }),
            json!({
                "id": {"tb": "fee", "id": {"String": "25_97105_1"}},
                "name": "Tower facade",
                "number": "25-97105-FP",
                "rev": 1,
                "status": "Sent",
                "issue_date": "250720",
                "project_id": {"tb": "projects", "id": "25_97105"},
                "company_id": "company:EMT",
                "contact_id": {"tb": "contacts", "id": "c1"}
            }),
            json!({
                "id": "fee:25_97105_2",
                "name": "Tower lobby",
                "number": "25-97105-FP",
                "rev": 2,
                "status": "Draft",
                "issue_date": "not a date",
                "project_id": "25_97105",
                "company_id": "CHE",
                "contact_id": "contacts:c3"
            }),
        ],
    }
}

pub fn seeded_api() -> Arc<MemoryApi> {
    Arc::new(MemoryApi::from_fixture(sample_fixture()))
}

pub fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn kind_counts(api: &MemoryApi) -> Vec<(EntityKind, usize)> {
    EntityKind::ALL
        .iter()
        .map(|kind| (*kind, api.list_calls(*kind)))
        .collect()
}
