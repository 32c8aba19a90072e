use std::sync::Arc;

use anyhow::Result;
use feepro_lib::model::{
    CompanyCreate, CompanyUpdate, ContactCreate, ContactUpdate, EntityKind, FeeCreate,
    NewProject, ProjectNumber,
};
use feepro_lib::{ApiError, AppError, MemoryApi, RecordId, Stores};

#[path = "util.rs"]
mod util;

fn new_company(abbreviation: &str) -> CompanyCreate {
    CompanyCreate {
        name: format!("{abbreviation} Holdings"),
        name_short: abbreviation.to_string(),
        abbreviation: abbreviation.to_string(),
        city: "Dubai".into(),
        country: "U.A.E.".into(),
        ..CompanyCreate::default()
    }
}

#[tokio::test]
async fn created_entity_survives_a_reload() -> Result<()> {
    let api = util::seeded_api();
    let stores = Stores::new(api.clone());
    stores.load_all().await;

    let created = stores.companies.create(&new_company("NEO")).await?;
    assert_eq!(created.id.canonical(), "company:NEO");
    assert!(created.time.is_some());

    let reloaded = stores.companies.load().await?;
    assert_eq!(reloaded.iter().filter(|c| c.abbreviation == "NEO").count(), 1);
    Ok(())
}

#[tokio::test]
async fn deleted_entity_stays_gone_after_reload() -> Result<()> {
    let api = util::seeded_api();
    let stores = Stores::new(api.clone());
    stores.load_all().await;

    stores.contacts.delete(&"contacts:c2".into()).await?;
    assert!(stores.contacts.find(&"c2".into()).is_none());

    let reloaded = stores.contacts.load().await?;
    assert!(reloaded
        .iter()
        .all(|contact| contact.id.canonical() != "contacts:c2"));
    Ok(())
}

#[tokio::test]
async fn loading_twice_is_idempotent() -> Result<()> {
    let stores = Stores::new(util::seeded_api());
    let first = stores.fees.load().await?;
    let second = stores.fees.load().await?;
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    Ok(())
}

#[tokio::test]
async fn update_of_unknown_id_fails_and_keeps_cache() -> Result<()> {
    let stores = Stores::new(util::seeded_api());
    stores.load_all().await;
    let before = stores.companies.snapshot();

    let patch = CompanyUpdate {
        city: Some("Sharjah".into()),
        ..CompanyUpdate::default()
    };
    let err = stores
        .companies
        .update(&"company:NOPE".into(), &patch)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("company", "NOPE"));
    assert_eq!(stores.companies.snapshot(), before);
    Ok(())
}

#[tokio::test]
async fn update_replaces_entry_matched_without_prefix() -> Result<()> {
    let stores = Stores::new(util::seeded_api());
    stores.load_all().await;

    let updated = stores
        .contacts
        .update(
            &"c1".into(),
            &ContactUpdate {
                last_name: Some("King".into()),
                ..ContactUpdate::default()
            },
        )
        .await?;
    assert_eq!(updated.full_name.as_deref(), Some("Ada King"));

    let contacts = stores.contacts.snapshot();
    assert_eq!(contacts.len(), 3);
    assert_eq!(contacts[0].last_name.as_deref(), Some("King"));
    Ok(())
}

#[tokio::test]
async fn delete_of_unknown_id_is_not_found() -> Result<()> {
    let stores = Stores::new(util::seeded_api());
    stores.load_all().await;

    let err = stores.fees.delete(&"fee:missing".into()).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(stores.fees.len(), 3);
    Ok(())
}

#[tokio::test]
async fn delete_by_unquoted_key_drops_quoted_cache_entry() -> Result<()> {
    let stores = Stores::new(util::seeded_api());
    stores.load_all().await;
    assert!(stores.fees.find(&"fee:24_96601_1".into()).is_some());

    stores.fees.delete(&"fee:24_96601_1".into()).await?;
    let ids: Vec<String> = stores
        .fees
        .snapshot()
        .iter()
        .map(|fee| fee.id.canonical())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(!ids.iter().any(|id| id.contains("24_96601_1")));

    let reloaded = stores.fees.load().await?;
    assert_eq!(reloaded.len(), 2);
    Ok(())
}

#[tokio::test]
async fn backend_validation_surfaces_as_form_error() -> Result<()> {
    let stores = Stores::new(util::seeded_api());
    let draft = ContactCreate {
        first_name: "No".into(),
        last_name: "Plus".into(),
        email: "no.plus@example.com".into(),
        phone: "0501234567".into(),
        position: "PM".into(),
        company: "company:EMT".into(),
    };
    let err = stores.contacts.create(&draft).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(AppError::from(err).is_validation());
    assert!(stores.contacts.is_empty());
    Ok(())
}

#[tokio::test]
async fn fee_and_project_ids_follow_backend_rules() -> Result<()> {
    let stores = Stores::new(Arc::new(MemoryApi::new()));
    let project = stores
        .projects
        .create(&NewProject {
            name: "Desert Pavilion".into(),
            number: ProjectNumber::new(25, 971, 12),
            ..NewProject::default()
        })
        .await?;
    assert_eq!(project.id.canonical(), "projects:25_97112");

    let fee = stores
        .fees
        .create(&FeeCreate {
            name: "Pavilion lighting".into(),
            rev: 3,
            issue_date: "250801".into(),
            project_id: project.id.clone(),
            ..FeeCreate::default()
        })
        .await?;
    assert_eq!(fee.id.canonical(), "fee:25_97112_3");
    assert_eq!(fee.project_id.canonical(), "projects:25_97112");
    Ok(())
}

#[tokio::test]
async fn offline_backend_is_a_connectivity_error() -> Result<()> {
    let api = util::seeded_api();
    let stores = Stores::new(api.clone());
    stores.load_all().await;
    api.set_online(false);

    let err = stores.projects.load().await.unwrap_err();
    assert!(err.is_connectivity());
    assert_eq!(stores.projects.len(), 2, "failed load keeps the old cache");

    let report = stores.load_all().await;
    assert!(!report.is_complete());
    assert_eq!(report.failures().count(), 4);
    Ok(())
}

#[tokio::test]
async fn concurrent_loads_settle_on_backend_state() -> Result<()> {
    let api = util::seeded_api();
    let stores = Stores::new(api.clone());
    let (a, b) = tokio::join!(stores.companies.load(), stores.companies.load());
    assert_eq!(a?, b?);
    assert_eq!(stores.companies.len(), 2);
    assert_eq!(api.list_calls(EntityKind::Company), 2);
    Ok(())
}

#[tokio::test]
async fn publishing_without_subscribers_is_harmless() -> Result<()> {
    let stores = Stores::new(util::seeded_api());
    let rx = stores.companies.subscribe();
    drop(rx);
    stores.companies.load().await?;
    stores.companies.create(&new_company("ZED")).await?;
    assert_eq!(stores.companies.len(), 3);
    Ok(())
}

#[tokio::test]
async fn subscribers_see_every_mutation() -> Result<()> {
    let stores = Stores::new(util::seeded_api());
    let mut rx = stores.companies.subscribe();

    stores.companies.load().await?;
    rx.changed().await?;
    assert_eq!(rx.borrow_and_update().len(), 2);

    stores.companies.delete(&RecordId::from("CHE")).await?;
    rx.changed().await?;
    assert_eq!(rx.borrow_and_update().len(), 1);
    Ok(())
}
