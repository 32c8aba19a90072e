use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use feepro_lib::model::EntityKind;
use feepro_lib::{relations, search};
use feepro_lib::{
    AppError, AppResult, AppState, Fixture, MemoryApi, RecordId, Stores, SyncConfig,
};

const DISCONNECTED_EXIT_CODE: i32 = 2;
const FIXTURE_READ_CODE: &str = "FIXTURE/READ";
const FIXTURE_PARSE_CODE: &str = "FIXTURE/PARSE";
const PROJECT_NUMBER_CODE: &str = "PROJECT/NUMBER";

#[derive(Debug, Parser)]
#[command(name = "feepro", about = "FeePro data sync diagnostics", version)]
struct Cli {
    /// JSON file with `projects`, `companies`, `contacts` and `fees` arrays.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,
    /// Start the in-memory backend unreachable.
    #[arg(long, global = true)]
    offline: bool,
    /// Seconds between connection probes (overrides FEEPRO_PROBE_INTERVAL_SECS).
    #[arg(long, global = true)]
    probe_interval: Option<u64>,
    /// Failed probes before giving up (overrides FEEPRO_MAX_RETRIES).
    #[arg(long, global = true)]
    max_retries: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Probe the backend once and print the connection state.
    Status,
    /// Follow the connection monitor, printing every state change.
    Watch {
        /// Stop after this many updates.
        #[arg(long)]
        updates: Option<usize>,
    },
    /// Load a collection and print it.
    List {
        #[arg(value_enum)]
        kind: EntityKind,
    },
    /// Print everything related to one record.
    Related {
        #[arg(value_enum)]
        kind: EntityKind,
        id: String,
    },
    /// Suggest the next free project number for a country dial code.
    NextNumber {
        dial_code: u32,
        /// Two-digit year; defaults to the current year.
        #[arg(long)]
        year: Option<u32>,
    },
    /// Search projects by name, number or location.
    Search { query: String },
}

fn main() {
    let _guard = match feepro_lib::logging::init() {
        Ok(guard) => guard,
        Err(err) => process::exit(print_error(&AppError::from(err))),
    };

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(err) => process::exit(print_error(&AppError::from(err))),
    }
}

fn load_fixture(path: &Path) -> AppResult<Fixture> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|err| {
        AppError::new(FIXTURE_READ_CODE, format!("read fixture {display}"))
            .with_context("path", display.clone())
            .with_context("error", err.to_string())
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        AppError::new(FIXTURE_PARSE_CODE, format!("parse fixture {display}"))
            .with_context("path", display.clone())
            .with_cause(err)
    })
}

fn build_config(cli: &Cli) -> Result<SyncConfig> {
    let mut config = SyncConfig::from_env()?;
    if let Some(secs) = cli.probe_interval.filter(|secs| *secs > 0) {
        config.probe_interval = Duration::from_secs(secs);
    }
    if let Some(retries) = cli.max_retries.filter(|retries| *retries > 0) {
        config.max_retries = retries;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{rendered}");
    Ok(())
}

fn print_error(err: &AppError) -> i32 {
    match serde_json::to_string(err) {
        Ok(rendered) => eprintln!("{rendered}"),
        Err(_) => eprintln!("Error: {err}"),
    }
    1
}

fn report_error(err: AppError) -> Result<i32> {
    Ok(print_error(&err))
}

fn run(cli: Cli) -> Result<i32> {
    let config = build_config(&cli)?;
    let api = match &cli.fixture {
        Some(path) => MemoryApi::from_fixture(load_fixture(path)?),
        None => MemoryApi::new(),
    };
    api.set_online(!cli.offline);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(async move {
        let state = AppState::new(Arc::new(api), config);
        tracing::debug!(target: "feepro", event = "cli_started", command = ?cli.command);
        execute(cli.command, &state).await
    })
}

async fn execute(command: Commands, state: &AppState) -> Result<i32> {
    match command {
        Commands::Status => {
            let current = state.monitor().check_now().await;
            print_json(&current)?;
            Ok(if current.is_connected {
                0
            } else {
                DISCONNECTED_EXIT_CODE
            })
        }
        Commands::Watch { updates } => watch(state, updates).await,
        Commands::List { kind } => {
            let stores = state.stores();
            let loaded = match kind {
                EntityKind::Project => stores.projects.load().await.map(|v| json!(*v)),
                EntityKind::Company => stores.companies.load().await.map(|v| json!(*v)),
                EntityKind::Contact => stores.contacts.load().await.map(|v| json!(*v)),
                EntityKind::Fee => stores.fees.load().await.map(|v| json!(*v)),
            };
            match loaded {
                Ok(items) => {
                    print_json(&items)?;
                    Ok(0)
                }
                Err(err) => report_error(err.into()),
            }
        }
        Commands::Related { kind, id } => {
            let report = state.stores().load_all().await;
            if let Some((_, err)) = report.failures().next() {
                return report_error(err.clone().into());
            }
            print_json(&related(state.stores(), kind, &RecordId::from(id)))?;
            Ok(0)
        }
        Commands::NextNumber { dial_code, year } => {
            let projects = match state.stores().projects.load().await {
                Ok(projects) => projects,
                Err(err) => return report_error(err.into()),
            };
            let year = year.unwrap_or_else(search::current_project_year);
            match search::next_project_number(&projects, dial_code, year) {
                Ok(number) => {
                    println!("{number}");
                    Ok(0)
                }
                Err(err) => report_error(AppError::new(PROJECT_NUMBER_CODE, err.to_string())),
            }
        }
        Commands::Search { query } => {
            let projects = match state.stores().projects.load().await {
                Ok(projects) => projects,
                Err(err) => return report_error(err.into()),
            };
            print_json(&search::search_projects(&projects, &query))?;
            Ok(0)
        }
    }
}

fn related(stores: &Stores, kind: EntityKind, id: &RecordId) -> serde_json::Value {
    let projects = stores.projects.snapshot();
    let companies = stores.companies.snapshot();
    let contacts = stores.contacts.snapshot();
    let fees = stores.fees.snapshot();

    match kind {
        EntityKind::Company => json!({
            "company": stores.companies.find(id),
            "contacts": relations::contacts_of_company(id, &contacts),
            "fees": relations::fees_of_company(id, &fees),
            "projects": relations::projects_of_company(id, &fees, &projects),
        }),
        EntityKind::Contact => {
            let contact = stores.contacts.find(id);
            let company = contact
                .as_ref()
                .and_then(|contact| relations::company_of_contact(contact, &companies));
            json!({
                "contact": contact,
                "company": company,
                "fees": relations::fees_of_contact(id, &fees),
            })
        }
        EntityKind::Project => json!({
            "project": stores.projects.find(id),
            "fees": relations::fees_of_project(id, &fees),
        }),
        EntityKind::Fee => {
            let fee = stores.fees.find(id);
            let parents = fee.as_ref().map(|fee| {
                (
                    relations::project_of_fee(fee, &projects),
                    relations::company_of_fee(fee, &companies),
                    relations::contact_of_fee(fee, &contacts),
                )
            });
            let (project, company, contact) = parents.unwrap_or_default();
            json!({
                "fee": fee,
                "project": project,
                "company": company,
                "contact": contact,
            })
        }
    }
}

async fn watch(state: &AppState, updates: Option<usize>) -> Result<i32> {
    let mut subscription = state.monitor().subscribe();
    print_json(&subscription.current())?;
    let mut printed = 1;
    loop {
        if updates.is_some_and(|limit| printed >= limit) {
            break;
        }
        let rx = subscription.receiver();
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = rx.borrow_and_update().clone();
                print_json(&current)?;
                printed += 1;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    state.monitor().shutdown();
    Ok(0)
}
