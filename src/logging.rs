use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "FEEPRO_LOG";
pub const LOG_JSON_ENV: &str = "FEEPRO_LOG_JSON";
pub const LOG_DIR_ENV: &str = "FEEPRO_LOG_DIR";
pub const DEFAULT_FILTER: &str = "feepro=info";
const LOG_FILE_PREFIX: &str = "feepro.log";

fn flag_enabled(var: &str) -> bool {
    env::var(var)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

/// Installs the global subscriber: stderr output (JSON when `FEEPRO_LOG_JSON=1`) and,
/// when `FEEPRO_LOG_DIR` is set, a daily-rolling JSON file.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
/// Keep the returned guard alive for as long as file logging should flush.
pub fn init() -> anyhow::Result<Option<WorkerGuard>> {
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.into());
    let json = flag_enabled(LOG_JSON_ENV);

    let (file_layer, guard) = match env::var_os(LOG_DIR_ENV).map(PathBuf::from) {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init();

    Ok(guard)
}
