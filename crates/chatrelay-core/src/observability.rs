use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "chatrelay.logs.jsonl";

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `false` leaves the global subscriber untouched.
    pub enabled: bool,
    /// `EnvFilter` directive; `None` falls back to `RUST_LOG`, then `info`.
    pub filter: Option<String>,
    /// JSONL output file; `None` logs to stdout.
    pub json_log_path: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Reads settings through `lookup` (normally `std::env::var`).
    ///
    /// - `CHATRELAY_OBSERVABILITY_ENABLED`: on/off flag, default on.
    /// - `CHATRELAY_LOG_LEVEL`: filter directive such as `chatrelay_core=debug`.
    /// - `CHATRELAY_JSON_LOG_PATH`: JSONL file path.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("CHATRELAY_OBSERVABILITY_ENABLED")
            .map(|v| parse_bool(&v).unwrap_or(true))
            .unwrap_or(true);
        Self {
            enabled,
            filter: lookup("CHATRELAY_LOG_LEVEL").filter(|v| !v.trim().is_empty()),
            json_log_path: lookup("CHATRELAY_JSON_LOG_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn env_filter(&self) -> EnvFilter {
        self.filter
            .as_deref()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Installs the global tracing subscriber from the environment, once per
/// process. Later calls are no-ops.
pub fn init_observability() {
    init_with(ObservabilityConfig::from_env());
}

/// Same as [`init_observability`] with explicit settings.
pub fn init_with(config: ObservabilityConfig) {
    INIT.get_or_init(|| {
        if !config.enabled {
            return;
        }
        let registry = tracing_subscriber::registry().with(config.env_filter());

        match &config.json_log_path {
            Some(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let _ = std::fs::create_dir_all(dir);
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_LOG_FILE);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(false)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = registry.with(layer).try_init();
            }
            None => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stdout);
                let _ = registry.with(layer).try_init();
            }
        }
    });
}
