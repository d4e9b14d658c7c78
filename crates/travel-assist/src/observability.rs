use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "travel-assist.logs.jsonl";

type BoxedSubscriber = Box<dyn tracing::Subscriber + Send + Sync>;

static INIT: OnceCell<()> = OnceCell::new();

/// Where log lines go.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogSink {
    /// Compact lines on stderr, keeping stdout free for answer text.
    Console,
    /// One JSON object per line in `dir/file_name`.
    JsonFile { dir: PathBuf, file_name: String },
}

/// Logging settings resolved from `TRAVEL_*` variables.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LogSettings {
    enabled: bool,
    filter: String,
    sink: LogSink,
}

impl LogSettings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            enabled: observability_enabled(&lookup),
            filter: filter_directive(&lookup),
            sink: match lookup("TRAVEL_JSON_LOG_PATH") {
                Some(raw) if !raw.trim().is_empty() => json_sink(raw.trim()),
                _ => LogSink::Console,
            },
        }
    }

    fn subscriber(&self) -> Option<BoxedSubscriber> {
        if !self.enabled {
            return None;
        }
        let filter =
            EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);
        match &self.sink {
            LogSink::Console => Some(Box::new(
                registry.with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                ),
            )),
            LogSink::JsonFile { dir, file_name } => {
                if let Err(err) = std::fs::create_dir_all(dir) {
                    eprintln!("cannot create log directory {}: {err}", dir.display());
                    return None;
                }
                let writer = tracing_appender::rolling::never(dir, file_name);
                Some(Box::new(
                    registry.with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_span_list(true)
                            .with_target(false)
                            .with_writer(writer),
                    ),
                ))
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// First of `TRAVEL_OBSERVABILITY_ENABLED` / `TRAVEL_OBSERVABILITY` that is set wins.
/// Unparseable values keep logging on.
fn observability_enabled(lookup: &impl Fn(&str) -> Option<String>) -> bool {
    ["TRAVEL_OBSERVABILITY_ENABLED", "TRAVEL_OBSERVABILITY"]
        .into_iter()
        .find_map(|key| lookup(key))
        .map(|value| parse_bool(&value).unwrap_or(true))
        .unwrap_or(true)
}

/// `TRAVEL_LOG_LEVEL`, then `RUST_LOG`, then `info`. Invalid directives fall through.
fn filter_directive(lookup: &impl Fn(&str) -> Option<String>) -> String {
    ["TRAVEL_LOG_LEVEL", "RUST_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn json_sink(raw: &str) -> LogSink {
    let path = Path::new(raw);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    LogSink::JsonFile { dir, file_name }
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `TRAVEL_OBSERVABILITY_ENABLED` / `TRAVEL_OBSERVABILITY`: enable/disable flag (default enabled).
/// - `TRAVEL_LOG_LEVEL`: level or filter directive, e.g. `debug` or `travel_assist=trace`.
/// - `RUST_LOG`: used when `TRAVEL_LOG_LEVEL` is unset or invalid.
/// - `TRAVEL_JSON_LOG_PATH`: write JSONL to this file instead of stderr.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let settings = LogSettings::from_lookup(|key| std::env::var(key).ok());
        if let Some(subscriber) = settings.subscriber() {
            let _ = subscriber.try_init();
        }
    });
}
