use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log filter '{value}'")
            }
            TelemetryError::Subscriber(err) => write!(f, "subscriber init failed: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// The configured level applies to the engine crates and `info` elsewhere,
/// so a debug run does not drown in hyper/tower noise.
fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    let directives = directives_for(&config.log_level);
    EnvFilter::try_new(&directives).map_err(|source| TelemetryError::EnvFilter {
        value: directives,
        source,
    })
}

fn directives_for(level: &str) -> String {
    match level.trim() {
        "trace" | "debug" => {
            format!("info,hostel_ops={level},hostel_ops_api={level}")
        }
        other => other.to_string(),
    }
}

/// Installs the global subscriber. `RUST_LOG` wins when set; the configured
/// level applies otherwise. Local development keeps ANSI colors and event
/// targets; test and production output stays compact and plain for log
/// shippers.
pub fn init(environment: AppEnvironment, config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => env_filter(config)?,
    };
    let dev = environment == AppEnvironment::Development;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(dev)
        .compact()
        .with_ansi(dev)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
