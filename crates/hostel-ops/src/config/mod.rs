use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::billing::RegenerationPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let claim_retries = env::var("APP_CLAIM_RETRIES")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidClaimRetries)?;

        let regeneration = match env::var("APP_BILLING_REGENERATION") {
            Ok(value) => parse_regeneration(&value)?,
            Err(_) => RegenerationPolicy::default(),
        };

        let late_fee_sweep_secs = env::var("APP_LATE_FEE_SWEEP_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidSweepInterval)?;

        let billing_cycle_secs = env::var("APP_BILLING_CYCLE_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidCycleInterval)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig {
                claim_retries,
                regeneration,
                late_fee_sweep_secs,
                billing_cycle_secs,
            },
        })
    }
}

fn parse_regeneration(value: &str) -> Result<RegenerationPolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "preserve_paid" => Ok(RegenerationPolicy::PreservePaid),
        "replace_all" => Ok(RegenerationPolicy::ReplaceAll),
        other => Err(ConfigError::InvalidRegeneration {
            value: other.to_string(),
        }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Tunables for the allocation and billing engines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many times an automatic claim retries after losing a bed race.
    pub claim_retries: u32,
    /// What series regeneration does to obligations that already exist.
    pub regeneration: RegenerationPolicy,
    /// Interval between background late-fee sweeps.
    pub late_fee_sweep_secs: u64,
    /// Interval between background billing-cycle passes.
    pub billing_cycle_secs: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidClaimRetries,
    InvalidRegeneration { value: String },
    InvalidSweepInterval,
    InvalidCycleInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidClaimRetries => {
                write!(f, "APP_CLAIM_RETRIES must be a non-negative integer")
            }
            ConfigError::InvalidRegeneration { value } => write!(
                f,
                "APP_BILLING_REGENERATION must be 'preserve_paid' or 'replace_all', got '{value}'"
            ),
            ConfigError::InvalidSweepInterval => {
                write!(f, "APP_LATE_FEE_SWEEP_SECS must be a non-negative integer")
            }
            ConfigError::InvalidCycleInterval => {
                write!(f, "APP_BILLING_CYCLE_SECS must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
