use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::engine::{DeletionPolicy, EnginePolicy};

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
    pub engine: EngineSettings,
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

        let deletion = match env::var("ENGINE_DELETION_POLICY") {
            Ok(value) => parse_deletion_policy(&value)?,
            Err(_) => DeletionPolicy::Restrict,
        };

        let blocked_escalation_days = match env::var("ENGINE_BLOCKED_ESCALATION_DAYS") {
            Ok(value) => Some(
                value
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|days| *days >= 0)
                    .ok_or(ConfigError::InvalidEscalationDays { value })?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineSettings {
                deletion,
                policy: EnginePolicy {
                    blocked_escalation_days,
                },
            },
        })
    }
}

fn parse_deletion_policy(value: &str) -> Result<DeletionPolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "restrict" => Ok(DeletionPolicy::Restrict),
        "cascade" => Ok(DeletionPolicy::Cascade),
        _ => Err(ConfigError::InvalidDeletionPolicy {
            value: value.to_string(),
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

/// Product policy knobs handed to the registry and evaluator.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub deletion: DeletionPolicy,
    pub policy: EnginePolicy,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDeletionPolicy { value: String },
    InvalidEscalationDays { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDeletionPolicy { value } => {
                write!(
                    f,
                    "ENGINE_DELETION_POLICY must be 'restrict' or 'cascade', got '{}'",
                    value
                )
            }
            ConfigError::InvalidEscalationDays { value } => {
                write!(
                    f,
                    "ENGINE_BLOCKED_ESCALATION_DAYS must be a non-negative integer, got '{}'",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDeletionPolicy { .. }
            | ConfigError::InvalidEscalationDays { .. } => None,
        }
    }
}
