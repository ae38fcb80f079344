use std::env;
use std::net::{IpAddr, SocketAddr};

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
    pub phases: PhaseConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            phases: PhaseConfig::from_env(),
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Catalog of phase names the access rules reason about. The platform
/// identifies phases by display name rather than a stable identifier, so the
/// catalog is configuration, matched with normalized comparison in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseConfig {
    review_capable: Vec<String>,
    screening: Vec<String>,
    appeal: Vec<String>,
}

const DEFAULT_REVIEW_PHASES: &[&str] = &[
    "Screening",
    "Checkpoint Screening",
    "Checkpoint Review",
    "Review",
    "Iterative Review",
    "Approval",
    "Post-Mortem",
];
const DEFAULT_SCREENING_PHASES: &[&str] = &["Screening", "Checkpoint Screening"];
const DEFAULT_APPEAL_PHASES: &[&str] = &["Appeals", "Appeals Response"];

fn normalize_phase(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn phase_list_from_env(var: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .split(',')
            .map(normalize_phase)
            .filter(|name| !name.is_empty())
            .collect(),
        _ => defaults.iter().map(|name| normalize_phase(name)).collect(),
    }
}

impl PhaseConfig {
    pub fn new(
        review_capable: Vec<String>,
        screening: Vec<String>,
        appeal: Vec<String>,
    ) -> Self {
        Self {
            review_capable: review_capable.iter().map(|n| normalize_phase(n)).collect(),
            screening: screening.iter().map(|n| normalize_phase(n)).collect(),
            appeal: appeal.iter().map(|n| normalize_phase(n)).collect(),
        }
    }

    pub fn from_env() -> Self {
        Self {
            review_capable: phase_list_from_env("APP_REVIEW_PHASES", DEFAULT_REVIEW_PHASES),
            screening: phase_list_from_env("APP_SCREENING_PHASES", DEFAULT_SCREENING_PHASES),
            appeal: phase_list_from_env("APP_APPEAL_PHASES", DEFAULT_APPEAL_PHASES),
        }
    }

    pub fn is_review_capable(&self, phase_name: &str) -> bool {
        self.review_capable.contains(&normalize_phase(phase_name))
    }

    pub fn is_screening(&self, phase_name: &str) -> bool {
        self.screening.contains(&normalize_phase(phase_name))
    }

    pub fn is_appeal(&self, phase_name: &str) -> bool {
        self.appeal.contains(&normalize_phase(phase_name))
    }
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            review_capable: DEFAULT_REVIEW_PHASES
                .iter()
                .map(|name| normalize_phase(name))
                .collect(),
            screening: DEFAULT_SCREENING_PHASES
                .iter()
                .map(|name| normalize_phase(name))
                .collect(),
            appeal: DEFAULT_APPEAL_PHASES
                .iter()
                .map(|name| normalize_phase(name))
                .collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
}
