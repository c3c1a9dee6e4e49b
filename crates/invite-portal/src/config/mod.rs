use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SUBMIT_DELAY_MS: u64 = 2_500;
const DEFAULT_GATE_INTERVAL_MS: u64 = 1_000;
const DEFAULT_INTAKE_SESSION_TTL_SECS: u64 = 3_600;
const DEFAULT_ADMIN_SESSION_TTL_SECS: u64 = 1_800;

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

/// Top-level configuration for the portal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: BackendConfig,
    pub intake: IntakeConfig,
    pub admin: AdminConfig,
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

        let backend = BackendConfig {
            base_url: non_empty_var("BACKEND_URL"),
            timeout: Duration::from_secs(numeric_var(
                "BACKEND_TIMEOUT_SECS",
                DEFAULT_BACKEND_TIMEOUT_SECS,
            )?),
            user_agent: non_empty_var("BACKEND_USER_AGENT").unwrap_or_else(default_user_agent),
        };

        let intake = IntakeConfig {
            minimum_submit_delay: Duration::from_millis(numeric_var(
                "INTAKE_MIN_DELAY_MS",
                DEFAULT_SUBMIT_DELAY_MS,
            )?),
            gate_interval: Duration::from_millis(numeric_var(
                "INTAKE_GATE_INTERVAL_MS",
                DEFAULT_GATE_INTERVAL_MS,
            )?),
            fallback_form_url: non_empty_var("INTAKE_FALLBACK_FORM_URL"),
            session_ttl: Duration::from_secs(numeric_var(
                "INTAKE_SESSION_TTL_SECS",
                DEFAULT_INTAKE_SESSION_TTL_SECS,
            )?),
        };

        let admin = AdminConfig {
            session_ttl: Duration::from_secs(numeric_var(
                "ADMIN_SESSION_TTL_SECS",
                DEFAULT_ADMIN_SESSION_TTL_SECS,
            )?),
        };

        if intake.gate_interval.is_zero() {
            return Err(ConfigError::InvalidNumber {
                variable: "INTAKE_GATE_INTERVAL_MS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend,
            intake,
            admin,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn numeric_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match non_empty_var(name) {
        Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
            variable: name,
            value: raw,
        }),
        None => Ok(default),
    }
}

fn default_user_agent() -> String {
    format!("invite-portal/{}", env!("CARGO_PKG_VERSION"))
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

/// Connection settings for the issuing backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// `None` leaves the portal without a backend; issuance then fails fast.
    pub base_url: Option<String>,
    /// Applied to issuance requests only.
    pub timeout: Duration,
    /// Sent as the `userAgent` query parameter on issuance.
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }
}

/// Pacing and timer settings for the applicant flow.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub minimum_submit_delay: Duration,
    pub gate_interval: Duration,
    pub fallback_form_url: Option<String>,
    /// Sessions untouched for this long are dropped.
    pub session_ttl: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            minimum_submit_delay: Duration::from_millis(DEFAULT_SUBMIT_DELAY_MS),
            gate_interval: Duration::from_millis(DEFAULT_GATE_INTERVAL_MS),
            fallback_form_url: None,
            session_ttl: Duration::from_secs(DEFAULT_INTAKE_SESSION_TTL_SECS),
        }
    }
}

/// Operator console settings.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Idle operator sessions are logged out after this long.
    pub session_ttl: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(DEFAULT_ADMIN_SESSION_TTL_SECS),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a positive integer (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "BACKEND_URL",
            "BACKEND_TIMEOUT_SECS",
            "BACKEND_USER_AGENT",
            "INTAKE_MIN_DELAY_MS",
            "INTAKE_GATE_INTERVAL_MS",
            "INTAKE_FALLBACK_FORM_URL",
            "INTAKE_SESSION_TTL_SECS",
            "ADMIN_SESSION_TTL_SECS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.backend.base_url.is_none());
        assert_eq!(config.backend.timeout, Duration::from_secs(15));
        assert!(config.backend.user_agent.starts_with("invite-portal/"));
        assert_eq!(config.intake.minimum_submit_delay, Duration::from_millis(2_500));
        assert_eq!(config.intake.gate_interval, Duration::from_secs(1));
        assert_eq!(config.intake.session_ttl, Duration::from_secs(3_600));
        assert_eq!(config.admin.session_ttl, Duration::from_secs(1_800));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn blank_backend_url_counts_as_unset() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BACKEND_URL", "   ");
        let config = AppConfig::load().expect("config loads");
        assert!(config.backend.base_url.is_none());
    }

    #[test]
    fn rejects_non_numeric_delay() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("INTAKE_MIN_DELAY_MS", "soon");
        let err = AppConfig::load().expect_err("invalid delay rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                variable: "INTAKE_MIN_DELAY_MS",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_gate_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("INTAKE_GATE_INTERVAL_MS", "0");
        assert!(AppConfig::load().is_err());
    }
}
