use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::registration::{HousekeepingSchedule, RateLimitPolicy};

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
    pub registration: RegistrationConfig,
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
            registration: RegistrationConfig::from_env()?,
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

/// Submission throttle, draft lifetime and sweep cadence for the registration wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub rate_limit: RateLimitPolicy,
    pub draft_ttl: chrono::Duration,
    pub housekeeping: HousekeepingSchedule,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitPolicy::default(),
            draft_ttl: chrono::Duration::minutes(60),
            housekeeping: HousekeepingSchedule::default(),
        }
    }
}

impl RegistrationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_attempts = positive_u64("APP_RATE_LIMIT_MAX_ATTEMPTS")?
            .map(|value| u32::try_from(value).map_err(|_| invalid("APP_RATE_LIMIT_MAX_ATTEMPTS")))
            .transpose()?
            .unwrap_or(defaults.rate_limit.max_attempts);
        let window = seconds("APP_RATE_LIMIT_WINDOW_SECS")?.unwrap_or(defaults.rate_limit.window);
        let block_duration =
            seconds("APP_RATE_LIMIT_BLOCK_SECS")?.unwrap_or(defaults.rate_limit.block_duration);
        let draft_ttl = seconds("APP_DRAFT_TTL_SECS")?.unwrap_or(defaults.draft_ttl);

        let limiter_sweep = positive_u64("APP_LIMITER_SWEEP_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.housekeeping.limiter_sweep);
        let storage_sweep = positive_u64("APP_STORAGE_SWEEP_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.housekeeping.storage_sweep);

        Ok(Self {
            rate_limit: RateLimitPolicy {
                max_attempts,
                window,
                block_duration,
            },
            draft_ttl,
            housekeeping: HousekeepingSchedule {
                limiter_sweep,
                storage_sweep,
            },
        })
    }
}

fn invalid(key: &'static str) -> ConfigError {
    ConfigError::InvalidNumber { key }
}

fn positive_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(Some(value)),
            _ => Err(invalid(key)),
        },
        Err(_) => Ok(None),
    }
}

fn seconds(key: &'static str) -> Result<Option<chrono::Duration>, ConfigError> {
    positive_u64(key)?
        .map(|value| {
            i64::try_from(value)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .ok_or_else(|| invalid(key))
        })
        .transpose()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive whole number")
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

    const KEYS: [&str; 10] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "APP_RATE_LIMIT_MAX_ATTEMPTS",
        "APP_RATE_LIMIT_WINDOW_SECS",
        "APP_RATE_LIMIT_BLOCK_SECS",
        "APP_DRAFT_TTL_SECS",
        "APP_LIMITER_SWEEP_SECS",
        "APP_STORAGE_SWEEP_SECS",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in KEYS {
            env::remove_var(key);
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
        assert_eq!(config.registration, RegistrationConfig::default());
        assert_eq!(config.registration.rate_limit.max_attempts, 3);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn registration_overrides_are_read() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RATE_LIMIT_MAX_ATTEMPTS", "5");
        env::set_var("APP_RATE_LIMIT_BLOCK_SECS", "60");
        env::set_var("APP_DRAFT_TTL_SECS", "600");
        env::set_var("APP_STORAGE_SWEEP_SECS", "30");

        let registration = AppConfig::load().expect("config loads").registration;
        assert_eq!(registration.rate_limit.max_attempts, 5);
        assert_eq!(registration.rate_limit.window, chrono::Duration::minutes(15));
        assert_eq!(
            registration.rate_limit.block_duration,
            chrono::Duration::seconds(60)
        );
        assert_eq!(registration.draft_ttl, chrono::Duration::minutes(10));
        assert_eq!(
            registration.housekeeping.storage_sweep,
            Duration::from_secs(30)
        );
        reset_env();
    }

    #[test]
    fn rejects_zero_and_garbage_numbers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RATE_LIMIT_WINDOW_SECS", "0");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { key }) => {
                assert_eq!(key, "APP_RATE_LIMIT_WINDOW_SECS")
            }
            other => panic!("expected invalid number, got {other:?}"),
        }

        reset_env();
        env::set_var("APP_LIMITER_SWEEP_SECS", "soon");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "APP_LIMITER_SWEEP_SECS"
            })
        ));
        reset_env();
    }
}
