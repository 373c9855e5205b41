use std::env;
use std::fmt;
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
    pub ppm: PpmConfig,
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

        let ppm = PpmConfig {
            advance_cap_percent: numeric_var(
                "PPM_ADVANCE_CAP_PERCENT",
                PpmConfig::DEFAULT_ADVANCE_CAP_PERCENT,
            )?,
            incentive_base_cents: numeric_var(
                "PPM_INCENTIVE_BASE_CENTS",
                PpmConfig::DEFAULT_INCENTIVE_BASE_CENTS,
            )?,
            incentive_cents_per_pound: numeric_var(
                "PPM_INCENTIVE_CENTS_PER_POUND",
                PpmConfig::DEFAULT_INCENTIVE_CENTS_PER_POUND,
            )?,
            sit_first_day_cents_per_cwt: numeric_var(
                "PPM_SIT_FIRST_DAY_CENTS_PER_CWT",
                PpmConfig::DEFAULT_SIT_FIRST_DAY_CENTS_PER_CWT,
            )?,
            sit_additional_day_cents_per_cwt: numeric_var(
                "PPM_SIT_ADDITIONAL_DAY_CENTS_PER_CWT",
                PpmConfig::DEFAULT_SIT_ADDITIONAL_DAY_CENTS_PER_CWT,
            )?,
        };

        if ppm.advance_cap_percent > 100 {
            return Err(ConfigError::InvalidNumber {
                key: "PPM_ADVANCE_CAP_PERCENT",
            });
        }
        if ppm.incentive_base_cents < 0 {
            return Err(ConfigError::InvalidNumber {
                key: "PPM_INCENTIVE_BASE_CENTS",
            });
        }
        if ppm.incentive_cents_per_pound < 0 {
            return Err(ConfigError::InvalidNumber {
                key: "PPM_INCENTIVE_CENTS_PER_POUND",
            });
        }
        if ppm.sit_first_day_cents_per_cwt < 0 {
            return Err(ConfigError::InvalidNumber {
                key: "PPM_SIT_FIRST_DAY_CENTS_PER_CWT",
            });
        }
        if ppm.sit_additional_day_cents_per_cwt < 0 {
            return Err(ConfigError::InvalidNumber {
                key: "PPM_SIT_ADDITIONAL_DAY_CENTS_PER_CWT",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            ppm,
        })
    }
}

fn numeric_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
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

/// Business dials for the PPM shipment workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpmConfig {
    /// Largest advance a customer may request, as a percentage of the estimated incentive.
    pub advance_cap_percent: u8,
    pub incentive_base_cents: i64,
    pub incentive_cents_per_pound: i64,
    /// Storage-in-transit rate for the first day, per hundred pounds stored.
    pub sit_first_day_cents_per_cwt: i64,
    pub sit_additional_day_cents_per_cwt: i64,
}

impl PpmConfig {
    pub const DEFAULT_ADVANCE_CAP_PERCENT: u8 = 60;
    pub const DEFAULT_INCENTIVE_BASE_CENTS: i64 = 150_000;
    pub const DEFAULT_INCENTIVE_CENTS_PER_POUND: i64 = 55;
    pub const DEFAULT_SIT_FIRST_DAY_CENTS_PER_CWT: i64 = 1_850;
    pub const DEFAULT_SIT_ADDITIONAL_DAY_CENTS_PER_CWT: i64 = 75;
}

impl Default for PpmConfig {
    fn default() -> Self {
        Self {
            advance_cap_percent: Self::DEFAULT_ADVANCE_CAP_PERCENT,
            incentive_base_cents: Self::DEFAULT_INCENTIVE_BASE_CENTS,
            incentive_cents_per_pound: Self::DEFAULT_INCENTIVE_CENTS_PER_POUND,
            sit_first_day_cents_per_cwt: Self::DEFAULT_SIT_FIRST_DAY_CENTS_PER_CWT,
            sit_additional_day_cents_per_cwt: Self::DEFAULT_SIT_ADDITIONAL_DAY_CENTS_PER_CWT,
        }
    }
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
                write!(f, "{key} must be a non-negative number within range")
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
