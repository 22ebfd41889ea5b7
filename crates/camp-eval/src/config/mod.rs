use crate::workflows::closure::ReportSettings;
use crate::workflows::evaluation::{ClassificationThresholds, ScoreScale};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

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
        let json = environment == AppEnvironment::Production;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, json },
            engine: EngineConfig::from_env()?,
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
    /// Emit JSON lines instead of the compact human format.
    pub json: bool,
}

/// Scoring scale, tag thresholds, and report generation limits.
///
/// Thresholds are always expressed on the 1-5 reference scale and rescaled by
/// the classification engine to whatever `scale` the deployment uses.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub scale: ScoreScale,
    pub thresholds: ClassificationThresholds,
    pub reports: ReportSettings,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let min = env_number("APP_SCORE_MIN", defaults.scale.min)?;
        let max = env_number("APP_SCORE_MAX", defaults.scale.max)?;
        let scale = ScoreScale::new(min, max).ok_or(ConfigError::InvalidScale { min, max })?;

        let thresholds = ClassificationThresholds {
            high_score: env_number("APP_TAG_HIGH_SCORE", defaults.thresholds.high_score)?,
            low_score: env_number("APP_TAG_LOW_SCORE", defaults.thresholds.low_score)?,
            high_spread: env_number("APP_TAG_HIGH_SPREAD", defaults.thresholds.high_spread)?,
        };
        if thresholds.low_score > thresholds.high_score || thresholds.high_spread < 0.0 {
            return Err(ConfigError::InvalidThresholds);
        }

        let timeout_ms = env_number(
            "APP_REPORT_TIMEOUT_MS",
            defaults.reports.timeout.as_millis() as u64,
        )?;
        let max_concurrency = env_number("APP_REPORT_CONCURRENCY", defaults.reports.max_concurrency)?;
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidNumber {
                variable: "APP_REPORT_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            scale,
            thresholds,
            reports: ReportSettings {
                timeout: Duration::from_millis(timeout_ms),
                max_concurrency,
            },
        })
    }
}

fn env_number<T: FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidNumber {
                    variable,
                    value: raw,
                })
        }
        _ => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
    InvalidScale {
        min: f64,
        max: f64,
    },
    InvalidThresholds,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a valid number (found '{value}')")
            }
            ConfigError::InvalidScale { min, max } => write!(
                f,
                "APP_SCORE_MIN/APP_SCORE_MAX must describe a finite range with min < max (found {min}..{max})"
            ),
            ConfigError::InvalidThresholds => write!(
                f,
                "APP_TAG_LOW_SCORE must not exceed APP_TAG_HIGH_SCORE and APP_TAG_HIGH_SPREAD must be >= 0"
            ),
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
