use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Directory sheet the resident workbook must contain.
pub const DEFAULT_RESIDENT_SHEET: &str = "新店機廠捷17.18.19";
/// Sheet name of the generated report, also used as the download file prefix.
pub const DEFAULT_OUTPUT_SHEET: &str = "處理結果";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Deployment stage, read from `APP_ENV`. Unknown values fall back to development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    #[default]
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = optional_var("APP_ENV")
            .map(|value| AppEnvironment::parse(&value))
            .unwrap_or_default();

        let server = ServerConfig {
            host: optional_var("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: match optional_var("APP_PORT") {
                Some(raw) => raw
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort { value: raw })?,
                None => DEFAULT_PORT,
            },
        };

        let telemetry = TelemetryConfig {
            log_level: optional_var("APP_LOG_LEVEL")
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };

        Ok(Self {
            environment,
            server,
            telemetry,
            report: ReportConfig::from_env()?,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost {
                    value: self.host.clone(),
                    source,
                })?
        };

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Workbook names and the default destination for generated reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub resident_sheet: String,
    pub output_sheet: String,
    pub output_dir: PathBuf,
}

impl ReportConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            resident_sheet: sheet_name("ARREARS_RESIDENT_SHEET")?
                .unwrap_or(defaults.resident_sheet),
            output_sheet: sheet_name("ARREARS_OUTPUT_SHEET")?.unwrap_or(defaults.output_sheet),
            output_dir: optional_var("ARREARS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            resident_sheet: DEFAULT_RESIDENT_SHEET.to_string(),
            output_sheet: DEFAULT_OUTPUT_SHEET.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Sheet names are trimmed. A variable that is set but blank is an error.
fn sheet_name(variable: &'static str) -> Result<Option<String>, ConfigError> {
    match optional_var(variable) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptySheetName { variable }),
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort {
        value: String,
    },
    InvalidHost {
        value: String,
        source: std::net::AddrParseError,
    },
    EmptySheetName {
        variable: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort { value } => {
                write!(f, "APP_PORT '{value}' is not a port number")
            }
            ConfigError::InvalidHost { value, .. } => {
                write!(f, "APP_HOST '{value}' is neither localhost nor an IP address")
            }
            ConfigError::EmptySheetName { variable } => {
                write!(f, "{variable} must not be blank when set")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source, .. } => Some(source),
            ConfigError::InvalidPort { .. } | ConfigError::EmptySheetName { .. } => None,
        }
    }
}
