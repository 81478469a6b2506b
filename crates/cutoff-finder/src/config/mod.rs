use crate::admissions::{AdmissionYear, RankWindow, ViewCatalog, ViewConfig};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub data: DataConfig,
    pub views: ViewSettings,
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

        let data_dir = env::var("CUTOFF_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        let years = parse_years(
            &env::var("CUTOFF_YEARS").unwrap_or_else(|_| "2023,2024".to_string()),
        )?;

        let defaults = ViewSettings::default();
        let views = ViewSettings {
            look_back: read_margin("CUTOFF_LOOKBACK_MARGIN")?.unwrap_or(defaults.look_back),
            recommended_look_ahead: read_look_ahead(
                "CUTOFF_RECOMMENDED_LOOKAHEAD",
                defaults.recommended_look_ahead,
            )?,
            field_look_ahead: read_look_ahead("CUTOFF_FIELD_LOOKAHEAD", defaults.field_look_ahead)?,
            legacy_look_ahead: read_look_ahead(
                "CUTOFF_LEGACY_LOOKAHEAD",
                defaults.legacy_look_ahead,
            )?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            data: DataConfig {
                dir: PathBuf::from(data_dir),
                years,
            },
            views,
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

/// Where cutoff tables live and which counselling years are served.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub years: Vec<AdmissionYear>,
}

/// Rank margins for each view; `None` look-ahead means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    pub look_back: u32,
    pub recommended_look_ahead: Option<u32>,
    pub field_look_ahead: Option<u32>,
    pub legacy_look_ahead: Option<u32>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            look_back: RankWindow::DEFAULT_LOOK_BACK,
            recommended_look_ahead: Some(500),
            field_look_ahead: None,
            legacy_look_ahead: None,
        }
    }
}

impl ViewSettings {
    pub fn catalog(&self) -> ViewCatalog {
        ViewCatalog::new(vec![
            ViewConfig::all_recommended(RankWindow::new(
                self.look_back,
                self.recommended_look_ahead,
            )),
            ViewConfig::field_of_study(RankWindow::new(self.look_back, self.field_look_ahead)),
            ViewConfig::legacy_institutes(RankWindow::new(self.look_back, self.legacy_look_ahead)),
        ])
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidYears { value: String },
    InvalidMargin { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidYears { value } => write!(
                f,
                "CUTOFF_YEARS must be a comma-separated list of years, got '{}'",
                value
            ),
            ConfigError::InvalidMargin { variable, value } => write!(
                f,
                "{} must be a non-negative integer or 'unbounded', got '{}'",
                variable, value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidYears { .. }
            | ConfigError::InvalidMargin { .. } => None,
        }
    }
}

fn parse_years(raw: &str) -> Result<Vec<AdmissionYear>, ConfigError> {
    let invalid = || ConfigError::InvalidYears {
        value: raw.to_string(),
    };

    let mut years = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u16>().map(AdmissionYear).map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    if years.is_empty() {
        return Err(invalid());
    }
    years.sort();
    years.dedup();
    Ok(years)
}

fn read_margin(variable: &'static str) -> Result<Option<u32>, ConfigError> {
    match env::var(variable) {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidMargin { variable, value }),
        Err(_) => Ok(None),
    }
}

fn read_look_ahead(
    variable: &'static str,
    default: Option<u32>,
) -> Result<Option<u32>, ConfigError> {
    match env::var(variable) {
        Ok(value) => parse_look_ahead(&value)
            .ok_or_else(|| ConfigError::InvalidMargin { variable, value }),
        Err(_) => Ok(default),
    }
}

fn parse_look_ahead(value: &str) -> Option<Option<u32>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "unbounded" | "none" | "" => Some(None),
        other => other.parse::<u32>().ok().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::ViewKind;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for variable in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "CUTOFF_DATA_DIR",
            "CUTOFF_YEARS",
            "CUTOFF_LOOKBACK_MARGIN",
            "CUTOFF_RECOMMENDED_LOOKAHEAD",
            "CUTOFF_FIELD_LOOKAHEAD",
            "CUTOFF_LEGACY_LOOKAHEAD",
        ] {
            env::remove_var(variable);
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
        assert_eq!(config.data.dir, PathBuf::from("data"));
        assert_eq!(config.data.years, vec![AdmissionYear(2023), AdmissionYear(2024)]);
        assert_eq!(config.views, ViewSettings::default());
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
    fn look_ahead_overrides_flow_into_catalog() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CUTOFF_RECOMMENDED_LOOKAHEAD", "unbounded");
        env::set_var("CUTOFF_FIELD_LOOKAHEAD", "750");
        env::set_var("CUTOFF_LOOKBACK_MARGIN", "150");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        let catalog = config.views.catalog();
        let recommended = catalog.get(ViewKind::AllRecommended).expect("view present");
        assert_eq!(recommended.window, RankWindow::new(150, None));
        let field = catalog.get(ViewKind::FieldOfStudy).expect("view present");
        assert_eq!(field.window, RankWindow::new(150, Some(750)));
    }

    #[test]
    fn rejects_malformed_years_and_margins() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CUTOFF_YEARS", "2024,twenty");
        let years = AppConfig::load().expect_err("years rejected");
        assert!(matches!(years, ConfigError::InvalidYears { .. }));

        reset_env();
        env::set_var("CUTOFF_LEGACY_LOOKAHEAD", "-5");
        let margin = AppConfig::load().expect_err("margin rejected");
        assert!(margin.to_string().contains("CUTOFF_LEGACY_LOOKAHEAD"));
        reset_env();
    }

    #[test]
    fn parse_years_sorts_and_deduplicates() {
        let years = parse_years("2024, 2023,2024").expect("parses");
        assert_eq!(years, vec![AdmissionYear(2023), AdmissionYear(2024)]);
        assert!(parse_years(" , ").is_err());
    }
}
