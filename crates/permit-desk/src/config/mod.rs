use std::env;
use std::fmt;

/// Distinguishes runtime behavior for different stages of the desk.
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

/// Top-level configuration for the desk.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    /// Row cap for the audit log listing.
    pub audit_limit: u32,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("DESK_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let port = env::var("DESK_DB_PORT")
            .unwrap_or_else(|_| "5432".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database = DatabaseConfig {
            url: env::var("DESK_DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            host: env::var("DESK_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port,
            user: env::var("DESK_DB_USER").unwrap_or_else(|_| "permit".to_string()),
            password: env::var("DESK_DB_PASSWORD").unwrap_or_default(),
            name: env::var("DESK_DB_NAME").unwrap_or_else(|_| "permit_db".to_string()),
        };

        let audit_limit = env::var("DESK_AUDIT_LIMIT")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<u32>()
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or(ConfigError::InvalidAuditLimit)?;

        let log_level = env::var("DESK_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());

        Ok(Self {
            environment,
            database,
            telemetry: TelemetryConfig { log_level },
            audit_limit,
        })
    }
}

/// Where the single database connection goes.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let credentials = if self.password.is_empty() {
            self.user.clone()
        } else {
            format!("{}:{}", self.user, self.password)
        };
        format!(
            "postgres://{credentials}@{}:{}/{}",
            self.host, self.port, self.name
        )
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidAuditLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "DESK_DB_PORT must be a valid u16"),
            ConfigError::InvalidAuditLimit => {
                write!(f, "DESK_AUDIT_LIMIT must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
