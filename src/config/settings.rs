//! Application settings and configuration
//!
//! This module provides configuration management for the application,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

/// Application environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("Invalid environment: {}. Expected: development, staging, or production", s),
        }
    }
}

/// Database engine behind both endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    MySql,
    Sqlite,
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseBackend::MySql => write!(f, "mysql"),
            DatabaseBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseBackend::MySql),
            "sqlite" => Ok(DatabaseBackend::Sqlite),
            _ => anyhow::bail!("Invalid database backend: {}. Expected: mysql or sqlite", s),
        }
    }
}

/// Connection target for one logical database endpoint.
///
/// For the sqlite backend `database` is the path of the database file and
/// the remaining fields are ignored.
#[derive(Clone, Deserialize, Serialize)]
pub struct DatabaseEndpoint {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl DatabaseEndpoint {
    /// Load an endpoint from `DB_<PREFIX>_*` variables
    fn from_env(prefix: &str) -> Result<Self> {
        let var = |name: &str| format!("DB_{}_{}", prefix, name);

        Ok(Self {
            host: env_or_default(&var("HOST"), "localhost"),
            port: env_or_default(&var("PORT"), "3306")
                .parse()
                .with_context(|| format!("Invalid {} value", var("PORT")))?,
            database: env_or_default(&var("NAME"), "cloudsolver"),
            user: env_or_default(&var("USER"), "root"),
            password: env::var(var("PASSWORD")).unwrap_or_default(),
        })
    }
}

impl Default for DatabaseEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: "cloudsolver".to_string(),
            user: "root".to_string(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for DatabaseEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Database configuration: read replica, write primary and pool limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    pub backend: DatabaseBackend,
    pub read: DatabaseEndpoint,
    pub write: DatabaseEndpoint,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub statement_timeout_seconds: u64,
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_seconds)
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::MySql,
            read: DatabaseEndpoint::default(),
            write: DatabaseEndpoint::default(),
            max_connections: 10,
            acquire_timeout_seconds: 5,
            statement_timeout_seconds: 10,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,

    // Database endpoints
    pub database: DatabaseSettings,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        let settings = Self {
            app_name: env_or_default("APP_NAME", "monitor-api"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "8000")
                .parse()
                .context("Invalid PORT value")?,
            request_timeout_seconds: env_or_default("REQUEST_TIMEOUT_SECONDS", "30")
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECONDS value")?,

            database: DatabaseSettings {
                backend: env_or_default("DB_BACKEND", "mysql").parse()?,
                read: DatabaseEndpoint::from_env("READ")?,
                write: DatabaseEndpoint::from_env("WRITE")?,
                max_connections: env_or_default("DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .context("Invalid DB_MAX_CONNECTIONS value")?,
                acquire_timeout_seconds: env_or_default("DB_ACQUIRE_TIMEOUT_SECONDS", "5")
                    .parse()
                    .context("Invalid DB_ACQUIRE_TIMEOUT_SECONDS value")?,
                statement_timeout_seconds: env_or_default("DB_STATEMENT_TIMEOUT_SECONDS", "10")
                    .parse()
                    .context("Invalid DB_STATEMENT_TIMEOUT_SECONDS value")?,
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.request_timeout_seconds == 0 {
            anyhow::bail!("Request timeout must be > 0");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be > 0");
        }

        if self.database.statement_timeout_seconds == 0 {
            anyhow::bail!("Database statement timeout must be > 0");
        }

        if self.database.backend == DatabaseBackend::Sqlite && self.is_production() {
            tracing::warn!("Running in production against the sqlite backend!");
        }

        if self.database.write.password.is_empty() && self.database.backend == DatabaseBackend::MySql {
            tracing::warn!("Write endpoint configured without a password");
        }

        Ok(())
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "monitor-api".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_seconds: 30,
            database: DatabaseSettings::default(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "monitor-api");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.database.backend, DatabaseBackend::MySql);
        assert_eq!(settings.database.read.database, "cloudsolver");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("MySQL".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::MySql);
        assert_eq!("sqlite".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::Sqlite);
        assert!("postgres".parse::<DatabaseBackend>().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut settings = Settings::default();
        settings.port = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.database.max_connections = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.database.statement_timeout_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let endpoint = DatabaseEndpoint {
            password: "hunter2".to_string(),
            ..DatabaseEndpoint::default()
        };
        let debug = format!("{:?}", endpoint);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));

        let json = serde_json::to_string(&endpoint).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8000");
    }
}
