use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Server connection string; the path is replaced by `name` when connecting
    pub url: String,
    pub name: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_multiplier: f64,
    pub retry_max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub jwt_leeway_secs: u64,
    pub auth_cookie_name: String,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Days a soft-deleted account stays recoverable. Not configurable.
pub const ACCOUNT_GRACE_DAYS: i64 = 30;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/postgres";
const DEFAULT_DATABASE_NAME: &str = "bump_journal";
const DEVELOPMENT_JWT_SECRET: &str = "development-only-secret";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = v.parse().unwrap_or(self.database.min_connections);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_MS") {
            self.database.connect_timeout_ms = v.parse().unwrap_or(self.database.connect_timeout_ms);
        }
        if let Ok(v) = env::var("DATABASE_IDLE_TIMEOUT_MS") {
            self.database.idle_timeout_ms = v.parse().unwrap_or(self.database.idle_timeout_ms);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_MS") {
            self.database.acquire_timeout_ms = v.parse().unwrap_or(self.database.acquire_timeout_ms);
        }
        if let Ok(v) = env::var("DATABASE_MAX_RETRIES") {
            self.database.max_retries = v.parse().unwrap_or(self.database.max_retries);
        }
        if let Ok(v) = env::var("DATABASE_RETRY_BASE_DELAY_MS") {
            self.database.retry_base_delay_ms = v.parse().unwrap_or(self.database.retry_base_delay_ms);
        }
        if let Ok(v) = env::var("DATABASE_RETRY_MULTIPLIER") {
            self.database.retry_multiplier = v.parse().unwrap_or(self.database.retry_multiplier);
        }
        if let Ok(v) = env::var("DATABASE_RETRY_MAX_DELAY_MS") {
            self.database.retry_max_delay_ms = v.parse().unwrap_or(self.database.retry_max_delay_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_JWT_LEEWAY_SECS") {
            self.security.jwt_leeway_secs = v.parse().unwrap_or(self.security.jwt_leeway_secs);
        }
        if let Ok(v) = env::var("SECURITY_AUTH_COOKIE_NAME") {
            self.security.auth_cookie_name = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_SHUTDOWN_TIMEOUT_SECS") {
            self.server.shutdown_timeout_secs = v.parse().unwrap_or(self.server.shutdown_timeout_secs);
        }

        self
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError("JWT_SECRET must be set".to_string()));
        }
        if !matches!(self.environment, Environment::Development)
            && self.security.jwt_secret == DEVELOPMENT_JWT_SECRET
        {
            return Err(ConfigError::ValidationError(
                "JWT_SECRET must be overridden outside development".to_string(),
            ));
        }
        if self.database.name.is_empty() {
            return Err(ConfigError::ValidationError("DATABASE_NAME must not be empty".to_string()));
        }
        if self.database.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "DATABASE_MAX_RETRIES must be at least 1".to_string(),
            ));
        }
        if !(self.database.retry_multiplier >= 1.0) {
            return Err(ConfigError::ValidationError(
                "DATABASE_RETRY_MULTIPLIER must be at least 1".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::ValidationError(
                "DATABASE_MIN_CONNECTIONS exceeds DATABASE_MAX_CONNECTIONS".to_string(),
            ));
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                jwt_leeway_secs: 0,
                auth_cookie_name: "token".to_string(),
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            server: ServerConfig {
                port: 3000,
                shutdown_timeout_secs: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connect_timeout_ms: 10_000,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                jwt_leeway_secs: 0,
                auth_cookie_name: "token".to_string(),
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            server: ServerConfig {
                port: 3000,
                shutdown_timeout_secs: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                min_connections: 2,
                max_connections: 50,
                connect_timeout_ms: 5_000,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                jwt_leeway_secs: 0,
                auth_cookie_name: "token".to_string(),
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            server: ServerConfig {
                port: 3000,
                shutdown_timeout_secs: 10,
            },
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            name: DEFAULT_DATABASE_NAME.to_string(),
            min_connections: 0,
            max_connections: 10,
            connect_timeout_ms: 30_000,
            idle_timeout_ms: 600_000,
            acquire_timeout_ms: 5_000,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
            retry_multiplier: 2.0,
            retry_max_delay_ms: 10_000,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
