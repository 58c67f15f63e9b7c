use std::env;
use std::path::Path;

use chrono::Duration;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::AuthConfig;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT signing secret (minimum 32 characters)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub jwt_expiration: i64,

    /// Refresh token lifetime in seconds
    pub refresh_token_expiration: i64,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated list of allowed CORS origins. Unset means
    /// permissive CORS, which is rejected outside development.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl AppConfig {
    /// Creates a new configuration (used by tests and embedded setups)
    pub fn new(database_url: String, jwt_secret: String) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration: 1800,
            refresh_token_expiration: 604_800,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Token issuance parameters derived from this configuration.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            issuer: "storefront-api".to_string(),
            audience: "storefront-clients".to_string(),
            access_token_ttl: Duration::seconds(self.jwt_expiration),
            refresh_token_ttl: Duration::seconds(self.refresh_token_expiration),
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            errors.add(
                "jwt_secret",
                ValidationError::new("dev_secret_outside_development"),
            );
        }

        if self.is_production() && self.cors_allowed_origins.is_none() {
            errors.add(
                "cors_allowed_origins",
                ValidationError::new("cors_must_be_explicit_in_production"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("jwt_expiration", 1800)?
        .set_default("refresh_token_expiration", 604_800)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("auto_migrate", true)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // jwt_secret has no production default. Development falls back to a
    // fixed insecure secret so local runs work out of the box.
    let mut app_config: AppConfig = if config.get_string("jwt_secret").is_err() {
        if run_env == DEFAULT_ENV {
            warn!("JWT secret not configured; using the built-in development secret");
            let config = Config::builder()
                .add_source(config)
                .set_override("jwt_secret", DEV_DEFAULT_JWT_SECRET)?
                .build()?;
            config.try_deserialize()?
        } else {
            error!("JWT secret is not configured. Set APP__JWT_SECRET environment variable with a secure random string.");
            return Err(AppConfigError::Load(ConfigError::NotFound(
                "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                    .into(),
            )));
        }
    } else {
        config.try_deserialize()?
    };
    app_config.environment = run_env;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite://storefront.db?mode=memory".into(),
            "super_secure_jwt_secret_that_is_long_enough_123".into(),
        )
    }

    #[test]
    fn short_jwt_secret_fails_validation() {
        let mut config = base_config();
        config.jwt_secret = "short".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn dev_secret_rejected_outside_development() {
        let mut config = base_config();
        config.jwt_secret = DEV_DEFAULT_JWT_SECRET.into();
        config.environment = "production".into();
        config.cors_allowed_origins = Some("https://shop.example.com".into());
        assert!(config.validate_additional_constraints().is_err());

        config.environment = "development".into();
        assert!(config.validate_additional_constraints().is_ok());
    }

    #[test]
    fn production_requires_explicit_cors_origins() {
        let mut config = base_config();
        config.environment = "production".into();
        assert!(config.validate_additional_constraints().is_err());

        config.cors_allowed_origins = Some("https://shop.example.com".into());
        assert!(config.validate_additional_constraints().is_ok());
    }

    #[test]
    fn auth_config_uses_configured_lifetimes() {
        let config = base_config();
        let auth = config.auth_config();
        assert_eq!(auth.access_token_ttl, Duration::seconds(1800));
        assert_eq!(auth.refresh_token_ttl, Duration::seconds(604_800));
    }
}
