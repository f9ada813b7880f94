//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Deployment environment. Decides how a missing or bad key is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    /// Refuse to start without a valid key.
    Production,
    /// Warn and run with an ephemeral key.
    Development,
}

/// Key material as read from the environment. Never printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// The secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Validated vault service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// 32-byte field key, as 64 hex characters or 32 raw bytes.
    /// **Required** in production.
    #[serde(default)]
    pub encryption_key: Option<SecretString>,

    /// `production` or `development`.
    #[serde(default = "default_app_env")]
    pub app_env: AppEnv,

    /// YAML or JSON fields file. The built-in clinic map is used when unset.
    #[serde(default)]
    pub fields_path: Option<PathBuf>,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// OTLP collector endpoint. Spans are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_app_env() -> AppEnv {
    AppEnv::Production
}
fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The configured key, if any.
    pub fn encryption_key(&self) -> Option<&str> {
        self.encryption_key.as_ref().map(SecretString::expose)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("LOG_LEVEL must not be empty");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            if endpoint.trim().is_empty() {
                anyhow::bail!("OTEL_EXPORTER_OTLP_ENDPOINT must not be empty when set");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            encryption_key: Some(SecretString("ab".repeat(32))),
            app_env: default_app_env(),
            fields_path: None,
            listen_port: default_listen_port(),
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_app_env(), AppEnv::Production);
        assert_eq!(default_listen_port(), 8080);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_port() {
        let cfg = Config {
            listen_port: 0,
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_otel_endpoint() {
        let cfg = Config {
            otel_exporter_otlp_endpoint: Some("  ".into()),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn key_is_redacted_in_debug() {
        let dbg = format!("{:?}", base());
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("abab"));
    }

    #[test]
    fn app_env_parses_lowercase() {
        let env: AppEnv = serde_json::from_str(r#""development""#).unwrap();
        assert_eq!(env, AppEnv::Development);
    }
}
