//! Configuration parsing and structures

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::credential::{scopes, StrategyKind};
use crate::env::substitute_env_vars;

/// Well-known file names inside the credentials directory, one per
/// strategy's static input. Persisted credential blob names live on
/// [`StrategyKind::token_file_name`].
pub const CLIENT_SECRETS_FILE: &str = "client_secrets.json";
pub const API_KEY_FILE: &str = "api_key.txt";
pub const SERVICE_ACCOUNT_FILE: &str = "service_account.json";

// =============================================================================
// Raw Config (Deserialized from YAML)
// =============================================================================

/// Raw configuration as deserialized from YAML.
/// This is converted to `Config` via `resolve()`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory holding strategy inputs and persisted credentials
    pub credentials_dir: PathBuf,

    /// Authentication behavior
    #[serde(default)]
    pub auth: RawAuthConfig,

    /// API endpoint overrides
    #[serde(default)]
    pub api: ApiEndpoints,
}

/// Auth section before defaults are applied
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAuthConfig {
    /// Strategy selection: "auto" or one explicit strategy
    #[serde(default)]
    pub method: AuthMethod,

    /// Scopes to request from strategies that can grant any subset
    pub scopes: Option<Vec<String>>,

    /// Interactive consent variant for delegated authorization
    #[serde(default)]
    pub consent: ConsentMode,

    /// Loopback port for the callback consent listener
    pub callback_port: Option<u16>,

    /// Inline API key (usually injected via `${VAR}` substitution)
    pub api_key: Option<String>,

    /// External deadline for the whole resolution, including any
    /// interactive wait
    #[serde(default, with = "humantime_serde")]
    pub resolve_timeout: Option<Duration>,
}

/// Strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Try strategies in preference order, first success wins
    #[default]
    Auto,
    Delegated,
    StaticKey,
    ServiceIdentity,
}

impl AuthMethod {
    /// The ordered strategy list this selection resolves with.
    pub fn strategy_order(&self) -> Vec<StrategyKind> {
        match self {
            AuthMethod::Auto => StrategyKind::AUTO_ORDER.to_vec(),
            AuthMethod::Delegated => vec![StrategyKind::Delegated],
            AuthMethod::StaticKey => vec![StrategyKind::StaticKey],
            AuthMethod::ServiceIdentity => vec![StrategyKind::ServiceIdentity],
        }
    }
}

/// Interactive consent variants for delegated authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMode {
    /// Loopback listener receives the redirect
    #[default]
    Callback,
    /// User pastes the code by hand
    Manual,
}

/// API endpoint overrides; unset fields use the platform's public
/// endpoints.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApiEndpoints {
    pub data: Option<String>,
    pub analytics: Option<String>,
    pub upload: Option<String>,
}

// =============================================================================
// Resolved Config (Ready for use)
// =============================================================================

/// Top-level configuration (resolved from RawConfig)
#[derive(Debug, Clone)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Directory holding strategy inputs and persisted credentials
    pub credentials_dir: PathBuf,

    /// Authentication behavior (fully resolved)
    pub auth: AuthConfig,

    /// API endpoint overrides
    pub api: ApiEndpoints,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Auth section with defaults applied
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub method: AuthMethod,
    pub scopes: Vec<String>,
    pub consent: ConsentMode,
    pub callback_port: u16,
    pub api_key: Option<String>,
    pub resolve_timeout: Option<Duration>,
}

const DEFAULT_CALLBACK_PORT: u16 = 8080;

// =============================================================================
// Resolution Logic
// =============================================================================

impl RawConfig {
    /// Resolve raw config into final config by applying defaults
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let RawConfig {
            logging,
            credentials_dir,
            auth,
            api,
        } = self;

        let scopes = auth.scopes.unwrap_or_else(scopes::full);
        let resolved_auth = AuthConfig {
            method: auth.method,
            scopes,
            consent: auth.consent,
            callback_port: auth.callback_port.unwrap_or(DEFAULT_CALLBACK_PORT),
            api_key: auth.api_key.filter(|k| !k.trim().is_empty()),
            resolve_timeout: auth.resolve_timeout,
        };

        Ok(Config {
            logging,
            credentials_dir,
            auth: resolved_auth,
            api,
        })
    }
}

impl Config {
    /// Load configuration from a YAML file, applying environment variable
    /// substitution to the raw text first
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.clone(), e.to_string()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let substituted = substitute_env_vars(content)?;
        let raw: RawConfig = serde_yaml::from_str(&substituted)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        raw.resolve()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "credentials_dir cannot be empty".to_string(),
            ));
        }

        if self.auth.scopes.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.scopes cannot be an empty list".to_string(),
            ));
        }

        if self.auth.consent == ConsentMode::Callback && self.auth.callback_port == 0 {
            return Err(ConfigError::ValidationError(
                "auth.callback_port must be a fixed port for the callback consent flow"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Path to the delegated-authorization app descriptor.
    pub fn client_secrets_path(&self) -> PathBuf {
        self.credentials_dir.join(CLIENT_SECRETS_FILE)
    }

    /// Path to the static key value.
    pub fn api_key_path(&self) -> PathBuf {
        self.credentials_dir.join(API_KEY_FILE)
    }

    /// Path to the service-identity key file.
    pub fn service_account_path(&self) -> PathBuf {
        self.credentials_dir.join(SERVICE_ACCOUNT_FILE)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let yaml = r#"
credentials_dir: ./configs
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.auth.method, AuthMethod::Auto);
        assert_eq!(config.auth.consent, ConsentMode::Callback);
        assert_eq!(config.auth.callback_port, 8080);
        assert_eq!(config.auth.scopes, scopes::full());
        assert!(config.auth.api_key.is_none());
        assert!(config.auth.resolve_timeout.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_full_config_overrides() {
        let yaml = r#"
logging:
  level: debug

credentials_dir: /etc/yt-session

auth:
  method: service_identity
  consent: manual
  callback_port: 9090
  scopes:
    - "https://www.googleapis.com/auth/youtube.readonly"
  resolve_timeout: 5m

api:
  data: "http://localhost:4000/youtube/v3"
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.auth.method, AuthMethod::ServiceIdentity);
        assert_eq!(config.auth.consent, ConsentMode::Manual);
        assert_eq!(config.auth.callback_port, 9090);
        assert_eq!(config.auth.scopes.len(), 1);
        assert_eq!(
            config.auth.resolve_timeout,
            Some(Duration::from_secs(300))
        );
        assert_eq!(
            config.api.data.as_deref(),
            Some("http://localhost:4000/youtube/v3")
        );
    }

    #[test]
    fn test_api_key_env_substitution() {
        std::env::set_var("YTS_CONFIG_TEST_KEY", "key-from-env");
        let yaml = r#"
credentials_dir: ./configs
auth:
  method: static_key
  api_key: "${YTS_CONFIG_TEST_KEY}"
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.auth.api_key.as_deref(), Some("key-from-env"));
        std::env::remove_var("YTS_CONFIG_TEST_KEY");
    }

    #[test]
    fn test_blank_api_key_treated_as_absent() {
        std::env::remove_var("YTS_CONFIG_TEST_ABSENT");
        let yaml = r#"
credentials_dir: ./configs
auth:
  api_key: "${YTS_CONFIG_TEST_ABSENT:-}"
"#;
        let config = Config::from_str(yaml).unwrap();
        assert!(config.auth.api_key.is_none());
    }

    #[test]
    fn test_method_strategy_order() {
        assert_eq!(
            AuthMethod::Auto.strategy_order(),
            vec![
                StrategyKind::Delegated,
                StrategyKind::StaticKey,
                StrategyKind::ServiceIdentity,
            ]
        );
        assert_eq!(
            AuthMethod::StaticKey.strategy_order(),
            vec![StrategyKind::StaticKey]
        );
    }

    #[test]
    fn test_empty_scope_list_rejected() {
        let yaml = r#"
credentials_dir: ./configs
auth:
  scopes: []
"#;
        let config = Config::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_callback_consent_requires_fixed_port() {
        let yaml = r#"
credentials_dir: ./configs
auth:
  callback_port: 0
"#;
        let config = Config::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("callback_port"));
    }

    #[test]
    fn test_well_known_paths() {
        let yaml = "credentials_dir: /data/creds\n";
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(
            config.client_secrets_path(),
            PathBuf::from("/data/creds/client_secrets.json")
        );
        assert_eq!(
            config.api_key_path(),
            PathBuf::from("/data/creds/api_key.txt")
        );
        assert_eq!(
            config.service_account_path(),
            PathBuf::from("/data/creds/service_account.json")
        );
    }
}
