//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::errors::{ConnectorError, Result};

/// Default ModernMT translate endpoint
pub const DEFAULT_TRANSLATE_URL: &str = "https://api.modernmt.com/translate";

/// Default ModernMT endpoint used to validate an API key
pub const DEFAULT_VALIDATE_URL: &str = "https://api.modernmt.com/users/me";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "MODERNMT";

fn default_translate_url() -> String {
    DEFAULT_TRANSLATE_URL.to_string()
}

fn default_validate_url() -> String {
    DEFAULT_VALIDATE_URL.to_string()
}

fn default_max_concurrent() -> usize {
    1
}

/// Provider configuration for one translator instance
///
/// Holds the id of the credential, never its value. Built once from defaults
/// plus overrides and not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Key-store id of the ModernMT API key; empty means not configured
    pub api_key_id: String,
    /// Endpoint receiving translate requests
    #[serde(default = "default_translate_url")]
    pub translate_url: String,
    /// Endpoint called by the availability check
    #[serde(default = "default_validate_url")]
    pub validate_url: String,
    /// Optional ModernMT domain per local language code
    pub domains: BTreeMap<String, String>,
    /// Request timeout; `None` keeps the transport default
    pub timeout_ms: Option<u64>,
    /// Fields of one job item translated in flight at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_id: String::new(),
            translate_url: default_translate_url(),
            validate_url: default_validate_url(),
            domains: BTreeMap::new(),
            timeout_ms: None,
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl ProviderConfig {
    /// Build a configuration with defaults and the given credential id
    pub fn with_api_key_id(api_key_id: impl Into<String>) -> Self {
        Self {
            api_key_id: api_key_id.into(),
            ..Default::default()
        }
    }

    /// Load configuration from defaults, an optional file and `MODERNMT_*`
    /// environment variables, in increasing priority.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Loading provider configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Return a copy with the credential id replaced
    pub fn override_api_key_id(self, api_key_id: impl Into<String>) -> Self {
        Self {
            api_key_id: api_key_id.into(),
            ..self
        }
    }

    /// Validate configuration
    ///
    /// An empty credential id is allowed here; it surfaces as "not configured"
    /// from the availability check instead.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("translate_url", &self.translate_url),
            ("validate_url", &self.validate_url),
        ] {
            if url.is_empty() {
                return Err(ConnectorError::ConfigError {
                    message: format!("{} is required", name),
                });
            }
            reqwest::Url::parse(url).map_err(|e| ConnectorError::ConfigError {
                message: format!("{} is not a valid URL: {}", name, e),
            })?;
        }

        if self.max_concurrent == 0 {
            return Err(ConnectorError::ConfigError {
                message: "max_concurrent must be greater than 0".to_string(),
            });
        }

        if self.api_key_id.is_empty() {
            warn!("No ModernMT API key selected");
        }

        Ok(())
    }

    /// Whether a credential has been selected
    pub fn is_configured(&self) -> bool {
        !self.api_key_id.is_empty()
    }

    /// Domain configured for a local language, if any
    pub fn domain_for(&self, langcode: &str) -> Option<&str> {
        self.domains
            .get(langcode)
            .map(String::as_str)
            .filter(|domain| !domain.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.api_key_id, "");
        assert_eq!(config.translate_url, "https://api.modernmt.com/translate");
        assert_eq!(config.validate_url, "https://api.modernmt.com/users/me");
        assert_eq!(config.max_concurrent, 1);
        assert!(config.timeout_ms.is_none());
        assert!(!config.is_configured());
        assert_ok!(config.validate());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"api_key_id": "modernmt"}"#).unwrap();

        assert_eq!(config.api_key_id, "modernmt");
        assert_eq!(config.translate_url, DEFAULT_TRANSLATE_URL);
        assert_eq!(config.validate_url, DEFAULT_VALIDATE_URL);
        assert!(config.is_configured());
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let config = ProviderConfig {
            translate_url: String::new(),
            ..Default::default()
        };
        assert_err!(config.validate());

        let config = ProviderConfig {
            validate_url: "not a url".to_string(),
            ..Default::default()
        };
        assert_err!(config.validate());

        let config = ProviderConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert_err!(config.validate());
    }

    #[test]
    fn test_domain_lookup() {
        let mut config = ProviderConfig::with_api_key_id("modernmt");
        config.domains.insert("de".to_string(), "legal".to_string());
        config.domains.insert("fr".to_string(), String::new());

        assert_eq!(config.domain_for("de"), Some("legal"));
        assert_eq!(config.domain_for("fr"), None);
        assert_eq!(config.domain_for("it"), None);
    }

    #[test]
    fn test_load_numeric_settings_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"api_key_id": "modernmt", "timeout_ms": 5000, "max_concurrent": 4}}"#
        )
        .unwrap();

        let config = assert_ok!(ProviderConfig::load(Some(file.path())));
        assert_eq!(config.timeout_ms, Some(5000));
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.translate_url, DEFAULT_TRANSLATE_URL);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"api_key_id": "from_file", "translate_url": "https://mmt.example.com/translate"}}"#
        )
        .unwrap();

        let config = assert_ok!(ProviderConfig::load(Some(file.path())));
        assert_eq!(config.api_key_id, "from_file");
        assert_eq!(config.translate_url, "https://mmt.example.com/translate");
        assert_eq!(config.validate_url, DEFAULT_VALIDATE_URL);
    }

    #[test]
    fn test_override_api_key_id() {
        let config = ProviderConfig::default().override_api_key_id("cli_key");
        assert_eq!(config.api_key_id, "cli_key");
        assert_eq!(config.translate_url, DEFAULT_TRANSLATE_URL);
    }
}
