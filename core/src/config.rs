//! Client configuration.
//!
//! Loaded from TOML text, a TOML file, or environment variables. The
//! `taxcloud` section is optional; its presence alone decides whether cart
//! calculations go to TaxCloud.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::retry::RetryPolicy;
use crate::validation::validate_api_key;

pub const DEFAULT_BASE_URL: &str = "https://api.zip-tax.com";
pub const DEFAULT_TAXCLOUD_BASE_URL: &str = "https://api.v3.taxcloud.com";

/// TaxCloud credentials. Both values are required together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCloudCredentials {
    pub connection_id: Uuid,
    pub api_key: String,
}

impl fmt::Debug for TaxCloudCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaxCloudCredentials")
            .field("connection_id", &self.connection_id)
            .field("api_key", &"***")
            .finish()
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
    #[serde(default)]
    pub taxcloud: Option<TaxCloudCredentials>,
    #[serde(default = "default_taxcloud_base_url")]
    pub taxcloud_base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

fn default_taxcloud_base_url() -> String {
    DEFAULT_TAXCLOUD_BASE_URL.to_string()
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("taxcloud", &self.taxcloud)
            .field("taxcloud_base_url", &self.taxcloud_base_url)
            .finish()
    }
}

impl ClientConfig {
    /// Defaults for everything except the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            taxcloud: None,
            taxcloud_base_url: default_taxcloud_base_url(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_secs = retry_delay.as_secs_f64();
        self
    }

    pub fn with_taxcloud(mut self, connection_id: Uuid, api_key: impl Into<String>) -> Self {
        self.taxcloud = Some(TaxCloudCredentials {
            connection_id,
            api_key: api_key.into(),
        });
        self
    }

    pub fn with_taxcloud_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.taxcloud_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ApiError> {
        let mut config: ClientConfig = toml::from_str(raw)
            .map_err(|e| ApiError::Config(format!("invalid config: {e}")))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Build from `ZIPTAX_*` and `TAXCLOUD_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ZIPTAX_API_KEY")
            .ok_or_else(|| ApiError::Config("ZIPTAX_API_KEY is not set".into()))?;
        let mut config = ClientConfig::new(api_key);

        if let Some(url) = lookup("ZIPTAX_BASE_URL") {
            config.base_url = url;
        }
        if let Some(raw) = lookup("ZIPTAX_TIMEOUT_SECS") {
            config.timeout_secs = parse_env("ZIPTAX_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("ZIPTAX_MAX_RETRIES") {
            config.max_retries = parse_env("ZIPTAX_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("ZIPTAX_RETRY_DELAY_SECS") {
            config.retry_delay_secs = parse_env("ZIPTAX_RETRY_DELAY_SECS", &raw)?;
        }
        if let Some(url) = lookup("TAXCLOUD_BASE_URL") {
            config.taxcloud_base_url = url;
        }
        match (lookup("TAXCLOUD_CONNECTION_ID"), lookup("TAXCLOUD_API_KEY")) {
            (Some(id), Some(key)) => {
                let connection_id = parse_env("TAXCLOUD_CONNECTION_ID", &id)?;
                config.taxcloud = Some(TaxCloudCredentials {
                    connection_id,
                    api_key: key,
                });
            }
            (None, None) => {}
            _ => {
                return Err(ApiError::Config(
                    "TAXCLOUD_CONNECTION_ID and TAXCLOUD_API_KEY must be set together".into(),
                ))
            }
        }

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn normalize(&mut self) {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.taxcloud_base_url = self.taxcloud_base_url.trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_api_key(&self.api_key)?;
        if let Some(taxcloud) = &self.taxcloud {
            if taxcloud.api_key.is_empty() {
                return Err(ApiError::Config("TaxCloud API key cannot be empty".into()));
            }
        }
        if Duration::try_from_secs_f64(self.retry_delay_secs).is_err() {
            return Err(ApiError::Config(format!(
                "retry delay must be a non-negative, representable number of seconds, got {}",
                self.retry_delay_secs
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ApiError::Config(
                "timeout must be at least 1 second, got 0".into(),
            ));
        }
        Ok(())
    }

    /// True when TaxCloud credentials are present.
    pub fn has_taxcloud_config(&self) -> bool {
        self.taxcloud.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::try_from_secs_f64(self.retry_delay_secs.max(0.0)).unwrap_or(Duration::MAX),
        )
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ApiError>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ApiError::Config(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const KEY: &str = "test-api-key-1234567890";
    const CONNECTION: &str = "25eb9b97-5acb-492d-b720-c03e79cf715a";

    #[test]
    fn defaults() {
        let cfg = ClientConfig::new(KEY);
        assert_eq!(cfg.base_url, "https://api.zip-tax.com");
        assert_eq!(cfg.taxcloud_base_url, "https://api.v3.taxcloud.com");
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_retries, 3);
        assert!(!cfg.has_taxcloud_config());
        assert_eq!(cfg.retry_policy().base_delay, Duration::from_secs(1));
    }

    #[test]
    fn toml_minimal() {
        let cfg = ClientConfig::from_toml_str(&format!("api_key = \"{KEY}\"")).unwrap();
        assert_eq!(cfg.api_key, KEY);
        assert!(cfg.taxcloud.is_none());
    }

    #[test]
    fn toml_with_taxcloud_section() {
        let raw = format!(
            r#"
            api_key = "{KEY}"
            base_url = "http://localhost:3000/"
            max_retries = 5
            retry_delay_secs = 0.25

            [taxcloud]
            connection_id = "{CONNECTION}"
            api_key = "taxcloud-key-123"
            "#
        );
        let cfg = ClientConfig::from_toml_str(&raw).unwrap();
        assert_eq!(cfg.base_url, "http://localhost:3000");
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.retry_policy().base_delay, Duration::from_millis(250));
        assert!(cfg.has_taxcloud_config());
        assert_eq!(
            cfg.taxcloud.unwrap().connection_id.to_string(),
            CONNECTION
        );
    }

    #[test]
    fn toml_rejects_bad_connection_id() {
        let raw = format!(
            "api_key = \"{KEY}\"\n[taxcloud]\nconnection_id = \"not-a-uuid\"\napi_key = \"k\"\n"
        );
        assert!(matches!(
            ClientConfig::from_toml_str(&raw),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn short_api_key_is_rejected() {
        let err = ClientConfig::from_toml_str("api_key = \"short\"").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn env_lookup() {
        let vars: HashMap<&str, &str> = [
            ("ZIPTAX_API_KEY", KEY),
            ("ZIPTAX_MAX_RETRIES", "0"),
            ("ZIPTAX_TIMEOUT_SECS", "5"),
            ("TAXCLOUD_CONNECTION_ID", CONNECTION),
            ("TAXCLOUD_API_KEY", "taxcloud-key-123"),
        ]
        .into_iter()
        .collect();
        let cfg = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.max_retries, 0);
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
        assert!(cfg.has_taxcloud_config());
    }

    #[test]
    fn unrepresentable_retry_delay_is_rejected() {
        let raw = format!("api_key = \"{KEY}\"\nretry_delay_secs = 1e30");
        let err = ClientConfig::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));

        let raw = format!("api_key = \"{KEY}\"\nretry_delay_secs = -1.0");
        assert!(matches!(
            ClientConfig::from_toml_str(&raw),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn retry_policy_never_panics_on_unvalidated_delay() {
        let mut cfg = ClientConfig::new(KEY);
        cfg.retry_delay_secs = 1e30;
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.retry_policy().base_delay, Duration::MAX);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let raw = format!("api_key = \"{KEY}\"\ntimeout_secs = 0");
        let err = ClientConfig::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));

        let vars: HashMap<&str, &str> = [("ZIPTAX_API_KEY", KEY), ("ZIPTAX_TIMEOUT_SECS", "0")]
            .into_iter()
            .collect();
        let err = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn env_requires_both_taxcloud_values() {
        let vars: HashMap<&str, &str> =
            [("ZIPTAX_API_KEY", KEY), ("TAXCLOUD_API_KEY", "taxcloud-key-123")]
                .into_iter()
                .collect();
        let err = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn env_requires_api_key() {
        let err = ClientConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn debug_masks_keys() {
        let cfg = ClientConfig::new(KEY)
            .with_taxcloud(CONNECTION.parse().unwrap(), "taxcloud-secret-key");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains(KEY));
        assert!(!rendered.contains("taxcloud-secret-key"));
        assert!(rendered.contains(CONNECTION));
    }
}
