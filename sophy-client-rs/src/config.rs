//! Configuration for the completion client
//!
//! Values come from a `ConfigProvider`: environment variables in
//! production, an in-memory map in tests.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::invoker::RetryPolicy;
use crate::provider::Provider;

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String, ConfigError>;

    /// Get a parsed value, `default` when the key is absent, an error when it is malformed
    fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
        Self: Sized,
    {
        match self.get_string(key) {
            Ok(value) => value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }),
            Err(ConfigError::Missing(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }
}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    prefix: Option<String>,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    pub fn format_key(&self, key: &str) -> String {
        let key = key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_");
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key),
            None => key,
        }
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        let env_key = self.format_key(key);
        match env::var(&env_key) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            Ok(_) | Err(env::VarError::NotPresent) => Err(ConfigError::Missing(env_key)),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
                key: env_key,
                reason: "not valid unicode".to_string(),
            }),
        }
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }
}

/// Everything needed to build an invoker
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub provider: Provider,
    pub api_key: String,
    pub endpoint: String,
    /// Overrides every task's model when set
    pub default_model: Option<String>,
    pub max_attempts: u32,
    pub attempt_timeout_secs: u64,
    pub base_delay_ms: u64,
}

impl ClientConfig {
    /// Load from the `INKWELL_` environment, falling back to the provider's
    /// deployed secret name (`OPENAI_API_KEY` / `ANTHROPIC_API_KEY`) for the key.
    pub fn from_env() -> Result<Self, ConfigError> {
        let prefixed = EnvConfigProvider::new().with_prefix("INKWELL");
        let provider = prefixed.get_parsed_or("llm_provider", Provider::default())?;

        match prefixed.get_string("llm_api_key") {
            Ok(_) => Self::from_provider(&prefixed),
            Err(ConfigError::Missing(_)) => {
                let api_key = EnvConfigProvider::new()
                    .get_string(provider.api_key_var())
                    .map_err(|_| ConfigError::Missing(format!("INKWELL_LLM_API_KEY or {}", provider.api_key_var())))?;
                Self::build(&prefixed, provider, api_key)
            }
            Err(e) => Err(e),
        }
    }

    /// Load from any provider; `llm_api_key` is required
    pub fn from_provider<P: ConfigProvider>(provider: &P) -> Result<Self, ConfigError> {
        let llm = provider.get_parsed_or("llm_provider", Provider::default())?;
        let api_key = provider.get_string("llm_api_key")?;
        Self::build(provider, llm, api_key)
    }

    fn build<P: ConfigProvider>(source: &P, provider: Provider, api_key: String) -> Result<Self, ConfigError> {
        let defaults = RetryPolicy::default();
        let endpoint = source
            .get_string("llm_endpoint")
            .unwrap_or_else(|_| provider.default_endpoint().to_string());

        let config = Self {
            provider,
            api_key,
            endpoint,
            default_model: source.get_string("llm_model").ok(),
            max_attempts: source.get_parsed_or("llm_max_attempts", defaults.max_attempts)?,
            attempt_timeout_secs: source
                .get_parsed_or("llm_attempt_timeout_secs", defaults.attempt_timeout.as_secs())?,
            base_delay_ms: source.get_parsed_or("llm_base_delay_ms", defaults.base_delay.as_millis() as u64)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("llm_api_key".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "llm_endpoint".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "llm_max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.attempt_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "llm_attempt_timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}
