// src/config/mod.rs
// Layered settings: defaults, config file, environment, command line

pub mod env;
pub mod file;

pub use env::{ApiKeys, ConfigValidation, EnvConfig};
pub use file::FileConfig;

use crate::agent::AgentConfig;
use crate::engines::Tables;
use crate::error::{FixFastError, Result};
use crate::llm::Provider;
use crate::llm::http_client::DEFAULT_REQUEST_TIMEOUT_SECS;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Values given on the command line; they win over every other layer
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_rounds: Option<u32>,
    pub tables: Option<PathBuf>,
}

/// Fully resolved settings for one process
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub request_timeout: Duration,
    pub agent: AgentConfig,
    pub tables_path: Option<PathBuf>,
    pub api_keys: ApiKeys,
}

impl Settings {
    /// Read ~/.fixfast/config.toml and the environment, then apply overrides
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let env = EnvConfig::load();
        for warning in env.validate().warnings {
            warn!("{}", warning);
        }
        Self::resolve(FileConfig::load(), env, overrides)
    }

    pub fn resolve(file: FileConfig, env: EnvConfig, overrides: &Overrides) -> Result<Self> {
        let provider = match overrides
            .provider
            .as_deref()
            .or(env.provider.as_deref())
            .or(file.llm.provider.as_deref())
        {
            Some(name) => Provider::from_str(name).ok_or_else(|| {
                FixFastError::Configuration(format!(
                    "unknown provider '{}' (expected anthropic, openai or deepseek)",
                    name
                ))
            })?,
            None => Provider::default(),
        };

        let model = overrides
            .model
            .clone()
            .or(env.model)
            .or(file.llm.model)
            .unwrap_or_else(|| provider.default_model().to_string());

        let defaults = AgentConfig::default();
        let agent = AgentConfig {
            max_rounds: overrides
                .max_rounds
                .or(env.max_rounds)
                .or(file.agent.max_rounds)
                .unwrap_or(defaults.max_rounds),
            call_timeout: file
                .agent
                .call_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
        };

        let settings = Self {
            provider,
            model,
            base_url: env.base_url.or(file.llm.base_url),
            max_tokens: file.llm.max_tokens,
            request_timeout: Duration::from_secs(
                file.llm
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            agent,
            tables_path: overrides.tables.clone().or(env.tables).or(file.tables.path),
            api_keys: env.api_keys,
        };
        debug!(
            provider = %settings.provider,
            model = %settings.model,
            max_rounds = settings.agent.max_rounds,
            tables = ?settings.tables_path,
            "Resolved settings"
        );
        Ok(settings)
    }

    /// Credential for the selected provider
    pub fn api_key(&self) -> Result<&str> {
        self.api_keys.key_for(self.provider).ok_or_else(|| {
            FixFastError::Configuration(format!(
                "{} is not set (required for provider {})",
                self.provider.api_key_env_var(),
                self.provider
            ))
        })
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();
        if self.api_key().is_err() {
            validation.add_error(format!(
                "No API key for provider {}. Set {}.",
                self.provider,
                self.provider.api_key_env_var()
            ));
        }
        if self.agent.call_timeout.is_zero() {
            validation.add_error("agent.call_timeout_secs must be greater than zero");
        }
        if self.agent.max_rounds == 0 {
            validation.add_warning("max_rounds is 0; the tool loop is unbounded");
        }
        validation
    }

    /// Built-in tables unless a tables file was configured
    pub fn load_tables(&self) -> Result<Arc<Tables>> {
        match self.tables_path {
            Some(ref path) => Ok(Arc::new(Tables::load(path)?)),
            None => Ok(Tables::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with_key(provider: Provider) -> EnvConfig {
        let mut env = EnvConfig::default();
        match provider {
            Provider::Anthropic => env.api_keys.anthropic = Some("sk-ant".into()),
            Provider::OpenAi => env.api_keys.openai = Some("sk-oai".into()),
            Provider::DeepSeek => env.api_keys.deepseek = Some("sk-ds".into()),
        }
        env
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(
            FileConfig::default(),
            env_with_key(Provider::Anthropic),
            &Overrides::default(),
        )
        .unwrap();
        assert_eq!(settings.provider, Provider::Anthropic);
        assert_eq!(settings.model, Provider::Anthropic.default_model());
        assert_eq!(settings.agent, AgentConfig::default());
        assert_eq!(settings.api_key().unwrap(), "sk-ant");
        assert!(settings.validate().is_valid());
    }

    #[test]
    fn test_layer_precedence() {
        let mut file = FileConfig::default();
        file.llm.provider = Some("openai".into());
        file.llm.model = Some("file-model".into());
        file.agent.max_rounds = Some(3);
        file.agent.call_timeout_secs = Some(60);

        let mut env = env_with_key(Provider::DeepSeek);
        env.provider = Some("deepseek".into());
        env.max_rounds = Some(5);

        let settings = Settings::resolve(file.clone(), env.clone(), &Overrides::default()).unwrap();
        assert_eq!(settings.provider, Provider::DeepSeek);
        assert_eq!(settings.model, "file-model");
        assert_eq!(settings.agent.max_rounds, 5);
        assert_eq!(settings.agent.call_timeout, Duration::from_secs(60));

        let overrides = Overrides {
            model: Some("cli-model".into()),
            max_rounds: Some(0),
            ..Default::default()
        };
        let settings = Settings::resolve(file, env, &overrides).unwrap();
        assert_eq!(settings.model, "cli-model");
        assert_eq!(settings.agent.max_rounds, 0);
        assert_eq!(settings.validate().warnings.len(), 1);
    }

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let overrides = Overrides {
            provider: Some("gemini".into()),
            ..Default::default()
        };
        let err = Settings::resolve(FileConfig::default(), EnvConfig::default(), &overrides)
            .unwrap_err();
        assert!(matches!(err, FixFastError::Configuration(_)));
    }

    #[test]
    fn test_missing_key_for_selected_provider() {
        let overrides = Overrides {
            provider: Some("openai".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(
            FileConfig::default(),
            env_with_key(Provider::Anthropic),
            &overrides,
        )
        .unwrap();
        let err = settings.api_key().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(!settings.validate().is_valid());
    }

    #[test]
    fn test_load_tables_builtin_and_file() {
        let settings = Settings::resolve(
            FileConfig::default(),
            EnvConfig::default(),
            &Overrides::default(),
        )
        .unwrap();
        assert_eq!(*settings.load_tables().unwrap(), Tables::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.toml");
        std::fs::write(&path, "[cost]\ndefault_multiplier = 7\n").unwrap();
        let overrides = Overrides {
            tables: Some(path),
            ..Default::default()
        };
        let settings =
            Settings::resolve(FileConfig::default(), EnvConfig::default(), &overrides).unwrap();
        assert_eq!(settings.load_tables().unwrap().cost.default_multiplier, 7);
    }

    #[test]
    fn test_missing_tables_file_is_error() {
        let overrides = Overrides {
            tables: Some(PathBuf::from("/nonexistent/fixfast/tables.toml")),
            ..Default::default()
        };
        let settings =
            Settings::resolve(FileConfig::default(), EnvConfig::default(), &overrides).unwrap();
        assert!(settings.load_tables().is_err());
    }
}
