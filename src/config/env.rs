// src/config/env.rs
// Environment-based configuration, every FIXFAST_* variable in one place

use crate::llm::Provider;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// API keys loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// ANTHROPIC_API_KEY
    pub anthropic: Option<String>,
    /// OPENAI_API_KEY
    pub openai: Option<String>,
    /// DEEPSEEK_API_KEY
    pub deepseek: Option<String>,
}

impl ApiKeys {
    /// Load keys through an arbitrary variable lookup, filtering empty values
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let read_key = |name: &str| lookup(name).filter(|k| !k.trim().is_empty());
        let keys = Self {
            anthropic: read_key(Provider::Anthropic.api_key_env_var()),
            openai: read_key(Provider::OpenAi.api_key_env_var()),
            deepseek: read_key(Provider::DeepSeek.api_key_env_var()),
        };
        keys.log_status();
        keys
    }

    pub fn key_for(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Anthropic => self.anthropic.as_deref(),
            Provider::OpenAi => self.openai.as_deref(),
            Provider::DeepSeek => self.deepseek.as_deref(),
        }
    }

    /// Log which API keys are available (without exposing values)
    fn log_status(&self) {
        let available = self.available();
        if available.is_empty() {
            warn!("No API keys configured - model calls will be unavailable");
        } else {
            debug!(keys = ?available, "API keys loaded");
        }
    }

    fn available(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.key_for(*p).is_some())
            .collect()
    }

    pub fn summary(&self) -> String {
        let providers: Vec<String> = self.available().iter().map(|p| p.to_string()).collect();
        if providers.is_empty() {
            "None".to_string()
        } else {
            providers.join(", ")
        }
    }
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Format as a human-readable report
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            for err in &self.errors {
                lines.push(format!("  - {}", err));
            }
        }

        if !self.warnings.is_empty() {
            lines.push("Warnings:".to_string());
            for warn in &self.warnings {
                lines.push(format!("  - {}", warn));
            }
        }

        if lines.is_empty() {
            "Configuration OK".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Environment configuration
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub api_keys: ApiKeys,
    /// FIXFAST_PROVIDER
    pub provider: Option<String>,
    /// FIXFAST_MODEL
    pub model: Option<String>,
    /// FIXFAST_BASE_URL
    pub base_url: Option<String>,
    /// FIXFAST_MAX_ROUNDS
    pub max_rounds: Option<u32>,
    /// FIXFAST_TABLES
    pub tables: Option<PathBuf>,
}

impl EnvConfig {
    /// Load all environment configuration (call once at startup)
    pub fn load() -> Self {
        info!("Loading environment configuration");
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_keys: ApiKeys::from_lookup(lookup),
            provider: read("FIXFAST_PROVIDER"),
            model: read("FIXFAST_MODEL"),
            base_url: read("FIXFAST_BASE_URL"),
            max_rounds: read("FIXFAST_MAX_ROUNDS").and_then(|v| parse_u32("FIXFAST_MAX_ROUNDS", &v)),
            tables: read("FIXFAST_TABLES").map(PathBuf::from),
        }
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        if self.api_keys.available().is_empty() {
            validation.add_warning(
                "No LLM API keys configured. Set ANTHROPIC_API_KEY, OPENAI_API_KEY or DEEPSEEK_API_KEY.",
            );
        }

        if let Some(ref provider) = self.provider
            && Provider::from_str(provider).is_none()
        {
            validation.add_warning(format!(
                "Unknown FIXFAST_PROVIDER '{}'. Valid options: anthropic, openai, deepseek",
                provider
            ));
        }

        validation
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_u32(name: &str, value: &str) -> Option<u32> {
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(variable = name, value = value, "Ignoring non-numeric value");
            None
        }
    }
}
