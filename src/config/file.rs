// src/config/file.rs
// File-based configuration from ~/.fixfast/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Top-level config structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub tables: TablesSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LlmSection {
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Override the provider endpoint (proxies, compatible servers)
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentSection {
    /// Tool rounds before a final answer is forced; 0 disables the cap
    pub max_rounds: Option<u32>,
    pub call_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TablesSection {
    /// TOML file overriding the built-in lookup tables
    pub path: Option<PathBuf>,
}

impl FileConfig {
    /// Load config from ~/.fixfast/config.toml
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Missing or unparseable files fall back to defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config from file");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fixfast")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[llm]
provider = "deepseek"
model = "deepseek-reasoner"
max_tokens = 4096

[agent]
max_rounds = 6

[tables]
path = "/opt/fixfast/tables.toml"
"#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.llm.provider.as_deref(), Some("deepseek"));
        assert_eq!(config.llm.max_tokens, Some(4096));
        assert_eq!(config.agent.max_rounds, Some(6));
        assert!(config.agent.call_timeout_secs.is_none());
        assert_eq!(
            config.tables.path,
            Some(PathBuf::from("/opt/fixfast/tables.toml"))
        );
    }

    #[test]
    fn test_parse_empty_config() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::load_from(&dir.path().join("absent.toml"));
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm\nprovider = ").unwrap();
        let config = FileConfig::load_from(file.path());
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\ncall_timeout_secs = 45").unwrap();
        let config = FileConfig::load_from(file.path());
        assert_eq!(config.agent.call_timeout_secs, Some(45));
    }
}
