use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, default_config_path};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_RESOLVER_MODEL: &str = "gpt-4o";
pub const DEFAULT_SYSTEM_PROMPT: &str = "Answer the user's question.";

/// Settings for both the `serve` and `chat` commands.
///
/// Sources, later ones winning: built-in defaults, the TOML file,
/// environment variables, command-line flags (applied by the binary).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of a running `chattree serve`.
    pub server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub resolver_model: String,
    pub max_output_tokens: u32,
    /// Model calls per operation while the output stays empty.
    pub max_attempts: u32,
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            resolver_model: DEFAULT_RESOLVER_MODEL.to_string(),
            max_output_tokens: 800,
            max_attempts: 5,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_default_location(default_config_path())?,
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// The default file is optional, and so is a home directory to find it in.
    fn from_default_location(path: Result<PathBuf>) -> Result<Self> {
        match path {
            Ok(path) if path.exists() => Self::from_file(&path),
            Ok(_) | Err(Error::MissingUserConfigDir) => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from environment-style lookups. Empty values are
    /// ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(api_key);
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(bind) = var("CHATTREE_BIND") {
            self.server.bind = bind;
        }
        if let Some(server_url) = var("CHATTREE_SERVER_URL") {
            self.client.server_url = server_url;
        }
        if let Some(model) = var("CHATTREE_CHAT_MODEL") {
            self.llm.chat_model = model;
        }
        if let Some(model) = var("CHATTREE_RESOLVER_MODEL") {
            self.llm.resolver_model = model;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nchat_model = \"gpt-4.1\"\nmax_attempts = 2\n\n[server]\nbind = \"0.0.0.0:9000\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.llm.chat_model, "gpt-4.1");
        assert_eq!(config.llm.max_attempts, 2);
        assert_eq!(config.llm.resolver_model, DEFAULT_RESOLVER_MODEL);
        assert_eq!(config.llm.max_output_tokens, 800);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.client, ClientConfig::default());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nchat_model = 3").unwrap();

        let err = Config::from_file(&path).unwrap_err();

        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn unresolvable_config_dir_falls_back_to_defaults() {
        let config = Config::from_default_location(Err(Error::MissingUserConfigDir)).unwrap();
        assert_eq!(config, Config::default());

        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_default_location(Ok(dir.path().join("config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn environment_overrides_file_values() {
        let env = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("CHATTREE_SERVER_URL", "http://backend:8080"),
            ("CHATTREE_RESOLVER_MODEL", ""),
        ]);
        let mut config = Config::default();

        config.apply_env(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.client.server_url, "http://backend:8080");
        assert_eq!(config.llm.resolver_model, DEFAULT_RESOLVER_MODEL);
        assert_eq!(config.server.bind, DEFAULT_BIND);
    }
}
