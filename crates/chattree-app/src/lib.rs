mod config;

use std::path::PathBuf;

use directories::ProjectDirs;

pub use config::{
    ClientConfig, Config, DEFAULT_BASE_URL, DEFAULT_BIND, DEFAULT_CHAT_MODEL, DEFAULT_RESOLVER_MODEL,
    DEFAULT_SERVER_URL, DEFAULT_SYSTEM_PROMPT, LlmConfig, ServerConfig,
};

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "chattree";
const APP_NAME: &str = "chattree";
const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve user config directory")]
    MissingUserConfigDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// App-local config directory.
pub fn user_config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .ok_or(Error::MissingUserConfigDir)?;
    Ok(dirs.config_dir().to_path_buf())
}

/// Where the config file is looked up when no path is given.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(user_config_dir()?.join(CONFIG_FILENAME))
}
