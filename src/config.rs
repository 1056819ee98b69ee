use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "http://api.opensubtitles.org/xml-rpc";
pub const DEFAULT_LANGUAGE: &str = "fr";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    endpoint: Option<String>,
    user_agent: Option<String>,
    username: Option<String>,
    password: Option<String>,
    login_language: Option<String>,
    language: Option<String>,
    timeout_secs: Option<u64>,
}

/// How to reach and authenticate against the subtitle catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub endpoint: String,
    pub user_agent: String,
    pub username: String,
    pub password: String,
    pub login_language: String,
    pub timeout_secs: Option<u64>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: "TemporaryUserAgent".to_string(),
            username: String::new(),
            password: String::new(),
            login_language: "en".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub catalog: CatalogSettings,
    /// Subtitle language used when none is given on the command line.
    pub language: String,
}

/// Environment variables win over the config file, which wins over defaults.
pub fn load_settings() -> Result<Settings> {
    let config_path = get_config_path();
    let file = if config_path.exists() {
        read_config_file(&config_path)?
    } else {
        ConfigFile::default()
    };
    Ok(resolve(file, |key| env::var(key).ok()))
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

fn resolve(file: ConfigFile, env_var: impl Fn(&str) -> Option<String>) -> Settings {
    let defaults = CatalogSettings::default();
    let pick = |key: &str, from_file: Option<String>, default: String| {
        env_var(key).or(from_file).unwrap_or(default)
    };

    Settings {
        catalog: CatalogSettings {
            endpoint: pick("SUBFETCH_ENDPOINT", file.endpoint, defaults.endpoint),
            user_agent: pick("SUBFETCH_USER_AGENT", file.user_agent, defaults.user_agent),
            username: pick("SUBFETCH_USERNAME", file.username, defaults.username),
            password: pick("SUBFETCH_PASSWORD", file.password, defaults.password),
            login_language: file.login_language.unwrap_or(defaults.login_language),
            timeout_secs: file.timeout_secs,
        },
        language: file
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    }
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("subfetch"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

pub fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}
