//! Configuration file handling for the expense client.
//!
//! The configuration file is stored at `$EXPENSE_CLIENT_HOME/config.json` and holds the backend
//! URL, the request timeout, the search debounce delay and the paths of the token and preferences
//! files.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const APP_NAME: &str = "expense-client";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const TOKEN_JSON: &str = "token.json";
const PREFERENCES_JSON: &str = "preferences.json";
const CONFIG_JSON: &str = "config.json";

/// The backend URL used when none is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;

/// Overrides the configured `api_url` when set and non-empty.
pub const API_URL_ENV: &str = "EXPENSE_API_URL";

/// The `Config` object represents the configuration of the client. You instantiate it by providing
/// the path to the client home and from there it loads `config.json`. It provides paths to other
/// items that are either configurable or are expected in a certain location within the home
/// directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    api_url: String,
}

impl Config {
    /// Creates the home directory and its secrets subdirectory, then writes an initial
    /// `config.json` pointing at `api_url` with default settings.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>, api_url: &str) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the client home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        let config_path = root.join(CONFIG_JSON);

        url::Url::parse(api_url).with_context(|| format!("Invalid API URL '{api_url}'"))?;
        let config_file = ConfigFile {
            api_url: api_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        let api_url = resolve_api_url(&config_file.api_url, std::env::var(API_URL_ENV).ok());
        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
            api_url,
        })
    }

    /// Validates that the home directory and its config file exist, then loads the config file.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        if !maybe_relative.is_dir() {
            bail!(
                "The client home '{}' is missing, run 'expense init' first",
                maybe_relative.display()
            )
        }
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let api_url = resolve_api_url(&config_file.api_url, std::env::var(API_URL_ENV).ok());
        debug!("Using API {api_url}");

        Ok(Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
            api_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    /// The backend base URL, after the environment override.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.config_file.search_debounce_ms)
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve(self.config_file.token_path())
    }

    /// Returns the stored `preferences_path` if it is absolute, otherwise resolves the relative
    /// path.
    pub fn preferences_path(&self) -> PathBuf {
        self.resolve(self.config_file.preferences_path())
    }

    /// Checks if `p` is relative, and if so, resolves it. Returns it unchanged if it is absolute.
    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

fn resolve_api_url(configured: &str, env: Option<String>) -> String {
    match env {
        Some(url) if !url.trim().is_empty() => url,
        _ => configured.to_string(),
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "expense-client",
///   "config_version": 1,
///   "api_url": "http://127.0.0.1:8000/api",
///   "timeout_secs": 10,
///   "search_debounce_ms": 500,
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "expense-client"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the expense backend, including any `/api` prefix
    #[serde(default = "default_api_url")]
    api_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,

    /// How long search input must be idle before it is applied
    #[serde(default = "default_search_debounce_ms")]
    search_debounce_ms: u64,

    /// Path to the bearer token file (optional, relative to the home directory or absolute)
    /// Defaults to .secrets/token.json if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,

    /// Path to the preferences file (optional, relative to the home directory or absolute)
    /// Defaults to preferences.json if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preferences_path: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_search_debounce_ms() -> u64 {
    DEFAULT_SEARCH_DEBOUNCE_MS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: default_api_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            token_path: None,
            preferences_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or was written for another app.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(config.timeout_secs > 0, "timeout_secs must be at least 1");

        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    #[cfg(test)]
    pub fn new(
        api_url: &str,
        timeout_secs: u64,
        token_path: Option<PathBuf>,
        preferences_path: Option<PathBuf>,
    ) -> Self {
        Self {
            api_url: api_url.to_string(),
            timeout_secs,
            token_path,
            preferences_path,
            ..Self::default()
        }
    }

    /// Gets the token path. If None, defaults to `.secrets/token.json`.
    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }

    /// Gets the preferences path. If None, defaults to `preferences.json`.
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(PREFERENCES_JSON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("expense_home");

        let config = Config::create(&home_dir, "http://localhost:9000/api")
            .await
            .unwrap();

        assert!(config.secrets().is_dir());
        assert!(config.config_path().is_file());
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
        assert_eq!(
            config.token_path(),
            config.root().join(".secrets").join("token.json")
        );
        assert_eq!(
            config.preferences_path(),
            config.root().join("preferences.json")
        );

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.config_file, config.config_file);
    }

    #[tokio::test]
    async fn test_config_create_rejects_bad_url() {
        let dir = TempDir::new().unwrap();
        assert!(Config::create(dir.path(), "not a url").await.is_err());
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let e = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert!(e.to_string().contains("expense init"));

        let e = Config::load(dir.path()).await.unwrap_err();
        assert!(e.to_string().contains("The config file is missing"));
    }

    #[test]
    fn test_api_url_override() {
        assert_eq!(resolve_api_url("http://a/api", None), "http://a/api");
        assert_eq!(
            resolve_api_url("http://a/api", Some(" ".to_string())),
            "http://a/api"
        );
        assert_eq!(
            resolve_api_url("http://a/api", Some("http://b/api".to_string())),
            "http://b/api"
        );
    }

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.token_path(), PathBuf::from(SECRETS).join(TOKEN_JSON));
        assert_eq!(config.preferences_path(), PathBuf::from(PREFERENCES_JSON));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = ConfigFile::new(
            "https://expenses.example.com/api",
            30,
            Some(PathBuf::from("/var/lib/expense/token.json")),
            Some(PathBuf::from("prefs/mine.json")),
        );
        original_config.save(&config_path).await.unwrap();
        let loaded_config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(original_config, loaded_config);
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let json = r#"{
            "app_name": "expense-client",
            "config_version": 1
        }"#;

        let mut file = tokio::fs::File::create(&config_path).await.unwrap();
        file.write_all(json.as_bytes()).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let json = r#"{
            "app_name": "budget-app",
            "config_version": 1,
            "api_url": "http://localhost/api"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_load_zero_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let config = ConfigFile::new(DEFAULT_API_URL, 0, None, None);
        config.save(&config_path).await.unwrap();
        assert!(ConfigFile::load(&config_path).await.is_err());
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let config = ConfigFile::new(DEFAULT_API_URL, 5, None, None);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("token_path"));
        assert!(!json.contains("preferences_path"));
    }
}
