//! Configuration management for wildwatch.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::DEFAULT_COLLECTION_KEY;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "wildwatch";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "observations.db";

/// Prefix of the environment variables read by [`Config::load`].
const ENV_PREFIX: &str = "WILDWATCH_";

/// Credential variable honoured when no key is configured.
pub const FALLBACK_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Default identification endpoint.
pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Prefix every valid Gemini API key starts with.
const EXPECTED_KEY_PREFIX: &str = "AIza";

/// Number of key characters shown by [`CredentialReport`].
const MASKED_PREFIX_LEN: usize = 10;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WILDWATCH_`, `__` between
///    section and key)
/// 2. TOML config file at `~/.config/wildwatch/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Identification configuration.
    pub identification: IdentificationConfig,
    /// Map configuration.
    pub map: MapConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/wildwatch/observations.db`
    pub database_path: Option<PathBuf>,
    /// Key the observation collection is stored under.
    pub collection_key: String,
}

/// Image identification configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentificationConfig {
    /// `generateContent` endpoint.
    pub api_url: String,
    /// API key. Falls back to `GEMINI_API_KEY` when unset.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Map defaults, used as the fallback observation position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Latitude of the initial map center.
    pub default_latitude: f64,
    /// Longitude of the initial map center.
    pub default_longitude: f64,
    /// Initial zoom level.
    pub default_zoom: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            collection_key: DEFAULT_COLLECTION_KEY.to_string(),
        }
    }
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

// Keeps the key out of logs and `config show`.
impl std::fmt::Debug for IdentificationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentificationConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        // Paris
        Self {
            default_latitude: 48.8566,
            default_longitude: 2.3522,
            default_zoom: 15,
        }
    }
}

impl IdentificationConfig {
    /// The effective API key: the configured one, else `GEMINI_API_KEY`.
    /// Blank values count as missing.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(
            self.api_key.as_deref(),
            std::env::var(FALLBACK_API_KEY_VAR).ok().as_deref(),
        )
    }

    /// Whether an API key is available.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Summarize the effective credential without revealing it.
    #[must_use]
    pub fn credential_report(&self) -> CredentialReport {
        CredentialReport::for_key(self.api_key().as_deref())
    }
}

fn resolve_api_key(configured: Option<&str>, fallback: Option<&str>) -> Option<String> {
    configured
        .filter(|k| !k.trim().is_empty())
        .or_else(|| fallback.filter(|k| !k.trim().is_empty()))
        .map(|k| k.trim().to_string())
}

/// Diagnostic summary of the identification credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialReport {
    /// Whether a key is available.
    pub present: bool,
    /// Key length in characters.
    pub length: usize,
    /// First characters of the key followed by `...`.
    pub masked_prefix: Option<String>,
    /// Whether the key starts with `AIza`.
    pub expected_prefix: bool,
}

impl CredentialReport {
    /// Build a report for `key`.
    #[must_use]
    pub fn for_key(key: Option<&str>) -> Self {
        match key {
            Some(key) => Self {
                present: true,
                length: key.chars().count(),
                masked_prefix: Some(format!(
                    "{}...",
                    key.chars().take(MASKED_PREFIX_LEN).collect::<String>()
                )),
                expected_prefix: key.starts_with(EXPECTED_KEY_PREFIX),
            },
            None => Self {
                present: false,
                length: 0,
                masked_prefix: None,
                expected_prefix: false,
            },
        }
    }

    /// Present and well-formed.
    #[must_use]
    pub fn looks_valid(&self) -> bool {
        self.present && self.expected_prefix
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `WILDWATCH_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load only the given TOML file over the defaults, ignoring the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn load_file(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigValidation {
                message: format!("config file not found: {}", path.display()),
            });
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.collection_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "collection_key must not be empty".to_string(),
            });
        }

        let url = &self.identification.api_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::ConfigValidation {
                message: format!("api_url must be an http(s) URL: {url}"),
            });
        }

        if self.identification.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }

        let lat = self.map.default_latitude;
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::ConfigValidation {
                message: format!("default_latitude ({lat}) must be within [-90, 90]"),
            });
        }

        let lon = self.map.default_longitude;
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::ConfigValidation {
                message: format!("default_longitude ({lon}) must be within [-180, 180]"),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// A copy safe to display: the API key is replaced by its masked prefix.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.identification.api_key = config
            .identification
            .api_key
            .as_deref()
            .and_then(|k| CredentialReport::for_key(Some(k)).masked_prefix);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.storage.collection_key, "wildwatch_observations");
        assert_eq!(config.identification.api_url, DEFAULT_API_URL);
        assert!(config.identification.api_key.is_none());
        assert_eq!(config.identification.timeout_secs, 30);
    }

    #[test]
    fn test_default_map_config() {
        let map = MapConfig::default();

        assert!((map.default_latitude - 48.8566).abs() < f64::EPSILON);
        assert!((map.default_longitude - 2.3522).abs() < f64::EPSILON);
        assert_eq!(map.default_zoom, 15);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_collection_key() {
        let mut config = Config::default();
        config.storage.collection_key = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("collection_key"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.identification.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_non_http_url() {
        let mut config = Config::default();
        config.identification.api_url = "ftp://example.com".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("api_url"));
    }

    #[test]
    fn test_validate_out_of_range_coordinates() {
        let mut config = Config::default();
        config.map.default_latitude = 91.0;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("default_latitude"));

        let mut config = Config::default();
        config.map.default_longitude = f64::NAN;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("default_longitude"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("wildwatch"));
        assert!(path.to_string_lossy().ends_with("observations.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_resolve_api_key() {
        assert_eq!(
            resolve_api_key(Some("AIzaConfigured"), Some("AIzaEnv")),
            Some("AIzaConfigured".to_string())
        );
        assert_eq!(
            resolve_api_key(None, Some(" AIzaEnv ")),
            Some("AIzaEnv".to_string())
        );
        assert_eq!(
            resolve_api_key(Some(""), Some("AIzaEnv")),
            Some("AIzaEnv".to_string())
        );
        assert_eq!(resolve_api_key(Some("  "), None), None);
        assert_eq!(resolve_api_key(None, None), None);
    }

    #[test]
    fn test_configured_key_wins() {
        let config = IdentificationConfig {
            api_key: Some("AIzaConfigured".to_string()),
            ..IdentificationConfig::default()
        };
        assert_eq!(config.api_key().as_deref(), Some("AIzaConfigured"));
        assert!(config.is_configured());
    }

    #[test]
    fn test_timeout() {
        let config = IdentificationConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = IdentificationConfig {
            api_key: Some("AIzaSuperSecret".to_string()),
            ..IdentificationConfig::default()
        };
        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("SuperSecret"));
        assert!(debug_str.contains("<redacted>"));
    }

    #[test]
    fn test_redacted_masks_key() {
        let mut config = Config::default();
        config.identification.api_key = Some("AIzaSyAbcdefghijklmnop".to_string());

        let redacted = config.redacted();
        assert_eq!(
            redacted.identification.api_key.as_deref(),
            Some("AIzaSyAbcd...")
        );
        assert_eq!(redacted.storage, config.storage);
    }

    #[test]
    fn test_credential_report_present() {
        let report = CredentialReport::for_key(Some("AIzaSyAbcdefghijklmnop"));

        assert!(report.present);
        assert_eq!(report.length, 22);
        assert_eq!(report.masked_prefix.as_deref(), Some("AIzaSyAbcd..."));
        assert!(report.expected_prefix);
        assert!(report.looks_valid());
    }

    #[test]
    fn test_credential_report_wrong_prefix() {
        let report = CredentialReport::for_key(Some("sk-123"));

        assert!(report.present);
        assert!(!report.expected_prefix);
        assert!(!report.looks_valid());
        assert_eq!(report.masked_prefix.as_deref(), Some("sk-123..."));
    }

    #[test]
    fn test_credential_report_missing() {
        let report = CredentialReport::for_key(None);

        assert!(!report.present);
        assert_eq!(report.length, 0);
        assert!(report.masked_prefix.is_none());
        assert!(!report.looks_valid());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("wildwatch"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_file_missing() {
        let result = Config::load_file(std::path::Path::new("/nonexistent/config.toml"));
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_load_file_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
database_path = "/tmp/field.db"
collection_key = "field_notes"

[identification]
timeout_secs = 5

[map]
default_latitude = 45.0
default_longitude = 6.0
"#,
        )
        .unwrap();

        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/field.db"));
        assert_eq!(config.storage.collection_key, "field_notes");
        assert_eq!(config.identification.timeout_secs, 5);
        assert_eq!(config.identification.api_url, DEFAULT_API_URL);
        assert!((config.map.default_latitude - 45.0).abs() < f64::EPSILON);
        assert_eq!(config.map.default_zoom, 15);
    }

    #[test]
    fn test_load_file_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[identification]\ntimeout_secs = 0\n").unwrap();

        let err = Config::load_file(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("collection_key"));
        assert!(json.contains("default_zoom"));
    }
}
