use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Consumer-side settings for the social API client.
///
/// Built from three layers, last writer wins per key: built-in defaults,
/// then overrides loaded from the settings file, then caller-supplied
/// overrides. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Callback path or absolute URL handed to the request-token call.
    pub oauth_callback: String,
    pub user_agent: String,
    /// Whole-request timeout in seconds.
    pub timeout: u64,
    /// Connect timeout in seconds.
    pub connect_timeout: u64,
    /// Attempts per remote call before giving up.
    pub retry: u32,
    /// Seconds slept between attempts.
    pub interval: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            oauth_callback: "/auth/callback".into(),
            user_agent: "chirp-rs/0.1.0".into(),
            timeout: 5,
            connect_timeout: 5,
            retry: 5,
            interval: 5,
        }
    }
}

impl ClientConfig {
    /// Layer file and caller overrides over the built-in defaults.
    pub fn merged(file: ConfigOverrides, caller: ConfigOverrides) -> Self {
        let mut config = Self::default();
        config.apply(file);
        config.apply(caller);
        config
    }

    /// Merge defaults, the settings file under the config directory, and
    /// caller overrides.
    pub fn load(locator: &ConfigLocator, caller: ConfigOverrides) -> Result<Self, ConfigError> {
        let file = ConfigOverrides::load_from(&locator.settings_file())?;
        Ok(Self::merged(file, caller))
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(value) = overrides.consumer_key {
            self.consumer_key = value;
        }
        if let Some(value) = overrides.consumer_secret {
            self.consumer_secret = value;
        }
        if let Some(value) = overrides.oauth_callback {
            self.oauth_callback = value;
        }
        if let Some(value) = overrides.user_agent {
            self.user_agent = value;
        }
        if let Some(value) = overrides.timeout {
            self.timeout = value;
        }
        if let Some(value) = overrides.connect_timeout {
            self.connect_timeout = value;
        }
        if let Some(value) = overrides.retry {
            self.retry = value;
        }
        if let Some(value) = overrides.interval {
            self.interval = value;
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

/// Partial configuration used for the file and caller layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub oauth_callback: Option<String>,
    pub user_agent: Option<String>,
    pub timeout: Option<u64>,
    pub connect_timeout: Option<u64>,
    pub retry: Option<u32>,
    pub interval: Option<u64>,
}

impl ConfigOverrides {
    /// Read overrides from a JSON settings file. A missing file is not an
    /// error and yields an empty set of overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(ConfigError::Parse)
    }
}

/// Locates the per-user configuration directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    root: PathBuf,
}

impl ConfigLocator {
    pub fn new() -> Result<Self, ConfigError> {
        let dirs =
            ProjectDirs::from("rs", "chirp", "chirp-rs").ok_or(ConfigError::MissingProjectDirs)?;
        let config_dir = dirs.config_dir();
        fs::create_dir_all(config_dir).map_err(ConfigError::CreateDir)?;
        set_user_only_permissions(config_dir)?;
        Ok(Self {
            root: config_dir.to_path_buf(),
        })
    }

    /// Path to the JSON settings file holding `ConfigOverrides`.
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Path to the stored access tokens for the given profile.
    pub fn credentials_file(&self, profile: &str) -> PathBuf {
        self.root.join(format!("credentials-{profile}.json"))
    }

    #[cfg(test)]
    pub(crate) fn from_root_for_tests(root: PathBuf) -> Self {
        Self { root }
    }
}

fn set_user_only_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let metadata = fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o700);
        fs::set_permissions(path, permissions)?;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to determine configuration directory for chirp-rs")]
    MissingProjectDirs,
    #[error("failed to create configuration directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("filesystem error: {0}")]
    Io(#[source] std::io::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builtin_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.oauth_callback, "/auth/callback");
        assert_eq!(config.timeout, 5);
        assert_eq!(config.connect_timeout, 5);
        assert_eq!(config.retry, 5);
        assert_eq!(config.interval, 5);
    }

    #[test]
    fn file_overrides_win_over_defaults() {
        let file = ConfigOverrides {
            consumer_key: Some("file-key".into()),
            retry: Some(3),
            ..Default::default()
        };
        let config = ClientConfig::merged(file, ConfigOverrides::default());
        assert_eq!(config.consumer_key, "file-key");
        assert_eq!(config.retry, 3);
        // untouched keys keep their defaults
        assert_eq!(config.interval, 5);
        assert_eq!(config.oauth_callback, "/auth/callback");
    }

    #[test]
    fn caller_overrides_win_per_key() {
        let file = ConfigOverrides {
            consumer_key: Some("file-key".into()),
            consumer_secret: Some("file-secret".into()),
            timeout: Some(10),
            ..Default::default()
        };
        let caller = ConfigOverrides {
            consumer_key: Some("caller-key".into()),
            interval: Some(1),
            ..Default::default()
        };
        let config = ClientConfig::merged(file, caller);
        // caller beats file
        assert_eq!(config.consumer_key, "caller-key");
        // file beats default where the caller is silent
        assert_eq!(config.consumer_secret, "file-secret");
        assert_eq!(config.timeout, 10);
        // caller beats default
        assert_eq!(config.interval, 1);
    }

    #[test]
    fn missing_settings_file_yields_empty_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let overrides = ConfigOverrides::load_from(&path).unwrap();
        assert_eq!(overrides, ConfigOverrides::default());
    }

    #[test]
    fn settings_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let locator = ConfigLocator::from_root_for_tests(temp_dir.path().to_path_buf());
        let path = locator.settings_file();
        fs::write(&path, r#"{"consumer_key":"k","user_agent":"custom/1.0"}"#).unwrap();
        let config = ClientConfig::load(&locator, ConfigOverrides::default()).unwrap();
        assert_eq!(config.consumer_key, "k");
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.consumer_secret, "");
    }

    #[test]
    fn malformed_settings_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        let err = ConfigOverrides::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
