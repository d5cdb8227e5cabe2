use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigLocator;

use super::{AuthError, TokenPair};

/// An access-token pair worth keeping between runs, plus the handle it was
/// verified as (when known).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub tokens: TokenPair,
    pub screen_name: Option<String>,
}

/// Persistence abstraction for obtained access tokens.
pub trait CredentialStore {
    fn load(&self, profile: &str) -> Result<Option<StoredCredentials>, AuthError>;
    fn save(&self, profile: &str, credentials: &StoredCredentials) -> Result<(), AuthError>;
    fn delete(&self, profile: &str) -> Result<(), AuthError>;
}

/// Filesystem-backed credential storage in the user configuration directory.
pub struct FileCredentialStore {
    locator: ConfigLocator,
}

impl FileCredentialStore {
    pub fn new(locator: ConfigLocator) -> Self {
        Self { locator }
    }

    pub fn with_default_locator() -> Result<Self, AuthError> {
        Ok(Self::new(ConfigLocator::new()?))
    }

    fn write_file(path: &Path, payload: &str) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(payload.as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perm = file.metadata()?.permissions();
            perm.set_mode(0o600);
            fs::set_permissions(path, perm)?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, profile: &str) -> Result<Option<StoredCredentials>, AuthError> {
        let path = self.locator.credentials_file(profile);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let envelope: CredentialsEnvelope = serde_json::from_str(&raw)?;
        Ok(Some(envelope.credentials))
    }

    fn save(&self, profile: &str, credentials: &StoredCredentials) -> Result<(), AuthError> {
        let path = self.locator.credentials_file(profile);
        let envelope = CredentialsEnvelope {
            version: 1,
            profile: profile.to_owned(),
            credentials: credentials.clone(),
        };
        let payload = serde_json::to_string_pretty(&envelope)?;
        Self::write_file(&path, &payload)
    }

    fn delete(&self, profile: &str) -> Result<(), AuthError> {
        let path = self.locator.credentials_file(profile);
        match fs::remove_file(path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialsEnvelope {
    version: u32,
    profile: String,
    credentials: StoredCredentials,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_credentials() -> StoredCredentials {
        StoredCredentials {
            tokens: TokenPair::new("access-key", "access-secret"),
            screen_name: Some("ada".into()),
        }
    }

    #[test]
    fn round_trip_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let locator = ConfigLocator::from_root_for_tests(temp_dir.path().to_path_buf());
        let store = FileCredentialStore::new(locator);
        let credentials = sample_credentials();
        store.save("default", &credentials).unwrap();
        let loaded = store.load("default").unwrap().unwrap();
        assert_eq!(loaded, credentials);
    }

    #[test]
    fn load_missing_profile() {
        let temp_dir = TempDir::new().unwrap();
        let locator = ConfigLocator::from_root_for_tests(temp_dir.path().to_path_buf());
        let store = FileCredentialStore::new(locator);
        assert!(store.load("absent").unwrap().is_none());
    }

    #[test]
    fn delete_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let locator = ConfigLocator::from_root_for_tests(temp_dir.path().to_path_buf());
        let store = FileCredentialStore::new(locator);
        store.delete("missing").unwrap();
    }
}
