use std::collections::HashMap;
use std::sync::Mutex;

use super::AuthError;

/// Key-value storage scoped to the current user's session.
///
/// The handshake only ever touches two fixed keys; web integrations
/// implement this over their framework's own session object, and the
/// session — not the handshake — owns the stored values.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;
    fn delete(&self, key: &str) -> Result<(), AuthError>;
}

impl<T: SessionStore + ?Sized> SessionStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), AuthError> {
        (**self).delete(key)
    }
}

/// In-memory session used by the CLI's single-process flow and by tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let inner = self
            .inner
            .lock()
            .map_err(|err| AuthError::SessionStore(err.to_string()))?;
        Ok(inner.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|err| AuthError::SessionStore(err.to_string()))?;
        inner.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), AuthError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|err| AuthError::SessionStore(err.to_string()))?;
        inner.remove(key);
        Ok(())
    }
}
