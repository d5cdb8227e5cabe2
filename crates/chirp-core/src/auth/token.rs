use serde::{Deserialize, Serialize};

/// An OAuth1 token and its secret.
///
/// The same shape serves both the temporary request-token pair and the
/// permanent access-token pair; both are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub key: String,
    pub secret: String,
}

impl TokenPair {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}
