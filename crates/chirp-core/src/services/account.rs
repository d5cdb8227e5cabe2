use serde_json::Value;
use tracing::warn;

use crate::auth::{retry_call, AuthError, RetryPolicy, Sleeper, TokenPair, TokioSleeper};
use crate::rest::{Connect, OAuth1Transport};

const ENDPOINT: &str = "account/verify_credentials";

/// Identity checks against the remote account endpoint.
pub struct AccountService<C, D = TokioSleeper> {
    connector: C,
    policy: RetryPolicy,
    sleeper: D,
}

impl<C: Connect> AccountService<C> {
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            sleeper: TokioSleeper,
        }
    }
}

impl<C: Connect, D: Sleeper> AccountService<C, D> {
    pub fn with_sleeper(connector: C, policy: RetryPolicy, sleeper: D) -> Self {
        Self {
            connector,
            policy,
            sleeper,
        }
    }

    /// Fetch the credentials record for an access-token pair.
    ///
    /// The record is returned verbatim; nothing beyond its existence is
    /// interpreted here.
    pub async fn verify_credentials(&self, tokens: &TokenPair) -> Result<Value, AuthError> {
        let transport = self.connector.connect(Some(tokens.clone()));
        let content = retry_call(self.policy, &self.sleeper, ENDPOINT, || {
            transport.get(ENDPOINT)
        })
        .await?;
        if content.is_null() {
            warn!("verify_credentials returned no content");
            return Err(AuthError::VerificationFailed);
        }
        Ok(content)
    }
}
