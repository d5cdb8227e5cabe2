use std::future::Future;

use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::auth::TokenPair;

/// Outcome of a single remote call.
///
/// The original transport exposed the HTTP status as a field readable after
/// each call; here every call returns it instead. A transport-level failure
/// (connection refused, read timeout) carries no status at all.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    /// HTTP 200 with a parsed body.
    Success(T),
    /// Completed exchange with a non-200 status.
    Status(StatusCode),
    /// The request never produced an HTTP response.
    Failed(String),
}

/// The narrow contract this crate needs from an OAuth1 signing transport.
///
/// A transport is bound at construction to the consumer credentials and,
/// optionally, a user token pair (see [`Connect`]). Futures are driven by
/// the caller; nothing is spawned.
pub trait OAuth1Transport {
    /// Request a temporary token pair, announcing the given callback.
    fn request_token(&self, callback: &str) -> impl Future<Output = Reply<TokenPair>>;

    /// The user-facing authorization URL for a request token.
    fn authorize_url(&self, token: &str) -> Url;

    /// Exchange the bound request-token pair plus a verifier for a
    /// permanent access-token pair.
    fn access_token(&self, verifier: &str) -> impl Future<Output = Reply<TokenPair>>;

    /// Authenticated GET against a REST endpoint such as
    /// `account/verify_credentials`.
    fn get(&self, endpoint: &str) -> impl Future<Output = Reply<Value>>;

    /// Authenticated POST with form parameters.
    fn post(&self, endpoint: &str, params: &[(&str, &str)]) -> impl Future<Output = Reply<Value>>;
}

/// Builds transports bound to an optional user token pair.
///
/// The analogue of the original `connect()` helper: pure construction,
/// and repeated calls with the same arguments yield independently
/// configured transports with identical settings.
pub trait Connect {
    type Transport: OAuth1Transport;

    fn connect(&self, tokens: Option<TokenPair>) -> Self::Transport;
}

impl<T: Connect> Connect for &T {
    type Transport = T::Transport;

    fn connect(&self, tokens: Option<TokenPair>) -> Self::Transport {
        (**self).connect(tokens)
    }
}
