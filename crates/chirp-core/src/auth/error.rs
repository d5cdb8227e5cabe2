use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the OAuth handshake and the authenticated call wrappers.
///
/// Remote failures are tagged by cause so callers can distinguish a transient
/// outage (`RetriesExhausted`) from an aborted handshake (`TokenMismatch`)
/// or a post-exchange identity check failure (`VerificationFailed`).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{endpoint} returned no 200 response after {attempts} attempts (last status: {status:?})")]
    RetriesExhausted {
        endpoint: &'static str,
        attempts: u32,
        status: Option<StatusCode>,
    },
    #[error("callback oauth_token does not match the token stored in the session")]
    TokenMismatch,
    #[error("could not verify the authenticated account")]
    VerificationFailed,
    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),
    #[error("callback query missing {0} parameter")]
    MissingQueryParam(&'static str),
    #[error("no pending request token in the session")]
    SessionUnavailable,
    #[error("session store error: {0}")]
    SessionStore(String),
}
