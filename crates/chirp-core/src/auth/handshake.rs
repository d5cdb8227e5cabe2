use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::rest::{Connect, OAuth1Transport};
use crate::services::AccountService;

use super::{retry_call, AuthError, RetryPolicy, SessionStore, Sleeper, TokenPair, TokioSleeper};

/// Session key holding the temporary request token.
pub const SESSION_TOKEN: &str = "oauth_token";
/// Session key holding the temporary request-token secret.
pub const SESSION_TOKEN_SECRET: &str = "oauth_token_secret";

const REQUEST_TOKEN_ENDPOINT: &str = "oauth/request_token";
const ACCESS_TOKEN_ENDPOINT: &str = "oauth/access_token";

/// Three-legged OAuth1 handshake against the remote service.
///
/// The session store and the callback request's query parameters are passed
/// in explicitly; nothing ambient is consulted. The flow moves
/// Unauthenticated → request token issued ([`begin`](Self::begin)) →
/// user redirected → access token issued and verified
/// ([`complete`](Self::complete)); any failure aborts with no automatic
/// recovery.
pub struct Handshake<C, S, D = TokioSleeper> {
    connector: C,
    session: S,
    policy: RetryPolicy,
    callback: String,
    sleeper: D,
}

impl<C, S> Handshake<C, S>
where
    C: Connect,
    S: SessionStore,
{
    /// `callback` is the resolved callback target announced to the remote
    /// service: an absolute URL, or `oob` for the PIN flow.
    pub fn new(connector: C, session: S, policy: RetryPolicy, callback: impl Into<String>) -> Self {
        Self::with_sleeper(connector, session, policy, callback, TokioSleeper)
    }
}

impl<C, S, D> Handshake<C, S, D>
where
    C: Connect,
    S: SessionStore,
    D: Sleeper,
{
    pub fn with_sleeper(
        connector: C,
        session: S,
        policy: RetryPolicy,
        callback: impl Into<String>,
        sleeper: D,
    ) -> Self {
        Self {
            connector,
            session,
            policy,
            callback: callback.into(),
            sleeper,
        }
    }

    /// First leg: obtain a temporary token pair, park it in the session and
    /// return the authorization URL the user must be redirected to.
    ///
    /// Issuing the actual 302 (and ending the current request) is the
    /// caller's responsibility.
    pub async fn begin(&self) -> Result<AuthorizeRedirect, AuthError> {
        let transport = self.connector.connect(None);
        debug!(callback = %self.callback, "requesting temporary token");
        let request = retry_call(self.policy, &self.sleeper, REQUEST_TOKEN_ENDPOINT, || {
            transport.request_token(&self.callback)
        })
        .await?;

        self.session.set(SESSION_TOKEN, &request.key)?;
        self.session.set(SESSION_TOKEN_SECRET, &request.secret)?;

        Ok(AuthorizeRedirect {
            url: transport.authorize_url(&request.key),
        })
    }

    /// Final leg: validate the echoed token against the session, exchange
    /// it plus the verifier for an access-token pair, and confirm the
    /// account responds.
    ///
    /// The temporary session keys are deleted only when every step
    /// succeeded; on any failure they are left in place, exactly as the
    /// original flow behaved.
    pub async fn complete(&self, query: &CallbackQuery) -> Result<AuthenticatedUser, AuthError> {
        let stored_token = self.session.get(SESSION_TOKEN)?;
        let stored_secret = self.session.get(SESSION_TOKEN_SECRET)?;
        let (stored_token, stored_secret) = match (stored_token, stored_secret) {
            (Some(token), Some(secret)) => (token, secret),
            _ => return Err(AuthError::SessionUnavailable),
        };

        // Anti-CSRF check: the echoed token must match before any remote call.
        if query.oauth_token.as_deref() != Some(stored_token.as_str()) {
            warn!("callback token does not match the stored token; session likely expired");
            return Err(AuthError::TokenMismatch);
        }

        let verifier = query
            .oauth_verifier
            .as_deref()
            .ok_or(AuthError::MissingQueryParam("oauth_verifier"))?;

        let transport = self
            .connector
            .connect(Some(TokenPair::new(stored_token, stored_secret)));
        debug!("exchanging request token for access token");
        let access = retry_call(self.policy, &self.sleeper, ACCESS_TOKEN_ENDPOINT, || {
            transport.access_token(verifier)
        })
        .await?;

        let account = AccountService::with_sleeper(&self.connector, self.policy, &self.sleeper);
        let credentials = match account.verify_credentials(&access).await {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!(%err, "could not verify the authenticated account");
                return Err(AuthError::VerificationFailed);
            }
        };

        self.session.delete(SESSION_TOKEN)?;
        self.session.delete(SESSION_TOKEN_SECRET)?;

        Ok(AuthenticatedUser {
            tokens: access,
            credentials,
        })
    }
}

/// Target of the user-facing authorization redirect.
#[derive(Debug, Clone)]
pub struct AuthorizeRedirect {
    pub url: Url,
}

impl AuthorizeRedirect {
    /// Status the caller should respond with when redirecting.
    pub fn status(&self) -> StatusCode {
        StatusCode::FOUND
    }

    /// The request token embedded in the authorization URL.
    pub fn oauth_token(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == "oauth_token")
            .map(|(_, value)| value.into_owned())
    }
}

/// The two query parameters the remote service echoes back to the callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    pub oauth_token: Option<String>,
    pub oauth_verifier: Option<String>,
}

impl CallbackQuery {
    pub fn new(oauth_token: impl Into<String>, oauth_verifier: impl Into<String>) -> Self {
        Self {
            oauth_token: Some(oauth_token.into()),
            oauth_verifier: Some(oauth_verifier.into()),
        }
    }

    /// Pick the relevant parameters out of arbitrary query pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "oauth_token" => query.oauth_token = Some(value.into()),
                "oauth_verifier" => query.oauth_verifier = Some(value.into()),
                _ => {}
            }
        }
        query
    }

    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }
}

/// Outcome of a fully completed handshake.
///
/// `credentials` is the verify-credentials record exactly as the remote
/// service returned it; this crate does not interpret its fields.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub tokens: TokenPair,
    pub credentials: Value,
}
