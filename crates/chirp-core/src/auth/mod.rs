mod credential_store;
mod error;
mod handshake;
mod retry;
mod session;
#[cfg(test)]
pub(crate) mod test_support;
mod token;

#[cfg(test)]
pub(crate) use retry::RecordingSleeper;

pub use credential_store::{CredentialStore, FileCredentialStore, StoredCredentials};
pub use error::AuthError;
pub use handshake::{
    AuthenticatedUser, AuthorizeRedirect, CallbackQuery, Handshake, SESSION_TOKEN,
    SESSION_TOKEN_SECRET,
};
pub use retry::{retry_call, RetryPolicy, Sleeper, TokioSleeper};
pub use session::{MemorySessionStore, SessionStore};
pub use token::TokenPair;
