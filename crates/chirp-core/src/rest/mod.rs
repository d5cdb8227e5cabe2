mod http;
mod transport;

pub use http::{ApiEndpoints, HttpConnector, HttpTransport};
pub use transport::{Connect, OAuth1Transport, Reply};
