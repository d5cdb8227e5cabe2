use serde_json::Value;
use tracing::warn;

use crate::auth::{retry_call, AuthError, RetryPolicy, Sleeper, TokenPair, TokioSleeper};
use crate::rest::{Connect, OAuth1Transport};

const ENDPOINT: &str = "statuses/update";

/// Posts status updates on behalf of an authenticated user.
pub struct StatusService<C, D = TokioSleeper> {
    connector: C,
    policy: RetryPolicy,
    sleeper: D,
}

impl<C: Connect> StatusService<C> {
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            sleeper: TokioSleeper,
        }
    }
}

impl<C: Connect, D: Sleeper> StatusService<C, D> {
    pub fn with_sleeper(connector: C, policy: RetryPolicy, sleeper: D) -> Self {
        Self {
            connector,
            policy,
            sleeper,
        }
    }

    /// Post `text` as a status update and return the remote response.
    pub async fn update(&self, tokens: &TokenPair, text: &str) -> Result<Value, AuthError> {
        let transport = self.connector.connect(Some(tokens.clone()));
        let params = [("status", text)];
        let content = retry_call(self.policy, &self.sleeper, ENDPOINT, || {
            transport.post(ENDPOINT, &params)
        })
        .await?;
        if content.is_null() {
            warn!("statuses/update returned no content");
            return Err(AuthError::EmptyResponse(ENDPOINT));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::auth::test_support::ScriptedConnector;
    use crate::auth::RecordingSleeper;
    use crate::rest::Reply;
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn returns_third_reply_after_two_failures() {
        let connector = ScriptedConnector::new();
        connector.push_post(Reply::Status(StatusCode::INTERNAL_SERVER_ERROR));
        connector.push_post(Reply::Status(StatusCode::BAD_GATEWAY));
        connector.push_post(Reply::Success(json!({ "id": 42, "text": "hello" })));
        let sleeper = RecordingSleeper::new();
        let service = StatusService::with_sleeper(
            &connector,
            RetryPolicy::new(3, Duration::from_secs(5)),
            sleeper.clone(),
        );
        let response = service
            .update(&TokenPair::new("access-key", "access-secret"), "hello")
            .await
            .unwrap();
        assert_eq!(response["id"], 42);
        // exactly two sleeps, one after each failed attempt
        assert_eq!(
            sleeper.sleeps(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
        assert_eq!(connector.calls().len(), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_status() {
        let connector = ScriptedConnector::new();
        connector.push_post(Reply::Status(StatusCode::TOO_MANY_REQUESTS));
        connector.push_post(Reply::Status(StatusCode::TOO_MANY_REQUESTS));
        let service = StatusService::with_sleeper(
            &connector,
            RetryPolicy::new(2, Duration::from_secs(1)),
            RecordingSleeper::new(),
        );
        let err = service
            .update(&TokenPair::new("k", "s"), "hello")
            .await
            .unwrap_err();
        match err {
            AuthError::RetriesExhausted {
                endpoint,
                attempts,
                status,
            } => {
                assert_eq!(endpoint, "statuses/update");
                assert_eq!(attempts, 2);
                assert_eq!(status, Some(StatusCode::TOO_MANY_REQUESTS));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_body_is_a_failure() {
        let connector = ScriptedConnector::new();
        connector.push_post(Reply::Success(serde_json::Value::Null));
        let service = StatusService::with_sleeper(
            &connector,
            RetryPolicy::new(1, Duration::from_secs(1)),
            RecordingSleeper::new(),
        );
        let err = service
            .update(&TokenPair::new("k", "s"), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmptyResponse("statuses/update")));
    }
}
