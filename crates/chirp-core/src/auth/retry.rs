use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::ClientConfig;
use crate::rest::Reply;

use super::AuthError;

/// Fixed-delay retry settings shared by every remote call.
///
/// Deliberately blind: no backoff, no jitter, no distinction between
/// failure classes. The first 200 stops the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            attempts: config.retry,
            interval: config.interval_duration(),
        }
    }
}

/// Injectable delay so retry behaviour is testable without wall-clock waits.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

impl<T: Sleeper> Sleeper for &T {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        (**self).sleep(duration)
    }
}

/// Default sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

/// Run `op` until it yields a 200, sleeping `policy.interval` between
/// attempts, for at most `policy.attempts` attempts.
pub async fn retry_call<T, F, Fut, S>(
    policy: RetryPolicy,
    sleeper: &S,
    endpoint: &'static str,
    mut op: F,
) -> Result<T, AuthError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Reply<T>>,
    S: Sleeper,
{
    let mut last_status = None;
    for attempt in 1..=policy.attempts {
        match op().await {
            Reply::Success(body) => return Ok(body),
            Reply::Status(status) => {
                last_status = Some(status);
                warn!(endpoint, attempt, %status, "remote call returned non-200");
            }
            Reply::Failed(reason) => {
                last_status = None;
                warn!(endpoint, attempt, %reason, "remote call failed");
            }
        }
        if attempt < policy.attempts {
            sleeper.sleep(policy.interval).await;
        }
    }
    warn!(endpoint, attempts = policy.attempts, "giving up on remote call");
    Err(AuthError::RetriesExhausted {
        endpoint,
        attempts: policy.attempts,
        status: last_status,
    })
}

#[cfg(test)]
pub(crate) use test_support::RecordingSleeper;

#[cfg(test)]
mod test_support {
    use std::future::Future;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::Sleeper;

    /// Records requested sleep durations and completes immediately.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingSleeper {
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingSleeper {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
            self.slept.lock().unwrap().push(duration);
            std::future::ready(())
        }
    }
}
