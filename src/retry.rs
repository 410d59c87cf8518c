use http::StatusCode;
use reqwest::{blocking::Response, Result};
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::thread::sleep;
use std::time::Duration;

/// When to retry a failed request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Never retry the client's first request, so a misconfigured endpoint
    /// fails fast; retry subsequent ones, which hardens long multi-request
    /// waits against transient failures.
    Automatic,
    /// Retry every request.
    Always,
}

/// Retry behavior for requests that time out, fail to connect, or come back
/// with a retryable status. Only read-only requests go through the retrier;
/// requests that start server-side work are sent exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    pub strategy: RetryStrategy,
    /// Maximum number of retries after the initial attempt.
    pub max_retry_count: u8,
    /// Wait before the first retry.
    pub base_wait: Duration,
    /// Exponential backoff: the wait before retry N is
    /// `base_wait * backoff_factor.powi(N)`.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            strategy: RetryStrategy::Automatic,
            max_retry_count: 3,
            base_wait: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Retrier {
    config: RetryConfig,
    is_first_request: AtomicBool,
}

impl Retrier {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            is_first_request: AtomicBool::new(true),
        }
    }

    fn should_retry(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    pub fn with_retries(&self, send_request: impl Fn() -> Result<Response>) -> Result<Response> {
        if self.is_first_request.swap(false, SeqCst)
            && self.config.strategy == RetryStrategy::Automatic
        {
            return send_request();
        }

        for i_retry in 0..self.config.max_retry_count {
            macro_rules! warn_and_sleep {
                ($src:expr) => {{
                    let wait_factor = self.config.backoff_factor.powi(i_retry.into());
                    let duration = self.config.base_wait.mul_f64(wait_factor);
                    log::warn!("{} - retrying after {:?}.", $src, duration);
                    sleep(duration)
                }};
            }

            match send_request() {
                Ok(response) if Self::should_retry(response.status()) => {
                    warn_and_sleep!(format!("{} for {}", response.status(), response.url()))
                }
                Err(error) if error.is_timeout() || error.is_connect() || error.is_request() => {
                    warn_and_sleep!(error)
                }
                result => return result,
            }
        }

        // The last attempt propagates whatever happens.
        send_request()
    }
}

#[cfg(test)]
mod tests {
    use super::{Retrier, RetryConfig, RetryStrategy};
    use mockito::{mock, server_url};
    use reqwest::blocking::{get, Client};
    use std::thread::sleep;
    use std::time::Duration;

    fn config(strategy: RetryStrategy, max_retry_count: u8) -> RetryConfig {
        RetryConfig {
            strategy,
            max_retry_count,
            base_wait: Duration::from_secs(0),
            backoff_factor: 0.0,
        }
    }

    #[test]
    fn always_strategy_retries_server_errors_up_to_the_limit() {
        let retrier = Retrier::new(config(RetryStrategy::Always, 2));

        let ok = mock("GET", "/retry/always-ok").expect(1).create();
        assert_eq!(
            retrier
                .with_retries(|| get(format!("{}/retry/always-ok", server_url())))
                .unwrap()
                .status(),
            200
        );
        ok.assert();

        let err = mock("GET", "/retry/always-err")
            .with_status(500)
            .expect(3)
            .create();
        assert_eq!(
            retrier
                .with_retries(|| get(format!("{}/retry/always-err", server_url())))
                .unwrap()
                .status(),
            500
        );
        err.assert();
    }

    #[test]
    fn automatic_strategy_sends_the_first_request_only_once() {
        let retrier = Retrier::new(config(RetryStrategy::Automatic, 2));

        let first = mock("GET", "/retry/auto-first")
            .with_status(500)
            .expect(1)
            .create();
        assert_eq!(
            retrier
                .with_retries(|| get(format!("{}/retry/auto-first", server_url())))
                .unwrap()
                .status(),
            500
        );
        first.assert();

        let later = mock("GET", "/retry/auto-later")
            .with_status(500)
            .expect(3)
            .create();
        assert_eq!(
            retrier
                .with_retries(|| get(format!("{}/retry/auto-later", server_url())))
                .unwrap()
                .status(),
            500
        );
        later.assert();
    }

    #[test]
    fn timeouts_are_retried() {
        let retrier = Retrier::new(config(RetryStrategy::Always, 1));

        let slow = mock("GET", "/retry/slow")
            .with_body_from_fn(|_| {
                sleep(Duration::from_secs_f64(0.2));
                Ok(())
            })
            .expect(2)
            .create();
        let client = Client::new();
        assert!(retrier
            .with_retries(|| client
                .get(format!("{}/retry/slow", server_url()))
                .timeout(Duration::from_secs_f64(0.1))
                .send()
                .and_then(|response| {
                    // Force the timeout to surface on the body read.
                    let _ = response.text()?;
                    unreachable!()
                }))
            .unwrap_err()
            .is_timeout());
        slow.assert();
    }
}
