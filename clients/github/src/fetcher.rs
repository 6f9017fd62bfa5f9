use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::clock::Clock;
use crate::limiter::RateLimitHeaders;
use crate::retry::FetchPolicy;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
enum AttemptError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with {0}")]
    Status(StatusCode),
}

enum Attempt {
    Done(Value),
    /// Not found or not allowed, retrying does not help.
    Refused(StatusCode),
    RateLimited(RateLimitHeaders),
    Failed(AttemptError),
}

/// GET requests with courtesy delay, rate limit waits and exponential backoff.
pub struct Fetcher {
    http: reqwest::Client,
    policy: FetchPolicy,
    clock: Arc<dyn Clock>,
}

impl Fetcher {
    pub fn new(http: reqwest::Client, policy: FetchPolicy, clock: Arc<dyn Clock>) -> Self {
        Fetcher { http, policy, clock }
    }

    /// JSON body of `url`, `None` once the request is refused or its retry budget is spent.
    pub async fn fetch(&self, url: &Url) -> Option<Value> {
        let mut attempt = 0;
        let mut rate_limit_waits = 0;
        while attempt < self.policy.max_retries {
            self.clock.sleep(self.policy.request_delay).await;
            debug!("GET {} (attempt {}/{})", url, attempt + 1, self.policy.max_retries);
            match self.attempt(url, self.policy.timeout).await {
                Attempt::Done(body) => return Some(body),
                Attempt::Refused(status) => {
                    debug!("{} responded with {}, not retrying", url, status);
                    return None;
                }
                Attempt::RateLimited(limits) => match limits.wait_until_reset(self.clock.now()) {
                    Some(wait) if rate_limit_waits < self.policy.max_rate_limit_waits => {
                        rate_limit_waits += 1;
                        warn!("API rate limit exhausted, waiting {}s for the reset", wait.as_secs());
                        self.clock.sleep(wait).await;
                        continue;
                    }
                    _ => warn!("API rate limit exhausted for {}", url),
                },
                Attempt::Failed(err) => warn!(
                    "Request to {} failed (attempt {}/{}): {}",
                    url,
                    attempt + 1,
                    self.policy.max_retries,
                    err
                ),
            }
            if attempt + 1 < self.policy.max_retries {
                let delay = self.policy.backoff.delay(attempt);
                info!("Retrying in {:.1}s", delay.as_secs_f64());
                self.clock.sleep(delay).await;
            }
            attempt += 1;
        }
        warn!("Giving up on {} after {} attempts", url, self.policy.max_retries);
        None
    }

    /// Single attempt with a short timeout.
    pub async fn probe(&self, url: &Url) -> Option<Value> {
        match self.attempt(url, PROBE_TIMEOUT).await {
            Attempt::Done(body) => Some(body),
            Attempt::Refused(status) => {
                warn!("{} responded with {}", url, status);
                None
            }
            Attempt::RateLimited(_) => {
                warn!("API rate limit exhausted for {}", url);
                None
            }
            Attempt::Failed(err) => {
                warn!("Request to {} failed: {}", url, err);
                None
            }
        }
    }

    async fn attempt(&self, url: &Url, timeout: Duration) -> Attempt {
        let response = match self.http.get(url.clone()).timeout(timeout).send().await {
            Ok(response) => response,
            Err(err) => return Attempt::Failed(err.into()),
        };
        let status = response.status();
        let limits = RateLimitHeaders::from_headers(response.headers());
        if let Some(remaining) = limits.remaining {
            debug!("API requests remaining: {}", remaining);
        }
        if (status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS) && limits.exhausted() {
            return Attempt::RateLimited(limits);
        }
        if status.is_success() {
            return match response.json::<Value>().await {
                Ok(body) => Attempt::Done(body),
                Err(err) => Attempt::Failed(err.into()),
            };
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Attempt::Failed(AttemptError::Status(status))
        } else {
            Attempt::Refused(status)
        }
    }
}
