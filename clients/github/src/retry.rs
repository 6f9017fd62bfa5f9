use std::time::Duration;

/// Exponential delay between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub multiplier: u32,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: Duration::from_secs(1),
            multiplier: 2,
            cap: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// `min(base * multiplier^attempt, cap)`, `attempt` counted from 0.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.cap, |delay| delay.min(self.cap))
    }
}

/// How hard a single fetch tries before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Attempts per request. Rate limit waits with a known reset time do not use any.
    pub max_retries: u32,
    /// Courtesy delay before every attempt.
    pub request_delay: Duration,
    pub timeout: Duration,
    pub max_rate_limit_waits: u32,
    pub backoff: BackoffPolicy,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy {
            max_retries: 3,
            request_delay: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
            max_rate_limit_waits: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[test]
fn backoff_doubles_and_caps() {
    let backoff = BackoffPolicy::default();
    let delays: Vec<u64> = (0..8).map(|attempt| backoff.delay(attempt).as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    assert_eq!(backoff.delay(100), Duration::from_secs(60));
}

#[test]
fn custom_backoff() {
    let backoff = BackoffPolicy {
        base: Duration::from_millis(100),
        multiplier: 3,
        cap: Duration::from_secs(1),
    };
    assert_eq!(backoff.delay(0), Duration::from_millis(100));
    assert_eq!(backoff.delay(2), Duration::from_millis(900));
    assert_eq!(backoff.delay(3), Duration::from_secs(1));
}
