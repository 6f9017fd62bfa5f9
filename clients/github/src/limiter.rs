use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use derive_more::Constructor;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue};

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota reported by the rate limit headers of a response.
#[derive(Constructor, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub remaining: Option<u32>,
    /// Unix timestamp of the next quota reset.
    pub reset: Option<i64>,
}

impl RateLimitHeaders {
    pub fn from_headers(headers: &HeaderMap<HeaderValue>) -> Self {
        let limits = RateLimitHeaders {
            remaining: read_header::<u32>(headers, REMAINING_HEADER).ok(),
            reset: read_header::<i64>(headers, RESET_HEADER).ok(),
        };
        debug!("Rate limit headers: {:?}", limits);
        limits
    }

    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Time until one second past the quota reset, `None` without a reset time.
    pub fn wait_until_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        let reset = self.reset?;
        let seconds = (reset - now.timestamp()).max(0) + 1;
        Some(Duration::from_secs(seconds as u64))
    }
}

fn read_header<T>(headers: &HeaderMap<HeaderValue>, header: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let header = headers
        .get(header)
        .ok_or_else(|| anyhow::anyhow!("Header {} not found", header))?
        .to_str()?;
    Ok(header.parse::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn headers(remaining: &str, reset: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REMAINING_HEADER, HeaderValue::from_str(remaining).unwrap());
        if let Some(reset) = reset {
            headers.insert(RESET_HEADER, HeaderValue::from_str(reset).unwrap());
        }
        headers
    }

    #[test]
    fn reads_quota() {
        let limits = RateLimitHeaders::from_headers(&headers("0", Some("1700000030")));
        assert_eq!(limits, RateLimitHeaders::new(Some(0), Some(1_700_000_030)));
        assert!(limits.exhausted());

        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(limits.wait_until_reset(now), Some(Duration::from_secs(31)));
    }

    #[test]
    fn past_reset_waits_one_second() {
        let limits = RateLimitHeaders::new(Some(0), Some(1_699_999_000));
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(limits.wait_until_reset(now), Some(Duration::from_secs(1)));
    }

    #[test]
    fn missing_or_garbled_headers() {
        let limits = RateLimitHeaders::from_headers(&headers("many", None));
        assert_eq!(limits, RateLimitHeaders::new(None, None));
        assert!(!limits.exhausted());
        assert_eq!(limits.wait_until_reset(Utc::now()), None);
    }
}
