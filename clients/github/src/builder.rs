use std::sync::Arc;

use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::fetcher::Fetcher;
use crate::retry::FetchPolicy;
use crate::{Error, GithubClient};

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "org-census";

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

pub struct GithubClientBuilder {
    client_builder: ClientBuilder,
    api_url: String,
    user_agent: String,
    headers: HeaderMap,
    policy: FetchPolicy,
    clock: Arc<dyn Clock>,
}

impl Default for GithubClientBuilder {
    fn default() -> Self {
        Self {
            client_builder: ClientBuilder::default(),
            api_url: GITHUB_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HeaderMap::default(),
            policy: FetchPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl GithubClientBuilder {
    pub fn try_with_token(self, token: &secrecy::SecretString) -> Result<GithubClientBuilder, Error> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))?;
        value.set_sensitive(true);
        Ok(self.with_header(header::AUTHORIZATION, value))
    }

    pub fn with_user_agent<STR: AsRef<str>>(mut self, user_agent: STR) -> GithubClientBuilder {
        self.user_agent = user_agent.as_ref().to_string();
        self
    }

    pub fn with_api_url<STR: AsRef<str>>(mut self, url: STR) -> GithubClientBuilder {
        self.api_url = url.as_ref().to_string();
        self
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> GithubClientBuilder {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> GithubClientBuilder {
        self.clock = clock;
        self
    }

    fn with_header(mut self, key: HeaderName, val: HeaderValue) -> GithubClientBuilder {
        self.headers.insert(key, val);
        self
    }

    pub fn build(mut self) -> Result<GithubClient, Error> {
        self.headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        self.headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            HeaderValue::from_static(API_VERSION),
        );
        self.headers
            .insert(header::USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        let api_url = Url::parse(&self.api_url)?;
        if api_url.cannot_be_a_base() {
            return Err(Error::NotABase(api_url));
        }
        let http = self.client_builder.default_headers(self.headers).build()?;
        Ok(GithubClient {
            fetcher: Fetcher::new(http, self.policy, self.clock),
            api_url,
        })
    }
}
