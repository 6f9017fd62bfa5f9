use async_trait::async_trait;
use log::warn;
use org_census::api;
use org_census::api::{Contributor, RateLimitStatus, Repo, Result, UserProfile, UserRepo};
use org_census::commit::{CommitRecord, ListedCommit};
use org_census::window::TimeWindow;
use serde::de::DeserializeOwned;
use strum_macros::AsRefStr;
use thiserror::Error;
use url::Url;

pub mod avatar;
pub mod builder;
pub mod clock;
pub mod fetcher;
pub mod limiter;
pub mod payload;
pub mod retry;

pub use avatar::AvatarDownloader;
pub use builder::GithubClientBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use retry::{BackoffPolicy, FetchPolicy};

use fetcher::Fetcher;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid API url: {0}")]
    Url(#[from] url::ParseError),
    #[error("API url cannot be a base: {0}")]
    NotABase(Url),
}

impl From<Error> for api::Error {
    fn from(err: Error) -> Self {
        api::Error::Other(err.into())
    }
}

#[derive(AsRefStr)]
#[strum(serialize_all = "lowercase")]
enum RepoType {
    Public,
}

#[derive(AsRefStr)]
#[strum(serialize_all = "lowercase")]
enum RepoSort {
    Updated,
}

pub struct GithubClient {
    fetcher: Fetcher,
    api_url: Url,
}

impl GithubClient {
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        // base checked by the builder
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let body = self
            .fetcher
            .fetch(&url)
            .await
            .ok_or_else(|| api::Error::Unavailable(url.to_string()))?;
        serde_json::from_value(body).map_err(|source| api::Error::Payload {
            url: url.to_string(),
            source,
        })
    }
}

fn with_page(mut url: Url, page: u32, per_page: u32) -> Url {
    url.query_pairs_mut()
        .append_pair("per_page", &per_page.to_string())
        .append_pair("page", &page.to_string());
    url
}

#[async_trait]
impl api::Client for GithubClient {
    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        let url = self.endpoint(&["rate_limit"]);
        let body = self
            .fetcher
            .probe(&url)
            .await
            .ok_or_else(|| api::Error::Unavailable(url.to_string()))?;
        let body: payload::RateLimitBody = serde_json::from_value(body).map_err(|source| api::Error::Payload {
            url: url.to_string(),
            source,
        })?;
        Ok(body.into())
    }

    async fn org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<Repo>> {
        let mut url = self.endpoint(&["orgs", org, "repos"]);
        url.query_pairs_mut()
            .append_pair("type", RepoType::Public.as_ref())
            .append_pair("sort", RepoSort::Updated.as_ref());
        let repos: Vec<payload::Repo> = self.get(with_page(url, page, per_page)).await?;
        Ok(repos.into_iter().map(Repo::from).collect())
    }

    async fn repo_contributors(&self, org: &str, repo: &str, page: u32, per_page: u32) -> Result<Vec<Contributor>> {
        let url = self.endpoint(&["repos", org, repo, "contributors"]);
        let contributors: Vec<payload::Contributor> = self.get(with_page(url, page, per_page)).await?;
        Ok(contributors
            .into_iter()
            .filter_map(payload::Contributor::into_contributor)
            .collect())
    }

    async fn repo_commits(
        &self,
        org: &str,
        repo: &str,
        window: &TimeWindow,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ListedCommit>> {
        let mut url = self.endpoint(&["repos", org, repo, "commits"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("since", &window.since_param());
            if let Some(until) = window.until_param() {
                query.append_pair("until", &until);
            }
        }
        let commits: Vec<payload::Commit> = self.get(with_page(url, page, per_page)).await?;
        Ok(commits
            .into_iter()
            .filter_map(|commit| {
                let sha = commit.sha.clone();
                let listed = commit.into_listed(repo);
                if listed.is_none() {
                    warn!("Skipping commit {} of {} without a date", sha, repo);
                }
                listed
            })
            .collect())
    }

    async fn commit_detail(&self, org: &str, repo: &str, sha: &str) -> Result<CommitRecord> {
        let url = self.endpoint(&["repos", org, repo, "commits", sha]);
        let commit: payload::Commit = self.get(url).await?;
        commit
            .into_record(repo)
            .ok_or(api::Error::Error("commit without a date"))
    }

    async fn user(&self, login: &str) -> Result<UserProfile> {
        let user: payload::User = self.get(self.endpoint(&["users", login])).await?;
        Ok(user.into())
    }

    async fn user_repos(&self, login: &str, per_page: u32) -> Result<Vec<UserRepo>> {
        let mut url = self.endpoint(&["users", login, "repos"]);
        url.query_pairs_mut()
            .append_pair("sort", RepoSort::Updated.as_ref())
            .append_pair("per_page", &per_page.to_string());
        let repos: Vec<payload::UserRepo> = self.get(url).await?;
        Ok(repos.into_iter().map(UserRepo::from).collect())
    }

    async fn search_user_by_email(&self, email: &str) -> Result<Option<String>> {
        let mut url = self.endpoint(&["search", "users"]);
        url.query_pairs_mut().append_pair("q", &format!("{} in:email", email));
        let found: payload::SearchUsers = self.get(url).await?;
        Ok(found.single_login())
    }
}
