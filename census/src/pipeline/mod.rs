//! Sequential collection runs over an organization.

pub mod members;
pub mod quarterly;

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::api::Client;
use crate::identity::AuthorCandidates;

pub use members::{MembersPipeline, MembersReport};
pub use quarterly::{QuarterlyPipeline, QuarterlyRun};

/// Failure leaving a pipeline without anything worth writing.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("No repositories found for organization {0}")]
    NoRepositories(String),
    #[error("No members could be collected for organization {0}")]
    NoMembers(String),
}

/// Number of API requests issued by a run, per endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApiCallStats {
    pub repos_list: u32,
    pub contributors: u32,
    pub commits: u32,
    pub commit_details: u32,
    pub users: u32,
    pub user_repos: u32,
    pub email_searches: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Endpoint {
    ReposList,
    Contributors,
    Commits,
    CommitDetails,
    Users,
    UserRepos,
    EmailSearch,
}

impl ApiCallStats {
    pub(crate) fn count(&mut self, endpoint: Endpoint) {
        let counter = match endpoint {
            Endpoint::ReposList => &mut self.repos_list,
            Endpoint::Contributors => &mut self.contributors,
            Endpoint::Commits => &mut self.commits,
            Endpoint::CommitDetails => &mut self.commit_details,
            Endpoint::Users => &mut self.users,
            Endpoint::UserRepos => &mut self.user_repos,
            Endpoint::EmailSearch => &mut self.email_searches,
        };
        *counter += 1;
        self.total += 1;
    }
}

/// Logs the remaining request quota. Never fails the run.
pub async fn probe_rate_limit<C: Client + ?Sized>(client: &C, warning_threshold: u32) {
    match client.rate_limit().await {
        Ok(status) if status.remaining < warning_threshold => warn!(
            "API rate limit is low: {}/{} requests remaining, reset at {}",
            status.remaining, status.limit, status.reset
        ),
        Ok(status) => info!("API rate limit: {}/{} requests remaining", status.remaining, status.limit),
        Err(err) => warn!("Failed to check the API rate limit: {}", err),
    }
}

/// Account search by commit email, remembered per address for the whole run.
#[derive(Debug, Default)]
pub(crate) struct EmailLookup {
    enabled: bool,
    known: HashMap<String, Option<String>>,
}

impl EmailLookup {
    pub(crate) fn new(enabled: bool) -> Self {
        EmailLookup {
            enabled,
            known: HashMap::new(),
        }
    }

    /// Login owning the commit email, searched only when nothing better identifies the author.
    pub(crate) async fn lookup<C: Client + ?Sized>(
        &mut self,
        client: &C,
        candidates: &AuthorCandidates<'_>,
        calls: &mut ApiCallStats,
    ) -> Option<String> {
        if !self.enabled || !candidates.needs_search() {
            return None;
        }
        let email = candidates.email.trim().to_lowercase();
        if let Some(known) = self.known.get(&email) {
            return known.clone();
        }
        calls.count(Endpoint::EmailSearch);
        let login = match client.search_user_by_email(&email).await {
            Ok(login) => login,
            Err(err) => {
                warn!("Failed to search user by email {}: {}", email, err);
                None
            }
        };
        debug!("Email {} resolved to {:?}", email, login);
        self.known.insert(email, login.clone());
        login
    }
}

#[cfg(test)]
pub(crate) mod fake;
