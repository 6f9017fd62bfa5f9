use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use strum_macros::Display;

use crate::commit::CommitRecord;

static NOREPLY_EMAIL: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^(?:\d+\+)?([^@]+)@users\.noreply\.github\.com$")
        .case_insensitive(true)
        .build()
        .expect("noreply pattern is a valid regex")
});

/// Where an identity was taken from, in order of precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    DetailLogin,
    ListLogin,
    EmailSearch,
    NoreplyEmail,
    AuthorName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub verified: bool,
    pub source: IdentitySource,
}

impl Identity {
    fn new(username: &str, source: IdentitySource) -> Self {
        Identity {
            username: username.to_string(),
            verified: source != IdentitySource::AuthorName,
            source,
        }
    }

    /// Key under which the identity is aggregated, usernames are case-insensitive.
    pub fn key(&self) -> String {
        self.username.to_lowercase()
    }
}

/// Everything known about the author of a single commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorCandidates<'a> {
    pub detail_login: Option<&'a str>,
    pub list_login: Option<&'a str>,
    pub searched_login: Option<&'a str>,
    pub email: &'a str,
    pub name: &'a str,
}

impl<'a> AuthorCandidates<'a> {
    pub fn from_record(record: &'a CommitRecord) -> Self {
        AuthorCandidates {
            detail_login: record.author.login.as_deref(),
            list_login: None,
            searched_login: None,
            email: &record.author.email,
            name: &record.author.name,
        }
    }

    pub fn with_list_login(mut self, login: Option<&'a str>) -> Self {
        self.list_login = login;
        self
    }

    pub fn with_searched_login(mut self, login: Option<&'a str>) -> Self {
        self.searched_login = login;
        self
    }

    /// True when no platform login is known and an email search could still help.
    pub fn needs_search(&self) -> bool {
        non_blank(self.detail_login).is_none()
            && non_blank(self.list_login).is_none()
            && login_from_noreply_email(self.email).is_none()
            && is_searchable_email(self.email)
    }

    pub fn resolve(&self) -> Option<Identity> {
        if let Some(login) = non_blank(self.detail_login) {
            return Some(Identity::new(login, IdentitySource::DetailLogin));
        }
        if let Some(login) = non_blank(self.list_login) {
            return Some(Identity::new(login, IdentitySource::ListLogin));
        }
        if let Some(login) = non_blank(self.searched_login) {
            return Some(Identity::new(login, IdentitySource::EmailSearch));
        }
        if let Some(login) = login_from_noreply_email(self.email) {
            return Some(Identity::new(login, IdentitySource::NoreplyEmail));
        }
        non_blank(Some(self.name)).map(|name| Identity::new(name, IdentitySource::AuthorName))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Extracts the login from `12345+login@users.noreply.github.com` or `login@users.noreply.github.com`.
pub fn login_from_noreply_email(email: &str) -> Option<&str> {
    NOREPLY_EMAIL
        .captures(email.trim())
        .and_then(|captures| captures.get(1))
        .map(|login| login.as_str())
}

/// Whether searching accounts by this address is worth an API call.
pub fn is_searchable_email(email: &str) -> bool {
    let lower = email.to_lowercase();
    lower.contains('@') && !lower.contains("noreply") && !lower.contains("localhost")
}
