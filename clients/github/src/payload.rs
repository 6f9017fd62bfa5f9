use chrono::{DateTime, Utc};
use org_census::api;
use org_census::commit::{CommitAuthor, CommitRecord, FileChange, ListedCommit};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Repo {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub watchers_count: u32,
    #[serde(default)]
    pub open_issues_count: u32,
}

impl From<Repo> for api::Repo {
    fn from(repo: Repo) -> Self {
        api::Repo::new(
            repo.name,
            repo.fork,
            repo.stargazers_count,
            repo.forks_count,
            repo.watchers_count,
            repo.open_issues_count,
        )
    }
}

#[derive(Deserialize, Debug)]
pub struct Contributor {
    /// Absent for anonymous contributors.
    pub login: Option<String>,
    #[serde(default)]
    pub contributions: u32,
    pub html_url: Option<String>,
    pub avatar_url: Option<String>,
}

impl Contributor {
    pub fn into_contributor(self) -> Option<api::Contributor> {
        let login = self.login?;
        let html_url = self
            .html_url
            .unwrap_or_else(|| format!("https://github.com/{}", login));
        Some(api::Contributor::new(login, self.contributions, html_url, self.avatar_url))
    }
}

/// Platform account linked to a commit.
#[derive(Deserialize, Debug)]
pub struct Account {
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CommitPerson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct CommitInfo {
    pub author: Option<CommitPerson>,
    pub committer: Option<CommitPerson>,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct File {
    pub filename: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default)]
    pub changes: u32,
}

impl From<File> for FileChange {
    fn from(file: File) -> Self {
        FileChange {
            filename: file.filename,
            additions: file.additions,
            deletions: file.deletions,
            changes: file.changes,
        }
    }
}

/// Commit as returned by both the commit list and the commit detail endpoints. Only the
/// detail endpoint fills `files`.
#[derive(Deserialize, Debug)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitInfo,
    pub author: Option<Account>,
    pub html_url: Option<String>,
    #[serde(default)]
    pub files: Vec<File>,
}

impl Commit {
    fn date(&self) -> Option<DateTime<Utc>> {
        let author_date = self.commit.author.as_ref().and_then(|author| author.date);
        author_date.or_else(|| self.commit.committer.as_ref().and_then(|committer| committer.date))
    }

    /// `None` when the commit carries no date at all.
    pub fn into_record(self, repo: &str) -> Option<CommitRecord> {
        let date = self.date()?;
        let person = self.commit.author.as_ref();
        let author = CommitAuthor {
            login: self.author.as_ref().map(|account| account.login.clone()),
            name: person.and_then(|person| person.name.clone()).unwrap_or_default(),
            email: person.and_then(|person| person.email.clone()).unwrap_or_default(),
        };
        Some(CommitRecord::new(
            &self.sha,
            repo,
            author,
            date,
            &self.commit.message,
            self.html_url,
            self.files.into_iter().map(FileChange::from).collect(),
        ))
    }

    pub fn into_listed(self, repo: &str) -> Option<ListedCommit> {
        let full_sha = self.sha.clone();
        let login = self.author.as_ref().map(|account| account.login.clone());
        let avatar_url = self.author.as_ref().and_then(|account| account.avatar_url.clone());
        let record = self.into_record(repo)?;
        Some(ListedCommit {
            full_sha,
            login,
            avatar_url,
            record,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct User {
    pub login: String,
    pub name: Option<String>,
    pub html_url: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
}

impl From<User> for api::UserProfile {
    fn from(user: User) -> Self {
        api::UserProfile {
            login: user.login,
            name: user.name,
            html_url: user.html_url,
            avatar_url: user.avatar_url,
            bio: user.bio,
            location: user.location,
            company: user.company,
            account_type: user.account_type,
            public_repos: user.public_repos,
            followers: user.followers,
            following: user.following,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct UserRepo {
    pub name: String,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl From<UserRepo> for api::UserRepo {
    fn from(repo: UserRepo) -> Self {
        api::UserRepo::new(repo.name, repo.stargazers_count, repo.topics)
    }
}

#[derive(Deserialize, Debug)]
pub struct SearchUsers {
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub items: Vec<Account>,
}

impl SearchUsers {
    /// Login of the only match, ambiguous results give nothing.
    pub fn single_login(self) -> Option<String> {
        if self.total_count != 1 {
            return None;
        }
        self.items.into_iter().next().map(|account| account.login)
    }
}

#[derive(Deserialize, Debug)]
pub struct RateLimitBody {
    pub resources: RateLimitResources,
}

#[derive(Deserialize, Debug)]
pub struct RateLimitResources {
    pub core: RateLimitResource,
}

#[derive(Deserialize, Debug)]
pub struct RateLimitResource {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
}

impl From<RateLimitBody> for api::RateLimitStatus {
    fn from(body: RateLimitBody) -> Self {
        let core = body.resources.core;
        api::RateLimitStatus::new(core.limit, core.remaining, core.reset)
    }
}
