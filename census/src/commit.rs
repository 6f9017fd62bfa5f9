use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SHORT_SHA_LEN: usize = 8;
pub const MAX_MESSAGE_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default)]
    pub changes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitAuthor {
    /// Platform account the commit is linked to, if the platform could link it.
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Commit as known to the census. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub repo: String,
    pub author: CommitAuthor,
    pub date: DateTime<Utc>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

impl CommitRecord {
    pub fn new(
        sha: &str,
        repo: impl Into<String>,
        author: CommitAuthor,
        date: DateTime<Utc>,
        message: &str,
        url: Option<String>,
        files: Vec<FileChange>,
    ) -> Self {
        CommitRecord {
            sha: short_sha(sha),
            repo: repo.into(),
            author,
            date,
            message: first_line(message),
            url,
            files,
        }
    }

    /// A commit is valid when at least one changed file adds `threshold` lines or more.
    pub fn is_valid(&self, threshold: u32) -> bool {
        self.files.iter().any(|file| file.additions >= threshold)
    }

    pub fn total_additions(&self) -> u32 {
        self.files.iter().map(|file| file.additions).sum()
    }
}

/// Entry of the commit list endpoint. The list endpoint sometimes links a commit to an account
/// the detail endpoint does not, so its login is kept next to the record.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedCommit {
    pub full_sha: String,
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub record: CommitRecord,
}

pub fn short_sha(sha: &str) -> String {
    sha.chars().take(SHORT_SHA_LEN).collect()
}

pub fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().chars().take(MAX_MESSAGE_LEN).collect()
}
