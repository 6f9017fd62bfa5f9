use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tokio::fs;

use crate::commit::CommitRecord;

pub const CACHE_FILE_NAME: &str = "commit_details.json";

/// Commit details already fetched, keyed by repository and full commit hash.
///
/// The whole cache is one flat JSON object `{"<repo>:<sha>": <commit>}`. Entries are written once
/// and never invalidated. Nothing is written to disk until [`CommitCache::persist`] is called, so
/// an interrupted run only loses the entries added since the last persist.
#[derive(Debug)]
pub struct CommitCache {
    dir: PathBuf,
    entries: BTreeMap<String, CommitRecord>,
}

impl CommitCache {
    /// Loads the cache stored in `dir`. A missing or unreadable file gives an empty cache.
    pub async fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let entries = match load(&dir.join(CACHE_FILE_NAME)).await {
            Ok(Some(entries)) => entries,
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!("Failed to load commit cache from {}: {}", dir.display(), err);
                BTreeMap::new()
            }
        };
        info!("Commit cache loaded: {} entries", entries.len());
        CommitCache { dir, entries }
    }

    pub fn get(&self, repo: &str, sha: &str) -> Option<&CommitRecord> {
        self.entries.get(&cache_key(repo, sha))
    }

    /// Stores `record` unless the key is already cached.
    pub fn set(&mut self, repo: &str, sha: &str, record: CommitRecord) {
        self.entries.entry(cache_key(repo, sha)).or_insert(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    /// Writes the cache to disk, replacing the previous file in one rename.
    pub async fn persist(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!("{}.tmp", CACHE_FILE_NAME));
        let json = serde_json::to_vec_pretty(&self.entries)?;
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, self.file()).await?;
        debug!("Commit cache saved: {} entries", self.entries.len());
        Ok(())
    }

    /// Removes the cache directory and forgets every entry.
    pub async fn clear(&mut self) -> io::Result<()> {
        self.entries.clear();
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!("Commit cache removed: {}", self.dir.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

pub fn cache_key(repo: &str, sha: &str) -> String {
    format!("{}:{}", repo, sha)
}

async fn load(file: &Path) -> io::Result<Option<BTreeMap<String, CommitRecord>>> {
    let json = match fs::read(file).await {
        Ok(json) => json,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    Ok(Some(serde_json::from_slice(&json)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitAuthor, FileChange};
    use chrono::{TimeZone, Utc};

    fn record(sha: &str) -> CommitRecord {
        CommitRecord::new(
            sha,
            "repo",
            CommitAuthor {
                login: Some("alice".to_string()),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
            Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap(),
            "Add chapter",
            None,
            vec![FileChange {
                filename: "docs/ch1.md".to_string(),
                additions: 42,
                deletions: 1,
                changes: 43,
            }],
        )
    }

    #[tokio::test]
    async fn round_trip_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CommitCache::open(dir.path().join("cache")).await;
        assert!(cache.get("repo", "abc").is_none());
        cache.set("repo", "abcdef1234", record("abcdef1234"));
        assert_eq!(cache.get("repo", "abcdef1234"), Some(&record("abcdef1234")));
        assert!(cache.get("other", "abcdef1234").is_none());
    }

    #[tokio::test]
    async fn entries_are_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CommitCache::open(dir.path()).await;
        cache.set("repo", "sha", record("first000"));
        cache.set("repo", "sha", record("second00"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("repo", "sha").unwrap().sha, "first000");
    }

    #[tokio::test]
    async fn persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("quarterly_stats");
        let mut cache = CommitCache::open(&cache_dir).await;
        cache.set("repo", "abcdef1234", record("abcdef1234"));
        cache.persist().await.unwrap();

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(cache.file()).unwrap()).unwrap();
        assert!(json.get("repo:abcdef1234").is_some());

        let reloaded = CommitCache::open(&cache_dir).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("repo", "abcdef1234"), Some(&record("abcdef1234")));
    }

    #[tokio::test]
    async fn corrupt_file_gives_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CACHE_FILE_NAME), "{not json").unwrap();
        let cache = CommitCache::open(dir.path()).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let mut cache = CommitCache::open(&cache_dir).await;
        cache.set("repo", "sha", record("sha"));
        cache.persist().await.unwrap();
        cache.clear().await.unwrap();
        assert!(!cache_dir.exists());
        assert!(cache.is_empty());
        cache.clear().await.unwrap();
    }
}
