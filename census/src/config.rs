use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};
use derive_more::Constructor;

use crate::classifier::TierThresholds;

pub const DEFAULT_ORG: &str = "datawhalechina";
pub const DEFAULT_VALID_COMMIT_THRESHOLD: u32 = 10;
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;
pub const RATE_LIMIT_WARNING: u32 = 100;
pub const CHECKPOINT_EVERY: usize = 10;

/// Page size and safety cap of a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct PageLimits {
    pub per_page: u32,
    pub max_pages: u32,
}

/// What happens to the commit cache after a successful quarterly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheRetention {
    #[default]
    Keep,
    DeleteOnSuccess,
}

/// Settings shared by both pipelines. Built once at start up and passed by reference.
#[derive(Debug, Clone)]
pub struct CensusConfig {
    pub org: String,
    pub valid_commit_threshold: u32,
    pub tiers: TierThresholds,
    /// Offset of the local time used for time-of-day statistics.
    pub local_utc_offset_hours: i32,
    /// Search accounts by commit email when no login is known. Costs one request per commit.
    pub search_by_email: bool,
    pub rate_limit_warning: u32,
    pub members: MembersConfig,
    pub quarterly: QuarterlyConfig,
}

impl CensusConfig {
    pub fn new(org: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        CensusConfig {
            org: org.into(),
            valid_commit_threshold: DEFAULT_VALID_COMMIT_THRESHOLD,
            tiers: TierThresholds::default(),
            local_utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            search_by_email: false,
            rate_limit_warning: RATE_LIMIT_WARNING,
            members: MembersConfig::default(),
            quarterly: QuarterlyConfig::new(cache_dir),
        }
    }

    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.local_utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone)]
pub struct MembersConfig {
    /// Contributors with fewer contributions in a repository are ignored there.
    pub min_contributions: u32,
    pub repos: PageLimits,
    pub contributors: PageLimits,
    pub commits: PageLimits,
    pub max_user_repos: u32,
    pub commit_days: u32,
    /// Stop listing repositories once this many were collected.
    pub max_repos: Option<usize>,
}

impl Default for MembersConfig {
    fn default() -> Self {
        MembersConfig {
            min_contributions: 0,
            repos: PageLimits::new(100, 20),
            contributors: PageLimits::new(100, 10),
            commits: PageLimits::new(100, 10),
            max_user_repos: 100,
            commit_days: 7,
            max_repos: None,
        }
    }
}

impl MembersConfig {
    /// Bounded run for local checks.
    pub fn test_mode(self) -> Self {
        MembersConfig {
            contributors: PageLimits::new(10, 1),
            max_repos: Some(15),
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuarterlyConfig {
    pub cache_dir: PathBuf,
    pub retention: CacheRetention,
    pub checkpoint_every: usize,
    pub repos: PageLimits,
    pub commits: PageLimits,
}

impl QuarterlyConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        QuarterlyConfig {
            cache_dir: cache_dir.into(),
            retention: CacheRetention::default(),
            checkpoint_every: CHECKPOINT_EVERY,
            repos: PageLimits::new(100, 20),
            commits: PageLimits::new(100, 50),
        }
    }
}
