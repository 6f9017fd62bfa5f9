//! Organization contributor census
//!
//! # Overview
//!
//! Library collecting contribution data of a GitHub organization and turning it into reports
//! for the organization's documentation site.
//!
//! Two pipelines are provided (behind the `pipeline` feature):
//! * the members pipeline walks every original (non-fork) repository of the organization once,
//!   collects its contributors and its commits of the last days, and enriches every contributor
//!   with profile data, personal and organization scoped statistics and inferred topical domains;
//! * the quarterly pipeline walks the commits of a calendar quarter, resolves each of them to its
//!   detail (file level changes) through a persistent cache, counts *valid* commits per
//!   contributor and classifies contributors into tiers.
//!
//! Remote access goes through the [`api::Client`] trait, so the pipelines work with any client
//! (the GitHub one lives in the `org_census_github_client` crate).
//! Everything runs sequentially: requests are never issued in parallel.

#[cfg(feature = "api")]
pub mod api;
pub mod aggregator;
pub mod bot;
pub mod cache;
pub mod classifier;
pub mod commit;
pub mod config;
#[cfg(feature = "api")]
pub mod domain;
pub mod identity;
#[cfg(feature = "api")]
pub mod paginator;
#[cfg(feature = "pipeline")]
pub mod pipeline;
pub mod window;

pub use aggregator::{AggregationMode, ContributorAggregate, ContributorAggregator};
pub use bot::is_bot;
pub use cache::CommitCache;
pub use classifier::{QuarterlyReport, Tier, TierThresholds};
pub use commit::{CommitRecord, FileChange, ListedCommit};
pub use config::{CacheRetention, CensusConfig};
pub use identity::Identity;
pub use window::{Quarter, TimeWindow};
