use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::aggregator::{AggregationMode, ContributorAggregator, FoldStats};
use crate::api::{Client, Repo};
use crate::cache::CommitCache;
use crate::classifier::{classify, QuarterlyReport};
use crate::commit::{CommitRecord, ListedCommit};
use crate::config::{CacheRetention, CensusConfig};
use crate::identity::AuthorCandidates;
use crate::paginator::{collect_filtered_pages, collect_pages};
use crate::window::{Quarter, TimeWindow};

use super::{probe_rate_limit, ApiCallStats, CollectionError, EmailLookup, Endpoint};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub failures: usize,
}

/// Result of a quarterly run. The commit cache stays open until the retention policy is applied.
#[derive(Debug)]
pub struct QuarterlyRun {
    pub report: QuarterlyReport,
    pub folds: FoldStats,
    pub cache_stats: CacheStats,
    pub calls: ApiCallStats,
    cache: CommitCache,
}

impl QuarterlyRun {
    /// To be called once the report is safely stored.
    pub async fn apply_retention(mut self, retention: CacheRetention) {
        match retention {
            CacheRetention::Keep => info!("Commit cache kept at {}", self.cache.file().display()),
            CacheRetention::DeleteOnSuccess => {
                if let Err(err) = self.cache.clear().await {
                    warn!("Failed to remove commit cache: {}", err);
                }
            }
        }
    }
}

pub struct QuarterlyPipeline<'a, C: ?Sized> {
    client: &'a C,
    config: &'a CensusConfig,
}

impl<'a, C> QuarterlyPipeline<'a, C>
where
    C: Client + ?Sized,
{
    pub fn new(client: &'a C, config: &'a CensusConfig) -> Self {
        QuarterlyPipeline { client, config }
    }

    pub async fn run(&self, quarter: Quarter, now: DateTime<Utc>) -> Result<QuarterlyRun, CollectionError> {
        let org = self.config.org.as_str();
        let settings = &self.config.quarterly;
        let window = quarter.window();
        info!(
            "Collecting contributors of {} for {} ({} to {})",
            org,
            quarter,
            window.since_param(),
            window.until_param().unwrap_or_default()
        );
        probe_rate_limit(self.client, self.config.rate_limit_warning).await;

        let mut calls = ApiCallStats::default();
        let mut cache = CommitCache::open(&settings.cache_dir).await;
        let repos = self.org_repos(&mut calls).await;
        if repos.is_empty() {
            return Err(CollectionError::NoRepositories(org.to_string()));
        }
        info!("Found {} repositories in {}", repos.len(), org);

        let mut aggregator = ContributorAggregator::new(
            AggregationMode::Full,
            self.config.valid_commit_threshold,
            self.config.local_offset(),
        );
        let mut emails = EmailLookup::new(self.config.search_by_email);
        let mut cache_stats = CacheStats::default();

        for (position, repo) in repos.iter().enumerate() {
            let commits = self.commits(&repo.name, &window, &mut calls).await;
            debug!("{}: {} commits in {}", repo.name, commits.len(), quarter);
            for listed in &commits {
                let record = match self.detail(&mut cache, &repo.name, listed, &mut calls, &mut cache_stats).await {
                    Some(record) => record,
                    None => continue,
                };
                let candidates = AuthorCandidates::from_record(&record).with_list_login(listed.login.as_deref());
                let searched = emails.lookup(self.client, &candidates, &mut calls).await;
                aggregator.fold(&record, candidates.with_searched_login(searched.as_deref()));
            }
            if settings.checkpoint_every > 0 && (position + 1) % settings.checkpoint_every == 0 {
                checkpoint(&cache).await;
                info!(
                    "Progress: {}/{} repositories, {} contributors, {} cached commits",
                    position + 1,
                    repos.len(),
                    aggregator.len(),
                    cache.len()
                );
            }
        }
        checkpoint(&cache).await;

        let folds = aggregator.stats();
        info!(
            "Counted {} commits ({} valid), skipped {} bot and {} unattributed commits",
            folds.counted, folds.valid, folds.bots, folds.unattributed
        );
        info!(
            "Commit details: {} cached, {} fetched, {} unavailable",
            cache_stats.hits, cache_stats.misses, cache_stats.failures
        );

        let contributors = aggregator.finish();
        let tiered = classify(&contributors, &self.config.tiers);
        let report = QuarterlyReport::new(
            quarter,
            &window,
            tiered,
            &self.config.tiers,
            self.config.valid_commit_threshold,
            now,
        );
        info!(
            "{}: {} contributors ({} outstanding, {} excellent, {} active)",
            quarter,
            report.meta.total_contributors,
            report.meta.outstanding_count,
            report.meta.excellent_count,
            report.meta.active_count
        );
        Ok(QuarterlyRun {
            report,
            folds,
            cache_stats,
            calls,
            cache,
        })
    }

    async fn org_repos(&self, calls: &mut ApiCallStats) -> Vec<Repo> {
        let client = self.client;
        let org = self.config.org.as_str();
        collect_filtered_pages(
            "organization repositories",
            self.config.quarterly.repos,
            None,
            move |page, per_page| {
                calls.count(Endpoint::ReposList);
                client.org_repos(org, page, per_page)
            },
            |repo: &Repo| !repo.fork,
        )
        .await
    }

    /// Commits dated inside `window`. The API bound on `until` is inclusive, so commits dated at
    /// the start of the next quarter are dropped here.
    async fn commits(&self, repo: &str, window: &TimeWindow, calls: &mut ApiCallStats) -> Vec<ListedCommit> {
        let client = self.client;
        let org = self.config.org.as_str();
        let mut commits = collect_pages(
            &format!("{} commits", repo),
            self.config.quarterly.commits,
            move |page, per_page| {
                calls.count(Endpoint::Commits);
                client.repo_commits(org, repo, window, page, per_page)
            },
        )
        .await;
        commits.retain(|listed| window.contains(&listed.record.date));
        commits
    }

    /// Commit detail from the cache, fetched and cached on a miss.
    async fn detail(
        &self,
        cache: &mut CommitCache,
        repo: &str,
        listed: &ListedCommit,
        calls: &mut ApiCallStats,
        stats: &mut CacheStats,
    ) -> Option<CommitRecord> {
        if let Some(record) = cache.get(repo, &listed.full_sha) {
            stats.hits += 1;
            return Some(record.clone());
        }
        calls.count(Endpoint::CommitDetails);
        match self.client.commit_detail(&self.config.org, repo, &listed.full_sha).await {
            Ok(record) => {
                stats.misses += 1;
                cache.set(repo, &listed.full_sha, record.clone());
                Some(record)
            }
            Err(err) => {
                stats.failures += 1;
                warn!("Failed to get commit {} of {}: {}", listed.record.sha, repo, err);
                None
            }
        }
    }
}

async fn checkpoint(cache: &CommitCache) {
    if let Err(err) = cache.persist().await {
        warn!("Failed to save commit cache to {}: {}", cache.file().display(), err);
    }
}
