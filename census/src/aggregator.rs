//! Folding of commits into per-contributor statistics.
//!
//! A single [`ContributorAggregator`] serves both pipelines. In [`AggregationMode::Full`] it folds
//! commit details and keeps file level traces of the recent commits, in
//! [`AggregationMode::Lightweight`] it folds commit list entries (no file data) and keeps links
//! and local times instead. Both modes count every attributed, non-bot commit towards the total
//! and the touched repositories. Valid commits need file data, so they are only ever counted in
//! full mode.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use log::debug;
use serde::Serialize;

use crate::bot::is_bot;
use crate::commit::CommitRecord;
use crate::identity::{AuthorCandidates, IdentitySource};

pub const RECENT_COMMITS_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    Full,
    Lightweight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitSummary {
    pub repo: String,
    pub sha: String,
    pub message: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub night_owl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_additions: Option<u32>,
}

/// When a contributor commits.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityProfile {
    pub daily_commits: BTreeMap<NaiveDate, u32>,
    pub hourly_distribution: BTreeMap<u32, u32>,
    pub local_hourly_distribution: BTreeMap<u32, u32>,
    pub night_owl_commits: u32,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
}

impl ActivityProfile {
    fn record(&mut self, date: DateTime<Utc>, local: DateTime<FixedOffset>) {
        *self.daily_commits.entry(date.date_naive()).or_default() += 1;
        *self.hourly_distribution.entry(date.hour()).or_default() += 1;
        *self.local_hourly_distribution.entry(local.hour()).or_default() += 1;
        if is_night_owl_hour(local.hour()) {
            self.night_owl_commits += 1;
        }
        self.first_commit = Some(self.first_commit.map_or(date, |first| first.min(date)));
        self.last_commit = Some(self.last_commit.map_or(date, |last| last.max(date)));
    }

    pub fn active_days(&self) -> usize {
        self.daily_commits.len()
    }
}

/// Local hours between 22:00 and 06:00.
pub fn is_night_owl_hour(hour: u32) -> bool {
    hour >= 22 || hour < 6
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributorAggregate {
    pub username: String,
    pub verified: bool,
    pub total_commits: u32,
    pub valid_commits: u32,
    pub repos: BTreeSet<String>,
    pub repo_commits: BTreeMap<String, u32>,
    /// Newest first.
    pub recent_commits: Vec<CommitSummary>,
    pub activity: ActivityProfile,
}

impl ContributorAggregate {
    fn new(username: &str, verified: bool) -> Self {
        ContributorAggregate {
            username: username.to_string(),
            verified,
            total_commits: 0,
            valid_commits: 0,
            repos: BTreeSet::new(),
            repo_commits: BTreeMap::new(),
            recent_commits: Vec::new(),
            activity: ActivityProfile::default(),
        }
    }

    fn push_recent(&mut self, summary: CommitSummary) {
        let position = self.recent_commits.partition_point(|recent| recent.date >= summary.date);
        if position < RECENT_COMMITS_CAP {
            self.recent_commits.insert(position, summary);
            self.recent_commits.truncate(RECENT_COMMITS_CAP);
        }
    }

    pub fn night_owl_percentage(&self) -> f64 {
        if self.total_commits == 0 {
            return 0.0;
        }
        let percentage = f64::from(self.activity.night_owl_commits) * 100.0 / f64::from(self.total_commits);
        (percentage * 10.0).round() / 10.0
    }

    pub fn avg_commits_per_day(&self) -> f64 {
        f64::from(self.total_commits) / self.activity.active_days().max(1) as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldOutcome {
    Counted { username: String, valid: bool },
    SkippedBot(String),
    Unattributed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    pub counted: usize,
    pub valid: usize,
    pub bots: usize,
    pub unattributed: usize,
}

#[derive(Debug)]
pub struct ContributorAggregator {
    mode: AggregationMode,
    valid_commit_threshold: u32,
    local_offset: FixedOffset,
    index: HashMap<String, usize>,
    contributors: Vec<ContributorAggregate>,
    stats: FoldStats,
}

impl ContributorAggregator {
    pub fn new(mode: AggregationMode, valid_commit_threshold: u32, local_offset: FixedOffset) -> Self {
        ContributorAggregator {
            mode,
            valid_commit_threshold,
            local_offset,
            index: HashMap::new(),
            contributors: Vec::new(),
            stats: FoldStats::default(),
        }
    }

    pub fn fold(&mut self, record: &CommitRecord, candidates: AuthorCandidates<'_>) -> FoldOutcome {
        let identity = match candidates.resolve() {
            Some(identity) => identity,
            None => {
                debug!("Commit {} in {} has no resolvable author", record.sha, record.repo);
                self.stats.unattributed += 1;
                return FoldOutcome::Unattributed;
            }
        };
        let bot_address = identity.source == IdentitySource::NoreplyEmail && is_bot(candidates.email, None);
        if bot_address || is_bot(&identity.username, None) {
            debug!("Skipping bot commit {} by {}", record.sha, identity.username);
            self.stats.bots += 1;
            return FoldOutcome::SkippedBot(identity.username);
        }

        let valid = self.mode == AggregationMode::Full && record.is_valid(self.valid_commit_threshold);
        let summary = self.summary(record);
        let local = record.date.with_timezone(&self.local_offset);

        let position = match self.index.get(&identity.key()) {
            Some(position) => *position,
            None => {
                self.contributors
                    .push(ContributorAggregate::new(&identity.username, identity.verified));
                self.index.insert(identity.key(), self.contributors.len() - 1);
                self.contributors.len() - 1
            }
        };
        let contributor = &mut self.contributors[position];
        contributor.verified |= identity.verified;
        contributor.total_commits += 1;
        if valid {
            contributor.valid_commits += 1;
        }
        contributor.repos.insert(record.repo.clone());
        *contributor.repo_commits.entry(record.repo.clone()).or_default() += 1;
        contributor.activity.record(record.date, local);
        contributor.push_recent(summary);

        self.stats.counted += 1;
        if valid {
            self.stats.valid += 1;
        }
        FoldOutcome::Counted {
            username: contributor.username.clone(),
            valid,
        }
    }

    fn summary(&self, record: &CommitRecord) -> CommitSummary {
        let mut summary = CommitSummary {
            repo: record.repo.clone(),
            sha: record.sha.clone(),
            message: record.message.clone(),
            date: record.date,
            url: None,
            local_time: None,
            night_owl: None,
            files_count: None,
            total_additions: None,
        };
        match self.mode {
            AggregationMode::Full => {
                summary.files_count = Some(record.files.len());
                summary.total_additions = Some(record.total_additions());
            }
            AggregationMode::Lightweight => {
                let local = record.date.with_timezone(&self.local_offset);
                summary.url = record.url.clone();
                summary.night_owl = Some(is_night_owl_hour(local.hour()));
                summary.local_time = Some(local);
            }
        }
        summary
    }

    pub fn get(&self, username: &str) -> Option<&ContributorAggregate> {
        self.index
            .get(&username.to_lowercase())
            .map(|position| &self.contributors[*position])
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    pub fn stats(&self) -> FoldStats {
        self.stats
    }

    /// Contributors in order of their first attributed commit.
    pub fn finish(self) -> Vec<ContributorAggregate> {
        self.contributors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitAuthor, FileChange};
    use chrono::{Duration, TimeZone};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn commit(repo: &str, n: i64, login: Option<&str>, email: &str, name: &str, additions: &[u32]) -> CommitRecord {
        let files = additions
            .iter()
            .enumerate()
            .map(|(i, additions)| FileChange {
                filename: format!("file{}.md", i),
                additions: *additions,
                deletions: 0,
                changes: *additions,
            })
            .collect();
        CommitRecord::new(
            &format!("{:040x}", n),
            repo,
            CommitAuthor {
                login: login.map(str::to_string),
                name: name.to_string(),
                email: email.to_string(),
            },
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(n),
            "Update docs",
            Some(format!("https://github.com/org/{}/commit/{}", repo, n)),
            files,
        )
    }

    fn full() -> ContributorAggregator {
        ContributorAggregator::new(AggregationMode::Full, 10, offset())
    }

    fn fold(aggregator: &mut ContributorAggregator, record: &CommitRecord) -> FoldOutcome {
        aggregator.fold(record, AuthorCandidates::from_record(record))
    }

    #[test]
    fn counts_valid_and_total() {
        let mut aggregator = full();
        fold(&mut aggregator, &commit("A", 1, Some("alice"), "", "Alice", &[15]));
        fold(&mut aggregator, &commit("A", 2, Some("alice"), "", "Alice", &[9]));
        fold(&mut aggregator, &commit("B", 3, Some("Alice"), "", "Alice", &[10, 2]));
        let alice = aggregator.get("ALICE").unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.total_commits, 3);
        assert_eq!(alice.valid_commits, 2);
        assert_eq!(alice.repos.iter().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(alice.repo_commits["A"], 2);
        assert_eq!(aggregator.len(), 1);
    }

    #[test]
    fn list_login_is_used_when_detail_has_none() {
        let mut aggregator = full();
        let record = commit("A", 1, None, "bob@example.com", "Bob B", &[20]);
        let outcome = aggregator.fold(&record, AuthorCandidates::from_record(&record).with_list_login(Some("bob")));
        assert_eq!(
            outcome,
            FoldOutcome::Counted {
                username: "bob".to_string(),
                valid: true
            }
        );
        assert!(aggregator.get("bob").unwrap().verified);
    }

    #[test]
    fn verification_only_strengthens() {
        let mut aggregator = full();
        fold(&mut aggregator, &commit("A", 1, None, "carol@example.com", "carol", &[20]));
        assert!(!aggregator.get("carol").unwrap().verified);
        fold(&mut aggregator, &commit("A", 2, Some("carol"), "", "Carol", &[20]));
        assert!(aggregator.get("carol").unwrap().verified);
        fold(&mut aggregator, &commit("A", 3, None, "carol@example.com", "carol", &[20]));
        let carol = aggregator.get("carol").unwrap();
        assert!(carol.verified);
        assert_eq!(carol.total_commits, 3);
    }

    #[test]
    fn bots_are_skipped() {
        let mut aggregator = full();
        let outcome = fold(&mut aggregator, &commit("A", 1, Some("dependabot[bot]"), "", "", &[100]));
        assert_eq!(outcome, FoldOutcome::SkippedBot("dependabot[bot]".to_string()));
        let outcome = fold(
            &mut aggregator,
            &commit("A", 2, None, "123456+octobot@users.noreply.github.com", "octobot", &[100]),
        );
        assert!(matches!(outcome, FoldOutcome::SkippedBot(_)));
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.stats().bots, 2);
    }

    #[test]
    fn unattributed_commit_is_dropped() {
        let mut aggregator = full();
        let outcome = fold(&mut aggregator, &commit("A", 1, None, "", "", &[100]));
        assert_eq!(outcome, FoldOutcome::Unattributed);
        assert!(aggregator.is_empty());
    }

    #[test]
    fn recent_commits_are_bounded_and_newest_first() {
        let mut aggregator = full();
        for n in [5, 1, 12, 3, 8, 14, 2, 9, 7, 11, 6, 4, 13, 10] {
            fold(&mut aggregator, &commit("A", n, Some("dan"), "", "Dan", &[20]));
        }
        let dan = aggregator.get("dan").unwrap();
        assert_eq!(dan.total_commits, 14);
        assert_eq!(dan.recent_commits.len(), RECENT_COMMITS_CAP);
        let hours: Vec<i64> = dan
            .recent_commits
            .iter()
            .map(|summary| (summary.date - Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()).num_hours())
            .collect();
        assert_eq!(hours, vec![14, 13, 12, 11, 10, 9, 8, 7, 6, 5]);
        assert_eq!(dan.recent_commits[0].files_count, Some(1));
        assert_eq!(dan.recent_commits[0].total_additions, Some(20));
        assert_eq!(dan.recent_commits[0].url, None);
    }

    #[test]
    fn lightweight_mode_tracks_activity_without_validity() {
        let mut aggregator = ContributorAggregator::new(AggregationMode::Lightweight, 10, offset());
        // 2025-01-01T15:00Z is 23:00 at UTC+8
        fold(&mut aggregator, &commit("A", 15, Some("erin"), "", "Erin", &[]));
        fold(&mut aggregator, &commit("B", 30, Some("erin"), "", "Erin", &[]));
        let erin = aggregator.get("erin").unwrap();
        assert_eq!(erin.total_commits, 2);
        assert_eq!(erin.valid_commits, 0);
        assert_eq!(erin.activity.night_owl_commits, 1);
        assert_eq!(erin.night_owl_percentage(), 50.0);
        assert_eq!(erin.activity.active_days(), 2);
        assert_eq!(erin.activity.hourly_distribution[&15], 1);
        assert_eq!(erin.activity.local_hourly_distribution[&23], 1);
        let newest = &erin.recent_commits[0];
        assert_eq!(newest.repo, "B");
        assert!(newest.url.is_some());
        assert_eq!(newest.files_count, None);
        assert_eq!(erin.activity.first_commit, Some(Utc.with_ymd_and_hms(2025, 1, 1, 15, 0, 0).unwrap()));
    }

    #[test]
    fn identical_streams_give_identical_aggregates() {
        let records: Vec<CommitRecord> = (0..30)
            .map(|n| {
                let login = ["a", "b", "c"][(n % 3) as usize];
                commit("A", n, Some(login), "", login, &[(n as u32) % 20])
            })
            .collect();
        let run = || {
            let mut aggregator = full();
            for record in &records {
                fold(&mut aggregator, record);
            }
            aggregator.finish()
        };
        assert_eq!(run(), run());
    }
}
