use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::aggregator::{CommitSummary, ContributorAggregate};
use crate::window::{Quarter, TimeWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Outstanding,
    Excellent,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierThresholds {
    pub outstanding: u32,
    pub excellent: u32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        TierThresholds {
            outstanding: 50,
            excellent: 10,
        }
    }
}

impl TierThresholds {
    pub fn tier(&self, valid_commits: u32) -> Tier {
        if valid_commits >= self.outstanding {
            Tier::Outstanding
        } else if valid_commits >= self.excellent {
            Tier::Excellent
        } else {
            Tier::Active
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributorEntry {
    pub username: String,
    pub verified: bool,
    pub valid_commits: u32,
    pub total_commits: u32,
    pub repos_count: usize,
    pub repos: Vec<String>,
    pub recent_commits: Vec<CommitSummary>,
}

impl From<&ContributorAggregate> for ContributorEntry {
    fn from(aggregate: &ContributorAggregate) -> Self {
        ContributorEntry {
            username: aggregate.username.clone(),
            verified: aggregate.verified,
            valid_commits: aggregate.valid_commits,
            total_commits: aggregate.total_commits,
            repos_count: aggregate.repos.len(),
            repos: aggregate.repos.iter().cloned().collect(),
            recent_commits: aggregate.recent_commits.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TieredContributors {
    pub outstanding: Vec<ContributorEntry>,
    pub excellent: Vec<ContributorEntry>,
    pub active: Vec<ContributorEntry>,
}

impl TieredContributors {
    pub fn tier(&self, tier: Tier) -> &[ContributorEntry] {
        match tier {
            Tier::Outstanding => &self.outstanding,
            Tier::Excellent => &self.excellent,
            Tier::Active => &self.active,
        }
    }

    pub fn len(&self) -> usize {
        self.outstanding.len() + self.excellent.len() + self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tier_of(&self, username: &str) -> Option<Tier> {
        [Tier::Outstanding, Tier::Excellent, Tier::Active]
            .into_iter()
            .find(|tier| self.tier(*tier).iter().any(|entry| entry.username == username))
    }
}

/// Buckets finalized aggregates into tiers, each sorted by valid commits in descending order.
/// Equal counts keep the aggregation order.
pub fn classify(contributors: &[ContributorAggregate], thresholds: &TierThresholds) -> TieredContributors {
    let mut tiered = TieredContributors::default();
    for contributor in contributors {
        let entry = ContributorEntry::from(contributor);
        match thresholds.tier(contributor.valid_commits) {
            Tier::Outstanding => tiered.outstanding.push(entry),
            Tier::Excellent => tiered.excellent.push(entry),
            Tier::Active => tiered.active.push(entry),
        }
    }
    for tier in [&mut tiered.outstanding, &mut tiered.excellent, &mut tiered.active] {
        tier.sort_by(|a, b| b.valid_commits.cmp(&a.valid_commits));
    }
    tiered
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportThresholds {
    pub outstanding: u32,
    pub excellent: u32,
    pub valid_commit_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub year: i32,
    pub quarter: u32,
    pub since: String,
    pub until: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub total_contributors: usize,
    pub outstanding_count: usize,
    pub excellent_count: usize,
    pub active_count: usize,
    pub thresholds: ReportThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterlyReport {
    pub meta: ReportMeta,
    pub contributors: TieredContributors,
}

impl QuarterlyReport {
    pub fn new(
        quarter: Quarter,
        window: &TimeWindow,
        contributors: TieredContributors,
        thresholds: &TierThresholds,
        valid_commit_threshold: u32,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let meta = ReportMeta {
            year: quarter.year,
            quarter: quarter.quarter,
            since: window.since_param(),
            until: window.until_param(),
            generated_at,
            total_contributors: contributors.len(),
            outstanding_count: contributors.outstanding.len(),
            excellent_count: contributors.excellent.len(),
            active_count: contributors.active.len(),
            thresholds: ReportThresholds {
                outstanding: thresholds.outstanding,
                excellent: thresholds.excellent,
                valid_commit_threshold,
            },
        };
        QuarterlyReport { meta, contributors }
    }

    pub fn file_name(&self) -> String {
        report_file_name(Quarter {
            year: self.meta.year,
            quarter: self.meta.quarter,
        })
    }
}

pub fn report_file_name(quarter: Quarter) -> String {
    format!("quarterly_contributors_{}_Q{}.json", quarter.year, quarter.quarter)
}

/// Tests

#[cfg(test)]
fn aggregate(username: &str, valid_commits: u32) -> ContributorAggregate {
    ContributorAggregate {
        username: username.to_string(),
        verified: true,
        total_commits: valid_commits + 1,
        valid_commits,
        repos: ["repo".to_string()].into_iter().collect(),
        repo_commits: Default::default(),
        recent_commits: Vec::new(),
        activity: Default::default(),
    }
}

#[test]
fn tier_boundaries() {
    let thresholds = TierThresholds::default();
    assert_eq!(thresholds.tier(0), Tier::Active);
    assert_eq!(thresholds.tier(9), Tier::Active);
    assert_eq!(thresholds.tier(10), Tier::Excellent);
    assert_eq!(thresholds.tier(49), Tier::Excellent);
    assert_eq!(thresholds.tier(50), Tier::Outstanding);
}

#[test]
fn tiers_are_sorted_and_stable() {
    let contributors = vec![
        aggregate("a", 12),
        aggregate("b", 60),
        aggregate("c", 30),
        aggregate("d", 12),
        aggregate("e", 3),
        aggregate("f", 7),
    ];
    let tiered = classify(&contributors, &TierThresholds::default());
    let names = |tier: Tier| tiered.tier(tier).iter().map(|e| e.username.as_str()).collect::<Vec<_>>();
    assert_eq!(names(Tier::Outstanding), vec!["b"]);
    assert_eq!(names(Tier::Excellent), vec!["c", "a", "d"]);
    assert_eq!(names(Tier::Active), vec!["f", "e"]);
    assert_eq!(tiered.tier_of("d"), Some(Tier::Excellent));
    assert_eq!(tiered.tier_of("zed"), None);
}

#[test]
fn report_metadata() {
    let contributors = vec![aggregate("a", 12), aggregate("b", 60), aggregate("c", 1)];
    let thresholds = TierThresholds::default();
    let quarter = Quarter::new(2025, 4).unwrap();
    let generated_at = Utc::now();
    let report = QuarterlyReport::new(
        quarter,
        &quarter.window(),
        classify(&contributors, &thresholds),
        &thresholds,
        10,
        generated_at,
    );
    assert_eq!(report.meta.total_contributors, 3);
    assert_eq!(report.meta.outstanding_count, 1);
    assert_eq!(report.meta.excellent_count, 1);
    assert_eq!(report.meta.active_count, 1);
    assert_eq!(report.meta.since, "2025-10-01T00:00:00Z");
    assert_eq!(report.file_name(), "quarterly_contributors_2025_Q4.json");

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["meta"]["thresholds"]["valid_commit_threshold"], 10);
    assert_eq!(json["contributors"]["outstanding"][0]["username"], "b");
    assert_eq!(json["contributors"]["excellent"][0]["repos"][0], "repo");
}

#[test]
fn tier_names() {
    assert_eq!(Tier::Outstanding.to_string(), "outstanding");
    assert_eq!("excellent".parse::<Tier>().unwrap(), Tier::Excellent);
}
