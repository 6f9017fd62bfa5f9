//! One pass over the organization repositories collecting members, their contributions and
//! the commits of the last days.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::aggregator::{AggregationMode, CommitSummary, ContributorAggregate, ContributorAggregator, FoldOutcome};
use crate::api::{AvatarStore, Client, Contributor, Repo, UserProfile, UserRepo};
use crate::bot::is_bot;
use crate::commit::ListedCommit;
use crate::config::CensusConfig;
use crate::domain::DomainTables;
use crate::identity::AuthorCandidates;
use crate::paginator::{collect_filtered_pages, collect_pages};
use crate::window::TimeWindow;

use super::{probe_rate_limit, ApiCallStats, CollectionError, EmailLookup, Endpoint};

const PROGRESS_EVERY: usize = 10;

/// Organization repository figures used for the organization scoped member statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub name: String,
    pub stars: u32,
    pub forks: u32,
    pub watchers: u32,
    pub open_issues: u32,
}

impl From<&Repo> for RepoSnapshot {
    fn from(repo: &Repo) -> Self {
        RepoSnapshot {
            name: repo.name.clone(),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            watchers: repo.watchers_count,
            open_issues: repo.open_issues_count,
        }
    }
}

/// Contributor found in the organization before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberCandidate {
    pub login: String,
    pub html_url: String,
    pub avatar_url: Option<String>,
    /// Organization repositories in discovery order.
    pub repos: Vec<String>,
    pub total_contributions: u32,
}

/// Contributors in order of discovery, keyed case-insensitively.
#[derive(Debug, Default)]
pub struct ContributorTable {
    index: HashMap<String, usize>,
    candidates: Vec<MemberCandidate>,
}

impl ContributorTable {
    fn entry(&mut self, login: &str, avatar_url: Option<&str>) -> (&mut MemberCandidate, bool) {
        let key = login.to_lowercase();
        let (position, created) = match self.index.get(&key) {
            Some(position) => (*position, false),
            None => {
                self.candidates.push(MemberCandidate {
                    login: login.to_string(),
                    html_url: format!("https://github.com/{}", login),
                    avatar_url: avatar_url.map(str::to_string),
                    repos: Vec::new(),
                    total_contributions: 0,
                });
                self.index.insert(key, self.candidates.len() - 1);
                (self.candidates.len() - 1, true)
            }
        };
        (&mut self.candidates[position], created)
    }

    /// Adds the contributions a repository reports for `contributor`.
    pub fn add_contributor(&mut self, contributor: &Contributor, repo: &str) {
        let (candidate, created) = self.entry(&contributor.login, contributor.avatar_url.as_deref());
        if created {
            candidate.html_url = contributor.html_url.clone();
        }
        push_unique(&mut candidate.repos, repo);
        candidate.total_contributions += contributor.contributions;
    }

    /// Makes sure the author of a recent commit is a member. New members start with one contribution.
    pub fn add_committer(&mut self, login: &str, avatar_url: Option<&str>, repo: &str) {
        let (candidate, created) = self.entry(login, avatar_url);
        if created {
            candidate.total_contributions = 1;
            debug!("New contributor from commits: {}", login);
        }
        push_unique(&mut candidate.repos, repo);
    }

    pub fn get(&self, login: &str) -> Option<&MemberCandidate> {
        self.index
            .get(&login.to_lowercase())
            .map(|position| &self.candidates[*position])
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_candidates(self) -> Vec<MemberCandidate> {
        self.candidates
    }
}

fn push_unique(repos: &mut Vec<String>, repo: &str) {
    if !repos.iter().any(|known| known == repo) {
        repos.push(repo.to_string());
    }
}

/// Figures of the member's own account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersonalStats {
    pub public_repos: u32,
    /// Stars summed over the listed personal repositories.
    pub total_stars: u64,
    pub followers: u32,
    pub following: u32,
}

impl PersonalStats {
    pub fn new(profile: Option<&UserProfile>, repos: &[UserRepo]) -> Self {
        match profile {
            Some(profile) => PersonalStats {
                public_repos: profile.public_repos,
                total_stars: repos.iter().map(|repo| u64::from(repo.stargazers_count)).sum(),
                followers: profile.followers,
                following: profile.following,
            },
            None => PersonalStats::default(),
        }
    }
}

/// Figures of the organization repositories the member contributed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OrgStats {
    pub org_repos_count: usize,
    pub org_total_stars: u64,
    pub org_total_forks: u64,
    pub org_total_contributions: u32,
    pub org_avg_stars_per_repo: f64,
}

impl OrgStats {
    pub fn new(candidate: &MemberCandidate, snapshots: &HashMap<String, RepoSnapshot>) -> Self {
        let participated = candidate.repos.iter().filter_map(|repo| snapshots.get(repo));
        let (stars, forks) = participated.fold((0u64, 0u64), |(stars, forks), snapshot| {
            (stars + u64::from(snapshot.stars), forks + u64::from(snapshot.forks))
        });
        let repos_count = candidate.repos.len();
        OrgStats {
            org_repos_count: repos_count,
            org_total_stars: stars,
            org_total_forks: forks,
            org_total_contributions: candidate.total_contributions,
            org_avg_stars_per_repo: if repos_count > 0 {
                stars as f64 / repos_count as f64
            } else {
                0.0
            },
        }
    }
}

/// One row of the members report.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRecord {
    pub id: String,
    pub name: String,
    pub github: String,
    pub domains: Vec<String>,
    pub primary_domain: String,
    pub repositories: Vec<String>,
    pub personal: PersonalStats,
    pub org: OrgStats,
    /// Avatar path relative to the site root.
    pub avatar: Option<String>,
    pub bio: String,
    pub location: String,
    pub company: String,
}

/// Recent commit activity of one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivity {
    pub total_commits: u32,
    pub repos: Vec<String>,
    pub repo_commits: BTreeMap<String, u32>,
    pub repo_count: usize,
    pub daily_commits: BTreeMap<NaiveDate, u32>,
    pub hourly_distribution: BTreeMap<u32, u32>,
    pub local_hourly_distribution: BTreeMap<u32, u32>,
    pub night_owl_commits: u32,
    pub night_owl_percentage: f64,
    pub commit_messages: Vec<CommitSummary>,
    pub first_commit_date: Option<DateTime<Utc>>,
    pub last_commit_date: Option<DateTime<Utc>>,
    pub active_days: usize,
    pub avg_commits_per_day: f64,
}

impl From<&ContributorAggregate> for UserActivity {
    fn from(aggregate: &ContributorAggregate) -> Self {
        let activity = &aggregate.activity;
        UserActivity {
            total_commits: aggregate.total_commits,
            repos: aggregate.repos.iter().cloned().collect(),
            repo_commits: aggregate.repo_commits.clone(),
            repo_count: aggregate.repos.len(),
            daily_commits: activity.daily_commits.clone(),
            hourly_distribution: activity.hourly_distribution.clone(),
            local_hourly_distribution: activity.local_hourly_distribution.clone(),
            night_owl_commits: activity.night_owl_commits,
            night_owl_percentage: aggregate.night_owl_percentage(),
            commit_messages: aggregate.recent_commits.clone(),
            first_commit_date: activity.first_commit,
            last_commit_date: activity.last_commit,
            active_days: activity.active_days(),
            avg_commits_per_day: aggregate.avg_commits_per_day(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub api_calls: ApiCallStats,
    pub execution_time: String,
}

/// Commits of the last days, per user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitActivityReport {
    pub update_time: DateTime<Utc>,
    pub days_range: u32,
    pub total_commits: usize,
    pub total_repos: usize,
    pub user_commits: BTreeMap<String, UserActivity>,
    pub run_stats: RunStats,
}

#[derive(Debug)]
pub struct MembersReport {
    pub members: Vec<MemberRecord>,
    pub activity: CommitActivityReport,
}

/// Recent commits seen during the repository pass.
#[derive(Debug, Default)]
struct CommitTally {
    total: usize,
    repos: BTreeSet<String>,
}

pub struct MembersPipeline<'a, C: ?Sized, A: ?Sized> {
    client: &'a C,
    avatars: &'a A,
    config: &'a CensusConfig,
    domains: DomainTables,
}

impl<'a, C, A> MembersPipeline<'a, C, A>
where
    C: Client + ?Sized,
    A: AvatarStore + ?Sized,
{
    pub fn new(client: &'a C, avatars: &'a A, config: &'a CensusConfig) -> Self {
        MembersPipeline {
            client,
            avatars,
            config,
            domains: DomainTables::default(),
        }
    }

    pub fn with_domains(self, domains: DomainTables) -> Self {
        MembersPipeline { domains, ..self }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<MembersReport, CollectionError> {
        let started = Instant::now();
        let org = self.config.org.as_str();
        let settings = &self.config.members;
        probe_rate_limit(self.client, self.config.rate_limit_warning).await;

        let mut calls = ApiCallStats::default();
        let repos = self.org_repos(&mut calls).await;
        if repos.is_empty() {
            return Err(CollectionError::NoRepositories(org.to_string()));
        }
        info!("Found {} repositories in {}", repos.len(), org);

        let window = TimeWindow::last_days(now, settings.commit_days);
        let mut snapshots = HashMap::new();
        let mut table = ContributorTable::default();
        let mut aggregator = ContributorAggregator::new(
            AggregationMode::Lightweight,
            self.config.valid_commit_threshold,
            self.config.local_offset(),
        );
        let mut emails = EmailLookup::new(self.config.search_by_email);
        let mut tally = CommitTally::default();

        for (position, repo) in repos.iter().enumerate() {
            debug!("Processing repository {}/{}: {}", position + 1, repos.len(), repo.name);
            snapshots.insert(repo.name.clone(), RepoSnapshot::from(repo));
            self.collect_contributors(&repo.name, &mut table, &mut calls).await;
            let commits = self.recent_commits(&repo.name, &window, &mut calls).await;
            for listed in &commits {
                self.fold_commit(listed, &mut table, &mut aggregator, &mut emails, &mut calls, &mut tally)
                    .await;
            }
            if (position + 1) % PROGRESS_EVERY == 0 {
                info!(
                    "Progress: {}/{} repositories, {} contributors, {} API calls, {:.1}s",
                    position + 1,
                    repos.len(),
                    table.len(),
                    calls.total,
                    started.elapsed().as_secs_f64()
                );
            }
        }
        info!(
            "Collected {} contributors and {} recent commits from {} repositories",
            table.len(),
            tally.total,
            repos.len()
        );

        let mut members = Vec::new();
        for candidate in table.into_candidates() {
            let activity = aggregator.get(&candidate.login);
            if let Some(member) = self.enrich(candidate, activity, &snapshots, &mut calls).await {
                members.push(member);
            }
        }
        if members.is_empty() {
            return Err(CollectionError::NoMembers(org.to_string()));
        }
        info!("Processed {} members with {} API calls", members.len(), calls.total);

        let user_commits = aggregator
            .finish()
            .iter()
            .map(|aggregate| (aggregate.username.clone(), UserActivity::from(aggregate)))
            .collect();
        let activity = CommitActivityReport {
            update_time: now,
            days_range: settings.commit_days,
            total_commits: tally.total,
            total_repos: tally.repos.len(),
            user_commits,
            run_stats: RunStats {
                api_calls: calls,
                execution_time: format!("{:.1}s", started.elapsed().as_secs_f64()),
            },
        };
        Ok(MembersReport { members, activity })
    }

    async fn org_repos(&self, calls: &mut ApiCallStats) -> Vec<Repo> {
        let client = self.client;
        let org = self.config.org.as_str();
        let settings = &self.config.members;
        collect_filtered_pages(
            "organization repositories",
            settings.repos,
            settings.max_repos,
            move |page, per_page| {
                calls.count(Endpoint::ReposList);
                client.org_repos(org, page, per_page)
            },
            |repo: &Repo| !repo.fork,
        )
        .await
    }

    async fn collect_contributors(&self, repo: &str, table: &mut ContributorTable, calls: &mut ApiCallStats) {
        let client = self.client;
        let org = self.config.org.as_str();
        let min_contributions = self.config.members.min_contributions;
        let contributors = collect_pages(
            &format!("{} contributors", repo),
            self.config.members.contributors,
            move |page, per_page| {
                calls.count(Endpoint::Contributors);
                client.repo_contributors(org, repo, page, per_page)
            },
        )
        .await;
        let mut kept = 0;
        for contributor in contributors
            .iter()
            .filter(|contributor| contributor.contributions >= min_contributions)
        {
            if is_bot(&contributor.login, None) {
                debug!("Skipping bot account {} in {}", contributor.login, repo);
                continue;
            }
            table.add_contributor(contributor, repo);
            kept += 1;
        }
        debug!("{}: {} contributors", repo, kept);
    }

    async fn recent_commits(&self, repo: &str, window: &TimeWindow, calls: &mut ApiCallStats) -> Vec<ListedCommit> {
        let client = self.client;
        let org = self.config.org.as_str();
        collect_pages(
            &format!("{} commits", repo),
            self.config.members.commits,
            move |page, per_page| {
                calls.count(Endpoint::Commits);
                client.repo_commits(org, repo, window, page, per_page)
            },
        )
        .await
    }

    async fn fold_commit(
        &self,
        listed: &ListedCommit,
        table: &mut ContributorTable,
        aggregator: &mut ContributorAggregator,
        emails: &mut EmailLookup,
        calls: &mut ApiCallStats,
        tally: &mut CommitTally,
    ) {
        let record = &listed.record;
        let candidates = AuthorCandidates::from_record(record).with_list_login(listed.login.as_deref());
        let searched = emails.lookup(self.client, &candidates, calls).await;
        let candidates = candidates.with_searched_login(searched.as_deref());
        match aggregator.fold(record, candidates) {
            FoldOutcome::Counted { .. } => {
                tally.total += 1;
                tally.repos.insert(record.repo.clone());
                if let Some(identity) = candidates.resolve().filter(|identity| identity.verified) {
                    table.add_committer(&identity.username, listed.avatar_url.as_deref(), &record.repo);
                }
            }
            FoldOutcome::SkippedBot(username) => debug!("Skipping bot commit {} by {}", record.sha, username),
            FoldOutcome::Unattributed => {
                tally.total += 1;
                tally.repos.insert(record.repo.clone());
            }
        }
    }

    async fn enrich(
        &self,
        candidate: MemberCandidate,
        activity: Option<&ContributorAggregate>,
        snapshots: &HashMap<String, RepoSnapshot>,
        calls: &mut ApiCallStats,
    ) -> Option<MemberRecord> {
        let login = candidate.login.as_str();
        calls.count(Endpoint::Users);
        let profile = match self.client.user(login).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!("Failed to get profile of {}: {}", login, err);
                None
            }
        };
        if let Some(profile) = &profile {
            if is_bot(login, Some(&profile.account_details())) {
                info!("Skipping bot account {}", login);
                return None;
            }
        }

        calls.count(Endpoint::UserRepos);
        let user_repos = self
            .client
            .user_repos(login, self.config.members.max_user_repos)
            .await
            .unwrap_or_else(|err| {
                warn!("Failed to get repositories of {}: {}", login, err);
                Vec::new()
            });

        let personal = PersonalStats::new(profile.as_ref(), &user_repos);
        let org = OrgStats::new(&candidate, snapshots);

        let avatar_url = profile
            .as_ref()
            .and_then(|profile| profile.avatar_url.clone())
            .or_else(|| candidate.avatar_url.clone());
        let avatar = match avatar_url {
            Some(url) => match self.avatars.store(login, &url).await {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!("Failed to store avatar of {}: {}", login, err);
                    None
                }
            },
            None => None,
        };

        let text = |value: Option<&String>| value.cloned().unwrap_or_default();
        let bio = text(profile.as_ref().and_then(|profile| profile.bio.as_ref()));
        let domains = self.domains.infer(&candidate.repos, Some(&bio), &user_repos);
        let primary_domain = self.domains.primary(
            &candidate.repos,
            &domains,
            activity.map(|aggregate| &aggregate.repo_commits),
        );
        debug!("{}: domains {}, primary {}", login, domains.join(", "), primary_domain);

        let name = profile
            .as_ref()
            .and_then(|profile| profile.name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| login.to_string());
        Some(MemberRecord {
            id: candidate.login.clone(),
            name,
            github: candidate.html_url.clone(),
            domains,
            primary_domain,
            location: text(profile.as_ref().and_then(|profile| profile.location.as_ref())),
            company: text(profile.as_ref().and_then(|profile| profile.company.as_ref())),
            bio,
            personal,
            org,
            avatar,
            repositories: candidate.repos,
        })
    }
}
