use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use org_census::classifier::QuarterlyReport;
use org_census::pipeline::members::{CommitActivityReport, MemberRecord};
use serde::Serialize;
use tokio::fs;

pub const MEMBERS_CSV: &str = "members.csv";
pub const MEMBERS_JSON: &str = "members.json";
pub const COMMITS_FILE: &str = "commits_weekly.json";

/// Flat members row, shared by the CSV and the JSON file. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberRow {
    pub id: String,
    pub name: String,
    pub github: String,
    pub domain: String,
    pub primary_domain: String,
    pub repositories: String,
    pub public_repos: u32,
    pub total_stars: u64,
    pub followers: u32,
    pub following: u32,
    pub org_repos_count: usize,
    pub org_total_stars: u64,
    pub org_total_forks: u64,
    pub org_total_contributions: u32,
    pub org_avg_stars_per_repo: f64,
    pub avatar: String,
    pub bio: String,
    pub location: String,
    pub company: String,
}

impl From<&MemberRecord> for MemberRow {
    fn from(member: &MemberRecord) -> Self {
        MemberRow {
            id: clean_field(&member.id),
            name: clean_field(&member.name),
            github: clean_field(&member.github),
            domain: member.domains.join(";"),
            primary_domain: clean_field(&member.primary_domain),
            repositories: member.repositories.join(";"),
            public_repos: member.personal.public_repos,
            total_stars: member.personal.total_stars,
            followers: member.personal.followers,
            following: member.personal.following,
            org_repos_count: member.org.org_repos_count,
            org_total_stars: member.org.org_total_stars,
            org_total_forks: member.org.org_total_forks,
            org_total_contributions: member.org.org_total_contributions,
            org_avg_stars_per_repo: round2(member.org.org_avg_stars_per_repo),
            avatar: clean_field(member.avatar.as_deref().unwrap_or_default()),
            bio: clean_field(&member.bio),
            location: clean_field(&member.location),
            company: clean_field(&member.company),
        }
    }
}

/// Single line text: line breaks and whitespace runs become one space.
pub fn clean_field(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Where the reports of one organization land.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        OutputLayout { dir: dir.into() }
    }

    pub fn members_csv(&self) -> PathBuf {
        self.dir.join(MEMBERS_CSV)
    }

    pub fn members_json(&self) -> PathBuf {
        self.dir.join(MEMBERS_JSON)
    }

    pub fn commits(&self) -> PathBuf {
        self.dir.join(COMMITS_FILE)
    }

    pub fn quarterly(&self, org: &str, file_name: &str) -> PathBuf {
        self.dir.join(org).join(file_name)
    }

    pub fn has_members(&self) -> bool {
        self.members_csv().exists() || self.members_json().exists()
    }

    pub async fn write_members(&self, members: &[MemberRecord]) -> anyhow::Result<()> {
        let rows: Vec<MemberRow> = members.iter().map(MemberRow::from).collect();
        write_file(&self.members_csv(), csv_bytes(&rows)?).await?;
        write_file(&self.members_json(), json_bytes(&rows)?).await?;
        info!("Wrote {} members to {}", rows.len(), self.dir.display());
        Ok(())
    }

    pub async fn write_activity(&self, activity: &CommitActivityReport) -> anyhow::Result<()> {
        write_file(&self.commits(), json_bytes(activity)?).await
    }

    pub async fn write_quarterly(&self, org: &str, report: &QuarterlyReport) -> anyhow::Result<PathBuf> {
        let path = self.quarterly(org, &report.file_name());
        write_file(&path, json_bytes(report)?).await?;
        info!("Wrote quarterly report to {}", path.display());
        Ok(path)
    }
}

async fn write_file(path: &Path, contents: Vec<u8>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn csv_bytes(rows: &[MemberRow]) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut bytes);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    Ok(bytes)
}

/// JSON indented by four spaces.
fn json_bytes<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value.serialize(&mut serializer)?;
    Ok(bytes)
}
