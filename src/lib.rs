mod args;
pub mod output;

pub use args::{Args, Command, QuarterArgs};

use anyhow::Context;
use chrono::{DateTime, Utc};
use github_client::{AvatarDownloader, FetchPolicy, GithubClient, GithubClientBuilder};
use log::{info, warn};
use org_census::classifier::report_file_name;
use org_census::config::{CacheRetention, CensusConfig, MembersConfig};
use org_census::pipeline::{MembersPipeline, QuarterlyPipeline};
use org_census::window::Quarter;
use output::OutputLayout;

/// How a run ended without an unrecoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Written,
    /// Collection failed, reports of an earlier run are left in place.
    KeptExisting,
}

pub fn census_config(args: &Args) -> CensusConfig {
    let mut config = CensusConfig::new(&args.org, &args.cache_dir);
    config.search_by_email = args.search_by_email;
    config.members = MembersConfig {
        min_contributions: args.min_contributions,
        ..MembersConfig::default()
    };
    if let Command::Members { test: true } = args.command {
        config.members = config.members.test_mode();
    }
    config.quarterly.retention = cache_retention(args);
    config
}

/// `--delete-cache` opts into removal, `--keep-cache` or no flag keeps the cache.
pub fn cache_retention(args: &Args) -> CacheRetention {
    if args.delete_cache && !args.keep_cache {
        CacheRetention::DeleteOnSuccess
    } else {
        CacheRetention::Keep
    }
}

pub fn fetch_policy(args: &Args) -> FetchPolicy {
    FetchPolicy {
        max_retries: args.max_retries,
        ..FetchPolicy::default()
    }
}

pub fn github_client(args: &Args) -> anyhow::Result<GithubClient> {
    let mut client = GithubClientBuilder::default()
        .with_api_url(&args.api_url)
        .with_policy(fetch_policy(args));
    match &args.api_token {
        Some(token) => client = client.try_with_token(token)?,
        None => warn!("No API token configured, requests are limited to 60 per hour"),
    }
    Ok(client.build()?)
}

pub async fn run(args: Args, now: DateTime<Utc>) -> anyhow::Result<Outcome> {
    let config = census_config(&args);
    let client = github_client(&args)?;
    let layout = OutputLayout::new(&args.output_dir);
    match &args.command {
        Command::Members { .. } => {
            let avatars = AvatarDownloader::new(&args.avatars_dir)?;
            let result = run_members(&client, &avatars, &config, &layout, now).await;
            keep_existing(result, layout.has_members())
        }
        Command::Quarterly(period) => {
            let quarter = period.resolve(now).context("Invalid quarter")?;
            let existing = layout
                .quarterly(&config.org, &report_file_name(quarter))
                .exists();
            let result = run_quarterly(&client, &config, &layout, quarter, now).await;
            keep_existing(result, existing)
        }
    }
}

fn keep_existing(result: anyhow::Result<()>, existing: bool) -> anyhow::Result<Outcome> {
    match result {
        Ok(()) => Ok(Outcome::Written),
        Err(err) if existing => {
            warn!("{:#}", err);
            info!("Keeping data of the previous run");
            Ok(Outcome::KeptExisting)
        }
        Err(err) => Err(err.context("No earlier data to fall back to")),
    }
}

pub async fn run_members(
    client: &GithubClient,
    avatars: &AvatarDownloader,
    config: &CensusConfig,
    layout: &OutputLayout,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let report = MembersPipeline::new(client, avatars, config).run(now).await?;
    layout.write_members(&report.members).await?;
    layout.write_activity(&report.activity).await?;
    info!("Members run finished in {}", report.activity.run_stats.execution_time);
    Ok(())
}

pub async fn run_quarterly(
    client: &GithubClient,
    config: &CensusConfig,
    layout: &OutputLayout,
    quarter: Quarter,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let run = QuarterlyPipeline::new(client, config).run(quarter, now).await?;
    layout.write_quarterly(&config.org, &run.report).await?;
    run.apply_retention(config.quarterly.retention).await;
    Ok(())
}
