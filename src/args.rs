use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use org_census::config::DEFAULT_ORG;
use org_census::window::Quarter;
use secrecy::SecretString;
use std::path::PathBuf;
use std::{
    fmt::{Debug, Display},
    ops::RangeInclusive,
    str::FromStr,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    /// Organization to survey
    #[clap(short, long, env = "GITHUB_ORG", default_value = DEFAULT_ORG)]
    pub org: String,

    /// API OAuth access token
    #[clap(short, long, env = "GITHUB_TOKEN")]
    pub api_token: Option<SecretString>,

    /// Repository API URL
    #[clap(long, env, default_value = "https://api.github.com")]
    pub api_url: String,

    /// Directory receiving the members and quarterly reports
    #[clap(long, env, default_value = "docs/public/data")]
    pub output_dir: PathBuf,

    /// Directory receiving downloaded avatars
    #[clap(long, env, default_value = "docs/public/avatars")]
    pub avatars_dir: PathBuf,

    /// Directory of the commit detail cache
    #[clap(long, env, default_value = "cache/quarterly_stats")]
    pub cache_dir: PathBuf,

    /// Keep the commit cache after a successful quarterly run (default)
    #[clap(long, conflicts_with = "delete-cache")]
    pub keep_cache: bool,

    /// Remove the commit cache after a successful quarterly run
    #[clap(long)]
    pub delete_cache: bool,

    /// Contributors with fewer contributions to a repository are ignored there
    #[clap(long, env, default_value_t = 0)]
    pub min_contributions: u32,

    /// Search accounts by commit email when a commit has no linked account
    #[clap(long)]
    pub search_by_email: bool,

    /// Attempts per API request
    #[clap(long, env, default_value_t = 3, parse(try_from_str=max_retries_in_range))]
    pub max_retries: u32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect organization members, their domains and their commits of the last week
    Members {
        /// Bounded run over the first repositories only
        #[clap(long)]
        test: bool,
    },
    /// Classify contributors of a calendar quarter by valid commits
    Quarterly(QuarterArgs),
}

#[derive(clap::Args, Debug)]
#[clap(group(ArgGroup::new("period").required(true).args(&["last", "current", "year"])))]
pub struct QuarterArgs {
    /// Quarter before the current one
    #[clap(long)]
    pub last: bool,

    /// Quarter in progress
    #[clap(long)]
    pub current: bool,

    #[clap(requires = "quarter", parse(try_from_str=year_in_range))]
    pub year: Option<i32>,

    /// Quarter number, 1 to 4
    #[clap(parse(try_from_str=quarter_in_range))]
    pub quarter: Option<u32>,
}

impl QuarterArgs {
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<Quarter> {
        let current = Quarter::containing(&now);
        if self.last {
            return Some(current.previous());
        }
        if self.current {
            return Some(current);
        }
        Quarter::new(self.year?, self.quarter?)
    }
}

fn max_retries_in_range(value: &str) -> clap::Result<u32, String> {
    number_in_range(value, 1..=10, "--max-retries")
}

fn year_in_range(value: &str) -> clap::Result<i32, String> {
    number_in_range(value, 2008..=9999, "<YEAR>")
}

fn quarter_in_range(value: &str) -> clap::Result<u32, String> {
    number_in_range(value, 1..=4, "<QUARTER>")
}

fn number_in_range<T>(value: &str, range: RangeInclusive<T>, option: &str) -> clap::Result<T, String>
where
    T: FromStr + PartialOrd + Display,
    <T as FromStr>::Err: Display,
{
    let number = value
        .parse::<T>()
        .map_err(|err| format!("{} expects a whole number, got '{}' ({})", option, value, err))?;
    if !range.contains(&number) {
        return Err(format!(
            "{} must be between {} and {}, got {}",
            option,
            range.start(),
            range.end(),
            number
        ));
    }
    Ok(number)
}
