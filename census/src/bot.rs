//! Detection of automation accounts.
//!
//! Letting a bot through is acceptable, excluding a real contributor is not. Only exact names,
//! strict naming patterns and platform provided account metadata are used.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Confirmed automation accounts, lower case.
pub const BOT_USERNAMES: &[&str] = &[
    // platform automation
    "actions-user",
    "github-actions",
    "github-actions[bot]",
    "web-flow",
    "github-merge-queue[bot]",
    // dependabot
    "dependabot",
    "dependabot[bot]",
    "dependabot-preview[bot]",
    // well known apps
    "renovate[bot]",
    "greenkeeper[bot]",
    "codecov[bot]",
    "whitesource-bolt-for-github[bot]",
    "allcontributors[bot]",
    "imgbot[bot]",
    "stale[bot]",
    "pre-commit-ci[bot]",
    "mergify[bot]",
    "sonarcloud[bot]",
    "deepsource-autofix[bot]",
    "gitpod-io[bot]",
    "restyled-io[bot]",
    // bots without the suffix
    "snyk-bot",
    "semantic-release-bot",
    "pyup-bot",
    "pyup.io-bot",
    "houndci-bot",
    "coveralls",
    "travis-ci",
    "circleci",
    "claude",
    // not an account at all
    "noreply",
    "no-reply",
    "invalid-email-address",
];

const BOT_PATTERNS: &[&str] = &[r".*\[bot\]$", r"^\d+\+.*@users\.noreply\.github\.com$"];

const BOT_COMPANIES: &[&str] = &["@actions", "@github", "@dependabot", "@renovatebot"];

static BOT_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    BOT_PATTERNS
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("bot patterns are valid regexes")
        })
        .collect()
});

/// Account metadata returned by the user profile endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDetails {
    pub account_type: Option<String>,
    pub company: Option<String>,
}

pub fn is_bot(username: &str, details: Option<&AccountDetails>) -> bool {
    if username.is_empty() {
        return true;
    }
    let lower = username.to_lowercase();
    if BOT_USERNAMES.contains(&lower.as_str()) {
        return true;
    }
    if BOT_REGEXES.iter().any(|regex| regex.is_match(username)) {
        return true;
    }
    match details {
        Some(details) => details_say_bot(details),
        None => false,
    }
}

fn details_say_bot(details: &AccountDetails) -> bool {
    let bot_type = details
        .account_type
        .as_deref()
        .map(|account_type| account_type.eq_ignore_ascii_case("bot"))
        .unwrap_or(false);
    let bot_company = details
        .company
        .as_deref()
        .map(|company| BOT_COMPANIES.contains(&company.trim().to_lowercase().as_str()))
        .unwrap_or(false);
    bot_type || bot_company
}

/// Tests

#[test]
fn deny_list_matches_in_any_case() {
    for name in BOT_USERNAMES {
        assert!(is_bot(name, None), "{}", name);
        assert!(is_bot(&name.to_uppercase(), None), "{}", name);
    }
}

#[test]
fn bot_suffix_matches() {
    assert!(is_bot("my-custom-app[bot]", None));
    assert!(is_bot("Some-App[BOT]", None));
    assert!(!is_bot("bot-lover", None));
    assert!(!is_bot("[bot]maker", None));
}

#[test]
fn noreply_address_matches() {
    assert!(is_bot("123456+octobot@users.noreply.github.com", None));
    assert!(is_bot("1+alice@USERS.NOREPLY.GITHUB.COM", None));
    assert!(!is_bot("alice@users.noreply.github.com", None));
}

#[test]
fn empty_username_is_invalid() {
    assert!(is_bot("", None));
}

#[test]
fn real_users_pass() {
    for name in ["alice", "bob", "robotics-fan", "claude-shannon", "dependabot-fan"] {
        assert!(!is_bot(name, None), "{}", name);
        assert!(!is_bot(name, Some(&AccountDetails::default())), "{}", name);
    }
}

#[test]
fn account_details_are_consulted() {
    let bot_type = AccountDetails {
        account_type: Some("Bot".to_string()),
        company: None,
    };
    assert!(is_bot("helper", Some(&bot_type)));

    let bot_company = AccountDetails {
        account_type: Some("User".to_string()),
        company: Some("@GitHub".to_string()),
    };
    assert!(is_bot("helper", Some(&bot_company)));

    let padded_company = AccountDetails {
        account_type: None,
        company: Some(" @Dependabot\n".to_string()),
    };
    assert!(is_bot("helper", Some(&padded_company)));

    let human = AccountDetails {
        account_type: Some("User".to_string()),
        company: Some("@acme".to_string()),
    };
    assert!(!is_bot("helper", Some(&human)));
}
