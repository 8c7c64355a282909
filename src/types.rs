use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// GitHub API response structures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub full_name: String,
    pub description: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
    pub contributors_url: String,
    pub languages_url: String,
    pub owner: RepoOwner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoOwner {
    pub login: String,
    pub avatar_url: String,
}

/// Bytes of source attributed to each language, as returned by
/// `GET /repos/{owner}/{repo}/languages`.
pub type LanguageDistribution = BTreeMap<String, u64>;
