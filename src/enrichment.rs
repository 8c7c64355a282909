use crate::format::format_stat;
use crate::github::RepositorySource;
use crate::types::{LanguageDistribution, Repository};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Contributor total for one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum ContributorCount {
    Pending,
    Known(u64),
    Unavailable,
}

impl fmt::Display for ContributorCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributorCount::Pending => write!(f, "..."),
            ContributorCount::Known(count) => write!(f, "{}", format_stat(*count)),
            ContributorCount::Unavailable => write!(f, "N/A"),
        }
    }
}

/// Extract the `page` number of the `rel="last"` entry of a `Link` header.
pub fn parse_last_page(link_header: &str) -> Option<u64> {
    link_header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_last = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"last\"" || param == "rel=last"
        });
        if !is_last {
            return None;
        }

        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse::<u64>().ok())
    })
}

/// Both enrichment values for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub contributors: ContributorCount,
    pub languages: Option<LanguageDistribution>,
}

/// Fetch contributor count and language breakdown concurrently. Neither
/// fetch can fail the other.
pub async fn enrich(source: &dyn RepositorySource, repo: &Repository) -> Enrichment {
    let (contributors, languages) =
        tokio::join!(source.contributor_count(repo), source.languages(repo));

    Enrichment {
        contributors,
        languages,
    }
}

pub async fn enrich_all(
    source: &dyn RepositorySource,
    repos: &[Repository],
) -> Vec<Enrichment> {
    join_all(repos.iter().map(|repo| enrich(source, repo))).await
}
