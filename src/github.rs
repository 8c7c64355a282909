use crate::enrichment::{parse_last_page, ContributorCount};
use crate::error::{RepoLookError, Result};
use crate::query::{SearchQuery, SearchResults, USER_REPOS_PAGE_SIZE};
use crate::types::{LanguageDistribution, Repository};
use chrono::DateTime;
use reqwest::header::LINK;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const API_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("RepoLook/", env!("CARGO_PKG_VERSION"));

/// Read side of GitHub that the session and the HTTP handlers depend on.
///
/// `search` is the only call whose failures are reported to the user. The
/// enrichment calls fold every failure into their "missing" value.
#[ractor::async_trait]
pub trait RepositorySource: Send + Sync + 'static {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Repository>>;

    async fn contributor_count(&self, repo: &Repository) -> ContributorCount;

    async fn languages(&self, repo: &Repository) -> Option<LanguageDistribution>;
}

pub struct GitHubClient {
    client: Client,
    base_url: Url,
}

impl GitHubClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(GitHubClient {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RepoLookError::UrlError(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Single attempt, no retry. Status codes are mapped onto the error
    /// taxonomy here so callers only see successful responses.
    async fn make_request(&self, url: Url) -> Result<Response> {
        debug!(%url, "GitHub request");

        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(RepoLookError::NotFound(url.path().to_string())),
            StatusCode::FORBIDDEN => {
                let reset_at = response
                    .headers()
                    .get("x-ratelimit-reset")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0));

                warn!(%url, ?reset_at, "GitHub rate limit exceeded");
                Err(RepoLookError::RateLimited { reset_at })
            }
            status => {
                warn!(%url, %status, "GitHub request failed");
                Err(RepoLookError::UnexpectedStatus(status))
            }
        }
    }

    pub async fn get_repository_info(&self, owner: &str, name: &str) -> Result<Repository> {
        let url = self.endpoint(&["repos", owner, name])?;
        let response = self.make_request(url).await?;
        let repo: Repository = response.json().await?;
        Ok(repo)
    }

    pub async fn list_user_repositories(&self, login: &str) -> Result<Vec<Repository>> {
        let mut url = self.endpoint(&["users", login, "repos"])?;
        url.query_pairs_mut()
            .append_pair("sort", "updated")
            .append_pair("per_page", &USER_REPOS_PAGE_SIZE.to_string());

        let response = self.make_request(url).await?;
        let repos: Vec<Repository> = response.json().await?;
        Ok(repos)
    }

    pub async fn search_repositories(&self, query: &SearchQuery) -> Result<SearchResults> {
        match query {
            SearchQuery::Repository { owner, name } => self
                .get_repository_info(owner, name)
                .await
                .map(SearchResults::One),
            SearchQuery::User(login) => self
                .list_user_repositories(login)
                .await
                .map(SearchResults::Many),
        }
    }

    /// Ask for one contributor per page so the `rel="last"` page number is
    /// the contributor total. Without pagination links, count the body.
    pub async fn fetch_contributor_count(&self, contributors_url: &str) -> Result<u64> {
        let mut url = Url::parse(contributors_url)?;
        url.query_pairs_mut().append_pair("per_page", "1");

        let response = self.make_request(url).await?;

        let last_page = response
            .headers()
            .get(LINK)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_last_page);

        if let Some(count) = last_page {
            return Ok(count);
        }

        let contributors: Vec<serde_json::Value> = response.json().await?;
        Ok(contributors.len() as u64)
    }

    pub async fn fetch_languages(&self, languages_url: &str) -> Result<LanguageDistribution> {
        let url = Url::parse(languages_url)?;
        let response = self.make_request(url).await?;
        let languages: LanguageDistribution = response.json().await?;
        Ok(languages)
    }
}

#[ractor::async_trait]
impl RepositorySource for GitHubClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Repository>> {
        let results = self.search_repositories(query).await?;
        Ok(results.into_repositories())
    }

    async fn contributor_count(&self, repo: &Repository) -> ContributorCount {
        match self.fetch_contributor_count(&repo.contributors_url).await {
            Ok(count) => ContributorCount::Known(count),
            Err(e) => {
                debug!(repo = %repo.full_name, "Contributor count unavailable: {}", e);
                ContributorCount::Unavailable
            }
        }
    }

    async fn languages(&self, repo: &Repository) -> Option<LanguageDistribution> {
        match self.fetch_languages(&repo.languages_url).await {
            Ok(languages) if !languages.is_empty() => Some(languages),
            Ok(_) => None,
            Err(e) => {
                debug!(repo = %repo.full_name, "Language breakdown unavailable: {}", e);
                None
            }
        }
    }
}
