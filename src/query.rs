use crate::error::{RepoLookError, Result};
use crate::types::Repository;
use std::fmt;

/// Upper bound on how many repositories a user search returns.
pub const USER_REPOS_PAGE_SIZE: usize = 10;

/// What a raw search string asks for. A "/" anywhere in the input means a
/// single repository, anything else is a user login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    User(String),
    Repository { owner: String, name: String },
}

impl SearchQuery {
    pub fn parse(raw: &str) -> Result<Self> {
        let query = raw.trim();
        if query.is_empty() {
            return Err(RepoLookError::InvalidQuery(
                "Please enter a GitHub username or repository.".to_string(),
            ));
        }

        match query.split_once('/') {
            Some((owner, name)) => Ok(SearchQuery::Repository {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            None => Ok(SearchQuery::User(query.to_string())),
        }
    }

    pub fn is_repository(&self) -> bool {
        matches!(self, SearchQuery::Repository { .. })
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchQuery::User(login) => write!(f, "{}", login),
            SearchQuery::Repository { owner, name } => write!(f, "{}/{}", owner, name),
        }
    }
}

/// The two response shapes of a search, resolved right after the fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResults {
    One(Repository),
    Many(Vec<Repository>),
}

impl SearchResults {
    /// Flatten into the card list: most recently updated first, at most one
    /// page.
    pub fn into_repositories(self) -> Vec<Repository> {
        match self {
            SearchResults::One(repo) => vec![repo],
            SearchResults::Many(mut repos) => {
                repos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                repos.truncate(USER_REPOS_PAGE_SIZE);
                repos
            }
        }
    }
}
