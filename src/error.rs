use chrono::{DateTime, Local, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoLookError {
    #[error("Repository or user not found. Please check the name and try again.")]
    NotFound(String),

    #[error("API rate limit exceeded. Please try again {}.", reset_phrase(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("An unexpected error occurred while fetching data.")]
    UnexpectedStatus(StatusCode),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("Suggestion backend error: {0}")]
    SuggestionError(String),

    #[error("Session error: {0}")]
    SessionError(String),
}

pub type Result<T> = std::result::Result<T, RepoLookError>;

/// Coarse classification of a failed search, as shown in the view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    RateLimited,
    UnexpectedUpstream,
    NetworkOrParsing,
    InvalidQuery,
    Internal,
}

impl RepoLookError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RepoLookError::NotFound(_) => FailureKind::NotFound,
            RepoLookError::RateLimited { .. } => FailureKind::RateLimited,
            RepoLookError::UnexpectedStatus(_) => FailureKind::UnexpectedUpstream,
            RepoLookError::NetworkError(_)
            | RepoLookError::JsonError(_)
            | RepoLookError::UrlError(_) => FailureKind::NetworkOrParsing,
            RepoLookError::InvalidQuery(_) => FailureKind::InvalidQuery,
            RepoLookError::IoError(_)
            | RepoLookError::SuggestionError(_)
            | RepoLookError::SessionError(_) => FailureKind::Internal,
        }
    }
}

/// A search failure in the shape the view layer keeps around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFailure {
    pub kind: FailureKind,
    pub message: String,
}

const GENERIC_FAILURE_MESSAGE: &str = "An unexpected error occurred while fetching data.";

impl From<&RepoLookError> for SearchFailure {
    fn from(err: &RepoLookError) -> Self {
        let kind = err.kind();
        // transport and decoding details stay in the logs
        let message = match kind {
            FailureKind::NetworkOrParsing => GENERIC_FAILURE_MESSAGE.to_string(),
            _ => err.to_string(),
        };
        SearchFailure { kind, message }
    }
}

impl From<RepoLookError> for SearchFailure {
    fn from(err: RepoLookError) -> Self {
        SearchFailure::from(&err)
    }
}

fn reset_phrase(reset_at: &Option<DateTime<Utc>>) -> String {
    format_reset_time(*reset_at)
}

/// Render a rate-limit reset instant as a local wall-clock time, or "later"
/// when the upstream did not say.
pub fn format_reset_time(reset_at: Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => at.with_timezone(&Local).format("%-I:%M:%S %p").to_string(),
        None => "later".to_string(),
    }
}
