use crate::error::{RepoLookError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub const NO_SUGGESTIONS_MESSAGE: &str = "No suggestions found for this repository.";
pub const SUGGESTION_FAILED_MESSAGE: &str =
    "Failed to fetch related repositories. Please try again later.";

/// A generative backend that names repositories related to `owner/repo`.
#[ractor::async_trait]
pub trait Suggester: Send + Sync + 'static {
    async fn suggest_related(&self, full_name: &str) -> Result<Vec<String>>;
}

/// What a suggestion request resolved to, as shown on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SuggestionOutcome {
    Suggestions { repositories: Vec<String> },
    NoSuggestions { message: String },
    Failed { message: String },
}

/// Run one suggestion request. Every failure collapses into the generic
/// message; partial output is never returned.
pub async fn suggest_related_repos(suggester: &dyn Suggester, full_name: &str) -> SuggestionOutcome {
    match suggester.suggest_related(full_name).await {
        Ok(repositories) if repositories.is_empty() => SuggestionOutcome::NoSuggestions {
            message: NO_SUGGESTIONS_MESSAGE.to_string(),
        },
        Ok(repositories) => {
            info!(repo = full_name, count = repositories.len(), "Related repositories suggested");
            SuggestionOutcome::Suggestions { repositories }
        }
        Err(e) => {
            error!(repo = full_name, "Error fetching related repos: {}", e);
            SuggestionOutcome::Failed {
                message: SUGGESTION_FAILED_MESSAGE.to_string(),
            }
        }
    }
}

fn build_prompt(full_name: &str) -> String {
    format!(
        "You suggest GitHub repositories that are related to a given repository.\n\
         Reply with a JSON array of repository names, each written as \"owner/repo\".\n\n\
         Repository: {}\n\n\
         Related repositories:",
        full_name
    )
}

/// Validate model output against the expected schema: a JSON array of
/// strings. A Markdown code fence around the array is tolerated.
pub fn parse_suggestions(text: &str) -> Result<Vec<String>> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let names: Vec<String> = serde_json::from_str(body.trim())?;
    Ok(names)
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Google Gemini `generateContent` with a JSON response schema of
/// `ARRAY<STRING>`.
pub struct GeminiSuggester {
    client: Client,
    api_url: Url,
    model: String,
    api_key: Option<String>,
}

impl GeminiSuggester {
    pub fn new(
        api_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(GeminiSuggester {
            client,
            api_url: Url::parse(api_url)?,
            model: model.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> Result<Url> {
        let method = format!("{}:generateContent", self.model);
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| RepoLookError::UrlError(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(&["v1beta", "models", method.as_str()]);
        Ok(url)
    }
}

#[ractor::async_trait]
impl Suggester for GeminiSuggester {
    async fn suggest_related(&self, full_name: &str) -> Result<Vec<String>> {
        if full_name.trim().is_empty() {
            return Err(RepoLookError::InvalidQuery(
                "Repository name must not be empty".to_string(),
            ));
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RepoLookError::SuggestionError("GEMINI_API_KEY is not set".to_string()))?;

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(full_name) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                }
            }
        });

        debug!(repo = full_name, model = %self.model, "Requesting related repositories");

        let response = self
            .client
            .post(self.endpoint()?)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RepoLookError::SuggestionError(format!(
                "Gemini request failed with status {}: {}",
                status, error_text
            )));
        }

        let generated: GenerateContentResponse = response.json().await?;
        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .ok_or_else(|| RepoLookError::SuggestionError("Gemini returned no candidates".to_string()))?;

        parse_suggestions(&text)
    }
}
