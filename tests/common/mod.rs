#![allow(dead_code)]

use repolook::enrichment::ContributorCount;
use repolook::error::{RepoLookError, Result};
use repolook::github::RepositorySource;
use repolook::query::SearchQuery;
use repolook::suggest::Suggester;
use repolook::types::{LanguageDistribution, Repository};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });

    format!("http://{}", addr)
}

/// A repository object shaped like the GitHub API's, with its enrichment
/// URLs pointing at `base`.
pub fn repo_json(base: &str, id: u64, full_name: &str, updated_at: &str) -> serde_json::Value {
    let login = full_name.split('/').next().unwrap_or_default();
    serde_json::json!({
        "id": id,
        "node_id": format!("R_{}", id),
        "name": full_name.split('/').nth(1).unwrap_or_default(),
        "full_name": full_name,
        "private": false,
        "description": format!("Description of {}", full_name),
        "stargazers_count": 1200 + id,
        "watchers_count": 10,
        "forks_count": 30 + id,
        "language": "Rust",
        "updated_at": updated_at,
        "html_url": format!("https://github.com/{}", full_name),
        "contributors_url": format!("{}/repos/{}/contributors", base, full_name),
        "languages_url": format!("{}/repos/{}/languages", base, full_name),
        "owner": {
            "login": login,
            "id": 1,
            "avatar_url": format!("https://avatars.githubusercontent.com/{}", login),
            "type": "User"
        }
    })
}

pub fn repo(id: u64, full_name: &str) -> Repository {
    serde_json::from_value(repo_json("http://127.0.0.1:9", id, full_name, "2024-05-01T10:00:00Z"))
        .expect("Invalid repository fixture")
}

/// In-memory stand-in for GitHub.
///
/// Searches are answered from `results` keyed by the query's display form;
/// unknown queries are "not found". A query listed in `search_gates` waits
/// for its `Notify` before answering. The first contributor lookup waits on
/// `contributor_gate` when one is set, and every lookup returns its call
/// number so stale values can be told apart.
#[derive(Default)]
pub struct FakeGitHub {
    pub results: HashMap<String, Vec<Repository>>,
    pub search_gates: HashMap<String, Arc<Notify>>,
    pub contributor_gate: Option<Arc<Notify>>,
    pub contributor_calls: AtomicUsize,
    pub searches: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub fn with_results(mut self, query: &str, repos: Vec<Repository>) -> Self {
        self.results.insert(query.to_string(), repos);
        self
    }

    pub fn with_search_gate(mut self, query: &str, gate: Arc<Notify>) -> Self {
        self.search_gates.insert(query.to_string(), gate);
        self
    }

    pub fn with_contributor_gate(mut self, gate: Arc<Notify>) -> Self {
        self.contributor_gate = Some(gate);
        self
    }
}

#[ractor::async_trait]
impl RepositorySource for FakeGitHub {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Repository>> {
        let key = query.to_string();
        self.searches.lock().unwrap().push(key.clone());

        if let Some(gate) = self.search_gates.get(&key) {
            gate.notified().await;
        }

        self.results
            .get(&key)
            .cloned()
            .ok_or(RepoLookError::NotFound(key))
    }

    async fn contributor_count(&self, _repo: &Repository) -> ContributorCount {
        let call = self.contributor_calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            if let Some(gate) = &self.contributor_gate {
                gate.notified().await;
            }
        }
        ContributorCount::Known(call as u64 + 1)
    }

    async fn languages(&self, repo: &Repository) -> Option<LanguageDistribution> {
        if repo.full_name.ends_with("-nolang") {
            return None;
        }
        let mut languages = LanguageDistribution::new();
        languages.insert("Rust".to_string(), 9_000);
        languages.insert("Shell".to_string(), 1_000);
        Some(languages)
    }
}

/// Suggester answering from a fixed table; unknown names are an error. An
/// optional gate holds every call until notified.
#[derive(Default)]
pub struct FakeSuggester {
    pub answers: HashMap<String, Vec<String>>,
    pub gate: Option<Arc<Notify>>,
}

impl FakeSuggester {
    pub fn with_answer(mut self, full_name: &str, names: &[&str]) -> Self {
        self.answers.insert(
            full_name.to_string(),
            names.iter().map(|name| name.to_string()).collect(),
        );
        self
    }

    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[ractor::async_trait]
impl Suggester for FakeSuggester {
    async fn suggest_related(&self, full_name: &str) -> Result<Vec<String>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.answers
            .get(full_name)
            .cloned()
            .ok_or_else(|| RepoLookError::SuggestionError("model returned garbage".to_string()))
    }
}

/// Poll `check` until it holds or a couple of seconds have passed.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
