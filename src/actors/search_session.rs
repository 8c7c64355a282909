use crate::card::{RepoCard, SuggestionState};
use crate::chart::ColorCache;
use crate::enrichment::ContributorCount;
use crate::error::{RepoLookError, Result, SearchFailure};
use crate::github::RepositorySource;
use crate::query::SearchQuery;
use crate::suggest::{suggest_related_repos, SuggestionOutcome, Suggester};
use crate::types::{LanguageDistribution, Repository};
use ractor::rpc::CallResult;
use ractor::{Actor, ActorProcessingErr, ActorRef, MessagingErr, RpcReplyPort, SpawnErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the view state of one search box: the current result set, the
/// per-card enrichment and suggestion state, and the generation tag that
/// tells current responses from superseded ones.
pub struct SearchSession;

/// Everything a front end needs to draw the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchView {
    Idle,
    Loading { query: String },
    Error { failure: SearchFailure },
    Empty { query: String },
    Results { query: String, cards: Vec<RepoCard> },
}

impl SearchView {
    pub fn cards(&self) -> &[RepoCard] {
        match self {
            SearchView::Results { cards, .. } => cards,
            _ => &[],
        }
    }

    pub fn card(&self, full_name: &str) -> Option<&RepoCard> {
        self.cards().iter().find(|card| card.full_name() == full_name)
    }

    fn card_mut(&mut self, full_name: &str) -> Option<&mut RepoCard> {
        match self {
            SearchView::Results { cards, .. } => {
                cards.iter_mut().find(|card| card.full_name() == full_name)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub view: SearchView,
}

/// Answer to a suggestion trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestTrigger {
    Started,
    AlreadyPending,
    UnknownRepository,
}

pub struct SearchSessionState {
    source: Arc<dyn RepositorySource>,
    suggester: Arc<dyn Suggester>,
    generation: u64,
    view: SearchView,
    colors: ColorCache,
}

pub enum SearchSessionMessage {
    /// Start a new search; replies with its generation
    Submit(SearchQuery, RpcReplyPort<u64>),
    SearchFinished {
        generation: u64,
        result: std::result::Result<Vec<Repository>, SearchFailure>,
    },
    ContributorsResolved {
        generation: u64,
        full_name: String,
        count: ContributorCount,
    },
    LanguagesResolved {
        generation: u64,
        full_name: String,
        languages: Option<LanguageDistribution>,
    },
    /// Ask for related repositories of one card of the current results
    Suggest(String, RpcReplyPort<SuggestTrigger>),
    SuggestionsResolved {
        generation: u64,
        full_name: String,
        outcome: SuggestionOutcome,
    },
    GetSnapshot(RpcReplyPort<SessionSnapshot>),
}

pub struct SearchSessionArgs {
    pub source: Arc<dyn RepositorySource>,
    pub suggester: Arc<dyn Suggester>,
}

impl SearchSession {
    pub async fn spawn(
        source: Arc<dyn RepositorySource>,
        suggester: Arc<dyn Suggester>,
    ) -> std::result::Result<ActorRef<SearchSessionMessage>, SpawnErr> {
        let args = SearchSessionArgs { source, suggester };
        let (actor_ref, _handle) = Actor::spawn(None, SearchSession, args).await?;
        Ok(actor_ref)
    }
}

#[ractor::async_trait]
impl Actor for SearchSession {
    type Msg = SearchSessionMessage;
    type State = SearchSessionState;
    type Arguments = SearchSessionArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> std::result::Result<Self::State, ActorProcessingErr> {
        info!("Search session starting");

        Ok(SearchSessionState {
            source: args.source,
            suggester: args.suggester,
            generation: 0,
            view: SearchView::Idle,
            colors: ColorCache::default(),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        match message {
            SearchSessionMessage::Submit(query, reply) => {
                state.generation += 1;
                let generation = state.generation;
                info!(generation, %query, "Search submitted");

                state.view = SearchView::Loading {
                    query: query.to_string(),
                };
                spawn_search(myself, state.source.clone(), query, generation);

                if !reply.is_closed() {
                    let _ = reply.send(generation);
                }
            }

            SearchSessionMessage::SearchFinished { generation, result } => {
                if generation != state.generation {
                    debug!(generation, current = state.generation, "Dropping superseded search result");
                    return Ok(());
                }

                let query = match &state.view {
                    SearchView::Loading { query } => query.clone(),
                    _ => String::new(),
                };

                state.view = match result {
                    Ok(repos) if repos.is_empty() => {
                        info!(generation, %query, "Search returned no repositories");
                        SearchView::Empty { query }
                    }
                    Ok(repos) => {
                        info!(generation, %query, count = repos.len(), "Search returned repositories");
                        for repo in &repos {
                            spawn_enrichment(&myself, &state.source, repo, generation);
                        }
                        SearchView::Results {
                            query,
                            cards: repos.into_iter().map(RepoCard::new).collect(),
                        }
                    }
                    Err(failure) => {
                        warn!(generation, %query, kind = ?failure.kind, "Search failed: {}", failure.message);
                        SearchView::Error { failure }
                    }
                };
            }

            SearchSessionMessage::ContributorsResolved { generation, full_name, count } => {
                if generation != state.generation {
                    debug!(generation, repo = %full_name, "Dropping superseded contributor count");
                    return Ok(());
                }
                if let Some(card) = state.view.card_mut(&full_name) {
                    card.set_contributors(count);
                }
            }

            SearchSessionMessage::LanguagesResolved { generation, full_name, languages } => {
                if generation != state.generation {
                    debug!(generation, repo = %full_name, "Dropping superseded language breakdown");
                    return Ok(());
                }
                if let Some(card) = state.view.card_mut(&full_name) {
                    card.set_languages(languages, &mut state.colors);
                }
            }

            SearchSessionMessage::Suggest(full_name, reply) => {
                let generation = state.generation;
                let suggester = state.suggester.clone();

                let trigger = match state.view.card_mut(&full_name) {
                    None => SuggestTrigger::UnknownRepository,
                    Some(card) if card.suggestions.is_pending() => SuggestTrigger::AlreadyPending,
                    Some(card) => {
                        card.suggestions = SuggestionState::Pending;
                        spawn_suggestion(myself, suggester, full_name.clone(), generation);
                        SuggestTrigger::Started
                    }
                };
                debug!(generation, repo = %full_name, ?trigger, "Suggestion requested");

                if !reply.is_closed() {
                    let _ = reply.send(trigger);
                }
            }

            SearchSessionMessage::SuggestionsResolved { generation, full_name, outcome } => {
                if generation != state.generation {
                    debug!(generation, repo = %full_name, "Dropping superseded suggestions");
                    return Ok(());
                }
                if let Some(card) = state.view.card_mut(&full_name) {
                    card.suggestions = SuggestionState::Resolved(outcome);
                }
            }

            SearchSessionMessage::GetSnapshot(reply) => {
                let snapshot = SessionSnapshot {
                    generation: state.generation,
                    view: state.view.clone(),
                };
                if !reply.is_closed() {
                    let _ = reply.send(snapshot);
                }
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        info!(searches = state.generation, "Search session stopped");
        Ok(())
    }
}

fn spawn_search(
    myself: ActorRef<SearchSessionMessage>,
    source: Arc<dyn RepositorySource>,
    query: SearchQuery,
    generation: u64,
) {
    tokio::spawn(async move {
        let result = source.search(&query).await.map_err(|e| {
            debug!(generation, %query, "Search error: {}", e);
            SearchFailure::from(e)
        });
        if let Err(e) = myself.send_message(SearchSessionMessage::SearchFinished { generation, result }) {
            warn!(generation, "Search session gone before search finished: {}", e);
        }
    });
}

// Contributors and languages are separate tasks so neither waits on the other.
fn spawn_enrichment(
    myself: &ActorRef<SearchSessionMessage>,
    source: &Arc<dyn RepositorySource>,
    repo: &Repository,
    generation: u64,
) {
    let (session, source_clone, repo_clone) = (myself.clone(), source.clone(), repo.clone());
    tokio::spawn(async move {
        let count = source_clone.contributor_count(&repo_clone).await;
        if let Err(e) = session.send_message(SearchSessionMessage::ContributorsResolved {
            generation,
            full_name: repo_clone.full_name,
            count,
        }) {
            warn!(generation, "Search session gone before contributor count arrived: {}", e);
        }
    });

    let (session, source_clone, repo_clone) = (myself.clone(), source.clone(), repo.clone());
    tokio::spawn(async move {
        let languages = source_clone.languages(&repo_clone).await;
        if let Err(e) = session.send_message(SearchSessionMessage::LanguagesResolved {
            generation,
            full_name: repo_clone.full_name,
            languages,
        }) {
            warn!(generation, "Search session gone before language breakdown arrived: {}", e);
        }
    });
}

fn spawn_suggestion(
    myself: ActorRef<SearchSessionMessage>,
    suggester: Arc<dyn Suggester>,
    full_name: String,
    generation: u64,
) {
    tokio::spawn(async move {
        let outcome = suggest_related_repos(suggester.as_ref(), &full_name).await;
        if let Err(e) = myself.send_message(SearchSessionMessage::SuggestionsResolved {
            generation,
            full_name,
            outcome,
        }) {
            warn!(generation, "Search session gone before suggestions arrived: {}", e);
        }
    });
}

fn call_result<T>(
    result: std::result::Result<CallResult<T>, MessagingErr<SearchSessionMessage>>,
) -> Result<T> {
    match result {
        Ok(CallResult::Success(value)) => Ok(value),
        Ok(CallResult::Timeout) => Err(RepoLookError::SessionError(
            "Search session did not answer in time".to_string(),
        )),
        Ok(CallResult::SenderError) => Err(RepoLookError::SessionError(
            "Search session dropped the reply".to_string(),
        )),
        Err(e) => Err(RepoLookError::SessionError(format!(
            "Failed to contact search session: {}",
            e
        ))),
    }
}

/// Submit a search and return its generation.
pub async fn submit(session: &ActorRef<SearchSessionMessage>, query: SearchQuery) -> Result<u64> {
    call_result(
        session
            .call(|reply| SearchSessionMessage::Submit(query, reply), Some(CALL_TIMEOUT))
            .await,
    )
}

pub async fn snapshot(session: &ActorRef<SearchSessionMessage>) -> Result<SessionSnapshot> {
    call_result(
        session
            .call(SearchSessionMessage::GetSnapshot, Some(CALL_TIMEOUT))
            .await,
    )
}

pub async fn request_suggestions(
    session: &ActorRef<SearchSessionMessage>,
    full_name: &str,
) -> Result<SuggestTrigger> {
    let full_name = full_name.to_string();
    call_result(
        session
            .call(|reply| SearchSessionMessage::Suggest(full_name, reply), Some(CALL_TIMEOUT))
            .await,
    )
}
