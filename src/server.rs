use crate::actors::search_session::{self, SearchSessionMessage, SessionSnapshot, SuggestTrigger};
use crate::card::RepoCard;
use crate::chart::ColorCache;
use crate::enrichment::enrich_all;
use crate::error::{FailureKind, RepoLookError, SearchFailure};
use crate::github::RepositorySource;
use crate::query::SearchQuery;
use crate::suggest::{suggest_related_repos, SuggestionOutcome, Suggester};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use ractor::ActorRef;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub session: ActorRef<SearchSessionMessage>,
    pub source: Arc<dyn RepositorySource>,
    pub suggester: Arc<dyn Suggester>,
    pub suggester_configured: bool,
    pub start_time: std::time::Instant,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchAccepted {
    pub generation: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestAccepted {
    pub status: SuggestTrigger,
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub query: String,
    pub cards: Vec<RepoCard>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub repository: String,
}

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub session: CheckResult,
    pub suggester: CheckResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

fn error_response(status: StatusCode, failure: SearchFailure) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: failure.message,
            kind: Some(failure.kind),
        }),
    )
        .into_response()
}

fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        FailureKind::UnexpectedUpstream | FailureKind::NetworkOrParsing => StatusCode::BAD_GATEWAY,
        FailureKind::InvalidQuery => StatusCode::BAD_REQUEST,
        FailureKind::Internal => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for RepoLookError {
    fn into_response(self) -> Response {
        let failure = SearchFailure::from(&self);
        if failure.kind != FailureKind::InvalidQuery {
            warn!(kind = ?failure.kind, "Request failed: {}", self);
        }
        error_response(status_for(failure.kind), failure)
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session driven endpoints
        .route("/api/search", post(submit_search))
        .route("/api/session", get(get_session))
        .route("/api/repos/:owner/:repo/suggest", post(trigger_suggestion))

        // One-shot endpoints
        .route("/api/lookup", get(lookup))
        .route("/api/suggest", post(suggest))

        // Probes
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/livez", get(liveness_check))
        .route("/readyz", get(readiness_check))

        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: &str) -> Result<(), RepoLookError> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("RepoLook listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Start a search on the session. The response only carries the generation;
/// results show up on `/api/session`.
async fn submit_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<(StatusCode, Json<SearchAccepted>), RepoLookError> {
    let query = SearchQuery::parse(&request.query)?;
    let generation = search_session::submit(&state.session, query).await?;
    Ok((StatusCode::ACCEPTED, Json(SearchAccepted { generation })))
}

async fn get_session(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, RepoLookError> {
    let snapshot = search_session::snapshot(&state.session).await?;
    Ok(Json(snapshot))
}

async fn trigger_suggestion(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<(StatusCode, Json<SuggestAccepted>), RepoLookError> {
    let full_name = format!("{}/{}", owner, repo);
    let trigger = search_session::request_suggestions(&state.session, &full_name).await?;

    let status = match trigger {
        SuggestTrigger::Started => StatusCode::ACCEPTED,
        SuggestTrigger::AlreadyPending => StatusCode::CONFLICT,
        SuggestTrigger::UnknownRepository => StatusCode::NOT_FOUND,
    };
    Ok((status, Json(SuggestAccepted { status: trigger })))
}

/// Search and enrich every result before answering.
async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<LookupResponse>, RepoLookError> {
    let query = SearchQuery::parse(&params.q)?;
    let repos = state.source.search(&query).await?;
    let enrichments = enrich_all(state.source.as_ref(), &repos).await;

    let mut colors = ColorCache::default();
    let cards = repos
        .into_iter()
        .zip(enrichments)
        .map(|(repo, enrichment)| RepoCard::enriched(repo, enrichment, &mut colors))
        .collect();

    Ok(Json(LookupResponse {
        query: query.to_string(),
        cards,
    }))
}

async fn suggest(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> Response {
    if request.repository.trim().is_empty() {
        return RepoLookError::InvalidQuery("Repository name must not be empty".to_string())
            .into_response();
    }

    let outcome = suggest_related_repos(state.suggester.as_ref(), request.repository.trim()).await;
    let status = match outcome {
        SuggestionOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    (status, Json(outcome)).into_response()
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let session_check = match search_session::snapshot(&state.session).await {
        Ok(_) => CheckResult {
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => {
            error!("Health check could not reach the search session: {}", e);
            CheckResult {
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
            }
        }
    };

    let suggester_check = if state.suggester_configured {
        CheckResult {
            status: HealthStatus::Healthy,
            message: None,
        }
    } else {
        CheckResult {
            status: HealthStatus::Degraded,
            message: Some("No generative backend key configured".to_string()),
        }
    };

    let overall_status = match (&session_check.status, &suggester_check.status) {
        (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
        (_, HealthStatus::Degraded) => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    };

    let status_code = match overall_status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        checks: HealthChecks {
            session: session_check,
            suggester: suggester_check,
        },
    };

    (status_code, Json(response))
}

async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "alive" })))
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match search_session::snapshot(&state.session).await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "ready": true }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "ready": false, "message": e.to_string() })),
        ),
    }
}
