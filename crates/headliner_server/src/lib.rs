//! Headliner server: the HTTP surface over the batch fetch engine.
//!
//! One operational route, `GET /result?workers=N`, runs a full batch and
//! renders the report as JSON; `GET /ping` is a plain healthcheck.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use headliner_engine::{Report, SnippetHarvester};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    harvester: Arc<SnippetHarvester>,
    cancel: CancellationToken,
}

impl AppState {
    pub fn new(harvester: Arc<SnippetHarvester>, cancel: CancellationToken) -> Self {
        Self { harvester, cancel }
    }
}

/// The wire shape of one batch report. Key names are part of the external
/// contract; failures are flattened to display strings here and nowhere
/// else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub success_count: usize,
    pub error_count: usize,
    pub success_response: Vec<String>,
    pub error_response: Vec<String>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            success_count: report.success_count,
            error_count: report.error_count,
            error_response: report.error_messages(),
            success_response: report.success_items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResultParams {
    // Kept as a string so a non-numeric value yields a 400 with our own
    // message instead of a rejection from the query extractor.
    workers: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/result", get(result_handler))
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until the cancellation token fires.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("http listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

async fn ping_handler() -> &'static str {
    "pong"
}

async fn result_handler(
    State(state): State<AppState>,
    Query(params): Query<ResultParams>,
) -> Response {
    let max_workers = state.harvester.url_count().max(1);
    let workers = match parse_workers(params.workers.as_deref(), max_workers) {
        Some(workers) => workers,
        None => {
            log::warn!("rejecting result request with workers={:?}", params.workers);
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid input parameters, workers should be between 1 and {max_workers}"),
            )
                .into_response();
        }
    };

    match state
        .harvester
        .fetch_all(workers, state.cancel.child_token())
        .await
    {
        Ok(report) => Json(ReportResponse::from(report)).into_response(),
        // Unreachable with a validated worker count, but never panic in a
        // handler.
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

/// The serving layer owns input validation: the engine is only invoked
/// with a worker count in `1..=max_workers`.
fn parse_workers(raw: Option<&str>, max_workers: usize) -> Option<usize> {
    let workers = raw?.parse::<usize>().ok()?;
    if (1..=max_workers).contains(&workers) {
        Some(workers)
    } else {
        None
    }
}
