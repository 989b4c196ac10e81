use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Response, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::search::SearchResult;
use crate::tools::yt_dlp::MediaExtractor;

use super::server::{LookupExecutor, ResolveInput, SearchInput};

type SharedExecutor<E> = Arc<LookupExecutor<E>>;

#[derive(Debug, Deserialize)]
pub struct HttpSearchRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub strict: Option<bool>,
}

impl From<HttpSearchRequest> for SearchInput {
    fn from(req: HttpSearchRequest) -> Self {
        SearchInput {
            query: req.query,
            max_results: req.max_results,
            sort_by: req.sort_by,
            strict: req.strict,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HttpResolveRequest {
    pub song: String,
    #[serde(default)]
    pub format: Option<String>,
}

impl From<HttpResolveRequest> for ResolveInput {
    fn from(req: HttpResolveRequest) -> Self {
        ResolveInput {
            song: req.song,
            format: req.format,
        }
    }
}

#[derive(Serialize)]
pub struct HttpResolveResponse {
    pub url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

type HttpError = (StatusCode, Json<ErrorResponse>);

/// Routes for the lookup service.
pub fn router<E>(executor: SharedExecutor<E>) -> Router
where
    E: MediaExtractor + Send + Sync + 'static,
{
    Router::new()
        .route("/healthz", get(health))
        .route("/search", post(search::<E>))
        .route("/resolve", post(resolve::<E>))
        .route("/metrics", get(metrics))
        .with_state(executor)
}

/// Start the HTTP server and run until shutdown.
pub async fn serve<E>(addr: SocketAddr, executor: SharedExecutor<E>) -> Result<()>
where
    E: MediaExtractor + Send + Sync + 'static,
{
    let app = router(executor);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP address {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .with_context(|| format!("failed to run HTTP server on {addr}"))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn search<E>(
    State(executor): State<SharedExecutor<E>>,
    Json(request): Json<HttpSearchRequest>,
) -> Result<Json<Vec<SearchResult>>, HttpError>
where
    E: MediaExtractor + Send + Sync + 'static,
{
    executor
        .search(request.into())
        .await
        .map(Json)
        .map_err(error_response)
}

async fn resolve<E>(
    State(executor): State<SharedExecutor<E>>,
    Json(request): Json<HttpResolveRequest>,
) -> Result<Json<HttpResolveResponse>, HttpError>
where
    E: MediaExtractor + Send + Sync + 'static,
{
    executor
        .resolve(request.into())
        .await
        .map(|url| Json(HttpResolveResponse { url }))
        .map_err(error_response)
}

fn error_response(err: LookupError) -> HttpError {
    let status = match &err {
        LookupError::Usage(_) => StatusCode::BAD_REQUEST,
        LookupError::NoResults { .. } => StatusCode::NOT_FOUND,
        LookupError::UnsupportedFormatLayout { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LookupError::External(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "lookup failed");
    }
    (
        status,
        Json(ErrorResponse {
            message: err.to_string(),
        }),
    )
}

async fn metrics() -> Result<Response<Body>, StatusCode> {
    match crate::telemetry::export_prometheus() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")
            .body(Body::from(body))
            .map_err(|err| {
                tracing::error!(error = %err, "failed to build metrics response");
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        Err(err) => {
            tracing::error!(error = %err, "failed to export metrics");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
