//! HTTP server implementation for the transcript API

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers::{self, LookupError, TranscriptLookup};
use super::models::{ServiceTranscriptResponse, TranscriptQuery};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub lookup: TranscriptLookup,
}

/// Build the router with CORS open to any origin
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/transcript", get(transcript_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Bind and serve until the process stops
pub async fn start_http_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("🌐 Transcript server listening on http://{}:{}", host, port);
    info!("📖 Try http://{}:{}/transcript?v=VIDEO_ID", host, port);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler() -> impl IntoResponse {
    Json(handlers::service_info())
}

async fn health_handler() -> impl IntoResponse {
    Json(handlers::health_check())
}

async fn transcript_handler(State(state): State<AppState>, Query(query): Query<TranscriptQuery>) -> Response {
    match state.lookup.lookup(query.v.as_deref(), query.lang.as_deref()).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            let status = match e {
                LookupError::MissingVideoId | LookupError::InvalidVideoId(_) => StatusCode::BAD_REQUEST,
                LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            };
            (status, Json(ServiceTranscriptResponse::failure(e.to_string()))).into_response()
        }
    }
}
