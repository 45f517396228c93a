//! Local HTTP coach endpoint.
//!
//! Serves the same contract the trainer's [`HttpCoach`](crate::coach::HttpCoach)
//! speaks, answering from the built-in [`RuleCoach`]:
//!
//! ```text
//! GET  /health    -> {"status": "ok", "version": "..."}
//! POST /feedback  {"compressionRate": 112} -> {"feedback": "Good pace"}
//! ```

use crate::coach::{Coach, CoachRequest, CoachResponse, RuleCoach};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Rates above this are treated as sensor garbage rather than coached.
pub const MAX_PLAUSIBLE_RATE: u32 = 600;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Rules used to answer
    pub coach: RuleCoach,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            coach: RuleCoach::new(),
        }
    }

    pub fn with_coach(mut self, coach: RuleCoach) -> Self {
        self.coach = coach;
        self
    }
}

/// Shared server state
pub struct ServerState {
    coach: RuleCoach,
    answered: AtomicU64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub answered: u64,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        answered: state.answered.load(Ordering::Relaxed),
    })
}

/// POST /feedback
async fn feedback(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<CoachRequest>, JsonRejection>,
) -> Result<Json<CoachResponse>, ApiError> {
    let Json(request) = body.map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            format!("Invalid feedback request: {}", e.body_text()),
        )
    })?;

    if request.compression_rate > MAX_PLAUSIBLE_RATE {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "RATE_OUT_OF_RANGE",
            format!(
                "Compression rate {} exceeds {}",
                request.compression_rate, MAX_PLAUSIBLE_RATE
            ),
        ));
    }

    let text = state
        .coach
        .feedback(request.compression_rate)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "COACH_ERROR", e.to_string()))?;

    state.answered.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(rate = request.compression_rate, feedback = %text, "answered feedback request");
    Ok(Json(CoachResponse { feedback: text }))
}

/// Build the router without binding it.
pub fn router(config: &ServerConfig) -> Router {
    let state = Arc::new(ServerState {
        coach: config.coach.clone(),
        answered: AtomicU64::new(0),
    });

    Router::new()
        .route("/health", get(health))
        .route("/feedback", post(feedback))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(&config);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Coach server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
