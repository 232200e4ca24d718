//! Health check endpoint.
//!
//! Reports degraded (503) when the database does not answer a ping, so
//! load balancers stop routing before requests start failing.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;
use tracing::error;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service name.
    pub service: &'static str,
    /// Overall status: "healthy" or "degraded".
    pub status: &'static str,
    /// Whether the database answered a ping.
    pub database: bool,
    /// Service version.
    pub version: &'static str,
}

impl HealthResponse {
    fn new(database_up: bool) -> Self {
        Self {
            service: "divvy",
            status: if database_up { "healthy" } else { "degraded" },
            database: database_up,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// GET /health - Liveness plus a database connectivity probe.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "Health check: database ping failed");
            false
        }
    };

    let status = if database_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(HealthResponse::new(database_up)))
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
