use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::state::SharedState;

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/sensor", get(sensor))
        .route("/api/status", get(api_status))
        .with_state(state)
}

/// Latest reading for the dashboard; 503 until the first cycle completes.
async fn sensor(State(state): State<SharedState>) -> Response {
    let st = state.read().await;
    match st.to_sensor() {
        Some(reading) => Json(reading).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no reading yet").into_response(),
    }
}

async fn api_status(State(state): State<SharedState>) -> impl IntoResponse {
    let st = state.read().await;
    Json(st.to_status())
}

// ---------------------------------------------------------------------------
// Server entry-point
// ---------------------------------------------------------------------------

pub async fn serve(state: SharedState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind web port {port}"))?;

    info!("status API listening on http://{addr}");

    axum::serve(listener, router(state))
        .await
        .context("web server error")
}
