use crate::domain::SessionError;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;
use crate::use_cases::GameEvent;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use glam::Vec2;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

#[derive(Debug, serde::Deserialize)]
pub struct SeedPickupsRequest {
    // Explicit pickup positions; every configured pickup spawn point when absent.
    #[serde(default)]
    positions: Option<Vec<Vec2>>,
}

#[derive(Debug, serde::Serialize)]
struct SeedPickupsResponse {
    pickup_ids: Vec<String>,
}

fn error_response(status: StatusCode, error: &str) -> axum::response::Response {
    (status, Json(ErrorResponse::new(error))).into_response()
}

/// Signals "round ready": seeds pickups into the running session.
pub async fn seed_pickups_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SeedPickupsRequest>,
) -> impl IntoResponse {
    if let Some(positions) = &payload.positions {
        if positions.iter().any(|p| !p.is_finite()) {
            return error_response(StatusCode::BAD_REQUEST, "positions must be finite");
        }
    }

    let (reply, reply_rx) = oneshot::channel();
    let event = GameEvent::SeedPickups {
        positions: payload.positions,
        reply,
    };
    if state.input_tx.send(event).await.is_err() {
        return error_response(StatusCode::CONFLICT, "session terminated");
    }

    match reply_rx.await {
        Ok(Ok(ids)) => {
            info!(count = ids.len(), "round ready");
            let pickup_ids = ids.iter().map(u64::to_string).collect();
            (StatusCode::CREATED, Json(SeedPickupsResponse { pickup_ids })).into_response()
        }
        Ok(Err(SessionError::Terminated)) | Err(_) => {
            error_response(StatusCode::CONFLICT, "session terminated")
        }
        Ok(Err(e)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}
