//! HTTP server
//!
//! Two public routes: the profile-mirror endpoint used after sign-in, and
//! the shareable note URL.

pub mod users;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::database::UserRepository;
use crate::services::SharesService;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub shares: Arc<SharesService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(users::create_user))
        .route("/shared/{share_id}", get(get_shared_note))
        .with_state(state)
}

/// Resolve a share link. Expired shares are indistinguishable from
/// nonexistent ones.
async fn get_shared_note(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
) -> Response {
    match state.shares.get_shared_note(&share_id).await {
        Ok(Some(shared)) => (StatusCode::OK, Json(shared)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Share not found" })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Error resolving share {}: {}", share_id, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Server error" })),
            )
                .into_response()
        }
    }
}
