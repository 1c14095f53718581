//! Profile mirror endpoint
//!
//! POST /api/users — idempotent per uid: returns the existing record with
//! 200 when the uid is already mirrored, otherwise creates it and responds
//! 201. Schema failures come back as a 400 with a field-error list.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::database::NewUser;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub uid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

fn validate(request: &CreateUserRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match request.email.as_deref().map(str::trim) {
        None | Some("") => errors.push(FieldError {
            field: "email".to_string(),
            message: "email is required".to_string(),
        }),
        Some(email) if !email.contains('@') => errors.push(FieldError {
            field: "email".to_string(),
            message: "email is not valid".to_string(),
        }),
        _ => {}
    }

    if request.uid.as_deref().map_or(true, |uid| uid.trim().is_empty()) {
        errors.push(FieldError {
            field: "uid".to_string(),
            message: "uid is required".to_string(),
        });
    }

    errors
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Response {
    let errors = validate(&request);
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid input data", "errors": errors })),
        )
            .into_response();
    }

    // Fields are present after validation
    let email = request.email.unwrap_or_default();
    let uid = request.uid.unwrap_or_default();

    match state.users.get_user_by_uid(&uid).await {
        Ok(Some(existing)) => (StatusCode::OK, Json(existing)).into_response(),
        Ok(None) => {
            let new = NewUser {
                email,
                display_name: request.display_name,
                photo_url: request.photo_url,
                uid,
            };
            match state.users.create_user(new).await {
                Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
                Err(err) => {
                    tracing::error!("Error creating user: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "message": "Server error" })),
                    )
                        .into_response()
                }
            }
        }
        Err(err) => {
            tracing::error!("Error looking up user: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Server error" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::database::UserRepository;
    use crate::services::SharesService;
    use crate::store::{DocumentStore, MemoryStore};

    async fn test_state() -> AppState {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::database::initialize_database(&pool).await.unwrap();

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        AppState {
            users: UserRepository::new(pool),
            shares: Arc::new(SharesService::new(store, "http://localhost:3000")),
        }
    }

    fn request(email: Option<&str>, uid: Option<&str>) -> CreateUserRequest {
        CreateUserRequest {
            email: email.map(str::to_string),
            display_name: Some("Tester".to_string()),
            photo_url: None,
            uid: uid.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_then_repeat_returns_existing() {
        let state = test_state().await;

        let first = create_user(
            State(state.clone()),
            Json(request(Some("t@example.com"), Some("uid-1"))),
        )
        .await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = create_user(
            State(state),
            Json(request(Some("t@example.com"), Some("uid-1"))),
        )
        .await;
        assert_eq!(second.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let state = test_state().await;

        let response = create_user(State(state), Json(request(None, None))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_email_rejected() {
        let state = test_state().await;

        let response = create_user(
            State(state),
            Json(request(Some("not-an-email"), Some("uid-1"))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validate_reports_each_field() {
        let errors = validate(&request(None, Some("uid-1")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");

        let errors = validate(&request(Some("t@example.com"), None));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "uid");
    }
}
