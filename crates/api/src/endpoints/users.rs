//! Account endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::Serialize;
use sharehub_common::{AppError, AppResult};
use sharehub_core::CreateUserInput;
use sharehub_db::entities::user;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// User response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            is_admin: u.is_admin,
            is_moderator: u.is_moderator,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Sign-up response carrying the access token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
}

/// Create an account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<CreateUserInput>,
) -> AppResult<ApiResponse<SignupResponse>> {
    let mut user = state.user_service.create(req).await?;
    let token = user
        .token
        .take()
        .ok_or_else(|| AppError::Internal("Created user has no token".to_string()))?;

    Ok(ApiResponse::ok(SignupResponse {
        user: user.into(),
        token,
    }))
}

/// The authenticated user.
async fn me(AuthUser(user): AuthUser) -> AppResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(user.into()))
}

/// Delete the caller's account.
async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    state
        .user_service
        .delete_account(&auth.identity(), &auth.0.id)
        .await?;

    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/i", post(me))
        .route("/i/delete", post(delete_account))
}
