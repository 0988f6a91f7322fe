//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use serde::{Deserialize, Serialize};
use sharehub_common::AppResult;
use sharehub_core::{CreateCommentInput, Votable, VotingAggregate};
use sharehub_db::entities::comment;

use super::{MAX_LIMIT, default_limit, uploads::EntityVoteRequest, votes::VoteResultResponse};
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Comment response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub upload_id: String,
    pub user_id: String,
    pub body: String,
    pub voting: VotingAggregate,
    pub created_at: String,
}

impl From<comment::Model> for CommentResponse {
    fn from(c: comment::Model) -> Self {
        Self {
            voting: c.voting(),
            id: c.id,
            upload_id: c.upload_id,
            user_id: c.user_id,
            body: c.body,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// Vote on a comment.
async fn vote(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EntityVoteRequest>,
) -> AppResult<ApiResponse<VoteResultResponse>> {
    let comment = state.comment_service.get(&id).await?;
    let result = comment
        .vote(&state.voting_service, &auth.identity(), req.impact)
        .await?;

    Ok(ApiResponse::ok(result.into()))
}

/// Comment on an upload.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.create(&user.id, req).await?;
    Ok(ApiResponse::ok(comment.into()))
}

/// Delete comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentRequest {
    pub comment_id: String,
}

/// Delete a comment.
async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteCommentRequest>,
) -> AppResult<StatusCode> {
    state
        .comment_service
        .delete(&auth.identity(), &req.comment_id)
        .await?;

    Ok(no_content())
}

/// List comments request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsRequest {
    pub upload_id: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// Comments on an upload (newest first).
async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListCommentsRequest>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state
        .comment_service
        .list_for_upload(&req.upload_id, req.limit.min(MAX_LIMIT), req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(comments.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/vote", put(vote))
        .route("/create", post(create))
        .route("/delete", post(delete))
        .route("/list", post(list))
}
