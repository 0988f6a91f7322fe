//! Upload endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use serde::{Deserialize, Serialize};
use sharehub_common::{AppError, AppResult};
use sharehub_core::{CreateUploadInput, UpdateUploadInput, VotingAggregate, Votable};
use sharehub_db::entities::upload;

use super::{MAX_LIMIT, default_limit, votes::VoteResultResponse};
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Upload response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub user_id: String,
    pub voting: VotingAggregate,
    pub created_at: String,
    pub updated_at: String,
}

impl From<upload::Model> for UploadResponse {
    fn from(u: upload::Model) -> Self {
        Self {
            voting: u.voting(),
            id: u.id,
            slug: u.slug,
            title: u.title,
            description: u.description,
            user_id: u.user_id,
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

/// Vote request for a single entity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityVoteRequest {
    pub impact: i32,
}

/// Vote on an upload.
async fn vote(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EntityVoteRequest>,
) -> AppResult<ApiResponse<VoteResultResponse>> {
    let upload = state.upload_service.get(&id).await?;
    let result = upload
        .vote(&state.voting_service, &auth.identity(), req.impact)
        .await?;

    Ok(ApiResponse::ok(result.into()))
}

/// Create an upload.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateUploadInput>,
) -> AppResult<ApiResponse<UploadResponse>> {
    let upload = state.upload_service.create(&user.id, req).await?;
    Ok(ApiResponse::ok(upload.into()))
}

/// Show upload request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowUploadRequest {
    pub upload_id: Option<String>,
    pub slug: Option<String>,
}

/// Get an upload by ID or slug.
async fn show(
    State(state): State<AppState>,
    Json(req): Json<ShowUploadRequest>,
) -> AppResult<ApiResponse<UploadResponse>> {
    let upload = match (req.upload_id, req.slug) {
        (Some(id), _) => state.upload_service.get(&id).await?,
        (None, Some(slug)) => state.upload_service.get_by_slug(&slug).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "uploadId or slug is required".to_string(),
            ));
        }
    };

    Ok(ApiResponse::ok(upload.into()))
}

/// Update upload request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUploadRequest {
    pub upload_id: String,
    #[serde(flatten)]
    pub input: UpdateUploadInput,
}

/// Edit an upload.
async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateUploadRequest>,
) -> AppResult<ApiResponse<UploadResponse>> {
    let upload = state
        .upload_service
        .update(&auth.identity(), &req.upload_id, req.input)
        .await?;

    Ok(ApiResponse::ok(upload.into()))
}

/// Delete upload request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUploadRequest {
    pub upload_id: String,
}

/// Delete an upload.
async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteUploadRequest>,
) -> AppResult<StatusCode> {
    state
        .upload_service
        .delete(&auth.identity(), &req.upload_id)
        .await?;

    Ok(no_content())
}

/// List uploads request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUploadsRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// Recent uploads (newest first).
async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListUploadsRequest>,
) -> AppResult<ApiResponse<Vec<UploadResponse>>> {
    let uploads = state
        .upload_service
        .list_recent(req.limit.min(MAX_LIMIT), req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(uploads.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/vote", put(vote))
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/update", post(update))
        .route("/delete", post(delete))
        .route("/list", post(list))
}
