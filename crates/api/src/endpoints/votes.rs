//! Voting endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use sharehub_common::AppResult;
use sharehub_core::{VoteResult, VotingAggregate};
use sharehub_db::entities::vote::{self, TargetRef};
use validator::Validate;

use super::{MAX_LIMIT, default_limit};
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Vote response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: String,
    pub created_at: String,
    pub user_id: Option<String>,
    pub target_type: String,
    pub target_id: String,
    pub impact: i32,
}

impl From<vote::Model> for VoteResponse {
    fn from(v: vote::Model) -> Self {
        Self {
            id: v.id,
            created_at: v.created_at.to_rfc3339(),
            user_id: v.user_id,
            target_type: v.target_type,
            target_id: v.target_id,
            impact: v.impact,
        }
    }
}

/// Response of a successful vote.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResultResponse {
    pub vote: VoteResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<VotingAggregate>,
}

impl From<VoteResult> for VoteResultResponse {
    fn from(r: VoteResult) -> Self {
        Self {
            vote: r.vote.into(),
            aggregate: r.aggregate,
        }
    }
}

/// Submit vote request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    #[validate(length(min = 1, max = 64))]
    pub target_type: String,
    #[validate(length(min = 1, max = 64))]
    pub target_id: String,
    pub impact: i32,
}

/// Cast or replace the caller's vote on a target.
async fn submit(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<SubmitVoteRequest>,
) -> AppResult<ApiResponse<VoteResultResponse>> {
    req.validate()?;

    let result = state
        .voting_service
        .submit_vote(
            caller.identity().as_ref(),
            &req.target_type,
            &req.target_id,
            req.impact,
        )
        .await?;

    Ok(ApiResponse::ok(result.into()))
}

/// Request naming a vote target.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    #[validate(length(min = 1, max = 64))]
    pub target_type: String,
    #[validate(length(min = 1, max = 64))]
    pub target_id: String,
}

impl TargetRequest {
    fn target(&self) -> TargetRef {
        TargetRef::new(&self.target_type, &self.target_id)
    }
}

/// Retract the caller's vote on a target.
async fn retract(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> AppResult<StatusCode> {
    req.validate()?;

    state
        .voting_service
        .retract_own_vote(&user.id, &req.target())
        .await?;

    Ok(no_content())
}

/// The caller's vote on a target, if any.
async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> AppResult<ApiResponse<Option<VoteResponse>>> {
    req.validate()?;

    let vote = state
        .voting_service
        .current_vote(&user.id, &req.target())
        .await?;

    Ok(ApiResponse::ok(vote.map(Into::into)))
}

/// Current aggregate of a target.
async fn aggregate(
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> AppResult<ApiResponse<VotingAggregate>> {
    req.validate()?;

    let aggregate = state.voting_service.aggregate_of(&req.target()).await?;
    Ok(ApiResponse::ok(aggregate))
}

/// List votes request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListVotesRequest {
    #[validate(length(min = 1, max = 64))]
    pub target_type: String,
    #[validate(length(min = 1, max = 64))]
    pub target_id: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// Votes on a target (newest first).
async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListVotesRequest>,
) -> AppResult<ApiResponse<Vec<VoteResponse>>> {
    req.validate()?;

    let target = TargetRef::new(&req.target_type, &req.target_id);
    let votes = state
        .voting_service
        .votes_of(&target, req.limit.min(MAX_LIMIT), req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(votes.into_iter().map(Into::into).collect()))
}

/// Paging request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// Votes cast by the caller (newest first).
async fn mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> AppResult<ApiResponse<Vec<VoteResponse>>> {
    let votes = state
        .voting_service
        .votes_by(&user.id, req.limit.min(MAX_LIMIT), req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(votes.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/retract", post(retract))
        .route("/show", post(show))
        .route("/aggregate", post(aggregate))
        .route("/list", post(list))
        .route("/mine", post(mine))
}
