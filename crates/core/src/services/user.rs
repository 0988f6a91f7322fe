//! User service.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use sharehub_common::{AppError, AppResult, IdGenerator};
use sharehub_db::{
    entities::{comment, upload, user, vote::TargetRef},
    repositories::{CommentRepository, UploadRepository, UserRepository},
};
use validator::Validate;

use super::identity::CallerIdentity;
use super::voting::VotingService;

/// Input for creating a user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    /// Unique display name.
    #[validate(length(min = 1, max = 128))]
    pub username: String,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    upload_repo: UploadRepository,
    comment_repo: CommentRepository,
    voting: VotingService,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        upload_repo: UploadRepository,
        comment_repo: CommentRepository,
        voting: VotingService,
    ) -> Self {
        Self {
            user_repo,
            upload_repo,
            comment_repo,
            voting,
            id_gen: IdGenerator::new(),
        }
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Create a user with a fresh access token.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Username {} is taken",
                input.username
            )));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            token: Set(Some(self.id_gen.generate_token())),
            is_admin: Set(false),
            is_moderator: Set(false),
            created_at: Set(Utc::now().into()),
        };

        self.user_repo.create(model).await
    }

    /// Delete an account.
    ///
    /// The account's votes are handled by the configured author-deletion
    /// policy. Votes on the uploads and comments that go away with the
    /// account are purged.
    pub async fn delete_account(&self, caller: &CallerIdentity, user_id: &str) -> AppResult<()> {
        if caller.user_id != user_id && !caller.is_staff() {
            return Err(AppError::Forbidden(
                "Cannot delete another account".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;

        // Needs the author reference, which the row delete nulls out
        self.voting.handle_author_deleted(&user.id).await?;

        // Content cascades with the account, collect its targets first
        let mut targets = Vec::new();
        for upload_id in self.upload_repo.find_ids_by_user(&user.id).await? {
            for comment_id in self.comment_repo.find_ids_by_upload(&upload_id).await? {
                targets.push(TargetRef::new(comment::TYPE_TAG, comment_id));
            }
            targets.push(TargetRef::new(upload::TYPE_TAG, upload_id));
        }
        for comment_id in self.comment_repo.find_ids_by_user(&user.id).await? {
            targets.push(TargetRef::new(comment::TYPE_TAG, comment_id));
        }

        if !self.user_repo.delete(&user.id).await? {
            return Err(AppError::NotFound(format!("User {}", user.id)));
        }

        for target in &targets {
            self.voting.purge_target(target).await?;
        }

        tracing::info!(user_id = %user.id, "Deleted account");
        Ok(())
    }
}
