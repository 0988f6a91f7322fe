//! Upload service.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use sharehub_common::{AppError, AppResult, IdGenerator};
use sharehub_db::{
    entities::{
        comment,
        upload,
        vote::TargetRef,
    },
    repositories::{CommentRepository, UploadRepository},
};
use validator::Validate;

use super::identity::CallerIdentity;
use super::votable::{Votable, VotableStore, VotingAggregate, VotingDelta};
use super::voting::VotingService;

/// Maximum slug prefix derived from the title.
const MAX_SLUG_PREFIX: usize = 48;

/// Input for creating an upload.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadInput {
    /// Upload title, also the source of the slug.
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    #[validate(length(max = 8192))]
    pub description: String,
}

/// Input for editing an upload.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUploadInput {
    /// New title, if changing.
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    /// New description, if changing.
    #[validate(length(max = 8192))]
    pub description: Option<String>,
}

impl Votable for upload::Model {
    const TYPE_TAG: &'static str = upload::TYPE_TAG;

    fn id(&self) -> &str {
        &self.id
    }

    fn voting(&self) -> VotingAggregate {
        VotingAggregate::new(self.voting_sum, self.voting_count)
    }
}

#[async_trait]
impl VotableStore for UploadRepository {
    fn type_tag(&self) -> &str {
        upload::TYPE_TAG
    }

    async fn resolve(&self, id: &str) -> AppResult<Option<VotingAggregate>> {
        Ok(self.find_by_id(id).await?.map(|u| u.voting()))
    }

    async fn apply_delta(&self, id: &str, delta: VotingDelta) -> AppResult<bool> {
        self.apply_voting_delta(id, delta.sum, delta.count).await
    }

    async fn overwrite(&self, id: &str, aggregate: VotingAggregate) -> AppResult<bool> {
        self.set_voting(id, aggregate.sum, aggregate.count).await
    }
}

/// Upload service for business logic.
#[derive(Clone)]
pub struct UploadService {
    upload_repo: UploadRepository,
    comment_repo: CommentRepository,
    voting: VotingService,
    id_gen: IdGenerator,
}

impl UploadService {
    /// Create a new upload service.
    #[must_use]
    pub const fn new(
        upload_repo: UploadRepository,
        comment_repo: CommentRepository,
        voting: VotingService,
    ) -> Self {
        Self {
            upload_repo,
            comment_repo,
            voting,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create an upload with an empty vote aggregate.
    pub async fn create(&self, user_id: &str, input: CreateUploadInput) -> AppResult<upload::Model> {
        input.validate()?;

        let id = self.id_gen.generate();
        let now = Utc::now();
        let model = upload::ActiveModel {
            slug: Set(slugify(&input.title, &id)),
            id: Set(id),
            title: Set(input.title),
            description: Set(input.description),
            user_id: Set(user_id.to_string()),
            voting_sum: Set(0),
            voting_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        self.upload_repo.create(model).await
    }

    /// Get an upload by ID.
    pub async fn get(&self, id: &str) -> AppResult<upload::Model> {
        self.upload_repo.get_by_id(id).await
    }

    /// Get an upload by slug.
    pub async fn get_by_slug(&self, slug: &str) -> AppResult<upload::Model> {
        self.upload_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload {slug}")))
    }

    /// List recent uploads.
    pub async fn list_recent(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<upload::Model>> {
        self.upload_repo.find_recent(limit, until_id).await
    }

    /// Edit title and description. Vote aggregates are not editable.
    pub async fn update(
        &self,
        caller: &CallerIdentity,
        id: &str,
        input: UpdateUploadInput,
    ) -> AppResult<upload::Model> {
        input.validate()?;

        let upload = self.upload_repo.get_by_id(id).await?;
        if !caller.can_manage(&upload.user_id) {
            return Err(AppError::Forbidden("Not the owner of this upload".to_string()));
        }

        let title = input.title.unwrap_or(upload.title);
        let description = input.description.unwrap_or(upload.description);
        self.upload_repo
            .update_content(id, &title, &description)
            .await?;

        self.upload_repo.get_by_id(id).await
    }

    /// Delete an upload together with the votes on it and on its comments.
    pub async fn delete(&self, caller: &CallerIdentity, id: &str) -> AppResult<()> {
        let upload = self.upload_repo.get_by_id(id).await?;
        if !caller.can_manage(&upload.user_id) {
            return Err(AppError::Forbidden("Not the owner of this upload".to_string()));
        }

        // Comments cascade with the upload row, collect them first
        let comment_ids = self.comment_repo.find_ids_by_upload(id).await?;

        // Row first: a cast racing the delete then finds no target and drops its vote
        if !self.upload_repo.delete(id).await? {
            return Err(AppError::NotFound(format!("Upload {id}")));
        }

        for comment_id in comment_ids {
            self.voting
                .purge_target(&TargetRef::new(comment::TYPE_TAG, comment_id))
                .await?;
        }
        self.voting.purge_target(&upload.target()).await?;

        tracing::info!(upload_id = %id, "Deleted upload");
        Ok(())
    }
}

/// Build a URL slug from a title and a unique ID.
fn slugify(title: &str, id: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if slug.len() >= MAX_SLUG_PREFIX {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let suffix = &id[id.len().saturating_sub(8)..];
    if slug.is_empty() {
        suffix.to_string()
    } else if slug.ends_with('-') {
        format!("{slug}{suffix}")
    } else {
        format!("{slug}-{suffix}")
    }
}
