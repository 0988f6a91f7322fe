//! Comment service.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use sharehub_common::{AppError, AppResult, IdGenerator};
use sharehub_db::{
    entities::comment,
    repositories::{CommentRepository, UploadRepository},
};
use validator::Validate;

use super::identity::CallerIdentity;
use super::votable::{Votable, VotableStore, VotingAggregate, VotingDelta};
use super::voting::VotingService;

/// Input for creating a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    /// Upload being commented on.
    pub upload_id: String,
    /// Comment text.
    #[validate(length(min = 1, max = 4096))]
    pub body: String,
}

impl Votable for comment::Model {
    const TYPE_TAG: &'static str = comment::TYPE_TAG;

    fn id(&self) -> &str {
        &self.id
    }

    fn voting(&self) -> VotingAggregate {
        VotingAggregate::new(self.voting_sum, self.voting_count)
    }
}

#[async_trait]
impl VotableStore for CommentRepository {
    fn type_tag(&self) -> &str {
        comment::TYPE_TAG
    }

    async fn resolve(&self, id: &str) -> AppResult<Option<VotingAggregate>> {
        Ok(self.find_by_id(id).await?.map(|c| c.voting()))
    }

    async fn apply_delta(&self, id: &str, delta: VotingDelta) -> AppResult<bool> {
        self.apply_voting_delta(id, delta.sum, delta.count).await
    }

    async fn overwrite(&self, id: &str, aggregate: VotingAggregate) -> AppResult<bool> {
        self.set_voting(id, aggregate.sum, aggregate.count).await
    }
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    upload_repo: UploadRepository,
    voting: VotingService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        upload_repo: UploadRepository,
        voting: VotingService,
    ) -> Self {
        Self {
            comment_repo,
            upload_repo,
            voting,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on an upload.
    pub async fn create(&self, user_id: &str, input: CreateCommentInput) -> AppResult<comment::Model> {
        input.validate()?;

        // Upload must exist
        self.upload_repo.get_by_id(&input.upload_id).await?;

        let now = Utc::now();
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            upload_id: Set(input.upload_id),
            user_id: Set(user_id.to_string()),
            body: Set(input.body),
            voting_sum: Set(0),
            voting_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        self.comment_repo.create(model).await
    }

    /// Get a comment by ID.
    pub async fn get(&self, id: &str) -> AppResult<comment::Model> {
        self.comment_repo.get_by_id(id).await
    }

    /// Comments on an upload (paginated, newest first).
    pub async fn list_for_upload(
        &self,
        upload_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        self.comment_repo
            .find_by_upload(upload_id, limit, until_id)
            .await
    }

    /// Delete a comment and the votes on it.
    pub async fn delete(&self, caller: &CallerIdentity, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        if !caller.can_manage(&comment.user_id) {
            return Err(AppError::Forbidden(
                "Not the author of this comment".to_string(),
            ));
        }

        if !self.comment_repo.delete(id).await? {
            return Err(AppError::NotFound(format!("Comment {id}")));
        }
        self.voting.purge_target(&comment.target()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::identity::Role;
    use crate::services::memory::{InMemoryVotableStore, InMemoryVoteLedger};
    use crate::services::registry::VotableRegistry;
    use crate::services::votable::ImpactPolicy;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use sharehub_db::entities::vote::TargetRef;

    fn test_comment(id: &str, user_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            upload_id: "up1".to_string(),
            user_id: user_id.to_string(),
            body: "Nice".to_string(),
            voting_sum: -1,
            voting_count: 1,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_votable_comment_model() {
        let comment = test_comment("c1", "user1");
        assert_eq!(comment.voting(), VotingAggregate::new(-1, 1));
        assert_eq!(comment.target(), TargetRef::new("comment", "c1"));
    }

    #[tokio::test]
    async fn test_delete_purges_votes() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_comment("c1", "author")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let ledger = Arc::new(InMemoryVoteLedger::new());
        let store = Arc::new(InMemoryVotableStore::new("comment"));
        store.insert("c1").unwrap();
        let registry = VotableRegistry::builder()
            .register(store, ImpactPolicy::unit())
            .unwrap()
            .build();
        let voting = VotingService::new(ledger.clone(), registry);
        voting
            .cast_vote(&TargetRef::new("comment", "c1"), "voter", 1)
            .await
            .unwrap();

        let service = CommentService::new(
            CommentRepository::new(Arc::clone(&db)),
            UploadRepository::new(db),
            voting,
        );
        service
            .delete(&CallerIdentity::new("author", Role::User), "c1")
            .await
            .unwrap();

        assert!(ledger.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_moderator_may_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_comment("c1", "author")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let voting = VotingService::new(
            Arc::new(InMemoryVoteLedger::new()),
            VotableRegistry::default(),
        );
        let service = CommentService::new(
            CommentRepository::new(Arc::clone(&db)),
            UploadRepository::new(db),
            voting,
        );

        let result = service
            .delete(&CallerIdentity::new("mod", Role::Moderator), "c1")
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failed_row_delete_keeps_votes() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_comment("c1", "author")]])
                .append_exec_errors([DbErr::Custom("connection reset".to_string())])
                .into_connection(),
        );

        let ledger = Arc::new(InMemoryVoteLedger::new());
        let store = Arc::new(InMemoryVotableStore::new("comment"));
        store.insert("c1").unwrap();
        let registry = VotableRegistry::builder()
            .register(store.clone(), ImpactPolicy::unit())
            .unwrap()
            .build();
        let voting = VotingService::new(ledger.clone(), registry);
        voting
            .cast_vote(&TargetRef::new("comment", "c1"), "voter", 1)
            .await
            .unwrap();

        let service = CommentService::new(
            CommentRepository::new(Arc::clone(&db)),
            UploadRepository::new(db),
            voting,
        );
        let result = service
            .delete(&CallerIdentity::new("author", Role::User), "c1")
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(ledger.len().unwrap(), 1);
        assert_eq!(
            store.aggregate("c1").unwrap(),
            Some(VotingAggregate::new(1, 1))
        );
    }
}
