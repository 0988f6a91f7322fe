//! Vote ledger: durable, uniquely keyed storage of individual votes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use sharehub_common::{AppError, AppResult, IdGenerator};
use sharehub_db::{
    entities::vote::{self, TargetRef},
    repositories::VoteRepository,
};

/// Shared ledger handle.
pub type SharedVoteLedger = Arc<dyn VoteLedger>;

/// Storage of vote records keyed by (author, target).
///
/// Implementations never touch target aggregates; keeping both in step is
/// the job of [`crate::VotingService`].
#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Find the live vote of `author` on `target`.
    async fn find_vote(&self, author: &str, target: &TargetRef) -> AppResult<Option<vote::Model>>;

    /// Load a vote by ID.
    async fn get_vote(&self, vote_id: &str) -> AppResult<Option<vote::Model>>;

    /// Record a new vote.
    ///
    /// Fails with [`AppError::Conflict`] when `author` already has a vote on
    /// `target`.
    async fn create_vote(
        &self,
        author: &str,
        target: &TargetRef,
        impact: i32,
    ) -> AppResult<vote::Model>;

    /// Delete a vote. Fails with [`AppError::VoteNotFound`] if it is absent.
    async fn remove_vote(&self, vote_id: &str) -> AppResult<()>;

    /// Every vote on a target, oldest first.
    async fn list_votes_for_target(&self, target: &TargetRef) -> AppResult<Vec<vote::Model>>;

    /// Votes on a target, newest first.
    async fn list_votes_for_target_paged(
        &self,
        target: &TargetRef,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>>;

    /// Votes cast by an author, newest first.
    async fn list_votes_by_author(
        &self,
        author: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>>;

    /// Delete every vote on a target. Returns the number of removed votes.
    async fn remove_votes_for_target(&self, target: &TargetRef) -> AppResult<u64>;

    /// Detach an author from all their votes, keeping the votes counted.
    async fn anonymize_votes_by_author(&self, author: &str) -> AppResult<u64>;
}

/// Ledger backed by the `vote` table.
#[derive(Clone)]
pub struct DbVoteLedger {
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl DbVoteLedger {
    /// Create a new database-backed ledger.
    #[must_use]
    pub const fn new(vote_repo: VoteRepository) -> Self {
        Self {
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl VoteLedger for DbVoteLedger {
    async fn find_vote(&self, author: &str, target: &TargetRef) -> AppResult<Option<vote::Model>> {
        self.vote_repo.find_by_user_and_target(author, target).await
    }

    async fn get_vote(&self, vote_id: &str) -> AppResult<Option<vote::Model>> {
        self.vote_repo.find_by_id(vote_id).await
    }

    async fn create_vote(
        &self,
        author: &str,
        target: &TargetRef,
        impact: i32,
    ) -> AppResult<vote::Model> {
        let now = Utc::now();
        let model = vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(Some(author.to_string())),
            target_type: Set(target.target_type.clone()),
            target_id: Set(target.target_id.clone()),
            impact: Set(impact),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        self.vote_repo.create(model).await
    }

    async fn remove_vote(&self, vote_id: &str) -> AppResult<()> {
        if self.vote_repo.delete(vote_id).await? {
            Ok(())
        } else {
            Err(AppError::VoteNotFound(vote_id.to_string()))
        }
    }

    async fn list_votes_for_target(&self, target: &TargetRef) -> AppResult<Vec<vote::Model>> {
        self.vote_repo.find_all_by_target(target).await
    }

    async fn list_votes_for_target_paged(
        &self,
        target: &TargetRef,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        self.vote_repo.find_by_target(target, limit, until_id).await
    }

    async fn list_votes_by_author(
        &self,
        author: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        self.vote_repo.find_by_user(author, limit, until_id).await
    }

    async fn remove_votes_for_target(&self, target: &TargetRef) -> AppResult<u64> {
        self.vote_repo.delete_by_target(target).await
    }

    async fn anonymize_votes_by_author(&self, author: &str) -> AppResult<u64> {
        self.vote_repo.anonymize_by_user(author).await
    }
}
