//! Vote repository.

use std::sync::Arc;

use crate::entities::{Vote, vote, vote::TargetRef};
use sharehub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, SqlErr, sea_query::Expr,
};

/// Vote repository for database operations.
///
/// Only stores and queries ledger rows; it never touches the
/// denormalized aggregates of the voted entities.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a vote by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<vote::Model>> {
        Vote::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a vote by author and target.
    pub async fn find_by_user_and_target(
        &self,
        user_id: &str,
        target: &TargetRef,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::TargetType.eq(target.target_type.as_str()))
            .filter(vote::Column::TargetId.eq(target.target_id.as_str()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new vote.
    ///
    /// A violation of the (author, target) unique index surfaces as
    /// [`AppError::Conflict`].
    pub async fn create(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(map_insert_error)
    }

    /// Delete a vote. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Vote::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Delete every vote on a target. Returns the number of removed rows.
    pub async fn delete_by_target(&self, target: &TargetRef) -> AppResult<u64> {
        let result = Vote::delete_many()
            .filter(vote::Column::TargetType.eq(target.target_type.as_str()))
            .filter(vote::Column::TargetId.eq(target.target_id.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Drop the author reference from all of a user's votes.
    pub async fn anonymize_by_user(&self, user_id: &str) -> AppResult<u64> {
        let result = Vote::update_many()
            .col_expr(vote::Column::UserId, Expr::value(Option::<String>::None))
            .filter(vote::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Get votes on a target (paginated, newest first).
    pub async fn find_by_target(
        &self,
        target: &TargetRef,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let mut query = Vote::find()
            .filter(vote::Column::TargetType.eq(target.target_type.as_str()))
            .filter(vote::Column::TargetId.eq(target.target_id.as_str()))
            .order_by_desc(vote::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(vote::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get every vote on a target (for aggregate repair).
    pub async fn find_all_by_target(&self, target: &TargetRef) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::TargetType.eq(target.target_type.as_str()))
            .filter(vote::Column::TargetId.eq(target.target_id.as_str()))
            .order_by_asc(vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get votes by a user (paginated, newest first).
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let mut query = Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .order_by_desc(vote::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(vote::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

fn map_insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(err.to_string()),
    }
}
