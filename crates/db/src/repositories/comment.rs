//! Comment repository.

use std::sync::Arc;

use crate::entities::{Comment, comment};
use sharehub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {id}")))
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Comment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Get comments on an upload (paginated, newest first).
    pub async fn find_by_upload(
        &self,
        upload_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find()
            .filter(comment::Column::UploadId.eq(upload_id))
            .order_by_desc(comment::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(comment::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of every comment on an upload.
    pub async fn find_ids_by_upload(&self, upload_id: &str) -> AppResult<Vec<String>> {
        Comment::find()
            .select_only()
            .column(comment::Column::Id)
            .filter(comment::Column::UploadId.eq(upload_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of every comment written by a user.
    pub async fn find_ids_by_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        Comment::find()
            .select_only()
            .column(comment::Column::Id)
            .filter(comment::Column::UserId.eq(user_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Shift the voting aggregate atomically (single UPDATE query, no fetch).
    ///
    /// `updated_at` is deliberately not touched. Returns whether the comment
    /// still exists.
    pub async fn apply_voting_delta(&self, id: &str, sum: i64, count: i64) -> AppResult<bool> {
        let result = Comment::update_many()
            .col_expr(
                comment::Column::VotingSum,
                Expr::col(comment::Column::VotingSum).add(sum),
            )
            .col_expr(
                comment::Column::VotingCount,
                Expr::col(comment::Column::VotingCount).add(count),
            )
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Overwrite the voting aggregate (repair only).
    pub async fn set_voting(&self, id: &str, sum: i64, count: i64) -> AppResult<bool> {
        let result = Comment::update_many()
            .col_expr(comment::Column::VotingSum, Expr::value(sum))
            .col_expr(comment::Column::VotingCount, Expr::value(count))
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
