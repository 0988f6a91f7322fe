//! Upload repository.

use std::sync::Arc;

use chrono::Utc;
use crate::entities::{Upload, upload};
use sharehub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

/// Upload repository for database operations.
#[derive(Clone)]
pub struct UploadRepository {
    db: Arc<DatabaseConnection>,
}

impl UploadRepository {
    /// Create a new upload repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an upload by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<upload::Model>> {
        Upload::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an upload by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<upload::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload {id}")))
    }

    /// Find an upload by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<upload::Model>> {
        Upload::find()
            .filter(upload::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new upload.
    pub async fn create(&self, model: upload::ActiveModel) -> AppResult<upload::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update the editable content of an upload.
    ///
    /// The voting columns are reserved and never part of a content edit.
    pub async fn update_content(&self, id: &str, title: &str, description: &str) -> AppResult<bool> {
        let result = Upload::update_many()
            .col_expr(upload::Column::Title, Expr::value(title))
            .col_expr(upload::Column::Description, Expr::value(description))
            .col_expr(upload::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(upload::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Delete an upload. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Upload::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Get uploads (paginated, newest first).
    pub async fn find_recent(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<upload::Model>> {
        let mut query = Upload::find().order_by_desc(upload::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(upload::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of every upload owned by a user.
    pub async fn find_ids_by_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        Upload::find()
            .select_only()
            .column(upload::Column::Id)
            .filter(upload::Column::UserId.eq(user_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Shift the voting aggregate atomically (single UPDATE query, no fetch).
    ///
    /// `updated_at` is deliberately not touched. Returns whether the upload
    /// still exists.
    pub async fn apply_voting_delta(&self, id: &str, sum: i64, count: i64) -> AppResult<bool> {
        let result = Upload::update_many()
            .col_expr(
                upload::Column::VotingSum,
                Expr::col(upload::Column::VotingSum).add(sum),
            )
            .col_expr(
                upload::Column::VotingCount,
                Expr::col(upload::Column::VotingCount).add(count),
            )
            .filter(upload::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Overwrite the voting aggregate (repair only).
    pub async fn set_voting(&self, id: &str, sum: i64, count: i64) -> AppResult<bool> {
        let result = Upload::update_many()
            .col_expr(upload::Column::VotingSum, Expr::value(sum))
            .col_expr(upload::Column::VotingCount, Expr::value(count))
            .filter(upload::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
