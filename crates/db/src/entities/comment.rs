//! Comment entity (a comment on an upload).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Type tag under which comments are registered as vote targets.
pub const TYPE_TAG: &str = "comment";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The upload being commented on
    pub upload_id: String,

    /// The comment author
    pub user_id: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    #[sea_orm(default_value = 0)]
    pub voting_sum: i64,

    #[sea_orm(default_value = 0)]
    pub voting_count: i64,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::upload::Entity",
        from = "Column::UploadId",
        to = "super::upload::Column::Id",
        on_delete = "Cascade"
    )]
    Upload,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::upload::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Upload.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
