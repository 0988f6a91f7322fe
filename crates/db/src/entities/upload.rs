//! Upload entity (a shared file with its metadata).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Type tag under which uploads are registered as vote targets.
pub const TYPE_TAG: &str = "upload";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub slug: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// The user who uploaded
    pub user_id: String,

    /// Sum of live vote impacts (denormalized, owned by the voting engine)
    #[sea_orm(default_value = 0)]
    pub voting_sum: i64,

    /// Number of live votes (denormalized, owned by the voting engine)
    #[sea_orm(default_value = 0)]
    pub voting_count: i64,

    pub created_at: DateTimeWithTimeZone,

    /// Last content edit; vote reconciliation leaves this alone
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
