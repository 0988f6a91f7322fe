//! Vote entity (one signed judgment by one user on one votable target).

use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The voter. NULL once the account is deleted under the anonymize policy.
    #[sea_orm(nullable)]
    pub user_id: Option<String>,

    /// Type tag of the target collection (e.g. "upload", "comment")
    pub target_type: String,

    /// ID of the target document within its collection
    pub target_id: String,

    /// Signed impact, constrained by the target type's policy
    pub impact: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// The polymorphic reference to the voted entity.
    #[must_use]
    pub fn target(&self) -> TargetRef {
        TargetRef::new(&self.target_type, &self.target_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Reference to a votable entity of any registered type.
///
/// Votes point at heterogeneous collections, so the target is a
/// (type tag, id) pair instead of a typed foreign key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub target_type: String,
    pub target_id: String,
}

impl TargetRef {
    /// Create a new target reference.
    pub fn new(target_type: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            target_id: target_id.into(),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target_type, self.target_id)
    }
}
