//! Choice entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "choice")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub decision_point_id: String,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Vote tally, only ever incremented
    #[sea_orm(default_value = 0)]
    pub votes: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::decision_point::Entity",
        from = "Column::DecisionPointId",
        to = "super::decision_point::Column::Id",
        on_delete = "Cascade"
    )]
    DecisionPoint,

    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,
}

impl Related<super::decision_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DecisionPoint.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
