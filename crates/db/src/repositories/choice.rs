//! Choice repository.

use std::sync::Arc;

use crate::entities::{Choice, choice};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use storyloom_common::{AppError, AppResult};

/// Choice repository for database operations.
///
/// Vote tallies are only written by the voting engine.
#[derive(Clone)]
pub struct ChoiceRepository {
    db: Arc<DatabaseConnection>,
}

impl ChoiceRepository {
    /// Create a new choice repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a choice by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<choice::Model>> {
        Choice::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the choices of one decision point in creation order.
    pub async fn find_by_decision_point(
        &self,
        decision_point_id: &str,
    ) -> AppResult<Vec<choice::Model>> {
        Choice::find()
            .filter(choice::Column::DecisionPointId.eq(decision_point_id))
            .order_by_asc(choice::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the choices of several decision points in creation order.
    pub async fn find_by_decision_points(
        &self,
        decision_point_ids: &[String],
    ) -> AppResult<Vec<choice::Model>> {
        if decision_point_ids.is_empty() {
            return Ok(vec![]);
        }

        Choice::find()
            .filter(choice::Column::DecisionPointId.is_in(decision_point_ids.to_vec()))
            .order_by_asc(choice::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a choice.
    pub async fn create(&self, model: choice::ActiveModel) -> AppResult<choice::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
