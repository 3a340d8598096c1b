//! PostgreSQL vote store over sea-orm.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, Set, TransactionTrait};
use storyloom_db::{entities::vote, repositories::VoteRepository};

use super::{
    ChoiceTarget, DecisionPointOwner, NewVote, StoreError, VoteInsert, VoteStore, VoteTransaction,
};

/// Vote store backed by the application database.
#[derive(Clone)]
pub struct SeaOrmVoteStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmVoteStore {
    /// Create a store on the given connection pool.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VoteStore for SeaOrmVoteStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, StoreError> {
        let txn = self.db.begin().await.map_err(classify)?;
        Ok(Box::new(SeaOrmVoteTransaction { txn }))
    }
}

/// Rolled back by sea-orm when dropped uncommitted.
struct SeaOrmVoteTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl VoteTransaction for SeaOrmVoteTransaction {
    async fn choice_target(&mut self, choice_id: &str) -> Result<Option<ChoiceTarget>, StoreError> {
        let found = VoteRepository::choice_with_locked_decision_point(&self.txn, choice_id)
            .await
            .map_err(classify)?;

        Ok(found.map(|(_, dp)| ChoiceTarget {
            decision_point_id: dp.id,
            is_active: dp.is_active,
        }))
    }

    async fn decision_point_owner(
        &mut self,
        decision_point_id: &str,
    ) -> Result<Option<DecisionPointOwner>, StoreError> {
        let found = VoteRepository::decision_point_with_author(&self.txn, decision_point_id)
            .await
            .map_err(classify)?;

        Ok(found.map(|(dp, author_id)| DecisionPointOwner {
            is_active: dp.is_active,
            author_id,
        }))
    }

    async fn insert_vote(&mut self, vote: &NewVote) -> Result<VoteInsert, StoreError> {
        let model = vote::ActiveModel {
            id: Set(vote.id.clone()),
            user_id: Set(vote.user_id.clone()),
            choice_id: Set(vote.choice_id.clone()),
            decision_point_id: Set(vote.decision_point_id.clone()),
            created_at: Set(Utc::now().into()),
        };

        let inserted = VoteRepository::insert_if_absent(&self.txn, model)
            .await
            .map_err(classify)?;

        Ok(if inserted {
            VoteInsert::Inserted
        } else {
            VoteInsert::Duplicate
        })
    }

    async fn increment_votes(&mut self, choice_id: &str) -> Result<i32, StoreError> {
        VoteRepository::increment_choice_votes(&self.txn, choice_id)
            .await
            .map_err(classify)?
            .ok_or_else(|| StoreError::Internal(format!("choice {choice_id} vanished mid-vote")))
    }

    async fn deactivate(&mut self, decision_point_id: &str) -> Result<(), StoreError> {
        VoteRepository::deactivate_decision_point(&self.txn, decision_point_id)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(classify)
    }
}

/// Sort database errors into retryable and not.
///
/// PostgreSQL reports deadlocks (40P01) and serialization failures (40001)
/// only through the message text at this layer.
fn classify(err: DbErr) -> StoreError {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StoreError::Transient(err.to_string()),
        _ => {
            let message = err.to_string();
            if message.contains("deadlock detected")
                || message.contains("could not serialize access")
            {
                StoreError::Transient(message)
            } else {
                StoreError::Internal(message)
            }
        }
    }
}
