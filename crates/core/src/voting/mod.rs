//! Vote casting and the decision point lifecycle.
//!
//! [`VotingEngine`] is the only writer of vote rows and choice tallies. Each
//! operation runs in a single store transaction under a deadline; the store
//! is reached through the [`VoteStore`] / [`VoteTransaction`] traits so the
//! same engine runs against PostgreSQL ([`SeaOrmVoteStore`]) and in memory
//! ([`MemoryVoteStore`]).
//!
//! A user gets at most one vote per decision point. The store enforces this
//! itself (a unique index plus a conditional insert), so two racing casts by
//! the same user resolve to one success and one [`VotingError::DuplicateVote`].

mod memory;
mod sea_orm_store;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use storyloom_common::{AppError, IdGenerator, config::VotingConfig};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::services::authz::{Authored, ensure_author};

pub use memory::{FaultPoint, MemoryVoteStore};
pub use sea_orm_store::SeaOrmVoteStore;

/// A choice's parent decision point, as seen inside a vote transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceTarget {
    /// Decision point the choice belongs to.
    pub decision_point_id: String,
    /// Whether the decision point still accepts votes.
    pub is_active: bool,
}

/// A decision point's state and the author of the story that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPointOwner {
    /// Whether the decision point still accepts votes.
    pub is_active: bool,
    /// Author of the owning story.
    pub author_id: String,
}

impl Authored for DecisionPointOwner {
    fn author_id(&self) -> &str {
        &self.author_id
    }
}

/// A vote about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVote {
    pub id: String,
    pub user_id: String,
    pub choice_id: String,
    /// Copied from the choice; the uniqueness key together with `user_id`.
    pub decision_point_id: String,
}

/// Outcome of a conditional vote insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteInsert {
    /// The row was written.
    Inserted,
    /// The user already has a vote on this decision point.
    Duplicate,
}

/// Failure reported by a vote store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Retryable: pool exhaustion, lost connection, deadlock, serialization failure.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Anything else, including broken store invariants.
    #[error("store failure: {0}")]
    Internal(String),
}

/// Transactional storage used by the voting engine.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, StoreError>;
}

/// One open store transaction.
///
/// Dropping a transaction without calling [`VoteTransaction::commit`] rolls
/// it back, so an abandoned operation never leaves a partial write.
#[async_trait]
pub trait VoteTransaction: Send {
    /// Look up a choice's decision point. The decision point stays locked
    /// against deactivation until the transaction ends.
    async fn choice_target(&mut self, choice_id: &str) -> Result<Option<ChoiceTarget>, StoreError>;

    /// Look up a decision point and its story's author, locked for update.
    async fn decision_point_owner(
        &mut self,
        decision_point_id: &str,
    ) -> Result<Option<DecisionPointOwner>, StoreError>;

    /// Insert a vote unless one exists for `(user_id, decision_point_id)`.
    async fn insert_vote(&mut self, vote: &NewVote) -> Result<VoteInsert, StoreError>;

    /// Add one to a choice's tally and return the new count.
    async fn increment_votes(&mut self, choice_id: &str) -> Result<i32, StoreError>;

    /// Mark a decision point inactive.
    async fn deactivate(&mut self, decision_point_id: &str) -> Result<(), StoreError>;

    /// Make the transaction's writes durable.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Result of a successful vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteResult {
    pub vote_id: String,
    pub decision_point_id: String,
    pub choice_id: String,
    /// The choice's tally after this vote.
    pub votes: i32,
}

/// Why a voting operation failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VotingError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("decision point {0} is no longer accepting votes")]
    InactiveDecisionPoint(String),

    #[error("already voted on decision point {0}")]
    DuplicateVote(String),

    #[error("only the story author can deactivate this decision point")]
    Unauthorized,

    #[error("temporarily unavailable: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for VotingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transient(msg) => Self::Transient(msg),
            StoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<VotingError> for AppError {
    fn from(err: VotingError) -> Self {
        match err {
            VotingError::NotFound(what) => Self::NotFound(what),
            VotingError::InactiveDecisionPoint(id) => Self::DecisionPointInactive(id),
            VotingError::DuplicateVote(id) => Self::AlreadyVoted(id),
            VotingError::Unauthorized => Self::Forbidden(
                "Only the story author can deactivate this decision point".to_string(),
            ),
            VotingError::Transient(msg) => Self::Unavailable(msg),
            VotingError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// Casts votes and deactivates decision points.
#[derive(Clone)]
pub struct VotingEngine {
    store: Arc<dyn VoteStore>,
    id_gen: IdGenerator,
    cast_timeout: Duration,
}

impl VotingEngine {
    /// Create an engine with the configured transaction deadline.
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>, config: &VotingConfig) -> Self {
        Self::with_timeout(store, config.cast_timeout())
    }

    /// Create an engine with an explicit transaction deadline.
    #[must_use]
    pub fn with_timeout(store: Arc<dyn VoteStore>, cast_timeout: Duration) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
            cast_timeout,
        }
    }

    /// Record `user_id`'s vote for `choice_id`.
    ///
    /// Checks run in order and the first failure wins: the choice must exist
    /// ([`VotingError::NotFound`]), its decision point must be active
    /// ([`VotingError::InactiveDecisionPoint`]), and the user must not have
    /// voted on that decision point yet ([`VotingError::DuplicateVote`]).
    /// On success the vote row and the tally increment commit together.
    pub async fn cast_vote(
        &self,
        user_id: &str,
        choice_id: &str,
    ) -> Result<VoteResult, VotingError> {
        let result = self
            .with_deadline("cast_vote", self.cast_vote_txn(user_id, choice_id))
            .await;

        match &result {
            Ok(vote) => info!(
                user_id = %user_id,
                choice_id = %choice_id,
                decision_point_id = %vote.decision_point_id,
                votes = vote.votes,
                "Vote cast"
            ),
            Err(e) => log_failure("cast_vote", e),
        }

        result
    }

    /// Close a decision point to further votes.
    ///
    /// Only the author of the owning story may do this. Deactivating an
    /// already inactive decision point succeeds without writing anything.
    pub async fn deactivate_decision_point(
        &self,
        decision_point_id: &str,
        user_id: &str,
    ) -> Result<(), VotingError> {
        let result = self
            .with_deadline(
                "deactivate_decision_point",
                self.deactivate_txn(decision_point_id, user_id),
            )
            .await;

        match &result {
            Ok(()) => info!(
                decision_point_id = %decision_point_id,
                user_id = %user_id,
                "Decision point deactivated"
            ),
            Err(e) => log_failure("deactivate_decision_point", e),
        }

        result
    }

    async fn cast_vote_txn(
        &self,
        user_id: &str,
        choice_id: &str,
    ) -> Result<VoteResult, VotingError> {
        let mut txn = self.store.begin().await?;

        let target = txn
            .choice_target(choice_id)
            .await?
            .ok_or_else(|| VotingError::NotFound(format!("Choice {choice_id}")))?;

        if !target.is_active {
            return Err(VotingError::InactiveDecisionPoint(target.decision_point_id));
        }

        let vote = NewVote {
            id: self.id_gen.generate(),
            user_id: user_id.to_string(),
            choice_id: choice_id.to_string(),
            decision_point_id: target.decision_point_id,
        };

        if txn.insert_vote(&vote).await? == VoteInsert::Duplicate {
            return Err(VotingError::DuplicateVote(vote.decision_point_id));
        }

        let votes = txn.increment_votes(choice_id).await?;
        txn.commit().await?;

        Ok(VoteResult {
            vote_id: vote.id,
            decision_point_id: vote.decision_point_id,
            choice_id: vote.choice_id,
            votes,
        })
    }

    async fn deactivate_txn(
        &self,
        decision_point_id: &str,
        user_id: &str,
    ) -> Result<(), VotingError> {
        let mut txn = self.store.begin().await?;

        let owner = txn
            .decision_point_owner(decision_point_id)
            .await?
            .ok_or_else(|| VotingError::NotFound(format!("Decision point {decision_point_id}")))?;

        ensure_author(&owner, user_id, "deactivate this decision point")
            .map_err(|_| VotingError::Unauthorized)?;

        if owner.is_active {
            txn.deactivate(decision_point_id).await?;
            txn.commit().await?;
        }

        Ok(())
    }

    /// Run `op` under the configured deadline. On expiry the future, and the
    /// transaction it holds, is dropped and therefore rolled back.
    async fn with_deadline<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, VotingError>>,
    ) -> Result<T, VotingError> {
        tokio::time::timeout(self.cast_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(VotingError::Transient(format!(
                    "{op} exceeded {}ms",
                    self.cast_timeout.as_millis()
                )))
            })
    }
}

fn log_failure(op: &str, err: &VotingError) {
    match err {
        VotingError::Transient(_) => {
            warn!(op = op, error = %err, "Voting operation failed transiently");
        }
        VotingError::Internal(_) => warn!(op = op, error = %err, "Voting operation failed"),
        _ => debug!(op = op, error = %err, "Voting operation rejected"),
    }
}
