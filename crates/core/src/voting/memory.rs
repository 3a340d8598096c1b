//! In-process vote store.
//!
//! A transaction holds the store's lock from `begin` until it is committed
//! or dropped, so transactions run one at a time (serializable). Writes go
//! to a private copy of the data that only replaces the shared state on
//! commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    ChoiceTarget, DecisionPointOwner, NewVote, StoreError, VoteInsert, VoteStore, VoteTransaction,
};

/// Where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Opening the transaction.
    Begin,
    /// The vote insert.
    Insert,
    /// The tally increment.
    Increment,
    /// Commit, after all writes succeeded.
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Data {
    /// decision point id -> (author id, is active)
    decision_points: HashMap<String, (String, bool)>,
    /// choice id -> (decision point id, votes)
    choices: HashMap<String, (String, i32)>,
    /// (user id, decision point id) -> choice id
    votes: HashMap<(String, String), String>,
}

#[derive(Debug, Default)]
struct State {
    data: Data,
    fault: Option<(FaultPoint, StoreError)>,
    latency: Duration,
}

impl State {
    fn check(&mut self, point: FaultPoint) -> Result<(), StoreError> {
        match self.fault.take() {
            Some((at, err)) if at == point => Err(err),
            other => {
                self.fault = other;
                Ok(())
            }
        }
    }
}

/// Vote store kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryVoteStore {
    state: Arc<Mutex<State>>,
}

impl MemoryVoteStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active decision point owned by `author_id`.
    pub async fn insert_decision_point(&self, id: &str, author_id: &str) {
        self.state
            .lock()
            .await
            .data
            .decision_points
            .insert(id.to_string(), (author_id.to_string(), true));
    }

    /// Add a choice with no votes.
    pub async fn insert_choice(&self, id: &str, decision_point_id: &str) {
        self.state
            .lock()
            .await
            .data
            .choices
            .insert(id.to_string(), (decision_point_id.to_string(), 0));
    }

    /// Make the next operation at `point` fail with `err`. One-shot.
    pub async fn fail_at(&self, point: FaultPoint, err: StoreError) {
        self.state.lock().await.fault = Some((point, err));
    }

    /// Delay every vote insert while holding the transaction.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = latency;
    }

    /// A choice's committed tally.
    pub async fn votes(&self, choice_id: &str) -> Option<i32> {
        self.state
            .lock()
            .await
            .data
            .choices
            .get(choice_id)
            .map(|(_, votes)| *votes)
    }

    /// A decision point's committed active flag.
    pub async fn is_active(&self, decision_point_id: &str) -> Option<bool> {
        self.state
            .lock()
            .await
            .data
            .decision_points
            .get(decision_point_id)
            .map(|(_, active)| *active)
    }

    /// Whether a committed vote exists for the pair.
    pub async fn has_vote(&self, user_id: &str, decision_point_id: &str) -> bool {
        self.state
            .lock()
            .await
            .data
            .votes
            .contains_key(&(user_id.to_string(), decision_point_id.to_string()))
    }

    /// Number of committed vote rows.
    pub async fn vote_rows(&self) -> usize {
        self.state.lock().await.data.votes.len()
    }

    /// Number of committed vote rows for one choice.
    pub async fn vote_rows_for(&self, choice_id: &str) -> usize {
        self.state
            .lock()
            .await
            .data
            .votes
            .values()
            .filter(|c| c.as_str() == choice_id)
            .count()
    }
}

#[async_trait]
impl VoteStore for MemoryVoteStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, StoreError> {
        let mut guard = self.state.clone().lock_owned().await;
        guard.check(FaultPoint::Begin)?;
        let working = guard.data.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    working: Data,
}

#[async_trait]
impl VoteTransaction for MemoryTransaction {
    async fn choice_target(&mut self, choice_id: &str) -> Result<Option<ChoiceTarget>, StoreError> {
        let Some((dp_id, _)) = self.working.choices.get(choice_id) else {
            return Ok(None);
        };
        let (_, is_active) = self.working.decision_points.get(dp_id).ok_or_else(|| {
            StoreError::Internal(format!("choice {choice_id} has no decision point"))
        })?;

        Ok(Some(ChoiceTarget {
            decision_point_id: dp_id.clone(),
            is_active: *is_active,
        }))
    }

    async fn decision_point_owner(
        &mut self,
        decision_point_id: &str,
    ) -> Result<Option<DecisionPointOwner>, StoreError> {
        Ok(self
            .working
            .decision_points
            .get(decision_point_id)
            .map(|(author_id, is_active)| DecisionPointOwner {
                is_active: *is_active,
                author_id: author_id.clone(),
            }))
    }

    async fn insert_vote(&mut self, vote: &NewVote) -> Result<VoteInsert, StoreError> {
        let latency = self.guard.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.guard.check(FaultPoint::Insert)?;

        let key = (vote.user_id.clone(), vote.decision_point_id.clone());
        if self.working.votes.contains_key(&key) {
            return Ok(VoteInsert::Duplicate);
        }
        self.working.votes.insert(key, vote.choice_id.clone());
        Ok(VoteInsert::Inserted)
    }

    async fn increment_votes(&mut self, choice_id: &str) -> Result<i32, StoreError> {
        self.guard.check(FaultPoint::Increment)?;

        let (_, votes) = self
            .working
            .choices
            .get_mut(choice_id)
            .ok_or_else(|| StoreError::Internal(format!("choice {choice_id} vanished")))?;
        *votes += 1;
        Ok(*votes)
    }

    async fn deactivate(&mut self, decision_point_id: &str) -> Result<(), StoreError> {
        if let Some((_, is_active)) = self.working.decision_points.get_mut(decision_point_id) {
            *is_active = false;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, working } = *self;
        guard.check(FaultPoint::Commit)?;
        guard.data = working;
        Ok(())
    }
}
