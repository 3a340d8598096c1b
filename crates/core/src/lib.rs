//! Core business logic for storyloom.
//!
//! [`voting`] holds the vote-casting engine and its store contract; the
//! services in [`services`] are thin layers over the repositories for
//! accounts, follows, stories, chapters and decision points.

pub mod services;
pub mod voting;

pub use services::*;
pub use voting::{
    MemoryVoteStore, SeaOrmVoteStore, VoteResult, VoteStore, VoteTransaction, VotingEngine,
    VotingError,
};
