//! Database repositories.

pub mod chapter;
pub mod choice;
pub mod decision_point;
pub mod following;
pub mod story;
pub mod user;
pub mod vote;

pub use chapter::ChapterRepository;
pub use choice::ChoiceRepository;
pub use decision_point::DecisionPointRepository;
pub use following::FollowingRepository;
pub use story::{StoryFilter, StoryRepository};
pub use user::UserRepository;
pub use vote::VoteRepository;
