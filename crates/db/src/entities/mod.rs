//! Database entities.

pub mod chapter;
pub mod choice;
pub mod decision_point;
pub mod following;
pub mod story;
pub mod story_like;
pub mod story_share;
pub mod user;
pub mod vote;

pub use chapter::Entity as Chapter;
pub use choice::Entity as Choice;
pub use decision_point::Entity as DecisionPoint;
pub use following::Entity as Following;
pub use story::Entity as Story;
pub use story_like::Entity as StoryLike;
pub use story_share::Entity as StoryShare;
pub use user::Entity as User;
pub use vote::Entity as Vote;
