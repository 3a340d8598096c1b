//! Business logic services.

#![allow(missing_docs)]

pub mod authz;
pub mod chapter;
pub mod decision_point;
pub mod following;
pub mod story;
pub mod user;

pub use authz::{Authored, ensure_author, is_author};
pub use chapter::{ChapterService, CreateChapterInput, UpdateChapterInput};
pub use decision_point::{
    CreateChoiceInput, CreateDecisionPointInput, DecisionPointService, DecisionPointWithChoices,
    UpdateDecisionPointInput,
};
pub use following::FollowingService;
pub use story::{
    CreateStoryInput, LikeResult, SHARE_PLATFORMS, ShareResult, StoryListQuery, StoryService,
    StoryView, UpdateStoryInput,
};
pub use user::{AuthSession, Profile, SignupInput, UpdateProfileInput, UserService};
