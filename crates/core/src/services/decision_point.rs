//! Decision point and choice service.
//!
//! Voting and deactivation are delegated to the [`VotingEngine`]; this
//! service resolves the story/chapter/decision point path first so that a
//! mismatched URL is reported as not found.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use storyloom_common::{AppError, AppResult, IdGenerator};
use storyloom_db::{
    entities::{chapter, choice, decision_point},
    repositories::{ChapterRepository, ChoiceRepository, DecisionPointRepository},
};
use tracing::info;
use validator::Validate;

use super::story::StoryService;
use crate::voting::{VoteResult, VotingEngine};

/// Decision point service for business logic.
#[derive(Clone)]
pub struct DecisionPointService {
    stories: StoryService,
    chapter_repo: ChapterRepository,
    decision_point_repo: DecisionPointRepository,
    choice_repo: ChoiceRepository,
    engine: VotingEngine,
    id_gen: IdGenerator,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDecisionPointInput {
    #[validate(length(min = 1, max = 500))]
    pub question: String,

    pub expires_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDecisionPointInput {
    #[validate(length(min = 1, max = 500))]
    pub question: Option<String>,

    pub expires_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChoiceInput {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
}

/// A decision point with its choices in creation order.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionPointWithChoices {
    #[serde(flatten)]
    pub decision_point: decision_point::Model,
    pub choices: Vec<choice::Model>,
}

impl DecisionPointService {
    /// Create a new decision point service.
    #[must_use]
    pub const fn new(
        stories: StoryService,
        chapter_repo: ChapterRepository,
        decision_point_repo: DecisionPointRepository,
        choice_repo: ChoiceRepository,
        engine: VotingEngine,
    ) -> Self {
        Self {
            stories,
            chapter_repo,
            decision_point_repo,
            choice_repo,
            engine,
            id_gen: IdGenerator::new(),
        }
    }

    async fn chapter(
        &self,
        slug: &str,
        chapter_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<chapter::Model> {
        let story = self.stories.visible_story(slug, viewer_id).await?;
        self.chapter_repo.get_in_story(&story.id, chapter_id).await
    }

    async fn authored_chapter(
        &self,
        user_id: &str,
        slug: &str,
        chapter_id: &str,
        action: &str,
    ) -> AppResult<chapter::Model> {
        let story = self.stories.authored_story(slug, user_id, action).await?;
        self.chapter_repo.get_in_story(&story.id, chapter_id).await
    }

    /// Active decision points of a chapter, newest first.
    pub async fn list(
        &self,
        slug: &str,
        chapter_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<DecisionPointWithChoices>> {
        let chapter = self.chapter(slug, chapter_id, viewer_id).await?;
        let decision_points = self
            .decision_point_repo
            .find_active_by_chapter(&chapter.id)
            .await?;

        let ids: Vec<String> = decision_points.iter().map(|dp| dp.id.clone()).collect();
        let mut choices: HashMap<String, Vec<choice::Model>> = HashMap::new();
        for c in self.choice_repo.find_by_decision_points(&ids).await? {
            choices.entry(c.decision_point_id.clone()).or_default().push(c);
        }

        Ok(decision_points
            .into_iter()
            .map(|dp| DecisionPointWithChoices {
                choices: choices.remove(&dp.id).unwrap_or_default(),
                decision_point: dp,
            })
            .collect())
    }

    /// Add a decision point to a chapter.
    pub async fn create(
        &self,
        user_id: &str,
        slug: &str,
        chapter_id: &str,
        input: CreateDecisionPointInput,
    ) -> AppResult<decision_point::Model> {
        input.validate()?;

        let chapter = self
            .authored_chapter(user_id, slug, chapter_id, "add decision points")
            .await?;

        let model = decision_point::ActiveModel {
            id: Set(self.id_gen.generate()),
            chapter_id: Set(chapter.id.clone()),
            question: Set(input.question),
            created_at: Set(chrono::Utc::now().into()),
            expires_at: Set(input.expires_at),
            is_active: Set(true),
        };

        let dp = self.decision_point_repo.create(model).await?;
        info!(decision_point_id = %dp.id, chapter_id = %chapter.id, "Decision point created");

        Ok(dp)
    }

    /// Get a decision point with its choices, active or not.
    pub async fn get(
        &self,
        slug: &str,
        chapter_id: &str,
        decision_point_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<DecisionPointWithChoices> {
        let chapter = self.chapter(slug, chapter_id, viewer_id).await?;
        let decision_point = self
            .decision_point_repo
            .get_in_chapter(&chapter.id, decision_point_id)
            .await?;
        let choices = self
            .choice_repo
            .find_by_decision_point(&decision_point.id)
            .await?;

        Ok(DecisionPointWithChoices {
            decision_point,
            choices,
        })
    }

    /// Update the question or expiry. The active flag is not editable here.
    pub async fn update(
        &self,
        user_id: &str,
        slug: &str,
        chapter_id: &str,
        decision_point_id: &str,
        input: UpdateDecisionPointInput,
    ) -> AppResult<decision_point::Model> {
        input.validate()?;

        let chapter = self
            .authored_chapter(user_id, slug, chapter_id, "edit decision points")
            .await?;
        let dp = self
            .decision_point_repo
            .get_in_chapter(&chapter.id, decision_point_id)
            .await?;

        let mut active: decision_point::ActiveModel = dp.into();
        if let Some(question) = input.question {
            active.question = Set(question);
        }
        if let Some(expires_at) = input.expires_at {
            active.expires_at = Set(Some(expires_at));
        }

        self.decision_point_repo.update(active).await
    }

    /// Delete a decision point with its choices and votes.
    pub async fn delete(
        &self,
        user_id: &str,
        slug: &str,
        chapter_id: &str,
        decision_point_id: &str,
    ) -> AppResult<()> {
        let chapter = self
            .authored_chapter(user_id, slug, chapter_id, "delete decision points")
            .await?;
        let dp = self
            .decision_point_repo
            .get_in_chapter(&chapter.id, decision_point_id)
            .await?;

        self.decision_point_repo.delete(&dp.id).await?;
        info!(decision_point_id = %dp.id, "Decision point deleted");
        Ok(())
    }

    /// Stop a decision point from accepting votes.
    pub async fn deactivate(
        &self,
        user_id: &str,
        slug: &str,
        chapter_id: &str,
        decision_point_id: &str,
    ) -> AppResult<()> {
        let chapter = self.chapter(slug, chapter_id, Some(user_id)).await?;
        let dp = self
            .decision_point_repo
            .get_in_chapter(&chapter.id, decision_point_id)
            .await?;

        self.engine
            .deactivate_decision_point(&dp.id, user_id)
            .await?;
        Ok(())
    }

    /// Add a choice to a decision point.
    pub async fn add_choice(
        &self,
        user_id: &str,
        slug: &str,
        chapter_id: &str,
        decision_point_id: &str,
        input: CreateChoiceInput,
    ) -> AppResult<choice::Model> {
        input.validate()?;

        let chapter = self
            .authored_chapter(user_id, slug, chapter_id, "add choices")
            .await?;
        let dp = self
            .decision_point_repo
            .get_in_chapter(&chapter.id, decision_point_id)
            .await?;

        let model = choice::ActiveModel {
            id: Set(self.id_gen.generate()),
            decision_point_id: Set(dp.id.clone()),
            text: Set(input.text),
            votes: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.choice_repo.create(model).await
    }

    /// Choices of a decision point in creation order.
    pub async fn list_choices(
        &self,
        slug: &str,
        chapter_id: &str,
        decision_point_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<choice::Model>> {
        Ok(self
            .get(slug, chapter_id, decision_point_id, viewer_id)
            .await?
            .choices)
    }

    /// Vote for `choice_id` on the decision point at this path.
    ///
    /// A choice that belongs to another decision point is reported as not
    /// found without reaching the voting engine.
    pub async fn vote(
        &self,
        user_id: &str,
        slug: &str,
        chapter_id: &str,
        decision_point_id: &str,
        choice_id: &str,
    ) -> AppResult<VoteResult> {
        let chapter = self.chapter(slug, chapter_id, Some(user_id)).await?;
        let dp = self
            .decision_point_repo
            .get_in_chapter(&chapter.id, decision_point_id)
            .await?;

        match self.choice_repo.find_by_id(choice_id).await? {
            Some(choice) if choice.decision_point_id == dp.id => {}
            _ => return Err(AppError::NotFound(format!("Choice {choice_id}"))),
        }

        Ok(self.engine.cast_vote(user_id, choice_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::voting::MemoryVoteStore;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use std::time::Duration;
    use storyloom_db::{
        entities::story,
        repositories::{StoryRepository, UserRepository},
    };

    fn create_test_story() -> story::Model {
        story::Model {
            id: "s1".to_string(),
            slug: "tale".to_string(),
            author_id: "alice".to_string(),
            title: "Tale".to_string(),
            description: String::new(),
            content: String::new(),
            cover_image_url: None,
            category: None,
            is_active: true,
            is_published: true,
            likes_count: 0,
            shares_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_chapter() -> chapter::Model {
        chapter::Model {
            id: "ch1".to_string(),
            story_id: "s1".to_string(),
            title: "One".to_string(),
            content: String::new(),
            order: 1,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_dp(id: &str) -> decision_point::Model {
        decision_point::Model {
            id: id.to_string(),
            chapter_id: "ch1".to_string(),
            question: "Which way?".to_string(),
            created_at: Utc::now().into(),
            expires_at: None,
            is_active: true,
        }
    }

    fn create_test_choice(id: &str, dp_id: &str) -> choice::Model {
        choice::Model {
            id: id.to_string(),
            decision_point_id: dp_id.to_string(),
            text: id.to_string(),
            votes: 0,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase, store: MemoryVoteStore) -> DecisionPointService {
        let db = Arc::new(db.into_connection());
        DecisionPointService::new(
            StoryService::new(StoryRepository::new(db.clone()), UserRepository::new(db.clone())),
            ChapterRepository::new(db.clone()),
            DecisionPointRepository::new(db.clone()),
            ChoiceRepository::new(db),
            VotingEngine::with_timeout(Arc::new(store), Duration::from_secs(5)),
        )
    }

    fn path() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_story()]])
            .append_query_results([[create_test_chapter()]])
    }

    #[tokio::test]
    async fn test_list_groups_choices() {
        let db = path()
            .append_query_results([vec![create_test_dp("dp2"), create_test_dp("dp1")]])
            .append_query_results([vec![
                create_test_choice("a", "dp1"),
                create_test_choice("b", "dp2"),
                create_test_choice("c", "dp1"),
            ]]);
        let svc = service(db, MemoryVoteStore::new());

        let list = svc.list("tale", "ch1", None).await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].decision_point.id, "dp2");
        assert_eq!(list[0].choices.len(), 1);
        assert_eq!(list[1].choices.len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_question() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MemoryVoteStore::new(),
        );

        let result = svc
            .create(
                "alice",
                "tale",
                "ch1",
                CreateDecisionPointInput {
                    question: String::new(),
                    expires_at: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_choice_by_stranger_forbidden() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_story()]]),
            MemoryVoteStore::new(),
        );

        let result = svc
            .add_choice(
                "bob",
                "tale",
                "ch1",
                "dp1",
                CreateChoiceInput {
                    text: "Left".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_vote_choice_from_other_decision_point() {
        let db = path()
            .append_query_results([[create_test_dp("dp1")]])
            .append_query_results([[create_test_choice("x", "dp2")]]);
        let svc = service(db, MemoryVoteStore::new());

        let result = svc.vote("bob", "tale", "ch1", "dp1", "x").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_vote_reaches_engine() {
        let store = MemoryVoteStore::new();
        store.insert_decision_point("dp1", "alice").await;
        store.insert_choice("a", "dp1").await;

        let db = path()
            .append_query_results([[create_test_dp("dp1")]])
            .append_query_results([[create_test_choice("a", "dp1")]]);
        let svc = service(db, store.clone());

        let result = svc.vote("bob", "tale", "ch1", "dp1", "a").await.unwrap();

        assert_eq!(result.votes, 1);
        assert!(store.has_vote("bob", "dp1").await);
    }

    #[tokio::test]
    async fn test_vote_after_expiry_is_accepted() {
        let store = MemoryVoteStore::new();
        store.insert_decision_point("dp1", "alice").await;
        store.insert_choice("a", "dp1").await;

        let mut expired = create_test_dp("dp1");
        expired.expires_at = Some((Utc::now() - chrono::Duration::hours(1)).into());
        let db = path()
            .append_query_results([[expired]])
            .append_query_results([[create_test_choice("a", "dp1")]]);
        let svc = service(db, store.clone());

        let result = svc.vote("bob", "tale", "ch1", "dp1", "a").await.unwrap();

        assert_eq!(result.votes, 1);
        assert_eq!(store.is_active("dp1").await, Some(true));
    }

    #[tokio::test]
    async fn test_second_vote_is_already_voted() {
        let store = MemoryVoteStore::new();
        store.insert_decision_point("dp1", "alice").await;
        store.insert_choice("a", "dp1").await;
        store.insert_choice("b", "dp1").await;

        let db = path()
            .append_query_results([[create_test_dp("dp1")]])
            .append_query_results([[create_test_choice("a", "dp1")]])
            .append_query_results([[create_test_story()]])
            .append_query_results([[create_test_chapter()]])
            .append_query_results([[create_test_dp("dp1")]])
            .append_query_results([[create_test_choice("b", "dp1")]]);
        let svc = service(db, store.clone());

        svc.vote("bob", "tale", "ch1", "dp1", "a").await.unwrap();
        let result = svc.vote("bob", "tale", "ch1", "dp1", "b").await;

        assert!(matches!(result, Err(AppError::AlreadyVoted(_))));
        assert_eq!(store.votes("b").await, Some(0));
    }

    #[tokio::test]
    async fn test_deactivate_by_stranger_forbidden() {
        let store = MemoryVoteStore::new();
        store.insert_decision_point("dp1", "alice").await;

        let db = path().append_query_results([[create_test_dp("dp1")]]);
        let svc = service(db, store.clone());

        let result = svc.deactivate("bob", "tale", "ch1", "dp1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(store.is_active("dp1").await, Some(true));
    }
}
