//! Following service.

use std::collections::HashMap;

use sea_orm::Set;
use storyloom_common::{AppError, AppResult, IdGenerator};
use storyloom_db::{
    entities::{following, user},
    repositories::{FollowingRepository, UserRepository},
};
use tracing::info;

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    following_repo: FollowingRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(following_repo: FollowingRepository, user_repo: UserRepository) -> Self {
        Self {
            following_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow the user named `username`.
    pub async fn follow(&self, follower_id: &str, username: &str) -> AppResult<following::Model> {
        let followee = self.user_repo.get_by_username(username).await?;

        // Can't follow yourself
        if follower_id == followee.id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        if self
            .following_repo
            .is_following(follower_id, &followee.id)
            .await?
        {
            return Err(AppError::Conflict("Already following this user".to_string()));
        }

        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee.id.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };

        // The unique index settles concurrent follows; the loser gets a conflict
        let following = self.following_repo.create(model).await?;

        self.user_repo.increment_following_count(follower_id).await?;
        self.user_repo.increment_followers_count(&followee.id).await?;

        info!(follower_id, followee_id = %followee.id, "Followed user");
        Ok(following)
    }

    /// Stop following the user named `username`.
    pub async fn unfollow(&self, follower_id: &str, username: &str) -> AppResult<()> {
        let followee = self.user_repo.get_by_username(username).await?;

        if !self
            .following_repo
            .delete_by_pair(follower_id, &followee.id)
            .await?
        {
            return Err(AppError::BadRequest(
                "You are not following this user".to_string(),
            ));
        }

        self.user_repo.decrement_following_count(follower_id).await?;
        self.user_repo.decrement_followers_count(&followee.id).await?;

        info!(follower_id, followee_id = %followee.id, "Unfollowed user");
        Ok(())
    }

    /// Whether `follower_id` follows `followee_id`.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        self.following_repo
            .is_following(follower_id, followee_id)
            .await
    }

    /// Users following `username`, most recent follow first.
    pub async fn followers(
        &self,
        username: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<user::Model>> {
        let target = self.user_repo.get_by_username(username).await?;
        let rows = self
            .following_repo
            .find_followers(&target.id, limit, until_id)
            .await?;
        let ids: Vec<String> = rows.into_iter().map(|f| f.follower_id).collect();
        self.users_in_order(&ids).await
    }

    /// Users `username` follows, most recent follow first.
    pub async fn following(
        &self,
        username: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<user::Model>> {
        let target = self.user_repo.get_by_username(username).await?;
        let rows = self
            .following_repo
            .find_following(&target.id, limit, until_id)
            .await?;
        let ids: Vec<String> = rows.into_iter().map(|f| f.followee_id).collect();
        self.users_in_order(&ids).await
    }

    async fn users_in_order(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut by_id: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
