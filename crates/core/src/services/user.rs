//! User service: accounts, tokens and profiles.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use storyloom_common::{AppError, AppResult, IdGenerator};
use storyloom_db::{
    entities::user,
    repositories::{FollowingRepository, StoryRepository, UserRepository},
};
use sea_orm::Set;
use tracing::info;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    following_repo: FollowingRepository,
    story_repo: StoryRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(length(min = 1, max = 64))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(max = 128))]
    pub name: Option<String>,
}

/// Input for updating the caller's profile.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(max = 128))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,

    #[validate(length(max = 512))]
    pub avatar_url: Option<String>,
}

/// A user together with their current access token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: user::Model,
    pub token: String,
}

/// Public profile of a user as seen by a viewer.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: user::Model,
    pub stories_count: u64,
    /// `None` for anonymous viewers and for the user themselves.
    pub is_following: Option<bool>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        following_repo: FollowingRepository,
        story_repo: StoryRepository,
    ) -> Self {
        Self {
            user_repo,
            following_repo,
            story_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user and issue their first token.
    pub async fn signup(&self, input: SignupInput) -> AppResult<AuthSession> {
        input.validate()?;
        validate_username(&input.username)?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(input.email),
            token: Set(Some(token.clone())),
            password_hash: Set(password_hash),
            name: Set(input.name),
            bio: Set(None),
            avatar_url: Set(None),
            followers_count: Set(0),
            following_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(AuthSession { user, token })
    }

    /// Exchange credentials for a token.
    ///
    /// Returns the current token, issuing a new one if the user signed out.
    pub async fn signin(&self, username: &str, password: &str) -> AppResult<AuthSession> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        match user.token.clone() {
            Some(token) => Ok(AuthSession { user, token }),
            None => {
                let token = self.regenerate_token(&user.id).await?;
                let user = self.user_repo.get_by_id(&user.id).await?;
                Ok(AuthSession { user, token })
            }
        }
    }

    /// Revoke the user's token.
    pub async fn signout(&self, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;

        let mut active: user::ActiveModel = user.into();
        active.token = Set(None);
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await?;
        Ok(())
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Replace the user's token; the old one stops working.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await?;

        Ok(new_token)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_username(username).await
    }

    /// Profile of `username` as seen by `viewer_id`.
    pub async fn profile(&self, username: &str, viewer_id: Option<&str>) -> AppResult<Profile> {
        let user = self.user_repo.get_by_username(username).await?;
        self.profile_of(user, viewer_id).await
    }

    /// Profile of an already loaded user as seen by `viewer_id`.
    pub async fn profile_of(
        &self,
        user: user::Model,
        viewer_id: Option<&str>,
    ) -> AppResult<Profile> {
        let stories_count = self.story_repo.count_by_author(&user.id).await?;

        let is_following = match viewer_id {
            Some(viewer) if viewer != user.id => {
                Some(self.following_repo.is_following(viewer, &user.id).await?)
            }
            _ => None,
        };

        Ok(Profile {
            user,
            stories_count,
            is_following,
        })
    }

    /// Update the caller's profile. Absent fields are left unchanged.
    pub async fn update_profile(
        &self,
        id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(Some(name));
        }
        if let Some(bio) = input.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }

        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await
    }
}

/// Letters, digits and `@ . + - _` only.
fn validate_username(username: &str) -> AppResult<()> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        Ok(())
    } else {
        Err(AppError::Validation(
            "username: only letters, digits and @.+-_ are allowed".to_string(),
        ))
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str, password: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: format!("{username}@example.com"),
            token: Some("test_token".to_string()),
            password_hash: hash_password(password).unwrap(),
            name: None,
            bio: None,
            avatar_url: None,
            followers_count: 0,
            following_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> UserService {
        let db = Arc::new(db.into_connection());
        UserService::new(
            UserRepository::new(db.clone()),
            FollowingRepository::new(db.clone()),
            StoryRepository::new(db),
        )
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice_99").is_ok());
        assert!(validate_username("a.b+c@d-e").is_ok());
        assert!(validate_username("no spaces").is_err());
    }

    #[tokio::test]
    async fn test_signup_rejects_short_password() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .signup(SignupInput {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "short".to_string(),
                name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_signup_taken_username_conflicts() {
        let existing = create_test_user("u1", "Alice", "password123");
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = svc
            .signup(SignupInput {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "password123".to_string(),
                name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_signin_success_returns_existing_token() {
        let user = create_test_user("u1", "alice", "password123");
        let svc =
            service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let session = svc.signin("alice", "password123").await.unwrap();

        assert_eq!(session.token, "test_token");
        assert_eq!(session.user.id, "u1");
    }

    #[tokio::test]
    async fn test_signin_wrong_password_unauthorized() {
        let user = create_test_user("u1", "alice", "password123");
        let svc =
            service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let result = svc.signin("alice", "wrong-password").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_unknown() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = svc.authenticate_by_token("bogus").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_long_bio() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .update_profile(
                "u1",
                UpdateProfileInput {
                    bio: Some("x".repeat(501)),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
