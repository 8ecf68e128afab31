//! Registration, login and token authentication

use super::{internal, Service};
use crate::contract::{AuthToken, NewUser, SchoolError, User, UserOverview};
use crate::domain::credentials::{generate_token_key, hash_password, verify_password};
use crate::domain::events::SchoolEvent;
use crate::domain::validation::{
    validate_email, validate_password, validate_text, validate_username, NAME_MAX_LEN,
};

const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials";

impl Service {
    // ===== Public endpoints =====

    /// Self-service sign-up; returns the new user and a fresh token
    pub async fn register(&self, input: NewUser) -> Result<(User, AuthToken), SchoolError> {
        // staff accounts are only created by staff or the CLI
        let user = self
            .create_account(NewUser {
                is_staff: false,
                ..input
            })
            .await?;
        let token = self.issue_token(user.id).await?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok((user, token))
    }

    /// Exchange credentials for a token; an expired token is replaced
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken, SchoolError> {
        let user = self
            .repos
            .users
            .find_by_username(username)
            .await
            .map_err(internal)?
            .filter(|user| user.is_active)
            .ok_or_else(|| SchoolError::validation(BAD_CREDENTIALS))?;

        let stored = self
            .repos
            .users
            .password_hash(user.id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::validation(BAD_CREDENTIALS))?;

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| internal(e.into()))?;
        if !matches {
            tracing::warn!(username, "login rejected: wrong password");
            return Err(SchoolError::validation(BAD_CREDENTIALS));
        }

        let existing = self
            .repos
            .tokens
            .find_by_user(user.id)
            .await
            .map_err(internal)?;
        match existing {
            Some(token) if !token.is_expired(self.now(), self.config.token_ttl()) => Ok(token),
            Some(expired) => {
                self.repos
                    .tokens
                    .delete(&expired.key)
                    .await
                    .map_err(internal)?;
                tracing::info!(user_id = user.id, "expired token replaced on login");
                self.issue_token(user.id).await
            }
            None => self.issue_token(user.id).await,
        }
    }

    /// Delete the caller's token
    pub async fn logout(&self, actor: &User) -> Result<(), SchoolError> {
        let token = self
            .repos
            .tokens
            .find_by_user(actor.id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::validation("Token not found"))?;
        self.repos
            .tokens
            .delete(&token.key)
            .await
            .map_err(internal)?;
        tracing::info!(user_id = actor.id, "user logged out");
        Ok(())
    }

    /// Resolve a token key to an active user; expired tokens are deleted
    pub async fn authenticate(&self, key: &str) -> Result<User, SchoolError> {
        let token = self
            .repos
            .tokens
            .find(key)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::unauthenticated("Invalid token"))?;

        if token.is_expired(self.now(), self.config.token_ttl()) {
            self.repos.tokens.delete(key).await.map_err(internal)?;
            tracing::info!(user_id = token.user_id, "expired token deleted");
            return Err(SchoolError::unauthenticated("Token has expired"));
        }

        let user = self
            .repos
            .users
            .find_by_id(token.user_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::unauthenticated("Invalid token"))?;
        if !user.is_active {
            return Err(SchoolError::unauthenticated("User inactive or deleted"));
        }
        Ok(user)
    }

    /// The caller together with their profile
    pub async fn me(&self, actor: &User) -> Result<UserOverview, SchoolError> {
        let profile = self
            .repos
            .profiles
            .find_by_user(actor.id)
            .await
            .map_err(internal)?;
        if profile.is_none() {
            tracing::warn!(user_id = actor.id, "user has no profile");
        }
        Ok(UserOverview {
            user: actor.clone(),
            profile,
        })
    }

    // ===== Account plumbing =====

    async fn issue_token(&self, user_id: i64) -> Result<AuthToken, SchoolError> {
        let token = AuthToken {
            key: generate_token_key(),
            user_id,
            created: self.now(),
        };
        self.repos.tokens.create(&token).await.map_err(internal)
    }

    /// Validate and store a user together with their profile
    pub(super) async fn create_account(&self, input: NewUser) -> Result<User, SchoolError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;
        validate_text("first_name", &input.first_name, NAME_MAX_LEN)?;
        validate_text("last_name", &input.last_name, NAME_MAX_LEN)?;

        if self
            .repos
            .users
            .find_by_username(&input.username)
            .await
            .map_err(internal)?
            .is_some()
        {
            return Err(SchoolError::validation(
                "A user with that username already exists",
            ));
        }
        if let Some(school_id) = input.school_id {
            self.referenced_school(school_id).await?;
        }

        let password = input.password;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| internal(e.into()))?
            .map_err(internal)?;

        let user = User {
            id: 0,
            username: input.username,
            email: input.email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            role: input.role,
            school_id: input.school_id,
            is_staff: input.is_staff,
            is_active: true,
            date_joined: self.now(),
        };
        let (user, _profile) = self
            .repos
            .users
            .create(&user, &hash)
            .await
            .map_err(internal)?;

        self.emit(SchoolEvent::UserCreated { user_id: user.id }).await;
        Ok(user)
    }
}
