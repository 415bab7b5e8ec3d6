//! User service
//!
//! Accounts and authentication:
//! - registration with username and password rules
//! - login and logout backed by cookie sessions
//! - session validation with lazy removal of expired sessions
//! - profile self-service (username, names, email)

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, UpdateProfileInput, User};
use crate::services::password::{hash_password, validate_password, verify_password};
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Upper bound for usernames and personal names
pub const MAX_NAME_LEN: usize = 150;

const MAX_EMAIL_LEN: usize = 254;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// A submitted field is invalid
    #[error("Validation error on {field}: {message}")]
    ValidationError { field: &'static str, message: String },

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl UserServiceError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field,
            message: message.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a malformed username, mismatched confirmation
    ///   or a weak password
    /// - `UserExists` if the username is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        validate_username(&username)?;
        validate_email(&input.email)?;

        if input.password != input.password_confirm {
            return Err(UserServiceError::invalid(
                "password_confirm",
                "The two password fields didn't match.",
            ));
        }
        validate_password(&input.password, &username)
            .map_err(|message| UserServiceError::invalid("password", message))?;

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(username));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(username, input.email.trim().to_string(), password_hash);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!("Registered user {} ({})", created.username, created.id);
        Ok(created)
    }

    /// Check credentials and open a session.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError(
                "Please enter a correct username and password.".to_string(),
            )
        };

        let user = self
            .user_repo
            .get_by_username(input.username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!("Rejected password for {}", user.username);
            return Err(invalid());
        }

        let session = Session::start(user.id, self.session_expiration_days);
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok((session, user))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for unknown or expired sessions; an expired session is
    /// deleted on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;

        Ok(user)
    }

    /// Update the profile of `user_id`.
    ///
    /// The caller passes the id of the session user; there is no way to
    /// target anyone else.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user by ID")?
            .ok_or(UserServiceError::NotFound)?;

        let username = input.username.trim().to_string();
        validate_username(&username)?;
        validate_email(&input.email)?;
        for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
            if value.chars().count() > MAX_NAME_LEN {
                return Err(UserServiceError::invalid(
                    field,
                    format!("Ensure this value has at most {} characters.", MAX_NAME_LEN),
                ));
            }
        }

        if username != user.username {
            let taken = self
                .user_repo
                .get_by_username(&username)
                .await
                .context("Failed to check username")?;
            if taken.is_some_and(|other| other.id != user.id) {
                return Err(UserServiceError::UserExists(username));
            }
        }

        user.username = username;
        user.first_name = input.first_name.trim().to_string();
        user.last_name = input.last_name.trim().to_string();
        user.email = input.email.trim().to_string();

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;

        tracing::info!("User {} updated their profile", updated.id);
        Ok(updated)
    }

    /// Delete all expired sessions. Returns the number removed.
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired(Utc::now())
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    if username.is_empty() {
        return Err(UserServiceError::invalid("username", "This field is required."));
    }
    if username.chars().count() > MAX_NAME_LEN {
        return Err(UserServiceError::invalid(
            "username",
            format!("Ensure this value has at most {} characters.", MAX_NAME_LEN),
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(UserServiceError::invalid(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }
    if email.chars().count() > MAX_EMAIL_LEN || !email.contains('@') {
        return Err(UserServiceError::invalid("email", "Enter a valid email address."));
    }
    Ok(())
}

/// Input for user registration
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterInput {
    /// Registration with a matching confirmation
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            email: email.into(),
            password_confirm: password.clone(),
            password,
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
