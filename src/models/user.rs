//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registered account. Authors own posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Unique login name, also used in profile URLs
    pub username: String,
    /// May be empty
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Note: the password must already be hashed, see `services::password`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: 0,
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            date_joined: Utc::now(),
        }
    }

    /// "First Last", or the username when both names are blank
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// Author columns carried along with posts and comments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UpdateProfileInput {
    /// Prefill from the stored user
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_full_name() {
        let mut user = User::new("anna".into(), String::new(), "hash".into());
        assert_eq!(user.display_name(), "anna");

        user.first_name = "Anna".into();
        assert_eq!(user.display_name(), "Anna");

        user.last_name = "Karenina".into();
        assert_eq!(user.display_name(), "Anna Karenina");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("anna".into(), "a@example.com".into(), "secret-hash".into());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"username\":\"anna\""));
    }
}
