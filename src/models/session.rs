//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login session referenced by the `session` cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Random token stored in the cookie
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` lasting `days`
    pub fn start(user_id: i64, days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(days),
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_session_is_live() {
        let session = Session::start(3, 7);
        assert_eq!(session.user_id, 3);
        assert!(!session.is_expired());
        assert_eq!((session.expires_at - session.created_at).num_days(), 7);
    }

    #[test]
    fn test_session_in_the_past_is_expired() {
        let session = Session::start(3, -1);
        assert!(session.is_expired());
    }
}
