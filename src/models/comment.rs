//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::traits::Owned;
use super::user::AuthorSummary;

/// Comment entity. Listed oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    /// Nullable in storage; comments are always created against a post
    pub post_id: Option<i64>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn belongs_to(&self, post_id: i64) -> bool {
        self.post_id == Some(post_id)
    }
}

impl Owned for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

/// Comment with its author loaded, for display under a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: AuthorSummary,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}
