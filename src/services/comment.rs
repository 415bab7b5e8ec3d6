//! Comment service

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Route post does not exist
    #[error("Post not found: {0}")]
    PostNotFound(i64),

    /// Comment does not exist or belongs to another post
    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self { repo, post_repo }
    }

    /// Comments under a post, oldest first
    pub async fn list_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        Ok(self
            .repo
            .list_for_post(post_id)
            .await
            .context("Failed to list comments")?)
    }

    /// Add a comment to an existing post
    pub async fn create(&self, input: CreateCommentInput) -> Result<Comment, CommentServiceError> {
        self.post_repo
            .get_by_id(input.post_id)
            .await
            .context("Failed to get post")?
            .ok_or(CommentServiceError::PostNotFound(input.post_id))?;

        let text = validate_text(&input.text)?;
        let comment = self
            .repo
            .create(&CreateCommentInput { text, ..input })
            .await
            .context("Failed to create comment")?;

        tracing::info!(
            "User {} commented on post {:?}",
            comment.author_id,
            comment.post_id
        );
        Ok(comment)
    }

    /// The comment `comment_id` if it exists under post `post_id`
    pub async fn get_for_post(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .filter(|c| c.belongs_to(post_id))
            .ok_or(CommentServiceError::NotFound(comment_id))
    }

    pub async fn update_text(
        &self,
        mut comment: Comment,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        let text = validate_text(text)?;
        self.repo
            .update_text(comment.id, &text)
            .await
            .context("Failed to update comment")?;
        comment.text = text;
        Ok(comment)
    }

    pub async fn delete(&self, comment_id: i64) -> Result<(), CommentServiceError> {
        let deleted = self
            .repo
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;
        if !deleted {
            return Err(CommentServiceError::NotFound(comment_id));
        }
        Ok(())
    }
}

fn validate_text(text: &str) -> Result<String, CommentServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CommentServiceError::ValidationError(
            "This field is required.".to_string(),
        ));
    }
    Ok(text.to_string())
}
