//! Post service
//!
//! Listing pages compose the post queries here:
//! - index and category pages show only visible posts
//! - a profile shows every post to its owner and visible posts to others
//!
//! Create and update validate the submitted fields and check that the
//! referenced category and location exist.

use crate::db::query::{filter_visible, with_comment_stats, Annotated, PostQuery};
use crate::db::repositories::{CategoryRepository, LocationRepository, PostRepository};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostWithMeta, UpdatePostInput, MAX_TITLE_LEN,
};
use anyhow::Context;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(i64),

    /// A submitted field is invalid
    #[error("Validation error on {field}: {message}")]
    ValidationError { field: &'static str, message: String },

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl PostServiceError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field,
            message: message.into(),
        }
    }
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    location_repo: Arc<dyn LocationRepository>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        location_repo: Arc<dyn LocationRepository>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            location_repo,
        }
    }

    /// Visible posts across the site, newest first
    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        self.page(with_comment_stats(filter_visible(PostQuery::all())), params)
            .await
    }

    /// Visible posts in one category, newest first
    pub async fn list_by_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        self.page(
            with_comment_stats(filter_visible(PostQuery::in_category(category_id))),
            params,
        )
        .await
    }

    /// Posts of one author. Unpublished, scheduled and uncategorised posts
    /// are included only when the owner is looking.
    pub async fn list_by_author(
        &self,
        author_id: i64,
        viewer_is_owner: bool,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        let query = with_comment_stats(PostQuery::by_author(author_id));
        let query = if viewer_is_owner {
            query
        } else {
            filter_visible(query)
        };
        self.page(query, params).await
    }

    /// Every post filed under a category, whatever its state
    pub async fn posts_in_category(&self, category_id: i64) -> Result<Vec<Post>, PostServiceError> {
        Ok(self
            .repo
            .fetch(&PostQuery::in_category(category_id))
            .await
            .context("Failed to list category posts")?)
    }

    /// A single post with its relations and comment count, regardless of
    /// visibility. Callers decide whether the viewer may see it.
    pub async fn get_detail(&self, id: i64) -> Result<PostWithMeta, PostServiceError> {
        self.repo
            .find_annotated(&with_comment_stats(PostQuery::by_id(id)))
            .await
            .context("Failed to load post")?
            .ok_or(PostServiceError::NotFound(id))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post by ID")?
            .ok_or(PostServiceError::NotFound(id))
    }

    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostServiceError> {
        self.validate(&input.title, &input.text, input.category_id, input.location_id)
            .await?;

        let post = self
            .repo
            .create(&input)
            .await
            .context("Failed to create post")?;

        tracing::info!("User {} created post {}", post.author_id, post.id);
        Ok(post)
    }

    /// Apply an update to a stored post. Returns the new state and, when
    /// the image was replaced or cleared, the path of the old image.
    pub async fn update(
        &self,
        mut post: Post,
        input: UpdatePostInput,
    ) -> Result<(Post, Option<String>), PostServiceError> {
        self.validate(&input.title, &input.text, input.category_id, input.location_id)
            .await?;

        let old_image = post.image.clone();
        input.apply(&mut post);
        let replaced = old_image.filter(|old| post.image.as_deref() != Some(old.as_str()));

        let post = self
            .repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        tracing::info!("Post {} updated", post.id);
        Ok((post, replaced))
    }

    /// Delete a post together with its comments
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::NotFound(id));
        }
        tracing::info!("Post {} deleted", id);
        Ok(())
    }

    async fn page(
        &self,
        query: PostQuery<Annotated>,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        Ok(self
            .repo
            .fetch_annotated(&query, params)
            .await
            .context("Failed to list posts")?)
    }

    async fn validate(
        &self,
        title: &str,
        text: &str,
        category_id: i64,
        location_id: Option<i64>,
    ) -> Result<(), PostServiceError> {
        if title.trim().is_empty() {
            return Err(PostServiceError::invalid("title", "This field is required."));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(PostServiceError::invalid(
                "title",
                format!("Ensure this value has at most {} characters.", MAX_TITLE_LEN),
            ));
        }
        if text.trim().is_empty() {
            return Err(PostServiceError::invalid("text", "This field is required."));
        }

        let category = self
            .category_repo
            .get_by_id(category_id)
            .await
            .context("Failed to check category")?;
        if category.is_none() {
            return Err(PostServiceError::invalid(
                "category",
                "Select a valid choice. That choice is not one of the available choices.",
            ));
        }

        if let Some(location_id) = location_id {
            let location = self
                .location_repo
                .get_by_id(location_id)
                .await
                .context("Failed to check location")?;
            if location.is_none() {
                return Err(PostServiceError::invalid(
                    "location",
                    "Select a valid choice. That choice is not one of the available choices.",
                ));
            }
        }

        Ok(())
    }
}
