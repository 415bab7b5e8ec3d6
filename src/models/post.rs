//! Post model
//!
//! This module provides:
//! - `Post`, the stored entity
//! - `PostWithMeta`, a post annotated with its author, category, location and
//!   comment count as produced by the listing queries
//! - Input types for creating and updating posts
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::CategorySummary;
use super::location::LocationSummary;
use super::traits::{truncate_chars, Owned, Published};
use super::user::AuthorSummary;

/// Posts shown per listing page
pub const POSTS_PER_PAGE: u32 = 10;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Publication moment; a future value schedules the post
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    /// Path of the image relative to the media root
    pub image: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Publicly visible at `now` given the publication flag of its category.
    ///
    /// A post without a category (`None`) is never publicly visible.
    pub fn is_visible_at(&self, category_published: Option<bool>, now: DateTime<Utc>) -> bool {
        self.is_released_at(now) && category_published == Some(true)
    }

    /// Already published and past its publication date, ignoring the category
    pub fn is_released_at(&self, now: DateTime<Utc>) -> bool {
        Published::is_published(self) && self.pub_date <= now
    }
}

impl Published for Post {
    fn is_published(&self) -> bool {
        self.is_published
    }
}

impl Owned for Post {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(truncate_chars(&self.title, super::DISPLAY_TITLE_LEN))
    }
}

/// Post with eagerly loaded relations and its comment count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorSummary,
    pub category: Option<CategorySummary>,
    pub location: Option<LocationSummary>,
    pub comment_count: i64,
}

impl PostWithMeta {
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.post
            .is_visible_at(self.category.as_ref().map(|c| c.is_published), now)
    }
}

impl Owned for PostWithMeta {
    fn author_id(&self) -> i64 {
        self.post.author_id
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub image: Option<String>,
    pub is_published: bool,
}

impl CreatePostInput {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        pub_date: DateTime<Utc>,
        author_id: i64,
        category_id: i64,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            pub_date,
            author_id,
            category_id,
            location_id: None,
            image: None,
            is_published: true,
        }
    }

    pub fn with_location(mut self, location_id: i64) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }
}

/// What to do with the stored image on update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ImageChange {
    #[default]
    Keep,
    Clear,
    Replace(String),
}

/// Input for updating a post. The form always submits every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub is_published: bool,
    pub image: ImageChange,
}

impl UpdatePostInput {
    /// Apply the update to a stored post
    pub fn apply(self, post: &mut Post) {
        post.title = self.title;
        post.text = self.text;
        post.pub_date = self.pub_date;
        post.category_id = Some(self.category_id);
        post.location_id = self.location_id;
        post.is_published = self.is_published;
        match self.image {
            ImageChange::Keep => {}
            ImageChange::Clear => post.image = None,
            ImageChange::Replace(path) => post.image = Some(path),
        }
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: POSTS_PER_PAGE,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Listing page `page` with the default page size
    pub fn page(page: u32) -> Self {
        Self::new(page, POSTS_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = self.per_page as i64;
        ((self.total + per_page - 1) / per_page) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pages past the first must contain items; page 1 may be empty.
    pub fn is_out_of_range(&self) -> bool {
        self.page > 1 && self.items.is_empty()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: POSTS_PER_PAGE,
        }
    }
}
