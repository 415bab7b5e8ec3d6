//! Data models
//!
//! Database entities (Category, Location, Post, Comment, User, Session), the
//! annotated read models produced by listing queries, and input types.

mod category;
mod comment;
mod location;
mod post;
mod session;
mod traits;
mod user;

/// Characters kept when an entity title is shown in compact form
pub const DISPLAY_TITLE_LEN: usize = 20;

/// Upper bound for titles and names
pub const MAX_TITLE_LEN: usize = 256;

pub use category::{Category, CategorySummary};
pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use location::{Location, LocationSummary};
pub use post::{
    CreatePostInput, ImageChange, ListParams, PagedResult, Post, PostWithMeta, UpdatePostInput,
    POSTS_PER_PAGE,
};
pub use session::Session;
pub use traits::{truncate_chars, Owned, Published};
pub use user::{AuthorSummary, UpdateProfileInput, User};
