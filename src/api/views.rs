//! Read-only pages
//!
//! - GET / - visible posts, newest first
//! - GET /category/{category_slug}/ - visible posts of a published category
//! - GET /profile/{username}/ - a user's posts; others see only visible ones
//! - GET /posts/{post_id}/ - a post with its comments

use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use chrono::Utc;
use tera::Context as TeraContext;

use crate::api::access::can_view_post;
use crate::api::comments::CommentForm;
use crate::api::error::ViewError;
use crate::api::forms::{parse_id, FormErrors, PageQuery};
use crate::api::middleware::{AppState, Viewer};
use crate::api::render::{render_page, PageObj};
use crate::models::{PagedResult, PostWithMeta};

fn page_obj(page: PagedResult<PostWithMeta>) -> Result<PageObj<PostWithMeta>, ViewError> {
    if page.is_out_of_range() {
        return Err(ViewError::NotFound);
    }
    Ok(PageObj::from(page))
}

/// GET / - front page
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, ViewError> {
    let params = query.list_params()?;
    let page = state.post_service.list_published(&params).await?;

    let mut context = TeraContext::new();
    context.insert("page_obj", &page_obj(page)?);
    render_page(&state, &viewer, "blog/index.html", &context)
}

/// GET /category/{category_slug}/
pub async fn category_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(category_slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, ViewError> {
    let params = query.list_params()?;
    let category = state
        .category_service
        .get_published_by_slug(&category_slug)
        .await?;
    let page = state
        .post_service
        .list_by_category(category.id, &params)
        .await?;

    let mut context = TeraContext::new();
    context.insert("category", &category);
    context.insert("page_obj", &page_obj(page)?);
    render_page(&state, &viewer, "blog/category.html", &context)
}

/// GET /profile/{username}/
pub async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, ViewError> {
    let params = query.list_params()?;
    let profile = state
        .user_service
        .get_by_username(&username)
        .await?
        .ok_or(ViewError::NotFound)?;

    let is_owner = viewer.user_id() == Some(profile.id);
    let page = state
        .post_service
        .list_by_author(profile.id, is_owner, &params)
        .await?;

    let mut context = TeraContext::new();
    context.insert("profile", &profile);
    context.insert("is_owner", &is_owner);
    context.insert("page_obj", &page_obj(page)?);
    render_page(&state, &viewer, "blog/profile.html", &context)
}

/// GET /posts/{post_id}/
///
/// Unreleased posts answer 404 to everyone but their author.
pub async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
) -> Result<Html<String>, ViewError> {
    let post_id = parse_id(&post_id)?;
    render_post_detail(&state, &viewer, post_id, "", &FormErrors::new()).await
}

/// Detail page of a post with its comments and the comment form.
///
/// Also used to show a rejected new comment with its errors.
pub async fn render_post_detail(
    state: &AppState,
    viewer: &Viewer,
    post_id: i64,
    comment_text: &str,
    errors: &FormErrors,
) -> Result<Html<String>, ViewError> {
    let post = state.post_service.get_detail(post_id).await?;

    if !can_view_post(&post, viewer.user.as_ref(), Utc::now()) {
        tracing::debug!("Post {} is not visible to {:?}", post_id, viewer.user_id());
        return Err(ViewError::NotFound);
    }

    let comments = state.comment_service.list_for_post(post_id).await?;

    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("comments", &comments);
    context.insert("form", &CommentForm { text: comment_text.to_string() });
    context.insert("errors", errors);
    render_page(state, viewer, "blog/detail.html", &context)
}
