//! Comment mutations
//!
//! - POST /posts/{post_id}/comment/
//! - GET|POST /posts/{post_id}/edit_comment/{comment_id}/
//! - GET|POST /posts/{post_id}/delete_comment/{comment_id}/
//!
//! Every action ends on the post page; a blank new comment re-renders it with
//! the field error. Editing and deleting are reserved to the comment's author;
//! others are redirected there without any change.

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::access::{post_url, require_owner};
use crate::api::error::ViewError;
use crate::api::forms::{parse_id, FormErrors};
use crate::api::middleware::{AppState, AuthenticatedUser, Viewer};
use crate::api::render::render_page;
use crate::api::views::render_post_detail;
use crate::models::{Comment, CreateCommentInput, User};
use crate::services::CommentServiceError;

/// Comment form body
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// Resolve the route pair for a mutation by `user`: 404 unless the comment
/// exists under that post, soft denial for anyone but the author.
async fn owned_comment(
    state: &AppState,
    user: &User,
    post_id: &str,
    comment_id: &str,
) -> Result<Comment, ViewError> {
    let post_id = parse_id(post_id)?;
    let comment_id = parse_id(comment_id)?;
    let comment = state
        .comment_service
        .get_for_post(post_id, comment_id)
        .await?;
    require_owner(&comment, user, post_url(post_id))?;
    Ok(comment)
}

fn render_comment_form(
    state: &AppState,
    viewer: &Viewer,
    mode: &str,
    comment: &Comment,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Html<String>, ViewError> {
    let mut context = TeraContext::new();
    context.insert("mode", mode);
    context.insert("comment", comment);
    context.insert("post_id", &comment.post_id);
    context.insert("form", form);
    context.insert("errors", errors);
    render_page(state, viewer, "blog/comment.html", &context)
}

/// POST /posts/{post_id}/comment/
///
/// A rejected comment re-renders the post page with the submitted text and
/// the error under the form.
pub async fn add_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response, ViewError> {
    let post_id = parse_id(&post_id)?;
    let input = CreateCommentInput {
        post_id,
        author_id: user.id,
        text: form.text.clone(),
    };

    match state.comment_service.create(input).await {
        Ok(comment) => {
            tracing::info!("Comment {} added to post {}", comment.id, post_id);
            Ok(Redirect::to(&post_url(post_id)).into_response())
        }
        Err(CommentServiceError::ValidationError(message)) => {
            let errors = FormErrors::single("text", message);
            render_post_detail(&state, &viewer, post_id, &form.text, &errors)
                .await
                .map(IntoResponse::into_response)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_comment_form(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Html<String>, ViewError> {
    let comment = owned_comment(&state, &user, &post_id, &comment_id).await?;
    let form = CommentForm {
        text: comment.text.clone(),
    };
    render_comment_form(&state, &viewer, "edit", &comment, &form, &FormErrors::new())
}

/// POST /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, ViewError> {
    let comment = owned_comment(&state, &user, &post_id, &comment_id).await?;
    let post_id = comment.post_id;

    match state.comment_service.update_text(comment.clone(), &form.text).await {
        Ok(updated) => {
            tracing::info!("Comment {} updated", updated.id);
            let target = post_id.map(post_url).unwrap_or_else(|| "/".to_string());
            Ok(Redirect::to(&target).into_response())
        }
        Err(CommentServiceError::ValidationError(message)) => {
            let errors = FormErrors::single("text", message);
            render_comment_form(&state, &viewer, "edit", &comment, &form, &errors)
                .map(IntoResponse::into_response)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{post_id}/delete_comment/{comment_id}/ - confirmation page
pub async fn delete_comment_form(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Html<String>, ViewError> {
    let comment = owned_comment(&state, &user, &post_id, &comment_id).await?;
    let form = CommentForm {
        text: comment.text.clone(),
    };
    render_comment_form(&state, &viewer, "delete", &comment, &form, &FormErrors::new())
}

/// POST /posts/{post_id}/delete_comment/{comment_id}/
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Redirect, ViewError> {
    let comment = owned_comment(&state, &user, &post_id, &comment_id).await?;
    state.comment_service.delete(comment.id).await?;
    tracing::info!("Comment {} deleted by user {}", comment.id, user.id);

    let target = comment.post_id.map(post_url).unwrap_or_else(|| "/".to_string());
    Ok(Redirect::to(&target))
}
