//! Post mutations
//!
//! - GET|POST /posts/create/
//! - GET|POST /posts/{post_id}/edit/
//! - GET|POST /posts/{post_id}/delete/
//!
//! All of them require a login. Edit and delete are reserved to the author;
//! anyone else is sent back to the post page. Forms are submitted as
//! `multipart/form-data` so that an image can be attached.

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Serialize;
use tera::Context as TeraContext;

use crate::api::access::{post_url, profile_url, require_owner};
use crate::api::error::ViewError;
use crate::api::forms::{
    checkbox, format_pub_date, parse_id, parse_optional_id, parse_pub_date, FormErrors,
};
use crate::api::middleware::{AppState, AuthenticatedUser, Viewer};
use crate::api::render::render_page;
use crate::models::{CreatePostInput, ImageChange, Post, UpdatePostInput, User};
use crate::services::PostServiceError;

/// Raw values of the post form, echoed back on validation errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostFormValues {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub category: String,
    pub location: String,
    pub is_published: bool,
}

impl PostFormValues {
    fn blank() -> Self {
        Self {
            pub_date: format_pub_date(Utc::now()),
            is_published: true,
            ..Self::default()
        }
    }

    fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: format_pub_date(post.pub_date),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            is_published: post.is_published,
        }
    }
}

struct UploadedImage {
    content_type: String,
    data: Bytes,
}

/// Everything submitted with the post form
struct PostSubmission {
    values: PostFormValues,
    image: Option<UploadedImage>,
    clear_image: bool,
}

/// Outer error aborts the request; inner error re-renders the form
type FormResult<T> = Result<Result<T, FormErrors>, ViewError>;

/// Form fields after parsing
struct CleanedPost {
    title: String,
    text: String,
    pub_date: chrono::DateTime<Utc>,
    category_id: i64,
    location_id: Option<i64>,
    is_published: bool,
}

async fn read_submission(mut multipart: Multipart) -> Result<PostSubmission, ViewError> {
    let mut values = PostFormValues::default();
    let mut is_published = None;
    let mut image = None;
    let mut clear_image = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ViewError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "image" {
            let has_file = field.file_name().is_some_and(|f| !f.is_empty());
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ViewError::BadRequest(format!("Failed to read file: {}", e)))?;
            // Browsers send an empty part when no file was chosen
            if has_file && !data.is_empty() {
                image = Some(UploadedImage { content_type, data });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ViewError::BadRequest(format!("Failed to read field: {}", e)))?;
        match name.as_str() {
            "title" => values.title = value,
            "text" => values.text = value,
            "pub_date" => values.pub_date = value,
            "category" => values.category = value,
            "location" => values.location = value,
            "is_published" => is_published = Some(value),
            "image-clear" => clear_image = checkbox(Some(&value)),
            _ => {}
        }
    }
    values.is_published = checkbox(is_published.as_deref());

    Ok(PostSubmission {
        values,
        image,
        clear_image,
    })
}

impl PostSubmission {
    /// Parse the fields and check the attachment. Title, text and the
    /// existence of the category and location are checked by the service.
    fn clean(&self, state: &AppState) -> Result<CleanedPost, FormErrors> {
        let mut errors = FormErrors::new();

        let pub_date = parse_pub_date(&self.values.pub_date)
            .map_err(|message| errors.add("pub_date", message))
            .ok();

        let category_id = match parse_optional_id(&self.values.category) {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                errors.add("category", "This field is required.");
                None
            }
            Err(message) => {
                errors.add("category", message);
                None
            }
        };

        let location_id = parse_optional_id(&self.values.location)
            .map_err(|message| errors.add("location", message))
            .ok()
            .flatten();

        if let Some(ref image) = self.image {
            if let Err(e) = state.image_store.check(&image.content_type, image.data.len()) {
                errors.add("image", e.to_string());
            }
        }

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) if errors.is_empty() => Ok(CleanedPost {
                title: self.values.title.trim().to_string(),
                text: self.values.text.clone(),
                pub_date,
                category_id,
                location_id,
                is_published: self.values.is_published,
            }),
            _ => Err(errors),
        }
    }
}

async fn render_post_form(
    state: &AppState,
    viewer: &Viewer,
    mode: &str,
    action: &str,
    form: &PostFormValues,
    errors: &FormErrors,
    post: Option<&Post>,
) -> Result<Html<String>, ViewError> {
    let categories = state.category_service.list().await?;
    let locations = state.location_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("mode", mode);
    context.insert("action", action);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("categories", &categories);
    context.insert("locations", &locations);
    if let Some(post) = post {
        context.insert("post", post);
    }
    render_page(state, viewer, "blog/create.html", &context)
}

/// Save the uploaded image, reporting storage problems on the form
async fn store_image(state: &AppState, image: &UploadedImage) -> Result<String, FormErrors> {
    state
        .image_store
        .save(&image.content_type, &image.data)
        .await
        .map_err(|e| {
            tracing::warn!("Image upload rejected: {}", e);
            FormErrors::single("image", e.to_string())
        })
}

/// Service validation errors become form errors; everything else propagates
fn form_errors(e: PostServiceError) -> Result<FormErrors, ViewError> {
    match e {
        PostServiceError::ValidationError { field, message } => {
            Ok(FormErrors::single(field, message))
        }
        other => Err(other.into()),
    }
}

/// Load a post for a mutation by `user`: 404 if missing, soft denial for
/// anyone but the author.
async fn owned_post(state: &AppState, user: &User, post_id: &str) -> Result<Post, ViewError> {
    let post_id = parse_id(post_id)?;
    let post = state.post_service.get_by_id(post_id).await?;
    require_owner(&post, user, post_url(post.id))?;
    Ok(post)
}

/// GET /posts/create/
pub async fn create_post_form(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Result<Html<String>, ViewError> {
    render_post_form(
        &state,
        &viewer,
        "create",
        "/posts/create/",
        &PostFormValues::blank(),
        &FormErrors::new(),
        None,
    )
    .await
}

/// POST /posts/create/
pub async fn create_post(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    multipart: Multipart,
) -> Result<Response, ViewError> {
    let submission = read_submission(multipart).await?;

    match save_new_post(&state, &user, &submission).await? {
        Ok(()) => Ok(Redirect::to(&profile_url(&user.username)).into_response()),
        Err(errors) => render_post_form(
            &state,
            &viewer,
            "create",
            "/posts/create/",
            &submission.values,
            &errors,
            None,
        )
        .await
        .map(IntoResponse::into_response),
    }
}

async fn save_new_post(
    state: &AppState,
    user: &User,
    submission: &PostSubmission,
) -> FormResult<()> {
    let cleaned = match submission.clean(state) {
        Ok(cleaned) => cleaned,
        Err(errors) => return Ok(Err(errors)),
    };

    let image = match submission.image {
        Some(ref image) => match store_image(state, image).await {
            Ok(path) => Some(path),
            Err(errors) => return Ok(Err(errors)),
        },
        None => None,
    };

    let input = CreatePostInput {
        title: cleaned.title,
        text: cleaned.text,
        pub_date: cleaned.pub_date,
        author_id: user.id,
        category_id: cleaned.category_id,
        location_id: cleaned.location_id,
        image: image.clone(),
        is_published: cleaned.is_published,
    };

    match state.post_service.create(input).await {
        Ok(_) => Ok(Ok(())),
        Err(e) => {
            if let Some(ref path) = image {
                state.image_store.remove(path).await;
            }
            form_errors(e).map(Err)
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn edit_post_form(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<String>,
) -> Result<Html<String>, ViewError> {
    let post = owned_post(&state, &user, &post_id).await?;
    render_post_form(
        &state,
        &viewer,
        "edit",
        &format!("/posts/{}/edit/", post.id),
        &PostFormValues::from_post(&post),
        &FormErrors::new(),
        Some(&post),
    )
    .await
}

/// POST /posts/{post_id}/edit/
pub async fn edit_post(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ViewError> {
    let post = owned_post(&state, &user, &post_id).await?;
    let submission = read_submission(multipart).await?;

    match save_post_changes(&state, post.clone(), &submission).await? {
        Ok(()) => Ok(Redirect::to(&profile_url(&user.username)).into_response()),
        Err(errors) => render_post_form(
            &state,
            &viewer,
            "edit",
            &format!("/posts/{}/edit/", post.id),
            &submission.values,
            &errors,
            Some(&post),
        )
        .await
        .map(IntoResponse::into_response),
    }
}

async fn save_post_changes(
    state: &AppState,
    post: Post,
    submission: &PostSubmission,
) -> FormResult<()> {
    let cleaned = match submission.clean(state) {
        Ok(cleaned) => cleaned,
        Err(errors) => return Ok(Err(errors)),
    };

    let image = match submission.image {
        Some(ref image) => match store_image(state, image).await {
            Ok(path) => ImageChange::Replace(path),
            Err(errors) => return Ok(Err(errors)),
        },
        None if submission.clear_image => ImageChange::Clear,
        None => ImageChange::Keep,
    };
    let new_image = match image {
        ImageChange::Replace(ref path) => Some(path.clone()),
        _ => None,
    };

    let input = UpdatePostInput {
        title: cleaned.title,
        text: cleaned.text,
        pub_date: cleaned.pub_date,
        category_id: cleaned.category_id,
        location_id: cleaned.location_id,
        is_published: cleaned.is_published,
        image,
    };

    match state.post_service.update(post, input).await {
        Ok((_, old_image)) => {
            if let Some(old) = old_image {
                state.image_store.remove(&old).await;
            }
            Ok(Ok(()))
        }
        Err(e) => {
            if let Some(ref path) = new_image {
                state.image_store.remove(path).await;
            }
            form_errors(e).map(Err)
        }
    }
}

/// GET /posts/{post_id}/delete/ - confirmation page
pub async fn delete_post_form(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<String>,
) -> Result<Html<String>, ViewError> {
    let post = owned_post(&state, &user, &post_id).await?;
    render_post_form(
        &state,
        &viewer,
        "delete",
        &format!("/posts/{}/delete/", post.id),
        &PostFormValues::from_post(&post),
        &FormErrors::new(),
        Some(&post),
    )
    .await
}

/// POST /posts/{post_id}/delete/
pub async fn delete_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<String>,
) -> Result<Redirect, ViewError> {
    let post = owned_post(&state, &user, &post_id).await?;
    state.post_service.delete(post.id).await?;
    if let Some(ref image) = post.image {
        state.image_store.remove(image).await;
    }
    Ok(Redirect::to(&profile_url(&user.username)))
}
