//! HTTP layer - views and routing
//!
//! Server-rendered pages of the blog:
//! - Listings (index, category, profile) and the post page
//! - Post and comment mutations
//! - Profile self-service
//! - Login, logout and registration
//! - Uploaded media under `/media/`

pub mod access;
pub mod auth;
pub mod comments;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod posts;
pub mod profile;
pub mod render;
pub mod views;


use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

pub use error::ViewError;
pub use middleware::{AppState, AuthenticatedUser, Viewer};

/// Room for the non-file fields of a multipart post form
const FORM_OVERHEAD: usize = 64 * 1024;

/// Routes of the blog pages
pub fn build_page_router() -> Router<AppState> {
    Router::new()
        .route("/", get(views::index))
        .route("/category/{category_slug}/", get(views::category_posts))
        .route("/profile/{username}/", get(views::profile))
        .route("/edit_profile/", get(profile::edit_profile_form).post(profile::edit_profile))
        // Posts
        .route("/posts/create/", get(posts::create_post_form).post(posts::create_post))
        .route("/posts/{post_id}/", get(views::post_detail))
        .route("/posts/{post_id}/edit/", get(posts::edit_post_form).post(posts::edit_post))
        .route(
            "/posts/{post_id}/delete/",
            get(posts::delete_post_form).post(posts::delete_post),
        )
        // Comments
        .route("/posts/{post_id}/comment/", post(comments::add_comment))
        .route(
            "/posts/{post_id}/edit_comment/{comment_id}/",
            get(comments::edit_comment_form).post(comments::edit_comment),
        )
        .route(
            "/posts/{post_id}/delete_comment/{comment_id}/",
            get(comments::delete_comment_form).post(comments::delete_comment),
        )
        // Auth
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", post(auth::logout))
        .route(
            "/auth/registration/",
            get(auth::registration_form).post(auth::registration),
        )
}

async fn not_found() -> ViewError {
    ViewError::NotFound
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let media =
        ServeDir::new(state.image_store.media_root()).not_found_service(not_found.into_service());
    let body_limit = usize::try_from(state.image_store.max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    Router::new()
        .merge(build_page_router())
        .nest_service("/media", media)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        // Error pages need the viewer, so the viewer is loaded first
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::load_viewer,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
