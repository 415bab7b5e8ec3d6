//! Request context middleware
//!
//! Contains:
//! - Application state shared by all handlers
//! - Session cookie handling and the per-request `Viewer`
//! - The `AuthenticatedUser` extractor for login-only views
//! - Error page rendering

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::api::error::{ErrorPage, ViewError};
use crate::config::{SessionConfig, SiteConfig};
use crate::models::User;
use crate::services::{
    CategoryService, CommentService, ImageStore, LocationService, PostService, UserService,
};
use crate::theme::{CurrentUser, StandardTemplateVars, ThemeEngine};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_service: Arc<CategoryService>,
    pub location_service: Arc<LocationService>,
    pub theme_engine: Arc<ThemeEngine>,
    pub image_store: Arc<ImageStore>,
    pub site: Arc<SiteConfig>,
    pub session: Arc<SessionConfig>,
}

/// Who is making the request, and where to
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<User>,
    /// Path and query of the request
    pub path: String,
}

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Standard template variables for a page shown to this viewer
    pub fn template_vars(&self, site: &SiteConfig) -> StandardTemplateVars {
        let vars = StandardTemplateVars::new(&site.name, &site.description, &self.path);
        match self.user {
            Some(ref user) => vars.with_user(CurrentUser::from(user)),
            None => vars,
        }
    }

    /// Reject anonymous viewers with a redirect to the login page
    pub fn require_user(&self) -> Result<&User, ViewError> {
        self.user.as_ref().ok_or_else(|| ViewError::Unauthenticated {
            next: self.path.clone(),
        })
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(viewer_from_parts(parts))
    }
}

/// Logged-in user; anonymous requests are redirected to the login page
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ViewError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        viewer_from_parts(parts)
            .require_user()
            .cloned()
            .map(AuthenticatedUser)
    }
}

/// The viewer stored by [`load_viewer`], or an anonymous one
fn viewer_from_parts(parts: &Parts) -> Viewer {
    parts
        .extensions
        .get::<Viewer>()
        .cloned()
        .unwrap_or_else(|| Viewer {
            user: None,
            path: path_and_query(&parts.uri),
        })
}

fn path_and_query(uri: &axum::http::Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Extract session token from the cookie header
pub fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Resolve the session cookie into a `Viewer` for every request.
///
/// Lookup failures are logged and treated as anonymous access.
pub async fn load_viewer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let mut user = None;
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(found) => user = found,
            Err(e) => tracing::error!("Session validation failed: {}", e),
        }
    }

    let path = path_and_query(request.uri());
    request.extensions_mut().insert(Viewer { user, path });

    next.run(request).await
}

/// Render error pages for responses marked with [`ErrorPage`]
pub async fn render_error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let viewer = request.extensions().get::<Viewer>().cloned().unwrap_or_default();

    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    let status = response.status();
    let html = state.theme_engine.render_with_fallback(
        page.template,
        &TeraContext::new(),
        &viewer.template_vars(&state.site),
        page.title,
    );

    let mut rendered = (status, Html(html)).into_response();
    rendered.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    rendered
}
