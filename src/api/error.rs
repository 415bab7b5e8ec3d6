//! View errors
//!
//! Handlers return `ViewError` for every failure that is not a form
//! re-render. Redirects are produced directly; error pages are marked with an
//! [`ErrorPage`] extension and rendered by [`render_error_pages`], which has
//! access to the template engine and the current viewer.
//!
//! [`render_error_pages`]: crate::api::middleware::render_error_pages

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::services::{
    CategoryServiceError, CommentServiceError, LocationServiceError, PostServiceError,
    UserServiceError,
};

/// Failure taxonomy of the HTML views
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// Missing route entity, or one the viewer may not see
    #[error("Not found")]
    NotFound,

    /// Login required; `next` is the path to come back to
    #[error("Authentication required")]
    Unauthenticated { next: String },

    /// Authorization failed; the viewer is sent to a safe read view
    #[error("Permission denied")]
    SoftDenied { redirect_to: String },

    /// Malformed request that no form can display
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marker telling the error-page middleware which template to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage {
    pub template: &'static str,
    pub title: &'static str,
}

impl ErrorPage {
    pub const NOT_FOUND: Self = Self {
        template: "pages/404.html",
        title: "Page not found",
    };
    pub const BAD_REQUEST: Self = Self {
        template: "pages/400.html",
        title: "Bad request",
    };
    pub const SERVER_ERROR: Self = Self {
        template: "pages/500.html",
        title: "Server error",
    };
}

/// Login URL carrying the page to return to
pub fn login_url(next: &str) -> String {
    format!("/auth/login/?next={}", urlencoding::encode(next))
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let (status, page) = match self {
            ViewError::NotFound => (StatusCode::NOT_FOUND, ErrorPage::NOT_FOUND),
            ViewError::Unauthenticated { next } => {
                return Redirect::to(&login_url(&next)).into_response();
            }
            ViewError::SoftDenied { redirect_to } => {
                return Redirect::to(&redirect_to).into_response();
            }
            ViewError::BadRequest(message) => {
                tracing::debug!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, ErrorPage::BAD_REQUEST)
            }
            ViewError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorPage::SERVER_ERROR)
            }
        };

        let mut response = status.into_response();
        response.extensions_mut().insert(page);
        response
    }
}

impl From<PostServiceError> for ViewError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(_) => ViewError::NotFound,
            PostServiceError::ValidationError { field, message } => {
                ViewError::BadRequest(format!("{}: {}", field, message))
            }
            PostServiceError::InternalError(e) => ViewError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for ViewError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::PostNotFound(_) | CommentServiceError::NotFound(_) => {
                ViewError::NotFound
            }
            CommentServiceError::ValidationError(message) => ViewError::BadRequest(message),
            CommentServiceError::InternalError(e) => ViewError::Internal(e),
        }
    }
}

impl From<CategoryServiceError> for ViewError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(_) => ViewError::NotFound,
            CategoryServiceError::DuplicateSlug(message)
            | CategoryServiceError::ValidationError(message) => ViewError::BadRequest(message),
            CategoryServiceError::InternalError(e) => ViewError::Internal(e),
        }
    }
}

impl From<LocationServiceError> for ViewError {
    fn from(e: LocationServiceError) -> Self {
        match e {
            LocationServiceError::NotFound(_) => ViewError::NotFound,
            LocationServiceError::ValidationError(message) => ViewError::BadRequest(message),
            LocationServiceError::InternalError(e) => ViewError::Internal(e),
        }
    }
}

impl From<UserServiceError> for ViewError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound => ViewError::NotFound,
            UserServiceError::InternalError(e) => ViewError::Internal(e),
            other => ViewError::BadRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn test_not_found_is_marked_for_rendering() {
        let response = ViewError::NotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.extensions().get::<ErrorPage>(),
            Some(&ErrorPage::NOT_FOUND)
        );
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let response = ViewError::Unauthenticated {
            next: "/posts/create/".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login/?next=%2Fposts%2Fcreate%2F"
        );
        assert!(response.extensions().get::<ErrorPage>().is_none());
    }

    #[test]
    fn test_soft_denied_redirects() {
        let response = ViewError::SoftDenied {
            redirect_to: "/posts/3/".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/posts/3/");
    }

    #[test]
    fn test_service_errors_map_to_view_errors() {
        assert!(matches!(
            ViewError::from(PostServiceError::NotFound(1)),
            ViewError::NotFound
        ));
        assert!(matches!(
            ViewError::from(CommentServiceError::PostNotFound(1)),
            ViewError::NotFound
        ));
        assert!(matches!(
            ViewError::from(CategoryServiceError::NotFound("x".into())),
            ViewError::NotFound
        ));
        assert!(matches!(
            ViewError::from(PostServiceError::InternalError(anyhow::anyhow!("db"))),
            ViewError::Internal(_)
        ));
    }
}
