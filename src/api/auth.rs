//! Authentication pages
//!
//! Handles:
//! - GET|POST /auth/login/ - login form, sets the session cookie
//! - POST /auth/logout/ - ends the session
//! - GET|POST /auth/registration/ - sign-up form

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::access::profile_url;
use crate::api::error::ViewError;
use crate::api::forms::{safe_next, user_form_errors, FormErrors, NON_FIELD};
use crate::api::middleware::{
    clear_session_cookie, extract_session_token, session_cookie, AppState, Viewer,
};
use crate::api::render::render_page;
use crate::services::{LoginInput, RegisterInput, UserServiceError};

/// Query string of the login page
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login form body
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Registration form body
#[derive(Debug, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

/// Values echoed back into the forms; passwords never are
#[derive(Debug, Default, Serialize)]
struct AccountFormValues<'a> {
    username: &'a str,
    email: &'a str,
}

fn render_login(
    state: &AppState,
    viewer: &Viewer,
    username: &str,
    next: Option<&str>,
    errors: &FormErrors,
) -> Result<Html<String>, ViewError> {
    let mut context = TeraContext::new();
    context.insert(
        "form",
        &AccountFormValues {
            username,
            ..Default::default()
        },
    );
    context.insert("next", safe_next(next).unwrap_or(""));
    context.insert("errors", errors);
    render_page(state, viewer, "registration/login.html", &context)
}

/// GET /auth/login/
pub async fn login_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Result<Html<String>, ViewError> {
    render_login(&state, &viewer, "", query.next.as_deref(), &FormErrors::new())
}

/// POST /auth/login/
///
/// Sets the session cookie and continues to `next` when it is a local path,
/// otherwise to the user's profile.
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LoginForm>,
) -> Result<Response, ViewError> {
    let input = LoginInput::new(form.username.trim(), form.password);

    let (session, user) = match state.user_service.login(input).await {
        Ok(pair) => pair,
        Err(UserServiceError::AuthenticationError(message)) => {
            let errors = FormErrors::single(NON_FIELD, message);
            return render_login(&state, &viewer, &form.username, form.next.as_deref(), &errors)
                .map(IntoResponse::into_response);
        }
        Err(e) => return Err(e.into()),
    };

    let target = safe_next(form.next.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| profile_url(&user.username));

    let cookie = session_cookie(&session.id, state.session.max_age_secs());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ViewError::Internal(e.into()))?,
    );

    tracing::info!("User {} logged in", user.username);
    Ok((headers, Redirect::to(&target)).into_response())
}

/// POST /auth/logout/
pub async fn logout(
    State(state): State<AppState>,
    viewer: Viewer,
    request_headers: HeaderMap,
) -> Result<Response, ViewError> {
    if let Some(token) = extract_session_token(&request_headers) {
        state.user_service.logout(&token).await?;
    }
    if let Some(ref user) = viewer.user {
        tracing::info!("User {} logged out", user.username);
    }

    let anonymous = Viewer {
        user: None,
        path: viewer.path.clone(),
    };
    let page = render_page(&state, &anonymous, "registration/logged_out.html", &TeraContext::new())?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&clear_session_cookie()).map_err(|e| ViewError::Internal(e.into()))?,
    );
    Ok((headers, page).into_response())
}

fn render_registration(
    state: &AppState,
    viewer: &Viewer,
    form: &AccountFormValues<'_>,
    errors: &FormErrors,
) -> Result<Html<String>, ViewError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    render_page(state, viewer, "registration/registration_form.html", &context)
}

/// GET /auth/registration/
pub async fn registration_form(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Html<String>, ViewError> {
    render_registration(&state, &viewer, &AccountFormValues::default(), &FormErrors::new())
}

/// POST /auth/registration/
pub async fn registration(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, ViewError> {
    let input = RegisterInput {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password,
        password_confirm: form.password_confirm,
    };

    match state.user_service.register(input).await {
        Ok(_) => Ok(Redirect::to("/auth/login/").into_response()),
        Err(e) => {
            let errors = user_form_errors(e)?;
            let values = AccountFormValues {
                username: &form.username,
                email: &form.email,
            };
            render_registration(&state, &viewer, &values, &errors).map(IntoResponse::into_response)
        }
    }
}
