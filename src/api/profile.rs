//! Profile self-service
//!
//! GET|POST /edit_profile/ always edits the logged-in user. The form has no
//! field naming the target; stray identifiers in the body are ignored.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::access::profile_url;
use crate::api::error::ViewError;
use crate::api::forms::{user_form_errors, FormErrors};
use crate::api::middleware::{AppState, AuthenticatedUser, Viewer};
use crate::api::render::render_page;
use crate::models::UpdateProfileInput;

/// Profile form body
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl From<ProfileForm> for UpdateProfileInput {
    fn from(form: ProfileForm) -> Self {
        Self {
            username: form.username,
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
        }
    }
}

fn render_profile_form(
    state: &AppState,
    viewer: &Viewer,
    form: &UpdateProfileInput,
    errors: &FormErrors,
) -> Result<Html<String>, ViewError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    render_page(state, viewer, "blog/user.html", &context)
}

/// GET /edit_profile/
pub async fn edit_profile_form(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Html<String>, ViewError> {
    let form = UpdateProfileInput::from_user(&user);
    render_profile_form(&state, &viewer, &form, &FormErrors::new())
}

/// POST /edit_profile/
pub async fn edit_profile(
    State(state): State<AppState>,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
    Form(form): Form<ProfileForm>,
) -> Result<Response, ViewError> {
    let input = UpdateProfileInput::from(form);

    match state.user_service.update_profile(user.id, input.clone()).await {
        Ok(updated) => Ok(Redirect::to(&profile_url(&updated.username)).into_response()),
        Err(e) => {
            let errors = user_form_errors(e)?;
            render_profile_form(&state, &viewer, &input, &errors).map(IntoResponse::into_response)
        }
    }
}
