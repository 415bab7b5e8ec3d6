//! Page rendering helpers

use axum::response::Html;
use serde::Serialize;
use tera::Context as TeraContext;

use crate::api::error::ViewError;
use crate::api::middleware::{AppState, Viewer};
use crate::models::PagedResult;

/// Render a template for the viewer with the standard variables injected
pub fn render_page(
    state: &AppState,
    viewer: &Viewer,
    template: &str,
    context: &TeraContext,
) -> Result<Html<String>, ViewError> {
    let html = state
        .theme_engine
        .render_with_standard_vars(template, context, &viewer.template_vars(&state.site))
        .map_err(ViewError::Internal)?;
    Ok(Html(html))
}

/// Pagination block exposed to listing templates as `page_obj`
#[derive(Debug, Serialize)]
pub struct PageObj<T: Serialize> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
    pub total: i64,
}

impl<T: Serialize> From<PagedResult<T>> for PageObj<T> {
    fn from(page: PagedResult<T>) -> Self {
        let num_pages = page.total_pages().max(1);
        let has_next = page.has_next();
        let has_previous = page.has_prev();
        Self {
            number: page.page,
            num_pages,
            has_next,
            has_previous,
            total: page.total,
            items: page.items,
        }
    }
}
