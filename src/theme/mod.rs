//! Theme engine
//!
//! This module provides template rendering using Tera.
//! Features:
//! - Default templates compiled into the binary
//! - Per-template overrides from a theme directory on disk
//! - Standard template variables
//! - Plain HTML fallback when a page cannot be rendered

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;

pub use error::ThemeError;

/// Default templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct DefaultTemplates;

/// Theme engine for rendering templates
pub struct ThemeEngine {
    /// Tera template engine instance
    tera: Tera,
    /// Path to themes directory
    themes_path: PathBuf,
    /// Active theme name
    theme_name: String,
}

impl ThemeEngine {
    /// Create a new theme engine
    ///
    /// Embedded templates are loaded first; every `.html` file found under
    /// `<themes_path>/<theme_name>/` replaces the embedded template with the
    /// same relative name. A missing theme directory is not an error.
    pub fn new(themes_path: &Path, theme_name: &str) -> Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
            themes_path: themes_path.to_path_buf(),
            theme_name: theme_name.to_string(),
        };
        engine.load_templates()?;
        Ok(engine)
    }

    /// Engine with only the embedded templates
    pub fn embedded() -> Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
            themes_path: PathBuf::new(),
            theme_name: String::new(),
        };
        engine.load_templates()?;
        Ok(engine)
    }

    fn theme_path(&self) -> Option<PathBuf> {
        if self.theme_name.is_empty() {
            return None;
        }
        Some(self.themes_path.join(&self.theme_name))
    }

    fn load_templates(&mut self) -> Result<()> {
        let mut templates = collect_embedded_templates()?;

        if let Some(theme_path) = self.theme_path() {
            if theme_path.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(&theme_path, &theme_path, &mut overrides)?;
                for (name, content) in overrides {
                    tracing::debug!("Theme '{}' overrides {}", self.theme_name, name);
                    templates.retain(|(existing, _)| existing != &name);
                    templates.push((name, content));
                }
            } else {
                tracing::debug!(
                    "Theme directory {:?} not found, using embedded templates",
                    theme_path
                );
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(error_chain("Failed to load templates", &e)))?;

        tracing::info!("Loaded {} templates", tera.get_template_names().count());
        self.tera = tera;
        Ok(())
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(error_chain(&format!("Failed to render '{}'", template), &e))
                .into()
        })
    }

    /// Render a template with standard variables automatically added
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();

        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("site_description", &standard_vars.site_description);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);

        if let Some(ref user) = standard_vars.user {
            full_context.insert("user", user);
        }

        self.render(template, &full_context)
    }

    /// Render a template, falling back to a plain HTML page on error.
    ///
    /// Used for error pages, which must produce a body even when the
    /// templates themselves are broken.
    pub fn render_with_fallback(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
        title: &str,
    ) -> String {
        match self.render_with_standard_vars(template, context, standard_vars) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {}", template, e);
                Self::simple_error_page(title)
            }
        }
    }

    /// Generate a simple HTML error page
    fn simple_error_page(title: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 600px;
            margin: 50px auto;
            padding: 20px;
        }}
        h1 {{ color: #e74c3c; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p><a href="/">Blogicum</a></p>
</body>
</html>"#,
            title = tera::escape_html(title)
        )
    }

    /// Re-read templates from disk (theme overrides only)
    pub fn reload_templates(&mut self) -> Result<()> {
        self.load_templates()
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }
}

fn collect_embedded_templates() -> Result<Vec<(String, String)>> {
    let mut templates = Vec::new();
    for name in DefaultTemplates::iter() {
        let file = DefaultTemplates::get(&name)
            .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
        let content = std::str::from_utf8(&file.data)
            .map_err(|e| ThemeError::TemplateError(format!("{} is not UTF-8: {}", name, e)))?;
        templates.push((name.to_string(), content.to_string()));
    }
    Ok(templates)
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;

            // Forward slashes for template names on every platform
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}

fn error_chain(prefix: &str, e: &tera::Error) -> String {
    let mut error_msg = format!("{}: {}", prefix, e);
    let mut source = e.source();
    while let Some(s) = source {
        error_msg.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    error_msg
}

/// Standard template variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    /// Blog name
    pub site_name: String,
    /// Blog description
    pub site_description: String,
    /// Logged-in user, absent for anonymous visitors
    pub user: Option<CurrentUser>,
    /// Current request path
    pub request_path: String,
    /// Current year (for copyright)
    pub year: i32,
}

/// Current user information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
        }
    }
}

impl StandardTemplateVars {
    pub fn new(
        site_name: impl Into<String>,
        site_description: impl Into<String>,
        request_path: impl Into<String>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            site_description: site_description.into(),
            user: None,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    /// Set the current user
    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.user = Some(user);
        self
    }
}

#[cfg(test)]
mod tests;
