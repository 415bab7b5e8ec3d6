//! Tests for the theme engine

use super::*;
use crate::models::{AuthorSummary, Post, PostWithMeta};
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn standard_vars() -> StandardTemplateVars {
    StandardTemplateVars::new("Blogicum", "A test blog", "/")
}

fn sample_post(id: i64) -> PostWithMeta {
    let now = chrono::Utc::now();
    PostWithMeta {
        post: Post {
            id,
            title: format!("Post {}", id),
            text: "Line one\nLine two".to_string(),
            pub_date: now,
            author_id: 1,
            location_id: None,
            category_id: None,
            image: None,
            is_published: true,
            created_at: now,
        },
        author: AuthorSummary {
            id: 1,
            username: "anna".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        },
        category: None,
        location: None,
        comment_count: 3,
    }
}

fn page_obj(items: Vec<PostWithMeta>) -> serde_json::Value {
    let total = items.len();
    serde_json::json!({
        "items": items,
        "number": 1,
        "num_pages": 1,
        "has_next": false,
        "has_previous": false,
        "total": total,
    })
}

#[test]
fn test_embedded_templates_load() {
    let engine = ThemeEngine::embedded().unwrap();

    for name in [
        "base.html",
        "blog/index.html",
        "blog/category.html",
        "blog/profile.html",
        "blog/detail.html",
        "blog/create.html",
        "blog/comment.html",
        "blog/user.html",
        "registration/login.html",
        "registration/registration_form.html",
        "registration/logged_out.html",
        "pages/404.html",
        "pages/500.html",
    ] {
        assert!(engine.has_template(name), "missing template {}", name);
    }
}

#[test]
fn test_render_index_with_posts() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut context = TeraContext::new();
    context.insert("page_obj", &page_obj(vec![sample_post(1), sample_post(2)]));

    let html = engine
        .render_with_standard_vars("blog/index.html", &context, &standard_vars())
        .unwrap();

    assert!(html.contains("Post 1"));
    assert!(html.contains("Post 2"));
    assert!(html.contains("Comments (3)"));
    assert!(html.contains("/profile/anna/"));
}

#[test]
fn test_render_with_standard_vars() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut context = TeraContext::new();
    context.insert("page_obj", &page_obj(Vec::new()));

    let anonymous = engine
        .render_with_standard_vars("blog/index.html", &context, &standard_vars())
        .unwrap();
    assert!(anonymous.contains("Log in"));
    assert!(!anonymous.contains("New post"));

    let vars = standard_vars().with_user(CurrentUser {
        id: 1,
        username: "anna".to_string(),
        display_name: "Anna K".to_string(),
    });
    let logged_in = engine
        .render_with_standard_vars("blog/index.html", &context, &vars)
        .unwrap();
    assert!(logged_in.contains("New post"));
    assert!(logged_in.contains("Anna K"));
}

#[test]
fn test_output_is_escaped() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut post = sample_post(1);
    post.post.title = "<script>alert(1)</script>".to_string();
    let mut context = TeraContext::new();
    context.insert("page_obj", &page_obj(vec![post]));

    let html = engine
        .render_with_standard_vars("blog/index.html", &context, &standard_vars())
        .unwrap();

    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_theme_directory_overrides_template() {
    let temp_dir = TempDir::new().unwrap();
    let theme_path = temp_dir.path().join("custom").join("pages");
    fs::create_dir_all(&theme_path).unwrap();
    fs::write(
        theme_path.join("404.html"),
        "Custom not found on {{ site_name }}",
    )
    .unwrap();

    let engine = ThemeEngine::new(temp_dir.path(), "custom").unwrap();
    let html = engine
        .render_with_standard_vars("pages/404.html", &TeraContext::new(), &standard_vars())
        .unwrap();

    assert_eq!(html, "Custom not found on Blogicum");
    assert_eq!(engine.theme_name(), "custom");
    // Templates that are not overridden still come from the binary
    assert!(engine.has_template("blog/index.html"));
}

#[test]
fn test_missing_theme_directory_uses_embedded() {
    let temp_dir = TempDir::new().unwrap();

    let engine = ThemeEngine::new(temp_dir.path(), "nonexistent").unwrap();

    assert!(engine.has_template("pages/404.html"));
}

#[test]
fn test_reload_templates_picks_up_changes() {
    let temp_dir = TempDir::new().unwrap();
    let theme_path = temp_dir.path().join("default").join("pages");
    fs::create_dir_all(&theme_path).unwrap();

    let mut engine = ThemeEngine::new(temp_dir.path(), "default").unwrap();
    fs::write(theme_path.join("500.html"), "Reloaded").unwrap();
    engine.reload_templates().unwrap();

    let html = engine.render("pages/500.html", &TeraContext::new()).unwrap();
    assert_eq!(html, "Reloaded");
}

#[test]
fn test_invalid_override_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let theme_path = temp_dir.path().join("broken");
    fs::create_dir_all(&theme_path).unwrap();
    fs::write(theme_path.join("base.html"), "{% block content %}").unwrap();

    assert!(ThemeEngine::new(temp_dir.path(), "broken").is_err());
}

#[test]
fn test_render_unknown_template_fails() {
    let engine = ThemeEngine::embedded().unwrap();

    let result = engine.render("nope.html", &TeraContext::new());

    assert!(result.is_err());
}

#[test]
fn test_render_with_fallback_returns_simple_page() {
    let engine = ThemeEngine::embedded().unwrap();

    let html = engine.render_with_fallback(
        "missing.html",
        &TeraContext::new(),
        &standard_vars(),
        "Page not found",
    );

    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("<h1>Page not found</h1>"));
}

#[test]
fn test_standard_template_vars_year() {
    let vars = standard_vars();
    assert_eq!(vars.year, chrono::Utc::now().year());
    assert!(vars.user.is_none());
}

#[test]
fn test_current_user_from_user() {
    let mut user = User::new("anna".to_string(), String::new(), String::new());
    user.id = 7;
    user.first_name = "Anna".to_string();

    let current = CurrentUser::from(&user);

    assert_eq!(current.id, 7);
    assert_eq!(current.username, "anna");
    assert_eq!(current.display_name, "Anna");
}
