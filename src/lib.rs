//! Blogicum - a server-rendered blog
//!
//! Users publish posts into categories, optionally tagged with a location
//! and an image, and comment on each other's posts.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
