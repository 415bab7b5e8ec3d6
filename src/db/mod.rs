//! Database layer
//!
//! Storage for the blog: users, sessions, categories, locations, posts and
//! comments. Two backends are supported:
//! - SQLite (default, single file or in-memory)
//! - MySQL
//!
//! The driver is selected by `database.driver` in the configuration and
//! hidden behind the `DatabasePool` trait. Repositories dispatch on
//! `pool.driver()` to backend-specific query functions.
//!
//! # Usage
//!
//! ```ignore
//! use blogicum::config::DatabaseConfig;
//! use blogicum::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod query;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
pub use query::{filter_visible, with_comment_stats, Annotated, Plain, PostQuery};
