//! Category repository
//!
//! Database operations for categories. Categories are created and toggled
//! by administrators through the `manage` binary; the site only reads them.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by title
    async fn list(&self) -> Result<Vec<Category>>;

    /// Toggle publication. Returns false when no such category exists.
    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool>;

    /// Delete a category; its posts keep existing without one
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check if a category slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get category by ID")?;
                Ok(row.as_ref().map(row_to_category_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get category by ID")?;
                Ok(row.as_ref().map(row_to_category_mysql))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get category by slug")?;
                Ok(row.as_ref().map(row_to_category_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get category by slug")?;
                Ok(row.as_ref().map(row_to_category_mysql))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY title, id");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list categories")?;
                Ok(rows.iter().map(row_to_category_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list categories")?;
                Ok(rows.iter().map(row_to_category_mysql).collect())
            }
        }
    }

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool> {
        let sql = "UPDATE categories SET is_published = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update category")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update category")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM categories WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete category")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete category")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        Ok(self.get_by_slug(slug).await?.is_some())
    }
}

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.title)
    .bind(&category.description)
    .bind(&category.slug)
    .bind(category.is_published)
    .bind(category.created_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        ..category.clone()
    })
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.title)
    .bind(&category.description)
    .bind(&category.slug)
    .bind(category.is_published)
    .bind(category.created_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        ..category.clone()
    })
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}
