//! Location repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Location;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Create a new location
    async fn create(&self, location: &Location) -> Result<Location>;

    /// Get location by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// List all locations ordered by name
    async fn list(&self) -> Result<Vec<Location>>;

    /// Delete a location; its posts keep existing without one
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, location: &Location) -> Result<Location> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_location_sqlite(self.pool.as_sqlite().unwrap(), location).await
            }
            DatabaseDriver::Mysql => {
                create_location_mysql(self.pool.as_mysql().unwrap(), location).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        let sql = "SELECT id, name, is_published, created_at FROM locations WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get location by ID")?;
                Ok(row.as_ref().map(row_to_location_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get location by ID")?;
                Ok(row.as_ref().map(row_to_location_mysql))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Location>> {
        let sql = "SELECT id, name, is_published, created_at FROM locations ORDER BY name, id";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list locations")?;
                Ok(rows.iter().map(row_to_location_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list locations")?;
                Ok(rows.iter().map(row_to_location_mysql).collect())
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM locations WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete location")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete location")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_location_sqlite(pool: &SqlitePool, location: &Location) -> Result<Location> {
    let result =
        sqlx::query("INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)")
            .bind(&location.name)
            .bind(location.is_published)
            .bind(location.created_at)
            .execute(pool)
            .await
            .context("Failed to create location")?;

    Ok(Location {
        id: result.last_insert_rowid(),
        ..location.clone()
    })
}

fn row_to_location_sqlite(row: &sqlx::sqlite::SqliteRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_location_mysql(pool: &MySqlPool, location: &Location) -> Result<Location> {
    let result =
        sqlx::query("INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)")
            .bind(&location.name)
            .bind(location.is_published)
            .bind(location.created_at)
            .execute(pool)
            .await
            .context("Failed to create location")?;

    Ok(Location {
        id: result.last_insert_id() as i64,
        ..location.clone()
    })
}

fn row_to_location_mysql(row: &sqlx::mysql::MySqlRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::setup_pool;

    #[tokio::test]
    async fn test_create_get_list_delete() {
        let repo = SqlxLocationRepository::new(setup_pool().await);

        let paris = repo.create(&Location::new("Paris".into())).await.unwrap();
        let attic = repo
            .create(&Location::new("Attic".into()).hidden())
            .await
            .unwrap();

        let found = repo.get_by_id(paris.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Paris");
        assert!(found.is_published);
        assert!(!repo.get_by_id(attic.id).await.unwrap().unwrap().is_published);

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Attic", "Paris"]);

        assert!(repo.delete(paris.id).await.unwrap());
        assert!(repo.get_by_id(paris.id).await.unwrap().is_none());
        assert!(!repo.delete(paris.id).await.unwrap());
    }
}
