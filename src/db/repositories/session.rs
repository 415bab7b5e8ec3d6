//! Login sessions
//!
//! The statements are identical on SQLite and MySQL, so each one is written
//! once and run on whichever pool is configured.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Look up a session by its token
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove sessions that expired before `now`; returns how many
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<i64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Evaluate `$body` with `$conn` bound to the concrete pool of `$pool`
macro_rules! on_pool {
    ($pool:expr, |$conn:ident| $body:expr) => {
        match $pool.driver() {
            DatabaseDriver::Sqlite => {
                let $conn = $pool.as_sqlite().unwrap();
                $body
            }
            DatabaseDriver::Mysql => {
                let $conn = $pool.as_mysql().unwrap();
                $body
            }
        }
    };
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        const SQL: &str =
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";

        on_pool!(self.pool, |conn| {
            sqlx::query(SQL)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(conn)
                .await
                .with_context(|| format!("Failed to store session for user {}", session.user_id))?;
        });
        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        const SQL: &str = "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?";

        let session = on_pool!(self.pool, |conn| {
            sqlx::query(SQL)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to look up session")?
                .map(|row| Session {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    expires_at: row.get("expires_at"),
                    created_at: row.get("created_at"),
                })
        });
        Ok(session)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to end session")?;
        });
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<i64> {
        let removed = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(conn)
                .await
                .context("Failed to purge expired sessions")?
                .rows_affected()
        });
        Ok(removed as i64)
    }
}
