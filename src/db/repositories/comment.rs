//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{AuthorSummary, Comment, CommentWithAuthor, CreateCommentInput};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on a post with their authors, oldest first
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Replace the text of a comment
    async fn update_text(&self, id: i64, text: &str) -> Result<bool>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), input).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_for_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => {
                list_for_post_mysql(self.pool.as_mysql().unwrap(), post_id).await
            }
        }
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<bool> {
        let sql = "UPDATE comments SET text = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(text)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(text)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

const LIST_FOR_POST_SQL: &str = r#"
    SELECT cm.id, cm.text, cm.post_id, cm.author_id, cm.created_at,
           u.username, u.first_name, u.last_name
    FROM comments cm
    INNER JOIN users u ON u.id = cm.author_id
    WHERE cm.post_id = ?
    ORDER BY cm.created_at ASC, cm.id ASC
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();
    let result =
        sqlx::query("INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&input.text)
            .bind(input.post_id)
            .bind(input.author_id)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        text: input.text.clone(),
        post_id: Some(input.post_id),
        author_id: input.author_id,
        created_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT id, text, post_id, author_id, created_at FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    Ok(row.map(|row| Comment {
        id: row.get("id"),
        text: row.get("text"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    }))
}

async fn list_for_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(LIST_FOR_POST_SQL)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            comment: Comment {
                id: row.get("id"),
                text: row.get("text"),
                post_id: row.get("post_id"),
                author_id: row.get("author_id"),
                created_at: row.get("created_at"),
            },
            author: AuthorSummary {
                id: row.get("author_id"),
                username: row.get("username"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
            },
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();
    let result =
        sqlx::query("INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&input.text)
            .bind(input.post_id)
            .bind(input.author_id)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        text: input.text.clone(),
        post_id: Some(input.post_id),
        author_id: input.author_id,
        created_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT id, text, post_id, author_id, created_at FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    Ok(row.map(|row| Comment {
        id: row.get("id"),
        text: row.get("text"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    }))
}

async fn list_for_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(LIST_FOR_POST_SQL)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            comment: Comment {
                id: row.get("id"),
                text: row.get("text"),
                post_id: row.get("post_id"),
                author_id: row.get("author_id"),
                created_at: row.get("created_at"),
            },
            author: AuthorSummary {
                id: row.get("author_id"),
                username: row.get("username"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_category, insert_post, insert_user, setup_pool,
    };

    async fn setup() -> (DynDatabasePool, SqlxCommentRepository, i64, i64) {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "anna").await;
        let category = insert_category(&pool, "travel", true).await;
        let post = insert_post(&pool, author, Some(category), true, Utc::now()).await;
        let repo = SqlxCommentRepository::new(pool.clone());
        (pool, repo, author, post)
    }

    fn comment_input(post_id: i64, author_id: i64, text: &str) -> CreateCommentInput {
        CreateCommentInput {
            post_id,
            author_id,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_comment() {
        let (_pool, repo, author, post) = setup().await;

        let created = repo.create(&comment_input(post, author, "Lovely")).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found.text, "Lovely");
        assert!(found.belongs_to(post));
        assert_eq!(found.author_id, author);
        assert!(repo.get_by_id(99999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_post_is_oldest_first_with_authors() {
        let (pool, repo, author, post) = setup().await;
        let reader = insert_user(&pool, "boris").await;

        let first = repo.create(&comment_input(post, reader, "first")).await.unwrap();
        let second = repo.create(&comment_input(post, author, "second")).await.unwrap();

        let listed = repo.list_for_post(post).await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|c| c.comment.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(listed[0].author.username, "boris");
        assert_eq!(listed[1].author.username, "anna");
    }

    #[tokio::test]
    async fn test_update_and_delete_comment() {
        let (_pool, repo, author, post) = setup().await;
        let created = repo.create(&comment_input(post, author, "draft")).await.unwrap();

        assert!(repo.update_text(created.id, "final").await.unwrap());
        assert_eq!(repo.get_by_id(created.id).await.unwrap().unwrap().text, "final");

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(repo.list_for_post(post).await.unwrap().is_empty());
    }
}
