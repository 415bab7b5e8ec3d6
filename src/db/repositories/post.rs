//! Post repository
//!
//! Database operations for posts. Listing reads go through
//! [`PostQuery`](crate::db::query::PostQuery) so that every page of posts is
//! built from the same visibility filter and annotation.

use crate::config::DatabaseDriver;
use crate::db::query::{Annotated, Plain, PostQuery, QueryArg};
use crate::db::DynDatabasePool;
use crate::models::{
    AuthorSummary, CategorySummary, CreatePostInput, ListParams, LocationSummary, PagedResult,
    Post, PostWithMeta,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, input: &CreatePostInput) -> Result<Post>;

    /// Get post by ID regardless of visibility
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Persist every editable field of a stored post
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post and its comments
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Bare posts matching a query, in id order
    async fn fetch(&self, query: &PostQuery<Plain>) -> Result<Vec<Post>>;

    /// One page of annotated posts matching a query
    async fn fetch_annotated(
        &self,
        query: &PostQuery<Annotated>,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithMeta>>;

    /// First annotated post matching a query
    async fn find_annotated(&self, query: &PostQuery<Annotated>) -> Result<Option<PostWithMeta>>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.as_sqlite().unwrap(), input).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let statement = PostQuery::by_id(id).select_sql();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = bind_sqlite(sqlx::query(&statement.sql), &statement.args)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get post by ID")?;
                Ok(row.as_ref().map(row_to_post_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = bind_mysql(sqlx::query(&statement.sql), &statement.args)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get post by ID")?;
                Ok(row.as_ref().map(row_to_post_mysql))
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM posts WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn fetch(&self, query: &PostQuery<Plain>) -> Result<Vec<Post>> {
        let statement = query.select_sql();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&statement.sql), &statement.args)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to fetch posts")?;
                Ok(rows.iter().map(row_to_post_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&statement.sql), &statement.args)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to fetch posts")?;
                Ok(rows.iter().map(row_to_post_mysql).collect())
            }
        }
    }

    async fn fetch_annotated(
        &self,
        query: &PostQuery<Annotated>,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithMeta>> {
        let count = query.count_sql();
        let page = query.page_sql(params);
        let (items, total): (Vec<PostWithMeta>, i64) = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.as_sqlite().unwrap();
                let total: i64 = bind_sqlite(sqlx::query(&count.sql), &count.args)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?
                    .get(0);
                let rows = bind_sqlite(sqlx::query(&page.sql), &page.args)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                (rows.iter().map(row_to_post_with_meta_sqlite).collect(), total)
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.as_mysql().unwrap();
                let total: i64 = bind_mysql(sqlx::query(&count.sql), &count.args)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?
                    .get(0);
                let rows = bind_mysql(sqlx::query(&page.sql), &page.args)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                (rows.iter().map(row_to_post_with_meta_mysql).collect(), total)
            }
        };

        Ok(PagedResult::new(items, total, params))
    }

    async fn find_annotated(&self, query: &PostQuery<Annotated>) -> Result<Option<PostWithMeta>> {
        let statement = query.select_sql();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = bind_sqlite(sqlx::query(&statement.sql), &statement.args)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to load post")?;
                Ok(row.as_ref().map(row_to_post_with_meta_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = bind_mysql(sqlx::query(&statement.sql), &statement.args)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to load post")?;
                Ok(row.as_ref().map(row_to_post_with_meta_mysql))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &[QueryArg],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match *arg {
            QueryArg::Int(value) => query.bind(value),
            QueryArg::Timestamp(value) => query.bind(value),
        };
    }
    query
}

async fn create_post_sqlite(pool: &SqlitePool, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(input.author_id)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post_from_input(result.last_insert_rowid(), input, now))
}

async fn update_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?, image = ?, is_published = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.text)
    .bind(post.pub_date)
    .bind(post.location_id)
    .bind(post.category_id)
    .bind(&post.image)
    .bind(post.is_published)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(post.clone())
}

fn row_to_post_sqlite(row: &SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

fn row_to_post_with_meta_sqlite(row: &SqliteRow) -> PostWithMeta {
    let post = row_to_post_sqlite(row);
    let category = match (post.category_id, row.get::<Option<String>, _>("category_title")) {
        (Some(id), Some(title)) => Some(CategorySummary {
            id,
            title,
            slug: row.get("category_slug"),
            is_published: row.get("category_is_published"),
        }),
        _ => None,
    };
    let location = match (post.location_id, row.get::<Option<String>, _>("location_name")) {
        (Some(id), Some(name)) => Some(LocationSummary {
            id,
            name,
            is_published: row.get("location_is_published"),
        }),
        _ => None,
    };

    PostWithMeta {
        author: AuthorSummary {
            id: post.author_id,
            username: row.get("author_username"),
            first_name: row.get("author_first_name"),
            last_name: row.get("author_last_name"),
        },
        category,
        location,
        comment_count: row.get("comment_count"),
        post,
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

fn bind_mysql<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    args: &[QueryArg],
) -> Query<'q, MySql, MySqlArguments> {
    for arg in args {
        query = match *arg {
            QueryArg::Int(value) => query.bind(value),
            QueryArg::Timestamp(value) => query.bind(value),
        };
    }
    query
}

async fn create_post_mysql(pool: &MySqlPool, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(input.author_id)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post_from_input(result.last_insert_id() as i64, input, now))
}

async fn update_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?, image = ?, is_published = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.text)
    .bind(post.pub_date)
    .bind(post.location_id)
    .bind(post.category_id)
    .bind(&post.image)
    .bind(post.is_published)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(post.clone())
}

fn row_to_post_mysql(row: &MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

fn row_to_post_with_meta_mysql(row: &MySqlRow) -> PostWithMeta {
    let post = row_to_post_mysql(row);
    let category = match (post.category_id, row.get::<Option<String>, _>("category_title")) {
        (Some(id), Some(title)) => Some(CategorySummary {
            id,
            title,
            slug: row.get("category_slug"),
            is_published: row.get("category_is_published"),
        }),
        _ => None,
    };
    let location = match (post.location_id, row.get::<Option<String>, _>("location_name")) {
        (Some(id), Some(name)) => Some(LocationSummary {
            id,
            name,
            is_published: row.get("location_is_published"),
        }),
        _ => None,
    };

    PostWithMeta {
        author: AuthorSummary {
            id: post.author_id,
            username: row.get("author_username"),
            first_name: row.get("author_first_name"),
            last_name: row.get("author_last_name"),
        },
        category,
        location,
        comment_count: row.get("comment_count"),
        post,
    }
}

fn post_from_input(id: i64, input: &CreatePostInput, created_at: chrono::DateTime<Utc>) -> Post {
    Post {
        id,
        title: input.title.clone(),
        text: input.text.clone(),
        pub_date: input.pub_date,
        author_id: input.author_id,
        location_id: input.location_id,
        category_id: Some(input.category_id),
        image: input.image.clone(),
        is_published: input.is_published,
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::{filter_visible, with_comment_stats};
    use crate::db::repositories::test_support::{
        insert_category, insert_comment, insert_location, insert_post, insert_user, setup_pool,
    };
    use chrono::Duration;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = setup_pool().await;
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "anna").await;
        let category = insert_category(&pool, "travel", true).await;
        let location = insert_location(&pool, "Paris", true).await;

        let input = CreatePostInput::new("Title", "Body", Utc::now(), author, category)
            .with_location(location)
            .with_image("post_images/a.png");
        let created = repo.create(&input).await.unwrap();
        assert!(created.id > 0);

        let mut stored = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Title");
        assert_eq!(stored.location_id, Some(location));
        assert_eq!(stored.image.as_deref(), Some("post_images/a.png"));

        stored.title = "Renamed".into();
        stored.image = None;
        stored.is_published = false;
        repo.update(&stored).await.unwrap();

        let reloaded = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Renamed");
        assert_eq!(reloaded.image, None);
        assert!(!reloaded.is_published);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(!repo.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_visible_listing_excludes_hidden_rows() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "anna").await;
        let open = insert_category(&pool, "open", true).await;
        let closed = insert_category(&pool, "closed", false).await;
        let past = Utc::now() - Duration::days(1);
        let future = Utc::now() + Duration::days(1);

        let visible = insert_post(&pool, author, Some(open), true, past).await;
        insert_post(&pool, author, Some(open), false, past).await;
        insert_post(&pool, author, Some(open), true, future).await;
        insert_post(&pool, author, Some(closed), true, past).await;
        insert_post(&pool, author, None, true, past).await;

        let query = with_comment_stats(filter_visible(PostQuery::all()));
        let page = repo.fetch_annotated(&query, &ListParams::default()).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].post.id, visible);

        let everything = repo.fetch(&PostQuery::all()).await.unwrap();
        assert_eq!(everything.len(), 5);
    }

    #[tokio::test]
    async fn test_annotated_rows_carry_relations_and_counts() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "anna").await;
        let reader = insert_user(&pool, "boris").await;
        let category = insert_category(&pool, "travel", true).await;
        let location = insert_location(&pool, "Paris", true).await;

        let input = CreatePostInput::new("Title", "Body", Utc::now() - Duration::hours(1), author, category)
            .with_location(location);
        let post = repo.create(&input).await.unwrap();
        insert_comment(&pool, post.id, reader).await;
        insert_comment(&pool, post.id, author).await;

        let found = repo
            .find_annotated(&with_comment_stats(PostQuery::by_id(post.id)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.author.username, "anna");
        assert_eq!(found.category.as_ref().unwrap().slug, "travel");
        assert_eq!(found.location.as_ref().unwrap().name, "Paris");
        assert_eq!(found.comment_count, 2);
    }

    #[tokio::test]
    async fn test_annotated_listing_is_newest_first_and_paged() {
        let (pool, repo) = setup_test_repo().await;
        let author = insert_user(&pool, "anna").await;
        let category = insert_category(&pool, "travel", true).await;
        let base = Utc::now() - Duration::days(30);

        let mut ids = Vec::new();
        for day in 0..12 {
            ids.push(insert_post(&pool, author, Some(category), true, base + Duration::days(day)).await);
        }

        let query = with_comment_stats(filter_visible(PostQuery::in_category(category)));
        let first = repo.fetch_annotated(&query, &ListParams::page(1)).await.unwrap();
        let second = repo.fetch_annotated(&query, &ListParams::page(2)).await.unwrap();
        let third = repo.fetch_annotated(&query, &ListParams::page(3)).await.unwrap();

        assert_eq!(first.total, 12);
        assert_eq!(first.total_pages(), 2);
        assert_eq!(first.items.len(), 10);
        assert_eq!(second.items.len(), 2);
        assert!(third.is_out_of_range());

        assert_eq!(first.items[0].post.id, ids[11]);
        assert_eq!(second.items[1].post.id, ids[0]);
        let dates: Vec<_> = first.items.iter().map(|p| p.post.pub_date).collect();
        assert!(dates.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[tokio::test]
    async fn test_author_scope_without_filter_includes_unpublished() {
        let (pool, repo) = setup_test_repo().await;
        let anna = insert_user(&pool, "anna").await;
        let boris = insert_user(&pool, "boris").await;
        let hidden = insert_category(&pool, "hidden", false).await;

        insert_post(&pool, anna, Some(hidden), false, Utc::now() + Duration::days(3)).await;
        insert_post(&pool, anna, None, true, Utc::now()).await;
        insert_post(&pool, boris, Some(hidden), true, Utc::now()).await;

        let own = with_comment_stats(PostQuery::by_author(anna));
        let page = repo.fetch_annotated(&own, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|p| p.author.id == anna));

        let public = filter_visible(with_comment_stats(PostQuery::by_author(anna)));
        let page = repo.fetch_annotated(&public, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }
}
