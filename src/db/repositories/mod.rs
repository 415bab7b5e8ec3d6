//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for a specific entity.

pub mod category;
pub mod comment;
pub mod location;
pub mod post;
pub mod session;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use location::{LocationRepository, SqlxLocationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Fixtures shared by the repository and service tests
#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Utc};

    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    pub async fn setup_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    pub async fn insert_user(pool: &DynDatabasePool, username: &str) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, date_joined)
            VALUES (?, ?, '', '', 'hash', ?)
            "#,
        )
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind(Utc::now())
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to create test user")
        .last_insert_rowid()
    }

    pub async fn insert_category(pool: &DynDatabasePool, slug: &str, is_published: bool) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO categories (title, description, slug, is_published, created_at)
            VALUES (?, '', ?, ?, ?)
            "#,
        )
        .bind(format!("Category {}", slug))
        .bind(slug)
        .bind(is_published)
        .bind(Utc::now())
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to create test category")
        .last_insert_rowid()
    }

    pub async fn insert_location(pool: &DynDatabasePool, name: &str, is_published: bool) -> i64 {
        sqlx::query("INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(is_published)
            .bind(Utc::now())
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to create test location")
            .last_insert_rowid()
    }

    pub async fn insert_post(
        pool: &DynDatabasePool,
        author_id: i64,
        category_id: Option<i64>,
        is_published: bool,
        pub_date: DateTime<Utc>,
    ) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO posts (title, text, pub_date, author_id, category_id, is_published, created_at)
            VALUES (?, 'text', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(format!("Post at {}", pub_date.timestamp()))
        .bind(pub_date)
        .bind(author_id)
        .bind(category_id)
        .bind(is_published)
        .bind(Utc::now())
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to create test post")
        .last_insert_rowid()
    }

    pub async fn insert_comment(pool: &DynDatabasePool, post_id: i64, author_id: i64) -> i64 {
        sqlx::query("INSERT INTO comments (text, post_id, author_id, created_at) VALUES ('hi', ?, ?, ?)")
            .bind(post_id)
            .bind(author_id)
            .bind(Utc::now())
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to create test comment")
            .last_insert_rowid()
    }
}
