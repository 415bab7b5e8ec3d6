//! Composable post queries
//!
//! A `PostQuery` starts from a scope (all posts, one category, one author or
//! a single id) and is refined by two transformations:
//!
//! - [`filter_visible`] keeps posts that are published, past their
//!   publication date and filed under a published category;
//! - [`with_comment_stats`] loads author, category and location alongside
//!   each post, orders newest first and attaches the comment count.
//!
//! The type parameter records whether the query is annotated, so the
//! repository knows which row shape it returns. Both transformations commute:
//!
//! ```ignore
//! use blogicum::db::query::{filter_visible, with_comment_stats, PostQuery};
//!
//! let listing = with_comment_stats(filter_visible(PostQuery::in_category(3)));
//! let page = post_repo.fetch_annotated(&listing, &ListParams::page(1)).await?;
//! ```

use chrono::{DateTime, Utc};
use std::marker::PhantomData;

use crate::models::ListParams;

/// Marker: rows are bare posts
#[derive(Debug)]
pub struct Plain;

/// Marker: rows carry relations and a comment count
#[derive(Debug)]
pub struct Annotated;

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryArg {
    Int(i64),
    Timestamp(DateTime<Utc>),
}

/// Rendered SQL with its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub args: Vec<QueryArg>,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Id(i64),
    Category(i64),
    Author(i64),
    VisibleAt(DateTime<Utc>),
}

const POST_COLUMNS: &str = "p.id, p.title, p.text, p.pub_date, p.author_id, p.location_id, \
     p.category_id, p.image, p.is_published, p.created_at";

const META_COLUMNS: &str = "u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, c.title AS category_title, c.slug AS category_slug, \
     c.is_published AS category_is_published, l.name AS location_name, \
     l.is_published AS location_is_published, \
     (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count";

const PLAIN_FROM: &str = "posts p LEFT JOIN categories c ON c.id = p.category_id";

const ANNOTATED_FROM: &str = "posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN categories c ON c.id = p.category_id \
     LEFT JOIN locations l ON l.id = p.location_id";

/// Query over posts, see the module documentation
#[derive(Debug)]
pub struct PostQuery<S = Plain> {
    conditions: Vec<Condition>,
    _state: PhantomData<S>,
}

impl<S> Clone for PostQuery<S> {
    fn clone(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            _state: PhantomData,
        }
    }
}

impl<S> PartialEq for PostQuery<S> {
    fn eq(&self, other: &Self) -> bool {
        self.conditions == other.conditions
    }
}

impl PostQuery<Plain> {
    fn scoped(condition: Option<Condition>) -> Self {
        Self {
            conditions: condition.into_iter().collect(),
            _state: PhantomData,
        }
    }

    /// Every post
    pub fn all() -> Self {
        Self::scoped(None)
    }

    /// Posts filed under one category
    pub fn in_category(category_id: i64) -> Self {
        Self::scoped(Some(Condition::Category(category_id)))
    }

    /// Posts written by one user
    pub fn by_author(author_id: i64) -> Self {
        Self::scoped(Some(Condition::Author(author_id)))
    }

    /// A single post
    pub fn by_id(post_id: i64) -> Self {
        Self::scoped(Some(Condition::Id(post_id)))
    }

    /// `SELECT` of bare post rows in id order
    pub fn select_sql(&self) -> SqlStatement {
        let (where_sql, args) = self.where_clause();
        SqlStatement {
            sql: format!("SELECT {POST_COLUMNS} FROM {PLAIN_FROM}{where_sql} ORDER BY p.id"),
            args,
        }
    }
}

impl PostQuery<Annotated> {
    /// `SELECT` of annotated rows, newest publication first
    pub fn select_sql(&self) -> SqlStatement {
        let (where_sql, args) = self.where_clause();
        SqlStatement {
            sql: format!(
                "SELECT {POST_COLUMNS}, {META_COLUMNS} FROM {ANNOTATED_FROM}{where_sql} \
                 ORDER BY p.pub_date DESC, p.id DESC"
            ),
            args,
        }
    }

    /// One page of annotated rows
    pub fn page_sql(&self, params: &ListParams) -> SqlStatement {
        let mut statement = self.select_sql();
        statement.sql.push_str(" LIMIT ? OFFSET ?");
        statement.args.push(QueryArg::Int(params.limit()));
        statement.args.push(QueryArg::Int(params.offset()));
        statement
    }
}

impl<S> PostQuery<S> {
    /// Restrict to posts publicly visible at `now`. Applying it again moves
    /// the cut-off instead of stacking conditions.
    pub fn visible_at(mut self, now: DateTime<Utc>) -> Self {
        self.conditions
            .retain(|c| !matches!(c, Condition::VisibleAt(_)));
        self.conditions.push(Condition::VisibleAt(now));
        self
    }

    /// `SELECT COUNT(*)` over the same rows as the query
    pub fn count_sql(&self) -> SqlStatement {
        let (where_sql, args) = self.where_clause();
        SqlStatement {
            sql: format!("SELECT COUNT(*) FROM {PLAIN_FROM}{where_sql}"),
            args,
        }
    }

    fn where_clause(&self) -> (String, Vec<QueryArg>) {
        if self.conditions.is_empty() {
            return (String::new(), Vec::new());
        }

        // Scope first, visibility last, so the rendering is independent of
        // the order in which the transformations were applied.
        let mut conditions: Vec<&Condition> = self.conditions.iter().collect();
        conditions.sort_by_key(|c| matches!(c, Condition::VisibleAt(_)));

        let mut clauses = Vec::with_capacity(conditions.len());
        let mut args = Vec::new();
        for condition in conditions {
            match condition {
                Condition::Id(id) => {
                    clauses.push("p.id = ?");
                    args.push(QueryArg::Int(*id));
                }
                Condition::Category(id) => {
                    clauses.push("p.category_id = ?");
                    args.push(QueryArg::Int(*id));
                }
                Condition::Author(id) => {
                    clauses.push("p.author_id = ?");
                    args.push(QueryArg::Int(*id));
                }
                Condition::VisibleAt(now) => {
                    clauses.push("p.is_published = 1 AND p.pub_date <= ? AND c.is_published = 1");
                    args.push(QueryArg::Timestamp(*now));
                }
            }
        }

        (format!(" WHERE {}", clauses.join(" AND ")), args)
    }
}

/// Keep only posts that are publicly visible right now.
pub fn filter_visible<S>(query: PostQuery<S>) -> PostQuery<S> {
    query.visible_at(Utc::now())
}

/// Attach author, category, location and comment count, newest first.
pub fn with_comment_stats(query: PostQuery<Plain>) -> PostQuery<Annotated> {
    PostQuery {
        conditions: query.conditions,
        _state: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_plain_query_has_no_filter() {
        let statement = PostQuery::all().select_sql();
        assert!(!statement.sql.contains("WHERE"));
        assert!(statement.args.is_empty());
    }

    #[test]
    fn test_visibility_filter_clauses() {
        let now = fixed_now();
        let statement = PostQuery::in_category(7).visible_at(now).select_sql();

        assert!(statement.sql.contains("p.category_id = ?"));
        assert!(statement.sql.contains("p.is_published = 1"));
        assert!(statement.sql.contains("p.pub_date <= ?"));
        assert!(statement.sql.contains("c.is_published = 1"));
        assert_eq!(
            statement.args,
            vec![QueryArg::Int(7), QueryArg::Timestamp(now)]
        );
    }

    #[test]
    fn test_annotation_adds_relations_order_and_count() {
        let statement = with_comment_stats(PostQuery::by_author(2)).select_sql();

        assert!(statement.sql.contains("INNER JOIN users u"));
        assert!(statement.sql.contains("LEFT JOIN categories c"));
        assert!(statement.sql.contains("LEFT JOIN locations l"));
        assert!(statement.sql.contains("AS comment_count"));
        assert!(statement.sql.ends_with("ORDER BY p.pub_date DESC, p.id DESC"));
        assert_eq!(statement.args, vec![QueryArg::Int(2)]);
    }

    #[test]
    fn test_transformations_commute() {
        let now = fixed_now();
        let filtered_first = with_comment_stats(PostQuery::in_category(3).visible_at(now));
        let annotated_first = with_comment_stats(PostQuery::in_category(3)).visible_at(now);

        assert_eq!(filtered_first, annotated_first);
        assert_eq!(filtered_first.select_sql(), annotated_first.select_sql());
        assert_eq!(filtered_first.count_sql(), annotated_first.count_sql());
    }

    #[test]
    fn test_visibility_filter_is_idempotent() {
        let now = fixed_now();
        let later = now + chrono::Duration::hours(1);
        let query = PostQuery::all().visible_at(now).visible_at(later);

        assert_eq!(query.count_sql().args, vec![QueryArg::Timestamp(later)]);
    }

    #[test]
    fn test_page_sql_appends_limit_and_offset() {
        let query = with_comment_stats(PostQuery::all());
        let statement = query.page_sql(&ListParams::page(3));

        assert!(statement.sql.ends_with("LIMIT ? OFFSET ?"));
        assert_eq!(statement.args, vec![QueryArg::Int(10), QueryArg::Int(20)]);
    }

    #[test]
    fn test_count_sql_shares_filters() {
        let now = fixed_now();
        let query = with_comment_stats(PostQuery::by_author(4)).visible_at(now);
        let count = query.count_sql();

        assert!(count.sql.starts_with("SELECT COUNT(*) FROM posts p"));
        assert_eq!(count.args, query.select_sql().args);
    }
}
