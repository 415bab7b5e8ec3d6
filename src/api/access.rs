//! Access-control predicates used by the handlers

use chrono::{DateTime, Utc};

use crate::api::error::ViewError;
use crate::models::{Owned, PostWithMeta, User};

/// Allow the action only to the resource's author; everyone else is sent
/// to `redirect_to`.
pub fn require_owner<T: Owned>(resource: &T, user: &User, redirect_to: String) -> Result<(), ViewError> {
    if resource.is_owned_by(user.id) {
        return Ok(());
    }
    tracing::warn!(
        "User {} denied access to a resource of user {}",
        user.id,
        resource.author_id()
    );
    Err(ViewError::SoftDenied { redirect_to })
}

/// Whether the detail page of `post` may be shown.
///
/// Authors always see their own posts. Others see a post once it is
/// published and its publication date has passed; the category flag is not
/// consulted here.
pub fn can_view_post(post: &PostWithMeta, viewer: Option<&User>, now: DateTime<Utc>) -> bool {
    if viewer.is_some_and(|user| post.is_owned_by(user.id)) {
        return true;
    }
    post.post.is_released_at(now)
}

/// Detail page URL of a post
pub fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

/// Profile page URL of a user
pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthorSummary, CategorySummary, Comment, Post};
    use chrono::Duration;
    use proptest::prelude::*;

    fn user(id: i64) -> User {
        let mut user = User::new(format!("user{}", id), String::new(), String::new());
        user.id = id;
        user
    }

    fn post(author_id: i64, is_published: bool, pub_date: DateTime<Utc>) -> PostWithMeta {
        PostWithMeta {
            post: Post {
                id: 1,
                title: "Title".to_string(),
                text: "Text".to_string(),
                pub_date,
                author_id,
                location_id: None,
                category_id: Some(1),
                image: None,
                is_published,
                created_at: pub_date,
            },
            author: AuthorSummary {
                id: author_id,
                username: format!("user{}", author_id),
                first_name: String::new(),
                last_name: String::new(),
            },
            category: Some(CategorySummary {
                id: 1,
                title: "Travel".to_string(),
                slug: "travel".to_string(),
                is_published: false,
            }),
            location: None,
            comment_count: 0,
        }
    }

    #[test]
    fn test_require_owner() {
        let comment = Comment {
            id: 5,
            text: "hi".to_string(),
            post_id: Some(3),
            author_id: 1,
            created_at: Utc::now(),
        };

        assert!(require_owner(&comment, &user(1), post_url(3)).is_ok());
        match require_owner(&comment, &user(2), post_url(3)) {
            Err(ViewError::SoftDenied { redirect_to }) => assert_eq!(redirect_to, "/posts/3/"),
            other => panic!("expected SoftDenied, got {:?}", other),
        }
    }

    #[test]
    fn test_author_sees_unreleased_post() {
        let now = Utc::now();
        let scheduled = post(1, true, now + Duration::days(1));
        let hidden = post(1, false, now - Duration::days(1));

        for p in [&scheduled, &hidden] {
            assert!(can_view_post(p, Some(&user(1)), now));
            assert!(!can_view_post(p, Some(&user(2)), now));
            assert!(!can_view_post(p, None, now));
        }
    }

    #[test]
    fn test_released_post_ignores_category_flag() {
        let now = Utc::now();
        let released = post(1, true, now - Duration::hours(1));

        assert!(can_view_post(&released, None, now));
    }

    #[test]
    fn test_profile_url_encodes_username() {
        assert_eq!(profile_url("anna"), "/profile/anna/");
        assert_eq!(profile_url("a b"), "/profile/a%20b/");
    }

    proptest! {
        #[test]
        fn prop_strangers_see_only_released(
            is_published in proptest::bool::ANY,
            offset_minutes in -10_000i64..10_000,
        ) {
            let now = Utc::now();
            let p = post(1, is_published, now + Duration::minutes(offset_minutes));
            let expected = is_published && offset_minutes <= 0;
            prop_assert_eq!(can_view_post(&p, Some(&user(2)), now), expected);
            prop_assert_eq!(can_view_post(&p, None, now), expected);
            prop_assert!(can_view_post(&p, Some(&user(1)), now));
        }
    }
}
