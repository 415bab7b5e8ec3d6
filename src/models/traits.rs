//! Behaviour shared by several entities

/// Entities carrying a publication flag.
///
/// Categories, locations and posts all implement it; hidden entities drop
/// out of public pages.
pub trait Published {
    fn is_published(&self) -> bool;
}

/// Entities owned by a single author.
pub trait Owned {
    fn author_id(&self) -> i64;

    /// Whether `user_id` is the owner
    fn is_owned_by(&self, user_id: i64) -> bool {
        self.author_id() == user_id
    }
}

/// Shorten `text` to at most `max` characters for display.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("Путешествие по Лиссабону", 11), "Путешествие");
        assert_eq!(truncate_chars("short", 20), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
