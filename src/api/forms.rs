//! Form and query-string helpers shared by the views

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::error::ViewError;
use crate::models::ListParams;
use crate::services::UserServiceError;

/// Key used for errors that belong to the whole form
pub const NON_FIELD: &str = "non_field";

/// Field-level error messages, exposed to templates as `errors`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, String>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

/// Account form errors; failures that no form can show propagate
pub fn user_form_errors(e: UserServiceError) -> Result<FormErrors, ViewError> {
    match e {
        UserServiceError::ValidationError { field, message } => {
            Ok(FormErrors::single(field, message))
        }
        UserServiceError::UserExists(_) => Ok(FormErrors::single(
            "username",
            "A user with that username already exists.",
        )),
        UserServiceError::AuthenticationError(message) => {
            Ok(FormErrors::single(NON_FIELD, message))
        }
        other => Err(other.into()),
    }
}

/// Parse the value of a `datetime-local` input (`YYYY-MM-DDTHH:MM[:SS]`),
/// read as UTC. Full RFC 3339 timestamps are accepted as well.
pub fn parse_pub_date(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("This field is required.".to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    Err("Enter a valid date/time.".to_string())
}

/// Value for a `datetime-local` input
pub fn format_pub_date(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M").to_string()
}

/// `?page=N` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Listing parameters for the requested page. Anything other than a
    /// positive integer is a missing page.
    pub fn list_params(&self) -> Result<ListParams, ViewError> {
        match self.page.as_deref() {
            None => Ok(ListParams::default()),
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(page) if page >= 1 => Ok(ListParams::page(page)),
                _ => Err(ViewError::NotFound),
            },
        }
    }
}

/// `?next=` target after login; only local paths are honoured
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

/// Route ids are matched as strings so a non-numeric id is a plain 404
pub fn parse_id(raw: &str) -> Result<i64, ViewError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(ViewError::NotFound)
}

/// Optional id from a select box; empty means none
pub fn parse_optional_id(raw: &str) -> Result<Option<i64>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| "Select a valid choice.".to_string())
}

/// HTML checkboxes submit "on" when ticked and nothing otherwise
pub fn checkbox(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != "false" && v != "0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_pub_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

        assert_eq!(parse_pub_date("2024-05-01T09:30").unwrap(), expected);
        assert_eq!(parse_pub_date("2024-05-01T09:30:00").unwrap(), expected);
        assert_eq!(parse_pub_date("2024-05-01 09:30").unwrap(), expected);
        assert_eq!(parse_pub_date("2024-05-01T09:30:00Z").unwrap(), expected);
        assert_eq!(parse_pub_date("2024-05-01T11:30:00+02:00").unwrap(), expected);
    }

    #[test]
    fn test_parse_pub_date_errors() {
        assert!(parse_pub_date("").is_err());
        assert!(parse_pub_date("yesterday").is_err());
        assert!(parse_pub_date("2024-13-01T09:30").is_err());
    }

    #[test]
    fn test_format_pub_date_round_trips_to_minutes() {
        let value = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 45).unwrap();
        let formatted = format_pub_date(value);

        assert_eq!(formatted, "2024-05-01T09:30");
        assert_eq!(
            parse_pub_date(&formatted).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_page_query() {
        let page = |raw: Option<&str>| PageQuery {
            page: raw.map(str::to_string),
        };

        assert_eq!(page(None).list_params().unwrap().page, 1);
        assert_eq!(page(Some("3")).list_params().unwrap().page, 3);
        for bad in ["0", "-1", "abc", "", "last"] {
            assert!(
                matches!(page(Some(bad)).list_params(), Err(ViewError::NotFound)),
                "page {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/posts/1/")), Some("/posts/1/"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example/")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(ViewError::NotFound)));
        assert!(matches!(parse_id("0"), Err(ViewError::NotFound)));
    }

    #[test]
    fn test_form_errors_keep_first_message() {
        let mut errors = FormErrors::new();
        assert!(errors.is_empty());

        errors.add("title", "first");
        errors.add("title", "second");

        assert_eq!(errors.get("title"), Some("first"));
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"title": "first"})
        );
    }

    #[test]
    fn test_user_form_errors() {
        let errors = user_form_errors(UserServiceError::UserExists("anna".into())).unwrap();
        assert!(errors.get("username").is_some());

        let errors = user_form_errors(UserServiceError::ValidationError {
            field: "email",
            message: "Enter a valid email address.".into(),
        })
        .unwrap();
        assert_eq!(errors.get("email"), Some("Enter a valid email address."));

        assert!(matches!(
            user_form_errors(UserServiceError::NotFound),
            Err(ViewError::NotFound)
        ));
    }

    #[test]
    fn test_checkbox() {
        assert!(checkbox(Some("on")));
        assert!(checkbox(Some("true")));
        assert!(!checkbox(Some("")));
        assert!(!checkbox(None));
    }
}
