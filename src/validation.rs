//! Field Validation
//! Mission: Collect per-field input errors before anything touches the store

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";

/// A body field that may be absent, explicitly `null`, or set.
///
/// `None` is an absent key, `Some(None)` is `null`. Pair with
/// `#[serde(default, deserialize_with = "validation::nullable")]`.
pub type Nullable<T> = Option<Option<T>>;

pub fn nullable<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Field name -> list of messages, rendered as `{"field": ["msg", ...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Hand back `value` if nothing was recorded, otherwise the collected errors.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Required text: trimmed, non-empty, at most `max_len` chars.
pub fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> String {
    match value.map(|v| v.trim().to_string()) {
        None => {
            errors.add(field, REQUIRED);
            String::new()
        }
        Some(v) if v.is_empty() => {
            errors.add(field, BLANK);
            v
        }
        Some(v) => {
            check_length(errors, field, &v, max_len);
            v
        }
    }
}

/// Required text that also rejects an explicit `null`.
pub fn required_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Nullable<String>,
    max_len: usize,
) -> String {
    match value {
        Some(None) => {
            errors.add(field, NULL);
            String::new()
        }
        value => required_text(errors, field, value.flatten(), max_len),
    }
}

/// Optional text: blank collapses to `None`.
pub fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Option<String> {
    let v = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
    check_length(errors, field, &v, max_len);
    Some(v)
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    if value.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
    }
}

/// Lowercases the domain part, leaves the local part alone.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_ascii_lowercase()),
        None => email.to_string(),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_reports_missing_and_blank() {
        let mut errors = FieldErrors::new();
        required_text(&mut errors, "name", None, 10);
        required_text(&mut errors, "title", Some("   ".to_string()), 10);

        assert_eq!(errors.get("name").unwrap(), [REQUIRED.to_string()]);
        assert_eq!(errors.get("title").unwrap(), [BLANK.to_string()]);
    }

    #[test]
    fn test_required_text_trims_and_limits_length() {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", Some("  Jo ".to_string()), 10);
        assert_eq!(name, "Jo");
        assert!(errors.is_empty());

        required_text(&mut errors, "name", Some("x".repeat(11)), 10);
        assert_eq!(errors.get("name").unwrap().len(), 1);
    }

    #[test]
    fn test_required_field_rejects_null() {
        let mut errors = FieldErrors::new();
        required_field(&mut errors, "name", Some(None), 10);
        required_field(&mut errors, "title", None, 10);
        let name = required_field(&mut errors, "label", Some(Some("Jo".to_string())), 10);

        assert_eq!(errors.get("name").unwrap(), [NULL.to_string()]);
        assert_eq!(errors.get("title").unwrap(), [REQUIRED.to_string()]);
        assert!(errors.get("label").is_none());
        assert_eq!(name, "Jo");
    }

    #[test]
    fn test_nullable_tells_null_from_absent() {
        #[derive(Debug, Default, Deserialize)]
        #[serde(default)]
        struct Body {
            #[serde(deserialize_with = "nullable")]
            age: Nullable<u32>,
        }

        let absent: Body = serde_json::from_str("{}").unwrap();
        let null: Body = serde_json::from_str(r#"{"age": null}"#).unwrap();
        let set: Body = serde_json::from_str(r#"{"age": 4}"#).unwrap();

        assert_eq!(absent.age, None);
        assert_eq!(null.age, Some(None));
        assert_eq!(set.age, Some(Some(4)));
    }

    #[test]
    fn test_optional_text_collapses_blank() {
        let mut errors = FieldErrors::new();
        assert_eq!(optional_text(&mut errors, "gender", Some(" ".to_string()), 5), None);
        assert_eq!(optional_text(&mut errors, "gender", None, 5), None);
        assert_eq!(
            optional_text(&mut errors, "gender", Some("F".to_string()), 5),
            Some("F".to_string())
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("alice@x"));
        assert!(!is_valid_email("alice@x..com"));
        assert!(!is_valid_email("al ice@x.com"));
        assert!(!is_valid_email("a@b@x.com"));
    }

    #[test]
    fn test_normalize_email_lowercases_domain_only() {
        assert_eq!(normalize_email(" Alice@X.COM "), "Alice@x.com");
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let mut errors = FieldErrors::new();
        errors.add("email", "bad");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "email": ["bad"] }));
    }
}
