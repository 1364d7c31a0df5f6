use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field constraints of a write payload, checked before it reaches a repository
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// Field-level validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for a single failing field
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn required(&mut self, field: &str) {
        self.add(field, "This field is required.");
    }

    /// Reject blank text and text longer than `max` characters
    pub fn check_text(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.add(field, "This field may not be blank.");
        } else {
            self.check_max_length(field, value, max);
        }
    }

    /// Reject text longer than `max` characters; blank is accepted
    pub fn check_max_length(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_per_field() {
        let mut errors = FieldErrors::new();
        errors.required("name");
        errors.check_text("caption", &"x".repeat(201), 200);
        errors.check_text("title", "   ", 10);

        assert_eq!(errors.get("name").unwrap(), ["This field is required."]);
        assert_eq!(
            errors.get("caption").unwrap(),
            ["Ensure this field has no more than 200 characters."]
        );
        assert_eq!(errors.get("title").unwrap(), ["This field may not be blank."]);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut errors = FieldErrors::new();
        errors.check_text("name", &"é".repeat(10), 10);
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let errors = FieldErrors::single("tag_ids", "Invalid pk \"9\" - object does not exist.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"tag_ids": ["Invalid pk \"9\" - object does not exist."]})
        );
    }
}
