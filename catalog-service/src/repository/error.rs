//! Repository error types
//!
//! Structured errors for repository operations: which operation failed, why,
//! and which entity (and field, for validation failures) was involved.

use std::fmt;

/// Repository operation types for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    FindById,
    FindFirst,
    Count,
    Slice,
    FindPage,
    Exists,
    Aggregate,
    Create,
    Update,
    Delete,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::FindFirst => write!(f, "find_first"),
            Self::Count => write!(f, "count"),
            Self::Slice => write!(f, "slice"),
            Self::FindPage => write!(f, "find_page"),
            Self::Exists => write!(f, "exists"),
            Self::Aggregate => write!(f, "aggregate"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Categories of repository errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found
    NotFound,
    /// A unique field collides with an existing record
    AlreadyExists,
    /// The operation would break a relation (e.g. deleting a referenced record)
    ConstraintViolation,
    /// Input references a missing record or is otherwise unacceptable
    ValidationFailed,
    /// The aggregate or predicate is not supported for this collection
    Unsupported,
    Internal,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    pub operation: RepositoryOperation,
    pub kind: RepositoryErrorKind,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    /// Payload field the failure is attributed to
    pub field: Option<String>,
}

impl RepositoryError {
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            field: None,
        }
    }

    pub fn not_found(entity_type: impl Into<String>, entity_id: impl ToString) -> Self {
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// A unique field collides with an existing record
    pub fn already_exists(
        operation: RepositoryOperation,
        entity_type: &str,
        field: &str,
    ) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::AlreadyExists,
            format!("{} with this {field} already exists.", entity_type.to_lowercase()),
        )
        .with_field(field)
    }

    /// A referenced id does not exist
    pub fn missing_reference(operation: RepositoryOperation, field: &str, id: impl fmt::Display) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::ValidationFailed,
            format!("Invalid pk \"{id}\" - object does not exist."),
        )
        .with_field(field)
    }

    pub fn constraint_violation(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    pub fn unsupported(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Unsupported, message)
    }

    #[must_use]
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl ToString) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{entity_type}: {entity_id}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RepositoryError::not_found("Product", 42);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Repository not_found error during find_by_id: Entity not found [Product: 42]"
        );
    }

    #[test]
    fn test_already_exists_names_field() {
        let err = RepositoryError::already_exists(RepositoryOperation::Create, "Category", "name");
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(err.field.as_deref(), Some("name"));
        assert_eq!(err.message, "category with this name already exists.");
    }

    #[test]
    fn test_missing_reference() {
        let err = RepositoryError::missing_reference(RepositoryOperation::Update, "category_id", 9);
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert_eq!(err.operation, RepositoryOperation::Update);
        assert_eq!(err.message, "Invalid pk \"9\" - object does not exist.");
    }
}
