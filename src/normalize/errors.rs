//! Row validation errors
//!
//! A `RowValidationError` rejects exactly one row. It never aborts a
//! rebuild on its own; the pipeline records it in the rejection report.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::EntityKind;

/// What was wrong with the offending field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// Required field absent, null or empty
    MissingField,
    /// Value cannot be read as the declared field type
    TypeMismatch,
    /// Int checked `Positive` was zero or negative
    NonPositive,
    /// Text longer than its declared maximum
    TooLong,
    /// Text does not match its declared format
    InvalidFormat,
}

impl Violation {
    /// Reason code used in rejection reports
    pub fn code(&self) -> &'static str {
        match self {
            Violation::MissingField => "missing_field",
            Violation::TypeMismatch => "type_mismatch",
            Violation::NonPositive => "non_positive",
            Violation::TooLong => "too_long",
            Violation::InvalidFormat => "invalid_format",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A raw row failed field validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowValidationError {
    kind: EntityKind,
    field: String,
    violation: Violation,
    detail: String,
}

impl RowValidationError {
    pub fn new(
        kind: EntityKind,
        field: impl Into<String>,
        violation: Violation,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            violation,
            detail: detail.into(),
        }
    }

    pub fn missing_field(kind: EntityKind, field: &str) -> Self {
        Self::new(kind, field, Violation::MissingField, "required field is absent")
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn violation(&self) -> Violation {
        self.violation
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for RowValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: {} ({})",
            self.kind, self.field, self.violation, self.detail
        )
    }
}

impl std::error::Error for RowValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_table_field_and_reason() {
        let err = RowValidationError::new(
            EntityKind::InventoryPart,
            "quantity",
            Violation::NonPositive,
            "got 0",
        );
        assert_eq!(err.to_string(), "inventory_parts.quantity: non_positive (got 0)");
    }

    #[test]
    fn test_violation_serializes_as_code() {
        let json = serde_json::to_string(&Violation::TypeMismatch).unwrap();
        assert_eq!(json, "\"type_mismatch\"");
    }
}
