//! Schema registry error types
//!
//! Error codes:
//! - BRICK_SCHEMA_CYCLE (FATAL)
//! - BRICK_SCHEMA_UNKNOWN_FIELD (FATAL)
//! - BRICK_SCHEMA_UNKNOWN_TARGET (FATAL)
//! - BRICK_SCHEMA_DUPLICATE_KIND (FATAL)
//!
//! Every schema error is a defect in the table declarations, never in the
//! data, so every one of them is fatal at registry construction.

use std::fmt;

use super::types::EntityKind;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Foreign-key graph (hierarchical edges excluded) contains a cycle
    BrickSchemaCycle,
    /// Primary key or foreign key names a field the table does not declare
    BrickSchemaUnknownField,
    /// Foreign key targets a kind absent from the registry
    BrickSchemaUnknownTarget,
    /// The same kind is declared twice
    BrickSchemaDuplicateKind,
}

impl SchemaErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::BrickSchemaCycle => "BRICK_SCHEMA_CYCLE",
            SchemaErrorCode::BrickSchemaUnknownField => "BRICK_SCHEMA_UNKNOWN_FIELD",
            SchemaErrorCode::BrickSchemaUnknownTarget => "BRICK_SCHEMA_UNKNOWN_TARGET",
            SchemaErrorCode::BrickSchemaDuplicateKind => "BRICK_SCHEMA_DUPLICATE_KIND",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with the kinds involved
#[derive(Debug)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    kinds: Vec<EntityKind>,
}

impl SchemaError {
    /// The foreign-key graph between `kinds` has no valid load order
    pub fn schema_cycle(kinds: Vec<EntityKind>) -> Self {
        let names: Vec<&str> = kinds.iter().map(|k| k.table_name()).collect();
        Self {
            code: SchemaErrorCode::BrickSchemaCycle,
            message: format!("foreign-key cycle between tables [{}]", names.join(", ")),
            kinds,
        }
    }

    pub fn unknown_field(kind: EntityKind, field: &str) -> Self {
        Self {
            code: SchemaErrorCode::BrickSchemaUnknownField,
            message: format!("table '{}' declares no field '{}'", kind, field),
            kinds: vec![kind],
        }
    }

    pub fn unknown_target(kind: EntityKind, field: &str, target: EntityKind) -> Self {
        Self {
            code: SchemaErrorCode::BrickSchemaUnknownTarget,
            message: format!(
                "foreign key '{}.{}' targets unregistered table '{}'",
                kind, field, target
            ),
            kinds: vec![kind, target],
        }
    }

    pub fn duplicate_kind(kind: EntityKind) -> Self {
        Self {
            code: SchemaErrorCode::BrickSchemaDuplicateKind,
            message: format!("table '{}' declared more than once", kind),
            kinds: vec![kind],
        }
    }

    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Kinds involved in the error (cycle members for `BRICK_SCHEMA_CYCLE`)
    pub fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }

    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::BrickSchemaCycle.code(), "BRICK_SCHEMA_CYCLE");
        assert_eq!(SchemaErrorCode::BrickSchemaUnknownTarget.code(), "BRICK_SCHEMA_UNKNOWN_TARGET");
    }

    #[test]
    fn test_cycle_display_names_tables() {
        let err = SchemaError::schema_cycle(vec![EntityKind::Set, EntityKind::Theme]);
        let display = err.to_string();
        assert!(display.contains("BRICK_SCHEMA_CYCLE"));
        assert!(display.contains("sets"));
        assert!(display.contains("themes"));
        assert!(err.is_fatal());
    }
}
