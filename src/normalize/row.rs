//! Validated field map handed to the typed record constructors

use std::collections::BTreeMap;

use crate::schema::{EntityKind, FieldValue};

use super::errors::{RowValidationError, Violation};

/// Fields of one row after type parsing and checks.
///
/// Only declared fields are present; absent optional fields are missing
/// from the map rather than stored as `Null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    kind: EntityKind,
    values: BTreeMap<&'static str, FieldValue>,
}

impl NormalizedRow {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn set(&mut self, field: &'static str, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn int(&self, field: &str) -> Result<i64, RowValidationError> {
        self.opt_int(field)?
            .ok_or_else(|| RowValidationError::missing_field(self.kind, field))
    }

    pub fn opt_int(&self, field: &str) -> Result<Option<i64>, RowValidationError> {
        match self.values.get(field) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(self.mismatch(field, "int", other)),
        }
    }

    pub fn text(&self, field: &str) -> Result<String, RowValidationError> {
        self.opt_text(field)?
            .ok_or_else(|| RowValidationError::missing_field(self.kind, field))
    }

    pub fn opt_text(&self, field: &str) -> Result<Option<String>, RowValidationError> {
        match self.values.get(field) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Text(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.mismatch(field, "text", other)),
        }
    }

    pub fn boolean(&self, field: &str) -> Result<bool, RowValidationError> {
        match self.values.get(field) {
            None | Some(FieldValue::Null) => Err(RowValidationError::missing_field(self.kind, field)),
            Some(FieldValue::Bool(b)) => Ok(*b),
            Some(other) => Err(self.mismatch(field, "bool", other)),
        }
    }

    pub fn invalid_format(&self, field: &str, detail: impl Into<String>) -> RowValidationError {
        RowValidationError::new(self.kind, field, Violation::InvalidFormat, detail)
    }

    fn mismatch(&self, field: &str, expected: &str, got: &FieldValue) -> RowValidationError {
        RowValidationError::new(
            self.kind,
            field,
            Violation::TypeMismatch,
            format!("expected {}, got '{}'", expected, got),
        )
    }
}
