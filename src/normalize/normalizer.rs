//! Raw row to typed record conversion
//!
//! Pure and stateless: the same raw row always yields the same record or
//! the same error, so rows may be normalized in any order.

use serde_json::Value;

use crate::record::Record;
use crate::schema::{EntityKind, EntitySchema, FieldCheck, FieldDef, FieldType, FieldValue, SchemaRegistry};

use super::errors::{RowValidationError, Violation};
use super::row::NormalizedRow;

/// A raw dataset row: field name to loosely typed value
pub type RawRow = serde_json::Map<String, Value>;

/// Converts raw rows into typed records using a schema registry
#[derive(Debug, Clone, Copy)]
pub struct RowNormalizer<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> RowNormalizer<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Normalizer over the built-in catalog tables
    pub fn catalog() -> RowNormalizer<'static> {
        RowNormalizer::new(SchemaRegistry::catalog())
    }

    /// Validate `raw` against the schema of `kind` and build its record.
    ///
    /// Fields the schema does not declare are ignored.
    pub fn normalize(&self, kind: EntityKind, raw: &RawRow) -> Result<Record, RowValidationError> {
        let row = self.normalize_fields(kind, raw)?;
        Record::from_row(kind, &row)
    }

    /// Type-parse and check every declared field, without building a record
    pub fn normalize_fields(
        &self,
        kind: EntityKind,
        raw: &RawRow,
    ) -> Result<NormalizedRow, RowValidationError> {
        let schema = self.registry.schema(kind);
        let mut row = NormalizedRow::new(kind);

        for def in schema.fields {
            match parse_field(schema, def, raw.get(def.name))? {
                Some(value) => {
                    check_field(schema, def, &value)?;
                    row.set(def.name, value);
                }
                None if def.required => {
                    return Err(RowValidationError::missing_field(kind, def.name));
                }
                None => {}
            }
        }

        Ok(row)
    }
}

/// Parse one raw value to its declared type. `Ok(None)` means absent.
fn parse_field(
    schema: &EntitySchema,
    def: &FieldDef,
    raw: Option<&Value>,
) -> Result<Option<FieldValue>, RowValidationError> {
    let value = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.is_empty() => return Ok(None),
        Some(v) => v,
    };

    let parsed = match def.field_type {
        FieldType::Int => parse_int(value),
        FieldType::Text => value.as_str().map(|s| FieldValue::Text(s.to_string())),
        FieldType::Code => match value {
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(|i| FieldValue::Text(i.to_string())),
            _ => None,
        },
        FieldType::Bool => parse_bool(value),
    };

    parsed.map(Some).ok_or_else(|| {
        RowValidationError::new(
            schema.kind,
            def.name,
            Violation::TypeMismatch,
            format!("expected {}, got {}", def.field_type.type_name(), value),
        )
    })
}

/// Strict base-10: JSON integers, or text of an optional '-' and digits
fn parse_int(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Number(n) => n.as_i64().map(FieldValue::Int),
        Value::String(s) => {
            let digits = s.strip_prefix('-').unwrap_or(s);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse::<i64>().ok().map(FieldValue::Int)
        }
        _ => None,
    }
}

fn parse_bool(value: &Value) -> Option<FieldValue> {
    let b = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_i64() {
            Some(0) => false,
            Some(1) => true,
            _ => return None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => true,
            "false" | "f" | "0" | "no" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(FieldValue::Bool(b))
}

fn check_field(
    schema: &EntitySchema,
    def: &FieldDef,
    value: &FieldValue,
) -> Result<(), RowValidationError> {
    let fail = |violation, detail: String| {
        Err(RowValidationError::new(schema.kind, def.name, violation, detail))
    };

    for check in def.checks {
        match (check, value) {
            (FieldCheck::Positive, FieldValue::Int(v)) if *v <= 0 => {
                return fail(Violation::NonPositive, format!("got {}", v));
            }
            (FieldCheck::MaxLen(max), FieldValue::Text(s)) => {
                let len = s.chars().count();
                if len > *max {
                    return fail(Violation::TooLong, format!("{} chars, max {}", len, max));
                }
            }
            (FieldCheck::HexRgb, FieldValue::Text(s)) => {
                if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return fail(Violation::InvalidFormat, format!("'{}' is not six hex digits", s));
                }
            }
            (FieldCheck::OneOf(allowed), FieldValue::Text(s)) => {
                if !allowed.contains(&s.as_str()) {
                    return fail(
                        Violation::InvalidFormat,
                        format!("'{}' not one of [{}]", s, allowed.join(", ")),
                    );
                }
            }
            _ => {}
        }
    }
    Ok(())
}
