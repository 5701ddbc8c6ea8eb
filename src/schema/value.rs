//! Typed field values and row keys
//!
//! Ordering is deterministic: Null < Bool < Int < Text. Values of
//! different variants never compare equal, so there is no implicit
//! coercion anywhere a `FieldValue` is compared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed column value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Text(v.clone())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Primary key of a row: one value per primary-key column, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowKey(Vec<FieldValue>);

impl RowKey {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self(values)
    }

    /// Key of a single-column primary key
    pub fn single(value: FieldValue) -> Self {
        Self(vec![value])
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

impl From<FieldValue> for RowKey {
    fn from(v: FieldValue) -> Self {
        RowKey::single(v)
    }
}

impl From<i64> for RowKey {
    fn from(v: i64) -> Self {
        RowKey::single(v.into())
    }
}

impl From<i32> for RowKey {
    fn from(v: i32) -> Self {
        RowKey::single(v.into())
    }
}

impl From<&str> for RowKey {
    fn from(v: &str) -> Self {
        RowKey::single(v.into())
    }
}

impl From<String> for RowKey {
    fn from(v: String) -> Self {
        RowKey::single(v.into())
    }
}

impl<A: Into<FieldValue>, B: Into<FieldValue>> From<(A, B)> for RowKey {
    fn from((a, b): (A, B)) -> Self {
        RowKey(vec![a.into(), b.into()])
    }
}

impl<A: Into<FieldValue>, B: Into<FieldValue>, C: Into<FieldValue>> From<(A, B, C)> for RowKey {
    fn from((a, b, c): (A, B, C)) -> Self {
        RowKey(vec![a.into(), b.into(), c.into()])
    }
}

impl<A, B, C, D> From<(A, B, C, D)> for RowKey
where
    A: Into<FieldValue>,
    B: Into<FieldValue>,
    C: Into<FieldValue>,
    D: Into<FieldValue>,
{
    fn from((a, b, c, d): (A, B, C, D)) -> Self {
        RowKey(vec![a.into(), b.into(), c.into(), d.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_across_variants() {
        assert!(FieldValue::Null < FieldValue::Bool(false));
        assert!(FieldValue::Bool(true) < FieldValue::Int(-5));
        assert!(FieldValue::Int(i64::MAX) < FieldValue::Text(String::new()));
    }

    #[test]
    fn test_no_cross_type_equality() {
        assert_ne!(FieldValue::Int(3001), FieldValue::Text("3001".into()));
    }

    #[test]
    fn test_row_key_display() {
        let key = RowKey::from((7i64, "3001", 4i64, false));
        assert_eq!(key.to_string(), "7/3001/4/false");
        assert_eq!(RowKey::from("3001").to_string(), "3001");
    }

    #[test]
    fn test_option_into_null() {
        let none: Option<i64> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(5i64)), FieldValue::Int(5));
    }
}
