//! Field predicates
//!
//! Filters rows strictly according to predicates, AND semantics.
//! No type coercion: an int never equals its text rendering. A null field
//! only ever matches `IsNull`.

use crate::record::Entity;
use crate::schema::{schema_for, EntityKind, FieldValue};

use super::errors::{QueryError, QueryResult};

/// Filter operation types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq(FieldValue),
    Ne(FieldValue),
    Gt(FieldValue),
    Gte(FieldValue),
    Lt(FieldValue),
    Lte(FieldValue),
    In(Vec<FieldValue>),
    IsNull,
    NotNull,
}

impl FilterOp {
    pub fn is_equality(&self) -> bool {
        matches!(self, FilterOp::Eq(_))
    }

    /// Returns the operation name for diagnostics
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "eq",
            FilterOp::Ne(_) => "ne",
            FilterOp::Gt(_) => "gt",
            FilterOp::Gte(_) => "gte",
            FilterOp::Lt(_) => "lt",
            FilterOp::Lte(_) => "lte",
            FilterOp::In(_) => "in",
            FilterOp::IsNull => "is_null",
            FilterOp::NotNull => "not_null",
        }
    }
}

/// A single predicate (field + operation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub op: FilterOp,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    /// Whether `value` (the row's value for `self.field`) satisfies the predicate
    pub fn accepts(&self, value: &FieldValue) -> bool {
        if value.is_null() {
            return matches!(self.op, FilterOp::IsNull);
        }

        match &self.op {
            FilterOp::Eq(expected) => value == expected,
            FilterOp::Ne(expected) => value != expected,
            FilterOp::Gt(bound) => same_type(value, bound) && value > bound,
            FilterOp::Gte(bound) => same_type(value, bound) && value >= bound,
            FilterOp::Lt(bound) => same_type(value, bound) && value < bound,
            FilterOp::Lte(bound) => same_type(value, bound) && value <= bound,
            FilterOp::In(options) => options.contains(value),
            FilterOp::IsNull => false,
            FilterOp::NotNull => true,
        }
    }
}

fn same_type(a: &FieldValue, b: &FieldValue) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Conjunction of predicates
///
/// ```ignore
/// let filter = Filter::new().eq("theme_id", 158).gte("year", 2000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.and(Predicate::new(field, FilterOp::Eq(value.into())))
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.and(Predicate::new(field, FilterOp::Ne(value.into())))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.and(Predicate::new(field, FilterOp::Gt(value.into())))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.and(Predicate::new(field, FilterOp::Gte(value.into())))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.and(Predicate::new(field, FilterOp::Lt(value.into())))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.and(Predicate::new(field, FilterOp::Lte(value.into())))
    }

    pub fn is_in<V: Into<FieldValue>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.and(Predicate::new(field, FilterOp::In(values)))
    }

    pub fn is_null(self, field: impl Into<String>) -> Self {
        self.and(Predicate::new(field, FilterOp::IsNull))
    }

    pub fn not_null(self, field: impl Into<String>) -> Self {
        self.and(Predicate::new(field, FilterOp::NotNull))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Fails with `UnknownField` if a predicate names an undeclared field
    pub fn validate(&self, kind: EntityKind) -> QueryResult<()> {
        let schema = schema_for(kind);
        for predicate in &self.predicates {
            if schema.field(&predicate.field).is_none() {
                return Err(QueryError::UnknownField {
                    kind,
                    field: predicate.field.clone(),
                });
            }
        }
        Ok(())
    }

    /// Checks if a row matches all predicates
    pub fn matches<T: Entity>(&self, row: &T) -> bool {
        self.predicates.iter().all(|predicate| {
            row.field(&predicate.field)
                .map_or(false, |value| predicate.accepts(&value))
        })
    }

    /// Equality predicates, candidates for driving an index lookup
    pub(crate) fn equalities(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.predicates.iter().filter_map(|p| match &p.op {
            FilterOp::Eq(value) => Some((p.field.as_str(), value)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Set, Theme};

    fn falcon() -> Set {
        Set {
            set_num: "10179-1".into(),
            name: "Millennium Falcon".into(),
            year: 2007,
            theme_id: 171,
            num_parts: 5197,
        }
    }

    #[test]
    fn test_equality_match() {
        assert!(Filter::new().eq("year", 2007).matches(&falcon()));
        assert!(!Filter::new().eq("year", 2008).matches(&falcon()));
    }

    #[test]
    fn test_no_type_coercion() {
        assert!(!Filter::new().eq("year", "2007").matches(&falcon()));
        assert!(!Filter::new().gt("year", "1999").matches(&falcon()));
        assert!(!Filter::new().eq("set_num", 10179).matches(&falcon()));
    }

    #[test]
    fn test_range_and_conjunction() {
        let filter = Filter::new().gte("year", 2000).lt("year", 2010).gt("num_parts", 5000);
        assert!(filter.matches(&falcon()));
        assert!(!filter.clone().lte("num_parts", 100).matches(&falcon()));
    }

    #[test]
    fn test_in_and_ne() {
        assert!(Filter::new().is_in("theme_id", [158, 171]).matches(&falcon()));
        assert!(!Filter::new().is_in("theme_id", [1, 2]).matches(&falcon()));
        assert!(Filter::new().ne("name", "Death Star").matches(&falcon()));
    }

    #[test]
    fn test_null_handling() {
        let root = Theme {
            id: 158,
            name: "Star Wars".into(),
            parent_id: None,
        };
        assert!(Filter::new().is_null("parent_id").matches(&root));
        assert!(!Filter::new().not_null("parent_id").matches(&root));
        assert!(!Filter::new().ne("parent_id", 1).matches(&root));
        assert!(!Filter::new().lt("parent_id", 1000).matches(&root));
    }

    #[test]
    fn test_unknown_field_never_matches_and_fails_validation() {
        let filter = Filter::new().eq("colour", 4);
        assert!(!filter.matches(&falcon()));
        assert!(matches!(
            filter.validate(EntityKind::Set),
            Err(QueryError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().is_empty());
        assert!(Filter::new().matches(&falcon()));
    }
}
