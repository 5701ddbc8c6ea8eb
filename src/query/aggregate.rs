//! Group-by aggregation

use serde::Serialize;
use std::collections::BTreeMap;

use crate::record::Entity;
use crate::schema::{schema_for, EntityKind, FieldType, FieldValue};

use super::errors::{QueryError, QueryResult};

/// How each group is reduced to one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reducer {
    /// Number of rows in the group
    Count,
    /// Sum of an integer field
    Sum(String),
    /// Smallest non-null value of a field
    Min(String),
    /// Largest non-null value of a field
    Max(String),
}

impl Reducer {
    pub fn count() -> Self {
        Reducer::Count
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Reducer::Sum(field.into())
    }

    pub fn min(field: impl Into<String>) -> Self {
        Reducer::Min(field.into())
    }

    pub fn max(field: impl Into<String>) -> Self {
        Reducer::Max(field.into())
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Reducer::Count => None,
            Reducer::Sum(f) | Reducer::Min(f) | Reducer::Max(f) => Some(f),
        }
    }
}

/// One output row: the group key values and the reduced value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRow {
    pub group: Vec<FieldValue>,
    pub value: FieldValue,
}

enum Accumulator {
    Count(i64),
    Sum(i64),
    Min(Option<FieldValue>),
    Max(Option<FieldValue>),
}

impl Accumulator {
    fn new(reducer: &Reducer) -> Self {
        match reducer {
            Reducer::Count => Accumulator::Count(0),
            Reducer::Sum(_) => Accumulator::Sum(0),
            Reducer::Min(_) => Accumulator::Min(None),
            Reducer::Max(_) => Accumulator::Max(None),
        }
    }

    fn add(&mut self, value: Option<FieldValue>) {
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::Sum(total) => {
                if let Some(FieldValue::Int(v)) = value {
                    *total = total.saturating_add(v);
                }
            }
            Accumulator::Min(current) => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    if current.as_ref().map_or(true, |c| v < *c) {
                        *current = Some(v);
                    }
                }
            }
            Accumulator::Max(current) => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    if current.as_ref().map_or(true, |c| v > *c) {
                        *current = Some(v);
                    }
                }
            }
        }
    }

    fn finish(self) -> FieldValue {
        match self {
            Accumulator::Count(n) | Accumulator::Sum(n) => FieldValue::Int(n),
            Accumulator::Min(v) | Accumulator::Max(v) => v.unwrap_or(FieldValue::Null),
        }
    }
}

fn check_field(kind: EntityKind, field: &str) -> QueryResult<FieldType> {
    schema_for(kind)
        .field(field)
        .map(|def| def.field_type)
        .ok_or_else(|| QueryError::UnknownField {
            kind,
            field: field.to_string(),
        })
}

/// Reduce `rows` grouped by `group_by`, sorted by group key.
///
/// An empty `group_by` yields one row over everything (even with no rows).
pub(crate) fn aggregate<'c, T: Entity>(
    kind: EntityKind,
    rows: impl Iterator<Item = &'c T>,
    group_by: &[&str],
    reducer: &Reducer,
) -> QueryResult<Vec<AggregateRow>> {
    for field in group_by {
        check_field(kind, field)?;
    }
    if let Some(field) = reducer.field() {
        let field_type = check_field(kind, field)?;
        if matches!(reducer, Reducer::Sum(_)) && field_type != FieldType::Int {
            return Err(QueryError::NotNumeric {
                kind,
                field: field.to_string(),
            });
        }
    }

    let mut groups: BTreeMap<Vec<FieldValue>, Accumulator> = BTreeMap::new();
    if group_by.is_empty() {
        groups.insert(Vec::new(), Accumulator::new(reducer));
    }

    for row in rows {
        let key: Vec<FieldValue> = group_by
            .iter()
            .map(|f| row.field(f).unwrap_or(FieldValue::Null))
            .collect();
        let value = reducer.field().and_then(|f| row.field(f));
        groups
            .entry(key)
            .or_insert_with(|| Accumulator::new(reducer))
            .add(value);
    }

    Ok(groups
        .into_iter()
        .map(|(group, acc)| AggregateRow {
            group,
            value: acc.finish(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InventoryPart;

    fn lines() -> Vec<InventoryPart> {
        let line = |inventory_id, part_num: &str, color_id, quantity, is_spare| InventoryPart {
            inventory_id,
            part_num: part_num.into(),
            color_id,
            quantity,
            is_spare,
        };
        vec![
            line(1, "3001", 4, 3, false),
            line(1, "3001", 1, 2, false),
            line(1, "3003", 4, 5, false),
            line(2, "3001", 4, 1, true),
        ]
    }

    #[test]
    fn test_sum_per_color_sorted_by_group() {
        let rows = lines();
        let result = aggregate(
            EntityKind::InventoryPart,
            rows.iter(),
            &["color_id"],
            &Reducer::sum("quantity"),
        )
        .unwrap();
        assert_eq!(
            result,
            vec![
                AggregateRow { group: vec![FieldValue::Int(1)], value: FieldValue::Int(2) },
                AggregateRow { group: vec![FieldValue::Int(4)], value: FieldValue::Int(9) },
            ]
        );
    }

    #[test]
    fn test_count_min_max() {
        let rows = lines();
        let count = aggregate(EntityKind::InventoryPart, rows.iter(), &["inventory_id"], &Reducer::count()).unwrap();
        assert_eq!(count[0].value, FieldValue::Int(3));
        assert_eq!(count[1].value, FieldValue::Int(1));

        let max = aggregate(EntityKind::InventoryPart, rows.iter(), &[], &Reducer::max("quantity")).unwrap();
        assert_eq!(max, vec![AggregateRow { group: vec![], value: FieldValue::Int(5) }]);

        let min = aggregate(EntityKind::InventoryPart, rows.iter(), &[], &Reducer::min("part_num")).unwrap();
        assert_eq!(min[0].value, FieldValue::Text("3001".into()));
    }

    #[test]
    fn test_empty_input_without_grouping() {
        let rows: Vec<InventoryPart> = Vec::new();
        let result = aggregate(EntityKind::InventoryPart, rows.iter(), &[], &Reducer::count()).unwrap();
        assert_eq!(result, vec![AggregateRow { group: vec![], value: FieldValue::Int(0) }]);
    }

    #[test]
    fn test_invalid_fields() {
        let rows = lines();
        assert!(matches!(
            aggregate(EntityKind::InventoryPart, rows.iter(), &["colour"], &Reducer::count()),
            Err(QueryError::UnknownField { .. })
        ));
        assert!(matches!(
            aggregate(EntityKind::InventoryPart, rows.iter(), &[], &Reducer::sum("part_num")),
            Err(QueryError::NotNumeric { .. })
        ));
    }
}
