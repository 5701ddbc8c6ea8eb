//! Typed entity handles over a pinned generation
//!
//! A `Catalog` pins one generation for as long as it lives. Everything it
//! hands out borrows from that generation, so results never mix data from
//! two generations.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::observability::metrics;
use crate::record::Entity;
use crate::schema::{schema_for, FieldValue, RowKey};
use crate::storage::{Generation, GenerationId, RowOrdinal, StorageEngine, Table};

use super::aggregate::{aggregate, AggregateRow, Reducer};
use super::errors::{NotFound, QueryError, QueryResult};
use super::predicate::Filter;

/// A reader's handle on one generation
#[derive(Debug, Clone)]
pub struct Catalog {
    generation: Arc<Generation>,
}

impl Catalog {
    pub fn new(generation: Arc<Generation>) -> Self {
        Self { generation }
    }

    /// Pin whatever `engine` serves right now
    pub fn current(engine: &StorageEngine) -> Self {
        Self::new(engine.current_generation())
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn generation_id(&self) -> GenerationId {
        self.generation.id()
    }

    pub fn version(&self) -> Option<&str> {
        self.generation.version()
    }

    /// Typed handle for entity kind `T`
    pub fn entity<T: Entity>(&self) -> EntityHandle<'_, T> {
        EntityHandle {
            generation: &self.generation,
            _kind: PhantomData,
        }
    }
}

/// Per-kind access: lookup, filter, join, aggregate
pub struct EntityHandle<'c, T> {
    generation: &'c Generation,
    _kind: PhantomData<T>,
}

impl<T> Clone for EntityHandle<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntityHandle<'_, T> {}

impl<'c, T: Entity> EntityHandle<'c, T> {
    pub fn table(&self) -> &'c Table<T> {
        self.generation.table::<T>()
    }

    /// Row with primary key `key`, or `NotFound`
    pub fn find(&self, key: impl Into<RowKey>) -> Result<&'c T, NotFound> {
        let key = key.into();
        metrics().increment_lookups();
        self.table().get(&key).ok_or(NotFound { kind: T::KIND, key })
    }

    pub fn get(&self, key: impl Into<RowKey>) -> Option<&'c T> {
        self.table().get(&key.into())
    }

    pub fn count(&self) -> usize {
        self.table().len()
    }

    /// Every row of the kind
    pub fn all(&self) -> Matches<'c, T> {
        Matches {
            generation: self.generation,
            filter: Filter::new(),
            _kind: PhantomData,
        }
    }

    /// Rows matching `filter`, evaluated lazily on each iteration
    pub fn filter(&self, filter: Filter) -> QueryResult<Matches<'c, T>> {
        filter.validate(T::KIND)?;
        Ok(Matches {
            generation: self.generation,
            filter,
            _kind: PhantomData,
        })
    }

    /// Pair every row with its related `R` rows over the single declared
    /// relation between the two kinds
    pub fn join<R: Entity>(&self) -> QueryResult<Join<'c, T, R>> {
        self.all().join::<R>()
    }

    /// Pair rows with `R` rows over the relation carried by `field`
    pub fn join_via<R: Entity>(&self, field: &str) -> QueryResult<Join<'c, T, R>> {
        self.all().join_via::<R>(field)
    }

    pub fn aggregate(&self, group_by: &[&str], reducer: Reducer) -> QueryResult<Vec<AggregateRow>> {
        self.all().aggregate(group_by, reducer)
    }
}

/// A lazy, restartable sequence of matching rows
///
/// Holds no cursor: every call to `iter` scans again (through an index
/// when an equality predicate hits an indexed column).
pub struct Matches<'c, T> {
    generation: &'c Generation,
    filter: Filter,
    _kind: PhantomData<T>,
}

impl<T> Clone for Matches<'_, T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            filter: self.filter.clone(),
            _kind: PhantomData,
        }
    }
}

impl<'c, T: Entity> Matches<'c, T> {
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Narrow the sequence with more predicates
    pub fn and(&self, more: Filter) -> QueryResult<Matches<'c, T>> {
        more.validate(T::KIND)?;
        let mut filter = self.filter.clone();
        for predicate in more.predicates() {
            filter = filter.and(predicate.clone());
        }
        Ok(Matches {
            generation: self.generation,
            filter,
            _kind: PhantomData,
        })
    }

    pub fn iter(&self) -> MatchIter<'_, 'c, T> {
        let table = self.generation.table::<T>();
        let source = self
            .filter
            .equalities()
            .find_map(|(column, value)| table.lookup(column, value))
            .map(|ordinals| Source::Index(ordinals.iter()))
            .unwrap_or_else(|| Source::Scan(table.rows().iter()));
        MatchIter {
            table,
            source,
            filter: &self.filter,
        }
    }

    pub fn to_vec(&self) -> Vec<&'c T> {
        self.iter().collect()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn first(&self) -> Option<&'c T> {
        self.iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    pub fn join<R: Entity>(&self) -> QueryResult<Join<'c, T, R>> {
        let relation = Relation::between::<T, R>()?;
        Ok(Join::new(self.clone(), relation))
    }

    pub fn join_via<R: Entity>(&self, field: &str) -> QueryResult<Join<'c, T, R>> {
        let relation = Relation::via::<T, R>(field)?;
        Ok(Join::new(self.clone(), relation))
    }

    /// Group matching rows by `group_by` and reduce each group
    ///
    /// Results are sorted by group key.
    pub fn aggregate(&self, group_by: &[&str], reducer: Reducer) -> QueryResult<Vec<AggregateRow>> {
        aggregate(T::KIND, self.iter(), group_by, &reducer)
    }
}

impl<'m, 'c, T: Entity> IntoIterator for &'m Matches<'c, T> {
    type Item = &'c T;
    type IntoIter = MatchIter<'m, 'c, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

enum Source<'c, T> {
    Scan(std::slice::Iter<'c, T>),
    Index(std::slice::Iter<'c, RowOrdinal>),
}

/// Iterator over one pass of a `Matches`
pub struct MatchIter<'m, 'c, T> {
    table: &'c Table<T>,
    source: Source<'c, T>,
    filter: &'m Filter,
}

impl<'m, 'c, T: Entity> Iterator for MatchIter<'m, 'c, T> {
    type Item = &'c T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match &mut self.source {
                Source::Scan(rows) => rows.next()?,
                Source::Index(ordinals) => match self.table.row(*ordinals.next()?) {
                    Some(row) => row,
                    None => continue,
                },
            };
            if self.filter.matches(row) {
                return Some(row);
            }
        }
    }
}

/// Which side of a join carries the foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The left row's field names a right row's primary key
    Forward,
    /// A right row's field names the left row's primary key
    Reverse,
}

/// A declared relation between two kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub field: &'static str,
    pub direction: Direction,
}

impl Relation {
    fn candidates<T: Entity, R: Entity>() -> Vec<Relation> {
        let forward = schema_for(T::KIND)
            .foreign_keys
            .iter()
            .filter(|fk| fk.targets.contains(&R::KIND))
            .map(|fk| Relation {
                field: fk.field,
                direction: Direction::Forward,
            });
        let reverse = schema_for(R::KIND)
            .foreign_keys
            .iter()
            .filter(|fk| fk.targets.contains(&T::KIND))
            .map(|fk| Relation {
                field: fk.field,
                direction: Direction::Reverse,
            });
        forward.chain(reverse).collect()
    }

    fn between<T: Entity, R: Entity>() -> QueryResult<Relation> {
        let candidates = Self::candidates::<T, R>();
        match candidates.as_slice() {
            [only] => Ok(*only),
            [] => Err(QueryError::NoRelation {
                from: T::KIND,
                to: R::KIND,
            }),
            many => Err(QueryError::AmbiguousRelation {
                from: T::KIND,
                to: R::KIND,
                fields: many.iter().map(|r| r.field).collect::<Vec<_>>().join(", "),
            }),
        }
    }

    /// The left kind's own foreign key wins over one declared by the right kind
    fn via<T: Entity, R: Entity>(field: &str) -> QueryResult<Relation> {
        Self::candidates::<T, R>()
            .into_iter()
            .find(|r| r.field == field)
            .ok_or(QueryError::NoRelation {
                from: T::KIND,
                to: R::KIND,
            })
    }
}

/// Lazy pairing of left rows with their related right rows
pub struct Join<'c, T, R> {
    left: Matches<'c, T>,
    relation: Relation,
    _right: PhantomData<R>,
}

impl<T, R> Clone for Join<'_, T, R> {
    fn clone(&self) -> Self {
        Self {
            left: self.left.clone(),
            relation: self.relation,
            _right: PhantomData,
        }
    }
}

impl<'c, T: Entity, R: Entity> Join<'c, T, R> {
    fn new(left: Matches<'c, T>, relation: Relation) -> Self {
        Self {
            left,
            relation,
            _right: PhantomData,
        }
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// `(left, right)` pairs; a left row with no partner yields nothing
    pub fn iter(&self) -> impl Iterator<Item = (&'c T, &'c R)> + '_ {
        let right = self.left.generation.table::<R>();
        let relation = self.relation;
        self.left.iter().flat_map(move |left| {
            partners(right, relation, left)
                .into_iter()
                .map(move |r| (left, r))
        })
    }

    pub fn pairs(&self) -> Vec<(&'c T, &'c R)> {
        self.iter().collect()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

fn partners<'c, T: Entity, R: Entity>(right: &'c Table<R>, relation: Relation, left: &T) -> Vec<&'c R> {
    match relation.direction {
        Direction::Forward => match left.field(relation.field) {
            Some(value) if !value.is_null() => right.get(&RowKey::single(value)).into_iter().collect(),
            _ => Vec::new(),
        },
        Direction::Reverse => {
            let key = left.key();
            let value: &FieldValue = match key.values() {
                [single] => single,
                _ => return Vec::new(),
            };
            match right.lookup(relation.field, value) {
                Some(ordinals) => ordinals.iter().filter_map(|&o| right.row(o)).collect(),
                None => right
                    .rows()
                    .iter()
                    .filter(|r| r.field(relation.field).as_ref() == Some(value))
                    .collect(),
            }
        }
    }
}
