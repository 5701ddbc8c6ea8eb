//! Query layer errors

use thiserror::Error;

use crate::schema::{EntityKind, RowKey};

/// No row with the requested key exists in the pinned generation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no row in '{kind}' with key {key}")]
pub struct NotFound {
    pub kind: EntityKind,
    pub key: RowKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("table '{kind}' declares no field '{field}'")]
    UnknownField { kind: EntityKind, field: String },

    #[error("field '{kind}.{field}' is not an integer column")]
    NotNumeric { kind: EntityKind, field: String },

    #[error("no declared relation between '{from}' and '{to}'")]
    NoRelation { from: EntityKind, to: EntityKind },

    #[error("'{from}' relates to '{to}' through [{fields}]; pick one with join_via")]
    AmbiguousRelation {
        from: EntityKind,
        to: EntityKind,
        fields: String,
    },

    #[error("containment cycle: {path}")]
    ContainmentCycle { path: String },

    #[error("parent chain of '{kind}' row {key} does not terminate")]
    HierarchyCycle { kind: EntityKind, key: RowKey },
}

pub type QueryResult<T> = Result<T, QueryError>;
