//! Typed records
//!
//! Everything downstream of the row normalizer works with these types;
//! untyped dataset values never leave the `normalize` module.

mod entities;

pub use entities::{
    Color, Element, Inventory, InventoryMinifig, InventoryPart, InventorySet, Minifig, Part,
    PartCategory, PartRelationship, RelType, Set, Theme,
};

use serde::{Deserialize, Serialize};

use crate::normalize::{NormalizedRow, RowValidationError};
use crate::schema::{schema_for, EntityKind, FieldValue, RowKey};
use crate::storage::{Table, Tables};

/// A typed row of one entity kind.
pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Value of a declared field; `None` if the kind declares no such field.
    /// Absent optional fields are `Some(FieldValue::Null)`.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Build the record from a row the normalizer already validated.
    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError>;

    fn table(tables: &Tables) -> &Table<Self>;

    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

    fn into_record(self) -> Record;

    /// Primary key, one value per declared key column
    fn key(&self) -> RowKey {
        RowKey::new(
            schema_for(Self::KIND)
                .primary_key
                .iter()
                .map(|col| self.field(col).unwrap_or(FieldValue::Null))
                .collect(),
        )
    }
}

/// A typed record of any kind
///
/// Serialized tagged by table name; this is also the row format of the
/// persisted generation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", content = "row")]
pub enum Record {
    #[serde(rename = "part_categories")]
    PartCategory(PartCategory),
    #[serde(rename = "colors")]
    Color(Color),
    #[serde(rename = "themes")]
    Theme(Theme),
    #[serde(rename = "parts")]
    Part(Part),
    #[serde(rename = "part_relationships")]
    PartRelationship(PartRelationship),
    #[serde(rename = "elements")]
    Element(Element),
    #[serde(rename = "minifigs")]
    Minifig(Minifig),
    #[serde(rename = "sets")]
    Set(Set),
    #[serde(rename = "inventories")]
    Inventory(Inventory),
    #[serde(rename = "inventory_parts")]
    InventoryPart(InventoryPart),
    #[serde(rename = "inventory_sets")]
    InventorySet(InventorySet),
    #[serde(rename = "inventory_minifigs")]
    InventoryMinifig(InventoryMinifig),
}

/// Run `$body` with `$r` bound to the typed record inside `$rec`
macro_rules! with_entity {
    ($rec:expr, $r:ident => $body:expr) => {
        match $rec {
            Record::PartCategory($r) => $body,
            Record::Color($r) => $body,
            Record::Theme($r) => $body,
            Record::Part($r) => $body,
            Record::PartRelationship($r) => $body,
            Record::Element($r) => $body,
            Record::Minifig($r) => $body,
            Record::Set($r) => $body,
            Record::Inventory($r) => $body,
            Record::InventoryPart($r) => $body,
            Record::InventorySet($r) => $body,
            Record::InventoryMinifig($r) => $body,
        }
    };
}

pub(crate) use with_entity;

impl Record {
    /// Build a typed record of `kind` from a validated row
    pub fn from_row(kind: EntityKind, row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(match kind {
            EntityKind::PartCategory => PartCategory::from_row(row)?.into_record(),
            EntityKind::Color => Color::from_row(row)?.into_record(),
            EntityKind::Theme => Theme::from_row(row)?.into_record(),
            EntityKind::Part => Part::from_row(row)?.into_record(),
            EntityKind::PartRelationship => PartRelationship::from_row(row)?.into_record(),
            EntityKind::Element => Element::from_row(row)?.into_record(),
            EntityKind::Minifig => Minifig::from_row(row)?.into_record(),
            EntityKind::Set => Set::from_row(row)?.into_record(),
            EntityKind::Inventory => Inventory::from_row(row)?.into_record(),
            EntityKind::InventoryPart => InventoryPart::from_row(row)?.into_record(),
            EntityKind::InventorySet => InventorySet::from_row(row)?.into_record(),
            EntityKind::InventoryMinifig => InventoryMinifig::from_row(row)?.into_record(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        fn kind_of<T: Entity>(_: &T) -> EntityKind {
            T::KIND
        }
        with_entity!(self, r => kind_of(r))
    }

    pub fn key(&self) -> RowKey {
        with_entity!(self, r => r.key())
    }

    pub fn field(&self, name: &str) -> Option<FieldValue> {
        with_entity!(self, r => r.field(name))
    }
}
