//! Entity kind and table descriptor types
//!
//! Table descriptors are `'static` data: every entity kind brickdb knows
//! about is declared once, at compile time, in `registry.rs`.
//!
//! Supported field types:
//! - int: 64-bit signed integer, strict base-10 when given as text
//! - text: UTF-8 string
//! - code: identifier string; integer raw values are rendered in base 10
//! - bool: boolean

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every entity kind held by a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    PartCategory,
    Color,
    Theme,
    Part,
    PartRelationship,
    Element,
    Minifig,
    Set,
    Inventory,
    InventoryPart,
    InventorySet,
    InventoryMinifig,
}

impl EntityKind {
    /// All kinds in declaration order
    pub const ALL: [EntityKind; 12] = [
        EntityKind::PartCategory,
        EntityKind::Color,
        EntityKind::Theme,
        EntityKind::Part,
        EntityKind::PartRelationship,
        EntityKind::Element,
        EntityKind::Minifig,
        EntityKind::Set,
        EntityKind::Inventory,
        EntityKind::InventoryPart,
        EntityKind::InventorySet,
        EntityKind::InventoryMinifig,
    ];

    /// Table name used in storage, dataset file names and reports
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::PartCategory => "part_categories",
            EntityKind::Color => "colors",
            EntityKind::Theme => "themes",
            EntityKind::Part => "parts",
            EntityKind::PartRelationship => "part_relationships",
            EntityKind::Element => "elements",
            EntityKind::Minifig => "minifigs",
            EntityKind::Set => "sets",
            EntityKind::Inventory => "inventories",
            EntityKind::InventoryPart => "inventory_parts",
            EntityKind::InventorySet => "inventory_sets",
            EntityKind::InventoryMinifig => "inventory_minifigs",
        }
    }

    /// Reverse of `table_name`
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.table_name() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// Field data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Text,
    Code,
    Bool,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Text => "text",
            FieldType::Code => "code",
            FieldType::Bool => "bool",
        }
    }
}

/// Constraint applied after a value has been parsed to its field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    /// Int must be > 0
    Positive,
    /// Text/code length in characters must not exceed the bound
    MaxLen(usize),
    /// Exactly six hex digits
    HexRgb,
    /// Text must equal one of the listed values
    OneOf(&'static [&'static str]),
}

/// Field definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub field_type: FieldType,
    /// Whether the field must be present (non-null, non-empty)
    pub required: bool,
    pub checks: &'static [FieldCheck],
}

impl FieldDef {
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
            checks: &[],
        }
    }

    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            checks: &[],
        }
    }

    pub const fn checked(self, checks: &'static [FieldCheck]) -> Self {
        Self { checks, ..self }
    }
}

/// Foreign-key edge from one field to one or more target kinds
///
/// A key resolves if any target holds a row with that primary key.
/// Nullability comes from the field's own `FieldDef::required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: &'static str,
    pub targets: &'static [EntityKind],
    /// Self reference forming a forest (parent theme, parent part)
    pub hierarchical: bool,
}

impl ForeignKey {
    pub const fn references(field: &'static str, targets: &'static [EntityKind]) -> Self {
        Self {
            field,
            targets,
            hierarchical: false,
        }
    }

    pub const fn parent(field: &'static str, targets: &'static [EntityKind]) -> Self {
        Self {
            field,
            targets,
            hierarchical: true,
        }
    }
}

/// Complete table descriptor for one entity kind
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub fields: &'static [FieldDef],
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether rows are identified by a primary key. Keyless rows are
    /// addressed by position and never collide.
    pub fn is_keyed(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Foreign key declared on `field`, if any
    pub fn foreign_key(&self, field: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }

    /// The hierarchical self reference, if this kind has one
    pub fn hierarchy(&self) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.hierarchical)
    }

    /// Columns that get a secondary index in every generation
    pub fn indexed_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.foreign_keys.iter().map(|fk| fk.field)
    }

    /// Kinds this schema must be loaded after (hierarchical edges excluded)
    pub fn dependencies(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.foreign_keys
            .iter()
            .filter(|fk| !fk.hierarchical)
            .flat_map(|fk| fk.targets.iter().copied())
    }
}
