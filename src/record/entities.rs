//! Typed catalog records
//!
//! One struct per entity kind. Field names match the table declarations
//! in `schema::registry`; `Entity::field` exposes them to the query layer
//! and to referential checks without going back to untyped values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::{NormalizedRow, RowValidationError};
use crate::schema::{EntityKind, FieldValue};
use crate::storage::{Table, Tables};

use super::{Entity, Record};

/// Kind of relationship between two parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelType {
    #[serde(rename = "P")]
    Print,
    #[serde(rename = "B")]
    SubPart,
    #[serde(rename = "M")]
    Mold,
    #[serde(rename = "A")]
    Alternate,
    #[serde(rename = "R")]
    Pair,
    #[serde(rename = "T")]
    Pattern,
}

impl RelType {
    pub fn code(&self) -> &'static str {
        match self {
            RelType::Print => "P",
            RelType::SubPart => "B",
            RelType::Mold => "M",
            RelType::Alternate => "A",
            RelType::Pair => "R",
            RelType::Pattern => "T",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(RelType::Print),
            "B" => Some(RelType::SubPart),
            "M" => Some(RelType::Mold),
            "A" => Some(RelType::Alternate),
            "R" => Some(RelType::Pair),
            "T" => Some(RelType::Pattern),
            _ => None,
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: i64,
    pub name: String,
    /// Six hex digits, no leading '#'
    pub rgb: String,
    pub is_trans: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub part_num: String,
    pub name: String,
    pub part_cat_id: i64,
    /// Mold or print variant of another part
    pub parent_part_num: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRelationship {
    pub rel_type: RelType,
    pub child_part_num: String,
    pub parent_part_num: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub element_id: String,
    pub part_num: String,
    pub color_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minifig {
    pub fig_num: String,
    pub name: String,
    pub num_parts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    pub set_num: String,
    pub name: String,
    pub year: i64,
    pub theme_id: i64,
    pub num_parts: i64,
}

/// One bill of materials for a set or minifig
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i64,
    pub version: i64,
    /// Owning set or minifig number
    pub set_num: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPart {
    pub inventory_id: i64,
    pub part_num: String,
    pub color_id: i64,
    pub quantity: i64,
    pub is_spare: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySet {
    pub inventory_id: i64,
    pub set_num: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMinifig {
    pub inventory_id: i64,
    pub fig_num: String,
    pub quantity: i64,
}

impl Entity for PartCategory {
    const KIND: EntityKind = EntityKind::PartCategory;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some((&self.name).into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            id: row.int("id")?,
            name: row.text("name")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.part_categories
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.part_categories
    }

    fn into_record(self) -> Record {
        Record::PartCategory(self)
    }
}

impl Entity for Color {
    const KIND: EntityKind = EntityKind::Color;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some((&self.name).into()),
            "rgb" => Some((&self.rgb).into()),
            "is_trans" => Some(self.is_trans.into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            id: row.int("id")?,
            name: row.text("name")?,
            rgb: row.text("rgb")?.to_ascii_uppercase(),
            is_trans: row.boolean("is_trans")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.colors
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.colors
    }

    fn into_record(self) -> Record {
        Record::Color(self)
    }
}

impl Entity for Theme {
    const KIND: EntityKind = EntityKind::Theme;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some((&self.name).into()),
            "parent_id" => Some(self.parent_id.into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            id: row.int("id")?,
            name: row.text("name")?,
            parent_id: row.opt_int("parent_id")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.themes
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.themes
    }

    fn into_record(self) -> Record {
        Record::Theme(self)
    }
}

impl Entity for Part {
    const KIND: EntityKind = EntityKind::Part;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "part_num" => Some((&self.part_num).into()),
            "name" => Some((&self.name).into()),
            "part_cat_id" => Some(self.part_cat_id.into()),
            "parent_part_num" => Some(self.parent_part_num.as_deref().into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            part_num: row.text("part_num")?,
            name: row.text("name")?,
            part_cat_id: row.int("part_cat_id")?,
            parent_part_num: row.opt_text("parent_part_num")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.parts
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.parts
    }

    fn into_record(self) -> Record {
        Record::Part(self)
    }
}

impl Entity for PartRelationship {
    const KIND: EntityKind = EntityKind::PartRelationship;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "rel_type" => Some(self.rel_type.code().into()),
            "child_part_num" => Some((&self.child_part_num).into()),
            "parent_part_num" => Some((&self.parent_part_num).into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        let code = row.text("rel_type")?;
        let rel_type = RelType::from_code(&code)
            .ok_or_else(|| row.invalid_format("rel_type", format!("unknown relationship '{}'", code)))?;
        Ok(Self {
            rel_type,
            child_part_num: row.text("child_part_num")?,
            parent_part_num: row.text("parent_part_num")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.part_relationships
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.part_relationships
    }

    fn into_record(self) -> Record {
        Record::PartRelationship(self)
    }
}

impl Entity for Element {
    const KIND: EntityKind = EntityKind::Element;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "element_id" => Some((&self.element_id).into()),
            "part_num" => Some((&self.part_num).into()),
            "color_id" => Some(self.color_id.into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            element_id: row.text("element_id")?,
            part_num: row.text("part_num")?,
            color_id: row.int("color_id")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.elements
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.elements
    }

    fn into_record(self) -> Record {
        Record::Element(self)
    }
}

impl Entity for Minifig {
    const KIND: EntityKind = EntityKind::Minifig;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "fig_num" => Some((&self.fig_num).into()),
            "name" => Some((&self.name).into()),
            "num_parts" => Some(self.num_parts.into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            fig_num: row.text("fig_num")?,
            name: row.text("name")?,
            num_parts: row.int("num_parts")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.minifigs
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.minifigs
    }

    fn into_record(self) -> Record {
        Record::Minifig(self)
    }
}

impl Entity for Set {
    const KIND: EntityKind = EntityKind::Set;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "set_num" => Some((&self.set_num).into()),
            "name" => Some((&self.name).into()),
            "year" => Some(self.year.into()),
            "theme_id" => Some(self.theme_id.into()),
            "num_parts" => Some(self.num_parts.into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            set_num: row.text("set_num")?,
            name: row.text("name")?,
            year: row.int("year")?,
            theme_id: row.int("theme_id")?,
            num_parts: row.int("num_parts")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.sets
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.sets
    }

    fn into_record(self) -> Record {
        Record::Set(self)
    }
}

impl Entity for Inventory {
    const KIND: EntityKind = EntityKind::Inventory;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "version" => Some(self.version.into()),
            "set_num" => Some((&self.set_num).into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            id: row.int("id")?,
            version: row.int("version")?,
            set_num: row.text("set_num")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.inventories
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.inventories
    }

    fn into_record(self) -> Record {
        Record::Inventory(self)
    }
}

impl Entity for InventoryPart {
    const KIND: EntityKind = EntityKind::InventoryPart;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "inventory_id" => Some(self.inventory_id.into()),
            "part_num" => Some((&self.part_num).into()),
            "color_id" => Some(self.color_id.into()),
            "quantity" => Some(self.quantity.into()),
            "is_spare" => Some(self.is_spare.into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            inventory_id: row.int("inventory_id")?,
            part_num: row.text("part_num")?,
            color_id: row.int("color_id")?,
            quantity: row.int("quantity")?,
            is_spare: row.boolean("is_spare")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.inventory_parts
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.inventory_parts
    }

    fn into_record(self) -> Record {
        Record::InventoryPart(self)
    }
}

impl Entity for InventorySet {
    const KIND: EntityKind = EntityKind::InventorySet;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "inventory_id" => Some(self.inventory_id.into()),
            "set_num" => Some((&self.set_num).into()),
            "quantity" => Some(self.quantity.into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            inventory_id: row.int("inventory_id")?,
            set_num: row.text("set_num")?,
            quantity: row.int("quantity")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.inventory_sets
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.inventory_sets
    }

    fn into_record(self) -> Record {
        Record::InventorySet(self)
    }
}

impl Entity for InventoryMinifig {
    const KIND: EntityKind = EntityKind::InventoryMinifig;

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "inventory_id" => Some(self.inventory_id.into()),
            "fig_num" => Some((&self.fig_num).into()),
            "quantity" => Some(self.quantity.into()),
            _ => None,
        }
    }

    fn from_row(row: &NormalizedRow) -> Result<Self, RowValidationError> {
        Ok(Self {
            inventory_id: row.int("inventory_id")?,
            fig_num: row.text("fig_num")?,
            quantity: row.int("quantity")?,
        })
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.inventory_minifigs
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.inventory_minifigs
    }

    fn into_record(self) -> Record {
        Record::InventoryMinifig(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{schema_for, RowKey};

    #[test]
    fn test_every_declared_field_is_exposed() {
        let part = Part {
            part_num: "3001".into(),
            name: "Brick 2 x 4".into(),
            part_cat_id: 11,
            parent_part_num: None,
        };
        for def in schema_for(EntityKind::Part).fields {
            assert!(part.field(def.name).is_some(), "missing field {}", def.name);
        }
        assert_eq!(part.field("parent_part_num"), Some(FieldValue::Null));
        assert_eq!(part.field("weight"), None);
    }

    #[test]
    fn test_composite_key() {
        let link = InventorySet {
            inventory_id: 7,
            set_num: "6020-1".into(),
            quantity: 2,
        };
        assert_eq!(link.key(), RowKey::from((7i64, "6020-1")));

        let line = InventoryPart {
            inventory_id: 7,
            part_num: "3001".into(),
            color_id: 4,
            quantity: 2,
            is_spare: false,
        };
        assert!(line.key().is_empty());
    }

    #[test]
    fn test_rel_type_codes() {
        for code in ["P", "B", "M", "A", "R", "T"] {
            assert_eq!(RelType::from_code(code).unwrap().code(), code);
        }
        assert_eq!(RelType::from_code("X"), None);
    }
}
