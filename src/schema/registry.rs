//! Catalog table declarations and load-order derivation
//!
//! Independent tables first, then tables with foreign keys. The order of
//! declaration here is also the tie-break order for the derived load
//! order, so the load order is stable across runs.

use std::collections::HashSet;
use std::sync::OnceLock;

use super::errors::{SchemaError, SchemaResult};
use super::types::{EntityKind, EntitySchema, FieldCheck, FieldDef, FieldType, ForeignKey};

const REL_TYPES: &[&str] = &["P", "B", "M", "A", "R", "T"];

// =============================================================================
// Independent Tables (no FK dependencies)
// =============================================================================

pub static PART_CATEGORIES: EntitySchema = EntitySchema {
    kind: EntityKind::PartCategory,
    fields: &[
        FieldDef::required("id", FieldType::Int),
        FieldDef::required("name", FieldType::Text).checked(&[FieldCheck::MaxLen(200)]),
    ],
    primary_key: &["id"],
    foreign_keys: &[],
};

pub static COLORS: EntitySchema = EntitySchema {
    kind: EntityKind::Color,
    fields: &[
        FieldDef::required("id", FieldType::Int),
        FieldDef::required("name", FieldType::Text).checked(&[FieldCheck::MaxLen(200)]),
        FieldDef::required("rgb", FieldType::Text).checked(&[FieldCheck::HexRgb]),
        FieldDef::required("is_trans", FieldType::Bool),
    ],
    primary_key: &["id"],
    foreign_keys: &[],
};

pub static THEMES: EntitySchema = EntitySchema {
    kind: EntityKind::Theme,
    fields: &[
        FieldDef::required("id", FieldType::Int),
        FieldDef::required("name", FieldType::Text).checked(&[FieldCheck::MaxLen(256)]),
        FieldDef::optional("parent_id", FieldType::Int),
    ],
    primary_key: &["id"],
    foreign_keys: &[ForeignKey::parent("parent_id", &[EntityKind::Theme])],
};

pub static MINIFIGS: EntitySchema = EntitySchema {
    kind: EntityKind::Minifig,
    fields: &[
        FieldDef::required("fig_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
        FieldDef::required("name", FieldType::Text).checked(&[FieldCheck::MaxLen(256)]),
        FieldDef::required("num_parts", FieldType::Int),
    ],
    primary_key: &["fig_num"],
    foreign_keys: &[],
};

// =============================================================================
// Dependent Tables
// =============================================================================

pub static PARTS: EntitySchema = EntitySchema {
    kind: EntityKind::Part,
    fields: &[
        FieldDef::required("part_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
        FieldDef::required("name", FieldType::Text).checked(&[FieldCheck::MaxLen(250)]),
        FieldDef::required("part_cat_id", FieldType::Int),
        FieldDef::optional("parent_part_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
    ],
    primary_key: &["part_num"],
    foreign_keys: &[
        ForeignKey::references("part_cat_id", &[EntityKind::PartCategory]),
        ForeignKey::parent("parent_part_num", &[EntityKind::Part]),
    ],
};

pub static PART_RELATIONSHIPS: EntitySchema = EntitySchema {
    kind: EntityKind::PartRelationship,
    fields: &[
        FieldDef::required("rel_type", FieldType::Text).checked(&[FieldCheck::OneOf(REL_TYPES)]),
        FieldDef::required("child_part_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
        FieldDef::required("parent_part_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
    ],
    primary_key: &["rel_type", "child_part_num", "parent_part_num"],
    foreign_keys: &[
        ForeignKey::references("child_part_num", &[EntityKind::Part]),
        ForeignKey::references("parent_part_num", &[EntityKind::Part]),
    ],
};

pub static ELEMENTS: EntitySchema = EntitySchema {
    kind: EntityKind::Element,
    fields: &[
        FieldDef::required("element_id", FieldType::Code).checked(&[FieldCheck::MaxLen(10)]),
        FieldDef::required("part_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
        FieldDef::required("color_id", FieldType::Int),
    ],
    primary_key: &["element_id"],
    foreign_keys: &[
        ForeignKey::references("part_num", &[EntityKind::Part]),
        ForeignKey::references("color_id", &[EntityKind::Color]),
    ],
};

pub static SETS: EntitySchema = EntitySchema {
    kind: EntityKind::Set,
    fields: &[
        FieldDef::required("set_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
        FieldDef::required("name", FieldType::Text).checked(&[FieldCheck::MaxLen(256)]),
        FieldDef::required("year", FieldType::Int),
        FieldDef::required("theme_id", FieldType::Int),
        FieldDef::required("num_parts", FieldType::Int),
    ],
    primary_key: &["set_num"],
    foreign_keys: &[ForeignKey::references("theme_id", &[EntityKind::Theme])],
};

pub static INVENTORIES: EntitySchema = EntitySchema {
    kind: EntityKind::Inventory,
    fields: &[
        FieldDef::required("id", FieldType::Int),
        FieldDef::required("version", FieldType::Int).checked(&[FieldCheck::Positive]),
        FieldDef::required("set_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
    ],
    primary_key: &["id"],
    // Owner is either a set or a minifig
    foreign_keys: &[ForeignKey::references(
        "set_num",
        &[EntityKind::Set, EntityKind::Minifig],
    )],
};

pub static INVENTORY_PARTS: EntitySchema = EntitySchema {
    kind: EntityKind::InventoryPart,
    fields: &[
        FieldDef::required("inventory_id", FieldType::Int),
        FieldDef::required("part_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
        FieldDef::required("color_id", FieldType::Int),
        FieldDef::required("quantity", FieldType::Int).checked(&[FieldCheck::Positive]),
        FieldDef::required("is_spare", FieldType::Bool),
    ],
    // Bill-of-materials lines have no natural key; a repeated line is
    // kept and counted.
    primary_key: &[],
    foreign_keys: &[
        ForeignKey::references("inventory_id", &[EntityKind::Inventory]),
        ForeignKey::references("part_num", &[EntityKind::Part]),
        ForeignKey::references("color_id", &[EntityKind::Color]),
    ],
};

pub static INVENTORY_SETS: EntitySchema = EntitySchema {
    kind: EntityKind::InventorySet,
    fields: &[
        FieldDef::required("inventory_id", FieldType::Int),
        FieldDef::required("set_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
        FieldDef::required("quantity", FieldType::Int).checked(&[FieldCheck::Positive]),
    ],
    primary_key: &["inventory_id", "set_num"],
    foreign_keys: &[
        ForeignKey::references("inventory_id", &[EntityKind::Inventory]),
        ForeignKey::references("set_num", &[EntityKind::Set]),
    ],
};

pub static INVENTORY_MINIFIGS: EntitySchema = EntitySchema {
    kind: EntityKind::InventoryMinifig,
    fields: &[
        FieldDef::required("inventory_id", FieldType::Int),
        FieldDef::required("fig_num", FieldType::Code).checked(&[FieldCheck::MaxLen(20)]),
        FieldDef::required("quantity", FieldType::Int).checked(&[FieldCheck::Positive]),
    ],
    primary_key: &[],
    foreign_keys: &[
        ForeignKey::references("inventory_id", &[EntityKind::Inventory]),
        ForeignKey::references("fig_num", &[EntityKind::Minifig]),
    ],
};

/// All catalog tables in declaration order
pub static ALL_TABLES: &[&EntitySchema] = &[
    &PART_CATEGORIES,
    &COLORS,
    &THEMES,
    &MINIFIGS,
    &PARTS,
    &PART_RELATIONSHIPS,
    &ELEMENTS,
    &SETS,
    &INVENTORIES,
    &INVENTORY_PARTS,
    &INVENTORY_SETS,
    &INVENTORY_MINIFIGS,
];

/// Registry of table descriptors plus the derived load order.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: Vec<&'static EntitySchema>,
    load_order: Vec<EntityKind>,
}

impl SchemaRegistry {
    /// Builds a registry, validating declarations and deriving the load order.
    ///
    /// # Errors
    ///
    /// - `BRICK_SCHEMA_DUPLICATE_KIND` if a kind is declared twice
    /// - `BRICK_SCHEMA_UNKNOWN_FIELD` if a key names an undeclared field
    /// - `BRICK_SCHEMA_UNKNOWN_TARGET` if a foreign key targets an unregistered kind
    /// - `BRICK_SCHEMA_CYCLE` if non-hierarchical foreign keys form a cycle
    pub fn new(schemas: Vec<&'static EntitySchema>) -> SchemaResult<Self> {
        let mut seen = HashSet::new();
        for schema in &schemas {
            if !seen.insert(schema.kind) {
                return Err(SchemaError::duplicate_kind(schema.kind));
            }
        }

        for schema in &schemas {
            for pk in schema.primary_key {
                if schema.field(pk).is_none() {
                    return Err(SchemaError::unknown_field(schema.kind, pk));
                }
            }
            for fk in schema.foreign_keys {
                if schema.field(fk.field).is_none() {
                    return Err(SchemaError::unknown_field(schema.kind, fk.field));
                }
                for target in fk.targets {
                    if !seen.contains(target) {
                        return Err(SchemaError::unknown_target(schema.kind, fk.field, *target));
                    }
                }
            }
        }

        let load_order = Self::derive_load_order(&schemas)?;

        Ok(Self { schemas, load_order })
    }

    /// The built-in catalog registry
    pub fn catalog() -> &'static SchemaRegistry {
        static CATALOG: OnceLock<SchemaRegistry> = OnceLock::new();
        CATALOG.get_or_init(|| {
            SchemaRegistry::new(ALL_TABLES.to_vec())
                .expect("built-in catalog declarations are acyclic and complete")
        })
    }

    /// Kahn's algorithm; ties resolved by declaration order.
    fn derive_load_order(schemas: &[&'static EntitySchema]) -> SchemaResult<Vec<EntityKind>> {
        let mut loaded: HashSet<EntityKind> = HashSet::new();
        let mut order = Vec::with_capacity(schemas.len());

        while order.len() < schemas.len() {
            let next = schemas.iter().find(|s| {
                !loaded.contains(&s.kind) && s.dependencies().all(|dep| loaded.contains(&dep))
            });

            match next {
                Some(schema) => {
                    loaded.insert(schema.kind);
                    order.push(schema.kind);
                }
                None => {
                    let stuck = schemas
                        .iter()
                        .map(|s| s.kind)
                        .filter(|k| !loaded.contains(k))
                        .collect();
                    return Err(SchemaError::schema_cycle(stuck));
                }
            }
        }

        Ok(order)
    }

    /// Every kind is loaded after all kinds it references
    pub fn load_order(&self) -> &[EntityKind] {
        &self.load_order
    }

    pub fn get(&self, kind: EntityKind) -> Option<&'static EntitySchema> {
        self.schemas.iter().copied().find(|s| s.kind == kind)
    }

    /// Schema for `kind`, falling back to the static catalog declaration
    pub fn schema(&self, kind: EntityKind) -> &'static EntitySchema {
        self.get(kind).unwrap_or_else(|| schema_for(kind))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &'static EntitySchema> + '_ {
        self.schemas.iter().copied()
    }

    /// Foreign keys on other kinds that point at `target`
    pub fn references_to(
        &self,
        target: EntityKind,
    ) -> impl Iterator<Item = (EntityKind, &'static ForeignKey)> + '_ {
        self.schemas.iter().flat_map(move |s| {
            s.foreign_keys
                .iter()
                .filter(move |fk| fk.targets.contains(&target))
                .map(move |fk| (s.kind, fk))
        })
    }
}

/// Static declaration for a catalog kind
pub fn schema_for(kind: EntityKind) -> &'static EntitySchema {
    match kind {
        EntityKind::PartCategory => &PART_CATEGORIES,
        EntityKind::Color => &COLORS,
        EntityKind::Theme => &THEMES,
        EntityKind::Part => &PARTS,
        EntityKind::PartRelationship => &PART_RELATIONSHIPS,
        EntityKind::Element => &ELEMENTS,
        EntityKind::Minifig => &MINIFIGS,
        EntityKind::Set => &SETS,
        EntityKind::Inventory => &INVENTORIES,
        EntityKind::InventoryPart => &INVENTORY_PARTS,
        EntityKind::InventorySet => &INVENTORY_SETS,
        EntityKind::InventoryMinifig => &INVENTORY_MINIFIGS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;

    fn position(order: &[EntityKind], kind: EntityKind) -> usize {
        order.iter().position(|k| *k == kind).unwrap()
    }

    #[test]
    fn test_catalog_load_order_respects_dependencies() {
        let registry = SchemaRegistry::catalog();
        let order = registry.load_order();
        assert_eq!(order.len(), EntityKind::ALL.len());

        for schema in registry.schemas() {
            for dep in schema.dependencies() {
                assert!(
                    position(order, dep) < position(order, schema.kind),
                    "{} must load before {}",
                    dep,
                    schema.kind
                );
            }
        }
    }

    #[test]
    fn test_load_order_is_deterministic() {
        let a = SchemaRegistry::new(ALL_TABLES.to_vec()).unwrap();
        let b = SchemaRegistry::new(ALL_TABLES.to_vec()).unwrap();
        assert_eq!(a.load_order(), b.load_order());
        assert_eq!(a.load_order()[0], EntityKind::PartCategory);
    }

    #[test]
    fn test_hierarchical_edges_do_not_block_load_order() {
        let registry = SchemaRegistry::new(vec![&THEMES]).unwrap();
        assert_eq!(registry.load_order(), &[EntityKind::Theme]);
    }

    static CYCLE_A: EntitySchema = EntitySchema {
        kind: EntityKind::Set,
        fields: &[
            FieldDef::required("set_num", FieldType::Code),
            FieldDef::required("theme_id", FieldType::Int),
        ],
        primary_key: &["set_num"],
        foreign_keys: &[ForeignKey::references("theme_id", &[EntityKind::Theme])],
    };

    static CYCLE_B: EntitySchema = EntitySchema {
        kind: EntityKind::Theme,
        fields: &[
            FieldDef::required("id", FieldType::Int),
            FieldDef::required("flagship_set", FieldType::Code),
        ],
        primary_key: &["id"],
        foreign_keys: &[ForeignKey::references("flagship_set", &[EntityKind::Set])],
    };

    #[test]
    fn test_schema_cycle_detected() {
        let err = SchemaRegistry::new(vec![&CYCLE_A, &CYCLE_B]).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::BrickSchemaCycle);
        assert!(err.kinds().contains(&EntityKind::Set));
        assert!(err.kinds().contains(&EntityKind::Theme));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let err = SchemaRegistry::new(vec![&SETS]).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::BrickSchemaUnknownTarget);
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let err = SchemaRegistry::new(vec![&COLORS, &COLORS]).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::BrickSchemaDuplicateKind);
    }

    #[test]
    fn test_references_to_part() {
        let registry = SchemaRegistry::catalog();
        let referrers: Vec<_> = registry
            .references_to(EntityKind::Part)
            .map(|(kind, fk)| (kind, fk.field))
            .collect();
        assert!(referrers.contains(&(EntityKind::InventoryPart, "part_num")));
        assert!(referrers.contains(&(EntityKind::Element, "part_num")));
    }

    #[test]
    fn test_association_lines_are_keyless() {
        assert!(!schema_for(EntityKind::InventoryPart).is_keyed());
        assert!(!schema_for(EntityKind::InventoryMinifig).is_keyed());
        assert!(schema_for(EntityKind::InventorySet).is_keyed());
    }

    #[test]
    fn test_schema_for_matches_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(schema_for(kind).kind, kind);
        }
    }
}
