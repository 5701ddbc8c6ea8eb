//! Containment roll-ups
//!
//! A set's bill of materials is the highest-version inventory it owns.
//! Part quantities are multiplied through nested sets and minifigs: a set
//! holding 2 copies of a sub-set that holds 5 of a part contributes 10.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::record::{Inventory, InventoryMinifig, InventoryPart, InventorySet, Set, Theme};
use crate::schema::{EntityKind, FieldValue, RowKey};

use super::errors::{QueryError, QueryResult};
use super::handle::Catalog;

/// What a roll-up counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupOptions {
    /// Count spare parts shipped with the set
    pub include_spares: bool,
    /// Descend into minifig inventories
    pub include_minifigs: bool,
}

impl Default for RollupOptions {
    fn default() -> Self {
        Self {
            include_spares: false,
            include_minifigs: true,
        }
    }
}

/// Roll-up key: one part in one color
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartColor {
    pub part_num: String,
    pub color_id: i64,
}

impl PartColor {
    pub fn new(part_num: impl Into<String>, color_id: i64) -> Self {
        Self {
            part_num: part_num.into(),
            color_id,
        }
    }
}

/// Total quantity per part and color
pub type PartTotals = BTreeMap<PartColor, i64>;

impl Catalog {
    /// Highest-version inventory owned by a set or minifig
    pub fn latest_inventory(&self, owner: &str) -> Option<&Inventory> {
        let inventories = self.generation().table::<Inventory>();
        let owner = FieldValue::Text(owner.to_string());
        inventories
            .lookup("set_num", &owner)
            .unwrap_or(&[])
            .iter()
            .filter_map(|&ordinal| inventories.row(ordinal))
            .max_by_key(|inv| (inv.version, inv.id))
    }

    /// Part quantities in `set_num`, multiplied through nested containment
    ///
    /// # Errors
    ///
    /// `NotFound` if the set does not exist, `ContainmentCycle` if a set
    /// (directly or indirectly) contains itself.
    pub fn set_part_totals(&self, set_num: &str, options: RollupOptions) -> QueryResult<PartTotals> {
        self.entity::<Set>().find(set_num)?;

        let mut totals = PartTotals::new();
        let mut path = Vec::new();
        self.accumulate(set_num, 1, options, &mut path, &mut totals)?;
        Ok(totals)
    }

    /// Total piece count of `set_num`, nested containers included
    pub fn set_piece_count(&self, set_num: &str, options: RollupOptions) -> QueryResult<i64> {
        let totals = self.set_part_totals(set_num, options)?;
        Ok(totals.values().fold(0i64, |acc, q| acc.saturating_add(*q)))
    }

    fn accumulate(
        &self,
        owner: &str,
        multiplier: i64,
        options: RollupOptions,
        path: &mut Vec<String>,
        totals: &mut PartTotals,
    ) -> QueryResult<()> {
        if path.iter().any(|p| p == owner) {
            let mut cycle = path.clone();
            cycle.push(owner.to_string());
            return Err(QueryError::ContainmentCycle {
                path: cycle.join(" -> "),
            });
        }

        let inventory = match self.latest_inventory(owner) {
            Some(inventory) => inventory.id,
            None => return Ok(()),
        };
        path.push(owner.to_string());

        let generation = self.generation();
        let inventory_key = FieldValue::Int(inventory);

        let lines = generation.table::<InventoryPart>();
        for &ordinal in lines.lookup("inventory_id", &inventory_key).unwrap_or(&[]) {
            let Some(line) = lines.row(ordinal) else { continue };
            if line.is_spare && !options.include_spares {
                continue;
            }
            let total = totals
                .entry(PartColor::new(line.part_num.clone(), line.color_id))
                .or_insert(0);
            *total = total.saturating_add(line.quantity.saturating_mul(multiplier));
        }

        let subsets = generation.table::<InventorySet>();
        for &ordinal in subsets.lookup("inventory_id", &inventory_key).unwrap_or(&[]) {
            let Some(nested) = subsets.row(ordinal) else { continue };
            self.accumulate(
                &nested.set_num,
                multiplier.saturating_mul(nested.quantity),
                options,
                path,
                totals,
            )?;
        }

        if options.include_minifigs {
            let figs = generation.table::<InventoryMinifig>();
            for &ordinal in figs.lookup("inventory_id", &inventory_key).unwrap_or(&[]) {
                let Some(fig) = figs.row(ordinal) else { continue };
                self.accumulate(
                    &fig.fig_num,
                    multiplier.saturating_mul(fig.quantity),
                    options,
                    path,
                    totals,
                )?;
            }
        }

        path.pop();
        Ok(())
    }

    /// Parent chain of a theme, nearest parent first
    pub fn theme_ancestors(&self, theme_id: i64) -> QueryResult<Vec<&Theme>> {
        let themes = self.entity::<Theme>();
        let mut current = themes.find(theme_id)?;

        let mut seen = HashSet::new();
        seen.insert(current.id);
        let mut ancestors = Vec::new();

        while let Some(parent_id) = current.parent_id {
            if !seen.insert(parent_id) {
                return Err(QueryError::HierarchyCycle {
                    kind: EntityKind::Theme,
                    key: RowKey::from(theme_id),
                });
            }
            current = themes.find(parent_id)?;
            ancestors.push(current);
        }

        Ok(ancestors)
    }
}
