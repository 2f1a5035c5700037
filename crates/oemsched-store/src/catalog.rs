//! The in-process maintenance-item catalog.
//!
//! The item table is an online-learned ontology: the LLM varies surface
//! form freely ("Brake Pad Inspection" vs "Inspect Brake Pads"), so instead
//! of hard-coding every spelling the catalog resolves names through
//! exact → alias → fuzzy lookup and creates a canonical item when all three
//! miss. Caches are a point-in-time snapshot loaded once per process;
//! cross-process coherency is handled by sharding runs per make, not here.
//!
//! Item creation happens on the pool, outside the persister's transaction:
//! catalog growth is monotonic and must survive a rolled-back run, or the
//! cache would hold ids for rows that no longer exist.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::{debug, info};

use oemsched_model::ItemCategory;
use oemsched_utils::similarity::sequence_ratio;

use crate::StoreError;
use crate::models::MaintenanceItemRow;

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Process-lifetime caches mapping normalized names and aliases to item ids.
pub struct ItemCatalog {
    by_name: HashMap<String, i64>,
    by_alias: HashMap<String, i64>,
    fuzzy_threshold: f64,
}

impl ItemCatalog {
    /// Load the catalog snapshot from `maintenance_items`.
    ///
    /// # Errors
    ///
    /// Any database error.
    pub async fn load(pool: &PgPool, fuzzy_threshold: f64) -> Result<Self, StoreError> {
        let rows: Vec<MaintenanceItemRow> =
            sqlx::query_as("SELECT id, name, aliases FROM maintenance_items ORDER BY id")
                .fetch_all(pool)
                .await?;
        let catalog = Self::from_rows(rows, fuzzy_threshold);
        info!(
            names = catalog.by_name.len(),
            aliases = catalog.by_alias.len(),
            "item catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a catalog from already-loaded rows (shared with tests).
    pub(crate) fn from_rows(rows: Vec<MaintenanceItemRow>, fuzzy_threshold: f64) -> Self {
        let mut by_name = HashMap::new();
        let mut by_alias = HashMap::new();
        for row in rows {
            by_name.entry(normalize(&row.name)).or_insert(row.id);
            for alias in row.aliases.unwrap_or_default() {
                // Aliases are not unique across items; first one wins
                by_alias.entry(normalize(&alias)).or_insert(row.id);
            }
        }
        Self {
            by_name,
            by_alias,
            fuzzy_threshold,
        }
    }

    /// Number of distinct canonical names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Resolve a free-text name against the caches without touching the
    /// database: exact name, then alias, then fuzzy. A fuzzy hit is
    /// memoized so the next occurrence of the same spelling is exact.
    pub fn lookup(&mut self, raw: &str) -> Option<i64> {
        let norm = normalize(raw);
        if let Some(&id) = self.by_name.get(&norm) {
            return Some(id);
        }
        if let Some(&id) = self.by_alias.get(&norm) {
            return Some(id);
        }
        if let Some(id) = self.fuzzy_lookup(&norm) {
            debug!(name = raw, id, "fuzzy-matched item name");
            self.by_alias.insert(norm, id);
            return Some(id);
        }
        None
    }

    /// Highest-ratio candidate across both maps, accepted iff the ratio
    /// reaches the threshold.
    fn fuzzy_lookup(&self, norm: &str) -> Option<i64> {
        let mut best: Option<(f64, i64)> = None;
        for (candidate, &id) in self.by_name.iter().chain(self.by_alias.iter()) {
            let ratio = sequence_ratio(norm, candidate);
            if best.is_none_or(|(best_ratio, _)| ratio > best_ratio) {
                best = Some((ratio, id));
            }
        }
        best.filter(|(ratio, _)| *ratio >= self.fuzzy_threshold)
            .map(|(_, id)| id)
    }

    /// Resolve a name, creating a canonical item when every lookup misses.
    ///
    /// New items get a category inferred from the keyword table, the
    /// original spelling as their sole alias, and the powertrain-dependent
    /// flag. The insert upserts on name so a concurrent creator (or a stale
    /// snapshot) resolves to the surviving row instead of failing.
    ///
    /// # Errors
    ///
    /// Any database error.
    pub async fn resolve_or_create(&mut self, pool: &PgPool, raw: &str) -> Result<i64, StoreError> {
        if let Some(id) = self.lookup(raw) {
            return Ok(id);
        }

        let name = raw.trim();
        let category = ItemCategory::infer(name);
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO maintenance_items (name, category, aliases, is_powertrain_specific) \
             VALUES ($1, $2, $3, true) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id",
        )
        .bind(name)
        .bind(category.to_string())
        .bind(vec![name.to_string()])
        .fetch_one(pool)
        .await?;

        info!(item = name, category = %category, id, "created maintenance item");
        self.by_name.insert(normalize(name), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, name: &str, aliases: &[&str]) -> MaintenanceItemRow {
        MaintenanceItemRow {
            id,
            name: name.to_string(),
            aliases: Some(aliases.iter().map(|a| (*a).to_string()).collect()),
        }
    }

    fn catalog() -> ItemCatalog {
        ItemCatalog::from_rows(
            vec![
                item(1, "Engine Oil", &["Motor Oil"]),
                item(2, "Engine Oil Filter", &["Oil Filter"]),
                item(3, "Brake Fluid", &[]),
                item(4, "Tire Rotation", &["Rotate Tires"]),
            ],
            0.80,
        )
    }

    #[test]
    fn test_exact_name_match() {
        let mut c = catalog();
        assert_eq!(c.lookup("Engine Oil"), Some(1));
        assert_eq!(c.lookup("  engine oil  "), Some(1));
    }

    #[test]
    fn test_alias_match() {
        let mut c = catalog();
        assert_eq!(c.lookup("Motor Oil"), Some(1));
        assert_eq!(c.lookup("oil filter"), Some(2));
    }

    #[test]
    fn test_name_match_wins_over_alias() {
        // "Engine Oil Filter" is both a name (id 2) and near "Engine Oil";
        // exact name lookup resolves before anything fuzzy
        let mut c = catalog();
        assert_eq!(c.lookup("Engine Oil Filter"), Some(2));
    }

    #[test]
    fn test_fuzzy_match_above_threshold() {
        let mut c = catalog();
        // "engine oil filters" vs "engine oil filter": ratio well above 0.80
        assert_eq!(c.lookup("Engine Oil Filters"), Some(2));
    }

    #[test]
    fn test_fuzzy_match_memoizes() {
        let mut c = catalog();
        assert_eq!(c.lookup("Engine Oil Filters"), Some(2));
        // Memoized: now an exact alias hit
        assert_eq!(c.by_alias.get("engine oil filters"), Some(&2));
    }

    #[test]
    fn test_below_threshold_misses() {
        let mut c = catalog();
        assert_eq!(c.lookup("Serpentine Belt Tensioner"), None);
    }

    #[test]
    fn test_first_alias_wins_on_collision() {
        let c = ItemCatalog::from_rows(
            vec![
                item(1, "Engine Oil", &["Oil Change"]),
                item(2, "Engine Oil Filter", &["Oil Change"]),
            ],
            0.80,
        );
        assert_eq!(c.by_alias.get("oil change"), Some(&1));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let mut strict = ItemCatalog::from_rows(vec![item(1, "abcdxy", &[])], 0.81);
        assert_eq!(strict.lookup("abcd"), None, "0.80 ratio under 0.81 threshold");

        let mut loose = ItemCatalog::from_rows(vec![item(1, "abcdxy", &[])], 0.80);
        assert_eq!(loose.lookup("abcd"), Some(1), "0.80 ratio at 0.80 threshold");
    }
}
