//! Pending powertrain groups read from the vehicle taxonomy.
//!
//! The taxonomy knows transmission *type* (automatic/manual/cvt), not the
//! OEM transmission *code*; the code arrives later from the LLM. A "source
//! config" is therefore one group of pending taxonomy rows sharing
//! `(engine_code, transmission_type, drive_type)`, and the group carries
//! every row so persistence can fan vehicle applications back out.

use std::collections::BTreeMap;

/// One distinct (make, model) range inside a source group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVehicle {
    pub make: String,
    pub model: String,
    pub year_start: i32,
    pub year_end: i32,
}

/// One pending powertrain group.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub make: String,
    pub model: String,
    pub year_start: i32,
    pub year_end: i32,
    pub engine_code: String,
    pub displacement_liters: Option<f64>,
    pub cylinders: Option<i32>,
    pub fuel_type: Option<String>,
    pub forced_induction: Option<String>,
    pub transmission_type: Option<String>,
    pub drive_type: Option<String>,
    /// Taxonomy row ids in this group; updated to `extracted`/`skipped`
    /// when the run terminates.
    pub taxonomy_ids: Vec<i64>,
    /// Every (make, model, year) triple in the group, collapsed into
    /// per-model year ranges by [`SourceConfig::applications`].
    pub vehicles: Vec<(String, String, i32)>,
}

impl SourceConfig {
    /// Distinct (make, model) pairs with min/max year over the group.
    #[must_use]
    pub fn applications(&self) -> Vec<SourceVehicle> {
        let mut ranges: BTreeMap<(String, String), (i32, i32)> = BTreeMap::new();
        for (make, model, year) in &self.vehicles {
            let entry = ranges
                .entry((make.clone(), model.clone()))
                .or_insert((*year, *year));
            entry.0 = entry.0.min(*year);
            entry.1 = entry.1.max(*year);
        }
        ranges
            .into_iter()
            .map(|((make, model), (year_start, year_end))| SourceVehicle {
                make,
                model,
                year_start,
                year_end,
            })
            .collect()
    }

    /// Short label for log lines, e.g. `B4204T43/automatic/awd`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}",
            self.engine_code,
            self.transmission_type.as_deref().unwrap_or("-"),
            self.drive_type.as_deref().unwrap_or("-"),
        )
    }
}
