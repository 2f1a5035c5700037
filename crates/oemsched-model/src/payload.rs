//! The JSON document shape the LLM is asked to produce.
//!
//! Every field is optional and every container defaults to empty: the
//! extractor may hand us a repaired (truncated) document, and a missing
//! block must degrade to "nothing extracted", not a decode failure. The
//! persister is the layer that decides which absences are fatal.

use serde::{Deserialize, Serialize};

/// Top-level response document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedDocument {
    pub vehicle: VehicleBlock,
    pub powertrain: PowertrainBlock,
    pub fluid_specifications: Vec<FluidSpecBlock>,
    pub schedule_entries: Vec<ScheduleEntryBlock>,
}

impl ExtractedDocument {
    /// Decode from an already-extracted JSON value.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error when the value is structurally
    /// incompatible (e.g. `schedule_entries` is an object).
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Vehicle identification block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleBlock {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub market: Option<String>,
    pub schedule_paradigm: Option<String>,
}

/// Powertrain metadata block. Source taxonomy values win over these on
/// merge; the LLM fills the holes (transmission code, layout, valvetrain).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PowertrainBlock {
    pub engine_code: Option<String>,
    pub engine_family: Option<String>,
    pub displacement_liters: Option<f64>,
    pub cylinder_count: Option<i32>,
    pub cylinder_layout: Option<String>,
    pub valve_train: Option<String>,
    pub forced_induction_type: Option<String>,
    pub fuel_type: Option<String>,
    pub horsepower: Option<i32>,
    pub torque_lb_ft: Option<i32>,
    pub redline_rpm: Option<i32>,
    pub compression_ratio: Option<String>,
    pub transmission_code: Option<String>,
    pub transmission_type: Option<String>,
    pub transmission_speeds: Option<i32>,
    pub drive_type: Option<String>,
    pub has_transfer_case: Option<bool>,
}

/// One fluid specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidSpecBlock {
    pub fluid_type: Option<String>,
    pub capacity_liters: Option<f64>,
    pub capacity_quarts: Option<f64>,
    pub capacity_note: Option<String>,
    pub fluid_spec: Option<String>,
    pub fluid_spec_alt: Option<String>,
    pub oem_part_number: Option<String>,
    pub fluid_warning: Option<String>,
}

/// One maintenance schedule entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleEntryBlock {
    pub item_name: Option<String>,
    pub action_type: Option<String>,
    pub interval_type: Option<String>,
    pub interval_miles: Option<i32>,
    pub interval_months: Option<i32>,
    pub severe_interval_miles: Option<i32>,
    pub severe_interval_months: Option<i32>,
    pub severe_use_conditions: Vec<String>,
    pub severe_condition_description: Option<String>,
    pub initial_miles: Option<i32>,
    pub initial_months: Option<i32>,
    pub relative_item_name: Option<String>,
    pub relative_multiplier: Option<f64>,
    pub fallback_interval_miles: Option<i32>,
    pub fallback_interval_months: Option<i32>,
    pub has_conditional_replacement: Option<bool>,
    pub conditional_replacement_note: Option<String>,
    pub requires_equipment: Vec<String>,
    pub excludes_equipment: Vec<String>,
    pub applies_to_engine_codes: Vec<String>,
    pub applies_to_trans_codes: Vec<String>,
    pub applies_from_year: Option<i32>,
    pub applies_to_year: Option<i32>,
    pub severe_use_only: Option<bool>,
    pub requirement_level: Option<String>,
    pub warranty_class: Option<String>,
    pub oem_description: Option<String>,
    pub oem_procedure_code: Option<String>,
    pub service_code: Option<String>,
}
