//! Row types mapped with `sqlx::FromRow`.

use sqlx::FromRow;

/// One vehicle taxonomy row (read-only except for the status fields).
#[derive(Debug, Clone, FromRow)]
pub struct TaxonomyRow {
    pub id: i64,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub engine_code: String,
    pub displacement_liters: Option<f64>,
    pub cylinders: Option<i32>,
    pub fuel_type: Option<String>,
    pub forced_induction: Option<String>,
    pub transmission_type: Option<String>,
    pub drive_type: Option<String>,
}

/// One canonical maintenance item, as loaded into the in-process catalog.
#[derive(Debug, Clone, FromRow)]
pub struct MaintenanceItemRow {
    pub id: i64,
    pub name: String,
    pub aliases: Option<Vec<String>>,
}

/// One validation rule row.
#[derive(Debug, Clone, FromRow)]
pub struct ValidationRuleRow {
    pub rule_name: String,
    pub item_name: Option<String>,
    pub action_type: Option<String>,
    pub min_interval_miles: Option<i32>,
    pub max_interval_miles: Option<i32>,
    pub min_interval_months: Option<i32>,
    pub max_interval_months: Option<i32>,
    pub severity: Option<String>,
}
