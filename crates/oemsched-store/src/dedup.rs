//! Powertrain config deduplication.
//!
//! One `powertrain_configs` row per distinct
//! `(engine_code, transmission_code, drive_type)` triple, where a NULL
//! transmission code is a distinct value rather than a wildcard. Multiple
//! vehicle ranges share one config; the lookup here is what makes a second
//! Volvo trim land on the first one's schedule instead of duplicating it.

use sqlx::PgConnection;

use oemsched_model::{PowertrainBlock, SourceConfig};

use crate::StoreError;

/// Field-by-field merge of source taxonomy values with the LLM's
/// powertrain block. Source fields win; the LLM fills nulls.
#[derive(Debug, Clone, Default)]
pub struct MergedPowertrain {
    pub engine_code: String,
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

/// Merge the source config with the LLM's powertrain block.
#[must_use]
pub fn merge_powertrain(source: &SourceConfig, llm: &PowertrainBlock) -> MergedPowertrain {
    MergedPowertrain {
        engine_code: source.engine_code.clone(),
        engine_family: llm.engine_family.clone(),
        displacement_liters: source.displacement_liters.or(llm.displacement_liters),
        cylinder_count: source.cylinders.or(llm.cylinder_count),
        cylinder_layout: llm.cylinder_layout.clone(),
        valve_train: llm.valve_train.clone(),
        forced_induction_type: source
            .forced_induction
            .clone()
            .or_else(|| llm.forced_induction_type.clone()),
        fuel_type: source.fuel_type.clone().or_else(|| llm.fuel_type.clone()),
        horsepower: llm.horsepower,
        torque_lb_ft: llm.torque_lb_ft,
        redline_rpm: llm.redline_rpm,
        compression_ratio: llm.compression_ratio.clone(),
        transmission_code: llm.transmission_code.clone(),
        transmission_type: source
            .transmission_type
            .clone()
            .or_else(|| llm.transmission_type.clone()),
        transmission_speeds: llm.transmission_speeds,
        drive_type: source.drive_type.clone().or_else(|| llm.drive_type.clone()),
        has_transfer_case: llm.has_transfer_case,
    }
}

/// Result of the find-or-create lookup.
#[derive(Debug, Clone, Copy)]
pub struct ConfigResolution {
    pub id: i64,
    /// True when the triple already had a config row (a duplicate source
    /// group reusing an existing schedule).
    pub existing: bool,
}

/// Find the config row for a merged powertrain, inserting it on miss.
///
/// Runs inside the persister's transaction: a created config must roll
/// back with the schedule rows that reference it.
///
/// # Errors
///
/// Any database error.
pub async fn find_or_create_config(
    conn: &mut PgConnection,
    merged: &MergedPowertrain,
) -> Result<ConfigResolution, StoreError> {
    let existing: Option<(i64,)> = match &merged.transmission_code {
        Some(code) => {
            sqlx::query_as(
                "SELECT id FROM powertrain_configs \
                 WHERE engine_code = $1 AND transmission_code = $2 \
                   AND drive_type IS NOT DISTINCT FROM $3",
            )
            .bind(&merged.engine_code)
            .bind(code)
            .bind(&merged.drive_type)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT id FROM powertrain_configs \
                 WHERE engine_code = $1 AND transmission_code IS NULL \
                   AND drive_type IS NOT DISTINCT FROM $2",
            )
            .bind(&merged.engine_code)
            .bind(&merged.drive_type)
            .fetch_optional(&mut *conn)
            .await?
        }
    };

    if let Some((id,)) = existing {
        return Ok(ConfigResolution { id, existing: true });
    }

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO powertrain_configs \
         (engine_code, engine_family, displacement_liters, cylinder_count, cylinder_layout, \
          valve_train, forced_induction_type, fuel_type, horsepower, torque_lb_ft, \
          redline_rpm, compression_ratio, transmission_code, transmission_type, \
          transmission_speeds, drive_type, has_transfer_case) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
         RETURNING id",
    )
    .bind(&merged.engine_code)
    .bind(&merged.engine_family)
    .bind(merged.displacement_liters)
    .bind(merged.cylinder_count)
    .bind(&merged.cylinder_layout)
    .bind(&merged.valve_train)
    .bind(&merged.forced_induction_type)
    .bind(&merged.fuel_type)
    .bind(merged.horsepower)
    .bind(merged.torque_lb_ft)
    .bind(merged.redline_rpm)
    .bind(&merged.compression_ratio)
    .bind(&merged.transmission_code)
    .bind(&merged.transmission_type)
    .bind(merged.transmission_speeds)
    .bind(&merged.drive_type)
    .bind(merged.has_transfer_case)
    .fetch_one(&mut *conn)
    .await?;

    Ok(ConfigResolution {
        id,
        existing: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceConfig {
        SourceConfig {
            make: "VOLVO".to_string(),
            model: "S60".to_string(),
            year_start: 2017,
            year_end: 2017,
            engine_code: "B4204T43".to_string(),
            displacement_liters: Some(2.0),
            cylinders: Some(4),
            fuel_type: Some("gasoline".to_string()),
            forced_induction: None,
            transmission_type: Some("automatic".to_string()),
            drive_type: Some("awd".to_string()),
            taxonomy_ids: vec![1],
            vehicles: vec![("VOLVO".to_string(), "S60".to_string(), 2017)],
        }
    }

    #[test]
    fn test_merge_source_wins() {
        let llm = PowertrainBlock {
            engine_code: Some("WRONG".to_string()),
            displacement_liters: Some(1.8),
            fuel_type: Some("diesel".to_string()),
            ..PowertrainBlock::default()
        };
        let merged = merge_powertrain(&source(), &llm);
        assert_eq!(merged.engine_code, "B4204T43");
        assert_eq!(merged.displacement_liters, Some(2.0));
        assert_eq!(merged.fuel_type.as_deref(), Some("gasoline"));
    }

    #[test]
    fn test_merge_llm_fills_nulls() {
        let llm = PowertrainBlock {
            engine_family: Some("VEP".to_string()),
            cylinder_layout: Some("inline".to_string()),
            valve_train: Some("DOHC".to_string()),
            forced_induction_type: Some("twincharged".to_string()),
            transmission_code: Some("TG-81SC".to_string()),
            transmission_speeds: Some(8),
            horsepower: Some(362),
            has_transfer_case: Some(false),
            ..PowertrainBlock::default()
        };
        let merged = merge_powertrain(&source(), &llm);
        assert_eq!(merged.engine_family.as_deref(), Some("VEP"));
        assert_eq!(merged.forced_induction_type.as_deref(), Some("twincharged"));
        assert_eq!(merged.transmission_code.as_deref(), Some("TG-81SC"));
        assert_eq!(merged.transmission_speeds, Some(8));
        assert_eq!(merged.horsepower, Some(362));
    }

    #[test]
    fn test_merge_keeps_transmission_type_from_source() {
        let llm = PowertrainBlock {
            transmission_type: Some("dual-clutch".to_string()),
            ..PowertrainBlock::default()
        };
        let merged = merge_powertrain(&source(), &llm);
        assert_eq!(merged.transmission_type.as_deref(), Some("automatic"));
    }
}
