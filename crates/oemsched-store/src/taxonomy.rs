//! Pending-work discovery and taxonomy status updates.

use std::collections::HashMap;

use sqlx::PgPool;

use oemsched_model::{ScheduleStatus, SourceConfig};

use crate::StoreError;
use crate::models::TaxonomyRow;

const PENDING_COLUMNS: &str = "id, make, model, year, engine_code, displacement_liters, \
cylinders, fuel_type, forced_induction, transmission_type, drive_type";

/// Load pending taxonomy rows and group them into source configs.
///
/// Rows are grouped by `(engine_code, transmission_type, drive_type)`: the
/// taxonomy does not know OEM transmission codes, so transmission *type*
/// stands in until the LLM supplies the code. Groups come back in stable
/// `engine_code` order; `limit` bounds the number of groups, not rows.
///
/// # Errors
///
/// Any database error.
pub async fn pending_source_configs(
    pool: &PgPool,
    make: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<SourceConfig>, StoreError> {
    let rows: Vec<TaxonomyRow> = match make {
        Some(make) => {
            let sql = format!(
                "SELECT {PENDING_COLUMNS} FROM nhtsa_vehicle_taxonomy \
                 WHERE schedule_status = 'pending' AND UPPER(make) = UPPER($1) \
                 ORDER BY engine_code, make, model, year"
            );
            sqlx::query_as(&sql).bind(make).fetch_all(pool).await?
        }
        None => {
            let sql = format!(
                "SELECT {PENDING_COLUMNS} FROM nhtsa_vehicle_taxonomy \
                 WHERE schedule_status = 'pending' \
                 ORDER BY engine_code, make, model, year"
            );
            sqlx::query_as(&sql).fetch_all(pool).await?
        }
    };

    let mut groups = group_rows(rows);
    if let Some(limit) = limit {
        groups.truncate(limit);
    }
    Ok(groups)
}

/// Group taxonomy rows by `(engine_code, transmission_type, drive_type)`,
/// preserving the incoming row order for group ordering.
pub(crate) fn group_rows(rows: Vec<TaxonomyRow>) -> Vec<SourceConfig> {
    let mut groups: Vec<SourceConfig> = Vec::new();
    let mut index: HashMap<(String, Option<String>, Option<String>), usize> = HashMap::new();

    for row in rows {
        let key = (
            row.engine_code.clone(),
            row.transmission_type.clone(),
            row.drive_type.clone(),
        );
        match index.get(&key) {
            Some(&slot) => {
                let group = &mut groups[slot];
                group.year_start = group.year_start.min(row.year);
                group.year_end = group.year_end.max(row.year);
                // Later rows fill engine metadata the first row lacked
                group.displacement_liters = group.displacement_liters.or(row.displacement_liters);
                group.cylinders = group.cylinders.or(row.cylinders);
                group.fuel_type = group.fuel_type.take().or(row.fuel_type);
                group.forced_induction = group.forced_induction.take().or(row.forced_induction);
                group.taxonomy_ids.push(row.id);
                group.vehicles.push((row.make, row.model, row.year));
            }
            None => {
                index.insert(key, groups.len());
                groups.push(SourceConfig {
                    make: row.make.clone(),
                    model: row.model.clone(),
                    year_start: row.year,
                    year_end: row.year,
                    engine_code: row.engine_code,
                    displacement_liters: row.displacement_liters,
                    cylinders: row.cylinders,
                    fuel_type: row.fuel_type,
                    forced_induction: row.forced_induction,
                    transmission_type: row.transmission_type,
                    drive_type: row.drive_type,
                    taxonomy_ids: vec![row.id],
                    vehicles: vec![(row.make, row.model, row.year)],
                });
            }
        }
    }

    groups
}

/// Mark a group's taxonomy rows extracted and link them to a config.
///
/// # Errors
///
/// Any database error.
pub async fn mark_extracted(
    executor: impl sqlx::PgExecutor<'_>,
    taxonomy_ids: &[i64],
    config_id: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE nhtsa_vehicle_taxonomy \
         SET schedule_status = $1, powertrain_config_id = $2 \
         WHERE id = ANY($3)",
    )
    .bind(ScheduleStatus::Extracted.as_str())
    .bind(config_id)
    .bind(taxonomy_ids.to_vec())
    .execute(executor)
    .await?;
    Ok(())
}

/// Mark a group's taxonomy rows skipped, with no config linkage.
///
/// # Errors
///
/// Any database error.
pub async fn mark_skipped(
    executor: impl sqlx::PgExecutor<'_>,
    taxonomy_ids: &[i64],
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE nhtsa_vehicle_taxonomy \
         SET schedule_status = $1, powertrain_config_id = NULL \
         WHERE id = ANY($2)",
    )
    .bind(ScheduleStatus::Skipped.as_str())
    .bind(taxonomy_ids.to_vec())
    .execute(executor)
    .await?;
    Ok(())
}
