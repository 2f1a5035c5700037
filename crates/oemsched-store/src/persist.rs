//! Transactional persistence of one extracted schedule.
//!
//! Item canonicalization runs first, on the pool: the item catalog is
//! monotonic and must survive a rollback. Everything else (config row,
//! schedule rows, fluid upserts, vehicle applications, service codes,
//! taxonomy updates, and the ingestion-log row) executes in one
//! transaction in a fixed order, so a partial observer never sees schedule
//! rows for a config whose applications do not exist yet. Any database
//! error rolls the whole run back; the caller then logs the rejection in
//! its own transaction.

use sqlx::{PgConnection, PgPool};
use tracing::debug;

use oemsched_model::{
    ActionType, ExtractedDocument, IngestionStatus, IntervalType, ScheduleEntryBlock, SourceConfig,
};
use oemsched_validation::{EntryDigest, ValidationOutcome, Validator};

use crate::StoreError;
use crate::catalog::ItemCatalog;
use crate::dedup::{find_or_create_config, merge_powertrain};
use crate::log::{IngestionRecord, append_ingestion_log};
use crate::taxonomy::mark_extracted;

/// Provenance tag on every schedule row this pipeline writes.
const DATA_SOURCE: &str = "gemini_extracted";

/// Honda/Acura Maintenance Minder code glossary.
const HONDA_MINDER_CODES: (&str, &[(&str, &str)]) = (
    "honda_maintenance_minder",
    &[
        ("A", "Oil change without filter"),
        ("B", "Oil change with filter plus full inspection"),
        ("1", "Tire rotation"),
        ("2", "Air filter, cabin filter, drive belt inspection"),
        ("3", "Transmission fluid"),
        ("4", "Spark plugs, timing belt (if equipped), valve clearance"),
        ("5", "Engine coolant"),
    ],
);

/// Mercedes-Benz flex service code glossary.
const MERCEDES_FLEX_CODES: (&str, &[(&str, &str)]) = (
    "mercedes_flex_service",
    &[
        ("A", "Service A: oil and filter change plus basic checks"),
        ("B", "Service B: Service A plus cabin filter and brake fluid check"),
        ("3", "Service 3: Service A plus transmission fluid and engine air filter"),
        ("4", "Service 4: Service B plus spark plugs, coolant, and brake fluid change"),
    ],
);

/// Run context captured into the ingestion log.
#[derive(Debug, Clone, Copy)]
pub struct RunMeta<'a> {
    pub prompt: &'a str,
    pub raw_response: &'a str,
    pub model: &'a str,
}

/// What one committed run wrote.
#[derive(Debug, Clone)]
pub struct PersistOutcome {
    pub config_id: i64,
    pub config_existed: bool,
    pub schedule_rows: usize,
    pub fluid_rows: usize,
    pub application_rows: usize,
    /// Rows inserted with `needs_review = true`.
    pub review_rows: usize,
    pub log_id: i64,
    /// Schedule-level validation warnings (also joined into the log row).
    pub warnings: Vec<String>,
}

/// One schedule entry after canonicalization and validation.
struct ResolvedEntry<'d> {
    entry: &'d ScheduleEntryBlock,
    item_name: &'d str,
    item_id: i64,
    action: ActionType,
    interval_type: IntervalType,
    relative_item_id: Option<i64>,
    outcome: ValidationOutcome,
}

/// Persists one extracted document.
pub struct Persister<'a> {
    pub pool: &'a PgPool,
    pub catalog: &'a mut ItemCatalog,
    pub validator: &'a Validator,
}

impl Persister<'_> {
    /// Persist a non-empty extraction transactionally.
    ///
    /// # Errors
    ///
    /// Any database error; the transaction is rolled back and no rows
    /// besides catalog items persist.
    pub async fn persist_extraction(
        &mut self,
        source: &SourceConfig,
        doc: &ExtractedDocument,
        meta: &RunMeta<'_>,
    ) -> Result<PersistOutcome, StoreError> {
        let resolved = self.resolve_entries(doc).await?;

        let digests: Vec<EntryDigest<'_>> = resolved
            .iter()
            .map(|r| EntryDigest {
                item_name: r.item_name,
                action: r.action,
                description: r.entry.oem_description.as_deref(),
            })
            .collect();
        let fuel_type = doc
            .powertrain
            .fuel_type
            .as_deref()
            .or(source.fuel_type.as_deref());
        let warnings = self.validator.schedule_warnings(fuel_type, &digests);

        let mut tx = self.pool.begin().await?;

        let merged = merge_powertrain(source, &doc.powertrain);
        let resolution = find_or_create_config(&mut tx, &merged).await?;

        let mut review_rows = 0;
        for entry in &resolved {
            insert_schedule_row(&mut tx, resolution.id, entry).await?;
            if entry.outcome.needs_review {
                review_rows += 1;
            }
        }

        let mut fluid_rows = 0;
        for fluid in &doc.fluid_specifications {
            let Some(fluid_type) = fluid.fluid_type.as_deref() else {
                continue;
            };
            upsert_fluid_spec(&mut tx, resolution.id, fluid_type, fluid).await?;
            fluid_rows += 1;
        }

        let applications = source.applications();
        for app in &applications {
            sqlx::query(
                "INSERT INTO vehicle_applications \
                 (powertrain_config_id, make, model, year_start, year_end, market, schedule_paradigm) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(resolution.id)
            .bind(&app.make)
            .bind(&app.model)
            .bind(app.year_start)
            .bind(app.year_end)
            .bind(doc.vehicle.market.as_deref().unwrap_or("US"))
            .bind(doc.vehicle.schedule_paradigm.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        persist_service_codes(
            &mut tx,
            &source.make,
            doc.vehicle.schedule_paradigm.as_deref(),
        )
        .await?;

        mark_extracted(&mut *tx, &source.taxonomy_ids, resolution.id).await?;

        let mut validation_notes: Vec<String> = warnings.clone();
        validation_notes.extend(
            resolved
                .iter()
                .filter_map(|r| r.outcome.notes.clone()),
        );
        let log_id = append_ingestion_log(
            &mut *tx,
            &IngestionRecord {
                make: &source.make,
                model: &source.model,
                engine_code: &source.engine_code,
                transmission_code: merged.transmission_code.as_deref(),
                drive_type: merged.drive_type.as_deref(),
                model_used: meta.model,
                status: IngestionStatus::Loaded,
                prompt: meta.prompt,
                raw_response: Some(meta.raw_response),
                schedule_row_count: resolved.len() as i32,
                fluid_row_count: fluid_rows as i32,
                validation_notes: join_notes(&validation_notes),
                powertrain_config_id: Some(resolution.id),
                is_duplicate: resolution.existing,
                error_detail: None,
            },
        )
        .await?;

        tx.commit().await?;

        debug!(
            config_id = resolution.id,
            schedule_rows = resolved.len(),
            fluid_rows,
            review_rows,
            "extraction committed"
        );

        Ok(PersistOutcome {
            config_id: resolution.id,
            config_existed: resolution.existing,
            schedule_rows: resolved.len(),
            fluid_rows,
            application_rows: applications.len(),
            review_rows,
            log_id,
            warnings,
        })
    }

    /// Canonicalize item names and validate intervals, pool-level.
    /// Entries without an item name are dropped here.
    async fn resolve_entries<'d>(
        &mut self,
        doc: &'d ExtractedDocument,
    ) -> Result<Vec<ResolvedEntry<'d>>, StoreError> {
        let mut resolved = Vec::with_capacity(doc.schedule_entries.len());
        for entry in &doc.schedule_entries {
            let Some(item_name) = entry.item_name.as_deref() else {
                continue;
            };
            if item_name.trim().is_empty() {
                continue;
            }

            let action = entry
                .action_type
                .as_deref()
                .map_or(ActionType::Inspect, ActionType::normalize);
            let item_id = self.catalog.resolve_or_create(self.pool, item_name).await?;

            let relative_item_id = match entry.relative_item_name.as_deref() {
                Some(relative) if !relative.trim().is_empty() => {
                    Some(self.catalog.resolve_or_create(self.pool, relative).await?)
                }
                _ => None,
            };

            let outcome = self.validator.evaluate(
                item_name,
                action,
                entry.interval_miles,
                entry.interval_months,
            );

            resolved.push(ResolvedEntry {
                entry,
                item_name,
                item_id,
                action,
                interval_type: IntervalType::parse_or_default(entry.interval_type.as_deref()),
                relative_item_id,
                outcome,
            });
        }
        Ok(resolved)
    }
}

fn join_notes(notes: &[String]) -> Option<String> {
    if notes.is_empty() {
        None
    } else {
        Some(notes.join("; "))
    }
}

async fn insert_schedule_row(
    conn: &mut PgConnection,
    config_id: i64,
    resolved: &ResolvedEntry<'_>,
) -> Result<(), StoreError> {
    let entry = resolved.entry;
    sqlx::query(
        "INSERT INTO maintenance_schedules \
         (powertrain_config_id, maintenance_item_id, action_type, interval_type, \
          interval_miles, interval_months, severe_interval_miles, severe_interval_months, \
          severe_use_conditions, severe_condition_description, initial_miles, initial_months, \
          relative_item_id, relative_multiplier, fallback_interval_miles, fallback_interval_months, \
          has_conditional_replacement, conditional_replacement_note, \
          requires_equipment, excludes_equipment, applies_to_engine_codes, applies_to_trans_codes, \
          applies_from_year, applies_to_year, severe_use_only, requirement_level, warranty_class, \
          oem_description, oem_procedure_code, service_code, \
          data_source, confidence, needs_review, review_notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                 $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, \
                 $31, $32, $33, $34)",
    )
    .bind(config_id)
    .bind(resolved.item_id)
    .bind(resolved.action.to_string())
    .bind(resolved.interval_type.to_string())
    .bind(entry.interval_miles)
    .bind(entry.interval_months)
    .bind(entry.severe_interval_miles)
    .bind(entry.severe_interval_months)
    .bind(&entry.severe_use_conditions)
    .bind(&entry.severe_condition_description)
    .bind(entry.initial_miles)
    .bind(entry.initial_months)
    .bind(resolved.relative_item_id)
    .bind(entry.relative_multiplier)
    .bind(entry.fallback_interval_miles)
    .bind(entry.fallback_interval_months)
    .bind(entry.has_conditional_replacement.unwrap_or(false))
    .bind(&entry.conditional_replacement_note)
    .bind(&entry.requires_equipment)
    .bind(&entry.excludes_equipment)
    .bind(&entry.applies_to_engine_codes)
    .bind(&entry.applies_to_trans_codes)
    .bind(entry.applies_from_year)
    .bind(entry.applies_to_year)
    .bind(entry.severe_use_only.unwrap_or(false))
    .bind(&entry.requirement_level)
    .bind(&entry.warranty_class)
    .bind(&entry.oem_description)
    .bind(&entry.oem_procedure_code)
    .bind(&entry.service_code)
    .bind(DATA_SOURCE)
    .bind(resolved.outcome.confidence.as_str())
    .bind(resolved.outcome.needs_review)
    .bind(&resolved.outcome.notes)
    .execute(conn)
    .await?;
    Ok(())
}

/// Upsert on `(powertrain_config_id, fluid_type)`, merging by COALESCE so
/// an existing non-null value survives a null in the new data.
async fn upsert_fluid_spec(
    conn: &mut PgConnection,
    config_id: i64,
    fluid_type: &str,
    fluid: &oemsched_model::FluidSpecBlock,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO fluid_specifications \
         (powertrain_config_id, fluid_type, capacity_liters, capacity_quarts, capacity_note, \
          fluid_spec, fluid_spec_alt, oem_part_number, fluid_warning) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (powertrain_config_id, fluid_type) DO UPDATE SET \
          capacity_liters = COALESCE(fluid_specifications.capacity_liters, EXCLUDED.capacity_liters), \
          capacity_quarts = COALESCE(fluid_specifications.capacity_quarts, EXCLUDED.capacity_quarts), \
          capacity_note = COALESCE(fluid_specifications.capacity_note, EXCLUDED.capacity_note), \
          fluid_spec = COALESCE(fluid_specifications.fluid_spec, EXCLUDED.fluid_spec), \
          fluid_spec_alt = COALESCE(fluid_specifications.fluid_spec_alt, EXCLUDED.fluid_spec_alt), \
          oem_part_number = COALESCE(fluid_specifications.oem_part_number, EXCLUDED.oem_part_number), \
          fluid_warning = COALESCE(fluid_specifications.fluid_warning, EXCLUDED.fluid_warning)",
    )
    .bind(config_id)
    .bind(fluid_type)
    .bind(fluid.capacity_liters)
    .bind(fluid.capacity_quarts)
    .bind(&fluid.capacity_note)
    .bind(&fluid.fluid_spec)
    .bind(&fluid.fluid_spec_alt)
    .bind(&fluid.oem_part_number)
    .bind(&fluid.fluid_warning)
    .execute(conn)
    .await?;
    Ok(())
}

/// Persist the brand's service-code glossary for code-based schedules.
///
/// Honda/Acura and Mercedes carry static glossaries; other makes reporting
/// an algorithm-driven paradigm have nothing static to record.
async fn persist_service_codes(
    conn: &mut PgConnection,
    make: &str,
    schedule_paradigm: Option<&str>,
) -> Result<(), StoreError> {
    let upper = make.to_ascii_uppercase();
    let (system_name, codes) = if upper.contains("HONDA") || upper.contains("ACURA") {
        HONDA_MINDER_CODES
    } else if upper.contains("MERCEDES") {
        MERCEDES_FLEX_CODES
    } else if schedule_paradigm == Some("algorithm_driven") {
        debug!(make, "algorithm-driven paradigm with no static code glossary");
        return Ok(());
    } else {
        return Ok(());
    };

    let (system_id,): (i64,) = sqlx::query_as(
        "INSERT INTO service_code_systems (make, system_name) VALUES ($1, $2) \
         ON CONFLICT (make, system_name) DO UPDATE SET system_name = EXCLUDED.system_name \
         RETURNING id",
    )
    .bind(make)
    .bind(system_name)
    .fetch_one(&mut *conn)
    .await?;

    for (code, description) in codes {
        sqlx::query(
            "INSERT INTO service_code_definitions (system_id, code, description) \
             VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(system_id)
        .bind(code)
        .bind(description)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_notes() {
        assert_eq!(join_notes(&[]), None);
        assert_eq!(
            join_notes(&["a".to_string(), "b".to_string()]),
            Some("a; b".to_string())
        );
    }

    #[test]
    fn test_brand_code_glossaries_cover_documented_codes() {
        let (name, codes) = HONDA_MINDER_CODES;
        assert_eq!(name, "honda_maintenance_minder");
        let labels: Vec<&str> = codes.iter().map(|(code, _)| *code).collect();
        assert_eq!(labels, vec!["A", "B", "1", "2", "3", "4", "5"]);

        let (name, codes) = MERCEDES_FLEX_CODES;
        assert_eq!(name, "mercedes_flex_service");
        let labels: Vec<&str> = codes.iter().map(|(code, _)| *code).collect();
        assert_eq!(labels, vec!["A", "B", "3", "4"]);
    }

    #[test]
    fn test_data_source_tag() {
        assert_eq!(DATA_SOURCE, "gemini_extracted");
    }
}
