//! Validation-rule loading.

use sqlx::PgPool;
use tracing::warn;

use oemsched_model::ActionType;
use oemsched_validation::{ValidationRule, builtin_rules};

use crate::StoreError;
use crate::models::ValidationRuleRow;

/// Postgres error code for "relation does not exist".
const UNDEFINED_TABLE: &str = "42P01";

/// Load validation rules once at pipeline start.
///
/// Falls back to the built-in seed rules (with a warning) when the table is
/// missing or empty, so a fresh database still flags hallucinated
/// intervals. Other database errors propagate.
///
/// # Errors
///
/// Any database error other than a missing `validation_rules` table.
pub async fn load_validation_rules(pool: &PgPool) -> Result<Vec<ValidationRule>, StoreError> {
    let result: Result<Vec<ValidationRuleRow>, sqlx::Error> = sqlx::query_as(
        "SELECT rule_name, item_name, action_type, min_interval_miles, max_interval_miles, \
         min_interval_months, max_interval_months, severity \
         FROM validation_rules ORDER BY rule_name",
    )
    .fetch_all(pool)
    .await;

    match result {
        Ok(rows) if rows.is_empty() => {
            warn!("validation_rules table is empty; using built-in seed rules");
            Ok(builtin_rules())
        }
        Ok(rows) => Ok(rows.into_iter().map(rule_from_row).collect()),
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
            warn!("validation_rules table does not exist; using built-in seed rules");
            Ok(builtin_rules())
        }
        Err(err) => Err(err.into()),
    }
}

fn rule_from_row(row: ValidationRuleRow) -> ValidationRule {
    ValidationRule {
        rule_name: row.rule_name,
        item_name: row.item_name,
        action_type: row.action_type.as_deref().map(ActionType::normalize),
        min_interval_miles: row.min_interval_miles,
        max_interval_miles: row.max_interval_miles,
        min_interval_months: row.min_interval_months,
        max_interval_months: row.max_interval_months,
        severity: row.severity.unwrap_or_else(|| "warning".to_string()),
    }
}
