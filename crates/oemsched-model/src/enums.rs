//! Closed sets enforced by the pipeline.
//!
//! The LLM is prompted with these sets verbatim, but its output is never
//! trusted: every inbound string passes through a normalizer that lands on
//! a member of the set or a documented default.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Maintenance action performed on an item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    Replace,
    Inspect,
    Check,
    Lubricate,
    Rotate,
    Clean,
    Reset,
    Adjust,
    TightenTorque,
    DiagnoseTest,
}

impl ActionType {
    /// Normalize a free-text action into the closed set.
    ///
    /// Canonical spellings parse directly; common OEM synonyms map through
    /// the alias table; anything else defaults to `inspect` so a surprising
    /// verb never drops an entry. Idempotent: normalizing an already
    /// canonical value returns it unchanged.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim().to_ascii_lowercase();
        if let Ok(action) = trimmed.parse::<Self>() {
            return action;
        }
        match trimmed.as_str() {
            "change" | "flush" | "service" | "refill" => Self::Replace,
            "top_off" | "top off" | "measure" => Self::Check,
            "test" => Self::DiagnoseTest,
            "torque" => Self::TightenTorque,
            "lube" | "grease" => Self::Lubricate,
            "examine" => Self::Inspect,
            _ => Self::Inspect,
        }
    }
}

/// How a schedule entry's interval is interpreted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntervalType {
    /// Repeats every N miles / months.
    #[default]
    FixedRecurring,
    /// Happens once (timing belt at 150k).
    FixedOneTime,
    /// Driven by the vehicle's maintenance-minder algorithm; the fixed
    /// fields act as fallbacks.
    AlgorithmDriven,
    /// Interval derived from another item's interval times a multiplier.
    RelativeToItem,
}

impl IntervalType {
    /// Parse an optional free-text interval type, defaulting to
    /// `fixed_recurring` when absent or unrecognized.
    #[must_use]
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().to_ascii_lowercase().parse().ok())
            .unwrap_or_default()
    }
}

/// Extraction progress of a vehicle taxonomy row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ScheduleStatus {
    Pending,
    Extracted,
    Skipped,
}

impl ScheduleStatus {
    /// String form used in SQL binds.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Extracted => "extracted",
            Self::Skipped => "skipped",
        }
    }
}

/// Terminal outcome of one pipeline invocation, recorded in the ingestion log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum IngestionStatus {
    /// Schedule rows committed.
    Loaded,
    /// Valid response with zero entries; taxonomy moved to skipped.
    Flagged,
    /// Transport, parse, or persistence failure; taxonomy stays pending.
    Rejected,
}

impl IngestionStatus {
    /// String form used in SQL binds.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Flagged => "flagged",
            Self::Rejected => "rejected",
        }
    }
}

/// Category assigned to a maintenance item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemCategory {
    Engine,
    Ignition,
    Filters,
    Fluids,
    Brakes,
    Cooling,
    TiresWheels,
    SteeringSuspension,
    Drivetrain,
    Exhaust,
    FuelSystem,
    Electrical,
    Hvac,
    Safety,
    Body,
}

/// Keyword table scanned in declaration order when a new item is created.
/// The first keyword contained in the lowercased item name wins.
const CATEGORY_KEYWORDS: &[(&str, ItemCategory)] = &[
    ("spark plug", ItemCategory::Ignition),
    ("ignition", ItemCategory::Ignition),
    ("coil", ItemCategory::Ignition),
    ("filter", ItemCategory::Filters),
    ("belt", ItemCategory::Engine),
    ("timing chain", ItemCategory::Engine),
    ("valve", ItemCategory::Engine),
    ("brake", ItemCategory::Brakes),
    ("coolant", ItemCategory::Cooling),
    ("radiator", ItemCategory::Cooling),
    ("thermostat", ItemCategory::Cooling),
    ("tire", ItemCategory::TiresWheels),
    ("wheel", ItemCategory::TiresWheels),
    ("steering", ItemCategory::SteeringSuspension),
    ("suspension", ItemCategory::SteeringSuspension),
    ("strut", ItemCategory::SteeringSuspension),
    ("shock", ItemCategory::SteeringSuspension),
    ("tie rod", ItemCategory::SteeringSuspension),
    ("ball joint", ItemCategory::SteeringSuspension),
    ("transmission", ItemCategory::Drivetrain),
    ("differential", ItemCategory::Drivetrain),
    ("transfer case", ItemCategory::Drivetrain),
    ("driveshaft", ItemCategory::Drivetrain),
    ("propeller shaft", ItemCategory::Drivetrain),
    ("axle", ItemCategory::Drivetrain),
    ("clutch", ItemCategory::Drivetrain),
    ("exhaust", ItemCategory::Exhaust),
    ("muffler", ItemCategory::Exhaust),
    ("catalytic", ItemCategory::Exhaust),
    ("fuel", ItemCategory::FuelSystem),
    ("injector", ItemCategory::FuelSystem),
    ("battery", ItemCategory::Electrical),
    ("alternator", ItemCategory::Electrical),
    ("lamp", ItemCategory::Electrical),
    ("light", ItemCategory::Electrical),
    ("horn", ItemCategory::Electrical),
    ("a/c", ItemCategory::Hvac),
    ("air conditioning", ItemCategory::Hvac),
    ("refrigerant", ItemCategory::Hvac),
    ("airbag", ItemCategory::Safety),
    ("seat belt", ItemCategory::Safety),
    ("restraint", ItemCategory::Safety),
    ("wiper", ItemCategory::Body),
    ("hinge", ItemCategory::Body),
    ("latch", ItemCategory::Body),
    ("fluid", ItemCategory::Fluids),
    ("oil", ItemCategory::Fluids),
    ("hose", ItemCategory::Cooling),
];

impl ItemCategory {
    /// Infer a category for a new item from its free-text name.
    #[must_use]
    pub fn infer(item_name: &str) -> Self {
        let lowered = item_name.to_lowercase();
        for (keyword, category) in CATEGORY_KEYWORDS {
            if lowered.contains(keyword) {
                return *category;
            }
        }
        Self::Engine
    }
}
