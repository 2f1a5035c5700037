//! Domain types shared across the extraction pipeline.
//!
//! `enums` holds the closed sets the pipeline enforces (action types,
//! interval types, statuses, item categories); `payload` mirrors the JSON
//! document the LLM is asked to produce; `source` describes a pending
//! powertrain group read from the vehicle taxonomy.

pub mod enums;
pub mod payload;
pub mod source;

pub use enums::{ActionType, IngestionStatus, IntervalType, ItemCategory, ScheduleStatus};
pub use payload::{
    ExtractedDocument, FluidSpecBlock, PowertrainBlock, ScheduleEntryBlock, VehicleBlock,
};
pub use source::{SourceConfig, SourceVehicle};
