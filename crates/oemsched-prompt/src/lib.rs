//! Deterministic prompt synthesis for OEM maintenance-schedule extraction.
//!
//! The prompt pins the response shape hard: the JSON skeleton is embedded
//! literally, the closed sets are enumerated, and the expected coverage
//! categories are listed so an incomplete schedule self-identifies. Brand
//! appendices add code-system hints for makes whose schedules are driven by
//! a maintenance-minder algorithm rather than fixed intervals. No I/O; the
//! same source config always yields the same prompt string.

use std::fmt::Write as _;

use oemsched_model::SourceConfig;

/// Reduced token cap for Mercedes responses. Their code-based schedules run
/// long and routinely hit the default cap mid-array; a smaller cap plus the
/// brevity instruction in the appendix keeps responses complete.
const MERCEDES_MAX_OUTPUT_TOKENS: u32 = 8_192;

/// A schedule below this many entries is almost certainly incomplete.
const MIN_EXPECTED_ITEMS: usize = 12;

/// The literal response skeleton embedded in every prompt.
const RESPONSE_SKELETON: &str = r#"{
  "vehicle": {"make": null, "model": null, "year": null, "market": "US", "schedule_paradigm": "fixed_interval"},
  "powertrain": {
    "engine_code": null, "engine_family": null, "displacement_liters": null,
    "cylinder_count": null, "cylinder_layout": null, "valve_train": null,
    "forced_induction_type": null, "fuel_type": null, "horsepower": null,
    "torque_lb_ft": null, "redline_rpm": null, "compression_ratio": null,
    "transmission_code": null, "transmission_type": null, "transmission_speeds": null,
    "drive_type": null, "has_transfer_case": false
  },
  "fluid_specifications": [
    {"fluid_type": null, "capacity_liters": null, "capacity_quarts": null,
     "capacity_note": null, "fluid_spec": null, "fluid_spec_alt": null,
     "oem_part_number": null, "fluid_warning": null}
  ],
  "schedule_entries": [
    {"item_name": null, "action_type": null, "interval_type": "fixed_recurring",
     "interval_miles": null, "interval_months": null,
     "severe_interval_miles": null, "severe_interval_months": null,
     "severe_use_conditions": [], "severe_condition_description": null,
     "initial_miles": null, "initial_months": null,
     "relative_item_name": null, "relative_multiplier": null,
     "fallback_interval_miles": null, "fallback_interval_months": null,
     "has_conditional_replacement": false, "conditional_replacement_note": null,
     "requires_equipment": [], "excludes_equipment": [],
     "applies_to_engine_codes": [], "applies_to_trans_codes": [],
     "applies_from_year": null, "applies_to_year": null,
     "severe_use_only": false, "requirement_level": "required",
     "warranty_class": null, "oem_description": null,
     "oem_procedure_code": null, "service_code": null}
  ]
}"#;

const ACTION_TYPES: &str =
    "replace, inspect, check, lubricate, rotate, clean, reset, adjust, tighten_torque, diagnose_test";

const FLUID_TYPES: &str = "engine_oil, coolant, brake_fluid, transmission_fluid, \
transfer_case_fluid, front_differential_fluid, rear_differential_fluid, \
power_steering_fluid, washer_fluid, refrigerant";

const SCHEDULE_PARADIGMS: &str = "fixed_interval, algorithm_driven, hybrid";

const EXPECTED_CATEGORIES: &str = "\
- engine oil and oil filter
- engine air filter and cabin air filter
- spark plugs (gasoline engines)
- engine coolant
- brake fluid and brake pad/rotor inspection
- transmission fluid or CVT fluid
- drive belt / serpentine belt
- tire rotation
- battery and charging system
- suspension and steering linkage inspection
- exhaust system inspection
- wiper blades and washer fluid";

/// A synthesized prompt plus an optional per-call token-cap override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub max_output_tokens: Option<u32>,
}

/// Build the extraction prompt for one powertrain group.
#[must_use]
pub fn build_prompt(source: &SourceConfig) -> Prompt {
    let mut text = String::with_capacity(4096);

    writeln!(
        text,
        "You are an automotive maintenance data specialist. Produce the complete \
factory (OEM) maintenance schedule for the following vehicle powertrain."
    )
    .unwrap();
    writeln!(text).unwrap();
    writeln!(text, "Vehicle: {}", vehicle_description(source)).unwrap();
    writeln!(text).unwrap();
    writeln!(
        text,
        "Respond with ONLY a JSON object, no prose, matching this skeleton exactly:"
    )
    .unwrap();
    writeln!(text).unwrap();
    writeln!(text, "{RESPONSE_SKELETON}").unwrap();
    writeln!(text).unwrap();
    writeln!(text, "Constraints:").unwrap();
    writeln!(text, "- action_type must be one of: {ACTION_TYPES}").unwrap();
    writeln!(text, "- fluid_type must be one of: {FLUID_TYPES}").unwrap();
    writeln!(
        text,
        "- schedule_paradigm must be one of: {SCHEDULE_PARADIGMS}"
    )
    .unwrap();
    writeln!(
        text,
        "- intervals are in miles and calendar months; use null when the OEM \
specifies neither"
    )
    .unwrap();
    writeln!(
        text,
        "- include severe-service intervals and conditions where the OEM \
publishes them"
    )
    .unwrap();
    writeln!(text).unwrap();
    writeln!(
        text,
        "A complete schedule covers at least these areas; fewer than \
{MIN_EXPECTED_ITEMS} schedule_entries means items are likely missing:"
    )
    .unwrap();
    writeln!(text, "{EXPECTED_CATEGORIES}").unwrap();

    let mut max_output_tokens = None;
    if let Some(appendix) = brand_appendix(&source.make) {
        writeln!(text).unwrap();
        writeln!(text, "{appendix}").unwrap();
        if is_mercedes(&source.make) {
            max_output_tokens = Some(MERCEDES_MAX_OUTPUT_TOKENS);
        }
    }

    Prompt {
        text,
        max_output_tokens,
    }
}

/// Human-readable powertrain description line.
fn vehicle_description(source: &SourceConfig) -> String {
    let mut desc = if source.year_start == source.year_end {
        format!("{} {} {}", source.year_start, source.make, source.model)
    } else {
        format!(
            "{}-{} {} {}",
            source.year_start, source.year_end, source.make, source.model
        )
    };
    write!(desc, ", engine code {}", source.engine_code).unwrap();
    if let Some(disp) = source.displacement_liters {
        write!(desc, ", {disp:.1}L").unwrap();
    }
    if let Some(cyl) = source.cylinders {
        write!(desc, ", {cyl} cylinders").unwrap();
    }
    if let Some(fuel) = &source.fuel_type {
        write!(desc, ", {fuel}").unwrap();
    }
    if let Some(induction) = &source.forced_induction {
        write!(desc, ", {induction}").unwrap();
    }
    if let Some(trans) = &source.transmission_type {
        write!(desc, ", {trans} transmission").unwrap();
    }
    if let Some(drive) = &source.drive_type {
        write!(desc, ", {drive}").unwrap();
    }
    desc
}

fn is_mercedes(make: &str) -> bool {
    make.to_ascii_uppercase().contains("MERCEDES")
}

/// Brand-specific appendix for makes with code-based maintenance systems.
fn brand_appendix(make: &str) -> Option<&'static str> {
    let upper = make.to_ascii_uppercase();
    if upper.contains("HONDA") || upper.contains("ACURA") {
        return Some(
            "Brand notes (Honda/Acura Maintenance Minder): this vehicle uses the \
Maintenance Minder system. Main codes: A = oil change without filter, B = oil \
change with filter plus full inspection. Sub-items: 1 = tire rotation, 2 = air \
filter, cabin filter, drive belt inspection, 3 = transmission fluid, 4 = spark \
plugs, timing belt (if equipped), valve clearance, 5 = engine coolant. Use \
interval_type \"algorithm_driven\" with the Minder code in service_code and \
fallback_interval_miles/months set to the interval Honda recommends when the \
Minder has not triggered.",
        );
    }
    if upper.contains("MERCEDES") {
        return Some(
            "Brand notes (Mercedes-Benz flex service): this vehicle uses Service A / \
Service B (or numbered service codes on older models). Put the service code in \
service_code and use interval_type \"algorithm_driven\" with fallback intervals. \
Keep the response compact: omit optional fields that are null and do not repeat \
identical entries per service code, so the response fits within the output limit.",
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use oemsched_model::SourceConfig;

    fn source(make: &str) -> SourceConfig {
        SourceConfig {
            make: make.to_string(),
            model: "S60".to_string(),
            year_start: 2017,
            year_end: 2019,
            engine_code: "B4204T43".to_string(),
            displacement_liters: Some(2.0),
            cylinders: Some(4),
            fuel_type: Some("gasoline".to_string()),
            forced_induction: Some("twincharged".to_string()),
            transmission_type: Some("automatic".to_string()),
            drive_type: Some("awd".to_string()),
            taxonomy_ids: vec![1],
            vehicles: vec![(make.to_string(), "S60".to_string(), 2017)],
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt(&source("VOLVO"));
        let b = build_prompt(&source("VOLVO"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_embeds_skeleton_and_closed_sets() {
        let prompt = build_prompt(&source("VOLVO"));
        assert!(prompt.text.contains("\"schedule_entries\": ["));
        assert!(prompt.text.contains("\"fluid_specifications\": ["));
        assert!(prompt.text.contains("tighten_torque"));
        assert!(prompt.text.contains("transfer_case_fluid"));
        assert!(prompt.text.contains("algorithm_driven"));
        assert!(prompt.text.contains("fewer than 12 schedule_entries"));
    }

    #[test]
    fn test_prompt_describes_the_powertrain() {
        let prompt = build_prompt(&source("VOLVO"));
        assert!(prompt.text.contains("2017-2019 VOLVO S60"));
        assert!(prompt.text.contains("engine code B4204T43"));
        assert!(prompt.text.contains("2.0L"));
        assert!(prompt.text.contains("automatic transmission"));
    }

    #[test]
    fn test_single_year_range_collapses() {
        let mut src = source("VOLVO");
        src.year_end = 2017;
        let prompt = build_prompt(&src);
        assert!(prompt.text.contains("Vehicle: 2017 VOLVO S60"));
        assert!(!prompt.text.contains("2017-2017"));
    }

    #[test]
    fn test_plain_brand_has_no_appendix_or_cap() {
        let prompt = build_prompt(&source("VOLVO"));
        assert!(!prompt.text.contains("Brand notes"));
        assert_eq!(prompt.max_output_tokens, None);
    }

    #[test]
    fn test_honda_appendix() {
        for make in ["HONDA", "Acura"] {
            let prompt = build_prompt(&source(make));
            assert!(prompt.text.contains("Maintenance Minder"));
            assert!(prompt.text.contains("B = oil change with filter"));
            assert!(prompt.text.contains("5 = engine coolant"));
            assert_eq!(prompt.max_output_tokens, None, "no cap for {make}");
        }
    }

    #[test]
    fn test_mercedes_appendix_and_token_cap() {
        let prompt = build_prompt(&source("MERCEDES-BENZ"));
        assert!(prompt.text.contains("Service A"));
        assert!(prompt.text.contains("Keep the response compact"));
        assert_eq!(prompt.max_output_tokens, Some(8_192));
    }
}
