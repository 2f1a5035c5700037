//! End-to-end response scenarios: raw LLM text through extraction, document
//! decode, action normalization, and interval validation. The database is
//! exercised separately; everything up to the transaction boundary runs
//! here exactly as the driver runs it.

use oemsched_extraction::extract_json;
use oemsched_model::{ActionType, ExtractedDocument, IntervalType, ItemCategory, SourceConfig};
use oemsched_prompt::build_prompt;
use oemsched_validation::{Confidence, Validator, builtin_rules};

fn volvo_source() -> SourceConfig {
    SourceConfig {
        make: "VOLVO".to_string(),
        model: "S60".to_string(),
        year_start: 2017,
        year_end: 2017,
        engine_code: "B4204T43".to_string(),
        displacement_liters: Some(2.0),
        cylinders: Some(4),
        fuel_type: Some("gasoline".to_string()),
        forced_induction: Some("twincharged".to_string()),
        transmission_type: Some("automatic".to_string()),
        drive_type: Some("awd".to_string()),
        taxonomy_ids: vec![1],
        vehicles: vec![("VOLVO".to_string(), "S60".to_string(), 2017)],
    }
}

/// A complete fenced response: 18 schedule entries, 4 fluid specs.
fn happy_path_response() -> String {
    let items = [
        ("Engine Oil", "replace", 10_000),
        ("Engine Oil Filter", "replace", 10_000),
        ("Air Filter", "replace", 30_000),
        ("Cabin Air Filter", "replace", 20_000),
        ("Spark Plugs", "replace", 60_000),
        ("Engine Coolant", "replace", 100_000),
        ("Brake Fluid", "replace", 40_000),
        ("Brake Pads", "inspect", 10_000),
        ("Transmission Fluid", "check", 50_000),
        ("Drive Belt", "inspect", 40_000),
        ("Timing Belt", "replace", 150_000),
        ("Tire Rotation", "rotate", 7_500),
        ("Battery", "test", 20_000),
        ("Propeller Shaft", "check", 40_000),
        ("Suspension Components", "inspect", 20_000),
        ("Exhaust System", "inspect", 30_000),
        ("Wiper Blades", "replace", 15_000),
        ("Washer Fluid", "top_off", 10_000),
    ];
    let entries: Vec<String> = items
        .iter()
        .map(|(name, action, miles)| {
            format!(
                "{{\"item_name\": \"{name}\", \"action_type\": \"{action}\", \
                 \"interval_miles\": {miles}, \"interval_months\": 12}}"
            )
        })
        .collect();

    format!(
        "Here is the OEM maintenance schedule:\n```json\n{{\n\
         \"vehicle\": {{\"make\": \"VOLVO\", \"model\": \"S60\", \"year\": 2017, \
         \"market\": \"US\", \"schedule_paradigm\": \"fixed_interval\"}},\n\
         \"powertrain\": {{\"engine_code\": \"B4204T43\", \"transmission_code\": \"TG-81SC\", \
         \"transmission_type\": \"automatic\", \"drive_type\": \"awd\", \"fuel_type\": \"gasoline\"}},\n\
         \"fluid_specifications\": [\n\
           {{\"fluid_type\": \"engine_oil\", \"capacity_liters\": 5.9, \"fluid_spec\": \"0W-20\"}},\n\
           {{\"fluid_type\": \"coolant\", \"capacity_liters\": 8.9}},\n\
           {{\"fluid_type\": \"brake_fluid\", \"fluid_spec\": \"DOT 4\"}},\n\
           {{\"fluid_type\": \"transmission_fluid\", \"capacity_liters\": 7.0}}\n\
         ],\n\
         \"schedule_entries\": [{}]\n\
         }}\n```\n",
        entries.join(",\n")
    )
}

#[test]
fn happy_path_yields_full_document() {
    let raw = happy_path_response();
    let value = extract_json(&raw).expect("fenced response extracts");
    let doc = ExtractedDocument::from_value(value).expect("document decodes");

    assert_eq!(doc.schedule_entries.len(), 18);
    assert_eq!(doc.fluid_specifications.len(), 4);
    assert_eq!(doc.vehicle.make.as_deref(), Some("VOLVO"));
    assert_eq!(doc.powertrain.transmission_code.as_deref(), Some("TG-81SC"));

    // Every action lands in the closed set; none of the 18 trips a rule
    let validator = Validator::new(builtin_rules(), 0.80);
    for entry in &doc.schedule_entries {
        let action = entry
            .action_type
            .as_deref()
            .map_or(ActionType::Inspect, ActionType::normalize);
        let outcome = validator.evaluate(
            entry.item_name.as_deref().unwrap(),
            action,
            entry.interval_miles,
            entry.interval_months,
        );
        assert!(
            !outcome.needs_review,
            "unexpected review flag for {:?}: {:?}",
            entry.item_name, outcome.notes
        );
        assert_eq!(outcome.confidence, Confidence::High);
    }

    // Alias normalization on the way in: test → diagnose_test, top_off → check
    let battery = &doc.schedule_entries[12];
    assert_eq!(
        ActionType::normalize(battery.action_type.as_deref().unwrap()),
        ActionType::DiagnoseTest
    );
    let washer = &doc.schedule_entries[17];
    assert_eq!(
        ActionType::normalize(washer.action_type.as_deref().unwrap()),
        ActionType::Check
    );
}

#[test]
fn truncated_response_loads_complete_entries() {
    // Token cap hit inside the 12th entry's description
    let mut raw = String::from("{\"vehicle\": {\"make\": \"BMW\"}, \"schedule_entries\": [");
    for i in 0..11 {
        raw.push_str(&format!(
            "{{\"item_name\": \"Item {i}\", \"action_type\": \"replace\", \"interval_miles\": 10000}},"
        ));
    }
    raw.push_str("{\"item_name\": \"Item 11\", \"oem_description\": \"Replace the engine o");

    let value = extract_json(&raw).expect("truncation repairs");
    let doc = ExtractedDocument::from_value(value).unwrap();
    assert_eq!(doc.schedule_entries.len(), 11);
    assert_eq!(doc.vehicle.make.as_deref(), Some("BMW"));
}

#[test]
fn trailing_comma_response_loads() {
    let raw = "{\"schedule_entries\": [\
               {\"item_name\": \"Engine Oil\", \"action_type\": \"change\", \"interval_miles\": 10000}, \
               ]}";
    let value = extract_json(raw).expect("comma repair succeeds");
    let doc = ExtractedDocument::from_value(value).unwrap();
    assert_eq!(doc.schedule_entries.len(), 1);
    assert_eq!(
        ActionType::normalize(doc.schedule_entries[0].action_type.as_deref().unwrap()),
        ActionType::Replace
    );
}

#[test]
fn empty_schedule_is_detected_for_flagging() {
    let raw = "{\"vehicle\": {\"make\": \"VOLVO\"}, \"schedule_entries\": []}";
    let value = extract_json(raw).unwrap();
    let doc = ExtractedDocument::from_value(value).unwrap();
    // The driver flags on this condition: taxonomy -> skipped, no rows
    assert!(doc.schedule_entries.is_empty());
}

#[test]
fn unknown_item_gets_engine_category_from_belt_keyword() {
    assert_eq!(
        ItemCategory::infer("Serpentine Belt Tensioner"),
        ItemCategory::Engine
    );
}

#[test]
fn rule_violation_flags_but_never_rejects() {
    let validator = Validator::new(builtin_rules(), 0.80);
    let outcome = validator.evaluate(
        "Engine Oil Filter",
        ActionType::normalize("replace"),
        Some(25_000),
        None,
    );
    assert!(outcome.needs_review);
    assert_eq!(outcome.confidence, Confidence::Low);
    let notes = outcome.notes.unwrap();
    assert!(notes.contains("oil_filter_replacement"));
    assert!(notes.contains("mi > max"));
}

#[test]
fn algorithm_driven_entries_carry_fallbacks() {
    // Honda Maintenance Minder shape: coded entry with fallback intervals
    let raw = "{\"schedule_entries\": [\
               {\"item_name\": \"Engine Oil\", \"action_type\": \"replace\", \
                \"interval_type\": \"algorithm_driven\", \"service_code\": \"A\", \
                \"fallback_interval_miles\": 7500, \"fallback_interval_months\": 12}]}";
    let doc = ExtractedDocument::from_value(extract_json(raw).unwrap()).unwrap();
    let entry = &doc.schedule_entries[0];
    assert_eq!(
        IntervalType::parse_or_default(entry.interval_type.as_deref()),
        IntervalType::AlgorithmDriven
    );
    assert_eq!(entry.service_code.as_deref(), Some("A"));
    assert_eq!(entry.fallback_interval_miles, Some(7500));
}

#[test]
fn prompt_and_response_shapes_agree() {
    // The skeleton the prompt embeds decodes into the document type the
    // pipeline consumes, so the instruction and the parser cannot drift.
    let prompt = build_prompt(&volvo_source());
    let skeleton_start = prompt.text.find("{\n").unwrap();
    let skeleton = &prompt.text[skeleton_start..];
    let value = extract_json(skeleton).expect("embedded skeleton is valid JSON");
    let doc = ExtractedDocument::from_value(value).expect("skeleton matches document shape");
    assert_eq!(doc.schedule_entries.len(), 1);
    assert_eq!(doc.fluid_specifications.len(), 1);
}
