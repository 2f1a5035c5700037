//! Interval validation against a rule base.
//!
//! The validator is advisory: it never rejects an entry. A violated rule
//! marks the row `needs_review` with machine-readable notes and drops
//! confidence to low; the row still loads. This is the hallucination
//! tripwire: an oil change at 50,000 miles or spark plugs at 5,000 load
//! flagged instead of silently poisoning the schedule.

use oemsched_model::ActionType;
use oemsched_utils::similarity::sequence_ratio;

/// One predicate row from the `validation_rules` table.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub rule_name: String,
    /// Restrict to entries whose item name matches (exact or fuzzy).
    pub item_name: Option<String>,
    /// Restrict to entries with this action.
    pub action_type: Option<ActionType>,
    pub min_interval_miles: Option<i32>,
    pub max_interval_miles: Option<i32>,
    pub min_interval_months: Option<i32>,
    pub max_interval_months: Option<i32>,
    pub severity: String,
}

/// Row confidence derived from validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Low,
}

impl Confidence {
    /// String form used in SQL binds.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

/// Result of validating one schedule entry.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub needs_review: bool,
    pub notes: Option<String>,
    pub confidence: Confidence,
}

/// Summary view of an entry for schedule-level checks.
#[derive(Debug, Clone, Copy)]
pub struct EntryDigest<'a> {
    pub item_name: &'a str,
    pub action: ActionType,
    pub description: Option<&'a str>,
}

/// Rule evaluator, constructed once at pipeline start.
pub struct Validator {
    rules: Vec<ValidationRule>,
    fuzzy_threshold: f64,
}

impl Validator {
    #[must_use]
    pub fn new(rules: Vec<ValidationRule>, fuzzy_threshold: f64) -> Self {
        Self {
            rules,
            fuzzy_threshold,
        }
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate one entry against every applicable rule.
    #[must_use]
    pub fn evaluate(
        &self,
        item_name: &str,
        action: ActionType,
        interval_miles: Option<i32>,
        interval_months: Option<i32>,
    ) -> ValidationOutcome {
        let mut violations: Vec<String> = Vec::new();

        for rule in &self.rules {
            if let Some(target) = &rule.item_name {
                if !self.matches_item(item_name, target) {
                    continue;
                }
            }
            if let Some(required_action) = rule.action_type {
                if required_action != action {
                    continue;
                }
            }

            if let Some(miles) = interval_miles {
                if let Some(min) = rule.min_interval_miles {
                    if miles < min {
                        violations.push(format!(
                            "{}: {miles} mi < {min} mi min",
                            rule.rule_name
                        ));
                    }
                }
                if let Some(max) = rule.max_interval_miles {
                    if miles > max {
                        violations.push(format!(
                            "{}: {miles} mi > {max} mi max",
                            rule.rule_name
                        ));
                    }
                }
            }
            if let Some(months) = interval_months {
                if let Some(min) = rule.min_interval_months {
                    if months < min {
                        violations.push(format!(
                            "{}: {months} mo < {min} mo min",
                            rule.rule_name
                        ));
                    }
                }
                if let Some(max) = rule.max_interval_months {
                    if months > max {
                        violations.push(format!(
                            "{}: {months} mo > {max} mo max",
                            rule.rule_name
                        ));
                    }
                }
            }
        }

        if violations.is_empty() {
            ValidationOutcome {
                needs_review: false,
                notes: None,
                confidence: Confidence::High,
            }
        } else {
            ValidationOutcome {
                needs_review: true,
                notes: Some(violations.join("; ")),
                confidence: Confidence::Low,
            }
        }
    }

    /// Schedule-level advisory checks across all entries of one response.
    ///
    /// Catches hallucination patterns individual rules cannot see: a
    /// combustion engine with no oil change at all, and entries whose OEM
    /// description contradicts their action type.
    #[must_use]
    pub fn schedule_warnings(
        &self,
        fuel_type: Option<&str>,
        entries: &[EntryDigest<'_>],
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(fuel) = fuel_type {
            let lowered = fuel.to_lowercase();
            let combustion = ["gas", "petrol", "diesel", "flex"]
                .iter()
                .any(|kw| lowered.contains(kw));
            let has_oil_change = entries.iter().any(|e| {
                e.item_name.to_lowercase().contains("oil") && e.action == ActionType::Replace
            });
            if combustion && !has_oil_change {
                warnings.push(format!(
                    "no engine oil replacement entry for a {fuel} engine"
                ));
            }
        }

        for entry in entries {
            if entry.action == ActionType::Inspect {
                if let Some(description) = entry.description {
                    if description.to_lowercase().contains("replace") {
                        warnings.push(format!(
                            "'{}': description says replace but action_type is inspect",
                            entry.item_name
                        ));
                    }
                }
            }
        }

        warnings
    }

    fn matches_item(&self, item_name: &str, target: &str) -> bool {
        let item = item_name.trim().to_lowercase();
        let target = target.trim().to_lowercase();
        item == target || sequence_ratio(&item, &target) >= self.fuzzy_threshold
    }
}

/// Built-in seed rules used when the `validation_rules` table is empty.
/// Bounds are deliberately loose; they exist to catch order-of-magnitude
/// hallucinations, not to encode any one OEM's schedule.
#[must_use]
pub fn builtin_rules() -> Vec<ValidationRule> {
    fn rule(
        name: &str,
        item: Option<&str>,
        action: Option<ActionType>,
        min_mi: Option<i32>,
        max_mi: Option<i32>,
    ) -> ValidationRule {
        ValidationRule {
            rule_name: name.to_string(),
            item_name: item.map(str::to_string),
            action_type: action,
            min_interval_miles: min_mi,
            max_interval_miles: max_mi,
            min_interval_months: None,
            max_interval_months: None,
            severity: "warning".to_string(),
        }
    }

    vec![
        rule(
            "engine_oil_replacement",
            Some("Engine Oil"),
            Some(ActionType::Replace),
            Some(3_000),
            Some(15_000),
        ),
        rule(
            "oil_filter_replacement",
            Some("Engine Oil Filter"),
            Some(ActionType::Replace),
            Some(3_000),
            Some(15_000),
        ),
        rule(
            "spark_plug_replacement",
            Some("Spark Plugs"),
            Some(ActionType::Replace),
            Some(20_000),
            Some(120_000),
        ),
        rule(
            "engine_coolant_replacement",
            Some("Engine Coolant"),
            Some(ActionType::Replace),
            Some(30_000),
            Some(150_000),
        ),
        rule(
            "brake_fluid_replacement",
            Some("Brake Fluid"),
            Some(ActionType::Replace),
            Some(15_000),
            Some(60_000),
        ),
        rule(
            "tire_rotation",
            None,
            Some(ActionType::Rotate),
            Some(3_000),
            Some(10_000),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(builtin_rules(), 0.80)
    }

    #[test]
    fn test_short_oil_interval_flags() {
        let outcome = validator().evaluate("Engine Oil", ActionType::Replace, Some(2_000), None);
        assert!(outcome.needs_review);
        assert_eq!(outcome.confidence, Confidence::Low);
        let notes = outcome.notes.unwrap();
        assert!(notes.contains("engine_oil_replacement"));
        assert!(notes.contains("2000 mi < 3000 mi min"));
    }

    #[test]
    fn test_normal_oil_interval_passes() {
        let outcome = validator().evaluate("Engine Oil", ActionType::Replace, Some(5_000), None);
        assert!(!outcome.needs_review);
        assert!(outcome.notes.is_none());
        assert_eq!(outcome.confidence, Confidence::High);
    }

    #[test]
    fn test_long_filter_interval_flags_max() {
        let outcome =
            validator().evaluate("Engine Oil Filter", ActionType::Replace, Some(25_000), None);
        assert!(outcome.needs_review);
        let notes = outcome.notes.unwrap();
        assert!(notes.contains("oil_filter_replacement"));
        assert!(notes.contains("mi > max"));
    }

    #[test]
    fn test_action_restriction_skips_rule() {
        // Inspecting the oil at 1,000 miles is fine; only replacement is bounded
        let outcome = validator().evaluate("Engine Oil", ActionType::Inspect, Some(1_000), None);
        assert!(!outcome.needs_review);
    }

    #[test]
    fn test_fuzzy_item_match_within_threshold() {
        // "engine oil " with padding still matches the rule target
        let outcome = validator().evaluate(" Engine Oil ", ActionType::Replace, Some(500), None);
        assert!(outcome.needs_review);
    }

    #[test]
    fn test_fuzzy_threshold_boundary() {
        // ratio("abcd", "abcdxy") == 0.8 exactly: the rule applies
        let rules = vec![ValidationRule {
            rule_name: "boundary".to_string(),
            item_name: Some("abcdxy".to_string()),
            action_type: None,
            min_interval_miles: Some(1_000),
            max_interval_miles: None,
            min_interval_months: None,
            max_interval_months: None,
            severity: "warning".to_string(),
        }];
        let v = Validator::new(rules, 0.80);
        let at_threshold = v.evaluate("abcd", ActionType::Replace, Some(100), None);
        assert!(at_threshold.needs_review, "ratio == 0.80 must be accepted");

        // ratio("abcdefgxy", "abcdefgzw") < 0.8: the rule must not apply
        let rules = vec![ValidationRule {
            rule_name: "boundary".to_string(),
            item_name: Some("abcdefgzw".to_string()),
            action_type: None,
            min_interval_miles: Some(1_000),
            max_interval_miles: None,
            min_interval_months: None,
            max_interval_months: None,
            severity: "warning".to_string(),
        }];
        let v = Validator::new(rules, 0.80);
        let below = v.evaluate("abcdefgxy", ActionType::Replace, Some(100), None);
        assert!(!below.needs_review, "ratio < 0.80 must not be accepted");
    }

    #[test]
    fn test_month_bounds() {
        let rules = vec![ValidationRule {
            rule_name: "coolant_months".to_string(),
            item_name: Some("Engine Coolant".to_string()),
            action_type: Some(ActionType::Replace),
            min_interval_miles: None,
            max_interval_miles: None,
            min_interval_months: Some(24),
            max_interval_months: Some(120),
            severity: "warning".to_string(),
        }];
        let v = Validator::new(rules, 0.80);
        let outcome = v.evaluate("Engine Coolant", ActionType::Replace, None, Some(6));
        let notes = outcome.notes.unwrap();
        assert!(notes.contains("6 mo < 24 mo min"));
    }

    #[test]
    fn test_multiple_violations_joined() {
        let rules = vec![
            ValidationRule {
                rule_name: "rule_a".to_string(),
                item_name: None,
                action_type: None,
                min_interval_miles: Some(5_000),
                max_interval_miles: None,
                min_interval_months: None,
                max_interval_months: None,
                severity: "warning".to_string(),
            },
            ValidationRule {
                rule_name: "rule_b".to_string(),
                item_name: None,
                action_type: None,
                min_interval_miles: Some(10_000),
                max_interval_miles: None,
                min_interval_months: None,
                max_interval_months: None,
                severity: "warning".to_string(),
            },
        ];
        let v = Validator::new(rules, 0.80);
        let outcome = v.evaluate("Anything", ActionType::Replace, Some(1_000), None);
        let notes = outcome.notes.unwrap();
        assert!(notes.contains("rule_a"));
        assert!(notes.contains("; rule_b"));
    }

    #[test]
    fn test_missing_intervals_never_violate() {
        let outcome = validator().evaluate("Engine Oil", ActionType::Replace, None, None);
        assert!(!outcome.needs_review);
    }

    #[test]
    fn test_schedule_warning_missing_oil_change() {
        let entries = [EntryDigest {
            item_name: "Tire Rotation",
            action: ActionType::Rotate,
            description: None,
        }];
        let warnings = validator().schedule_warnings(Some("gasoline"), &entries);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("no engine oil replacement"));
    }

    #[test]
    fn test_schedule_warning_not_raised_for_electric() {
        let entries = [EntryDigest {
            item_name: "Tire Rotation",
            action: ActionType::Rotate,
            description: None,
        }];
        let warnings = validator().schedule_warnings(Some("electric"), &entries);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_schedule_warning_action_description_mismatch() {
        let entries = [EntryDigest {
            item_name: "Drive Belt",
            action: ActionType::Inspect,
            description: Some("Replace the drive belt"),
        }];
        let warnings = validator().schedule_warnings(None, &entries);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Drive Belt"));
        assert!(warnings[0].contains("description says replace"));
    }

    #[test]
    fn test_schedule_clean_when_oil_change_present() {
        let entries = [EntryDigest {
            item_name: "Engine Oil",
            action: ActionType::Replace,
            description: Some("Replace engine oil"),
        }];
        let warnings = validator().schedule_warnings(Some("gasoline"), &entries);
        assert!(warnings.is_empty());
    }
}
