use crate::enums::ControlMode;
use crate::types::*;

/// Normalize settings into their canonical fully-expanded form.
/// All defaults are materialized and identifier lists are cleaned.
///
/// This is idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(mut settings: Settings) -> Settings {
    for cf in settings.control_fields.iter_mut() {
        n001_control_defaults(cf);
        n002_trim_identifiers(cf);

        for bl in cf.branching_logic.iter_mut() {
            n003_condition_defaults(bl);
            n004_clean_targets(bl);
        }
    }

    settings
}

// ─── N-001: Control field defaults ───────────────────────────────────────────

fn n001_control_defaults(cf: &mut ControlField) {
    if cf.control_mode.is_none() {
        cf.control_mode = Some(ControlMode::Default);
    }

    // An absent default compares as the empty string, never as "missing"
    if cf.control_default_value.is_none() {
        cf.control_default_value = Some(String::new());
    }
}

// ─── N-002: Identifier trimming ──────────────────────────────────────────────

fn n002_trim_identifiers(cf: &mut ControlField) {
    for id in [&mut cf.control_event_id, &mut cf.control_field_key] {
        if let Some(s) = id {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
    }
}

// ─── N-003: Condition defaults ───────────────────────────────────────────────

fn n003_condition_defaults(bl: &mut BranchingLogic) {
    match &bl.condition_operator {
        None => bl.condition_operator = Some("=".to_string()),
        Some(op) if op.is_empty() => bl.condition_operator = Some("=".to_string()),
        Some(_) => {}
    }

    if bl.condition_value.is_none() {
        bl.condition_value = Some(String::new());
    }
}

// ─── N-004: Target list cleanup ──────────────────────────────────────────────

fn n004_clean_targets(bl: &mut BranchingLogic) {
    clean_list(&mut bl.target_events);
    clean_list(&mut bl.target_forms);
}

/// Trims entries, drops blanks and removes duplicates keeping first occurrence.
fn clean_list(list: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    let cleaned: Vec<String> = list
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect();
    *list = cleaned;
}
