//! Settings validation against rules V-001 through V-004 and warnings W-001
//! through W-005.
//!
//! Returns **all** errors and warnings, not just the first. Validation does not
//! modify the settings and never gates evaluation: entries reported as errors
//! are the ones `compile` will skip.

use crate::enums::{ConditionOperator, ControlMode};
use crate::error::*;
use crate::types::*;
use regex::Regex;
use std::sync::LazyLock;

// ─── Cached regexes ─────────────────────────────────────────────────────────

static FIELD_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

static PIPING_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[A-Za-z0-9_\-:()]+\]").unwrap());

/// Validate settings, returning every error and warning found.
pub fn validate(settings: &Settings) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (i, cf) in settings.control_fields.iter().enumerate() {
        let path = format!("control_fields[{}]", i);

        match cf.mode() {
            ControlMode::Default => {
                v001_control_event(cf, &path, &mut errors);
                v002_control_field_key(cf, &path, &mut errors, &mut warnings);
            }
            ControlMode::Advanced => {
                v003_control_piping(cf, &path, &mut errors, &mut warnings);
            }
        }

        if cf.branching_logic.is_empty() {
            warnings.push(warning(
                "W-005",
                &path,
                "control field has no branching logic and restricts nothing",
            ));
        }

        for (j, bl) in cf.branching_logic.iter().enumerate() {
            let bl_path = format!("{}.branching_logic[{}]", path, j);
            v004_target_forms(bl, &bl_path, &mut errors);
            w001_operator(bl, &bl_path, &mut warnings);
            w004_target_events(bl, &bl_path, &mut warnings);
        }
    }

    ValidationResult { errors, warnings }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn warning(code: &str, path: &str, message: &str) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Warning,
        code: code.to_string(),
        path: Some(path.to_string()),
        message: message.to_string(),
    }
}

// V-001: default mode requires an event.
fn v001_control_event(cf: &ControlField, path: &str, errors: &mut Vec<ValidationError>) {
    if is_blank(&cf.control_event_id) {
        errors.push(ValidationError {
            rule: "V-001".to_string(),
            path: format!("{}.control_event_id", path),
            message: "default mode requires control_event_id".to_string(),
        });
    }
}

// V-002: default mode requires a field key; W-002 on unusual key syntax.
fn v002_control_field_key(
    cf: &ControlField,
    path: &str,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<Diagnostic>,
) {
    match cf.control_field_key.as_deref().map(str::trim) {
        None | Some("") => errors.push(ValidationError {
            rule: "V-002".to_string(),
            path: format!("{}.control_field_key", path),
            message: "default mode requires control_field_key".to_string(),
        }),
        Some(key) if !FIELD_KEY_RE.is_match(key) => warnings.push(warning(
            "W-002",
            &format!("{}.control_field_key", path),
            &format!("field key '{}' is not a valid variable name", key),
        )),
        Some(_) => {}
    }
}

// V-003: advanced mode requires a template; W-003 when it pipes nothing.
fn v003_control_piping(
    cf: &ControlField,
    path: &str,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<Diagnostic>,
) {
    match cf.control_piping.as_deref() {
        None | Some("") => errors.push(ValidationError {
            rule: "V-003".to_string(),
            path: format!("{}.control_piping", path),
            message: "advanced mode requires control_piping".to_string(),
        }),
        Some(template) if !PIPING_VAR_RE.is_match(template) => warnings.push(warning(
            "W-003",
            &format!("{}.control_piping", path),
            "template references no [variable]; it always evaluates to the same text",
        )),
        Some(_) => {}
    }
}

// V-004: an entry without target forms governs nothing.
fn v004_target_forms(bl: &BranchingLogic, path: &str, errors: &mut Vec<ValidationError>) {
    if bl.target_forms.iter().all(|f| f.trim().is_empty()) {
        errors.push(ValidationError {
            rule: "V-004".to_string(),
            path: format!("{}.target_forms", path),
            message: "branching logic has no target forms".to_string(),
        });
    }
}

// W-001: unknown operators compare with equality.
fn w001_operator(bl: &BranchingLogic, path: &str, warnings: &mut Vec<Diagnostic>) {
    let symbol = bl
        .condition_operator
        .as_deref()
        .filter(|op| !op.is_empty())
        .unwrap_or("=");
    if ConditionOperator::parse_known(symbol).is_none() {
        warnings.push(warning(
            "W-001",
            &format!("{}.condition_operator", path),
            &format!("unknown operator '{}' falls back to equality", symbol),
        ));
    }
}

// W-004: restricted to target events, but none selected.
fn w004_target_events(bl: &BranchingLogic, path: &str, warnings: &mut Vec<Diagnostic>) {
    if bl.target_events_select && bl.target_events.iter().all(|e| e.trim().is_empty()) {
        warnings.push(warning(
            "W-004",
            &format!("{}.target_events", path),
            "target_events_select is set but no target events are selected",
        ));
    }
}
