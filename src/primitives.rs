//! Comparison and value-resolution primitives shared by the matrix builder.

use crate::compile::{CompiledRule, ControlSource};
use crate::enums::ConditionOperator;
use crate::evaluate::{PipingEvaluator, ProjectMetadata, RecordDataSource};
use crate::types::*;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

// ─── Numeric strings ────────────────────────────────────────────────────────

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\n\r\x0B\x0C]*[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?[ \t\n\r\x0B\x0C]*$")
        .unwrap()
});

/// Whether `s` is a numeric string: optional surrounding whitespace, an
/// optional sign, a decimal number and an optional exponent.
///
/// `"0x1A"`, `"1_000"`, `"inf"` and the empty string are not numeric.
pub fn is_numeric(s: &str) -> bool {
    NUMERIC_RE.is_match(s)
}

fn as_number(s: &str) -> Option<f64> {
    if !is_numeric(s) {
        return None;
    }
    s.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\x0B')
        .parse::<f64>()
        .ok()
}

// ─── compare_values ─────────────────────────────────────────────────────────

/// Orders two values: numerically when both are numeric strings, byte-wise
/// otherwise. So `"9" < "10"` but `"9a" > "10a"`.
pub fn compare_values(a: &str, b: &str) -> Ordering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

// ─── evaluate_condition ─────────────────────────────────────────────────────

/// Evaluates `left <op> right`.
///
/// Equality is strict: `"18"` and `"18.0"` are different values. The ordering
/// operators go through [`compare_values`].
pub fn evaluate_condition(operator: ConditionOperator, left: &str, right: &str) -> bool {
    match operator {
        ConditionOperator::Equal => left == right,
        ConditionOperator::NotEqual => left != right,
        ConditionOperator::GreaterThan => compare_values(left, right) == Ordering::Greater,
        ConditionOperator::GreaterOrEqual => compare_values(left, right) != Ordering::Less,
        ConditionOperator::LessThan => compare_values(left, right) == Ordering::Less,
        ConditionOperator::LessOrEqual => compare_values(left, right) != Ordering::Greater,
    }
}

/// Evaluates a condition given as a raw operator symbol. Unknown symbols
/// compare with equality.
pub fn evaluate_symbol(symbol: &str, left: &str, right: &str) -> bool {
    evaluate_condition(ConditionOperator::from_symbol(symbol), left, right)
}

// ─── resolve_left_value ─────────────────────────────────────────────────────

/// Produces the left-hand comparison value of `rule` for one record.
///
/// - Piping: the rendered template, unless it renders to the empty string.
/// - Field: the stored value, but only when the field's form has data for the
///   record at the control event.
///
/// Anything else yields the rule's default value.
pub fn resolve_left_value(
    rule: &CompiledRule,
    record_id: &str,
    rows: &RecordRows,
    data: &dyn RecordDataSource,
    metadata: &dyn ProjectMetadata,
    piping: &dyn PipingEvaluator,
) -> String {
    match &rule.source {
        ControlSource::Piping { template, event_id } => {
            let piped = piping.evaluate(template, record_id, event_id.as_deref());
            if piped.is_empty() {
                rule.default_value.clone()
            } else {
                piped
            }
        }
        ControlSource::Field {
            event_id,
            field_key,
        } => {
            let stored = rows.get(event_id).and_then(|fields| fields.get(field_key));
            match stored {
                Some(value)
                    if metadata
                        .form_for_field(field_key)
                        .is_some_and(|form| data.form_has_data(record_id, &form, event_id)) =>
                {
                    value.clone()
                }
                _ => rule.default_value.clone(),
            }
        }
    }
}

// ─── pipe_template ──────────────────────────────────────────────────────────

static PIPING_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z0-9_\-]+)(?::[A-Za-z0-9_\-]+)?\]").unwrap());

/// Renders `[field]` and `[event][field]` references against one record.
///
/// An unqualified `[field]` reads `event_id` when given, otherwise the first
/// event (in key order) that stores the field. A `[x][y]` pair is read as an
/// event-qualified reference only when `x` is an event of the record.
/// `:modifier` suffixes are accepted and ignored. Unresolved references
/// render as the empty string.
pub fn pipe_template(template: &str, event_id: Option<&str>, rows: &RecordRows) -> String {
    let tokens: Vec<(usize, usize, &str)> = PIPING_TOKEN_RE
        .captures_iter(template)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((whole.start(), whole.end(), name.as_str()))
        })
        .collect();

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < tokens.len() {
        let (start, end, name) = tokens[i];
        out.push_str(&template[cursor..start]);

        let qualified = tokens
            .get(i + 1)
            .filter(|(next_start, _, _)| *next_start == end && rows.contains_key(name));

        match qualified {
            Some(&(_, next_end, field)) => {
                out.push_str(lookup(rows, Some(name), field));
                cursor = next_end;
                i += 2;
            }
            None => {
                out.push_str(lookup(rows, event_id, name));
                cursor = end;
                i += 1;
            }
        }
    }

    out.push_str(&template[cursor..]);
    out
}

fn lookup<'r>(rows: &'r RecordRows, event_id: Option<&str>, field: &str) -> &'r str {
    let value = match event_id {
        Some(event) => rows.get(event).and_then(|fields| fields.get(field)),
        None => rows.values().find_map(|fields| fields.get(field)),
    };
    value.map(String::as_str).unwrap_or("")
}

/// [`PipingEvaluator`] over an in-memory record-data snapshot.
///
/// Use it when the host has no piping engine of its own, or in tests.
#[cfg(feature = "default-piping")]
#[derive(Clone, Debug, Default)]
pub struct DataPiping {
    data: RecordData,
}

#[cfg(feature = "default-piping")]
impl DataPiping {
    pub fn new(data: RecordData) -> Self {
        DataPiping { data }
    }
}

#[cfg(feature = "default-piping")]
impl PipingEvaluator for DataPiping {
    fn evaluate(&self, template: &str, record_id: &str, event_id: Option<&str>) -> String {
        match self.data.get(record_id) {
            Some(rows) => pipe_template(template, event_id, rows),
            None => pipe_template(template, event_id, &RecordRows::new()),
        }
    }
}
