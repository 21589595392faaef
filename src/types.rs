use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::enums::*;

/// Field values of one record: `event_id → field_key → value`.
pub type RecordRows = BTreeMap<String, BTreeMap<String, String>>;

/// Snapshot of record data: `record_id → event_id → field_key → value`.
pub type RecordData = BTreeMap<String, RecordRows>;

// ─── Settings ────────────────────────────────────────────────────────────────

/// The project-level skip-logic configuration, in hierarchical form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub control_fields: Vec<ControlField>,
}

/// A field (or piping template) whose value drives one or more conditions.
///
/// Every scalar is optional in raw form; entries missing what their mode
/// requires are skipped by the compiler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlField {
    #[serde(
        default,
        deserialize_with = "lenient_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub control_mode: Option<ControlMode>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub control_event_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub control_field_key: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub control_piping: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub control_default_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub branching_logic: Vec<BranchingLogic>,
}

impl ControlField {
    /// Mode with the host default applied.
    pub fn mode(&self) -> ControlMode {
        self.control_mode.unwrap_or_default()
    }
}

/// One condition on a control field plus the forms it unlocks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchingLogic {
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition_operator: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition_value: Option<String>,
    /// Whether the entry is restricted to `target_events` rather than every
    /// event of the arm.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub target_events_select: bool,
    #[serde(default, deserialize_with = "string_list")]
    pub target_events: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub target_forms: Vec<String>,
}

// ─── Lenient deserializers ───────────────────────────────────────────────────
//
// The host settings store keeps every scalar as a string, but hand-written
// YAML tends to contain bare numbers and booleans. A malformed value never
// fails the whole document: it reads as absent, and the entry is then
// skipped or evaluated with defaults like any other incomplete entry.

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if matches!(value, Value::Array(_) | Value::Object(_)) {
        warn!(%value, "ignoring non-scalar setting value");
    }
    Ok(scalar_to_string(&value))
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::Object(_) => {
            warn!(%value, "ignoring non-list setting value");
            Vec::new()
        }
        other => scalar_to_string(&other).into_iter().collect(),
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => match s.trim() {
            "1" | "true" => true,
            "" | "0" | "false" => false,
            other => {
                warn!(value = other, "unrecognized checkbox value, reading as unchecked");
                false
            }
        },
        Value::Null => false,
        _ => {
            warn!(%value, "unrecognized checkbox value, reading as unchecked");
            false
        }
    })
}

// Only `advanced` switches a control field to piping; any other non-empty
// value is evaluated in default mode.
fn lenient_mode<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ControlMode>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) if s == "advanced" => Some(ControlMode::Advanced),
        Value::String(s) if s == "default" => Some(ControlMode::Default),
        _ => {
            warn!(%value, "unknown control mode, evaluating in default mode");
            Some(ControlMode::Default)
        }
    })
}

/// A list of entries where an entry that cannot be read is dropped rather
/// than failing the list.
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(entry = i, error = %e, "skipping unreadable settings entry");
                None
            }
        })
        .collect())
}
