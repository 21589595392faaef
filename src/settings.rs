//! Host settings store → hierarchical [`Settings`].
//!
//! The host keeps module settings flat: one entry per setting key, whose
//! `value` is nested one array level deeper for every repeatable group the
//! setting lives in. A branching-logic target form list, for example, is
//! stored as `target_forms.value[control_delta][logic_delta][form_delta]`.
//! [`format_settings`] folds that back into a tree keyed by setting name.

use crate::error::{ParseError, ParseErrorKind};
use crate::types::Settings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the host's settings schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingDefinition {
    pub key: String,
    #[serde(rename = "type", default)]
    pub setting_type: String,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_settings: Vec<SettingDefinition>,
}

impl SettingDefinition {
    fn scalar(key: &str, setting_type: &str) -> Self {
        SettingDefinition {
            key: key.to_string(),
            setting_type: setting_type.to_string(),
            repeatable: false,
            sub_settings: Vec::new(),
        }
    }

    fn repeatable_scalar(key: &str, setting_type: &str) -> Self {
        SettingDefinition {
            repeatable: true,
            ..SettingDefinition::scalar(key, setting_type)
        }
    }

    fn group(key: &str, sub_settings: Vec<SettingDefinition>) -> Self {
        SettingDefinition {
            key: key.to_string(),
            setting_type: "sub_settings".to_string(),
            repeatable: true,
            sub_settings,
        }
    }

    pub fn is_group(&self) -> bool {
        self.setting_type == "sub_settings"
    }
}

/// The project settings schema of the skip-logic module.
pub fn skip_logic_schema() -> Vec<SettingDefinition> {
    vec![SettingDefinition::group(
        "control_fields",
        vec![
            SettingDefinition::scalar("control_mode", "radio"),
            SettingDefinition::scalar("control_event_id", "event-list"),
            SettingDefinition::scalar("control_field_key", "field-list"),
            SettingDefinition::scalar("control_piping", "text"),
            SettingDefinition::scalar("control_default_value", "text"),
            SettingDefinition::group(
                "branching_logic",
                vec![
                    SettingDefinition::scalar("condition_operator", "dropdown"),
                    SettingDefinition::scalar("condition_value", "text"),
                    SettingDefinition::scalar("target_events_select", "checkbox"),
                    SettingDefinition::repeatable_scalar("target_events", "event-list"),
                    SettingDefinition::repeatable_scalar("target_forms", "form-list"),
                ],
            ),
        ],
    )]
}

#[derive(Clone, Debug)]
enum Delta {
    Index(usize),
    Key(String),
}

fn child(value: &Value, delta: &Delta) -> Value {
    match (value, delta) {
        (Value::Array(items), Delta::Index(i)) => items.get(*i).cloned().unwrap_or(Value::Null),
        (Value::Object(map), Delta::Key(k)) => map.get(k).cloned().unwrap_or(Value::Null),
        (Value::Object(map), Delta::Index(i)) => {
            map.get(&i.to_string()).cloned().unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

fn deltas_of(value: &Value) -> Vec<Delta> {
    match value {
        Value::Array(items) => (0..items.len()).map(Delta::Index).collect(),
        Value::Object(map) => map.keys().map(|k| Delta::Key(k.clone())).collect(),
        _ => Vec::new(),
    }
}

/// Rebuilds the settings hierarchy from the host's flat `key → {value}` map.
///
/// Missing values become null. Repeatable groups become arrays of objects;
/// non-repeatable groups collapse to their first instance (or null).
pub fn format_settings(definitions: &[SettingDefinition], values: &Map<String, Value>) -> Value {
    Value::Object(format_level(definitions, values, &[]))
}

fn format_level(
    definitions: &[SettingDefinition],
    values: &Map<String, Value>,
    inherited: &[Delta],
) -> Map<String, Value> {
    let mut formatted = Map::new();

    for def in definitions {
        let mut value = values
            .get(&def.key)
            .and_then(|entry| entry.get("value"))
            .cloned()
            .unwrap_or(Value::Null);

        for delta in inherited {
            value = child(&value, delta);
        }

        if def.is_group() {
            let instances: Vec<Value> = deltas_of(&value)
                .into_iter()
                .map(|delta| {
                    let mut sub = inherited.to_vec();
                    sub.push(delta);
                    Value::Object(format_level(&def.sub_settings, values, &sub))
                })
                .collect();

            value = if def.repeatable {
                Value::Array(instances)
            } else {
                instances.into_iter().next().unwrap_or(Value::Null)
            };
        }

        formatted.insert(def.key.clone(), value);
    }

    formatted
}

impl Settings {
    /// Builds [`Settings`] from the host's flat settings map using
    /// [`skip_logic_schema`].
    pub fn from_host(values: &Map<String, Value>) -> Result<Settings, ParseError> {
        let tree = format_settings(&skip_logic_schema(), values);
        serde_json::from_value(tree).map_err(|e| ParseError {
            kind: ParseErrorKind::TypeMismatch,
            message: e.to_string(),
            path: None,
        })
    }
}

