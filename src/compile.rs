//! Settings → indexed [`RuleSet`].
//!
//! Every (control field × branching logic) pair that survives the exclusion
//! checks becomes one [`CompiledRule`] with a sequential index, and every
//! (event, form) pair it targets records that index. Forms that no rule
//! targets never appear in the index and are always accessible.

use crate::enums::{ConditionOperator, ControlMode};
use crate::types::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Where a rule's left-hand comparison value comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ControlSource {
    /// Raw value of `field_key` at `event_id`.
    Field { event_id: String, field_key: String },
    /// A piping template. `event_id` is the configured control event, if any,
    /// and is the event context the template is evaluated in.
    Piping {
        template: String,
        event_id: Option<String>,
    },
}

/// One validated condition, ready for evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompiledRule {
    pub index: usize,
    pub source: ControlSource,
    pub default_value: String,
    pub operator: ConditionOperator,
    pub condition_value: String,
    pub target_events: Vec<String>,
    pub target_forms: Vec<String>,
}

/// Compiled rules plus the `(event, form) → rule indices` lookup.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    pub rules: Vec<CompiledRule>,
    target_index: HashMap<String, HashMap<String, Vec<usize>>>,
    control_field_keys: Vec<String>,
}

impl RuleSet {
    /// Indices of the rules governing `form` at `event`. Empty when ungoverned.
    pub fn rules_for(&self, event_id: &str, form: &str) -> &[usize] {
        self.target_index
            .get(event_id)
            .and_then(|forms| forms.get(form))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_governed(&self, event_id: &str, form: &str) -> bool {
        !self.rules_for(event_id, form).is_empty()
    }

    /// Whether any compiled rule references `index`.
    pub fn references(&self, index: usize) -> bool {
        self.target_index
            .values()
            .flat_map(|forms| forms.values())
            .any(|indices| indices.contains(&index))
    }

    /// Field keys read by field-sourced rules, de-duplicated in first-seen order.
    pub fn control_field_keys(&self) -> &[String] {
        &self.control_field_keys
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Builds the control source for a field, or `None` when the entry lacks what
/// its mode requires.
fn control_source(cf: &ControlField) -> Option<ControlSource> {
    match cf.mode() {
        ControlMode::Default => {
            let event_id = non_blank(&cf.control_event_id)?;
            let field_key = non_blank(&cf.control_field_key)?;
            Some(ControlSource::Field {
                event_id: event_id.to_string(),
                field_key: field_key.to_string(),
            })
        }
        ControlMode::Advanced => {
            let template = cf.control_piping.as_deref().filter(|t| !t.is_empty())?;
            Some(ControlSource::Piping {
                template: template.to_string(),
                event_id: non_blank(&cf.control_event_id).map(str::to_string),
            })
        }
    }
}

/// Compile settings for an arm whose events are `arm_events` (in schedule
/// order). Unrestricted branching logic targets every one of them.
///
/// Index assignment depends only on configuration order, so compiling the
/// same settings twice yields identical indices.
pub fn compile(settings: &Settings, arm_events: &[String]) -> RuleSet {
    let mut rule_set = RuleSet::default();

    for (cf_pos, cf) in settings.control_fields.iter().enumerate() {
        let Some(source) = control_source(cf) else {
            warn!(
                control_field = cf_pos,
                mode = ?cf.mode(),
                "skipping control field missing required settings"
            );
            continue;
        };

        if let ControlSource::Field { field_key, .. } = &source {
            if !rule_set.control_field_keys.contains(field_key) {
                rule_set.control_field_keys.push(field_key.clone());
            }
        }

        let default_value = cf.control_default_value.clone().unwrap_or_default();

        for bl in &cf.branching_logic {
            let target_forms: Vec<String> = bl
                .target_forms
                .iter()
                .filter(|f| !f.trim().is_empty())
                .cloned()
                .collect();
            if target_forms.is_empty() {
                debug!(control_field = cf_pos, "skipping branching logic without target forms");
                continue;
            }

            let target_events = if bl.target_events_select {
                bl.target_events.clone()
            } else {
                arm_events.to_vec()
            };

            let symbol = bl
                .condition_operator
                .as_deref()
                .filter(|op| !op.is_empty())
                .unwrap_or("=");
            let operator = ConditionOperator::parse_known(symbol).unwrap_or_else(|| {
                warn!(operator = symbol, "unknown condition operator, comparing with equality");
                ConditionOperator::Equal
            });

            let index = rule_set.rules.len();
            for event_id in &target_events {
                let forms = rule_set.target_index.entry(event_id.clone()).or_default();
                for form in &target_forms {
                    forms.entry(form.clone()).or_default().push(index);
                }
            }

            rule_set.rules.push(CompiledRule {
                index,
                source: source.clone(),
                default_value: default_value.clone(),
                operator,
                condition_value: bl.condition_value.clone().unwrap_or_default(),
                target_events,
                target_forms,
            });
        }
    }

    debug!(
        rules = rule_set.rules.len(),
        events = rule_set.target_index.len(),
        "compiled skip logic rules"
    );

    rule_set
}
