//! Access matrix construction.
//!
//! [`SkipLogic`] is the request-scoped context: it holds the host
//! collaborators, compiles the rules once per arm and memoizes each matrix it
//! builds, so every navigation decision in a request reads the same snapshot.

use crate::compile::{RuleSet, compile};
use crate::error::*;
use crate::primitives::{evaluate_condition, resolve_left_value};
use crate::types::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

// ─── Collaborators ──────────────────────────────────────────────────────────

/// Which records a data request covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordScope {
    All,
    Record(String),
}

/// Read access to stored record data.
pub trait RecordDataSource {
    /// Fetches `record → event → field → value` for the given fields.
    ///
    /// An empty `fields` slice requests every field. Records without any
    /// stored data are simply absent from the result.
    fn get_record_data(
        &self,
        scope: &RecordScope,
        fields: &[String],
    ) -> Result<RecordData, DataSourceError>;

    /// Whether `form` has saved data for `record_id` at `event_id`.
    fn form_has_data(&self, record_id: &str, form: &str, event_id: &str) -> bool;
}

/// Project structure: arms, events, forms and fields.
pub trait ProjectMetadata {
    fn project_id(&self) -> String;

    /// Events of `arm`, in schedule order.
    fn events_for_arm(&self, arm: &str) -> Vec<String>;

    /// Forms designated for `event_id`, in display order.
    fn forms_for_event(&self, event_id: &str) -> Vec<String>;

    /// The form that owns `field_key`.
    fn form_for_field(&self, field_key: &str) -> Option<String>;

    /// The arm `event_id` belongs to.
    fn arm_for_event(&self, event_id: &str) -> Option<String>;
}

/// Evaluates piping templates against a record.
pub trait PipingEvaluator {
    /// Returns the rendered template. `event_id` is the event context for
    /// unqualified `[field]` references.
    fn evaluate(&self, template: &str, record_id: &str, event_id: Option<&str>) -> String;
}

/// Per-request survey state owned by the host.
pub trait SurveyRegistry {
    fn survey_for_form(&self, form: &str) -> Option<String>;
    fn is_survey_enabled(&self, survey_id: &str) -> bool;
    fn set_survey_enabled(&mut self, survey_id: &str, enabled: bool);

    /// Where survey auto-continue would send the participant after `form`.
    fn auto_continue_url(
        &self,
        record_id: &str,
        form: &str,
        event_id: &str,
        instance: u32,
    ) -> Option<String>;
}

/// Stored rule configuration.
pub trait SettingsSource {
    fn rule_configuration(&self, project_id: &str) -> Result<Settings, DataSourceError>;
}

// ─── AccessMatrix ───────────────────────────────────────────────────────────

/// Denied forms per record and event.
///
/// The representation is sparse: a form that is absent is allowed. Every
/// event of the evaluated arm is present for every evaluated record, so an
/// empty set means "evaluated, nothing denied". Query through
/// [`is_form_denied`](Self::is_form_denied) rather than indexing the map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccessMatrix {
    denied: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl AccessMatrix {
    pub fn is_form_denied(&self, record_id: &str, event_id: &str, form: &str) -> bool {
        self.denied
            .get(record_id)
            .and_then(|events| events.get(event_id))
            .is_some_and(|forms| forms.contains(form))
    }

    /// Denied forms of one record at one event, in name order.
    pub fn denied_forms(&self, record_id: &str, event_id: &str) -> impl Iterator<Item = &str> {
        self.denied
            .get(record_id)
            .and_then(|events| events.get(event_id))
            .into_iter()
            .flat_map(|forms| forms.iter().map(String::as_str))
    }

    pub fn records(&self) -> impl Iterator<Item = &str> {
        self.denied.keys().map(String::as_str)
    }

    pub fn contains_record(&self, record_id: &str) -> bool {
        self.denied.contains_key(record_id)
    }

    /// Events evaluated for `record_id` with their denied forms.
    pub fn events(&self, record_id: &str) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.denied
            .get(record_id)
            .into_iter()
            .flat_map(|events| events.iter().map(|(e, f)| (e.as_str(), f)))
    }

    pub fn denied_count(&self) -> usize {
        self.denied
            .values()
            .flat_map(|events| events.values())
            .map(BTreeSet::len)
            .sum()
    }
}

/// Everything the matrix builder reads besides the rules and the data.
pub struct Collaborators<'a> {
    pub data: &'a dyn RecordDataSource,
    pub metadata: &'a dyn ProjectMetadata,
    pub piping: &'a dyn PipingEvaluator,
}

/// Builds the access matrix for the records in `records`.
///
/// A form is allowed when no rule governs it, or when **any** governing rule
/// holds for the record.
pub fn build_access_matrix(
    rule_set: &RuleSet,
    records: &RecordData,
    arm_events: &[String],
    collaborators: &Collaborators<'_>,
) -> AccessMatrix {
    let event_forms: Vec<(&String, Vec<String>)> = arm_events
        .iter()
        .map(|event_id| (event_id, collaborators.metadata.forms_for_event(event_id)))
        .collect();

    let mut matrix = AccessMatrix::default();

    for (record_id, rows) in records {
        let outcomes: Vec<bool> = rule_set
            .rules
            .iter()
            .map(|rule| {
                let left = resolve_left_value(
                    rule,
                    record_id,
                    rows,
                    collaborators.data,
                    collaborators.metadata,
                    collaborators.piping,
                );
                evaluate_condition(rule.operator, &left, &rule.condition_value)
            })
            .collect();

        debug!(record = %record_id, ?outcomes, "evaluated skip logic rules");

        let record_entry = matrix.denied.entry(record_id.clone()).or_default();
        for (event_id, forms) in &event_forms {
            let denied = record_entry.entry((*event_id).clone()).or_default();
            for form in forms {
                let governing = rule_set.rules_for(event_id, form);
                if governing.is_empty() {
                    continue;
                }
                if !governing.iter().any(|&i| outcomes[i]) {
                    denied.insert(form.clone());
                }
            }
        }
    }

    matrix
}

// ─── Request context ────────────────────────────────────────────────────────

/// Cache key of a memoized matrix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatrixScope {
    pub arm: String,
    pub record: Option<String>,
}

/// Request-scoped skip-logic context.
///
/// Create one per request and drop it at the end; nothing survives between
/// requests.
pub struct SkipLogic<'a> {
    settings: Settings,
    collaborators: Collaborators<'a>,
    compiled: HashMap<String, RuleSet>,
    matrices: HashMap<MatrixScope, AccessMatrix>,
}

impl<'a> SkipLogic<'a> {
    /// Context over already-loaded settings.
    pub fn from_settings(settings: Settings, collaborators: Collaborators<'a>) -> Self {
        SkipLogic {
            settings,
            collaborators,
            compiled: HashMap::new(),
            matrices: HashMap::new(),
        }
    }

    /// Context over the project's stored settings, normalized.
    pub fn load(
        source: &dyn SettingsSource,
        collaborators: Collaborators<'a>,
    ) -> Result<Self, SkipLogicError> {
        let project_id = collaborators.metadata.project_id();
        let settings = source.rule_configuration(&project_id)?;
        Ok(Self::from_settings(
            crate::normalize::normalize(settings),
            collaborators,
        ))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metadata(&self) -> &dyn ProjectMetadata {
        self.collaborators.metadata
    }

    /// Compiled rules for `arm`, compiling on first use.
    pub fn rule_set(&mut self, arm: &str) -> &RuleSet {
        let settings = &self.settings;
        let metadata = self.collaborators.metadata;
        self.compiled
            .entry(arm.to_string())
            .or_insert_with(|| compile(settings, &metadata.events_for_arm(arm)))
    }

    /// Access matrix for every record of the project (`record` = `None`) or a
    /// single record, memoized per scope for the life of the context.
    ///
    /// A requested record with no stored data is evaluated as an empty row,
    /// so every control value falls back to its default.
    pub fn access_matrix(
        &mut self,
        arm: &str,
        record: Option<&str>,
    ) -> Result<&AccessMatrix, SkipLogicError> {
        let scope = MatrixScope {
            arm: arm.to_string(),
            record: record.map(str::to_string),
        };

        if self.matrices.contains_key(&scope) {
            debug!(arm, ?record, "access matrix cache hit");
        } else {
            let matrix = self.compute(arm, record)?;
            self.matrices.insert(scope.clone(), matrix);
        }

        // Present: inserted above or already cached
        Ok(&self.matrices[&scope])
    }

    fn compute(&mut self, arm: &str, record: Option<&str>) -> Result<AccessMatrix, SkipLogicError> {
        self.rule_set(arm);
        let rule_set = &self.compiled[arm];
        let arm_events = self.collaborators.metadata.events_for_arm(arm);

        let data_scope = match record {
            Some(id) => RecordScope::Record(id.to_string()),
            None => RecordScope::All,
        };
        let mut records = self
            .collaborators
            .data
            .get_record_data(&data_scope, rule_set.control_field_keys())?;

        if let Some(id) = record {
            if !records.contains_key(id) {
                debug!(record = id, "no stored data, evaluating defaults");
                records = RecordData::from([(id.to_string(), RecordRows::new())]);
            }
        }

        Ok(build_access_matrix(
            rule_set,
            &records,
            &arm_events,
            &self.collaborators,
        ))
    }

    /// Whether `form` is denied for `record_id` at `event_id`, evaluating the
    /// event's arm for that record if needed.
    pub fn is_form_denied(
        &mut self,
        record_id: &str,
        event_id: &str,
        form: &str,
    ) -> Result<bool, SkipLogicError> {
        let arm = self.arm_for_event(event_id);
        let matrix = self.access_matrix(&arm, Some(record_id))?;
        Ok(matrix.is_form_denied(record_id, event_id, form))
    }

    /// Arm of `event_id`, defaulting to the first arm.
    pub fn arm_for_event(&self, event_id: &str) -> String {
        self.collaborators
            .metadata
            .arm_for_event(event_id)
            .unwrap_or_else(|| DEFAULT_ARM.to_string())
    }
}

/// Arm used when none can be determined.
pub const DEFAULT_ARM: &str = "1";
