//! Navigation decisions driven by the access matrix.
//!
//! Everything here only reads matrices. The one side effect is survey
//! suppression, which flips flags on the host's [`SurveyRegistry`].

use crate::enums::PageKind;
use crate::error::SkipLogicError;
use crate::evaluate::{AccessMatrix, SkipLogic, SurveyRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

/// Site-level settings needed to build URLs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Application web root, with a trailing slash.
    pub webroot: String,
    pub project_id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            webroot: "/".to_string(),
            project_id: String::new(),
        }
    }
}

impl SiteConfig {
    pub fn new(webroot: impl Into<String>, project_id: impl Into<String>) -> Self {
        let mut webroot = webroot.into();
        if !webroot.ends_with('/') {
            webroot.push('/');
        }
        SiteConfig {
            webroot,
            project_id: project_id.into(),
        }
    }

    /// Data entry page of `form` for a record at an event.
    pub fn data_entry_url(&self, record_id: &str, event_id: &str, form: &str) -> String {
        format!(
            "{}DataEntry/index.php?{}",
            self.webroot,
            query(&[
                ("pid", self.project_id.as_str()),
                ("id", record_id),
                ("event_id", event_id),
                ("page", form),
            ])
        )
    }

    /// Record home page for a record within an arm.
    pub fn record_home_url(&self, record_id: &str, arm: &str) -> String {
        format!(
            "{}DataEntry/record_home.php?{}",
            self.webroot,
            query(&[
                ("pid", self.project_id.as_str()),
                ("id", record_id),
                ("arm", arm),
            ])
        )
    }
}

/// Query string encoded the way the host builds its links: percent-encoding
/// with spaces as `+`, so link selectors match by prefix.
fn query(args: &[(&str, &str)]) -> String {
    args.iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v).replace("%20", "+")))
        .collect::<Vec<_>>()
        .join("&")
}

// ─── Denied forms ───────────────────────────────────────────────────────────

/// One denied (record, event, form) triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeniedForm {
    pub record_id: String,
    pub event_id: String,
    pub form: String,
}

/// Every denied triple of `matrix`, optionally limited to one record.
pub fn denied_triples(matrix: &AccessMatrix, record_id: Option<&str>) -> Vec<DeniedForm> {
    matrix
        .records()
        .filter(|r| record_id.is_none_or(|wanted| *r == wanted))
        .flat_map(|r| {
            matrix.events(r).flat_map(move |(event_id, forms)| {
                forms.iter().map(move |form| DeniedForm {
                    record_id: r.to_string(),
                    event_id: event_id.to_string(),
                    form: form.clone(),
                })
            })
        })
        .collect()
}

/// CSS selectors matching the data entry links of every denied form, as
/// rendered by `page`.
pub fn hidden_link_selectors(
    site: &SiteConfig,
    page: PageKind,
    matrix: &AccessMatrix,
) -> Vec<String> {
    denied_triples(matrix, None)
        .iter()
        .map(|denied| {
            let args: Vec<(&str, &str)> = page
                .link_args()
                .iter()
                .map(|&arg| {
                    let value = match arg {
                        "pid" => site.project_id.as_str(),
                        "id" => denied.record_id.as_str(),
                        "event_id" => denied.event_id.as_str(),
                        "page" => denied.form.as_str(),
                        _ => "1",
                    };
                    (arg, value)
                })
                .collect();
            format!(
                "a[href^=\"{}DataEntry/index.php?{}\"]",
                site.webroot,
                query(&args)
            )
        })
        .collect()
}

/// A stylesheet hiding the links of denied forms, or `None` if nothing is
/// denied.
pub fn hidden_links_css(
    site: &SiteConfig,
    page: PageKind,
    matrix: &AccessMatrix,
) -> Option<String> {
    let selectors = hidden_link_selectors(site, page, matrix);
    if selectors.is_empty() {
        return None;
    }
    Some(format!("{} {{ display: none; }}", selectors.join(", ")))
}

// ─── Next form ──────────────────────────────────────────────────────────────

/// The first form after `current` in `forms` that is not denied for the
/// record at the event.
///
/// Returns `None` when no later form is available, or when `current` is not
/// one of `forms`.
pub fn next_available_form<'f>(
    matrix: &AccessMatrix,
    record_id: &str,
    event_id: &str,
    forms: &'f [String],
    current: &str,
) -> Option<&'f str> {
    let position = forms.iter().position(|f| f == current)?;
    forms[position + 1..]
        .iter()
        .find(|f| !matrix.is_form_denied(record_id, event_id, f))
        .map(String::as_str)
}

// ─── Page access ────────────────────────────────────────────────────────────

/// Outcome of a data entry page access check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageDecision {
    /// Render the page. `next_step_path` is where "save and go to next form"
    /// should lead, if anywhere.
    Allow { next_step_path: Option<String> },
    /// The form is denied; send the user here instead.
    Redirect(String),
}

/// Decides whether the data entry page of `form` may render for a record at
/// an event.
///
/// A denied form redirects to the next available form of the event, or to
/// the record home page when there is none.
pub fn decide_page_access(
    ctx: &mut SkipLogic<'_>,
    site: &SiteConfig,
    record_id: &str,
    event_id: &str,
    form: &str,
) -> Result<PageDecision, SkipLogicError> {
    let arm = ctx.arm_for_event(event_id);
    let forms = ctx.metadata().forms_for_event(event_id);
    let matrix = ctx.access_matrix(&arm, Some(record_id))?;

    let next_step_path = next_available_form(matrix, record_id, event_id, &forms, form)
        .map(|next| site.data_entry_url(record_id, event_id, next));

    if !matrix.is_form_denied(record_id, event_id, form) {
        return Ok(PageDecision::Allow { next_step_path });
    }

    let target = next_step_path.unwrap_or_else(|| site.record_home_url(record_id, &arm));
    info!(record = record_id, event = event_id, form, target = %target, "form denied, redirecting");
    Ok(PageDecision::Redirect(target))
}

/// Settings handed to the client-side script that rewires the "next form"
/// buttons.
pub fn client_settings(decision: &PageDecision) -> Value {
    let path = match decision {
        PageDecision::Allow {
            next_step_path: Some(path),
        } => path.as_str(),
        PageDecision::Allow {
            next_step_path: None,
        } => "",
        PageDecision::Redirect(url) => url.as_str(),
    };
    json!({ "nextStepPath": path })
}

// ─── Surveys ────────────────────────────────────────────────────────────────

/// Disables, for the rest of the request, the survey of every form denied
/// for the record at the event. Returns the disabled survey IDs.
pub fn suppress_surveys(
    ctx: &mut SkipLogic<'_>,
    surveys: &mut dyn SurveyRegistry,
    record_id: &str,
    event_id: &str,
) -> Result<Vec<String>, SkipLogicError> {
    let arm = ctx.arm_for_event(event_id);
    let matrix = ctx.access_matrix(&arm, Some(record_id))?;

    let mut disabled = Vec::new();
    for form in matrix.denied_forms(record_id, event_id) {
        if let Some(survey_id) = surveys.survey_for_form(form) {
            surveys.set_survey_enabled(&survey_id, false);
            disabled.push(survey_id);
        }
    }

    if !disabled.is_empty() {
        info!(record = record_id, event = event_id, surveys = ?disabled, "disabled denied surveys");
    }
    Ok(disabled)
}

/// Decides whether the survey page of `form` may render.
///
/// Suppresses denied surveys first, so auto-continue skips them too. A
/// disabled survey redirects to the auto-continue target, or to the web root
/// when there is none. Returns `None` when the page may render.
pub fn decide_survey_access(
    ctx: &mut SkipLogic<'_>,
    surveys: &mut dyn SurveyRegistry,
    site: &SiteConfig,
    record_id: &str,
    form: &str,
    event_id: &str,
    instance: u32,
) -> Result<Option<String>, SkipLogicError> {
    suppress_surveys(ctx, surveys, record_id, event_id)?;

    let Some(survey_id) = surveys.survey_for_form(form) else {
        return Ok(None);
    };
    if surveys.is_survey_enabled(&survey_id) {
        return Ok(None);
    }

    let target = surveys
        .auto_continue_url(record_id, form, event_id, instance)
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| site.webroot.clone());
    info!(record = record_id, survey = %survey_id, target = %target, "survey denied, redirecting");
    Ok(Some(target))
}

/// Re-applies survey suppression after a survey response is saved, so the
/// auto-continue that follows skips denied surveys.
pub fn after_survey_save(
    ctx: &mut SkipLogic<'_>,
    surveys: &mut dyn SurveyRegistry,
    record_id: &str,
    event_id: &str,
) -> Result<(), SkipLogicError> {
    suppress_surveys(ctx, surveys, record_id, event_id).map(|_| ())
}
