use super::common::*;
use frsl::evaluate::SkipLogic;
use frsl::navigation::{PageDecision, SiteConfig, decide_page_access};
use frsl::normalize::normalize;
use frsl::types::*;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    std::env::var("FRSL_FIXTURES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"))
}

#[derive(Debug, serde::Deserialize)]
struct ScenarioCase {
    id: String,
    name: String,
    events: Vec<EventForms>,
    #[serde(default)]
    fields: HashMap<String, String>,
    settings: Settings,
    records: RecordData,
    /// Records whose control forms were never saved.
    #[serde(default)]
    unsaved: Vec<String>,
    /// `record → template → output`
    #[serde(default)]
    piping: HashMap<String, HashMap<String, String>>,
    expected: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    navigation: Vec<NavigationCase>,
}

#[derive(Debug, serde::Deserialize)]
struct EventForms {
    id: String,
    forms: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct NavigationCase {
    record: String,
    event: String,
    form: String,
    #[serde(default)]
    next_form: Option<String>,
    #[serde(default)]
    redirect_form: Option<String>,
    #[serde(default)]
    redirect_home: bool,
}

fn project_for(case: &ScenarioCase) -> FakeProject {
    let event_ids: Vec<&str> = case.events.iter().map(|e| e.id.as_str()).collect();
    let mut project = FakeProject::new().arm("1", &event_ids);
    for event in &case.events {
        let forms: Vec<&str> = event.forms.iter().map(String::as_str).collect();
        project = project.forms(&event.id, &forms);
    }
    for (field, form) in &case.fields {
        project = project.field(field, form);
    }

    for (record, rows) in &case.records {
        for (event, values) in rows {
            project
                .data
                .entry(record.clone())
                .or_default()
                .entry(event.clone())
                .or_default();
            for (field, value) in values {
                project = if case.unsaved.contains(record) {
                    project.unsaved_value(record, event, field, value)
                } else {
                    project.value(record, event, field, value)
                };
            }
        }
    }
    project
}

fn piping_for(case: &ScenarioCase) -> FixedPiping {
    let mut piping = FixedPiping::default();
    for (record, outputs) in &case.piping {
        for (template, output) in outputs {
            piping = piping.with(record, template, output);
        }
    }
    piping
}

fn check_case(case: &ScenarioCase) -> Result<(), String> {
    let project = project_for(case);
    let piping = piping_for(case);
    let mut ctx = SkipLogic::from_settings(
        normalize(case.settings.clone()),
        collaborators(&project, &piping),
    );

    let matrix = ctx
        .access_matrix("1", None)
        .map_err(|e| format!("evaluation failed: {e}"))?;
    let actual: BTreeMap<String, BTreeMap<String, Vec<String>>> = matrix
        .records()
        .map(|record| {
            let events = matrix
                .events(record)
                .map(|(event, forms)| (event.to_string(), forms.iter().cloned().collect()))
                .collect();
            (record.to_string(), events)
        })
        .collect();
    if actual != case.expected {
        return Err(format!("expected {:?}, got {:?}", case.expected, actual));
    }

    let site = SiteConfig::new("/", "13");
    for nav in &case.navigation {
        let decision = decide_page_access(&mut ctx, &site, &nav.record, &nav.event, &nav.form)
            .map_err(|e| format!("page decision failed: {e}"))?;

        let expected = if nav.redirect_home {
            PageDecision::Redirect(site.record_home_url(&nav.record, "1"))
        } else if let Some(form) = &nav.redirect_form {
            PageDecision::Redirect(site.data_entry_url(&nav.record, &nav.event, form))
        } else {
            PageDecision::Allow {
                next_step_path: nav
                    .next_form
                    .as_ref()
                    .map(|form| site.data_entry_url(&nav.record, &nav.event, form)),
            }
        };

        if decision != expected {
            return Err(format!(
                "{}/{}/{}: expected {:?}, got {:?}",
                nav.record, nav.event, nav.form, expected, decision
            ));
        }
    }
    Ok(())
}

#[test]
fn scenario_suite() {
    let path = fixtures_dir().join("scenarios.yaml");
    let content = std::fs::read_to_string(&path).unwrap();
    let cases: Vec<ScenarioCase> = serde_saphyr::from_str(&content).unwrap();

    let mut passed = 0;
    let mut failed = 0;

    for case in &cases {
        match check_case(case) {
            Ok(()) => passed += 1,
            Err(msg) => {
                eprintln!("  FAIL [{}] {}: {}", case.id, case.name, msg);
                failed += 1;
            }
        }
    }

    eprintln!(
        "\nscenarios: {} passed, {} failed out of {} total",
        passed,
        failed,
        cases.len()
    );
    assert_eq!(failed, 0, "{} scenario(s) failed", failed);
    assert!(passed > 0, "No scenarios found in {:?}", path);
}
