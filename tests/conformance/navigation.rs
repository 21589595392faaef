use super::common::*;
use frsl::enums::PageKind;
use frsl::evaluate::*;
use frsl::navigation::*;
use frsl::types::*;

/// f2 and f3 denied below 18, f4 unrestricted.
fn skip_settings() -> Settings {
    settings(vec![field_control(
        "e1",
        "age",
        "0",
        vec![logic(">=", "18", &["f2", "f3"])],
    )])
}

fn site() -> SiteConfig {
    SiteConfig::new("/redcap/redcap_v14.0.0", "13")
}

fn forms(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn site_config_builds_urls() {
    let site = site();
    assert_eq!(site.webroot, "/redcap/redcap_v14.0.0/");
    assert_eq!(
        site.data_entry_url("r 1", "e1", "f4"),
        "/redcap/redcap_v14.0.0/DataEntry/index.php?pid=13&id=r+1&event_id=e1&page=f4"
    );
    assert_eq!(
        site.record_home_url("7", "2"),
        "/redcap/redcap_v14.0.0/DataEntry/record_home.php?pid=13&id=7&arm=2"
    );
    assert_eq!(SiteConfig::default().webroot, "/");
}

// ─── next_available_form ────────────────────────────────────────────────────

#[test]
fn next_form_skips_denied_forms() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let matrix = ctx.access_matrix("1", Some("r1")).unwrap();
    let order = forms(&["f1", "f2", "f3", "f4"]);

    assert_eq!(next_available_form(matrix, "r1", "e1", &order, "f1"), Some("f4"));
    assert_eq!(next_available_form(matrix, "r1", "e1", &order, "f2"), Some("f4"));
    assert_eq!(next_available_form(matrix, "r1", "e1", &order, "f4"), None);
    assert_eq!(next_available_form(matrix, "r1", "e1", &order, "f9"), None);
}

#[test]
fn next_form_is_the_immediate_successor_when_allowed() {
    let project = clinic_project().value("r1", "e1", "age", "30");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let matrix = ctx.access_matrix("1", Some("r1")).unwrap();

    let order = forms(&["f1", "f2", "f3", "f4"]);
    assert_eq!(next_available_form(matrix, "r1", "e1", &order, "f1"), Some("f2"));
}

// ─── decide_page_access ─────────────────────────────────────────────────────

#[test]
fn allowed_page_renders_with_next_step() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));

    let decision = decide_page_access(&mut ctx, &site(), "r1", "e1", "f1").unwrap();
    assert_eq!(
        decision,
        PageDecision::Allow {
            next_step_path: Some(site().data_entry_url("r1", "e1", "f4"))
        }
    );
    assert_eq!(
        client_settings(&decision)["nextStepPath"],
        serde_json::json!(site().data_entry_url("r1", "e1", "f4"))
    );
}

#[test]
fn last_allowed_page_has_no_next_step() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));

    let decision = decide_page_access(&mut ctx, &site(), "r1", "e1", "f4").unwrap();
    assert_eq!(decision, PageDecision::Allow { next_step_path: None });
    assert_eq!(client_settings(&decision), serde_json::json!({"nextStepPath": ""}));
}

#[test]
fn denied_page_redirects_to_next_available_form() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));

    let decision = decide_page_access(&mut ctx, &site(), "r1", "e1", "f2").unwrap();
    assert_eq!(
        decision,
        PageDecision::Redirect(site().data_entry_url("r1", "e1", "f4"))
    );
}

#[test]
fn denied_last_page_redirects_to_record_home() {
    let s = settings(vec![field_control("e1", "age", "0", vec![logic(">=", "18", &["f3", "f4"])])]);
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(s, collaborators(&project, &piping));

    let decision = decide_page_access(&mut ctx, &site(), "r1", "e1", "f3").unwrap();
    assert_eq!(decision, PageDecision::Redirect(site().record_home_url("r1", "1")));
}

#[test]
fn page_decisions_share_one_evaluation() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));

    for form in ["f1", "f2", "f3", "f4"] {
        decide_page_access(&mut ctx, &site(), "r1", "e1", form).unwrap();
    }
    assert_eq!(project.fetch_count(), 1);
}

// ─── Link hiding ────────────────────────────────────────────────────────────

#[test]
fn denied_triples_lists_every_denial() {
    let project = clinic_project()
        .value("r1", "e1", "age", "10")
        .value("r2", "e1", "age", "50");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let matrix = ctx.access_matrix("1", None).unwrap();

    let all = denied_triples(matrix, None);
    assert_eq!(
        all,
        vec![
            DeniedForm {
                record_id: "r1".into(),
                event_id: "e1".into(),
                form: "f2".into()
            },
            DeniedForm {
                record_id: "r1".into(),
                event_id: "e1".into(),
                form: "f3".into()
            },
        ]
    );
    assert!(denied_triples(matrix, Some("r2")).is_empty());
}

#[test]
fn selectors_follow_page_argument_order() {
    let s = settings(vec![field_control("e1", "age", "0", vec![logic(">=", "18", &["f2"])])]);
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(s, collaborators(&project, &piping));
    let matrix = ctx.access_matrix("1", None).unwrap();
    let site = site();

    assert_eq!(
        hidden_link_selectors(&site, PageKind::RecordHome, matrix),
        vec!["a[href^=\"/redcap/redcap_v14.0.0/DataEntry/index.php?pid=13&id=r1&event_id=e1&page=f2\"]"]
    );
    assert_eq!(
        hidden_link_selectors(&site, PageKind::RecordStatusDashboard, matrix),
        vec!["a[href^=\"/redcap/redcap_v14.0.0/DataEntry/index.php?pid=13&id=r1&page=f2&event_id=e1&instance=1\"]"]
    );
    assert_eq!(
        hidden_links_css(&site, PageKind::DataEntryForm, matrix).unwrap(),
        "a[href^=\"/redcap/redcap_v14.0.0/DataEntry/index.php?pid=13&page=f2&id=r1&event_id=e1\"] { display: none; }"
    );
}

#[test]
fn selectors_encode_spaces_like_host_links() {
    let project = clinic_project().value("site a 1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let matrix = ctx.access_matrix("1", Some("site a 1")).unwrap();

    let selectors = hidden_link_selectors(&SiteConfig::new("/", "13"), PageKind::RecordHome, matrix);
    assert_eq!(
        selectors[0],
        "a[href^=\"/DataEntry/index.php?pid=13&id=site+a+1&event_id=e1&page=f2\"]"
    );
    assert_eq!(
        SiteConfig::new("/", "13").record_home_url("a&b c", "1"),
        "/DataEntry/record_home.php?pid=13&id=a%26b+c&arm=1"
    );
}

#[test]
fn nothing_denied_means_no_stylesheet() {
    let project = clinic_project().value("r1", "e1", "age", "30");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let matrix = ctx.access_matrix("1", None).unwrap();
    assert_eq!(hidden_links_css(&site(), PageKind::RecordHome, matrix), None);
}

// ─── Surveys ────────────────────────────────────────────────────────────────

#[test]
fn denied_surveys_are_disabled() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let mut surveys = FakeSurveys::default()
        .survey("f2", "s2")
        .survey("f4", "s4");

    let disabled = suppress_surveys(&mut ctx, &mut surveys, "r1", "e1").unwrap();
    assert_eq!(disabled, vec!["s2"]);
    assert!(!surveys.is_survey_enabled("s2"));
    assert!(surveys.is_survey_enabled("s4"));
}

#[test]
fn denied_survey_redirects_to_auto_continue_target() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let mut surveys = FakeSurveys::default().survey("f2", "s2").survey("f4", "s4");
    surveys.auto_continue = Some("/surveys/?s=NEXT".to_string());

    let target = decide_survey_access(&mut ctx, &mut surveys, &site(), "r1", "f2", "e1", 1).unwrap();
    assert_eq!(target.as_deref(), Some("/surveys/?s=NEXT"));

    let target = decide_survey_access(&mut ctx, &mut surveys, &site(), "r1", "f4", "e1", 1).unwrap();
    assert_eq!(target, None);
}

#[test]
fn denied_survey_without_auto_continue_goes_to_webroot() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let mut surveys = FakeSurveys::default().survey("f3", "s3");
    surveys.auto_continue = Some(String::new());

    let target = decide_survey_access(&mut ctx, &mut surveys, &site(), "r1", "f3", "e1", 1).unwrap();
    assert_eq!(target.as_deref(), Some("/redcap/redcap_v14.0.0/"));
}

#[test]
fn form_without_survey_is_not_redirected() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let mut surveys = FakeSurveys::default();

    let target = decide_survey_access(&mut ctx, &mut surveys, &site(), "r1", "f2", "e1", 1).unwrap();
    assert_eq!(target, None);
}

#[test]
fn survey_save_reapplies_suppression() {
    let project = clinic_project().value("r1", "e1", "age", "10");
    let piping = FixedPiping::default();
    let mut ctx = SkipLogic::from_settings(skip_settings(), collaborators(&project, &piping));
    let mut surveys = FakeSurveys::default().survey("f3", "s3");

    after_survey_save(&mut ctx, &mut surveys, "r1", "e1").unwrap();
    assert!(!surveys.is_survey_enabled("s3"));
}
