//! Resolve-or-create against the simulated clinic

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::Harness;
use vetprobe_common::{
    AppConfig, ContactRecord, ContactType, EntityKind, PatientRecord, SuiteConfig, WellnessPlanRecord,
};
use vetprobe_e2e::entities::{ContactStrategy, PatientStrategy, WellnessPlanStrategy};
use vetprobe_e2e::mock::{MockClinic, SaveBehaviour};
use vetprobe_e2e::selectors::contact;
use vetprobe_e2e::{resolve_or_create, E2eError, Resolution};

fn contacts() -> ContactStrategy {
    ContactStrategy::new(&AppConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_second_resolve_finds_the_first_creation() {
    let h = Harness::signed_in(Arc::new(MockClinic::new())).await;
    let record = ContactRecord::new("John", "Smith");

    let first = resolve_or_create(&h.session, &contacts(), &record).await.unwrap();
    assert!(first.was_created());
    assert_eq!(first.message(), Some("Contact saved successfully"));

    let second = resolve_or_create(&h.session, &contacts(), &record).await.unwrap();
    assert_eq!(
        second,
        Resolution::Resolved {
            kind: EntityKind::Contact,
            key: "Smith, John".into()
        }
    );

    assert_eq!(h.clinic.created(EntityKind::Contact), 1);
    assert_eq!(h.fills_of(contact::FIRST_NAME), 1);
    assert_eq!(h.events.count("create_started"), 1);
    assert_eq!(h.events.count("entity_found"), 1);
    assert_eq!(h.events.count("resolve_attempted"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_prefix_match_is_not_a_hit() {
    let clinic = Arc::new(MockClinic::new());
    clinic.seed_contact(ContactRecord::new("Johnny", "Smithson"));
    let h = Harness::signed_in(clinic).await;

    let resolution = resolve_or_create(&h.session, &contacts(), &ContactRecord::new("John", "Smith"))
        .await
        .unwrap();

    assert!(resolution.was_created());
    let keys: Vec<String> = h.clinic.contacts().iter().map(|c| c.natural_key()).collect();
    assert_eq!(keys, vec!["Smithson, Johnny", "Smith, John"]);
}

#[tokio::test(start_paused = true)]
async fn test_exact_record_is_found_next_to_longer_names() {
    let clinic = Arc::new(MockClinic::new());
    clinic.seed_contact(ContactRecord::new("John", "Smith"));
    clinic.seed_contact(ContactRecord::new("Johnny", "Smithson"));
    let h = Harness::signed_in(clinic).await;

    let resolution = resolve_or_create(&h.session, &contacts(), &ContactRecord::new("John", "Smith"))
        .await
        .unwrap();

    assert!(!resolution.was_created());
    assert_eq!(h.clinic.created(EntityKind::Contact), 0);
    assert_eq!(h.clinic.save_clicks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_mandatory_field_touches_nothing() {
    let h = Harness::signed_in(Arc::new(MockClinic::new())).await;
    let calls_before = h.page.calls().len();

    let err = resolve_or_create(&h.session, &contacts(), &ContactRecord::new("", "Smith"))
        .await
        .unwrap_err();

    match err {
        E2eError::MissingField { kind, field, .. } => {
            assert_eq!(kind, EntityKind::Contact);
            assert_eq!(field, "first_name");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(h.page.calls().len(), calls_before);
    assert!(h.events.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_late_error_toast_beats_pending_success() {
    let clinic = Arc::new(MockClinic::new());
    clinic.script_save(SaveBehaviour::RejectThenSucceed {
        error_after: Duration::from_millis(500),
        success_after: Duration::from_millis(800),
        message: "Email already in use".into(),
    });
    let h = Harness::signed_in(clinic).await;

    let err = resolve_or_create(&h.session, &contacts(), &ContactRecord::new("John", "Smith"))
        .await
        .unwrap_err();

    match err {
        E2eError::Creation { kind, message, .. } => {
            assert_eq!(kind, EntityKind::Contact);
            assert_eq!(message, "Email already in use");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(h.events.count("creation_failed"), 1);
    assert_eq!(h.events.count("entity_created"), 0);
    assert_eq!(h.clinic.created(EntityKind::Contact), 0);
}

#[tokio::test(start_paused = true)]
async fn test_requested_contact_types_replace_the_default() {
    let h = Harness::signed_in(Arc::new(MockClinic::new())).await;
    let record = ContactRecord::new("Jane", "Doe").with_types([ContactType::Vet, ContactType::StaffMember]);

    resolve_or_create(&h.session, &contacts(), &record).await.unwrap();

    assert!(!h.page.contact_type_checked(ContactType::Customer));
    assert!(h.page.contact_type_checked(ContactType::Vet));
    assert!(h.page.contact_type_checked(ContactType::StaffMember));
    assert_eq!(h.clinic.contacts()[0].contact_types, record.contact_types);
}

#[tokio::test(start_paused = true)]
async fn test_silent_save_is_ambiguous_unless_record_appears() {
    let clinic = Arc::new(MockClinic::new());
    clinic.script_save(SaveBehaviour::Silent { store: false });
    let h = Harness::signed_in(clinic).await;

    let err = resolve_or_create(&h.session, &contacts(), &ContactRecord::new("John", "Smith"))
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::AmbiguousOutcome { kind: EntityKind::Contact, .. }));
    assert_eq!(h.events.count("outcome_ambiguous"), 1);
    assert_eq!(h.events.count("entity_created"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_silent_save_confirmed_by_search() {
    let clinic = Arc::new(MockClinic::new());
    clinic.script_save(SaveBehaviour::Silent { store: true });
    let h = Harness::signed_in(clinic).await;

    let resolution = resolve_or_create(&h.session, &contacts(), &ContactRecord::new("John", "Smith"))
        .await
        .unwrap();

    assert!(resolution.was_created());
    assert_eq!(resolution.message(), Some(""));
    assert_eq!(h.events.count("outcome_ambiguous"), 1);
    assert_eq!(h.events.count("entity_created"), 1);
}

/// Success toast window shorter than the toast's time on screen
fn short_success_window(clinic: &MockClinic) -> SuiteConfig {
    let mut config = clinic.suite_config();
    config.timeouts.success_toast_ms = 1000;
    config
}

#[tokio::test(start_paused = true)]
async fn test_lingering_success_toast_is_not_read_as_this_save() {
    let clinic = Arc::new(MockClinic::new());
    let config = short_success_window(&clinic);
    let h = Harness::signed_in_with(clinic, config).await;
    resolve_or_create(&h.session, &contacts(), &ContactRecord::new("Test", "Owner"))
        .await
        .unwrap();

    h.clinic.script_save(SaveBehaviour::Silent { store: false });
    let err = resolve_or_create(&h.session, &PatientStrategy::from_contact(1), &PatientRecord::new("Ghost", "Owner, Test"))
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::AmbiguousOutcome { kind: EntityKind::Patient, .. }));
    assert!(h.clinic.patients().is_empty());
    assert_eq!(h.events.count("outcome_ambiguous"), 1);
    assert_eq!(h.events.count("entity_created"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_toast_still_counts_while_success_toast_lingers() {
    let clinic = Arc::new(MockClinic::new());
    let config = short_success_window(&clinic);
    let h = Harness::signed_in_with(clinic, config).await;
    resolve_or_create(&h.session, &contacts(), &ContactRecord::new("Test", "Owner"))
        .await
        .unwrap();

    h.clinic.script_save(SaveBehaviour::Reject {
        delay: Duration::from_millis(300),
        message: "Microchip already registered".into(),
    });
    let err = resolve_or_create(&h.session, &PatientStrategy::from_contact(1), &PatientRecord::new("Rex", "Owner, Test"))
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::Creation { ref message, .. } if message == "Microchip already registered"));
    assert!(h.clinic.patients().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_owner_autocomplete_must_resolve_to_one_contact() {
    let clinic = Arc::new(MockClinic::new());
    clinic.seed_contact(ContactRecord::new("John", "Smith"));
    clinic.seed_contact(ContactRecord::new("Johnny", "Smith"));
    let h = Harness::signed_in(clinic).await;
    let strategy = PatientStrategy::standalone(&AppConfig::default());

    let err = resolve_or_create(&h.session, &strategy, &PatientRecord::new("Rex", "Smith, John"))
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::UnresolvedField { ref text, .. } if text == "Smith, John"));

    let resolution = resolve_or_create(&h.session, &strategy, &PatientRecord::new("Rex", "Smith, Johnny"))
        .await
        .unwrap();
    assert!(resolution.was_created());
    assert_eq!(h.clinic.patients()[0].owner, "Smith, Johnny");
}

#[tokio::test(start_paused = true)]
async fn test_owner_must_resolve_to_the_typed_contact() {
    let clinic = Arc::new(MockClinic::new());
    clinic.seed_contact(ContactRecord::new("Johnny", "Smith"));
    let h = Harness::signed_in(clinic).await;
    let strategy = PatientStrategy::standalone(&AppConfig::default());

    let err = resolve_or_create(&h.session, &strategy, &PatientRecord::new("Rex", "Smith, John"))
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::UnresolvedField { ref text, .. } if text == "Smith, John"));
    assert!(h.clinic.patients().is_empty());
    assert_eq!(h.clinic.save_clicks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_standalone_patient_is_found_by_quoted_name() {
    let clinic = Arc::new(MockClinic::new());
    clinic.seed_contact(ContactRecord::new("John", "Smith"));
    clinic.seed_patient(PatientRecord::new("Rexford", "Smith, John"));
    let h = Harness::signed_in(clinic).await;
    let strategy = PatientStrategy::standalone(&AppConfig::default());
    let record = PatientRecord::new("Rex", "Smith, John").with_age(4).with_tags(["friendly", "senior"]);

    let created = resolve_or_create(&h.session, &strategy, &record).await.unwrap();
    assert!(created.was_created());
    let stored = h.clinic.patients().pop().unwrap();
    assert_eq!(stored.age, Some(4));
    assert_eq!(stored.tags, vec!["friendly", "senior"]);

    let found = resolve_or_create(&h.session, &strategy, &record).await.unwrap();
    assert!(!found.was_created());
    assert_eq!(h.clinic.created(EntityKind::Patient), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wellness_plan_resolves_by_exact_name() {
    let h = Harness::signed_in(Arc::new(MockClinic::new())).await;
    let strategy = WellnessPlanStrategy::new(&AppConfig::default());
    let mut record = WellnessPlanRecord::new("Puppy Gold", "Vaccination");
    record.description = Some("First year cover".into());

    assert!(resolve_or_create(&h.session, &strategy, &record).await.unwrap().was_created());
    assert!(!resolve_or_create(&h.session, &strategy, &record).await.unwrap().was_created());

    let plans = h.clinic.wellness_plans();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].product, "Vaccination");
    assert_eq!(plans[0].description.as_deref(), Some("First year cover"));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_product_is_unresolved() {
    let h = Harness::signed_in(Arc::new(MockClinic::new())).await;
    let strategy = WellnessPlanStrategy::new(&AppConfig::default());

    let err = resolve_or_create(&h.session, &strategy, &WellnessPlanRecord::new("Kitten Silver", "Dental"))
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::UnresolvedField { ref text, .. } if text == "Dental"));
    assert_eq!(h.events.count("creation_failed"), 1);
    assert_eq!(h.clinic.save_clicks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_save_at_wrong_position_is_not_taken_for_success() {
    let h = Harness::signed_in(Arc::new(MockClinic::new())).await;
    resolve_or_create(&h.session, &contacts(), &ContactRecord::new("Test", "Owner"))
        .await
        .unwrap();

    // Contact tab is at 0; the new patient tab's Save is at 1
    let strategy = PatientStrategy::from_contact(0);
    let err = resolve_or_create(&h.session, &strategy, &PatientRecord::new("Rex", "Owner, Test"))
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::AmbiguousOutcome { kind: EntityKind::Patient, .. }));
    assert_eq!(h.clinic.created(EntityKind::Patient), 0);
}
