//! YAML scenarios through the runner, against the simulated clinic

use std::sync::Arc;

use vetprobe_common::EntityKind;
use vetprobe_e2e::mock::{MockClinic, MockFactory};
use vetprobe_e2e::{RecordingSink, ScenarioRunner, ScenarioSpec, TestSuiteResult};

const BOOKING: &str = r#"
name: new-client-booking
tags: [smoke]
steps:
  - action: login
  - action: ensure_contact
    first_name: Test
    last_name: "Owner{ts}"
  - action: expect_saved_message
    contains: saved
  - action: create_patient_from_contact
    name: "TestPet{ts}"
    tags: [friendly]
  - action: expect_saved_message
    contains: saved
  - action: create_appointment_from_patient
    resource_name: Dr Smith
  - action: expect_saved_message
    contains: saved
  - action: logout
"#;

const ORPHAN_PATIENT: &str = r#"
name: orphan-patient
steps:
  - action: login
  - action: create_patient_from_contact
    name: "Stray{ts}"
  - action: logout
"#;

struct Fixture {
    clinic: Arc<MockClinic>,
    factory: Arc<MockFactory>,
    events: Arc<RecordingSink>,
    runner: ScenarioRunner,
    output: tempfile::TempDir,
}

fn fixture(parallelism: usize) -> Fixture {
    let clinic = Arc::new(MockClinic::new());
    let output = tempfile::tempdir().unwrap();
    let mut config = clinic.suite_config();
    config.runner.output_dir = output.path().to_path_buf();
    config.runner.parallelism = parallelism;

    let factory = Arc::new(MockFactory::new(clinic.clone()));
    let events = Arc::new(RecordingSink::new());
    let runner = ScenarioRunner::new(Arc::new(config), factory.clone(), events.clone());
    Fixture {
        clinic,
        factory,
        events,
        runner,
        output,
    }
}

#[tokio::test(start_paused = true)]
async fn test_booking_scenario_passes() {
    let f = fixture(1);
    let specs = vec![ScenarioSpec::from_yaml(BOOKING).unwrap()];

    let results = f.runner.run_specs(&specs).await.unwrap();

    assert!(results.success());
    results.ensure_passed().unwrap();
    let result = &results.results[0];
    assert_eq!(result.steps.len(), 8);
    assert!(result.steps.iter().all(|s| s.success));
    assert_eq!(
        result.steps[1].detail.as_deref(),
        Some(format!("created contact 'Owner{}, Test': Contact saved successfully", result.stamp).as_str())
    );

    let pet = format!("TestPet{}", result.stamp);
    assert_eq!(f.clinic.patients()[0].name, pet);
    assert_eq!(f.clinic.patients()[0].tags, vec!["friendly"]);
    assert_eq!(f.clinic.created(EntityKind::Appointment), 1);
    assert_eq!(f.events.count("entity_created"), 3);
    assert!(f.factory.pages().iter().all(|p| p.is_closed()));
}

#[tokio::test(start_paused = true)]
async fn test_failed_step_stops_scenario_and_captures_screenshot() {
    let f = fixture(1);
    let specs = vec![ScenarioSpec::from_yaml(ORPHAN_PATIENT).unwrap()];

    let results = f.runner.run_specs(&specs).await.unwrap();

    assert!(!results.success());
    assert!(results.ensure_passed().is_err());
    let result = &results.results[0];
    assert_eq!(result.steps.len(), 2);
    let failed = &result.steps[1];
    assert!(!failed.success);
    assert_eq!(failed.action, "create_patient_from_contact");

    let screenshot = failed.screenshot_path.as_ref().unwrap();
    assert!(screenshot.starts_with(f.output.path().join("screenshots")));
    assert!(std::fs::read(screenshot).unwrap().starts_with(b"\x89PNG"));
    assert_eq!(f.clinic.created(EntityKind::Patient), 0);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_scenarios_get_their_own_sessions() {
    let f = fixture(2);
    let specs = vec![
        ScenarioSpec::from_yaml(BOOKING).unwrap(),
        ScenarioSpec::from_yaml(ORPHAN_PATIENT).unwrap(),
    ];

    let results = f.runner.run_specs(&specs).await.unwrap();

    assert_eq!(results.total, 2);
    assert_eq!(results.passed, 1);
    assert_eq!(results.failed, 1);
    assert_eq!(results.results[0].name, "new-client-booking");
    assert_eq!(results.results[1].name, "orphan-patient");
    assert_eq!(f.factory.pages().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_runs_of_one_scenario_use_distinct_fixtures() {
    let f = fixture(2);
    let booking = ScenarioSpec::from_yaml(BOOKING).unwrap();
    let specs = vec![booking.clone(), booking];

    let results = f.runner.run_specs(&specs).await.unwrap();

    results.ensure_passed().unwrap();
    assert_ne!(results.results[0].stamp, results.results[1].stamp);
    assert_eq!(f.clinic.created(EntityKind::Contact), 2);
    assert_eq!(f.clinic.created(EntityKind::Patient), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_dir_and_write_results() {
    let f = fixture(1);
    let specs_dir = tempfile::tempdir().unwrap();
    std::fs::write(specs_dir.path().join("booking.yaml"), BOOKING).unwrap();

    let results = f.runner.run_dir(specs_dir.path()).await.unwrap();
    let path = f.runner.write_results(&results).unwrap();

    let written: TestSuiteResult =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written.total, 1);
    assert_eq!(written.passed, 1);
    assert_eq!(written.results[0].name, "new-client-booking");
}

#[tokio::test(start_paused = true)]
async fn test_bundled_scenarios_run_clean() {
    let f = fixture(1);
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");

    let results = f.runner.run_dir(&dir).await.unwrap();

    assert_eq!(results.total, 3);
    results.ensure_passed().unwrap();
    let plans = f.clinic.wellness_plans();
    assert_eq!(plans[0].name, "Puppy Gold");
    let vet = f
        .clinic
        .contacts()
        .into_iter()
        .find(|c| c.last_name.starts_with("Vet"))
        .unwrap();
    assert!(!vet.wants(vetprobe_common::ContactType::Customer));
}
