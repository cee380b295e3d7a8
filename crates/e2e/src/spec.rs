//! Declarative YAML scenario specification

use serde::{Deserialize, Serialize};
use std::path::Path;
use vetprobe_common::{
    AppointmentRecord, ContactRecord, FixtureStamp, PatientRecord, WellnessPlanRecord,
};

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,
}

/// Patient fields for the contextual variant; the owner comes from the
/// open contact unless given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextualPatient {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ContextualPatient {
    pub fn to_record(&self) -> PatientRecord {
        PatientRecord {
            name: self.name.clone(),
            owner: self.owner.clone().unwrap_or_default(),
            age: self.age,
            tags: self.tags.clone(),
        }
    }
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Log in with the configured credentials and location
    Login,

    /// Find or create a contact from the contacts list
    EnsureContact(ContactRecord),

    /// Find or create a patient from the patients list
    EnsurePatient(PatientRecord),

    /// Create a patient from the open contact
    CreatePatientFromContact(ContextualPatient),

    /// Create an appointment from the open patient
    CreateAppointmentFromPatient(AppointmentRecord),

    /// Find or create a wellness plan
    EnsureWellnessPlan(WellnessPlanRecord),

    /// Assert on the last success toast
    ExpectSavedMessage { contains: String },

    Logout,
}

impl ScenarioStep {
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioStep::Login => "login",
            ScenarioStep::EnsureContact(_) => "ensure_contact",
            ScenarioStep::EnsurePatient(_) => "ensure_patient",
            ScenarioStep::CreatePatientFromContact(_) => "create_patient_from_contact",
            ScenarioStep::CreateAppointmentFromPatient(_) => "create_appointment_from_patient",
            ScenarioStep::EnsureWellnessPlan(_) => "ensure_wellness_plan",
            ScenarioStep::ExpectSavedMessage { .. } => "expect_saved_message",
            ScenarioStep::Logout => "logout",
        }
    }
}

fn stamp_value(value: &mut serde_json::Value, stamp: FixtureStamp) {
    match value {
        serde_json::Value::String(s) => *s = stamp.apply(s),
        serde_json::Value::Array(items) => items.iter_mut().for_each(|v| stamp_value(v, stamp)),
        serde_json::Value::Object(map) => map.values_mut().for_each(|v| stamp_value(v, stamp)),
        _ => {}
    }
}

impl ScenarioSpec {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios under a directory, in path order
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    pub fn find_by_name<'a>(specs: &'a [Self], name: &str) -> Option<&'a Self> {
        specs.iter().find(|s| s.name == name)
    }

    /// Copy with every `{ts}` in step values replaced by the stamp
    pub fn stamped(&self, stamp: FixtureStamp) -> E2eResult<Self> {
        let mut steps = serde_json::to_value(&self.steps)?;
        stamp_value(&mut steps, stamp);
        Ok(Self {
            steps: serde_json::from_value(steps)?,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetprobe_common::ContactType;

    const BOOKING: &str = r#"
name: new-client-booking
description: New client with a pet and a first appointment
tags:
  - smoke
  - booking
steps:
  - action: login
  - action: ensure_contact
    first_name: Test
    last_name: "Owner{ts}"
  - action: create_patient_from_contact
    name: "TestPet{ts}"
    age: 3
    tags: [friendly, "{ts}"]
  - action: create_appointment_from_patient
    resource_name: Dr Smith
  - action: expect_saved_message
    contains: saved
  - action: logout
"#;

    #[test]
    fn test_parse_booking_spec() {
        let spec = ScenarioSpec::from_yaml(BOOKING).unwrap();
        assert_eq!(spec.name, "new-client-booking");
        assert_eq!(spec.steps.len(), 6);
        assert_eq!(spec.steps[0], ScenarioStep::Login);
        match &spec.steps[1] {
            ScenarioStep::EnsureContact(contact) => {
                assert_eq!(contact.natural_key(), "Owner{ts}, Test");
                assert!(contact.wants(ContactType::Customer));
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(spec.steps[3].name(), "create_appointment_from_patient");
    }

    #[test]
    fn test_stamped_replaces_placeholders() {
        let spec = ScenarioSpec::from_yaml(BOOKING).unwrap();
        let stamped = spec.stamped(FixtureStamp::from_millis(1730000000000)).unwrap();
        match &stamped.steps[2] {
            ScenarioStep::CreatePatientFromContact(patient) => {
                assert_eq!(patient.name, "TestPet1730000000000");
                assert_eq!(patient.tags, vec!["friendly", "1730000000000"]);
                assert_eq!(patient.owner, None);
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(stamped.name, spec.name);
    }

    #[test]
    fn test_parse_contact_types_and_wellness() {
        let yaml = r#"
name: plan-setup
steps:
  - action: login
  - action: ensure_contact
    first_name: Jane
    last_name: Doe
    contact_types: [Vet, StaffMember]
  - action: ensure_wellness_plan
    name: Puppy Gold
    product: Vaccination
"#;
        let spec = ScenarioSpec::from_yaml(yaml).unwrap();
        match &spec.steps[1] {
            ScenarioStep::EnsureContact(contact) => {
                assert!(!contact.wants(ContactType::Customer));
                assert!(contact.wants(ContactType::StaffMember));
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert!(matches!(spec.steps[2], ScenarioStep::EnsureWellnessPlan(_)));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let yaml = "name: bad\nsteps:\n  - action: delete_everything\n";
        assert!(ScenarioSpec::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_all_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), BOOKING).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("nested/b.yml"),
            "name: logout-only\ntags: [auth]\nsteps:\n  - action: login\n  - action: logout\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let specs = ScenarioSpec::load_all(dir.path()).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(ScenarioSpec::filter_by_tag(&specs, "smoke").len(), 1);
        assert_eq!(ScenarioSpec::filter_by_tag(&specs, "auth")[0].name, "logout-only");
        assert!(ScenarioSpec::find_by_name(&specs, "new-client-booking").is_some());
    }
}
