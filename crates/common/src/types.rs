//! Record types mirrored from the clinic application's UI

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ConfigError;

/// Email written into every contact created by the suite
pub const TEST_CONTACT_EMAIL: &str = "qa.automation@vetprobe.test";

/// Kind of record the suite can resolve or create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Contact,
    Patient,
    Appointment,
    WellnessPlan,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Contact => write!(f, "contact"),
            EntityKind::Patient => write!(f, "patient"),
            EntityKind::Appointment => write!(f, "appointment"),
            EntityKind::WellnessPlan => write!(f, "wellness plan"),
        }
    }
}

/// Contact classification checkboxes on the contact form
///
/// Deserializes from any spelling [`FromStr`] accepts, e.g. `StaffMember`,
/// `staff member` or `staff_member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ContactType {
    Customer,
    Supplier,
    Vet,
    Syndicate,
    StaffMember,
    Pharmacy,
}

impl ContactType {
    pub const ALL: [ContactType; 6] = [
        ContactType::Customer,
        ContactType::Supplier,
        ContactType::Vet,
        ContactType::Syndicate,
        ContactType::StaffMember,
        ContactType::Pharmacy,
    ];

    /// Label rendered next to the checkbox
    pub fn label(&self) -> &'static str {
        match self {
            ContactType::Customer => "Customer",
            ContactType::Supplier => "Supplier",
            ContactType::Vet => "Vet",
            ContactType::Syndicate => "Syndicate",
            ContactType::StaffMember => "Staff Member",
            ContactType::Pharmacy => "Pharmacy",
        }
    }

    /// Value of the checkbox's `data-contact-type` attribute
    pub fn attr_value(&self) -> &'static str {
        match self {
            ContactType::Customer => "customer",
            ContactType::Supplier => "supplier",
            ContactType::Vet => "vet",
            ContactType::Syndicate => "syndicate",
            ContactType::StaffMember => "staff_member",
            ContactType::Pharmacy => "pharmacy",
        }
    }
}

impl std::fmt::Display for ContactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContactType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        ContactType::ALL
            .into_iter()
            .find(|t| t.attr_value().replace('_', "") == normalized)
            .ok_or_else(|| ConfigError::UnknownContactType(s.to_string()))
    }
}

impl TryFrom<String> for ContactType {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A contact (owner, supplier, vet, ...) addressed by "Last, First"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "default_contact_types")]
    pub contact_types: BTreeSet<ContactType>,
    #[serde(default = "default_email")]
    pub email: String,
}

fn default_contact_types() -> BTreeSet<ContactType> {
    BTreeSet::from([ContactType::Customer])
}

fn default_email() -> String {
    TEST_CONTACT_EMAIL.to_string()
}

impl ContactRecord {
    /// A customer contact, which is what the form pre-selects
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            contact_types: default_contact_types(),
            email: default_email(),
        }
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = ContactType>) -> Self {
        self.contact_types = types.into_iter().collect();
        self
    }

    /// Search and display key, e.g. "Smith, John"
    pub fn natural_key(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }

    pub fn wants(&self, contact_type: ContactType) -> bool {
        self.contact_types.contains(&contact_type)
    }

    /// First mandatory field that is empty, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.first_name.trim().is_empty() {
            Some("first_name")
        } else if self.last_name.trim().is_empty() {
            Some("last_name")
        } else if self.contact_types.is_empty() {
            Some("contact_types")
        } else {
            None
        }
    }
}

/// A patient (animal) belonging to an existing contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub name: String,
    /// Natural key of the owning contact; the contact must already exist
    pub owner: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PatientRecord {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            age: None,
            tags: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else {
            None
        }
    }
}

/// An appointment; the patient comes from the record it is opened from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub resource_name: String,
}

impl AppointmentRecord {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
        }
    }

    pub fn missing_field(&self) -> Option<&'static str> {
        if self.resource_name.trim().is_empty() {
            Some("resource_name")
        } else {
            None
        }
    }
}

/// A wellness plan sold against a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellnessPlanRecord {
    pub name: String,
    pub product: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl WellnessPlanRecord {
    pub fn new(name: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product: product.into(),
            description: None,
        }
    }

    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.product.trim().is_empty() {
            Some("product")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_contact_natural_key() {
        let contact = ContactRecord::new("John", "Smith");
        assert_eq!(contact.natural_key(), "Smith, John");
        assert!(contact.wants(ContactType::Customer));
        assert_eq!(contact.email, TEST_CONTACT_EMAIL);
    }

    #[test_case("Vet", ContactType::Vet)]
    #[test_case("staff member", ContactType::StaffMember)]
    #[test_case("StaffMember", ContactType::StaffMember)]
    #[test_case("staff_member", ContactType::StaffMember)]
    #[test_case("PHARMACY", ContactType::Pharmacy)]
    fn test_contact_type_parse(input: &str, expected: ContactType) {
        assert_eq!(input.parse::<ContactType>().unwrap(), expected);
    }

    #[test]
    fn test_contact_type_parse_unknown() {
        assert!(matches!(
            "Groomer".parse::<ContactType>(),
            Err(ConfigError::UnknownContactType(_))
        ));
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(AppointmentRecord::new("  ").missing_field(), Some("resource_name"));
        assert_eq!(AppointmentRecord::new("Dr Smith").missing_field(), None);
        assert_eq!(
            ContactRecord::new("John", "Smith").with_types([]).missing_field(),
            Some("contact_types")
        );
        assert_eq!(WellnessPlanRecord::new("Gold", "").missing_field(), Some("product"));
        assert_eq!(PatientRecord::new("", "Smith, John").missing_field(), Some("name"));
    }

    #[test]
    fn test_contact_types_deserialize_loosely() {
        let contact: ContactRecord = serde_json::from_str(
            r#"{"first_name":"Jane","last_name":"Doe","contact_types":["staff member","Vet"]}"#,
        )
        .unwrap();
        assert_eq!(
            contact.contact_types,
            BTreeSet::from([ContactType::Vet, ContactType::StaffMember])
        );

        let err = serde_json::from_str::<ContactRecord>(
            r#"{"first_name":"Jane","last_name":"Doe","contact_types":["Groomer"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown contact type: Groomer"));
    }

    #[test]
    fn test_contact_deserialize_defaults() {
        let contact: ContactRecord =
            serde_json::from_str(r#"{"first_name":"Test","last_name":"Owner"}"#).unwrap();
        assert_eq!(contact.contact_types, BTreeSet::from([ContactType::Customer]));
    }
}
