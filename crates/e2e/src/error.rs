//! Error types for the browser suite

use thiserror::Error;
use vetprobe_common::EntityKind;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Field {field} did not resolve to a single match for '{text}'")]
    UnresolvedField { field: String, text: String },

    #[error("Creating {kind} '{key}' failed: {message}")]
    Creation {
        kind: EntityKind,
        key: String,
        message: String,
    },

    #[error("Saving {kind} '{key}' gave no toast and the record could not be found afterwards")]
    AmbiguousOutcome { kind: EntityKind, key: String },

    #[error("Cannot create {kind} '{key}': mandatory field {field} is empty")]
    MissingField {
        kind: EntityKind,
        key: String,
        field: &'static str,
    },

    #[error("Contact '{key}' has {contact_type} checked={actual}, expected {expected}")]
    ContactTypeMismatch {
        key: String,
        contact_type: String,
        expected: bool,
        actual: bool,
    },

    #[error("Login failed after {attempts} attempt(s): {last_error}")]
    Login { attempts: u32, last_error: String },

    #[error("Step '{step}' is not allowed in state {state}")]
    InvalidTransition { step: String, state: String },

    #[error("Scenario already failed at step {0}")]
    ScenarioAborted(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Application not reachable after {0} attempts")]
    AppUnreachable(usize),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Scenario spec parse error: {0}")]
    SpecParse(String),

    #[error("Configuration error: {0}")]
    Config(#[from] vetprobe_common::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<chromiumoxide::error::CdpError> for E2eError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        E2eError::Browser(e.to_string())
    }
}

impl E2eError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
