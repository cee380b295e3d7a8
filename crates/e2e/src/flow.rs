//! Scenario orchestration
//!
//! A [`Flow`] chains resolve-or-create steps inside one authenticated
//! session. It is linear: each step must be allowed in the current state and
//! the first failure ends the scenario, after which every step reports
//! [`E2eError::ScenarioAborted`].
//!
//! The flow also tracks which record tabs are open so contextual steps get
//! the right Save position without the caller counting tabs.

use serde::Serialize;
use tracing::{debug, info};
use vetprobe_common::{
    AppointmentRecord, ContactRecord, EntityKind, PatientRecord, WellnessPlanRecord,
};

use crate::auth;
use crate::entities::{AppointmentStrategy, ContactStrategy, PatientStrategy, WellnessPlanStrategy};
use crate::error::{E2eError, E2eResult};
use crate::resolver::{resolve_or_create, Resolution};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Start,
    Authenticated,
    /// At least one record step succeeded
    Working,
    Complete,
    LoggedOut,
    Failed,
}

impl std::fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScenarioState::Start => "start",
            ScenarioState::Authenticated => "authenticated",
            ScenarioState::Working => "working",
            ScenarioState::Complete => "complete",
            ScenarioState::LoggedOut => "logged_out",
            ScenarioState::Failed => "failed",
        };
        f.write_str(name)
    }
}

const SIGNED_IN: &[ScenarioState] = &[ScenarioState::Authenticated, ScenarioState::Working];

/// What the scenario has provisioned so far
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowContext {
    /// Natural key of the last contact resolved or created
    pub contact: Option<String>,
    /// Name of the last patient resolved or created
    pub patient: Option<String>,
    /// Record tabs open in the window, oldest first
    pub open_tabs: Vec<EntityKind>,
    /// Success toast of the latest record step; `None` when that step
    /// found an existing record
    pub last_message: Option<String>,
    pub resolutions: Vec<Resolution>,
}

impl FlowContext {
    fn top_tab(&self) -> Option<EntityKind> {
        self.open_tabs.last().copied()
    }

    fn record(&mut self, resolution: &Resolution) {
        self.last_message = resolution.message().map(str::to_string);
        self.resolutions.push(resolution.clone());
    }
}

pub struct Flow {
    session: Session,
    state: ScenarioState,
    context: FlowContext,
    failed_at: Option<String>,
}

impl Flow {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            state: ScenarioState::Start,
            context: FlowContext::default(),
            failed_at: None,
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn context(&self) -> &FlowContext {
        &self.context
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn enter(&mut self, step: &str, allowed: &[ScenarioState]) -> E2eResult<()> {
        if let Some(at) = &self.failed_at {
            return Err(E2eError::ScenarioAborted(at.clone()));
        }
        if !allowed.contains(&self.state) {
            let err = E2eError::InvalidTransition {
                step: step.to_string(),
                state: self.state.to_string(),
            };
            self.fail(step);
            return Err(err);
        }
        debug!("Step {} from state {}", step, self.state);
        Ok(())
    }

    fn fail(&mut self, step: &str) {
        self.state = ScenarioState::Failed;
        self.failed_at = Some(step.to_string());
    }

    fn finish_step<T>(&mut self, step: &str, result: E2eResult<T>, next: ScenarioState) -> E2eResult<T> {
        match result {
            Ok(value) => {
                self.state = next;
                Ok(value)
            }
            Err(e) => {
                self.fail(step);
                Err(e)
            }
        }
    }

    fn require_tab(&mut self, step: &str, kind: EntityKind) -> E2eResult<usize> {
        if self.context.top_tab() == Some(kind) {
            return Ok(self.context.open_tabs.len());
        }
        self.fail(step);
        Err(E2eError::StepFailed {
            step: step.to_string(),
            reason: format!("no open {} tab to start from", kind),
        })
    }

    pub async fn login(&mut self) -> E2eResult<()> {
        self.enter("login", &[ScenarioState::Start, ScenarioState::LoggedOut])?;
        let result = auth::login_with_retry(&self.session).await;
        self.context.open_tabs.clear();
        self.finish_step("login", result, ScenarioState::Authenticated)
    }

    pub async fn ensure_contact(&mut self, record: &ContactRecord) -> E2eResult<Resolution> {
        self.enter("ensure_contact", SIGNED_IN)?;
        let strategy = ContactStrategy::new(&self.session.config.app);
        let result = resolve_or_create(&self.session, &strategy, record).await;
        let resolution = self.finish_step("ensure_contact", result, ScenarioState::Working)?;
        self.context.contact = Some(record.natural_key());
        self.context.open_tabs = vec![EntityKind::Contact];
        self.context.record(&resolution);
        Ok(resolution)
    }

    pub async fn ensure_patient(&mut self, record: &PatientRecord) -> E2eResult<Resolution> {
        self.enter("ensure_patient", SIGNED_IN)?;
        let strategy = PatientStrategy::standalone(&self.session.config.app);
        let result = resolve_or_create(&self.session, &strategy, record).await;
        let resolution = self.finish_step("ensure_patient", result, ScenarioState::Working)?;
        self.context.patient = Some(record.name.clone());
        self.context.open_tabs = vec![EntityKind::Patient];
        self.context.record(&resolution);
        Ok(resolution)
    }

    /// Create a patient from the open contact tab; the owner defaults to
    /// that contact
    pub async fn create_patient_from_contact(&mut self, record: &PatientRecord) -> E2eResult<Resolution> {
        const STEP: &str = "create_patient_from_contact";
        self.enter(STEP, SIGNED_IN)?;
        let index = self.require_tab(STEP, EntityKind::Contact)?;

        let mut record = record.clone();
        if record.owner.trim().is_empty() {
            record.owner = self.context.contact.clone().unwrap_or_default();
        }
        let strategy = PatientStrategy::from_contact(index);
        let result = resolve_or_create(&self.session, &strategy, &record).await;
        let resolution = self.finish_step(STEP, result, ScenarioState::Working)?;
        self.context.patient = Some(record.name.clone());
        self.context.open_tabs.push(EntityKind::Patient);
        self.context.record(&resolution);
        Ok(resolution)
    }

    pub async fn create_appointment_from_patient(
        &mut self,
        record: &AppointmentRecord,
    ) -> E2eResult<Resolution> {
        const STEP: &str = "create_appointment_from_patient";
        self.enter(STEP, SIGNED_IN)?;
        let index = self.require_tab(STEP, EntityKind::Patient)?;

        let strategy = AppointmentStrategy::from_patient(index);
        let result = resolve_or_create(&self.session, &strategy, record).await;
        let resolution = self.finish_step(STEP, result, ScenarioState::Working)?;
        self.context.open_tabs.push(EntityKind::Appointment);
        self.context.record(&resolution);
        Ok(resolution)
    }

    pub async fn ensure_wellness_plan(&mut self, record: &WellnessPlanRecord) -> E2eResult<Resolution> {
        self.enter("ensure_wellness_plan", SIGNED_IN)?;
        let strategy = WellnessPlanStrategy::new(&self.session.config.app);
        let result = resolve_or_create(&self.session, &strategy, record).await;
        let resolution = self.finish_step("ensure_wellness_plan", result, ScenarioState::Working)?;
        self.context.open_tabs = vec![EntityKind::WellnessPlan];
        self.context.record(&resolution);
        Ok(resolution)
    }

    /// Check that the latest record step's success toast contains `needle`,
    /// ignoring case
    pub fn expect_saved_message(&mut self, needle: &str) -> E2eResult<()> {
        const STEP: &str = "expect_saved_message";
        self.enter(STEP, &[ScenarioState::Working])?;
        let result = match &self.context.last_message {
            Some(message) if message.to_lowercase().contains(&needle.to_lowercase()) => Ok(()),
            Some(message) => Err(E2eError::AssertionFailed(format!(
                "last saved message {:?} does not contain {:?}",
                message, needle
            ))),
            None => Err(E2eError::AssertionFailed(format!(
                "no saved message to match {:?}",
                needle
            ))),
        };
        self.finish_step(STEP, result, ScenarioState::Working)
    }

    pub async fn logout(&mut self) -> E2eResult<()> {
        self.enter(
            "logout",
            &[
                ScenarioState::Authenticated,
                ScenarioState::Working,
                ScenarioState::Complete,
            ],
        )?;
        let result = auth::logout(&self.session).await;
        self.context.open_tabs.clear();
        self.finish_step("logout", result, ScenarioState::LoggedOut)
    }

    /// Mark the scenario complete
    pub fn finish(&mut self) -> E2eResult<()> {
        self.enter(
            "finish",
            &[
                ScenarioState::Authenticated,
                ScenarioState::Working,
                ScenarioState::LoggedOut,
            ],
        )?;
        if self.state != ScenarioState::LoggedOut {
            self.state = ScenarioState::Complete;
        }
        info!(
            "Scenario complete: {} record step(s)",
            self.context.resolutions.len()
        );
        Ok(())
    }
}
