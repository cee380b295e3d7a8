use async_trait::async_trait;
use vetprobe_common::{AppointmentRecord, EntityKind};

use crate::error::E2eResult;
use crate::page::{ClickMode, Locator, TextMatch};
use crate::probes::pick_from_dropdown;
use crate::resolver::{EntityStrategy, Lookup};
use crate::selectors::{appointment, dropdown, patient};
use crate::session::Session;

/// Appointments are opened from a patient tab and always created
#[derive(Debug, Clone)]
pub struct AppointmentStrategy {
    form_context_index: usize,
}

impl AppointmentStrategy {
    pub fn from_patient(form_context_index: usize) -> Self {
        Self { form_context_index }
    }
}

#[async_trait]
impl EntityStrategy for AppointmentStrategy {
    type Record = AppointmentRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::Appointment
    }

    fn natural_key(&self, record: &AppointmentRecord) -> String {
        record.resource_name.clone()
    }

    fn missing_field(&self, record: &AppointmentRecord) -> Option<&'static str> {
        record.missing_field()
    }

    fn lookup(&self, _record: &AppointmentRecord) -> E2eResult<Option<Lookup>> {
        Ok(None)
    }

    fn form_context_index(&self) -> usize {
        self.form_context_index
    }

    async fn open_form(&self, session: &Session, _record: &AppointmentRecord) -> E2eResult<()> {
        let opener = Locator::css(patient::NEW_APPOINTMENT);
        session.wait_visible(&opener, session.timeouts().element()).await?;
        session.page().click(&opener, ClickMode::Normal).await?;
        session
            .wait_visible(
                &Locator::id_prefix(appointment::RESOURCE_PREFIX, Some(dropdown::TRIGGER)),
                session.timeouts().element(),
            )
            .await
    }

    async fn fill_form(&self, session: &Session, record: &AppointmentRecord) -> E2eResult<()> {
        pick_from_dropdown(session, appointment::RESOURCE_PREFIX, &record.resource_name).await
    }

    fn created_marker(&self, record: &AppointmentRecord) -> Locator {
        Locator::css(appointment::ROWS).with_text(TextMatch::contains(record.resource_name.clone()))
    }
}
