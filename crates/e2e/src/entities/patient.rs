use async_trait::async_trait;
use vetprobe_common::{AppConfig, EntityKind, PatientRecord};

use crate::error::E2eResult;
use crate::page::{ClickMode, Locator, TextMatch};
use crate::probes::{enter_tags, resolve_autocomplete};
use crate::resolver::{EntityStrategy, Lookup};
use crate::selectors::{contact, form, patient};
use crate::session::Session;

/// How the patient form is reached
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    /// From the patients list, with the owner picked by autocomplete
    Standalone { list_path: String },
    /// From an open contact record, which fills in the owner; no lookup
    FromContact { form_context_index: usize },
}

#[derive(Debug, Clone)]
pub struct PatientStrategy {
    mode: Mode,
}

impl PatientStrategy {
    pub fn standalone(app: &AppConfig) -> Self {
        Self {
            mode: Mode::Standalone {
                list_path: app.patients_path.clone(),
            },
        }
    }

    /// Patient form opened from the contact tab; its Save control sits at
    /// `form_context_index` among the open tabs.
    pub fn from_contact(form_context_index: usize) -> Self {
        Self {
            mode: Mode::FromContact { form_context_index },
        }
    }
}

/// Patient names render quoted in search results
pub fn patient_search_pattern(name: &str) -> TextMatch {
    TextMatch::contains(format!("\"{}\"", name))
}

#[async_trait]
impl EntityStrategy for PatientStrategy {
    type Record = PatientRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::Patient
    }

    fn natural_key(&self, record: &PatientRecord) -> String {
        record.name.clone()
    }

    fn missing_field(&self, record: &PatientRecord) -> Option<&'static str> {
        match (&self.mode, record.missing_field()) {
            (_, Some(field)) => Some(field),
            (Mode::Standalone { .. }, None) if record.owner.trim().is_empty() => Some("owner"),
            _ => None,
        }
    }

    fn lookup(&self, record: &PatientRecord) -> E2eResult<Option<Lookup>> {
        Ok(match &self.mode {
            Mode::Standalone { list_path } => Some(Lookup {
                path: list_path.clone(),
                query: record.name.clone(),
                pattern: patient_search_pattern(&record.name),
            }),
            Mode::FromContact { .. } => None,
        })
    }

    fn form_context_index(&self) -> usize {
        match self.mode {
            Mode::Standalone { .. } => 0,
            Mode::FromContact { form_context_index } => form_context_index,
        }
    }

    async fn open_form(&self, session: &Session, _record: &PatientRecord) -> E2eResult<()> {
        let opener = match self.mode {
            Mode::Standalone { .. } => form::NEW_RECORD,
            Mode::FromContact { .. } => contact::NEW_PATIENT,
        };
        let opener = Locator::css(opener);
        session.wait_visible(&opener, session.timeouts().element()).await?;
        session.page().click(&opener, ClickMode::Normal).await?;
        session
            .wait_visible(&Locator::css(patient::NAME), session.timeouts().element())
            .await
    }

    async fn fill_form(&self, session: &Session, record: &PatientRecord) -> E2eResult<()> {
        let page = session.page();
        page.fill(&Locator::css(patient::NAME), &record.name).await?;

        if let Mode::Standalone { .. } = self.mode {
            resolve_autocomplete(session, &Locator::css(patient::OWNER), &record.owner, None).await?;
        }
        if let Some(age) = record.age {
            page.fill(&Locator::css(patient::AGE), &age.to_string()).await?;
        }
        if !record.tags.is_empty() {
            enter_tags(session, &Locator::css(patient::TAGS), &record.tags).await?;
        }
        Ok(())
    }
}
