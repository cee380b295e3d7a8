use async_trait::async_trait;
use vetprobe_common::{AppConfig, EntityKind, WellnessPlanRecord};

use crate::error::E2eResult;
use crate::page::{ClickMode, Locator, TextMatch};
use crate::probes::pick_from_dropdown;
use crate::resolver::{EntityStrategy, Lookup};
use crate::selectors::{form, wellness};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct WellnessPlanStrategy {
    list_path: String,
}

impl WellnessPlanStrategy {
    pub fn new(app: &AppConfig) -> Self {
        Self {
            list_path: app.wellness_plans_path.clone(),
        }
    }
}

#[async_trait]
impl EntityStrategy for WellnessPlanStrategy {
    type Record = WellnessPlanRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::WellnessPlan
    }

    fn natural_key(&self, record: &WellnessPlanRecord) -> String {
        record.name.clone()
    }

    fn missing_field(&self, record: &WellnessPlanRecord) -> Option<&'static str> {
        record.missing_field()
    }

    fn lookup(&self, record: &WellnessPlanRecord) -> E2eResult<Option<Lookup>> {
        Ok(Some(Lookup {
            path: self.list_path.clone(),
            query: record.name.clone(),
            pattern: TextMatch::exact(record.name.clone()),
        }))
    }

    fn form_context_index(&self) -> usize {
        0
    }

    async fn open_form(&self, session: &Session, _record: &WellnessPlanRecord) -> E2eResult<()> {
        session
            .page()
            .click(&Locator::css(form::NEW_RECORD), ClickMode::Normal)
            .await?;
        session
            .wait_visible(&Locator::css(wellness::NAME), session.timeouts().element())
            .await
    }

    async fn fill_form(&self, session: &Session, record: &WellnessPlanRecord) -> E2eResult<()> {
        let page = session.page();
        page.fill(&Locator::css(wellness::NAME), &record.name).await?;
        pick_from_dropdown(session, wellness::PRODUCT_PREFIX, &record.product).await?;
        if let Some(description) = &record.description {
            page.fill(&Locator::css(wellness::DESCRIPTION), description).await?;
        }
        Ok(())
    }
}
