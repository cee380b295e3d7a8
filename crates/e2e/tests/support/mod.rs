//! Shared setup for tests that drive the simulated clinic
#![allow(dead_code)]

use std::sync::Arc;

use vetprobe_common::SuiteConfig;
use vetprobe_e2e::auth;
use vetprobe_e2e::mock::{MockClinic, MockPage};
use vetprobe_e2e::{Flow, RecordingSink, Session};

pub struct Harness {
    pub clinic: Arc<MockClinic>,
    pub page: Arc<MockPage>,
    pub events: Arc<RecordingSink>,
    pub session: Session,
}

impl Harness {
    pub fn new(clinic: Arc<MockClinic>) -> Self {
        let config = clinic.suite_config();
        Self::with_config(clinic, config)
    }

    pub fn with_config(clinic: Arc<MockClinic>, config: SuiteConfig) -> Self {
        let page = clinic.open_page();
        let events = Arc::new(RecordingSink::new());
        let session = Session::new(page.clone(), Arc::new(config), events.clone());
        Self {
            clinic,
            page,
            events,
            session,
        }
    }

    pub fn fresh() -> Self {
        Self::new(Arc::new(MockClinic::new()))
    }

    /// Harness whose session already went through the login sequence
    pub async fn signed_in(clinic: Arc<MockClinic>) -> Self {
        let config = clinic.suite_config();
        Self::signed_in_with(clinic, config).await
    }

    pub async fn signed_in_with(clinic: Arc<MockClinic>, config: SuiteConfig) -> Self {
        let harness = Self::with_config(clinic, config);
        auth::login(&harness.session).await.unwrap();
        harness
    }

    pub fn flow(&self) -> Flow {
        Flow::new(self.session.clone())
    }

    /// Number of times the given selector was filled
    pub fn fills_of(&self, selector: &str) -> usize {
        self.page.count_calls(&format!("fill {} =", selector))
    }
}
