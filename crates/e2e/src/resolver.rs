//! Resolve-or-create
//!
//! Every record kind is provisioned the same way: look for it by natural key
//! and stop if it exists, otherwise open a form, fill it, save it and classify
//! what the application shows afterwards. What differs per kind lives in an
//! [`EntityStrategy`].
//!
//! A save that produces neither toast is only accepted when the record can
//! be positively seen afterwards; otherwise it fails as
//! [`E2eError::AmbiguousOutcome`].

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};
use vetprobe_common::EntityKind;

use crate::error::{E2eError, E2eResult};
use crate::events::ResolveEvent;
use crate::outcome::{await_outcome, clear_stale_toasts, OutcomeSignal, OutcomeWindows};
use crate::page::{ClickMode, Locator, TextMatch};
use crate::probes::{await_search_result, select_search_result, sidebar_search};
use crate::selectors::{record_title, save_button};
use crate::session::Session;

/// Where and how to search for an existing record
#[derive(Debug, Clone)]
pub struct Lookup {
    /// List page that hosts the sidebar search
    pub path: String,
    /// Text typed into the search box
    pub query: String,
    /// What the first result must look like for the record to count as found
    pub pattern: TextMatch,
}

/// Per-kind part of the resolve-or-create algorithm
#[async_trait]
pub trait EntityStrategy: Send + Sync {
    type Record: Send + Sync;

    fn kind(&self) -> EntityKind;

    fn natural_key(&self, record: &Self::Record) -> String;

    /// First mandatory field that is empty
    fn missing_field(&self, record: &Self::Record) -> Option<&'static str>;

    /// Search used for the existence check; `None` always creates
    fn lookup(&self, record: &Self::Record) -> E2eResult<Option<Lookup>>;

    /// Position of this form's Save control among all open tabs
    fn form_context_index(&self) -> usize;

    async fn open_form(&self, session: &Session, record: &Self::Record) -> E2eResult<()>;

    async fn fill_form(&self, session: &Session, record: &Self::Record) -> E2eResult<()>;

    /// Element that shows the record exists once saved
    fn created_marker(&self, record: &Self::Record) -> Locator {
        record_title(TextMatch::exact(self.natural_key(record)))
    }

    /// Positive check that a save without a toast really stored the record
    async fn confirm_created(&self, session: &Session, record: &Self::Record) -> E2eResult<bool> {
        let window = session.timeouts().recheck();
        let found = match self.lookup(record)? {
            Some(lookup) => {
                sidebar_search(session, &lookup.query).await?;
                await_search_result(session, &lookup.pattern, window)
                    .await
                    .map(|_| ())
            }
            None => session.wait_visible(&self.created_marker(record), window).await,
        };
        match found {
            Ok(()) => Ok(true),
            Err(e) if e.is_timeout() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// How a record was provisioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Resolved {
        kind: EntityKind,
        key: String,
    },
    Created {
        kind: EntityKind,
        key: String,
        /// Success toast text; empty when confirmed by the re-check
        message: String,
    },
}

impl Resolution {
    pub fn key(&self) -> &str {
        match self {
            Resolution::Resolved { key, .. } | Resolution::Created { key, .. } => key,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Resolution::Created { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Resolution::Created { message, .. } => Some(message),
            Resolution::Resolved { .. } => None,
        }
    }
}

/// Find the record by natural key or create it
pub async fn resolve_or_create<S: EntityStrategy>(
    session: &Session,
    strategy: &S,
    record: &S::Record,
) -> E2eResult<Resolution> {
    let kind = strategy.kind();
    let key = strategy.natural_key(record);

    if let Some(field) = strategy.missing_field(record) {
        return Err(E2eError::MissingField { kind, key, field });
    }

    session.emit(ResolveEvent::ResolveAttempted {
        kind,
        key: key.clone(),
    });

    if let Some(lookup) = strategy.lookup(record)? {
        session.goto_path(&lookup.path).await?;
        sidebar_search(session, &lookup.query).await?;
        match await_search_result(session, &lookup.pattern, session.timeouts().search_result()).await {
            Ok(result) => {
                select_search_result(session, &result).await?;
                info!("Found existing {} '{}'", kind, key);
                session.emit(ResolveEvent::EntityFound {
                    kind,
                    key: key.clone(),
                });
                return Ok(Resolution::Resolved { kind, key });
            }
            Err(e) if e.is_timeout() => debug!("No {} matching '{}', creating", kind, key),
            Err(e) => return Err(e),
        }
    }

    session.emit(ResolveEvent::CreateStarted {
        kind,
        key: key.clone(),
    });

    match create(session, strategy, record).await {
        Ok(CreateOutcome::Toast(message)) => {
            session.emit(ResolveEvent::EntityCreated {
                kind,
                key: key.clone(),
                message: message.clone(),
            });
            Ok(Resolution::Created { kind, key, message })
        }
        Ok(CreateOutcome::Confirmed) => {
            session.emit(ResolveEvent::EntityCreated {
                kind,
                key: key.clone(),
                message: String::new(),
            });
            Ok(Resolution::Created {
                kind,
                key,
                message: String::new(),
            })
        }
        Ok(CreateOutcome::Unconfirmed) => Err(E2eError::AmbiguousOutcome { kind, key }),
        Ok(CreateOutcome::Rejected(message)) => {
            session.emit(ResolveEvent::CreationFailed {
                kind,
                key: key.clone(),
                message: message.clone(),
            });
            Err(E2eError::Creation { kind, key, message })
        }
        Err(e) => {
            session.emit(ResolveEvent::CreationFailed {
                kind,
                key,
                message: e.to_string(),
            });
            Err(e)
        }
    }
}

enum CreateOutcome {
    Toast(String),
    Confirmed,
    Unconfirmed,
    Rejected(String),
}

async fn create<S: EntityStrategy>(
    session: &Session,
    strategy: &S,
    record: &S::Record,
) -> E2eResult<CreateOutcome> {
    let timeouts = session.timeouts();
    strategy.open_form(session, record).await?;
    strategy.fill_form(session, record).await?;

    let save = save_button(strategy.form_context_index());
    session.wait_visible(&save, timeouts.element()).await?;
    let stale = clear_stale_toasts(session.page(), timeouts.success_toast(), timeouts.poll_interval()).await?;
    session.page().click(&save, ClickMode::Normal).await?;

    let windows = OutcomeWindows {
        success: timeouts.success_toast(),
        error: timeouts.error_toast(),
        poll_interval: timeouts.poll_interval(),
    };
    Ok(match await_outcome(session.page(), windows, stale).await? {
        OutcomeSignal::Success(message) => CreateOutcome::Toast(message),
        OutcomeSignal::Error(message) => CreateOutcome::Rejected(message),
        OutcomeSignal::Unknown => {
            session.emit(ResolveEvent::OutcomeAmbiguous {
                kind: strategy.kind(),
                key: strategy.natural_key(record),
            });
            if strategy.confirm_created(session, record).await? {
                CreateOutcome::Confirmed
            } else {
                CreateOutcome::Unconfirmed
            }
        }
    })
}
