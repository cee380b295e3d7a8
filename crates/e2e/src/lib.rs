//! vetprobe E2E Suite
//!
//! Drives the hosted clinic application through a real browser and makes
//! test fixtures exist without caring whether an earlier run already
//! created them:
//! - Resolves records by searching first and creates them only when absent
//! - Races success and error toasts to classify every save
//! - Chains contact, patient and appointment creation across open tabs
//! - Runs declarative YAML scenarios with one isolated session each
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ScenarioRunner (YAML specs)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Flow            login → ensure_* / create_*_from_* → logout │
//! │    └── resolve_or_create(strategy, record)                  │
//! │          ├── lookup: sidebar search + first result pattern  │
//! │          ├── create: open form, fill, Save[nth]             │
//! │          └── await_outcome: error toast ▸ success toast     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Page port       ChromiumPage (chromiumoxide) | MockPage    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod browser;
pub mod entities;
pub mod error;
pub mod events;
pub mod flow;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod outcome;
pub mod page;
pub mod preflight;
pub mod probes;
pub mod resolver;
pub mod runner;
pub mod selectors;
pub mod session;
pub mod spec;
pub mod wait;

pub use browser::{ChromiumFactory, ChromiumPage};
pub use error::{E2eError, E2eResult};
pub use events::{EventSink, FanoutSink, RecordingSink, ResolveEvent, TracingSink};
pub use flow::{Flow, FlowContext, ScenarioState};
pub use page::{ClickMode, Key, Locator, Page, TextMatch};
pub use resolver::{resolve_or_create, EntityStrategy, Lookup, Resolution};
pub use runner::{ScenarioRunner, SessionFactory, StepResult, TestResult, TestSuiteResult};
pub use session::Session;
pub use spec::{ScenarioSpec, ScenarioStep};
