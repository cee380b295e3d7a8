//! Resolver events
//!
//! The resolver reports what it decided through an [`EventSink`] instead of
//! narrating. [`TracingSink`] forwards to `tracing`; [`RecordingSink`] keeps
//! the events for assertions.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};
use vetprobe_common::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResolveEvent {
    ResolveAttempted { kind: EntityKind, key: String },
    EntityFound { kind: EntityKind, key: String },
    CreateStarted { kind: EntityKind, key: String },
    EntityCreated { kind: EntityKind, key: String, message: String },
    OutcomeAmbiguous { kind: EntityKind, key: String },
    CreationFailed { kind: EntityKind, key: String, message: String },
}

impl ResolveEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ResolveEvent::ResolveAttempted { .. } => "resolve_attempted",
            ResolveEvent::EntityFound { .. } => "entity_found",
            ResolveEvent::CreateStarted { .. } => "create_started",
            ResolveEvent::EntityCreated { .. } => "entity_created",
            ResolveEvent::OutcomeAmbiguous { .. } => "outcome_ambiguous",
            ResolveEvent::CreationFailed { .. } => "creation_failed",
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            ResolveEvent::ResolveAttempted { kind, .. }
            | ResolveEvent::EntityFound { kind, .. }
            | ResolveEvent::CreateStarted { kind, .. }
            | ResolveEvent::EntityCreated { kind, .. }
            | ResolveEvent::OutcomeAmbiguous { kind, .. }
            | ResolveEvent::CreationFailed { kind, .. } => *kind,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ResolveEvent::ResolveAttempted { key, .. }
            | ResolveEvent::EntityFound { key, .. }
            | ResolveEvent::CreateStarted { key, .. }
            | ResolveEvent::EntityCreated { key, .. }
            | ResolveEvent::OutcomeAmbiguous { key, .. }
            | ResolveEvent::CreationFailed { key, .. } => key,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ResolveEvent);
}

/// Forwards events to `tracing` with an `event` field
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ResolveEvent) {
        let kind = event.kind();
        let key = event.key();
        match event {
            ResolveEvent::EntityCreated { message, .. } => {
                info!(event = event.name(), %kind, key, message = %message, "record created")
            }
            ResolveEvent::CreationFailed { message, .. } => {
                warn!(event = event.name(), %kind, key, message = %message, "record creation failed")
            }
            ResolveEvent::OutcomeAmbiguous { .. } => {
                warn!(event = event.name(), %kind, key, "no toast after save")
            }
            _ => info!(event = event.name(), %kind, key),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ResolveEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ResolveEvent> {
        self.events.lock().clone()
    }

    /// Number of events with the given name
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &ResolveEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Sends each event to every inner sink
pub struct FanoutSink {
    sinks: Vec<std::sync::Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<std::sync::Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &ResolveEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
