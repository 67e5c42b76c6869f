//! Core types for the diagnostic assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Content catalog (diagnostic steps, redirects, triage checks, escalation)
//! - Session phases and the actions each phase accepts
//! - Presentation events emitted by the orchestrator
//! - Error types

pub mod catalog;
pub mod error;
pub mod event;
pub mod phase;

pub use catalog::{
    AssetInfo, Component, ContentCatalog, DiagnosticEntry, DiagnosticStep, EscalationContent,
    Expert, IntakeContent, PriorWorkOrder, RedirectDefinition, ReferenceFile, ReferenceSection,
    ReferenceSources, TriageCheck, TriageContent, TriggerPattern, WorkOrderInfo,
    WorkOrderSummary, NONE_SELECTION,
};
pub use error::{CoreError, Result};
pub use event::{PresentationEvent, TriageChecklistItem};
pub use phase::{OperatorAction, Phase, StartActionKind};
