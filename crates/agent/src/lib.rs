//! Conversation Flow Orchestrator
//!
//! Drives a guided diagnostic conversation from the start screen through
//! intake, triage and the step-by-step guided flow to a resolution or a
//! specialist hand-off.
//!
//! Features:
//! - Phase machine with explicit per-phase action acceptance
//! - Triage-driven step sequencing
//! - Redirects spliced into the guided flow from operator free text
//! - Deferred replies with cancellable composing delays
//! - Broadcast event stream for presentation layers

pub mod chat_session;
pub mod orchestrator;
pub mod redirect;
pub mod schedule;
pub mod sequencer;
pub mod state;
pub mod summary;

pub use chat_session::ChatSession;
pub use orchestrator::{SessionOrchestrator, SessionSnapshot};
pub use redirect::RedirectHandler;
pub use schedule::{ReplyKind, ScheduledReply, Ticket};
pub use sequencer::{Advance, StepSequencer, TriagePlan, TriageRoute};
pub use state::{Outcome, SessionState};
pub use summary::SessionSummary;

use diag_assist_core::{CoreError, OperatorAction, Phase, StartActionKind};
use thiserror::Error;

/// Rejections from operator actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Action '{action}' is not accepted in the {phase} phase")]
    InvalidAction {
        action: OperatorAction,
        phase: Phase,
    },

    #[error("The assistant is still composing a reply")]
    Composing,

    #[error("Start action '{0}' is not available yet")]
    UnsupportedStartAction(StartActionKind),

    #[error("Input is empty")]
    EmptyInput,

    #[error("Reply ticket is stale")]
    StaleTicket,

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl FlowError {
    /// Short machine-readable reason, used as a metric label
    pub fn reason(&self) -> &'static str {
        match self {
            FlowError::InvalidAction { .. } => "invalid_action",
            FlowError::Composing => "composing",
            FlowError::UnsupportedStartAction(_) => "unsupported_start_action",
            FlowError::EmptyInput => "empty_input",
            FlowError::StaleTicket => "stale_ticket",
            FlowError::Core(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowError::InvalidAction {
            action: OperatorAction::SubmitTriage,
            phase: Phase::Guided,
        };
        assert_eq!(
            err.to_string(),
            format!(
                "Action 'submit_triage' is not accepted in the {} phase",
                Phase::Guided
            )
        );
        assert_eq!(err.reason(), "invalid_action");
        assert_eq!(
            FlowError::from(CoreError::UnknownStep("x".to_string())).reason(),
            "internal"
        );
    }
}
