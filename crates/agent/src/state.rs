//! Session state aggregate

use std::collections::BTreeSet;

use diag_assist_core::{CoreError, Phase};
use diag_assist_text_processing::ESCALATED_OUTCOME;
use serde::{Deserialize, Serialize};

/// How the session terminated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// A step or redirect fixed the problem
    Resolved { entry_id: String, text: String },
    /// Handed off to the specialist
    Escalated,
}

impl Outcome {
    pub fn text(&self) -> &str {
        match self {
            Outcome::Resolved { text, .. } => text,
            Outcome::Escalated => ESCALATED_OUTCOME,
        }
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Resolved { .. } => "resolved",
            Outcome::Escalated => "escalated",
        }
    }
}

/// All mutable per-session fields. Replaced wholesale on reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    /// Valid triage check ids, or only the none sentinel
    pub triage_selections: BTreeSet<String>,
    /// Step ids still to try, fixed when the guided flow starts
    pub remaining_step_order: Vec<String>,
    pub cursor: usize,
    /// Redirect id overriding the step at `cursor`
    pub active_redirect: Option<String>,
    /// Labels of every step shown, in order
    pub attempted_labels: Vec<String>,
    pub final_outcome: Option<Outcome>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `to`, rejecting transitions the phase map does not allow
    pub fn transition(&mut self, to: Phase) -> Result<(), CoreError> {
        if !self.phase.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!(from = %self.phase, to = %to, "Phase transition");
        self.phase = to;
        Ok(())
    }

    /// Step id at the cursor, if the cursor is in range
    pub fn current_step_id(&self) -> Option<&str> {
        self.remaining_step_order
            .get(self.cursor)
            .map(|s| s.as_str())
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.remaining_step_order.len()
    }

    /// Check the aggregate's structural invariants
    pub fn invariants_hold(&self) -> bool {
        let redirect_ok = self.active_redirect.is_none() || self.phase == Phase::Guided;
        let outcome_ok = self.final_outcome.is_none() || self.phase.is_terminal();
        let cursor_ok = self.cursor <= self.remaining_step_order.len();
        let guided_ok = self.phase != Phase::Guided || !self.is_exhausted();
        redirect_ok && outcome_ok && cursor_ok && guided_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = SessionState::new();
        assert_eq!(state.phase, Phase::Start);
        assert!(state.current_step_id().is_none());
        assert!(state.invariants_hold());
    }

    #[test]
    fn test_transition_guard() {
        let mut state = SessionState::new();
        assert!(state.transition(Phase::Intake).is_ok());
        assert_eq!(
            state.transition(Phase::Resolved),
            Err(CoreError::InvalidTransition {
                from: Phase::Intake,
                to: Phase::Resolved
            })
        );
        assert_eq!(state.phase, Phase::Intake);
    }

    #[test]
    fn test_invariants_detect_stray_redirect() {
        let mut state = SessionState::new();
        state.active_redirect = Some("radiatorDamage".to_string());
        assert!(!state.invariants_hold());
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(Outcome::Escalated.text(), "Escalated to specialist");
        let resolved = Outcome::Resolved {
            entry_id: "oilLevel".to_string(),
            text: "Topped off oil.".to_string(),
        };
        assert_eq!(resolved.text(), "Topped off oil.");
        assert_eq!(resolved.label(), "resolved");
    }
}
