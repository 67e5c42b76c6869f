//! Session summary record

use diag_assist_core::PresentationEvent;
use diag_assist_text_processing::summary_trail;
use serde::{Deserialize, Serialize};

use crate::state::SessionState;

/// Closing record of a resolved session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub attempted_labels: Vec<String>,
    pub trail: String,
    pub outcome_text: String,
}

impl SessionSummary {
    /// Build from a terminated session. None until an outcome is recorded.
    pub fn from_state(state: &SessionState) -> Option<Self> {
        let outcome = state.final_outcome.as_ref()?;
        Some(Self {
            attempted_labels: state.attempted_labels.clone(),
            trail: summary_trail(&state.attempted_labels),
            outcome_text: outcome.text().to_string(),
        })
    }
}

impl From<SessionSummary> for PresentationEvent {
    fn from(summary: SessionSummary) -> Self {
        PresentationEvent::SessionSummary {
            attempted_labels: summary.attempted_labels,
            trail: summary.trail,
            outcome_text: summary.outcome_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Outcome;
    use diag_assist_core::Phase;

    #[test]
    fn test_summary_requires_outcome() {
        let state = SessionState::new();
        assert!(SessionSummary::from_state(&state).is_none());
    }

    #[test]
    fn test_summary_from_escalation() {
        let state = SessionState {
            phase: Phase::Resolved,
            attempted_labels: vec!["Coolant level & hoses".to_string(), "Engine oil level".to_string()],
            final_outcome: Some(Outcome::Escalated),
            ..SessionState::default()
        };
        let summary = SessionSummary::from_state(&state).unwrap();
        assert_eq!(summary.trail, "Coolant level & hoses → Engine oil level");
        assert_eq!(summary.outcome_text, "Escalated to specialist");

        let event: PresentationEvent = summary.into();
        assert_eq!(event.kind(), "session-summary");
    }
}
