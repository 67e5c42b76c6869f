//! Presentation events
//!
//! The orchestrator never formats markup. It appends these events to an
//! ordered log and the host decides how to render them.

use serde::{Deserialize, Serialize};

use crate::catalog::{DiagnosticEntry, Expert, TriageCheck};

/// Checklist row shown in the triage prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageChecklistItem {
    pub id: String,
    pub label: String,
}

impl From<&TriageCheck> for TriageChecklistItem {
    fn from(check: &TriageCheck) -> Self {
        Self {
            id: check.id.clone(),
            label: check.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PresentationEvent {
    IntakeQuestions {
        questions: Vec<String>,
    },
    TriagePrompt {
        message: String,
        prompt: String,
        checks: Vec<TriageChecklistItem>,
        none_label: String,
    },
    /// Text attributed to the operator
    UserUtterance {
        text: String,
    },
    /// Assistant prose
    AnalysisText {
        text: String,
    },
    ActionCard {
        label: String,
        recommendation: String,
        sources: Vec<String>,
    },
    ResolutionPrompt {
        yes_label: String,
        no_label: String,
    },
    TypingIndicator {
        active: bool,
    },
    EscalationCard {
        expert: Expert,
    },
    SessionSummary {
        attempted_labels: Vec<String>,
        /// Labels joined with " → "
        trail: String,
        outcome_text: String,
    },
    /// Subscribers should clear their transcript
    SessionReset,
}

impl PresentationEvent {
    pub fn analysis(text: impl Into<String>) -> Self {
        PresentationEvent::AnalysisText { text: text.into() }
    }

    pub fn utterance(text: impl Into<String>) -> Self {
        PresentationEvent::UserUtterance { text: text.into() }
    }

    pub fn typing(active: bool) -> Self {
        PresentationEvent::TypingIndicator { active }
    }

    /// Action card for a step or redirect
    pub fn action_card(entry: &dyn DiagnosticEntry) -> Self {
        PresentationEvent::ActionCard {
            label: entry.label().to_string(),
            recommendation: entry.recommendation().to_string(),
            sources: entry.sources().to_vec(),
        }
    }

    /// Yes/no prompt for a step or redirect
    pub fn resolution_prompt(entry: &dyn DiagnosticEntry) -> Self {
        PresentationEvent::ResolutionPrompt {
            yes_label: entry.yes_label().to_string(),
            no_label: entry.no_label().to_string(),
        }
    }

    /// Event type tag as serialized
    pub fn kind(&self) -> &'static str {
        match self {
            PresentationEvent::IntakeQuestions { .. } => "intake-questions",
            PresentationEvent::TriagePrompt { .. } => "triage-prompt",
            PresentationEvent::UserUtterance { .. } => "user-utterance",
            PresentationEvent::AnalysisText { .. } => "analysis-text",
            PresentationEvent::ActionCard { .. } => "action-card",
            PresentationEvent::ResolutionPrompt { .. } => "resolution-prompt",
            PresentationEvent::TypingIndicator { .. } => "typing-indicator",
            PresentationEvent::EscalationCard { .. } => "escalation-card",
            PresentationEvent::SessionSummary { .. } => "session-summary",
            PresentationEvent::SessionReset => "session-reset",
        }
    }
}
