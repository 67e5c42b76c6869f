//! Session phases and operator actions

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Top-level stage of a diagnostic session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the operator to pick a starting action
    #[default]
    Start,
    /// Intake questions shown, waiting for the operator's description
    Intake,
    /// Triage checklist shown, waiting for the operator's selection
    Triage,
    /// Stepping through candidate causes
    Guided,
    /// All causes exhausted, specialist handoff offered
    Escalated,
    /// Session closed out (resolution or specialist request)
    Resolved,
}

/// Static transition map. Reset is handled separately and is valid from every phase.
static PHASE_TRANSITIONS: Lazy<HashMap<Phase, &'static [Phase]>> = Lazy::new(|| {
    use Phase::*;
    let mut map = HashMap::new();
    map.insert(Start, &[Intake] as &[_]);
    map.insert(Intake, &[Triage] as &[_]);
    map.insert(Triage, &[Guided, Escalated] as &[_]);
    map.insert(Guided, &[Escalated, Resolved] as &[_]);
    map.insert(Escalated, &[Resolved] as &[_]);
    map.insert(Resolved, &[] as &[_]);
    map
});

impl Phase {
    /// Get stage display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Start => "Start",
            Phase::Intake => "Intake",
            Phase::Triage => "Triage",
            Phase::Guided => "Guided",
            Phase::Escalated => "Escalated",
            Phase::Resolved => "Resolved",
        }
    }

    /// Phases reachable from this one without a reset
    pub fn allowed_transitions(&self) -> &'static [Phase] {
        PHASE_TRANSITIONS.get(self).copied().unwrap_or(&[])
    }

    /// Check if transition to target phase is allowed
    pub fn can_transition_to(&self, target: Phase) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Whether the session has reached a terminal outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Escalated | Phase::Resolved)
    }

    /// Whether this phase accepts the given operator action
    pub fn accepts(&self, action: OperatorAction) -> bool {
        use OperatorAction::*;
        match action {
            Reset => true,
            StartAction => matches!(self, Phase::Start),
            SubmitFreeText => !matches!(self, Phase::Start),
            SubmitTriage => matches!(self, Phase::Triage),
            AnswerPrompt => matches!(self, Phase::Guided),
            RequestEscalation => matches!(self, Phase::Escalated),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Operator actions exposed by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorAction {
    StartAction,
    SubmitFreeText,
    SubmitTriage,
    AnswerPrompt,
    RequestEscalation,
    Reset,
}

impl OperatorAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorAction::StartAction => "start_action",
            OperatorAction::SubmitFreeText => "submit_free_text",
            OperatorAction::SubmitTriage => "submit_triage",
            OperatorAction::AnswerPrompt => "answer_prompt",
            OperatorAction::RequestEscalation => "request_escalation",
            OperatorAction::Reset => "reset",
        }
    }
}

impl std::fmt::Display for OperatorAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Starting actions offered on the start screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartActionKind {
    /// Guided troubleshooting flow
    Troubleshoot,
    /// Ask the operator's manual
    Manual,
    /// Work history summary
    History,
}

impl StartActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartActionKind::Troubleshoot => "troubleshoot",
            StartActionKind::Manual => "manual",
            StartActionKind::History => "history",
        }
    }
}

impl FromStr for StartActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "troubleshoot" => Ok(StartActionKind::Troubleshoot),
            "manual" => Ok(StartActionKind::Manual),
            "history" => Ok(StartActionKind::History),
            other => Err(format!("unknown start action: {}", other)),
        }
    }
}

impl std::fmt::Display for StartActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
