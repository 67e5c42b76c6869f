//! Deferred replies
//!
//! Every assistant output is released after a simulated composing delay. The
//! orchestrator stores the pending output as a [`Continuation`] keyed by a
//! [`Ticket`]; the host sleeps for the delay and hands the ticket back. A
//! reset bumps the generation, so tickets issued before it are stale.

use std::time::Duration;

use diag_assist_config::TimingConfig;
use diag_assist_core::PresentationEvent;
use serde::{Deserialize, Serialize};

/// Identifies one deferred reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    /// Incremented by every reset
    pub generation: u64,
    /// Incremented by every scheduled reply
    pub sequence: u64,
}

/// What a deferred reply will emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    IntakeQuestions,
    TriagePrompt,
    GuidedEntry,
    NextStep,
    EscalationText,
    EscalationCard,
    Resolution,
    Summary,
    Redirect,
    RedirectResume,
    FreeTextReply,
    EscalationConfirmation,
}

impl ReplyKind {
    pub fn delay(&self, timing: &TimingConfig) -> Duration {
        let ms = match self {
            ReplyKind::IntakeQuestions => timing.intake_ms,
            ReplyKind::TriagePrompt => timing.triage_ms,
            ReplyKind::GuidedEntry => timing.guided_entry_ms,
            ReplyKind::NextStep => timing.next_step_ms,
            ReplyKind::EscalationText => timing.escalation_text_ms,
            ReplyKind::EscalationCard => timing.escalation_card_ms,
            ReplyKind::Resolution => timing.resolution_ms,
            ReplyKind::Summary => timing.summary_ms,
            ReplyKind::Redirect => timing.redirect_ms,
            ReplyKind::RedirectResume => timing.redirect_resume_ms,
            ReplyKind::FreeTextReply => timing.free_text_reply_ms,
            ReplyKind::EscalationConfirmation => timing.escalation_request_ms,
        };
        Duration::from_millis(ms)
    }

    /// Whether a typing indicator brackets the delay.
    /// Cards and summaries that follow a message appear without one.
    pub fn typing(&self) -> bool {
        !matches!(self, ReplyKind::EscalationCard | ReplyKind::Summary)
    }
}

/// Handle returned to the host for a pending reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledReply {
    pub ticket: Ticket,
    pub kind: ReplyKind,
    #[serde(with = "duration_ms")]
    pub delay: Duration,
    pub typing: bool,
}

/// Pending output plus an optional follow-up scheduled once it is released
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Continuation {
    pub kind: ReplyKind,
    pub events: Vec<PresentationEvent>,
    pub then: Option<Box<Continuation>>,
}

impl Continuation {
    pub fn new(kind: ReplyKind, events: Vec<PresentationEvent>) -> Self {
        Self {
            kind,
            events,
            then: None,
        }
    }

    pub fn then(mut self, next: Continuation) -> Self {
        self.then = Some(Box::new(next));
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delays() {
        let timing = TimingConfig::default();
        assert_eq!(ReplyKind::IntakeQuestions.delay(&timing), Duration::from_millis(800));
        assert_eq!(ReplyKind::EscalationCard.delay(&timing), Duration::from_millis(400));
        assert_eq!(ReplyKind::Summary.delay(&timing), Duration::from_millis(500));
        assert_eq!(
            ReplyKind::EscalationConfirmation.delay(&timing),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_typing_indicator_policy() {
        assert!(ReplyKind::Resolution.typing());
        assert!(ReplyKind::Redirect.typing());
        assert!(!ReplyKind::EscalationCard.typing());
        assert!(!ReplyKind::Summary.typing());
    }

    #[test]
    fn test_scheduled_reply_serializes_delay_in_ms() {
        let reply = ScheduledReply {
            ticket: Ticket {
                generation: 0,
                sequence: 3,
            },
            kind: ReplyKind::NextStep,
            delay: Duration::from_millis(1500),
            typing: true,
        };
        let json = serde_json::to_value(reply).unwrap();
        assert_eq!(json["delay"], 1500);
        assert_eq!(json["kind"], "next_step");
    }
}
