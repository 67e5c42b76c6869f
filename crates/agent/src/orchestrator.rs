//! Session Orchestrator
//!
//! Synchronous state machine driving one diagnostic conversation. Every
//! operator action validates the phase, mutates [`SessionState`] and queues
//! the assistant's answer as a deferred reply. The host waits for the
//! returned delay and calls [`SessionOrchestrator::fire`] with the ticket.
//!
//! Only one reply is ever pending. While it is, every action except
//! [`SessionOrchestrator::reset`] is rejected with [`FlowError::Composing`].

use std::sync::Arc;

use diag_assist_config::{FlowConfig, TimingConfig};
use diag_assist_core::{
    ContentCatalog, DiagnosticEntry, OperatorAction, Phase, PresentationEvent, StartActionKind,
    TriageChecklistItem,
};
use diag_assist_text_processing::{compose_reply, phrasing, Classification};
use serde::Serialize;

use crate::redirect::RedirectHandler;
use crate::schedule::{Continuation, ReplyKind, ScheduledReply, Ticket};
use crate::sequencer::{Advance, StepSequencer, TriageRoute};
use crate::state::{Outcome, SessionState};
use crate::summary::SessionSummary;
use crate::FlowError;

/// Read-only view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub generation: u64,
    /// A reply is being composed
    pub composing: bool,
    #[serde(flatten)]
    pub state: SessionState,
    /// Id of the step or redirect on screen
    pub current_entry: Option<String>,
    pub event_count: usize,
}

pub struct SessionOrchestrator {
    session_id: String,
    catalog: Arc<ContentCatalog>,
    timing: TimingConfig,
    flow: FlowConfig,
    state: SessionState,
    generation: u64,
    sequence: u64,
    pending: Option<(Ticket, Continuation)>,
    events: Vec<PresentationEvent>,
    published: usize,
}

impl SessionOrchestrator {
    pub fn new(
        session_id: impl Into<String>,
        catalog: Arc<ContentCatalog>,
        timing: TimingConfig,
        flow: FlowConfig,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            catalog,
            timing,
            flow,
            state: SessionState::new(),
            generation: 0,
            sequence: 0,
            pending: None,
            events: Vec::new(),
            published: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    pub fn is_composing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Full event log since the last reset
    pub fn events(&self) -> &[PresentationEvent] {
        &self.events
    }

    /// Events appended since the previous call
    pub fn take_unpublished(&mut self) -> Vec<PresentationEvent> {
        let fresh = self.events[self.published..].to_vec();
        self.published = self.events.len();
        fresh
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            generation: self.generation,
            composing: self.is_composing(),
            state: self.state.clone(),
            current_entry: self.current_entry().map(|e| e.id().to_string()),
            event_count: self.events.len(),
        }
    }

    /// Step or redirect currently shown. None outside the guided phase.
    pub fn current_entry(&self) -> Option<&dyn DiagnosticEntry> {
        if self.state.phase != Phase::Guided {
            return None;
        }
        if let Some(redirect) = RedirectHandler::new(&self.catalog).active(&self.state) {
            return Some(redirect);
        }
        self.state
            .current_step_id()
            .and_then(|id| self.catalog.step(id))
            .map(|step| step as &dyn DiagnosticEntry)
    }

    // ---------------------------------------------------------------------
    // Operator actions
    // ---------------------------------------------------------------------

    /// Pick a starting action on the start screen
    pub fn start_action(&mut self, kind: StartActionKind) -> Result<ScheduledReply, FlowError> {
        self.guard(OperatorAction::StartAction)?;
        if kind != StartActionKind::Troubleshoot {
            return Err(FlowError::UnsupportedStartAction(kind));
        }

        self.state.transition(Phase::Intake)?;
        tracing::info!(session_id = %self.session_id, "Troubleshooting started");

        let questions = self.catalog.intake.questions.clone();
        Ok(self.schedule(Continuation::new(
            ReplyKind::IntakeQuestions,
            vec![PresentationEvent::IntakeQuestions { questions }],
        )))
    }

    /// Submit operator free text
    pub fn submit_free_text(&mut self, text: &str) -> Result<ScheduledReply, FlowError> {
        self.guard(OperatorAction::SubmitFreeText)?;
        let text = text.trim();

        if self.state.phase == Phase::Intake {
            return self.complete_intake(text);
        }
        if text.is_empty() {
            return Err(FlowError::EmptyInput);
        }

        self.events.push(PresentationEvent::utterance(text));

        let catalog = Arc::clone(&self.catalog);
        let handler = RedirectHandler::new(&catalog);
        match handler.classify(&self.state, text) {
            Classification::Redirect(redirect_id) => {
                let redirect = handler.activate(&mut self.state, &redirect_id)?;
                Ok(self.schedule(Continuation::new(
                    ReplyKind::Redirect,
                    Self::present(redirect, redirect.analysis()),
                )))
            }
            Classification::Intent(category) => {
                let reply = compose_reply(category, self.current_entry());
                tracing::debug!(
                    session_id = %self.session_id,
                    phase = %self.state.phase,
                    intent = %category,
                    "Free text reply"
                );
                Ok(self.schedule(Continuation::new(
                    ReplyKind::FreeTextReply,
                    vec![PresentationEvent::analysis(reply)],
                )))
            }
        }
    }

    /// Submit the triage checklist
    pub fn submit_triage<S: AsRef<str>>(
        &mut self,
        selected: &[S],
    ) -> Result<ScheduledReply, FlowError> {
        self.guard(OperatorAction::SubmitTriage)?;

        let catalog = Arc::clone(&self.catalog);
        let plan = StepSequencer::new(&catalog, &self.flow).plan(selected)?;

        self.state.triage_selections = plan.selections;
        self.events.push(PresentationEvent::utterance(plan.utterance));

        match plan.route {
            TriageRoute::Escalate => {
                tracing::info!(
                    session_id = %self.session_id,
                    ruled_out = plan.effective.len(),
                    "Nothing left to try after triage, escalating"
                );
                self.state.transition(Phase::Escalated)?;
                Ok(self.schedule_escalation())
            }
            TriageRoute::Guided { acknowledgment } => {
                self.state.transition(Phase::Guided)?;
                self.state.remaining_step_order = plan.remaining;
                self.state.cursor = 0;

                let opening = catalog.require_step(&self.state.remaining_step_order[0])?;
                self.state.attempted_labels.push(opening.label.clone());
                tracing::info!(
                    session_id = %self.session_id,
                    step_id = %opening.id,
                    remaining = self.state.remaining_step_order.len(),
                    "Guided flow started"
                );

                Ok(self.schedule(Continuation::new(
                    ReplyKind::GuidedEntry,
                    Self::present(opening, &acknowledgment),
                )))
            }
        }
    }

    /// Answer the yes/no prompt for the entry on screen
    pub fn answer_current_prompt(&mut self, positive: bool) -> Result<ScheduledReply, FlowError> {
        self.guard(OperatorAction::AnswerPrompt)?;

        let catalog = Arc::clone(&self.catalog);
        let handler = RedirectHandler::new(&catalog);
        let step_id = self
            .state
            .current_step_id()
            .map(str::to_string)
            .ok_or_else(|| FlowError::InvalidAction {
                action: OperatorAction::AnswerPrompt,
                phase: self.state.phase,
            })?;
        let step = catalog.require_step(&step_id)?;

        let entry: &dyn DiagnosticEntry = match handler.active(&self.state) {
            Some(redirect) => redirect,
            None => step,
        };
        let label = if positive {
            entry.yes_label()
        } else {
            entry.no_label()
        };
        self.events.push(PresentationEvent::utterance(label));

        if positive {
            let outcome = Outcome::Resolved {
                entry_id: entry.id().to_string(),
                text: entry.resolution().to_string(),
            };
            tracing::info!(
                session_id = %self.session_id,
                entry_id = %entry.id(),
                redirect = self.state.active_redirect.is_some(),
                "Session resolved"
            );
            self.state.active_redirect = None;
            self.state.transition(Phase::Resolved)?;
            self.state.final_outcome = Some(outcome);
            return Ok(self.schedule_resolution(entry.resolution().to_string()));
        }

        if handler.dismiss(&mut self.state).is_some() {
            let mut events = vec![PresentationEvent::analysis(phrasing::rule_out_transition(
                &step.label,
            ))];
            events.extend(Self::present(step, &step.analysis));
            return Ok(self.schedule(Continuation::new(ReplyKind::RedirectResume, events)));
        }

        match StepSequencer::new(&catalog, &self.flow).advance(&self.state) {
            Advance::Next { cursor, step_id } => {
                let next = catalog.require_step(&step_id)?;
                self.state.cursor = cursor;
                self.state.attempted_labels.push(next.label.clone());
                tracing::info!(
                    session_id = %self.session_id,
                    step_id = %next.id,
                    cursor,
                    "Advanced to next step"
                );
                Ok(self.schedule(Continuation::new(
                    ReplyKind::NextStep,
                    Self::present(next, &next.analysis),
                )))
            }
            Advance::Exhausted => {
                self.state.cursor = self.state.remaining_step_order.len();
                self.state.transition(Phase::Escalated)?;
                tracing::info!(
                    session_id = %self.session_id,
                    attempted = self.state.attempted_labels.len(),
                    "All steps exhausted, escalating"
                );
                Ok(self.schedule_escalation())
            }
        }
    }

    /// Request the specialist offered on the escalation card
    pub fn request_escalation_assistance(&mut self) -> Result<ScheduledReply, FlowError> {
        self.guard(OperatorAction::RequestEscalation)?;

        self.state.transition(Phase::Resolved)?;
        self.state.final_outcome = Some(Outcome::Escalated);

        let expert = &self.catalog.escalation.expert;
        tracing::info!(
            session_id = %self.session_id,
            expert = %expert.name,
            "Specialist requested"
        );
        let confirmation = phrasing::escalation_confirmation(&expert.name);
        let summary = self.summary_continuation();
        Ok(self.schedule(
            Continuation::new(
                ReplyKind::EscalationConfirmation,
                vec![PresentationEvent::analysis(confirmation)],
            )
            .then(summary),
        ))
    }

    /// Drop everything and return to the start screen.
    ///
    /// Any pending reply is discarded and its ticket becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.state = SessionState::new();
        self.events.clear();
        self.published = 0;
        self.events.push(PresentationEvent::SessionReset);
        tracing::info!(
            session_id = %self.session_id,
            generation = self.generation,
            "Session reset"
        );
    }

    /// Release the pending reply identified by `ticket`.
    ///
    /// Returns the follow-up reply when the released one chains another.
    pub fn fire(&mut self, ticket: Ticket) -> Result<Option<ScheduledReply>, FlowError> {
        let matches = ticket.generation == self.generation
            && self.pending.as_ref().map(|(t, _)| *t) == Some(ticket);
        if !matches {
            tracing::debug!(
                session_id = %self.session_id,
                generation = ticket.generation,
                sequence = ticket.sequence,
                "Ignoring stale ticket"
            );
            return Err(FlowError::StaleTicket);
        }

        let (_, continuation) = match self.pending.take() {
            Some(pending) => pending,
            None => return Err(FlowError::StaleTicket),
        };

        if continuation.kind.typing() {
            self.events.push(PresentationEvent::typing(false));
        }
        self.events.extend(continuation.events);

        Ok(continuation.then.map(|next| self.schedule(*next)))
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn guard(&self, action: OperatorAction) -> Result<(), FlowError> {
        if self.is_composing() {
            return Err(FlowError::Composing);
        }
        if !self.state.phase.accepts(action) {
            tracing::debug!(
                session_id = %self.session_id,
                phase = %self.state.phase,
                action = %action,
                "Rejected action"
            );
            return Err(FlowError::InvalidAction {
                action,
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn complete_intake(&mut self, text: &str) -> Result<ScheduledReply, FlowError> {
        let utterance = if text.is_empty() {
            self.catalog.intake.default_response.clone()
        } else {
            text.to_string()
        };
        self.events.push(PresentationEvent::utterance(utterance));
        self.state.transition(Phase::Triage)?;

        let triage = &self.catalog.triage;
        let prompt = PresentationEvent::TriagePrompt {
            message: triage.message.clone(),
            prompt: triage.prompt.clone(),
            checks: triage.checks.iter().map(TriageChecklistItem::from).collect(),
            none_label: triage.none_label.clone(),
        };
        Ok(self.schedule(Continuation::new(ReplyKind::TriagePrompt, vec![prompt])))
    }

    /// Analysis text, action card and yes/no prompt for an entry
    fn present(entry: &dyn DiagnosticEntry, analysis: &str) -> Vec<PresentationEvent> {
        vec![
            PresentationEvent::analysis(analysis),
            PresentationEvent::action_card(entry),
            PresentationEvent::resolution_prompt(entry),
        ]
    }

    fn schedule_escalation(&mut self) -> ScheduledReply {
        let escalation = &self.catalog.escalation;
        let continuation = Continuation::new(
            ReplyKind::EscalationText,
            vec![PresentationEvent::analysis(escalation.text.clone())],
        )
        .then(Continuation::new(
            ReplyKind::EscalationCard,
            vec![PresentationEvent::EscalationCard {
                expert: escalation.expert.clone(),
            }],
        ));
        self.schedule(continuation)
    }

    fn schedule_resolution(&mut self, resolution: String) -> ScheduledReply {
        let summary = self.summary_continuation();
        self.schedule(
            Continuation::new(
                ReplyKind::Resolution,
                vec![PresentationEvent::analysis(resolution)],
            )
            .then(summary),
        )
    }

    fn summary_continuation(&self) -> Continuation {
        let events = SessionSummary::from_state(&self.state)
            .map(|summary| vec![summary.into()])
            .unwrap_or_default();
        Continuation::new(ReplyKind::Summary, events)
    }

    fn schedule(&mut self, continuation: Continuation) -> ScheduledReply {
        self.sequence += 1;
        let ticket = Ticket {
            generation: self.generation,
            sequence: self.sequence,
        };
        let kind = continuation.kind;
        let typing = kind.typing();
        if typing {
            self.events.push(PresentationEvent::typing(true));
        }
        self.pending = Some((ticket, continuation));

        debug_assert!(self.state.invariants_hold());
        ScheduledReply {
            ticket,
            kind,
            delay: kind.delay(&self.timing),
            typing,
        }
    }
}
