//! Chat Session
//!
//! Async driver around a [`SessionOrchestrator`]. Actions run synchronously
//! under a lock; the deferred reply they return is released by a spawned
//! task after its delay. Every event is published on a broadcast channel in
//! log order.
//!
//! ```text
//! action ──▶ orchestrator ──▶ ScheduledReply ──▶ driver task
//!                 │                                  │ sleep(delay)
//!                 ▼                                  ▼
//!            broadcast ◀──────────────────────── fire(ticket)
//! ```
//!
//! Action methods spawn the driver with [`tokio::spawn`] and must be called
//! from within a Tokio runtime.

use std::sync::Arc;

use diag_assist_config::{FlowConfig, TimingConfig};
use diag_assist_core::{ContentCatalog, PresentationEvent, StartActionKind};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::orchestrator::{SessionOrchestrator, SessionSnapshot};
use crate::schedule::ScheduledReply;
use crate::FlowError;

pub struct ChatSession {
    id: String,
    orchestrator: Arc<Mutex<SessionOrchestrator>>,
    event_tx: broadcast::Sender<PresentationEvent>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    pub fn new(
        id: impl Into<String>,
        catalog: Arc<ContentCatalog>,
        timing: TimingConfig,
        flow: FlowConfig,
    ) -> Self {
        let id = id.into();
        let (event_tx, _) = broadcast::channel(flow.event_buffer.max(1));
        let orchestrator = SessionOrchestrator::new(id.clone(), catalog, timing, flow);
        Self {
            id,
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            event_tx,
            driver: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PresentationEvent> {
        self.event_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.orchestrator.lock().snapshot()
    }

    /// Copy of the event log since the last reset
    pub fn events(&self) -> Vec<PresentationEvent> {
        self.orchestrator.lock().events().to_vec()
    }

    pub fn is_composing(&self) -> bool {
        self.orchestrator.lock().is_composing()
    }

    pub fn start_action(&self, kind: StartActionKind) -> Result<ScheduledReply, FlowError> {
        self.dispatch(|orch| orch.start_action(kind))
    }

    pub fn submit_free_text(&self, text: &str) -> Result<ScheduledReply, FlowError> {
        self.dispatch(|orch| orch.submit_free_text(text))
    }

    pub fn submit_triage<S: AsRef<str>>(&self, selected: &[S]) -> Result<ScheduledReply, FlowError> {
        self.dispatch(|orch| orch.submit_triage(selected))
    }

    pub fn answer_current_prompt(&self, positive: bool) -> Result<ScheduledReply, FlowError> {
        self.dispatch(|orch| orch.answer_current_prompt(positive))
    }

    pub fn request_escalation_assistance(&self) -> Result<ScheduledReply, FlowError> {
        self.dispatch(|orch| orch.request_escalation_assistance())
    }

    /// Cancel any pending reply and return to the start screen
    pub fn reset(&self) {
        let previous = self.driver.lock().take();
        if let Some(handle) = previous {
            handle.abort();
        }

        let mut orch = self.orchestrator.lock();
        orch.reset();
        publish(&self.event_tx, orch.take_unpublished());
    }

    fn dispatch<F>(&self, action: F) -> Result<ScheduledReply, FlowError>
    where
        F: FnOnce(&mut SessionOrchestrator) -> Result<ScheduledReply, FlowError>,
    {
        let reply = {
            let mut orch = self.orchestrator.lock();
            let reply = action(&mut *orch)?;
            publish(&self.event_tx, orch.take_unpublished());
            reply
        };
        self.drive(reply);
        Ok(reply)
    }

    fn drive(&self, reply: ScheduledReply) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let event_tx = self.event_tx.clone();
        let session_id = self.id.clone();

        let handle = tokio::spawn(async move {
            let mut next = Some(reply);
            while let Some(reply) = next.take() {
                tokio::time::sleep(reply.delay).await;

                let fired = {
                    let mut orch = orchestrator.lock();
                    let fired = orch.fire(reply.ticket);
                    publish(&event_tx, orch.take_unpublished());
                    fired
                };

                match fired {
                    Ok(chained) => next = chained,
                    Err(e) => {
                        tracing::debug!(
                            session_id = %session_id,
                            kind = ?reply.kind,
                            error = %e,
                            "Reply dropped"
                        );
                    }
                }
            }
        });

        let previous = self.driver.lock().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.get_mut().take() {
            handle.abort();
        }
    }
}

fn publish(event_tx: &broadcast::Sender<PresentationEvent>, events: Vec<PresentationEvent>) {
    for event in events {
        // No subscribers is fine; the log keeps everything
        let _ = event_tx.send(event);
    }
}
