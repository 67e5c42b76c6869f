//! Prometheus metrics
//!
//! Counters recorded through the `metrics` facade and rendered by the
//! Prometheus exporter at `/metrics`.

use axum::{http::StatusCode, response::IntoResponse};
use diag_assist_agent::{FlowError, Outcome, ReplyKind, SessionSnapshot};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

pub const SESSIONS_CREATED: &str = "diag_sessions_created_total";
pub const SESSIONS_RESOLVED: &str = "diag_sessions_resolved_total";
pub const REDIRECTS: &str = "diag_redirects_total";
pub const ACTIONS: &str = "diag_actions_total";
pub const ACTIONS_REJECTED: &str = "diag_actions_rejected_total";

/// Install the global Prometheus recorder.
///
/// Safe to call more than once; later calls return the first handle.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if let Some(handle) = PROMETHEUS.get() {
        return Some(handle.clone());
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS.set(handle.clone());
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

pub fn record_session_created() {
    metrics::counter!(SESSIONS_CREATED).increment(1);
}

pub fn record_session_outcome(outcome: &Outcome) {
    metrics::counter!(SESSIONS_RESOLVED, "outcome" => outcome.label()).increment(1);
}

/// Record an accepted action by the reply it scheduled
pub fn record_action(kind: ReplyKind, snapshot: &SessionSnapshot) {
    metrics::counter!(ACTIONS, "reply" => reply_label(kind)).increment(1);

    match kind {
        ReplyKind::Redirect => {
            if let Some(redirect) = &snapshot.state.active_redirect {
                metrics::counter!(REDIRECTS, "redirect" => redirect.clone()).increment(1);
            }
        }
        ReplyKind::Resolution | ReplyKind::EscalationConfirmation => {
            if let Some(outcome) = &snapshot.state.final_outcome {
                record_session_outcome(outcome);
            }
        }
        _ => {}
    }
}

pub fn record_rejection(error: &FlowError) {
    metrics::counter!(ACTIONS_REJECTED, "reason" => error.reason()).increment(1);
}

fn reply_label(kind: ReplyKind) -> &'static str {
    match kind {
        ReplyKind::IntakeQuestions => "intake_questions",
        ReplyKind::TriagePrompt => "triage_prompt",
        ReplyKind::GuidedEntry => "guided_entry",
        ReplyKind::NextStep => "next_step",
        ReplyKind::EscalationText => "escalation_text",
        ReplyKind::EscalationCard => "escalation_card",
        ReplyKind::Resolution => "resolution",
        ReplyKind::Summary => "summary",
        ReplyKind::Redirect => "redirect",
        ReplyKind::RedirectResume => "redirect_resume",
        ReplyKind::FreeTextReply => "free_text_reply",
        ReplyKind::EscalationConfirmation => "escalation_confirmation",
    }
}
