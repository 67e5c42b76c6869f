//! HTTP Endpoints
//!
//! REST API and event stream for diagnostic sessions.

use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use diag_assist_agent::{FlowError, ScheduledReply, SessionSnapshot};
use diag_assist_core::{PresentationEvent, StartActionKind};

use crate::metrics::{metrics_handler, record_action, record_rejection, record_session_created};
use crate::session::{Session, SessionManager};
use crate::state::AppState;
use crate::ServerError;

const FALLBACK_ORIGIN: &str = "http://localhost:3000";
const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // Operator actions
        .route("/api/sessions/:id/start", post(start_action))
        .route("/api/sessions/:id/message", post(submit_message))
        .route("/api/sessions/:id/triage", post(submit_triage))
        .route("/api/sessions/:id/answer", post(answer_prompt))
        .route("/api/sessions/:id/escalation", post(request_escalation))
        .route("/api/sessions/:id/reset", post(reset_session))
        // Presentation event stream
        .route("/api/sessions/:id/events", get(session_events))
        // Scenario content
        .route("/api/catalog", get(catalog_info))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - Disabled: permissive (development only)
/// - No valid origins: localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "Invalid CORS origin");
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!(origin = FALLBACK_ORIGIN, "No usable CORS origins, using fallback");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static(FALLBACK_ORIGIN))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!(count = parsed_origins.len(), "CORS configured");
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

// -------------------------------------------------------------------------
// Sessions
// -------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
    snapshot: SessionSnapshot,
}

async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), ServerError> {
    let session = state.sessions.create()?;
    record_session_created();
    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id.clone(),
            snapshot: session.chat.snapshot(),
        }),
    ))
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

#[derive(Debug, Serialize)]
struct SessionDetail {
    snapshot: SessionSnapshot,
    events: Vec<PresentationEvent>,
    created_at: chrono::DateTime<chrono::Utc>,
    idle_secs: u64,
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, ServerError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or(ServerError::SessionNotFound(id))?;

    Ok(Json(SessionDetail {
        snapshot: session.chat.snapshot(),
        events: session.chat.events(),
        created_at: session.created_at,
        idle_secs: session.idle_for().as_secs(),
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::SessionNotFound(id))
    }
}

// -------------------------------------------------------------------------
// Operator actions
// -------------------------------------------------------------------------

/// Reply scheduled by an accepted action
#[derive(Debug, Serialize)]
struct ActionResponse {
    reply: ScheduledReply,
    snapshot: SessionSnapshot,
}

fn respond(
    session: &Session,
    result: Result<ScheduledReply, FlowError>,
) -> Result<Json<ActionResponse>, ServerError> {
    match result {
        Ok(reply) => {
            let snapshot = session.chat.snapshot();
            record_action(reply.kind, &snapshot);
            tracing::debug!(
                session_id = %session.id,
                phase = %snapshot.state.phase,
                kind = ?reply.kind,
                delay_ms = reply.delay.as_millis() as u64,
                "Action accepted"
            );
            Ok(Json(ActionResponse { reply, snapshot }))
        }
        Err(e) => {
            record_rejection(&e);
            tracing::debug!(session_id = %session.id, error = %e, "Action rejected");
            Err(e.into())
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartRequest {
    action: String,
}

async fn start_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StartRequest>,
) -> Result<Json<ActionResponse>, ServerError> {
    let session = state.sessions.touch(&id)?;
    let kind = StartActionKind::from_str(&request.action).map_err(ServerError::InvalidRequest)?;
    respond(&session, session.chat.start_action(kind))
}

#[derive(Debug, Deserialize)]
struct MessageRequest {
    #[serde(default)]
    text: String,
}

async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<ActionResponse>, ServerError> {
    let session = state.sessions.touch(&id)?;
    respond(&session, session.chat.submit_free_text(&request.text))
}

#[derive(Debug, Deserialize)]
struct TriageRequest {
    #[serde(default)]
    selected: Vec<String>,
}

async fn submit_triage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TriageRequest>,
) -> Result<Json<ActionResponse>, ServerError> {
    let session = state.sessions.touch(&id)?;
    respond(&session, session.chat.submit_triage(&request.selected))
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    positive: bool,
}

async fn answer_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<ActionResponse>, ServerError> {
    let session = state.sessions.touch(&id)?;
    respond(&session, session.chat.answer_current_prompt(request.positive))
}

async fn request_escalation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ServerError> {
    let session = state.sessions.touch(&id)?;
    respond(&session, session.chat.request_escalation_assistance())
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ServerError> {
    let session = state.sessions.touch(&id)?;
    session.chat.reset();
    Ok(Json(session.chat.snapshot()))
}

// -------------------------------------------------------------------------
// Event stream
// -------------------------------------------------------------------------

/// SSE stream of presentation events, named by event type
async fn session_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ServerError::SessionNotFound(id.clone()))?;
    let rx = session.chat.subscribe();
    drop(session);

    let stream = event_stream(Arc::clone(&state.sessions), id, rx, SSE_KEEP_ALIVE);

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE).text("ping")))
}

/// Forward session events as SSE frames.
///
/// An open stream counts as activity: the session is touched every
/// `heartbeat`, and the stream ends once the session is gone.
fn event_stream(
    sessions: Arc<SessionManager>,
    id: String,
    mut rx: broadcast::Receiver<PresentationEvent>,
    heartbeat: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut ticker = tokio::time::interval(heartbeat);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let received = tokio::select! {
                received = rx.recv() => received,
                _ = ticker.tick() => {
                    if sessions.touch(&id).is_err() {
                        tracing::debug!(session_id = %id, "Session gone, closing event stream");
                        break;
                    }
                    continue;
                }
            };

            match received {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        yield Ok(Event::default().event(event.kind()).data(json));
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::debug!(session_id = %id, skipped = n, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

// -------------------------------------------------------------------------
// Catalog and health
// -------------------------------------------------------------------------

async fn catalog_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let catalog = &state.catalog;
    Json(serde_json::json!({
        "asset": catalog.asset,
        "work_order": catalog.work_order,
        "intake_questions": catalog.intake.questions,
        "triage_checks": catalog.triage.checks,
        "steps": catalog.steps.iter().map(|s| serde_json::json!({
            "id": s.id,
            "label": s.label,
            "deep": s.deep,
        })).collect::<Vec<_>>(),
        "escalation_expert": catalog.escalation.expert,
        "sources": catalog.sources,
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.count(),
        "catalog": {
            "asset": state.catalog.asset.name,
            "steps": state.catalog.steps.len(),
            "redirects": state.catalog.redirects.len(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use diag_assist_config::{load_catalog, Settings};
    use tower::ServiceExt;

    fn app_state() -> AppState {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/catalogs/rtv_xg850_overheating.yaml"
        );
        AppState::new(Settings::default(), load_catalog(path).unwrap())
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    /// Let the session's driver release the pending replies
    async fn settle() {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    #[test]
    fn test_router_creation() {
        let _ = create_router(app_state());
    }

    #[tokio::test]
    async fn test_health_and_catalog() {
        let app = create_router(app_state());
        let (status, json) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["catalog"]["steps"], 6);

        let (status, json) = call(&app, "GET", "/api/catalog", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["triage_checks"].as_array().map(|a| a.len()), Some(3));
        assert_eq!(json["escalation_expert"]["name"], "Jake Torres");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let app = create_router(app_state());
        let (status, json) = call(
            &app,
            "POST",
            "/api/sessions/missing/answer",
            Some(serde_json::json!({ "positive": true })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["reason"], "session_not_found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_walkthrough() {
        let app = create_router(app_state());

        let (status, json) = call(&app, "POST", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json["session_id"].as_str().unwrap().to_string();
        let base = format!("/api/sessions/{}", id);

        // Triage is not available on the start screen
        let (status, json) = call(
            &app,
            "POST",
            &format!("{}/triage", base),
            Some(serde_json::json!({ "selected": ["oilLevel"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["reason"], "invalid_action");

        let (status, json) = call(
            &app,
            "POST",
            &format!("{}/start", base),
            Some(serde_json::json!({ "action": "troubleshoot" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["reply"]["kind"], "intake_questions");
        assert_eq!(json["snapshot"]["phase"], "intake");
        settle().await;

        let (status, _) = call(
            &app,
            "POST",
            &format!("{}/message", base),
            Some(serde_json::json!({ "text": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        settle().await;

        let (status, json) = call(
            &app,
            "POST",
            &format!("{}/triage", base),
            Some(serde_json::json!({ "selected": ["oilLevel"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["snapshot"]["current_entry"], "coolantLevel");

        // Still composing the guided entry
        let (status, json) = call(
            &app,
            "POST",
            &format!("{}/answer", base),
            Some(serde_json::json!({ "positive": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["reason"], "composing");
        settle().await;

        let (status, _) = call(
            &app,
            "POST",
            &format!("{}/message", base),
            Some(serde_json::json!({ "text": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, json) = call(
            &app,
            "POST",
            &format!("{}/answer", base),
            Some(serde_json::json!({ "positive": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["snapshot"]["phase"], "resolved");
        settle().await;

        let (status, json) = call(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::OK);
        let events = json["events"].as_array().unwrap();
        assert_eq!(events.last().unwrap()["type"], "session-summary");

        let (status, json) = call(&app, "POST", &format!("{}/reset", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["phase"], "start");

        let (status, _) = call(&app, "DELETE", &base, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_event_stream_keeps_session_alive() {
        use diag_assist_config::{FlowConfig, TimingConfig};
        use futures::StreamExt;

        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/catalogs/rtv_xg850_overheating.yaml"
        );
        let sessions = Arc::new(
            SessionManager::new(
                Arc::new(load_catalog(path).unwrap()),
                TimingConfig::immediate(),
                FlowConfig::default(),
                4,
            )
            .with_expiry(Duration::from_millis(100), Duration::from_secs(60)),
        );
        let session = sessions.create().unwrap();
        let id = session.id.clone();
        let rx = session.chat.subscribe();
        drop(session);

        let stream = event_stream(
            Arc::clone(&sessions),
            id.clone(),
            rx,
            Duration::from_millis(20),
        );
        let reader = tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            while stream.next().await.is_some() {}
        });

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(sessions.cleanup_expired(), 0);
        assert!(sessions.get(&id).is_some());

        // Removing the session ends the stream
        assert!(sessions.remove(&id));
        tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
    }
}
