use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use fleet_core::EventEnvelope;
use tokio::sync::broadcast;
use tower_http::cors::{Any, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::{AppState, CommandRequest};

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Router {
    let origin = match cors_origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(err) => {
            tracing::warn!("invalid CORS origin '{cors_origin}': {err}; allowing any origin");
            AllowOrigin::any()
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/command", post(command_handler))
        .route("/api/v1/pause", post(pause_handler))
        .route("/api/v1/resume", post(resume_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let meta = &sim.fleet.meta;
    Json(serde_json::json!({
        "tick": meta.tick,
        "time": meta.time,
        "seed": meta.seed,
        "content_version": meta.content_version,
        "ticks_per_sec": app_state.ticks_per_sec,
        "paused": app_state.paused.load(Ordering::Relaxed),
        "queued_commands": sim.inbox.len(),
    }))
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let sim = app_state.sim.lock();
    match serde_json::to_string(&sim.fleet) {
        Ok(json) => {
            drop(sim);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
        }
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            drop(sim);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

/// Queues a command for the next tick. Any body that does not parse is a 422.
pub async fn command_handler(
    State(app_state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let request: CommandRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!("rejected malformed command: {err}");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": err.to_string()})),
            );
        }
    };
    let mut sim = app_state.sim.lock();
    let tick = sim.fleet.meta.tick;
    tracing::debug!(issued_by = %request.issued_by, tick, "command queued");
    sim.inbox.push(request);
    let queued = sim.inbox.len();
    drop(sim);
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"queued": queued, "execute_at_tick": tick})),
    )
}

pub async fn pause_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(true, Ordering::Relaxed);
    Json(serde_json::json!({"paused": true}))
}

pub async fn resume_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(false, Ordering::Relaxed);
    Json(serde_json::json!({"paused": false}))
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_millis(200));
        heartbeat.tick().await; // discard the immediate first tick
        let mut flush = tokio::time::interval(Duration::from_millis(50));
        flush.tick().await; // discard the immediate first tick
        let mut pending: Vec<EventEnvelope> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        let data = serde_json::to_string(&pending).unwrap_or_default();
                        pending.clear();
                        yield Ok(Event::default().data(data));
                    }
                }
                _ = heartbeat.tick() => {
                    let tick = sim.lock().fleet.meta.tick;
                    let hb = serde_json::json!({"heartbeat": true, "tick": tick});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use super::*;
    use crate::state::SimState;
    use axum::body::Body;
    use axum::http::Request;
    use fleet_control::FleetAutopilot;
    use fleet_core::test_fixtures::{base_content, base_state, make_rng, player};
    use fleet_core::{Command, EventLevel};
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use tower::ServiceExt;

    fn make_test_state() -> AppState {
        let content = base_content();
        let fleet = base_state(&content);
        let (event_tx, _) = broadcast::channel(64);
        AppState {
            sim: Arc::new(Mutex::new(SimState {
                fleet,
                content,
                rng: make_rng(),
                autopilots: vec![FleetAutopilot::new(player())],
                next_command_id: 0,
                inbox: Vec::new(),
                event_level: EventLevel::Normal,
                dt: 1.0,
            })),
            event_tx,
            ticks_per_sec: 10.0,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_meta_returns_tick_and_pause_flag() {
        let app = make_router(make_test_state());
        let response = app.oneshot(get("/api/v1/meta")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["tick"], 0);
        assert_eq!(json["paused"], false);
        assert_eq!(json["seed"], 42);
    }

    #[tokio::test]
    async fn test_snapshot_is_valid_fleet_state() {
        let app = make_router(make_test_state());
        let response = app.oneshot(get("/api/v1/snapshot")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let state: Result<fleet_core::FleetState, _> = serde_json::from_slice(&body);
        assert!(state.is_ok(), "snapshot did not parse back: {:?}", state.err());
    }

    #[tokio::test]
    async fn test_command_is_queued() {
        let app_state = make_test_state();
        let app = make_router(app_state.clone());
        let body = r#"{
            "issued_by": "principal_player",
            "command": { "type": "Retreat", "ship_id": "ship_0001" }
        }"#;
        let response = app.oneshot(post("/api/v1/command", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["queued"], 1);

        let mut sim = app_state.sim.lock();
        let envelopes = sim.take_inbox();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].issued_by, player());
        assert!(matches!(envelopes[0].command, Command::Retreat { .. }));
        assert!(sim.inbox.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_command_is_422() {
        let app = make_router(make_test_state());
        let response = app
            .oneshot(post("/api/v1/command", r#"{"issued_by": "p", "command": {"type": "Warp"}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_invalid_json_is_422() {
        let app = make_router(make_test_state());
        let response = app
            .oneshot(post("/api/v1/command", "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_pause_and_resume_toggle_flag() {
        let app_state = make_test_state();
        let app = make_router(app_state.clone());

        let response = app.clone().oneshot(post("/api/v1/pause", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(app_state.paused.load(Ordering::Relaxed));

        let response = app.oneshot(post("/api/v1/resume", "")).await.unwrap();
        assert_eq!(body_json(response).await["paused"], false);
        assert!(!app_state.paused.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_tick_loop_runs_queued_commands_and_broadcasts() {
        let app_state = make_test_state();
        let mut rx = app_state.event_tx.subscribe();
        app_state.sim.lock().inbox.push(CommandRequest {
            issued_by: player(),
            command: Command::Retreat {
                ship_id: fleet_core::ShipId("ship_0001".to_string()),
            },
        });

        crate::tick_loop::run_tick_loop(
            app_state.sim.clone(),
            app_state.event_tx.clone(),
            0.0,
            Some(3),
            app_state.paused.clone(),
        )
        .await;

        let sim = app_state.sim.lock();
        assert_eq!(sim.fleet.meta.tick, 3);
        assert!(sim.inbox.is_empty());
        drop(sim);

        let first = rx.recv().await.unwrap();
        assert!(first.iter().any(|e| matches!(
            &e.event,
            fleet_core::Event::StatusChanged { ship_id, status: fleet_core::ShipStatus::Retreating, .. }
                if ship_id.0 == "ship_0001"
        )));
    }
}
