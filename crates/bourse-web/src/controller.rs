//! Axum router and handlers for dashboard sessions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bourse_core::{DashboardController, DashboardEvent, DashboardSession, Market, MarketStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::response::{HealthResponse, SessionResponse};
use crate::session::{SessionPolicy, SessionStore, SharedSession};

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers.
pub struct AppState<S> {
    controller: Arc<DashboardController<S>>,
    sessions: Arc<SessionStore>,
    version: String,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            sessions: Arc::clone(&self.sessions),
            version: self.version.clone(),
        }
    }
}

impl<S> AppState<S> {
    pub fn new(controller: DashboardController<S>) -> Self {
        Self::with_policy(controller, SessionPolicy::default())
    }

    pub fn with_policy(controller: DashboardController<S>, policy: SessionPolicy) -> Self {
        Self {
            controller: Arc::new(controller),
            sessions: Arc::new(SessionStore::new(policy)),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, session_id: Uuid) -> Result<SharedSession, ApiError> {
        self.sessions
            .get(session_id)
            .ok_or(ApiError::SessionNotFound(session_id))
    }
}

fn lock(session: &Mutex<DashboardSession>) -> MutexGuard<'_, DashboardSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create the HTTP router with all endpoints.
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: MarketStore + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check::<S>))
        .route("/api/v1/markets", get(list_markets::<S>))
        .route("/api/v1/sessions", post(create_session::<S>))
        .route(
            "/api/v1/sessions/:id",
            get(get_session::<S>).delete(delete_session::<S>),
        )
        .route("/api/v1/sessions/:id/events", post(post_event::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve<S>(config: ServerConfig, controller: DashboardController<S>) -> std::io::Result<()>
where
    S: MarketStore + Send + Sync + 'static,
{
    let state = AppState::with_policy(controller, config.session_policy());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "dashboard server listening");

    let sweeper = tokio::spawn(sweep_idle_sessions(Arc::clone(&state.sessions)));
    let served = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();
    served
}

/// Periodically drop sessions whose tab went away without a `DELETE`.
async fn sweep_idle_sessions(sessions: Arc<SessionStore>) {
    let period = sessions
        .policy()
        .ttl
        .clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let evicted = sessions.sweep();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "idle sessions swept");
        }
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for ctrl-c; shutting down");
    }
}

async fn health_check<S>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: state.version.clone(),
    })
}

async fn list_markets<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<Market>>, ApiError>
where
    S: MarketStore + Send + Sync + 'static,
{
    let controller = Arc::clone(&state.controller);
    let markets = tokio::task::spawn_blocking(move || controller.store().markets()).await??;
    Ok(Json(markets))
}

async fn create_session<S>(
    State(state): State<AppState<S>>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError>
where
    S: MarketStore + Send + Sync + 'static,
{
    let controller = Arc::clone(&state.controller);
    let (session, view) = tokio::task::spawn_blocking(move || {
        let mut session = DashboardSession::default();
        let view = controller.handle(&mut session, DashboardEvent::Load)?;
        Ok::<_, ApiError>((session, view))
    })
    .await??;

    let session_id = Uuid::new_v4();
    state.sessions.insert(session_id, session);
    tracing::info!(%session_id, "session created");
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id, view })))
}

async fn get_session<S>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError>
where
    S: MarketStore + Send + Sync + 'static,
{
    let session = state.session(session_id)?;
    let view = tokio::task::spawn_blocking(move || {
        let guard = lock(&session);
        guard.view()
    })
    .await?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn post_event<S>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<Uuid>,
    Json(event): Json<DashboardEvent>,
) -> Result<Json<SessionResponse>, ApiError>
where
    S: MarketStore + Send + Sync + 'static,
{
    let session = state.session(session_id)?;
    let controller = Arc::clone(&state.controller);
    tracing::debug!(%session_id, event = event.name(), "session event");

    let view = tokio::task::spawn_blocking(move || {
        let mut guard = lock(&session);
        controller.handle(&mut guard, event)
    })
    .await??;

    Ok(Json(SessionResponse { session_id, view }))
}

async fn delete_session<S>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(session_id)
        .ok_or(ApiError::SessionNotFound(session_id))?;
    tracing::info!(%session_id, "session closed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use bourse_warehouse::{Warehouse, WarehouseConfig};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn seeded_warehouse() -> Warehouse {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse");
        warehouse
            .connection()
            .expect("connection")
            .execute_batch(
                r"
INSERT INTO markets VALUES (1, 'Euronext Paris', 'PAR'), (2, 'Amsterdam', 'AMS');
INSERT INTO companies VALUES (1, 'Alpha', 'AAA', 1), (2, 'Beta', 'BBB', 1), (3, 'Gamma', 'CCC', 2);
INSERT INTO stocks
    SELECT TIMESTAMP '2024-01-01 09:00:00' + to_days(CAST(i AS INTEGER)), 1, 100.0 + i, 1000 + i
    FROM range(25) t(i);
INSERT INTO stocks
    SELECT TIMESTAMP '2024-01-01 09:00:00' + to_days(CAST(i AS INTEGER)), 2, 50.0, NULL
    FROM range(21) t(i);
",
            )
            .expect("seed");
        warehouse
    }

    fn test_state() -> AppState<Warehouse> {
        AppState::new(DashboardController::new(seeded_warehouse()))
    }

    fn state_with(policy: SessionPolicy) -> AppState<Warehouse> {
        AppState::with_policy(DashboardController::new(seeded_warehouse()), policy)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, value)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn create(app: &Router) -> String {
        let (status, body) = send(
            app,
            Request::builder()
                .method("POST")
                .uri("/api/v1/sessions")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().expect("session id").to_owned()
    }

    async fn event(app: &Router, session_id: &str, event: Value) -> (StatusCode, Value) {
        send(
            app,
            post_json(&format!("/api/v1/sessions/{session_id}/events"), event),
        )
        .await
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = create_router(test_state());
        let (status, body) = send(&app, get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn lists_markets_in_id_order() {
        let app = create_router(test_state());
        let (status, body) = send(&app, get_request("/api/v1/markets")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Euronext Paris");
        assert_eq!(body[1]["alias"], "AMS");
    }

    #[tokio::test]
    async fn new_session_shows_market_options() {
        let app = create_router(test_state());
        let (status, body) = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/v1/sessions")
                .body(Body::empty())
                .expect("request"),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["view"]["title"], "Boursorama - Dashboard");
        assert_eq!(
            body["view"]["market_selector"]["options"][0],
            json!({"label": "Euronext Paris - PAR", "value": 1})
        );
        assert_eq!(body["view"]["company_selector"], Value::Null);
    }

    #[tokio::test]
    async fn full_dashboard_flow_renders_table_and_charts() {
        let app = create_router(test_state());
        let session_id = create(&app).await;

        let (_, body) = event(&app, &session_id, json!({"event": "market_selected", "market": 1})).await;
        assert_eq!(
            body["view"]["company_selector"]["options"][1]["label"],
            "Beta - BBB"
        );

        let (_, body) = event(
            &app,
            &session_id,
            json!({"event": "companies_selected", "symbols": ["AAA", "BBB"]}),
        )
        .await;
        assert_eq!(body["view"]["display_table"], true);

        let (status, body) = event(&app, &session_id, json!({"event": "display_table_clicked"})).await;
        assert_eq!(status, StatusCode::OK);
        let table = &body["view"]["table"];
        assert_eq!(table["kind"], "grid");
        assert_eq!(table["rows"].as_array().map(Vec::len), Some(46));
        assert_eq!(table["rows"][0][0], "2024-01-01, 09:00:00.000000");
        assert_eq!(body["view"]["graph_controls"]["field"], "value");

        let (status, body) = event(&app, &session_id, json!({"event": "display_graph_clicked"})).await;
        assert_eq!(status, StatusCode::OK);
        let charts = &body["view"]["charts"];
        assert_eq!(charts["price"]["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(charts["bands"]["data"].as_array().map(Vec::len), Some(4));
        assert_eq!(
            charts["bands"]["layout"]["title"]["text"],
            "Bollinger Bands for Selected Actions"
        );
    }

    #[tokio::test]
    async fn hidden_control_event_is_a_conflict() {
        let app = create_router(test_state());
        let session_id = create(&app).await;

        let (status, body) = event(&app, &session_id, json!({"event": "display_graph_clicked"})).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "control_unavailable");
    }

    #[tokio::test]
    async fn unknown_and_deleted_sessions_are_not_found() {
        let state = test_state();
        let app = create_router(state.clone());

        let (status, body) = send(&app, get_request(&format!("/api/v1/sessions/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "session_not_found");

        let session_id = create(&app).await;
        assert_eq!(state.session_count(), 1);
        let (status, _) = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/sessions/{session_id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.session_count(), 0);

        let (status, _) = event(&app, &session_id, json!({"event": "load"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sessions_do_not_share_state() {
        let app = create_router(test_state());
        let first = create(&app).await;
        let second = create(&app).await;

        event(&app, &first, json!({"event": "market_selected", "market": 2})).await;

        let (_, body) = send(&app, get_request(&format!("/api/v1/sessions/{second}"))).await;
        assert_eq!(body["view"]["market_selector"]["selected"], Value::Null);
        let (_, body) = send(&app, get_request(&format!("/api/v1/sessions/{first}"))).await;
        assert_eq!(body["view"]["market_selector"]["selected"], 2);
    }

    #[tokio::test]
    async fn idle_session_expires_and_is_not_found() {
        let state = state_with(SessionPolicy {
            ttl: Duration::ZERO,
            ..SessionPolicy::default()
        });
        let app = create_router(state.clone());
        let session_id = create(&app).await;

        let (status, body) = send(&app, get_request(&format!("/api/v1/sessions/{session_id}"))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "session_not_found");
        assert_eq!(state.session_count(), 0);
    }

    #[tokio::test]
    async fn session_count_stays_within_capacity() {
        let state = state_with(SessionPolicy {
            max_sessions: 2,
            ..SessionPolicy::default()
        });
        let app = create_router(state.clone());

        let first = create(&app).await;
        create(&app).await;
        create(&app).await;

        assert_eq!(state.session_count(), 2);
        let (status, _) = event(&app, &first, json!({"event": "load"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
