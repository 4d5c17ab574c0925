//! HTTP surface of the gateway
//!
//! Thin axum handlers over the auth gate, security tracker, and upstream
//! client. The caller-facing contract on `/api/send` is "always 200 with a
//! structured success/failure body, except 401 when unauthenticated";
//! upstream failures never become server faults.

mod pages;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::auth::{self, AuthState, Credentials};
use crate::config::Config;
use crate::models::{ActionKind, ProxyCommand, ProxyResult, SessionData};
use crate::tracking::SecurityTracker;
use crate::upstream::UpstreamClient;

/// Session-store key the auth payload lives under
const SESSION_KEY: &str = "auth";

/// Shared state handed to every request handler
pub struct AppState {
    pub config: Config,
    pub credentials: Credentials,
    pub tracker: Arc<SecurityTracker>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let credentials = Credentials::from_json(&config.users_json);
        let tracker = Arc::new(SecurityTracker::new(config.event_threshold));
        let upstream = UpstreamClient::new(
            config.upstream_url.clone(),
            config.api_key.clone(),
            config.upstream_timeout,
            config.catalog_timeout,
        );

        Arc::new(AppState {
            config,
            credentials,
            tracker,
            upstream,
        })
    }
}

/// Request errors surfaced to API callers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
        };
        let body = ProxyResult {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the gateway router with its session layer
pub fn router(state: Arc<AppState>) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)))
        .with_signed(session_key(&state.config.session_secret));

    Router::new()
        .route("/", get(index))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/api/send", post(api_send))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(session_layer)
        .with_state(state)
}

/// Bind and serve until SIGINT/SIGTERM
pub async fn serve(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = state.config.bind_addr.clone();
    let app = router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    log::info!("Gateway listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    log::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received");
}

fn session_key(secret: &str) -> Key {
    // Key derivation needs at least 32 bytes of material
    if secret.len() >= 32 {
        Key::derive_from(secret.as_bytes())
    } else {
        log::warn!(
            "SESSION_SECRET missing or shorter than 32 bytes, \
             using a generated key (sessions reset on restart)"
        );
        Key::generate()
    }
}

/// Resolve the authenticated user, flushing the session when expired.
///
/// Session-store read failures are logged and treated as an anonymous
/// request rather than failing the handler.
async fn current_user(state: &AppState, session: &Session) -> Option<SessionData> {
    let data = match session.get::<SessionData>(SESSION_KEY).await {
        Ok(data) => data,
        Err(e) => {
            log::warn!("Session read failed: {}", e);
            None
        }
    };

    match auth::evaluate(data, Utc::now(), state.config.session_ttl) {
        AuthState::Authenticated(data) => Some(data),
        AuthState::Expired => {
            log::info!("Session expired, clearing");
            if let Err(e) = session.flush().await {
                log::warn!("Failed to clear expired session: {}", e);
            }
            None
        }
        AuthState::Anonymous => None,
    }
}

/// Client IP for tracking: first X-Forwarded-For hop, else the socket peer
fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn index(State(state): State<Arc<AppState>>, session: Session) -> Html<String> {
    match current_user(&state, &session).await {
        Some(data) => {
            let catalog = state.upstream.fetch_catalog().await;
            Html(pages::dashboard(&data.user, &catalog))
        }
        None => Html(pages::login(None)),
    }
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    if !state.credentials.verify(&form.username, &form.password) {
        log::info!("Failed login attempt for '{}'", form.username);
        return Html(pages::login(Some("Invalid username or password"))).into_response();
    }

    let data = SessionData {
        user: form.username.clone(),
        login_time: Utc::now(),
    };
    if let Err(e) = session.insert(SESSION_KEY, &data).await {
        log::error!("Failed to write session: {}", e);
        return Html(pages::login(Some("Session error, please try again"))).into_response();
    }

    let ip = client_ip(&headers, connect_info.as_ref());
    state.tracker.track(&form.username, &ip, ActionKind::Login);
    log::info!("User '{}' logged in from {}", form.username, ip);

    Redirect::to("/").into_response()
}

async fn logout(session: Session) -> Redirect {
    if let Err(e) = session.flush().await {
        log::warn!("Failed to clear session on logout: {}", e);
    }
    Redirect::to("/")
}

#[derive(Debug, Deserialize)]
struct SendForm {
    app_name: Option<String>,
    platform: String,
    device_id: String,
    event_name: String,
}

async fn api_send(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    session: Session,
    Form(form): Form<SendForm>,
) -> Response {
    let data = match current_user(&state, &session).await {
        Some(data) => data,
        None => return ApiError::Unauthenticated.into_response(),
    };

    // Tracking completes before the upstream call; the tracker lock is
    // never held while the request is in flight.
    let ip = client_ip(&headers, connect_info.as_ref());
    state.tracker.track(&data.user, &ip, ActionKind::Event);

    let command = ProxyCommand {
        app_name: form.app_name,
        platform: form.platform,
        device_id: form.device_id,
        event_name: form.event_name,
    };
    let result = state.upstream.forward(&command).await;

    (StatusCode::OK, Json(result)).into_response()
}

async fn health() -> &'static str {
    "ok"
}
