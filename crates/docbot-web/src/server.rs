//! Chat service and HTTP router

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use docbot_core::{QueryEngine, Result};

use crate::page::{PageView, render_page};
use crate::session::{SessionState, SessionStore, SharedSession};
use crate::sources::format_answer;

pub const SESSION_COOKIE: &str = "docbot_session";

/// Runs one prompt against the query engine and records the exchange
pub struct ChatService {
    engine: Arc<dyn QueryEngine>,
}

impl ChatService {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }

    /// Answer `prompt` with the session's history so far
    ///
    /// Whitespace-only prompts are ignored; any other prompt is sent and
    /// recorded as typed. On failure the session is left untouched.
    pub async fn submit(&self, session: &mut SessionState, prompt: &str) -> Result<()> {
        if prompt.trim().is_empty() {
            return Ok(());
        }

        let result = self.engine.answer(prompt, &session.chat_history).await?;
        let formatted = format_answer(&result);
        session.record(prompt, formatted, &result.result);
        Ok(())
    }
}

/// Shared state for every request
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub sessions: SessionStore,
    pub stylesheet: Option<Arc<str>>,
}

impl AppState {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            chat: Arc::new(ChatService::new(engine)),
            sessions: SessionStore::new(),
            stylesheet: None,
        }
    }

    pub fn with_stylesheet(mut self, css: Option<String>) -> Self {
        self.stylesheet = css.map(Arc::from);
        self
    }

    /// Session named by the request cookie, or a fresh one plus its cookie header
    async fn session_for(&self, headers: &HeaderMap) -> (SharedSession, Option<HeaderValue>) {
        if let Some(id) = session_id(headers) {
            if let Some(session) = self.sessions.get(&id).await {
                return (session, None);
            }
        }

        let (id, session) = self.sessions.create().await;
        debug!(session = %id, "started session");
        (session, session_cookie(&id))
    }

    fn render(&self, session: &SessionState, error: Option<&str>) -> Html<String> {
        Html(render_page(&PageView {
            session,
            stylesheet: self.stylesheet.as_deref(),
            error,
        }))
    }
}

/// Value of the session cookie, if the request carries one
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn session_cookie(id: &str) -> Option<HeaderValue> {
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    HeaderValue::from_str(&cookie).ok()
}

/// Read the optional stylesheet; a missing file is not an error
pub fn load_stylesheet(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(css) => {
            info!(path = %path.display(), "loaded stylesheet");
            Some(css)
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no stylesheet");
            None
        }
    }
}

fn with_cookie(cookie: Option<HeaderValue>, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub prompt: String,
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (session, cookie) = state.session_for(&headers).await;
    let session = session.lock().await;
    with_cookie(cookie, state.render(&session, None))
}

async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Response {
    let (session, cookie) = state.session_for(&headers).await;
    let mut session = session.lock().await;

    match state.chat.submit(&mut session, &form.prompt).await {
        Ok(()) => with_cookie(cookie, Redirect::to("/")),
        Err(e) => {
            error!(error = %e, "query failed");
            let message = format!("Could not answer the question: {}", e);
            with_cookie(
                cookie,
                (StatusCode::BAD_GATEWAY, state.render(&session, Some(&message))),
            )
        }
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        if state.sessions.remove(&id).await {
            debug!(session = %id, "ended session");
        }
    }
    let (id, _) = state.sessions.create().await;
    with_cookie(session_cookie(&id), Redirect::to("/"))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ask", post(ask))
        .route("/logout", post(logout))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("DocBot listening on http://{}", addr);
    axum::serve(listener, app_router(state)).await
}
