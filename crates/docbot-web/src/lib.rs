//! Chat web UI for DocBot
//!
//! A single page with one prompt box. Each browser session keeps its own
//! prompts, formatted answers and raw chat history on the server.

mod sources;
mod session;
mod page;
mod server;


pub use sources::{create_sources_string, format_answer};
pub use session::{DEFAULT_IDLE_TIMEOUT, SessionState, SessionStore, SharedSession};
pub use page::{PageView, escape_html, render_page};
pub use server::{
    AppState, AskForm, ChatService, SESSION_COOKIE, app_router, load_stylesheet, run_server,
    session_id,
};

// Re-export core types
pub use docbot_core::{ChatTurn, Error, QueryEngine, QueryResult, Result};
