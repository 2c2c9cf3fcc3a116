pub mod chat;
pub mod compare;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod voice;

pub use middleware::require_user;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Builds the API router. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no identity required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/voice-chatbot/languages", get(voice::languages_handler));

    // Protected routes (x-user-id required)
    let protected_routes = Router::new()
        .route("/reports/upload", post(rest::upload_report_handler))
        .route("/reports", get(rest::list_reports_handler))
        .route("/reports/summary", get(rest::report_summary_handler))
        .route("/chatbot/session", post(chat::create_session_handler))
        .route("/chatbot/sessions", get(chat::list_sessions_handler))
        .route("/chatbot/session/{id}", get(chat::get_session_handler))
        .route("/chatbot/message", post(chat::send_message_handler))
        .route(
            "/comparisons",
            post(compare::compare_handler).get(compare::get_comparison_handler),
        )
        .route("/voice-chatbot/speech-to-text", post(voice::speech_to_text_handler))
        .route("/voice-chatbot/text-to-speech", post(voice::text_to_speech_handler))
        .route("/voice-chatbot/voice-message", post(voice::voice_message_handler))
        .layer(axum_middleware::from_fn(require_user));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .with_state(app_state)
}
