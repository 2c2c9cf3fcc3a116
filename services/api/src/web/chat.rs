//! services/api/src/web/chat.rs
//!
//! Axum handlers for the report chatbot.

use crate::error::ApiError;
use crate::web::middleware::UserId;
use crate::web::protocol::{
    ChatReplyResponse, CreateSessionRequest, SendMessageRequest, SessionResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    Extension,
};
use report_assistant_core::language::DEFAULT_LANGUAGE;
use std::sync::Arc;
use uuid::Uuid;

/// Open the chat session for a report.
///
/// Returns the existing session when the report already has one. If the
/// report is not visible yet the session is created pending and bound on the
/// first message.
#[utoipa::path(
    post,
    path = "/chatbot/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "The session for this report", body = SessionResponse),
        (status = 400, description = "Blank report name or type"),
        (status = 401, description = "Missing x-user-id header")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(req) = payload?;
    let language = req.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
    let session = app_state
        .sessions
        .create_session(&user_id, &req.report_name, &req.report_type, language)
        .await?;
    Ok(Json(SessionResponse::from(session)))
}

/// List the caller's chat sessions, newest first.
#[utoipa::path(
    get,
    path = "/chatbot/sessions",
    responses(
        (status = 200, description = "The caller's sessions", body = [SessionResponse]),
        (status = 401, description = "Missing x-user-id header")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = app_state.sessions.list_sessions(&user_id).await?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// Fetch one chat session with its full history.
#[utoipa::path(
    get,
    path = "/chatbot/session/{id}",
    responses(
        (status = 200, description = "The session", body = SessionResponse),
        (status = 404, description = "No such session for this user")
    ),
    params(
        ("id" = Uuid, Path, description = "The session id."),
        ("x-user-id" = String, Header, description = "The caller's user id.")
    )
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = app_state.sessions.get_session(session_id, &user_id).await?;
    Ok(Json(SessionResponse::from(session)))
}

/// Ask a question about the session's report.
#[utoipa::path(
    post,
    path = "/chatbot/message",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "The assistant's answer", body = ChatReplyResponse),
        (status = 400, description = "Blank message"),
        (status = 404, description = "Unknown session, or its report is not available")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn send_message_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<ChatReplyResponse>, ApiError> {
    let Json(req) = payload?;
    let language = req.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
    let reply = app_state
        .sessions
        .send_message(req.session_id, &user_id, &req.message, language)
        .await?;
    Ok(Json(ChatReplyResponse::from(reply)))
}
