//! services/api/src/web/voice.rs
//!
//! Axum handlers for the voice chatbot. Audio travels base64-encoded inside
//! JSON bodies.

use crate::error::ApiError;
use crate::web::middleware::UserId;
use crate::web::protocol::{
    LanguageDto, LanguagesResponse, SpeechToTextRequest, SpeechToTextResponse,
    TextToSpeechRequest, TextToSpeechResponse, VoiceMessageRequest, VoiceMessageResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    Extension,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use report_assistant_core::language::{normalize_language, supported_languages};
use report_assistant_core::ports::PortError;
use std::sync::Arc;
use tracing::info;

fn decode_audio(encoded: &str) -> Result<Vec<u8>, ApiError> {
    // Browsers often send a data URL; keep only the payload.
    let payload = encoded
        .split_once("base64,")
        .map_or(encoded, |(_, data)| data)
        .trim();
    STANDARD
        .decode(payload)
        .map_err(|e| ApiError::BadRequest(format!("audio is not valid base64: {}", e)))
}

fn language_of(requested: Option<&str>) -> String {
    normalize_language(requested.unwrap_or_default())
}

/// List the languages the assistant can answer in.
#[utoipa::path(
    get,
    path = "/voice-chatbot/languages",
    responses((status = 200, description = "Supported languages", body = LanguagesResponse))
)]
pub async fn languages_handler() -> Json<LanguagesResponse> {
    let languages = supported_languages()
        .into_iter()
        .map(|(code, name)| LanguageDto {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect();
    Json(LanguagesResponse { languages })
}

/// Transcribe recorded audio.
#[utoipa::path(
    post,
    path = "/voice-chatbot/speech-to-text",
    request_body = SpeechToTextRequest,
    responses(
        (status = 200, description = "The transcript", body = SpeechToTextResponse),
        (status = 400, description = "Audio missing or not base64")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn speech_to_text_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(_user_id)): Extension<UserId>,
    payload: Result<Json<SpeechToTextRequest>, JsonRejection>,
) -> Result<Json<SpeechToTextResponse>, ApiError> {
    let Json(req) = payload?;
    let audio = decode_audio(&req.audio)?;
    let text = app_state
        .sst_adapter
        .transcribe_audio(&audio, &language_of(req.language.as_deref()))
        .await?;
    Ok(Json(SpeechToTextResponse { text }))
}

/// Read text aloud.
#[utoipa::path(
    post,
    path = "/voice-chatbot/text-to-speech",
    request_body = TextToSpeechRequest,
    responses(
        (status = 200, description = "The spoken text", body = TextToSpeechResponse),
        (status = 400, description = "Blank text")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn text_to_speech_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(_user_id)): Extension<UserId>,
    payload: Result<Json<TextToSpeechRequest>, JsonRejection>,
) -> Result<Json<TextToSpeechResponse>, ApiError> {
    let Json(req) = payload?;
    let audio = app_state
        .tts_adapter
        .generate_audio(&req.text, &language_of(req.language.as_deref()))
        .await?;
    Ok(Json(TextToSpeechResponse {
        audio: STANDARD.encode(audio),
    }))
}

/// Ask a spoken question in a chat session and get a spoken answer.
#[utoipa::path(
    post,
    path = "/voice-chatbot/voice-message",
    request_body = VoiceMessageRequest,
    responses(
        (status = 200, description = "Transcript, answer and answer audio", body = VoiceMessageResponse),
        (status = 400, description = "Audio missing, not base64 or silent"),
        (status = 404, description = "Unknown session, or its report is not available")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn voice_message_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    payload: Result<Json<VoiceMessageRequest>, JsonRejection>,
) -> Result<Json<VoiceMessageResponse>, ApiError> {
    let Json(req) = payload?;
    let language = language_of(req.language.as_deref());
    let audio = decode_audio(&req.audio)?;

    let transcript = app_state
        .sst_adapter
        .transcribe_audio(&audio, &language)
        .await?;
    if transcript.trim().is_empty() {
        return Err(PortError::Validation("no speech detected in the audio".to_string()).into());
    }

    let reply = app_state
        .sessions
        .send_message(req.session_id, &user_id, &transcript, &language)
        .await?;

    let answer_audio = app_state
        .tts_adapter
        .generate_audio(&reply.response, &language)
        .await?;

    info!(user_id = %user_id, session_id = %reply.session_id, "Answered voice message");
    Ok(Json(VoiceMessageResponse {
        session_id: reply.session_id,
        transcript,
        response: reply.response,
        audio: STANDARD.encode(answer_audio),
    }))
}
