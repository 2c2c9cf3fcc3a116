//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the report endpoints, the multipart form
//! reader shared with the comparison endpoint, and the master definition for
//! the OpenAPI specification.

use crate::error::ApiError;
use crate::web::middleware::UserId;
use crate::web::protocol::*;
use crate::web::state::AppState;
use crate::web::{chat, compare, voice};
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use report_assistant_core::domain::Upload;
use report_assistant_core::language::DEFAULT_LANGUAGE;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        upload_report_handler,
        list_reports_handler,
        report_summary_handler,
        chat::create_session_handler,
        chat::list_sessions_handler,
        chat::get_session_handler,
        chat::send_message_handler,
        compare::compare_handler,
        compare::get_comparison_handler,
        voice::languages_handler,
        voice::speech_to_text_handler,
        voice::text_to_speech_handler,
        voice::voice_message_handler,
    ),
    components(
        schemas(
            ReportResponse,
            CreateSessionRequest,
            SessionResponse,
            MessageDto,
            SendMessageRequest,
            ChatReplyResponse,
            CompareRequestBody,
            ComparisonResponse,
            LanguageDto,
            LanguagesResponse,
            SpeechToTextRequest,
            SpeechToTextResponse,
            TextToSpeechRequest,
            TextToSpeechResponse,
            VoiceMessageRequest,
            VoiceMessageResponse,
        )
    ),
    tags(
        (name = "Report Assistant API", description = "Medical report analysis, chat and comparison.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Multipart Forms
//=========================================================================================

/// A multipart form with at most one file part and any number of text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub upload: Option<Upload>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                if form.upload.is_some() {
                    return Err(ApiError::BadRequest(
                        "only one file part is allowed".to_string(),
                    ));
                }
                let file_name = field.file_name().unwrap_or("report").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read file bytes: {}", e))
                })?;
                form.upload = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read field {}: {}", name, e))
                })?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up"))
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Upload a medical report.
///
/// Accepts a multipart/form-data request with a `file` part (PDF or plain
/// text), a `reportType` field and an optional `language` field. The text is
/// de-identified before it is analyzed or stored.
#[utoipa::path(
    post,
    path = "/reports/upload",
    request_body(content_type = "multipart/form-data", description = "The report file plus reportType and language fields."),
    responses(
        (status = 201, description = "Report analyzed and stored", body = ReportResponse),
        (status = 400, description = "Missing file or type, unreadable or empty document"),
        (status = 401, description = "Missing x-user-id header"),
        (status = 502, description = "The analysis engine returned an invalid response"),
        (status = 500, description = "Internal server error")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn upload_report_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let report_type = form
        .field("reportType")
        .ok_or_else(|| ApiError::BadRequest("reportType is required".to_string()))?
        .to_string();
    let language = form.field("language").unwrap_or(DEFAULT_LANGUAGE).to_string();
    let upload = form
        .upload
        .ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;

    let report = app_state
        .ingestor
        .ingest(&user_id, upload, &report_type, &language)
        .await?;

    info!(user_id = %user_id, report_id = %report.id, "Report uploaded");
    Ok((StatusCode::CREATED, Json(ReportResponse::from(report))))
}

/// List the caller's reports, newest first.
#[utoipa::path(
    get,
    path = "/reports",
    responses(
        (status = 200, description = "The caller's reports", body = [ReportResponse]),
        (status = 401, description = "Missing x-user-id header")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn list_reports_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<Json<Vec<ReportResponse>>, ApiError> {
    let reports = app_state.ingestor.list_reports(&user_id).await?;
    Ok(Json(reports.into_iter().map(ReportResponse::from).collect()))
}

/// Fetch one report's analysis by name and type.
#[utoipa::path(
    get,
    path = "/reports/summary",
    params(
        SummaryQuery,
        ("x-user-id" = String, Header, description = "The caller's user id.")
    ),
    responses(
        (status = 200, description = "The report", body = ReportResponse),
        (status = 404, description = "No such report for this user")
    )
)]
pub async fn report_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = app_state
        .ingestor
        .find_report(&user_id, &query.name, &query.report_type)
        .await?;
    Ok(Json(ReportResponse::from(report)))
}
