//! services/api/src/web/compare.rs
//!
//! Axum handlers for report comparison.

use crate::error::ApiError;
use crate::web::middleware::UserId;
use crate::web::protocol::{CompareRequestBody, ComparisonQuery, ComparisonResponse};
use crate::web::rest::UploadForm;
use crate::web::state::AppState;
use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header::CONTENT_TYPE,
    response::Json,
    Extension,
};
use report_assistant_core::domain::{ComparisonKey, ReportKey};
use report_assistant_core::language::DEFAULT_LANGUAGE;
use report_assistant_core::CompareRequest;
use std::sync::Arc;

/// Compare an older report with a newer one.
///
/// Send JSON to compare two stored reports, or multipart/form-data with a
/// `file` part to upload the newer report in the same call. Repeating a JSON
/// comparison is served from the cache.
#[utoipa::path(
    post,
    path = "/comparisons",
    request_body(content = CompareRequestBody, description = "JSON, or the same fields as multipart/form-data plus a file part."),
    responses(
        (status = 200, description = "The comparison", body = ComparisonResponse),
        (status = 400, description = "Missing or blank report fields"),
        (status = 404, description = "One of the reports does not exist"),
        (status = 502, description = "The analysis engine returned an invalid response")
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn compare_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    request: Request,
) -> Result<Json<ComparisonResponse>, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let compare_request = if is_multipart {
        let multipart = Multipart::from_request(request, &app_state)
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        from_form(UploadForm::read(multipart).await?)
    } else {
        let Json(body) = Json::<CompareRequestBody>::from_request(request, &app_state).await?;
        from_body(body)
    };

    let outcome = app_state.comparator.compare(&user_id, compare_request).await?;
    Ok(Json(ComparisonResponse::from(outcome)))
}

/// Fetch a stored comparison without running a new one.
#[utoipa::path(
    get,
    path = "/comparisons",
    params(
        ComparisonQuery,
        ("x-user-id" = String, Header, description = "The caller's user id.")
    ),
    responses(
        (status = 200, description = "The stored comparison", body = ComparisonResponse),
        (status = 404, description = "These reports have not been compared yet")
    )
)]
pub async fn get_comparison_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<ComparisonResponse>, ApiError> {
    let key = ComparisonKey {
        old: ReportKey::new(&query.old, &query.old_type)?,
        new: ReportKey::new(&query.new, &query.new_type)?,
    };
    let comparison = app_state.comparator.get_comparison(&user_id, &key).await?;
    Ok(Json(ComparisonResponse::new(comparison, true)))
}

fn from_body(body: CompareRequestBody) -> CompareRequest {
    CompareRequest {
        old_name: body.old_report_name,
        old_type: body.old_report_type,
        new_name: body.new_report_name,
        new_type: body.new_report_type,
        language: body.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        upload: None,
    }
}

fn from_form(form: UploadForm) -> CompareRequest {
    let field = |name: &str| form.field(name).map(str::to_string);
    CompareRequest {
        old_name: field("oldReportName").unwrap_or_default(),
        old_type: field("oldReportType").unwrap_or_default(),
        new_name: field("newReportName"),
        new_type: field("newReportType"),
        language: field("language").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        upload: form.upload,
    }
}
