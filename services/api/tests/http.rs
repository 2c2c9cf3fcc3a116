//! Router-level tests over the in-memory store with scripted engines.

use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use report_assistant_core::ports::{
    AnalysisEngine, PortResult, Prompt, ResponseFormat, SpeechToTextService, TextToSpeechService,
};
use report_assistant_core::{InMemoryDatabase, PlainTextExtractor, ResponseMode, RetryPolicy};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "report-assistant-test-boundary";

struct ScriptedEngine {
    malformed: bool,
    comparisons: AtomicUsize,
}

#[async_trait]
impl AnalysisEngine for ScriptedEngine {
    async fn analyze(&self, prompt: &Prompt) -> PortResult<String> {
        if self.malformed && prompt.format == ResponseFormat::Json {
            return Ok("Sure! Here is your analysis: looks fine.".to_string());
        }
        let reply = match prompt.format {
            ResponseFormat::Text => "Your LDL is slightly high. Please consult a doctor.".to_string(),
            ResponseFormat::Json if prompt.input.contains("Old Report Summary") => {
                self.comparisons.fetch_add(1, Ordering::SeqCst);
                json!({
                    "overall_status": "Improved", "status_color": "green", "changes": [],
                    "visualizations": [], "summary_markdown": "Better.",
                    "recommendation": "Keep going.", "disclaimer": "Not medical advice."
                })
                .to_string()
            }
            ResponseFormat::Json => json!({
                "insights": [{"category": "Lipids", "emoji": "🫀", "insight": "LDL high", "status": "warning"}],
                "visualizations": [{"label": "LDL", "value": 160, "unit": "mg/dL", "min_range": null, "max_range": 130, "status": "High"}],
                "summary_text": "LDL is above range."
            })
            .to_string(),
        };
        Ok(reply)
    }
}

struct FakeSpeech;

#[async_trait]
impl SpeechToTextService for FakeSpeech {
    async fn transcribe_audio(&self, audio_data: &[u8], _language: &str) -> PortResult<String> {
        Ok(String::from_utf8_lossy(audio_data).to_string())
    }
}

#[async_trait]
impl TextToSpeechService for FakeSpeech {
    async fn generate_audio(&self, text: &str, _language: &str) -> PortResult<Vec<u8>> {
        Ok(format!("AUDIO:{text}").into_bytes())
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: None,
        log_level: tracing::Level::INFO,
        openai_api_key: None,
        gemini_api_key: None,
        analysis_api_base: None,
        analysis_model: "test-model".to_string(),
        analysis_temperature: 0.0,
        response_mode: ResponseMode::Structured,
        retry_policy: RetryPolicy::once(),
        sst_model: "whisper-1".to_string(),
        tts_model: "tts-1".to_string(),
        tts_voice: "alloy".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        max_upload_bytes: 1024 * 1024,
    }
}

fn app_with(malformed: bool) -> (Router, Arc<ScriptedEngine>) {
    let engine = Arc::new(ScriptedEngine {
        malformed,
        comparisons: AtomicUsize::new(0),
    });
    let state = AppState::new(
        Arc::new(test_config()),
        Arc::new(InMemoryDatabase::new()),
        engine.clone(),
        Arc::new(PlainTextExtractor),
        Arc::new(FakeSpeech),
        Arc::new(FakeSpeech),
    );
    (web::router(Arc::new(state)), engine)
}

fn app() -> Router {
    app_with(false).0
}

fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).unwrap()
}

fn multipart_request(uri: &str, user: &str, fields: &[(&str, &str)], file: (&str, &str)) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/plain\r\n\r\n{}\r\n--{BOUNDARY}--\r\n",
        file.0, file.1
    ));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-id", user)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn upload(app: &Router, user: &str, file_name: &str) -> Value {
    let (status, body) = send(
        app,
        multipart_request(
            "/reports/upload",
            user,
            &[("reportType", "lipid"), ("language", "en")],
            (file_name, "Patient Name: Ravi Kumar\nLDL 160 mg/dL"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn health_is_public() {
    let (status, body) = send(&app(), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let (status, _) = send(&app(), get("/reports", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app(), get("/voice-chatbot/languages", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn uploaded_report_is_sanitized_and_listed() {
    let app = app();
    let report = upload(&app, "u1", "Lipid Jan.txt").await;
    assert_eq!(report["reportName"], "lipid jan.txt");
    assert_eq!(report["reportType"], "LIPID");
    assert_eq!(report["summary"]["mode"], "structured");

    let (status, list) = send(&app, get("/reports", Some("u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, summary) = send(&app, get("/reports/summary?name=LIPID%20JAN.txt&type=lipid", Some("u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["id"], report["id"]);

    let (status, _) = send(&app, get("/reports/summary?name=lipid%20jan.txt&type=lipid", Some("u2"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_without_type_is_a_bad_request() {
    let (status, _) = send(
        &app(),
        multipart_request("/reports/upload", "u1", &[], ("a.txt", "LDL 160")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_upload_is_a_bad_request() {
    let (status, body) = send(
        &app(),
        multipart_request("/reports/upload", "u1", &[("reportType", "cbc")], ("a.txt", "   ")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no readable text"));
}

#[tokio::test]
async fn upload_with_two_file_parts_is_a_bad_request() {
    let file_part = |name: &str| {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: text/plain\r\n\r\nLDL 160\r\n"
        )
    };
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"reportType\"\r\n\r\nlipid\r\n{}{}--{BOUNDARY}--\r\n",
        file_part("a.txt"),
        file_part("b.txt")
    );
    let request = Request::builder()
        .method("POST")
        .uri("/reports/upload")
        .header("x-user-id", "u1")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();

    let app = app();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("one file"));

    let (_, list) = send(&app, get("/reports", Some("u1"))).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn json_bodies_missing_required_fields_are_bad_requests() {
    let app = app();
    let (status, body) = send(&app, json_request("POST", "/chatbot/session", Some("u1"), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        json_request("POST", "/chatbot/message", Some("u1"), json!({"message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request("POST", "/voice-chatbot/text-to-speech", Some("u1"), json!({"language": "en"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request("POST", "/comparisons", Some("u1"), json!({"oldReportName": "a"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_engine_output_is_a_bad_gateway() {
    let (app, _) = app_with(true);
    let (status, _) = send(
        &app,
        multipart_request("/reports/upload", "u1", &[("reportType", "cbc")], ("a.txt", "Hb 11")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn chat_session_round_trip() {
    let app = app();
    upload(&app, "u1", "lipid.txt").await;

    let create = json!({"reportName": "Lipid.txt", "reportType": "LIPID"});
    let (status, session) = send(&app, json_request("POST", "/chatbot/session", Some("u1"), create.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["state"], "created");
    assert!(session["reportId"].is_string());

    let (_, again) = send(&app, json_request("POST", "/chatbot/session", Some("u1"), create)).await;
    assert_eq!(again["sessionId"], session["sessionId"]);

    let session_id = session["sessionId"].as_str().unwrap().to_string();
    let (status, reply) = send(
        &app,
        json_request(
            "POST",
            "/chatbot/message",
            Some("u1"),
            json!({"sessionId": session_id, "message": "Is LDL high?"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reply["response"].as_str().unwrap().contains("LDL"));

    let (status, stored) = send(&app, get(&format!("/chatbot/session/{session_id}"), Some("u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["state"], "resolved");
    assert_eq!(stored["messages"].as_array().unwrap().len(), 2);
    assert_eq!(stored["messages"][0]["role"], "user");

    let (status, _) = send(&app, get(&format!("/chatbot/session/{session_id}"), Some("u2"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, sessions) = send(&app, get("/chatbot/sessions", Some("u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sessions.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (status, _) = send(
        &app(),
        get(&format!("/chatbot/session/{}", uuid::Uuid::new_v4()), Some("u1")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn message_on_pending_session_without_report_is_not_found() {
    let app = app();
    let (_, session) = send(
        &app,
        json_request(
            "POST",
            "/chatbot/session",
            Some("u1"),
            json!({"reportName": "later.pdf", "reportType": "CBC"}),
        ),
    )
    .await;
    assert!(session["reportId"].is_null());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/chatbot/message",
            Some("u1"),
            json!({"sessionId": session["sessionId"], "message": "hello"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Report not found"));
}

#[tokio::test]
async fn repeated_json_comparison_is_served_from_cache() {
    let (app, engine) = app_with(false);
    upload(&app, "u1", "jan.txt").await;
    upload(&app, "u1", "mar.txt").await;

    let body = json!({
        "oldReportName": "jan.txt", "oldReportType": "lipid",
        "newReportName": "MAR.txt", "newReportType": "Lipid"
    });
    let (status, first) = send(&app, json_request("POST", "/comparisons", Some("u1"), body.clone())).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["cached"], false);

    let (_, second) = send(&app, json_request("POST", "/comparisons", Some("u1"), body)).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(engine.comparisons.load(Ordering::SeqCst), 1);

    let (status, fetched) = send(
        &app,
        get("/comparisons?old=jan.txt&oldType=LIPID&new=mar.txt&newType=LIPID", Some("u1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], first["id"]);
}

#[tokio::test]
async fn multipart_comparison_uploads_the_new_report() {
    let (app, engine) = app_with(false);
    upload(&app, "u1", "jan.txt").await;

    let (status, body) = send(
        &app,
        multipart_request(
            "/comparisons",
            "u1",
            &[("oldReportName", "jan.txt"), ("oldReportType", "LIPID"), ("newReportType", "LIPID")],
            ("apr.txt", "LDL 120 mg/dL"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["newReportName"], "apr.txt");
    assert_eq!(body["cached"], false);
    assert_eq!(engine.comparisons.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn comparison_with_missing_report_is_not_found() {
    let (status, _) = send(
        &app(),
        json_request(
            "POST",
            "/comparisons",
            Some("u1"),
            json!({"oldReportName": "a", "oldReportType": "X", "newReportName": "b", "newReportType": "X"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn voice_message_transcribes_answers_and_speaks() {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let app = app();
    upload(&app, "u1", "lipid.txt").await;
    let (_, session) = send(
        &app,
        json_request(
            "POST",
            "/chatbot/session",
            Some("u1"),
            json!({"reportName": "lipid.txt", "reportType": "LIPID"}),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/voice-chatbot/voice-message",
            Some("u1"),
            json!({
                "sessionId": session["sessionId"],
                "audio": STANDARD.encode("What about LDL?"),
                "language": "hi"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["transcript"], "What about LDL?");
    let audio = STANDARD.decode(body["audio"].as_str().unwrap()).unwrap();
    assert!(String::from_utf8(audio).unwrap().starts_with("AUDIO:"));
}
