//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        db::DbAdapter, OpenAiAnalysisAdapter, OpenAiSstAdapter, OpenAiTtsAdapter,
        PdfTextExtractor,
    },
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::Router;
use report_assistant_core::ports::DatabaseService;
use report_assistant_core::InMemoryDatabase;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let db: Arc<dyn DatabaseService> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store. Data will not survive a restart.");
            Arc::new(InMemoryDatabase::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let (analysis_key, analysis_base) = config.analysis_endpoint()?;
    let mut analysis_config = OpenAIConfig::new().with_api_key(analysis_key);
    if let Some(base) = &analysis_base {
        analysis_config = analysis_config.with_api_base(base);
    }
    let analysis_client = Client::with_config(analysis_config);
    let analysis_adapter = Arc::new(OpenAiAnalysisAdapter::new(
        analysis_client.clone(),
        config.analysis_model.clone(),
        config.analysis_temperature,
    ));
    info!(
        model = %config.analysis_model,
        mode = ?config.response_mode,
        custom_base = analysis_base.is_some(),
        "Analysis engine configured"
    );

    // Speech always goes to OpenAI; without its key the analysis endpoint is tried.
    let speech_client = match &config.openai_api_key {
        Some(key) => Client::with_config(OpenAIConfig::new().with_api_key(key)),
        None => {
            warn!("OPENAI_API_KEY is not set; voice endpoints will use the analysis endpoint.");
            analysis_client
        }
    };

    let sst_adapter = Arc::new(OpenAiSstAdapter::new(
        speech_client.clone(),
        config.sst_model.clone(),
    ));

    let tts_voice = OpenAiTtsAdapter::parse_voice(&config.tts_voice).ok_or_else(|| {
        ApiError::Internal(format!(
            "Invalid TTS voice specified in config: '{}'",
            config.tts_voice
        ))
    })?;
    let tts_adapter = Arc::new(OpenAiTtsAdapter::new(
        speech_client,
        OpenAiTtsAdapter::parse_model(&config.tts_model),
        tts_voice,
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        db,
        analysis_adapter,
        Arc::new(PdfTextExtractor),
        sst_adapter,
        tts_adapter,
    ));

    // --- 5. Configure CORS ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(web::middleware::USER_ID_HEADER),
        ]);

    // --- 6. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
