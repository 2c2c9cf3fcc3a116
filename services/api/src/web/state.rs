//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use report_assistant_core::ports::{
    AnalysisEngine, DatabaseService, DocumentExtractor, SpeechToTextService, TextToSpeechService,
};
use report_assistant_core::{
    AnalysisClient, Comparator, ExtractorRegistry, ReportIngestor, ReportResolver, SessionManager,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ingestor: ReportIngestor,
    pub sessions: SessionManager,
    pub comparator: Comparator,
    pub sst_adapter: Arc<dyn SpeechToTextService>,
    pub tts_adapter: Arc<dyn TextToSpeechService>,
}

impl AppState {
    /// Wires the core components around the given adapters. Every component
    /// shares one store, one resolver and one analysis client.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        engine: Arc<dyn AnalysisEngine>,
        pdf_extractor: Arc<dyn DocumentExtractor>,
        sst_adapter: Arc<dyn SpeechToTextService>,
        tts_adapter: Arc<dyn TextToSpeechService>,
    ) -> Self {
        let resolver = ReportResolver::new(db.clone(), config.retry_policy);
        let analysis = AnalysisClient::new(engine, config.response_mode);
        let ingestor = ReportIngestor::new(
            db.clone(),
            ExtractorRegistry::new(pdf_extractor),
            analysis.clone(),
            resolver.clone(),
        );

        Self {
            sessions: SessionManager::new(db.clone(), resolver.clone(), analysis.clone()),
            comparator: Comparator::new(db, resolver, ingestor.clone(), analysis),
            ingestor,
            config,
            sst_adapter,
            tts_adapter,
        }
    }
}
