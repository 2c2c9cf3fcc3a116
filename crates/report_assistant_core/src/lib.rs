pub mod analysis;
pub mod client;
pub mod comparator;
pub mod domain;
pub mod extraction;
pub mod ingest;
pub mod language;
pub mod memory;
pub mod ports;
pub mod prompts;
pub mod redactor;
pub mod resolver;
pub mod sessions;

pub use analysis::{ComparisonResult, ComparisonSummary, ReportAnalysis, ReportSummary};
pub use client::{AnalysisClient, ResponseMode};
pub use comparator::{CompareRequest, Comparator, ComparisonOutcome};
pub use domain::{
    ChatSession, Comparison, ComparisonKey, Message, NewChatSession, NewComparison, NewReport,
    Report, ReportBinding, ReportKey, Role, SessionState, Upload,
};
pub use extraction::{ExtractorRegistry, PlainTextExtractor};
pub use ingest::ReportIngestor;
pub use memory::InMemoryDatabase;
pub use ports::{
    AnalysisEngine, DatabaseService, DocumentExtractor, PortError, PortResult, Prompt,
    ResponseFormat, SpeechToTextService, TextToSpeechService,
};
pub use resolver::{ReportResolver, RetryPolicy};
pub use sessions::{ChatReply, SessionManager};
