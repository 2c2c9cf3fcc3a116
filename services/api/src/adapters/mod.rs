pub mod analysis_llm;
pub mod db;
pub mod pdf;
pub mod sst;
pub mod tts;

pub use analysis_llm::OpenAiAnalysisAdapter;
pub use db::DbAdapter;
pub use pdf::PdfTextExtractor;
pub use sst::OpenAiSstAdapter;
pub use tts::OpenAiTtsAdapter;
