pub mod analysis_service;
pub mod models;
pub mod validator;

pub use analysis_service::{AnalysisService, ContentFetcher, TextGenerator};
pub use models::{AnalysisError, AnalysisRecord, AnalyzerConfig};
