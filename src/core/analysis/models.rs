// Domain models for the analysis pipeline.
// Notice how this module has NO I/O-specific code (no reqwest, no filesystem).
// The core works with plain strings so it could be driven by a CLI, a web
// app, or any other frontend.

use serde::Deserialize;
use thiserror::Error;

/// Configuration for the language-model requester.
///
/// Built once at startup in `main` from environment variables and passed
/// by reference into the components that need it - no ambient globals.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// API key for the generative-language service.
    pub api_key: String,
    /// Model handle, e.g. `gemini-2.5-flash-lite`.
    pub model: String,
}

/// The JSON object the model is instructed to return.
///
/// All fields default so a response that omits one still parses; anything
/// that is not a JSON object at all fails with `MalformedResponse`. Field
/// values are deliberately not validated beyond shape - the model's output
/// is taken at face value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelAnalysis {
    pub analysis_type: String,
    pub sentiment: String,
    pub confidence_score: f64,
    pub key_points: Vec<String>,
    pub summary: String,
}

/// The structured result of analyzing one item.
///
/// Created by the analysis requester after a successful parse; read-only
/// from then on, except that the orchestrator fills in `input_source` and
/// the exporter flattens `key_points` into a delimited string immediately
/// before writing.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    /// Sentiment label reported by the model (positive/negative/neutral).
    pub sentiment: String,
    /// Model-reported confidence, expected in [0, 1] but not enforced.
    pub confidence_score: f64,
    /// Short key-point strings, in the model's order.
    pub key_points: Vec<String>,
    /// Free-text summary.
    pub summary: String,
    /// The analysis-type tag that was requested.
    pub analysis_type: String,
    /// First 100 characters of the analyzed text, plus "..." when longer.
    pub original_text: String,
    /// Local wall-clock time when the analysis completed ("%Y-%m-%d %H:%M:%S").
    pub timestamp: String,
    /// The original input string (text or URL) that produced this record.
    pub input_source: String,
}

/// Everything that can go wrong while resolving and analyzing one item.
///
/// All of these are handled at the orchestrator as skip-and-log; none of
/// them aborts the batch.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to fetch URL content: {0}")]
    FetchFailed(String),
    #[error("Model call failed: {0}")]
    RemoteCall(String),
    #[error("Model response was not valid JSON: {0}")]
    MalformedResponse(String),
}
