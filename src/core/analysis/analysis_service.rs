// The analysis service drives the whole pipeline for a batch: validate,
// resolve URL content, call the language model, and parse its response
// into structured records. Remote collaborators sit behind traits so the
// service can be tested with mocks and the real clients live in `infra/`.

use super::models::{AnalysisError, AnalysisRecord, ModelAnalysis};
use super::validator::{is_url, validate_inputs};
use async_trait::async_trait;
use chrono::Local;
use std::error::Error;

/// Resolved URL content is cut to this many characters before analysis,
/// to stay inside the model's token budget.
pub const URL_CONTENT_CHARS: usize = 5_000;

/// How much of the analyzed text is kept on the record as `original_text`.
const ORIGINAL_TEXT_PREVIEW_CHARS: usize = 100;

/// The language-model collaborator: text prompt in, text completion out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// The fetch-and-extract collaborator: given a URL, returns the page's
/// plain text with scripts/styles removed and whitespace collapsed.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, Box<dyn Error + Send + Sync>>;
}

pub struct AnalysisService<G: TextGenerator, F: ContentFetcher> {
    generator: G,
    fetcher: F,
}

impl<G: TextGenerator, F: ContentFetcher> AnalysisService<G, F> {
    pub fn new(generator: G, fetcher: F) -> Self {
        Self { generator, fetcher }
    }

    /// Analyzes a single resolved text and returns a structured record.
    ///
    /// `input_source` on the returned record is left empty; the batch
    /// orchestrator fills it in with the original item string.
    pub async fn analyze_text(
        &self,
        text: &str,
        analysis_type: &str,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let prompt = build_prompt(text, analysis_type);

        tracing::info!("🔍 Analyzing text...");
        let response = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| AnalysisError::RemoteCall(e.to_string()))?;

        let cleaned = clean_json_response(&response);
        let parsed: ModelAnalysis = serde_json::from_str(&cleaned).map_err(|e| {
            AnalysisError::MalformedResponse(format!("{} (raw response: {})", e, response))
        })?;

        tracing::info!("✅ Analysis complete!");
        Ok(AnalysisRecord {
            sentiment: parsed.sentiment,
            confidence_score: parsed.confidence_score,
            key_points: parsed.key_points,
            summary: parsed.summary,
            analysis_type: parsed.analysis_type,
            original_text: preview(text),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_source: String::new(),
        })
    }

    /// Sequentially analyzes a raw batch of texts and URLs.
    ///
    /// Items that fail validation, fetch, or analysis are skipped and
    /// logged; the returned list holds one record per *successful* item,
    /// in input order. An empty return is not an error.
    pub async fn analyze_batch(
        &self,
        inputs: &[String],
        analysis_type: &str,
    ) -> Vec<AnalysisRecord> {
        let outcome = validate_inputs(inputs);

        for warning in &outcome.warnings {
            tracing::warn!("⚠️  {}", warning);
        }

        if outcome.valid.is_empty() {
            tracing::error!("❌ No valid inputs to process");
            return Vec::new();
        }

        let mut results = Vec::new();

        for (i, input) in outcome.valid.iter().enumerate() {
            tracing::info!("{}", item_banner(i + 1, outcome.valid.len()));

            let content = if is_url(input) {
                match self.fetcher.fetch_text(input).await {
                    Ok(text) => text.chars().take(URL_CONTENT_CHARS).collect::<String>(),
                    Err(e) => {
                        let err = AnalysisError::FetchFailed(e.to_string());
                        tracing::warn!("⚠️  Skipping {}: {}", input, err);
                        continue;
                    }
                }
            } else {
                input.clone()
            };

            match self.analyze_text(&content, analysis_type).await {
                Ok(mut record) => {
                    record.input_source = input.clone();
                    results.push(record);
                }
                Err(e) => {
                    tracing::error!("❌ Skipping item {}: {}", i + 1, e);
                }
            }
        }

        results
    }
}

/// Console banner marking the start of each batch item: the progress line
/// framed by 50-character `=` rules.
fn item_banner(index: usize, total: usize) -> String {
    let rule = "=".repeat(50);
    format!("\n{rule}\nProcessing item {index}/{total}\n{rule}")
}

/// Builds the instruction asking the model for a structured JSON analysis.
fn build_prompt(text: &str, analysis_type: &str) -> String {
    format!(
        "Analyze the following text and provide a {analysis_type} analysis.\n\
         \n\
         Return your response in this exact JSON format:\n\
         {{\n\
             \"analysis_type\": \"{analysis_type}\",\n\
             \"sentiment\": \"positive/negative/neutral\",\n\
             \"confidence_score\": 0.85,\n\
             \"key_points\": [\"point1\", \"point2\", \"point3\"],\n\
             \"summary\": \"brief summary here\"\n\
         }}\n\
         \n\
         Text to analyze:\n\
         {text}\n\
         \n\
         IMPORTANT: Return ONLY valid JSON, no other text or markdown formatting."
    )
}

/// Extracts the JSON payload from a raw model response.
///
/// Models sometimes wrap their output in markdown code fences or surround
/// it with prose. Fence markers are stripped, then the greedy span from
/// the first `{` to the last `}` is taken. This is the original tool's
/// heuristic, kept as-is: it can misparse when the response contains
/// multiple JSON-like fragments, and we accept that for compatibility.
fn clean_json_response(text: &str) -> String {
    let stripped = text.replace("```json", "").replace("```", "");

    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if end > start => stripped[start..=end].to_string(),
        _ => stripped.trim().to_string(),
    }
}

/// First 100 characters of the analyzed text, with an ellipsis marker
/// when the text was longer.
fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(ORIGINAL_TEXT_PREVIEW_CHARS).collect();
    if text.chars().count() > ORIGINAL_TEXT_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
