// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// This module provides the `TextGenerator` implementation that talks to
// Google's Gemini API (https://ai.google.dev/gemini-api/docs).
//
// **API shape:**
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`).
// - Request format: `contents[]` with nested `parts`, each part a text blob.
// - Response format: Content is at `candidates[0].content.parts[*].text`.
//
// **Environment Variables (read in `main`, carried in `AnalyzerConfig`):**
// - `GEMINI_API_KEY` - Your API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - Model handle, defaults to `gemini-2.5-flash-lite`

use crate::core::analysis::{AnalyzerConfig, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// A single part of content. Gemini uses a "parts" array so that one
/// message can carry several blobs; for plain text prompts there is
/// exactly one part.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// A message in the conversation. Role is "user" for the prompt and
/// "model" in the response.
#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

/// The request body sent to the generateContent endpoint.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

/// A candidate response from the model. Usually just one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

/// The response from the generateContent endpoint.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

/// Error body returned by the Gemini API on non-2xx statuses.
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

/// Client for the Gemini generateContent endpoint.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Creates a new client from the startup configuration.
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn build_request(prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }

    /// Joins the text parts of the first candidate into one completion.
    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let candidate = response.candidates.as_ref()?.first()?;

        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    /// Sends a single-turn prompt to the Gemini API and returns the raw
    /// completion text. No retry: a failed call fails the item.
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        // Format: https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let request = Self::build_request(prompt);

        // Log request size for debugging (never the API key!)
        tracing::debug!(
            "Gemini request to model {}: {} chars prompt",
            self.model,
            prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            // Try to parse the structured error body for a better message
            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                return Err(format!(
                    "Gemini API error ({}): {}",
                    status, error_response.error.message
                )
                .into());
            }

            return Err(format!("Gemini API error: {} - {}", status, error_text).into());
        }

        let response_json: GenerateContentResponse = response.json().await?;

        let content = Self::extract_text(&response_json).ok_or(
            "No content in Gemini response - the model may have been blocked by safety filters",
        )?;

        tracing::debug!("Gemini response received: {} chars", content.len());

        Ok(content)
    }
}
