// Web page fetcher: the `ContentFetcher` implementation behind URL items.
// Downloads the page with a browser-like User-Agent and a 10 second
// timeout, then extracts plain text with scripts and styles removed and
// whitespace collapsed.

use crate::core::analysis::ContentFetcher;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use scraper::{Html, Node};
use std::error::Error;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        // Some sites refuse requests without a browser-like UA.
        headers.insert("User-Agent", HeaderValue::from_static("Mozilla/5.0"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(FETCH_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for PageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::info!("🌐 Fetching content from: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(format!("Request failed with status {}", response.status()).into());
        }

        let html = response.text().await?;
        let text = extract_text(&html);

        if text.is_empty() {
            return Err("No text content extracted from page".into());
        }

        tracing::info!("✅ Fetched {} characters", text.chars().count());
        Ok(text)
    }
}

/// Extracts the visible text of an HTML document: text nodes outside of
/// `script`/`style` subtrees, joined and whitespace-collapsed to single
/// spaces.
fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut pieces: Vec<String> = Vec::new();
    for node in document.tree.nodes() {
        if let Node::Text(text) = node.value() {
            let skipped = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(element) => matches!(element.name(), "script" | "style"),
                _ => false,
            });
            if !skipped {
                pieces.push(text.to_string());
            }
        }
    }

    pieces
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_drops_scripts_and_styles() {
        let html = r#"
            <html>
              <head>
                <style>body { color: red; }</style>
                <script>console.log("hidden");</script>
              </head>
              <body>
                <h1>Product Review</h1>
                <p>Great product, works as expected.</p>
                <script>trackPageView();</script>
              </body>
            </html>
        "#;

        let text = extract_text(html);

        assert!(text.contains("Product Review"));
        assert!(text.contains("Great product, works as expected."));
        assert!(!text.contains("console.log"));
        assert!(!text.contains("trackPageView"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_extract_text_collapses_whitespace() {
        let html = "<p>spread\n\n   over\t\tlines</p>";
        assert_eq!(extract_text(html), "spread over lines");
    }

    #[test]
    fn test_extract_text_empty_page() {
        assert_eq!(extract_text("<html><body></body></html>"), "");
    }
}
