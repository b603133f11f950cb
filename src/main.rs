// This is the entry point of the batch text/URL analyzer.
//
// **Architecture Overview:**
// - `core/` = Business logic (validation, orchestration, export schema)
// - `infra/` = Implementations of core traits (Gemini API, web fetch, sinks)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the built-in demonstration batch
// 4. Export the results
//
// Running with no arguments is the whole interface: there are no flags,
// and the process exits normally even if every item failed.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pair of mod.rs files that look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::analysis::{AnalysisService, AnalyzerConfig};
use crate::core::export::ExportSink;
use crate::infra::ai::GeminiClient;
use crate::infra::export::{GoogleAuthenticator, GoogleSheetsSink, XlsxSink};
use crate::infra::web::PageFetcher;

const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Build the configuration and wire the services together.
    // This is the "composition root" where everything is connected.

    let api_key = std::env::var("GEMINI_API_KEY").expect(
        "Missing GEMINI_API_KEY environment variable! Create a .env file with your API key.",
    );
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let config = AnalyzerConfig { api_key, model };

    let generator = GeminiClient::new(&config);
    let fetcher = PageFetcher::new().expect("Failed to build HTTP client for page fetching");
    let service = AnalysisService::new(generator, fetcher);

    // ========================================================================
    // DEMONSTRATION BATCH
    // ========================================================================

    let test_inputs = vec![
        "I absolutely love this product! It exceeded all my expectations and the customer service was amazing.".to_string(),
        "This was the worst experience ever. The product broke after one day and nobody responded to my complaints.".to_string(),
        "The product is okay. Nothing special but it works as expected. Price is reasonable.".to_string(),
    ];

    println!("🚀 Starting batch analysis...\n");
    let results = service.analyze_batch(&test_inputs, "sentiment").await;

    println!("\n{}", "=".repeat(50));
    println!(
        "📊 BATCH ANALYSIS COMPLETE - {} items processed",
        results.len()
    );
    println!("{}", "=".repeat(50));

    if results.is_empty() {
        return;
    }

    // Export to Excel
    let sink = XlsxSink::new();
    match sink.export(&results, None).await {
        Ok(path) => {
            println!("\n🎉 SUCCESS! Open the file to see your results:");
            println!("   {}", path);
        }
        Err(e) => tracing::error!("❌ Export failed: {}", e),
    }

    // Optional cloud export. Requires credentials.json and, on first use,
    // an interactive browser consent step.
    let sheets_enabled = std::env::var("EXPORT_TO_GOOGLE_SHEETS")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    if sheets_enabled {
        let sheets = GoogleSheetsSink::new(GoogleAuthenticator::new());
        match sheets.export(&results, None).await {
            Ok(url) => {
                println!("\n🔗 Shareable sheet: {}", url);
            }
            Err(e) => tracing::error!("❌ Google Sheets export failed: {}", e),
        }
    }
}
