// =============================================================================
// GOOGLE SHEETS SINK
// =============================================================================
//
// Cloud sink: creates a brand-new spreadsheet for each export, writes the
// header and data rows, styles the header (bold, light on dark), resizes
// the columns, and shares the sheet as "anyone with the link may read".
// Returns the shareable URL.
//
// Authentication is handled by `GoogleAuthenticator` (see google_auth.rs).

use super::google_auth::GoogleAuthenticator;
use crate::core::analysis::AnalysisRecord;
use crate::core::export::{build_table, ExportError, ExportSink};
use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";

/// Response to spreadsheet creation; only the fields the sink needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    spreadsheet_id: String,
    spreadsheet_url: String,
}

pub struct GoogleSheetsSink {
    client: Client,
    auth: GoogleAuthenticator,
}

impl GoogleSheetsSink {
    pub fn new(auth: GoogleAuthenticator) -> Self {
        Self {
            client: Client::new(),
            auth,
        }
    }

    async fn create_spreadsheet(
        &self,
        token: &str,
        title: &str,
    ) -> Result<Spreadsheet, ExportError> {
        let response = self
            .client
            .post(SHEETS_API)
            .bearer_auth(token)
            .json(&json!({ "properties": { "title": title } }))
            .send()
            .await
            .map_err(|e| ExportError::Remote(e.to_string()))?;

        let response = check_status(response, "Spreadsheet creation").await?;
        response
            .json()
            .await
            .map_err(|e| ExportError::Remote(e.to_string()))
    }

    /// Writes a block of rows starting at the given A1-style anchor.
    /// Cells serialize as their natural JSON type, so numeric cells land
    /// as numbers in the sheet rather than text.
    async fn update_values<T: serde::Serialize + Send + Sync>(
        &self,
        token: &str,
        spreadsheet_id: &str,
        anchor: &str,
        values: &[Vec<T>],
    ) -> Result<(), ExportError> {
        let url = format!(
            "{}/{}/values/{}?valueInputOption=RAW",
            SHEETS_API, spreadsheet_id, anchor
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(|e| ExportError::Remote(e.to_string()))?;

        check_status(response, "Cell update").await?;
        Ok(())
    }

    /// Header style (bold, white on dark blue) plus column auto-resize,
    /// in one batchUpdate call.
    async fn format_sheet(
        &self,
        token: &str,
        spreadsheet_id: &str,
        column_count: usize,
    ) -> Result<(), ExportError> {
        let url = format!("{}/{}:batchUpdate", SHEETS_API, spreadsheet_id);

        let body = json!({
            "requests": [
                {
                    "repeatCell": {
                        "range": { "sheetId": 0, "startRowIndex": 0, "endRowIndex": 1 },
                        "cell": {
                            "userEnteredFormat": {
                                "backgroundColor": { "red": 0.2, "green": 0.2, "blue": 0.8 },
                                "textFormat": {
                                    "foregroundColor": { "red": 1, "green": 1, "blue": 1 },
                                    "bold": true
                                }
                            }
                        },
                        "fields": "userEnteredFormat(backgroundColor,textFormat)"
                    }
                },
                {
                    "autoResizeDimensions": {
                        "dimensions": {
                            "sheetId": 0,
                            "dimension": "COLUMNS",
                            "startIndex": 0,
                            "endIndex": column_count
                        }
                    }
                }
            ]
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExportError::Remote(e.to_string()))?;

        check_status(response, "Sheet formatting").await?;
        Ok(())
    }

    /// Makes the spreadsheet readable by anyone with the link.
    async fn share_with_link(&self, token: &str, spreadsheet_id: &str) -> Result<(), ExportError> {
        let url = format!("{}/{}/permissions", DRIVE_API, spreadsheet_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(|e| ExportError::Remote(e.to_string()))?;

        check_status(response, "Sharing permission").await?;
        Ok(())
    }
}

fn default_sheet_name() -> String {
    format!("Analysis Results {}", Local::now().format("%Y%m%d_%H%M%S"))
}

async fn check_status(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, ExportError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(ExportError::Remote(format!(
        "{} failed ({}): {}",
        what, status, text
    )))
}

#[async_trait]
impl ExportSink for GoogleSheetsSink {
    async fn export(
        &self,
        records: &[AnalysisRecord],
        name: Option<&str>,
    ) -> Result<String, ExportError> {
        if records.is_empty() {
            tracing::error!("❌ No results to export");
            return Err(ExportError::NoRecords);
        }

        let table = build_table(records);

        tracing::info!("📝 Authenticating with Google...");
        let token = self.auth.get_access_token().await?;

        let sheet_name = name.map(str::to_string).unwrap_or_else(default_sheet_name);
        tracing::info!("📝 Creating Google Sheet: {}", sheet_name);

        let spreadsheet = self.create_spreadsheet(&token, &sheet_name).await?;
        let id = &spreadsheet.spreadsheet_id;

        self.update_values(&token, id, "A1", &[table.headers.clone()])
            .await?;
        if !table.rows.is_empty() {
            self.update_values(&token, id, "A2", &table.rows).await?;
        }

        self.format_sheet(&token, id, table.headers.len()).await?;
        self.share_with_link(&token, id).await?;

        tracing::info!("✅ Results exported to Google Sheets!");
        tracing::info!("📊 Total rows: {}", table.rows.len());
        tracing::info!("🔗 Sheet URL: {}", spreadsheet.spreadsheet_url);

        Ok(spreadsheet.spreadsheet_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sheet_name_pattern() {
        let name = default_sheet_name();
        assert!(name.starts_with("Analysis Results "));
        // "Analysis Results " + YYYYMMDD_HHMMSS
        assert_eq!(name.len(), "Analysis Results ".len() + 15);
    }

    #[test]
    fn test_spreadsheet_response_parsing() {
        let body = r#"{
            "spreadsheetId": "abc123",
            "spreadsheetUrl": "https://docs.google.com/spreadsheets/d/abc123/edit",
            "properties": {"title": "Analysis Results"}
        }"#;

        let spreadsheet: Spreadsheet = serde_json::from_str(body).unwrap();
        assert_eq!(spreadsheet.spreadsheet_id, "abc123");
        assert!(spreadsheet.spreadsheet_url.contains("abc123"));
    }

    #[test]
    fn test_row_payload_keeps_confidence_numeric() {
        // The values payload must carry confidence_score as a JSON number,
        // so RAW input mode stores it as a number in the sheet.
        let table = build_table(&[crate::core::export::export_service::tests::sample_record(
            "text input",
        )]);
        let payload = json!({ "values": &table.rows });

        let confidence_col = table
            .headers
            .iter()
            .position(|h| h == "confidence_score")
            .unwrap();
        let cell = &payload["values"][0][confidence_col];
        assert!(cell.is_number(), "expected a JSON number, got {}", cell);
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits_before_auth() {
        // NoRecords comes back without touching credentials on disk.
        let sink = GoogleSheetsSink::new(GoogleAuthenticator::with_paths(
            "/nonexistent/credentials.json",
            "/nonexistent/token.json",
        ));

        let err = sink.export(&[], None).await.unwrap_err();
        assert!(matches!(err, ExportError::NoRecords));
    }
}
