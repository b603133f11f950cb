// Shared export machinery for the two sinks (local .xlsx file and Google
// Sheets). Both write the same tabular view of a batch, built here: key
// points flattened to a single delimited cell, columns in a fixed relative
// order, and columns that no record populates dropped entirely.

use crate::core::analysis::AnalysisRecord;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Delimiter used when flattening a key-point list into one cell.
pub const KEY_POINT_DELIMITER: &str = " | ";

/// Relative column order shared by both sinks. A column is only emitted
/// when at least one record carries a non-empty value for it.
const COLUMN_ORDER: [&str; 8] = [
    "timestamp",
    "input_source",
    "sentiment",
    "confidence_score",
    "summary",
    "key_points",
    "analysis_type",
    "original_text",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No results to export")]
    NoRecords,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Write failed: {0}")]
    Write(String),
    #[error("Remote sheet error: {0}")]
    Remote(String),
}

/// An export destination. Implementations write the whole batch in one
/// call and return an identifier for the written artifact - a file path
/// for the local sink, a shareable URL for the cloud sink.
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn export(
        &self,
        records: &[AnalysisRecord],
        name: Option<&str>,
    ) -> Result<String, ExportError>;
}

/// One exported cell. The distinction matters to the sinks: numeric
/// values (the confidence score) are written as numbers so the column
/// stays sortable, everything else as text. Serializes untagged, so a
/// JSON values payload carries plain numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The flattened tabular view of a batch: one header row plus one data
/// row per record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Builds the shared tabular view for a batch of records.
pub fn build_table(records: &[AnalysisRecord]) -> ExportTable {
    let headers: Vec<String> = COLUMN_ORDER
        .iter()
        .filter(|column| records.iter().any(|r| field_value(r, column).is_some()))
        .map(|column| column.to_string())
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|column| {
                    field_value(record, column).unwrap_or_else(|| Cell::Text(String::new()))
                })
                .collect()
        })
        .collect();

    ExportTable { headers, rows }
}

/// One field of a record as an export cell, or `None` when the field is
/// empty and therefore should not force its column into the output.
fn field_value(record: &AnalysisRecord, column: &str) -> Option<Cell> {
    let value = match column {
        "timestamp" => record.timestamp.clone(),
        "input_source" => record.input_source.clone(),
        "sentiment" => record.sentiment.clone(),
        // The score is numeric and always present on a parsed record.
        "confidence_score" => return Some(Cell::Number(record.confidence_score)),
        "summary" => record.summary.clone(),
        "key_points" => record.key_points.join(KEY_POINT_DELIMITER),
        "analysis_type" => record.analysis_type.clone(),
        "original_text" => record.original_text.clone(),
        _ => return None,
    };

    (!value.is_empty()).then(|| Cell::Text(value))
}
