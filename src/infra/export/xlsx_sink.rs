// Local file sink: writes a batch as a single-sheet .xlsx workbook.

use crate::core::analysis::AnalysisRecord;
use crate::core::export::{build_table, Cell, ExportError, ExportSink, ExportTable};
use async_trait::async_trait;
use chrono::Local;
use rust_xlsxwriter::Workbook;
use std::path::PathBuf;

/// Column widths are sized to the longest value, capped here for
/// readability.
const MAX_COLUMN_WIDTH: usize = 50;

const SHEET_NAME: &str = "Analysis Results";

pub struct XlsxSink {
    output_dir: PathBuf,
}

impl XlsxSink {
    /// Sink writing into the current working directory.
    pub fn new() -> Self {
        Self::with_output_dir(".")
    }

    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl Default for XlsxSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-supplied name, or an auto-generated timestamped one; `.xlsx` is
/// appended when missing.
fn resolve_file_name(name: Option<&str>) -> String {
    let mut filename = match name {
        Some(name) => name.to_string(),
        None => format!(
            "analysis_results_{}",
            Local::now().format("%Y%m%d_%H%M%S")
        ),
    };

    if !filename.ends_with(".xlsx") {
        filename.push_str(".xlsx");
    }

    filename
}

/// Longest cell in the column (header included), plus padding, capped.
fn column_width(table: &ExportTable, col: usize) -> f64 {
    let longest = table
        .rows
        .iter()
        .map(|row| row[col].to_string().chars().count())
        .chain(std::iter::once(table.headers[col].chars().count()))
        .max()
        .unwrap_or(0);

    (longest + 2).min(MAX_COLUMN_WIDTH) as f64
}

#[async_trait]
impl ExportSink for XlsxSink {
    async fn export(
        &self,
        records: &[AnalysisRecord],
        name: Option<&str>,
    ) -> Result<String, ExportError> {
        if records.is_empty() {
            tracing::error!("❌ No results to export");
            return Err(ExportError::NoRecords);
        }

        tracing::info!("📝 Exporting results to Excel...");

        let table = build_table(records);
        let path = self.output_dir.join(resolve_file_name(name));

        let mut workbook = Workbook::new();
        let worksheet = workbook
            .add_worksheet()
            .set_name(SHEET_NAME)
            .map_err(|e| ExportError::Write(e.to_string()))?;

        for (col, header) in table.headers.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, header)
                .map_err(|e| ExportError::Write(e.to_string()))?;
        }

        for (i, row) in table.rows.iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                // Numbers go in as numbers so the column stays sortable.
                match cell {
                    Cell::Number(n) => worksheet.write_number(i as u32 + 1, col as u16, *n),
                    Cell::Text(s) => worksheet.write_string(i as u32 + 1, col as u16, s),
                }
                .map_err(|e| ExportError::Write(e.to_string()))?;
            }
        }

        for col in 0..table.headers.len() {
            worksheet
                .set_column_width(col as u16, column_width(&table, col))
                .map_err(|e| ExportError::Write(e.to_string()))?;
        }

        workbook
            .save(&path)
            .map_err(|e| ExportError::Write(e.to_string()))?;

        tracing::info!("Results exported to: {}", path.display());
        tracing::info!("Total rows: {}", table.rows.len());

        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::export_service::tests::sample_record;

    #[test]
    fn test_resolve_file_name_auto_generated() {
        let name = resolve_file_name(None);
        assert!(name.starts_with("analysis_results_"));
        assert!(name.ends_with(".xlsx"));
        // analysis_results_YYYYMMDD_HHMMSS.xlsx
        assert_eq!(name.len(), "analysis_results_".len() + 15 + ".xlsx".len());
    }

    #[test]
    fn test_resolve_file_name_appends_extension_once() {
        assert_eq!(resolve_file_name(Some("report")), "report.xlsx");
        assert_eq!(resolve_file_name(Some("report.xlsx")), "report.xlsx");
    }

    #[test]
    fn test_column_width_is_capped() {
        let mut record = sample_record("src");
        record.summary = "s".repeat(200);
        let table = build_table(&[record]);

        let summary_col = table.headers.iter().position(|h| h == "summary").unwrap();
        assert_eq!(column_width(&table, summary_col), MAX_COLUMN_WIDTH as f64);

        // Short columns get value length + padding.
        let sentiment_col = table.headers.iter().position(|h| h == "sentiment").unwrap();
        assert_eq!(column_width(&table, sentiment_col), ("sentiment".len() + 2) as f64);
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = XlsxSink::with_output_dir(dir.path());

        let err = sink.export(&[], None).await.unwrap_err();
        assert!(matches!(err, ExportError::NoRecords));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_export_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let sink = XlsxSink::with_output_dir(dir.path());
        let records = vec![sample_record("first"), sample_record("second")];

        let path = sink.export(&records, Some("batch")).await.unwrap();

        assert!(path.ends_with("batch.xlsx"));
        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.len() > 0);
    }
}
