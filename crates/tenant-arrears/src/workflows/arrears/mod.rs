//! Merges the management-fee arrears list with the resident directory.
//!
//! The arrears workbook (first sheet) supplies unit codes in column C, billing
//! periods in H and amounts in K. The resident workbook must carry the named
//! directory sheet with addresses in C, names in H and phones in I. Each arrears
//! row is decoded into a street address, joined to the directory and written to
//! a single-sheet xlsx report.

pub mod address;
pub mod fee;
pub mod period;
pub mod phone;
pub mod report;
pub mod residents;
pub mod workbook;

use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::info;

use crate::config::ReportConfig;

pub use address::{format_address, AddressCode, AddressCodeError};
pub use fee::{classify_fee, format_amount, parse_amount, FeeCategory};
pub use period::format_fee_period;
pub use phone::format_phone_number;
pub use report::{
    ArrearsReport, ArrearsReportSummary, ReportBuilder, ReportRow, RowWarning, RowWarningKind,
    REPORT_HEADER,
};
pub use residents::{ResidentContact, ResidentIndex, ResidentRecord};
pub use workbook::{CellValue, Column, Sheet, SheetRow, SourceInput};

/// Failures that abort a report run. Row-level problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ArrearsReportError {
    #[error("failed to read {input} from '{}': {source}", .path.display())]
    Io {
        input: SourceInput,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{input} is not a readable spreadsheet: {source}")]
    Workbook {
        input: SourceInput,
        #[source]
        source: calamine::Error,
    },
    #[error("{input} workbook contains no worksheets")]
    EmptyWorkbook { input: SourceInput },
    #[error("resident workbook is missing required sheet \"{expected}\"")]
    MissingSheet { expected: String },
    #[error("failed to write report workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}

/// Finished report: the merged rows plus the encoded xlsx workbook.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub report: ArrearsReport,
    pub workbook: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ArrearsReportGenerator {
    resident_sheet: String,
    output_sheet: String,
}

impl Default for ArrearsReportGenerator {
    fn default() -> Self {
        Self::new(&ReportConfig::default())
    }
}

impl ArrearsReportGenerator {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            resident_sheet: config.resident_sheet.clone(),
            output_sheet: config.output_sheet.clone(),
        }
    }

    pub fn resident_sheet(&self) -> &str {
        &self.resident_sheet
    }

    /// Download name for a report produced on `date`, e.g. `處理結果_2026-01-31.xlsx`.
    pub fn report_file_name(&self, date: NaiveDate) -> String {
        format!("{}_{}.xlsx", self.output_sheet, date.format("%Y-%m-%d"))
    }

    /// Decodes both workbooks, then merges them. Both inputs are fully read
    /// before any row is transformed, so a fatal error never leaves partial output.
    pub fn generate(
        &self,
        arrears: &[u8],
        residents: &[u8],
    ) -> Result<GeneratedReport, ArrearsReportError> {
        let arrears_sheet = workbook::read_first_sheet(arrears, SourceInput::Arrears)?;
        let resident_sheet =
            workbook::read_named_sheet(residents, &self.resident_sheet, SourceInput::Residents)?;

        let index = ResidentIndex::from_sheet(&resident_sheet);
        let report = ReportBuilder::new(&index)
            .starting_at(arrears_sheet.first_row())
            .build(arrears_sheet.rows());
        let workbook = workbook::write_sheet(&self.output_sheet, report.output_rows())?;

        let summary = report.summary();
        info!(
            arrears_sheet = arrears_sheet.name(),
            residents = index.len(),
            rows = summary.rows_written,
            unmatched = summary.unmatched_residents,
            warnings = summary.warnings,
            "arrears report generated"
        );

        Ok(GeneratedReport { report, workbook })
    }
}
