use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use super::address::AddressCode;
use super::fee::{classify_fee, format_amount, parse_amount, FeeCategory};
use super::period::format_fee_period;
use super::phone::format_phone_number;
use super::residents::{ResidentContact, ResidentIndex};
use super::workbook::{CellValue, Column, SheetRow};

const ADDRESS_CODE_COLUMN: Column = Column::from_letter('C');
const PERIOD_COLUMN: Column = Column::from_letter('H');
const AMOUNT_COLUMN: Column = Column::from_letter('K');

pub const REPORT_COLUMNS: usize = 6;

pub const REPORT_HEADER: [&str; REPORT_COLUMNS] = [
    "地址",
    "住戶姓名",
    "費用欠繳期間",
    "欠繳名目",
    "欠費總金額",
    "連絡方式",
];

/// One merged output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub address: String,
    pub resident_name: String,
    pub fee_period: String,
    pub fee_category: FeeCategory,
    pub display_amount: String,
    pub display_phone: String,
}

impl ReportRow {
    pub fn cells(&self) -> [&str; REPORT_COLUMNS] {
        [
            self.address.as_str(),
            self.resident_name.as_str(),
            self.fee_period.as_str(),
            self.fee_category.label(),
            self.display_amount.as_str(),
            self.display_phone.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowWarningKind {
    MalformedAddressCode { raw: String, reason: String },
    MalformedAmount { raw: String },
}

/// A data row that was left out of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    /// 1-based sheet row number.
    pub row: usize,
    #[serde(flatten)]
    pub kind: RowWarningKind,
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RowWarningKind::MalformedAddressCode { raw, reason } => {
                write!(f, "row {}: invalid address code '{}' ({})", self.row, raw, reason)
            }
            RowWarningKind::MalformedAmount { raw } => {
                write!(f, "row {}: amount '{}' is not a number", self.row, raw)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArrearsReportSummary {
    pub rows_written: usize,
    pub skipped_without_code: usize,
    pub unmatched_residents: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrearsReport {
    pub rows: Vec<ReportRow>,
    pub warnings: Vec<RowWarning>,
    pub skipped_without_code: usize,
    pub unmatched_residents: usize,
}

impl ArrearsReport {
    /// Header followed by the data rows, ready for the sheet writer.
    pub fn output_rows(&self) -> impl Iterator<Item = [&str; REPORT_COLUMNS]> + '_ {
        std::iter::once(REPORT_HEADER).chain(self.rows.iter().map(ReportRow::cells))
    }

    pub fn summary(&self) -> ArrearsReportSummary {
        ArrearsReportSummary {
            rows_written: self.rows.len(),
            skipped_without_code: self.skipped_without_code,
            unmatched_residents: self.unmatched_residents,
            warnings: self.warnings.len(),
        }
    }
}

/// Joins arrears rows against the resident index.
pub struct ReportBuilder<'a> {
    residents: &'a ResidentIndex,
    first_row: usize,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(residents: &'a ResidentIndex) -> Self {
        Self {
            residents,
            first_row: 1,
        }
    }

    /// Sheet row number of the header, used when numbering warnings.
    pub fn starting_at(mut self, first_row: usize) -> Self {
        self.first_row = first_row;
        self
    }

    /// Walks the arrears sheet rows in order, skipping the header row.
    pub fn build<'r, I>(&self, rows: I) -> ArrearsReport
    where
        I: IntoIterator<Item = &'r SheetRow>,
    {
        let mut report = ArrearsReport::default();

        for (index, row) in rows.into_iter().enumerate().skip(1) {
            let sheet_row = self.first_row + index;
            let code_cell = row.cell(ADDRESS_CODE_COLUMN);
            if is_absent_code(code_cell) {
                report.skipped_without_code += 1;
                continue;
            }

            let code = match AddressCode::parse(&code_cell.to_text()) {
                Ok(code) => code,
                Err(err) => {
                    record_warning(
                        &mut report,
                        sheet_row,
                        RowWarningKind::MalformedAddressCode {
                            raw: code_cell.to_text(),
                            reason: err.to_string(),
                        },
                    );
                    continue;
                }
            };

            let amount_cell = row.cell(AMOUNT_COLUMN);
            let Some(amount) = parse_amount(amount_cell) else {
                record_warning(
                    &mut report,
                    sheet_row,
                    RowWarningKind::MalformedAmount {
                        raw: amount_cell.to_text(),
                    },
                );
                continue;
            };

            let address = code.canonical_address();
            let contact = match self.residents.lookup(&address) {
                Some(contact) => contact.clone(),
                None => {
                    debug!(row = sheet_row, %address, "no resident registered for address");
                    report.unmatched_residents += 1;
                    ResidentContact::default()
                }
            };

            report.rows.push(ReportRow {
                fee_period: format_fee_period(&row.cell(PERIOD_COLUMN).to_text()),
                fee_category: classify_fee(amount),
                display_amount: format_amount(amount),
                display_phone: format_phone_number(&contact.phone),
                resident_name: contact.name,
                address,
            });
        }

        report
    }
}

/// Empty cells and a numeric zero both mean "no unit on this row".
fn is_absent_code(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(value) => *value == 0.0,
        other => other.is_blank(),
    }
}

fn record_warning(report: &mut ArrearsReport, row: usize, kind: RowWarningKind) {
    let warning = RowWarning { row, kind };
    warn!(row, "skipping arrears row: {warning}");
    report.warnings.push(warning);
}
