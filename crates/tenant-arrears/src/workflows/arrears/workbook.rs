use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use rust_xlsxwriter::Workbook;
use std::fmt;
use std::io::Cursor;

use super::ArrearsReportError;

/// Which uploaded workbook a read failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceInput {
    Arrears,
    Residents,
}

impl fmt::Display for SourceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceInput::Arrears => write!(f, "arrears list"),
            SourceInput::Residents => write!(f, "resident directory"),
        }
    }
}

/// A single spreadsheet cell, reduced to the shapes the report cares about.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(value) => render_number(*value),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(text) => CellValue::Text(text.clone()),
            Data::Float(value) => CellValue::Number(*value),
            Data::Int(value) => CellValue::Number(*value as f64),
            Data::Bool(value) => CellValue::Text(value.to_string()),
            Data::DateTime(value) => match value.as_datetime() {
                Some(datetime) => CellValue::Text(datetime.format("%Y/%m/%d").to_string()),
                None => CellValue::Number(value.as_f64()),
            },
            Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Integral floats print without a fractional part so `530902.0` reads as `530902`.
pub(crate) fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Zero-based column position addressed by its spreadsheet letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column(usize);

impl Column {
    /// Single-letter columns only (`A`..=`Z`).
    pub const fn from_letter(letter: char) -> Self {
        Self((letter as u32 - 'A' as u32) as usize)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    cells: Vec<CellValue>,
}

impl SheetRow {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Builds a row from `(column letter, value)` pairs, leaving gaps empty.
    pub fn with_cells<I, V>(cells: I) -> Self
    where
        I: IntoIterator<Item = (char, V)>,
        V: Into<CellValue>,
    {
        let mut row = Self::default();
        for (letter, value) in cells {
            let index = Column::from_letter(letter).index();
            if row.cells.len() <= index {
                row.cells.resize(index + 1, CellValue::Empty);
            }
            row.cells[index] = value.into();
        }
        row
    }

    pub fn cell(&self, column: Column) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(column.index()).unwrap_or(&EMPTY)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }
}

/// Rows of one worksheet from its first non-blank row onward. Columns keep
/// their absolute letters; `first_row` is the 1-based sheet number of `rows[0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    first_row: usize,
    rows: Vec<SheetRow>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<SheetRow>) -> Self {
        Self {
            name: name.into(),
            first_row: 1,
            rows,
        }
    }

    pub fn starting_at(mut self, first_row: usize) -> Self {
        self.first_row = first_row;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn first_row(&self) -> usize {
        self.first_row
    }

    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }
}

type SourceSheets<'a> = Sheets<Cursor<&'a [u8]>>;

fn open(bytes: &[u8], input: SourceInput) -> Result<SourceSheets<'_>, ArrearsReportError> {
    open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|source| ArrearsReportError::Workbook { input, source })
}

/// Reads the first worksheet of a workbook.
pub fn read_first_sheet(bytes: &[u8], input: SourceInput) -> Result<Sheet, ArrearsReportError> {
    let mut workbook = open(bytes, input)?;
    let name = workbook
        .sheet_names()
        .into_iter()
        .next()
        .ok_or(ArrearsReportError::EmptyWorkbook { input })?;
    load_sheet(&mut workbook, name, input)
}

/// Reads the worksheet whose name matches `name` exactly.
pub fn read_named_sheet(
    bytes: &[u8],
    name: &str,
    input: SourceInput,
) -> Result<Sheet, ArrearsReportError> {
    let mut workbook = open(bytes, input)?;
    if !workbook.sheet_names().iter().any(|sheet| sheet == name) {
        return Err(ArrearsReportError::MissingSheet {
            expected: name.to_string(),
        });
    }
    load_sheet(&mut workbook, name.to_string(), input)
}

fn load_sheet(
    workbook: &mut SourceSheets<'_>,
    name: String,
    input: SourceInput,
) -> Result<Sheet, ArrearsReportError> {
    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| ArrearsReportError::Workbook { input, source })?;
    let (first_row, rows) = materialize(&range);
    Ok(Sheet::new(name, rows).starting_at(first_row))
}

/// Leading blank rows are dropped so the header is always `rows[0]`, the way
/// a used-range read sees the sheet. Returns the 1-based number of that row.
fn materialize(range: &Range<Data>) -> (usize, Vec<SheetRow>) {
    let (Some((start_row, _)), Some((last_row, last_column))) = (range.start(), range.end())
    else {
        return (1, Vec::new());
    };

    let mut rows: Vec<SheetRow> = (start_row..=last_row)
        .map(|row| {
            let cells = (0..=last_column)
                .map(|column| {
                    range
                        .get_value((row, column))
                        .map(CellValue::from)
                        .unwrap_or_default()
                })
                .collect();
            SheetRow::new(cells)
        })
        .collect();

    let leading_blank = rows.iter().take_while(|row| row.is_blank()).count();
    rows.drain(..leading_blank);
    (start_row as usize + leading_blank + 1, rows)
}

/// Writes a single-sheet xlsx workbook and returns its bytes.
pub fn write_sheet<'a, I, const N: usize>(
    sheet_name: &str,
    rows: I,
) -> Result<Vec<u8>, ArrearsReportError>
where
    I: IntoIterator<Item = [&'a str; N]>,
{
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (row_index, row) in (0u32..).zip(rows) {
        for (column_index, value) in (0u16..).zip(row) {
            worksheet.write_string(row_index, column_index, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}
