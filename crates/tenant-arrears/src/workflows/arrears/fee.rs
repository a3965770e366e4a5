use serde::Serialize;
use std::fmt;

use super::workbook::CellValue;

/// Parking-space cleaning is billed in whole multiples of this amount.
const PARKING_FEE_UNIT: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeCategory {
    ParkingCleaning,
    PropertyManagement,
}

impl FeeCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ParkingCleaning => "車位清潔費",
            Self::PropertyManagement => "房屋管理費",
        }
    }
}

impl fmt::Display for FeeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Nonzero multiples of 500 are parking-space cleaning fees; everything else,
/// including NaN, is a property management fee.
pub fn classify_fee(amount: f64) -> FeeCategory {
    if amount != 0.0 && amount % PARKING_FEE_UNIT == 0.0 {
        FeeCategory::ParkingCleaning
    } else {
        FeeCategory::PropertyManagement
    }
}

/// Reads an amount cell. Text has its thousands separators removed and is
/// parsed from its leading numeric prefix, exponent included; empty cells have
/// no amount.
pub fn parse_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(value) => Some(*value),
        CellValue::Text(text) => parse_leading_float(&text.replace(',', "")),
        CellValue::Empty => None,
    }
}

fn parse_leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut end = 0;
    let bytes = text.as_bytes();

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let integer_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - integer_start;

    if bytes.get(end) == Some(&b'.') {
        let fraction_start = end + 1;
        let mut cursor = fraction_start;
        while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
            cursor += 1;
        }
        digits += cursor - fraction_start;
        if cursor > fraction_start || end > integer_start {
            end = cursor;
        }
    }

    if digits == 0 {
        return None;
    }

    // An exponent only counts when at least one digit follows the marker.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut cursor = end + 1;
        if matches!(bytes.get(cursor), Some(b'+' | b'-')) {
            cursor += 1;
        }
        let exponent_start = cursor;
        while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
            cursor += 1;
        }
        if cursor > exponent_start {
            end = cursor;
        }
    }

    text[..end].parse().ok()
}

/// Renders an amount with `,` thousands grouping and at most three decimals.
pub fn format_amount(amount: f64) -> String {
    let rounded = format!("{:.3}", amount.abs());
    let (integer, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let is_zero = integer.bytes().all(|digit| digit == b'0') && fraction.is_empty();
    let sign = if amount.is_sign_negative() && !is_zero {
        "-"
    } else {
        ""
    };

    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction}")
    }
}
