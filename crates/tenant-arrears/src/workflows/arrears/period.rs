use std::fmt;

/// Offset between Gregorian years and Republic-of-China (民國) years.
const ROC_YEAR_OFFSET: i64 = 1911;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RocMonth {
    year: i64,
    month: i64,
}

impl RocMonth {
    const ZERO: Self = Self { year: 0, month: 0 };

    /// Parses `YYYY/MM/DD` (day ignored). Anything without a usable year and
    /// month degrades to `0年0月` rather than failing.
    fn parse(date: &str) -> Self {
        let mut parts = date.trim().split('/');
        let (Some(year), Some(month)) = (parts.next(), parts.next()) else {
            return Self::ZERO;
        };

        match (leading_integer(year), leading_integer(month)) {
            (Some(year), Some(month)) => Self {
                year: year - ROC_YEAR_OFFSET,
                month,
            },
            _ => Self::ZERO,
        }
    }
}

impl fmt::Display for RocMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}年{}月", self.year, self.month)
    }
}

fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (sign, rest) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().map(|number| sign * number)
}

/// Converts `YYYY/MM/DD~YYYY/MM/DD` into a Republic-era month range such as
/// `115年1月至115年2月`. Ranges inside a single month collapse to `115年1月`.
pub fn format_fee_period(range: &str) -> String {
    if range.is_empty() {
        return String::new();
    }

    let mut parts = range.split('~');
    let start = parts.next().map(str::trim).unwrap_or_default();
    if start.is_empty() {
        return range.to_string();
    }

    let start = RocMonth::parse(start);
    let end = parts
        .next()
        .map(str::trim)
        .filter(|end| !end.is_empty())
        .map(RocMonth::parse);

    match end {
        Some(end) if end != start => format!("{start}至{end}"),
        _ => start.to_string(),
    }
}
