use std::fmt;
use std::str::FromStr;

const ROAD_PREFIX: &str = "新北市新店區中央路";
const CODE_WIDTH: usize = 6;

/// Unit code from the arrears list, zero-padded to six digits.
///
/// Digit layout is `AB C D E F`: building `1AB`, floor `CD`, unit suffix `EF`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressCode(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressCodeError {
    #[error("address code is empty")]
    Empty,
    #[error("address code '{0}' contains non-digit characters")]
    NonNumeric(String),
    #[error("address code '{0}' has more than six digits")]
    TooLong(String),
}

impl AddressCode {
    pub fn parse(raw: &str) -> Result<Self, AddressCodeError> {
        let digits = raw.trim();
        if digits.is_empty() {
            return Err(AddressCodeError::Empty);
        }
        if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(AddressCodeError::NonNumeric(digits.to_string()));
        }
        if digits.len() > CODE_WIDTH {
            return Err(AddressCodeError::TooLong(digits.to_string()));
        }

        Ok(Self(format!("{digits:0>width$}", width = CODE_WIDTH)))
    }

    pub fn from_number(value: u32) -> Result<Self, AddressCodeError> {
        Self::parse(&value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expands the code into the street address used as the resident join key.
    pub fn canonical_address(&self) -> String {
        let code = self.as_str();
        let building = &code[0..2];
        let (c, d, e, f) = (&code[2..3], &code[3..4], &code[4..5], &code[5..6]);

        let floor = if c == "0" {
            d.to_string()
        } else {
            format!("{c}{d}")
        };

        let unit = match (e, f) {
            ("0", "0") => String::new(),
            ("0", f) => format!("之{f}"),
            (e, f) => format!("之{e}{f}"),
        };

        format!("{ROAD_PREFIX}1{building}號{floor}樓{unit}")
    }
}

impl FromStr for AddressCode {
    type Err = AddressCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for AddressCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn format_address(code: &AddressCode) -> String {
    code.canonical_address()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(raw: &str) -> String {
        format_address(&AddressCode::parse(raw).expect("valid code"))
    }

    #[test]
    fn expands_floor_and_single_digit_unit() {
        let code = AddressCode::from_number(530902).expect("numeric code");
        assert_eq!(format_address(&code), "新北市新店區中央路153號9樓之2");
    }

    #[test]
    fn omits_unit_when_suffix_is_zero() {
        assert_eq!(address("530900"), "新北市新店區中央路153號9樓");
    }

    #[test]
    fn keeps_two_digit_floor_and_unit() {
        assert_eq!(address("541211"), "新北市新店區中央路154號12樓之11");
        assert_eq!(address("531010"), "新北市新店區中央路153號10樓之10");
    }

    #[test]
    fn pads_short_codes_with_leading_zeros() {
        let code = AddressCode::parse("1203").expect("short code");
        assert_eq!(code.as_str(), "001203");
        assert_eq!(format_address(&code), "新北市新店區中央路100號12樓之3");
    }

    #[test]
    fn reparsing_the_padded_code_is_stable() {
        let code = AddressCode::parse("70501").expect("short code");
        let reparsed: AddressCode = code.to_string().parse().expect("padded code");
        assert_eq!(code, reparsed);
        assert_eq!(format_address(&code), format_address(&reparsed));
    }

    #[test]
    fn rejects_codes_outside_the_six_digit_layout() {
        assert_eq!(AddressCode::parse("  "), Err(AddressCodeError::Empty));
        assert_eq!(
            AddressCode::parse("53a902"),
            Err(AddressCodeError::NonNumeric("53a902".to_string()))
        );
        assert_eq!(
            AddressCode::parse("5309021"),
            Err(AddressCodeError::TooLong("5309021".to_string()))
        );
    }
}
