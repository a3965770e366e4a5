/// Normalizes a phone number for display.
///
/// Mobile numbers (`09…`) become `0912-345-678`, everything else with at least
/// ten digits becomes `02-2345-6789`. A bare leading `9` is treated as a mobile
/// number that lost its leading zero. The trailing group keeps every remaining
/// digit, and shorter inputs come back as their digits only.
pub fn format_phone_number(raw: &str) -> String {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.starts_with('9') {
        digits.insert(0, '0');
    }

    if digits.len() < 10 {
        return digits;
    }

    if digits.starts_with("09") {
        format!("{}-{}-{}", &digits[..4], &digits[4..7], &digits[7..])
    } else {
        format!("{}-{}-{}", &digits[..2], &digits[2..6], &digits[6..])
    }
}
