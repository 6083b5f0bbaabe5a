//! Passenger phone validation.
//!
//! Accepts Kazakhstani mobile numbers in the `+7...`, `8...`, or bare
//! `7...` forms and normalizes them to `+7XXXXXXXXXX`.

/// Mobile operator codes accepted as the first three significant digits.
const OPERATOR_CODES: [&str; 13] = [
    "707", "775", "701", "702", "747", "705", "708", "700", "776", "771", "778", "706", "777",
];

/// Validate and normalize a phone number.
///
/// Returns the canonical `+7XXXXXXXXXX` form, or `None` if the input is not
/// a recognizable Kazakhstani mobile number.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let digits = if let Some(rest) = cleaned.strip_prefix("+7") {
        rest
    } else if let Some(rest) = cleaned.strip_prefix('8') {
        rest
    } else if cleaned.len() == 11 && cleaned.starts_with('7') {
        &cleaned[1..]
    } else {
        &cleaned
    };

    if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    if !OPERATOR_CODES.contains(&&digits[..3]) {
        return None;
    }

    Some(format!("+7{digits}"))
}
