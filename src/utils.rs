use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a pt-BR formatted number (`1.234,56`, `-10,5`, `300`) into an exact decimal.
///
/// Dots are thousands separators and the comma is the decimal separator. A
/// trailing minus (`1.234,56-`) or surrounding parentheses mark a negative
/// figure. Returns `None` when the token is not a number.
pub fn parse_locale_decimal(token: &str) -> Option<Decimal> {
    let mut text = token.trim();
    if text.is_empty() {
        return None;
    }

    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') && text.len() > 2 {
        negative = true;
        text = &text[1..text.len() - 1];
    }
    if let Some(rest) = text.strip_suffix('-') {
        negative = !negative;
        text = rest;
    } else if let Some(rest) = text.strip_prefix('-') {
        negative = !negative;
        text = rest;
    } else if let Some(rest) = text.strip_prefix('+') {
        text = rest;
    }

    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }
    if text.matches(',').count() > 1 {
        return None;
    }

    let normalized = text.replace('.', "").replace(',', ".");
    if normalized.starts_with('.') || normalized.ends_with('.') {
        return None;
    }

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Renders a decimal with minimal digits and a comma separator: `27,5`, `200`, `0`.
pub fn format_decimal(value: Decimal) -> String {
    let normalized = value.normalize();
    let text = if normalized.is_zero() {
        "0".to_string()
    } else {
        normalized.to_string()
    };
    text.replace('.', ",")
}

/// Like [`format_decimal`] but renders an absent value as `0`.
pub fn format_optional_decimal(value: Option<Decimal>) -> String {
    value.map(format_decimal).unwrap_or_else(|| "0".to_string())
}

/// Converts a clock reading (`hh:mm` or `hh:mm:ss`) into decimal hours.
pub fn hours_from_clock(text: &str) -> Option<Decimal> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }

    let mut units = Vec::with_capacity(3);
    for part in &parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        units.push(Decimal::from_str(part).ok()?);
    }

    let hours = units[0];
    let minutes = units[1];
    let seconds = units.get(2).copied().unwrap_or(Decimal::ZERO);
    Some(hours + minutes / Decimal::from(60) + seconds / Decimal::from(3600))
}

/// Encodes text as ISO-8859-1. Characters outside Latin-1 become `?`.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code < 256 {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

/// Decodes ISO-8859-1 bytes. Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decodes UTF-8, falling back to Latin-1 for legacy exports.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => decode_latin1(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_locale_decimal() {
        assert_eq!(parse_locale_decimal("1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_locale_decimal("484,80"), Some(dec!(484.80)));
        assert_eq!(parse_locale_decimal("300"), Some(dec!(300)));
        assert_eq!(parse_locale_decimal("1.000"), Some(dec!(1000)));
        assert_eq!(parse_locale_decimal("0,00"), Some(dec!(0)));
    }

    #[test]
    fn test_parse_locale_decimal_negatives() {
        assert_eq!(parse_locale_decimal("-10,5"), Some(dec!(-10.5)));
        assert_eq!(parse_locale_decimal("10,5-"), Some(dec!(-10.5)));
        assert_eq!(parse_locale_decimal("(1.200,00)"), Some(dec!(-1200)));
    }

    #[test]
    fn test_parse_locale_decimal_rejects_garbage() {
        assert_eq!(parse_locale_decimal(""), None);
        assert_eq!(parse_locale_decimal("-"), None);
        assert_eq!(parse_locale_decimal("***"), None);
        assert_eq!(parse_locale_decimal("1,2,3"), None);
        assert_eq!(parse_locale_decimal("12a"), None);
        assert_eq!(parse_locale_decimal(",5"), None);
    }

    #[test]
    fn test_format_decimal_strips_trailing_zeros() {
        assert_eq!(format_decimal(dec!(27.50)), "27,5");
        assert_eq!(format_decimal(dec!(200.00)), "200");
        assert_eq!(format_decimal(dec!(200)), "200");
        assert_eq!(format_decimal(dec!(0.00)), "0");
        assert_eq!(format_decimal(dec!(-3.250)), "-3,25");
        assert_eq!(format_decimal(dec!(1234.5)), "1234,5");
        assert_eq!(format_optional_decimal(None), "0");
    }

    #[test]
    fn test_hours_from_clock() {
        assert_eq!(hours_from_clock("08:30"), Some(dec!(8.5)));
        assert_eq!(hours_from_clock("01:00:00"), Some(dec!(1)));
        assert_eq!(hours_from_clock("8h30"), None);
        assert_eq!(hours_from_clock("1:2:3:4"), None);
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(encode_latin1("PERÍODO"), b"PER\xcdODO".to_vec());
        assert_eq!(encode_latin1("€"), b"?".to_vec());
        assert_eq!(decode_text(b"PER\xcdODO"), "PERÍODO");
        assert_eq!(decode_text("PERÍODO".as_bytes()), "PERÍODO");
    }
}
