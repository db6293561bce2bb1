//! Numeric literal scanning.
//!
//! A literal is scanned in four parts: radix prefix, digit run (with `'`
//! separators), an optional fraction and exponent that make it a float, and
//! a trailing suffix made of identifier characters. The suffix is kept in
//! the spelling and decoded by the parser.

use super::token::LiteralValue;
use crate::error::LexErrorKind;

/// Result of scanning one numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberScan {
    /// Bytes consumed, suffix included
    pub len: usize,
    pub radix: u32,
    pub is_float: bool,
    pub value: LiteralValue,
    /// Offset where the suffix starts; equals `len` when there is none.
    pub suffix_start: usize,
    /// Set when the literal is malformed; `value` is then meaningless.
    pub error: Option<LexErrorKind>,
}

pub fn is_number_start(input: &[u8]) -> bool {
    match input.first() {
        Some(b) if b.is_ascii_digit() => true,
        Some(b'.') => input.get(1).is_some_and(u8::is_ascii_digit),
        _ => false,
    }
}

/// Scan the literal at the start of `input`, which must satisfy
/// [`is_number_start`]. Integer values wrap modulo 2^64.
pub fn scan_number(input: &[u8]) -> NumberScan {
    let mut radix = 10;
    let mut digits_start = 0;

    if input.first() == Some(&b'0') {
        match input.get(1).map(|b| b | 0x20) {
            Some(b'x') => {
                radix = 16;
                digits_start = 2;
            }
            Some(b'b') => {
                radix = 2;
                digits_start = 2;
            }
            _ if input.get(1).is_some_and(u8::is_ascii_digit) => {
                radix = 8;
                digits_start = 1;
            }
            _ => {}
        }
    }

    let mut pos = scan_digits(input, digits_start, if radix == 8 { 10 } else { radix });

    if radix == 8 {
        // 0-prefixed literals are only octal if they stay integers
        if matches!(input.get(pos), Some(b'.' | b'e' | b'E')) {
            radix = 10;
            digits_start = 0;
        } else {
            pos = scan_digits(input, digits_start, 8);
        }
    }
    let digits_end = pos;

    let mut is_float = false;
    let mut frac_digits = 0;
    if (radix == 10 || radix == 16) && input.get(pos) == Some(&b'.') {
        is_float = true;
        let frac_start = pos + 1;
        pos = scan_digits(input, frac_start, radix);
        frac_digits = input[frac_start..pos].iter().filter(|&&b| b != b'\'').count();
    }

    let mut exponent_start = None;
    let mut error = None;
    if let Some(&e) = input.get(pos) {
        let e = e | 0x20;
        if (radix == 10 && e == b'e') || (radix == 16 && e == b'p') {
            is_float = true;
            pos += 1;
            if matches!(input.get(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            exponent_start = Some(pos);
            let digits_at = pos;
            pos = scan_digits(input, pos, 10);
            if pos == digits_at {
                error = Some(LexErrorKind::MissingExponent);
            }
        }
    }

    let suffix_start = pos;
    while input.get(pos).is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_') {
        pos += 1;
    }

    let value = if !is_float {
        LiteralValue::Int(integer_value(&input[digits_start..digits_end], radix))
    } else if radix == 16 {
        let mantissa: Vec<u8> = input[digits_start..suffix_start]
            .iter()
            .copied()
            .take_while(|&b| b | 0x20 != b'p')
            .collect();
        let exponent = exponent_start.map_or(0, |start| {
            let sign_at = start.saturating_sub(1);
            let negative = input.get(sign_at) == Some(&b'-');
            let magnitude = integer_value(&input[start..suffix_start], 10).min(i32::MAX as u64) as i32;
            if negative {
                -magnitude
            } else {
                magnitude
            }
        });
        LiteralValue::Float(hex_float_value(&mantissa, frac_digits, exponent))
    } else {
        let text: String = input[..suffix_start]
            .iter()
            .filter(|&&b| b != b'\'')
            .map(|&b| b as char)
            .collect();
        match text.parse() {
            Ok(v) => LiteralValue::Float(v),
            Err(_) => {
                error = error.or(Some(LexErrorKind::MissingExponent));
                LiteralValue::None
            }
        }
    };

    NumberScan {
        len: pos,
        radix,
        is_float,
        value,
        suffix_start,
        error,
    }
}

fn digit_value(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}

fn is_radix_digit(b: u8, radix: u32) -> bool {
    digit_value(b).is_some_and(|d| d < radix)
}

fn scan_digits(input: &[u8], mut pos: usize, radix: u32) -> usize {
    while let Some(&b) = input.get(pos) {
        if is_radix_digit(b, radix) {
            pos += 1;
        } else if b == b'\''
            && pos > 0
            && is_radix_digit(input[pos - 1], radix)
            && input.get(pos + 1).is_some_and(|&n| is_radix_digit(n, radix))
        {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}

fn integer_value(digits: &[u8], radix: u32) -> u64 {
    digits
        .iter()
        .filter_map(|&b| digit_value(b).filter(|&d| d < radix))
        .fold(0u64, |acc, d| acc.wrapping_mul(radix as u64).wrapping_add(d as u64))
}

fn hex_float_value(mantissa: &[u8], frac_digits: usize, exponent: i32) -> f64 {
    let m = mantissa
        .iter()
        .filter_map(|&b| digit_value(b))
        .fold(0f64, |acc, d| acc * 16.0 + d as f64);
    let scale = exponent.saturating_sub((frac_digits as i32).saturating_mul(4));
    m * 2f64.powi(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0x1F", 16, 31)]
    #[case("0X1f", 16, 31)]
    #[case("0b101", 2, 5)]
    #[case("017", 8, 15)]
    #[case("0", 10, 0)]
    #[case("1'000'000", 10, 1_000_000)]
    #[case("18446744073709551617", 10, 1)]
    fn test_integer_radix(#[case] text: &str, #[case] radix: u32, #[case] value: u64) {
        let scan = scan_number(text.as_bytes());
        assert_eq!(scan.radix, radix);
        assert!(!scan.is_float);
        assert_eq!(scan.len, text.len());
        assert_eq!(scan.value, LiteralValue::Int(value));
    }

    #[rstest]
    #[case("1.5", 1.5)]
    #[case(".25", 0.25)]
    #[case("2e3", 2000.0)]
    #[case("1.e-2", 0.01)]
    #[case("09.5", 9.5)]
    #[case("0x1.8p1", 3.0)]
    #[case("0x10p-2", 4.0)]
    fn test_float_values(#[case] text: &str, #[case] value: f64) {
        let scan = scan_number(text.as_bytes());
        assert!(scan.is_float);
        assert_eq!(scan.len, text.len());
        assert_eq!(scan.value, LiteralValue::Float(value));
    }

    #[test]
    fn test_suffix_is_consumed() {
        let scan = scan_number(b"42ull;");
        assert_eq!(scan.len, 5);
        assert_eq!(scan.suffix_start, 2);
        assert_eq!(scan.value, LiteralValue::Int(42));

        let scan = scan_number(b"1.5f)");
        assert!(scan.is_float);
        assert_eq!(scan.suffix_start, 3);
        assert_eq!(scan.len, 4);
    }

    #[rstest]
    #[case("1e")]
    #[case("2.5e+")]
    #[case("0x1p")]
    fn test_exponent_without_digits(#[case] text: &str) {
        let scan = scan_number(text.as_bytes());
        assert_eq!(scan.error, Some(LexErrorKind::MissingExponent));
        assert_eq!(scan.len, text.len());
    }

    #[test]
    fn test_bad_octal_digit_lands_in_suffix() {
        let scan = scan_number(b"09");
        assert_eq!(scan.radix, 8);
        assert_eq!(scan.suffix_start, 1);
        assert_eq!(scan.len, 2);
    }

    #[test]
    fn test_number_start() {
        assert!(is_number_start(b"7"));
        assert!(is_number_start(b".5"));
        assert!(!is_number_start(b"..."));
        assert!(!is_number_start(b"x1"));
    }
}
