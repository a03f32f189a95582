//! Conversions between raw integer quantities and human-scaled decimals.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::str::FromStr;

/// Number of decimals of the chain's native coin (wei → ether).
pub const NATIVE_DECIMALS: u32 = 18;

/// Parses a `0x`-prefixed hex quantity as returned by JSON-RPC nodes.
///
/// An empty quantity (`"0x"`) is zero.
pub fn parse_hex_quantity(raw: &str) -> Option<BigInt> {
    let digits = strip_hex_prefix(raw.trim())?;
    if digits.is_empty() {
        return Some(BigInt::from(0));
    }
    BigInt::parse_bytes(digits.as_bytes(), 16)
}

/// Same as [`parse_hex_quantity`], for quantities that fit a `u64` (block numbers, gas).
pub fn parse_hex_u64(raw: &str) -> Option<u64> {
    let digits = strip_hex_prefix(raw.trim())?;
    if digits.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Divides an integer amount by `10^decimals`.
pub fn scale_units(raw: BigInt, decimals: u32) -> BigDecimal {
    plain(BigDecimal::new(raw, i64::from(decimals)))
}

/// Drops trailing fractional zeros without going to a negative scale, so whole
/// amounts display as `1000` rather than in exponent form.
fn plain(value: BigDecimal) -> BigDecimal {
    let normalized = value.normalized();
    if normalized.as_bigint_and_exponent().1 < 0 {
        normalized.with_scale(0)
    } else {
        normalized
    }
}

/// Resolves a loosely formatted numeric string to a scaled amount.
///
/// Resolution order: a `0x`-prefixed string is read as hex; a plain decimal
/// (`digits` or `digits.digits`) is read as decimal; anything else is re-read as
/// unprefixed hex. Exponent forms such as `1e5` are hex, never scientific notation.
/// Returns `None` when no interpretation yields a number.
pub fn resolve_amount(raw: &str, decimals: u32) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(BigDecimal::from(0));
    }
    if strip_hex_prefix(trimmed).is_some() {
        return parse_hex_quantity(trimmed).map(|value| scale_units(value, decimals));
    }
    if is_plain_decimal(trimmed) {
        if let Ok(value) = BigDecimal::from_str(trimmed) {
            let divisor = BigDecimal::new(BigInt::from(1), i64::from(decimals));
            return Some(plain(value * divisor));
        }
    }
    BigInt::parse_bytes(trimmed.as_bytes(), 16).map(|value| scale_units(value, decimals))
}

/// `[0-9]+(\.[0-9]+)?`
fn is_plain_decimal(raw: &str) -> bool {
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    match raw.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(raw),
    }
}

/// Serializes amounts in plain notation (`0.000000000000000001`, never `1E-18`).
#[cfg(feature = "serde")]
pub mod plain_notation {
    use bigdecimal::BigDecimal;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_plain_string())
    }
}

fn strip_hex_prefix(raw: &str) -> Option<&str> {
    raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_quantities() {
        assert_eq!(parse_hex_u64("0x65"), Some(101));
        assert_eq!(parse_hex_u64("0x"), Some(0));
        assert_eq!(parse_hex_u64("65"), None);
        assert_eq!(
            parse_hex_quantity("0xde0b6b3a7640000"),
            Some(BigInt::from(1_000_000_000_000_000_000u64))
        );
    }

    #[test]
    fn one_ether_in_wei_scales_to_one() {
        let wei = BigInt::from(1_000_000_000_000_000_000u64);
        assert_eq!(scale_units(wei, NATIVE_DECIMALS), BigDecimal::from(1));
    }

    #[test]
    fn whole_amounts_display_without_exponent() {
        let wei = BigInt::from(1_000_000_000_000_000_000u64) * 1000;
        assert_eq!(scale_units(wei, NATIVE_DECIMALS).to_string(), "1000");
    }

    #[test]
    fn resolution_falls_back_to_hex_then_gives_up() {
        assert_eq!(resolve_amount("1500", 3), Some(BigDecimal::from_str("1.5").unwrap()));
        assert_eq!(resolve_amount("0x5dc", 3), Some(BigDecimal::from_str("1.5").unwrap()));
        assert_eq!(resolve_amount("5dc", 3), Some(BigDecimal::from_str("1.5").unwrap()));
        assert_eq!(resolve_amount("not-a-number", 18), None);
        assert_eq!(resolve_amount("0xzz", 18), None);
    }

    #[test]
    fn exponent_forms_are_read_as_hex() {
        assert_eq!(resolve_amount("1e5", 0), Some(BigDecimal::from(0x1e5)));
        assert_eq!(resolve_amount("1E5", 0), Some(BigDecimal::from(0x1e5)));
        assert_eq!(resolve_amount("1.5e3", 0), None);
        assert_eq!(resolve_amount(".5", 0), None);
        assert_eq!(resolve_amount("12.50", 1), Some(BigDecimal::from_str("1.25").unwrap()));
    }

    #[test]
    fn one_wei_renders_in_plain_notation() {
        let wei = scale_units(BigInt::from(1), NATIVE_DECIMALS);
        assert_eq!(wei.to_plain_string(), "0.000000000000000001");
        assert_eq!(
            scale_units(BigInt::from(0x1e5), NATIVE_DECIMALS).to_plain_string(),
            "0.000000000000000485"
        );
    }
}
