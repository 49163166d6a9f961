//! Fixed-point helpers
//!
//! Token amounts and ratios share an 18-decimal scale (`WAD`). Reward
//! accumulators use a separate `ACC_PRECISION` so that `amount * acc` stays
//! inside u128 for realistic balances.

use crate::error::{LedgerError, Result};

/// 1.0 in 18-decimal fixed point
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis-point denominator (100% = 10_000)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Scale of accumulated-reward-per-share values
pub const ACC_PRECISION: u128 = 1_000_000_000_000;

/// Decimal places of every token handled by the ledger
pub const DECIMALS: u32 = 18;

/// `floor(a * b / d)` without overflowing when only the product is large.
///
/// Splits the larger operand by the denominator first, so the result is exact
/// whenever it fits in u128.
pub fn mul_div(a: u128, b: u128, d: u128, context: &'static str) -> Result<u128> {
    if d == 0 {
        return Err(LedgerError::MathOverflow(context));
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / d);
    }
    split_mul_div(a, b, d)
        .or_else(|| split_mul_div(b, a, d))
        .ok_or(LedgerError::MathOverflow(context))
}

fn split_mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    let q = a / d;
    let r = a % d;
    q.checked_mul(b)?.checked_add(r.checked_mul(b)? / d)
}

/// `ceil(a * b / d)`
pub fn mul_div_up(a: u128, b: u128, d: u128, context: &'static str) -> Result<u128> {
    let floor = mul_div(a, b, d, context)?;
    // a * b = (qa*d + ra)(qb*d + rb), so only ra * rb can leave a remainder
    let remainder = (a % d)
        .checked_mul(b % d)
        .map(|r| r % d)
        .ok_or(LedgerError::MathOverflow(context))?;
    if remainder == 0 {
        Ok(floor)
    } else {
        floor.checked_add(1).ok_or(LedgerError::MathOverflow(context))
    }
}

/// `a * b / WAD`
pub fn wad_mul(a: u128, b: u128, context: &'static str) -> Result<u128> {
    mul_div(a, b, WAD, context)
}

/// `a * b / WAD`, rounded up
pub fn wad_mul_up(a: u128, b: u128, context: &'static str) -> Result<u128> {
    mul_div_up(a, b, WAD, context)
}

/// `amount * bps / 10_000`
pub fn bps_of(amount: u128, bps: u32, context: &'static str) -> Result<u128> {
    mul_div(amount, bps as u128, BPS_DENOMINATOR, context)
}

/// Parse a non-negative decimal string ("0.813", "7500000") into WAD units
pub fn parse_wad(s: &str) -> Result<u128> {
    let s = s.trim();
    let invalid = || LedgerError::InvalidConfig(format!("not a decimal number: {s:?}"));

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > DECIMALS as usize {
        return Err(LedgerError::InvalidConfig(format!(
            "more than {DECIMALS} decimal places: {s:?}"
        )));
    }
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(invalid());
    }

    let whole_value: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_value: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = DECIMALS as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole_value
        .checked_mul(WAD)
        .and_then(|w| w.checked_add(frac_value))
        .ok_or(LedgerError::MathOverflow("parse_wad"))
}

/// Render a WAD value as a trimmed decimal string
pub fn format_wad(value: u128) -> String {
    let whole = value / WAD;
    let frac = value % WAD;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_wad() {
        assert_eq!(parse_wad("0.813").unwrap(), 813_000_000_000_000_000);
        assert_eq!(parse_wad("1").unwrap(), WAD);
        assert_eq!(parse_wad("7500000").unwrap(), 7_500_000 * WAD);
        assert_eq!(parse_wad(".5").unwrap(), WAD / 2);
        assert!(parse_wad("").is_err());
        assert!(parse_wad("-1").is_err());
        assert!(parse_wad("1.0000000000000000001").is_err());
    }

    #[test]
    fn test_format_wad() {
        assert_eq!(format_wad(813_000_000_000_000_000), "0.813");
        assert_eq!(format_wad(7_500_000 * WAD), "7500000");
        assert_eq!(format_wad(1), "0.000000000000000001");
    }

    #[test]
    fn test_mul_div_large_product() {
        // 7.5M tokens * 0.813 overflows a naive u128 product
        let budget = 7_500_000 * WAD;
        let decay = 813_000_000_000_000_000;
        assert!(budget.checked_mul(decay).is_none());
        assert_eq!(wad_mul(budget, decay, "test").unwrap(), 6_097_500 * WAD);
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(
            mul_div(1, 1, 0, "ctx"),
            Err(LedgerError::MathOverflow("ctx"))
        );
    }

    #[test]
    fn test_mul_div_up() {
        let ratio = parse_wad("1.5").unwrap();
        assert_eq!(wad_mul_up(3, ratio, "test").unwrap(), 5);
        assert_eq!(wad_mul_up(1, ratio, "test").unwrap(), 2);
        assert_eq!(wad_mul_up(100, ratio, "test").unwrap(), 150);
        assert_eq!(wad_mul(3, ratio, "test").unwrap(), 4);
        assert_eq!(mul_div_up(0, 7, 3, "test").unwrap(), 0);
        assert_eq!(
            mul_div_up(u128::MAX, 1, 1, "ctx").unwrap(),
            u128::MAX
        );
        assert_eq!(
            mul_div_up(1, 1, 0, "ctx"),
            Err(LedgerError::MathOverflow("ctx"))
        );
    }

    #[test]
    fn test_bps_of() {
        assert_eq!(bps_of(1_000, 5_000, "test").unwrap(), 500);
        assert_eq!(bps_of(999, 3_333, "test").unwrap(), 332);
    }

    proptest! {
        #[test]
        fn mul_div_matches_exact_product(a in 0u128..u64::MAX as u128, b in 0u128..u64::MAX as u128, d in 1u128..u64::MAX as u128) {
            prop_assert_eq!(mul_div(a, b, d, "prop").unwrap(), a * b / d);
        }

        #[test]
        fn mul_div_up_is_ceiling(a in 0u128..u64::MAX as u128, b in 0u128..u64::MAX as u128, d in 1u128..u64::MAX as u128) {
            let exact = a * b;
            let expected = exact / d + u128::from(exact % d != 0);
            prop_assert_eq!(mul_div_up(a, b, d, "prop").unwrap(), expected);
        }

        #[test]
        fn wad_mul_by_one_is_identity(a in 0u128..(u128::MAX / WAD)) {
            prop_assert_eq!(wad_mul(a, WAD, "prop").unwrap(), a);
        }
    }
}
