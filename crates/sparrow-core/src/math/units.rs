//! Decimal unit conversion
//!
//! Amounts cross the contract boundary as integer base units. These helpers
//! are the only place decimal strings are turned into base units (user input)
//! or base units into decimal strings (display and input prefill).

use crate::constants::MAX_DECIMALS;
use crate::errors::{CoreError, CoreResult};

/// 10^exponent as u128
pub fn pow10(exponent: u8) -> CoreResult<u128> {
    if exponent > MAX_DECIMALS {
        return Err(CoreError::MathOverflow);
    }
    Ok(10u128.pow(exponent as u32))
}

/// Parse a decimal string like `"1.25"` into base units with `decimals` places.
///
/// Surrounding whitespace is ignored. Signs, exponents, grouping separators and
/// fractional digits beyond `decimals` are rejected rather than truncated.
pub fn parse_units(input: &str, decimals: u8) -> CoreResult<u128> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_amount(input));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(CoreError::invalid_amount(input));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(CoreError::invalid_amount(input));
    }
    if fraction.len() > decimals as usize {
        return Err(CoreError::TooManyDecimals {
            found: fraction.len(),
            max: decimals,
        });
    }

    let scale = pow10(decimals)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| CoreError::MathOverflow)?
            .checked_mul(scale)
            .ok_or(CoreError::MathOverflow)?
    };

    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padding = pow10(decimals - fraction.len() as u8)?;
        fraction
            .parse::<u128>()
            .map_err(|_| CoreError::MathOverflow)?
            .checked_mul(padding)
            .ok_or(CoreError::MathOverflow)?
    };

    whole_units
        .checked_add(fraction_units)
        .ok_or(CoreError::MathOverflow)
}

/// Render base units as an exact decimal string with trailing zeros trimmed.
///
/// `format_units(1_500_000_000_000_000_000, 18) == "1.5"`
pub fn format_units(amount: u128, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u128.pow(decimals.min(MAX_DECIMALS) as u32);
    let whole = amount / scale;
    let fraction = amount % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Render base units rounded half-up to exactly `digits` fractional digits.
pub fn format_fixed(amount: u128, decimals: u8, digits: u8) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let (whole, fraction) = if digits >= decimals {
        let scale = 10u128.pow(decimals as u32);
        let padding = 10u128.pow((digits.min(MAX_DECIMALS) - decimals) as u32);
        (amount / scale, (amount % scale) * padding)
    } else {
        let step = 10u128.pow((decimals - digits) as u32);
        let mut rounded = amount / step;
        if (amount % step) * 2 >= step {
            rounded += 1;
        }
        let scale = 10u128.pow(digits as u32);
        (rounded / scale, rounded % scale)
    };

    if digits == 0 {
        whole.to_string()
    } else {
        format!("{}.{:0width$}", whole, fraction, width = digits as usize)
    }
}

/// Render base units for display: rounded like [`format_fixed`] with the
/// integer part grouped by thousands.
pub fn format_display(amount: u128, decimals: u8, digits: u8) -> String {
    let fixed = format_fixed(amount, decimals, digits);
    match fixed.split_once('.') {
        Some((whole, fraction)) => format!("{}.{}", group_thousands(whole), fraction),
        None => group_thousands(&fixed),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WAD;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1", 18).unwrap(), WAD);
        assert_eq!(parse_units("1.25", 18).unwrap(), WAD + WAD / 4);
        assert_eq!(parse_units("0.005", 18).unwrap(), 5 * WAD / 1000);
        assert_eq!(parse_units(".5", 18).unwrap(), WAD / 2);
        assert_eq!(parse_units("2.", 18).unwrap(), 2 * WAD);
        assert_eq!(parse_units("  3  ", 18).unwrap(), 3 * WAD);
        assert_eq!(parse_units("0.000000000000000001", 18).unwrap(), 1);
    }

    #[test]
    fn test_parse_units_rejects_malformed_input() {
        for input in ["", "   ", ".", "-1", "+1", "1e3", "1,000", "1.2.3", "abc", "NaN"] {
            assert!(parse_units(input, 18).is_err(), "accepted {:?}", input);
        }
        assert_eq!(
            parse_units("0.0000000000000000001", 18),
            Err(CoreError::TooManyDecimals { found: 19, max: 18 })
        );
    }

    #[test]
    fn test_format_units_is_exact() {
        assert_eq!(format_units(0, 18), "0");
        assert_eq!(format_units(WAD, 18), "1");
        assert_eq!(format_units(WAD + WAD / 2, 18), "1.5");
        assert_eq!(format_units(1, 18), "0.000000000000000001");
        assert_eq!(parse_units(&format_units(123_456_789, 18), 18).unwrap(), 123_456_789);
    }

    #[test]
    fn test_format_fixed_rounds_half_up() {
        assert_eq!(format_fixed(WAD, 18, 4), "1.0000");
        assert_eq!(format_fixed(12_345 * WAD / 100_000, 18, 4), "0.1235");
        assert_eq!(format_fixed(12_344 * WAD / 100_000, 18, 4), "0.1234");
        assert_eq!(format_fixed(99_999 * WAD / 100_000, 18, 4), "1.0000");
        assert_eq!(format_fixed(5, 1, 3), "0.500");
        assert_eq!(format_fixed(15 * WAD / 10, 18, 0), "2");
    }

    #[test]
    fn test_format_display_groups_thousands() {
        assert_eq!(format_display(1_234_567 * WAD, 18, 2), "1,234,567.00");
        assert_eq!(format_display(999 * WAD, 18, 2), "999.00");
        assert_eq!(format_display(1_000 * WAD, 18, 0), "1,000");
        assert_eq!(format_display(0, 18, 4), "0.0000");
    }
}
