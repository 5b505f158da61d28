//! Presentation Formatting
//!
//! The only place money is rounded for people to read.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::round_money;

/// `$1,234.56`, negatives as `-$1,234.56`
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_money(value);
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// `2.35T`, `512.00B`, `7.10M`, `1.50K`, or the plain number below a thousand
pub fn format_large_number(value: u64) -> String {
    let scaled = |divisor: Decimal, suffix: &str| {
        format!("{:.2}{suffix}", round_money(Decimal::from(value) / divisor))
    };
    match value {
        v if v >= 1_000_000_000_000 => scaled(dec!(1_000_000_000_000), "T"),
        v if v >= 1_000_000_000 => scaled(dec!(1_000_000_000), "B"),
        v if v >= 1_000_000 => scaled(dec!(1_000_000), "M"),
        v if v >= 1_000 => scaled(dec!(1_000), "K"),
        v => v.to_string(),
    }
}

/// `+1.23%`, `-0.50%`, `0.00%`
pub fn format_percentage(value: Decimal) -> String {
    let rounded = round_money(value);
    let sign = if rounded > Decimal::ZERO { "+" } else { "" };
    format!("{sign}{rounded:.2}%")
}

/// `12,345,678`
pub fn format_number(value: u64) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency() {
        assert_eq!(format_currency(dec!(1234.5)), "$1,234.50");
        assert_eq!(format_currency(dec!(-1234567.891)), "-$1,234,567.89");
        assert_eq!(format_currency(dec!(0)), "$0.00");
        assert_eq!(format_currency(dec!(999.999)), "$1,000.00");
    }

    #[test]
    fn test_large_numbers() {
        assert_eq!(format_large_number(2_350_000_000_000), "2.35T");
        assert_eq!(format_large_number(512_000_000_000), "512.00B");
        assert_eq!(format_large_number(7_100_000), "7.10M");
        assert_eq!(format_large_number(1_500), "1.50K");
        assert_eq!(format_large_number(999), "999");
        assert_eq!(format_number(12_345_678), "12,345,678");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(format_percentage(dec!(1.234)), "+1.23%");
        assert_eq!(format_percentage(dec!(-0.5)), "-0.50%");
        assert_eq!(format_percentage(dec!(0)), "0.00%");
    }
}
