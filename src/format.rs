//! Display helpers: currency, dates, percentages and small text utilities.

use crate::model::parse_date;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::LazyLock;

/// The default display pattern for dates, e.g. `Oct 20, 2025`.
pub const DEFAULT_DATE_PATTERN: &str = "%b %d, %Y";

/// The preset category colors.
pub const PALETTE: [&str; 15] = [
    "#EF4444", "#3B82F6", "#8B5CF6", "#F59E0B", "#10B981", "#EC4899", "#6B7280", "#DC2626",
    "#059669", "#7C3AED", "#F97316", "#06B6D4", "#84CC16", "#F43F5E", "#8B5A2B",
];

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern is valid"));

/// Formats `amount` in `currency` with a symbol, thousands separators and exactly two decimals.
/// A missing amount is shown as zero in the same currency.
///
/// ```
/// # use expense_client::format::format_currency;
/// # use rust_decimal::Decimal;
/// # use std::str::FromStr;
/// assert_eq!(format_currency(Some(Decimal::from_str("1234.5").unwrap()), "USD"), "$1,234.50");
/// assert_eq!(format_currency(None, "USD"), "$0.00");
/// ```
pub fn format_currency(amount: Option<Decimal>, currency: &str) -> String {
    let value = amount.unwrap_or_default();
    let sign = if value.is_sign_negative() && !value.is_zero() {
        "-"
    } else {
        ""
    };
    let abs = value
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let digits = format_num::format_num!(",.2f", abs.to_f64().unwrap_or_default());
    let symbol = currency_symbol(currency);
    if symbol.is_empty() {
        format!("{sign}{digits} {}", currency.to_uppercase())
    } else {
        format!("{sign}{symbol}{digits}")
    }
}

/// The symbol for the currencies the client knows; empty for anything else, in which case the
/// code is printed after the number.
pub fn currency_symbol(currency: &str) -> &'static str {
    match currency.to_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        _ => "",
    }
}

/// Formats a date string (plain date or timestamp) with a chrono `pattern`. Unparseable or empty
/// input yields an empty string.
pub fn format_date(date: &str, pattern: &str) -> String {
    match parse_date(date) {
        Some(d) => d.format(pattern).to_string(),
        None => String::new(),
    }
}

/// Formats a date string as `YYYY-MM-DD`, the value a date input expects.
pub fn format_date_for_input(date: &str) -> String {
    format_date(date, "%Y-%m-%d")
}

/// Formats a calendar date with the default display pattern.
pub fn display_date(date: NaiveDate) -> String {
    date.format(DEFAULT_DATE_PATTERN).to_string()
}

/// `part` as a whole-number percentage of `total`; zero when `total` is zero.
pub fn calculate_percentage(part: Decimal, total: Decimal) -> u32 {
    if total.is_zero() {
        return 0;
    }
    let pct = (part / total * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    pct.to_u32().unwrap_or_default()
}

/// Shortens `text` to `max_len` characters, trimming trailing whitespace and appending `...`.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let head: String = text.chars().take(max_len).collect();
    format!("{}...", head.trim_end())
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn is_valid_hex_color(color: &str) -> bool {
    HEX_COLOR.is_match(color)
}

/// Picks a color from the palette.
pub fn random_color() -> &'static str {
    let byte = uuid::Uuid::new_v4().as_bytes()[0];
    PALETTE[usize::from(byte) % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Some(dec("1234.5")), "USD"), "$1,234.50");
        assert_eq!(format_currency(None, "USD"), "$0.00");
        assert_eq!(format_currency(Some(dec("0.005")), "USD"), "$0.01");
        assert_eq!(format_currency(Some(dec("-60000")), "USD"), "-$60,000.00");
        assert_eq!(format_currency(Some(dec("99999999.99")), "usd"), "$99,999,999.99");
    }

    #[test]
    fn test_format_currency_other_codes() {
        assert_eq!(format_currency(Some(dec("10")), "EUR"), "€10.00");
        assert_eq!(format_currency(Some(dec("10")), "CHF"), "10.00 CHF");
        assert_eq!(format_currency(None, "EUR"), "€0.00");
        assert_eq!(format_currency(None, "CHF"), "0.00 CHF");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2025-10-05", DEFAULT_DATE_PATTERN), "Oct 05, 2025");
        assert_eq!(format_date("2025-10-05T00:00:00Z", "%b %d"), "Oct 05");
        assert_eq!(format_date("", DEFAULT_DATE_PATTERN), "");
        assert_eq!(format_date("garbage", DEFAULT_DATE_PATTERN), "");
        assert_eq!(format_date_for_input("2025-10-05T10:00:00Z"), "2025-10-05");
    }

    #[test]
    fn test_hex_color() {
        assert!(is_valid_hex_color("#3B82F6"));
        assert!(is_valid_hex_color("#abcdef"));
        assert!(!is_valid_hex_color("blue"));
        assert!(!is_valid_hex_color("#3B82F"));
        assert!(!is_valid_hex_color("3B82F6"));
        assert!(!is_valid_hex_color("#3B82F6 "));
    }

    #[test]
    fn test_calculate_percentage() {
        assert_eq!(calculate_percentage(dec("1"), dec("3")), 33);
        assert_eq!(calculate_percentage(dec("2"), dec("3")), 67);
        assert_eq!(calculate_percentage(dec("5"), Decimal::ZERO), 0);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 100), "short");
        assert_eq!(truncate_text("hello world", 6), "hello...");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("dARK"), "Dark");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_random_color_is_from_palette() {
        for _ in 0..20 {
            assert!(PALETTE.contains(&random_color()));
        }
    }
}
