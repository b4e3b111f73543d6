//! Common utility functions used across the codebase.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{GiftIdea, Giftee};

/// Truncates a string to at most `max_chars` characters, adding "..." if truncated.
///
/// This function is UTF-8 safe and respects character boundaries, avoiding panics
/// when truncating strings that contain multi-byte characters (like emojis).
///
/// # Arguments
/// * `s` - The string to truncate
/// * `max_chars` - Maximum number of characters (not bytes) in the result, including the "..." suffix
///
/// # Examples
/// ```
/// use giftwise::utils::truncate_str;
///
/// assert_eq!(truncate_str("hello", 10), "hello");
/// assert_eq!(truncate_str("hello world", 8), "hello...");
/// ```
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    // Fast path: byte length <= max_chars means char count is too
    if s.len() <= max_chars {
        return s.to_string();
    }

    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s.to_string();
    }

    let suffix = "...";
    let suffix_len = suffix.chars().count();
    if max_chars <= suffix_len {
        return suffix.chars().take(max_chars).collect();
    }

    let truncated: String = s.chars().take(max_chars - suffix_len).collect();
    format!("{}{}", truncated, suffix)
}

/// Formats a dollar amount with thousands separators and two decimals.
///
/// # Examples
/// ```
/// use giftwise::utils::format_currency;
///
/// assert_eq!(format_currency(1234.5), "$1,234.50");
/// assert_eq!(format_currency(0.0), "$0.00");
/// ```
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let dollars = (cents / 100).abs();
    let rem = (cents % 100).abs();

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if cents < 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, rem)
}

/// Reads a price out of a price-range string, but only when it names exactly
/// one unambiguous dollar amount ("$25", "25.00", "~$25"). Ranges and
/// qualified amounts ("$20-$30", "under $50") yield `None`.
pub fn parse_single_price(range: &str) -> Option<f64> {
    static SINGLE_PRICE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[~≈]?\s*\$?\s*(\d+(?:,\d{3})*(?:\.\d{1,2})?)$")
            .expect("single price regex should compile")
    });

    let caps = SINGLE_PRICE_RE.captures(range.trim())?;
    caps.get(1)?.as_str().replace(',', "").parse().ok()
}

/// Sum of budgets across giftees that set one.
pub fn total_budget(giftees: &[Giftee]) -> f64 {
    giftees.iter().filter_map(|g| g.budget).sum()
}

/// Total price of ideas already acquired (or further along), where a price
/// is known. Ideas still under consideration do not count as spend.
pub fn acquired_cost(ideas: &[GiftIdea]) -> f64 {
    ideas
        .iter()
        .filter(|i| i.status.is_acquired())
        .filter_map(|i| i.price)
        .sum()
}
