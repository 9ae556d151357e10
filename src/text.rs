//! Text helpers: markup escaping, product-code normalization and price strings.

use regex::Regex;
use std::num::ParseIntError;
use std::sync::OnceLock;

/// Shown in place of a price that could not be resolved.
pub const UNDETERMINED_PRICE: &str = "Chưa Xác Định";

fn markdown_meta() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([_*\[\]()~`>#+\-=|{}.!\\])").expect("static regex is valid")
    })
}

fn dash_glyphs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{2010}-\u{2015}]").expect("static regex is valid"))
}

fn duration_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)-+\s*(\d+)\s*m\b").expect("static regex is valid"))
}

/// Escape Telegram MarkdownV2 meta characters.
pub fn escape_markdown(text: &str) -> String {
    markdown_meta().replace_all(text, r"\$1").into_owned()
}

/// Canonical form of a product code for comparisons.
///
/// Unicode dashes become `-`, a duration suffix such as `- 12 m` becomes
/// `--12m`, and the result is trimmed and lower-cased.
pub fn normalize_product_code(code: &str) -> String {
    let dashes = dash_glyphs().replace_all(code, "-");
    duration_suffix()
        .replace_all(&dashes, "--${1}m")
        .trim()
        .to_lowercase()
}

/// Parse a price string such as `1.234.567 đ` or `250,000 VND` into an amount.
///
/// Everything but ASCII digits is discarded. A string with no digits is 0;
/// an amount too large for `u64` is an error.
pub fn parse_price(raw: &str) -> Result<u64, ParseIntError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse::<u64>()
}

/// Group an amount by thousands with commas.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render a price for display; 0 means the price is unknown.
pub fn format_price(value: u64) -> String {
    if value == 0 {
        return UNDETERMINED_PRICE.to_string();
    }
    format!("{} VND", group_thousands(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markdown_meta_characters() {
        assert_eq!(escape_markdown("a_b*c"), r"a\_b\*c");
        assert_eq!(escape_markdown("1.234 (x)!"), r"1\.234 \(x\)\!");
        assert_eq!(escape_markdown("MAVL-01"), r"MAVL\-01");
        assert_eq!(escape_markdown("plain text"), "plain text");
    }

    #[test]
    fn normalizes_dash_glyphs_and_duration() {
        assert_eq!(normalize_product_code("Netflix\u{2013}12m"), "netflix--12m");
        assert_eq!(normalize_product_code("Netflix - 12 M"), "netflix --12m");
        assert_eq!(normalize_product_code("Netflix--12m"), "netflix--12m");
        assert_eq!(normalize_product_code("  Spotify "), "spotify");
    }

    #[test]
    fn parses_vietnamese_price_strings() {
        assert_eq!(parse_price("1.234.567 đ"), Ok(1_234_567));
        assert_eq!(parse_price("250,000 VND"), Ok(250_000));
        assert_eq!(parse_price(""), Ok(0));
        assert_eq!(parse_price("n/a"), Ok(0));
        assert!(parse_price("99999999999999999999999").is_err());
    }

    #[test]
    fn formats_grouped_prices() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(format_price(250_000), "250,000 VND");
        assert_eq!(format_price(0), UNDETERMINED_PRICE);
    }
}
