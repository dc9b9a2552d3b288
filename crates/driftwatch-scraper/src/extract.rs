//! Field extractors for free-text marketplace listing fragments.
//!
//! Each extractor handles one field and fails independently by returning
//! `None` for what it cannot parse, so markup drift in one field never takes
//! down the others. [`crate::canonicalize`] composes them into full
//! snapshots.

use std::sync::LazyLock;

use regex::Regex;

/// Parsed components of a free-text price string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrice {
    /// Numeric amount in the listed currency; `None` when no number is
    /// present (e.g. a bare "name your price" label).
    pub amount: Option<f64>,
    /// ISO 4217 code when one could be determined.
    pub currency: Option<String>,
    pub is_pwyw: bool,
}

// The zero in "$0+" must not be preceded by a digit, or "$10+" would count.
static PWYW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)name your price|pay what you want|pay-what-you-want|pwyw|(?:^|[^0-9])\$?\s*0\s*\+")
        .expect("pwyw pattern compiles")
});

static CURRENCY_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(USD|EUR|GBP|CAD|AUD|JPY|INR)\b").expect("currency code pattern compiles")
});

static SUBSCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(a month|/mo|per month).*").expect("subscription pattern compiles")
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d,]+\.?\d*").expect("number pattern compiles"));

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s*\(\s*([\d,]+)\s*\)").expect("rating pattern compiles"));

static RATING_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]+").expect("rating-only pattern compiles"));

static SALES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d,]+\.?\d*)\s*([KM])?\s*sales?").expect("sales pattern compiles")
});

/// Returns `true` if the price text implies pay-what-you-want pricing.
#[must_use]
pub fn is_pwyw_price(price_text: &str) -> bool {
    PWYW_RE.is_match(price_text.trim())
}

/// Extracts the numeric amount, currency, and PWYW flag from a price string.
///
/// `"Free"`, `"$0"`, and `"0"` parse as a fixed zero-dollar price. Symbols
/// are checked after the compound `C$`/`A$` forms so a Canadian price is not
/// misread as USD. Subscription suffixes ("a month", "/mo") are stripped
/// before the amount is read. Returns `None` only for empty input.
#[must_use]
pub fn extract_price(price_text: &str) -> Option<ParsedPrice> {
    let trimmed = price_text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if lower == "free" || lower == "$0" || lower == "0" {
        return Some(ParsedPrice {
            amount: Some(0.0),
            currency: Some("USD".to_string()),
            is_pwyw: false,
        });
    }

    let is_pwyw = is_pwyw_price(trimmed);
    let stripped = SUBSCRIPTION_RE.replace(trimmed, "");

    let currency = extract_currency(&stripped);
    let amount = NUMBER_RE
        .find(&stripped)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok());

    Some(ParsedPrice {
        amount,
        currency,
        is_pwyw,
    })
}

fn extract_currency(price_text: &str) -> Option<String> {
    if let Some(caps) = CURRENCY_CODE_RE.captures(price_text) {
        return Some(caps[1].to_uppercase());
    }

    // Compound symbols must be tested before the bare dollar sign.
    if price_text.contains("C$") {
        return Some("CAD".to_string());
    }
    if price_text.contains("A$") {
        return Some("AUD".to_string());
    }

    let symbol_map = [
        ('€', "EUR"),
        ('£', "GBP"),
        ('¥', "JPY"),
        ('₹', "INR"),
        ('$', "USD"),
    ];
    for (symbol, code) in symbol_map {
        if price_text.contains(symbol) {
            return Some(code.to_string());
        }
    }

    None
}

/// Extracts `(average, count)` from rating text like `"4.8 (123)"`.
///
/// Averages outside `0..=5` are rejected as a misparse of some other number
/// on the card; the count is still returned when present.
#[must_use]
pub fn extract_rating(rating_text: &str) -> (Option<f64>, Option<i32>) {
    let cleaned: String = rating_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return (None, None);
    }

    if let Some(caps) = RATING_RE.captures(&cleaned) {
        let avg = caps[1].parse::<f64>().ok().filter(|r| (0.0..=5.0).contains(r));
        let count = caps[2].replace(',', "").parse::<i32>().ok();
        return (avg, count);
    }

    // Rating without a review count, e.g. a bare "4.8".
    let avg = RATING_ONLY_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|r| (0.0..=5.0).contains(r));
    (avg, None)
}

/// Parses a sales count like `"500 sales"`, `"1.2K sales"`, or `"3M sales"`.
#[must_use]
pub fn extract_sales(sales_text: &str) -> Option<i32> {
    let caps = SALES_RE.captures(sales_text)?;
    let value = caps[1].replace(',', "").parse::<f64>().ok()?;
    let scaled = match caps.get(2).map(|m| m.as_str().to_uppercase()) {
        Some(ref s) if s == "K" => value * 1_000.0,
        Some(ref s) if s == "M" => value * 1_000_000.0,
        _ => value,
    };
    if scaled < 0.0 || scaled > f64::from(i32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(scaled as i32)
}
