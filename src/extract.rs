// src/extract.rs
//! Field extractors: timestamps, amount/currency tokens, and free-text cleanup.
//!
//! Extractors are total functions over arbitrary byte sequences. Unrecognized
//! input degrades to `None` (or the default currency), never to an error.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::Currency;

static ISO_DATETIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("valid pattern"));
static DMY_DATETIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}$").expect("valid pattern"));
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,]+\.?\d*").expect("valid pattern"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid pattern"));

/// Parses a timestamp token in one of the two supported layouts:
/// `YYYY-MM-DD HH:MM:SS` or `DD/MM/YYYY HH:MM:SS`.
///
/// Empty tokens, the literal `none` (any case), and anything else return
/// `None` silently.
pub fn parse_datetime(token: &str) -> Option<NaiveDateTime> {
    if token.is_empty() || token.eq_ignore_ascii_case("none") {
        return None;
    }

    let format = if ISO_DATETIME_RE.is_match(token) {
        "%Y-%m-%d %H:%M:%S"
    } else if DMY_DATETIME_RE.is_match(token) {
        "%d/%m/%Y %H:%M:%S"
    } else {
        return None;
    };

    match NaiveDateTime::parse_from_str(token, format) {
        Ok(dt) => Some(dt),
        Err(err) => {
            // Right shape, impossible calendar value (e.g. month 13).
            tracing::debug!(token, %err, "could not parse datetime");
            None
        }
    }
}

/// Amount and currency pulled out of a single raw token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountInfo {
    pub amount: Option<f64>,
    pub currency: Currency,
}

impl AmountInfo {
    fn empty() -> Self {
        AmountInfo {
            amount: None,
            currency: Currency::Gbp,
        }
    }
}

fn keep_for_amount(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | '€' | '£' | '$')
}

/// Extracts a numeric amount plus currency from a raw token.
///
/// All characters except digits, separators, and recognized currency glyphs
/// are discarded first, so mojibake bytes around the number do not disturb
/// the numeric run. The currency is resolved against the original token:
/// symbol and mojibake-symbol forms map to their codes, anything else
/// defaults to GBP. Total extraction failure yields `(None, GBP)`.
pub fn extract_amount(token: &str) -> AmountInfo {
    if token.is_empty() {
        return AmountInfo::empty();
    }

    let sieved: String = token.chars().filter(|c| keep_for_amount(*c)).collect();
    let Some(run) = NUMBER_RE.find(&sieved) else {
        return AmountInfo::empty();
    };

    let amount = run.as_str().replace(',', "").parse::<f64>().ok();
    let currency = if token.contains('€') || token.contains("â‚¬") {
        Currency::Eur
    } else if token.contains('£') || token.contains("Â£") {
        Currency::Gbp
    } else if token.contains('$') {
        Currency::Usd
    } else {
        Currency::Gbp
    };

    AmountInfo { amount, currency }
}

/// Resolves a currency symbol, its mojibake form, or an ISO code.
/// Unknown or empty input defaults to GBP.
pub fn currency_code(symbol: &str) -> Currency {
    match symbol.trim() {
        "€" | "â‚¬" | "EUR" => Currency::Eur,
        "£" | "Â£" | "GBP" => Currency::Gbp,
        "$" | "USD" => Currency::Usd,
        _ => Currency::Gbp,
    }
}

/// Ordered table of corrupted byte sequences and their intended characters.
///
/// Replacement order matters: `Â£` must be restored before the stray `Â`
/// marker is stripped.
#[derive(Debug, Clone)]
pub struct MojibakeTable {
    replacements: IndexMap<String, String>,
}

impl Default for MojibakeTable {
    fn default() -> Self {
        let mut replacements = IndexMap::new();
        replacements.insert("â‚¬".to_string(), "€".to_string());
        replacements.insert("Â£".to_string(), "£".to_string());
        replacements.insert("Â".to_string(), String::new());
        // Stray low-quote mark left behind by a double-decoded euro sign.
        replacements.insert("\u{201a}".to_string(), String::new());
        MojibakeTable { replacements }
    }
}

impl MojibakeTable {
    /// Adds (or overrides) one corrupted-sequence mapping.
    pub fn with_replacement(mut self, corrupted: &str, intended: &str) -> Self {
        self.replacements
            .insert(corrupted.to_string(), intended.to_string());
        self
    }

    /// Applies every replacement in table order.
    pub fn restore(&self, text: &str) -> String {
        let mut restored = text.to_string();
        for (corrupted, intended) in &self.replacements {
            if restored.contains(corrupted.as_str()) {
                restored = restored.replace(corrupted.as_str(), intended);
            }
        }
        restored
    }
}

/// Cleans free-text fields: mojibake restoration and whitespace collapsing.
#[derive(Debug, Clone, Default)]
pub struct FieldCleaner {
    table: MojibakeTable,
}

impl FieldCleaner {
    pub fn new(table: MojibakeTable) -> Self {
        FieldCleaner { table }
    }

    /// Returns `None` for empty fields and the `none`/`null` literals (any
    /// case). Otherwise restores corrupted sequences, collapses whitespace
    /// runs to a single space, and trims.
    pub fn clean(&self, field: &str) -> Option<String> {
        if field.is_empty()
            || field.eq_ignore_ascii_case("none")
            || field.eq_ignore_ascii_case("null")
        {
            return None;
        }

        let restored = self.table.restore(field);
        let collapsed = WHITESPACE_RE.replace_all(&restored, " ");
        Some(collapsed.trim().to_string())
    }
}
