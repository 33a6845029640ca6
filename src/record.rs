// src/record.rs
use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Duration;

/// Fallback for fields that never produced a value.
pub const UNKNOWN: &str = "Unknown";

/// Maximum number of characters kept from a dropped line for reporting.
pub const SNIPPET_LEN: usize = 100;

/// The closed set of currency codes a record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Currency {
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Usd => "USD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field bindings produced by a grammar, before dataset-level fills.
///
/// Every field is optional here; [`RecordDraft::finalize`] applies the
/// fallback values and produces the published record shape.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordDraft {
    pub datetime: Option<NaiveDateTime>,
    pub user_id: Option<String>,
    pub transaction_type: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
    pub location: Option<String>,
    pub device: Option<String>,
}

impl RecordDraft {
    /// Applies the dataset-level fills and freezes the record.
    ///
    /// Missing location/device become "Unknown". A draft without a currency
    /// falls back to the dataset default USD; note that token-level amount
    /// extraction defaults to GBP instead, so this branch only fires for
    /// drafts built without consulting the amount extractor.
    pub fn finalize(self, row_id: u32, original_log: &str) -> ParsedRecord {
        ParsedRecord {
            row_id,
            original_log: original_log.to_string(),
            datetime: self.datetime,
            user_id: self.user_id,
            transaction_type: self.transaction_type,
            amount: self.amount.filter(|a| a.is_finite()),
            currency: self.currency.unwrap_or(Currency::Usd),
            location: self.location.unwrap_or_else(|| UNKNOWN.to_string()),
            device: self.device.unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

/// One normalized transaction row. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRecord {
    /// 1-based position within the filtered line sequence.
    pub row_id: u32,
    /// The input line, verbatim, for audit.
    pub original_log: String,
    pub datetime: Option<NaiveDateTime>,
    pub user_id: Option<String>,
    pub transaction_type: Option<String>,
    pub amount: Option<f64>,
    pub currency: Currency,
    pub location: String,
    pub device: String,
}

/// Column value classes exposed to downstream schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Text,
    NullableTimestamp,
    NullableText,
    NullableFloat,
}

/// The assembled batch, ordered by row ordinal.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub records: Vec<ParsedRecord>,
}

impl Dataset {
    /// Column names and value classes, in output order.
    pub fn schema() -> &'static [(&'static str, ColumnKind)] {
        &[
            ("row_id", ColumnKind::Integer),
            ("original_log", ColumnKind::Text),
            ("datetime", ColumnKind::NullableTimestamp),
            ("user_id", ColumnKind::NullableText),
            ("transaction_type", ColumnKind::NullableText),
            ("amount", ColumnKind::NullableFloat),
            ("currency", ColumnKind::Text),
            ("location", ColumnKind::Text),
            ("device", ColumnKind::Text),
        ]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParsedRecord> {
        self.records.iter()
    }
}

/// Why a candidate line produced no record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NoGrammarMatched,
    ExtractionFailed { grammar: String, message: String },
}

/// Diagnostic entry for one dropped line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedLine {
    /// Ordinal the line held in the filtered sequence.
    pub row_id: u32,
    /// Source text truncated to [`SNIPPET_LEN`] characters.
    pub snippet: String,
    pub reason: DropReason,
}

impl DroppedLine {
    pub fn unmatched(row_id: u32, line: &str) -> Self {
        DroppedLine {
            row_id,
            snippet: truncate_snippet(line),
            reason: DropReason::NoGrammarMatched,
        }
    }

    pub fn extraction_failed(row_id: u32, line: &str, grammar: &str, source: &anyhow::Error) -> Self {
        DroppedLine {
            row_id,
            snippet: truncate_snippet(line),
            reason: DropReason::ExtractionFailed {
                grammar: grammar.to_string(),
                message: source.to_string(),
            },
        }
    }
}

fn truncate_snippet(line: &str) -> String {
    line.chars().take(SNIPPET_LEN).collect()
}

/// Batch-level report returned alongside the dataset.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Diagnostics {
    /// Candidate lines that survived filtering.
    pub lines_seen: usize,
    /// Lines that produced a record.
    pub records_parsed: usize,
    /// Lines dropped with their ordinals and truncated text.
    pub dropped: Vec<DroppedLine>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl Diagnostics {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_fills_missing_fields() {
        let record = RecordDraft::default().finalize(7, "some line");
        assert_eq!(record.row_id, 7);
        assert_eq!(record.original_log, "some line");
        assert_eq!(record.currency, Currency::Usd);
        assert_eq!(record.location, "Unknown");
        assert_eq!(record.device, "Unknown");
        assert_eq!(record.amount, None);
    }

    #[test]
    fn test_finalize_keeps_bound_fields() {
        let draft = RecordDraft {
            amount: Some(12.5),
            currency: Some(Currency::Eur),
            location: Some("Leeds".to_string()),
            ..RecordDraft::default()
        };
        let record = draft.finalize(1, "x");
        assert_eq!(record.amount, Some(12.5));
        assert_eq!(record.currency, Currency::Eur);
        assert_eq!(record.location, "Leeds");
    }

    #[test]
    fn test_snippet_truncates_long_lines() {
        let long = "y".repeat(500);
        let dropped = DroppedLine::unmatched(3, &long);
        assert_eq!(dropped.snippet.chars().count(), SNIPPET_LEN);
    }
}
