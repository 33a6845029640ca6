// src/grammar.rs
//! The nine transaction-log layouts and the priority-ordered registry.
//!
//! Each grammar binds one textual shape to semantic field positions. The
//! registry tries them in a fixed order and the first structural match wins;
//! there is no scoring and no backtracking. Two of the legacy layouts
//! (amount-then-symbol with and without corrupted symbols) overlap lexically
//! on purpose, so the order is part of the contract.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::extract::{currency_code, extract_amount, parse_datetime, FieldCleaner};
use crate::record::{Currency, RecordDraft};

type BindFn = fn(&Captures<'_>, &FieldCleaner) -> Result<RecordDraft>;

// 2023-05-14 14:05:31::user123::top-up::500::ATM Location::Device
static DOUBLE_COLON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})::(\w+)::([\w-]+)::([\d,.]+)::([^:]+)::(.+)$")
        .expect("layout pattern compiles")
});

// usr:user123|top-up|£500|Location|2023-05-14 14:05:31|Device
static USR_PIPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^usr:(\w+)\|([\w-]+)\|([€£$]?[\d,.]+)\|([^|]+)\|(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\|(.+)$")
        .expect("layout pattern compiles")
});

// 2023-05-14 14:05:31 >> [user123] did top-up - amt=£500 - Location // dev:Device
static ARROW_NARRATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) >> \[(\w+)\] did ([\w-]+) - amt=([€£$]?[\d,.]+) - ([^/]+) // dev:(.+)$")
        .expect("layout pattern compiles")
});

// 2023-05-14 14:05:31 | user: user123 | txn: top-up of £500 from Location | device: Device
static LABELED_PIPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) \| user: (\w+) \| txn: ([\w-]+) of ([€£$]?[\d,.]+) from ([^|]+) \| device: (.+)$")
        .expect("layout pattern compiles")
});

// 2023-05-14 14:05:31 - user=user123 - action=top-up £500 - ATM: Location - device=Device
static LABELED_DASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) - user=(\w+) - action=([\w-]+) ([€£$]?[\d,.]+) - ATM: ([^-]+) - device=(.+)$")
        .expect("layout pattern compiles")
});

// 14/05/2023 14:05:31 ::: user123 *** TOP-UP ::: amt:£500 @ Location <Device>
static AMT_PREFIX_LEGACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}) ::: (\w+) \*\*\* ([\w-]+) ::: amt:([€£$]?[\d,.]+) @ ([^<]+) <([^>]+)>$")
        .expect("layout pattern compiles")
});

// user123 2023-05-14 14:05:31 top-up 500 Location Device
static POSITIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+) (\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) ([\w-]+) ([\d,.]+) (\S+) (.+)$")
        .expect("layout pattern compiles")
});

// 14/05/2023 14:05:31 ::: user123 *** TOP-UP ::: amt:500£ @ Location <Device>
static AMT_SUFFIX_LEGACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}) ::: (\w+) \*\*\* ([\w-]+) ::: amt:([\d,.]+)([€£$]) @ ([^<]+) <([^>]+)>$")
        .expect("layout pattern compiles")
});

// 04/07/2025 00:41:51 ::: user1044 *** REFUND ::: amt:3491.94â‚¬ @ Manchester <Huawei P30>
// Same shape as the previous layout, but the symbol may arrive as a
// corrupted multi-byte sequence.
static AMT_SUFFIX_MOJIBAKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}) ::: (\w+) \*\*\* ([\w-]+) ::: amt:([\d,.]+)(â‚¬|€|£|Â£|\$) @ ([^<]+) <([^>]+)>$")
        .expect("layout pattern compiles")
});

/// One textual layout: a structural pattern plus its field bindings.
pub struct Grammar {
    name: &'static str,
    pattern: &'static Lazy<Regex>,
    bind: BindFn,
}

impl Grammar {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Structural test only; binding may still fail on a bad sub-token.
    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

/// How the registry resolved one candidate line.
#[derive(Debug)]
pub enum MatchOutcome {
    /// The first structurally-matching grammar bound all fields.
    Matched {
        grammar: &'static str,
        draft: RecordDraft,
    },
    /// A grammar matched the shape but one of its fields would not bind.
    /// Later grammars are not consulted; the line is dropped whole.
    ExtractionFailed {
        grammar: &'static str,
        source: anyhow::Error,
    },
    /// No grammar matched the line.
    Unmatched,
}

/// Immutable, priority-ordered collection of layout recognizers.
///
/// Constructed once and injected into the pipeline; safe for unsynchronized
/// concurrent reads.
pub struct GrammarRegistry {
    grammars: Vec<Grammar>,
}

impl GrammarRegistry {
    /// The nine supported layouts, highest priority first.
    pub fn standard() -> Self {
        GrammarRegistry {
            grammars: vec![
                Grammar {
                    name: "double_colon",
                    pattern: &DOUBLE_COLON,
                    bind: bind_double_colon,
                },
                Grammar {
                    name: "usr_pipe",
                    pattern: &USR_PIPE,
                    bind: bind_usr_pipe,
                },
                Grammar {
                    name: "arrow_narrative",
                    pattern: &ARROW_NARRATIVE,
                    bind: bind_arrow_narrative,
                },
                Grammar {
                    name: "labeled_pipe",
                    pattern: &LABELED_PIPE,
                    bind: bind_labeled_pipe,
                },
                Grammar {
                    name: "labeled_dash",
                    pattern: &LABELED_DASH,
                    bind: bind_labeled_dash,
                },
                Grammar {
                    name: "amt_prefix_legacy",
                    pattern: &AMT_PREFIX_LEGACY,
                    bind: bind_amt_prefix_legacy,
                },
                Grammar {
                    name: "positional",
                    pattern: &POSITIONAL,
                    bind: bind_positional,
                },
                Grammar {
                    name: "amt_suffix_legacy",
                    pattern: &AMT_SUFFIX_LEGACY,
                    bind: bind_amt_suffix_legacy,
                },
                Grammar {
                    name: "amt_suffix_mojibake",
                    pattern: &AMT_SUFFIX_MOJIBAKE,
                    bind: bind_amt_suffix_mojibake,
                },
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    pub fn grammars(&self) -> &[Grammar] {
        &self.grammars
    }

    /// Resolves one line against the registry, first match wins.
    pub fn resolve(&self, line: &str, cleaner: &FieldCleaner) -> MatchOutcome {
        for grammar in &self.grammars {
            if let Some(caps) = grammar.pattern.captures(line) {
                return match (grammar.bind)(&caps, cleaner) {
                    Ok(draft) => MatchOutcome::Matched {
                        grammar: grammar.name,
                        draft,
                    },
                    Err(source) => MatchOutcome::ExtractionFailed {
                        grammar: grammar.name,
                        source,
                    },
                };
            }
        }
        MatchOutcome::Unmatched
    }
}

fn group<'a>(caps: &'a Captures<'_>, index: usize) -> &'a str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn parse_direct_amount(token: &str) -> Result<f64> {
    token
        .replace(',', "")
        .parse::<f64>()
        .map_err(|err| anyhow!("amount token '{}' is not numeric: {}", token, err))
}

fn bind_double_colon(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    let amount = extract_amount(group(caps, 4));
    Ok(RecordDraft {
        datetime: parse_datetime(group(caps, 1)),
        user_id: Some(group(caps, 2).to_string()),
        transaction_type: Some(group(caps, 3).to_string()),
        amount: amount.amount,
        currency: Some(amount.currency),
        location: cleaner.clean(group(caps, 5)),
        device: cleaner.clean(group(caps, 6)),
    })
}

fn bind_usr_pipe(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    let amount = extract_amount(group(caps, 3));
    Ok(RecordDraft {
        user_id: Some(group(caps, 1).to_string()),
        transaction_type: Some(group(caps, 2).to_string()),
        amount: amount.amount,
        currency: Some(amount.currency),
        location: cleaner.clean(group(caps, 4)),
        datetime: parse_datetime(group(caps, 5)),
        device: cleaner.clean(group(caps, 6)),
    })
}

fn bind_arrow_narrative(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    let amount = extract_amount(group(caps, 4));
    Ok(RecordDraft {
        datetime: parse_datetime(group(caps, 1)),
        user_id: Some(group(caps, 2).to_string()),
        // This layout spells types with dashes; the canonical form uses
        // underscores.
        transaction_type: Some(group(caps, 3).replace('-', "_")),
        amount: amount.amount,
        currency: Some(amount.currency),
        location: cleaner.clean(group(caps, 5)),
        device: cleaner.clean(group(caps, 6)),
    })
}

fn bind_labeled_pipe(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    let amount = extract_amount(group(caps, 4));
    Ok(RecordDraft {
        datetime: parse_datetime(group(caps, 1)),
        user_id: Some(group(caps, 2).to_string()),
        transaction_type: Some(group(caps, 3).to_string()),
        amount: amount.amount,
        currency: Some(amount.currency),
        location: cleaner.clean(group(caps, 5)),
        device: cleaner.clean(group(caps, 6)),
    })
}

fn bind_labeled_dash(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    let amount = extract_amount(group(caps, 4));
    Ok(RecordDraft {
        datetime: parse_datetime(group(caps, 1)),
        user_id: Some(group(caps, 2).to_string()),
        transaction_type: Some(group(caps, 3).to_string()),
        amount: amount.amount,
        currency: Some(amount.currency),
        location: cleaner.clean(group(caps, 5)),
        device: cleaner.clean(group(caps, 6)),
    })
}

fn bind_amt_prefix_legacy(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    let amount = extract_amount(group(caps, 4));
    Ok(RecordDraft {
        datetime: parse_datetime(group(caps, 1)),
        user_id: Some(group(caps, 2).to_string()),
        transaction_type: Some(group(caps, 3).to_lowercase()),
        amount: amount.amount,
        currency: Some(amount.currency),
        location: cleaner.clean(group(caps, 5)),
        device: cleaner.clean(group(caps, 6)),
    })
}

fn bind_positional(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    // No currency marker exists in this layout; the amount must parse as-is.
    let amount = parse_direct_amount(group(caps, 4))?;
    Ok(RecordDraft {
        user_id: Some(group(caps, 1).to_string()),
        datetime: parse_datetime(group(caps, 2)),
        transaction_type: Some(group(caps, 3).to_string()),
        amount: Some(amount),
        currency: Some(Currency::Gbp),
        location: cleaner.clean(group(caps, 5)),
        device: cleaner.clean(group(caps, 6)),
    })
}

fn bind_amt_suffix_legacy(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    let amount = parse_direct_amount(group(caps, 4))?;
    Ok(RecordDraft {
        datetime: parse_datetime(group(caps, 1)),
        user_id: Some(group(caps, 2).to_string()),
        transaction_type: Some(group(caps, 3).to_lowercase()),
        amount: Some(amount),
        currency: Some(currency_code(group(caps, 5))),
        location: cleaner.clean(group(caps, 6)),
        device: cleaner.clean(group(caps, 7)),
    })
}

fn bind_amt_suffix_mojibake(caps: &Captures<'_>, cleaner: &FieldCleaner) -> Result<RecordDraft> {
    let amount = parse_direct_amount(group(caps, 4))?;
    // Restore the symbol before resolving it, so â‚¬ and Â£ land on their
    // intended codes.
    let symbol = cleaner.clean(group(caps, 5)).unwrap_or_default();
    Ok(RecordDraft {
        datetime: parse_datetime(group(caps, 1)),
        user_id: Some(group(caps, 2).to_string()),
        transaction_type: Some(group(caps, 3).to_lowercase()),
        amount: Some(amount),
        currency: Some(currency_code(&symbol)),
        location: cleaner.clean(group(caps, 6)),
        device: cleaner.clean(group(caps, 7)),
    })
}
