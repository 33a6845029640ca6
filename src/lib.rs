// src/lib.rs
pub mod error;
pub mod extract;
pub mod filter;
pub mod grammar;
pub mod output_format;
pub mod pipeline;
pub mod record;

pub use error::*;

pub use extract::{currency_code, extract_amount, parse_datetime, AmountInfo, FieldCleaner, MojibakeTable};
pub use filter::filter_lines;
pub use grammar::{Grammar, GrammarRegistry, MatchOutcome};
pub use output_format::{write_dataset, write_diagnostics, OutputFormat};
pub use pipeline::{ParseOutput, PipelineConfig, TransactionPipeline};
pub use record::{
    ColumnKind, Currency, Dataset, Diagnostics, DropReason, DroppedLine, ParsedRecord, RecordDraft,
};
