// src/pipeline.rs
//! Batch pipeline: line filtering, per-line grammar resolution, dataset
//! assembly, and the diagnostics report.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::ProcessingError;
use crate::extract::{FieldCleaner, MojibakeTable};
use crate::filter::filter_lines;
use crate::grammar::{GrammarRegistry, MatchOutcome};
use crate::record::{Dataset, Diagnostics, DroppedLine};

/// Configuration for batch parsing behavior.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Resolve candidate lines across the rayon thread pool. Output order
    /// is identical to sequential mode either way.
    pub parallel: bool,
    /// Corrupted-sequence replacements applied by the field cleaner.
    pub mojibake: MojibakeTable,
}

/// A parsed batch: the dataset plus its diagnostics report.
#[derive(Debug)]
pub struct ParseOutput {
    pub dataset: Dataset,
    pub diagnostics: Diagnostics,
}

/// Batch parser over the supported transaction-log layouts.
///
/// Holds the immutable grammar registry and the field cleaner; per-line
/// parsing touches no other state, so one pipeline value can serve any
/// number of batches.
pub struct TransactionPipeline {
    registry: GrammarRegistry,
    cleaner: FieldCleaner,
    config: PipelineConfig,
}

impl TransactionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_registry(GrammarRegistry::standard(), config)
    }

    /// Injects a registry built elsewhere (e.g. a trimmed or extended one).
    pub fn with_registry(registry: GrammarRegistry, config: PipelineConfig) -> Self {
        let cleaner = FieldCleaner::new(config.mojibake.clone());
        TransactionPipeline {
            registry,
            cleaner,
            config,
        }
    }

    /// Reads a UTF-8 log file and parses it. IO failure is the only error.
    pub fn parse_from_path(&self, path: &Path) -> Result<ParseOutput, ProcessingError> {
        let blob = std::fs::read_to_string(path)?;
        Ok(self.parse_from_text(&blob))
    }

    /// Parses an in-memory blob. Always yields a complete (possibly empty)
    /// dataset; bad lines surface in the diagnostics, never as errors.
    pub fn parse_from_text(&self, text: &str) -> ParseOutput {
        let start = Instant::now();
        let lines = filter_lines(text);

        let outcomes: Vec<(u32, &str, MatchOutcome)> = if self.config.parallel {
            lines
                .par_iter()
                .enumerate()
                .map(|(idx, line)| (idx as u32 + 1, *line, self.registry.resolve(line, &self.cleaner)))
                .collect()
        } else {
            lines
                .iter()
                .enumerate()
                .map(|(idx, line)| (idx as u32 + 1, *line, self.registry.resolve(line, &self.cleaner)))
                .collect()
        };

        let mut dataset = Dataset::default();
        let mut diagnostics = Diagnostics {
            lines_seen: lines.len(),
            ..Diagnostics::default()
        };

        for (row_id, line, outcome) in outcomes {
            match outcome {
                MatchOutcome::Matched { grammar, draft } => {
                    tracing::debug!(row_id, grammar, "line matched");
                    dataset.records.push(draft.finalize(row_id, line));
                }
                MatchOutcome::ExtractionFailed { grammar, source } => {
                    tracing::warn!(row_id, grammar, %source, "field extraction failed");
                    diagnostics
                        .dropped
                        .push(DroppedLine::extraction_failed(row_id, line, grammar, &source));
                }
                MatchOutcome::Unmatched => {
                    tracing::warn!(row_id, line = %line.chars().take(100).collect::<String>(), "no layout matched");
                    diagnostics.dropped.push(DroppedLine::unmatched(row_id, line));
                }
            }
        }

        diagnostics.records_parsed = dataset.records.len();
        diagnostics.elapsed = start.elapsed();
        ParseOutput {
            dataset,
            diagnostics,
        }
    }

    /// Dual-optional entry point: the path wins when both are supplied;
    /// supplying neither is the one fatal input error.
    pub fn parse_from_source(
        &self,
        path: Option<&Path>,
        text: Option<&str>,
    ) -> Result<ParseOutput, ProcessingError> {
        if let Some(path) = path {
            self.parse_from_path(path)
        } else if let Some(text) = text {
            Ok(self.parse_from_text(text))
        } else {
            Err(ProcessingError::MissingSource)
        }
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }
}
