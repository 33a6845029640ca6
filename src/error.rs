#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("either an input path or raw text must be provided")]
    MissingSource,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("report serialization error: {0}")]
    ReportError(#[from] serde_json::Error),
}
