//! Error types for geo_explorer

use thiserror::Error;

/// Main error type for dataset loading, table building, statistics, and rendering
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Failed to fetch dataset {accession}: {reason}")]
    Fetch { accession: String, reason: String },

    #[error("Malformed SOFT record at line {line}: {reason}")]
    SoftParse { line: usize, reason: String },

    #[error("Sample identifiers do not match between expression and metadata: {reason}")]
    Merge { reason: String },

    #[error("Group '{label}' has no non-missing values for gene {gene}")]
    EmptyGroup { label: String, gene: String },

    #[error("{test} needs at least {required} values per group, group '{label}' has {got}")]
    InsufficientSample {
        test: String,
        label: String,
        required: usize,
        got: usize,
    },

    #[error("Zero variance in {context}")]
    ZeroVariance { context: String },

    #[error("Numerical failure in {operation}: {details}")]
    Numerical { operation: String, details: String },

    #[error("Could not render {chart}: {reason}")]
    Render { chart: String, reason: String },

    #[error("Unknown gene: {gene}")]
    UnknownGene { gene: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),
}

impl ExplorerError {
    /// Whether the error aborts a whole request rather than a single view
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExplorerError::Fetch { .. } | ExplorerError::SoftParse { .. }
        )
    }

    pub(crate) fn numerical(operation: &str, details: impl std::fmt::Display) -> Self {
        ExplorerError::Numerical {
            operation: operation.to_string(),
            details: details.to_string(),
        }
    }
}

/// Result type alias for geo_explorer operations
pub type Result<T> = std::result::Result<T, ExplorerError>;
