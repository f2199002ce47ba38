//! Error types for rust_metagene

use thiserror::Error;

/// Main error type for metagene projection and association analysis
#[derive(Error, Debug)]
pub enum MetageneError {
    #[error("Invalid expression matrix: {reason}")]
    InvalidExpressionMatrix { reason: String },

    #[error("Invalid drug-response table: {reason}")]
    InvalidDrugResponse { reason: String },

    #[error("Invalid pathway table: {reason}")]
    InvalidPathwayTable { reason: String },

    #[error("Invalid identifier map: {reason}")]
    InvalidIdentifierMap { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Degenerate decomposition for pathway {pathway}: {reason}")]
    DegenerateDecomposition { pathway: String, reason: String },

    #[error(
        "No shared cell lines between metagene matrix ({metagene_columns} columns) \
         and drug-response matrix ({drug_columns} columns)"
    )]
    NoSharedCellLines {
        metagene_columns: usize,
        drug_columns: usize,
    },

    #[error("Association threshold must lie in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for metagene operations
pub type Result<T> = std::result::Result<T, MetageneError>;
