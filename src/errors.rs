use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced to the user as a notice.
///
/// Cancelled or empty input is not an error: operations report it as
/// `Ok(None)` and leave everything untouched.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Machine {0} was not found")]
    NotFound(i64),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Could not read image {}: {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{field} must be {expected}, got '{value}'")]
    Parse {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("Export failed: {0}")]
    Export(String),
}

impl AppError {
    pub fn parse(field: &'static str, expected: &'static str, value: &str) -> Self {
        AppError::Parse {
            field,
            expected,
            value: value.to_string(),
        }
    }

    /// Problems caused by what the user picked or typed, as opposed to faults.
    pub fn is_warning(&self) -> bool {
        matches!(self, AppError::NotFound(_) | AppError::Parse { .. })
    }
}

