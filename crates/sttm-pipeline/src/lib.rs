#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # sttm-pipeline
//!
//! Batch orchestration over the mapping engine.
//!
//! Records are independent, so a batch runs one blocking worker per record
//! and collects the outcomes back in input order. An [`AcceptancePolicy`]
//! decides whether a failing record aborts the batch or is set aside.

pub mod batch;
pub mod output;
pub mod pipeline;
pub mod policies;

pub use batch::{BatchResult, FailedItem, TransformedItem};
pub use output::{CsvTableWriter, OutputFormat, group_by_table, write_json, write_json_lines};
pub use pipeline::{BatchConfig, BatchTransformer};
pub use policies::AcceptancePolicy;

use thiserror::Error;

/// Errors that can occur in the pipeline
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Record {index} failed: {source}")]
    Record {
        index: usize,
        #[source]
        source: sttm_mapping::Error,
    },

    #[error("Batch error: {0}")]
    Batch(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error during {operation} for '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },
}

impl Error {
    /// Create a structured I/O error with operation/path context.
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("io", "<unknown>", e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Output(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_keeps_index_and_cause() {
        let error = Error::Record {
            index: 3,
            source: sttm_mapping::Error::MissingRequiredField {
                field: "waiter".to_string(),
            },
        };
        assert_eq!(
            error.to_string(),
            "Record 3 failed: Required field 'waiter' is not present in the input document"
        );
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn io_error_from_std_error_has_fallback_context() {
        let io_error = std::fs::File::open("/path/that/does/not/exist")
            .map_err(Error::from)
            .expect_err("open should fail");

        match io_error {
            Error::Io {
                operation,
                path,
                message,
            } => {
                assert_eq!(operation, "io");
                assert_eq!(path, "<unknown>");
                assert!(!message.is_empty());
            }
            _ => panic!("expected io variant"),
        }
    }
}
