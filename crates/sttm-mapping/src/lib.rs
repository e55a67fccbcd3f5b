#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # sttm-mapping
//!
//! Per-record transformation engine for source-to-target mappings.
//!
//! For every mapping rule of a [`Registry`](sttm_schema::Registry) the
//! engine extracts a value from the input document, checks it against the
//! declared source kind, coerces it to the destination kind, optionally runs
//! a transform mask over it, and writes it into a flat output record along
//! with the destination table it belongs to.

pub mod coercion;
pub mod engine;
pub mod record;
pub mod transforms;
pub mod value;

pub use engine::{EngineConfig, MappingOutput, SttmEngine, TablePolicy};
pub use record::{TableAssignment, TableRow, TransformedRecord, record_to_json, split_by_table};
pub use value::FieldValue;

use sttm_schema::{DestinationKind, RecordKind, SourceKind};
use thiserror::Error;

/// Errors that abort the transformation of one record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Mapping rule '{rule}' references unknown {kind} '{id}'")]
    UnresolvedReference {
        rule: String,
        kind: RecordKind,
        id: String,
    },

    #[error("Required field '{field}' is not present in the input document")]
    MissingRequiredField { field: String },

    #[error("Source field '{field}' datatype has changed from {declared} to {actual}")]
    TypeDrift {
        field: String,
        declared: SourceKind,
        actual: String,
    },

    #[error("Cannot coerce field '{field}' to {target}: {input}")]
    Coercion {
        field: String,
        target: DestinationKind,
        input: String,
    },

    #[error("Specified transform mask '{mask}' is not available, select one of: [{}]", available.join(", "))]
    UnknownMask { mask: String, available: Vec<String> },

    #[error(
        "Mapping rule '{rule}' assigns table '{rule_table}' but its destination field belongs to '{destination_table}'"
    )]
    TableMismatch {
        rule: String,
        rule_table: String,
        destination_table: String,
    },

    #[error("Registry error in mapping rule '{rule}': {message}")]
    Registry { rule: String, message: String },
}

impl Error {
    /// Attach mapping-rule context to a registry lookup failure.
    pub fn from_registry(rule: impl Into<String>, error: sttm_schema::Error) -> Self {
        let rule = rule.into();
        match error {
            sttm_schema::Error::UnresolvedReference { kind, id } => {
                Self::UnresolvedReference { rule, kind, id }
            }
            sttm_schema::Error::UnknownMask { mask, available } => {
                Self::UnknownMask { mask, available }
            }
            other => Self::Registry {
                rule,
                message: other.to_string(),
            },
        }
    }

    /// Name of the field the error concerns, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field }
            | Self::TypeDrift { field, .. }
            | Self::Coercion { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
