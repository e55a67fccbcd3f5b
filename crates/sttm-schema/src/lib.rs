#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # sttm-schema
//!
//! Registry of source fields, destination fields, transform masks, and
//! mapping rules for source-to-target mappings (STTM).
//!
//! A [`Registry`] is built once from a [`RegistryConfig`] (usually loaded
//! from a YAML or JSON file by [`RegistryLoader`]) and is read-only
//! afterwards, so a single instance can be shared by every record
//! transformation.

pub mod config;
pub mod loader;
pub mod model;
pub mod path;
pub mod registry;

pub use config::RegistryConfig;
pub use loader::RegistryLoader;
pub use model::{
    DestinationField, DestinationKind, MappingRule, MaskOperation, SourceField, SourceKind,
    TransformMask,
};
pub use path::{JsonPath, Segment};
pub use registry::{Record, RecordKind, RecordTable, Registry, TableMismatch};

use thiserror::Error;

/// Errors that can occur while building or querying a registry
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unresolved {kind} reference: '{id}'")]
    UnresolvedReference { kind: RecordKind, id: String },

    #[error("Duplicate {kind} id: '{id}'")]
    DuplicateId { kind: RecordKind, id: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Specified transform mask '{mask}' is not available, select one of: [{}]", available.join(", "))]
    UnknownMask { mask: String, available: Vec<String> },

    #[error("Invalid registry format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an unresolved-reference error for a record kind and id.
    pub fn unresolved(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            id: id.into(),
        }
    }

    /// Build an invalid-path error with the offending expression and reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
