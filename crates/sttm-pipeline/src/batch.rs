//! Batch results
//!
//! Outcomes of a batch run, tagged with each record's position in the
//! input so callers can line results up with their source records.

use serde_json::Value;
use std::time::Duration;
use sttm_mapping::MappingOutput;

/// A record that transformed successfully
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedItem {
    /// Position of the record in the input
    pub index: usize,
    pub output: MappingOutput,
}

/// A record that failed and was set aside
#[derive(Debug, Clone)]
pub struct FailedItem {
    /// Position of the record in the input
    pub index: usize,
    /// The untouched input record
    pub record: Value,
    pub error: sttm_mapping::Error,
}

/// Result of transforming a batch of records
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Successfully transformed records, in input order when
    /// `preserve_order` is set
    pub successful: Vec<TransformedItem>,
    /// Records set aside by the acceptance policy, in input order when
    /// `preserve_order` is set
    pub failed: Vec<FailedItem>,
    /// Total processing time
    pub processing_time: Duration,
}

impl BatchResult {
    /// Create an empty batch result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of records processed
    pub fn processed_count(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// Check if all records succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Get success rate as a percentage
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let total = self.processed_count();
        if total == 0 {
            100.0
        } else {
            (self.successful.len() as f64 / total as f64) * 100.0
        }
    }

    /// Transformed outputs without their positions
    pub fn outputs(&self) -> impl Iterator<Item = &MappingOutput> {
        self.successful.iter().map(|item| &item.output)
    }
}
