//! Mapping engine
//!
//! Runs every mapping rule of a registry over one input document and
//! assembles the transformed record plus its table assignment.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use sttm_schema::{DestinationField, MappingRule, Registry};
use tracing::{debug, trace};

use crate::coercion::{coerce, validate_source};
use crate::record::{TableAssignment, TableRow, TransformedRecord, split_by_table};
use crate::transforms::{apply_mask, resolve_mask};
use crate::{Error, Result};

static NULL: Value = Value::Null;

/// Which table name is written into the table assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TablePolicy {
    /// The mapping rule's own table
    #[default]
    Rule,
    /// The destination field's table
    Destination,
    /// Both must agree, otherwise the record aborts
    Strict,
}

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub table_policy: TablePolicy,
}

/// Result of transforming one record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingOutput {
    /// Output key to coerced (and possibly masked) value
    pub record: TransformedRecord,
    /// Output key to destination table
    pub tables: TableAssignment,
}

impl MappingOutput {
    /// One row per destination table
    pub fn table_rows(&self) -> Vec<TableRow> {
        split_by_table(&self.record, &self.tables)
    }
}

/// Source-to-target mapping engine.
///
/// The engine holds no per-record state, so one instance can serve any
/// number of threads.
#[derive(Debug, Clone)]
pub struct SttmEngine {
    registry: Arc<Registry>,
    config: EngineConfig,
}

impl SttmEngine {
    /// Create an engine with the default configuration
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    /// Create an engine with a specific configuration
    pub fn with_config(registry: Arc<Registry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Transform one input document.
    ///
    /// Rules run in registration order. The first failing rule aborts the
    /// whole record and no partial output is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the first rule that fails.
    pub fn transform(&self, document: &Value) -> Result<MappingOutput> {
        let mut output = MappingOutput::default();

        for rule in self.registry.mapping_rules() {
            self.execute_rule(rule, document, &mut output)?;
        }

        debug!(fields = output.record.len(), "Transformed record");
        Ok(output)
    }

    /// Execute a single mapping rule
    fn execute_rule(
        &self,
        rule: &MappingRule,
        document: &Value,
        output: &mut MappingOutput,
    ) -> Result<()> {
        let source = self
            .registry
            .lookup_source(&rule.source_id)
            .map_err(|e| Error::from_registry(&rule.id, e))?;
        let destination = self
            .registry
            .lookup_destination(&rule.destination_id)
            .map_err(|e| Error::from_registry(&rule.id, e))?;
        let mask = resolve_mask(&self.registry, rule)?;

        if document.get(&source.name).is_none() {
            if source.required {
                return Err(Error::MissingRequiredField {
                    field: source.name.clone(),
                });
            }
            debug!(rule = %rule.id, field = %source.name, "Skipping absent optional field");
            return Ok(());
        }

        // A present top-level key whose nested path matches nothing is null.
        let raw = source.path.resolve(document).unwrap_or(&NULL);
        trace!(rule = %rule.id, path = %source.path, value = %raw, "Extracted value");

        validate_source(source, raw)?;

        let table = self.table_for(rule, destination)?;
        output
            .tables
            .insert(destination.output_key.clone(), table.to_string());

        let mut value = coerce(destination, raw)?;
        if let Some(mask) = mask {
            value = apply_mask(&value, mask);
            trace!(rule = %rule.id, mask = %mask.name, "Applied transform mask");
        }

        output.record.insert(destination.output_key.clone(), value);
        Ok(())
    }

    fn table_for<'a>(
        &self,
        rule: &'a MappingRule,
        destination: &'a DestinationField,
    ) -> Result<&'a str> {
        match self.config.table_policy {
            TablePolicy::Rule => Ok(&rule.table),
            TablePolicy::Destination => Ok(&destination.table),
            TablePolicy::Strict if rule.table == destination.table => Ok(&rule.table),
            TablePolicy::Strict => Err(Error::TableMismatch {
                rule: rule.id.clone(),
                rule_table: rule.table.clone(),
                destination_table: destination.table.clone(),
            }),
        }
    }
}
