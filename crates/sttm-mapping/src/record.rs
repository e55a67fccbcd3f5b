//! Flat output records

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::value::FieldValue;

/// Output key to coerced value, in write order
pub type TransformedRecord = IndexMap<String, FieldValue>;

/// Output key to destination table name, in write order
pub type TableAssignment = IndexMap<String, String>;

/// Convert a record to a JSON object in write order
pub fn record_to_json(record: &TransformedRecord) -> Value {
    let members: Map<String, Value> = record
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    Value::Object(members)
}

/// The part of a transformed record that belongs to one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub table: String,
    pub fields: TransformedRecord,
}

/// Split a record into one row per destination table, tables in first-seen
/// order. Keys without a table assignment are left out.
pub fn split_by_table(record: &TransformedRecord, tables: &TableAssignment) -> Vec<TableRow> {
    let mut rows: Vec<TableRow> = Vec::new();
    for (key, value) in record.iter() {
        let Some(table) = tables.get(key) else {
            continue;
        };
        match rows.iter_mut().find(|row| row.table == *table) {
            Some(row) => {
                row.fields.insert(key.clone(), value.clone());
            }
            None => {
                let mut fields = TransformedRecord::new();
                fields.insert(key.clone(), value.clone());
                rows.push(TableRow {
                    table: table.clone(),
                    fields,
                });
            }
        }
    }
    rows
}
