//! Immutable registry of mapping definitions

use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::model::{DestinationField, MappingRule, SourceField, TransformMask};
use crate::{Error, Result};

/// The four kinds of record held by a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Source,
    Destination,
    Transform,
    Mapping,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Source => "source field",
            Self::Destination => "destination field",
            Self::Transform => "transform mask",
            Self::Mapping => "mapping rule",
        };
        f.write_str(name)
    }
}

/// A registry record addressable by id
pub trait Record {
    const KIND: RecordKind;

    fn id(&self) -> &str;
}

impl Record for SourceField {
    const KIND: RecordKind = RecordKind::Source;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for DestinationField {
    const KIND: RecordKind = RecordKind::Destination;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for TransformMask {
    const KIND: RecordKind = RecordKind::Transform;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for MappingRule {
    const KIND: RecordKind = RecordKind::Mapping;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Ordered table of records with lookup by id
#[derive(Debug, Clone)]
pub struct RecordTable<T> {
    records: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Record> RecordTable<T> {
    /// Build a table, keeping registration order
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if two records share an id.
    pub fn new(records: Vec<T>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.id().to_string(), position).is_some() {
                return Err(Error::DuplicateId {
                    kind: T::KIND,
                    id: record.id().to_string(),
                });
            }
        }
        Ok(Self { records, index })
    }

    /// Get a record by id
    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&position| &self.records[position])
    }

    /// Get a record by id, failing when it is absent
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedReference`] if no record has this id.
    pub fn lookup(&self, id: &str) -> Result<&T> {
        self.get(id).ok_or_else(|| Error::unresolved(T::KIND, id))
    }

    /// Check if a record exists
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Records in registration order
    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A mapping rule whose table disagrees with its destination field's table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMismatch {
    pub rule_id: String,
    pub rule_table: String,
    pub destination_table: String,
}

/// Registry of source fields, destination fields, transform masks, and
/// mapping rules
#[derive(Debug, Clone)]
pub struct Registry {
    sources: RecordTable<SourceField>,
    destinations: RecordTable<DestinationField>,
    transforms: RecordTable<TransformMask>,
    mappings: RecordTable<MappingRule>,
}

impl Registry {
    /// Build a registry from its four record collections.
    ///
    /// Cross references between collections are not checked here; see
    /// [`Registry::check_references`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if any collection repeats an id.
    pub fn new(
        sources: Vec<SourceField>,
        destinations: Vec<DestinationField>,
        transforms: Vec<TransformMask>,
        mappings: Vec<MappingRule>,
    ) -> Result<Self> {
        Ok(Self {
            sources: RecordTable::new(sources)?,
            destinations: RecordTable::new(destinations)?,
            transforms: RecordTable::new(transforms)?,
            mappings: RecordTable::new(mappings)?,
        })
    }

    /// Look up a source field by id
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedReference`] if the id is unknown.
    pub fn lookup_source(&self, id: &str) -> Result<&SourceField> {
        self.sources.lookup(id)
    }

    /// Look up a destination field by id
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedReference`] if the id is unknown.
    pub fn lookup_destination(&self, id: &str) -> Result<&DestinationField> {
        self.destinations.lookup(id)
    }

    /// Look up a transform mask by id. An absent or empty id means
    /// "no transform" and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedReference`] if a non-empty id is unknown.
    pub fn lookup_transform(&self, id: Option<&str>) -> Result<Option<&TransformMask>> {
        match id {
            None | Some("") => Ok(None),
            Some(id) => self.transforms.lookup(id).map(Some),
        }
    }

    /// Mapping rules in registration order
    pub fn mapping_rules(&self) -> &[MappingRule] {
        self.mappings.as_slice()
    }

    pub fn sources(&self) -> &RecordTable<SourceField> {
        &self.sources
    }

    pub fn destinations(&self) -> &RecordTable<DestinationField> {
        &self.destinations
    }

    pub fn transforms(&self) -> &RecordTable<TransformMask> {
        &self.transforms
    }

    /// Names of every registered transform mask, in registration order
    pub fn mask_names(&self) -> Vec<String> {
        self.transforms.iter().map(|mask| mask.name.clone()).collect()
    }

    /// Distinct destination table names, in first-seen order
    pub fn tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for destination in self.destinations.iter() {
            if !tables.contains(&destination.table.as_str()) {
                tables.push(&destination.table);
            }
        }
        tables
    }

    /// Report every mapping rule reference that does not resolve. An unknown
    /// transform id is reported as [`Error::UnknownMask`] with the registered
    /// mask names.
    pub fn check_references(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        for rule in self.mappings.iter() {
            if let Err(error) = self.lookup_source(&rule.source_id) {
                errors.push(error);
            }
            if let Err(error) = self.lookup_destination(&rule.destination_id) {
                errors.push(error);
            }
            if self.lookup_transform(rule.transform_id.as_deref()).is_err() {
                errors.push(Error::UnknownMask {
                    mask: rule.transform_id.clone().unwrap_or_default(),
                    available: self.mask_names(),
                });
            }
        }
        errors
    }

    /// Rules whose own table differs from their destination field's table
    pub fn table_mismatches(&self) -> Vec<TableMismatch> {
        self.mappings
            .iter()
            .filter_map(|rule| {
                let destination = self.destinations.get(&rule.destination_id)?;
                (destination.table != rule.table).then(|| TableMismatch {
                    rule_id: rule.id.clone(),
                    rule_table: rule.table.clone(),
                    destination_table: destination.table.clone(),
                })
            })
            .collect()
    }

    /// Log a warning for every table mismatch and return how many there were
    pub fn warn_table_mismatches(&self) -> usize {
        let mismatches = self.table_mismatches();
        for mismatch in &mismatches {
            warn!(
                rule = %mismatch.rule_id,
                rule_table = %mismatch.rule_table,
                destination_table = %mismatch.destination_table,
                "Mapping rule table differs from destination field table"
            );
        }
        mismatches.len()
    }

    /// Fail on the first unresolved reference; log table mismatches.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::UnresolvedReference`] or
    /// [`Error::UnknownMask`] found.
    pub fn validate(&self) -> Result<()> {
        self.warn_table_mismatches();

        match self.check_references().into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DestinationKind, MaskOperation, SourceKind};
    use crate::path::JsonPath;

    fn source(id: &str, name: &str) -> SourceField {
        SourceField {
            id: id.to_string(),
            name: name.to_string(),
            path: JsonPath::parse(&format!("$.{name}")).unwrap(),
            kind: SourceKind::String,
            required: true,
        }
    }

    fn destination(id: &str, name: &str, table: &str) -> DestinationField {
        DestinationField {
            id: id.to_string(),
            name: name.to_string(),
            output_key: name.to_string(),
            kind: DestinationKind::String,
            default_value: "n/a".to_string(),
            table: table.to_string(),
        }
    }

    fn rule(id: &str, source: &str, destination: &str, transform: Option<&str>) -> MappingRule {
        MappingRule {
            id: id.to_string(),
            source_id: source.to_string(),
            destination_id: destination.to_string(),
            transform_id: transform.map(str::to_string),
            table: "Fact".to_string(),
        }
    }

    fn mask(id: &str, name: &str) -> TransformMask {
        TransformMask {
            id: id.to_string(),
            name: name.to_string(),
            operations: vec![MaskOperation::Trim],
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let registry = Registry::new(
            vec![source("1", "date"), source("2", "waiter")],
            vec![destination("1", "date", "Fact")],
            vec![mask("1", "CLEAN_STRING")],
            vec![rule("1", "1", "1", None)],
        )
        .unwrap();

        assert_eq!(registry.lookup_source("2").unwrap().name, "waiter");
        assert_eq!(registry.lookup_destination("1").unwrap().table, "Fact");
        assert_eq!(
            registry.lookup_transform(Some("1")).unwrap().unwrap().name,
            "CLEAN_STRING"
        );
        assert_eq!(registry.mapping_rules().len(), 1);
    }

    #[test]
    fn test_lookup_unknown_id_fails_explicitly() {
        let registry = Registry::new(vec![], vec![], vec![], vec![]).unwrap();

        match registry.lookup_source("42") {
            Err(Error::UnresolvedReference { kind, id }) => {
                assert_eq!(kind, RecordKind::Source);
                assert_eq!(id, "42");
            }
            other => panic!("expected unresolved reference, got {other:?}"),
        }
        assert!(registry.lookup_destination("42").is_err());
        assert!(registry.lookup_transform(Some("42")).is_err());
    }

    #[test]
    fn test_absent_transform_id_means_no_transform() {
        let registry = Registry::new(vec![], vec![], vec![], vec![]).unwrap();
        assert!(registry.lookup_transform(None).unwrap().is_none());
        assert!(registry.lookup_transform(Some("")).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Registry::new(
            vec![source("1", "date"), source("1", "start")],
            vec![],
            vec![],
            vec![],
        );
        assert!(matches!(
            result,
            Err(Error::DuplicateId {
                kind: RecordKind::Source,
                ..
            })
        ));
    }

    #[test]
    fn test_rules_keep_registration_order() {
        let registry = Registry::new(
            vec![source("1", "a"), source("2", "b"), source("3", "c")],
            vec![
                destination("1", "a", "T"),
                destination("2", "b", "T"),
                destination("3", "c", "T"),
            ],
            vec![],
            vec![
                rule("30", "3", "3", None),
                rule("10", "1", "1", None),
                rule("20", "2", "2", None),
            ],
        )
        .unwrap();

        let ids: Vec<_> = registry.mapping_rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["30", "10", "20"]);
    }

    #[test]
    fn test_check_references_reports_every_dangling_id() {
        let registry = Registry::new(
            vec![source("1", "date")],
            vec![destination("1", "date", "Fact")],
            vec![],
            vec![rule("1", "1", "1", None), rule("2", "9", "8", Some("7"))],
        )
        .unwrap();

        let errors = registry.check_references();
        assert_eq!(errors.len(), 3);
        assert!(matches!(
            &errors[0],
            Error::UnresolvedReference { kind: RecordKind::Source, id } if id == "9"
        ));
        assert!(matches!(
            &errors[1],
            Error::UnresolvedReference { kind: RecordKind::Destination, id } if id == "8"
        ));
        assert!(matches!(&errors[2], Error::UnknownMask { mask, .. } if mask == "7"));
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_unknown_transform_lists_registered_masks() {
        let registry = Registry::new(
            vec![source("1", "date")],
            vec![destination("1", "date", "Fact")],
            vec![mask("1", "CLEAN_STRING"), mask("2", "CAPITAL_LETTER")],
            vec![rule("1", "1", "1", Some("9"))],
        )
        .unwrap();

        match registry.validate() {
            Err(Error::UnknownMask { mask, available }) => {
                assert_eq!(mask, "9");
                assert_eq!(available, vec!["CLEAN_STRING", "CAPITAL_LETTER"]);
            }
            other => panic!("expected unknown mask, got {other:?}"),
        }
    }

    #[test]
    fn test_table_mismatches() {
        let registry = Registry::new(
            vec![source("1", "date")],
            vec![destination("1", "date", "Sales")],
            vec![],
            vec![rule("1", "1", "1", None)],
        )
        .unwrap();

        let mismatches = registry.table_mismatches();
        assert_eq!(
            mismatches,
            vec![TableMismatch {
                rule_id: "1".to_string(),
                rule_table: "Fact".to_string(),
                destination_table: "Sales".to_string(),
            }]
        );
        assert_eq!(registry.warn_table_mismatches(), 1);
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_tables_and_mask_names() {
        let registry = Registry::new(
            vec![],
            vec![
                destination("1", "a", "Fact"),
                destination("2", "b", "Sales"),
                destination("3", "c", "Fact"),
            ],
            vec![mask("1", "CLEAN_STRING"), mask("2", "CAPITAL_LETTER")],
            vec![],
        )
        .unwrap();

        assert_eq!(registry.tables(), vec!["Fact", "Sales"]);
        assert_eq!(registry.mask_names(), vec!["CLEAN_STRING", "CAPITAL_LETTER"]);
    }
}
