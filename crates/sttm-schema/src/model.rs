//! Registry record definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path::JsonPath;

/// Declared runtime kind of a source value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[serde(alias = "str")]
    String,
    #[serde(alias = "int")]
    Integer,
    Float,
    #[serde(alias = "bool")]
    Boolean,
    List,
    #[serde(alias = "dict")]
    Mapping,
}

impl SourceKind {
    /// Canonical name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Mapping => "mapping",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared kind of a destination value.
///
/// Variants are listed in coercion priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    #[serde(alias = "str")]
    String,
    Float,
    List,
    #[serde(alias = "int")]
    Integer,
    Set,
    #[serde(alias = "dict")]
    Mapping,
}

impl DestinationKind {
    /// All destination kinds in priority order
    pub const ALL: [DestinationKind; 6] = [
        Self::String,
        Self::Float,
        Self::List,
        Self::Integer,
        Self::Set,
        Self::Mapping,
    ];

    /// Canonical name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Float => "float",
            Self::List => "list",
            Self::Integer => "integer",
            Self::Set => "set",
            Self::Mapping => "mapping",
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named text operation inside a transform mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskOperation {
    /// Strip leading and trailing whitespace
    #[serde(alias = "strip", alias = "trim-whitespace")]
    Trim,
    /// Fold to lower case
    #[serde(alias = "lower", alias = "lower-case")]
    Lowercase,
    /// Fold to upper case
    #[serde(alias = "upper", alias = "upper-case")]
    Uppercase,
    /// Upper-case the first letter of every word, lower-case the rest
    #[serde(alias = "title")]
    TitleCase,
}

/// A typed value expected at a path in an input document
#[derive(Debug, Clone, PartialEq)]
pub struct SourceField {
    pub id: String,
    /// Top-level key whose presence is checked before extraction
    pub name: String,
    pub path: JsonPath,
    pub kind: SourceKind,
    /// Whether a missing field aborts the record
    pub required: bool,
}

/// A typed output slot belonging to a destination table
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationField {
    pub id: String,
    pub name: String,
    /// Key written into the transformed record
    pub output_key: String,
    pub kind: DestinationKind,
    /// Sentinel coerced to `kind` when the source value is null
    pub default_value: String,
    pub table: String,
}

/// A named, fixed sequence of text operations
#[derive(Debug, Clone, PartialEq)]
pub struct TransformMask {
    pub id: String,
    pub name: String,
    pub operations: Vec<MaskOperation>,
}

impl TransformMask {
    /// Names of the built-in masks, in catalog order
    pub const BUILTIN_NAMES: [&'static str; 2] = ["CLEAN_STRING", "CAPITAL_LETTER"];

    /// Operations of a built-in mask
    pub fn builtin_operations(name: &str) -> Option<Vec<MaskOperation>> {
        match name {
            "CLEAN_STRING" => Some(vec![MaskOperation::Trim, MaskOperation::Lowercase]),
            "CAPITAL_LETTER" => Some(vec![
                MaskOperation::Trim,
                MaskOperation::Lowercase,
                MaskOperation::TitleCase,
            ]),
            _ => None,
        }
    }
}

/// Binding of one source field to one destination field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    pub id: String,
    pub source_id: String,
    pub destination_id: String,
    /// Transform mask id, `None` when the value is written as coerced
    pub transform_id: Option<String>,
    pub table: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_aliases_deserialize() {
        let kinds: Vec<SourceKind> =
            serde_json::from_str(r#"["str", "int", "float", "bool", "list", "dict", "string"]"#)
                .unwrap();
        assert_eq!(
            kinds,
            vec![
                SourceKind::String,
                SourceKind::Integer,
                SourceKind::Float,
                SourceKind::Boolean,
                SourceKind::List,
                SourceKind::Mapping,
                SourceKind::String,
            ]
        );

        let destination: Vec<DestinationKind> =
            serde_json::from_str(r#"["str", "float", "list", "int", "set", "dict"]"#).unwrap();
        assert_eq!(destination, DestinationKind::ALL.to_vec());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<DestinationKind, _> = serde_json::from_str(r#""tuple""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_mask_operation_names() {
        let ops: Vec<MaskOperation> =
            serde_json::from_str(r#"["trim", "strip", "lower", "title-case", "uppercase"]"#)
                .unwrap();
        assert_eq!(
            ops,
            vec![
                MaskOperation::Trim,
                MaskOperation::Trim,
                MaskOperation::Lowercase,
                MaskOperation::TitleCase,
                MaskOperation::Uppercase,
            ]
        );
    }

    #[test]
    fn test_builtin_masks() {
        for name in TransformMask::BUILTIN_NAMES {
            assert!(TransformMask::builtin_operations(name).is_some());
        }
        assert_eq!(
            TransformMask::builtin_operations("CLEAN_STRING"),
            Some(vec![MaskOperation::Trim, MaskOperation::Lowercase])
        );
        assert!(TransformMask::builtin_operations("SHOUT").is_none());
    }
}
