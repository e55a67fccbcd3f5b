//! Registry configuration records
//!
//! These are the serializable records a registry is built from. They mirror
//! the registry model one-to-one but keep paths as raw strings and let
//! optional attributes fall back to defaults.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::model::{
    DestinationField, DestinationKind, MappingRule, MaskOperation, SourceField, SourceKind,
    TransformMask,
};
use crate::path::JsonPath;
use crate::registry::Registry;
use crate::{Error, Result};

/// Default sentinel injected for null source values
pub const DEFAULT_VALUE: &str = "n/a";

/// Ordered collections of registry records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub path: String,
    pub kind: SourceKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub output_key: Option<String>,
    pub kind: DestinationKind,
    #[serde(default = "default_value")]
    pub default_value: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub id: String,
    pub name: String,
    /// Omitted for built-in masks
    #[serde(default)]
    pub operations: Option<Vec<MaskOperation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub id: String,
    pub source: String,
    pub destination: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub transform: Option<String>,
    pub table: String,
}

fn default_required() -> bool {
    true
}

fn default_value() -> String {
    DEFAULT_VALUE.to_string()
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|id| !id.trim().is_empty()))
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source field
    pub fn add_source(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        kind: SourceKind,
        required: bool,
    ) -> &mut Self {
        self.sources.push(SourceConfig {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            kind,
            required,
        });
        self
    }

    /// Register a destination field whose output key equals its name and
    /// whose default value is [`DEFAULT_VALUE`]
    pub fn add_destination(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        kind: DestinationKind,
        table: impl Into<String>,
    ) -> &mut Self {
        self.destinations.push(DestinationConfig {
            id: id.into(),
            name: name.into(),
            output_key: None,
            kind,
            default_value: default_value(),
            table: table.into(),
        });
        self
    }

    /// Register a transform mask with explicit operations
    pub fn add_transform(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        operations: Vec<MaskOperation>,
    ) -> &mut Self {
        self.transforms.push(TransformConfig {
            id: id.into(),
            name: name.into(),
            operations: Some(operations),
        });
        self
    }

    /// Register a transform that refers to a built-in mask by name
    pub fn add_builtin_transform(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> &mut Self {
        self.transforms.push(TransformConfig {
            id: id.into(),
            name: name.into(),
            operations: None,
        });
        self
    }

    /// Register a mapping rule; an empty transform id means no transform
    pub fn add_mapping(
        &mut self,
        id: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        transform: impl Into<String>,
        table: impl Into<String>,
    ) -> &mut Self {
        let transform = transform.into();
        self.mappings.push(MappingConfig {
            id: id.into(),
            source: source.into(),
            destination: destination.into(),
            transform: (!transform.is_empty()).then_some(transform),
            table: table.into(),
        });
        self
    }

    /// Build an immutable registry from the configured records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for a malformed source path,
    /// [`Error::UnknownMask`] for a transform with no operations that names
    /// no built-in mask, and [`Error::DuplicateId`] for repeated ids.
    pub fn build(&self) -> Result<Registry> {
        let sources = self
            .sources
            .iter()
            .map(SourceConfig::to_field)
            .collect::<Result<Vec<_>>>()?;
        let destinations = self
            .destinations
            .iter()
            .map(DestinationConfig::to_field)
            .collect();
        let transforms = self
            .transforms
            .iter()
            .map(TransformConfig::to_mask)
            .collect::<Result<Vec<_>>>()?;
        let mappings = self.mappings.iter().map(MappingConfig::to_rule).collect();

        let registry = Registry::new(sources, destinations, transforms, mappings)?;
        debug!(
            sources = self.sources.len(),
            destinations = self.destinations.len(),
            transforms = self.transforms.len(),
            mappings = self.mappings.len(),
            "Built registry"
        );
        Ok(registry)
    }
}

impl SourceConfig {
    fn to_field(&self) -> Result<SourceField> {
        Ok(SourceField {
            id: self.id.clone(),
            name: self.name.clone(),
            path: JsonPath::parse(&self.path)?,
            kind: self.kind,
            required: self.required,
        })
    }
}

impl DestinationConfig {
    fn to_field(&self) -> DestinationField {
        DestinationField {
            id: self.id.clone(),
            name: self.name.clone(),
            output_key: self.output_key.clone().unwrap_or_else(|| self.name.clone()),
            kind: self.kind,
            default_value: self.default_value.clone(),
            table: self.table.clone(),
        }
    }
}

impl TransformConfig {
    fn to_mask(&self) -> Result<TransformMask> {
        let operations = match &self.operations {
            Some(operations) => operations.clone(),
            None => TransformMask::builtin_operations(&self.name).ok_or_else(|| {
                Error::UnknownMask {
                    mask: self.name.clone(),
                    available: TransformMask::BUILTIN_NAMES
                        .iter()
                        .map(|name| (*name).to_string())
                        .collect(),
                }
            })?,
        };
        Ok(TransformMask {
            id: self.id.clone(),
            name: self.name.clone(),
            operations,
        })
    }
}

impl MappingConfig {
    fn to_rule(&self) -> MappingRule {
        MappingRule {
            id: self.id.clone(),
            source_id: self.source.clone(),
            destination_id: self.destination.clone(),
            transform_id: self.transform.clone(),
            table: self.table.clone(),
        }
    }
}
