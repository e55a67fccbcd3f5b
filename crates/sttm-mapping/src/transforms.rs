//! Transform mask pipeline
//!
//! A mask is a fixed sequence of named text operations. Every operation is
//! total over text, so a mask runs over the textual view of the coerced
//! value and always yields a string.

use sttm_schema::{MappingRule, MaskOperation, Registry, TransformMask};

use crate::value::FieldValue;
use crate::{Error, Result};

/// Resolve the transform mask of a mapping rule, if it names one
///
/// # Errors
///
/// Returns [`Error::UnknownMask`] listing every registered mask name when
/// the rule's transform id is not registered.
pub fn resolve_mask<'a>(
    registry: &'a Registry,
    rule: &MappingRule,
) -> Result<Option<&'a TransformMask>> {
    registry
        .lookup_transform(rule.transform_id.as_deref())
        .map_err(|_| Error::UnknownMask {
            mask: rule.transform_id.clone().unwrap_or_default(),
            available: registry.mask_names(),
        })
}

/// Run a mask over a coerced value
pub fn apply_mask(value: &FieldValue, mask: &TransformMask) -> FieldValue {
    FieldValue::String(apply_operations(&value.to_text(), &mask.operations))
}

/// Run a sequence of operations over text, in order
pub fn apply_operations(text: &str, operations: &[MaskOperation]) -> String {
    operations
        .iter()
        .fold(text.to_string(), |current, op| apply_operation(&current, *op))
}

/// Run a single operation over text
pub fn apply_operation(text: &str, operation: MaskOperation) -> String {
    match operation {
        MaskOperation::Trim => text.trim().to_string(),
        MaskOperation::Lowercase => text.to_lowercase(),
        MaskOperation::Uppercase => text.to_uppercase(),
        MaskOperation::TitleCase => title_case(text),
    }
}

/// Upper-case the first letter of every run of letters and lower-case the
/// rest. Any non-letter starts a new word.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            result.push(c);
            in_word = false;
        }
    }
    result
}
