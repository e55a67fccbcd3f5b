//! Source kind validation and destination kind coercion

use serde_json::{Map, Value};
use sttm_schema::{DestinationField, DestinationKind, SourceField, SourceKind};

use crate::value::FieldValue;
use crate::{Error, Result};

/// Coercion rule for one destination kind. The key names the single member
/// of a mapping built from a non-object value.
type CoerceFn = fn(&Value, &str) -> Option<FieldValue>;

/// Name of the runtime kind of a JSON value
pub fn runtime_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Whether a non-null value has the declared source kind
pub fn matches_kind(kind: SourceKind, value: &Value) -> bool {
    match kind {
        SourceKind::String => value.is_string(),
        SourceKind::Integer => value.is_i64() || value.is_u64(),
        SourceKind::Float => value.is_f64(),
        SourceKind::Boolean => value.is_boolean(),
        SourceKind::List => value.is_array(),
        SourceKind::Mapping => value.is_object(),
    }
}

/// Check an extracted value against its source field's declared kind.
/// Null values are exempt.
///
/// # Errors
///
/// Returns [`Error::TypeDrift`] when a non-null value has another kind.
pub fn validate_source(field: &SourceField, value: &Value) -> Result<()> {
    if value.is_null() || matches_kind(field.kind, value) {
        return Ok(());
    }
    Err(Error::TypeDrift {
        field: field.name.clone(),
        declared: field.kind,
        actual: runtime_kind(value).to_string(),
    })
}

/// Coerce an extracted value to its destination field's kind. A null value
/// is replaced by the field's default sentinel before coercion.
///
/// # Errors
///
/// Returns [`Error::Coercion`] when the value (or default) cannot be
/// converted.
pub fn coerce(field: &DestinationField, value: &Value) -> Result<FieldValue> {
    if value.is_null() {
        let default = Value::String(field.default_value.clone());
        return coerce_to(field.kind, &default, &field.output_key);
    }
    coerce_to(field.kind, value, &field.output_key)
}

/// Coerce a value to a destination kind
///
/// # Errors
///
/// Returns [`Error::Coercion`] when the value cannot be converted.
pub fn coerce_to(kind: DestinationKind, value: &Value, field: &str) -> Result<FieldValue> {
    coercion_for(kind)(value, field).ok_or_else(|| Error::Coercion {
        field: field.to_string(),
        target: kind,
        input: value.to_string(),
    })
}

fn coercion_for(kind: DestinationKind) -> CoerceFn {
    match kind {
        DestinationKind::String => to_string,
        DestinationKind::Float => to_float,
        DestinationKind::List => to_list,
        DestinationKind::Integer => to_integer,
        DestinationKind::Set => to_set,
        DestinationKind::Mapping => to_mapping,
    }
}

fn to_string(value: &Value, _key: &str) -> Option<FieldValue> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    };
    Some(FieldValue::String(text))
}

fn to_float(value: &Value, _key: &str) -> Option<FieldValue> {
    let float = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    float.is_finite().then_some(FieldValue::Float(float))
}

fn to_integer(value: &Value, _key: &str) -> Option<FieldValue> {
    let integer = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => truncate(n.as_f64()?)?,
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Bool(b) => i64::from(*b),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    Some(FieldValue::Integer(integer))
}

/// Truncate toward zero, rejecting values outside the `i64` range
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn truncate(float: f64) -> Option<i64> {
    let truncated = float.trunc();
    let in_range = truncated >= i64::MIN as f64 && truncated < i64::MAX as f64;
    (float.is_finite() && in_range).then_some(truncated as i64)
}

fn to_list(value: &Value, _key: &str) -> Option<FieldValue> {
    let items = match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    Some(FieldValue::List(items))
}

fn to_set(value: &Value, _key: &str) -> Option<FieldValue> {
    let mut distinct: Vec<Value> = Vec::new();
    let items = match value {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    for item in items {
        if !distinct.contains(item) {
            distinct.push(item.clone());
        }
    }
    Some(FieldValue::Set(distinct))
}

fn to_mapping(value: &Value, key: &str) -> Option<FieldValue> {
    let members = match value {
        Value::Object(members) => members.clone(),
        other => {
            let mut members = Map::new();
            members.insert(key.to_string(), other.clone());
            members
        }
    };
    Some(FieldValue::Mapping(members))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sttm_schema::JsonPath;

    fn source(name: &str, kind: SourceKind) -> SourceField {
        SourceField {
            id: "1".to_string(),
            name: name.to_string(),
            path: JsonPath::parse(&format!("$.{name}")).unwrap(),
            kind,
            required: true,
        }
    }

    fn destination(key: &str, kind: DestinationKind, default_value: &str) -> DestinationField {
        DestinationField {
            id: "1".to_string(),
            name: key.to_string(),
            output_key: key.to_string(),
            kind,
            default_value: default_value.to_string(),
            table: "Fact".to_string(),
        }
    }

    #[test]
    fn test_runtime_kinds() {
        assert_eq!(runtime_kind(&json!(null)), "null");
        assert_eq!(runtime_kind(&json!(true)), "boolean");
        assert_eq!(runtime_kind(&json!(3)), "integer");
        assert_eq!(runtime_kind(&json!(3.0)), "float");
        assert_eq!(runtime_kind(&json!("3")), "string");
        assert_eq!(runtime_kind(&json!([3])), "list");
        assert_eq!(runtime_kind(&json!({"a": 3})), "mapping");
    }

    #[test]
    fn test_validate_source_accepts_matching_kind_and_null() {
        let day = source("day", SourceKind::Integer);
        assert!(validate_source(&day, &json!(3)).is_ok());
        assert!(validate_source(&day, &Value::Null).is_ok());
    }

    #[test]
    fn test_validate_source_reports_type_drift() {
        let day = source("day", SourceKind::Integer);
        let result = validate_source(&day, &json!("3"));
        assert_eq!(
            result,
            Err(Error::TypeDrift {
                field: "day".to_string(),
                declared: SourceKind::Integer,
                actual: "string".to_string(),
            })
        );

        let flag = source("vip", SourceKind::Integer);
        assert!(validate_source(&flag, &json!(true)).is_err());
        assert!(validate_source(&source("price", SourceKind::Float), &json!(2)).is_err());
    }

    #[test]
    fn test_coerce_to_string() {
        let field = destination("name", DestinationKind::String, "n/a");
        assert_eq!(coerce(&field, &json!("Ada")).unwrap(), FieldValue::from("Ada"));
        assert_eq!(coerce(&field, &json!(3)).unwrap(), FieldValue::from("3"));
        assert_eq!(coerce(&field, &json!(2.5)).unwrap(), FieldValue::from("2.5"));
        assert_eq!(coerce(&field, &json!(false)).unwrap(), FieldValue::from("false"));
    }

    #[test]
    fn test_coerce_to_float() {
        let field = destination("day", DestinationKind::Float, "n/a");
        assert_eq!(coerce(&field, &json!(3)).unwrap(), FieldValue::Float(3.0));
        assert_eq!(coerce(&field, &json!(" 4.5 ")).unwrap(), FieldValue::Float(4.5));
        assert_eq!(coerce(&field, &json!(true)).unwrap(), FieldValue::Float(1.0));
    }

    #[test]
    fn test_coerce_to_float_rejects_non_numeric() {
        let field = destination("day", DestinationKind::Float, "n/a");
        for input in [json!("monday"), json!("NaN"), json!([1]), json!({"a": 1})] {
            match coerce(&field, &input) {
                Err(Error::Coercion { field, target, .. }) => {
                    assert_eq!(field, "day");
                    assert_eq!(target, DestinationKind::Float);
                }
                other => panic!("expected coercion error for {input}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_coerce_to_integer() {
        let field = destination("num_items", DestinationKind::Integer, "0");
        assert_eq!(coerce(&field, &json!(7)).unwrap(), FieldValue::Integer(7));
        assert_eq!(coerce(&field, &json!(7.9)).unwrap(), FieldValue::Integer(7));
        assert_eq!(coerce(&field, &json!(-7.9)).unwrap(), FieldValue::Integer(-7));
        assert_eq!(coerce(&field, &json!("12")).unwrap(), FieldValue::Integer(12));
        assert!(coerce(&field, &json!("12.5")).is_err());
        assert!(coerce(&field, &json!(1e300)).is_err());
    }

    #[test]
    fn test_coerce_to_containers() {
        let list = destination("tags", DestinationKind::List, "n/a");
        assert_eq!(
            coerce(&list, &json!("a")).unwrap(),
            FieldValue::List(vec![json!("a")])
        );
        assert_eq!(
            coerce(&list, &json!(["a", "a"])).unwrap(),
            FieldValue::List(vec![json!("a"), json!("a")])
        );

        let set = destination("tags", DestinationKind::Set, "n/a");
        assert_eq!(
            coerce(&set, &json!(["a", "b", "a"])).unwrap(),
            FieldValue::Set(vec![json!("a"), json!("b")])
        );
        assert_eq!(coerce(&set, &json!(1)).unwrap(), FieldValue::Set(vec![json!(1)]));

        let mapping = destination("meta", DestinationKind::Mapping, "n/a");
        let FieldValue::Mapping(members) = coerce(&mapping, &json!(5)).unwrap() else {
            panic!("expected mapping");
        };
        assert_eq!(members.get("meta"), Some(&json!(5)));
        let FieldValue::Mapping(members) = coerce(&mapping, &json!({"a": 1})).unwrap() else {
            panic!("expected mapping");
        };
        assert_eq!(members.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_null_injects_default() {
        let name = destination("waiter", DestinationKind::String, "n/a");
        assert_eq!(coerce(&name, &Value::Null).unwrap(), FieldValue::from("n/a"));

        let tags = destination("tags", DestinationKind::List, "n/a");
        assert_eq!(
            coerce(&tags, &Value::Null).unwrap(),
            FieldValue::List(vec![json!("n/a")])
        );

        let count = destination("num_customers", DestinationKind::Float, "0");
        assert_eq!(coerce(&count, &Value::Null).unwrap(), FieldValue::Float(0.0));
    }

    #[test]
    fn test_non_numeric_default_fails_numeric_coercion() {
        let day = destination("day", DestinationKind::Float, "n/a");
        match coerce(&day, &Value::Null) {
            Err(Error::Coercion { input, .. }) => assert_eq!(input, r#""n/a""#),
            other => panic!("expected coercion error, got {other:?}"),
        }
    }
}
