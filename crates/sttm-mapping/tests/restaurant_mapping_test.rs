//! Integration tests: restaurant registries from testdata/registry.

use anyhow::Context;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use sttm_mapping::{Error, FieldValue, SttmEngine, record_to_json};
use sttm_schema::RegistryLoader;

fn testdata(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../testdata")
        .join(path)
}

fn engine(registry_file: &str) -> anyhow::Result<SttmEngine> {
    let registry = RegistryLoader::new()
        .load_from_file(&testdata(registry_file))
        .with_context(|| format!("failed to load {registry_file}"))?;
    Ok(SttmEngine::new(Arc::new(registry)))
}

fn records(file: &str) -> anyhow::Result<Vec<Value>> {
    let content = std::fs::read_to_string(testdata(file))
        .with_context(|| format!("failed to read {file}"))?;
    Ok(serde_json::from_str(&content)?)
}

#[test]
fn fact_orders_transform_with_masks_and_defaults() -> anyhow::Result<()> {
    let engine = engine("registry/fact.yaml")?;
    let records = records("records/fact_orders.json")?;

    let first = engine.transform(&records[0])?;
    assert_eq!(
        record_to_json(&first.record),
        json!({
            "date": "2023-03-01",
            "id": "ord-001",
            "start": "12:05",
            "num_customers": 4.0,
            "sitting_time": 55.0,
            "waiter": "John Doe",
            "day": 3.0,
            "end": "13:00"
        })
    );
    assert!(first.tables.values().all(|table| table == "Fact"));
    assert_eq!(first.tables.len(), 8);

    let second = engine.transform(&records[1])?;
    assert_eq!(second.record.get("id"), Some(&FieldValue::from("ord-002")));
    assert_eq!(second.record.get("waiter"), Some(&FieldValue::from("Mary")));

    // Null values take the destination default before masking.
    let third = engine.transform(&records[2])?;
    assert_eq!(third.record.get("num_customers"), Some(&FieldValue::Float(0.0)));
    assert_eq!(third.record.get("waiter"), Some(&FieldValue::from("N/A")));
    Ok(())
}

#[test]
fn output_keys_follow_rule_order() -> anyhow::Result<()> {
    let engine = engine("registry/fact.yaml")?;
    let records = records("records/fact_orders.json")?;

    let output = engine.transform(&records[0])?;
    let keys: Vec<&str> = output.record.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["date", "id", "start", "num_customers", "sitting_time", "waiter", "day", "end"]
    );
    let table_keys: Vec<&str> = output.tables.keys().map(String::as_str).collect();
    assert_eq!(table_keys, keys);
    Ok(())
}

#[test]
fn dirty_orders_fail_per_record() -> anyhow::Result<()> {
    let engine = engine("registry/fact.yaml")?;
    let records = records("records/dirty_orders.json")?;

    let results: Vec<_> = records.iter().map(|r| engine.transform(r)).collect();

    assert!(results[0].is_ok());
    assert!(matches!(
        &results[1],
        Err(Error::TypeDrift { field, actual, .. }) if field == "num_customers" && actual == "string"
    ));
    assert!(matches!(
        &results[2],
        Err(Error::MissingRequiredField { field }) if field == "end"
    ));
    let fourth = results[3].as_ref().map_err(Clone::clone)?;
    assert_eq!(fourth.record.get("waiter"), Some(&FieldValue::from("Sam")));
    Ok(())
}

#[test]
fn mixed_records_route_to_their_tables() -> anyhow::Result<()> {
    let engine = engine("registry/restaurant.yaml")?;
    let records = records("records/restaurant_mixed.json")?;

    let fact = engine.transform(&records[0])?;
    assert_eq!(fact.record.get("waiter"), Some(&FieldValue::from("John")));
    assert!(!fact.record.contains_key("sale_date"));
    assert!(!fact.record.contains_key("name"));
    let fact_rows = fact.table_rows();
    assert_eq!(fact_rows.len(), 1);
    assert_eq!(fact_rows[0].table, "Fact");

    let sale = engine.transform(&records[1])?;
    assert_eq!(sale.record.get("sale_order_id"), Some(&FieldValue::from("1")));
    assert_eq!(sale.record.get("sale_day"), Some(&FieldValue::Integer(3)));
    assert_eq!(sale.record.get("item_name"), Some(&FieldValue::from("Tomato Soup")));
    assert_eq!(sale.tables.get("num_items").map(String::as_str), Some("Sales"));

    let item = engine.transform(&records[2])?;
    assert_eq!(item.record.get("name"), Some(&FieldValue::from("Tomato Soup")));
    assert_eq!(item.record.get("type"), Some(&FieldValue::from("starter")));
    assert_eq!(item.record.get("subtype3"), Some(&FieldValue::from("n/a")));
    assert_eq!(item.record.get("price"), Some(&FieldValue::Float(4.5)));
    assert_eq!(item.table_rows()[0].table, "Items");
    Ok(())
}

#[test]
fn engine_is_shareable_across_threads() -> anyhow::Result<()> {
    let engine = Arc::new(engine("registry/fact.yaml")?);
    let records = records("records/fact_orders.json")?;

    let handles: Vec<_> = records
        .into_iter()
        .map(|record| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.transform(&record))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    Ok(())
}
