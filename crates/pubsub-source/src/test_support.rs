//! Helpers shared by unit tests in this crate.

use apache_avro::types::Value;
use apache_avro::{to_avro_datum, Schema};
use event_schema::{FileSchemaFetcher, SchemaFetcher, SchemaResolver};
use pubsub_types::{RawEvent, ReplayToken};
use std::sync::Arc;
use tempfile::TempDir;

pub const SCHEMA_ID: &str = "schema-1";

pub const ORDER_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Order_Event__e",
    "fields": [
        {"name": "Order_Number__c", "type": "string"}
    ]
}"#;

/// Resolver backed by a temp directory holding `schema-1.avsc`.
pub fn file_resolver() -> (TempDir, Arc<SchemaResolver>) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(format!("{SCHEMA_ID}.avsc")), ORDER_SCHEMA).unwrap();
    let fetcher: Arc<dyn SchemaFetcher> = Arc::new(FileSchemaFetcher::new(dir.path()));
    (dir, Arc::new(SchemaResolver::new(vec![fetcher])))
}

pub fn avro_payload(order: &str) -> Vec<u8> {
    let schema = Schema::parse_str(ORDER_SCHEMA).unwrap();
    let record = Value::Record(vec![(
        "Order_Number__c".to_string(),
        Value::String(order.to_string()),
    )]);
    to_avro_datum(&schema, record).unwrap()
}

pub fn token(n: u8) -> ReplayToken {
    ReplayToken::new(vec![0, 0, n]).unwrap()
}

pub fn raw_event(n: u8) -> RawEvent {
    RawEvent {
        schema_id: SCHEMA_ID.to_string(),
        event_id: format!("evt-{n}"),
        replay_token: Some(token(n)),
        payload: Some(avro_payload(&format!("ORD-{n}"))),
    }
}
