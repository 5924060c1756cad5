//! Avro binary payload decoding.

use apache_avro::types::Value as AvroValue;
use base64::Engine;
use pubsub_types::DecodedFields;
use serde_json::Value as JsonValue;
use std::io::Read;

use crate::error::DecodeError;
use crate::resolver::SchemaHandle;

/// Decodes event payloads against a resolved schema into field maps.
///
/// Decoding is a pure function of `(schema, payload)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventDecoder;

impl EventDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, handle: &SchemaHandle, payload: &[u8]) -> Result<DecodedFields, DecodeError> {
        let schema_id = handle.schema_id.as_str();
        let mut reader = EofTracker::new(payload);

        let value = apache_avro::from_avro_datum(&handle.schema, &mut reader, None).map_err(
            |source| DecodeError::Avro {
                schema_id: schema_id.to_string(),
                source,
            },
        )?;

        // apache-avro reads an EOF at a union index as the null branch
        if reader.hit_eof {
            return Err(DecodeError::Truncated {
                schema_id: schema_id.to_string(),
            });
        }

        if !reader.remaining.is_empty() {
            return Err(DecodeError::TrailingBytes {
                schema_id: schema_id.to_string(),
                remaining: reader.remaining.len(),
            });
        }

        match value {
            AvroValue::Record(fields) => {
                let mut out = DecodedFields::new();
                for (name, field) in fields {
                    out.insert(name, to_json(schema_id, field)?);
                }
                Ok(out)
            }
            _ => Err(DecodeError::NotARecord {
                schema_id: schema_id.to_string(),
            }),
        }
    }
}

/// Slice reader that remembers whether anything tried to read past the end.
struct EofTracker<'a> {
    remaining: &'a [u8],
    hit_eof: bool,
}

impl<'a> EofTracker<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self {
            remaining: payload,
            hit_eof: false,
        }
    }
}

impl Read for EofTracker<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.remaining.read(buf)?;
        if n < buf.len() {
            self.hit_eof = true;
        }
        Ok(n)
    }
}

/// Convert an Avro value to JSON.
///
/// Unions collapse to their branch and binary values become base64 strings;
/// everything else follows apache-avro's own JSON conversion.
fn to_json(schema_id: &str, value: AvroValue) -> Result<JsonValue, DecodeError> {
    match value {
        AvroValue::Union(_, inner) => to_json(schema_id, *inner),
        AvroValue::Bytes(bytes) | AvroValue::Fixed(_, bytes) => Ok(JsonValue::String(
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )),
        AvroValue::Record(fields) => {
            let mut map = serde_json::Map::with_capacity(fields.len());
            for (name, field) in fields {
                map.insert(name, to_json(schema_id, field)?);
            }
            Ok(JsonValue::Object(map))
        }
        AvroValue::Map(entries) => {
            let mut map = serde_json::Map::with_capacity(entries.len());
            // sorted so the output does not depend on HashMap order
            let mut entries: Vec<_> = entries.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, item) in entries {
                map.insert(key, to_json(schema_id, item)?);
            }
            Ok(JsonValue::Object(map))
        }
        AvroValue::Array(items) => items
            .into_iter()
            .map(|item| to_json(schema_id, item))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        AvroValue::Enum(_, symbol) => Ok(JsonValue::String(symbol)),
        other => JsonValue::try_from(other).map_err(|e| DecodeError::Conversion {
            schema_id: schema_id.to_string(),
            message: e.to_string(),
        }),
    }
}
