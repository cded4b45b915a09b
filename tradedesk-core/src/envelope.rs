//! Response envelope decoding
//!
//! The backend wraps single resources as `{"data": T}` and lists either as a
//! flat paginator (`data`, `current_page`, `last_page`, `per_page`, `total`,
//! ...) or as a resource collection (`data`, `meta`, `links`). Only the
//! single-key wrapper is ever unwrapped blindly.

use crate::error::TransportError;
use crate::query::{Page, PaginationMeta, DEFAULT_PER_PAGE};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Unwrap `{"data": x}` into `x`. Objects with any other key stay intact.
pub fn unwrap_data_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode a single resource, unwrapping a single-key envelope first.
pub fn decode_entity<E: DeserializeOwned>(value: Value) -> Result<E, TransportError> {
    serde_json::from_value(unwrap_data_envelope(value)).map_err(decode_error)
}

/// Decode a list of resources (bulk responses), tolerating a `data` wrapper.
pub fn decode_entities<E: DeserializeOwned>(value: Value) -> Result<Vec<E>, TransportError> {
    let items = match unwrap_data_envelope(value) {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    serde_json::from_value(items).map_err(decode_error)
}

impl<E: DeserializeOwned> Page<E> {
    /// Decode any of the list shapes the backend produces.
    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        match unwrap_data_envelope(value) {
            Value::Array(items) => {
                let data: Vec<E> =
                    serde_json::from_value(Value::Array(items)).map_err(decode_error)?;
                let count = data.len() as u64;
                Ok(Page {
                    pagination: PaginationMeta {
                        current_page: 1,
                        total_pages: 1,
                        total_count: count,
                        per_page: u32::try_from(count)
                            .unwrap_or(u32::MAX)
                            .max(DEFAULT_PER_PAGE),
                    },
                    data,
                })
            }
            Value::Object(mut map) => {
                let items = map
                    .remove("data")
                    .ok_or_else(|| decode_message("list response has no `data` field"))?;
                let data: Vec<E> = serde_json::from_value(items).map_err(decode_error)?;
                let pagination = match map.get("meta") {
                    Some(Value::Object(meta)) => read_pagination(meta, data.len()),
                    _ => read_pagination(&map, data.len()),
                };
                Ok(Page { data, pagination })
            }
            other => Err(decode_message(format!(
                "expected a list response, got {}",
                value_type(&other)
            ))),
        }
    }
}

fn read_pagination(fields: &Map<String, Value>, len: usize) -> PaginationMeta {
    let per_page = read_u32(fields, "per_page").unwrap_or(DEFAULT_PER_PAGE);
    let total_count = read_u64(fields, "total").unwrap_or(len as u64);
    let total_pages =
        read_u32(fields, "last_page").unwrap_or_else(|| pages_for(total_count, per_page));
    PaginationMeta {
        current_page: read_u32(fields, "current_page").unwrap_or(1),
        total_pages,
        total_count,
        per_page,
    }
}

/// Values that do not fit a page number are treated as absent.
fn read_u32(fields: &Map<String, Value>, key: &str) -> Option<u32> {
    read_u64(fields, key).and_then(|n| u32::try_from(n).ok())
}

// Some paginators send numbers as strings.
fn read_u64(fields: &Map<String, Value>, key: &str) -> Option<u64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn pages_for(total: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 1;
    }
    u32::try_from(total.div_ceil(u64::from(per_page)))
        .unwrap_or(u32::MAX)
        .max(1)
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode_error(err: serde_json::Error) -> TransportError {
    decode_message(err.to_string())
}

fn decode_message(message: impl Into<String>) -> TransportError {
    TransportError::Decode {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: u32,
    }

    #[test]
    fn single_key_envelopes_are_unwrapped() {
        assert_eq!(unwrap_data_envelope(json!({ "data": { "id": 1 } })), json!({ "id": 1 }));
        assert_eq!(unwrap_data_envelope(json!({ "id": 1 })), json!({ "id": 1 }));
    }

    #[test]
    fn multi_key_envelopes_stay_intact() {
        let value = json!({ "data": [], "meta": {}, "links": {} });
        assert_eq!(unwrap_data_envelope(value.clone()), value);
    }

    #[test]
    fn flat_laravel_paginator() {
        let page: Page<Row> = Page::from_value(json!({
            "data": [{ "id": 1 }, { "id": 2 }],
            "current_page": 2,
            "last_page": 5,
            "per_page": 2,
            "total": 9,
            "from": 3,
            "to": 4,
            "links": []
        }))
        .unwrap();
        assert_eq!(page.data, vec![Row { id: 1 }, Row { id: 2 }]);
        assert_eq!(
            page.pagination,
            PaginationMeta {
                current_page: 2,
                total_pages: 5,
                total_count: 9,
                per_page: 2
            }
        );
    }

    #[test]
    fn resource_collection_with_meta() {
        let page: Page<Row> = Page::from_value(json!({
            "data": [{ "id": 3 }],
            "meta": { "current_page": 1, "last_page": 1, "per_page": "15", "total": 1 },
            "links": { "next": null }
        }))
        .unwrap();
        assert_eq!(page.pagination.per_page, 15);
        assert_eq!(page.pagination.total_count, 1);
    }

    #[test]
    fn oversized_page_numbers_fall_back_to_defaults() {
        let page: Page<Row> = Page::from_value(json!({
            "data": [{ "id": 1 }],
            "current_page": 4_294_967_298u64,
            "last_page": 8_589_934_592u64,
            "per_page": 4_294_967_297u64,
            "total": 25
        }))
        .unwrap();
        assert_eq!(
            page.pagination,
            PaginationMeta {
                current_page: 1,
                total_pages: 3,
                total_count: 25,
                per_page: DEFAULT_PER_PAGE
            }
        );
    }

    #[test]
    fn bare_and_wrapped_arrays_are_a_single_page() {
        let page: Page<Row> = Page::from_value(json!({ "data": [{ "id": 1 }, { "id": 2 }] })).unwrap();
        assert_eq!(page.pagination.total_count, 2);
        assert_eq!(page.pagination.total_pages, 1);

        let page: Page<Row> = Page::from_value(json!([])).unwrap();
        assert!(page.data.is_empty());
    }

    #[test]
    fn scalars_are_decode_errors() {
        let result: Result<Page<Row>, _> = Page::from_value(json!("nope"));
        assert!(matches!(result, Err(TransportError::Decode { .. })));
    }
}
