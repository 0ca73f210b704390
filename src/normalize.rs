//! Reshapes whatever the extraction step produced into the response fields.
//!
//! The model may hand back a JSON-encoded string, an array of blocks, or a
//! bare object. Any shape we don't understand collapses to empty values.

use serde_json::{Map, Value};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedFields {
    pub content: String,
    pub image_urls: Vec<String>,
    pub metadata: Option<Map<String, Value>>,
    pub links: Option<Vec<String>>,
}

impl ExtractedFields {
    pub fn from_payload(payload: Option<&Value>, include_metadata: bool, include_links: bool) -> Self {
        let Some(object) = payload.and_then(select_object) else {
            return Self::default();
        };

        let content = object
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let image_urls = object
            .get("main_content_image_urls")
            .map(string_list)
            .unwrap_or_default();

        let metadata = if include_metadata {
            object.get("metadata").and_then(Value::as_object).cloned()
        } else {
            None
        };

        let links = if include_links {
            object.get("links").filter(|v| v.is_array()).map(string_list)
        } else {
            None
        };

        Self {
            content,
            image_urls,
            metadata,
            links,
        }
    }
}

/// Picks the object to read fields from: the value itself, the first block of
/// an array, or either of those after decoding a JSON string.
fn select_object(payload: &Value) -> Option<Map<String, Value>> {
    match payload {
        Value::String(raw) => {
            let decoded: Value = match serde_json::from_str(raw) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!(error = %e, "extracted content is not valid JSON");
                    return None;
                }
            };
            match decoded {
                // no second round of string decoding
                Value::String(_) => None,
                other => select_object(&other),
            }
        }
        Value::Array(items) => items.first().and_then(Value::as_object).cloned(),
        Value::Object(map) => Some(map.clone()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
