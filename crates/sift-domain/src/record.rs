//! Raw and validated extraction records

use crate::interval::CharInterval;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An untyped field map as produced by the model or a schema
pub type Payload = serde_json::Map<String, Value>;

/// The model's unvalidated output for one record in one window
///
/// Ephemeral: discarded once the aggregator has validated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    /// Record type name the model claims this record belongs to
    pub record_type: String,

    /// Unvalidated field values
    #[serde(default)]
    pub payload: Payload,

    /// Short fragment the model claims supports this record
    #[serde(default)]
    pub raw_text_hint: String,
}

impl RawExtraction {
    /// Create a raw extraction
    pub fn new(
        record_type: impl Into<String>,
        payload: Payload,
        raw_text_hint: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            payload,
            raw_text_hint: raw_text_hint.into(),
        }
    }

    /// Build from a JSON object literal; non-object values yield an empty payload
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_domain::RawExtraction;
    /// use serde_json::json;
    ///
    /// let raw = RawExtraction::from_json("medication", json!({"name": "aspirin"}), "aspirin 81mg");
    /// assert_eq!(raw.payload["name"], "aspirin");
    /// ```
    pub fn from_json(record_type: impl Into<String>, payload: Value, hint: impl Into<String>) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        Self::new(record_type, payload, hint)
    }
}

/// A record that passed schema validation, optionally anchored to the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    /// Canonical record type name (as registered in the schema set)
    pub record_type: String,

    /// Coerced, validated payload with injected fields applied
    pub payload: Payload,

    /// Supporting span in the source document, if one could be located
    pub citation: Option<CharInterval>,

    /// Source text covered by `citation`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cited_text: Option<String>,

    /// Index of the window that produced the record
    pub source_window: usize,

    /// Emission order of the record within its window
    pub ordinal: usize,
}

impl ValidatedRecord {
    /// True when a citation was found
    pub fn is_cited(&self) -> bool {
        self.citation.is_some()
    }

    /// Number of fields carrying a meaningful value
    ///
    /// Nulls, empty strings, empty arrays and empty objects do not count.
    pub fn populated_fields(&self) -> usize {
        self.payload.values().filter(|v| is_populated(v)).count()
    }
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}
