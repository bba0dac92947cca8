//! Record schemas and the schema registry
//!
//! Record types are described by the [`TypeDescriptor`] trait and resolved by
//! name through a [`SchemaSet`]. [`RecordSchema`] is the declarative
//! descriptor used by configuration files and tests.

use crate::record::Payload;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while validating a payload against a record type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// The record type is not registered in the schema set
    #[error("Unknown record type: {0}")]
    UnknownType(String),

    /// A required field is absent or empty
    #[error("Record type '{record_type}' is missing required field '{field}'")]
    MissingField {
        /// Record type being validated
        record_type: String,
        /// Field name
        field: String,
    },

    /// A field value could not be coerced to its declared kind
    #[error("Record type '{record_type}' field '{field}' is invalid: {reason}")]
    InvalidField {
        /// Record type being validated
        record_type: String,
        /// Field name
        field: String,
        /// Why coercion failed
        reason: String,
    },
}

/// Value kind of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text
    Text,
    /// Any JSON number
    Number,
    /// Whole number
    Integer,
    /// true / false
    Boolean,
    /// Coded concept shaped as `{ "text": ..., "code": ..., "system": ... }`
    CodedConcept,
    /// List of values
    List,
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Text
    }
}

impl FieldKind {
    /// Name used in prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::CodedConcept => "coded_concept",
            FieldKind::List => "list",
        }
    }

    /// Leniently coerce a model-provided value into this kind
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        match self {
            FieldKind::Text => match value {
                Value::String(s) => Ok(Value::String(s.trim().to_string())),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                Value::Object(map) => match map.get("text") {
                    Some(Value::String(s)) => Ok(Value::String(s.trim().to_string())),
                    _ => Err("expected text, found object".to_string()),
                },
                other => Err(format!("expected text, found {}", kind_of(&other))),
            },
            FieldKind::Number => match value {
                Value::Number(n) => Ok(Value::Number(n)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("'{}' is not a number", s)),
                other => Err(format!("expected number, found {}", kind_of(&other))),
            },
            FieldKind::Integer => match value {
                Value::Number(n) => {
                    if n.is_i64() || n.is_u64() {
                        Ok(Value::Number(n))
                    } else {
                        match n.as_f64() {
                            Some(f) if f.fract() != 0.0 => Err(format!("{} is not a whole number", n)),
                            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
                            Some(f) if f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(Value::from(f as i64)),
                            _ => Err(format!("{} is out of integer range", n)),
                        }
                    }
                }
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| format!("'{}' is not an integer", s)),
                other => Err(format!("expected integer, found {}", kind_of(&other))),
            },
            FieldKind::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
                Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
                    "false" | "no" | "n" | "0" => Ok(Value::Bool(false)),
                    _ => Err(format!("'{}' is not a boolean", s)),
                },
                other => Err(format!("expected boolean, found {}", kind_of(&other))),
            },
            FieldKind::CodedConcept => match value {
                Value::String(s) => {
                    let mut concept = serde_json::Map::new();
                    concept.insert("text".to_string(), Value::String(s.trim().to_string()));
                    Ok(Value::Object(concept))
                }
                Value::Number(n) => {
                    let mut concept = serde_json::Map::new();
                    concept.insert("text".to_string(), Value::String(n.to_string()));
                    Ok(Value::Object(concept))
                }
                Value::Object(map) => {
                    if map.contains_key("text") || map.contains_key("code") {
                        Ok(Value::Object(map))
                    } else {
                        Err("coded concept needs a 'text' or 'code' entry".to_string())
                    }
                }
                other => Err(format!("expected coded concept, found {}", kind_of(&other))),
            },
            FieldKind::List => match value {
                Value::Array(items) => Ok(Value::Array(items)),
                Value::Null => Ok(Value::Array(Vec::new())),
                scalar => Ok(Value::Array(vec![scalar])),
            },
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Declaration of a single record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears in payloads
    pub name: String,

    /// Value kind
    #[serde(default)]
    pub kind: FieldKind,

    /// Whether validation fails when the field is absent
    #[serde(default)]
    pub required: bool,

    /// Guidance for the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    /// An optional field of the given kind
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: None,
        }
    }

    /// A required field of the given kind
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            required: true,
            ..Self::optional(name, kind)
        }
    }

    /// Attach a description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A record type the engine can extract
///
/// The engine only passes descriptors through to the completion capability
/// and uses [`TypeDescriptor::validate`] on returned payloads; it never
/// inspects anything else.
pub trait TypeDescriptor: Send + Sync + fmt::Debug {
    /// Registry key
    fn name(&self) -> &str;

    /// Human-readable description for prompts
    fn description(&self) -> Option<&str> {
        None
    }

    /// Declared fields, in prompt order
    fn fields(&self) -> &[FieldSpec];

    /// Coerce and validate a payload, returning the typed record
    fn validate(&self, payload: Payload) -> Result<Payload, SchemaError>;
}

/// Declarative [`TypeDescriptor`] built from a list of [`FieldSpec`]s
///
/// # Examples
///
/// ```
/// use sift_domain::{FieldKind, FieldSpec, RecordSchema, TypeDescriptor};
/// use serde_json::json;
///
/// let schema = RecordSchema::new("condition")
///     .with_field(FieldSpec::required("code", FieldKind::CodedConcept));
///
/// let payload = json!({"code": "Hypertension"}).as_object().cloned().unwrap();
/// let typed = schema.validate(payload).unwrap();
/// assert_eq!(typed["code"], json!({"text": "Hypertension"}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Record type name
    pub name: String,

    /// Description for prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared fields
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create a schema with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a field
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    fn lookup<'a>(&self, payload: &'a Payload, field: &str) -> Option<&'a Value> {
        payload.get(field).or_else(|| {
            payload
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(field))
                .map(|(_, value)| value)
        })
    }
}

impl TypeDescriptor for RecordSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn validate(&self, payload: Payload) -> Result<Payload, SchemaError> {
        let mut typed = Payload::new();

        for field in &self.fields {
            let value = match self.lookup(&payload, &field.name) {
                Some(value) if !is_blank(value) => value.clone(),
                _ => {
                    if field.required {
                        return Err(SchemaError::MissingField {
                            record_type: self.name.clone(),
                            field: field.name.clone(),
                        });
                    }
                    continue;
                }
            };

            let coerced = field.kind.coerce(value).map_err(|reason| SchemaError::InvalidField {
                record_type: self.name.clone(),
                field: field.name.clone(),
                reason,
            })?;
            typed.insert(field.name.clone(), coerced);
        }

        Ok(typed)
    }
}

/// A registered record type plus the caller-controlled values merged into
/// every record of that type
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    /// The record type
    pub descriptor: Arc<dyn TypeDescriptor>,
    /// Injected field values; these always override model output
    pub injected: Payload,
}

impl SchemaEntry {
    /// Whether `field` is supplied by the caller rather than inferred
    pub fn is_injected(&self, field: &str) -> bool {
        self.injected.contains_key(field)
    }

    /// Overlay injected values onto a payload
    pub fn inject(&self, payload: &mut Payload) {
        for (key, value) in &self.injected {
            payload.insert(key.clone(), value.clone());
        }
    }
}

/// Registry of record types keyed by name
///
/// Iteration order is by type name, which keeps prompts and grouped output
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    entries: BTreeMap<String, SchemaEntry>,
}

impl SchemaSet {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record type with no injected fields
    pub fn register(&mut self, descriptor: Arc<dyn TypeDescriptor>) -> &mut Self {
        self.register_with_injected(descriptor, Payload::new())
    }

    /// Register a record type with caller-supplied injected fields
    pub fn register_with_injected(
        &mut self,
        descriptor: Arc<dyn TypeDescriptor>,
        injected: Payload,
    ) -> &mut Self {
        let name = descriptor.name().to_string();
        self.entries.insert(name, SchemaEntry { descriptor, injected });
        self
    }

    /// Builder-style registration
    pub fn with(mut self, descriptor: impl TypeDescriptor + 'static) -> Self {
        self.register(Arc::new(descriptor));
        self
    }

    /// Builder-style registration with injected fields
    pub fn with_injected(mut self, descriptor: impl TypeDescriptor + 'static, injected: Payload) -> Self {
        self.register_with_injected(Arc::new(descriptor), injected);
        self
    }

    /// Resolve a record type by name: exact match first, then case-insensitive
    pub fn resolve(&self, name: &str) -> Option<&SchemaEntry> {
        let name = name.trim();
        self.entries.get(name).or_else(|| {
            self.entries
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, entry)| entry)
        })
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no types are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered type names in order
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Iterate over registered entries in name order
    pub fn iter(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.values()
    }

    /// All descriptors, for passing through to the completion capability
    pub fn descriptors(&self) -> Vec<Arc<dyn TypeDescriptor>> {
        self.entries.values().map(|e| Arc::clone(&e.descriptor)).collect()
    }
}
