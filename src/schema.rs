//! In-memory schema representation.
//!
//! A [`Schema`] is an ordered keyword map with typed accessors for the
//! well-known keywords. Unknown keywords pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResolveError;

pub const REF: &str = "$ref";
pub const TITLE: &str = "title";
pub const PROPERTIES: &str = "properties";
pub const DEFINITIONS: &str = "definitions";
pub const ITEMS: &str = "items";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A JSON Schema node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(Map<String, Value>);

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a decoded JSON value into a schema.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NotAnObject` if the value isn't a JSON object.
    pub fn from_value(value: Value, location: &str) -> Result<Self, ResolveError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ResolveError::NotAnObject {
                location: location.to_string(),
                actual: json_type_name(&other).to_string(),
            }),
        }
    }

    /// Decode a schema from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidJson` if the string isn't valid JSON,
    /// or `ResolveError::NotAnObject` if it isn't a JSON object.
    pub fn parse(content: &str, location: &str) -> Result<Self, ResolveError> {
        let value = serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson {
            location: location.to_string(),
            source,
        })?;
        Self::from_value(value, location)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.0.get(keyword)
    }

    pub fn insert(&mut self, keyword: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(keyword.into(), value)
    }

    pub fn remove(&mut self, keyword: &str) -> Option<Value> {
        self.0.shift_remove(keyword)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(TITLE).and_then(Value::as_str)
    }

    /// The `type` keyword when it names a single type.
    pub fn schema_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    pub fn format(&self) -> Option<&str> {
        self.get("format").and_then(Value::as_str)
    }

    pub fn minimum(&self) -> Option<f64> {
        self.get("minimum").and_then(Value::as_f64)
    }

    pub fn maximum(&self) -> Option<f64> {
        self.get("maximum").and_then(Value::as_f64)
    }

    pub fn min_items(&self) -> Option<u64> {
        self.get("minItems").and_then(Value::as_u64)
    }

    pub fn max_items(&self) -> Option<u64> {
        self.get("maxItems").and_then(Value::as_u64)
    }

    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.get(PROPERTIES).and_then(Value::as_object)
    }

    pub fn definitions(&self) -> Option<&Map<String, Value>> {
        self.get(DEFINITIONS).and_then(Value::as_object)
    }

    pub fn items(&self) -> Option<&Value> {
        self.get(ITEMS)
    }

    /// The raw `$ref` value, if it is a string.
    pub fn reference(&self) -> Option<&str> {
        self.get(REF).and_then(Value::as_str)
    }

    /// Returns true if this node or any nested schema still carries `$ref`.
    pub fn has_refs(&self) -> bool {
        map_has_refs(&self.0)
    }
}

impl From<Map<String, Value>> for Schema {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Schema> for Value {
    fn from(schema: Schema) -> Self {
        schema.into_value()
    }
}

fn map_has_refs(map: &Map<String, Value>) -> bool {
    if map.contains_key(REF) {
        return true;
    }

    let nested_in = |keyword: &str| {
        map.get(keyword)
            .and_then(Value::as_object)
            .map(|children| {
                children
                    .values()
                    .filter_map(Value::as_object)
                    .any(map_has_refs)
            })
            .unwrap_or(false)
    };

    nested_in(PROPERTIES)
        || nested_in(DEFINITIONS)
        || map
            .get(ITEMS)
            .and_then(Value::as_object)
            .map(map_has_refs)
            .unwrap_or(false)
}
