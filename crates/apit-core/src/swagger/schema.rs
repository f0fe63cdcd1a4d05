use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A Swagger 2.0 schema object, or a `$ref` to one.
///
/// Numeric bounds are kept as `serde_json::Number` so their decimal text
/// survives unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    // Object properties
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// `true`, `false`, or a schema for the map values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<serde_json::Value>,

    // Array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,

    // Numeric constraints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Number>,

    // String constraints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // Array constraints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
}

impl Schema {
    /// The value schema of a map-like object, if `additionalProperties`
    /// carries one.
    pub fn additional_properties_schema(&self) -> Option<Schema> {
        match &self.additional_properties {
            Some(v @ serde_json::Value::Object(_)) => serde_json::from_value(v.clone()).ok(),
            Some(serde_json::Value::Bool(true)) => Some(Schema::default()),
            _ => None,
        }
    }

    /// A structure-like object: typed `object`, or untyped with properties
    /// or `allOf` parts. Maps are excluded.
    pub fn is_object(&self) -> bool {
        if self.is_map() {
            return false;
        }
        !self.all_of.is_empty()
            || self.schema_type.as_deref() == Some("object")
            || (self.schema_type.is_none() && !self.properties.is_empty())
    }

    /// An object with no fixed properties whose values follow
    /// `additionalProperties`.
    pub fn is_map(&self) -> bool {
        self.properties.is_empty()
            && self.all_of.is_empty()
            && self.additional_properties_schema().is_some()
    }
}
