use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{Decimal, NodeValue};
use crate::ordered::OrderedMap;

use super::ids::BASE_NAMESPACE;

/// The built-in base kinds every type reduces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Integer,
    Decimal,
    Blob,
    String,
    Timestamp,
    Any,
    List,
    Map,
    Struct,
    Enum,
    Union,
}

impl BaseType {
    pub const ALL: [BaseType; 18] = [
        BaseType::Bool,
        BaseType::Int8,
        BaseType::Int16,
        BaseType::Int32,
        BaseType::Int64,
        BaseType::Float32,
        BaseType::Float64,
        BaseType::Integer,
        BaseType::Decimal,
        BaseType::Blob,
        BaseType::String,
        BaseType::Timestamp,
        BaseType::Any,
        BaseType::List,
        BaseType::Map,
        BaseType::Struct,
        BaseType::Enum,
        BaseType::Union,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BaseType::Bool => "Bool",
            BaseType::Int8 => "Int8",
            BaseType::Int16 => "Int16",
            BaseType::Int32 => "Int32",
            BaseType::Int64 => "Int64",
            BaseType::Float32 => "Float32",
            BaseType::Float64 => "Float64",
            BaseType::Integer => "Integer",
            BaseType::Decimal => "Decimal",
            BaseType::Blob => "Blob",
            BaseType::String => "String",
            BaseType::Timestamp => "Timestamp",
            BaseType::Any => "Any",
            BaseType::List => "List",
            BaseType::Map => "Map",
            BaseType::Struct => "Struct",
            BaseType::Enum => "Enum",
            BaseType::Union => "Union",
        }
    }

    /// The absolute id, e.g. `base#Int32`.
    pub fn id(&self) -> String {
        format!("{}#{}", BASE_NAMESPACE, self.name())
    }

    /// Parse an absolute `base#Name` id.
    pub fn from_id(id: &str) -> Option<BaseType> {
        let name = id.strip_prefix("base#")?;
        BaseType::ALL.iter().copied().find(|b| b.name() == name)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            BaseType::Int8
                | BaseType::Int16
                | BaseType::Int32
                | BaseType::Int64
                | BaseType::Float32
                | BaseType::Float64
                | BaseType::Integer
                | BaseType::Decimal
        )
    }

    /// Kinds that accept `minSize`/`maxSize`.
    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            BaseType::String | BaseType::Blob | BaseType::List | BaseType::Map
        )
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Range, size and pattern constraints shared by types and fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.min_value.is_none()
            && self.max_value.is_none()
            && self.min_size.is_none()
            && self.max_size.is_none()
            && self.pattern.is_none()
    }
}

/// Deprecation notice carried by types and operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deprecation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
}

/// A named user type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    pub id: String,
    pub base: BaseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    /// Element type of a list, value type of a map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<EnumElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Deprecation>,
    /// Traits with no first-class field, keyed by absolute trait id.
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub traits: OrderedMap<NodeValue>,
}

impl TypeDef {
    pub fn new(id: impl Into<String>, base: BaseType) -> Self {
        Self {
            id: id.into(),
            base,
            comment: None,
            tags: Vec::new(),
            constraints: Constraints::default(),
            items: None,
            keys: None,
            fields: Vec::new(),
            elements: Vec::new(),
            deprecated: None,
            traits: OrderedMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Ids this type refers to directly.
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        refs.extend(self.items.as_deref());
        refs.extend(self.keys.as_deref());
        refs.extend(self.fields.iter().map(|f| f.field_type.as_str()));
        refs
    }
}

/// A member of a struct or union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<NodeValue>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub traits: OrderedMap<NodeValue>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            required: false,
            comment: None,
            constraints: Constraints::default(),
            default: None,
            traits: OrderedMap::new(),
        }
    }
}

/// The value behind an enum symbol; string or integer depending on the enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum EnumValue {
    Int(i64),
    String(String),
}

impl TryFrom<serde_json::Value> for EnumValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(s) => Ok(EnumValue::String(s)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(EnumValue::Int)
                .ok_or_else(|| format!("enum value {n} is not an integer")),
            other => Err(format!("invalid enum value: {other}")),
        }
    }
}

impl From<EnumValue> for serde_json::Value {
    fn from(value: EnumValue) -> Self {
        match value {
            EnumValue::Int(i) => serde_json::Value::from(i),
            EnumValue::String(s) => serde_json::Value::String(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumElement {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<EnumValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl EnumElement {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            value: None,
            comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_ids() {
        assert_eq!(BaseType::Int32.id(), "base#Int32");
        assert_eq!(BaseType::from_id("base#Struct"), Some(BaseType::Struct));
        assert_eq!(BaseType::from_id("smithy.api#String"), None);
        assert_eq!(BaseType::from_id("base#Nope"), None);
        assert!(BaseType::Decimal.is_numeric());
        assert!(BaseType::Map.is_sized());
        assert!(!BaseType::Bool.is_sized());
    }

    #[test]
    fn test_type_references() {
        let mut t = TypeDef::new("ns#M", BaseType::Map);
        t.keys = Some("base#String".into());
        t.items = Some("ns#V".into());
        assert_eq!(t.references(), vec!["ns#V", "base#String"]);
    }

    #[test]
    fn test_enum_value_json() {
        let el: EnumElement = serde_json::from_str(r#"{"symbol": "ONE", "value": 1}"#).unwrap();
        assert_eq!(el.value, Some(EnumValue::Int(1)));
        let el: EnumElement = serde_json::from_str(r#"{"symbol": "RED", "value": "red"}"#).unwrap();
        assert_eq!(serde_json::to_string(&el).unwrap(), r#"{"symbol":"RED","value":"red"}"#);
        assert!(serde_json::from_str::<EnumElement>(r#"{"symbol": "X", "value": true}"#).is_err());
    }
}
