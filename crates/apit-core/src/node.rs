use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ordered::OrderedMap;

/// An arbitrary-precision decimal number.
///
/// The original text is kept verbatim so that `1.50` survives a round trip.
/// Comparison is textual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decimal(serde_json::Number);

impl Decimal {
    /// Parse decimal text (`-12`, `3.25`, `1e10`). Returns `None` for anything
    /// that is not a JSON number.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.strip_prefix('+').unwrap_or(text);
        serde_json::from_str::<serde_json::Number>(text)
            .ok()
            .map(Decimal)
    }

    /// Integer value, truncating any fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        self.0
            .as_i64()
            .or_else(|| self.0.as_f64().map(|f| f.trunc() as i64))
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_i64() || self.0.is_u64()
    }

    pub fn as_number(&self) -> &serde_json::Number {
        &self.0
    }
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Decimal(serde_json::Number::from(v))
    }
}

impl From<serde_json::Number> for Decimal {
    fn from(n: serde_json::Number) -> Self {
        Decimal(n)
    }
}

impl FromStr for Decimal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::parse(s).ok_or_else(|| format!("not a decimal number: {s}"))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dynamically typed value used for trait payloads, metadata and examples.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeValue {
    #[default]
    Null,
    Bool(bool),
    String(String),
    Number(Decimal),
    Array(Vec<NodeValue>),
    Object(OrderedMap<NodeValue>),
}

impl NodeValue {
    pub fn object() -> Self {
        NodeValue::Object(OrderedMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NodeValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NodeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of a number, truncating.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            NodeValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            NodeValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[NodeValue]> {
        match self {
            NodeValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&OrderedMap<NodeValue>> {
        match self {
            NodeValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut OrderedMap<NodeValue>> {
        match self {
            NodeValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&NodeValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(NodeValue::as_string)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(NodeValue::as_bool).unwrap_or(false)
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(NodeValue::as_int).unwrap_or(default)
    }

    pub fn get_decimal(&self, key: &str) -> Option<&Decimal> {
        self.get(key).and_then(NodeValue::as_decimal)
    }

    pub fn get_slice(&self, key: &str) -> &[NodeValue] {
        self.get(key).and_then(NodeValue::as_array).unwrap_or(&[])
    }

    /// String elements of an array member; non-strings are skipped.
    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.get_slice(key)
            .iter()
            .filter_map(|v| v.as_string().map(str::to_string))
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.as_object().map(OrderedMap::keys).unwrap_or_default()
    }

    /// Number of object entries or array elements.
    pub fn len(&self) -> usize {
        match self {
            NodeValue::Object(m) => m.len(),
            NodeValue::Array(a) => a.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put a key into an object value. A non-object value is replaced by a
    /// fresh object first.
    pub fn put(&mut self, key: impl Into<String>, value: NodeValue) {
        if !matches!(self, NodeValue::Object(_)) {
            *self = NodeValue::object();
        }
        if let NodeValue::Object(map) = self {
            map.put(key, value);
        }
    }
}

impl From<&str> for NodeValue {
    fn from(s: &str) -> Self {
        NodeValue::String(s.to_string())
    }
}

impl From<String> for NodeValue {
    fn from(s: String) -> Self {
        NodeValue::String(s)
    }
}

impl From<bool> for NodeValue {
    fn from(b: bool) -> Self {
        NodeValue::Bool(b)
    }
}

impl From<i64> for NodeValue {
    fn from(n: i64) -> Self {
        NodeValue::Number(Decimal::from(n))
    }
}

impl From<Decimal> for NodeValue {
    fn from(d: Decimal) -> Self {
        NodeValue::Number(d)
    }
}

impl From<Vec<NodeValue>> for NodeValue {
    fn from(items: Vec<NodeValue>) -> Self {
        NodeValue::Array(items)
    }
}

impl From<OrderedMap<NodeValue>> for NodeValue {
    fn from(map: OrderedMap<NodeValue>) -> Self {
        NodeValue::Object(map)
    }
}

impl From<serde_json::Value> for NodeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => NodeValue::Null,
            serde_json::Value::Bool(b) => NodeValue::Bool(b),
            serde_json::Value::Number(n) => NodeValue::Number(Decimal::from(n)),
            serde_json::Value::String(s) => NodeValue::String(s),
            serde_json::Value::Array(items) => {
                NodeValue::Array(items.into_iter().map(NodeValue::from).collect())
            }
            serde_json::Value::Object(map) => NodeValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, NodeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&NodeValue> for serde_json::Value {
    fn from(node: &NodeValue) -> Self {
        match node {
            NodeValue::Null => serde_json::Value::Null,
            NodeValue::Bool(b) => serde_json::Value::Bool(*b),
            NodeValue::String(s) => serde_json::Value::String(s.clone()),
            NodeValue::Number(n) => serde_json::Value::Number(n.as_number().clone()),
            NodeValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            NodeValue::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

// Numbers are kept as raw text, which an untagged derive cannot buffer, so the
// impls go through `serde_json::Value`.
impl Serialize for NodeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(NodeValue::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_keeps_text() {
        let d = Decimal::parse("1.50").unwrap();
        assert_eq!(d.to_string(), "1.50");
        assert_eq!(d.as_i64(), Some(1));
        assert!(Decimal::parse("abc").is_none());
        assert_eq!(Decimal::parse("+7").unwrap().as_i64(), Some(7));
    }

    #[test]
    fn test_accessors() {
        let v: NodeValue = serde_json::from_str(
            r#"{"method":"GET","code":204,"flag":true,"tags":["a",1,"b"]}"#,
        )
        .unwrap();
        assert_eq!(v.get_string("method"), Some("GET"));
        assert_eq!(v.get_int("code", 200), 204);
        assert_eq!(v.get_int("missing", 200), 200);
        assert!(v.get_bool("flag"));
        assert!(!v.get_bool("missing"));
        assert_eq!(v.get_string_slice("tags"), vec!["a", "b"]);
        assert_eq!(v.keys(), vec!["method", "code", "flag", "tags"]);
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn test_put_on_scalar_makes_object() {
        let mut v = NodeValue::from("x");
        v.put("k", NodeValue::from(true));
        assert!(v.has("k"));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_json_round_trip_preserves_order_and_numbers() {
        let text = r#"{"z":1.250,"a":[null,false,"s"],"m":{"q":-3}}"#;
        let v: NodeValue = serde_json::from_str(text).unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), text);
    }
}
