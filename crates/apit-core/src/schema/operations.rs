use serde::{Deserialize, Serialize};

use crate::node::NodeValue;
use crate::ordered::OrderedMap;

use super::types::{Constraints, Deprecation};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    pub fn parse(s: &str) -> Option<HttpMethod> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Methods whose requests carry a body.
    pub fn expects_payload(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

/// Where an input field travels in the HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputBinding {
    Path,
    Query(String),
    Header(String),
    Payload,
}

/// Where an output or exception field travels in the HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputBinding {
    Header(String),
    Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInputField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    pub binding: InputBinding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<NodeValue>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub traits: OrderedMap<NodeValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutputField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    pub binding: OutputBinding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub traits: OrderedMap<NodeValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInput {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub fields: Vec<OperationInputField>,
}

impl OperationInput {
    pub fn payload_field(&self) -> Option<&OperationInputField> {
        self.fields
            .iter()
            .find(|f| f.binding == InputBinding::Payload)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutput {
    /// Id of the output structure; `None` when the operation returns nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub http_status: u16,
    #[serde(default)]
    pub fields: Vec<OperationOutputField>,
}

impl OperationOutput {
    pub fn empty(http_status: u16) -> Self {
        Self {
            id: None,
            comment: None,
            http_status,
            fields: Vec::new(),
        }
    }

    pub fn payload_field(&self) -> Option<&OperationOutputField> {
        self.fields
            .iter()
            .find(|f| f.binding == OutputBinding::Payload)
    }
}

/// A structure dedicated to error responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub http_status: u16,
    /// `client` or `server`, from the `@error` trait.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    #[serde(default)]
    pub fields: Vec<OperationOutputField>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub traits: OrderedMap<NodeValue>,
}

impl ExceptionDef {
    /// Structural equality: status plus field names, types and required-ness.
    pub fn same_shape(&self, other: &ExceptionDef) -> bool {
        self.http_status == other.http_status
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| {
                a.name == b.name
                    && a.field_type == b.field_type
                    && a.required == b.required
                    && a.binding == b.binding
            })
    }

    pub fn payload_field(&self) -> Option<&OperationOutputField> {
        self.fields
            .iter()
            .find(|f| f.binding == OutputBinding::Payload)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleError {
    pub shape_id: String,
    pub content: NodeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationExample {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub input: NodeValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExampleError>,
}

/// The lifecycle slot a resource binds an operation to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lifecycle {
    Create,
    Put,
    Read,
    Update,
    Delete,
    List,
    Instance,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub http_method: HttpMethod,
    pub http_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<OperationInput>,
    pub output: OperationOutput,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<OperationExample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Deprecation>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub traits: OrderedMap<NodeValue>,
}

impl OperationDef {
    pub fn new(id: impl Into<String>, http_method: HttpMethod, http_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            comment: None,
            http_method,
            http_uri: http_uri.into(),
            resource: None,
            lifecycle: None,
            input: None,
            output: OperationOutput::empty(200),
            exceptions: Vec::new(),
            examples: Vec::new(),
            tags: Vec::new(),
            deprecated: None,
            traits: OrderedMap::new(),
        }
    }

    /// Name of the output field bound to the response payload, or `""`.
    pub fn output_http_payload_name(&self) -> &str {
        self.output
            .payload_field()
            .map(|f| f.name.as_str())
            .unwrap_or("")
    }

    /// `{name}` variables of the URI template; a trailing `+` (greedy label)
    /// is stripped.
    pub fn uri_variables(&self) -> Vec<&str> {
        uri_variables(&self.http_uri)
    }
}

pub fn uri_variables(uri: &str) -> Vec<&str> {
    let mut vars = Vec::new();
    let mut rest = uri;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let var = &rest[start + 1..start + len];
        vars.push(var.strip_suffix('+').unwrap_or(var));
        rest = &rest[start + len + 1..];
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("TRACE"), None);
        assert!(HttpMethod::Patch.expects_payload());
        assert!(!HttpMethod::Delete.expects_payload());
    }

    #[test]
    fn test_uri_variables() {
        assert_eq!(uri_variables("/items/{id}"), vec!["id"]);
        assert_eq!(uri_variables("/a/{x}/b/{rest+}"), vec!["x", "rest"]);
        assert!(uri_variables("/plain").is_empty());
        assert!(uri_variables("/broken/{x").is_empty());
    }

    #[test]
    fn test_output_payload_name() {
        let mut op = OperationDef::new("ns#GetItem", HttpMethod::Get, "/items/{id}");
        assert_eq!(op.output_http_payload_name(), "");
        op.output.fields.push(OperationOutputField {
            name: "item".into(),
            field_type: "ns#Item".into(),
            required: false,
            binding: OutputBinding::Payload,
            comment: None,
            constraints: Constraints::default(),
            traits: OrderedMap::new(),
        });
        assert_eq!(op.output_http_payload_name(), "item");
    }
}
