//! Swagger 2.0 reader. The document is read into a serde model and then
//! converted into a Smithy AST, so it joins the rest of the pipeline like any
//! other model file.

pub mod convert;
pub mod naming;
pub mod operation;
pub mod parameter;
pub mod response;
pub mod schema;
pub mod spec;

use crate::error::ParseError;
use crate::smithy::Ast;
use spec::SwaggerSpec;

pub use convert::{exception_name, to_ast};

/// True when a JSON document declares `"swagger": "2.0"`.
pub fn is_swagger(doc: &serde_json::Value) -> bool {
    doc.get("swagger").and_then(serde_json::Value::as_str) == Some("2.0")
}

/// Parse a Swagger document from JSON.
pub fn from_json(input: &str) -> Result<SwaggerSpec, ParseError> {
    let spec: SwaggerSpec = serde_json::from_str(input)?;
    validate_version(&spec)?;
    Ok(spec)
}

fn validate_version(spec: &SwaggerSpec) -> Result<(), ParseError> {
    if spec.swagger != "2.0" {
        return Err(ParseError::Swagger(format!(
            "unsupported swagger version {:?}",
            spec.swagger
        )));
    }
    Ok(())
}

/// Read a Swagger document from an already parsed JSON value.
pub fn from_value(doc: serde_json::Value) -> Result<SwaggerSpec, ParseError> {
    let spec: SwaggerSpec = serde_json::from_value(doc)?;
    validate_version(&spec)?;
    Ok(spec)
}

/// Read a Swagger document straight into an AST.
pub fn parse(source: &str, namespace: Option<&str>) -> Result<Ast, ParseError> {
    to_ast(&from_json(source)?, namespace)
}

pub fn parse_value(doc: serde_json::Value, namespace: Option<&str>) -> Result<Ast, ParseError> {
    to_ast(&from_value(doc)?, namespace)
}
