use log::{debug, warn};

use crate::error::ParseError;
use crate::node::{Decimal, NodeValue};
use crate::ordered::OrderedMap;
use crate::schema::ids;
use crate::smithy::ast::{Ast, Member, Shape, ShapeRef};
use crate::smithy::prelude;
use crate::smithy::traits;
use crate::transform::import::BASE_PATH_METADATA;

use super::naming::{member_name, namespace_name, route_to_name, shape_name};
use super::operation::Operation;
use super::parameter::{Parameter, ParameterLocation};
use super::response::Response;
use super::schema::Schema;
use super::spec::SwaggerSpec;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const PARAMETERS_PREFIX: &str = "#/parameters/";
const RESPONSES_PREFIX: &str = "#/responses/";
const JSON_NAME: &str = "smithy.api#jsonName";

/// Exception shape name for an HTTP error status.
pub fn exception_name(status: u16) -> String {
    let name = match status {
        400 => "BadRequest",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "NotFound",
        409 => "Conflict",
        429 => "TooManyRequests",
        500 => "InternalServerError",
        503 => "ServiceUnavailable",
        other => return format!("Error{other}Exception"),
    };
    format!("{name}Exception")
}

/// Convert a Swagger 2.0 document into a Smithy AST.
///
/// Shapes land in `namespace`, or in a namespace derived from the API title.
pub fn to_ast(spec: &SwaggerSpec, namespace: Option<&str>) -> Result<Ast, ParseError> {
    let ns = namespace
        .map(str::to_string)
        .unwrap_or_else(|| namespace_name(&spec.info.title));
    let mut c = Converter {
        spec,
        ns,
        ast: Ast::new(),
    };

    // Phase 1: service
    let service_id = c.id(&shape_name(if spec.info.title.is_empty() {
        "Service"
    } else {
        &spec.info.title
    }));
    let mut service = Shape::new("service");
    if !spec.info.version.is_empty() {
        service.version = Some(spec.info.version.clone());
    }
    put_doc(&mut service.traits, spec.info.description.as_deref());
    if let Some(base) = &spec.base_path {
        c.ast.metadata.put(BASE_PATH_METADATA, NodeValue::from(base.as_str()));
    }

    // Phase 2: definitions
    for (name, schema) in &spec.definitions {
        let id = c.id(&shape_name(name));
        c.define(&id, schema)?;
    }

    // Phase 3: operations
    for (route, item) in &spec.paths {
        for (method, op) in item.operations() {
            let params = merge_parameters(&item.parameters, &op.parameters);
            let id = c.operation(route, method, op, &params)?;
            service.operations.push(ShapeRef::new(id));
        }
    }

    c.ast.put_shape(service_id, service);
    Ok(c.ast)
}

/// Path-level parameters overridden by operation parameters with the same
/// name and location.
fn merge_parameters(path_level: &[Parameter], op_level: &[Parameter]) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = path_level
        .iter()
        .filter(|p| {
            !op_level
                .iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .cloned()
        .collect();
    merged.extend(op_level.iter().cloned());
    merged
}

struct Converter<'a> {
    spec: &'a SwaggerSpec,
    ns: String,
    ast: Ast,
}

impl<'a> Converter<'a> {
    fn id(&self, name: &str) -> String {
        ids::absolute(&self.ns, name)
    }

    /// Put a synthesized shape, reusing an identical shape of the same id.
    /// A different shape already under `id` is an error.
    fn put(&mut self, id: &str, shape: Shape) -> Result<(), ParseError> {
        match self.ast.get_shape(id) {
            Some(existing) if *existing == shape => Ok(()),
            Some(_) => Err(ParseError::Swagger(format!(
                "two different shapes would be named {id}"
            ))),
            None => {
                self.ast.put_shape(id, shape);
                Ok(())
            }
        }
    }

    /// Put a synthesized shape under `preferred`, or under the first free
    /// numbered variant when the name is reserved by a definition or taken by
    /// a different shape.
    fn put_fresh(&mut self, preferred: &str, shape: Shape) -> Result<String, ParseError> {
        let spec = self.spec;
        let reserved = |name: &str| spec.definitions.keys().any(|d| shape_name(d) == name);
        let mut name = preferred.to_string();
        let mut n = 1;
        loop {
            let id = self.id(&name);
            let free = match self.ast.get_shape(&id) {
                Some(existing) => *existing == shape,
                None => !reserved(&name),
            };
            if free {
                self.put(&id, shape)?;
                return Ok(id);
            }
            n += 1;
            name = format!("{preferred}{n}");
        }
    }

    fn definition_ref(&self, ref_path: &str) -> Result<String, ParseError> {
        let name = ref_path.strip_prefix(DEFINITIONS_PREFIX).ok_or_else(|| {
            ParseError::Swagger(format!("unsupported reference {ref_path}"))
        })?;
        if !self.spec.definitions.contains_key(name) {
            return Err(ParseError::Swagger(format!("undefined reference {ref_path}")));
        }
        Ok(self.id(&shape_name(name)))
    }

    /// Declare the named shape `id` from a top-level definition.
    fn define(&mut self, id: &str, schema: &Schema) -> Result<(), ParseError> {
        let name = ids::local_name(id).to_string();
        let mut shape = if let Some(r) = &schema.ref_path {
            // an alias of another definition copies its members
            self.definition_ref(r)?;
            let alias = Schema {
                all_of: vec![schema.clone()],
                ..Schema::default()
            };
            self.structure(&name, &alias)?
        } else if schema.is_map() {
            self.map(&name, schema)?
        } else if schema.is_object() {
            self.structure(&name, schema)?
        } else if !schema.enum_values.is_empty() {
            enum_shape(schema)
        } else {
            match schema.schema_type.as_deref() {
                Some("array") => self.list(&name, schema)?,
                _ => {
                    let mut shape = Shape::new(simple_shape_type(schema));
                    put_constraints(&mut shape.traits, schema);
                    shape
                }
            }
        };
        put_doc(&mut shape.traits, schema.description.as_deref());
        if shape.shape_type == "list" {
            put_size(&mut shape.traits, schema.min_items, schema.max_items);
        }
        self.put(id, shape)
    }

    /// Target id for an inline or referenced schema. Inline aggregates are
    /// declared as new shapes named after `context`.
    fn target(&mut self, schema: &Schema, context: &str) -> Result<String, ParseError> {
        if let Some(r) = &schema.ref_path {
            return self.definition_ref(r);
        }
        if schema.is_map() {
            let shape = self.map(context, schema)?;
            return self.put_fresh(&format!("{context}Map"), shape);
        }
        if schema.is_object() {
            if schema.properties.is_empty() && schema.all_of.is_empty() {
                return Ok(prelude::shape_id("Document"));
            }
            let shape = self.structure(context, schema)?;
            return self.put_fresh(context, shape);
        }
        if !schema.enum_values.is_empty() {
            return self.put_fresh(context, enum_shape(schema));
        }
        if schema.schema_type.as_deref() == Some("array") {
            let items = schema.items.as_deref().cloned().unwrap_or_default();
            let name = match &items.ref_path {
                Some(r) => format!("{}List", ids::local_name(&self.definition_ref(r)?)),
                None => format!("{context}List"),
            };
            let mut shape = self.list(context, schema)?;
            put_size(&mut shape.traits, schema.min_items, schema.max_items);
            return self.put_fresh(&name, shape);
        }
        Ok(prelude::shape_id(simple_prelude_name(schema)))
    }

    fn list(&mut self, context: &str, schema: &Schema) -> Result<Shape, ParseError> {
        let items = schema.items.as_deref().cloned().unwrap_or_default();
        let target = self.target(&items, &format!("{context}Item"))?;
        let mut shape = Shape::new("list");
        shape.member = Some(Member::new(target));
        if schema.unique_items == Some(true) {
            shape.traits.put(traits::UNIQUE_ITEMS, NodeValue::object());
        }
        Ok(shape)
    }

    fn map(&mut self, context: &str, schema: &Schema) -> Result<Shape, ParseError> {
        let values = schema.additional_properties_schema().unwrap_or_default();
        let target = self.target(&values, &format!("{context}Value"))?;
        let mut shape = Shape::new("map");
        shape.key = Some(Member::new(prelude::shape_id("String")));
        shape.value = Some(Member::new(target));
        Ok(shape)
    }

    /// A structure from `properties`, with any `allOf` parts merged in first.
    fn structure(&mut self, name: &str, schema: &Schema) -> Result<Shape, ParseError> {
        let mut shape = Shape::new("structure");
        let mut required: Vec<String> = schema.required.clone();
        let mut properties: Vec<(String, Schema)> = Vec::new();
        for part in &schema.all_of {
            self.collect_properties(part, &mut properties, &mut required, 0)?;
        }
        properties.extend(schema.properties.iter().map(|(k, v)| (k.clone(), v.clone())));

        for (prop, prop_schema) in properties {
            let member = member_name(&prop);
            let context = format!("{name}{}", shape_name(&prop));
            let mut m = Member::new(self.target(&prop_schema, &context)?);
            put_doc(&mut m.traits, prop_schema.description.as_deref());
            if member != prop {
                m.traits.put(JSON_NAME, NodeValue::from(prop.as_str()));
            }
            if required.contains(&prop) {
                m.traits.put(traits::REQUIRED, NodeValue::object());
            }
            if prop_schema.ref_path.is_none() {
                put_member_constraints(&mut m.traits, &prop_schema);
            }
            shape.members.put(member, m);
        }
        Ok(shape)
    }

    fn collect_properties(
        &self,
        part: &Schema,
        properties: &mut Vec<(String, Schema)>,
        required: &mut Vec<String>,
        depth: usize,
    ) -> Result<(), ParseError> {
        if depth > 32 {
            return Err(ParseError::Swagger("allOf nesting is too deep or cyclic".into()));
        }
        let resolved = match &part.ref_path {
            Some(r) => {
                let name = r.strip_prefix(DEFINITIONS_PREFIX).unwrap_or(r);
                self.spec.definitions.get(name).ok_or_else(|| {
                    ParseError::Swagger(format!("undefined reference {r}"))
                })?
            }
            None => part,
        };
        for nested in &resolved.all_of {
            self.collect_properties(nested, properties, required, depth + 1)?;
        }
        for (k, v) in &resolved.properties {
            match properties.iter_mut().find(|(name, _)| name == k) {
                Some(slot) => slot.1 = v.clone(),
                None => properties.push((k.clone(), v.clone())),
            }
        }
        required.extend(resolved.required.iter().cloned());
        Ok(())
    }

    fn resolve_parameter(&self, p: &Parameter) -> Result<Parameter, ParseError> {
        match &p.ref_path {
            Some(r) => {
                let name = r.strip_prefix(PARAMETERS_PREFIX).unwrap_or(r);
                self.spec.parameters.get(name).cloned().ok_or_else(|| {
                    ParseError::Swagger(format!("undefined parameter reference {r}"))
                })
            }
            None => Ok(p.clone()),
        }
    }

    fn resolve_response(&self, r: &Response) -> Result<Response, ParseError> {
        match &r.ref_path {
            Some(path) => {
                let name = path.strip_prefix(RESPONSES_PREFIX).unwrap_or(path);
                self.spec.responses.get(name).cloned().ok_or_else(|| {
                    ParseError::Swagger(format!("undefined response reference {path}"))
                })
            }
            None => Ok(r.clone()),
        }
    }

    fn operation(
        &mut self,
        route: &str,
        method: &str,
        op: &Operation,
        params: &[Parameter],
    ) -> Result<String, ParseError> {
        let name = match &op.operation_id {
            Some(op_id) => shape_name(op_id),
            None => route_to_name(method, route),
        };
        let id = self.id(&name);
        if self.ast.get_shape(&id).is_some() {
            return Err(ParseError::Swagger(format!(
                "{method} {route}: operation name {name} is already taken"
            )));
        }
        debug!("converting {method} {route} as {id}");

        let mut shape = Shape::new("operation");
        put_doc(
            &mut shape.traits,
            op.description.as_deref().or(op.summary.as_deref()),
        );
        if !op.tags.is_empty() {
            let tags = op.tags.iter().map(|t| NodeValue::from(t.as_str())).collect::<Vec<_>>();
            shape.traits.put(traits::TAGS, NodeValue::from(tags));
        }
        if op.deprecated {
            shape.traits.put(traits::DEPRECATED, NodeValue::object());
        }

        // input
        let mut uri = route.to_string();
        let mut input = Shape::new("structure");
        input.traits.put(traits::INPUT, NodeValue::object());
        for p in params {
            let p = self.resolve_parameter(p)?;
            let member = member_name(&p.name);
            let context = format!("{name}{}", shape_name(&p.name));
            let value = p.value_schema();
            let mut m = match p.location {
                ParameterLocation::FormData => {
                    warn!(
                        "[WARNING]: {id}: formData parameter {} is not supported, skipping",
                        p.name
                    );
                    continue;
                }
                ParameterLocation::Path => {
                    if member != p.name {
                        uri = uri.replace(&format!("{{{}}}", p.name), &format!("{{{member}}}"));
                    }
                    let mut m = Member::new(self.target(&value, &context)?);
                    m.traits.put(traits::HTTP_LABEL, NodeValue::object());
                    m.traits.put(traits::REQUIRED, NodeValue::object());
                    m
                }
                ParameterLocation::Query => {
                    let mut m = Member::new(self.target(&value, &context)?);
                    m.traits.put(traits::HTTP_QUERY, NodeValue::from(p.name.as_str()));
                    m
                }
                ParameterLocation::Header => {
                    let mut m = Member::new(self.target(&value, &context)?);
                    m.traits.put(traits::HTTP_HEADER, NodeValue::from(p.name.as_str()));
                    m
                }
                ParameterLocation::Body => {
                    let mut m = Member::new(self.target(&value, &format!("{name}Body"))?);
                    m.traits.put(traits::HTTP_PAYLOAD, NodeValue::object());
                    m
                }
            };
            put_doc(&mut m.traits, p.description.as_deref());
            if p.required && !m.has_trait(traits::REQUIRED) {
                m.traits.put(traits::REQUIRED, NodeValue::object());
            }
            if value.ref_path.is_none() {
                put_member_constraints(&mut m.traits, &value);
            }
            input.members.put(member, m);
        }
        if !input.members.is_empty() {
            let input_id = self.id(&format!("{name}Input"));
            self.put(&input_id, input)?;
            shape.input = Some(ShapeRef::new(input_id));
        }

        // responses
        let mut code = 200;
        let mut have_output = false;
        for (status, response) in &op.responses {
            let response = self.resolve_response(response)?;
            let Ok(status_code) = status.parse::<u16>() else {
                warn!("[WARNING]: {id}: response {status:?} has no numeric status, skipping");
                continue;
            };
            if status.starts_with('2') {
                if have_output {
                    warn!("[WARNING]: {id}: extra success response {status} ignored");
                    continue;
                }
                have_output = true;
                code = status_code;
                let mut output = Shape::new("structure");
                output.traits.put(traits::OUTPUT, NodeValue::object());
                self.response_members(&mut output, &response, &format!("{name}Output"))?;
                if !output.members.is_empty() {
                    let output_id = self.id(&format!("{name}Output"));
                    self.put(&output_id, output)?;
                    shape.output = Some(ShapeRef::new(output_id));
                }
            } else {
                let error_id = self.exception(&name, status_code, &response)?;
                shape.errors.push(ShapeRef::new(error_id));
            }
        }

        let mut http = NodeValue::object();
        http.put("method", NodeValue::from(method));
        http.put("uri", NodeValue::from(uri));
        if code != 200 {
            http.put("code", NodeValue::from(i64::from(code)));
        }
        shape.traits.put(traits::HTTP, http);

        self.ast.put_shape(id.as_str(), shape);
        Ok(id)
    }

    fn response_members(
        &mut self,
        shape: &mut Shape,
        response: &Response,
        context: &str,
    ) -> Result<(), ParseError> {
        for (header, h) in &response.headers {
            let header_context = format!("{context}{}", shape_name(header));
            let mut m = Member::new(self.target(&h.value_schema(), &header_context)?);
            m.traits.put(traits::HTTP_HEADER, NodeValue::from(header.as_str()));
            put_doc(&mut m.traits, h.description.as_deref());
            shape.members.put(member_name(header), m);
        }
        if let Some(schema) = &response.schema {
            let mut m = Member::new(self.target(schema, &format!("{context}Body"))?);
            m.traits.put(traits::HTTP_PAYLOAD, NodeValue::object());
            shape.members.put(payload_member_name(shape), m);
        }
        Ok(())
    }

    /// Declare the exception for an error response. The conventional name is
    /// reused when an identical exception exists; otherwise the operation
    /// name is prefixed.
    fn exception(
        &mut self,
        op_name: &str,
        status: u16,
        response: &Response,
    ) -> Result<String, ParseError> {
        let base = exception_name(status);
        let mut shape = Shape::new("structure");
        let doc = Some(response.description.as_str()).filter(|d| !d.is_empty());
        put_doc(&mut shape.traits, doc);
        let fault = if status >= 500 { "server" } else { "client" };
        shape.traits.put(traits::ERROR, NodeValue::from(fault));
        shape.traits.put(traits::HTTP_ERROR, NodeValue::from(i64::from(status)));
        self.response_members(&mut shape, response, &base)?;

        let id = self.id(&base);
        match self.ast.get_shape(&id) {
            Some(existing) if *existing != shape => {
                self.put_fresh(&format!("{op_name}{base}"), shape)
            }
            _ => {
                self.put(&id, shape)?;
                Ok(id)
            }
        }
    }
}

/// `body`, unless a header already took that name.
fn payload_member_name(shape: &Shape) -> String {
    ["body", "content", "payload"]
        .into_iter()
        .find(|n| !shape.members.has(n))
        .unwrap_or("body_")
        .to_string()
}

fn enum_shape(schema: &Schema) -> Shape {
    let mut shape = Shape::new("enum");
    for v in &schema.enum_values {
        let value = match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let mut m = Member::new(prelude::shape_id("Unit"));
        m.traits.put(traits::ENUM_VALUE, NodeValue::from(value.as_str()));
        shape.members.put(enum_symbol(&value), m);
    }
    shape
}

/// Upper snake symbol for an enum value: `in-stock` → `IN_STOCK`.
fn enum_symbol(value: &str) -> String {
    use heck::ToShoutySnakeCase;
    let symbol = value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_shouty_snake_case();
    if symbol.is_empty() || symbol.starts_with(|c: char| c.is_ascii_digit()) {
        format!("V_{symbol}")
    } else {
        symbol
    }
}

/// Prelude shape name for a simple Swagger type.
fn simple_prelude_name(schema: &Schema) -> &'static str {
    match (schema.schema_type.as_deref(), schema.format.as_deref()) {
        (Some("string"), Some("date-time" | "date")) => "Timestamp",
        (Some("string"), Some("byte" | "binary")) | (Some("file"), _) => "Blob",
        (Some("string"), _) => "String",
        (Some("integer"), Some("int64")) => "Long",
        (Some("integer"), _) => "Integer",
        (Some("number"), Some("float")) => "Float",
        (Some("number"), _) => "Double",
        (Some("boolean"), _) => "Boolean",
        _ => "Document",
    }
}

fn simple_shape_type(schema: &Schema) -> &'static str {
    match simple_prelude_name(schema) {
        "Timestamp" => "timestamp",
        "Blob" => "blob",
        "String" => "string",
        "Long" => "long",
        "Integer" => "integer",
        "Float" => "float",
        "Double" => "double",
        "Boolean" => "boolean",
        _ => "document",
    }
}

fn put_doc(t: &mut OrderedMap<NodeValue>, doc: Option<&str>) {
    if let Some(doc) = doc {
        t.put(traits::DOCUMENTATION, NodeValue::from(doc));
    }
}

fn put_size(t: &mut OrderedMap<NodeValue>, min: Option<i64>, max: Option<i64>) {
    if min.is_none() && max.is_none() {
        return;
    }
    let mut node = NodeValue::object();
    if let Some(min) = min {
        node.put("min", NodeValue::from(min));
    }
    if let Some(max) = max {
        node.put("max", NodeValue::from(max));
    }
    t.put(traits::LENGTH, node);
}

/// Value constraints of a scalar schema as traits.
fn put_constraints(t: &mut OrderedMap<NodeValue>, schema: &Schema) {
    put_size(t, schema.min_length, schema.max_length);
    if schema.minimum.is_some() || schema.maximum.is_some() {
        let mut node = NodeValue::object();
        if let Some(min) = &schema.minimum {
            node.put("min", NodeValue::from(Decimal::from(min.clone())));
        }
        if let Some(max) = &schema.maximum {
            node.put("max", NodeValue::from(Decimal::from(max.clone())));
        }
        t.put(traits::RANGE, node);
    }
    if let Some(p) = &schema.pattern {
        t.put(traits::PATTERN, NodeValue::from(p.as_str()));
    }
}

/// Constraints and default of an inline member schema. Aggregates carry
/// their own constraints on the synthesized shape.
fn put_member_constraints(t: &mut OrderedMap<NodeValue>, schema: &Schema) {
    let aggregate = schema.is_object()
        || !schema.enum_values.is_empty()
        || schema.schema_type.as_deref() == Some("array");
    if !aggregate {
        put_constraints(t, schema);
    }
    if let Some(default) = &schema.default_value {
        t.put(traits::DEFAULT, NodeValue::from(default.clone()));
    }
}
