use std::collections::HashSet;

use crate::node::NodeValue;
use crate::ordered::OrderedMap;
use crate::schema::{
    BaseType, Constraints, Deprecation, EnumValue, ExceptionDef, FieldDef, InputBinding,
    OperationDef, OperationOutputField, OutputBinding, ResourceDef, Schema, TypeDef,
};
use crate::smithy::ast::{Ast, Member, Shape, ShapeRef};
use crate::smithy::prelude;
use crate::smithy::traits;

use super::import::BASE_PATH_METADATA;

/// Raise a schema back to a Smithy 2.0 AST.
///
/// Operation input and output structures are rebuilt from the operations'
/// bound fields, so the io type definitions recorded on import are not
/// emitted a second time.
pub fn export(schema: &Schema) -> Ast {
    let mut ast = Ast::new();
    if let Some(base) = schema.base() {
        ast.metadata.put(BASE_PATH_METADATA, NodeValue::from(base));
    }

    // Phase 1: service shape
    if let Some(id) = schema.id() {
        ast.put_shape(id, service_shape(schema));
    }

    // Phase 2: resources and operations with their io structures
    for r in schema.resources() {
        ast.put_shape(r.id.as_str(), resource_shape(r));
    }
    for op in schema.operations() {
        export_operation(schema, op, &mut ast);
    }

    // Phase 3: plain types and exceptions
    for t in schema.types() {
        if schema.is_operation_io(&t.id) {
            continue;
        }
        ast.put_shape(t.id.as_str(), type_shape(t));
    }
    for e in schema.exceptions() {
        ast.put_shape(e.id.as_str(), exception_shape(e));
    }
    ast
}

/// Smithy target for a schema type reference.
fn target(id: &str) -> String {
    BaseType::from_id(id)
        .and_then(prelude::shape_for)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn refs(ids: &[String]) -> Vec<ShapeRef> {
    ids.iter().map(ShapeRef::new).collect()
}

fn service_shape(schema: &Schema) -> Shape {
    let mut shape = Shape::new("service");
    shape.version = schema.version().map(str::to_string);
    put_comment(&mut shape.traits, schema.comment());
    shape.operations = schema
        .operations()
        .iter()
        .filter(|op| op.resource.is_none())
        .map(|op| ShapeRef::new(op.id.as_str()))
        .collect();
    let children: HashSet<&str> = schema
        .resources()
        .iter()
        .flat_map(|r| r.resources.iter().map(String::as_str))
        .collect();
    shape.resources = schema
        .resources()
        .iter()
        .filter(|r| !children.contains(r.id.as_str()))
        .map(|r| ShapeRef::new(r.id.as_str()))
        .collect();
    shape
}

fn resource_shape(r: &ResourceDef) -> Shape {
    let mut shape = Shape::new("resource");
    put_comment(&mut shape.traits, r.comment.as_deref());
    put_tags(&mut shape.traits, &r.tags);
    let to_refs = |m: &OrderedMap<String>| {
        m.iter()
            .map(|(k, v)| (k.clone(), ShapeRef::new(target(v))))
            .collect::<OrderedMap<ShapeRef>>()
    };
    shape.identifiers = to_refs(&r.identifiers);
    shape.properties = to_refs(&r.properties);
    shape.create = r.create.as_ref().map(ShapeRef::new);
    shape.put = r.put.as_ref().map(ShapeRef::new);
    shape.read = r.read.as_ref().map(ShapeRef::new);
    shape.update = r.update.as_ref().map(ShapeRef::new);
    shape.delete = r.delete.as_ref().map(ShapeRef::new);
    shape.list = r.list.as_ref().map(ShapeRef::new);
    shape.operations = refs(&r.operations);
    shape.collection_operations = refs(&r.collection_operations);
    shape.resources = refs(&r.resources);
    shape
}

fn export_operation(schema: &Schema, op: &OperationDef, ast: &mut Ast) {
    let mut shape = Shape::new("operation");
    put_comment(&mut shape.traits, op.comment.as_deref());
    put_tags(&mut shape.traits, &op.tags);
    put_deprecation(&mut shape.traits, op.deprecated.as_ref());
    shape.traits.extend(op.traits.clone());

    let mut http = NodeValue::object();
    http.put("method", NodeValue::from(op.http_method.as_str()));
    http.put("uri", NodeValue::from(op.http_uri.as_str()));
    if op.output.http_status != 200 {
        http.put("code", NodeValue::from(i64::from(op.output.http_status)));
    }
    shape.traits.put(traits::HTTP, http);
    if !op.examples.is_empty() {
        shape.traits.put(traits::EXAMPLES, examples_node(op));
    }

    if let Some(input) = &op.input {
        let mut io = io_shape(schema, &input.id, input.comment.as_deref(), traits::INPUT);
        for f in &input.fields {
            let mut member = Member::new(target(&f.field_type));
            put_comment(&mut member.traits, f.comment.as_deref());
            match &f.binding {
                InputBinding::Path => {
                    member.traits.put(traits::HTTP_LABEL, NodeValue::object());
                }
                InputBinding::Query(name) => {
                    member.traits.put(traits::HTTP_QUERY, NodeValue::from(name.as_str()));
                }
                InputBinding::Header(name) => {
                    member.traits.put(traits::HTTP_HEADER, NodeValue::from(name.as_str()));
                }
                InputBinding::Payload => {
                    member.traits.put(traits::HTTP_PAYLOAD, NodeValue::object());
                }
            }
            if f.required {
                member.traits.put(traits::REQUIRED, NodeValue::object());
            }
            if let Some(default) = &f.default {
                member.traits.put(traits::DEFAULT, default.clone());
            }
            put_constraints(&mut member.traits, &f.constraints);
            member.traits.extend(f.traits.clone());
            io.members.put(f.name.as_str(), member);
        }
        put_unbound_members(schema, &input.id, &mut io);
        shape.input = Some(ShapeRef::new(input.id.as_str()));
        ast.put_shape(input.id.as_str(), io);
    }

    if let Some(id) = &op.output.id {
        let mut io = io_shape(schema, id, op.output.comment.as_deref(), traits::OUTPUT);
        io.members = output_members(&op.output.fields);
        put_unbound_members(schema, id, &mut io);
        shape.output = Some(ShapeRef::new(id.as_str()));
        ast.put_shape(id.as_str(), io);
    }

    shape.errors = refs(&op.exceptions);
    ast.put_shape(op.id.as_str(), shape);
}

/// Start an io structure, carrying over traits recorded on its type
/// definition and making sure the io marker is present.
fn io_shape(schema: &Schema, id: &str, comment: Option<&str>, marker: &str) -> Shape {
    let mut shape = Shape::new("structure");
    put_comment(&mut shape.traits, comment);
    if let Some(def) = schema.get_type_def(id) {
        shape.traits.extend(def.traits.clone());
    }
    if !shape.has_trait(marker) {
        shape.traits.put(marker, NodeValue::object());
    }
    shape
}

/// Members kept on an io type definition without an HTTP binding.
fn put_unbound_members(schema: &Schema, id: &str, io: &mut Shape) {
    let Some(def) = schema.get_type_def(id) else {
        return;
    };
    for f in &def.fields {
        if !io.members.has(&f.name) {
            io.members.put(f.name.as_str(), field_member(f));
        }
    }
}

fn output_members(fields: &[OperationOutputField]) -> OrderedMap<Member> {
    let mut members = OrderedMap::new();
    for f in fields {
        let mut member = Member::new(target(&f.field_type));
        put_comment(&mut member.traits, f.comment.as_deref());
        match &f.binding {
            OutputBinding::Header(name) => {
                member.traits.put(traits::HTTP_HEADER, NodeValue::from(name.as_str()));
            }
            OutputBinding::Payload => {
                member.traits.put(traits::HTTP_PAYLOAD, NodeValue::object());
            }
        }
        if f.required {
            member.traits.put(traits::REQUIRED, NodeValue::object());
        }
        put_constraints(&mut member.traits, &f.constraints);
        member.traits.extend(f.traits.clone());
        members.put(f.name.as_str(), member);
    }
    members
}

fn exception_shape(e: &ExceptionDef) -> Shape {
    let mut shape = Shape::new("structure");
    put_comment(&mut shape.traits, e.comment.as_deref());
    let fault = e
        .fault
        .clone()
        .unwrap_or_else(|| if e.http_status >= 500 { "server" } else { "client" }.to_string());
    shape.traits.put(traits::ERROR, NodeValue::from(fault));
    shape
        .traits
        .put(traits::HTTP_ERROR, NodeValue::from(i64::from(e.http_status)));
    shape.traits.extend(e.traits.clone());
    shape.members = output_members(&e.fields);
    shape
}

fn type_shape(t: &TypeDef) -> Shape {
    let int_enum = t.base == BaseType::Enum
        && !t.elements.is_empty()
        && t.elements.iter().all(|e| matches!(e.value, Some(EnumValue::Int(_))));
    let shape_type = if int_enum {
        "intEnum"
    } else {
        prelude::shape_type_for(t.base)
    };
    let mut shape = Shape::new(shape_type);
    put_comment(&mut shape.traits, t.comment.as_deref());
    put_tags(&mut shape.traits, &t.tags);
    put_deprecation(&mut shape.traits, t.deprecated.as_ref());
    put_constraints(&mut shape.traits, &t.constraints);
    shape.traits.extend(t.traits.clone());

    match t.base {
        BaseType::Struct | BaseType::Union => {
            for f in &t.fields {
                shape.members.put(f.name.as_str(), field_member(f));
            }
        }
        BaseType::Enum => {
            for e in &t.elements {
                let mut member = Member::new(prelude::shape_id("Unit"));
                put_comment(&mut member.traits, e.comment.as_deref());
                match &e.value {
                    Some(EnumValue::String(s)) => {
                        member.traits.put(traits::ENUM_VALUE, NodeValue::from(s.as_str()));
                    }
                    Some(EnumValue::Int(i)) => {
                        member.traits.put(traits::ENUM_VALUE, NodeValue::from(*i));
                    }
                    None => {}
                }
                shape.members.put(e.symbol.as_str(), member);
            }
        }
        BaseType::List => {
            if let Some(items) = &t.items {
                shape.member = Some(Member::new(target(items)));
            }
        }
        BaseType::Map => {
            if let (Some(keys), Some(items)) = (&t.keys, &t.items) {
                shape.key = Some(Member::new(target(keys)));
                shape.value = Some(Member::new(target(items)));
            }
        }
        _ => {}
    }
    shape
}

fn field_member(f: &FieldDef) -> Member {
    let mut member = Member::new(target(&f.field_type));
    put_comment(&mut member.traits, f.comment.as_deref());
    if f.required {
        member.traits.put(traits::REQUIRED, NodeValue::object());
    }
    if let Some(default) = &f.default {
        member.traits.put(traits::DEFAULT, default.clone());
    }
    put_constraints(&mut member.traits, &f.constraints);
    member.traits.extend(f.traits.clone());
    member
}

fn put_comment(t: &mut OrderedMap<NodeValue>, comment: Option<&str>) {
    if let Some(c) = comment {
        t.put(traits::DOCUMENTATION, NodeValue::from(c));
    }
}

fn put_tags(t: &mut OrderedMap<NodeValue>, tags: &[String]) {
    if !tags.is_empty() {
        let values = tags.iter().map(|s| NodeValue::from(s.as_str())).collect::<Vec<_>>();
        t.put(traits::TAGS, NodeValue::from(values));
    }
}

fn put_deprecation(t: &mut OrderedMap<NodeValue>, deprecated: Option<&Deprecation>) {
    if let Some(d) = deprecated {
        let mut node = NodeValue::object();
        if let Some(m) = &d.message {
            node.put("message", NodeValue::from(m.as_str()));
        }
        if let Some(s) = &d.since {
            node.put("since", NodeValue::from(s.as_str()));
        }
        t.put(traits::DEPRECATED, node);
    }
}

fn put_constraints(t: &mut OrderedMap<NodeValue>, c: &Constraints) {
    if c.min_size.is_some() || c.max_size.is_some() {
        let mut node = NodeValue::object();
        if let Some(min) = c.min_size {
            node.put("min", NodeValue::from(min));
        }
        if let Some(max) = c.max_size {
            node.put("max", NodeValue::from(max));
        }
        t.put(traits::LENGTH, node);
    }
    if c.min_value.is_some() || c.max_value.is_some() {
        let mut node = NodeValue::object();
        if let Some(min) = &c.min_value {
            node.put("min", NodeValue::from(min.clone()));
        }
        if let Some(max) = &c.max_value {
            node.put("max", NodeValue::from(max.clone()));
        }
        t.put(traits::RANGE, node);
    }
    if let Some(p) = &c.pattern {
        t.put(traits::PATTERN, NodeValue::from(p.as_str()));
    }
}

fn examples_node(op: &OperationDef) -> NodeValue {
    let entries = op
        .examples
        .iter()
        .map(|ex| {
            let mut node = NodeValue::object();
            node.put("title", NodeValue::from(ex.title.as_str()));
            if let Some(doc) = &ex.documentation {
                node.put("documentation", NodeValue::from(doc.as_str()));
            }
            node.put("input", ex.input.clone());
            if let Some(output) = &ex.output {
                node.put("output", output.clone());
            }
            if let Some(err) = &ex.error {
                let mut e = NodeValue::object();
                e.put("shapeId", NodeValue::from(err.shape_id.as_str()));
                e.put("content", err.content.clone());
                node.put("error", e);
            }
            node
        })
        .collect::<Vec<_>>();
    NodeValue::from(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smithy::parse;
    use crate::transform::import;

    const MODEL: &str = r#"$version: "2"
namespace example.shop

/// The shop.
service Shop {
    version: "2024-01-01"
    operations: [CreateItem, ListItems]
    errors: [ServerFault]
}

@http(method: "POST", uri: "/items/{id}", code: 201)
operation CreateItem {
    input := {
        @httpLabel
        id: String
        @httpHeader("X-Trace")
        trace: String
        @length(min: 1, max: 40)
        name: String
    }
    output := {
        @httpPayload
        item: Item
    }
}

@readonly
@http(method: "GET", uri: "/items")
operation ListItems {
    input := {
        @httpQuery("limit")
        @range(min: 1, max: 100)
        limit: Integer = 10
    }
    output := {
        @httpPayload
        items: ItemList
    }
}

@error("server")
@httpError(503)
structure ServerFault {
    @httpHeader("Retry-After")
    retryAfter: Integer
}

structure Item {
    @required
    id: String
    kind: Kind
}

enum Kind {
    TOOL = "tool"
    TOY = "toy"
}

list ItemList {
    member: Item
}
"#;

    #[test]
    fn test_schema_survives_export_and_import() {
        let schema = import(&parse("shop.smithy", MODEL).unwrap()).unwrap();
        schema.validate().unwrap();
        let again = import(&export(&schema)).unwrap();
        assert_eq!(again, schema);
    }

    #[test]
    fn test_unbound_members_survive_export() {
        let src = r#"$version: "2"
namespace ex

@http(method: "PUT", uri: "/items")
operation PutItem {
    input := {
        @httpPayload
        item: String
        note: String
    }
}
"#;
        let schema = import(&parse("put.smithy", src).unwrap()).unwrap();
        let ast = export(&schema);
        let io = ast.get_shape("ex#PutItemInput").unwrap();
        assert!(io.members.get("item").unwrap().has_trait(traits::HTTP_PAYLOAD));
        assert!(io.members.get("note").unwrap().traits.is_empty());
        assert_eq!(import(&ast).unwrap(), schema);
    }

    #[test]
    fn test_exported_shapes() {
        let schema = import(&parse("shop.smithy", MODEL).unwrap()).unwrap();
        let ast = export(&schema);

        let service = ast.get_shape("example.shop#Shop").unwrap();
        assert_eq!(service.version.as_deref(), Some("2024-01-01"));
        assert!(service.errors.is_empty());

        let op = ast.get_shape("example.shop#CreateItem").unwrap();
        let http = op.traits.get(traits::HTTP).unwrap();
        assert_eq!(http.get_int("code", 0), 201);
        let ids: Vec<&str> = op.errors.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(ids, vec!["example.shop#ServerFault"]);

        let input = ast.get_shape("example.shop#CreateItemInput").unwrap();
        assert!(input.has_trait(traits::INPUT));
        assert!(input.members.get("id").unwrap().has_trait(traits::HTTP_LABEL));
        let content = input.members.get("content").unwrap();
        assert_eq!(content.target, "example.shop#CreateItemInputContent");
        assert!(content.has_trait(traits::HTTP_PAYLOAD));

        let kind = ast.get_shape("example.shop#Kind").unwrap();
        assert_eq!(kind.shape_type, "enum");
        assert_eq!(
            kind.members.get("TOOL").unwrap().traits.get(traits::ENUM_VALUE),
            Some(&NodeValue::from("tool"))
        );
        assert_eq!(
            ast.get_shape("example.shop#Item").unwrap().members.get("id").unwrap().target,
            "smithy.api#String"
        );
    }

    #[test]
    fn test_int_enum_export() {
        let schema = import(
            &parse(
                "t.smithy",
                "$version: \"2\"\nnamespace ex\nintEnum Level {\n  LOW = 1\n  HIGH = 2\n}\n",
            )
            .unwrap(),
        )
        .unwrap();
        let ast = export(&schema);
        assert_eq!(ast.get_shape("ex#Level").unwrap().shape_type, "intEnum");
    }
}
