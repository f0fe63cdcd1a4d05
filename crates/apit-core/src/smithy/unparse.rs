//! AST to IDL text. Output is deterministic: the service first, then
//! resources, operations, and the remaining shapes grouped by kind, then an
//! `apply` pass for operation examples.

use crate::node::NodeValue;
use crate::ordered::OrderedMap;
use crate::schema::ids;

use super::ast::{Ast, Member, Shape, ShapeRef};
use super::prelude::{self, PRELUDE_NAMESPACE};
use super::traits;

const INDENT: &str = "    ";
const MAX_INLINE: usize = 72;
const LAST_TRAITS: &[&str] = &[traits::HTTP, traits::HTTP_ERROR];
const TYPE_ORDER: &[&[&str]] = &[
    &["enum", "intEnum"],
    &["structure"],
    &["union"],
    &["list", "set"],
    &["map"],
];

/// Render the shapes of `namespace` as an IDL document.
pub fn unparse(ast: &Ast, namespace: &str) -> String {
    let mut w = IdlWriter {
        ast,
        ns: namespace,
        v1: ast.major_version() < 2,
        out: String::new(),
    };
    w.document();
    w.out
}

struct IdlWriter<'a> {
    ast: &'a Ast,
    ns: &'a str,
    v1: bool,
    out: String,
}

impl<'a> IdlWriter<'a> {
    fn line(&mut self, depth: usize, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn sep(&self) -> &'static str {
        if self.v1 { "," } else { "" }
    }

    fn local_shapes(&self) -> Vec<(&'a str, &'a Shape)> {
        self.ast
            .shapes
            .iter()
            .filter(|(id, _)| ids::namespace_of(id) == Some(self.ns))
            .map(|(id, s)| (id.as_str(), s))
            .collect()
    }

    fn document(&mut self) {
        self.line(0, &format!("$version: {}", quote(&self.ast.smithy)));
        self.line(0, "");
        if !self.ast.metadata.is_empty() {
            for (k, v) in &self.ast.metadata {
                let key = if ids::is_identifier(k) { k.clone() } else { quote(k) };
                let value = self.node(v, 0);
                self.line(0, &format!("metadata {key} = {value}"));
            }
            self.line(0, "");
        }
        self.line(0, &format!("namespace {}", self.ns));

        let shapes = self.local_shapes();
        let inlined = self.inlined_io(&shapes);
        let mut ordered: Vec<(&str, &Shape)> = Vec::new();
        for kind in ["service", "resource", "operation"] {
            ordered.extend(shapes.iter().filter(|(_, s)| s.shape_type == kind).copied());
        }
        for kinds in TYPE_ORDER {
            ordered.extend(
                shapes
                    .iter()
                    .filter(|(_, s)| kinds.contains(&s.shape_type.as_str()))
                    .copied(),
            );
        }
        ordered.extend(
            shapes
                .iter()
                .filter(|(_, s)| {
                    !matches!(s.shape_type.as_str(), "service" | "resource" | "operation")
                        && !TYPE_ORDER.iter().any(|k| k.contains(&s.shape_type.as_str()))
                })
                .copied(),
        );

        for (id, shape) in ordered {
            if inlined.iter().any(|i| i == id) {
                continue;
            }
            self.line(0, "");
            self.shape(id, shape, &inlined);
        }

        for (id, shape) in &shapes {
            if let Some(examples) = shape.traits.get(traits::EXAMPLES) {
                if shape.shape_type == "operation" {
                    self.line(0, "");
                    let value = self.node(examples, 0);
                    self.line(
                        0,
                        &format!("apply {} @examples({})", ids::local_name(id), value),
                    );
                }
            }
        }
    }

    /// Input/output structures that are written inline with `:=`.
    fn inlined_io(&self, shapes: &[(&'a str, &'a Shape)]) -> Vec<String> {
        let mut out = Vec::new();
        for (id, shape) in shapes {
            if shape.shape_type != "operation" {
                continue;
            }
            for (io, suffix, marker) in [
                (&shape.input, "Input", traits::INPUT),
                (&shape.output, "Output", traits::OUTPUT),
            ] {
                let Some(io) = io else { continue };
                if io.target != format!("{id}{suffix}") {
                    continue;
                }
                let Some(io_shape) = self.ast.get_shape(&io.target) else {
                    continue;
                };
                let only_marker =
                    io_shape.traits.len() == 1 && io_shape.traits.has(marker);
                let users = self
                    .ast
                    .shapes
                    .values()
                    .filter(|s| s.references().contains(&io.target.as_str()))
                    .count();
                if io_shape.shape_type == "structure" && only_marker && users == 1 {
                    out.push(io.target.clone());
                }
            }
        }
        out
    }

    fn shape_ref(&self, id: &str) -> String {
        match ids::namespace_of(id) {
            Some(ns) if ns == self.ns => ids::local_name(id).to_string(),
            Some(PRELUDE_NAMESPACE) => {
                let name = ids::local_name(id);
                let shadowed = self.ast.shapes.has(&ids::absolute(self.ns, name));
                if shadowed { id.to_string() } else { name.to_string() }
            }
            _ => id.to_string(),
        }
    }

    fn trait_ref(&self, id: &str) -> String {
        let name = ids::local_name(id);
        match ids::namespace_of(id) {
            Some(PRELUDE_NAMESPACE) if prelude::is_prelude_trait(name) => name.to_string(),
            Some(ns) if ns == self.ns && !prelude::is_prelude_trait(name) => name.to_string(),
            _ => id.to_string(),
        }
    }

    /// Trait lines in emission order. `skip` names traits rendered elsewhere.
    fn traits(&mut self, depth: usize, traits: &OrderedMap<NodeValue>, skip: &[&str]) {
        if let Some(doc) = traits.get(traits::DOCUMENTATION).and_then(NodeValue::as_string) {
            for l in doc.split('\n') {
                let text = format!("/// {l}");
                self.line(depth, text.trim_end());
            }
        }
        let doc_as_comment = traits
            .get(traits::DOCUMENTATION)
            .and_then(NodeValue::as_string)
            .is_some();
        let rest: Vec<(&String, &NodeValue)> = traits
            .iter()
            .filter(|(k, _)| !(doc_as_comment && k.as_str() == traits::DOCUMENTATION))
            .filter(|(k, _)| !skip.contains(&k.as_str()))
            .collect();
        let is_annotation = |v: &NodeValue| matches!(v, NodeValue::Object(m) if m.is_empty());
        let annotations = rest.iter().filter(|(_, v)| is_annotation(*v));
        let valued = rest
            .iter()
            .filter(|(k, v)| !is_annotation(*v) && !LAST_TRAITS.contains(&k.as_str()));
        let last = rest
            .iter()
            .filter(|(k, v)| !is_annotation(*v) && LAST_TRAITS.contains(&k.as_str()));
        let ordered: Vec<(&String, &NodeValue)> =
            annotations.chain(valued).chain(last).copied().collect();
        for (k, v) in ordered {
            let text = self.trait_text(k, v, depth);
            self.line(depth, &text);
        }
    }

    fn trait_text(&self, id: &str, value: &NodeValue, depth: usize) -> String {
        let name = self.trait_ref(id);
        match value {
            NodeValue::Object(m) if m.is_empty() => format!("@{name}"),
            NodeValue::Object(m) => {
                let inline = self.object_entries_inline(m);
                if inline.len() + name.len() + depth * INDENT.len() <= MAX_INLINE {
                    format!("@{name}({inline})")
                } else {
                    let mut s = format!("@{name}(\n");
                    self.object_entries_block(m, depth + 1, &mut s);
                    s.push_str(&INDENT.repeat(depth));
                    s.push(')');
                    s
                }
            }
            other => format!("@{name}({})", self.node(other, depth)),
        }
    }

    fn object_entries_inline(&self, m: &OrderedMap<NodeValue>) -> String {
        m.iter()
            .map(|(k, v)| format!("{}: {}", key_text(k), self.node(v, 0)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn object_entries_block(&self, m: &OrderedMap<NodeValue>, depth: usize, s: &mut String) {
        for (k, v) in m {
            s.push_str(&INDENT.repeat(depth));
            s.push_str(&format!("{}: {}{}\n", key_text(k), self.node(v, depth), self.sep()));
        }
    }

    /// A node value, inline when short, else spread over indented lines.
    fn node(&self, value: &NodeValue, depth: usize) -> String {
        let inline = self.node_inline(value);
        if inline.len() + depth * INDENT.len() <= MAX_INLINE {
            return inline;
        }
        match value {
            NodeValue::Array(items) => {
                let mut s = "[\n".to_string();
                for item in items {
                    s.push_str(&INDENT.repeat(depth + 1));
                    s.push_str(&self.node(item, depth + 1));
                    s.push_str(self.sep());
                    s.push('\n');
                }
                s.push_str(&INDENT.repeat(depth));
                s.push(']');
                s
            }
            NodeValue::Object(m) => {
                let mut s = "{\n".to_string();
                self.object_entries_block(m, depth + 1, &mut s);
                s.push_str(&INDENT.repeat(depth));
                s.push('}');
                s
            }
            _ => inline,
        }
    }

    fn node_inline(&self, value: &NodeValue) -> String {
        match value {
            NodeValue::Null => "null".to_string(),
            NodeValue::Bool(b) => b.to_string(),
            NodeValue::Number(n) => n.to_string(),
            NodeValue::String(s) => quote(s),
            NodeValue::Array(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|i| self.node_inline(i))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            NodeValue::Object(m) if m.is_empty() => "{}".to_string(),
            NodeValue::Object(m) => format!("{{ {} }}", self.object_entries_inline(m)),
        }
    }

    fn ref_list(&mut self, depth: usize, key: &str, refs: &[ShapeRef]) {
        if refs.is_empty() {
            return;
        }
        let names: Vec<String> = refs.iter().map(|r| self.shape_ref(&r.target)).collect();
        let inline = format!("{key}: [{}]{}", names.join(", "), self.sep());
        if inline.len() + depth * INDENT.len() <= MAX_INLINE {
            self.line(depth, &inline);
            return;
        }
        self.line(depth, &format!("{key}: ["));
        for n in names {
            let text = format!("{n}{}", self.sep());
            self.line(depth + 1, &text);
        }
        let close = format!("]{}", self.sep());
        self.line(depth, &close);
    }

    fn header(&self, keyword: &str, name: &str, shape: &Shape) -> String {
        let mut h = format!("{keyword} {name}");
        if !shape.mixins.is_empty() {
            let mixins: Vec<String> = shape.mixins.iter().map(|m| self.shape_ref(&m.target)).collect();
            h.push_str(&format!(" with [{}]", mixins.join(", ")));
        }
        h
    }

    fn shape(&mut self, id: &str, shape: &Shape, inlined: &[String]) {
        let name = ids::local_name(id);
        let skip: &[&str] = if shape.shape_type == "operation" {
            &[traits::EXAMPLES]
        } else {
            &[]
        };
        self.traits(0, &shape.traits, skip);
        let header = self.header(&shape.shape_type, name, shape);
        match shape.shape_type.as_str() {
            "service" => {
                self.line(0, &format!("{header} {{"));
                if let Some(v) = &shape.version {
                    let text = format!("version: {}{}", quote(v), self.sep());
                    self.line(1, &text);
                }
                self.ref_list(1, "operations", &shape.operations);
                self.ref_list(1, "resources", &shape.resources);
                self.ref_list(1, "errors", &shape.errors);
                self.line(0, "}");
            }
            "resource" => {
                self.line(0, &format!("{header} {{"));
                for (key, map) in [("identifiers", &shape.identifiers), ("properties", &shape.properties)] {
                    if map.is_empty() {
                        continue;
                    }
                    let entries: Vec<String> = map
                        .iter()
                        .map(|(k, r)| format!("{}: {}", key_text(k), self.shape_ref(&r.target)))
                        .collect();
                    let text = format!("{key}: {{ {} }}{}", entries.join(", "), self.sep());
                    self.line(1, &text);
                }
                for (key, r) in shape.lifecycle_refs() {
                    let text = format!("{key}: {}{}", self.shape_ref(&r.target), self.sep());
                    self.line(1, &text);
                }
                self.ref_list(1, "operations", &shape.operations);
                self.ref_list(1, "collectionOperations", &shape.collection_operations);
                self.ref_list(1, "resources", &shape.resources);
                self.line(0, "}");
            }
            "operation" => {
                let empty = shape.input.is_none() && shape.output.is_none() && shape.errors.is_empty();
                if empty {
                    self.line(0, &format!("{header} {{}}"));
                    return;
                }
                self.line(0, &format!("{header} {{"));
                for (key, io) in [("input", &shape.input), ("output", &shape.output)] {
                    let Some(io) = io else { continue };
                    if inlined.iter().any(|i| *i == io.target) {
                        if let Some(io_shape) = self.ast.get_shape(&io.target) {
                            let head = self.header(key, ":=", io_shape);
                            self.members_block(1, &head, &io_shape.members);
                        }
                    } else {
                        let text = format!("{key}: {}{}", self.shape_ref(&io.target), self.sep());
                        self.line(1, &text);
                    }
                }
                self.ref_list(1, "errors", &shape.errors);
                self.line(0, "}");
            }
            "enum" | "intEnum" => {
                self.line(0, &format!("{header} {{"));
                let sep = self.sep();
                for (name, member) in &shape.members {
                    self.traits(1, &member.traits, &[traits::ENUM_VALUE]);
                    let text = match member.traits.get(traits::ENUM_VALUE) {
                        Some(v) => format!("{name} = {}{sep}", self.node(v, 1)),
                        None => format!("{name}{sep}"),
                    };
                    self.line(1, &text);
                }
                self.line(0, "}");
            }
            "list" | "set" => {
                let mut members = OrderedMap::new();
                if let Some(m) = &shape.member {
                    members.put("member", m.clone());
                }
                self.members_block(0, &header, &members);
            }
            "map" => {
                let mut members = OrderedMap::new();
                if let Some(k) = &shape.key {
                    members.put("key", k.clone());
                }
                if let Some(v) = &shape.value {
                    members.put("value", v.clone());
                }
                self.members_block(0, &header, &members);
            }
            "structure" | "union" => {
                self.members_block(0, &header, &shape.members);
            }
            _ => self.line(0, &header),
        }
    }

    fn members_block(&mut self, depth: usize, header: &str, members: &OrderedMap<Member>) {
        if members.is_empty() {
            self.line(depth, &format!("{header} {{}}"));
            return;
        }
        self.line(depth, &format!("{header} {{"));
        let sep = self.sep();
        for (i, (name, member)) in members.iter().enumerate() {
            if i > 0 && !member.traits.is_empty() {
                self.line(0, "");
            }
            let skip: &[&str] = if self.v1 { &[] } else { &[traits::DEFAULT] };
            self.traits(depth + 1, &member.traits, skip);
            let mut text = format!("{name}: {}", self.shape_ref(&member.target));
            if !self.v1 {
                if let Some(default) = member.traits.get(traits::DEFAULT) {
                    text.push_str(&format!(" = {}", self.node(default, depth + 1)));
                }
            }
            text.push_str(sep);
            self.line(depth + 1, &text);
        }
        self.line(depth, "}");
    }
}

fn key_text(k: &str) -> String {
    if ids::is_identifier(k) {
        k.to_string()
    } else {
        quote(k)
    }
}

/// A double-quoted IDL string with JSON-compatible escapes.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smithy::parser::parse;

    const MODEL: &str = r#"$version: "2"
namespace example.items

/// The item service.
service Items {
    version: "2024-01-01"
    operations: [GetItem, PutItem]
}

/// Fetch one item.
@readonly
@http(method: "GET", uri: "/items/{id}")
operation GetItem {
    input := {
        @required
        @httpLabel
        id: String
    }
    output := {
        @httpPayload
        item: Item
    }
    errors: [NotFound]
}

@idempotent
@http(method: "PUT", uri: "/items/{id}", code: 204)
operation PutItem {
    input: PutItemRequest
}

@input
structure PutItemRequest {
    @required
    @httpLabel
    id: String

    @httpPayload
    item: Item
}

structure Item {
    @length(min: 1, max: 64)
    name: String
    count: Integer = 0
    kind: Kind
}

enum Kind {
    SMALL = "small"
    LARGE = "large"
}

@error("client")
@httpError(404)
structure NotFound {
    message: String
}

list ItemList {
    member: Item
}

map Index {
    key: String
    value: Item
}

apply GetItem @examples([{ title: "one", input: { id: "1" } }])
"#;

    #[test]
    fn test_round_trip_is_stable() {
        let ast = parse("items.smithy", MODEL).unwrap();
        let text = unparse(&ast, "example.items");
        let again = parse("items.smithy", &text).unwrap();
        assert_eq!(again, ast);
        assert_eq!(unparse(&again, "example.items"), text);
    }

    #[test]
    fn test_layout() {
        let ast = parse("items.smithy", MODEL).unwrap();
        let text = unparse(&ast, "example.items");
        assert!(text.starts_with("$version: \"2.0\"\n\nnamespace example.items\n"));
        let service = text.find("service Items").unwrap();
        let op = text.find("operation GetItem").unwrap();
        let item = text.find("structure Item ").unwrap();
        assert!(service < op && op < item);
        assert!(text.contains("    input := {\n"));
        assert!(text.contains("    input: PutItemRequest\n"));
        assert!(text.contains("/// Fetch one item.\n@readonly\n@http(method: \"GET\", uri: \"/items/{id}\")\noperation GetItem {"));
        assert!(text.contains("    count: Integer = 0\n"));
        assert!(text.contains("apply GetItem @examples("));
        assert!(!text.contains("structure GetItemInput"));
    }

    #[test]
    fn test_structure_text() {
        let ast = parse(
            "p.smithy",
            "$version: \"2\"\nnamespace example.shapes\n/// A point.\nstructure Point {\n@required\nx: Integer\n@range(min: 0)\ny: Integer\n}\n",
        )
        .unwrap();
        insta::assert_snapshot!(unparse(&ast, "example.shapes"), @r#"
        $version: "2.0"

        namespace example.shapes

        /// A point.
        structure Point {
            @required
            x: Integer

            @range(min: 0)
            y: Integer
        }
        "#);
    }

    #[test]
    fn test_v1_uses_trailing_commas() {
        let ast = parse(
            "v1.smithy",
            "$version: \"1.0\"\nnamespace a\nstructure S { a: String, b: Integer }\n",
        )
        .unwrap();
        let text = unparse(&ast, "a");
        assert!(text.contains("    a: String,\n    b: Integer,\n"));
        assert_eq!(parse("v1.smithy", &text).unwrap(), ast);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }
}
