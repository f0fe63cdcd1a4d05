//! Template context built from the schema.

use apit_core::schema::ids::{BASE_NAMESPACE, local_name, namespace_of};
use apit_core::schema::{
    BaseType, Constraints, EnumValue, InputBinding, Lifecycle, OperationOutputField, OutputBinding,
    Schema, TypeDef,
};
use minijinja::{Value, context};

/// Heading anchor for an entity, as rendered by common Markdown hosts.
pub fn anchor(id: &str) -> String {
    local_name(id).to_lowercase()
}

/// Type reference for a table cell. Base types are shown bare; model types
/// link to their section.
pub fn type_ref(schema: &Schema, id: &str) -> String {
    let name = local_name(id);
    if namespace_of(id) == Some(BASE_NAMESPACE) {
        return name.to_string();
    }
    if schema.get_type_def(id).is_some() && !schema.is_operation_io(id) {
        format!("[{name}](#{})", anchor(id))
    } else {
        format!("`{id}`")
    }
}

/// Single-line cell text.
pub fn cell(text: Option<&str>) -> String {
    text.unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Human-readable constraint summary, e.g. `length 1..10, pattern ^a$`.
pub fn describe_constraints(c: &Constraints) -> String {
    let mut parts = Vec::new();
    match (c.min_size, c.max_size) {
        (Some(min), Some(max)) => parts.push(format!("length {min}..{max}")),
        (Some(min), None) => parts.push(format!("length >= {min}")),
        (None, Some(max)) => parts.push(format!("length <= {max}")),
        (None, None) => {}
    }
    match (&c.min_value, &c.max_value) {
        (Some(min), Some(max)) => parts.push(format!("range {min}..{max}")),
        (Some(min), None) => parts.push(format!("min {min}")),
        (None, Some(max)) => parts.push(format!("max {max}")),
        (None, None) => {}
    }
    if let Some(p) = &c.pattern {
        parts.push(format!("pattern `{p}`"));
    }
    parts.join(", ")
}

fn lifecycle_name(l: Lifecycle) -> &'static str {
    match l {
        Lifecycle::Create => "create",
        Lifecycle::Put => "put",
        Lifecycle::Read => "read",
        Lifecycle::Update => "update",
        Lifecycle::Delete => "delete",
        Lifecycle::List => "list",
        Lifecycle::Instance => "operation",
        Lifecycle::Collection => "collection operation",
    }
}

fn ordered<'a, T>(all: &'a [T], sorted: Vec<&'a T>, sort: bool) -> Vec<&'a T> {
    if sort { sorted } else { all.iter().collect() }
}

fn output_fields(schema: &Schema, fields: &[OperationOutputField]) -> Vec<Value> {
    fields
        .iter()
        .map(|f| {
            let location = match &f.binding {
                OutputBinding::Header(h) => format!("header `{h}`"),
                OutputBinding::Payload => "payload".to_string(),
            };
            context! {
                name => f.name.clone(),
                type_name => type_ref(schema, &f.field_type),
                location => location,
                description => cell(f.comment.as_deref()),
            }
        })
        .collect()
}

pub fn operations(schema: &Schema, sort: bool) -> Vec<Value> {
    ordered(schema.operations(), schema.sorted_operations(), sort)
        .into_iter()
        .map(|op| {
            let input: Vec<Value> = op
                .input
                .iter()
                .flat_map(|i| &i.fields)
                .map(|f| {
                    let location = match &f.binding {
                        InputBinding::Path => "path".to_string(),
                        InputBinding::Query(q) => format!("query `{q}`"),
                        InputBinding::Header(h) => format!("header `{h}`"),
                        InputBinding::Payload => "payload".to_string(),
                    };
                    let mut description = cell(f.comment.as_deref());
                    let constraints = describe_constraints(&f.constraints);
                    if !constraints.is_empty() {
                        if !description.is_empty() {
                            description.push(' ');
                        }
                        description.push_str(&format!("({constraints})"));
                    }
                    context! {
                        name => f.name.clone(),
                        type_name => type_ref(schema, &f.field_type),
                        location => location,
                        required => f.required,
                        description => description,
                    }
                })
                .collect();
            let exceptions: Vec<Value> = op
                .exceptions
                .iter()
                .map(|id| {
                    context! {
                        name => local_name(id),
                        anchor => anchor(id),
                        status => schema.get_exception_def(id).map(|e| e.http_status),
                    }
                })
                .collect();
            context! {
                name => local_name(&op.id),
                anchor => anchor(&op.id),
                method => op.http_method.as_str(),
                uri => op.http_uri.clone(),
                status => op.output.http_status,
                comment => op.comment.clone(),
                tags => op.tags.clone(),
                deprecated => op.deprecated.is_some(),
                deprecated_message => op.deprecated.as_ref().and_then(|d| d.message.clone()),
                input => input,
                output => output_fields(schema, &op.output.fields),
                exceptions => exceptions,
            }
        })
        .collect()
}

fn type_summary(schema: &Schema, t: &TypeDef) -> String {
    let mut parts = Vec::new();
    match t.base {
        BaseType::List => {
            if let Some(items) = &t.items {
                parts.push(format!("of {}", type_ref(schema, items)));
            }
        }
        BaseType::Map => {
            if let (Some(keys), Some(items)) = (&t.keys, &t.items) {
                parts.push(format!(
                    "from {} to {}",
                    type_ref(schema, keys),
                    type_ref(schema, items)
                ));
            }
        }
        _ => {}
    }
    let constraints = describe_constraints(&t.constraints);
    if !constraints.is_empty() {
        parts.push(constraints);
    }
    parts.join(", ")
}

pub fn types(schema: &Schema, sort: bool) -> Vec<Value> {
    ordered(schema.types(), schema.sorted_types(), sort)
        .into_iter()
        .filter(|t| !schema.is_operation_io(&t.id))
        .map(|t| {
            let fields: Vec<Value> = t
                .fields
                .iter()
                .map(|f| {
                    context! {
                        name => f.name.clone(),
                        type_name => type_ref(schema, &f.field_type),
                        required => f.required,
                        description => cell(f.comment.as_deref()),
                    }
                })
                .collect();
            let elements: Vec<Value> = t
                .elements
                .iter()
                .map(|e| {
                    let value = match &e.value {
                        Some(EnumValue::String(s)) => format!("`\"{s}\"`"),
                        Some(EnumValue::Int(i)) => format!("`{i}`"),
                        None => String::new(),
                    };
                    context! {
                        symbol => e.symbol.clone(),
                        value => value,
                        description => cell(e.comment.as_deref()),
                    }
                })
                .collect();
            context! {
                name => local_name(&t.id),
                anchor => anchor(&t.id),
                kind => t.base.name(),
                summary => type_summary(schema, t),
                comment => t.comment.clone(),
                fields => fields,
                elements => elements,
            }
        })
        .collect()
}

pub fn exceptions(schema: &Schema, sort: bool) -> Vec<Value> {
    ordered(schema.exceptions(), schema.sorted_exceptions(), sort)
        .into_iter()
        .map(|e| {
            context! {
                name => local_name(&e.id),
                anchor => anchor(&e.id),
                status => e.http_status,
                fault => e.fault.clone(),
                comment => e.comment.clone(),
                fields => output_fields(schema, &e.fields),
            }
        })
        .collect()
}

pub fn resources(schema: &Schema, sort: bool) -> Vec<Value> {
    ordered(schema.resources(), schema.sorted_resources(), sort)
        .into_iter()
        .map(|r| {
            let operations: Vec<Value> = r
                .bound_operations()
                .into_iter()
                .map(|(id, lifecycle)| {
                    context! {
                        name => local_name(id),
                        anchor => anchor(id),
                        lifecycle => lifecycle_name(lifecycle),
                    }
                })
                .collect();
            context! {
                name => local_name(&r.id),
                comment => r.comment.clone(),
                identifiers => r.identifiers.keys(),
                operations => operations,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apit_core::node::Decimal;

    #[test]
    fn test_describe_constraints() {
        let c = Constraints {
            min_size: Some(1),
            max_size: Some(10),
            pattern: Some("^[a-z]+$".into()),
            ..Default::default()
        };
        insta::assert_snapshot!(describe_constraints(&c), @"length 1..10, pattern `^[a-z]+$`");

        let c = Constraints {
            min_value: Some(Decimal::from(0i64)),
            ..Default::default()
        };
        insta::assert_snapshot!(describe_constraints(&c), @"min 0");
        assert_eq!(describe_constraints(&Constraints::default()), "");
    }

    #[test]
    fn test_cells_are_single_line() {
        assert_eq!(cell(Some("a\n  b | c")), "a b \\| c");
        assert_eq!(cell(None), "");
    }

    #[test]
    fn test_type_refs() {
        let schema = Schema::new();
        assert_eq!(type_ref(&schema, "base#Int32"), "Int32");
        assert_eq!(type_ref(&schema, "other#Thing"), "`other#Thing`");
        assert_eq!(anchor("ns#GetCity"), "getcity");
    }
}
