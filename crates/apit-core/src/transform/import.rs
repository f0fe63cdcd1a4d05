use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::error::ModelError;
use crate::node::{Decimal, NodeValue};
use crate::ordered::OrderedMap;
use crate::schema::ids;
use crate::schema::{
    BaseType, Constraints, Deprecation, EnumElement, EnumValue, ExampleError, ExceptionDef,
    FieldDef, HttpMethod, InputBinding, Lifecycle, OperationDef, OperationExample,
    OperationInput, OperationInputField, OperationOutput, OperationOutputField, OutputBinding,
    ResourceDef, Schema, TypeDef,
};
use crate::smithy::ast::{Ast, Member, Shape};
use crate::smithy::prelude;
use crate::smithy::traits;

/// Namespace given to references that cannot be resolved to an absolute id.
pub const FIXME_NAMESPACE: &str = "fixme";

/// Metadata key carrying the HTTP base path.
pub const BASE_PATH_METADATA: &str = "base";

/// Traits folded into first-class fields; everything else lands in the
/// entity's `traits` side table.
const TYPE_TRAITS: &[&str] = &[
    traits::DOCUMENTATION,
    traits::TAGS,
    traits::DEPRECATED,
    traits::LENGTH,
    traits::RANGE,
    traits::PATTERN,
    traits::MIXIN,
];
const MEMBER_TRAITS: &[&str] = &[
    traits::DOCUMENTATION,
    traits::REQUIRED,
    traits::DEFAULT,
    traits::LENGTH,
    traits::RANGE,
    traits::PATTERN,
    traits::HTTP_LABEL,
    traits::HTTP_QUERY,
    traits::HTTP_HEADER,
    traits::HTTP_PAYLOAD,
];
const OPERATION_TRAITS: &[&str] = &[
    traits::DOCUMENTATION,
    traits::TAGS,
    traits::DEPRECATED,
    traits::HTTP,
    traits::EXAMPLES,
];
const EXCEPTION_TRAITS: &[&str] = &[traits::DOCUMENTATION, traits::ERROR, traits::HTTP_ERROR];

/// Options for lowering an AST.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Namespace for the schema when the model declares no service.
    pub namespace: Option<String>,
}

/// Lower a merged AST into a schema.
pub fn import(ast: &Ast) -> Result<Schema, ModelError> {
    import_with_options(ast, &ImportOptions::default())
}

pub fn import_with_options(ast: &Ast, options: &ImportOptions) -> Result<Schema, ModelError> {
    let mut importer = Importer::new(ast);

    // Phase 1: service, namespace and base path
    if let Some((id, service)) = ast.service() {
        importer.schema.set_service(
            id,
            service.version.clone(),
            comment(&service.traits),
        )?;
        importer.service_errors = service.errors.iter().map(|r| r.target.clone()).collect();
    } else if let Some(ns) = options.namespace.as_deref().or(ast.namespace()) {
        importer.schema.set_namespace(ns);
    }
    if let Some(base) = ast.metadata.get(BASE_PATH_METADATA).and_then(NodeValue::as_string) {
        importer.schema.set_base(base);
    }

    // Phase 2: every shape in declaration order
    for (id, shape) in &ast.shapes {
        importer.import_shape(id, shape)?;
    }

    // Phase 3: everything the service lists must have been lowered
    if let Some((_, service)) = ast.service() {
        for r in &service.operations {
            importer.import_operation(&r.target)?;
        }
        for r in &service.resources {
            importer.import_resource(&r.target)?;
        }
    }

    Ok(importer.schema)
}

struct Importer<'a> {
    ast: &'a Ast,
    schema: Schema,
    io_ids: HashSet<String>,
    bindings: HashMap<String, (String, Lifecycle)>,
    service_errors: Vec<String>,
    done: HashSet<String>,
    inputs: HashMap<String, OperationInput>,
    outputs: HashMap<String, OperationOutput>,
}

impl<'a> Importer<'a> {
    fn new(ast: &'a Ast) -> Self {
        let mut io_ids = HashSet::new();
        let mut bindings = HashMap::new();
        for (id, shape) in &ast.shapes {
            if shape.shape_type == "operation" {
                for r in [&shape.input, &shape.output].into_iter().flatten() {
                    io_ids.insert(r.target.clone());
                }
            }
            if shape.has_trait(traits::INPUT) || shape.has_trait(traits::OUTPUT) {
                io_ids.insert(id.clone());
            }
            if shape.shape_type == "resource" {
                let resource = ResourceDef {
                    create: shape.create.as_ref().map(|r| r.target.clone()),
                    put: shape.put.as_ref().map(|r| r.target.clone()),
                    read: shape.read.as_ref().map(|r| r.target.clone()),
                    update: shape.update.as_ref().map(|r| r.target.clone()),
                    delete: shape.delete.as_ref().map(|r| r.target.clone()),
                    list: shape.list.as_ref().map(|r| r.target.clone()),
                    operations: shape.operations.iter().map(|r| r.target.clone()).collect(),
                    collection_operations: shape
                        .collection_operations
                        .iter()
                        .map(|r| r.target.clone())
                        .collect(),
                    ..ResourceDef::new(id.as_str())
                };
                for (op, lifecycle) in resource.bound_operations() {
                    bindings.insert(op.to_string(), (id.clone(), lifecycle));
                }
            }
        }
        Self {
            ast,
            schema: Schema::new(),
            io_ids,
            bindings,
            service_errors: Vec::new(),
            done: HashSet::new(),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    fn shape(&self, id: &str) -> Result<&'a Shape, ModelError> {
        self.ast
            .get_shape(id)
            .ok_or_else(|| ModelError::Reference(format!("{id} is not defined")))
    }

    fn import_shape(&mut self, id: &str, shape: &Shape) -> Result<(), ModelError> {
        if shape.has_trait(traits::MIXIN) || shape.has_trait(traits::TRAIT) {
            debug!("skipping {} shape {}", shape.shape_type, id);
            return Ok(());
        }
        match shape.shape_type.as_str() {
            "service" => Ok(()),
            "operation" => self.import_operation(id),
            "resource" => self.import_resource(id),
            "structure" if self.io_ids.contains(id) => Ok(()),
            "structure" if shape.has_trait(traits::ERROR) => self.import_exception(id),
            _ => {
                let def = self.type_def(id, shape)?;
                self.schema.add_type_def(def)
            }
        }
    }

    /// Canonical id for a shape reference.
    fn type_ref(&self, target: &str) -> String {
        if let Some(base) = prelude::base_type_for(target) {
            return base.id();
        }
        if ids::is_absolute(target) && ids::namespace_of(target) != Some(prelude::PRELUDE_NAMESPACE) {
            return target.to_string();
        }
        let name = ids::local_name(target);
        warn!("[WARNING]: {target}: unresolved type reference, using {FIXME_NAMESPACE}#{name}");
        ids::absolute(FIXME_NAMESPACE, name)
    }

    fn type_def(&self, id: &str, shape: &Shape) -> Result<TypeDef, ModelError> {
        let shape_traits = self.ast.flattened_traits(id);
        let base = prelude::base_type_for_shape_type(&shape.shape_type).ok_or_else(|| {
            ModelError::Unsupported(format!("{id}: shape type {}", shape.shape_type))
        })?;
        let mut def = TypeDef::new(id, base);
        def.comment = comment(&shape_traits);
        def.tags = tags(&shape_traits);
        def.constraints = constraints(&shape_traits);
        def.deprecated = deprecation(&shape_traits);
        def.traits = side_table(&shape_traits, TYPE_TRAITS);

        match base {
            BaseType::Struct | BaseType::Union => {
                for (name, member) in &self.ast.flattened_members(id) {
                    def.fields.push(self.field_def(name, member));
                }
            }
            BaseType::Enum => {
                let int_enum = shape.shape_type == "intEnum";
                for (name, member) in &self.ast.flattened_members(id) {
                    let mut element = EnumElement::new(name.as_str());
                    element.comment = comment(&member.traits);
                    element.value = match member.traits.get(traits::ENUM_VALUE) {
                        Some(NodeValue::String(s)) => Some(EnumValue::String(s.clone())),
                        Some(v) if int_enum => v.as_int().map(EnumValue::Int),
                        Some(_) => {
                            return Err(ModelError::Trait(format!(
                                "{id}${name}: enumValue must be a string"
                            )));
                        }
                        None => None,
                    };
                    def.elements.push(element);
                }
            }
            BaseType::List => {
                let member = shape.member.as_ref().ok_or_else(|| {
                    ModelError::Reference(format!("list {id} has no member"))
                })?;
                def.items = Some(self.type_ref(&member.target));
            }
            BaseType::Map => {
                let (Some(key), Some(value)) = (&shape.key, &shape.value) else {
                    return Err(ModelError::Reference(format!("map {id} needs key and value")));
                };
                def.keys = Some(self.type_ref(&key.target));
                def.items = Some(self.type_ref(&value.target));
            }
            _ => {}
        }
        Ok(def)
    }

    fn field_def(&self, name: &str, member: &Member) -> FieldDef {
        let mut field = FieldDef::new(name, self.type_ref(&member.target));
        field.required = member.has_trait(traits::REQUIRED);
        field.comment = comment(&member.traits);
        field.constraints = constraints(&member.traits);
        field.default = member.traits.get(traits::DEFAULT).cloned();
        field.traits = side_table(&member.traits, MEMBER_TRAITS);
        field
    }

    fn import_operation(&mut self, id: &str) -> Result<(), ModelError> {
        if !self.done.insert(id.to_string()) {
            return Ok(());
        }
        let shape = self.shape(id)?;
        if shape.shape_type != "operation" {
            return Err(ModelError::Reference(format!("{id} is not an operation")));
        }
        let op_traits = self.ast.flattened_traits(id);
        let http = op_traits.get(traits::HTTP).ok_or_else(|| {
            ModelError::Unsupported(format!("operation {id} has no @http binding"))
        })?;
        let method = http.get_string("method").unwrap_or_default();
        let http_method = HttpMethod::parse(method)
            .ok_or_else(|| ModelError::Trait(format!("{id}: unknown HTTP method {method:?}")))?;
        let uri = http
            .get_string("uri")
            .ok_or_else(|| ModelError::Trait(format!("{id}: @http requires a uri")))?;
        let status = http_status(http.get_int("code", 200), id)?;

        let mut op = OperationDef::new(id, http_method, uri);
        op.comment = comment(&op_traits);
        op.tags = tags(&op_traits);
        op.deprecated = deprecation(&op_traits);
        op.traits = side_table(&op_traits, OPERATION_TRAITS);
        if let Some((resource, lifecycle)) = self.bindings.get(id) {
            op.resource = Some(resource.clone());
            op.lifecycle = Some(*lifecycle);
        }

        let op_name = ids::local_name(id).to_string();
        let ns = ids::namespace_of(id).unwrap_or(FIXME_NAMESPACE).to_string();
        op.input = match &shape.input {
            Some(r) if r.target != prelude::shape_id("Unit") => {
                Some(self.import_input(&ns, &op_name, &r.target)?)
            }
            _ => None,
        };
        op.output = match &shape.output {
            Some(r) if r.target != prelude::shape_id("Unit") => {
                self.import_output(&ns, &op_name, &r.target, status)?
            }
            _ => OperationOutput::empty(status),
        };

        let errors = shape
            .errors
            .iter()
            .map(|r| r.target.clone())
            .chain(self.service_errors.iter().cloned())
            .collect::<Vec<_>>();
        for error in errors {
            if op.exceptions.contains(&error) {
                continue;
            }
            self.import_exception(&error)?;
            op.exceptions.push(error);
        }

        if let Some(examples) = op_traits.get(traits::EXAMPLES) {
            op.examples = examples_of(id, examples)?;
        }
        self.schema.add_operation_def(op)
    }

    fn import_input(
        &mut self,
        ns: &str,
        op_name: &str,
        target: &str,
    ) -> Result<OperationInput, ModelError> {
        // A structure shared by several operations is lowered once
        if let Some(input) = self.inputs.get(target) {
            return Ok(input.clone());
        }
        self.shape(target)?;
        let io_traits = self.ast.flattened_traits(target);
        let mut fields = Vec::new();
        let mut content = Vec::new();
        for (name, member) in &self.ast.flattened_members(target) {
            let binding = input_binding(target, name, member)?;
            match binding {
                Some(binding) => {
                    let required = member.has_trait(traits::REQUIRED)
                        || matches!(binding, InputBinding::Path | InputBinding::Payload);
                    fields.push(OperationInputField {
                        name: name.clone(),
                        field_type: self.type_ref(&member.target),
                        required,
                        binding,
                        comment: comment(&member.traits),
                        constraints: constraints(&member.traits),
                        default: member.traits.get(traits::DEFAULT).cloned(),
                        traits: side_table(&member.traits, MEMBER_TRAITS),
                    });
                }
                None => content.push(self.field_def(name, member)),
            }
        }

        let has_payload = fields.iter().any(|f| f.binding == InputBinding::Payload);
        let content_name = format!("{op_name}InputContent");
        if let Some(content_type) =
            self.synthesize_content(ns, &content_name, target, &mut content, has_payload)?
        {
            let name = content_field_name(fields.iter().map(|f| f.name.as_str()));
            fields.push(OperationInputField {
                name,
                field_type: content_type,
                required: true,
                binding: InputBinding::Payload,
                comment: None,
                constraints: Constraints::default(),
                default: None,
                traits: OrderedMap::new(),
            });
        }

        let mut io_def = TypeDef::new(target, BaseType::Struct);
        io_def.comment = comment(&io_traits);
        io_def.traits = side_table(&io_traits, TYPE_TRAITS);
        io_def.fields = fields
            .iter()
            .map(|f| FieldDef {
                name: f.name.clone(),
                field_type: f.field_type.clone(),
                required: f.required,
                comment: f.comment.clone(),
                constraints: f.constraints.clone(),
                default: f.default.clone(),
                traits: f.traits.clone(),
            })
            .chain(content)
            .collect();
        debug!("lowered input {target} with {} fields", io_def.fields.len());
        self.schema.add_type_def(io_def)?;

        let input = OperationInput {
            id: target.to_string(),
            comment: comment(&io_traits),
            fields,
        };
        self.inputs.insert(target.to_string(), input.clone());
        Ok(input)
    }

    fn import_output(
        &mut self,
        ns: &str,
        op_name: &str,
        target: &str,
        http_status: u16,
    ) -> Result<OperationOutput, ModelError> {
        if let Some(output) = self.outputs.get(target) {
            return Ok(OperationOutput {
                http_status,
                ..output.clone()
            });
        }
        self.shape(target)?;
        let io_traits = self.ast.flattened_traits(target);
        let (fields, orphans) =
            self.output_fields(ns, &format!("{op_name}OutputContent"), target)?;

        let mut io_def = TypeDef::new(target, BaseType::Struct);
        io_def.comment = comment(&io_traits);
        io_def.traits = side_table(&io_traits, TYPE_TRAITS);
        io_def.fields = fields.iter().map(output_field_def).chain(orphans).collect();
        self.schema.add_type_def(io_def)?;

        let output = OperationOutput {
            id: Some(target.to_string()),
            comment: comment(&io_traits),
            http_status,
            fields,
        };
        self.outputs.insert(target.to_string(), output.clone());
        Ok(output)
    }

    /// Header and payload fields of an output or error structure, with any
    /// unbound members moved into a synthesized `content_name` type. Members
    /// that cannot be wrapped because an explicit payload exists are
    /// returned alongside.
    fn output_fields(
        &mut self,
        ns: &str,
        content_name: &str,
        target: &str,
    ) -> Result<(Vec<OperationOutputField>, Vec<FieldDef>), ModelError> {
        let mut fields = Vec::new();
        let mut content = Vec::new();
        for (name, member) in &self.ast.flattened_members(target) {
            match output_binding(target, name, member)? {
                Some(binding) => fields.push(OperationOutputField {
                    name: name.clone(),
                    field_type: self.type_ref(&member.target),
                    required: member.has_trait(traits::REQUIRED)
                        || binding == OutputBinding::Payload,
                    binding,
                    comment: comment(&member.traits),
                    constraints: constraints(&member.traits),
                    traits: side_table(&member.traits, MEMBER_TRAITS),
                }),
                None => content.push(self.field_def(name, member)),
            }
        }
        let has_payload = fields.iter().any(|f| f.binding == OutputBinding::Payload);
        if let Some(content_type) =
            self.synthesize_content(ns, content_name, target, &mut content, has_payload)?
        {
            let name = content_field_name(fields.iter().map(|f| f.name.as_str()));
            fields.push(OperationOutputField {
                name,
                field_type: content_type,
                required: true,
                binding: OutputBinding::Payload,
                comment: None,
                constraints: Constraints::default(),
                traits: OrderedMap::new(),
            });
        }
        Ok((fields, content))
    }

    /// Wrap unbound members into a payload struct, draining `content`.
    /// Returns the new type id, or `None` when there is nothing to wrap or a
    /// payload already exists, in which case `content` is left untouched.
    fn synthesize_content(
        &mut self,
        ns: &str,
        name: &str,
        owner: &str,
        content: &mut Vec<FieldDef>,
        has_payload: bool,
    ) -> Result<Option<String>, ModelError> {
        if content.is_empty() {
            return Ok(None);
        }
        let names: Vec<&str> = content.iter().map(|f| f.name.as_str()).collect();
        if has_payload {
            warn!(
                "[WARNING]: {}: members {:?} have no HTTP binding and {} already has a payload; they are kept on the structure but not bound",
                owner,
                names,
                owner
            );
            return Ok(None);
        }
        let id = ids::absolute(ns, name);
        warn!(
            "[WARNING]: {}: members {:?} have no HTTP binding, wrapping them in payload type {}",
            owner, names, id
        );
        let mut def = TypeDef::new(id.as_str(), BaseType::Struct);
        def.fields = std::mem::take(content);
        self.schema.add_type_def(def)?;
        Ok(Some(id))
    }

    fn import_exception(&mut self, id: &str) -> Result<(), ModelError> {
        if !self.done.insert(id.to_string()) {
            return Ok(());
        }
        let shape = self.shape(id)?;
        if shape.shape_type != "structure" {
            return Err(ModelError::Reference(format!("error {id} is not a structure")));
        }
        let shape_traits = self.ast.flattened_traits(id);
        if !shape_traits.has(traits::ERROR) {
            warn!("[WARNING]: {id}: used as an error but has no @error trait");
        }
        let status = match shape_traits.get(traits::HTTP_ERROR) {
            Some(v) => http_status(
                v.as_int()
                    .ok_or_else(|| ModelError::Trait(format!("{id}: @httpError must be an integer")))?,
                id,
            )?,
            None => 500,
        };
        let ns = ids::namespace_of(id).unwrap_or(FIXME_NAMESPACE).to_string();
        let content_name = format!("{}Content", ids::local_name(id));
        let (fields, orphans) = self.output_fields(&ns, &content_name, id)?;
        if !orphans.is_empty() {
            let names: Vec<&str> = orphans.iter().map(|f| f.name.as_str()).collect();
            return Err(ModelError::Binding(format!(
                "{id}: members {names:?} have no HTTP binding alongside an @httpPayload member"
            )));
        }
        self.schema.ensure_exception_def(ExceptionDef {
            id: id.to_string(),
            comment: comment(&shape_traits),
            http_status: status,
            fault: shape_traits
                .get(traits::ERROR)
                .and_then(NodeValue::as_string)
                .map(str::to_string),
            fields,
            traits: side_table(&shape_traits, EXCEPTION_TRAITS),
        })
    }

    fn import_resource(&mut self, id: &str) -> Result<(), ModelError> {
        if !self.done.insert(id.to_string()) {
            return Ok(());
        }
        let shape = self.shape(id)?;
        if shape.shape_type != "resource" {
            return Err(ModelError::Reference(format!("{id} is not a resource")));
        }
        let target = |r: &crate::smithy::ShapeRef| r.target.clone();
        let resource = ResourceDef {
            id: id.to_string(),
            comment: comment(&shape.traits),
            identifiers: shape
                .identifiers
                .iter()
                .map(|(k, r)| (k.clone(), self.type_ref(&r.target)))
                .collect(),
            properties: shape
                .properties
                .iter()
                .map(|(k, r)| (k.clone(), self.type_ref(&r.target)))
                .collect(),
            create: shape.create.as_ref().map(target),
            put: shape.put.as_ref().map(target),
            read: shape.read.as_ref().map(target),
            update: shape.update.as_ref().map(target),
            delete: shape.delete.as_ref().map(target),
            list: shape.list.as_ref().map(target),
            operations: shape.operations.iter().map(target).collect(),
            collection_operations: shape.collection_operations.iter().map(target).collect(),
            resources: shape.resources.iter().map(target).collect(),
            tags: tags(&shape.traits),
        };
        let ops: Vec<String> = resource
            .bound_operations()
            .into_iter()
            .map(|(op, _)| op.to_string())
            .collect();
        let children = resource.resources.clone();
        self.schema.add_resource_def(resource)?;
        for op in ops {
            self.import_operation(&op)?;
        }
        for child in children {
            self.import_resource(&child)?;
        }
        Ok(())
    }
}

fn input_binding(owner: &str, name: &str, member: &Member) -> Result<Option<InputBinding>, ModelError> {
    let mut found = Vec::new();
    if member.has_trait(traits::HTTP_LABEL) {
        found.push(InputBinding::Path);
    }
    if let Some(v) = member.traits.get(traits::HTTP_QUERY) {
        found.push(InputBinding::Query(binding_name(v, name)));
    }
    if let Some(v) = member.traits.get(traits::HTTP_HEADER) {
        found.push(InputBinding::Header(binding_name(v, name)));
    }
    if member.has_trait(traits::HTTP_PAYLOAD) {
        found.push(InputBinding::Payload);
    }
    if found.len() > 1 {
        return Err(ModelError::Binding(format!(
            "{owner}${name} has more than one HTTP binding"
        )));
    }
    Ok(found.pop())
}

fn output_binding(owner: &str, name: &str, member: &Member) -> Result<Option<OutputBinding>, ModelError> {
    if member.has_trait(traits::HTTP_LABEL) || member.has_trait(traits::HTTP_QUERY) {
        return Err(ModelError::Binding(format!(
            "{owner}${name}: path and query bindings are not allowed in responses"
        )));
    }
    if member.has_trait(traits::HTTP_RESPONSE_CODE) {
        warn!("[WARNING]: {owner}${name}: @httpResponseCode is not supported, treating as body content");
    }
    match (member.traits.get(traits::HTTP_HEADER), member.has_trait(traits::HTTP_PAYLOAD)) {
        (Some(_), true) => Err(ModelError::Binding(format!(
            "{owner}${name} has more than one HTTP binding"
        ))),
        (Some(v), false) => Ok(Some(OutputBinding::Header(binding_name(v, name)))),
        (None, true) => Ok(Some(OutputBinding::Payload)),
        (None, false) => Ok(None),
    }
}

/// Header or query parameter name; falls back to the member name.
fn binding_name(value: &NodeValue, member: &str) -> String {
    value
        .as_string()
        .filter(|s| !s.is_empty())
        .unwrap_or(member)
        .to_string()
}

/// Name for a synthesized payload field that does not clash with `taken`.
fn content_field_name<'a>(taken: impl Iterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.collect();
    ["content", "body", "payload"]
        .into_iter()
        .find(|n| !taken.contains(n))
        .unwrap_or("content_")
        .to_string()
}

fn output_field_def(f: &OperationOutputField) -> FieldDef {
    FieldDef {
        name: f.name.clone(),
        field_type: f.field_type.clone(),
        required: f.required,
        comment: f.comment.clone(),
        constraints: f.constraints.clone(),
        default: None,
        traits: f.traits.clone(),
    }
}

fn http_status(code: i64, owner: &str) -> Result<u16, ModelError> {
    u16::try_from(code)
        .ok()
        .filter(|c| (100..=599).contains(c))
        .ok_or_else(|| ModelError::Trait(format!("{owner}: HTTP status {code} is out of range")))
}

pub(crate) fn comment(traits_map: &OrderedMap<NodeValue>) -> Option<String> {
    traits_map
        .get(traits::DOCUMENTATION)
        .and_then(NodeValue::as_string)
        .map(str::to_string)
}

fn tags(traits_map: &OrderedMap<NodeValue>) -> Vec<String> {
    traits_map
        .get(traits::TAGS)
        .and_then(NodeValue::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(NodeValue::as_string)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn deprecation(traits_map: &OrderedMap<NodeValue>) -> Option<Deprecation> {
    traits_map.get(traits::DEPRECATED).map(|d| Deprecation {
        message: d.get_string("message").map(str::to_string),
        since: d.get_string("since").map(str::to_string),
    })
}

fn constraints(traits_map: &OrderedMap<NodeValue>) -> Constraints {
    let mut c = Constraints::default();
    if let Some(length) = traits_map.get(traits::LENGTH) {
        c.min_size = length.get_decimal("min").and_then(Decimal::as_i64);
        c.max_size = length.get_decimal("max").and_then(Decimal::as_i64);
    }
    if let Some(range) = traits_map.get(traits::RANGE) {
        c.min_value = range.get_decimal("min").cloned();
        c.max_value = range.get_decimal("max").cloned();
    }
    c.pattern = traits_map
        .get(traits::PATTERN)
        .and_then(NodeValue::as_string)
        .map(str::to_string);
    c
}

fn side_table(traits_map: &OrderedMap<NodeValue>, first_class: &[&str]) -> OrderedMap<NodeValue> {
    traits_map
        .iter()
        .filter(|(k, _)| !first_class.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn examples_of(op: &str, value: &NodeValue) -> Result<Vec<OperationExample>, ModelError> {
    let entries = value
        .as_array()
        .ok_or_else(|| ModelError::Trait(format!("{op}: @examples must be a list")))?;
    let mut examples = Vec::new();
    for entry in entries {
        let title = entry
            .get_string("title")
            .ok_or_else(|| ModelError::Trait(format!("{op}: example without a title")))?;
        let error = match entry.get("error") {
            Some(e) => Some(ExampleError {
                shape_id: e
                    .get_string("shapeId")
                    .ok_or_else(|| ModelError::Trait(format!("{op}: example error needs shapeId")))?
                    .to_string(),
                content: e.get("content").cloned().unwrap_or_else(NodeValue::object),
            }),
            None => None,
        };
        examples.push(OperationExample {
            title: title.to_string(),
            documentation: entry.get_string("documentation").map(str::to_string),
            input: entry.get("input").cloned().unwrap_or_else(NodeValue::object),
            output: entry.get("output").cloned(),
            error,
        });
    }
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smithy::parse;

    fn lower(src: &str) -> Schema {
        import(&parse("test.smithy", src).unwrap()).unwrap()
    }

    #[test]
    fn test_structure_lowering() {
        let s = lower(
            "$version: \"2\"\nnamespace ex\nstructure Foo {\n  @required\n  name: String\n  age: Integer\n}\n",
        );
        let foo = s.get_type_def("ex#Foo").unwrap();
        assert_eq!(foo.base, BaseType::Struct);
        assert_eq!(foo.fields.len(), 2);
        assert_eq!(foo.fields[0].name, "name");
        assert!(foo.fields[0].required);
        assert_eq!(foo.fields[0].field_type, "base#String");
        assert!(!foo.fields[1].required);
        assert_eq!(foo.fields[1].field_type, "base#Int32");
    }

    #[test]
    fn test_operation_with_inline_io() {
        let s = lower(
            r#"$version: "2"
namespace ex

@http(method: "GET", uri: "/items/{id}")
operation GetItem {
    input := {
        @httpLabel
        id: String
    }
    output := {
        @httpPayload
        item: Item
    }
}

structure Item { name: String }
"#,
        );
        assert_eq!(s.operations().len(), 1);
        let op = s.get_operation_def("ex#GetItem").unwrap();
        assert_eq!(op.http_method, HttpMethod::Get);
        assert_eq!(op.http_uri, "/items/{id}");
        let input = op.input.as_ref().unwrap();
        assert_eq!(input.fields.len(), 1);
        assert_eq!(input.fields[0].binding, InputBinding::Path);
        assert!(input.fields[0].required);
        assert_eq!(op.output.http_status, 200);
        assert_eq!(op.output.fields[0].binding, OutputBinding::Payload);
        assert_eq!(op.output_http_payload_name(), "item");
        assert!(s.get_type_def("ex#GetItemInput").is_some());
        assert!(s.get_type_def("ex#GetItemOutput").is_some());
    }

    #[test]
    fn test_exception_lowering() {
        let s = lower(
            r#"$version: "2"
namespace ex

@httpError(404)
@error("client")
structure NotFound {
    @httpPayload
    body: ErrorBody
}

structure ErrorBody { message: String }
"#,
        );
        let e = s.get_exception_def("ex#NotFound").unwrap();
        assert_eq!(e.http_status, 404);
        assert_eq!(e.fault.as_deref(), Some("client"));
        assert_eq!(e.fields.len(), 1);
        assert_eq!(e.fields[0].binding, OutputBinding::Payload);
        assert!(s.get_type_def("ex#NotFound").is_none());
    }

    #[test]
    fn test_unbound_members_are_wrapped() {
        let s = lower(
            r#"$version: "2"
namespace ex

@http(method: "POST", uri: "/items/{id}")
operation CreateItem {
    input := {
        @httpLabel
        id: String
        name: String
        @range(min: 1)
        count: Integer
    }
}
"#,
        );
        let op = s.get_operation_def("ex#CreateItem").unwrap();
        let input = op.input.as_ref().unwrap();
        let payload = input.payload_field().unwrap();
        assert_eq!(payload.name, "content");
        assert_eq!(payload.field_type, "ex#CreateItemInputContent");
        assert!(payload.required);
        let content = s.get_type_def("ex#CreateItemInputContent").unwrap();
        let names: Vec<&str> = content.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "count"]);
        assert_eq!(
            content.fields[1].constraints.min_value.as_ref().map(ToString::to_string),
            Some("1".to_string())
        );
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_shared_output_structure() {
        let s = lower(
            r#"$version: "1.0"
namespace ex

@readonly
@http(method: "GET", uri: "/a")
operation GetA {
    output: ItemResult
}

@readonly
@http(method: "GET", uri: "/b")
operation GetB {
    output: ItemResult
}

structure ItemResult {
    name: String
}
"#,
        );
        let a = s.get_operation_def("ex#GetA").unwrap();
        let b = s.get_operation_def("ex#GetB").unwrap();
        assert_eq!(a.output.fields, b.output.fields);
        assert_eq!(a.output.fields[0].field_type, "ex#GetAOutputContent");
        assert!(s.get_type_def("ex#GetBOutputContent").is_none());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_shared_input_structure() {
        let s = lower(
            r#"$version: "1.0"
namespace ex

@http(method: "POST", uri: "/a")
operation PostA {
    input: Req
}

@http(method: "POST", uri: "/b", code: 201)
operation PostB {
    input: Req
}

structure Req {
    @httpHeader("X-Id")
    id: String
    name: String
}
"#,
        );
        let a = s.get_operation_def("ex#PostA").unwrap().input.as_ref().unwrap();
        let b = s.get_operation_def("ex#PostB").unwrap().input.as_ref().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.payload_field().unwrap().field_type, "ex#PostAInputContent");
        assert_eq!(s.get_type_def("ex#Req").unwrap().fields.len(), 2);
    }

    #[test]
    fn test_unbound_members_beside_payload_are_kept() {
        let s = lower(
            r#"$version: "2"
namespace ex

@http(method: "PUT", uri: "/items")
operation PutItem {
    input := {
        @httpPayload
        item: String
        note: String
    }
}
"#,
        );
        let op = s.get_operation_def("ex#PutItem").unwrap();
        let input = op.input.as_ref().unwrap();
        assert_eq!(input.fields.len(), 1);
        assert_eq!(input.payload_field().unwrap().name, "item");
        let io = s.get_type_def("ex#PutItemInput").unwrap();
        let names: Vec<&str> = io.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["item", "note"]);
    }

    #[test]
    fn test_unbound_error_members_beside_payload() {
        let ast = parse(
            "test.smithy",
            r#"$version: "2"
namespace ex

@http(method: "GET", uri: "/x")
operation Op {
    errors: [Broken]
}

@error("client")
structure Broken {
    @httpPayload
    detail: String
    code: Integer
}
"#,
        )
        .unwrap();
        assert!(matches!(import(&ast), Err(ModelError::Binding(_))));
    }

    #[test]
    fn test_mixin_cycle_terminates() {
        let s = lower(
            r#"$version: "2"
namespace ex

@mixin
structure A with [B] {}

@mixin
structure B with [A] {}

structure C with [A] {
    x: String
}
"#,
        );
        let c = s.get_type_def("ex#C").unwrap();
        assert_eq!(c.fields.len(), 1);
        assert_eq!(c.fields[0].name, "x");
        assert!(s.get_type_def("ex#A").is_none());
    }

    #[test]
    fn test_two_bindings_is_an_error() {
        let ast = parse(
            "test.smithy",
            r#"$version: "2"
namespace ex
@http(method: "GET", uri: "/x")
operation Op {
    input := {
        @httpQuery("a")
        @httpHeader("X-A")
        a: String
    }
}
"#,
        )
        .unwrap();
        assert!(matches!(import(&ast), Err(ModelError::Binding(_))));
    }

    #[test]
    fn test_enums_resources_and_service_errors() {
        let s = lower(
            r#"$version: "2"
namespace ex

service Shop {
    version: "1"
    resources: [Item]
    errors: [Oops]
}

resource Item {
    identifiers: { id: String }
    read: GetItem
}

@readonly
@http(method: "GET", uri: "/items/{id}")
operation GetItem {
    input := {
        @required
        @httpLabel
        id: String
    }
}

@error("server")
structure Oops {}

enum Color {
    RED = "red"
    GREEN
}
"#,
        );
        assert_eq!(s.id(), Some("ex#Shop"));
        assert_eq!(s.version(), Some("1"));
        let op = s.get_operation_def("ex#GetItem").unwrap();
        assert_eq!(op.resource.as_deref(), Some("ex#Item"));
        assert_eq!(op.lifecycle, Some(Lifecycle::Read));
        assert_eq!(op.exceptions, vec!["ex#Oops"]);
        assert!(op.traits.has("smithy.api#readonly"));
        assert_eq!(s.get_exception_def("ex#Oops").unwrap().http_status, 500);
        let r = s.get_resource_def("ex#Item").unwrap();
        assert_eq!(r.identifiers.get("id").map(String::as_str), Some("base#String"));
        let color = s.get_type_def("ex#Color").unwrap();
        assert_eq!(color.elements[0].value, Some(EnumValue::String("red".into())));
        assert_eq!(color.elements[1].value, None);
    }

    #[test]
    fn test_relative_reference_becomes_fixme() {
        let mut ast = Ast::new();
        let mut s = Shape::new("structure");
        s.members.put("x", Member::new("Orphan"));
        ast.put_shape("ex#S", s);
        let schema = import(&ast).unwrap();
        assert_eq!(schema.get_type_def("ex#S").unwrap().fields[0].field_type, "fixme#Orphan");
    }
}
