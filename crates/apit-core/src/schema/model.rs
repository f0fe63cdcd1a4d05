use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

use super::ids::{local_name, namespace_of};
use super::operations::{ExceptionDef, OperationDef};
use super::resources::ResourceDef;
use super::types::{BaseType, TypeDef};

/// Lookup tables from id to position, built on first use.
#[derive(Debug, Clone, Default)]
struct Indices {
    types: HashMap<String, usize>,
    operations: HashMap<String, usize>,
    exceptions: HashMap<String, usize>,
    resources: HashMap<String, usize>,
}

/// The canonical, language-neutral model of one API.
///
/// Collections keep declaration order. Entities are only ever appended (or
/// dropped by [`Schema::filter`]); an entity's id never changes after it is
/// added.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<String>,
    #[serde(default)]
    types: Vec<TypeDef>,
    #[serde(default)]
    operations: Vec<OperationDef>,
    #[serde(default)]
    exceptions: Vec<ExceptionDef>,
    #[serde(default)]
    resources: Vec<ResourceDef>,
    #[serde(skip)]
    index: OnceCell<Indices>,
}

/// Two schemas are equal when they define the same entities, regardless of
/// declaration order.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.namespace == other.namespace
            && self.version == other.version
            && self.comment == other.comment
            && self.base == other.base
            && same_entities(&self.types, &other.types, |t| &t.id)
            && same_entities(&self.operations, &other.operations, |o| &o.id)
            && same_entities(&self.exceptions, &other.exceptions, |e| &e.id)
            && same_entities(&self.resources, &other.resources, |r| &r.id)
    }
}

fn same_entities<T: PartialEq>(a: &[T], b: &[T], id: impl Fn(&T) -> &String) -> bool {
    let by_id: HashMap<&String, &T> = b.iter().map(|x| (id(x), x)).collect();
    a.len() == b.len() && a.iter().all(|x| by_id.get(id(x)) == Some(&x))
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service id, if the model declares a service.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// HTTP base path prepended to every operation URI.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    pub fn operations(&self) -> &[OperationDef] {
        &self.operations
    }

    pub fn exceptions(&self) -> &[ExceptionDef] {
        &self.exceptions
    }

    pub fn resources(&self) -> &[ResourceDef] {
        &self.resources
    }

    /// Declare the service. A schema has at most one service id.
    pub fn set_service(
        &mut self,
        id: &str,
        version: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        if let Some(existing) = &self.id {
            if existing != id {
                return Err(ModelError::Duplicate(format!(
                    "schema already has service {existing}, cannot add {id}"
                )));
            }
        }
        self.id = Some(id.to_string());
        self.namespace = namespace_of(id).map(str::to_string);
        if version.is_some() {
            self.version = version;
        }
        if comment.is_some() {
            self.comment = comment;
        }
        Ok(())
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = Some(namespace.into());
    }

    pub fn set_base(&mut self, base: impl Into<String>) {
        self.base = Some(base.into());
    }

    /// Local name of the service, e.g. `Weather` for `example.weather#Weather`.
    pub fn service_name(&self) -> Option<&str> {
        self.id.as_deref().map(local_name)
    }

    pub fn service_namespace(&self) -> Option<&str> {
        self.id
            .as_deref()
            .and_then(namespace_of)
            .or(self.namespace.as_deref())
    }

    fn invalidate(&mut self) {
        self.index = OnceCell::new();
    }

    fn indices(&self) -> &Indices {
        self.index.get_or_init(|| {
            let position = |ids: Vec<&String>| {
                ids.into_iter()
                    .enumerate()
                    .map(|(i, id)| (id.clone(), i))
                    .collect::<HashMap<_, _>>()
            };
            Indices {
                types: position(self.types.iter().map(|t| &t.id).collect()),
                operations: position(self.operations.iter().map(|o| &o.id).collect()),
                exceptions: position(self.exceptions.iter().map(|e| &e.id).collect()),
                resources: position(self.resources.iter().map(|r| &r.id).collect()),
            }
        })
    }

    /// Add a type. Re-adding an identical definition is a no-op.
    pub fn add_type_def(&mut self, def: TypeDef) -> Result<(), ModelError> {
        if let Some(existing) = self.get_type_def(&def.id) {
            if *existing == def {
                return Ok(());
            }
            return Err(ModelError::Duplicate(format!("type {}", def.id)));
        }
        self.types.push(def);
        self.invalidate();
        Ok(())
    }

    /// Add an operation. Re-adding an identical definition is a no-op.
    pub fn add_operation_def(&mut self, def: OperationDef) -> Result<(), ModelError> {
        if let Some(existing) = self.get_operation_def(&def.id) {
            if *existing == def {
                return Ok(());
            }
            return Err(ModelError::Duplicate(format!("operation {}", def.id)));
        }
        self.operations.push(def);
        self.invalidate();
        Ok(())
    }

    /// Add a resource. Re-adding an identical definition is a no-op.
    pub fn add_resource_def(&mut self, def: ResourceDef) -> Result<(), ModelError> {
        if let Some(existing) = self.get_resource_def(&def.id) {
            if *existing == def {
                return Ok(());
            }
            return Err(ModelError::Duplicate(format!("resource {}", def.id)));
        }
        self.resources.push(def);
        self.invalidate();
        Ok(())
    }

    /// Register an exception, idempotently. A second registration under the
    /// same id must be structurally equivalent to the first.
    pub fn ensure_exception_def(&mut self, def: ExceptionDef) -> Result<(), ModelError> {
        if let Some(existing) = self.get_exception_def(&def.id) {
            if existing.same_shape(&def) {
                return Ok(());
            }
            return Err(ModelError::Duplicate(format!(
                "exception {} is defined twice with different structures",
                def.id
            )));
        }
        self.exceptions.push(def);
        self.invalidate();
        Ok(())
    }

    pub fn get_type_def(&self, id: &str) -> Option<&TypeDef> {
        self.indices().types.get(id).map(|&i| &self.types[i])
    }

    pub fn get_operation_def(&self, id: &str) -> Option<&OperationDef> {
        self.indices().operations.get(id).map(|&i| &self.operations[i])
    }

    pub fn get_exception_def(&self, id: &str) -> Option<&ExceptionDef> {
        self.indices().exceptions.get(id).map(|&i| &self.exceptions[i])
    }

    pub fn get_resource_def(&self, id: &str) -> Option<&ResourceDef> {
        self.indices().resources.get(id).map(|&i| &self.resources[i])
    }

    /// Base kind of a referenced id. Operation inputs, outputs and exceptions
    /// are structure-shaped.
    pub fn base_type(&self, id: &str) -> Option<BaseType> {
        if let Some(b) = BaseType::from_id(id) {
            return Some(b);
        }
        if let Some(t) = self.get_type_def(id) {
            return Some(t.base);
        }
        if self.get_exception_def(id).is_some() || self.is_operation_io(id) {
            return Some(BaseType::Struct);
        }
        None
    }

    /// True when `id` names an operation's input or output structure.
    pub fn is_operation_io(&self, id: &str) -> bool {
        self.operations.iter().any(|op| {
            op.input.as_ref().is_some_and(|i| i.id == id) || op.output.id.as_deref() == Some(id)
        })
    }

    /// True when `id` resolves to a built-in, a type, or an exception.
    pub fn is_defined(&self, id: &str) -> bool {
        BaseType::from_id(id).is_some()
            || self.get_type_def(id).is_some()
            || self.get_exception_def(id).is_some()
    }

    pub fn sorted_types(&self) -> Vec<&TypeDef> {
        sorted_by_name(&self.types, |t| &t.id)
    }

    pub fn sorted_operations(&self) -> Vec<&OperationDef> {
        sorted_by_name(&self.operations, |o| &o.id)
    }

    pub fn sorted_exceptions(&self) -> Vec<&ExceptionDef> {
        sorted_by_name(&self.exceptions, |e| &e.id)
    }

    pub fn sorted_resources(&self) -> Vec<&ResourceDef> {
        sorted_by_name(&self.resources, |r| &r.id)
    }

    /// Fold another schema into this one. Identical duplicate entities are
    /// skipped; diverging ones and mismatched service ids are conflicts.
    pub fn merge(&mut self, other: Schema) -> Result<(), ModelError> {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) if a != b => {
                return Err(ModelError::MergeConflict(format!(
                    "cannot merge service {b} into service {a}"
                )));
            }
            (None, Some(_)) => {
                self.id = other.id.clone();
                self.namespace = other.namespace.clone();
            }
            _ => {}
        }
        if self.namespace.is_none() {
            self.namespace = other.namespace;
        }
        if self.version.is_none() {
            self.version = other.version;
        }
        if self.comment.is_none() {
            self.comment = other.comment;
        }
        if self.base.is_none() {
            self.base = other.base;
        }
        let conflict = |e: ModelError| ModelError::MergeConflict(e.to_string());
        for t in other.types {
            self.add_type_def(t).map_err(conflict)?;
        }
        for e in other.exceptions {
            self.ensure_exception_def(e).map_err(conflict)?;
        }
        for o in other.operations {
            self.add_operation_def(o).map_err(conflict)?;
        }
        for r in other.resources {
            self.add_resource_def(r).map_err(conflict)?;
        }
        Ok(())
    }

    /// Keep only entities whose id is in `keep`.
    pub(crate) fn retain(&mut self, keep: &HashSet<String>) {
        self.types.retain(|t| keep.contains(&t.id));
        self.operations.retain(|o| keep.contains(&o.id));
        self.exceptions.retain(|e| keep.contains(&e.id));
        self.resources.retain(|r| keep.contains(&r.id));
        self.invalidate();
    }

    /// Reorder every collection by local name.
    pub fn sort(&mut self) {
        self.types.sort_by(|a, b| local_name(&a.id).cmp(local_name(&b.id)));
        self.operations.sort_by(|a, b| local_name(&a.id).cmp(local_name(&b.id)));
        self.exceptions.sort_by(|a, b| local_name(&a.id).cmp(local_name(&b.id)));
        self.resources.sort_by(|a, b| local_name(&a.id).cmp(local_name(&b.id)));
        self.invalidate();
    }
}

fn sorted_by_name<T>(items: &[T], id: impl Fn(&T) -> &String) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| local_name(id(a)).cmp(local_name(id(b))));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, HttpMethod, OperationOutput};

    fn exception(id: &str, status: u16) -> ExceptionDef {
        ExceptionDef {
            id: id.into(),
            comment: None,
            http_status: status,
            fault: None,
            fields: Vec::new(),
            traits: Default::default(),
        }
    }

    #[test]
    fn test_lookup_after_add_invalidates_index() {
        let mut s = Schema::new();
        s.add_type_def(TypeDef::new("ns#A", BaseType::String)).unwrap();
        assert!(s.get_type_def("ns#A").is_some());
        assert!(s.get_type_def("ns#B").is_none());
        s.add_type_def(TypeDef::new("ns#B", BaseType::Int32)).unwrap();
        assert_eq!(s.get_type_def("ns#B").map(|t| t.base), Some(BaseType::Int32));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut s = Schema::new();
        s.add_type_def(TypeDef::new("ns#A", BaseType::String)).unwrap();
        s.add_type_def(TypeDef::new("ns#A", BaseType::String)).unwrap();
        let err = s.add_type_def(TypeDef::new("ns#A", BaseType::Bool)).unwrap_err();
        assert!(matches!(err, ModelError::Duplicate(_)));
        assert_eq!(s.types().len(), 1);
    }

    #[test]
    fn test_exception_registry_requires_same_shape() {
        let mut s = Schema::new();
        s.ensure_exception_def(exception("ns#NotFound", 404)).unwrap();
        s.ensure_exception_def(exception("ns#NotFound", 404)).unwrap();
        assert_eq!(s.exceptions().len(), 1);
        assert!(s.ensure_exception_def(exception("ns#NotFound", 410)).is_err());
    }

    #[test]
    fn test_base_type() {
        let mut s = Schema::new();
        let mut t = TypeDef::new("ns#Item", BaseType::Struct);
        t.fields.push(FieldDef::new("name", "base#String"));
        s.add_type_def(t).unwrap();
        s.ensure_exception_def(exception("ns#Oops", 500)).unwrap();
        let mut op = OperationDef::new("ns#Get", HttpMethod::Get, "/");
        op.output = OperationOutput {
            id: Some("ns#GetOutput".into()),
            ..OperationOutput::empty(200)
        };
        s.add_operation_def(op).unwrap();

        assert_eq!(s.base_type("base#Int64"), Some(BaseType::Int64));
        assert_eq!(s.base_type("ns#Item"), Some(BaseType::Struct));
        assert_eq!(s.base_type("ns#Oops"), Some(BaseType::Struct));
        assert_eq!(s.base_type("ns#GetOutput"), Some(BaseType::Struct));
        assert_eq!(s.base_type("ns#Nope"), None);
    }

    #[test]
    fn test_service_once() {
        let mut s = Schema::new();
        s.set_service("example.weather#Weather", Some("2024-01-01".into()), None)
            .unwrap();
        assert_eq!(s.service_name(), Some("Weather"));
        assert_eq!(s.service_namespace(), Some("example.weather"));
        assert!(s.set_service("example.weather#Other", None, None).is_err());
    }

    #[test]
    fn test_merge_rejects_different_services() {
        let mut a = Schema::new();
        a.set_service("ns#A", None, None).unwrap();
        let mut b = Schema::new();
        b.set_service("ns#B", None, None).unwrap();
        assert!(matches!(a.merge(b), Err(ModelError::MergeConflict(_))));

        let mut c = Schema::new();
        c.add_type_def(TypeDef::new("ns#T", BaseType::String)).unwrap();
        a.merge(c).unwrap();
        assert!(a.get_type_def("ns#T").is_some());
    }

    #[test]
    fn test_sorted_variants_strip_namespace() {
        let mut s = Schema::new();
        s.add_type_def(TypeDef::new("z.ns#Apple", BaseType::String)).unwrap();
        s.add_type_def(TypeDef::new("a.ns#Cherry", BaseType::String)).unwrap();
        s.add_type_def(TypeDef::new("m.ns#Banana", BaseType::String)).unwrap();
        let names: Vec<&str> = s.sorted_types().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(names, vec!["z.ns#Apple", "m.ns#Banana", "a.ns#Cherry"]);
        // declaration order untouched
        assert_eq!(s.types()[0].id, "z.ns#Apple");
        assert_eq!(s.types()[1].id, "a.ns#Cherry");
    }

    #[test]
    fn test_equality_ignores_declaration_order() {
        let mut a = Schema::new();
        a.add_type_def(TypeDef::new("ns#A", BaseType::String)).unwrap();
        a.add_type_def(TypeDef::new("ns#B", BaseType::Int32)).unwrap();
        let mut b = Schema::new();
        b.add_type_def(TypeDef::new("ns#B", BaseType::Int32)).unwrap();
        b.add_type_def(TypeDef::new("ns#A", BaseType::String)).unwrap();
        assert_eq!(a, b);
        b.add_type_def(TypeDef::new("ns#C", BaseType::Bool)).unwrap();
        assert_ne!(a, b);
    }
}
