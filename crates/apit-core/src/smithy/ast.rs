use std::collections::HashSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ParseError};
use crate::node::NodeValue;
use crate::ordered::OrderedMap;
use crate::schema::ids;

use super::prelude::PRELUDE_NAMESPACE;
use super::traits;

/// A Smithy model in its JSON AST form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    pub smithy: String,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub metadata: OrderedMap<NodeValue>,
    #[serde(default)]
    pub shapes: OrderedMap<Shape>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeRef {
    pub target: String,
}

impl ShapeRef {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub target: String,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub traits: OrderedMap<NodeValue>,
}

impl Member {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            traits: OrderedMap::new(),
        }
    }

    pub fn has_trait(&self, id: &str) -> bool {
        self.traits.has(id)
    }
}

/// One shape of the AST. Only the fields relevant to `shape_type` are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(rename = "type")]
    pub shape_type: String,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub traits: OrderedMap<NodeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Member>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub members: OrderedMap<Member>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ShapeRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<ShapeRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ShapeRef>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub identifiers: OrderedMap<ShapeRef>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub properties: OrderedMap<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<ShapeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ShapeRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection_operations: Vec<ShapeRef>,
}

impl Shape {
    pub fn new(shape_type: impl Into<String>) -> Self {
        Self {
            shape_type: shape_type.into(),
            ..Default::default()
        }
    }

    pub fn has_trait(&self, id: &str) -> bool {
        self.traits.has(id)
    }

    /// The `smithy.api#tags` values on this shape.
    pub fn tags(&self) -> Vec<String> {
        self.traits
            .get(traits::TAGS)
            .and_then(NodeValue::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(NodeValue::as_string)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lifecycle bindings of a resource in declaration order.
    pub fn lifecycle_refs(&self) -> Vec<(&'static str, &ShapeRef)> {
        [
            ("create", &self.create),
            ("put", &self.put),
            ("read", &self.read),
            ("update", &self.update),
            ("delete", &self.delete),
            ("list", &self.list),
        ]
        .into_iter()
        .filter_map(|(name, r)| r.as_ref().map(|r| (name, r)))
        .collect()
    }

    /// Shape ids this shape points at structurally (targets, not traits).
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        for m in [&self.member, &self.key, &self.value].into_iter().flatten() {
            refs.push(&m.target);
        }
        refs.extend(self.members.values().map(|m| m.target.as_str()));
        refs.extend(self.mixins.iter().map(|r| r.target.as_str()));
        for r in [&self.input, &self.output].into_iter().flatten() {
            refs.push(&r.target);
        }
        refs.extend(self.errors.iter().map(|r| r.target.as_str()));
        refs.extend(self.operations.iter().map(|r| r.target.as_str()));
        refs.extend(self.resources.iter().map(|r| r.target.as_str()));
        refs.extend(self.identifiers.values().map(|r| r.target.as_str()));
        refs.extend(self.properties.values().map(|r| r.target.as_str()));
        refs.extend(self.lifecycle_refs().into_iter().map(|(_, r)| r.target.as_str()));
        refs.extend(self.collection_operations.iter().map(|r| r.target.as_str()));
        refs
    }

    /// Mutable view of every structural target, used when rebinding ids.
    pub fn targets_mut(&mut self) -> Vec<&mut String> {
        let mut out: Vec<&mut String> = Vec::new();
        for m in [&mut self.member, &mut self.key, &mut self.value]
            .into_iter()
            .flatten()
        {
            out.push(&mut m.target);
        }
        out.extend(self.members.values_mut().map(|m| &mut m.target));
        for r in [
            &mut self.input,
            &mut self.output,
            &mut self.create,
            &mut self.put,
            &mut self.read,
            &mut self.update,
            &mut self.delete,
            &mut self.list,
        ]
        .into_iter()
        .flatten()
        {
            out.push(&mut r.target);
        }
        out.extend(
            self.mixins
                .iter_mut()
                .chain(self.errors.iter_mut())
                .chain(self.operations.iter_mut())
                .chain(self.resources.iter_mut())
                .chain(self.collection_operations.iter_mut())
                .chain(self.identifiers.values_mut())
                .chain(self.properties.values_mut())
                .map(|r| &mut r.target),
        );
        out
    }

    /// Trait ids applied to the shape or any of its members.
    pub fn trait_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.traits.keys_iter().collect();
        for m in [&self.member, &self.key, &self.value].into_iter().flatten() {
            ids.extend(m.traits.keys_iter());
        }
        for m in self.members.values() {
            ids.extend(m.traits.keys_iter());
        }
        ids
    }
}

pub fn is_prelude_id(id: &str) -> bool {
    ids::namespace_of(id) == Some(PRELUDE_NAMESPACE)
}

fn major_version(version: &str) -> u32 {
    version
        .split('.')
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    pub fn new() -> Self {
        Self {
            smithy: "2.0".to_string(),
            metadata: OrderedMap::new(),
            shapes: OrderedMap::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Ast, ParseError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(doc: serde_json::Value) -> Result<Ast, ParseError> {
        Ok(serde_json::from_value(doc)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn major_version(&self) -> u32 {
        major_version(&self.smithy)
    }

    pub fn get_shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn put_shape(&mut self, id: impl Into<String>, shape: Shape) {
        self.shapes.put(id, shape);
    }

    pub fn shape_ids(&self) -> Vec<String> {
        self.shapes.keys()
    }

    /// The first service shape, if any.
    pub fn service(&self) -> Option<(&str, &Shape)> {
        self.shapes
            .iter()
            .find(|(_, s)| s.shape_type == "service")
            .map(|(id, s)| (id.as_str(), s))
    }

    /// Namespace of the service, else of the first user-defined shape.
    pub fn namespace(&self) -> Option<&str> {
        if let Some((id, _)) = self.service() {
            return ids::namespace_of(id);
        }
        self.shapes
            .keys_iter()
            .find(|id| !is_prelude_id(id))
            .and_then(ids::namespace_of)
    }

    /// Distinct namespaces of user-defined shapes, in first-seen order.
    pub fn namespaces(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for id in self.shapes.keys_iter() {
            if let Some(ns) = ids::namespace_of(id) {
                if ns != PRELUDE_NAMESPACE && !out.iter().any(|n| n == ns) {
                    out.push(ns.to_string());
                }
            }
        }
        out
    }

    /// Members of `id` with mixin members folded in ahead of the local ones.
    /// A local member that redeclares a mixin member keeps the mixin's
    /// position and traits, with its own traits winning.
    pub fn flattened_members(&self, id: &str) -> OrderedMap<Member> {
        let mut seen = HashSet::new();
        self.flatten_members(id, &mut seen)
    }

    fn flatten_members(&self, id: &str, seen: &mut HashSet<String>) -> OrderedMap<Member> {
        let mut out = OrderedMap::new();
        let Some(shape) = self.get_shape(id) else {
            return out;
        };
        if !seen.insert(id.to_string()) {
            return out;
        }
        for mixin in &shape.mixins {
            for (name, member) in self.flatten_members(&mixin.target, seen) {
                out.put(name, member);
            }
        }
        for (name, member) in &shape.members {
            match out.get_mut(name) {
                Some(inherited) => {
                    inherited.target = member.target.clone();
                    for (k, v) in &member.traits {
                        inherited.traits.put(k.clone(), v.clone());
                    }
                }
                None => {
                    out.put(name.clone(), member.clone());
                }
            }
        }
        out
    }

    /// Shape traits with traits of mixins folded in. `@mixin` itself is not
    /// inherited.
    pub fn flattened_traits(&self, id: &str) -> OrderedMap<NodeValue> {
        let mut seen = HashSet::new();
        self.flatten_traits(id, &mut seen)
    }

    fn flatten_traits(&self, id: &str, seen: &mut HashSet<String>) -> OrderedMap<NodeValue> {
        let mut out = OrderedMap::new();
        let Some(shape) = self.get_shape(id) else {
            return out;
        };
        if !seen.insert(id.to_string()) {
            return out;
        }
        for mixin in &shape.mixins {
            for (k, v) in self.flatten_traits(&mixin.target, seen) {
                if k != traits::MIXIN {
                    out.put(k, v);
                }
            }
        }
        for (k, v) in &shape.traits {
            out.put(k.clone(), v.clone());
        }
        out
    }

    /// Fold `other` into this AST. Duplicate shape ids and differing metadata
    /// values are conflicts; the higher IDL version wins.
    pub fn merge(&mut self, other: Ast) -> Result<(), ModelError> {
        let (mine, theirs) = (self.major_version(), other.major_version());
        if mine != theirs {
            warn!(
                "[WARNING]: merging models of different versions ({} and {}), using the higher",
                self.smithy, other.smithy
            );
            if theirs > mine {
                self.smithy = other.smithy.clone();
            }
        }
        for (key, value) in other.metadata {
            match self.metadata.get(&key) {
                Some(existing) if *existing != value => {
                    return Err(ModelError::MergeConflict(format!(
                        "metadata key {key} has conflicting values"
                    )));
                }
                Some(_) => {}
                None => {
                    self.metadata.put(key, value);
                }
            }
        }
        for (id, shape) in other.shapes {
            if self.shapes.has(&id) {
                return Err(ModelError::MergeConflict(format!(
                    "shape {id} is defined more than once"
                )));
            }
            self.shapes.put(id, shape);
        }
        Ok(())
    }

    /// Ids the shape `id` depends on: structural targets plus any applied
    /// trait whose definition lives in this AST.
    pub fn dependencies(&self, id: &str) -> Vec<String> {
        let Some(shape) = self.get_shape(id) else {
            return Vec::new();
        };
        shape
            .references()
            .into_iter()
            .chain(shape.trait_ids().into_iter().filter(|t| self.shapes.has(t)))
            .filter(|t| !is_prelude_id(t))
            .map(str::to_string)
            .collect()
    }

    /// Keep only shapes tagged with one of `tags` and everything they
    /// reference. A service survives with its bindings pruned to the kept set,
    /// and its common errors stay as long as any operation does.
    pub fn filter(&mut self, tags: &[String]) {
        if tags.is_empty() {
            return;
        }
        let mut pending: Vec<String> = self
            .shapes
            .iter()
            .filter(|(_, s)| s.shape_type != "service")
            .filter(|(_, s)| s.tags().iter().any(|t| tags.contains(t)))
            .map(|(id, _)| id.clone())
            .collect();
        let mut keep = HashSet::new();
        self.close_over(&mut pending, &mut keep);

        let service = self.service().map(|(id, s)| (id.to_string(), s.clone()));
        if let Some((service_id, mut service)) = service {
            let tagged = service.tags().iter().any(|t| tags.contains(t));
            if tagged {
                pending.push(service_id.clone());
                self.close_over(&mut pending, &mut keep);
            } else {
                let any_op = self
                    .shapes
                    .iter()
                    .any(|(id, s)| s.shape_type == "operation" && keep.contains(id));
                if any_op {
                    pending.extend(service.errors.iter().map(|r| r.target.clone()));
                    self.close_over(&mut pending, &mut keep);
                } else {
                    service.errors.clear();
                }
                service.operations.retain(|r| keep.contains(&r.target));
                service.resources.retain(|r| keep.contains(&r.target));
                self.shapes.put(service_id.clone(), service);
                keep.insert(service_id);
            }
        }

        let before = self.shapes.len();
        self.shapes = std::mem::take(&mut self.shapes)
            .into_iter()
            .filter(|(id, _)| keep.contains(id))
            .collect();
        debug!(
            "AST filter {:?} kept {} of {} shapes",
            tags,
            self.shapes.len(),
            before
        );
    }

    fn close_over(&self, pending: &mut Vec<String>, keep: &mut HashSet<String>) {
        while let Some(id) = pending.pop() {
            if keep.insert(id.clone()) {
                pending.extend(self.dependencies(&id));
            }
        }
    }

    /// Every structural reference must resolve to a prelude shape or a shape
    /// in this AST, and no shape may mix itself in.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (id, shape) in &self.shapes {
            for target in shape.references() {
                if !is_prelude_id(target) && !self.shapes.has(target) {
                    return Err(ModelError::Reference(format!(
                        "{target} (referenced from {id}) is not defined"
                    )));
                }
            }
            if self.mixes_in(id, id, &mut HashSet::new()) {
                return Err(ModelError::Reference(format!(
                    "{id} mixes itself in through a mixin cycle"
                )));
            }
        }
        Ok(())
    }

    fn mixes_in(&self, from: &str, target: &str, seen: &mut HashSet<String>) -> bool {
        let Some(shape) = self.get_shape(from) else {
            return false;
        };
        shape.mixins.iter().any(|m| {
            m.target == target
                || (seen.insert(m.target.clone()) && self.mixes_in(&m.target, target, seen))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(members: &[(&str, &str)]) -> Shape {
        let mut s = Shape::new("structure");
        for (name, target) in members {
            s.members.put(*name, Member::new(*target));
        }
        s
    }

    #[test]
    fn test_json_shape_and_order() {
        let json = r#"{
            "smithy": "2.0",
            "shapes": {
                "ns#Z": {"type": "structure", "members": {"b": {"target": "smithy.api#String"}, "a": {"target": "ns#Y"}}},
                "ns#Y": {"type": "list", "member": {"target": "smithy.api#Integer"}, "traits": {"smithy.api#length": {"min": 1}}}
            }
        }"#;
        let ast = Ast::from_json(json).unwrap();
        assert_eq!(ast.shape_ids(), vec!["ns#Z", "ns#Y"]);
        let z = ast.get_shape("ns#Z").unwrap();
        assert_eq!(z.members.keys(), vec!["b", "a"]);
        let back = Ast::from_json(&ast.to_json().unwrap()).unwrap();
        assert_eq!(back, ast);
        assert_eq!(back.shape_ids(), ast.shape_ids());
    }

    #[test]
    fn test_merge_conflicts_on_duplicate_shape() {
        let mut a = Ast::new();
        a.put_shape("ns#Foo", structure(&[("x", "smithy.api#String")]));
        let mut b = Ast::new();
        b.put_shape("ns#Foo", structure(&[("x", "smithy.api#String")]));
        assert!(matches!(a.merge(b), Err(ModelError::MergeConflict(_))));
    }

    #[test]
    fn test_merge_metadata_and_version() {
        let mut a = Ast::new();
        a.smithy = "1.0".into();
        a.metadata.put("k", NodeValue::from("v"));
        let mut b = Ast::new();
        b.metadata.put("k", NodeValue::from("v"));
        b.put_shape("ns#A", Shape::new("string"));
        a.merge(b).unwrap();
        assert_eq!(a.smithy, "2.0");
        assert!(a.shapes.has("ns#A"));

        let mut c = Ast::new();
        c.metadata.put("k", NodeValue::from("other"));
        assert!(matches!(a.merge(c), Err(ModelError::MergeConflict(_))));
    }

    #[test]
    fn test_filter_by_tag() {
        let mut ast = Ast::new();
        let mut a = structure(&[("b", "ns#B")]);
        a.traits.put(traits::TAGS, NodeValue::Array(vec!["public".into()]));
        ast.put_shape("ns#A", a);
        ast.put_shape("ns#B", structure(&[("s", "smithy.api#String")]));
        ast.put_shape("ns#C", Shape::new("string"));
        ast.filter(&["public".to_string()]);
        assert_eq!(ast.shape_ids(), vec!["ns#A", "ns#B"]);
    }

    #[test]
    fn test_validate_reports_missing_target() {
        let mut ast = Ast::new();
        ast.put_shape("ns#A", structure(&[("b", "ns#Missing")]));
        let err = ast.validate().unwrap_err();
        assert!(matches!(err, ModelError::Reference(_)));
        ast.put_shape("ns#Missing", Shape::new("string"));
        assert!(ast.validate().is_ok());
    }

    #[test]
    fn test_flattened_members_with_mixins() {
        let mut ast = Ast::new();
        let mut mixin = structure(&[("id", "smithy.api#String")]);
        mixin.traits.put(traits::MIXIN, NodeValue::object());
        mixin.traits.put("smithy.api#documentation", NodeValue::from("doc"));
        ast.put_shape("ns#M", mixin);
        let mut s = structure(&[("name", "smithy.api#String")]);
        s.mixins.push(ShapeRef::new("ns#M"));
        ast.put_shape("ns#S", s);
        assert_eq!(ast.flattened_members("ns#S").keys(), vec!["id", "name"]);
        let traits = ast.flattened_traits("ns#S");
        assert!(traits.has("smithy.api#documentation"));
        assert!(!traits.has(traits::MIXIN));
    }

    #[test]
    fn test_mixin_cycle() {
        let mut ast = Ast::new();
        for (id, mixin) in [("ns#A", "ns#B"), ("ns#B", "ns#A")] {
            let mut s = structure(&[]);
            s.traits.put(traits::MIXIN, NodeValue::object());
            s.mixins.push(ShapeRef::new(mixin));
            ast.put_shape(id, s);
        }
        let mut c = structure(&[("x", "smithy.api#String")]);
        c.mixins.push(ShapeRef::new("ns#A"));
        ast.put_shape("ns#C", c);

        assert!(matches!(ast.validate(), Err(ModelError::Reference(_))));
        assert_eq!(ast.flattened_members("ns#C").keys(), vec!["x"]);
        assert!(!ast.flattened_traits("ns#C").has(traits::MIXIN));
    }
}
