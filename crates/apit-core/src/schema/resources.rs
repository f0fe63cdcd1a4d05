use serde::{Deserialize, Serialize};

use crate::ordered::OrderedMap;

use super::operations::Lifecycle;

/// A logical entity with lifecycle operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Identifier name → type id.
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub identifiers: OrderedMap<String>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub properties: OrderedMap<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection_operations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ResourceDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Every operation the resource binds, paired with its lifecycle slot, in
    /// lifecycle order followed by instance and collection operations.
    pub fn bound_operations(&self) -> Vec<(&str, Lifecycle)> {
        let mut ops = Vec::new();
        let slots = [
            (&self.create, Lifecycle::Create),
            (&self.put, Lifecycle::Put),
            (&self.read, Lifecycle::Read),
            (&self.update, Lifecycle::Update),
            (&self.delete, Lifecycle::Delete),
            (&self.list, Lifecycle::List),
        ];
        for (slot, lifecycle) in slots {
            if let Some(id) = slot {
                ops.push((id.as_str(), lifecycle));
            }
        }
        ops.extend(self.operations.iter().map(|id| (id.as_str(), Lifecycle::Instance)));
        ops.extend(
            self.collection_operations
                .iter()
                .map(|id| (id.as_str(), Lifecycle::Collection)),
        );
        ops
    }
}
