use std::collections::HashSet;

use log::debug;

use super::model::Schema;

impl Schema {
    /// Ids the entity `id` depends on directly.
    pub fn dependencies(&self, id: &str) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        if let Some(t) = self.get_type_def(id) {
            deps.extend(t.references().into_iter().map(str::to_string));
        }
        if let Some(e) = self.get_exception_def(id) {
            deps.extend(e.fields.iter().map(|f| f.field_type.clone()));
        }
        if let Some(op) = self.get_operation_def(id) {
            if let Some(input) = &op.input {
                deps.push(input.id.clone());
                deps.extend(input.fields.iter().map(|f| f.field_type.clone()));
            }
            deps.extend(op.output.id.clone());
            deps.extend(op.output.fields.iter().map(|f| f.field_type.clone()));
            deps.extend(op.exceptions.iter().cloned());
        }
        if let Some(r) = self.get_resource_def(id) {
            deps.extend(r.bound_operations().into_iter().map(|(o, _)| o.to_string()));
            deps.extend(r.identifiers.values().cloned());
            deps.extend(r.properties.values().cloned());
            deps.extend(r.resources.iter().cloned());
        }
        deps
    }

    /// Drop every entity that is neither tagged with one of `tags` nor
    /// reachable from a tagged entity. An empty tag list keeps everything.
    pub fn filter(&mut self, tags: &[String]) {
        if tags.is_empty() {
            return;
        }
        let tagged = |entity_tags: &[String]| entity_tags.iter().any(|t| tags.contains(t));
        let mut pending: Vec<String> = self
            .types()
            .iter()
            .filter(|t| tagged(&t.tags))
            .map(|t| t.id.clone())
            .chain(
                self.operations()
                    .iter()
                    .filter(|o| tagged(&o.tags))
                    .map(|o| o.id.clone()),
            )
            .chain(
                self.resources()
                    .iter()
                    .filter(|r| tagged(&r.tags))
                    .map(|r| r.id.clone()),
            )
            .collect();

        let mut keep = HashSet::new();
        while let Some(id) = pending.pop() {
            if keep.insert(id.clone()) {
                pending.extend(self.dependencies(&id));
            }
        }
        let before = self.types().len() + self.operations().len();
        self.retain(&keep);
        debug!(
            "schema filter {:?} kept {} of {} types and operations",
            tags,
            self.types().len() + self.operations().len(),
            before
        );
    }
}
