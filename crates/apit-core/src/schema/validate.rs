use std::collections::HashSet;

use crate::error::ModelError;

use super::model::Schema;
use super::operations::{
    ExceptionDef, InputBinding, OperationDef, OperationOutputField, OutputBinding,
};
use super::types::{BaseType, Constraints, TypeDef};

impl Schema {
    /// Cross-check references and HTTP bindings. Never mutates; returns the
    /// first problem found.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.check_unique_ids()?;
        for t in self.types() {
            self.check_type(t)?;
        }
        for e in self.exceptions() {
            self.check_exception(e)?;
        }
        for op in self.operations() {
            self.check_operation(op)?;
        }
        for r in self.resources() {
            for (op_id, _) in r.bound_operations() {
                if self.get_operation_def(op_id).is_none() {
                    return Err(ModelError::Reference(format!(
                        "resource {} binds undefined operation {op_id}",
                        r.id
                    )));
                }
            }
            for (name, target) in r.identifiers.iter().chain(r.properties.iter()) {
                self.check_ref(&r.id, name, target)?;
            }
            for child in &r.resources {
                if self.get_resource_def(child).is_none() {
                    return Err(ModelError::Reference(format!(
                        "resource {} contains undefined resource {child}",
                        r.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_unique_ids(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        let ids = self
            .types()
            .iter()
            .map(|t| &t.id)
            .chain(self.exceptions().iter().map(|e| &e.id))
            .chain(self.operations().iter().map(|o| &o.id))
            .chain(self.resources().iter().map(|r| &r.id));
        for id in ids {
            if !seen.insert(id) {
                return Err(ModelError::Duplicate(id.clone()));
            }
        }
        Ok(())
    }

    fn check_ref(&self, owner: &str, what: &str, target: &str) -> Result<(), ModelError> {
        if self.get_operation_def(target).is_some() {
            return Err(ModelError::Validation(format!(
                "{owner}: {what} refers to operation {target} as a type"
            )));
        }
        if !self.is_defined(target) {
            return Err(ModelError::Reference(format!(
                "{owner}: {what} refers to undefined type {target}"
            )));
        }
        Ok(())
    }

    fn check_type(&self, t: &TypeDef) -> Result<(), ModelError> {
        match t.base {
            BaseType::List => {
                let items = t.items.as_deref().ok_or_else(|| {
                    ModelError::Validation(format!("list {} has no item type", t.id))
                })?;
                if items == t.id {
                    return Err(ModelError::Validation(format!(
                        "list {} directly contains itself",
                        t.id
                    )));
                }
            }
            BaseType::Map => {
                if t.items.is_none() || t.keys.is_none() {
                    return Err(ModelError::Validation(format!(
                        "map {} needs both key and value types",
                        t.id
                    )));
                }
                if t.items.as_deref() == Some(&t.id) || t.keys.as_deref() == Some(&t.id) {
                    return Err(ModelError::Validation(format!(
                        "map {} directly contains itself",
                        t.id
                    )));
                }
            }
            _ => {}
        }
        check_constraints(&t.id, t.base, &t.constraints)?;
        if let Some(items) = &t.items {
            self.check_ref(&t.id, "items", items)?;
        }
        if let Some(keys) = &t.keys {
            self.check_ref(&t.id, "keys", keys)?;
        }
        let mut names = HashSet::new();
        for f in &t.fields {
            if !names.insert(&f.name) {
                return Err(ModelError::Duplicate(format!("{}${}", t.id, f.name)));
            }
            self.check_ref(&t.id, &format!("field {}", f.name), &f.field_type)?;
            if let Some(base) = self.base_type(&f.field_type) {
                check_constraints(&format!("{}${}", t.id, f.name), base, &f.constraints)?;
            }
        }
        Ok(())
    }

    fn check_output_fields(
        &self,
        owner: &str,
        fields: &[OperationOutputField],
    ) -> Result<(), ModelError> {
        let payloads = fields
            .iter()
            .filter(|f| f.binding == OutputBinding::Payload)
            .count();
        if payloads > 1 {
            return Err(ModelError::Binding(format!(
                "{owner} binds {payloads} fields to the payload"
            )));
        }
        for f in fields {
            self.check_ref(owner, &format!("field {}", f.name), &f.field_type)?;
        }
        Ok(())
    }

    fn check_exception(&self, e: &ExceptionDef) -> Result<(), ModelError> {
        check_status(&e.id, e.http_status)?;
        self.check_output_fields(&e.id, &e.fields)
    }

    fn check_operation(&self, op: &OperationDef) -> Result<(), ModelError> {
        check_status(&op.id, op.output.http_status)?;

        if let Some(input) = &op.input {
            let payloads = input
                .fields
                .iter()
                .filter(|f| f.binding == InputBinding::Payload)
                .count();
            if payloads > 1 {
                return Err(ModelError::Binding(format!(
                    "{} binds {payloads} input fields to the payload",
                    op.id
                )));
            }
            let vars = op.uri_variables();
            for f in &input.fields {
                self.check_ref(&op.id, &format!("input field {}", f.name), &f.field_type)?;
                if f.binding == InputBinding::Path && !vars.contains(&f.name.as_str()) {
                    return Err(ModelError::Binding(format!(
                        "{}: path field {} does not appear in {}",
                        op.id, f.name, op.http_uri
                    )));
                }
            }
            for var in vars {
                let bound = input
                    .fields
                    .iter()
                    .any(|f| f.name == var && f.binding == InputBinding::Path);
                if !bound {
                    return Err(ModelError::Binding(format!(
                        "{}: URI variable {{{var}}} has no path-bound input field",
                        op.id
                    )));
                }
            }
        } else if let Some(var) = op.uri_variables().first() {
            return Err(ModelError::Binding(format!(
                "{}: URI variable {{{var}}} but the operation has no input",
                op.id
            )));
        }

        if op.http_method.expects_payload() {
            let has_payload = op
                .input
                .as_ref()
                .is_some_and(|i| i.payload_field().is_some());
            if !has_payload {
                return Err(ModelError::Binding(format!(
                    "{} is a {} but no input field is bound to the payload",
                    op.id,
                    op.http_method.as_str()
                )));
            }
        }

        if matches!(op.output.http_status, 204 | 304) && op.output.payload_field().is_some() {
            return Err(ModelError::Binding(format!(
                "{}: a {} response cannot carry a payload",
                op.id, op.output.http_status
            )));
        }
        self.check_output_fields(&op.id, &op.output.fields)?;

        for e in &op.exceptions {
            if self.get_exception_def(e).is_none() {
                return Err(ModelError::Reference(format!(
                    "{} raises undefined exception {e}",
                    op.id
                )));
            }
        }

        if let Some(resource) = &op.resource {
            if self.get_resource_def(resource).is_none() {
                return Err(ModelError::Reference(format!(
                    "{} belongs to undefined resource {resource}",
                    op.id
                )));
            }
        }

        let mut titles = HashSet::new();
        for ex in &op.examples {
            if !titles.insert(&ex.title) {
                return Err(ModelError::Validation(format!(
                    "{}: duplicate example title {:?}",
                    op.id, ex.title
                )));
            }
            if let Some(err) = &ex.error {
                if self.get_exception_def(&err.shape_id).is_none() {
                    return Err(ModelError::Reference(format!(
                        "{}: example {:?} uses unknown exception {}",
                        op.id, ex.title, err.shape_id
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_status(owner: &str, status: u16) -> Result<(), ModelError> {
    if !(100..=599).contains(&status) {
        return Err(ModelError::Validation(format!(
            "{owner}: HTTP status {status} is out of range"
        )));
    }
    Ok(())
}

fn check_constraints(owner: &str, base: BaseType, c: &Constraints) -> Result<(), ModelError> {
    if (c.min_value.is_some() || c.max_value.is_some()) && !base.is_numeric() {
        return Err(ModelError::Validation(format!(
            "{owner}: range constraint on non-numeric {base}"
        )));
    }
    if (c.min_size.is_some() || c.max_size.is_some()) && !base.is_sized() {
        return Err(ModelError::Validation(format!(
            "{owner}: length constraint on {base}"
        )));
    }
    if let (Some(min), Some(max)) = (c.min_size, c.max_size) {
        if min > max {
            return Err(ModelError::Validation(format!(
                "{owner}: minSize {min} exceeds maxSize {max}"
            )));
        }
    }
    if c.pattern.is_some() && base != BaseType::String {
        return Err(ModelError::Validation(format!(
            "{owner}: pattern constraint on {base}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        FieldDef, HttpMethod, OperationInput, OperationInputField, OperationOutput,
    };

    fn input_field(name: &str, binding: InputBinding) -> OperationInputField {
        OperationInputField {
            name: name.into(),
            field_type: "base#String".into(),
            required: true,
            binding,
            comment: None,
            constraints: Constraints::default(),
            default: None,
            traits: Default::default(),
        }
    }

    fn op_with(method: HttpMethod, uri: &str, fields: Vec<OperationInputField>) -> OperationDef {
        let mut op = OperationDef::new("ns#Op", method, uri);
        op.input = Some(OperationInput {
            id: "ns#OpInput".into(),
            comment: None,
            fields,
        });
        op
    }

    #[test]
    fn test_unresolved_field_type() {
        let mut s = Schema::new();
        let mut t = TypeDef::new("ns#A", BaseType::Struct);
        t.fields.push(FieldDef::new("b", "ns#Missing"));
        s.add_type_def(t).unwrap();
        assert!(matches!(s.validate(), Err(ModelError::Reference(_))));
    }

    #[test]
    fn test_direct_list_recursion() {
        let mut s = Schema::new();
        let mut t = TypeDef::new("ns#L", BaseType::List);
        t.items = Some("ns#L".into());
        s.add_type_def(t).unwrap();
        assert!(matches!(s.validate(), Err(ModelError::Validation(_))));
    }

    #[test]
    fn test_indirect_recursion_allowed() {
        let mut s = Schema::new();
        let mut node = TypeDef::new("ns#Node", BaseType::Struct);
        node.fields.push(FieldDef::new("children", "ns#Nodes"));
        let mut nodes = TypeDef::new("ns#Nodes", BaseType::List);
        nodes.items = Some("ns#Node".into());
        s.add_type_def(node).unwrap();
        s.add_type_def(nodes).unwrap();
        s.validate().unwrap();
    }

    #[test]
    fn test_path_binding_must_match_uri() {
        let mut s = Schema::new();
        s.add_operation_def(op_with(
            HttpMethod::Get,
            "/items/{id}",
            vec![input_field("other", InputBinding::Path)],
        ))
        .unwrap();
        assert!(matches!(s.validate(), Err(ModelError::Binding(_))));
    }

    #[test]
    fn test_post_requires_payload() {
        let mut s = Schema::new();
        s.add_operation_def(op_with(
            HttpMethod::Post,
            "/items",
            vec![input_field("q", InputBinding::Query("q".into()))],
        ))
        .unwrap();
        assert!(matches!(s.validate(), Err(ModelError::Binding(_))));

        let mut ok = Schema::new();
        ok.add_operation_def(op_with(
            HttpMethod::Post,
            "/items",
            vec![input_field("body", InputBinding::Payload)],
        ))
        .unwrap();
        ok.validate().unwrap();
    }

    #[test]
    fn test_no_content_cannot_have_payload() {
        let mut s = Schema::new();
        let mut op = OperationDef::new("ns#Del", HttpMethod::Delete, "/x");
        op.output = OperationOutput::empty(204);
        op.output.fields.push(OperationOutputField {
            name: "body".into(),
            field_type: "base#String".into(),
            required: false,
            binding: OutputBinding::Payload,
            comment: None,
            constraints: Constraints::default(),
            traits: Default::default(),
        });
        s.add_operation_def(op).unwrap();
        assert!(matches!(s.validate(), Err(ModelError::Binding(_))));
    }

    #[test]
    fn test_constraint_kind_mismatch() {
        let mut s = Schema::new();
        let mut t = TypeDef::new("ns#Flag", BaseType::Bool);
        t.constraints.min_size = Some(1);
        s.add_type_def(t).unwrap();
        assert!(matches!(s.validate(), Err(ModelError::Validation(_))));
    }
}
