use heck::{ToLowerCamelCase, ToPascalCase, ToSnakeCase};

use crate::schema::ids;

/// PascalCase shape name for an arbitrary Swagger name.
///
/// `pet-store` → `PetStore`, `3dModel` → `_3dModel`.
pub fn shape_name(name: &str) -> String {
    let pascal = words(name).to_pascal_case();
    if pascal.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{pascal}")
    } else if pascal.is_empty() {
        "Unnamed".to_string()
    } else {
        pascal
    }
}

/// A member name for a property or parameter. Names that are already valid
/// identifiers are kept; others are camel-cased.
pub fn member_name(name: &str) -> String {
    if ids::is_identifier(name) {
        return name.to_string();
    }
    let camel = words(name).to_lower_camel_case();
    if camel.is_empty() || camel.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{camel}")
    } else {
        camel
    }
}

/// A namespace derived from an API title: `Pet Store API` → `pet_store_api`.
pub fn namespace_name(title: &str) -> String {
    let snake = words(title).to_snake_case();
    if ids::is_namespace(&snake) {
        snake
    } else {
        "swagger".to_string()
    }
}

/// Derive a PascalCase operation name from HTTP method and route.
///
/// - `GET /users` → `ListUsers`
/// - `GET /users/{userId}` → `GetUser`
/// - `POST /users/{userId}/messages` → `CreateUsersMessages`
pub fn route_to_name(method: &str, route: &str) -> String {
    let mut parts = Vec::new();
    let mut ends_with_param = false;
    for seg in route.split('/').filter(|s| !s.is_empty()) {
        ends_with_param = seg.starts_with('{') && seg.ends_with('}');
        if !ends_with_param {
            parts.push(seg);
        }
    }
    let verb = match method.to_ascii_uppercase().as_str() {
        "GET" if ends_with_param => "Get".to_string(),
        "GET" => "List".to_string(),
        "POST" => "Create".to_string(),
        "PUT" => "Update".to_string(),
        "DELETE" => "Delete".to_string(),
        other => other.to_pascal_case(),
    };
    let mut name = verb;
    let last = parts.len().saturating_sub(1);
    for (i, part) in parts.iter().enumerate() {
        let word = if i == last && ends_with_param {
            singularize(part)
        } else {
            part.to_string()
        };
        name.push_str(&shape_name(&word));
    }
    name
}

fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies").filter(|s| !s.is_empty()) {
        format!("{stem}y")
    } else if word.ends_with("ses") || word.ends_with("xes") {
        word[..word.len() - 2].to_string()
    } else if word.ends_with('s') && !word.ends_with("ss") && word.len() > 1 {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Replace every run of non-alphanumeric characters with a single space so
/// heck sees word boundaries.
fn words(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_names() {
        assert_eq!(shape_name("pet-store"), "PetStore");
        assert_eq!(shape_name("listModels"), "ListModels");
        assert_eq!(shape_name("application/json"), "ApplicationJson");
        assert_eq!(shape_name("3dModel"), "_3dModel");
        assert_eq!(shape_name("--"), "Unnamed");
    }

    #[test]
    fn test_member_names() {
        assert_eq!(member_name("petId"), "petId");
        assert_eq!(member_name("X-Request-Id"), "xRequestId");
        assert_eq!(member_name("item-id"), "itemId");
    }

    #[test]
    fn test_namespace_from_title() {
        assert_eq!(namespace_name("Pet Store API"), "pet_store_api");
        assert_eq!(namespace_name("!!!"), "swagger");
    }

    #[test]
    fn test_route_names() {
        assert_eq!(route_to_name("get", "/users"), "ListUsers");
        assert_eq!(route_to_name("get", "/users/{userId}"), "GetUser");
        assert_eq!(route_to_name("put", "/categories/{id}"), "UpdateCategory");
        assert_eq!(route_to_name("post", "/users/{userId}/messages"), "CreateUsersMessages");
        assert_eq!(route_to_name("patch", "/boxes/{id}"), "PatchBox");
        assert_eq!(route_to_name("get", "/"), "List");
    }
}
