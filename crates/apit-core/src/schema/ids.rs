//! Identifier algebra: simple identifiers, dotted namespaces, and absolute
//! `namespace#Name` ids.

/// Namespace of the built-in base types.
pub const BASE_NAMESPACE: &str = "base";

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_namespace(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

/// True for `ns#Name` where both halves are well formed.
pub fn is_absolute(id: &str) -> bool {
    match id.split_once('#') {
        Some((ns, name)) => is_namespace(ns) && is_identifier(name),
        None => false,
    }
}

/// `example.weather#City` → `example.weather`.
pub fn namespace_of(id: &str) -> Option<&str> {
    id.split_once('#').map(|(ns, _)| ns)
}

/// `example.weather#City` → `City`; a bare name is returned unchanged.
pub fn local_name(id: &str) -> &str {
    id.rsplit_once('#').map(|(_, name)| name).unwrap_or(id)
}

pub fn absolute(namespace: &str, name: &str) -> String {
    format!("{namespace}#{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("Foo_1"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_absolute_ids() {
        assert!(is_absolute("example.weather#City"));
        assert!(!is_absolute("City"));
        assert!(!is_absolute("example.#City"));
        assert_eq!(namespace_of("a.b#C"), Some("a.b"));
        assert_eq!(local_name("a.b#C"), "C");
        assert_eq!(local_name("C"), "C");
    }
}
