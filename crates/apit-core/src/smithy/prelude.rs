use crate::schema::BaseType;

pub const PRELUDE_NAMESPACE: &str = "smithy.api";

const PRELUDE_SHAPES: &[&str] = &[
    "Blob",
    "Boolean",
    "String",
    "Byte",
    "Short",
    "Integer",
    "Long",
    "Float",
    "Double",
    "BigInteger",
    "BigDecimal",
    "Timestamp",
    "Document",
    "PrimitiveBoolean",
    "PrimitiveByte",
    "PrimitiveShort",
    "PrimitiveInteger",
    "PrimitiveLong",
    "PrimitiveFloat",
    "PrimitiveDouble",
    "Unit",
];

const PRELUDE_TRAITS: &[&str] = &[
    "addedDefault",
    "box",
    "clientOptional",
    "cors",
    "default",
    "deprecated",
    "documentation",
    "endpoint",
    "enum",
    "enumValue",
    "error",
    "eventHeader",
    "eventPayload",
    "examples",
    "externalDocumentation",
    "hostLabel",
    "http",
    "httpApiKeyAuth",
    "httpBasicAuth",
    "httpBearerAuth",
    "httpChecksumRequired",
    "httpDigestAuth",
    "httpError",
    "httpHeader",
    "httpLabel",
    "httpPayload",
    "httpPrefixHeaders",
    "httpQuery",
    "httpQueryParams",
    "httpResponseCode",
    "idempotencyToken",
    "idempotent",
    "input",
    "internal",
    "jsonName",
    "length",
    "mediaType",
    "mixin",
    "nestedProperties",
    "noReplace",
    "notProperty",
    "optionalAuth",
    "output",
    "paginated",
    "pattern",
    "private",
    "property",
    "protocolDefinition",
    "range",
    "readonly",
    "recommended",
    "references",
    "required",
    "requiresLength",
    "resourceIdentifier",
    "retryable",
    "sensitive",
    "since",
    "sparse",
    "streaming",
    "suppress",
    "tags",
    "timestampFormat",
    "title",
    "trait",
    "uniqueItems",
    "unitType",
    "unstable",
    "xmlAttribute",
    "xmlFlattened",
    "xmlName",
    "xmlNamespace",
];

pub fn is_prelude_shape(name: &str) -> bool {
    PRELUDE_SHAPES.contains(&name)
}

pub fn is_prelude_trait(name: &str) -> bool {
    PRELUDE_TRAITS.contains(&name)
}

pub fn shape_id(name: &str) -> String {
    format!("{PRELUDE_NAMESPACE}#{name}")
}

/// Absolute id of a prelude trait, e.g. `required` -> `smithy.api#required`.
pub fn trait_id(name: &str) -> String {
    format!("{PRELUDE_NAMESPACE}#{name}")
}

/// Map a prelude simple shape id to the base type it stands for. `Unit` has
/// no counterpart and yields `None`, as does any non-prelude id.
pub fn base_type_for(id: &str) -> Option<BaseType> {
    let name = id.strip_prefix("smithy.api#")?;
    let base = match name {
        "Boolean" | "PrimitiveBoolean" => BaseType::Bool,
        "Byte" | "PrimitiveByte" => BaseType::Int8,
        "Short" | "PrimitiveShort" => BaseType::Int16,
        "Integer" | "PrimitiveInteger" => BaseType::Int32,
        "Long" | "PrimitiveLong" => BaseType::Int64,
        "Float" | "PrimitiveFloat" => BaseType::Float32,
        "Double" | "PrimitiveDouble" => BaseType::Float64,
        "BigInteger" => BaseType::Integer,
        "BigDecimal" => BaseType::Decimal,
        "Blob" => BaseType::Blob,
        "String" => BaseType::String,
        "Timestamp" => BaseType::Timestamp,
        "Document" => BaseType::Any,
        _ => return None,
    };
    Some(base)
}

/// The prelude shape id a base type exports to.
pub fn shape_for(base: BaseType) -> Option<&'static str> {
    let id = match base {
        BaseType::Bool => "smithy.api#Boolean",
        BaseType::Int8 => "smithy.api#Byte",
        BaseType::Int16 => "smithy.api#Short",
        BaseType::Int32 => "smithy.api#Integer",
        BaseType::Int64 => "smithy.api#Long",
        BaseType::Float32 => "smithy.api#Float",
        BaseType::Float64 => "smithy.api#Double",
        BaseType::Integer => "smithy.api#BigInteger",
        BaseType::Decimal => "smithy.api#BigDecimal",
        BaseType::Blob => "smithy.api#Blob",
        BaseType::String => "smithy.api#String",
        BaseType::Timestamp => "smithy.api#Timestamp",
        BaseType::Any => "smithy.api#Document",
        _ => return None,
    };
    Some(id)
}

/// Smithy shape type keyword for a base type when declared as a named shape.
pub fn shape_type_for(base: BaseType) -> &'static str {
    match base {
        BaseType::Bool => "boolean",
        BaseType::Int8 => "byte",
        BaseType::Int16 => "short",
        BaseType::Int32 => "integer",
        BaseType::Int64 => "long",
        BaseType::Float32 => "float",
        BaseType::Float64 => "double",
        BaseType::Integer => "bigInteger",
        BaseType::Decimal => "bigDecimal",
        BaseType::Blob => "blob",
        BaseType::String => "string",
        BaseType::Timestamp => "timestamp",
        BaseType::Any => "document",
        BaseType::List => "list",
        BaseType::Map => "map",
        BaseType::Struct => "structure",
        BaseType::Union => "union",
        BaseType::Enum => "enum",
    }
}

/// Inverse of [`shape_type_for`] for simple and aggregate shape keywords.
pub fn base_type_for_shape_type(shape_type: &str) -> Option<BaseType> {
    let base = match shape_type {
        "boolean" => BaseType::Bool,
        "byte" => BaseType::Int8,
        "short" => BaseType::Int16,
        "integer" => BaseType::Int32,
        "long" => BaseType::Int64,
        "float" => BaseType::Float32,
        "double" => BaseType::Float64,
        "bigInteger" => BaseType::Integer,
        "bigDecimal" => BaseType::Decimal,
        "blob" => BaseType::Blob,
        "string" => BaseType::String,
        "timestamp" => BaseType::Timestamp,
        "document" => BaseType::Any,
        "list" | "set" => BaseType::List,
        "map" => BaseType::Map,
        "structure" => BaseType::Struct,
        "union" => BaseType::Union,
        "enum" | "intEnum" => BaseType::Enum,
        _ => return None,
    };
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_mapping() {
        assert_eq!(base_type_for("smithy.api#Long"), Some(BaseType::Int64));
        assert_eq!(base_type_for("smithy.api#PrimitiveBoolean"), Some(BaseType::Bool));
        assert_eq!(base_type_for("smithy.api#Document"), Some(BaseType::Any));
        assert_eq!(base_type_for("smithy.api#Unit"), None);
        assert_eq!(base_type_for("ns#Long"), None);
    }

    #[test]
    fn test_shape_for_inverts_mapping() {
        for base in BaseType::ALL {
            if let Some(id) = shape_for(base) {
                assert_eq!(base_type_for(id), Some(base));
            }
        }
    }

    #[test]
    fn test_trait_lookup() {
        assert!(is_prelude_trait("httpLabel"));
        assert!(!is_prelude_trait("myTrait"));
        assert_eq!(trait_id("required"), "smithy.api#required");
        assert!(is_prelude_shape("Unit"));
    }
}
