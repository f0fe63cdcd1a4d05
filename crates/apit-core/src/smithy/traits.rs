//! Absolute ids of the prelude traits with first-class meaning.

pub const DOCUMENTATION: &str = "smithy.api#documentation";
pub const REQUIRED: &str = "smithy.api#required";
pub const DEFAULT: &str = "smithy.api#default";
pub const TAGS: &str = "smithy.api#tags";
pub const DEPRECATED: &str = "smithy.api#deprecated";
pub const LENGTH: &str = "smithy.api#length";
pub const RANGE: &str = "smithy.api#range";
pub const PATTERN: &str = "smithy.api#pattern";
pub const ENUM: &str = "smithy.api#enum";
pub const ENUM_VALUE: &str = "smithy.api#enumValue";
pub const UNIQUE_ITEMS: &str = "smithy.api#uniqueItems";
pub const MIXIN: &str = "smithy.api#mixin";
pub const TRAIT: &str = "smithy.api#trait";
pub const INPUT: &str = "smithy.api#input";
pub const OUTPUT: &str = "smithy.api#output";
pub const ERROR: &str = "smithy.api#error";
pub const HTTP: &str = "smithy.api#http";
pub const HTTP_ERROR: &str = "smithy.api#httpError";
pub const HTTP_LABEL: &str = "smithy.api#httpLabel";
pub const HTTP_QUERY: &str = "smithy.api#httpQuery";
pub const HTTP_HEADER: &str = "smithy.api#httpHeader";
pub const HTTP_PAYLOAD: &str = "smithy.api#httpPayload";
pub const HTTP_RESPONSE_CODE: &str = "smithy.api#httpResponseCode";
pub const EXAMPLES: &str = "smithy.api#examples";
