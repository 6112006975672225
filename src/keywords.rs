//! String constants of the JSON Schema draft 2020-12 keywords this crate
//! recognizes, plus the keywords it rejects outright.

pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";
pub const ALL_OF: &str = "allOf";
pub const ANCHOR: &str = "$anchor";
pub const ANY_OF: &str = "anyOf";
pub const CONST: &str = "const";
pub const CONTAINS: &str = "contains";
pub const DEPENDENT_REQUIRED: &str = "dependentRequired";
pub const DEPENDENT_SCHEMAS: &str = "dependentSchemas";
pub const DYNAMIC_ANCHOR: &str = "$dynamicAnchor";
pub const DYNAMIC_REF: &str = "$dynamicRef";
pub const ELSE: &str = "else";
pub const ENUM: &str = "enum";
pub const EXCLUSIVE_MAXIMUM: &str = "exclusiveMaximum";
pub const EXCLUSIVE_MINIMUM: &str = "exclusiveMinimum";
pub const ID: &str = "$id";
pub const IF: &str = "if";
pub const ITEMS: &str = "items";
pub const MAXIMUM: &str = "maximum";
pub const MAX_CONTAINS: &str = "maxContains";
pub const MAX_ITEMS: &str = "maxItems";
pub const MAX_LENGTH: &str = "maxLength";
pub const MAX_PROPERTIES: &str = "maxProperties";
pub const MINIMUM: &str = "minimum";
pub const MIN_CONTAINS: &str = "minContains";
pub const MIN_ITEMS: &str = "minItems";
pub const MIN_LENGTH: &str = "minLength";
pub const MIN_PROPERTIES: &str = "minProperties";
pub const MULTIPLE_OF: &str = "multipleOf";
pub const NOT: &str = "not";
pub const ONE_OF: &str = "oneOf";
pub const PATTERN: &str = "pattern";
pub const PATTERN_PROPERTIES: &str = "patternProperties";
pub const PREFIX_ITEMS: &str = "prefixItems";
pub const PROPERTIES: &str = "properties";
pub const PROPERTY_NAMES: &str = "propertyNames";
pub const REF: &str = "$ref";
pub const REQUIRED: &str = "required";
pub const SCHEMA: &str = "$schema";
pub const THEN: &str = "then";
pub const TYPE: &str = "type";
pub const UNEVALUATED_ITEMS: &str = "unevaluatedItems";
pub const UNEVALUATED_PROPERTIES: &str = "unevaluatedProperties";
pub const UNIQUE_ITEMS: &str = "uniqueItems";

/// The sole dialect this validator accepts as a "$schema" value.
pub const DIALECT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";
