//! Schema constraint definitions.
//!
//! This module defines every constraint a compiled [`Schema`](crate::Schema) node may carry.

use crate::model::SchemaId;
use crate::value::{Value, ValueKind};
use oxsdatatypes::DateTime;
use regex::Regex;
use std::fmt;

/// A single validation rule.
///
/// Constraints holding nested schemas refer to them by [`SchemaId`] inside the same
/// schema graph, so that recursive schemas form finite cyclic graphs.
#[derive(Debug, Clone)]
pub enum Constraint {
    // === Type ===
    /// type - The value must be of one of the given kinds.
    Type(Vec<TypeKind>),

    // === Numeric ===
    /// minimum (with exclusiveMinimum) - Lower bound of a number.
    Minimum { value: f64, exclusive: bool },

    /// maximum (with exclusiveMaximum) - Upper bound of a number.
    Maximum { value: f64, exclusive: bool },

    /// multipleOf - The number must be an integral multiple of the quantity.
    MultipleOf(f64),

    // === String ===
    /// minLength - Minimum number of characters.
    MinimumLength(usize),

    /// maxLength - Maximum number of characters.
    MaximumLength(usize),

    /// pattern - The string must match the regular expression (unanchored).
    Pattern(Regex),

    /// formatMinimum (with formatExclusiveMinimum) - Lower bound of a date-time string.
    MinimumDateTime { value: DateTime, exclusive: bool },

    /// formatMaximum (with formatExclusiveMaximum) - Upper bound of a date-time string.
    MaximumDateTime { value: DateTime, exclusive: bool },

    /// format - The string must be in the given format.
    Format(FormatKind),

    // === Array ===
    /// minItems - Minimum number of elements.
    MinimumItems(usize),

    /// maxItems - Maximum number of elements.
    MaximumItems(usize),

    /// uniqueItems - No two elements may be equal.
    UniqueItems,

    /// items/additionalItems - Element schemas.
    Items {
        items: ItemsSchema,
        additional: Option<SchemaId>,
    },

    // === Object ===
    /// minProperties - Minimum number of members.
    MinimumProperties(usize),

    /// maxProperties - Maximum number of members.
    MaximumProperties(usize),

    /// properties/patternProperties/additionalProperties - Member schemas.
    Properties {
        properties: Vec<(String, SchemaId)>,
        pattern_properties: Vec<(Regex, SchemaId)>,
        additional: Option<SchemaId>,
    },

    /// required - Members that must be present.
    Required(Vec<String>),

    // === Value ===
    /// enum - The value must be equal to one of the given values.
    Enum(Vec<Value>),

    // === Combinators ===
    /// allOf - The value must conform to every schema.
    AllOf(Vec<SchemaId>),

    /// anyOf - The value must conform to at least one schema.
    AnyOf(Vec<SchemaId>),

    /// oneOf - The value must conform to exactly one schema.
    OneOf(Vec<SchemaId>),

    /// not - The value must not conform to the schema.
    Not(SchemaId),
}

impl Constraint {
    /// The schema keyword this constraint was compiled from.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Minimum { .. } => "minimum",
            Self::Maximum { .. } => "maximum",
            Self::MultipleOf(_) => "multipleOf",
            Self::MinimumLength(_) => "minLength",
            Self::MaximumLength(_) => "maxLength",
            Self::Pattern(_) => "pattern",
            Self::MinimumDateTime { .. } => "formatMinimum",
            Self::MaximumDateTime { .. } => "formatMaximum",
            Self::Format(_) => "format",
            Self::MinimumItems(_) => "minItems",
            Self::MaximumItems(_) => "maxItems",
            Self::UniqueItems => "uniqueItems",
            Self::Items { .. } => "items",
            Self::MinimumProperties(_) => "minProperties",
            Self::MaximumProperties(_) => "maxProperties",
            Self::Properties { .. } => "properties",
            Self::Required(_) => "required",
            Self::Enum(_) => "enum",
            Self::AllOf(_) => "allOf",
            Self::AnyOf(_) => "anyOf",
            Self::OneOf(_) => "oneOf",
            Self::Not(_) => "not",
        }
    }

    /// The nested schemas this constraint refers to, in declaration order.
    pub fn nested(&self) -> Vec<SchemaId> {
        match self {
            Self::Items { items, additional } => {
                let mut nested = match items {
                    ItemsSchema::Single(id) => vec![*id],
                    ItemsSchema::Tuple(ids) => ids.clone(),
                };
                nested.extend(additional);
                nested
            }
            Self::Properties {
                properties,
                pattern_properties,
                additional,
            } => properties
                .iter()
                .map(|(_, id)| *id)
                .chain(pattern_properties.iter().map(|(_, id)| *id))
                .chain(*additional)
                .collect(),
            Self::AllOf(ids) | Self::AnyOf(ids) | Self::OneOf(ids) => ids.clone(),
            Self::Not(id) => vec![*id],
            Self::Type(_)
            | Self::Minimum { .. }
            | Self::Maximum { .. }
            | Self::MultipleOf(_)
            | Self::MinimumLength(_)
            | Self::MaximumLength(_)
            | Self::Pattern(_)
            | Self::MinimumDateTime { .. }
            | Self::MaximumDateTime { .. }
            | Self::Format(_)
            | Self::MinimumItems(_)
            | Self::MaximumItems(_)
            | Self::UniqueItems
            | Self::MinimumProperties(_)
            | Self::MaximumProperties(_)
            | Self::Required(_)
            | Self::Enum(_) => Vec::new(),
        }
    }
}

/// Element schemas of an [`Constraint::Items`] constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemsSchema {
    /// Every element must conform to the schema.
    Single(SchemaId),
    /// Element `i` must conform to schema `i`; extra elements are checked against
    /// the additional items schema.
    Tuple(Vec<SchemaId>),
}

/// The kinds accepted by the `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Null,
    Boolean,
    /// Integers and numbers without fractional part.
    Integer,
    Number,
    String,
    Array,
    /// Objects and references.
    Object,
}

impl TypeKind {
    /// Parses a `type` keyword value.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "string" => Self::String,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Returns true if `value` is of this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value.kind()) {
            (Self::Null, ValueKind::Null)
            | (Self::Boolean, ValueKind::Boolean)
            | (Self::Integer | Self::Number, ValueKind::Integer)
            | (Self::Number, ValueKind::Number)
            | (Self::String, ValueKind::String)
            | (Self::Array, ValueKind::Array)
            | (Self::Object, ValueKind::Object | ValueKind::Reference) => true,
            (Self::Integer, ValueKind::Number) => value
                .as_f64()
                .is_some_and(|n| n.is_finite() && n.fract() == 0.0),
            _ => false,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The string formats checked by the `format` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// RFC 3339 date-time.
    DateTime,
    /// Absolute URI.
    Uri,
    /// URI reference.
    UriReference,
    Email,
    Hostname,
    Ipv4,
    Ipv6,
    /// Regular expression.
    Regex,
}

impl FormatKind {
    /// Parses a `format` keyword value. Unknown formats are not checked.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "date-time" => Self::DateTime,
            "uri" => Self::Uri,
            "uri-reference" => Self::UriReference,
            "email" => Self::Email,
            "hostname" => Self::Hostname,
            "ipv4" => Self::Ipv4,
            "ipv6" => Self::Ipv6,
            "regex" => Self::Regex,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::Uri => "uri",
            Self::UriReference => "uri-reference",
            Self::Email => "email",
            Self::Hostname => "hostname",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Regex => "regex",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
