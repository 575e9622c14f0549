//! The meta-schema every schema document is checked against before compilation.
//!
//! It is assembled directly with a [`SchemaBuilder`]: compiling it from a document would
//! require validating that document against itself first.

use crate::constraint::{Constraint, FormatKind, ItemsSchema, TypeKind};
use crate::model::{Schema, SchemaBuilder, SchemaId};
use crate::value::Value;
use std::sync::LazyLock;

static META_SCHEMA: LazyLock<Schema> = LazyLock::new(build_meta_schema);

/// The meta-schema describing the supported schema vocabulary.
///
/// ```
/// use oxjsonschema::{Validator, Value, meta_schema};
/// use serde_json::json;
///
/// let validator = Validator::new(meta_schema());
/// assert!(validator.validate(&Value::from(json!({"type": "string"}))).is_valid());
/// assert!(!validator.validate(&Value::from(json!({"type": 123}))).is_valid());
/// ```
pub fn meta_schema() -> Schema {
    META_SCHEMA.clone()
}

fn typed(kind: TypeKind) -> Constraint {
    Constraint::Type(vec![kind])
}

fn items(schema: SchemaId) -> Constraint {
    Constraint::Items {
        items: ItemsSchema::Single(schema),
        additional: None,
    }
}

fn build_meta_schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    let schema = builder.allocate();

    let string = builder.add([typed(TypeKind::String)]);
    let boolean = builder.add([typed(TypeKind::Boolean)]);
    let number = builder.add([typed(TypeKind::Number)]);
    let array = builder.add([typed(TypeKind::Array)]);
    let positive_number = builder.add([
        typed(TypeKind::Number),
        Constraint::Minimum {
            value: 0.0,
            exclusive: true,
        },
    ]);
    let count = builder.add([
        typed(TypeKind::Integer),
        Constraint::Minimum {
            value: 0.0,
            exclusive: false,
        },
    ]);
    let date_time = builder.add([
        typed(TypeKind::String),
        Constraint::Format(FormatKind::DateTime),
    ]);
    let regex = builder.add([
        typed(TypeKind::String),
        Constraint::Format(FormatKind::Regex),
    ]);
    let uri_reference = builder.add([
        typed(TypeKind::String),
        Constraint::Format(FormatKind::UriReference),
    ]);
    let type_name = builder.add([
        typed(TypeKind::String),
        Constraint::Enum(
            [
                "null", "boolean", "integer", "number", "string", "array", "object",
            ]
            .into_iter()
            .map(Value::from)
            .collect(),
        ),
    ]);
    let type_names = builder.add([
        typed(TypeKind::Array),
        Constraint::MinimumItems(1),
        Constraint::UniqueItems,
        items(type_name),
    ]);
    let type_keyword = builder.add([Constraint::AnyOf(vec![type_name, type_names])]);
    let schema_array = builder.add([
        typed(TypeKind::Array),
        Constraint::MinimumItems(1),
        items(schema),
    ]);
    let items_keyword = builder.add([Constraint::AnyOf(vec![schema, schema_array])]);
    let boolean_or_schema = builder.add([Constraint::AnyOf(vec![boolean, schema])]);
    let schema_map = builder.add([
        typed(TypeKind::Object),
        Constraint::Properties {
            properties: Vec::new(),
            pattern_properties: Vec::new(),
            additional: Some(schema),
        },
    ]);
    let string_set = builder.add([
        typed(TypeKind::Array),
        Constraint::UniqueItems,
        items(string),
    ]);

    let properties = [
        ("$schema", uri_reference),
        ("$ref", uri_reference),
        ("id", uri_reference),
        ("title", string),
        ("description", string),
        ("default", SchemaId::EMPTY),
        ("type", type_keyword),
        ("minimum", number),
        ("maximum", number),
        ("exclusiveMinimum", boolean),
        ("exclusiveMaximum", boolean),
        ("multipleOf", positive_number),
        ("minLength", count),
        ("maxLength", count),
        ("pattern", regex),
        ("formatMinimum", date_time),
        ("formatMaximum", date_time),
        ("formatExclusiveMinimum", boolean),
        ("formatExclusiveMaximum", boolean),
        ("format", string),
        ("minItems", count),
        ("maxItems", count),
        ("uniqueItems", boolean),
        ("items", items_keyword),
        ("additionalItems", boolean_or_schema),
        ("minProperties", count),
        ("maxProperties", count),
        ("properties", schema_map),
        ("patternProperties", schema_map),
        ("additionalProperties", boolean_or_schema),
        ("definitions", schema_map),
        ("required", string_set),
        ("enum", array),
        ("allOf", schema_array),
        ("anyOf", schema_array),
        ("oneOf", schema_array),
        ("not", schema),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_owned(), id))
    .collect();

    builder.push_constraint(schema, typed(TypeKind::Object));
    builder.push_constraint(
        schema,
        Constraint::Properties {
            properties,
            pattern_properties: Vec::new(),
            additional: None,
        },
    );
    builder.set_title(schema, "Core schema meta-schema");
    builder.build(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;
    use serde_json::json;

    fn is_valid(schema: serde_json::Value) -> bool {
        Validator::new(meta_schema())
            .validate(&Value::from(schema))
            .is_valid()
    }

    #[test]
    fn test_valid_schemas() {
        assert!(is_valid(json!({})));
        assert!(is_valid(json!({
            "title": "Person",
            "type": ["object", "null"],
            "properties": {
                "name": {"type": "string", "minLength": 1, "pattern": "^[A-Z]"},
                "age": {"type": "integer", "minimum": 0, "exclusiveMinimum": false},
                "tags": {"type": "array", "items": {"type": "string"}, "uniqueItems": true},
                "born": {"type": "string", "format": "date-time", "formatMinimum": "1900-01-01T00:00:00Z"},
                "friend": {"$ref": "#"}
            },
            "additionalProperties": false,
            "required": ["name"],
            "definitions": {"positive": {"type": "number", "multipleOf": 0.5}},
            "anyOf": [{"required": ["age"]}, {"not": {"type": "null"}}]
        })));
    }

    #[test]
    fn test_invalid_schemas() {
        assert!(!is_valid(json!({"type": 123})));
        assert!(!is_valid(json!({"type": "integral"})));
        assert!(!is_valid(json!({"minLength": -1})));
        assert!(!is_valid(json!({"multipleOf": 0})));
        assert!(!is_valid(json!({"pattern": "("})));
        assert!(!is_valid(json!({"properties": {"a": 1}})));
        assert!(!is_valid(json!({"allOf": []})));
        assert!(!is_valid(json!({"additionalProperties": "no"})));
        assert!(!is_valid(json!({"formatMinimum": "yesterday"})));
        assert!(!is_valid(json!([])));
    }

    #[test]
    fn test_meta_schema_is_shared() {
        assert!(meta_schema().ptr_eq(&meta_schema()));
        assert_eq!(meta_schema().title(), Some("Core schema meta-schema"));
    }
}
