//! Validation of values against compiled schemas.

use crate::constraint::{Constraint, FormatKind, ItemsSchema};
use crate::error::InvalidValue;
use crate::limits::Limits;
use crate::model::{Schema, SchemaId};
use crate::pointer::Pointer;
use crate::report::{Issue, ValidationResult};
use crate::uri::{Uri, UriReference};
use crate::value::Value;
use oxsdatatypes::DateTime;
use regex::Regex;
use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;

/// Relative tolerance of the `multipleOf` check.
const MULTIPLE_OF_EPSILON: f64 = 1e-9;

/// Validates values against a schema.
///
/// Every constraint of a schema is checked, even after a failure, so that the result
/// lists every issue. Issues come in a deterministic order: constraint order of the
/// schema, then member order of the value.
///
/// ```
/// use oxjsonschema::{SchemaFactory, Validator, Value};
/// use serde_json::json;
///
/// let schema = SchemaFactory::new().create(
///     &Value::from(json!({"type": "array", "items": {"type": "integer", "minimum": 0}})),
///     None,
/// )?;
/// let validator = Validator::new(schema);
/// assert!(validator.validate(&Value::from(json!([1, 2, 3]))).is_valid());
/// let result = validator.validate(&Value::from(json!([1, -2, "3"])));
/// assert_eq!(result.len(), 2);
/// assert_eq!(result.issues()[0].pointer().to_string(), "/1");
/// assert_eq!(result.issues()[1].keyword(), "type");
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    schema: Schema,
    limits: Limits,
}

impl Validator {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            limits: Limits::default(),
        }
    }

    /// Sets the limits; only [`Limits::max_depth`] is used during validation.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates `value` and returns every issue found.
    pub fn validate(&self, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();
        self.validate_schema(self.schema.id(), value, &Pointer::root(), 0, &mut result);
        result
    }

    /// Validates `value`, turning a non-empty result into an error.
    pub fn validate_strict(&self, value: &Value) -> Result<(), InvalidValue> {
        let result = self.validate(value);
        if result.is_valid() {
            Ok(())
        } else {
            Err(InvalidValue::new(result))
        }
    }

    fn validate_schema(
        &self,
        id: SchemaId,
        value: &Value,
        pointer: &Pointer,
        depth: usize,
        result: &mut ValidationResult,
    ) {
        if depth > self.limits.max_depth {
            result.push(Issue::depth_exceeded(
                pointer.clone(),
                self.limits.max_depth,
            ));
            return;
        }
        let schema = self.schema.at(id);
        for constraint in schema.constraints() {
            let valid = self
                .apply(constraint, value, pointer, depth, result)
                .unwrap_or_else(|| holds(constraint, value));
            if !valid {
                result.push(Issue::new(pointer.clone(), Arc::clone(constraint)));
            }
        }
    }

    /// Validates the subschemas of an applicator constraint.
    ///
    /// Returns [`None`] if `constraint` is an assertion on `value` alone.
    fn apply(
        &self,
        constraint: &Arc<Constraint>,
        value: &Value,
        pointer: &Pointer,
        depth: usize,
        result: &mut ValidationResult,
    ) -> Option<bool> {
        let valid = match &**constraint {
            Constraint::Items { items, additional } => {
                for (index, element) in value.elements().enumerate() {
                    let schema = match items {
                        ItemsSchema::Single(schema) => Some(*schema),
                        ItemsSchema::Tuple(schemas) => schemas.get(index).copied().or(*additional),
                    };
                    if let Some(schema) = schema {
                        self.validate_schema(
                            schema,
                            &element,
                            &pointer.child_index(index),
                            depth + 1,
                            result,
                        );
                    }
                }
                true
            }
            Constraint::Properties {
                properties,
                pattern_properties,
                additional,
            } => {
                for (key, member) in value.members() {
                    let member_pointer = pointer.child(key);
                    let mut matched = false;
                    for (_, schema) in properties.iter().filter(|(name, _)| name == key) {
                        matched = true;
                        self.validate_schema(*schema, &member, &member_pointer, depth + 1, result);
                    }
                    for (_, schema) in pattern_properties
                        .iter()
                        .filter(|(regex, _)| regex.is_match(key))
                    {
                        matched = true;
                        self.validate_schema(*schema, &member, &member_pointer, depth + 1, result);
                    }
                    if let (false, Some(schema)) = (matched, additional) {
                        self.validate_schema(*schema, &member, &member_pointer, depth + 1, result);
                    }
                }
                true
            }
            Constraint::AllOf(schemas) => {
                for schema in schemas {
                    let mut branch = ValidationResult::new();
                    self.validate_schema(*schema, value, pointer, depth + 1, &mut branch);
                    if !branch.is_valid() && !branch.is_depth_limited() {
                        result.push(Issue::new(pointer.clone(), Arc::clone(constraint)));
                    }
                    result.append(&mut branch);
                }
                true
            }
            Constraint::AnyOf(schemas) => {
                let mut undecided = ValidationResult::new();
                for schema in schemas {
                    match self.branch(*schema, value, pointer, depth) {
                        Branch::Valid => return Some(true),
                        Branch::Invalid => (),
                        Branch::Undecided(mut issues) => undecided.append(&mut issues),
                    }
                }
                if undecided.is_valid() {
                    false
                } else {
                    result.append(&mut undecided);
                    true
                }
            }
            Constraint::OneOf(schemas) => {
                let mut matches = 0;
                let mut undecided = ValidationResult::new();
                for schema in schemas {
                    match self.branch(*schema, value, pointer, depth) {
                        Branch::Valid => {
                            matches += 1;
                            if matches > 1 {
                                return Some(false);
                            }
                        }
                        Branch::Invalid => (),
                        Branch::Undecided(mut issues) => undecided.append(&mut issues),
                    }
                }
                if undecided.is_valid() {
                    matches == 1
                } else {
                    result.append(&mut undecided);
                    true
                }
            }
            Constraint::Not(schema) => match self.branch(*schema, value, pointer, depth) {
                Branch::Valid => false,
                Branch::Invalid => true,
                Branch::Undecided(mut issues) => {
                    result.append(&mut issues);
                    true
                }
            },
            _ => return None,
        };
        Some(valid)
    }

    /// Validates `value` against the subschema `id` of a combinator, without reporting.
    fn branch(&self, id: SchemaId, value: &Value, pointer: &Pointer, depth: usize) -> Branch {
        let mut scratch = ValidationResult::new();
        self.validate_schema(id, value, pointer, depth + 1, &mut scratch);
        if scratch.is_valid() {
            Branch::Valid
        } else if scratch.is_depth_limited() {
            Branch::Undecided(scratch)
        } else {
            Branch::Invalid
        }
    }
}

/// Outcome of a combinator branch.
enum Branch {
    Valid,
    Invalid,
    /// The depth limit was hit before any other issue: the branch outcome is unknown.
    Undecided(ValidationResult),
}

/// Checks an assertion constraint, one that does not look into subschemas.
fn holds(constraint: &Constraint, value: &Value) -> bool {
    match constraint {
        Constraint::Type(kinds) => kinds.iter().any(|kind| kind.accepts(value)),
        Constraint::Minimum {
            value: minimum,
            exclusive,
        } => value.as_f64().is_none_or(|n| {
            if *exclusive {
                n > *minimum
            } else {
                n >= *minimum
            }
        }),
        Constraint::Maximum {
            value: maximum,
            exclusive,
        } => value.as_f64().is_none_or(|n| {
            if *exclusive {
                n < *maximum
            } else {
                n <= *maximum
            }
        }),
        Constraint::MultipleOf(quantity) => value
            .as_f64()
            .is_none_or(|n| is_multiple_of(n, *quantity)),
        Constraint::MinimumLength(length) => value
            .as_str()
            .is_none_or(|s| s.chars().count() >= *length),
        Constraint::MaximumLength(length) => value
            .as_str()
            .is_none_or(|s| s.chars().count() <= *length),
        Constraint::Pattern(regex) => value.as_str().is_none_or(|s| regex.is_match(s)),
        Constraint::MinimumDateTime {
            value: minimum,
            exclusive,
        } => compare_date_time(value).is_none_or(|date_time| {
            match date_time.partial_cmp(minimum) {
                Some(Ordering::Greater) => true,
                Some(Ordering::Equal) => !*exclusive,
                Some(Ordering::Less) | None => false,
            }
        }),
        Constraint::MaximumDateTime {
            value: maximum,
            exclusive,
        } => compare_date_time(value).is_none_or(|date_time| {
            match date_time.partial_cmp(maximum) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => !*exclusive,
                Some(Ordering::Greater) | None => false,
            }
        }),
        Constraint::Format(format) => value.as_str().is_none_or(|s| is_format(*format, s)),
        Constraint::MinimumItems(count) => !value.is_array() || value.len() >= *count,
        Constraint::MaximumItems(count) => !value.is_array() || value.len() <= *count,
        Constraint::UniqueItems => !value.is_array() || has_unique_elements(value),
        Constraint::MinimumProperties(count) => !value.is_object() || value.len() >= *count,
        Constraint::MaximumProperties(count) => !value.is_object() || value.len() <= *count,
        Constraint::Required(names) => {
            !value.is_object() || names.iter().all(|name| value.get(name).is_some())
        }
        Constraint::Enum(values) => values.iter().any(|allowed| allowed == value),
        Constraint::Items { .. }
        | Constraint::Properties { .. }
        | Constraint::AllOf(_)
        | Constraint::AnyOf(_)
        | Constraint::OneOf(_)
        | Constraint::Not(_) => true,
    }
}

fn is_multiple_of(value: f64, quantity: f64) -> bool {
    if quantity == 0.0 || !value.is_finite() {
        return false;
    }
    let quotient = value / quantity;
    (quotient - quotient.round()).abs() <= MULTIPLE_OF_EPSILON * quotient.abs().max(1.0)
}

fn has_unique_elements(value: &Value) -> bool {
    let elements = value.elements().collect::<Vec<_>>();
    elements
        .iter()
        .enumerate()
        .all(|(i, a)| elements[i + 1..].iter().all(|b| a != b))
}

/// Parses a date-time string; values that are not date-time strings are not bounded.
fn compare_date_time(value: &Value) -> Option<DateTime> {
    parse_date_time(value.as_str()?)
}

/// Parses an RFC 3339 date-time, which requires a time zone.
pub(crate) fn parse_date_time(value: &str) -> Option<DateTime> {
    DateTime::from_str(value)
        .ok()
        .filter(|date_time| date_time.timezone_offset().is_some())
}

fn is_format(format: FormatKind, value: &str) -> bool {
    match format {
        FormatKind::DateTime => parse_date_time(value).is_some(),
        FormatKind::Uri => Uri::parse(value).is_ok(),
        FormatKind::UriReference => UriReference::parse(value).is_ok(),
        FormatKind::Email => is_email(value),
        FormatKind::Hostname => is_hostname(value),
        FormatKind::Ipv4 => Ipv4Addr::from_str(value).is_ok(),
        FormatKind::Ipv6 => Ipv6Addr::from_str(value).is_ok(),
        FormatKind::Regex => Regex::new(value).is_ok(),
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c))
        && is_hostname(domain)
}

fn is_hostname(value: &str) -> bool {
    let value = value.strip_suffix('.').unwrap_or(value);
    !value.is_empty()
        && value.len() <= 253
        && value.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::SchemaFactory;
    use crate::value::RawValue;
    use serde_json::json;

    fn validate(schema: serde_json::Value, value: serde_json::Value) -> Vec<(String, String)> {
        let schema = SchemaFactory::new()
            .create(&Value::from(schema), None)
            .unwrap();
        Validator::new(schema).validate(&Value::from(value)).render()
    }

    fn keywords(schema: serde_json::Value, value: serde_json::Value) -> Vec<&'static str> {
        let schema = SchemaFactory::new()
            .create(&Value::from(schema), None)
            .unwrap();
        Validator::new(schema)
            .validate(&Value::from(value))
            .iter()
            .map(|issue| issue.keyword())
            .collect()
    }

    #[test]
    fn test_type() {
        assert!(validate(json!({"type": "integer"}), json!(1)).is_empty());
        assert!(validate(json!({"type": "integer"}), json!(1.0)).is_empty());
        assert_eq!(
            validate(json!({"type": ["string", "null"]}), json!(1)),
            [(
                String::new(),
                "The value must be of one of the types 'string', 'null'.".to_owned()
            )]
        );
    }

    #[test]
    fn test_numeric() {
        let schema = json!({"minimum": 1, "maximum": 10, "exclusiveMaximum": true, "multipleOf": 0.1});
        assert!(validate(schema.clone(), json!(1)).is_empty());
        assert!(validate(schema.clone(), json!(9.9)).is_empty());
        assert!(validate(schema.clone(), json!("not a number")).is_empty());
        assert_eq!(keywords(schema.clone(), json!(10)), ["maximum"]);
        assert_eq!(keywords(schema.clone(), json!(0.5)), ["minimum"]);
        assert_eq!(keywords(schema, json!(1.05)), ["multipleOf"]);
    }

    #[test]
    fn test_multiple_of_tolerance() {
        assert!(is_multiple_of(0.3, 0.1));
        assert!(is_multiple_of(1e10, 0.01));
        assert!(!is_multiple_of(7.0, 2.0));
        assert!(!is_multiple_of(1.0, 0.0));
    }

    #[test]
    fn test_string() {
        let schema = json!({"minLength": 2, "maxLength": 3, "pattern": "^a"});
        assert!(validate(schema.clone(), json!("ab")).is_empty());
        assert!(validate(schema.clone(), json!("aéé")).is_empty());
        assert_eq!(keywords(schema.clone(), json!("b")), ["minLength", "pattern"]);
        assert_eq!(keywords(schema, json!("abcd")), ["maxLength"]);
    }

    #[test]
    fn test_date_time_bounds() {
        let schema = json!({
            "format": "date-time",
            "formatMinimum": "2020-01-01T00:00:00Z",
            "formatMaximum": "2021-01-01T00:00:00Z",
            "formatExclusiveMaximum": true
        });
        assert!(validate(schema.clone(), json!("2020-06-01T12:00:00+02:00")).is_empty());
        assert!(validate(schema.clone(), json!("2020-01-01T00:00:00Z")).is_empty());
        assert_eq!(keywords(schema.clone(), json!("2021-01-01T00:00:00Z")), ["formatMaximum"]);
        assert_eq!(keywords(schema.clone(), json!("2019-12-31T23:59:59Z")), ["formatMinimum"]);
        assert_eq!(keywords(schema, json!("2020-06-01")), ["format"]);
    }

    #[test]
    fn test_formats() {
        assert!(is_format(FormatKind::Email, "john.doe@example.com"));
        assert!(!is_format(FormatKind::Email, "john..doe@example.com"));
        assert!(!is_format(FormatKind::Email, "example.com"));
        assert!(is_format(FormatKind::Hostname, "www.example.com"));
        assert!(!is_format(FormatKind::Hostname, "-example.com"));
        assert!(is_format(FormatKind::Ipv4, "192.168.0.1"));
        assert!(!is_format(FormatKind::Ipv4, "256.0.0.1"));
        assert!(is_format(FormatKind::Ipv6, "::1"));
        assert!(is_format(FormatKind::Uri, "http://example.com/a?b#c"));
        assert!(!is_format(FormatKind::Uri, "a/b"));
        assert!(is_format(FormatKind::UriReference, "a/b"));
        assert!(is_format(FormatKind::Regex, "^[a-z]+$"));
        assert!(!is_format(FormatKind::Regex, "[a-z"));
        assert!(is_format(FormatKind::DateTime, "2020-01-01T00:00:00.5Z"));
        assert!(!is_format(FormatKind::DateTime, "2020-01-01T00:00:00"));
    }

    #[test]
    fn test_arrays() {
        let schema = json!({
            "minItems": 1,
            "maxItems": 3,
            "uniqueItems": true,
            "items": [{"type": "string"}, {"type": "integer"}],
            "additionalItems": false
        });
        assert!(validate(schema.clone(), json!(["a", 1])).is_empty());
        assert_eq!(keywords(schema.clone(), json!([])), ["minItems"]);
        assert_eq!(keywords(schema.clone(), json!([1, 1])), ["uniqueItems", "type"]);
        assert_eq!(
            validate(schema, json!(["a", 1, null])),
            [("/2".to_owned(), "No value is allowed here.".to_owned())]
        );
    }

    #[test]
    fn test_unique_items_uses_numeric_equality() {
        assert_eq!(
            keywords(json!({"uniqueItems": true}), json!([1, 1.0])),
            ["uniqueItems"]
        );
        assert!(keywords(json!({"uniqueItems": true}), json!([{"a": 1}, {"a": 2}])).is_empty());
    }

    #[test]
    fn test_objects() {
        let schema = json!({
            "minProperties": 1,
            "maxProperties": 3,
            "properties": {"name": {"type": "string"}},
            "patternProperties": {"^x-": {"type": "integer"}},
            "additionalProperties": {"type": "boolean"},
            "required": ["name"]
        });
        assert!(validate(schema.clone(), json!({"name": "a", "x-size": 1, "flag": true})).is_empty());
        assert_eq!(
            validate(schema.clone(), json!({"x-size": "big", "flag": 1})),
            [
                ("/flag".to_owned(), "The value must be of type 'boolean'.".to_owned()),
                ("/x-size".to_owned(), "The value must be of type 'integer'.".to_owned()),
                (String::new(), "The object must have the property 'name'.".to_owned()),
            ]
        );
        assert_eq!(keywords(schema, json!({})), ["minProperties", "required"]);
    }

    #[test]
    fn test_enum() {
        let schema = json!({"enum": ["a", 1, {"b": [true]}]});
        assert!(validate(schema.clone(), json!(1.0)).is_empty());
        assert!(validate(schema.clone(), json!({"b": [true]})).is_empty());
        assert_eq!(keywords(schema, json!("b")), ["enum"]);
    }

    #[test]
    fn test_combinators() {
        let all_of = json!({"allOf": [{"type": "integer"}, {"minimum": 2}, {"maximum": 5}]});
        assert!(validate(all_of.clone(), json!(3)).is_empty());
        assert_eq!(keywords(all_of, json!(1.5)), ["allOf", "type", "allOf", "minimum"]);

        let any_of = json!({"anyOf": [{"type": "string"}, {"minimum": 2}]});
        assert!(validate(any_of.clone(), json!("x")).is_empty());
        assert_eq!(keywords(any_of, json!(1)), ["anyOf"]);

        let one_of = json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]});
        assert!(validate(one_of.clone(), json!(1)).is_empty());
        assert!(validate(one_of.clone(), json!(2.5)).is_empty());
        assert_eq!(keywords(one_of.clone(), json!(3)), ["oneOf"]);
        assert_eq!(keywords(one_of, json!(1.5)), ["oneOf"]);

        let not = json!({"not": {"type": "null"}});
        assert!(validate(not.clone(), json!(0)).is_empty());
        assert_eq!(keywords(not, json!(null)), ["not"]);
    }

    #[test]
    fn test_siblings_are_all_checked() {
        assert_eq!(
            keywords(json!({"type": "string", "enum": ["a"], "minimum": 3}), json!(1)),
            ["type", "minimum", "enum"]
        );
    }

    #[test]
    fn test_depth_limit() {
        let schema = SchemaFactory::new()
            .create(
                &Value::from(json!({"properties": {"next": {"$ref": "#"}}})),
                None,
            )
            .unwrap();
        let mut value = json!(null);
        for _ in 0..10 {
            value = json!({"next": value});
        }
        let validator = Validator::new(schema).with_limits(Limits::default().with_max_depth(4));
        let result = validator.validate(&Value::from(value));
        assert_eq!(result.len(), 1);
        assert_eq!(result.issues()[0].keyword(), "depth");
        assert_eq!(result.issues()[0].pointer().to_string(), "/next/next/next/next/next");
    }

    #[test]
    fn test_depth_limit_inside_combinators() {
        let validate = |schema: serde_json::Value, value: &Value| {
            let schema = SchemaFactory::new()
                .create(&Value::from(schema), None)
                .unwrap();
            Validator::new(schema)
                .with_limits(Limits::default().with_max_depth(20))
                .validate(value)
        };
        let list = json!({
            "definitions": {
                "list": {"anyOf": [
                    {"type": "null"},
                    {
                        "type": "object",
                        "required": ["next"],
                        "properties": {"next": {"$ref": "#/definitions/list"}}
                    }
                ]}
            },
            "not": {"$ref": "#/definitions/list"}
        });
        let mut deep = json!(null);
        for _ in 0..50 {
            deep = json!({"next": deep});
        }
        let deep = Value::from(deep);

        let shallow = Value::from(json!({"next": {"next": {"next": null}}}));
        let result = validate(list.clone(), &shallow);
        assert_eq!(
            result.iter().map(Issue::keyword).collect::<Vec<_>>(),
            ["not"]
        );
        let result = validate(list, &deep);
        assert!(!result.is_valid());
        assert_eq!(
            result.iter().map(Issue::keyword).collect::<Vec<_>>(),
            ["depth"]
        );

        let chain = |combinator: serde_json::Value| {
            json!({
                "definitions": {"chain": {"properties": {"next": {"$ref": "#/definitions/chain"}}}},
                "allOf": [combinator]
            })
        };
        let result = validate(
            chain(json!({"anyOf": [{"$ref": "#/definitions/chain"}, {"type": "object"}]})),
            &deep,
        );
        assert!(result.is_valid());
        let result = validate(
            chain(json!({"oneOf": [{"$ref": "#/definitions/chain"}, {"type": "string"}]})),
            &deep,
        );
        assert_eq!(
            result.iter().map(Issue::keyword).collect::<Vec<_>>(),
            ["depth"]
        );
        let result = validate(
            chain(json!({"oneOf": [
                {"type": "object"},
                {"required": ["next"]},
                {"$ref": "#/definitions/chain"}
            ]})),
            &deep,
        );
        assert_eq!(
            result.iter().map(Issue::keyword).collect::<Vec<_>>(),
            ["allOf", "oneOf"]
        );
    }

    #[test]
    fn test_permissive_depth_limit() {
        let schema = SchemaFactory::new()
            .create(
                &Value::from(json!({"properties": {"next": {"$ref": "#"}}})),
                None,
            )
            .unwrap();
        let mut raw = RawValue::Null;
        for _ in 0..1000 {
            raw = RawValue::object([("next", raw)]);
        }
        let value = Value::transform(&raw).unwrap();
        let result = Validator::new(schema)
            .with_limits(Limits::permissive())
            .validate(&value);
        assert_eq!(result.len(), 1);
        assert_eq!(result.issues()[0].keyword(), "depth");
        assert_eq!(
            result.issues()[0].pointer().atoms().len(),
            Limits::permissive().max_depth + 1
        );
    }

    #[test]
    fn test_validate_strict() {
        let schema = SchemaFactory::new()
            .create(&Value::from(json!({"type": "string"})), None)
            .unwrap();
        let validator = Validator::new(schema);
        validator.validate_strict(&Value::from("ok")).unwrap();
        let error = validator.validate_strict(&Value::from(1_i64)).unwrap_err();
        assert_eq!(error.result().len(), 1);
        assert_eq!(
            error.to_string(),
            "The value does not conform to the schema:\n#: The value must be of type 'string'.\n"
        );
    }
}
