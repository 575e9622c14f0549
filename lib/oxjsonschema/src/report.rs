//! Validation results and their rendering.

use crate::constraint::Constraint;
use crate::model::SchemaId;
use crate::pointer::Pointer;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// Keyword of the issue raised when validation nests deeper than allowed.
pub const DEPTH_KEYWORD: &str = "depth";

/// A single violation.
#[derive(Debug, Clone)]
pub struct Issue {
    pointer: Pointer,
    keyword: &'static str,
    constraint: Option<Arc<Constraint>>,
    message: String,
}

impl Issue {
    /// Creates an issue for a failing constraint, with the message of [`IssueRenderer`].
    pub fn new(pointer: Pointer, constraint: Arc<Constraint>) -> Self {
        Self {
            pointer,
            keyword: constraint.keyword(),
            message: IssueRenderer::render(&constraint),
            constraint: Some(constraint),
        }
    }

    /// Creates the issue raised when validation exceeds the maximum depth.
    pub fn depth_exceeded(pointer: Pointer, depth: usize) -> Self {
        Self {
            pointer,
            keyword: DEPTH_KEYWORD,
            constraint: None,
            message: IssueRenderer::render_depth_exceeded(depth),
        }
    }

    /// Replaces the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Location of the offending value.
    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    /// Keyword of the failing constraint.
    pub fn keyword(&self) -> &'static str {
        self.keyword
    }

    /// The failing constraint, `None` for depth issues.
    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.pointer, self.message)
    }
}

/// The ordered issues found while validating a value.
///
/// ```
/// use oxjsonschema::{SchemaFactory, Validator, Value};
/// use serde_json::json;
///
/// let schema = SchemaFactory::new().create(
///     &Value::from(json!({"type": "object", "properties": {"foo": {"type": "string"}}})),
///     None,
/// )?;
/// let result = Validator::new(schema).validate(&Value::from(json!({"foo": 123})));
/// assert_eq!(
///     result.render(),
///     [("/foo".to_owned(), "The value must be of type 'string'.".to_owned())]
/// );
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    issues: Vec<Issue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there is no issue.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.issues.iter()
    }

    pub(crate) fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Returns true if there are issues and all of them are depth limit violations.
    pub(crate) fn is_depth_limited(&self) -> bool {
        !self.issues.is_empty() && self.issues.iter().all(|issue| issue.keyword == DEPTH_KEYWORD)
    }

    pub(crate) fn append(&mut self, other: &mut Self) {
        self.issues.append(&mut other.issues);
    }

    /// The `(pointer, message)` pairs of the issues, in order.
    pub fn render(&self) -> Vec<(String, String)> {
        self.issues
            .iter()
            .map(|issue| (issue.pointer.to_string(), issue.message.clone()))
            .collect()
    }

    /// A JSON report of the result.
    ///
    /// ```
    /// use oxjsonschema::ValidationResult;
    ///
    /// assert_eq!(
    ///     ValidationResult::new().to_json(),
    ///     serde_json::json!({"valid": true, "issues": []})
    /// );
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "valid": self.is_valid(),
            "issues": self.issues.iter().map(|issue| json!({
                "pointer": issue.pointer.to_string(),
                "keyword": issue.keyword,
                "message": issue.message,
            })).collect::<Vec<_>>(),
        })
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

impl IntoIterator for ValidationResult {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

/// Produces the human-readable message of each constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueRenderer;

impl IssueRenderer {
    /// The message describing a violation of `constraint`.
    pub fn render(constraint: &Constraint) -> String {
        match constraint {
            Constraint::Type(kinds) => match kinds.as_slice() {
                [kind] => format!("The value must be of type '{kind}'."),
                kinds => format!("The value must be of one of the types {}.", quoted(kinds)),
            },
            Constraint::Minimum { value, exclusive } => {
                if *exclusive {
                    format!("The value must be greater than {value}.")
                } else {
                    format!("The value must be greater than or equal to {value}.")
                }
            }
            Constraint::Maximum { value, exclusive } => {
                if *exclusive {
                    format!("The value must be less than {value}.")
                } else {
                    format!("The value must be less than or equal to {value}.")
                }
            }
            Constraint::MultipleOf(quantity) => {
                format!("The value must be a multiple of {quantity}.")
            }
            Constraint::MinimumLength(n) => {
                format!("The string must be at least {n} characters long.")
            }
            Constraint::MaximumLength(n) => {
                format!("The string must be at most {n} characters long.")
            }
            Constraint::Pattern(regex) => {
                format!("The string must match the pattern '{}'.", regex.as_str())
            }
            Constraint::MinimumDateTime { value, exclusive } => {
                if *exclusive {
                    format!("The date-time must be after {value}.")
                } else {
                    format!("The date-time must be at or after {value}.")
                }
            }
            Constraint::MaximumDateTime { value, exclusive } => {
                if *exclusive {
                    format!("The date-time must be before {value}.")
                } else {
                    format!("The date-time must be at or before {value}.")
                }
            }
            Constraint::Format(format) => format!("The string must be a valid '{format}'."),
            Constraint::MinimumItems(n) => format!("The array must have at least {n} items."),
            Constraint::MaximumItems(n) => format!("The array must have at most {n} items."),
            Constraint::UniqueItems => "The array items must be unique.".into(),
            Constraint::Items { .. } => "The array items must conform to their schemas.".into(),
            Constraint::MinimumProperties(n) => {
                format!("The object must have at least {n} properties.")
            }
            Constraint::MaximumProperties(n) => {
                format!("The object must have at most {n} properties.")
            }
            Constraint::Properties { .. } => {
                "The object members must conform to their schemas.".into()
            }
            Constraint::Required(names) => match names.as_slice() {
                [name] => format!("The object must have the property '{name}'."),
                names => format!("The object must have the properties {}.", quoted(names)),
            },
            Constraint::Enum(values) => format!(
                "The value must be one of {}.",
                values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Constraint::AllOf(_) => "The value must conform to all of the schemas.".into(),
            Constraint::AnyOf(_) => "The value must conform to at least one of the schemas.".into(),
            Constraint::OneOf(_) => "The value must conform to exactly one of the schemas.".into(),
            Constraint::Not(SchemaId::EMPTY) => "No value is allowed here.".into(),
            Constraint::Not(_) => "The value must not conform to the schema.".into(),
        }
    }

    /// The message of the issue raised when validation nests deeper than `depth`.
    pub fn render_depth_exceeded(depth: usize) -> String {
        format!("The maximum validation depth ({depth}) has been exceeded.")
    }
}

fn quoted(items: &[impl fmt::Display]) -> String {
    items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
