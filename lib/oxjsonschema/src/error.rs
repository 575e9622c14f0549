//! Error types for value construction, addressing, reference resolution and schema compilation.

use crate::report::ValidationResult;
use std::error::Error;

/// Main error type wrapping every failure kind of the crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JsonSchemaError {
    /// Error while building a value graph.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Error while parsing or resolving a pointer.
    #[error(transparent)]
    Pointer(#[from] PointerError),

    /// Error while parsing or resolving a URI.
    #[error(transparent)]
    Uri(#[from] UriError),

    /// Error while following a reference.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Error while compiling a schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A value did not conform to its schema.
    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),
}

/// Error raised while transforming a native tree into a [`Value`](crate::Value).
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ValueError {
    /// The native tree contains a scalar kind that has no value counterpart.
    #[error("Unsupported value type '{kind}'")]
    UnsupportedValueType { kind: &'static str },
}

impl ValueError {
    /// Creates an unsupported value type error.
    pub fn unsupported_value_type(kind: &'static str) -> Self {
        Self::UnsupportedValueType { kind }
    }
}

/// Error type for pointer parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PointerError {
    /// The pointer string is malformed.
    #[error("Invalid pointer '{pointer}': {message}")]
    InvalidPointer { pointer: String, message: String },

    /// The parent of the root pointer was requested.
    #[error("The root pointer has no parent")]
    NoParent,

    /// The pointer does not designate any value.
    #[error("Pointer '{pointer}' does not designate a value: {message}")]
    UndefinedValue { pointer: String, message: String },
}

impl PointerError {
    /// Creates an invalid pointer error.
    pub fn invalid_pointer(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPointer {
            pointer: pointer.into(),
            message: message.into(),
        }
    }

    /// Creates an undefined value error.
    pub fn undefined_value(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UndefinedValue {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

/// Error type for URI parsing and resolution.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum UriError {
    /// The URI or URI reference is not well formed.
    #[error("Invalid URI '{uri}': {message}")]
    Parse { uri: String, message: String },

    /// The base URI is opaque and cannot anchor a relative reference.
    #[error("Cannot resolve '{reference}' against the non-hierarchical URI '{base}'")]
    NotHierarchical { reference: String, base: String },
}

impl UriError {
    /// Creates a parse error.
    pub fn parse(uri: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    /// Creates a non-hierarchical base error.
    pub fn not_hierarchical(reference: impl Into<String>, base: impl Into<String>) -> Self {
        Self::NotHierarchical {
            reference: reference.into(),
            base: base.into(),
        }
    }
}

/// Error raised when a `$ref` cannot be resolved to a concrete value.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ReferenceError {
    /// The reference target could not be loaded or located.
    #[error("Unable to resolve reference '{reference}' in context '{context}': {message}")]
    Resolution {
        reference: String,
        context: String,
        message: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

impl ReferenceError {
    /// Creates a resolution error with a message only.
    pub fn resolution(
        reference: impl Into<String>,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            reference: reference.into(),
            context: context.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a resolution error caused by another error.
    pub fn resolution_caused_by(
        reference: impl Into<String>,
        context: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        let source = source.into();
        Self::Resolution {
            reference: reference.into(),
            context: context.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Error type for schema compilation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// The schema document does not conform to the meta-schema.
    #[error("Invalid schema specification at '{uri}#{pointer}':\n{result}")]
    InvalidSchemaSpecification {
        uri: String,
        pointer: String,
        result: ValidationResult,
    },

    /// A `pattern` or `patternProperties` key is not a valid regular expression.
    #[error("Invalid regex pattern '{pattern}' at '{uri}#{pointer}': {message}")]
    InvalidPattern {
        uri: String,
        pointer: String,
        pattern: String,
        message: String,
    },

    /// The schema nests deeper than the configured limit.
    #[error("Maximum schema depth ({depth}) exceeded at '{uri}#{pointer}'")]
    DepthLimitExceeded {
        uri: String,
        pointer: String,
        depth: usize,
    },

    /// A `$ref` keyword could not be resolved.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// The document URI given to the factory is not an absolute URI.
    #[error(transparent)]
    Uri(#[from] UriError),
}

impl SchemaError {
    /// Creates an invalid schema specification error.
    pub fn invalid_schema_specification(
        uri: impl Into<String>,
        pointer: impl Into<String>,
        result: ValidationResult,
    ) -> Self {
        Self::InvalidSchemaSpecification {
            uri: uri.into(),
            pointer: pointer.into(),
            result,
        }
    }

    /// Creates an invalid pattern error.
    pub fn invalid_pattern(
        uri: impl Into<String>,
        pointer: impl Into<String>,
        pattern: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::InvalidPattern {
            uri: uri.into(),
            pointer: pointer.into(),
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Creates a depth limit error.
    pub fn depth_limit_exceeded(
        uri: impl Into<String>,
        pointer: impl Into<String>,
        depth: usize,
    ) -> Self {
        Self::DepthLimitExceeded {
            uri: uri.into(),
            pointer: pointer.into(),
            depth,
        }
    }
}

/// Hard failure raised when a value does not conform to a schema.
///
/// It carries the whole [`ValidationResult`] so that every issue can be rendered.
#[derive(Debug, Clone, thiserror::Error)]
#[error("The value does not conform to the schema:\n{result}")]
pub struct InvalidValue {
    result: ValidationResult,
}

impl InvalidValue {
    pub(crate) fn new(result: ValidationResult) -> Self {
        Self { result }
    }

    /// The validation result describing every issue.
    pub fn result(&self) -> &ValidationResult {
        &self.result
    }

    /// Consumes the error and returns the validation result.
    pub fn into_result(self) -> ValidationResult {
        self.result
    }
}
