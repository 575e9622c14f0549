//! Resource limits for schema compilation, reference resolution and validation.
//!
//! Schemas and documents may come from untrusted sources. These limits bound the work done
//! on deeply nested schemas, long reference chains and oversized regular expressions.

/// Default maximum nesting depth of schema compilation and validation.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default maximum number of `$ref` hops followed to reach a concrete value.
pub const DEFAULT_MAX_REFERENCE_CHAIN: usize = 64;

/// Default maximum length of a `pattern` or `patternProperties` regular expression.
pub const DEFAULT_MAX_REGEX_LENGTH: usize = 1000;

/// Configurable resource limits.
///
/// ```
/// use oxjsonschema::Limits;
///
/// let limits = Limits::default()
///     .with_max_depth(64)
///     .with_max_reference_chain(8);
/// assert_eq!(limits.max_depth, 64);
///
/// let trusted = Limits::permissive();
/// assert!(trusted.max_depth > limits.max_depth);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth of schema compilation and of validation.
    ///
    /// Both recurse on the call stack, so large values need a thread with a large stack.
    pub max_depth: usize,

    /// Maximum number of `$ref` hops followed when resolving a single reference.
    pub max_reference_chain: usize,

    /// Maximum length of a regular expression source.
    pub max_regex_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_reference_chain: DEFAULT_MAX_REFERENCE_CHAIN,
            max_regex_length: DEFAULT_MAX_REGEX_LENGTH,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permissive limits for trusted schemas and documents.
    ///
    /// The depth stays within what fits on a default 2 MiB thread stack.
    pub fn permissive() -> Self {
        Self {
            max_depth: 512,
            max_reference_chain: 1024,
            max_regex_length: 100_000,
        }
    }

    /// Strict limits for public-facing services.
    pub fn strict() -> Self {
        Self {
            max_depth: 64,
            max_reference_chain: 16,
            max_regex_length: 256,
        }
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum reference chain length.
    #[must_use]
    pub fn with_max_reference_chain(mut self, length: usize) -> Self {
        self.max_reference_chain = length;
        self
    }

    /// Sets the maximum regular expression length.
    #[must_use]
    pub fn with_max_regex_length(mut self, length: usize) -> Self {
        self.max_regex_length = length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered() {
        let strict = Limits::strict();
        let default = Limits::default();
        let permissive = Limits::permissive();
        assert!(strict.max_depth < default.max_depth);
        assert!(default.max_depth < permissive.max_depth);
        assert!(strict.max_reference_chain < default.max_reference_chain);
        assert!(default.max_regex_length < permissive.max_regex_length);
    }

    #[test]
    fn test_builders() {
        let limits = Limits::new()
            .with_max_depth(3)
            .with_max_reference_chain(2)
            .with_max_regex_length(1);
        assert_eq!(
            limits,
            Limits {
                max_depth: 3,
                max_reference_chain: 2,
                max_regex_length: 1,
            }
        );
    }
}
