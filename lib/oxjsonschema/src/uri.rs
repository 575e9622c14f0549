//! Absolute URIs, URI references and [RFC 3986](https://www.rfc-editor.org/rfc/rfc3986#section-5.2) resolution.

use crate::error::UriError;
use oxiri::{Iri, IriRef};
use std::fmt;
use std::str::FromStr;

/// The family of an absolute [`Uri`], selected from its scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UriKind {
    /// `http` and `https` URIs.
    Http,
    /// `file` URIs.
    File,
    /// `data` URIs: opaque, they embed their content and cannot anchor relative references.
    Data,
    /// Any other scheme.
    Generic,
}

impl UriKind {
    fn from_scheme(scheme: &str) -> Self {
        if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") {
            Self::Http
        } else if scheme.eq_ignore_ascii_case("file") {
            Self::File
        } else if scheme.eq_ignore_ascii_case("data") {
            Self::Data
        } else {
            Self::Generic
        }
    }
}

/// An absolute URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    iri: Iri<String>,
    kind: UriKind,
}

impl Uri {
    /// Parses an absolute URI.
    pub fn parse(uri: impl Into<String>) -> Result<Self, UriError> {
        let uri = uri.into();
        match Iri::parse(uri.clone()) {
            Ok(iri) => Ok(Self::from_iri(iri)),
            Err(error) => Err(UriError::parse(uri, error)),
        }
    }

    fn from_iri(iri: Iri<String>) -> Self {
        let kind = UriKind::from_scheme(iri.scheme());
        Self { iri, kind }
    }

    pub fn kind(&self) -> UriKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        self.iri.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.iri.scheme()
    }

    pub fn authority(&self) -> Option<&str> {
        self.iri.authority()
    }

    pub fn path(&self) -> &str {
        self.iri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.iri.query()
    }

    /// The raw (still percent-encoded) fragment.
    pub fn fragment(&self) -> Option<&str> {
        self.iri.fragment()
    }

    /// This URI without its fragment, i.e. the URI of the whole document.
    #[must_use]
    pub fn without_fragment(&self) -> Self {
        match self.as_str().split_once('#') {
            Some((document, _)) => Self::from_iri(Iri::parse_unchecked(document.to_owned())),
            None => self.clone(),
        }
    }

    /// This URI with its fragment replaced.
    #[must_use]
    pub fn with_fragment(&self, fragment: &str) -> Self {
        let document = self.without_fragment();
        Self::from_iri(Iri::parse_unchecked(format!("{}#{fragment}", document.as_str())))
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(uri: &str) -> Result<Self, UriError> {
        Self::parse(uri)
    }
}

/// A URI reference: either an absolute URI or a relative reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UriReference {
    iri: IriRef<String>,
}

impl UriReference {
    /// Parses a URI reference.
    pub fn parse(reference: impl Into<String>) -> Result<Self, UriError> {
        let reference = reference.into();
        match IriRef::parse(reference.clone()) {
            Ok(iri) => Ok(Self { iri }),
            Err(error) => Err(UriError::parse(reference, error)),
        }
    }

    pub fn as_str(&self) -> &str {
        self.iri.as_str()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.iri.scheme()
    }

    pub fn is_absolute(&self) -> bool {
        self.iri.scheme().is_some()
    }

    /// The raw (still percent-encoded) fragment.
    pub fn fragment(&self) -> Option<&str> {
        self.iri.fragment()
    }

    /// Returns true if the reference only carries a fragment (`#...`), i.e. it designates
    /// a location inside the base document.
    pub fn is_fragment_only(&self) -> bool {
        self.as_str().starts_with('#')
    }
}

impl fmt::Display for UriReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves URI references against base URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriResolver;

impl UriResolver {
    /// Resolves `reference` against `base`.
    ///
    /// - a reference with a scheme is returned unchanged,
    /// - hierarchical bases use the strict RFC 3986 merge (dot segments are removed),
    /// - `data:` bases are opaque: only fragment-only references resolve against them.
    ///
    /// ```
    /// use oxjsonschema::{Uri, UriReference, UriResolver};
    ///
    /// let base = Uri::parse("http://example.com/a/b/c.json#/x")?;
    /// let resolved = UriResolver::resolve(&UriReference::parse("../d.json#/y")?, &base)?;
    /// assert_eq!(resolved.as_str(), "http://example.com/a/d.json#/y");
    /// # Result::<_, oxjsonschema::UriError>::Ok(())
    /// ```
    pub fn resolve(reference: &UriReference, base: &Uri) -> Result<Uri, UriError> {
        if reference.is_absolute() {
            return Uri::parse(reference.as_str());
        }
        match base.kind() {
            UriKind::Http | UriKind::File | UriKind::Generic => base
                .iri
                .resolve(reference.as_str())
                .map(Uri::from_iri)
                .map_err(|e| UriError::parse(reference.as_str(), e)),
            UriKind::Data => {
                if reference.is_fragment_only() {
                    Ok(base.with_fragment(reference.fragment().unwrap_or_default()))
                } else {
                    Err(UriError::not_hierarchical(reference.as_str(), base.as_str()))
                }
            }
        }
    }

    /// Parses and resolves a reference string, or parses it as an absolute URI if there is no base.
    pub fn resolve_str(reference: &str, base: Option<&Uri>) -> Result<Uri, UriError> {
        match base {
            Some(base) => Self::resolve(&UriReference::parse(reference)?, base),
            None => Uri::parse(reference),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(reference: &str, base: &str) -> String {
        UriResolver::resolve(
            &UriReference::parse(reference).unwrap(),
            &Uri::parse(base).unwrap(),
        )
        .unwrap()
        .to_string()
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Uri::parse("https://a.org/").unwrap().kind(), UriKind::Http);
        assert_eq!(Uri::parse("file:///tmp/s.json").unwrap().kind(), UriKind::File);
        assert_eq!(
            Uri::parse("data:application/json,%7B%7D").unwrap().kind(),
            UriKind::Data
        );
        assert_eq!(Uri::parse("urn:x:y").unwrap().kind(), UriKind::Generic);
    }

    #[test]
    fn test_rfc3986_normal_examples() {
        let base = "http://a/b/c/d;p?q";
        assert_eq!(resolve("g:h", base), "g:h");
        assert_eq!(resolve("g", base), "http://a/b/c/g");
        assert_eq!(resolve("./g", base), "http://a/b/c/g");
        assert_eq!(resolve("g/", base), "http://a/b/c/g/");
        assert_eq!(resolve("/g", base), "http://a/g");
        assert_eq!(resolve("//g", base), "http://g");
        assert_eq!(resolve("?y", base), "http://a/b/c/d;p?y");
        assert_eq!(resolve("#s", base), "http://a/b/c/d;p?q#s");
        assert_eq!(resolve("", base), "http://a/b/c/d;p?q");
        assert_eq!(resolve("..", base), "http://a/b/");
        assert_eq!(resolve("../..", base), "http://a/");
        assert_eq!(resolve("../../g", base), "http://a/g");
    }

    #[test]
    fn test_rfc3986_abnormal_examples() {
        let base = "http://a/b/c/d;p?q";
        assert_eq!(resolve("../../../g", base), "http://a/g");
        assert_eq!(resolve("/./g", base), "http://a/g");
        assert_eq!(resolve("/../g", base), "http://a/g");
        assert_eq!(resolve("g.", base), "http://a/b/c/g.");
        assert_eq!(resolve("./../g", base), "http://a/b/g");
        assert_eq!(resolve("g/../h", base), "http://a/b/c/h");
    }

    #[test]
    fn test_fragment_replacement() {
        assert_eq!(
            resolve("#/definitions/a", "file:///schemas/root.json#/properties"),
            "file:///schemas/root.json#/definitions/a"
        );
    }

    #[test]
    fn test_data_base() {
        assert_eq!(
            resolve("#/a", "data:application/json,%7B%7D"),
            "data:application/json,%7B%7D#/a"
        );
        assert!(matches!(
            UriResolver::resolve(
                &UriReference::parse("other.json").unwrap(),
                &Uri::parse("data:application/json,%7B%7D").unwrap()
            ),
            Err(UriError::NotHierarchical { .. })
        ));
    }

    #[test]
    fn test_without_fragment() {
        let uri = Uri::parse("http://example.com/s.json#/a/b").unwrap();
        assert_eq!(uri.without_fragment().as_str(), "http://example.com/s.json");
        assert_eq!(uri.fragment(), Some("/a/b"));
        assert!(Uri::parse("relative/path").is_err());
    }
}
