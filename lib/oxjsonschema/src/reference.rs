//! Resolution of `$ref` references, within a document and across documents.

use crate::error::ReferenceError;
use crate::limits::Limits;
use crate::loader::{DocumentCache, LoadDocumentCallback, RemoteDocument};
use crate::pointer::Pointer;
use crate::uri::{Uri, UriReference, UriResolver};
use crate::value::{RawValue, Value, ValueIdentity, ValueKind};
use rustc_hash::{FxHashMap, FxHashSet};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A document: a root value and the absolute URI it was retrieved from, if any.
///
/// References inside an anonymous document can only designate locations of the same
/// document (`#...`) or absolute URIs.
#[derive(Debug, Clone)]
pub struct Document {
    uri: Option<Uri>,
    root: Value,
}

impl Document {
    /// Builds an anonymous document.
    pub fn new(root: Value) -> Self {
        Self { uri: None, root }
    }

    /// Sets the URI of the document. Its fragment, if any, is dropped.
    #[must_use]
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri.without_fragment());
        self
    }

    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    fn name(&self) -> &str {
        self.uri.as_ref().map_or("<anonymous>", Uri::as_str)
    }

    fn is_same(&self, uri: &Uri) -> bool {
        self.uri
            .as_ref()
            .is_some_and(|own| own.as_str() == uri.without_fragment().as_str())
    }
}

/// The location and value designated by a reference.
#[derive(Debug, Clone)]
pub struct Target {
    document: Document,
    pointer: Pointer,
    value: Value,
}

impl Target {
    /// The document holding the value.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The location of the value inside its document.
    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The absolute URI of the target, if its document has one.
    pub fn uri(&self) -> Option<Uri> {
        self.document
            .uri()
            .map(|uri| uri.with_fragment(&self.pointer.to_uri_fragment()))
    }

    /// Identifies the target location: document URI (`None` for the anonymous document) and pointer.
    pub(crate) fn location(&self) -> (Option<String>, String) {
        (
            self.document.uri().map(|uri| uri.as_str().to_owned()),
            self.pointer.to_string(),
        )
    }
}

/// Follows references to the values they designate.
///
/// Documents other than the context one are fetched through the load document callback
/// and kept in a [`DocumentCache`].
///
/// ```
/// use oxjsonschema::{Document, ReferenceResolver, Value};
///
/// let root = Value::from(serde_json::json!({
///     "definitions": {"name": {"type": "string"}},
///     "properties": {"name": {"$ref": "#/definitions/name"}}
/// }));
/// let document = Document::new(root.clone());
/// let reference = root.get("properties").unwrap().get("name").unwrap();
/// let target = ReferenceResolver::new().resolve(&reference, &document)?;
/// assert_eq!(target.pointer().to_string(), "/definitions/name");
/// assert!(target.value().ptr_eq(&root.get("definitions").unwrap().get("name").unwrap()));
/// # Result::<_, oxjsonschema::ReferenceError>::Ok(())
/// ```
#[derive(Clone, Default)]
pub struct ReferenceResolver {
    cache: DocumentCache,
    load_document_callback: Option<Arc<LoadDocumentCallback>>,
    limits: Limits,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the callback used to load documents that are not in the cache.
    ///
    /// ```
    /// use oxjsonschema::{Document, RawValue, ReferenceResolver, RemoteDocument, Value};
    ///
    /// let resolver = ReferenceResolver::new().with_load_document_callback(|uri| {
    ///     assert_eq!(uri, "http://example.com/types.json");
    ///     Ok(RemoteDocument {
    ///         document: RawValue::object([("id", RawValue::from("integer"))]),
    ///         document_uri: uri.into(),
    ///     })
    /// });
    /// let document = Document::new(Value::null());
    /// let target = resolver.resolve_target("http://example.com/types.json#/id", &document)?;
    /// assert_eq!(target.value().as_str(), Some("integer"));
    /// # Result::<_, oxjsonschema::ReferenceError>::Ok(())
    /// ```
    #[must_use]
    pub fn with_load_document_callback(
        mut self,
        callback: impl Fn(&str) -> Result<RemoteDocument, Box<dyn Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.load_document_callback = Some(Arc::new(callback));
        self
    }

    /// Uses a (possibly shared) document cache.
    #[must_use]
    pub fn with_cache(mut self, cache: DocumentCache) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Registers a document so that references to its URI never trigger a load.
    #[must_use]
    pub fn with_document(self, document: Document) -> Self {
        self.cache.insert(document);
        self
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Resolves a single reference hop: the returned value may itself be a reference.
    pub fn resolve_target(
        &self,
        reference: &str,
        context: &Document,
    ) -> Result<Target, ReferenceError> {
        let fail = |e: Box<dyn Error + Send + Sync>| {
            ReferenceError::resolution_caused_by(reference, context.name(), e)
        };
        let parsed = UriReference::parse(reference).map_err(|e| fail(e.into()))?;
        let target_uri = match context.uri() {
            Some(base) => Some(UriResolver::resolve(&parsed, base).map_err(|e| fail(e.into()))?),
            None if parsed.is_fragment_only() => None,
            None if parsed.is_absolute() => {
                Some(Uri::parse(reference).map_err(|e| fail(e.into()))?)
            }
            None => {
                return Err(ReferenceError::resolution(
                    reference,
                    context.name(),
                    "relative reference in a document without URI",
                ));
            }
        };
        let (document, fragment) = match &target_uri {
            Some(uri) if !context.is_same(uri) => {
                (self.load(uri).map_err(|e| fail(e.into()))?, uri.fragment())
            }
            Some(uri) => (context.clone(), uri.fragment()),
            None => (context.clone(), parsed.fragment()),
        };
        let pointer = Pointer::from_fragment(fragment.unwrap_or_default())
            .map_err(|e| fail(e.into()))?;
        let value = pointer
            .resolve(document.root())
            .map_err(|e| fail(e.into()))?;
        trace!(reference, context = context.name(), pointer = %pointer, "reference hop resolved");
        Ok(Target {
            document,
            pointer,
            value,
        })
    }

    /// Follows `reference` (a [`ValueKind::Reference`] value) until a value that is not a
    /// reference is reached.
    ///
    /// Visiting the same location twice or following more hops than
    /// [`Limits::max_reference_chain`] fails.
    pub fn resolve(&self, reference: &Value, context: &Document) -> Result<Target, ReferenceError> {
        let Some(link) = reference.reference() else {
            return Err(ReferenceError::resolution(
                reference.to_string(),
                context.name(),
                "the value is not a reference",
            ));
        };
        let mut link = link.to_owned();
        let mut context = context.clone();
        let mut visited = FxHashSet::default();
        loop {
            let target = self.resolve_target(&link, &context)?;
            let Some(next) = target.value().reference() else {
                return Ok(target);
            };
            if !visited.insert(target.location()) {
                return Err(ReferenceError::resolution(
                    link,
                    context.name(),
                    "reference cycle detected",
                ));
            }
            if visited.len() >= self.limits.max_reference_chain {
                return Err(ReferenceError::resolution(
                    link,
                    context.name(),
                    format!(
                        "more than {} chained references",
                        self.limits.max_reference_chain
                    ),
                ));
            }
            link = next.to_owned();
            context = target.document;
        }
    }

    /// Builds a new value graph where every reference of `document` is replaced by the
    /// value it designates, including references found in loaded documents.
    ///
    /// Aliasing and cycles that do not go through references only are kept.
    ///
    /// ```
    /// use oxjsonschema::{Document, ReferenceResolver, Value};
    ///
    /// let document = Document::new(Value::from(serde_json::json!({
    ///     "shared": [1, 2],
    ///     "copy": {"$ref": "#/shared"}
    /// })));
    /// let resolved = ReferenceResolver::new().dereference(&document)?;
    /// let shared = resolved.get("shared").unwrap();
    /// assert!(resolved.get("copy").unwrap().ptr_eq(&shared));
    /// # Result::<_, oxjsonschema::ReferenceError>::Ok(())
    /// ```
    pub fn dereference(&self, document: &Document) -> Result<Value, ReferenceError> {
        debug!(document = document.name(), "dereferencing document");
        let mut pass = Dereference::new(self);
        let root = pass.run(document)?;
        Value::transform(&root).map_err(|e| {
            ReferenceError::resolution_caused_by(document.name(), document.name(), e)
        })
    }

    fn load(&self, uri: &Uri) -> Result<Document, ReferenceError> {
        let document = self.cache.get_or_load(uri, |uri| {
            let Some(callback) = &self.load_document_callback else {
                return Err(ReferenceError::resolution(
                    uri.as_str(),
                    uri.as_str(),
                    "no load document callback has been set",
                ));
            };
            debug!(uri = %uri, "loading document");
            let remote = callback(uri.as_str())
                .map_err(|e| ReferenceError::resolution_caused_by(uri.as_str(), uri.as_str(), e))?;
            let root = Value::transform(&remote.document)
                .map_err(|e| ReferenceError::resolution_caused_by(uri.as_str(), uri.as_str(), e))?;
            let document_uri = Uri::parse(remote.document_uri)
                .map_err(|e| ReferenceError::resolution_caused_by(uri.as_str(), uri.as_str(), e))?;
            Ok(Document::new(root).with_uri(document_uri))
        })?;
        if let Some(final_uri) = document.uri() {
            if final_uri.as_str() != uri.without_fragment().as_str()
                && self.cache.get(final_uri).is_none()
            {
                self.cache.insert(document.clone());
            }
        }
        Ok(document)
    }
}

impl fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("cache", &self.cache)
            .field(
                "load_document_callback",
                &self.load_document_callback.is_some(),
            )
            .field("limits", &self.limits)
            .finish()
    }
}

struct Dereference<'a> {
    resolver: &'a ReferenceResolver,
    memo: FxHashMap<ValueIdentity, RawValue>,
    pending: Vec<(Value, Document, RawValue)>,
}

impl<'a> Dereference<'a> {
    fn new(resolver: &'a ReferenceResolver) -> Self {
        Self {
            resolver,
            memo: FxHashMap::default(),
            pending: Vec::new(),
        }
    }

    /// Builds the native tree of `document` with every reference replaced by its target.
    fn run(&mut self, document: &Document) -> Result<RawValue, ReferenceError> {
        let root = self.raw(document.root(), document)?;
        while let Some((value, context, shell)) = self.pending.pop() {
            match value.kind() {
                ValueKind::Array => {
                    for element in value.elements() {
                        shell.push(self.raw(&element, &context)?);
                    }
                }
                ValueKind::Object => {
                    for (key, member) in value.members() {
                        shell.insert(key, self.raw(&member, &context)?);
                    }
                }
                _ => (),
            }
        }
        Ok(root)
    }

    /// Returns the native node of `value`, registering an empty shell for unseen composites.
    fn raw(&mut self, value: &Value, context: &Document) -> Result<RawValue, ReferenceError> {
        if let Some(raw) = self.memo.get(&value.identity()) {
            return Ok(raw.clone());
        }
        let raw = match value.kind() {
            ValueKind::Reference => {
                let target = self.resolver.resolve(value, context)?;
                // the target is not a reference, so this recursion is one level deep
                self.raw(target.value(), target.document())?
            }
            ValueKind::Array => {
                let shell = RawValue::array([]);
                self.pending
                    .push((value.clone(), context.clone(), shell.clone()));
                shell
            }
            ValueKind::Object => {
                let shell = RawValue::object::<String>([]);
                self.pending
                    .push((value.clone(), context.clone(), shell.clone()));
                shell
            }
            _ => return Ok(value.to_raw()),
        };
        self.memo.insert(value.identity(), raw.clone());
        Ok(raw)
    }
}

impl Drop for Dereference<'_> {
    /// Shells may contain themselves: emptying them breaks the `Rc` cycles.
    fn drop(&mut self) {
        for shell in self.memo.values() {
            shell.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn anonymous(value: serde_json::Value) -> Document {
        Document::new(Value::from(value))
    }

    fn with_uri(uri: &str, value: serde_json::Value) -> Document {
        Document::new(Value::from(value)).with_uri(Uri::parse(uri).unwrap())
    }

    #[test]
    fn test_fragment_reference() {
        let document = anonymous(json!({"a": {"b": [10, 20]}, "r": {"$ref": "#/a/b/1"}}));
        let target = ReferenceResolver::new()
            .resolve(&document.root().get("r").unwrap(), &document)
            .unwrap();
        assert_eq!(target.value().as_i64(), Some(20));
        assert_eq!(target.pointer().to_string(), "/a/b/1");
        assert!(target.uri().is_none());
    }

    #[test]
    fn test_same_document_by_uri() {
        let document = with_uri(
            "http://example.com/s.json",
            json!({"a": 1, "r": {"$ref": "s.json#/a"}}),
        );
        let target = ReferenceResolver::new()
            .resolve(&document.root().get("r").unwrap(), &document)
            .unwrap();
        assert_eq!(target.value().as_i64(), Some(1));
        assert_eq!(
            target.uri().unwrap().as_str(),
            "http://example.com/s.json#/a"
        );
    }

    #[test]
    fn test_chained_references_across_documents() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let resolver = ReferenceResolver::new().with_load_document_callback(move |uri| {
            counter.fetch_add(1, Ordering::Relaxed);
            let document = match uri {
                "http://example.com/b.json" => json!({"next": {"$ref": "c.json#/value"}}),
                "http://example.com/c.json" => json!({"value": "found"}),
                _ => return Err(format!("unknown document {uri}").into()),
            };
            Ok(RemoteDocument {
                document: RawValue::from(&document),
                document_uri: uri.into(),
            })
        });
        let document = with_uri(
            "http://example.com/a.json",
            json!({"r": {"$ref": "b.json#/next"}}),
        );
        let reference = document.root().get("r").unwrap();
        let target = resolver.resolve(&reference, &document).unwrap();
        assert_eq!(target.value().as_str(), Some("found"));
        assert_eq!(
            target.document().uri().unwrap().as_str(),
            "http://example.com/c.json"
        );
        resolver.resolve(&reference, &document).unwrap();
        assert_eq!(loads.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_preregistered_document() {
        let resolver = ReferenceResolver::new()
            .with_document(with_uri("urn:example:types", json!({"int": {"type": "integer"}})));
        let document = anonymous(json!({"$ref": "urn:example:types#/int"}));
        let target = resolver.resolve(document.root(), &document).unwrap();
        assert_eq!(target.value().get("type").unwrap().as_str(), Some("integer"));
    }

    #[test]
    fn test_failures() {
        let resolver = ReferenceResolver::new();
        let document = anonymous(json!({"a": 1}));
        for reference in ["#/missing", "#foo", "other.json", "http://example.com/x.json"] {
            assert!(
                matches!(
                    resolver.resolve_target(reference, &document),
                    Err(ReferenceError::Resolution { .. })
                ),
                "{reference} should not resolve"
            );
        }
    }

    #[test]
    fn test_reference_cycle() {
        let document = anonymous(json!({"a": {"$ref": "#/b"}, "b": {"$ref": "#/a"}}));
        let error = ReferenceResolver::new()
            .resolve(&document.root().get("a").unwrap(), &document)
            .unwrap_err();
        assert!(error.to_string().contains("cycle"), "{error}");
    }

    #[test]
    fn test_reference_chain_limit() {
        let document = anonymous(json!({
            "a": {"$ref": "#/b"},
            "b": {"$ref": "#/c"},
            "c": {"$ref": "#/d"},
            "d": 4
        }));
        let reference = document.root().get("a").unwrap();
        let target = ReferenceResolver::new().resolve(&reference, &document).unwrap();
        assert_eq!(target.value().as_i64(), Some(4));
        ReferenceResolver::new()
            .with_limits(Limits::default().with_max_reference_chain(1))
            .resolve(&reference, &document)
            .unwrap_err();
    }

    #[test]
    fn test_dereference_keeps_data_cycles() {
        let root = RawValue::object([("name", RawValue::from("root"))]);
        root.insert("self", root.clone());
        root.insert("alias", RawValue::object([("$ref", RawValue::from("#/self"))]));
        let document = Document::new(Value::transform(&root).unwrap());
        let resolved = ReferenceResolver::new().dereference(&document).unwrap();
        assert!(resolved.get("self").unwrap().ptr_eq(&resolved));
        assert!(resolved.get("alias").unwrap().ptr_eq(&resolved));
        assert!(!resolved.is_reference());
    }

    #[test]
    fn test_dereference_failure_releases_cyclic_shells() {
        let root = RawValue::object([("name", RawValue::from("root"))]);
        root.insert("self", root.clone());
        root.insert("bad", RawValue::object([("$ref", RawValue::from("#/missing"))]));
        let document = Document::new(Value::transform(&root).unwrap());
        root.clear();

        let resolver = ReferenceResolver::new();
        let mut pass = Dereference::new(&resolver);
        assert!(pass.run(&document).is_err());
        let shells = pass
            .memo
            .values()
            .filter_map(|shell| match shell {
                RawValue::Object(members) => Some(Rc::downgrade(members)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert!(!shells.is_empty());
        drop(pass);
        assert!(shells.iter().all(|shell| shell.upgrade().is_none()));
    }

    #[test]
    fn test_dereference_reference_cycle_fails() {
        let document = anonymous(json!({"list": [{"$ref": "#/list/1"}, {"$ref": "#/list/0"}]}));
        ReferenceResolver::new().dereference(&document).unwrap_err();
    }
}
