//! Loading and caching of remote documents.

use crate::error::ReferenceError;
use crate::reference::Document;
use crate::uri::Uri;
use crate::value::RawValue;
use rustc_hash::FxHashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// Callback used to fetch a remote document.
///
/// It is given the absolute URI of the document, without fragment.
pub type LoadDocumentCallback =
    dyn Fn(&str) -> Result<RemoteDocument, Box<dyn Error + Send + Sync>> + Send + Sync;

/// A document returned by a [`LoadDocumentCallback`].
pub struct RemoteDocument {
    /// The parsed document.
    pub document: RawValue,
    /// The final URI of the loaded document, used as base for its own references.
    /// It may differ from the requested URI (e.g. after HTTP redirects).
    pub document_uri: String,
}

type Slot = Arc<Mutex<Option<Document>>>;

/// A cache of loaded documents keyed by absolute URI without fragment.
///
/// Clones share the same storage. Each URI has its own slot lock so that at most one
/// load per URI is in flight: concurrent resolutions of the same document wait for the
/// first load and then read its result. Failed loads are not cached.
#[derive(Clone, Default)]
pub struct DocumentCache {
    slots: Arc<Mutex<FxHashMap<String, Slot>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, uri: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(uri.to_owned()).or_default())
    }

    /// Returns the cached document for `uri`, if any.
    pub fn get(&self, uri: &Uri) -> Option<Document> {
        let uri = uri.without_fragment();
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.get(uri.as_str())?)
        };
        let document = slot.lock().unwrap_or_else(PoisonError::into_inner);
        document.clone()
    }

    /// Registers a document under its own URI, replacing any previous entry.
    ///
    /// Anonymous documents are ignored.
    pub fn insert(&self, document: Document) {
        let Some(uri) = document.uri().cloned() else {
            return;
        };
        self.insert_as(&uri, document);
    }

    /// Registers a document under `uri`, whatever its own URI.
    pub(crate) fn insert_as(&self, uri: &Uri, document: Document) {
        let slot = self.slot(uri.without_fragment().as_str());
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(document);
    }

    /// Removes the entry of `uri` and returns its document, if any.
    pub fn remove(&self, uri: &Uri) -> Option<Document> {
        let uri = uri.without_fragment();
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri.as_str())?;
        let mut document = slot.lock().unwrap_or_else(PoisonError::into_inner);
        document.take()
    }

    /// Returns the cached document for `uri`, or calls `load` and caches its result.
    ///
    /// The slot of `uri` stays locked while `load` runs.
    pub fn get_or_load(
        &self,
        uri: &Uri,
        load: impl FnOnce(&Uri) -> Result<Document, ReferenceError>,
    ) -> Result<Document, ReferenceError> {
        let uri = uri.without_fragment();
        let slot = self.slot(uri.as_str());
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(document) = &*entry {
            trace!(uri = %uri, "document cache hit");
            return Ok(document.clone());
        }
        let document = load(&uri)?;
        *entry = Some(document.clone());
        Ok(document)
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn document(uri: &str) -> Document {
        Document::new(Value::from(uri)).with_uri(Uri::parse(uri).unwrap())
    }

    #[test]
    fn test_get_or_load_caches() {
        let cache = DocumentCache::new();
        let uri = Uri::parse("http://example.com/a.json#/foo").unwrap();
        let loads = AtomicUsize::new(0);
        for _ in 0..3 {
            let loaded = cache
                .get_or_load(&uri, |uri| {
                    loads.fetch_add(1, Ordering::Relaxed);
                    Ok(document(uri.as_str()))
                })
                .unwrap();
            assert_eq!(loaded.root().as_str(), Some("http://example.com/a.json"));
        }
        assert_eq!(loads.load(Ordering::Relaxed), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache = DocumentCache::new();
        let uri = Uri::parse("http://example.com/a.json").unwrap();
        cache
            .get_or_load(&uri, |uri| {
                Err(ReferenceError::resolution(uri.as_str(), "", "unreachable"))
            })
            .unwrap_err();
        assert!(cache.is_empty());
        assert!(cache.get(&uri).is_none());
        cache
            .get_or_load(&uri, |uri| Ok(document(uri.as_str())))
            .unwrap();
        assert!(cache.get(&uri).is_some());
    }

    #[test]
    fn test_single_load_per_uri() {
        let cache = DocumentCache::new();
        let loads = Arc::new(AtomicUsize::new(0));
        let uri = Uri::parse("http://example.com/shared.json").unwrap();
        let handles = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let loads = Arc::clone(&loads);
                let uri = uri.clone();
                thread::spawn(move || {
                    cache
                        .get_or_load(&uri, |uri| {
                            loads.fetch_add(1, Ordering::SeqCst);
                            thread::yield_now();
                            Ok(document(uri.as_str()))
                        })
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();
        let documents = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(
            documents
                .windows(2)
                .all(|pair| pair[0].root().ptr_eq(pair[1].root()))
        );
    }

    #[test]
    fn test_anonymous_documents_are_not_cached() {
        let cache = DocumentCache::new();
        cache.insert(Document::new(Value::null()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove() {
        let cache = DocumentCache::new();
        let uri = Uri::parse("http://example.com/a.json").unwrap();
        assert!(cache.remove(&uri).is_none());
        cache.insert(document(uri.as_str()));
        let removed = cache
            .remove(&Uri::parse("http://example.com/a.json#/foo").unwrap())
            .unwrap();
        assert_eq!(removed.root().as_str(), Some("http://example.com/a.json"));
        assert!(cache.is_empty());
        assert!(cache.get(&uri).is_none());
    }
}
