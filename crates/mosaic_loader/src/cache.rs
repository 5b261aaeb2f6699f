//! Fetched-file cache
//!
//! Presence in the cache suppresses a re-fetch. An entry matches either by
//! exact fullpath or through a caller-supplied verifier predicate (used for
//! resources whose availability can be probed directly, e.g. a global the
//! script defines once loaded). The cache only ever grows; its scope is a
//! single page session.

use std::fmt;
use std::sync::Arc;

/// Probe deciding whether a resource is already present without consulting
/// the fullpath list.
pub type Verifier = Arc<dyn Fn() -> bool + Send + Sync>;

/// A cachable file.
#[derive(Clone)]
pub struct CacheEntry {
    /// Full path of the resource.
    pub fullpath: String,
    /// Optional availability probe. A truthy probe short-circuits the
    /// fullpath scan entirely.
    pub verifier: Option<Verifier>,
}

impl CacheEntry {
    /// Entry matched by fullpath only.
    pub fn path(fullpath: impl Into<String>) -> Self {
        Self {
            fullpath: fullpath.into(),
            verifier: None,
        }
    }

    /// Entry with an availability probe.
    pub fn with_verifier(fullpath: impl Into<String>, verifier: Verifier) -> Self {
        Self {
            fullpath: fullpath.into(),
            verifier: Some(verifier),
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("fullpath", &self.fullpath)
            .field("verifier", &self.verifier.as_ref().map(|_| ".."))
            .finish()
    }
}

/// The page-wide fetched-file ledger.
#[derive(Debug, Default)]
pub struct DependencyCache {
    entries: Vec<CacheEntry>,
}

impl DependencyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a list of files as fetched. No dedup on insert.
    pub fn cache(&mut self, files: &[String]) {
        for file in files {
            self.entries.push(CacheEntry::path(file.clone()));
        }
    }

    /// Whether the entry is already covered: a truthy verifier wins, else
    /// any recorded entry with an equal fullpath.
    pub fn is_cached(&self, entry: &CacheEntry) -> bool {
        if let Some(verifier) = &entry.verifier {
            if verifier() {
                return true;
            }
        }
        self.entries.iter().any(|e| e.fullpath == entry.fullpath)
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_by_fullpath() {
        let mut cache = DependencyCache::new();
        assert!(!cache.is_cached(&CacheEntry::path("/static/news.css")));

        cache.cache(&["/static/news.css".to_string()]);
        assert!(cache.is_cached(&CacheEntry::path("/static/news.css")));
        assert!(!cache.is_cached(&CacheEntry::path("/static/other.css")));
    }

    #[test]
    fn test_no_dedup_on_insert() {
        let mut cache = DependencyCache::new();
        cache.cache(&["/a.js".to_string(), "/a.js".to_string()]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_verifier_short_circuits() {
        let cache = DependencyCache::new();
        let entry = CacheEntry::with_verifier("/never/recorded.js", Arc::new(|| true));
        assert!(cache.is_cached(&entry));
    }

    #[test]
    fn test_false_verifier_falls_back_to_scan() {
        let mut cache = DependencyCache::new();
        cache.cache(&["/recorded.js".to_string()]);
        let entry = CacheEntry::with_verifier("/recorded.js", Arc::new(|| false));
        assert!(cache.is_cached(&entry));
    }
}
