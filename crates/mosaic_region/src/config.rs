//! Page and region configuration
//!
//! Data-only options parse from a TOML page manifest; listeners (actions)
//! attach programmatically, since closures have no manifest representation.
//!
//! # Manifest Format
//!
//! ```toml
//! [page]
//! guid = "page"
//! wrapper = "shell"
//! ondomready = true
//! require = ["anim"]
//! dependencies = ["/static/site.css"]
//! plugins = ["shortcuts"]
//!
//! [loader]
//! debug = false
//! ```

use mosaic_core::{Namespace, RegionGuid, RegionListener};
use mosaic_loader::CacheEntry;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors from manifest parsing.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// An ordered layer → listener map.
///
/// Install order is registration order, and duplicates are allowed: a layer
/// may carry several listeners, fired in the order they were added.
#[derive(Clone, Default)]
pub struct ActionMap {
    entries: Vec<(String, RegionListener)>,
}

impl ActionMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for a layer.
    pub fn insert(&mut self, layer: impl Into<String>, listener: RegionListener) {
        self.entries.push((layer.into(), listener));
    }

    /// Builder-style [`ActionMap::insert`].
    pub fn with(mut self, layer: impl Into<String>, listener: RegionListener) -> Self {
        self.insert(layer, listener);
        self
    }

    /// Iterate entries in install order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, RegionListener)> {
        self.entries.iter()
    }

    /// Whether no listener was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for ActionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(layer, _)| layer))
            .finish()
    }
}

/// Configuration of a single region instance.
#[derive(Clone, Default)]
pub struct RegionConfig {
    /// Definition namespace.
    pub ns: Namespace,
    /// URL of the definition source, fetched on demand. `None` declares an
    /// inline region whose definition resolves without any fetch.
    pub region: Option<String>,
    /// Id of an existing element to create the container inside, instead
    /// of binding an element carrying the guid directly.
    pub wrapper: Option<String>,
    /// Whether the region's content is fetched over AJAX before ready.
    pub ajax: bool,
    /// Override for the AJAX endpoint (default `/ajax/{ns}/ws`).
    pub ws: Option<String>,
    /// Registered but dormant until an explicit wake.
    pub lazyload: bool,
    /// Defer construction until the document is fully parsed.
    pub ondomready: bool,
    /// Framework modules this region needs beyond the baseline.
    pub require: Vec<String>,
    /// Script/style files this region needs; cached files are skipped.
    pub dependencies: Vec<CacheEntry>,
    /// Plugins applied, in order, once the region is ready.
    pub plugins: Vec<String>,
    /// Listeners installed once the region is ready.
    pub actions: ActionMap,
    /// Arguments appended to every AJAX call's query string.
    pub getargs: BTreeMap<String, String>,
    /// Arguments merged into every AJAX call's body.
    pub postargs: BTreeMap<String, String>,
    /// Declared children, in initialization order.
    pub children: Vec<(RegionGuid, RegionConfig)>,
    /// Owning region; defaults to the page root.
    pub parent: Option<RegionGuid>,
}

impl RegionConfig {
    /// Configuration for the given namespace, everything else default.
    pub fn new(ns: impl Into<Namespace>) -> Self {
        Self {
            ns: ns.into(),
            ..Self::default()
        }
    }

    /// Fill unset fields from a definition's defaults. Instance fields
    /// always win; collection fields are taken from the defaults only when
    /// the instance left them empty.
    pub(crate) fn merge_defaults(&mut self, defaults: &RegionConfig) {
        if self.region.is_none() {
            self.region = defaults.region.clone();
        }
        if self.wrapper.is_none() {
            self.wrapper = defaults.wrapper.clone();
        }
        if !self.ajax {
            self.ajax = defaults.ajax;
        }
        if self.ws.is_none() {
            self.ws = defaults.ws.clone();
        }
        if self.require.is_empty() {
            self.require = defaults.require.clone();
        }
        if self.dependencies.is_empty() {
            self.dependencies = defaults.dependencies.clone();
        }
        if self.plugins.is_empty() {
            self.plugins = defaults.plugins.clone();
        }
        if self.actions.is_empty() {
            self.actions = defaults.actions.clone();
        }
        if self.getargs.is_empty() {
            self.getargs = defaults.getargs.clone();
        }
        if self.postargs.is_empty() {
            self.postargs = defaults.postargs.clone();
        }
        if self.children.is_empty() {
            self.children = defaults.children.clone();
        }
    }
}

impl fmt::Debug for RegionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionConfig")
            .field("ns", &self.ns)
            .field("region", &self.region)
            .field("wrapper", &self.wrapper)
            .field("ajax", &self.ajax)
            .field("lazyload", &self.lazyload)
            .field("ondomready", &self.ondomready)
            .field("require", &self.require)
            .field("plugins", &self.plugins)
            .field("children", &self.children.len())
            .field("parent", &self.parent)
            .finish()
    }
}

/// Page-level configuration, read once at boot.
#[derive(Clone, Default)]
pub struct PageConfig {
    /// Root region id; defaults to [`mosaic_core::DEFAULT_ROOT_GUID`].
    pub guid: Option<RegionGuid>,
    /// Debug mode. Forwarded to the loader adapter's configuration; the
    /// core itself takes no behavior from it.
    pub debug: bool,
    /// Initial framework modules for the root region.
    pub require: Vec<String>,
    /// Initial file list for the root region.
    pub dependencies: Vec<CacheEntry>,
    /// Plugins auto-installed on the root region.
    pub plugins: Vec<String>,
    /// Root-level listener map.
    pub actions: ActionMap,
    /// Defer root construction until the document is parsed.
    pub ondomready: bool,
    /// Alternate container id for the root region.
    pub wrapper: Option<String>,
}

impl fmt::Debug for PageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageConfig")
            .field("guid", &self.guid)
            .field("debug", &self.debug)
            .field("require", &self.require)
            .field("plugins", &self.plugins)
            .field("ondomready", &self.ondomready)
            .field("wrapper", &self.wrapper)
            .finish()
    }
}

/// Raw TOML structure for the page section.
#[derive(Debug, Deserialize, Default)]
struct PageToml {
    guid: Option<String>,
    wrapper: Option<String>,
    #[serde(default)]
    ondomready: bool,
    #[serde(default)]
    require: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    plugins: Vec<String>,
}

/// Raw TOML structure for the loader section.
#[derive(Debug, Deserialize, Default)]
struct LoaderToml {
    #[serde(default)]
    debug: bool,
}

/// Root TOML structure.
#[derive(Debug, Deserialize)]
struct ManifestToml {
    #[serde(default)]
    page: PageToml,
    #[serde(default)]
    loader: LoaderToml,
}

/// Parse a page manifest from TOML text.
pub fn parse_manifest(text: &str) -> ManifestResult<PageConfig> {
    let raw: ManifestToml = toml::from_str(text)?;

    if let Some(guid) = &raw.page.guid {
        if guid.is_empty() {
            return Err(ManifestError::Validation(
                "page.guid must not be empty".to_string(),
            ));
        }
    }

    Ok(PageConfig {
        guid: raw.page.guid.map(RegionGuid::from),
        debug: raw.loader.debug,
        require: raw.page.require,
        dependencies: raw
            .page
            .dependencies
            .into_iter()
            .map(CacheEntry::path)
            .collect(),
        plugins: raw.page.plugins,
        actions: ActionMap::new(),
        ondomready: raw.page.ondomready,
        wrapper: raw.page.wrapper,
    })
}

/// Load and parse a page manifest from a file.
pub fn load_manifest(path: impl AsRef<Path>) -> ManifestResult<PageConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_manifest(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::Message;
    use std::sync::Arc;

    #[test]
    fn test_parse_full_manifest() {
        let config = parse_manifest(
            r#"
            [page]
            guid = "shell"
            wrapper = "viewport"
            ondomready = true
            require = ["anim"]
            dependencies = ["/static/site.css", "/static/site.js"]
            plugins = ["shortcuts"]

            [loader]
            debug = true
            "#,
        )
        .unwrap();

        assert_eq!(config.guid, Some(RegionGuid::from("shell")));
        assert_eq!(config.wrapper.as_deref(), Some("viewport"));
        assert!(config.ondomready);
        assert!(config.debug);
        assert_eq!(config.require, vec!["anim"]);
        assert_eq!(config.dependencies.len(), 2);
        assert_eq!(config.plugins, vec!["shortcuts"]);
    }

    #[test]
    fn test_empty_manifest_is_valid() {
        let config = parse_manifest("").unwrap();
        assert!(config.guid.is_none());
        assert!(!config.debug);
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn test_empty_guid_rejected() {
        let err = parse_manifest("[page]\nguid = \"\"\n").unwrap_err();
        assert!(matches!(err, ManifestError::Validation(_)));
    }

    #[test]
    fn test_merge_defaults_instance_wins() {
        let defaults = RegionConfig {
            ns: Namespace::from("news"),
            require: vec!["anim".to_string()],
            plugins: vec!["shortcuts".to_string()],
            ws: Some("/svc/news".to_string()),
            ..RegionConfig::default()
        };

        let mut config = RegionConfig {
            ns: Namespace::from("news"),
            require: vec!["drag".to_string()],
            ..RegionConfig::default()
        };
        config.merge_defaults(&defaults);

        // instance field kept, unset fields filled in
        assert_eq!(config.require, vec!["drag"]);
        assert_eq!(config.plugins, vec!["shortcuts"]);
        assert_eq!(config.ws.as_deref(), Some("/svc/news"));
    }

    #[test]
    fn test_action_map_preserves_order() {
        let listener: RegionListener = Arc::new(|_: &mut Message| {});
        let map = ActionMap::new()
            .with("region:ready", listener.clone())
            .with("click:click", listener.clone())
            .with("region:ready", listener);

        let layers: Vec<_> = map.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(layers, vec!["region:ready", "click:click", "region:ready"]);
    }
}
