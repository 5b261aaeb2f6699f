//! # Mosaic Region
//!
//! The composition core: a page partitioned into nested regions, each
//! loading its own dependencies, binding its container element and talking
//! to the rest of the tree through a structured message bus.
//!
//! ## Architecture
//!
//! ```text
//! definition registry ──resolve──► instance tree ──load──► load queue
//!         ▲                             │
//!   setDefinition                  ready/destroy
//!         │                             │
//!   definition fetch             messaging bus ◄── semantic classifier
//!   (script adapter)          (fire / bubble / broadcast)    ▲
//!                                                      raw host events
//! ```
//!
//! ## Key Invariants
//!
//! 1. **One instance per guid** - a second init with a live guid is
//!    rejected and the first instance is untouched
//! 2. **One fetch in flight** - the load queue serializes dependency sets
//! 3. **Bubbling stops at a flagged payload** - broadcast never stops
//! 4. **Propagation never raises** - a defective listener cannot take its
//!    siblings down
//!
//! Everything host-specific lives behind the adapter traits in
//! [`mosaic_core`]; the [`stub`] module ships in-memory implementations
//! for tests and headless embeddings.

pub mod bus;
pub mod config;
pub mod context;
pub mod instance;
pub mod plugin;
pub mod registry;
pub mod router;
pub mod semantic;
pub mod stub;

pub use bus::{broadcast, bubbling};
pub use config::{
    load_manifest, parse_manifest, ActionMap, ManifestError, ManifestResult, PageConfig,
    RegionConfig,
};
pub use context::{
    Adapters, AjaxSuccess, DestroyArgs, RegionContext, RegionHandle, RuntimeEvent,
};
pub use instance::{ChildEntry, GenericBehavior, RegionBehavior, RegionInstance, RegionState};
pub use plugin::{Plugin, PluginRegistry};
pub use registry::{
    DefinitionBody, DefinitionRegistry, PendingInstance, RegionDefinition, SubscribeAction,
};
pub use semantic::{classify, parse_hooks};
pub use stub::{StubAjax, StubDom, StubScriptLoader};
