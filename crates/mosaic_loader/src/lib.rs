//! # Mosaic Loader
//!
//! Resource loading for the composition layer:
//! - [`cache::DependencyCache`] remembers which files the page has already
//!   fetched, so sibling regions sharing a stylesheet fetch it once.
//! - [`queue::LoadQueue`] serializes dependency-set fetches: one in flight
//!   at a time, strictly FIFO, success callbacks in enqueue order.
//!
//! The queue never touches the network itself; it drives the
//! [`ScriptLoader`](mosaic_core::ScriptLoader) collaborator and treats
//! success, failure and timeout as the single event "the head finished".

pub mod cache;
pub mod queue;

pub use cache::{CacheEntry, DependencyCache, Verifier};
pub use queue::{LoadKind, LoadQueue};
