//! Shared harness: a page wired to the in-memory stub adapters.
#![allow(dead_code)]

use mosaic_core::Message;
use mosaic_region::{Adapters, PageConfig, RegionContext, StubAjax, StubDom, StubScriptLoader};
use parking_lot::Mutex;
use std::sync::Arc;

pub struct Page {
    pub ctx: Arc<RegionContext>,
    pub dom: Arc<StubDom>,
    pub script: Arc<StubScriptLoader>,
    pub ajax: Arc<StubAjax>,
}

/// A page whose loads all succeed inline.
pub fn page() -> Page {
    page_with(PageConfig::default())
}

pub fn page_with(config: PageConfig) -> Page {
    build(config, StubScriptLoader::auto_success())
}

/// A page whose loads park until the test releases them.
pub fn page_manual_loads() -> Page {
    build(PageConfig::default(), StubScriptLoader::manual())
}

fn build(config: PageConfig, script: Arc<StubScriptLoader>) -> Page {
    let dom = StubDom::new();
    let ajax = StubAjax::auto();
    let ctx = RegionContext::new(
        config,
        Adapters {
            script: script.clone(),
            dom: dom.clone(),
            ajax: ajax.clone(),
        },
    );
    Page {
        ctx,
        dom,
        script,
        ajax,
    }
}

impl Page {
    /// Boot, mark the document parsed and pump until the page settles.
    pub fn boot_ready(&self) {
        self.ctx.boot();
        self.dom.set_ready();
        self.ctx.run_until_idle();
    }
}

/// A listener that appends a label to a shared journal on every firing.
pub fn journal_listener(
    journal: &Arc<Mutex<Vec<String>>>,
    label: &str,
) -> mosaic_core::RegionListener {
    let journal = journal.clone();
    let label = label.to_string();
    Arc::new(move |_: &mut Message| journal.lock().push(label.clone()))
}

pub fn journal() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}
