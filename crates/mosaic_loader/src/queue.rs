//! Serialized load queue
//!
//! Dependency-set fetches go through a single queue with at most one set in
//! flight. This is deliberate backpressure: sibling regions created in the
//! same pass would otherwise race overlapping fetches of shared files.
//!
//! Completion handling is split in two so the embedding event pump stays in
//! control: the [`ScriptLoader`] adapter reports through the queue's
//! `on_complete` hook (typically a channel send), and the pump calls
//! [`LoadQueue::complete`] on its own thread. The new head dispatches
//! before the finished entry's callback runs, overlapping the next network
//! fetch with callback execution. Only a successful outcome notifies the
//! callback; failure and timeout advance the queue silently.

use mosaic_core::{Completion, LoadOutcome, ScriptLoader};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// What a queue entry fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Script,
    Style,
}

struct LoadRequest {
    requirements: Vec<String>,
    callback: Box<dyn FnOnce() + Send>,
    #[allow(dead_code)]
    kind: LoadKind,
}

/// The page-wide serialized load queue.
pub struct LoadQueue {
    loader: Arc<dyn ScriptLoader>,
    on_complete: Arc<dyn Fn(LoadOutcome) + Send + Sync>,
    pending: Mutex<VecDeque<LoadRequest>>,
}

impl LoadQueue {
    /// Create a queue driving the given loader. `on_complete` receives the
    /// adapter's outcome and must eventually route it back into
    /// [`LoadQueue::complete`].
    pub fn new(
        loader: Arc<dyn ScriptLoader>,
        on_complete: impl Fn(LoadOutcome) + Send + Sync + 'static,
    ) -> Self {
        Self {
            loader,
            on_complete: Arc::new(on_complete),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a fetch. An empty requirement set completes synchronously;
    /// otherwise the entry dispatches immediately when the queue was idle.
    pub fn enqueue(
        &self,
        requirements: Vec<String>,
        kind: LoadKind,
        callback: impl FnOnce() + Send + 'static,
    ) {
        if requirements.is_empty() {
            callback();
            return;
        }
        let dispatch_now = {
            let mut pending = self.pending.lock();
            pending.push_back(LoadRequest {
                requirements,
                callback: Box::new(callback),
                kind,
            });
            // length 1 means the queue was empty: nothing else will start
            // the pipeline for us
            pending.len() == 1
        };
        if dispatch_now {
            self.dispatch_head();
        }
    }

    /// Report the in-flight fetch as finished. Pops the head, eagerly
    /// dispatches the next entry, then notifies the popped callback on
    /// success.
    pub fn complete(&self, outcome: LoadOutcome) {
        let finished = self.pending.lock().pop_front();
        self.dispatch_head();
        match finished {
            Some(entry) if outcome == LoadOutcome::Success => {
                log::debug!("load queue: success, notifying");
                (entry.callback)();
            }
            Some(_) => {
                log::warn!("load queue: {:?}, advancing without notifying", outcome);
            }
            None => {
                log::warn!("load queue: completion with no entry in flight");
            }
        }
    }

    /// Number of pending entries, including the in-flight head.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether nothing is pending or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn dispatch_head(&self) {
        let paths = {
            let pending = self.pending.lock();
            pending.front().map(|entry| entry.requirements.clone())
        };
        if let Some(paths) = paths {
            log::debug!("load queue: dispatching {:?}", paths);
            let notify = self.on_complete.clone();
            self.loader
                .load(&paths, Completion::new(move |outcome| notify(outcome)));
        }
    }
}
