//! Invariant tests for the region runtime
//!
//! These pin the behavioral guarantees other code builds on: guid
//! uniqueness, queue serialization, propagation semantics and the
//! registry's notification order.

mod common;

use common::{journal, journal_listener, page, page_manual_loads};
use mosaic_core::{LoadOutcome, Message, RegionError, RegionGuid};
use mosaic_region::{ActionMap, DefinitionBody, DestroyArgs, RegionConfig, RegionState};
use std::sync::Arc;

/// INVARIANT: a second init with a live guid never replaces the first.
#[test]
fn invariant_guid_uniqueness() {
    let page = page();
    page.boot_ready();
    page.dom.insert("panelA", "DIV", None);

    page.ctx
        .init_region("panelA", RegionConfig::new("inline"))
        .unwrap();
    page.ctx.run_until_idle();
    let first = page.ctx.instance(&RegionGuid::from("panelA")).unwrap();

    let err = page
        .ctx
        .init_region("panelA", RegionConfig::new("other"))
        .unwrap_err();
    assert!(matches!(err, RegionError::DuplicateGuid(_)));
    page.ctx.run_until_idle();

    let still = page.ctx.instance(&RegionGuid::from("panelA")).unwrap();
    assert!(Arc::ptr_eq(&first, &still));
    assert_eq!(still.ns().as_str(), "inline");
}

/// INVARIANT: firing a layer without subscribers leaves the flag alone.
#[test]
fn invariant_fire_without_subscribers_is_identity() {
    let page = page();
    page.boot_ready();
    let root = page.ctx.instance(page.ctx.root_guid()).unwrap();

    let mut msg = Message::empty();
    assert!(!root.fire("nobody:listens", &mut msg));
    assert!(!msg.flagged);

    msg.flag();
    assert!(root.fire("nobody:listens", &mut msg));
    assert!(msg.flagged);
}

/// INVARIANT: a flagged payload stops bubbling below the root.
#[test]
fn invariant_bubbling_stops_at_flag() {
    let journal = journal();
    let page = page();
    page.boot_ready();
    page.dom.insert("mid", "DIV", None);
    page.ctx.init_region("mid", RegionConfig::new("inline")).unwrap();
    page.ctx.run_until_idle();

    let mid = page.ctx.instance(&RegionGuid::from("mid")).unwrap();
    mid.on(
        "status:changed",
        Arc::new(|msg: &mut Message| msg.flag()),
    );
    let root = page.ctx.instance(page.ctx.root_guid()).unwrap();
    root.on("status:changed", journal_listener(&journal, "root"));

    let flagged = page.ctx.handle(&RegionGuid::from("mid")).bubbling(
        "status",
        &["changed".to_string()],
        &mut Message::empty(),
    );
    assert!(flagged);
    assert!(journal.lock().is_empty());
}

/// INVARIANT: every message in a bubbled set fires locally, even after an
/// earlier message in the set flagged the payload.
#[test]
fn invariant_bubbling_fires_whole_local_set() {
    let journal = journal();
    let page = page();
    page.boot_ready();
    page.dom.insert("mid", "DIV", None);
    page.ctx.init_region("mid", RegionConfig::new("inline")).unwrap();
    page.ctx.run_until_idle();

    let mid = page.ctx.instance(&RegionGuid::from("mid")).unwrap();
    mid.on(
        "click:alert",
        Arc::new(|msg: &mut Message| msg.flag()),
    );
    mid.on("click:click", journal_listener(&journal, "second"));

    page.ctx.handle(&RegionGuid::from("mid")).bubbling(
        "click",
        &["alert".to_string(), "click".to_string()],
        &mut Message::empty(),
    );
    // the second message still fired locally; only the upward leg stopped
    assert_eq!(*journal.lock(), vec!["second"]);
}

/// INVARIANT: a broadcast cannot be stopped; flagging inside one listener
/// never starves siblings or their descendants.
#[test]
fn invariant_broadcast_unstoppable() {
    let journal = journal();
    let page = page();
    page.boot_ready();
    page.dom.insert("p", "DIV", None);
    page.dom.insert("c1", "DIV", None);
    page.dom.insert("c2", "DIV", None);
    page.dom.insert("g1", "DIV", None);

    let flagging_child = RegionConfig {
        children: vec![(
            RegionGuid::from("g1"),
            RegionConfig {
                actions: ActionMap::new().with("key:keydown", journal_listener(&journal, "g1")),
                ..RegionConfig::new("inline")
            },
        )],
        actions: ActionMap::new().with(
            "key:keydown",
            Arc::new(|msg: &mut Message| {
                msg.flag();
            }) as mosaic_core::RegionListener,
        ),
        ..RegionConfig::new("inline")
    };
    let sibling = RegionConfig {
        actions: ActionMap::new().with("key:keydown", journal_listener(&journal, "c2")),
        ..RegionConfig::new("inline")
    };
    let parent_config = RegionConfig {
        children: vec![
            (RegionGuid::from("c1"), flagging_child),
            (RegionGuid::from("c2"), sibling),
        ],
        ..RegionConfig::new("inline")
    };
    page.ctx.init_region("p", parent_config).unwrap();
    page.ctx.run_until_idle();

    let flagged = page.ctx.handle(&RegionGuid::from("p")).broadcast(
        "key",
        "keydown",
        &mut Message::empty(),
    );
    // c1 flagged; its child and its sibling were delivered regardless
    assert_eq!(*journal.lock(), vec!["g1", "c2"]);
    assert!(!flagged);
}

/// INVARIANT: pending subscribers are notified last-subscribed-first when
/// their definition resolves.
#[test]
fn invariant_registry_notifies_lifo() {
    let journal = journal();
    let page = page();
    page.boot_ready();
    page.dom.insert("panelA", "DIV", None);
    page.dom.insert("panelB", "DIV", None);

    for guid in ["panelA", "panelB"] {
        let config = RegionConfig {
            region: Some("news.js".to_string()),
            actions: ActionMap::new().with("region:ready", journal_listener(&journal, guid)),
            ..RegionConfig::new("news")
        };
        page.ctx.init_region(guid, config).unwrap();
    }
    page.ctx.run_until_idle();
    assert!(journal.lock().is_empty());

    page.ctx.set_definition("news", Some(DefinitionBody::default()));
    page.ctx.run_until_idle();
    assert_eq!(*journal.lock(), vec!["panelB", "panelA"]);
}

/// INVARIANT: calls parked before the root is ready drain in stack order.
#[test]
fn invariant_waiting_list_drains_lifo() {
    let journal = journal();
    let page = page();
    page.dom.insert("panelA", "DIV", None);
    page.dom.insert("panelB", "DIV", None);
    page.ctx.boot();

    for guid in ["panelA", "panelB"] {
        let config = RegionConfig {
            actions: ActionMap::new().with("region:ready", journal_listener(&journal, guid)),
            ..RegionConfig::new("inline")
        };
        page.ctx.init_region(guid, config).unwrap();
    }

    page.dom.set_ready();
    page.ctx.run_until_idle();
    assert_eq!(*journal.lock(), vec!["panelB", "panelA"]);
}

/// INVARIANT: the load queue runs one fetch at a time, in arrival order,
/// and a failed head still advances the queue.
#[test]
fn invariant_load_queue_serializes() {
    let page = page_manual_loads();
    page.ctx.boot();
    page.dom.set_ready();

    // the root's own dependency fetch is the first and only dispatch
    assert_eq!(page.script.pending(), 1);
    page.script.resolve_next(LoadOutcome::Success);
    page.ctx.run_until_idle();
    assert!(page.ctx.is_root_ready());

    page.dom.insert("r1", "DIV", None);
    page.dom.insert("r2", "DIV", None);
    page.ctx.init_region("r1", RegionConfig::new("inline")).unwrap();
    page.ctx.init_region("r2", RegionConfig::new("inline")).unwrap();
    page.ctx.run_until_idle();

    // r2's fetch must wait for r1's
    assert_eq!(page.script.pending(), 1);
    assert_eq!(page.script.requests().len(), 2);

    page.script.resolve_next(LoadOutcome::Failure);
    page.ctx.run_until_idle();
    // the failure advanced the queue without notifying r1
    assert_eq!(page.script.pending(), 1);
    let r1 = page.ctx.instance(&RegionGuid::from("r1")).unwrap();
    assert_eq!(r1.state(), RegionState::LoadingDeps);

    page.script.resolve_next(LoadOutcome::Success);
    page.ctx.run_until_idle();
    let r2 = page.ctx.instance(&RegionGuid::from("r2")).unwrap();
    assert!(r2.is_ready());
    // r1 stays stalled forever: no retry, no error surfaced
    assert_eq!(r1.state(), RegionState::LoadingDeps);
}

/// INVARIANT: removing an instance is identity-checked; a stale instance
/// cannot evict the live one that replaced it.
#[test]
fn invariant_destroy_identity_checked() {
    let page = page();
    page.boot_ready();
    page.dom.insert("panelA", "DIV", None);

    page.ctx
        .init_region("panelA", RegionConfig::new("inline"))
        .unwrap();
    page.ctx.run_until_idle();
    let stale = page.ctx.instance(&RegionGuid::from("panelA")).unwrap();

    page.ctx
        .destroy_region(&RegionGuid::from("panelA"), DestroyArgs { partial: true })
        .unwrap();
    assert!(page.ctx.instance(&RegionGuid::from("panelA")).is_none());

    // same guid comes back as a fresh instance
    page.dom.insert("panelA", "DIV", None);
    page.ctx
        .init_region("panelA", RegionConfig::new("inline"))
        .unwrap();
    page.ctx.run_until_idle();
    let fresh = page.ctx.instance(&RegionGuid::from("panelA")).unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));

    // the stale instance's removal request is a protected no-op
    page.ctx.release_instance(&stale);
    let survivor = page.ctx.instance(&RegionGuid::from("panelA")).unwrap();
    assert!(Arc::ptr_eq(&fresh, &survivor));
}

/// INVARIANT: destroy listeners observe the teardown but cannot veto it.
#[test]
fn invariant_destroy_has_no_veto() {
    let page = page();
    page.boot_ready();
    page.dom.insert("doomed", "DIV", None);

    let config = RegionConfig {
        actions: ActionMap::new().with(
            "region:destroy",
            Arc::new(|msg: &mut Message| msg.flag()) as mosaic_core::RegionListener,
        ),
        ..RegionConfig::new("inline")
    };
    page.ctx.init_region("doomed", config).unwrap();
    page.ctx.run_until_idle();

    page.ctx
        .destroy_region(&RegionGuid::from("doomed"), DestroyArgs::default())
        .unwrap();
    assert!(page.ctx.instance(&RegionGuid::from("doomed")).is_none());
}
