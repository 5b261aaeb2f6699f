//! Page-level interaction routing
//!
//! Once the root region is ready, the page's interaction listeners are
//! wired: pointer events on the root container, keyboard events at the
//! document level and window resizes. Raw events funnel through the
//! runtime channel, get classified, and enter the bus at the region that
//! owns the event target.
//!
//! Routing rules:
//! - click/focus/blur: classify, parse hooks, bubble `hooks + kind` from
//!   the owning region (blur travels on the `focus` layer).
//! - mouseover/mouseout: fire `region:{kind}` on the owning region when
//!   the pointer genuinely crosses its boundary, then bubble on `mouse`.
//! - keys: broadcast on `key` from the root.
//! - resize: broadcast `window:resize` from the root.

use crate::bus;
use crate::context::{RegionContext, RuntimeEvent};
use crate::semantic;
use mosaic_core::{EventKind, InteractionRoute, Message, RawEvent, SemanticEvent};
use std::sync::Arc;

pub(crate) fn wire_root(ctx: &Arc<RegionContext>) {
    let Some(root_instance) = ctx.instance(ctx.root_guid()) else {
        return;
    };
    let Some(container) = root_instance.container() else {
        return;
    };
    let tx = ctx.event_sender();
    let route = InteractionRoute::new(move |raw| {
        let _ = tx.send(RuntimeEvent::Interaction(raw));
    });
    ctx.dom().observe(
        container,
        &[
            EventKind::Click,
            EventKind::Focus,
            EventKind::Blur,
            EventKind::MouseOver,
            EventKind::MouseOut,
        ],
        route.clone(),
    );
    ctx.dom().observe_document_keys(route.clone());
    ctx.dom().observe_window_resize(route);
    log::debug!("page listeners wired on '{}'", ctx.root_guid());
}

pub(crate) fn dispatch(ctx: &Arc<RegionContext>, raw: RawEvent) {
    if !ctx.is_root_ready() {
        return;
    }
    let root = ctx.root_guid().clone();
    let Some(root_instance) = ctx.instance(&root) else {
        return;
    };
    let Some(root_container) = root_instance.container() else {
        return;
    };

    match raw.kind {
        EventKind::Click | EventKind::Focus | EventKind::Blur => {
            let layer = if raw.kind == EventKind::Click {
                "click"
            } else {
                "focus"
            };
            let sem = semantic::classify(ctx.dom(), &raw, root_container);
            let mut messages = semantic::parse_hooks(&sem.classes);
            messages.push(layer.to_string());
            let owner = bus::trickle(ctx, &root, sem.target);
            let mut msg = Message::interaction(sem);
            bus::bubbling(ctx, &owner, layer, &messages, &mut msg, false);
            if msg.is_halted() {
                ctx.dom().halt(&raw);
            }
        }
        EventKind::MouseOver | EventKind::MouseOut => {
            let target = raw.target.unwrap_or(root_container);
            let owner = bus::trickle(ctx, &root, target);
            let mut msg = Message::interaction(SemanticEvent::from_target(raw.clone(), target));
            if let Some(owner_instance) = ctx.instance(&owner) {
                // only a genuine boundary crossing fires the region-level
                // enter/leave message
                let crossed = match (raw.related_target, owner_instance.container()) {
                    (Some(related), Some(container)) => {
                        related != container && !ctx.dom().contains(container, related)
                    }
                    _ => true,
                };
                if crossed {
                    owner_instance.fire(&format!("region:{}", raw.kind.name()), &mut msg);
                }
            }
            bus::bubbling(
                ctx,
                &owner,
                "mouse",
                &[raw.kind.name().to_string()],
                &mut msg,
                false,
            );
            if msg.is_halted() {
                ctx.dom().halt(&raw);
            }
        }
        EventKind::KeyDown | EventKind::KeyUp | EventKind::KeyPress => {
            let target = raw.target.unwrap_or(root_container);
            let mut msg = Message::interaction(SemanticEvent::from_target(raw.clone(), target));
            bus::broadcast(ctx, &root, "key", raw.kind.name(), &mut msg, false);
        }
        EventKind::Resize => {
            let target = raw.target.unwrap_or(root_container);
            let mut msg = Message::interaction(SemanticEvent::from_target(raw.clone(), target));
            bus::broadcast(ctx, &root, "window", "resize", &mut msg, false);
        }
    }
}
