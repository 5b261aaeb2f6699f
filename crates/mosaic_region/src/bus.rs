//! Tree-wide message propagation
//!
//! Three modes, all synchronous and run-to-completion:
//! - local fire (on the instance, see [`crate::instance::RegionInstance::fire`])
//! - bubbling: up through ancestors, stoppable by flagging the payload
//! - broadcast: down through live descendants, never stoppable
//!
//! A defective listener can flag or mutate the payload but cannot abort
//! delivery to siblings; propagation never returns an error.

use crate::context::RegionContext;
use mosaic_core::{ElementHandle, Message, RegionGuid};

/// Bubble a set of messages from `origin` up to the root.
///
/// Each message fires locally as `layer:message` (unless `suppress_local`),
/// and the whole set fires even if a mid-list listener flags the payload.
/// The same payload object then continues upward while unflagged, so side
/// effects across levels share state. Terminates at the root or at a
/// flagged payload; returns the final flagged bit.
pub fn bubbling(
    ctx: &RegionContext,
    origin: &RegionGuid,
    layer: &str,
    messages: &[String],
    msg: &mut Message,
    suppress_local: bool,
) -> bool {
    let Some(region) = ctx.instance(origin) else {
        return msg.flagged;
    };
    if !suppress_local {
        for message in messages {
            if layer != "mouse" {
                log::debug!("bubbling '{}:{}' through '{}'", layer, message, origin);
            }
            region.fire(&format!("{}:{}", layer, message), msg);
        }
    }
    if let Some(parent) = region.parent() {
        if !msg.flagged {
            bubbling(ctx, &parent, layer, messages, msg, false);
        }
    }
    msg.flagged
}

/// Broadcast a message from `origin` down through every live, non-lazy
/// descendant.
///
/// The flagged bit is force-cleared on entry and again before each child
/// recursion: a broadcast can never be stopped, by design. Dormant lazy
/// children are skipped until woken.
pub fn broadcast(
    ctx: &RegionContext,
    origin: &RegionGuid,
    layer: &str,
    message: &str,
    msg: &mut Message,
    suppress_local: bool,
) -> bool {
    let Some(region) = ctx.instance(origin) else {
        return msg.flagged;
    };
    msg.flagged = false;
    if !suppress_local {
        log::debug!("broadcasting '{}:{}' at '{}'", layer, message, origin);
        region.fire(&format!("{}:{}", layer, message), msg);
    }
    for child in region.live_children() {
        msg.flagged = false;
        broadcast(ctx, &child, layer, message, msg, false);
    }
    msg.flagged
}

/// Resolve which region owns a raw event target: descend from `origin`
/// into the deepest live, non-lazy child whose container is the target or
/// contains it. Falls back to `origin` when no child matches.
pub(crate) fn trickle(
    ctx: &RegionContext,
    origin: &RegionGuid,
    target: ElementHandle,
) -> RegionGuid {
    let mut current = origin.clone();
    'descend: loop {
        let Some(region) = ctx.instance(&current) else {
            return current;
        };
        for child_guid in region.live_children() {
            let Some(child) = ctx.instance(&child_guid) else {
                continue;
            };
            if let Some(container) = child.container() {
                if container == target || ctx.dom().contains(container, target) {
                    current = child_guid;
                    continue 'descend;
                }
            }
        }
        return current;
    }
}
