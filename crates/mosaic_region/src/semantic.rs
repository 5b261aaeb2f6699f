//! Semantic event classification
//!
//! Turns a raw host interaction into a [`SemanticEvent`]: the resolved
//! trigger element, its role (anchor, button, input, select, rich button)
//! and the CSS hook tags parsed from its class list. Classification is a
//! pure function over the DOM adapter's read-only queries.

use mosaic_core::{DomAdapter, ElementHandle, RawEvent, SemanticEvent};
use regex::Regex;
use std::sync::OnceLock;

/// How far up to search for an owning anchor element.
const ANCHOR_SEARCH_DEPTH: usize = 5;

/// How far up to search for an owning select element.
const SELECT_SEARCH_DEPTH: usize = 2;

fn hook_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|\s)(target|hook)-([\w.-]+)").expect("hook pattern")
    })
}

/// Classify a raw event against the live document. `fallback` stands in
/// when the event carries no target (the page-root container).
pub fn classify(dom: &dyn DomAdapter, raw: &RawEvent, fallback: ElementHandle) -> SemanticEvent {
    let target = raw.target.unwrap_or(fallback);
    let mut sem = SemanticEvent::from_target(raw.clone(), target);

    sem.anchor = dom.ancestor_by_tag(target, "A", ANCHOR_SEARCH_DEPTH);
    if sem.anchor.is_none() {
        let tag = dom.tag_name(target).to_ascii_uppercase();
        if tag == "INPUT" {
            sem.input = Some(target);
        } else if tag == "BUTTON" {
            sem.button = Some(target);
        } else {
            sem.select = dom.ancestor_by_tag(target, "SELECT", SELECT_SEARCH_DEPTH);
            if let Some(select) = sem.select {
                sem.value = dom.selected_value(select);
            }
        }
    }

    // rich-button components sit behind anchors or buttons; when the host
    // resolves one, it supplies both value and classes
    if sem.anchor.is_some() || sem.button.is_some() {
        if let Some(rich) = dom.rich_button(target) {
            sem.rich_button = Some(rich);
            sem.value = dom.value(rich);
            sem.classes = dom.classes(rich);
        }
    }

    sem.trigger = sem
        .trigger
        .or(sem.anchor)
        .or(sem.rich_button)
        .or(sem.input)
        .or(sem.select)
        .or(Some(target));
    if let Some(trigger) = sem.trigger {
        if sem.value.is_none() {
            sem.value = dom.value(trigger);
        }
        if sem.classes.is_empty() {
            sem.classes = dom.classes(trigger);
        }
    }
    sem
}

/// Parse a class string for `target-*` / `hook-*` tokens.
///
/// Matched tokens are stripped from the working string as the scan
/// proceeds, so several hooks per class list resolve in first-match
/// order. Results are lowercased.
pub fn parse_hooks(classes: &str) -> Vec<String> {
    let mut hooks = Vec::new();
    let mut rest = classes.to_string();
    while let Some(captures) = hook_pattern().captures(&rest) {
        let token = format!("{}-{}", &captures[1], &captures[2]);
        hooks.push(captures[2].to_lowercase());
        rest = rest.replacen(&token, "", 1);
    }
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_in_first_match_order() {
        assert_eq!(
            parse_hooks("foo hook-alert target-panel bar"),
            vec!["alert", "panel"]
        );
    }

    #[test]
    fn test_hooks_lowercased() {
        assert_eq!(parse_hooks("hook-Alert"), vec!["alert"]);
    }

    #[test]
    fn test_hooks_none() {
        assert!(parse_hooks("btn primary").is_empty());
        assert!(parse_hooks("").is_empty());
    }

    #[test]
    fn test_hooks_with_dots_and_dashes() {
        assert_eq!(
            parse_hooks("target-news.main hook-open-panel"),
            vec!["news.main", "open-panel"]
        );
    }
}
