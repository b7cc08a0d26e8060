//! Traversal strategies over a host UI tree.
//!
//! Every search skips null children and stale nodes instead of aborting.
//! Breadth-first searches return the shallowest match, left-most among
//! siblings. The scrollable search is depth-first with a last-child-first
//! bias and invokes the scroll action as soon as it finds a candidate.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::node::{children_of, NodeAction, NodeAttributes, NodeHandle, UiTreeProvider};

/// Result of the fused scrollable search and scroll action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// A scrollable node was found and accepted the scroll.
    Scrolled(NodeHandle),
    /// A scrollable node was found but the host refused the scroll.
    Refused(NodeHandle),
    NoScrollableNode,
}

impl ScrollOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ScrollOutcome::Scrolled(_))
    }
}

fn breadth_first<P, F>(provider: &P, root: NodeHandle, mut matches: F) -> Option<NodeHandle>
where
    P: UiTreeProvider + ?Sized,
    F: FnMut(&NodeAttributes) -> bool,
{
    let mut queue = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        let Some(attrs) = provider.attributes(node) else {
            trace!(node = %node, "skipping stale node");
            continue;
        };
        if matches(&attrs) {
            return Some(node);
        }
        queue.extend(children_of(provider, node, attrs.child_count));
    }
    None
}

/// First node, in breadth-first order, whose text equals `query` exactly.
pub fn find_by_text<P>(provider: &P, root: NodeHandle, query: &str) -> Option<NodeHandle>
where
    P: UiTreeProvider + ?Sized,
{
    breadth_first(provider, root, |attrs| attrs.text_equals(query))
}

/// Nearest strict ancestor of `node` that is clickable.
pub fn clickable_ancestor<P>(provider: &P, node: NodeHandle) -> Option<NodeHandle>
where
    P: UiTreeProvider + ?Sized,
{
    let mut current = provider.parent(node);
    while let Some(ancestor) = current {
        if provider
            .attributes(ancestor)
            .is_some_and(|attrs| attrs.clickable)
        {
            return Some(ancestor);
        }
        current = provider.parent(ancestor);
    }
    None
}

/// First clickable node, in breadth-first order, whose class is `class_name`.
pub fn find_clickable_by_class<P>(
    provider: &P,
    root: NodeHandle,
    class_name: &str,
) -> Option<NodeHandle>
where
    P: UiTreeProvider + ?Sized,
{
    breadth_first(provider, root, |attrs| {
        attrs.clickable && attrs.class_name == class_name
    })
}

/// Depth-first search for a scrollable node.
///
/// Children are pushed onto the stack in forward order, so the last child of
/// each node is visited first. Existing controllers depend on this bias.
pub fn find_scrollable<P>(provider: &P, root: NodeHandle) -> Option<NodeHandle>
where
    P: UiTreeProvider + ?Sized,
{
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let Some(attrs) = provider.attributes(node) else {
            continue;
        };
        trace!(node = %node, class = %attrs.class_name, scrollable = attrs.scrollable, "visit");
        if attrs.scrollable {
            return Some(node);
        }
        stack.extend(children_of(provider, node, attrs.child_count));
    }
    None
}

/// Finds the first scrollable node and scrolls it in one step.
pub fn scroll_first_scrollable<P>(
    provider: &P,
    root: NodeHandle,
    action: NodeAction,
) -> ScrollOutcome
where
    P: UiTreeProvider + ?Sized,
{
    match find_scrollable(provider, root) {
        Some(node) => {
            let accepted = provider.perform_action(node, action);
            debug!(node = %node, action = action.as_str(), accepted, "scroll");
            if accepted {
                ScrollOutcome::Scrolled(node)
            } else {
                ScrollOutcome::Refused(node)
            }
        }
        None => ScrollOutcome::NoScrollableNode,
    }
}
