use std::fmt;

/// Opaque reference to a node in the host-owned UI tree.
///
/// Handles are minted by the host and only mean something to the provider
/// that produced them. Holding one never keeps the node alive; the host may
/// invalidate it at any time, after which `attributes` returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u64);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attributes the host reports for a single node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeAttributes {
    pub class_name: String,
    pub text: Option<String>,
    pub clickable: bool,
    pub visible_to_user: bool,
    pub scrollable: bool,
    pub child_count: usize,
}

impl NodeAttributes {
    pub fn text_equals(&self, query: &str) -> bool {
        self.text.as_deref() == Some(query)
    }
}

/// Actions that can be invoked on a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeAction {
    Click,
    ScrollForward,
    ScrollBackward,
}

impl NodeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeAction::Click => "click",
            NodeAction::ScrollForward => "scroll_forward",
            NodeAction::ScrollBackward => "scroll_backward",
        }
    }
}

/// Host-level navigation not tied to any node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalAction {
    Home,
    Back,
    Recents,
}

impl GlobalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalAction::Home => "Home",
            GlobalAction::Back => "Back",
            GlobalAction::Recents => "Show Recent Apps",
        }
    }
}

/// The host's view of the on-screen UI tree.
///
/// This is the only seam between the agent and the platform: the agent reads
/// attributes and walks child/parent links through it, and asks it to invoke
/// actions. Structure is never mutated through this interface.
pub trait UiTreeProvider: Send + Sync {
    /// Root of the active window, if there is one.
    fn root(&self) -> Option<NodeHandle>;

    /// Current attributes of `node`, or `None` if the node is stale.
    fn attributes(&self, node: NodeHandle) -> Option<NodeAttributes>;

    /// Child at `index`. `None` is a null child and must be skipped.
    fn child(&self, node: NodeHandle, index: usize) -> Option<NodeHandle>;

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn perform_action(&self, node: NodeHandle, action: NodeAction) -> bool;

    fn perform_global_action(&self, action: GlobalAction) -> bool;
}

/// Children of `node` in forward order, with null children dropped.
pub fn children_of<P: UiTreeProvider + ?Sized>(
    provider: &P,
    node: NodeHandle,
    child_count: usize,
) -> impl Iterator<Item = NodeHandle> + '_ {
    (0..child_count).filter_map(move |index| provider.child(node, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_equals_is_exact_and_case_sensitive() {
        let attrs = NodeAttributes {
            text: Some("Settings".to_string()),
            ..Default::default()
        };
        assert!(attrs.text_equals("Settings"));
        assert!(!attrs.text_equals("settings"));
        assert!(!attrs.text_equals("Setting"));
    }

    #[test]
    fn test_text_equals_never_matches_missing_text() {
        let attrs = NodeAttributes::default();
        assert!(!attrs.text_equals(""));
    }

    #[test]
    fn test_global_action_labels() {
        assert_eq!(GlobalAction::Home.as_str(), "Home");
        assert_eq!(GlobalAction::Back.as_str(), "Back");
        assert_eq!(GlobalAction::Recents.as_str(), "Show Recent Apps");
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(NodeHandle(7).to_string(), "#7");
    }
}
