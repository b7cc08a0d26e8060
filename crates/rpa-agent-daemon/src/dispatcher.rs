//! Executes classified commands against the host UI tree.

use std::sync::Arc;

use rpa_agent_core::{
    clickable_ancestor, find_by_text, find_clickable_by_class, scroll_first_scrollable,
    serialize_tree, GlobalAction, NodeAction, NodeHandle, ScrollOutcome, UiTreeProvider,
};
use tracing::{debug, info, warn};

use crate::command::{Command, ScrollDirection};
use crate::config::DEFAULT_BACK_BUTTON_CLASS;

pub const NO_ACTIVE_WINDOW: &str = "No active window found.";
pub const NO_SCROLLABLE_NODE: &str = "No scrollable node found";
pub const BACK_BUTTON_CLICKED: &str = "Clicked Back Button.";
pub const BACK_BUTTON_NOT_FOUND: &str = "Back Button (ImageButton) not found.";

/// What the agent sends back for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A single newline-terminated line.
    Line(String),
    /// An unbounded payload that must go through chunked transfer.
    Chunked(String),
}

impl Response {
    pub fn line(text: impl Into<String>) -> Self {
        Response::Line(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Response::Line(text) | Response::Chunked(text) => text,
        }
    }
}

pub struct CommandDispatcher {
    provider: Arc<dyn UiTreeProvider>,
    back_button_class: String,
}

impl CommandDispatcher {
    pub fn new(provider: Arc<dyn UiTreeProvider>) -> Self {
        Self {
            provider,
            back_button_class: DEFAULT_BACK_BUTTON_CLASS.to_string(),
        }
    }

    pub fn with_back_button_class(mut self, class_name: impl Into<String>) -> Self {
        self.back_button_class = class_name.into();
        self
    }

    pub fn dispatch_line(&self, line: &str) -> Response {
        self.dispatch(&Command::classify(line))
    }

    #[tracing::instrument(skip(self, command), fields(command = command.name()))]
    pub fn dispatch(&self, command: &Command) -> Response {
        let Some(root) = self.provider.root() else {
            warn!("No root node available");
            return Response::line(NO_ACTIVE_WINDOW);
        };

        match command {
            Command::Ping => Response::line("pong"),
            Command::Global(action) => self.global_action(*action),
            Command::Scroll(direction) => self.scroll(root, *direction),
            Command::GetFullUi => {
                Response::Chunked(serialize_tree(self.provider.as_ref(), Some(root)))
            }
            Command::ClickBackButton => self.click_back_button(root),
            Command::FindAndClick(text) => self.find_and_click(root, text),
        }
    }

    /// The acknowledgement is fixed; a rejection by the host is only logged.
    fn global_action(&self, action: GlobalAction) -> Response {
        if self.provider.perform_global_action(action) {
            info!(action = action.as_str(), "Performed global action");
        } else {
            warn!(action = action.as_str(), "Host rejected global action");
        }
        Response::line(format!("Performed action: {}", action.as_str()))
    }

    fn scroll(&self, root: NodeHandle, direction: ScrollDirection) -> Response {
        match scroll_first_scrollable(self.provider.as_ref(), root, direction.node_action()) {
            ScrollOutcome::Scrolled(_) => Response::line(format!(
                "Scroll {} completed successfully",
                direction.as_command()
            )),
            ScrollOutcome::Refused(node) => {
                warn!(node = %node, direction = direction.as_command(), "Scroll action refused");
                Response::line(NO_SCROLLABLE_NODE)
            }
            ScrollOutcome::NoScrollableNode => Response::line(NO_SCROLLABLE_NODE),
        }
    }

    fn click_back_button(&self, root: NodeHandle) -> Response {
        match find_clickable_by_class(self.provider.as_ref(), root, &self.back_button_class) {
            Some(node) => {
                debug!(node = %node, class = %self.back_button_class, "Found back button");
                self.provider.perform_action(node, NodeAction::Click);
                Response::line(BACK_BUTTON_CLICKED)
            }
            None => {
                warn!(class = %self.back_button_class, "Back button not found");
                Response::line(BACK_BUTTON_NOT_FOUND)
            }
        }
    }

    fn find_and_click(&self, root: NodeHandle, text: &str) -> Response {
        let provider = self.provider.as_ref();
        let Some(target) = find_by_text(provider, root, text) else {
            warn!(text, "Command not found in UI");
            return Response::line(format!("Command not found in UI: {}", text));
        };

        let Some(attrs) = provider.attributes(target) else {
            warn!(text, node = %target, "Matched node went stale");
            return Response::line(format!("Command not found in UI: {}", text));
        };
        debug!(
            node = %target,
            class = %attrs.class_name,
            clickable = attrs.clickable,
            visible = attrs.visible_to_user,
            scrollable = attrs.scrollable,
            "Matched node"
        );

        if attrs.clickable {
            provider.perform_action(target, NodeAction::Click);
            return Response::line(format!("Command executed: {}", text));
        }

        match clickable_ancestor(provider, target) {
            Some(ancestor) => {
                provider.perform_action(ancestor, NodeAction::Click);
                Response::line(format!("Command executed: {} via parent node", text))
            }
            None => {
                warn!(text, "No clickable parent found");
                Response::line(format!("No clickable parent found for command: {}", text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpa_agent_core::{SnapshotNode, UiTreeSnapshot};

    fn dispatcher(tree: UiTreeSnapshot) -> (CommandDispatcher, Arc<UiTreeSnapshot>) {
        let tree = Arc::new(tree);
        (CommandDispatcher::new(tree.clone()), tree)
    }

    fn settings_screen() -> UiTreeSnapshot {
        UiTreeSnapshot::from_root(
            SnapshotNode::new("android.widget.FrameLayout")
                .child(
                    SnapshotNode::new("android.widget.ImageView")
                        .clickable()
                        .text("Navigate up"),
                )
                .child(
                    SnapshotNode::new("androidx.recyclerview.widget.RecyclerView")
                        .scrollable()
                        .child(
                            SnapshotNode::new("android.widget.LinearLayout")
                                .clickable()
                                .child(
                                    SnapshotNode::new("android.widget.RelativeLayout")
                                        .child(SnapshotNode::new("android.widget.TextView").text("Wi-Fi")),
                                ),
                        )
                        .child(
                            SnapshotNode::new("android.widget.Button")
                                .clickable()
                                .text("Bluetooth"),
                        ),
                )
                .child(SnapshotNode::new("android.widget.TextView").text("Orphan")),
        )
    }

    #[test]
    fn test_ping_answers_pong() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        assert_eq!(dispatcher.dispatch_line("ping"), Response::line("pong"));
        assert!(tree.actions().is_empty());
    }

    #[test]
    fn test_ping_without_window_reports_no_window() {
        let (dispatcher, _) = dispatcher(UiTreeSnapshot::empty());
        assert_eq!(
            dispatcher.dispatch_line("ping"),
            Response::line(NO_ACTIVE_WINDOW)
        );
    }

    #[test]
    fn test_no_active_window() {
        let (dispatcher, tree) = dispatcher(UiTreeSnapshot::empty());
        for line in ["ping", "goHome", "scrollUp", "getFullUI", "clickBackButton", "Wi-Fi"] {
            assert_eq!(
                dispatcher.dispatch_line(line),
                Response::line(NO_ACTIVE_WINDOW),
                "{line}"
            );
        }
        assert!(tree.global_actions().is_empty());
    }

    #[test]
    fn test_global_actions() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        assert_eq!(
            dispatcher.dispatch_line("goHome"),
            Response::line("Performed action: Home")
        );
        assert_eq!(
            dispatcher.dispatch_line("goBack"),
            Response::line("Performed action: Back")
        );
        assert_eq!(
            dispatcher.dispatch_line("showRecents"),
            Response::line("Performed action: Show Recent Apps")
        );
        assert_eq!(
            tree.global_actions(),
            vec![GlobalAction::Home, GlobalAction::Back, GlobalAction::Recents]
        );
        assert!(tree.actions().is_empty());
    }

    #[test]
    fn test_global_action_rejected_by_host_still_acknowledged() {
        let (dispatcher, tree) = dispatcher(settings_screen().with_global_action_result(false));
        assert_eq!(
            dispatcher.dispatch_line("goBack"),
            Response::line("Performed action: Back")
        );
        assert_eq!(tree.global_actions(), vec![GlobalAction::Back]);
    }

    #[test]
    fn test_scroll_down_scrolls_forward() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        assert_eq!(
            dispatcher.dispatch_line("scrollDown"),
            Response::line("Scroll scrollDown completed successfully")
        );
        let list = tree.node_at(&[1]).unwrap();
        assert_eq!(tree.actions(), vec![(list, NodeAction::ScrollForward)]);
    }

    #[test]
    fn test_scroll_up_scrolls_backward() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        dispatcher.dispatch_line("scrollUp");
        let list = tree.node_at(&[1]).unwrap();
        assert_eq!(tree.actions(), vec![(list, NodeAction::ScrollBackward)]);
    }

    #[test]
    fn test_scroll_without_scrollable_node() {
        let (dispatcher, _) = dispatcher(UiTreeSnapshot::from_root(
            SnapshotNode::new("Root").child(SnapshotNode::new("Leaf")),
        ));
        assert_eq!(
            dispatcher.dispatch_line("scrollUp"),
            Response::line(NO_SCROLLABLE_NODE)
        );
    }

    #[test]
    fn test_refused_scroll_reports_no_scrollable_node() {
        let (dispatcher, tree) = dispatcher(UiTreeSnapshot::from_root(
            SnapshotNode::new("Root").child(SnapshotNode::new("List").scrollable().failing_actions()),
        ));
        assert_eq!(
            dispatcher.dispatch_line("scrollDown"),
            Response::line(NO_SCROLLABLE_NODE)
        );
        assert_eq!(tree.actions().len(), 1);
    }

    #[test]
    fn test_get_full_ui_is_chunked() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        let response = dispatcher.dispatch_line("getFullUI");

        let Response::Chunked(text) = response else {
            panic!("expected chunked response");
        };
        assert_eq!(text, serialize_tree(tree.as_ref(), tree.root()));
        assert!(text.contains("Text: Wi-Fi,"));
        assert!(tree.actions().is_empty());
    }

    #[test]
    fn test_click_back_button() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        assert_eq!(
            dispatcher.dispatch_line("clickBackButton"),
            Response::line(BACK_BUTTON_CLICKED)
        );
        let back = tree.node_at(&[0]).unwrap();
        assert_eq!(tree.actions(), vec![(back, NodeAction::Click)]);
    }

    #[test]
    fn test_click_back_button_custom_class() {
        let tree = Arc::new(settings_screen());
        let dispatcher = CommandDispatcher::new(tree.clone())
            .with_back_button_class("android.widget.ImageButton");
        assert_eq!(
            dispatcher.dispatch_line("clickBackButton"),
            Response::line(BACK_BUTTON_NOT_FOUND)
        );
        assert!(tree.actions().is_empty());
    }

    #[test]
    fn test_find_and_click_direct() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        assert_eq!(
            dispatcher.dispatch_line("Bluetooth"),
            Response::line("Command executed: Bluetooth")
        );
        let button = tree.node_at(&[1, 1]).unwrap();
        assert_eq!(tree.actions(), vec![(button, NodeAction::Click)]);
    }

    #[test]
    fn test_find_and_click_via_grandparent() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        assert_eq!(
            dispatcher.dispatch_line("Wi-Fi"),
            Response::line("Command executed: Wi-Fi via parent node")
        );
        let row = tree.node_at(&[1, 0]).unwrap();
        assert_eq!(tree.actions(), vec![(row, NodeAction::Click)]);
    }

    #[test]
    fn test_find_and_click_without_clickable_parent() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        assert_eq!(
            dispatcher.dispatch_line("Orphan"),
            Response::line("No clickable parent found for command: Orphan")
        );
        assert!(tree.actions().is_empty());
    }

    #[test]
    fn test_unmatched_command_not_found() {
        let (dispatcher, tree) = dispatcher(settings_screen());
        assert_eq!(
            dispatcher.dispatch_line("xyz123"),
            Response::line("Command not found in UI: xyz123")
        );
        assert!(tree.actions().is_empty());
    }
}
