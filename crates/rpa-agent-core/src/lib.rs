//! UI node tree contract and search engine for rpa-agent.
//!
//! The host platform owns the UI tree; this crate only describes how the agent
//! sees it ([`UiTreeProvider`]) and the traversals the agent runs over it.

#![deny(clippy::all)]

pub mod hierarchy;
mod node;
pub mod search;
pub mod snapshot;

pub use hierarchy::serialize_tree;
pub use node::children_of;
pub use node::GlobalAction;
pub use node::NodeAction;
pub use node::NodeAttributes;
pub use node::NodeHandle;
pub use node::UiTreeProvider;
pub use search::clickable_ancestor;
pub use search::find_by_text;
pub use search::find_clickable_by_class;
pub use search::find_scrollable;
pub use search::scroll_first_scrollable;
pub use search::ScrollOutcome;
pub use snapshot::SnapshotError;
pub use snapshot::SnapshotNode;
pub use snapshot::UiTreeSnapshot;
