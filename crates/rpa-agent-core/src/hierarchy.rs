use std::fmt::Write;

use crate::node::{children_of, NodeAttributes, NodeHandle, UiTreeProvider};

const INDENT_WIDTH: usize = 2;

/// Renders the subtree under `root` as one line per node, pre-order.
///
/// Each line is indented by two spaces per level of depth. Null children and
/// stale nodes are left out; their siblings are still rendered. A missing
/// root renders as the empty string.
pub fn serialize_tree<P>(provider: &P, root: Option<NodeHandle>) -> String
where
    P: UiTreeProvider + ?Sized,
{
    let mut out = String::new();
    let Some(root) = root else {
        return out;
    };

    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let Some(attrs) = provider.attributes(node) else {
            continue;
        };
        write_line(&mut out, &attrs, depth);

        let children: Vec<NodeHandle> = children_of(provider, node, attrs.child_count).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }
    out
}

fn write_line(out: &mut String, attrs: &NodeAttributes, depth: usize) {
    // Controllers match on "Text: <value>," so the field layout is fixed.
    let _ = writeln!(
        out,
        "{:indent$} Node: {}, Text: {}, Clickable: {}, Visible: {}, Children: {}, Scrollable: {}",
        "",
        attrs.class_name,
        attrs.text.as_deref().unwrap_or("null"),
        attrs.clickable,
        attrs.visible_to_user,
        attrs.child_count,
        attrs.scrollable,
        indent = depth * INDENT_WIDTH,
    );
}
