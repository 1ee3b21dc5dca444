//! Snapshot rendering helpers.
//!
//! Functions for converting an output tree and its mutation log into plain
//! strings suitable for snapshot testing and assertions.

use crate::dom::{Dom, Mutation, NodeId, NodeKind};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialize the subtree at `node` to compact markup.
///
/// Attributes appear in name order; listeners are not shown. Text is
/// escaped, and an empty text node serializes to nothing.
///
/// # Examples
///
/// ```ignore
/// use gilt_vdom::testing::to_markup;
///
/// let markup = to_markup(&renderer.host(), container);
/// assert_eq!(markup, r#"<root><p class="x">hi</p></root>"#);
/// ```
pub fn to_markup(dom: &Dom, node: NodeId) -> String {
    let mut out = String::new();
    write_compact(dom, node, &mut out);
    out
}

/// Serialize the subtree at `node` with one node per line, indented by two
/// spaces per level. Empty text nodes are shown as `""`.
pub fn to_pretty_markup(dom: &Dom, node: NodeId) -> String {
    let mut lines = Vec::new();
    write_pretty(dom, node, 0, &mut lines);
    lines.join("\n")
}

/// Describe a mutation log, one line per mutation.
///
/// Nodes still present in `dom` are named by tag (or `#text`); removed nodes
/// are shown as `#removed`.
pub fn describe_mutations(dom: &Dom, log: &[Mutation]) -> String {
    let name = |node: NodeId| -> String {
        match dom.get(node).map(|data| &data.kind) {
            Some(NodeKind::Element { tag }) => format!("<{tag}>"),
            Some(NodeKind::Text(_)) => "#text".to_owned(),
            None => "#removed".to_owned(),
        }
    };

    log.iter()
        .map(|mutation| match mutation {
            Mutation::CreateElement { tag, .. } => format!("create <{tag}>"),
            Mutation::CreateText { text, .. } => format!("create text {text:?}"),
            Mutation::SetText { text, .. } => format!("set text {text:?}"),
            Mutation::SetAttribute { node, name: attr, value } => {
                format!("set {} {attr}={:?}", name(*node), value.to_string())
            }
            Mutation::RemoveAttribute { node, name: attr } => {
                format!("unset {} {attr}", name(*node))
            }
            Mutation::AddListener { node, event } => format!("listen {} {event}", name(*node)),
            Mutation::RemoveListener { node, event } => format!("unlisten {} {event}", name(*node)),
            Mutation::Insert { parent, node, index } => {
                format!("insert {} into {} at {index}", name(*node), name(*parent))
            }
            Mutation::Move { parent, node, index } => {
                format!("move {} in {} to {index}", name(*node), name(*parent))
            }
            Mutation::Remove { .. } => "remove".to_owned(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn write_compact(dom: &Dom, node: NodeId, out: &mut String) {
    let Some(data) = dom.get(node) else {
        return;
    };
    match &data.kind {
        NodeKind::Text(text) => out.push_str(&escape(text, false)),
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in &data.attributes {
                out.push_str(&format!(" {name}=\"{}\"", escape(&value.to_string(), true)));
            }
            out.push('>');
            for &child in dom.children(node) {
                write_compact(dom, child, out);
            }
            out.push_str(&format!("</{tag}>"));
        }
    }
}

fn write_pretty(dom: &Dom, node: NodeId, depth: usize, lines: &mut Vec<String>) {
    let Some(data) = dom.get(node) else {
        return;
    };
    let indent = "  ".repeat(depth);
    match &data.kind {
        NodeKind::Text(text) => lines.push(format!("{indent}{text:?}")),
        NodeKind::Element { tag } => {
            let mut open = format!("{indent}<{tag}");
            for (name, value) in &data.attributes {
                open.push_str(&format!(" {name}=\"{}\"", escape(&value.to_string(), true)));
            }
            let children = dom.children(node);
            if children.is_empty() {
                open.push_str(" />");
                lines.push(open);
                return;
            }
            open.push('>');
            lines.push(open);
            for &child in children {
                write_pretty(dom, child, depth + 1, lines);
            }
            lines.push(format!("{indent}</{tag}>"));
        }
    }
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

// ===========================================================================
// Tests
// ===========================================================================
