//! SVG serialization to XML.

use serde::Deserialize;

use crate::ast::*;

/// Output formatting options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerializeOptions {
    /// Put each element on its own line.
    pub pretty: bool,
    /// Spaces per nesting level when `pretty` is set.
    pub indent: usize,
    /// Write childless elements as `<x/>` instead of `<x></x>`.
    pub self_close: bool,
    /// Sort attributes by name (`xmlns` declarations first); helps gzip.
    pub sort_attrs: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: 4,
            self_close: true,
            sort_attrs: false,
        }
    }
}

/// Serialize a Document to an SVG string.
pub fn serialize(doc: &Document, options: &SerializeOptions) -> String {
    let mut out = String::new();
    let mut first = true;
    for &child in doc.children(doc.root()) {
        if options.pretty && !first {
            out.push('\n');
        }
        first = false;
        serialize_node(&mut out, doc, child, options, 0);
    }
    out
}

fn serialize_node(out: &mut String, doc: &Document, id: NodeId, options: &SerializeOptions, depth: usize) {
    match doc.kind(id) {
        NodeKind::Root => {
            for &child in doc.children(id) {
                serialize_node(out, doc, child, options, depth);
            }
        }
        NodeKind::Element(elem) => serialize_element(out, doc, id, elem, options, depth),
        NodeKind::Text(text) => push_escaped_text(out, text),
        NodeKind::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        NodeKind::CData(data) => {
            out.push_str("<![CDATA[");
            out.push_str(data);
            out.push_str("]]>");
        }
        NodeKind::ProcessingInstruction { target, body } => {
            out.push_str("<?");
            out.push_str(target);
            if !body.is_empty() {
                out.push(' ');
                out.push_str(body);
            }
            out.push_str("?>");
        }
        NodeKind::Doctype(body) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(body);
            out.push('>');
        }
    }
}

fn serialize_element(
    out: &mut String,
    doc: &Document,
    id: NodeId,
    elem: &Element,
    options: &SerializeOptions,
    depth: usize,
) {
    let name = elem.name.full_name();
    out.push('<');
    out.push_str(&name);

    let mut attrs: Vec<_> = elem.attributes().collect();
    if options.sort_attrs {
        attrs.sort_by(|a, b| {
            // xmlns declarations first, then by name
            b.name
                .is_xmlns()
                .cmp(&a.name.is_xmlns())
                .then_with(|| a.name.full_name().cmp(&b.name.full_name()))
        });
    }

    for attr in attrs {
        out.push(' ');
        out.push_str(&attr.name.full_name());
        out.push_str("=\"");
        push_escaped_attr(out, &attr.value);
        out.push('"');
    }

    let children = doc.children(id);
    if children.is_empty() {
        if options.self_close {
            out.push_str("/>");
        } else {
            out.push_str("></");
            out.push_str(&name);
            out.push('>');
        }
        return;
    }

    out.push('>');

    // Indenting around text would change it
    let has_text = children
        .iter()
        .any(|&c| matches!(doc.kind(c), NodeKind::Text(_) | NodeKind::CData(_)));
    let pretty = options.pretty && !has_text;

    for &child in children {
        if pretty {
            push_indent(out, options.indent * (depth + 1));
        }
        serialize_node(out, doc, child, options, depth + 1);
    }

    if pretty {
        push_indent(out, options.indent * depth);
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn push_indent(out: &mut String, width: usize) {
    out.push('\n');
    out.extend(std::iter::repeat_n(' ', width));
}

fn push_escaped_attr(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_escaped_text(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
}
