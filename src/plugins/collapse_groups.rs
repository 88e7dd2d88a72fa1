//! Collapse `<g>` elements that do nothing.

use crate::ast::{Document, NodeId};
use crate::collections::is_inheritable;
use crate::plugin::{ItemPass, Visit};

/// Child attributes under which a moved `transform` would change meaning.
const TRANSFORM_SENSITIVE: &[&str] = &["clip-path", "mask", "filter"];

pub struct CollapseGroups;

impl ItemPass for CollapseGroups {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        if !doc.is_element(id, "g") || doc.is_empty(id) {
            return Visit::Keep;
        }
        // every child of a <switch> is a rendering alternative
        if doc.parent(id).is_some_and(|p| doc.is_element(p, "switch")) {
            return Visit::Keep;
        }

        move_attrs_to_only_child(doc, id);

        if doc.element(id).is_some_and(|g| !g.has_attrs()) {
            doc.unwrap_children(id);
        }
        Visit::Keep
    }
}

/// Push a group's inheritable attributes down onto its only child, when
/// that child has no conflicting values of its own.
fn move_attrs_to_only_child(doc: &mut Document, id: NodeId) {
    let [child] = doc.children(id) else {
        return;
    };
    let child = *child;
    let (Some(group), Some(inner)) = (doc.element(id), doc.element(child)) else {
        return;
    };
    let movable = group.attributes().all(|attr| {
        attr.name.prefix.is_none()
            && is_inheritable(&attr.name.local)
            && match attr.name.local.as_str() {
                "transform" => !TRANSFORM_SENSITIVE.iter().any(|name| inner.has_attr(name)),
                name => !inner.has_attr(name),
            }
    });
    if !movable {
        return;
    }

    let attrs: Vec<_> = group.attributes().cloned().collect();
    let child_transform = inner.attr("transform").map(str::to_string);

    if let Some(inner) = doc.element_mut(child) {
        for attr in attrs {
            match (attr.name.local.as_str(), &child_transform) {
                ("transform", Some(own)) => inner.set_attr("transform", format!("{} {own}", attr.value)),
                _ => inner.put_attribute(attr),
            }
        }
    }
    if let Some(group) = doc.element_mut(id) {
        group.retain_attrs(|_| false);
    }
}
