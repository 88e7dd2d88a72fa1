//! Passes that delete nodes and attributes which do not affect rendering.

use std::collections::HashSet;

use crate::ast::{Document, Element, NodeId, NodeKind};
use crate::collections::CONTAINER_ELEMS;
use crate::plugin::{DocumentPass, ItemPass, Visit};

/// Editor namespaces whose elements and attributes carry no rendering data.
const EDITOR_PREFIXES: &[&str] = &["sodipodi", "inkscape"];

/// Elements under which hidden content may still be referenced.
const REFERENCED_CONTAINERS: &[&str] = &["clipPath", "defs", "marker", "mask", "pattern", "symbol"];

pub struct RemoveDoctype;

impl ItemPass for RemoveDoctype {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        match doc.kind(id) {
            NodeKind::Doctype(_) => Visit::Drop,
            _ => Visit::Keep,
        }
    }
}

pub struct RemoveXmlProcInst;

impl ItemPass for RemoveXmlProcInst {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        match doc.kind(id) {
            NodeKind::ProcessingInstruction { target, .. } if target == "xml" => Visit::Drop,
            _ => Visit::Keep,
        }
    }
}

/// Remove comments, except `<!--! ... -->` legal notices.
pub struct RemoveComments;

impl ItemPass for RemoveComments {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        match doc.kind(id) {
            NodeKind::Comment(text) if !text.starts_with('!') => Visit::Drop,
            _ => Visit::Keep,
        }
    }
}

/// Remove `<metadata>`, `<title>`, `<desc>` and editor-specific markup.
pub struct RemoveMetadata;

impl ItemPass for RemoveMetadata {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        let Some(el) = doc.element_mut(id) else {
            return Visit::Keep;
        };
        if el.is_any(&["metadata", "title", "desc"]) || is_editor_prefix(el.name.prefix.as_deref()) {
            return Visit::Drop;
        }
        el.retain_attrs(|attr| !is_editor_prefix(attr.name.prefix.as_deref()) && !attr.name.matches("data-name"));
        Visit::Keep
    }
}

fn is_editor_prefix(prefix: Option<&str>) -> bool {
    prefix.is_some_and(|p| EDITOR_PREFIXES.contains(&p))
}

/// Remove elements that never render: `display:none` or zero opacity.
///
/// Elements with an `id`, and anything inside a container that is only
/// rendered by reference, are kept.
pub struct RemoveHidden;

impl ItemPass for RemoveHidden {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        let Some(el) = doc.element(id) else {
            return Visit::Keep;
        };
        if !is_hidden(el) || el.has_attr("id") || el.is_any(REFERENCED_CONTAINERS) {
            return Visit::Keep;
        }
        if REFERENCED_CONTAINERS
            .iter()
            .any(|name| doc.closest_element(id, name).is_some())
        {
            return Visit::Keep;
        }
        Visit::Drop
    }
}

fn is_hidden(el: &Element) -> bool {
    let property = |name: &str| el.style().get(name).or_else(|| el.attr(name)).map(str::trim);

    if property("display") == Some("none") {
        return true;
    }
    property("opacity").and_then(|o| o.parse::<f64>().ok()) == Some(0.0)
}

/// Remove containers left without children.
pub struct RemoveEmptyContainers;

impl ItemPass for RemoveEmptyContainers {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        let Some(el) = doc.element(id) else {
            return Visit::Keep;
        };
        if el.is("svg") || !el.is_any(CONTAINER_ELEMS) || !doc.is_empty(id) {
            return Visit::Keep;
        }
        // may be referenced, may inherit content, or may render a filter region
        if el.has_attr("id") || (el.is("pattern") && el.has_attrs()) || (el.is("g") && el.has_attr("filter")) {
            return Visit::Keep;
        }
        Visit::Drop
    }
}

/// Remove `xmlns:prefix` declarations that nothing uses.
pub struct RemoveUnusedNamespaces;

impl DocumentPass for RemoveUnusedNamespaces {
    fn run(&self, mut doc: Document) -> Document {
        let elements = doc.elements();

        let mut used: HashSet<String> = HashSet::new();
        for &id in &elements {
            let Some(el) = doc.element(id) else {
                continue;
            };
            used.extend(el.name.prefix.clone());
            used.extend(
                el.attributes()
                    .filter(|a| !a.name.is_xmlns())
                    .filter_map(|a| a.name.prefix.clone()),
            );
        }

        for id in elements {
            if let Some(el) = doc.element_mut(id) {
                el.retain_attrs(|a| a.name.prefix.as_deref() != Some("xmlns") || used.contains(&a.name.local));
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_svg;
    use crate::plugin::Pass;
    use crate::serialize::{SerializeOptions, serialize};

    fn run(pass: Pass, svg: &str) -> String {
        let doc = pass.apply(parse_svg(svg).unwrap());
        assert!(doc.check_consistency());
        serialize(&doc, &SerializeOptions::default())
    }

    #[test]
    fn test_remove_prolog() {
        let svg = r#"<?xml version="1.0"?><!DOCTYPE svg><?pi data?><svg/>"#;
        assert_eq!(
            run(Pass::TopDown(Box::new(RemoveDoctype)), svg),
            r#"<?xml version="1.0"?><?pi data?><svg/>"#
        );
        assert_eq!(
            run(Pass::TopDown(Box::new(RemoveXmlProcInst)), svg),
            r#"<!DOCTYPE svg><?pi data?><svg/>"#
        );
    }

    #[test]
    fn test_remove_comments_keeps_legal() {
        assert_eq!(
            run(
                Pass::TopDown(Box::new(RemoveComments)),
                "<!-- top --><svg><!-- a --><g><!-- b --></g><!--! (c) me --></svg>"
            ),
            "<svg><g/><!--! (c) me --></svg>"
        );
    }

    #[test]
    fn test_remove_metadata() {
        let svg = r#"<svg xmlns:inkscape="i" inkscape:version="1" data-name="x"><title>t</title><metadata/><inkscape:grid/><rect inkscape:label="r"/></svg>"#;
        assert_eq!(
            run(Pass::TopDown(Box::new(RemoveMetadata)), svg),
            r#"<svg xmlns:inkscape="i"><rect/></svg>"#
        );
    }

    #[test]
    fn test_remove_hidden() {
        assert_eq!(
            run(
                Pass::TopDown(Box::new(RemoveHidden)),
                r#"<svg><rect display="none"/><rect style="display:none"/><rect opacity="0"/><rect opacity="0.5"/></svg>"#
            ),
            r#"<svg><rect opacity="0.5"/></svg>"#
        );
    }

    #[test]
    fn test_hidden_but_referenced_kept() {
        let svg = r#"<svg><defs><path display="none"/></defs><rect id="r" display="none"/><mask display="none"/></svg>"#;
        assert_eq!(run(Pass::TopDown(Box::new(RemoveHidden)), svg), svg);
    }

    #[test]
    fn test_remove_empty_containers() {
        assert_eq!(
            run(
                Pass::BottomUp(Box::new(RemoveEmptyContainers)),
                r#"<svg><g><g/><defs/></g><g id="keep"/><pattern id="p" href="q"/><rect/></svg>"#
            ),
            r#"<svg><g id="keep"/><pattern id="p" href="q"/><rect/></svg>"#
        );
    }

    #[test]
    fn test_remove_unused_namespaces() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="x" xmlns:sketch="s"><use xlink:href="a"/></svg>"#;
        assert_eq!(
            run(Pass::Document(Box::new(RemoveUnusedNamespaces)), svg),
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="x"><use xlink:href="a"/></svg>"#
        );
    }
}
