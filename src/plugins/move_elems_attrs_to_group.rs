//! Hoist attributes shared by every child of a `<g>` onto the group.

use crate::ast::{Document, Element, NodeId};
use crate::collections::PATH_ELEMS;
use crate::geometry::intersect_inheritable_attrs;
use crate::plugin::{ItemPass, Visit};

pub struct MoveElemsAttrsToGroup;

impl ItemPass for MoveElemsAttrsToGroup {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        if !doc.is_element(id, "g") || doc.children(id).len() < 2 {
            return Visit::Keep;
        }

        let children = doc.children(id).to_vec();
        let mut elements: Vec<&Element> = Vec::with_capacity(children.len());
        for &child in &children {
            match doc.element(child) {
                Some(el) if el.has_attrs() && !el.has_attr("class") => elements.push(el),
                _ => return Visit::Keep,
            }
        }

        let shared = intersect_inheritable_attrs(&elements);
        if shared.is_empty() {
            return Visit::Keep;
        }
        let all_paths = elements.iter().all(|el| el.is_any(PATH_ELEMS));

        let Some(group) = doc.element(id) else {
            return Visit::Keep;
        };
        // a transform would move into the clip/mask coordinate space
        let keep_transform = all_paths || group.has_attr("clip-path") || group.has_attr("mask");

        // the group's inline style would override anything hoisted under the same name
        let hoisted: Vec<_> = shared
            .into_iter()
            .filter(|attr| !(keep_transform && attr.name.matches("transform")))
            .filter(|attr| attr.name.prefix.is_some() || group.style().get(&attr.name.local).is_none())
            .collect();
        if hoisted.is_empty() {
            return Visit::Keep;
        }

        for &child in &children {
            if let Some(el) = doc.element_mut(child) {
                el.retain_attrs(|a| !hoisted.iter().any(|h| h.name == a.name));
            }
        }

        let Some(group) = doc.element_mut(id) else {
            return Visit::Keep;
        };
        for attr in hoisted {
            if attr.name.matches("transform")
                && let Some(existing) = group.attr("transform")
            {
                let combined = format!("{existing} {}", attr.value);
                group.set_attr("transform", combined);
            } else {
                group.put_attribute(attr);
            }
        }

        Visit::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_svg;
    use crate::plugin::Pass;
    use crate::serialize::{SerializeOptions, serialize};

    fn run(svg: &str) -> String {
        let doc = Pass::BottomUp(Box::new(MoveElemsAttrsToGroup)).apply(parse_svg(svg).unwrap());
        assert!(doc.check_consistency());
        serialize(&doc, &SerializeOptions::default())
    }

    #[test]
    fn test_hoists_shared_inheritable_attrs() {
        assert_eq!(
            run(r#"<svg><g id="x"><rect fill="red" x="1"/><circle fill="red" r="2"/></g></svg>"#),
            r#"<svg><g id="x" fill="red"><rect x="1"/><circle r="2"/></g></svg>"#
        );
    }

    #[test]
    fn test_different_values_stay() {
        let svg = r#"<svg><g><rect fill="red"/><rect fill="blue"/></g></svg>"#;
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn test_non_inheritable_stay() {
        let svg = r#"<svg><g><rect opacity=".5"/><rect opacity=".5"/></g></svg>"#;
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn test_class_blocks_hoisting() {
        let svg = r#"<svg><g><rect class="a" fill="red"/><rect fill="red"/></g></svg>"#;
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn test_single_child_untouched() {
        let svg = r#"<svg><g><rect fill="red"/></g></svg>"#;
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn test_transform_appended_to_group() {
        assert_eq!(
            run(r#"<svg><g transform="scale(2)"><rect transform="rotate(45)"/><circle transform="rotate(45)"/></g></svg>"#),
            r#"<svg><g transform="scale(2) rotate(45)"><rect/><circle/></g></svg>"#
        );
    }

    #[test]
    fn test_transform_kept_on_paths_and_under_clip() {
        let svg = r#"<svg><g><path transform="rotate(45)" d="M0 0"/><path transform="rotate(45)" d="M1 1"/></g></svg>"#;
        assert_eq!(run(svg), svg);

        let svg = r#"<svg><g clip-path="url(#c)"><rect transform="rotate(45)"/><circle transform="rotate(45)"/></g></svg>"#;
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn test_group_style_blocks_same_property() {
        let svg = r#"<svg><g style="fill:blue"><rect fill="red"/><circle fill="red"/></g></svg>"#;
        assert_eq!(run(svg), svg);

        assert_eq!(
            run(r#"<svg><g style="fill:blue"><rect fill="red" stroke="green"/><circle fill="red" stroke="green"/></g></svg>"#),
            r#"<svg><g style="fill:blue" stroke="green"><rect fill="red"/><circle fill="red"/></g></svg>"#
        );
    }

    #[test]
    fn test_nested_groups_bottom_up() {
        assert_eq!(
            run(r#"<svg><g><g><rect fill="red"/><rect fill="red"/></g><circle fill="red"/></g></svg>"#),
            r#"<svg><g fill="red"><g><rect/><rect/></g><circle/></g></svg>"#
        );
    }
}
