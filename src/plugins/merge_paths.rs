//! Merge runs of adjacent `<path>` siblings that render identically.

use log::debug;
use serde::Deserialize;

use crate::ast::{Document, Element, NodeId};
use crate::collections::is_inheritable;
use crate::geometry::{bounding_box, intersects};
use crate::path::{PathData, PathFormat, parse_path, serialize_path};
use crate::plugin::{ItemPass, Visit};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergePathsParams {
    /// Merge even when the shapes may overlap.
    pub force: bool,
    pub precision: Option<u8>,
    pub leading_zero: bool,
    pub negative_extra_space: bool,
    pub no_space_after_flags: bool,
    pub collapse_repeated: bool,
}

impl Default for MergePathsParams {
    fn default() -> Self {
        Self {
            force: false,
            precision: None,
            leading_zero: true,
            negative_extra_space: true,
            no_space_after_flags: true,
            collapse_repeated: true,
        }
    }
}

pub struct MergePaths {
    force: bool,
    format: PathFormat,
}

impl MergePaths {
    pub fn new(params: MergePathsParams) -> Self {
        Self {
            force: params.force,
            format: PathFormat {
                precision: params.precision,
                leading_zero: params.leading_zero,
                negative_extra_space: params.negative_extra_space,
                no_space_after_flags: params.no_space_after_flags,
                collapse_repeated: params.collapse_repeated,
            },
        }
    }
}

/// The path a run is being merged into.
struct Target {
    id: NodeId,
    data: PathData,
}

impl ItemPass for MergePaths {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        if doc.element(id).is_none() || doc.is_empty(id) {
            return Visit::Keep;
        }

        let mut target: Option<Target> = None;
        for child in doc.children(id).to_vec() {
            if !is_mergeable_path(doc, child) {
                target = None;
                continue;
            }
            if target.is_none() {
                target = start_run(doc, child);
                continue;
            }
            let Some(current) = target.as_mut() else {
                continue;
            };
            let (Some(prev), Some(next)) = (doc.element(current.id), doc.element(child)) else {
                target = None;
                continue;
            };
            if !same_attributes(prev, next) {
                target = start_run(doc, child);
                continue;
            }
            let Some(data) = path_data(next) else {
                target = None;
                continue;
            };
            if !self.force && !self.can_merge(doc, current, &data) {
                target = Some(Target { id: child, data });
                continue;
            }

            current.data.append(data);
            let d = serialize_path(&current.data, &self.format);
            if let Some(el) = doc.element_mut(current.id) {
                el.set_attr("d", d);
            }
            doc.remove(child);
        }
        Visit::Keep
    }
}

impl MergePaths {
    fn can_merge(&self, doc: &Document, target: &Target, next: &PathData) -> bool {
        if intersects(&target.data, next) {
            return false;
        }
        let Some(stroke_width) = stroke_width(doc, target.id) else {
            return true;
        };
        // strokes drawn over a neighbour's fill would change stacking
        match (bounding_box(&target.data), bounding_box(next)) {
            (Some(a), Some(b)) => {
                let pad = stroke_width / 2.0;
                !a.padded(pad).overlaps(&b.padded(pad))
            }
            _ => false,
        }
    }
}

fn start_run(doc: &Document, id: NodeId) -> Option<Target> {
    let data = path_data(doc.element(id)?)?;
    Some(Target { id, data })
}

fn path_data(element: &Element) -> Option<PathData> {
    let d = element.attr("d")?;
    match parse_path(d) {
        Ok(data) => Some(data),
        Err(e) => {
            debug!("not merging path: {e}");
            None
        }
    }
}

/// A childless `<path>` with a `d` whose paint does not depend on its
/// bounding box and which draws no markers.
fn is_mergeable_path(doc: &Document, id: NodeId) -> bool {
    let Some(el) = doc.element(id) else {
        return false;
    };
    if !el.is("path") || !doc.is_empty(id) || !el.has_attr("d") {
        return false;
    }
    if el.attributes().any(|a| a.value.contains("url(") || a.name.local.starts_with("marker")) {
        return false;
    }
    // inherited paint servers and markers apply per path, too
    let mut ancestor = doc.parent(id);
    while let Some(node) = ancestor {
        if let Some(parent) = doc.element(node) {
            let inherited_url = parent
                .attributes()
                .any(|a| is_inheritable(&a.name.local) && a.value.contains("url("));
            let style_url = parent
                .style()
                .iter()
                .any(|d| is_inheritable(&d.name) && d.value.contains("url("));
            if inherited_url || style_url {
                return false;
            }
        }
        ancestor = doc.parent(node);
    }
    true
}

/// Identical attribute sets apart from `d`.
fn same_attributes(a: &Element, b: &Element) -> bool {
    a.attributes().len() == b.attributes().len()
        && b.attributes().all(|attr| {
            attr.name.matches("d")
                || a.attributes()
                    .any(|other| other.name == attr.name && other.value == attr.value)
        })
}

/// The effective stroke width when the path may be stroked, `None` otherwise.
///
/// A stroke set by a stylesheet rule is not visible in the attributes, so
/// any `<style>` mentioning strokes makes the width unknown.
fn stroke_width(doc: &Document, id: NodeId) -> Option<f64> {
    if stylesheet_sets_stroke(doc) {
        return Some(f64::INFINITY);
    }
    let stroke = inherited_property(doc, id, "stroke")?;
    if stroke == "none" {
        return None;
    }
    let width = inherited_property(doc, id, "stroke-width").unwrap_or_else(|| "1".to_string());
    // unknown units: pad generously
    Some(width.trim().parse::<f64>().unwrap_or(f64::INFINITY).abs())
}

fn stylesheet_sets_stroke(doc: &Document) -> bool {
    doc.elements()
        .into_iter()
        .any(|id| doc.is_element(id, "style") && doc.text_content(id).contains("stroke"))
}

fn inherited_property(doc: &Document, id: NodeId, name: &str) -> Option<String> {
    let mut current = Some(id);
    while let Some(node) = current {
        if let Some(el) = doc.element(node) {
            if let Some(value) = el.style().get(name).or_else(|| el.attr(name)) {
                return Some(value.trim().to_string());
            }
        }
        current = doc.parent(node);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_svg;
    use crate::plugin::Pass;
    use crate::serialize::{SerializeOptions, serialize};

    fn run_with(svg: &str, params: MergePathsParams) -> String {
        let doc = Pass::TopDown(Box::new(MergePaths::new(params))).apply(parse_svg(svg).unwrap());
        assert!(doc.check_consistency());
        serialize(&doc, &SerializeOptions::default())
    }

    fn run(svg: &str) -> String {
        run_with(svg, MergePathsParams::default())
    }

    #[test]
    fn test_merges_disjoint_paths() {
        assert_eq!(
            run(r#"<svg><path fill="red" d="M0 0h10v10H0z"/><path fill="red" d="M20 0h10v10H20z"/></svg>"#),
            r#"<svg><path fill="red" d="M0 0h10v10H0zM20 0h10v10H20z"/></svg>"#
        );
    }

    #[test]
    fn test_merges_whole_run() {
        assert_eq!(
            run(r#"<svg><path d="M0 0h1"/><path d="M5 5h1"/><path d="M9 9h1"/></svg>"#),
            r#"<svg><path d="M0 0h1M5 5h1M9 9h1"/></svg>"#
        );
    }

    #[test]
    fn test_leading_relative_moveto_becomes_absolute() {
        assert_eq!(
            run(r#"<svg><path d="M0 0h1"/><path d="m5 5h1"/></svg>"#),
            r#"<svg><path d="M0 0h1M5 5h1"/></svg>"#
        );
    }

    #[test]
    fn test_overlapping_paths_kept() {
        let svg = r#"<svg><path d="M0 0h10v10H0z"/><path d="M5 5h10v10H5z"/></svg>"#;
        assert_eq!(run(svg), svg);

        let params = MergePathsParams {
            force: true,
            ..MergePathsParams::default()
        };
        assert_eq!(
            run_with(svg, params),
            r#"<svg><path d="M0 0h10v10H0zM5 5h10v10H5z"/></svg>"#
        );
    }

    #[test]
    fn test_different_attributes_kept() {
        let svg = r#"<svg><path fill="red" d="M0 0h1"/><path fill="blue" d="M5 5h1"/></svg>"#;
        assert_eq!(run(svg), svg);
        let svg = r#"<svg><path fill="red" d="M0 0h1"/><path d="M5 5h1"/></svg>"#;
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn test_paint_servers_and_markers_kept() {
        let svg = r#"<svg><path fill="url(#g)" d="M0 0h1"/><path fill="url(#g)" d="M5 5h1"/></svg>"#;
        assert_eq!(run(svg), svg);
        let svg = r#"<svg><g fill="url(#g)"><path d="M0 0h1"/><path d="M5 5h1"/></g></svg>"#;
        assert_eq!(run(svg), svg);
        let svg = r#"<svg><path marker-end="x" d="M0 0h1"/><path marker-end="x" d="M5 5h1"/></svg>"#;
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn test_stroke_from_stylesheet_blocks_merge() {
        // the class matches twice, so its rule stays in the sheet
        let svg = r#"<svg><style>.s{stroke:red;stroke-width:10}</style><path class="s" d="M0 0h10v10H0z"/><path class="s" d="M14 0h10v10H14z"/></svg>"#;
        assert_eq!(run(svg), svg);

        assert_eq!(
            run(r#"<svg><style>.s{fill:red}</style><path class="s" d="M0 0h10v10H0z"/><path class="s" d="M14 0h10v10H14z"/></svg>"#),
            r#"<svg><style>.s{fill:red}</style><path class="s" d="M0 0h10v10H0zM14 0h10v10H14z"/></svg>"#
        );
    }

    #[test]
    fn test_stroke_padding() {
        // 4 units apart, but each stroke reaches 5 units out
        let svg = r#"<svg><g stroke="red" stroke-width="10"><path d="M0 0h10v10H0z"/><path d="M14 0h10v10H14z"/></g></svg>"#;
        assert_eq!(run(svg), svg);

        assert_eq!(
            run(r#"<svg><g stroke="red"><path d="M0 0h10v10H0z"/><path d="M14 0h10v10H14z"/></g></svg>"#),
            r#"<svg><g stroke="red"><path d="M0 0h10v10H0zM14 0h10v10H14z"/></g></svg>"#
        );
    }

    #[test]
    fn test_non_adjacent_paths_kept() {
        let svg = r#"<svg><path d="M0 0h1"/><rect/><path d="M5 5h1"/></svg>"#;
        assert_eq!(run(svg), svg);
    }
}
