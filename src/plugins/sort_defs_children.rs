//! Group the children of `<defs>` by element name to help compression.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ast::{Document, NodeId};
use crate::plugin::{ItemPass, Visit};

pub struct SortDefsChildren;

impl ItemPass for SortDefsChildren {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        if !doc.is_element(id, "defs") || doc.is_empty(id) {
            return Visit::Keep;
        }

        // non-element children sort under the empty name
        let names: Vec<(NodeId, String)> = doc
            .children(id)
            .iter()
            .map(|&child| {
                let name = doc.element(child).map(|e| e.name.full_name()).unwrap_or_default();
                (child, name)
            })
            .collect();

        let mut frequency: HashMap<&str, usize> = HashMap::new();
        for (_, name) in &names {
            *frequency.entry(name.as_str()).or_default() += 1;
        }

        let mut sorted: Vec<&(NodeId, String)> = names.iter().collect();
        sorted.sort_by(|(_, a), (_, b)| compare(a, b, &frequency));
        let order = sorted.into_iter().map(|&(child, _)| child).collect();
        doc.reorder_children(id, order);

        Visit::Keep
    }
}

/// More frequent names first, then longer names, then reverse alphabetical.
fn compare(a: &str, b: &str, frequency: &HashMap<&str, usize>) -> Ordering {
    let count = |name: &str| frequency.get(name).copied().unwrap_or_default();
    count(b)
        .cmp(&count(a))
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_svg;
    use crate::plugin::Pass;
    use crate::serialize::{SerializeOptions, serialize};

    fn run(svg: &str) -> String {
        let doc = Pass::TopDown(Box::new(SortDefsChildren)).apply(parse_svg(svg).unwrap());
        assert!(doc.check_consistency());
        serialize(&doc, &SerializeOptions::default())
    }

    #[test]
    fn test_sort_by_frequency_then_length_then_name() {
        assert_eq!(
            run(r#"<svg><defs><path id="a"/><text id="b"/><circle id="c"/><path id="d"/><rect id="e"/></defs></svg>"#),
            r#"<svg><defs><path id="a"/><path id="d"/><circle id="c"/><text id="b"/><rect id="e"/></defs></svg>"#
        );
    }

    #[test]
    fn test_outside_defs_untouched() {
        let svg = r#"<svg><rect/><path/><path/></svg>"#;
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn test_stable_within_name() {
        assert_eq!(
            run(r#"<svg><defs><g id="1"/><linearGradient id="2"/><g id="3"/></defs></svg>"#),
            r#"<svg><defs><g id="1"/><g id="3"/><linearGradient id="2"/></defs></svg>"#
        );
    }
}
