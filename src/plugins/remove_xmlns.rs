//! Drop the default namespace declaration, for SVG inlined into HTML.

use crate::ast::{Document, NodeId};
use crate::plugin::{ItemPass, Visit};

pub struct RemoveXmlns;

impl ItemPass for RemoveXmlns {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        if let Some(el) = doc.element_mut(id)
            && el.is("svg")
        {
            el.remove_attr("xmlns");
        }
        Visit::Keep
    }
}
