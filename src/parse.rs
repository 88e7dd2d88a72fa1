//! SVG parsing from XML.

use std::fmt::Display;

use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesStart, Event};

use crate::ast::*;
use crate::error::SqueezeError;

/// Elements whose whitespace-only text children are significant.
const TEXT_ELEMENTS: &[&str] = &["text", "tspan", "textPath"];

/// Parse an SVG string into a Document.
///
/// The XML declaration becomes a processing instruction with target `xml`.
/// Whitespace-only text is dropped except inside text content elements.
pub fn parse_svg(svg: &str) -> Result<Document, SqueezeError> {
    let mut reader = Reader::from_str(svg);
    let mut doc = Document::new();
    let mut stack = vec![doc.root()];
    let mut seen_root = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(markup_error(svg, reader.error_position() as usize, e)),
        };
        let position = reader.buffer_position() as usize;
        let parent = stack.last().copied().unwrap_or(doc.root());
        let at_top = stack.len() == 1;

        match event {
            Event::Decl(decl) => {
                doc.append(
                    parent,
                    NodeKind::ProcessingInstruction {
                        target: "xml".into(),
                        body: declaration_body(&decl),
                    },
                );
            }
            Event::DocType(dt) => {
                let body = String::from_utf8_lossy(&dt).trim().to_string();
                doc.append(parent, NodeKind::Doctype(body));
            }
            Event::Start(start) => {
                if at_top && std::mem::replace(&mut seen_root, true) {
                    return Err(markup_error(svg, position, "multiple root elements"));
                }
                let element = parse_element_start(&start).map_err(|e| markup_error(svg, position, e))?;
                let id = doc.append(parent, NodeKind::Element(element));
                stack.push(id);
            }
            Event::Empty(start) => {
                if at_top && std::mem::replace(&mut seen_root, true) {
                    return Err(markup_error(svg, position, "multiple root elements"));
                }
                let element = parse_element_start(&start).map_err(|e| markup_error(svg, position, e))?;
                doc.append(parent, NodeKind::Element(element));
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| markup_error(svg, position, e))?;
                if text.trim().is_empty() {
                    let significant = doc
                        .element(parent)
                        .is_some_and(|e| e.is_any(TEXT_ELEMENTS));
                    if !significant || text.is_empty() {
                        continue;
                    }
                } else if at_top {
                    return Err(markup_error(svg, position, "text outside the root element"));
                }
                doc.append(parent, NodeKind::Text(text.into_owned()));
            }
            Event::CData(cdata) => {
                if at_top {
                    return Err(markup_error(svg, position, "CDATA outside the root element"));
                }
                let content = String::from_utf8_lossy(&cdata).into_owned();
                doc.append(parent, NodeKind::CData(content));
            }
            Event::Comment(comment) => {
                let content = String::from_utf8_lossy(&comment).into_owned();
                doc.append(parent, NodeKind::Comment(content));
            }
            Event::PI(pi) => {
                let content = String::from_utf8_lossy(&pi).into_owned();
                let (target, body) = match content.split_once(char::is_whitespace) {
                    Some((t, b)) => (t.to_string(), b.trim().to_string()),
                    None => (content, String::new()),
                };
                doc.append(parent, NodeKind::ProcessingInstruction { target, body });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        return Err(markup_error(svg, svg.len(), "unexpected end of file"));
    }
    if !seen_root {
        return Err(markup_error(svg, svg.len(), "no root element found"));
    }

    Ok(doc)
}

fn declaration_body(decl: &BytesDecl) -> String {
    let mut body = String::new();
    if let Ok(version) = decl.version() {
        body.push_str(&format!("version=\"{}\"", String::from_utf8_lossy(&version)));
    }
    if let Some(Ok(encoding)) = decl.encoding() {
        body.push_str(&format!(" encoding=\"{}\"", String::from_utf8_lossy(&encoding)));
    }
    if let Some(Ok(standalone)) = decl.standalone() {
        body.push_str(&format!(" standalone=\"{}\"", String::from_utf8_lossy(&standalone)));
    }
    body
}

fn parse_element_start(start: &BytesStart) -> Result<Element, String> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("invalid attribute: {e}"))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        attributes.push(Attribute::new(key, value.into_owned()));
    }

    Ok(Element::with_attributes(QName::parse(&name), attributes))
}

/// Build a parse error, converting a byte offset to a 1-based line and column.
fn markup_error(input: &str, offset: usize, message: impl Display) -> SqueezeError {
    let offset = offset.min(input.len());
    let before = &input.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
    SqueezeError::MarkupParse {
        message: message.to_string(),
        line,
        column,
        offset,
    }
}
