//! Passes that rewrite attribute and style values into shorter equivalents.

use log::debug;
use serde::Deserialize;

use crate::ast::{Document, NodeId, NodeKind};
use crate::collections::{COLOR_PROPS, PATH_ELEMS, is_inheritable};
use crate::css::parse_stylesheet;
use crate::path::{PathFormat, parse_path, serialize_path};
use crate::plugin::{ItemPass, Visit};

/// True if an ancestor of `id` sets `name`, as an attribute or in its style.
fn ancestor_sets(doc: &Document, id: NodeId, name: &str) -> bool {
    let mut current = doc.parent(id);
    while let Some(node) = current {
        if let Some(el) = doc.element(node)
            && (el.has_attr(name) || el.style().get(name).is_some())
        {
            return true;
        }
        current = doc.parent(node);
    }
    false
}

/// A default can only go when nothing upstream would take its place.
fn removable_default(doc: &Document, id: NodeId, element: &str, name: &str, value: &str) -> bool {
    is_default_value(element, name, value) && !(is_inheritable(name) && ancestor_sets(doc, id, name))
}

fn is_default_value(element: &str, attr: &str, value: &str) -> bool {
    match (element, attr, value.trim()) {
        ("svg", "version", "1.1") => true,
        ("svg", "baseProfile", "full" | "none") => true,
        ("svg", "preserveAspectRatio", "xMidYMid meet" | "xMidYMid") => true,
        ("svg", "x" | "y", "0") => true,

        (_, "fill-opacity" | "stroke-opacity" | "opacity" | "stop-opacity", "1") => true,
        (_, "stroke-width", "1") => true,
        (_, "stroke-linecap", "butt") => true,
        (_, "stroke-linejoin", "miter") => true,
        (_, "stroke-miterlimit", "4") => true,
        (_, "stroke-dashoffset", "0") => true,
        (_, "stroke-dasharray", "none") => true,
        (_, "fill-rule" | "clip-rule", "nonzero") => true,
        (_, "font-style", "normal") => true,
        (_, "font-weight", "normal" | "400") => true,
        (_, "text-anchor", "start") => true,
        (_, "dominant-baseline", "auto") => true,
        (_, "visibility", "visible") => true,
        (_, "display", "inline") => true,

        ("rect", "rx" | "ry" | "x" | "y", "0") => true,
        ("circle" | "ellipse", "cx" | "cy", "0") => true,
        ("line", "x1" | "y1" | "x2" | "y2", "0") => true,

        _ => false,
    }
}

/// Remove attributes that restate their initial value.
pub struct RemoveDefaultAttrs;

impl ItemPass for RemoveDefaultAttrs {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        let Some(el) = doc.element(id) else {
            return Visit::Keep;
        };
        let element = el.name.local.clone();
        let defaults: Vec<String> = el
            .attributes()
            .filter(|a| a.name.prefix.is_none())
            .filter(|a| removable_default(doc, id, &element, &a.name.local, &a.value))
            .map(|a| a.name.local.clone())
            .collect();

        if let Some(el) = doc.element_mut(id) {
            for name in defaults {
                el.remove_attr(&name);
            }
        }
        Visit::Keep
    }
}

/// Compact `<style>` contents and drop default declarations from `style`
/// attributes.
pub struct MinifyStyles;

impl ItemPass for MinifyStyles {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        let Some(el) = doc.element(id) else {
            return Visit::Keep;
        };

        if el.is("style") {
            minify_stylesheet(doc, id);
            return Visit::Keep;
        }

        let element = el.name.local.clone();
        let current = el.attr("style").unwrap_or_default().to_string();
        let mut style = el.style().clone();
        style.retain(|d| !removable_default(doc, id, &element, &d.name, &d.value));
        if style.to_string() != current
            && let Some(el) = doc.element_mut(id)
        {
            el.replace_style(style);
        }
        Visit::Keep
    }
}

fn minify_stylesheet(doc: &mut Document, id: NodeId) {
    let text = doc.text_content(id);
    if text.trim().is_empty() {
        return;
    }
    let sheet = match parse_stylesheet(&text) {
        Ok(sheet) => sheet,
        Err(e) => {
            debug!("leaving <style> untouched: {e}");
            return;
        }
    };
    let cdata = doc
        .children(id)
        .iter()
        .any(|&c| matches!(doc.kind(c), NodeKind::CData(_)));
    let css = sheet.to_string();
    let node = doc.create(if cdata { NodeKind::CData(css) } else { NodeKind::Text(css) });
    let len = doc.children(id).len();
    doc.splice_children(id, 0..len, vec![node]);
}

/// Shorten color values in color attributes and style declarations.
pub struct MinifyColors;

impl ItemPass for MinifyColors {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        let Some(el) = doc.element_mut(id) else {
            return Visit::Keep;
        };

        el.map_attr_values(|name, value| {
            if name.prefix.is_none() && COLOR_PROPS.contains(&name.local.as_str()) {
                Some(minify_color(value)).filter(|short| short != value)
            } else {
                None
            }
        });

        let mut style = el.style().clone();
        let mut changed = false;
        for decl in style.iter_mut() {
            if COLOR_PROPS.contains(&decl.name.as_str()) {
                let short = minify_color(&decl.value);
                if short != decl.value {
                    decl.value = short;
                    changed = true;
                }
            }
        }
        if changed {
            el.replace_style(style);
        }
        Visit::Keep
    }
}

/// The shortest spelling of a color. Values that are not plain colors
/// (`url(...)`, `currentColor`, ...) come back unchanged.
pub fn minify_color(color: &str) -> String {
    let trimmed = color.trim();
    let lower = trimmed.to_ascii_lowercase();

    let hex = match lower.as_str() {
        "white" => "#ffffff".to_string(),
        "black" => "#000000".to_string(),
        l if l.starts_with("rgb(") => match rgb_to_hex(l) {
            Some(hex) => hex,
            None => return trimmed.to_string(),
        },
        l if l.starts_with('#') && l.len() == 4 && l[1..].bytes().all(|b| b.is_ascii_hexdigit()) => {
            l.chars().skip(1).flat_map(|c| [c, c]).fold("#".to_string(), |mut s, c| {
                s.push(c);
                s
            })
        }
        l if l.starts_with('#') && l.len() == 7 && l[1..].bytes().all(|b| b.is_ascii_hexdigit()) => l.to_string(),
        _ => return trimmed.to_string(),
    };

    match hex.as_str() {
        "#ff0000" => return "red".into(),
        "#d2b48c" => return "tan".into(),
        "#f0ffff" => return "azure".into(),
        "#f5f5dc" => return "beige".into(),
        "#ffe4c4" => return "bisque".into(),
        "#a52a2a" => return "brown".into(),
        "#ff7f50" => return "coral".into(),
        "#ffd700" => return "gold".into(),
        "#808080" => return "gray".into(),
        "#008000" => return "green".into(),
        "#4b0082" => return "indigo".into(),
        "#fffff0" => return "ivory".into(),
        "#f0e68c" => return "khaki".into(),
        "#faf0e6" => return "linen".into(),
        "#800000" => return "maroon".into(),
        "#000080" => return "navy".into(),
        "#808000" => return "olive".into(),
        "#ffa500" => return "orange".into(),
        "#da70d6" => return "orchid".into(),
        "#cd853f" => return "peru".into(),
        "#ffc0cb" => return "pink".into(),
        "#dda0dd" => return "plum".into(),
        "#800080" => return "purple".into(),
        "#fa8072" => return "salmon".into(),
        "#a0522d" => return "sienna".into(),
        "#c0c0c0" => return "silver".into(),
        "#fffafa" => return "snow".into(),
        "#008080" => return "teal".into(),
        "#ff6347" => return "tomato".into(),
        "#ee82ee" => return "violet".into(),
        "#f5deb3" => return "wheat".into(),
        _ => {}
    }

    let bytes = hex.as_bytes();
    if bytes[1] == bytes[2] && bytes[3] == bytes[4] && bytes[5] == bytes[6] {
        let mut short = String::from("#");
        short.push(char::from(bytes[1]));
        short.push(char::from(bytes[3]));
        short.push(char::from(bytes[5]));
        return short;
    }
    hex
}

/// `rgb(r, g, b)` with integer or percentage channels.
fn rgb_to_hex(value: &str) -> Option<String> {
    let inner = value.strip_prefix("rgb(")?.strip_suffix(')')?;
    let channels: Vec<u8> = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok().map(|p| (p.clamp(0.0, 100.0) * 2.55).round() as u8),
            None => s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8),
        })
        .collect::<Option<_>>()?;
    match channels.as_slice() {
        [r, g, b] => Some(format!("#{r:02x}{g:02x}{b:02x}")),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertPathDataParams {
    /// Decimal places kept in coordinates; `null` keeps full precision.
    pub precision: Option<u8>,
}

impl Default for ConvertPathDataParams {
    fn default() -> Self {
        Self { precision: Some(3) }
    }
}

/// Rewrite `d` attributes with rounded numbers and minimal separators.
pub struct ConvertPathData {
    format: PathFormat,
}

impl ConvertPathData {
    pub fn new(params: ConvertPathDataParams) -> Self {
        Self {
            format: PathFormat {
                precision: params.precision,
                ..PathFormat::default()
            },
        }
    }
}

impl ItemPass for ConvertPathData {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
        let Some(el) = doc.element_mut(id) else {
            return Visit::Keep;
        };
        if !el.is_any(PATH_ELEMS) {
            return Visit::Keep;
        }
        let Some(d) = el.attr("d") else {
            return Visit::Keep;
        };
        match parse_path(d) {
            Ok(path) if path.is_empty() => {}
            Ok(path) => {
                let minified = serialize_path(&path, &self.format);
                if minified.len() < d.len() {
                    el.set_attr("d", minified);
                }
            }
            Err(e) => debug!("leaving path data unchanged: {e}"),
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

    fn run(pass: Pass, svg: &str) -> String {
        let doc = pass.apply(parse_svg(svg).unwrap());
        assert!(doc.check_consistency());
        serialize(&doc, &SerializeOptions::default())
    }

    #[test]
    fn test_minify_color() {
        assert_eq!(minify_color("#ffffff"), "#fff");
        assert_eq!(minify_color("#FF0000"), "red");
        assert_eq!(minify_color("#f00"), "red");
        assert_eq!(minify_color("#aabbcc"), "#abc");
        assert_eq!(minify_color("#abcdef"), "#abcdef");
        assert_eq!(minify_color("white"), "#fff");
        assert_eq!(minify_color("rgb(255, 255, 0)"), "#ff0");
        assert_eq!(minify_color("rgb(100%,0%,0%)"), "red");
        assert_eq!(minify_color("url(#a)"), "url(#a)");
        assert_eq!(minify_color("currentColor"), "currentColor");
        assert_eq!(minify_color("#ggg"), "#ggg");
    }

    #[test]
    fn test_minify_colors_pass() {
        assert_eq!(
            run(
                Pass::TopDown(Box::new(MinifyColors)),
                r##"<svg><rect fill="#FFFFFF" stroke="#808080" style="stop-color:#000000;width:1"/></svg>"##
            ),
            r##"<svg><rect fill="#fff" stroke="gray" style="stop-color:#000;width:1"/></svg>"##
        );
    }

    #[test]
    fn test_is_default_value() {
        assert!(is_default_value("svg", "version", "1.1"));
        assert!(is_default_value("rect", "opacity", "1"));
        assert!(!is_default_value("rect", "opacity", "0.5"));
        assert!(!is_default_value("g", "version", "1.1"));
    }

    #[test]
    fn test_remove_default_attrs() {
        assert_eq!(
            run(
                Pass::TopDown(Box::new(RemoveDefaultAttrs)),
                r#"<svg version="1.1"><rect x="0" rx="0" fill-opacity="1" opacity="1" stroke-width="2"/></svg>"#
            ),
            r#"<svg><rect stroke-width="2"/></svg>"#
        );
    }

    #[test]
    fn test_inherited_override_kept() {
        let svg = r#"<svg><g fill-opacity=".5"><rect fill-opacity="1"/></g></svg>"#;
        assert_eq!(run(Pass::TopDown(Box::new(RemoveDefaultAttrs)), svg), svg);
    }

    #[test]
    fn test_minify_styles() {
        assert_eq!(
            run(
                Pass::TopDown(Box::new(MinifyStyles)),
                r#"<svg><style> .a { fill : red } </style><rect style="fill: red ; opacity: 1"/></svg>"#
            ),
            r#"<svg><style>.a{fill:red}</style><rect style="fill:red"/></svg>"#
        );
    }

    #[test]
    fn test_convert_path_data() {
        assert_eq!(
            run(
                Pass::TopDown(Box::new(ConvertPathData::new(ConvertPathDataParams::default()))),
                r#"<svg><path d="M 10.123456 20.98765 L 30.5 -40.25"/><path d="bogus"/></svg>"#
            ),
            r#"<svg><path d="M10.123 20.988 30.5-40.25"/><path d="bogus"/></svg>"#
        );
    }
}
