//! Static attribute and element tables.

/// Presentation attributes whose value is inherited by descendants.
pub const INHERITABLE_ATTRS: &[&str] = &[
    "clip-rule",
    "color",
    "color-interpolation",
    "color-interpolation-filters",
    "color-profile",
    "color-rendering",
    "cursor",
    "direction",
    "dominant-baseline",
    "fill",
    "fill-opacity",
    "fill-rule",
    "font",
    "font-family",
    "font-size",
    "font-size-adjust",
    "font-stretch",
    "font-style",
    "font-variant",
    "font-weight",
    "glyph-orientation-horizontal",
    "glyph-orientation-vertical",
    "image-rendering",
    "letter-spacing",
    "marker",
    "marker-end",
    "marker-mid",
    "marker-start",
    "paint-order",
    "pointer-events",
    "shape-rendering",
    "stroke",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "stroke-opacity",
    "stroke-width",
    "text-anchor",
    "text-rendering",
    "transform",
    "visibility",
    "word-spacing",
    "writing-mode",
];

/// Elements whose geometry is given by a `d` attribute.
pub const PATH_ELEMS: &[&str] = &["path", "glyph", "missing-glyph"];

/// Elements that only group or define other content.
pub const CONTAINER_ELEMS: &[&str] = &[
    "a",
    "clipPath",
    "defs",
    "g",
    "marker",
    "mask",
    "pattern",
    "svg",
    "switch",
    "symbol",
];

/// Attributes and style properties holding a color.
pub const COLOR_PROPS: &[&str] = &[
    "color",
    "fill",
    "flood-color",
    "lighting-color",
    "stop-color",
    "stroke",
];

pub fn is_inheritable(name: &str) -> bool {
    INHERITABLE_ATTRS.contains(&name)
}
