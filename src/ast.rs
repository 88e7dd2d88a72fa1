//! SVG Abstract Syntax Tree
//!
//! All nodes live in a [`Document`] arena and are addressed by [`NodeId`].
//! A parent owns its children through an ordered `Vec<NodeId>`; the parent
//! link on each node is a plain index used for lookups and is kept in sync
//! by every mutation that goes through [`Document`].

use std::ops::Range;

use crate::style::{ClassList, Declaration, Priority, Style};

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A qualified name (possibly with namespace prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace prefix (e.g., "svg", "xlink")
    pub prefix: Option<String>,
    /// Local name (e.g., "rect", "href")
    pub local: String,
}

impl QName {
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    /// Parse a qualified name from a string like "prefix:local" or just "local".
    pub fn parse(s: &str) -> Self {
        if let Some((prefix, local)) = s.split_once(':') {
            Self::with_prefix(prefix, local)
        } else {
            Self::new(s)
        }
    }

    /// Check if this is a namespace declaration (xmlns or xmlns:prefix).
    pub fn is_xmlns(&self) -> bool {
        self.prefix.as_deref() == Some("xmlns") || (self.prefix.is_none() && self.local == "xmlns")
    }

    /// Compare against a qualified name string without allocating.
    pub fn matches(&self, name: &str) -> bool {
        match &self.prefix {
            None => self.local == name,
            Some(p) => name
                .split_once(':')
                .is_some_and(|(np, nl)| np == p && nl == self.local),
        }
    }

    /// Get the full name as a string.
    pub fn full_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local),
            None => self.local.clone(),
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: QName::parse(name),
            value: value.into(),
        }
    }
}

/// An SVG/XML element.
///
/// The `class` and `style` attributes are mirrored by a [`ClassList`] and a
/// [`Style`]; fields are private so that every write keeps both views equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element name with optional prefix (e.g., "svg", "svg:rect")
    pub name: QName,
    attributes: Vec<Attribute>,
    classes: ClassList,
    style: Style,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: QName::parse(name),
            attributes: Vec::new(),
            classes: ClassList::default(),
            style: Style::default(),
        }
    }

    /// Build an element from parsed attributes. Later duplicates win.
    pub fn with_attributes(name: QName, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        let mut element = Self {
            name,
            attributes: Vec::new(),
            classes: ClassList::default(),
            style: Style::default(),
        };
        for attr in attributes {
            element.put_attribute(attr);
        }
        element
    }

    /// Check if this element has a specific qualified name.
    pub fn is(&self, name: &str) -> bool {
        self.name.matches(name)
    }

    pub fn is_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.is(n))
    }

    /// Get an attribute value by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(|a| a.value.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name.matches(name))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn has_attrs(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn attributes(&self) -> impl ExactSizeIterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Set an attribute value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.put_attribute(Attribute::new(name, value));
    }

    /// Insert or replace an attribute, keeping its namespace prefix.
    pub fn put_attribute(&mut self, attr: Attribute) {
        let key = attr.name.clone();
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == key) {
            existing.value = attr.value;
        } else {
            self.attributes.push(attr);
        }
        self.sync_from_attribute(&key);
    }

    /// Remove an attribute by qualified name.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let i = self.attributes.iter().position(|a| a.name.matches(name))?;
        let attr = self.attributes.remove(i);
        self.sync_from_attribute(&attr.name);
        Some(attr.value)
    }

    /// Keep only the attributes for which `f` returns true.
    pub fn retain_attrs(&mut self, mut f: impl FnMut(&Attribute) -> bool) {
        self.attributes.retain(|a| f(a));
        self.sync_from_attribute(&QName::new("class"));
        self.sync_from_attribute(&QName::new("style"));
    }

    /// Rewrite attribute values in place. `class` and `style` are re-read afterwards.
    pub fn map_attr_values(&mut self, mut f: impl FnMut(&QName, &str) -> Option<String>) {
        for attr in &mut self.attributes {
            if let Some(value) = f(&attr.name, &attr.value) {
                attr.value = value;
            }
        }
        self.sync_from_attribute(&QName::new("class"));
        self.sync_from_attribute(&QName::new("style"));
    }

    pub fn sort_attributes_by(&mut self, compare: impl FnMut(&Attribute, &Attribute) -> std::cmp::Ordering) {
        self.attributes.sort_by(compare);
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn has_class(&self, token: &str) -> bool {
        self.classes.contains(token)
    }

    pub fn add_class(&mut self, token: &str) {
        if self.classes.add(token) {
            self.write_classes();
        }
    }

    pub fn remove_class(&mut self, token: &str) {
        if self.classes.remove(token) {
            self.write_classes();
        }
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn set_style(&mut self, name: &str, value: &str, priority: Priority) {
        self.style.set(name, value, priority);
        self.write_style();
    }

    pub fn remove_style(&mut self, name: &str) -> Option<Declaration> {
        let removed = self.style.remove(name);
        if removed.is_some() {
            self.write_style();
        }
        removed
    }

    /// Replace the whole declaration list.
    pub fn replace_style(&mut self, style: Style) {
        self.style = style;
        self.write_style();
    }

    fn sync_from_attribute(&mut self, name: &QName) {
        if name.prefix.is_some() {
            return;
        }
        match name.local.as_str() {
            "class" => {
                self.classes = self.attr("class").map(ClassList::parse).unwrap_or_default();
            }
            "style" => {
                self.style = self.attr("style").map(Style::parse).unwrap_or_default();
            }
            _ => {}
        }
    }

    fn write_classes(&mut self) {
        let value = self.classes.to_string();
        self.write_mirrored("class", value);
    }

    fn write_style(&mut self) {
        let value = self.style.to_string();
        self.write_mirrored("style", value);
    }

    fn write_mirrored(&mut self, name: &str, value: String) {
        let existing = self.attributes.iter().position(|a| a.name.matches(name));
        match (existing, value.is_empty()) {
            (Some(i), true) => {
                self.attributes.remove(i);
            }
            (Some(i), false) => self.attributes[i].value = value,
            (None, true) => {}
            (None, false) => self.attributes.push(Attribute::new(name, value)),
        }
    }
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The document itself; holds the prolog, the root element and any trailing nodes.
    Root,
    /// An element node
    Element(Element),
    /// A text node
    Text(String),
    /// A comment node
    Comment(String),
    /// A CDATA section
    CData(String),
    /// A processing instruction (e.g., `<?xml version="1.0"?>`)
    ProcessingInstruction { target: String, body: String },
    /// DOCTYPE declaration body
    Doctype(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A complete SVG document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The first element child of the root (`<svg>` for a well-formed document).
    pub fn root_element(&self) -> Option<NodeId> {
        self.child_elements(self.root).next()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.kind_mut(id) {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Check whether `id` is an element with the given qualified name.
    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.is(name))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Iterate over child elements only (skip text, comments, etc.).
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.element(c).is_some())
    }

    /// A node is empty when it has no child nodes at all.
    pub fn is_empty(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn previous_sibling_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let i = siblings.iter().position(|&c| c == id)?;
        siblings[..i]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.element(c).is_some())
    }

    /// Walk up from `id` (exclusive) to the nearest element with the given name.
    pub fn closest_element(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.is_element(node, name) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Pre-order traversal of `id`'s subtree, `id` included.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    /// Every element reachable from the root, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .filter(|&id| self.element(id).is_some())
            .collect()
    }

    /// Concatenated text and CDATA content of the direct children.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            match self.kind(child) {
                NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    /// Allocate a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate a node and append it to `parent`.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.append_child(parent, id);
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Insert `child` at `index` in `parent`'s children, detaching it first.
    ///
    /// The index is clamped to the number of children.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(parent != child);
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Remove `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        true
    }

    /// Put `new` where `old` was; `old` becomes detached.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        if self.parent(old) != Some(parent) || old == new {
            return false;
        }
        self.detach(new);
        let Some(i) = self.index_in_parent(old) else {
            return false;
        };
        self.nodes[parent.0].children[i] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        true
    }

    /// Replace `range` of `parent`'s children with `replacement`, returning
    /// the removed (now detached) nodes.
    pub fn splice_children(
        &mut self,
        parent: NodeId,
        range: Range<usize>,
        replacement: Vec<NodeId>,
    ) -> Vec<NodeId> {
        for &node in &replacement {
            self.detach(node);
        }
        let len = self.children(parent).len();
        let range = range.start.min(len)..range.end.min(len);
        let removed: Vec<NodeId> = self.nodes[parent.0]
            .children
            .splice(range, replacement.iter().copied())
            .collect();
        for &node in &removed {
            self.nodes[node.0].parent = None;
        }
        for &node in &replacement {
            self.nodes[node.0].parent = Some(parent);
        }
        removed
    }

    /// Unlink `id` from its parent, if any.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Remove `id` from wherever it is in the tree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
    }

    /// Move `id`'s children to sit in its place, then detach `id`.
    pub fn unwrap_children(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let Some(i) = self.index_in_parent(id) else {
            return;
        };
        let children = std::mem::take(&mut self.nodes[id.0].children);
        self.splice_children(parent, i..i + 1, children);
    }

    /// Reorder `parent`'s children; `order` must be a permutation of them.
    pub fn reorder_children(&mut self, parent: NodeId, order: Vec<NodeId>) {
        debug_assert_eq!(order.len(), self.children(parent).len());
        self.nodes[parent.0].children = order;
    }

    /// Copy the subtree rooted at `id` into fresh, detached nodes.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = match self.kind(id) {
            NodeKind::Root => NodeKind::Root,
            NodeKind::Element(e) => NodeKind::Element(e.clone()),
            NodeKind::Text(t) => NodeKind::Text(t.clone()),
            NodeKind::Comment(c) => NodeKind::Comment(c.clone()),
            NodeKind::CData(c) => NodeKind::CData(c.clone()),
            NodeKind::ProcessingInstruction { target, body } => NodeKind::ProcessingInstruction {
                target: target.clone(),
                body: body.clone(),
            },
            NodeKind::Doctype(d) => NodeKind::Doctype(d.clone()),
        };
        let copy = self.create(kind);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Verify that every child's parent link points back at its parent.
    pub fn check_consistency(&self) -> bool {
        self.descendants(self.root).all(|id| {
            self.children(id)
                .iter()
                .all(|&c| self.parent(c) == Some(id))
        })
    }
}

/// Pre-order iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
