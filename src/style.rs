//! Inline style declarations and class sets.
//!
//! Both are materialized from (and written back to) the `style` and `class`
//! attributes of an [`Element`](crate::Element); the element keeps them in
//! sync, this module only models the values.

use std::fmt;

use crate::css::parse_declarations;

/// Declaration priority. `!important` beats normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    #[default]
    Normal,
    Important,
}

/// A single `name: value [!important]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub priority: Priority,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: impl Into<String>, priority: Priority) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            priority,
        }
    }

    pub fn is_important(&self) -> bool {
        self.priority == Priority::Important
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.value)?;
        if self.is_important() {
            f.write_str("!important")?;
        }
        Ok(())
    }
}

/// An ordered declaration list holding at most one entry per property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    declarations: Vec<Declaration>,
}

impl Style {
    /// Parse the text of a `style` attribute.
    ///
    /// Duplicate properties collapse with the cascade rule: a later
    /// declaration replaces an earlier one unless the earlier one is
    /// `!important` and the later one is not.
    pub fn parse(text: &str) -> Self {
        let mut style = Self::default();
        for decl in parse_declarations(text) {
            style.cascade(decl);
        }
        style
    }

    /// Build a list from declarations in source order, resolving duplicates
    /// the same way [`Style::parse`] does.
    pub fn from_declarations(declarations: impl IntoIterator<Item = Declaration>) -> Self {
        let mut style = Self::default();
        for decl in declarations {
            style.cascade(decl);
        }
        style
    }

    fn cascade(&mut self, decl: Declaration) {
        match self.position(&decl.name) {
            Some(i) if self.declarations[i].priority > decl.priority => {}
            Some(i) => self.declarations[i] = decl,
            None => self.declarations.push(decl),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.declarations.iter().position(|d| d.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declaration(name).map(|d| d.value.as_str())
    }

    pub fn priority(&self, name: &str) -> Option<Priority> {
        self.declaration(name).map(|d| d.priority)
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Set a property, replacing any existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>, priority: Priority) {
        let decl = Declaration::new(name, value, priority);
        match self.position(&decl.name) {
            Some(i) => self.declarations[i] = decl,
            None => self.declarations.push(decl),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Declaration> {
        let i = self.position(name)?;
        Some(self.declarations.remove(i))
    }

    pub fn retain(&mut self, f: impl FnMut(&Declaration) -> bool) {
        self.declarations.retain(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Declaration> {
        self.declarations.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, decl) in self.declarations.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{decl}")?;
        }
        Ok(())
    }
}

/// An ordered set of unique class tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList {
    tokens: Vec<String>,
}

impl ClassList {
    pub fn parse(text: &str) -> Self {
        let mut list = Self::default();
        for token in text.split_ascii_whitespace() {
            list.add(token);
        }
        list
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Returns `false` if the token was already present.
    pub fn add(&mut self, token: &str) -> bool {
        if token.is_empty() || self.contains(token) {
            return false;
        }
        self.tokens.push(token.to_string());
        true
    }

    /// Returns `false` if the token was not present.
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        self.tokens.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}
