//! Move rules from `<style>` elements into the `style` attribute of the
//! elements they select.

use std::collections::{BTreeSet, HashSet};

use log::debug;
use serde::Deserialize;

use crate::ast::{Document, NodeId, NodeKind};
use crate::css::{Stylesheet, parse_stylesheet};
use crate::plugin::DocumentPass;
use crate::select::{ComplexSelector, SelectorList, SelectorTokens, Specificity, parse_selector, select_all_parsed};
use crate::style::Style;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InlineStylesParams {
    /// Only inline selectors that match exactly one element.
    pub only_matched_once: bool,
    /// Remove inlined selectors, and the classes and ids they used, from the document.
    pub remove_matched_selectors: bool,
    /// Media contexts to inline; `""` stands for rules outside any at-rule.
    pub use_mqs: Vec<String>,
    /// Pseudo-class and pseudo-element text to inline; `""` for none.
    pub use_pseudos: Vec<String>,
}

impl Default for InlineStylesParams {
    fn default() -> Self {
        Self {
            only_matched_once: true,
            remove_matched_selectors: true,
            use_mqs: vec![String::new(), "screen".into()],
            use_pseudos: vec![String::new()],
        }
    }
}

pub struct InlineStyles {
    params: InlineStylesParams,
}

impl InlineStyles {
    pub fn new(params: InlineStylesParams) -> Self {
        Self { params }
    }
}

/// A parsed `<style>` element.
struct Sheet {
    element: NodeId,
    stylesheet: Stylesheet,
    cdata: bool,
}

/// One selector of one style rule.
struct Record {
    sheet: usize,
    rule: usize,
    index: usize,
    selector: ComplexSelector,
    specificity: Specificity,
    declarations: Style,
    matched: Vec<NodeId>,
}

impl Record {
    fn eligible(&self, only_matched_once: bool) -> bool {
        match self.matched.len() {
            0 => false,
            1 => true,
            _ => !only_matched_once,
        }
    }
}

impl DocumentPass for InlineStyles {
    fn run(&self, mut doc: Document) -> Document {
        let mut sheets = collect_sheets(&doc);
        if sheets.is_empty() {
            return doc;
        }

        let mut records = self.flatten(&sheets);
        // highest specificity first, later rules first among equals
        records.sort_by_key(|r| r.specificity);
        records.reverse();

        let root = doc.root();
        for record in &mut records {
            let list = SelectorList(vec![record.selector.clone()]);
            record.matched = select_all_parsed(&doc, root, &list);
        }

        let only_once = self.params.only_matched_once;
        let mut removed: Vec<BTreeSet<(usize, usize)>> = vec![BTreeSet::new(); sheets.len()];
        for record in records.iter().filter(|r| r.eligible(only_once)) {
            for &id in &record.matched {
                let Some(element) = doc.element_mut(id) else {
                    continue;
                };
                for decl in record.declarations.iter() {
                    if element
                        .style()
                        .priority(&decl.name)
                        .is_some_and(|existing| existing >= decl.priority)
                    {
                        continue;
                    }
                    element.set_style(&decl.name, &decl.value, decl.priority);
                }
            }
            if self.params.remove_matched_selectors {
                removed[record.sheet].insert((record.rule, record.index));
            }
        }

        if !self.params.remove_matched_selectors {
            return doc;
        }

        for (sheet, removed) in sheets.iter_mut().zip(&removed) {
            sheet.stylesheet.remove_selectors(removed);
            sheet.stylesheet.prune_empty();
        }

        // a class or id that a remaining selector still uses has to stay
        let still_used = remaining_selector_tokens(&doc, &sheets);
        let referenced = referenced_ids(&doc);
        for record in records.iter().filter(|r| r.eligible(only_once)) {
            if let Some(class) = record.selector.single_class() {
                if still_used.classes.contains(class) {
                    continue;
                }
                for &id in &record.matched {
                    if let Some(element) = doc.element_mut(id) {
                        element.remove_class(class);
                    }
                }
            } else if let Some(ident) = record.selector.single_id() {
                if referenced.contains(ident) || still_used.ids.contains(ident) {
                    debug!("keeping id `{ident}`: it is still referenced");
                    continue;
                }
                for &id in &record.matched {
                    if let Some(element) = doc.element_mut(id)
                        && element.attr("id") == Some(ident)
                    {
                        element.remove_attr("id");
                    }
                }
            }
        }

        for sheet in &sheets {
            write_back(&mut doc, sheet);
        }

        doc
    }
}

impl InlineStyles {
    fn flatten(&self, sheets: &[Sheet]) -> Vec<Record> {
        let mut records = Vec::new();
        for (sheet_index, sheet) in sheets.iter().enumerate() {
            sheet.stylesheet.walk_style_rules(|rule, contexts| {
                let media_ok = if contexts.is_empty() {
                    self.params.use_mqs.iter().any(|m| m.is_empty())
                } else {
                    contexts.iter().all(|c| self.params.use_mqs.contains(c))
                };
                if !media_ok {
                    return;
                }
                let declarations = Style::from_declarations(rule.declarations.iter().cloned());
                for (index, text) in rule.selectors.iter().enumerate() {
                    let selector = match parse_selector(text) {
                        Ok(selector) => selector,
                        Err(e) => {
                            debug!("skipping selector: {e}");
                            continue;
                        }
                    };
                    if !self.params.use_pseudos.contains(&selector.pseudo_text()) {
                        continue;
                    }
                    let selector = selector.without_pseudos();
                    records.push(Record {
                        sheet: sheet_index,
                        rule: rule.id,
                        index,
                        specificity: selector.specificity(),
                        selector,
                        declarations: declarations.clone(),
                        matched: Vec::new(),
                    });
                }
            });
        }
        records
    }
}

fn collect_sheets(doc: &Document) -> Vec<Sheet> {
    let mut sheets = Vec::new();
    for id in doc.elements() {
        let Some(element) = doc.element(id) else {
            continue;
        };
        if !element.is("style") || doc.closest_element(id, "foreignObject").is_some() {
            continue;
        }
        if element.attr("type").is_some_and(|t| !t.is_empty() && t != "text/css") {
            continue;
        }
        let text = doc.text_content(id);
        if text.trim().is_empty() {
            continue;
        }
        match parse_stylesheet(&text) {
            Ok(stylesheet) => sheets.push(Sheet {
                element: id,
                stylesheet,
                cdata: doc
                    .children(id)
                    .iter()
                    .any(|&c| matches!(doc.kind(c), NodeKind::CData(_))),
            }),
            Err(e) => debug!("leaving <style> untouched: {e}"),
        }
    }
    sheets
}

/// Tokens used by the selectors left in the processed sheets, and by every
/// `<style>` element this pass did not process.
fn remaining_selector_tokens(doc: &Document, sheets: &[Sheet]) -> SelectorTokens {
    let mut tokens = SelectorTokens::default();
    for sheet in sheets {
        sheet.stylesheet.walk_style_rules(|rule, _| {
            for selector in &rule.selectors {
                tokens.scan(selector);
            }
        });
    }
    for id in doc.elements() {
        if doc.is_element(id, "style") && !sheets.iter().any(|s| s.element == id) {
            tokens.scan(&doc.text_content(id));
        }
    }
    tokens
}

/// Ids used by `url(#id)` references or `#id` hrefs anywhere in the document.
fn referenced_ids(doc: &Document) -> HashSet<String> {
    let mut ids = HashSet::new();
    for id in doc.elements() {
        let Some(element) = doc.element(id) else {
            continue;
        };
        for attr in element.attributes() {
            if attr.name.local == "href"
                && let Some(target) = attr.value.trim().strip_prefix('#')
            {
                ids.insert(target.to_string());
            }
            let mut rest = attr.value.as_str();
            while let Some(start) = rest.find("url(") {
                rest = &rest[start + 4..];
                let inner = rest.split(')').next().unwrap_or_default();
                let inner = inner.trim().trim_matches(|c| c == '"' || c == '\'');
                if let Some(target) = inner.strip_prefix('#') {
                    ids.insert(target.to_string());
                }
            }
        }
    }
    ids
}

/// Store the pruned sheet back into its element, or remove the element
/// (and a `<defs>` it leaves empty) when nothing is left.
fn write_back(doc: &mut Document, sheet: &Sheet) {
    if sheet.stylesheet.is_empty() {
        let parent = doc.parent(sheet.element);
        doc.remove(sheet.element);
        if let Some(parent) = parent
            && doc.is_element(parent, "defs")
            && doc.is_empty(parent)
        {
            doc.remove(parent);
        }
        return;
    }

    let css = sheet.stylesheet.to_string();
    let content = if sheet.cdata {
        NodeKind::CData(css)
    } else {
        NodeKind::Text(css)
    };
    let node = doc.create(content);
    let len = doc.children(sheet.element).len();
    doc.splice_children(sheet.element, 0..len, vec![node]);
}
