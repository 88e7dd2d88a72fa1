//! Embedded stylesheet parsing and serialization.
//!
//! Only the structure needed for inlining is modelled: style rules keep their
//! selectors as text and their declarations parsed, at-rules keep their
//! prelude as text. Tokenizing is delegated to `cssparser`, which takes care
//! of strings, comments and nested blocks.

use std::collections::BTreeSet;
use std::fmt;

use cssparser::{Delimiter, ParseError, Parser, ParserInput, Token};
use thiserror::Error;

use crate::style::{Declaration, Priority};

/// A stylesheet that could not be parsed. Scoped to one `<style>` element.
#[derive(Debug, Clone, Error)]
#[error("stylesheet parse error at line {line}, column {column}: {message}")]
pub struct StylesheetError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// A parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Style(StyleRule),
    At(AtRule),
}

/// `selector, selector { declarations }`
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Unique within its stylesheet, assigned in source order.
    pub id: usize,
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

/// `@name prelude { ... }` or `@name prelude;`
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub prelude: String,
    pub block: AtRuleBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtRuleBlock {
    /// Statement at-rule such as `@import`.
    None,
    /// Conditional group rule such as `@media`.
    Rules(Vec<Rule>),
    /// Anything else (`@font-face`, `@keyframes`, ...), kept verbatim.
    Raw(String),
}

/// At-rules whose block holds nested rules.
const GROUPING_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "document",
    "-moz-document",
    "container",
    "layer",
    "scope",
];

impl AtRule {
    /// The text a selector inside this at-rule is filtered by:
    /// the media query list for `@media`, `@name prelude` otherwise.
    pub fn context(&self) -> String {
        if self.name.eq_ignore_ascii_case("media") {
            self.prelude.clone()
        } else if self.prelude.is_empty() {
            format!("@{}", self.name)
        } else {
            format!("@{} {}", self.name, self.prelude)
        }
    }
}

impl Stylesheet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Visit every style rule with the contexts of its enclosing at-rules,
    /// outermost first, in source order.
    pub fn walk_style_rules<'a>(&'a self, mut f: impl FnMut(&'a StyleRule, &[String])) {
        fn walk<'a>(rules: &'a [Rule], contexts: &mut Vec<String>, f: &mut impl FnMut(&'a StyleRule, &[String])) {
            for rule in rules {
                match rule {
                    Rule::Style(style) => f(style, contexts),
                    Rule::At(at) => {
                        if let AtRuleBlock::Rules(nested) = &at.block {
                            contexts.push(at.context());
                            walk(nested, contexts, f);
                            contexts.pop();
                        }
                    }
                }
            }
        }
        walk(&self.rules, &mut Vec::new(), &mut f);
    }

    /// Drop selectors addressed as `(rule id, selector index)`.
    pub fn remove_selectors(&mut self, removed: &BTreeSet<(usize, usize)>) {
        fn walk(rules: &mut [Rule], removed: &BTreeSet<(usize, usize)>) {
            for rule in rules {
                match rule {
                    Rule::Style(style) => {
                        let id = style.id;
                        let mut index = 0;
                        style.selectors.retain(|_| {
                            let keep = !removed.contains(&(id, index));
                            index += 1;
                            keep
                        });
                    }
                    Rule::At(at) => {
                        if let AtRuleBlock::Rules(nested) = &mut at.block {
                            walk(nested, removed);
                        }
                    }
                }
            }
        }
        walk(&mut self.rules, removed);
    }

    /// Remove style rules without selectors, then grouping at-rules left
    /// without rules, innermost first.
    pub fn prune_empty(&mut self) {
        fn prune(rules: &mut Vec<Rule>) {
            rules.retain_mut(|rule| match rule {
                Rule::Style(style) => !style.selectors.is_empty(),
                Rule::At(at) => match &mut at.block {
                    AtRuleBlock::Rules(nested) => {
                        prune(nested);
                        !nested.is_empty()
                    }
                    _ => true,
                },
            });
        }
        prune(&mut self.rules);
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rules(f, &self.rules)
    }
}

fn write_rules(f: &mut fmt::Formatter<'_>, rules: &[Rule]) -> fmt::Result {
    for rule in rules {
        match rule {
            Rule::Style(style) => {
                f.write_str(&style.selectors.join(","))?;
                f.write_str("{")?;
                for (i, decl) in style.declarations.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, "{decl}")?;
                }
                f.write_str("}")?;
            }
            Rule::At(at) => {
                write!(f, "@{}", at.name)?;
                if !at.prelude.is_empty() {
                    write!(f, " {}", at.prelude)?;
                }
                match &at.block {
                    AtRuleBlock::None => f.write_str(";")?,
                    AtRuleBlock::Rules(nested) => {
                        f.write_str("{")?;
                        write_rules(f, nested)?;
                        f.write_str("}")?;
                    }
                    AtRuleBlock::Raw(raw) => write!(f, "{{{}}}", raw.trim())?,
                }
            }
        }
    }
    Ok(())
}

/// Parse the text of a `<style>` element.
pub fn parse_stylesheet(text: &str) -> Result<Stylesheet, StylesheetError> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut next_id = 0;
    let rules = parse_rule_list(&mut parser, &mut next_id)?;
    Ok(Stylesheet { rules })
}

fn parse_rule_list(parser: &mut Parser<'_, '_>, next_id: &mut usize) -> Result<Vec<Rule>, StylesheetError> {
    let mut rules = Vec::new();
    loop {
        parser.skip_whitespace();
        let start = parser.position();
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::CDO | Token::CDC => {}
            Token::AtKeyword(name) => {
                let at = parse_at_rule(parser, name.to_string(), next_id)?;
                rules.push(Rule::At(at));
            }
            Token::CurlyBracketBlock => return Err(error_at(parser, "rule without selector")),
            Token::CloseCurlyBracket | Token::Semicolon => {
                return Err(error_at(parser, "unexpected token at rule start"));
            }
            _ => {
                let style = parse_style_rule(parser, start, next_id)?;
                rules.push(Rule::Style(style));
            }
        }
    }
    Ok(rules)
}

fn parse_at_rule<'i>(
    parser: &mut Parser<'i, '_>,
    name: String,
    next_id: &mut usize,
) -> Result<AtRule, StylesheetError> {
    let start = parser.position();
    loop {
        match parser.next_including_whitespace_and_comments() {
            Ok(Token::Semicolon) => {
                let prelude = parser.slice_from(start).trim_end_matches(';');
                return Ok(AtRule {
                    name,
                    prelude: normalize_whitespace(prelude),
                    block: AtRuleBlock::None,
                });
            }
            Ok(Token::CurlyBracketBlock) => break,
            Ok(Token::CloseCurlyBracket) => return Err(error_at(parser, "unbalanced `}` in at-rule prelude")),
            Ok(_) => {}
            Err(_) => {
                return Ok(AtRule {
                    name,
                    prelude: normalize_whitespace(parser.slice_from(start)),
                    block: AtRuleBlock::None,
                });
            }
        }
    }

    let prelude = normalize_whitespace(parser.slice_from(start).trim_end_matches('{'));
    let grouping = GROUPING_AT_RULES
        .iter()
        .any(|g| name.eq_ignore_ascii_case(g));

    let block = if grouping {
        let location = parser.current_source_location();
        let nested = parser
            .parse_nested_block(|p| Ok::<_, ParseError<'i, ()>>(parse_rule_list(p, next_id)))
            .map_err(|_| StylesheetError {
                message: format!("malformed @{name} block"),
                line: location.line + 1,
                column: location.column,
            })??;
        AtRuleBlock::Rules(nested)
    } else {
        AtRuleBlock::Raw(consume_block(parser).to_string())
    };

    Ok(AtRule { name, prelude, block })
}

fn parse_style_rule<'i>(
    parser: &mut Parser<'i, '_>,
    start: cssparser::SourcePosition,
    next_id: &mut usize,
) -> Result<StyleRule, StylesheetError> {
    loop {
        match parser.next_including_whitespace_and_comments() {
            Ok(Token::CurlyBracketBlock) => break,
            Ok(Token::CloseCurlyBracket) | Ok(Token::Semicolon) => {
                return Err(error_at(parser, "unexpected token in selector"));
            }
            Ok(_) => {}
            Err(_) => return Err(error_at(parser, "selector without declaration block")),
        }
    }

    let prelude = parser.slice_from(start).trim_end_matches('{');
    let selectors = split_selector_list(prelude);
    let body = consume_block(parser);
    let id = *next_id;
    *next_id += 1;

    Ok(StyleRule {
        id,
        selectors,
        declarations: parse_declarations(body),
    })
}

/// Consume the block whose opening token was just returned, yielding its raw text.
fn consume_block<'i>(parser: &mut Parser<'i, '_>) -> &'i str {
    parser
        .parse_nested_block(|p| {
            let start = p.position();
            while p.next_including_whitespace_and_comments().is_ok() {}
            Ok::<_, ParseError<'i, ()>>(p.slice_from(start))
        })
        .unwrap_or("")
}

/// Split a selector list on top-level commas.
pub fn split_selector_list(text: &str) -> Vec<String> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut selectors = Vec::new();
    loop {
        let item = parser.parse_until_before(Delimiter::Comma, |p| {
            let start = p.position();
            while p.next_including_whitespace_and_comments().is_ok() {}
            Ok::<_, ParseError<'_, ()>>(p.slice_from(start))
        });
        if let Ok(item) = item {
            selectors.push(normalize_whitespace(&strip_comments(item)));
        }
        if parser.next().is_err() {
            break;
        }
    }
    selectors
}

/// Parse a declaration list, as found in a rule body or a `style` attribute.
///
/// Malformed declarations are skipped.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();
    while !parser.is_exhausted() {
        let raw = parser.parse_until_after(Delimiter::Semicolon, |p| {
            let start = p.position();
            while p.next_including_whitespace_and_comments().is_ok() {}
            Ok::<_, ParseError<'_, ()>>(p.slice_from(start))
        });
        if let Ok(raw) = raw
            && let Some(decl) = split_declaration(&strip_comments(raw))
        {
            declarations.push(decl);
        }
    }
    declarations
}

fn split_declaration(raw: &str) -> Option<Declaration> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    let name = if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    };

    let mut value = value.trim();
    let mut priority = Priority::Normal;
    if let Some(bang) = value.rfind('!')
        && value[bang + 1..].trim().eq_ignore_ascii_case("important")
    {
        priority = Priority::Important;
        value = value[..bang].trim_end();
    }
    if value.is_empty() {
        return None;
    }
    Some(Declaration::new(name, value, priority))
}

/// Drop `/* ... */` comments outside of quoted strings.
fn strip_comments(text: &str) -> String {
    if !text.contains("/*") {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                out.push(c);
            }
            None if c == '/' && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            None => out.push(c),
        }
    }
    out
}

fn normalize_whitespace(text: &str) -> String {
    text.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

fn error_at(parser: &Parser<'_, '_>, message: &str) -> StylesheetError {
    let location = parser.current_source_location();
    StylesheetError {
        message: message.to_string(),
        line: location.line + 1,
        column: location.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules_and_selectors() {
        let sheet = parse_stylesheet(".a, #b > rect { fill: red; stroke: blue !important }").unwrap();
        assert_eq!(sheet.rules.len(), 1);
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(rule.selectors, vec![".a", "#b > rect"]);
        assert_eq!(rule.declarations.len(), 2);
        assert_eq!(rule.declarations[1].priority, Priority::Important);
    }

    #[test]
    fn test_parse_media_and_raw_at_rules() {
        let css = "@import url(x.css);\n@font-face { font-family: A; src: url(a.woff) }\n@media screen and (min-width: 10px) { .a { fill: red } }";
        let sheet = parse_stylesheet(css).unwrap();
        assert_eq!(sheet.rules.len(), 3);
        let Rule::At(media) = &sheet.rules[2] else {
            panic!("expected an at-rule");
        };
        assert_eq!(media.context(), "screen and (min-width: 10px)");
        assert!(matches!(&media.block, AtRuleBlock::Rules(r) if r.len() == 1));
        assert_eq!(
            sheet.to_string(),
            "@import url(x.css);@font-face{font-family: A; src: url(a.woff)}@media screen and (min-width: 10px){.a{fill:red}}"
        );
    }

    #[test]
    fn test_attribute_selector_kept_whole() {
        let sheet = parse_stylesheet("rect[fill=\"a,b\"]{x:y}").unwrap();
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(rule.selectors, vec!["rect[fill=\"a,b\"]"]);
    }

    #[test]
    fn test_parse_error_without_block() {
        assert!(parse_stylesheet(".a { fill: red } .b").is_err());
        assert!(parse_stylesheet("{ fill: red }").is_err());
    }

    #[test]
    fn test_comments_are_ignored() {
        let sheet = parse_stylesheet("/* c */ .a /* d */ { fill: /* e */ red }").unwrap();
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(rule.selectors, vec![".a"]);
        assert_eq!(rule.declarations[0].value, "red");
    }

    #[test]
    fn test_remove_selectors_and_prune() {
        let mut sheet = parse_stylesheet(".a{x:y} @media screen{.b,.c{x:y}}").unwrap();
        let removed = BTreeSet::from([(0, 0), (1, 0), (1, 1)]);
        sheet.remove_selectors(&removed);
        sheet.prune_empty();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_walk_style_rules_reports_contexts() {
        let sheet = parse_stylesheet(".a{x:y}@media print{@supports (x:y){.b{x:y}}}").unwrap();
        let mut seen = Vec::new();
        sheet.walk_style_rules(|rule, contexts| seen.push((rule.selectors[0].clone(), contexts.to_vec())));
        assert_eq!(seen[0], (".a".to_string(), vec![]));
        assert_eq!(
            seen[1],
            (".b".to_string(), vec!["print".to_string(), "@supports (x:y)".to_string()])
        );
    }
}
