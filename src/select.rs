//! CSS selector parsing and matching against a [`Document`].
//!
//! Complex selectors are matched right-to-left: the rightmost compound must
//! match the candidate element, then each combinator walks up or sideways
//! through the real tree, backtracking when a branch fails.

use std::collections::HashSet;
use std::fmt::{self, Write as _};

use cssparser::{ParseError, ParseErrorKind, Parser, ParserInput, Token};
use thiserror::Error;

use crate::ast::{Document, Element, NodeId, NodeKind};

/// A selector that could not be parsed.
#[derive(Debug, Clone, Error)]
#[error("invalid selector `{selector}`: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

type SelectorResult<'i, T> = Result<T, ParseError<'i, String>>;

/// Combinator between two compound selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: ancestor descendant
    Descendant,
    /// `>`: parent > child
    Child,
    /// `+`: prev + next
    NextSibling,
    /// `~`: prev ~ subsequent
    SubsequentSibling,
}

/// Attribute selector operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=val]`
    Equals,
    /// `[attr~=val]`
    Includes,
    /// `[attr|=val]`
    DashMatch,
    /// `[attr^=val]`
    Prefix,
    /// `[attr$=val]`
    Suffix,
    /// `[attr*=val]`
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    /// Qualified name, `prefix:local` for namespaced attributes.
    pub name: String,
    pub op: AttrOp,
    pub value: String,
    pub case_insensitive: bool,
}

/// `an+b` coefficients of the `:nth-*` pseudo-classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i32,
    pub b: i32,
}

impl Nth {
    /// Whether a 1-based position is selected by `an+b` for some `n >= 0`.
    pub fn matches(self, position: i32) -> bool {
        // widened so that extreme coefficients cannot overflow
        let (a, diff) = (i64::from(self.a), i64::from(position) - i64::from(self.b));
        if a == 0 {
            return diff == 0;
        }
        diff % a == 0 && diff / a >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    Root,
    Empty,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Not(Vec<Compound>),
    /// State-dependent pseudo-classes (`:hover`, `:lang(en)`, ...). They parse
    /// but never match a static document.
    Dynamic { name: String, args: Option<String> },
}

const DYNAMIC_PSEUDO_CLASSES: &[&str] = &[
    "hover",
    "active",
    "focus",
    "focus-visible",
    "focus-within",
    "visited",
    "link",
    "any-link",
    "target",
    "checked",
    "disabled",
    "enabled",
    "indeterminate",
    "default",
    "required",
    "optional",
    "valid",
    "invalid",
    "read-only",
    "read-write",
    "placeholder-shown",
    "defined",
];

const DYNAMIC_PSEUDO_FUNCTIONS: &[&str] = &["lang", "dir"];

const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

/// A single simple selector component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute(AttributeSelector),
    PseudoClass(PseudoClass),
    PseudoElement(String),
}

impl SimpleSelector {
    fn is_pseudo(&self) -> bool {
        matches!(self, Self::PseudoClass(_) | Self::PseudoElement(_))
    }
}

/// Simple selectors without a combinator between them (e.g. `rect.a#b`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    pub simples: Vec<SimpleSelector>,
}

/// Compounds joined by combinators, stored left to right;
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    pub combinators: Vec<Combinator>,
}

/// Comma-separated selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// `(ids, classes/attributes/pseudo-classes, types/pseudo-elements)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl std::ops::Add for Specificity {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0, self.1 + other.1, self.2 + other.2)
    }
}

impl Compound {
    pub fn specificity(&self) -> Specificity {
        self.simples
            .iter()
            .map(|simple| match simple {
                SimpleSelector::Universal => Specificity::default(),
                SimpleSelector::Id(_) => Specificity(1, 0, 0),
                SimpleSelector::Class(_) | SimpleSelector::Attribute(_) => Specificity(0, 1, 0),
                SimpleSelector::PseudoClass(PseudoClass::Not(inner)) => inner
                    .iter()
                    .map(Compound::specificity)
                    .max()
                    .unwrap_or_default(),
                SimpleSelector::PseudoClass(_) => Specificity(0, 1, 0),
                SimpleSelector::Type(_) | SimpleSelector::PseudoElement(_) => Specificity(0, 0, 1),
            })
            .fold(Specificity::default(), |acc, s| acc + s)
    }
}

impl ComplexSelector {
    pub fn specificity(&self) -> Specificity {
        self.compounds
            .iter()
            .map(Compound::specificity)
            .fold(Specificity::default(), |acc, s| acc + s)
    }

    /// Text of every top-level pseudo-class and pseudo-element, in order.
    pub fn pseudo_text(&self) -> String {
        let mut out = String::new();
        for simple in self.compounds.iter().flat_map(|c| &c.simples) {
            if simple.is_pseudo() {
                // writing into a String cannot fail
                let _ = write!(out, "{simple}");
            }
        }
        out
    }

    /// The same selector with pseudo components removed; a compound left
    /// empty becomes `*`.
    pub fn without_pseudos(&self) -> Self {
        let compounds = self
            .compounds
            .iter()
            .map(|compound| {
                let simples: Vec<_> = compound
                    .simples
                    .iter()
                    .filter(|s| !s.is_pseudo())
                    .cloned()
                    .collect();
                if simples.is_empty() {
                    Compound {
                        simples: vec![SimpleSelector::Universal],
                    }
                } else {
                    Compound { simples }
                }
            })
            .collect();
        Self {
            compounds,
            combinators: self.combinators.clone(),
        }
    }

    fn single_simple(&self) -> Option<&SimpleSelector> {
        match self.compounds.as_slice() {
            [only] if only.simples.len() == 1 => only.simples.first(),
            _ => None,
        }
    }

    /// `Some("a")` if the selector is exactly `.a`.
    pub fn single_class(&self) -> Option<&str> {
        match self.single_simple()? {
            SimpleSelector::Class(name) => Some(name),
            _ => None,
        }
    }

    /// `Some("a")` if the selector is exactly `#a`.
    pub fn single_id(&self) -> Option<&str> {
        match self.single_simple()? {
            SimpleSelector::Id(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Universal => f.write_str("*"),
            Self::Type(name) => cssparser::serialize_identifier(name, f),
            Self::Id(id) => {
                f.write_str("#")?;
                cssparser::serialize_identifier(id, f)
            }
            Self::Class(class) => {
                f.write_str(".")?;
                cssparser::serialize_identifier(class, f)
            }
            Self::Attribute(attr) => {
                f.write_str("[")?;
                match attr.name.split_once(':') {
                    Some((prefix, local)) => {
                        cssparser::serialize_identifier(prefix, f)?;
                        f.write_str("|")?;
                        cssparser::serialize_identifier(local, f)?;
                    }
                    None => cssparser::serialize_identifier(&attr.name, f)?,
                }
                let op = match attr.op {
                    AttrOp::Exists => return f.write_str("]"),
                    AttrOp::Equals => "=",
                    AttrOp::Includes => "~=",
                    AttrOp::DashMatch => "|=",
                    AttrOp::Prefix => "^=",
                    AttrOp::Suffix => "$=",
                    AttrOp::Substring => "*=",
                };
                f.write_str(op)?;
                cssparser::serialize_string(&attr.value, f)?;
                if attr.case_insensitive {
                    f.write_str(" i")?;
                }
                f.write_str("]")
            }
            Self::PseudoClass(pc) => write!(f, "{pc}"),
            Self::PseudoElement(name) => write!(f, "::{name}"),
        }
    }
}

impl fmt::Display for Nth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.a, self.b) {
            (0, b) => write!(f, "{b}"),
            (a, 0) => write!(f, "{a}n"),
            (a, b) if b > 0 => write!(f, "{a}n+{b}"),
            (a, b) => write!(f, "{a}n{b}"),
        }
    }
}

impl fmt::Display for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstChild => f.write_str(":first-child"),
            Self::LastChild => f.write_str(":last-child"),
            Self::OnlyChild => f.write_str(":only-child"),
            Self::FirstOfType => f.write_str(":first-of-type"),
            Self::LastOfType => f.write_str(":last-of-type"),
            Self::OnlyOfType => f.write_str(":only-of-type"),
            Self::Root => f.write_str(":root"),
            Self::Empty => f.write_str(":empty"),
            Self::NthChild(nth) => write!(f, ":nth-child({nth})"),
            Self::NthLastChild(nth) => write!(f, ":nth-last-child({nth})"),
            Self::NthOfType(nth) => write!(f, ":nth-of-type({nth})"),
            Self::NthLastOfType(nth) => write!(f, ":nth-last-of-type({nth})"),
            Self::Not(list) => {
                f.write_str(":not(")?;
                for (i, compound) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{compound}")?;
                }
                f.write_str(")")
            }
            Self::Dynamic { name, args: None } => write!(f, ":{name}"),
            Self::Dynamic {
                name,
                args: Some(args),
            } => write!(f, ":{name}({args})"),
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for simple in &self.simples {
            write!(f, "{simple}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if i > 0 {
                f.write_str(match self.combinators[i - 1] {
                    Combinator::Descendant => " ",
                    Combinator::Child => ">",
                    Combinator::NextSibling => "+",
                    Combinator::SubsequentSibling => "~",
                })?;
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, complex) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{complex}")?;
        }
        Ok(())
    }
}

/// Parse a selector list such as `g > rect.a, #b`.
pub fn parse_selector_list(text: &str) -> Result<SelectorList, SelectorError> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_list(&mut parser).map_err(|e| SelectorError {
        selector: text.to_string(),
        message: describe(e),
    })
}

/// Parse a single complex selector; a list with several entries is an error.
pub fn parse_selector(text: &str) -> Result<ComplexSelector, SelectorError> {
    let SelectorList(mut list) = parse_selector_list(text)?;
    if list.len() != 1 {
        return Err(SelectorError {
            selector: text.to_string(),
            message: "expected exactly one selector".into(),
        });
    }
    Ok(list.remove(0))
}

fn describe(error: ParseError<'_, String>) -> String {
    match error.kind {
        ParseErrorKind::Custom(message) => message,
        ParseErrorKind::Basic(kind) => format!("{kind:?}"),
    }
}

fn parse_list<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, SelectorList> {
    let mut list = Vec::new();
    loop {
        parser.skip_whitespace();
        list.push(parse_complex(parser)?);
        parser.skip_whitespace();
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        if token != Token::Comma {
            return Err(parser.new_unexpected_token_error(token));
        }
    }
    Ok(SelectorList(list))
}

fn parse_complex<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, ComplexSelector> {
    let mut compounds = vec![parse_compound(parser)?];
    let mut combinators = Vec::new();

    loop {
        let mut saw_whitespace = false;
        let combinator = loop {
            let before = parser.state();
            let token = match parser.next_including_whitespace() {
                Ok(token) => token.clone(),
                Err(_) => {
                    parser.reset(&before);
                    return Ok(ComplexSelector {
                        compounds,
                        combinators,
                    });
                }
            };
            match token {
                Token::WhiteSpace(_) => saw_whitespace = true,
                Token::Delim('>') => break Combinator::Child,
                Token::Delim('+') => break Combinator::NextSibling,
                Token::Delim('~') => break Combinator::SubsequentSibling,
                Token::Comma => {
                    parser.reset(&before);
                    return Ok(ComplexSelector {
                        compounds,
                        combinators,
                    });
                }
                _ if saw_whitespace => {
                    parser.reset(&before);
                    break Combinator::Descendant;
                }
                token => return Err(parser.new_unexpected_token_error(token)),
            }
        };
        parser.skip_whitespace();
        compounds.push(parse_compound(parser)?);
        combinators.push(combinator);
    }
}

fn parse_compound<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, Compound> {
    let mut simples = Vec::new();
    loop {
        let before = parser.state();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let simple = match token {
            Token::Ident(name) if simples.is_empty() => SimpleSelector::Type(name.to_string()),
            Token::Delim('*') if simples.is_empty() => SimpleSelector::Universal,
            Token::Ident(_) | Token::Delim('*') => {
                return Err(parser.new_custom_error("type selector must come first".to_string()));
            }
            Token::IDHash(id) => SimpleSelector::Id(id.to_string()),
            Token::Delim('.') => match parser.next_including_whitespace()?.clone() {
                Token::Ident(class) => SimpleSelector::Class(class.to_string()),
                token => return Err(parser.new_unexpected_token_error(token)),
            },
            Token::SquareBracketBlock => {
                SimpleSelector::Attribute(parser.parse_nested_block(parse_attribute)?)
            }
            Token::Colon => parse_pseudo(parser)?,
            _ => {
                parser.reset(&before);
                break;
            }
        };
        simples.push(simple);
    }
    if simples.is_empty() {
        return Err(parser.new_custom_error("expected a selector".to_string()));
    }
    Ok(Compound { simples })
}

fn parse_attribute<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, AttributeSelector> {
    let mut name = match parser.next()?.clone() {
        Token::Ident(name) => name.to_string(),
        token => return Err(parser.new_unexpected_token_error(token)),
    };
    let state = parser.state();
    if matches!(parser.next_including_whitespace(), Ok(Token::Delim('|'))) {
        match parser.next_including_whitespace()?.clone() {
            Token::Ident(local) => name = format!("{name}:{}", &*local),
            token => return Err(parser.new_unexpected_token_error(token)),
        }
    } else {
        parser.reset(&state);
    }

    let op = match parser.next() {
        Err(_) => {
            return Ok(AttributeSelector {
                name,
                op: AttrOp::Exists,
                value: String::new(),
                case_insensitive: false,
            });
        }
        Ok(token) => match token.clone() {
            Token::Delim('=') => AttrOp::Equals,
            Token::IncludeMatch => AttrOp::Includes,
            Token::DashMatch => AttrOp::DashMatch,
            Token::PrefixMatch => AttrOp::Prefix,
            Token::SuffixMatch => AttrOp::Suffix,
            Token::SubstringMatch => AttrOp::Substring,
            token => return Err(parser.new_unexpected_token_error(token)),
        },
    };

    let value = match parser.next()?.clone() {
        Token::Ident(value) | Token::QuotedString(value) => value.to_string(),
        token => return Err(parser.new_unexpected_token_error(token)),
    };

    let case_insensitive = match parser.next() {
        Err(_) => false,
        Ok(token) => match token.clone() {
            Token::Ident(flag) if flag.eq_ignore_ascii_case("i") => true,
            Token::Ident(flag) if flag.eq_ignore_ascii_case("s") => false,
            token => return Err(parser.new_unexpected_token_error(token)),
        },
    };

    Ok(AttributeSelector {
        name,
        op,
        value,
        case_insensitive,
    })
}

fn parse_pseudo<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, SimpleSelector> {
    match parser.next_including_whitespace()?.clone() {
        Token::Colon => match parser.next_including_whitespace()?.clone() {
            Token::Ident(name) => Ok(SimpleSelector::PseudoElement(name.to_ascii_lowercase())),
            token => Err(parser.new_unexpected_token_error(token)),
        },
        Token::Ident(name) => {
            let lower = name.to_ascii_lowercase();
            let pc = match lower.as_str() {
                "first-child" => PseudoClass::FirstChild,
                "last-child" => PseudoClass::LastChild,
                "only-child" => PseudoClass::OnlyChild,
                "first-of-type" => PseudoClass::FirstOfType,
                "last-of-type" => PseudoClass::LastOfType,
                "only-of-type" => PseudoClass::OnlyOfType,
                "root" => PseudoClass::Root,
                "empty" => PseudoClass::Empty,
                other if LEGACY_PSEUDO_ELEMENTS.contains(&other) => {
                    return Ok(SimpleSelector::PseudoElement(lower));
                }
                other if DYNAMIC_PSEUDO_CLASSES.contains(&other) => PseudoClass::Dynamic {
                    name: lower,
                    args: None,
                },
                _ => return Err(parser.new_custom_error(format!("unknown pseudo-class `:{}`", &*name))),
            };
            Ok(SimpleSelector::PseudoClass(pc))
        }
        Token::Function(name) => {
            let lower = name.to_ascii_lowercase();
            let pc = match lower.as_str() {
                "nth-child" => PseudoClass::NthChild(parser.parse_nested_block(parse_nth)?),
                "nth-last-child" => PseudoClass::NthLastChild(parser.parse_nested_block(parse_nth)?),
                "nth-of-type" => PseudoClass::NthOfType(parser.parse_nested_block(parse_nth)?),
                "nth-last-of-type" => {
                    PseudoClass::NthLastOfType(parser.parse_nested_block(parse_nth)?)
                }
                "not" => PseudoClass::Not(parser.parse_nested_block(|p| {
                    p.parse_comma_separated(|item| {
                        item.skip_whitespace();
                        parse_compound(item)
                    })
                })?),
                other if DYNAMIC_PSEUDO_FUNCTIONS.contains(&other) => {
                    let args = parser.parse_nested_block(|p| {
                        let start = p.position();
                        while p.next().is_ok() {}
                        Ok::<_, ParseError<'i, String>>(p.slice_from(start).trim().to_string())
                    })?;
                    PseudoClass::Dynamic {
                        name: lower,
                        args: Some(args),
                    }
                }
                _ => return Err(parser.new_custom_error(format!("unknown pseudo-class `:{}()`", &*name))),
            };
            Ok(SimpleSelector::PseudoClass(pc))
        }
        token => Err(parser.new_unexpected_token_error(token)),
    }
}

fn parse_nth<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, Nth> {
    let (a, b) = cssparser::parse_nth(parser)?;
    Ok(Nth { a, b })
}

/// Class names and ids that selector text refers to.
///
/// Collected from the token stream rather than the parsed selector, so
/// selectors this module rejects and whole stylesheets can be scanned too.
/// Hash colors in declarations show up as ids; callers only use the sets to
/// keep things.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorTokens {
    pub classes: HashSet<String>,
    pub ids: HashSet<String>,
}

impl SelectorTokens {
    pub fn scan(&mut self, text: &str) {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        self.scan_tokens(&mut parser);
    }

    fn scan_tokens<'i>(&mut self, parser: &mut Parser<'i, '_>) {
        let mut after_dot = false;
        while let Ok(token) = parser.next_including_whitespace() {
            let token = token.clone();
            let is_dot = matches!(token, Token::Delim('.'));
            match token {
                Token::Ident(name) if after_dot => {
                    self.classes.insert(name.to_string());
                }
                Token::IDHash(name) | Token::Hash(name) => {
                    self.ids.insert(name.to_string());
                }
                Token::Function(_)
                | Token::ParenthesisBlock
                | Token::SquareBracketBlock
                | Token::CurlyBracketBlock => {
                    let _ = parser.parse_nested_block(|nested| {
                        self.scan_tokens(nested);
                        Ok::<_, ParseError<'i, ()>>(())
                    });
                }
                _ => {}
            }
            after_dot = is_dot;
        }
    }
}

/// Every element under `scope` (exclusive) matching `selector`, in document order.
pub fn select_all(doc: &Document, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
    let list = parse_selector_list(selector)?;
    Ok(select_all_parsed(doc, scope, &list))
}

pub fn select_all_parsed(doc: &Document, scope: NodeId, list: &SelectorList) -> Vec<NodeId> {
    doc.descendants(scope)
        .filter(|&id| id != scope)
        .filter(|&id| list.0.iter().any(|complex| matches(doc, id, complex)))
        .collect()
}

/// Test whether the element `id` matches a complex selector.
pub fn matches(doc: &Document, id: NodeId, selector: &ComplexSelector) -> bool {
    match selector.compounds.len() {
        0 => false,
        n => matches_from(doc, id, selector, n - 1),
    }
}

fn matches_from(doc: &Document, id: NodeId, selector: &ComplexSelector, index: usize) -> bool {
    if !matches_compound(doc, id, &selector.compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }
    let next = index - 1;
    match selector.combinators[next] {
        Combinator::Descendant => {
            let mut ancestor = parent_element(doc, id);
            while let Some(anc) = ancestor {
                if matches_from(doc, anc, selector, next) {
                    return true;
                }
                ancestor = parent_element(doc, anc);
            }
            false
        }
        Combinator::Child => {
            parent_element(doc, id).is_some_and(|parent| matches_from(doc, parent, selector, next))
        }
        Combinator::NextSibling => doc
            .previous_sibling_element(id)
            .is_some_and(|prev| matches_from(doc, prev, selector, next)),
        Combinator::SubsequentSibling => {
            let mut sibling = doc.previous_sibling_element(id);
            while let Some(sib) = sibling {
                if matches_from(doc, sib, selector, next) {
                    return true;
                }
                sibling = doc.previous_sibling_element(sib);
            }
            false
        }
    }
}

fn parent_element(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.parent(id).filter(|&p| doc.element(p).is_some())
}

/// Test whether the element `id` matches every simple selector of a compound.
pub fn matches_compound(doc: &Document, id: NodeId, compound: &Compound) -> bool {
    let Some(element) = doc.element(id) else {
        return false;
    };
    compound
        .simples
        .iter()
        .all(|simple| matches_simple(doc, id, element, simple))
}

fn matches_simple(doc: &Document, id: NodeId, element: &Element, simple: &SimpleSelector) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(name) => element.is(name),
        SimpleSelector::Id(want) => element.attr("id") == Some(want.as_str()),
        SimpleSelector::Class(class) => element.has_class(class),
        SimpleSelector::Attribute(attr) => matches_attribute(element, attr),
        SimpleSelector::PseudoClass(pc) => matches_pseudo_class(doc, id, element, pc),
        // pseudo-elements never correspond to a tree element
        SimpleSelector::PseudoElement(_) => false,
    }
}

fn matches_attribute(element: &Element, selector: &AttributeSelector) -> bool {
    let Some(actual) = element.attr(&selector.name) else {
        return false;
    };
    let (actual, want) = if selector.case_insensitive {
        (actual.to_ascii_lowercase(), selector.value.to_ascii_lowercase())
    } else {
        (actual.to_string(), selector.value.clone())
    };
    match selector.op {
        AttrOp::Exists => true,
        AttrOp::Equals => actual == want,
        AttrOp::Includes => actual.split_ascii_whitespace().any(|word| word == want),
        AttrOp::DashMatch => actual == want || actual.starts_with(&format!("{want}-")),
        AttrOp::Prefix => !want.is_empty() && actual.starts_with(&want),
        AttrOp::Suffix => !want.is_empty() && actual.ends_with(&want),
        AttrOp::Substring => !want.is_empty() && actual.contains(&want),
    }
}

fn matches_pseudo_class(doc: &Document, id: NodeId, element: &Element, pc: &PseudoClass) -> bool {
    let siblings = || -> Vec<NodeId> {
        match doc.parent(id) {
            Some(parent) => doc.child_elements(parent).collect(),
            None => vec![id],
        }
    };
    let same_type = |other: NodeId| doc.element(other).is_some_and(|e| e.name == element.name);
    let position = |list: &[NodeId]| list.iter().position(|&s| s == id).map_or(0, |i| i as i32 + 1);

    match pc {
        PseudoClass::FirstChild => siblings().first() == Some(&id),
        PseudoClass::LastChild => siblings().last() == Some(&id),
        PseudoClass::OnlyChild => siblings().len() == 1,
        PseudoClass::FirstOfType => siblings().into_iter().find(|&s| same_type(s)) == Some(id),
        PseudoClass::LastOfType => siblings().into_iter().rev().find(|&s| same_type(s)) == Some(id),
        PseudoClass::OnlyOfType => siblings().into_iter().filter(|&s| same_type(s)).count() == 1,
        PseudoClass::Root => doc
            .parent(id)
            .is_some_and(|p| matches!(doc.kind(p), NodeKind::Root)),
        PseudoClass::Empty => doc.children(id).iter().all(|&c| match doc.kind(c) {
            NodeKind::Comment(_) | NodeKind::ProcessingInstruction { .. } => true,
            NodeKind::Text(t) | NodeKind::CData(t) => t.is_empty(),
            _ => false,
        }),
        PseudoClass::NthChild(nth) => nth.matches(position(&siblings())),
        PseudoClass::NthLastChild(nth) => {
            let mut list = siblings();
            list.reverse();
            nth.matches(position(&list))
        }
        PseudoClass::NthOfType(nth) => {
            let list: Vec<_> = siblings().into_iter().filter(|&s| same_type(s)).collect();
            nth.matches(position(&list))
        }
        PseudoClass::NthLastOfType(nth) => {
            let list: Vec<_> = siblings().into_iter().rev().filter(|&s| same_type(s)).collect();
            nth.matches(position(&list))
        }
        PseudoClass::Not(list) => !list.iter().any(|compound| matches_compound(doc, id, compound)),
        PseudoClass::Dynamic { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_svg;

    const DOC: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
        <g id="outer" class="layer">
            <rect id="r1" class="a b" fill="red"/>
            <circle id="c1" class="a"/>
            <g class="inner">
                <rect id="r2" class="b" xlink:href="x"/>
            </g>
        </g>
        <rect id="r3" data-kind="Big-one"/>
    </svg>"#;

    fn ids(doc: &Document, selector: &str) -> Vec<String> {
        select_all(doc, doc.root(), selector)
            .unwrap()
            .into_iter()
            .map(|id| doc.element(id).unwrap().attr("id").unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn test_simple_selectors() {
        let doc = parse_svg(DOC).unwrap();
        assert_eq!(ids(&doc, "rect"), vec!["r1", "r2", "r3"]);
        assert_eq!(ids(&doc, ".a"), vec!["r1", "c1"]);
        assert_eq!(ids(&doc, ".a.b"), vec!["r1"]);
        assert_eq!(ids(&doc, "#c1"), vec!["c1"]);
        assert_eq!(ids(&doc, "[fill=red]"), vec!["r1"]);
        assert_eq!(ids(&doc, "[data-kind|=big i]"), vec!["r3"]);
        assert_eq!(ids(&doc, "[xlink|href]"), vec!["r2"]);
    }

    #[test]
    fn test_combinators() {
        let doc = parse_svg(DOC).unwrap();
        assert_eq!(ids(&doc, "g rect"), vec!["r1", "r2"]);
        assert_eq!(ids(&doc, "#outer > rect"), vec!["r1"]);
        assert_eq!(ids(&doc, ".layer>.inner>rect"), vec!["r2"]);
        assert_eq!(ids(&doc, "rect + circle"), vec!["c1"]);
        assert_eq!(ids(&doc, "rect ~ g"), vec![""]);
        assert_eq!(ids(&doc, "svg > g ~ rect"), vec!["r3"]);
    }

    #[test]
    fn test_descendant_backtracks() {
        // `.layer` is two levels up from r2; the nearest `g` is not `.layer`
        let doc = parse_svg(DOC).unwrap();
        assert_eq!(ids(&doc, ".layer g rect"), vec!["r2"]);
    }

    #[test]
    fn test_list_is_ordered_and_deduplicated() {
        let doc = parse_svg(DOC).unwrap();
        assert_eq!(ids(&doc, "#r3, rect, .b"), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_structural_pseudo_classes() {
        let doc = parse_svg(DOC).unwrap();
        assert_eq!(ids(&doc, "#outer > :first-child"), vec!["r1"]);
        assert_eq!(ids(&doc, "#outer > :last-child"), vec![""]);
        assert_eq!(ids(&doc, "rect:only-child"), vec!["r2"]);
        assert_eq!(ids(&doc, "#outer > :nth-child(2n)"), vec!["c1"]);
        assert_eq!(ids(&doc, "rect:not(.a)"), vec!["r2", "r3"]);
        assert_eq!(ids(&doc, "g:root"), Vec::<String>::new());
        assert_eq!(select_all(&doc, doc.root(), ":root").unwrap().len(), 1);
    }

    #[test]
    fn test_dynamic_pseudo_never_matches() {
        let doc = parse_svg(DOC).unwrap();
        assert!(select_all(&doc, doc.root(), "rect:hover").unwrap().is_empty());
        assert!(select_all(&doc, doc.root(), "rect::before").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_selectors_are_errors() {
        let doc = parse_svg(DOC).unwrap();
        for bad in ["", "rect >", ".", "[", "rect:unknown", "a,,b", "#1x", "rect rect*"] {
            assert!(select_all(&doc, doc.root(), bad).is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_specificity() {
        let spec = |s: &str| parse_selector(s).unwrap().specificity();
        assert_eq!(spec("rect"), Specificity(0, 0, 1));
        assert_eq!(spec("g .a"), Specificity(0, 1, 1));
        assert_eq!(spec("#x .a:hover"), Specificity(1, 2, 0));
        assert_eq!(spec("rect:not(#a)"), Specificity(1, 0, 1));
        assert!(spec("#a") > spec(".a.b.c"));
    }

    #[test]
    fn test_pseudo_stripping() {
        let sel = parse_selector("a:hover .b::before").unwrap();
        assert_eq!(sel.pseudo_text(), ":hover::before");
        assert_eq!(sel.without_pseudos().to_string(), "a .b");
        let sel = parse_selector(":hover").unwrap();
        assert_eq!(sel.without_pseudos().to_string(), "*");
    }

    #[test]
    fn test_single_class_and_id() {
        assert_eq!(parse_selector(".a").unwrap().single_class(), Some("a"));
        assert_eq!(parse_selector("rect.a").unwrap().single_class(), None);
        assert_eq!(parse_selector("#x").unwrap().single_id(), Some("x"));
        assert_eq!(parse_selector("g #x").unwrap().single_id(), None);
    }

    #[test]
    fn test_nth() {
        let odd = Nth { a: 2, b: 1 };
        assert!(odd.matches(1) && odd.matches(3) && !odd.matches(2));
        let first_three = Nth { a: -1, b: 3 };
        assert!(first_three.matches(3) && first_three.matches(1) && !first_three.matches(4));

        let extreme = Nth { a: -1, b: i32::MIN };
        assert!(!extreme.matches(i32::MAX));
        assert!(Nth { a: 1, b: i32::MIN }.matches(i32::MAX));
        assert!(!Nth { a: i32::MIN, b: i32::MAX }.matches(1));
    }

    #[test]
    fn test_selector_tokens() {
        let mut tokens = SelectorTokens::default();
        tokens.scan(".a rect:not(.b), #c > .d:hover");
        tokens.scan("@media print{g.e{fill:#fff}}");
        for class in ["a", "b", "d", "e"] {
            assert!(tokens.classes.contains(class), "{class}");
        }
        assert!(tokens.ids.contains("c"));
        assert!(!tokens.classes.contains("rect"));
        assert!(!tokens.classes.contains("print"));
    }

    #[test]
    fn test_extreme_nth_coefficients_do_not_overflow() {
        let doc = parse_svg(DOC).unwrap();
        assert_eq!(ids(&doc, "rect:nth-child(n-2147483648)"), vec!["r1", "r2", "r3"]);
        assert_eq!(ids(&doc, "rect:nth-child(-2147483648n+1)"), ids(&doc, "rect:first-child"));
    }
}
