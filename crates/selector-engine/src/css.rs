//! CSS engine: selector-list parser and matcher

use dom_snapshot::{checked_state, is_disabled, is_visible, AriaTriState, Document, NodeId};

use crate::errors::EngineFailure;

#[derive(Clone, Debug, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators, left to right.
///
/// The first entry carries a combinator only inside `:has()`, where it is
/// relative to the subject element.
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexSelector {
    pub parts: Vec<(Option<Combinator>, CompoundSelector)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub universal: bool,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrCondition>,
    pub pseudos: Vec<PseudoClass>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttrCondition {
    pub name: String,
    pub op: AttrOp,
    pub value: String,
    pub case_insensitive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

/// `an+b` with 1-based indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nth {
    pub a: i64,
    pub b: i64,
}

impl Nth {
    pub fn matches(&self, index: i64) -> bool {
        if self.a == 0 {
            return index == self.b;
        }
        let diff = index - self.b;
        diff % self.a == 0 && diff / self.a >= 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Not(SelectorList),
    Is(SelectorList),
    Has(SelectorList),
    HasText(String),
    Empty,
    Checked,
    Disabled,
    Enabled,
    Root,
    Scope,
    Visible,
}

pub fn parse_css(source: &str) -> Result<SelectorList, EngineFailure> {
    let mut parser = CssParser::new(source);
    let list = parser.parse_list(false, false)?;
    parser.skip_ws();
    if let Some(ch) = parser.peek() {
        return Err(parser.error(format!("unexpected '{ch}'")));
    }
    Ok(list)
}

struct CssParser {
    chars: Vec<char>,
    pos: usize,
}

impl CssParser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> EngineFailure {
        EngineFailure::Malformed(format!("css {} at offset {}", reason.into(), self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), EngineFailure> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{ch}'")))
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self, nested: bool, relative: bool) -> Result<SelectorList, EngineFailure> {
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            selectors.push(self.parse_complex(relative)?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            match self.peek() {
                None => break,
                Some(')') if nested => break,
                Some(ch) => return Err(self.error(format!("unexpected '{ch}'"))),
            }
        }
        Ok(SelectorList(selectors))
    }

    fn parse_complex(&mut self, relative: bool) -> Result<ComplexSelector, EngineFailure> {
        let mut parts: Vec<(Option<Combinator>, CompoundSelector)> = Vec::new();
        let mut pending: Option<Combinator> = None;
        loop {
            self.skip_ws();
            let explicit = match self.peek() {
                None | Some(',') | Some(')') => break,
                Some('>') => Some(Combinator::Child),
                Some('+') => Some(Combinator::NextSibling),
                Some('~') => Some(Combinator::SubsequentSibling),
                _ => None,
            };
            if let Some(combinator) = explicit {
                if pending.is_some() {
                    return Err(self.error("repeated combinator"));
                }
                self.pos += 1;
                pending = Some(combinator);
                continue;
            }

            let combinator = if parts.is_empty() {
                if pending.is_some() && !relative {
                    return Err(self.error("selector starts with a combinator"));
                }
                pending.take()
            } else {
                Some(pending.take().unwrap_or(Combinator::Descendant))
            };
            let compound = self.parse_compound()?;
            parts.push((combinator, compound));
        }
        if pending.is_some() {
            return Err(self.error("dangling combinator"));
        }
        if parts.is_empty() {
            return Err(self.error("empty selector"));
        }
        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, EngineFailure> {
        let start = self.pos;
        let mut compound = CompoundSelector::default();

        if self.eat('*') {
            compound.universal = true;
        } else if self.at_ident_start() {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.pos += 1;
                    if self.peek() == Some(':') {
                        return Err(self.error("pseudo-elements are not supported"));
                    }
                    compound.pseudos.push(self.parse_pseudo()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(match self.peek() {
                Some(ch) => self.error(format!("unexpected '{ch}'")),
                None => self.error("unexpected end of selector"),
            });
        }
        Ok(compound)
    }

    fn at_ident_start(&self) -> bool {
        match self.peek() {
            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '\\' || !ch.is_ascii() => true,
            Some('-') => self
                .peek_at(1)
                .is_some_and(|next| next.is_alphabetic() || next == '_' || next == '-' || next == '\\'),
            _ => false,
        }
    }

    fn parse_ident(&mut self) -> Result<String, EngineFailure> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                out.push(self.parse_escape()?);
            } else if ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
                out.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.error("expected identifier"));
        }
        Ok(out)
    }

    /// Called after the backslash.
    fn parse_escape(&mut self) -> Result<char, EngineFailure> {
        let mut hex = String::new();
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            hex.push(self.chars[self.pos]);
            self.pos += 1;
        }
        if !hex.is_empty() {
            if self.peek().is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            let code = u32::from_str_radix(&hex, 16).map_err(|_| self.error("bad escape"))?;
            return Ok(char::from_u32(code).unwrap_or('\u{FFFD}'));
        }
        let ch = self.peek().ok_or_else(|| self.error("dangling escape"))?;
        self.pos += 1;
        Ok(ch)
    }

    fn parse_string(&mut self) -> Result<String, EngineFailure> {
        let quote = self.peek().ok_or_else(|| self.error("expected string"))?;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    out.push(self.parse_escape()?);
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += 1;
                }
            }
        }
        Ok(out)
    }

    fn parse_attr(&mut self) -> Result<AttrCondition, EngineFailure> {
        self.skip_ws();
        let mut name = self.parse_ident()?;
        while self.peek() == Some(':') {
            self.pos += 1;
            name.push(':');
            name.push_str(&self.parse_ident()?);
        }
        let name = name.to_ascii_lowercase();
        self.skip_ws();

        if self.eat(']') {
            return Ok(AttrCondition {
                name,
                op: AttrOp::Exists,
                value: String::new(),
                case_insensitive: false,
            });
        }

        let op = match (self.peek(), self.peek_at(1)) {
            (Some('='), _) => {
                self.pos += 1;
                AttrOp::Equals
            }
            (Some(prefix), Some('=')) => {
                let op = match prefix {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    _ => return Err(self.error("unknown attribute operator")),
                };
                self.pos += 2;
                op
            }
            _ => return Err(self.error("expected attribute operator")),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some('"') | Some('\'') => self.parse_string()?,
            _ => self.parse_ident()?,
        };
        self.skip_ws();

        let mut case_insensitive = false;
        if let Some(flag) = self.peek().filter(|c| matches!(c, 'i' | 'I' | 's' | 'S')) {
            self.pos += 1;
            case_insensitive = flag.eq_ignore_ascii_case(&'i');
            self.skip_ws();
        }
        self.expect(']')?;

        Ok(AttrCondition {
            name,
            op,
            value,
            case_insensitive,
        })
    }

    fn parse_pseudo(&mut self) -> Result<PseudoClass, EngineFailure> {
        let name = self.parse_ident()?.to_ascii_lowercase();
        if !self.eat('(') {
            return match name.as_str() {
                "first-child" => Ok(PseudoClass::FirstChild),
                "last-child" => Ok(PseudoClass::LastChild),
                "only-child" => Ok(PseudoClass::OnlyChild),
                "first-of-type" => Ok(PseudoClass::FirstOfType),
                "last-of-type" => Ok(PseudoClass::LastOfType),
                "only-of-type" => Ok(PseudoClass::OnlyOfType),
                "empty" => Ok(PseudoClass::Empty),
                "checked" => Ok(PseudoClass::Checked),
                "disabled" => Ok(PseudoClass::Disabled),
                "enabled" => Ok(PseudoClass::Enabled),
                "root" => Ok(PseudoClass::Root),
                "scope" => Ok(PseudoClass::Scope),
                "visible" => Ok(PseudoClass::Visible),
                other => Err(self.error(format!("unsupported pseudo-class :{other}"))),
            };
        }

        let pseudo = match name.as_str() {
            "not" => PseudoClass::Not(self.parse_list(true, false)?),
            "is" | "where" | "matches" => PseudoClass::Is(self.parse_list(true, false)?),
            "has" => PseudoClass::Has(self.parse_list(true, true)?),
            "has-text" => {
                self.skip_ws();
                let text = self.parse_string()?;
                self.skip_ws();
                PseudoClass::HasText(text)
            }
            "nth-child" => PseudoClass::NthChild(self.parse_nth()?),
            "nth-last-child" => PseudoClass::NthLastChild(self.parse_nth()?),
            "nth-of-type" => PseudoClass::NthOfType(self.parse_nth()?),
            "nth-last-of-type" => PseudoClass::NthLastOfType(self.parse_nth()?),
            other => return Err(self.error(format!("unsupported pseudo-class :{other}()"))),
        };
        self.expect(')')?;
        Ok(pseudo)
    }

    fn parse_nth(&mut self) -> Result<Nth, EngineFailure> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ')') {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        parse_nth_expression(&raw).ok_or_else(|| self.error(format!("invalid nth expression '{raw}'")))
    }
}

fn parse_nth_expression(raw: &str) -> Option<Nth> {
    match raw {
        "odd" => return Some(Nth { a: 2, b: 1 }),
        "even" => return Some(Nth { a: 2, b: 0 }),
        _ => {}
    }
    match raw.split_once('n') {
        Some((a, b)) => {
            let a = match a {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse().ok()?,
            };
            let b = if b.is_empty() { 0 } else { b.parse().ok()? };
            Some(Nth { a, b })
        }
        None => raw.parse().ok().map(|b| Nth { a: 0, b }),
    }
}

/// Matching context: the document and the element `:scope` refers to.
pub struct CssMatcher<'a> {
    doc: &'a Document,
    scope: Option<NodeId>,
}

impl<'a> CssMatcher<'a> {
    pub fn new(doc: &'a Document, scope: Option<NodeId>) -> Self {
        Self { doc, scope }
    }

    /// Element descendants of `root` matching any selector in the list.
    pub fn query_all(&self, root: NodeId, list: &SelectorList) -> Vec<NodeId> {
        self.doc
            .descendants(root)
            .into_iter()
            .filter(|node| self.matches_list(*node, list))
            .collect()
    }

    pub fn matches_list(&self, node: NodeId, list: &SelectorList) -> bool {
        list.0
            .iter()
            .any(|complex| self.matches_complex(node, complex, complex.parts.len() - 1))
    }

    fn matches_complex(&self, node: NodeId, complex: &ComplexSelector, index: usize) -> bool {
        let (combinator, compound) = &complex.parts[index];
        if !self.matches_compound(node, compound) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let doc = self.doc;
        match combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Child => doc
                .parent_element(node)
                .is_some_and(|parent| self.matches_complex(parent, complex, index - 1)),
            Combinator::Descendant => doc
                .ancestors(node)
                .filter(|ancestor| doc.is_element(*ancestor))
                .any(|ancestor| self.matches_complex(ancestor, complex, index - 1)),
            Combinator::NextSibling => doc
                .previous_element_sibling(node)
                .is_some_and(|sibling| self.matches_complex(sibling, complex, index - 1)),
            Combinator::SubsequentSibling => {
                let mut cursor = doc.previous_element_sibling(node);
                while let Some(sibling) = cursor {
                    if self.matches_complex(sibling, complex, index - 1) {
                        return true;
                    }
                    cursor = doc.previous_element_sibling(sibling);
                }
                false
            }
        }
    }

    fn matches_compound(&self, node: NodeId, compound: &CompoundSelector) -> bool {
        let Some(element) = self.doc.element(node) else {
            return false;
        };

        if let Some(tag) = &compound.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if compound
            .ids
            .iter()
            .any(|id| element.attr("id") != Some(id.as_str()))
        {
            return false;
        }

        if !compound.classes.is_empty() {
            let classes = self.doc.class_list(node);
            if compound
                .classes
                .iter()
                .any(|class| !classes.contains(&class.as_str()))
            {
                return false;
            }
        }

        if !compound
            .attrs
            .iter()
            .all(|condition| matches_attr(element.attr(&condition.name), condition))
        {
            return false;
        }

        compound
            .pseudos
            .iter()
            .all(|pseudo| self.matches_pseudo(node, pseudo))
    }

    fn matches_pseudo(&self, node: NodeId, pseudo: &PseudoClass) -> bool {
        let doc = self.doc;
        match pseudo {
            PseudoClass::FirstChild => doc.previous_element_sibling(node).is_none(),
            PseudoClass::LastChild => doc.next_element_sibling(node).is_none(),
            PseudoClass::OnlyChild => {
                doc.previous_element_sibling(node).is_none() && doc.next_element_sibling(node).is_none()
            }
            PseudoClass::FirstOfType => self.type_position(node, false) == Some(1),
            PseudoClass::LastOfType => self.type_position(node, true) == Some(1),
            PseudoClass::OnlyOfType => {
                self.type_position(node, false) == Some(1) && self.type_position(node, true) == Some(1)
            }
            PseudoClass::NthChild(nth) => self.child_position(node, false).is_some_and(|i| nth.matches(i)),
            PseudoClass::NthLastChild(nth) => self.child_position(node, true).is_some_and(|i| nth.matches(i)),
            PseudoClass::NthOfType(nth) => self.type_position(node, false).is_some_and(|i| nth.matches(i)),
            PseudoClass::NthLastOfType(nth) => self.type_position(node, true).is_some_and(|i| nth.matches(i)),
            PseudoClass::Not(list) => !self.matches_list(node, list),
            PseudoClass::Is(list) => self.matches_list(node, list),
            PseudoClass::Has(list) => self.matches_has(node, list),
            PseudoClass::HasText(text) => {
                let needle = normalize_lower(text);
                normalize_lower(&doc.text_content(node)).contains(&needle)
            }
            PseudoClass::Empty => doc
                .children(node)
                .iter()
                .all(|child| doc.text(*child).is_some_and(str::is_empty)),
            PseudoClass::Checked => {
                checked_state(doc, node) == Some(AriaTriState::True)
                    || (doc.tag_name(node) == Some("option") && doc.has_attr(node, "selected"))
            }
            PseudoClass::Disabled => is_disabled(doc, node),
            PseudoClass::Enabled => is_form_control(doc, node) && !is_disabled(doc, node),
            PseudoClass::Root => doc.document_element() == Some(node),
            PseudoClass::Scope => match self.scope {
                Some(scope) => scope == node,
                None => doc.document_element() == Some(node),
            },
            PseudoClass::Visible => is_visible(doc, node),
        }
    }

    fn matches_has(&self, node: NodeId, list: &SelectorList) -> bool {
        let doc = self.doc;
        list.0.iter().any(|complex| {
            let last = complex.parts.len() - 1;
            let leading = complex.parts[0].0.unwrap_or(Combinator::Descendant);
            let candidates: Vec<NodeId> = match leading {
                Combinator::Descendant => doc.descendants(node),
                Combinator::Child => doc.element_children(node).collect(),
                Combinator::NextSibling => doc.next_element_sibling(node).into_iter().collect(),
                Combinator::SubsequentSibling => {
                    std::iter::successors(doc.next_element_sibling(node), |n| doc.next_element_sibling(*n))
                        .collect()
                }
            };
            if last == 0 {
                return candidates
                    .iter()
                    .any(|candidate| self.matches_compound(*candidate, &complex.parts[0].1));
            }
            // Anchor the first compound among the candidates, then match the rest below it.
            candidates.iter().any(|anchor| {
                self.matches_compound(*anchor, &complex.parts[0].1)
                    && std::iter::once(*anchor)
                        .chain(doc.descendants(*anchor))
                        .chain(siblings_after(doc, *anchor))
                        .any(|subject| self.matches_complex(subject, complex, last) && subject != *anchor)
            })
        })
    }

    fn child_position(&self, node: NodeId, from_end: bool) -> Option<i64> {
        let parent = self.doc.parent(node)?;
        let siblings: Vec<NodeId> = self.doc.element_children(parent).collect();
        let index = siblings.iter().position(|n| *n == node)?;
        Some(if from_end {
            (siblings.len() - index) as i64
        } else {
            index as i64 + 1
        })
    }

    fn type_position(&self, node: NodeId, from_end: bool) -> Option<i64> {
        let parent = self.doc.parent(node)?;
        let tag = self.doc.tag_name(node)?;
        let same: Vec<NodeId> = self
            .doc
            .element_children(parent)
            .filter(|n| self.doc.tag_name(*n) == Some(tag))
            .collect();
        let index = same.iter().position(|n| *n == node)?;
        Some(if from_end {
            (same.len() - index) as i64
        } else {
            index as i64 + 1
        })
    }
}

fn siblings_after(doc: &Document, node: NodeId) -> Vec<NodeId> {
    std::iter::successors(doc.next_element_sibling(node), |n| doc.next_element_sibling(*n))
        .flat_map(|sibling| std::iter::once(sibling).chain(doc.descendants(sibling)))
        .collect()
}

fn is_form_control(doc: &Document, node: NodeId) -> bool {
    matches!(
        doc.tag_name(node),
        Some("button" | "input" | "select" | "textarea" | "option" | "optgroup" | "fieldset")
    )
}

fn normalize_lower(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn matches_attr(actual: Option<&str>, condition: &AttrCondition) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let (actual, expected) = if condition.case_insensitive {
        (actual.to_lowercase(), condition.value.to_lowercase())
    } else {
        (actual.to_string(), condition.value.clone())
    };
    match condition.op {
        AttrOp::Exists => true,
        AttrOp::Equals => actual == expected,
        AttrOp::Includes => actual.split_ascii_whitespace().any(|token| token == expected),
        AttrOp::DashMatch => actual == expected || actual.starts_with(&format!("{expected}-")),
        AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
    }
}
