//! Role engine: `role=button[name="Sign in"][pressed]`

use dom_snapshot::{
    accessible_name, checked_state, expanded_state, heading_level, is_aria_hidden, is_disabled,
    pressed_state, role, selected_state, AriaTriState, Document, NodeId,
};
use regex::Regex;

use crate::errors::EngineFailure;
use crate::text::{compile_js_regex, normalize_whitespace};

#[derive(Clone, Debug)]
pub enum NameMatcher {
    /// Full, case-sensitive comparison (`s` flag)
    Exact(String),
    /// Case-insensitive substring
    Contains(String),
    Regex(Regex),
}

impl PartialEq for NameMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NameMatcher::Exact(a), NameMatcher::Exact(b))
            | (NameMatcher::Contains(a), NameMatcher::Contains(b)) => a == b,
            (NameMatcher::Regex(a), NameMatcher::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl NameMatcher {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatcher::Exact(expected) => name == expected,
            NameMatcher::Contains(needle) => name.to_lowercase().contains(needle.as_str()),
            NameMatcher::Regex(re) => re.is_match(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct RoleQuery {
    pub role: String,
    pub name: Option<NameMatcher>,
    pub checked: Option<AriaTriState>,
    pub pressed: Option<AriaTriState>,
    pub disabled: Option<bool>,
    pub expanded: Option<bool>,
    pub selected: Option<bool>,
    pub level: Option<u32>,
    pub include_hidden: bool,
}

#[derive(Debug)]
enum AttrValue {
    Truthy,
    Quoted(String),
    Regex(Regex),
    Bare(String),
}

struct RoleAttr {
    name: String,
    value: AttrValue,
    /// `s` suffix; `i` or no suffix means case-insensitive
    case_sensitive: bool,
}

struct BodyParser<'a> {
    chars: Vec<char>,
    pos: usize,
    body: &'a str,
}

impl<'a> BodyParser<'a> {
    fn error(&self, reason: &str) -> EngineFailure {
        EngineFailure::Malformed(format!("{reason} in role selector \"{}\"", self.body))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn quoted(&mut self, quote: char) -> Result<String, EngineFailure> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("unterminated string"))?;
                    out.push(escaped);
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn regex(&mut self) -> Result<Regex, EngineFailure> {
        self.pos += 1;
        let mut source = String::new();
        let mut in_class = false;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated regular expression")),
                Some('\\') => {
                    source.push('\\');
                    self.pos += 1;
                    if let Some(c) = self.peek() {
                        source.push(c);
                        self.pos += 1;
                    }
                }
                Some('/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    if c == '[' {
                        in_class = true;
                    } else if c == ']' {
                        in_class = false;
                    }
                    source.push(c);
                    self.pos += 1;
                }
            }
        }
        let flags = self.ident();
        compile_js_regex(&source, &flags)
    }

    fn attribute(&mut self) -> Result<RoleAttr, EngineFailure> {
        self.skip_ws();
        let name = self.ident();
        if name.is_empty() {
            return Err(self.error("expected attribute name"));
        }
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(RoleAttr {
                name,
                value: AttrValue::Truthy,
                case_sensitive: false,
            });
        }
        if self.peek() != Some('=') {
            return Err(self.error("only \"=\" is supported"));
        }
        self.pos += 1;
        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => AttrValue::Quoted(self.quoted(quote)?),
            Some('/') => AttrValue::Regex(self.regex()?),
            Some(_) => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c != ']' && !c.is_whitespace()) {
                    self.pos += 1;
                }
                AttrValue::Bare(self.chars[start..self.pos].iter().collect())
            }
            None => return Err(self.error("expected attribute value")),
        };
        self.skip_ws();
        let mut case_sensitive = false;
        match self.peek() {
            Some('s') | Some('S') => {
                case_sensitive = true;
                self.pos += 1;
            }
            Some('i') | Some('I') => self.pos += 1,
            _ => {}
        }
        self.skip_ws();
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;
        Ok(RoleAttr {
            name,
            value,
            case_sensitive,
        })
    }
}

fn parse_bool(attr: &RoleAttr, body: &str) -> Result<bool, EngineFailure> {
    match &attr.value {
        AttrValue::Truthy => Ok(true),
        AttrValue::Bare(raw) | AttrValue::Quoted(raw) if raw == "true" => Ok(true),
        AttrValue::Bare(raw) | AttrValue::Quoted(raw) if raw == "false" => Ok(false),
        _ => Err(EngineFailure::Malformed(format!(
            "\"{}\" must be true or false in role selector \"{body}\"",
            attr.name
        ))),
    }
}

fn parse_tri_state(attr: &RoleAttr, body: &str) -> Result<AriaTriState, EngineFailure> {
    match &attr.value {
        AttrValue::Bare(raw) | AttrValue::Quoted(raw) if raw == "mixed" => Ok(AriaTriState::Mixed),
        _ => parse_bool(attr, body).map(|value| {
            if value {
                AriaTriState::True
            } else {
                AriaTriState::False
            }
        }),
    }
}

impl RoleQuery {
    pub(crate) fn parse(body: &str) -> Result<Self, EngineFailure> {
        let body = body.trim();
        let mut parser = BodyParser {
            chars: body.chars().collect(),
            pos: 0,
            body,
        };
        let role = parser.ident().to_ascii_lowercase();
        if role.is_empty() {
            return Err(parser.error("role must not be empty"));
        }

        let mut query = RoleQuery {
            role,
            ..RoleQuery::default()
        };
        loop {
            parser.skip_ws();
            match parser.peek() {
                None => break,
                Some('[') => parser.pos += 1,
                Some(_) => return Err(parser.error("unexpected symbol")),
            }
            let attr = parser.attribute()?;
            match attr.name.as_str() {
                "name" => {
                    query.name = Some(match attr.value {
                        AttrValue::Quoted(text) | AttrValue::Bare(text) => {
                            let text = normalize_whitespace(&text);
                            if attr.case_sensitive {
                                NameMatcher::Exact(text)
                            } else {
                                NameMatcher::Contains(text.to_lowercase())
                            }
                        }
                        AttrValue::Regex(re) => NameMatcher::Regex(re),
                        AttrValue::Truthy => {
                            return Err(parser.error("\"name\" requires a value"));
                        }
                    });
                }
                "checked" => query.checked = Some(parse_tri_state(&attr, body)?),
                "pressed" => query.pressed = Some(parse_tri_state(&attr, body)?),
                "disabled" => query.disabled = Some(parse_bool(&attr, body)?),
                "expanded" => query.expanded = Some(parse_bool(&attr, body)?),
                "selected" => query.selected = Some(parse_bool(&attr, body)?),
                "include-hidden" => query.include_hidden = parse_bool(&attr, body)?,
                "level" => {
                    let level = match &attr.value {
                        AttrValue::Bare(raw) | AttrValue::Quoted(raw) => raw.parse().ok(),
                        _ => None,
                    };
                    query.level =
                        Some(level.ok_or_else(|| parser.error("\"level\" must be a number"))?);
                }
                other => {
                    return Err(parser.error(&format!("unknown attribute \"{other}\"")));
                }
            }
        }
        Ok(query)
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if role(doc, node).as_deref() != Some(self.role.as_str()) {
            return false;
        }
        if let Some(expected) = self.checked {
            if checked_state(doc, node) != Some(expected) {
                return false;
            }
        }
        if let Some(expected) = self.pressed {
            if pressed_state(doc, node) != Some(expected) {
                return false;
            }
        }
        if let Some(expected) = self.disabled {
            if is_disabled(doc, node) != expected {
                return false;
            }
        }
        if let Some(expected) = self.expanded {
            if expanded_state(doc, node) != Some(expected) {
                return false;
            }
        }
        if let Some(expected) = self.selected {
            if selected_state(doc, node) != Some(expected) {
                return false;
            }
        }
        if let Some(expected) = self.level {
            if heading_level(doc, node) != Some(expected) {
                return false;
            }
        }
        if !self.include_hidden && is_aria_hidden(doc, node) {
            return false;
        }
        match &self.name {
            Some(matcher) => matcher.matches(&accessible_name(doc, node)),
            None => true,
        }
    }
}

/// Matching descendants of `root`, in document order.
pub fn query_all(doc: &Document, root: NodeId, query: &RoleQuery) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|node| query.matches(doc, *node))
        .collect()
}
