//! Combinator selector parsing
//!
//! A selector is a list of `>>`-separated parts. Each part names an engine
//! (`name=body`) or is a bare fragment: quoted text goes to `text`, a `//`
//! or `..` prefix goes to `xpath`, anything else is CSS. Bodies are compiled
//! here so evaluation never re-parses.

use std::fmt;

use serde_json::Value;

use crate::css::{parse_css, SelectorList};
use crate::errors::{EngineFailure, QueryError};
use crate::layout::LayoutKind;
use crate::role::RoleQuery;
use crate::text::{unquote, TextQuery};
use crate::xpath::{parse_xpath, XPathExpr};

/// Engine registry. Names resolve through [`Engine::from_name`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engine {
    Css,
    XPath,
    Text,
    /// Exact attribute equality (`id=`, `data-testid=` and friends)
    Attribute(&'static str),
    Role,
    Visible,
    Control,
    Has,
    Nth,
    Layout(LayoutKind),
}

const ATTRIBUTE_ENGINES: [&str; 4] = ["id", "data-testid", "data-test-id", "data-test"];

impl Engine {
    pub fn from_name(name: &str) -> Option<Self> {
        let base = name.strip_suffix(":light");
        let engine = match base.unwrap_or(name) {
            "css" if base.is_none() => Engine::Css,
            "xpath" => Engine::XPath,
            "text" => Engine::Text,
            attr if ATTRIBUTE_ENGINES.contains(&attr) => {
                let index = ATTRIBUTE_ENGINES.iter().position(|a| *a == attr)?;
                Engine::Attribute(ATTRIBUTE_ENGINES[index])
            }
            _ if base.is_some() => return None,
            "role" => Engine::Role,
            "visible" => Engine::Visible,
            "control" => Engine::Control,
            "has" => Engine::Has,
            "nth" => Engine::Nth,
            other => Engine::Layout(LayoutKind::from_name(other)?),
        };
        Some(engine)
    }

    /// Every registered engine name.
    pub fn names() -> Vec<String> {
        let mut names: Vec<String> = ["css", "xpath", "xpath:light", "text", "text:light"]
            .iter()
            .map(|name| name.to_string())
            .collect();
        for attr in ATTRIBUTE_ENGINES {
            names.push(attr.to_string());
            names.push(format!("{attr}:light"));
        }
        names.extend(["role", "visible", "control", "has", "nth"].map(String::from));
        names.extend(LayoutKind::ALL.iter().map(|kind| kind.name().to_string()));
        names
    }

    /// Engines whose body is a nested selector.
    pub fn is_nested(self) -> bool {
        matches!(self, Engine::Has | Engine::Layout(_))
    }
}

/// Compiled engine body.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineQuery {
    Css(SelectorList),
    XPath(XPathExpr),
    Text(TextQuery),
    Attribute {
        attribute: &'static str,
        value: String,
    },
    Role(RoleQuery),
    Visible(bool),
    Control(String),
    Has(Box<ParsedSelector>),
    Nth(i64),
    Layout {
        kind: LayoutKind,
        inner: Box<ParsedSelector>,
        distance: Option<f64>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSelectorPart {
    /// Engine name as registered (e.g. `text:light`)
    pub name: String,
    /// Body as written, used when stringifying
    pub source: String,
    pub query: EngineQuery,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSelector {
    pub parts: Vec<ParsedSelectorPart>,
    /// Index of the part marked with `*`
    pub capture: Option<usize>,
}

impl ParsedSelector {
    pub fn has_nth(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part.query, EngineQuery::Nth(_)))
    }
}

impl fmt::Display for ParsedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                f.write_str(" >> ")?;
            }
            if self.capture == Some(index) {
                f.write_str("*")?;
            }
            if part.name != "css" {
                write!(f, "{}=", part.name)?;
            }
            f.write_str(&part.source)?;
        }
        Ok(())
    }
}

/// One `>>` segment before its body is compiled.
#[derive(Debug, PartialEq)]
struct RawPart {
    name: String,
    body: String,
}

fn is_engine_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | ':' | '*'))
}

fn classify(part: &str) -> RawPart {
    let part = part.trim();
    if let Some(eq) = part.find('=') {
        let name = part[..eq].trim();
        if is_engine_name(name) {
            return RawPart {
                name: name.to_string(),
                body: part[eq + 1..].to_string(),
            };
        }
    }
    let quoted = part.len() > 1
        && ((part.starts_with('"') && part.ends_with('"'))
            || (part.starts_with('\'') && part.ends_with('\'')));
    let name = if quoted {
        "text"
    } else if part.trim_start_matches('(').starts_with("//") || part.starts_with("..") {
        "xpath"
    } else {
        "css"
    };
    RawPart {
        name: name.to_string(),
        body: part.to_string(),
    }
}

/// `text=` bodies may contain bare quotes once some text has been seen.
fn ignores_quote(prefix: &str) -> bool {
    prefix
        .trim_start()
        .strip_prefix("text")
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('='))
        .is_some_and(|body| !body.is_empty())
}

fn split_parts(selector: &str) -> Vec<RawPart> {
    if !selector.contains(">>") {
        return vec![classify(selector)];
    }

    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = selector.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if Some(c) == quote {
            quote = None;
        } else if quote.is_none()
            && matches!(c, '"' | '\'' | '`')
            && !ignores_quote(&selector[start..index])
        {
            quote = Some(c);
        } else if quote.is_none() && c == '>' && chars.peek().map(|(_, next)| *next) == Some('>') {
            parts.push(classify(&selector[start..index]));
            chars.next();
            start = index + 2;
        }
    }
    parts.push(classify(&selector[start..]));
    parts
}

fn nested_body(name: &str, body: &str, allow_distance: bool) -> Result<(String, Option<f64>), EngineFailure> {
    let malformed = || EngineFailure::Malformed(format!("{name}={body}"));
    let values: Vec<Value> = serde_json::from_str(&format!("[{body}]")).map_err(|_| malformed())?;
    match values.as_slice() {
        [Value::String(inner)] => Ok((inner.clone(), None)),
        [Value::String(inner), Value::Number(distance)] if allow_distance => {
            Ok((inner.clone(), Some(distance.as_f64().ok_or_else(malformed)?)))
        }
        _ => Err(malformed()),
    }
}

fn compile(engine: Engine, name: &str, body: &str, top: &str) -> Result<EngineQuery, QueryError> {
    let trimmed = body.trim();
    let query = match engine {
        Engine::Css => EngineQuery::Css(parse_css(trimmed).map_err(|err| err.with_selector(top))?),
        Engine::XPath => EngineQuery::XPath(parse_xpath(trimmed).map_err(|err| err.with_selector(top))?),
        Engine::Text => EngineQuery::Text(TextQuery::compile(trimmed).map_err(|err| err.with_selector(top))?),
        Engine::Attribute(attribute) => EngineQuery::Attribute {
            attribute,
            value: unquote(trimmed).unwrap_or_else(|| trimmed.to_string()),
        },
        Engine::Role => EngineQuery::Role(RoleQuery::parse(trimmed).map_err(|err| err.with_selector(top))?),
        Engine::Visible => match trimmed {
            "true" => EngineQuery::Visible(true),
            "false" => EngineQuery::Visible(false),
            _ => {
                return Err(QueryError::Malformed {
                    selector: top.to_string(),
                    reason: format!("visible expects true or false, got \"{trimmed}\""),
                })
            }
        },
        Engine::Control => EngineQuery::Control(trimmed.to_string()),
        Engine::Nth => EngineQuery::Nth(trimmed.parse().map_err(|_| QueryError::Malformed {
            selector: top.to_string(),
            reason: format!("nth expects an integer, got \"{trimmed}\""),
        })?),
        Engine::Has => {
            let (inner, _) = nested_body(name, trimmed, false).map_err(|err| err.with_selector(top))?;
            EngineQuery::Has(Box::new(parse_nested(&inner, top)?))
        }
        Engine::Layout(kind) => {
            let (inner, distance) =
                nested_body(name, trimmed, true).map_err(|err| err.with_selector(top))?;
            EngineQuery::Layout {
                kind,
                inner: Box::new(parse_nested(&inner, top)?),
                distance,
            }
        }
    };
    Ok(query)
}

fn parse_nested(selector: &str, top: &str) -> Result<ParsedSelector, QueryError> {
    let raw_parts = split_parts(selector);
    let mut parts = Vec::with_capacity(raw_parts.len());
    let mut capture = None;

    for raw in raw_parts {
        let (name, captured) = match raw.name.strip_prefix('*') {
            Some(rest) => (rest.to_string(), true),
            None => (raw.name, false),
        };
        if captured {
            if capture.is_some() {
                return Err(QueryError::Malformed {
                    selector: top.to_string(),
                    reason: "Only one of the selectors can capture using * modifier".to_string(),
                });
            }
            capture = Some(parts.len());
        }
        let engine = Engine::from_name(&name).ok_or_else(|| QueryError::UnknownEngine {
            engine: name.clone(),
            selector: top.to_string(),
        })?;
        let query = compile(engine, &name, &raw.body, top)?;
        parts.push(ParsedSelectorPart {
            source: raw.body.trim().to_string(),
            name,
            query,
        });
    }

    if let Some(first) = parts.first() {
        if Engine::from_name(&first.name).is_some_and(Engine::is_nested) {
            return Err(QueryError::Malformed {
                selector: top.to_string(),
                reason: format!("\"{}\" selector cannot be first", first.name),
            });
        }
    }

    Ok(ParsedSelector { parts, capture })
}

/// Parse a combinator selector string.
pub fn parse_selector(selector: &str) -> Result<ParsedSelector, QueryError> {
    parse_nested(selector, selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(selector: &str) -> Vec<String> {
        parse_selector(selector)
            .unwrap()
            .parts
            .into_iter()
            .map(|part| part.name)
            .collect()
    }

    #[test]
    fn test_split_and_classify() {
        assert_eq!(names("div.a >> text=Go"), vec!["css", "text"]);
        assert_eq!(names("\"Sign in\" >> nth=0"), vec!["text", "nth"]);
        assert_eq!(names("//div >> ..//span"), vec!["xpath", "xpath"]);
        assert_eq!(names("(//div)[1]"), vec!["xpath"]);
        assert_eq!(names("id=go >> visible = true"), vec!["id", "visible"]);
    }

    #[test]
    fn test_separator_inside_quotes_is_literal() {
        let parsed = parse_selector(r#"css=[title=">>"] >> text="a >> b""#).unwrap();
        assert_eq!(parsed.parts.len(), 2);
        assert_eq!(parsed.parts[1].source, "\"a >> b\"");
    }

    #[test]
    fn test_text_body_quote_after_text_is_not_a_quote() {
        let parsed = parse_selector("text=it's >> nth=1").unwrap();
        assert_eq!(parsed.parts.len(), 2);
        assert_eq!(parsed.parts[0].source, "it's");
    }

    #[test]
    fn test_capture() {
        let parsed = parse_selector("*css=form >> text=Go").unwrap();
        assert_eq!(parsed.capture, Some(0));
        assert_eq!(parsed.to_string(), "*form >> text=Go");
        assert!(parse_selector("*css=div >> *css=span").is_err());
    }

    #[test]
    fn test_unknown_engine() {
        let err = parse_selector("div >> foo=bar").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown engine \"foo\" while parsing selector div >> foo=bar"
        );
        assert!(matches!(
            parse_selector("div >> has=\"bogus=1\""),
            Err(QueryError::UnknownEngine { ref engine, .. }) if engine == "bogus"
        ));
    }

    #[test]
    fn test_light_variants() {
        assert_eq!(Engine::from_name("text:light"), Some(Engine::Text));
        assert_eq!(Engine::from_name("data-testid:light"), Some(Engine::Attribute("data-testid")));
        assert_eq!(Engine::from_name("css:light"), None);
        assert_eq!(Engine::from_name("role:light"), None);
        assert_eq!(Engine::from_name("near"), Some(Engine::Layout(LayoutKind::Near)));
        assert!(Engine::names().iter().all(|name| Engine::from_name(name).is_some()));
    }

    #[test]
    fn test_nested_bodies() {
        let parsed = parse_selector(r#"input >> right-of="text=Name", 120"#).unwrap();
        match &parsed.parts[1].query {
            EngineQuery::Layout { kind, inner, distance } => {
                assert_eq!(*kind, LayoutKind::RightOf);
                assert_eq!(inner.parts[0].name, "text");
                assert_eq!(*distance, Some(120.0));
            }
            other => panic!("unexpected query {other:?}"),
        }

        assert!(parse_selector(r#"div >> has="span", 10"#).is_err());
        assert!(parse_selector("div >> has=span").is_err());
        assert!(parse_selector(r#"has="span""#).is_err());
    }

    #[test]
    fn test_body_validation() {
        assert!(parse_selector("div >> nth=first").is_err());
        assert!(parse_selector("div >> visible=yes").is_err());
        assert!(parse_selector("div >> nth=-1").is_ok());
        assert!(parse_selector("").is_err());
    }

    #[test]
    fn test_attribute_body_unquoted() {
        let parsed = parse_selector("data-testid=\"login\"").unwrap();
        assert_eq!(
            parsed.parts[0].query,
            EngineQuery::Attribute {
                attribute: "data-testid",
                value: "login".to_string()
            }
        );
    }
}
