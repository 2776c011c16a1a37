//! Forgiving HTML parser for fixtures and captured page markup
//!
//! Handles comments, doctype, void and self-closing tags, raw-text elements
//! and common character references. Mismatched end tags close up to the
//! nearest open element with the same name and are ignored otherwise.

use tracing::trace;

use crate::document::Document;
use crate::errors::DomError;
use crate::node::{NodeId, Rect};

/// Attribute carrying a layout box for fixture documents.
pub const LAYOUT_ATTR: &str = "data-rect";

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

/// Tags that implicitly close an open element with the same name.
const SELF_NESTING_CLOSERS: &[&str] = &["li", "option", "p", "tr", "td", "th", "dt", "dd"];

type Attrs = Vec<(String, String)>;

pub fn parse_html(html: &str) -> Result<Document, DomError> {
    let mut doc = Document::new();
    let mut stack = vec![doc.root()];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            let end = find_subslice(bytes, i + 4, b"-->")
                .ok_or_else(|| DomError::parse(i, "unclosed HTML comment"))?;
            i = end + 3;
            continue;
        }

        if starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?") {
            let end = find_byte(bytes, i, b'>')
                .ok_or_else(|| DomError::parse(i, "unclosed declaration"))?;
            i = end + 1;
            continue;
        }

        if starts_with_at(bytes, i, b"</") {
            let (tag, next) = parse_end_tag(html, i)?;
            i = next;
            close_element(&doc, &mut stack, &tag);
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            if SELF_NESTING_CLOSERS.contains(&tag.as_str()) {
                if let Some(top) = stack.last().copied() {
                    if doc.tag_name(top) == Some(tag.as_str()) {
                        stack.pop();
                    }
                }
            }

            let (attrs, rect) = take_layout_box(attrs)?;
            let parent = *stack
                .last()
                .ok_or_else(|| DomError::parse(i, "missing parent element"))?;
            let node = doc.create_element(parent, tag.clone(), attrs);
            if let Some(rect) = rect {
                doc.set_rect(node, rect)?;
            }

            if RAW_TEXT_TAGS.contains(&tag.as_str()) && !self_closing {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| DomError::parse(i, format!("unclosed <{tag}>")))?;
                if let Some(body) = html.get(i..close) {
                    if !body.is_empty() {
                        let text = if tag == "script" || tag == "style" {
                            body.to_string()
                        } else {
                            decode_character_references(body)
                        };
                        doc.create_text(node, text);
                    }
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if !self_closing && !VOID_TAGS.contains(&tag.as_str()) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        if let Some(text) = html.get(text_start..i) {
            let parent = *stack
                .last()
                .ok_or_else(|| DomError::parse(i, "missing parent element"))?;
            if parent != doc.root() || !text.trim().is_empty() {
                doc.create_text(parent, decode_character_references(text));
            }
        }
    }

    trace!(nodes = doc.len(), "parsed HTML snapshot");
    Ok(doc)
}

fn close_element(doc: &Document, stack: &mut Vec<NodeId>, tag: &str) {
    let Some(position) = stack
        .iter()
        .rposition(|node| doc.tag_name(*node) == Some(tag))
    else {
        trace!(tag, "ignoring stray end tag");
        return;
    };
    stack.truncate(position.max(1));
}

fn take_layout_box(attrs: Attrs) -> Result<(Attrs, Option<Rect>), DomError> {
    let mut rect = None;
    let mut kept = Vec::with_capacity(attrs.len());
    for (name, value) in attrs {
        if name == LAYOUT_ATTR {
            rect = Some(parse_rect(&value)?);
        } else {
            kept.push((name, value));
        }
    }
    Ok((kept, rect))
}

fn parse_rect(value: &str) -> Result<Rect, DomError> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| DomError::InvalidRect {
            value: value.to_string(),
        })?;
    match parts.as_slice() {
        [x, y, width, height] => Ok(Rect::new(*x, *y, *width, *height)),
        _ => Err(DomError::InvalidRect {
            value: value.to_string(),
        }),
    }
}

fn parse_start_tag(html: &str, at: usize) -> Result<(String, Attrs, bool, usize), DomError> {
    let bytes = html.as_bytes();
    let mut i = at + 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| DomError::parse(at, "invalid tag name"))?
        .to_ascii_lowercase();

    let mut attrs: Attrs = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(DomError::parse(at, "unclosed start tag"));
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            if bytes.get(i + 1) == Some(&b'>') {
                self_closing = true;
                i += 2;
                break;
            }
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        let name = html
            .get(name_start..i)
            .ok_or_else(|| DomError::parse(i, "invalid attribute name"))?
            .to_ascii_lowercase();
        if name.is_empty() {
            return Err(DomError::parse(i, "invalid attribute name"));
        }

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, &mut i)?
        } else {
            String::new()
        };

        if !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize), DomError> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| DomError::parse(at, "invalid end tag"))?
        .to_ascii_lowercase();

    let end = find_byte(bytes, i, b'>').ok_or_else(|| DomError::parse(at, "unclosed end tag"))?;
    Ok((tag, end + 1))
}

fn parse_attr_value(html: &str, i: &mut usize) -> Result<String, DomError> {
    let bytes = html.as_bytes();
    if *i >= bytes.len() {
        return Err(DomError::parse(*i, "missing attribute value"));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        let end = find_byte(bytes, start, quote)
            .ok_or_else(|| DomError::parse(start, "unclosed quoted attribute value"))?;
        *i = end + 1;
        let raw = html
            .get(start..end)
            .ok_or_else(|| DomError::parse(start, "invalid attribute value"))?;
        return Ok(decode_character_references(raw));
    }

    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        if bytes[*i] == b'/' && bytes.get(*i + 1) == Some(&b'>') {
            break;
        }
        *i += 1;
    }
    let raw = html
        .get(start..*i)
        .ok_or_else(|| DomError::parse(start, "invalid attribute value"))?;
    Ok(decode_character_references(raw))
}

/// Decode the named references fixtures use plus numeric references.
pub fn decode_character_references(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|semi| *semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            decode_entity(entity).map(|ch| (ch, semi + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        let code = if let Some(hex) = numeric.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            numeric.parse::<u32>().ok()?
        };
        return char::from_u32(code);
    }
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "copy" => Some('\u{a9}'),
        "hellip" => Some('\u{2026}'),
        "mdash" => Some('\u{2014}'),
        _ => None,
    }
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .is_some_and(|window| window == needle)
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|b| *b == needle)
        .map(|offset| from + offset)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() || needle.is_empty() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + 2 + tag.len() <= bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + 2 + tag.len()].eq_ignore_ascii_case(tag)
        {
            return Some(i);
        }
        i += 1;
    }
    None
}
