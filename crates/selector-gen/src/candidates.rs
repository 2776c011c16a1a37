//! Candidate fragments for a single element

use dom_snapshot::{css_escape_identifier, escape_double_quoted, Document, NodeId};
use selector_engine::SelectorEngine;
use tracing::trace;

use crate::config::SelectorRules;
use crate::table::Category;

/// Attribute weights; higher sorts first.
pub const ATTRIBUTE_WEIGHTS: &[(&str, u32)] = &[
    ("data-testid", 100),
    ("data-test-id", 98),
    ("data-test", 96),
    ("data-qa", 94),
    ("data-cy", 92),
    ("name", 90),
    ("aria-label", 85),
    ("placeholder", 80),
    ("title", 75),
    ("alt", 70),
    ("for", 65),
    ("role", 60),
    ("type", 55),
    ("href", 50),
    ("src", 45),
    ("value", 40),
    ("aria-labelledby", 35),
    ("aria-describedby", 30),
];

/// Weight for `data-*` attributes missing from the table.
pub const DATA_ATTRIBUTE_WEIGHT: u32 = 20;

pub fn attribute_weight(name: &str) -> Option<u32> {
    ATTRIBUTE_WEIGHTS
        .iter()
        .find(|(attr, _)| *attr == name)
        .map(|(_, weight)| *weight)
        .or_else(|| name.starts_with("data-").then_some(DATA_ATTRIBUTE_WEIGHT))
}

/// First non-blank run of the element's own text, whitespace-normalized.
///
/// Runs are split at child elements, the same unit strict `text="..."`
/// compares against, so `<p>Hello <b>world</b></p>` yields `Hello`.
pub fn normalized_text(doc: &Document, node: NodeId) -> Option<String> {
    let mut runs = vec![String::new()];
    for child in doc.children(node) {
        match doc.text(*child) {
            Some(text) => {
                if let Some(run) = runs.last_mut() {
                    run.push_str(text);
                }
            }
            None if doc.is_element(*child) => runs.push(String::new()),
            None => {}
        }
    }
    runs.iter()
        .map(|run| run.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|run| !run.is_empty())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub category: Category,
    pub fragment: String,
}

impl Candidate {
    fn new(category: Category, fragment: String) -> Self {
        Self { category, fragment }
    }
}

/// Builds ranked fragments for one element.
pub struct CandidateBuilder<'a> {
    doc: &'a Document,
    engine: &'a SelectorEngine,
    rules: &'a SelectorRules,
}

impl<'a> CandidateBuilder<'a> {
    pub fn new(doc: &'a Document, engine: &'a SelectorEngine, rules: &'a SelectorRules) -> Self {
        Self { doc, engine, rules }
    }

    /// Fragments in priority order: burying point, id, text (when
    /// `include_text`), weighted attributes, classes, tag.
    pub fn build(&self, element: NodeId, include_text: bool) -> Vec<Candidate> {
        let mut out = Vec::new();
        let Some(tag) = self.doc.tag_name(element) else {
            return out;
        };

        if let Some(fragment) = self.burying_point(element, tag) {
            out.push(Candidate::new(Category::Primary, fragment));
        }

        if let Some(id) = self.doc.id_attr(element) {
            if self.rules.is_excluded_id(id) {
                trace!(%element, id, "id excluded by pattern");
            } else {
                let fragment = self.combine_with_nth(format!("id={id}"), element);
                out.push(Candidate::new(Category::Primary, fragment));
            }
        }

        if include_text {
            if let Some(text) = normalized_text(self.doc, element) {
                let fragment = format!("text=\"{}\"", escape_double_quoted(&text));
                out.push(Candidate::new(
                    Category::Primary,
                    self.combine_with_nth(fragment, element),
                ));
            }
        }

        for fragment in self.attribute_fragments(element, tag) {
            out.push(Candidate::new(Category::Attributes, fragment));
        }

        if let Some(fragment) = self.class_fragment(element) {
            out.push(Candidate::new(Category::Classes, fragment));
        }

        out.push(Candidate::new(
            Category::Tag,
            self.combine_with_nth(tag.to_string(), element),
        ));
        out
    }

    fn burying_point(&self, element: NodeId, tag: &str) -> Option<String> {
        let attr = self.rules.burying_point.as_deref()?;
        let value = self.doc.attr(element, attr)?;
        Some(format!("{tag}[{attr}=\"{}\"]", escape_double_quoted(value)))
    }

    fn attribute_fragments(&self, element: NodeId, tag: &str) -> Vec<String> {
        let mut weighted: Vec<(&str, &str, u32)> = self
            .doc
            .attributes(element)
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != self.rules.burying_point.as_deref())
            .filter(|(_, value)| !value.is_empty() && !self.rules.is_excluded_attr_value(value))
            .filter_map(|(name, value)| {
                attribute_weight(name).map(|weight| (name.as_str(), value.as_str(), weight))
            })
            .collect();
        weighted.sort_by(|a, b| b.2.cmp(&a.2));
        weighted.truncate(self.rules.max_attr_candidates);

        weighted
            .into_iter()
            .map(|(name, value, _)| {
                let fragment = format!("{tag}[{name}=\"{}\"]", escape_double_quoted(value));
                self.combine_with_nth(fragment, element)
            })
            .collect()
    }

    fn class_fragment(&self, element: NodeId) -> Option<String> {
        let classes: Vec<String> = self
            .doc
            .class_list(element)
            .into_iter()
            .filter(|class| !self.rules.is_excluded_class(class))
            .map(css_escape_identifier)
            .collect();
        if classes.is_empty() {
            return None;
        }
        Some(self.combine_with_nth(format!(".{}", classes.join(".")), element))
    }

    /// Append ` >> nth=<i>` when `fragment` matches more than one element
    /// under the element's parent. Failed trials keep the fragment as is.
    pub fn combine_with_nth(&self, fragment: String, element: NodeId) -> String {
        let Some(parent) = self.doc.parent_element(element) else {
            return fragment;
        };
        let matches = match self.engine.query_all(self.doc, &fragment, parent) {
            Ok(matches) => matches,
            Err(err) => {
                trace!(fragment = %fragment, error = %err, "uniqueness trial failed");
                return fragment;
            }
        };
        if matches.len() <= 1 {
            return fragment;
        }
        let position = matches.iter().position(|found| {
            *found == element || self.doc.parent_element(*found) == Some(element)
        });
        match position {
            Some(index) => format!("{fragment} >> nth={index}"),
            None => fragment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use dom_snapshot::parse_html;
    use pretty_assertions::assert_eq;

    fn fragments(html: &str, id: &str, config: SelectorConfig) -> Vec<String> {
        let doc = parse_html(html).unwrap();
        let engine = SelectorEngine::new();
        let rules = config.compile().unwrap();
        let target = doc.get_element_by_id(id).unwrap();
        CandidateBuilder::new(&doc, &engine, &rules)
            .build(target, true)
            .into_iter()
            .map(|candidate| candidate.fragment)
            .collect()
    }

    #[test]
    fn test_priority_order() {
        let html = r#"<form><button id="go" name="submit-btn" type="submit" class="btn btn-hover primary">Go  now</button></form>"#;
        assert_eq!(
            fragments(html, "go", SelectorConfig::default()),
            vec![
                "id=go",
                "text=\"Go now\"",
                "button[name=\"submit-btn\"]",
                "button[type=\"submit\"]",
                ".btn.primary",
                "button",
            ]
        );
    }

    #[test]
    fn test_burying_point_first_without_suffix() {
        let html = r#"<ul><li id="a1" data-track="row">x</li><li data-track="row">x</li></ul>"#;
        let config = SelectorConfig {
            burying_point: Some("data-track".to_string()),
            exclude_id_by_val: String::new(),
            ..SelectorConfig::default()
        };
        let out = fragments(html, "a1", config);
        assert_eq!(out[0], "li[data-track=\"row\"]");
        assert!(!out.iter().skip(1).any(|fragment| fragment.contains("data-track")));
    }

    #[test]
    fn test_positional_suffix_for_siblings() {
        let html = r#"<ul><li class="item">One</li><li class="item" id="two">Two</li></ul>"#;
        let out = fragments(html, "two", SelectorConfig::default());
        assert!(out.contains(&".item >> nth=1".to_string()));
        assert!(out.contains(&"li >> nth=1".to_string()));
        assert!(out.contains(&"text=\"Two\"".to_string()));
    }

    #[test]
    fn test_excluded_values_are_skipped() {
        let html = r#"<div><input id="12345" name="field-9876543" placeholder="Search"></div>"#;
        let doc = parse_html(html).unwrap();
        let engine = SelectorEngine::new();
        let rules = SelectorConfig::default().compile().unwrap();
        let input = doc.get_element_by_id("12345").unwrap();
        let out: Vec<String> = CandidateBuilder::new(&doc, &engine, &rules)
            .build(input, true)
            .into_iter()
            .map(|candidate| candidate.fragment)
            .collect();
        assert_eq!(out, vec!["input[placeholder=\"Search\"]", "input"]);
    }

    #[test]
    fn test_text_uses_own_runs() {
        let html = r#"<div><p id="mixed">Hello <b>world</b> again</p><p id="nested"><b>only</b></p></div>"#;
        let mixed = fragments(html, "mixed", SelectorConfig::default());
        assert_eq!(mixed[1], "text=\"Hello\"");
        let nested = fragments(html, "nested", SelectorConfig::default());
        assert!(!nested.iter().any(|fragment| fragment.starts_with("text=")));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = r#"<p><span id="q">Say "hi" \ bye</span></p>"#;
        let out = fragments(html, "q", SelectorConfig::default());
        assert_eq!(out[1], r#"text="Say \"hi\" \\ bye""#);
    }

    #[test]
    fn test_fragments_resolve_to_element_from_parent() {
        let html = r#"<div id="wrap"><a href="/x" class="nav">X</a><a href="/y" class="nav" id="y">Y</a><a href="/y" class="nav">Y</a></div>"#;
        let doc = parse_html(html).unwrap();
        let engine = SelectorEngine::new();
        let rules = SelectorConfig::default().compile().unwrap();
        let target = doc.get_element_by_id("y").unwrap();
        let parent = doc.parent_element(target).unwrap();
        for candidate in CandidateBuilder::new(&doc, &engine, &rules).build(target, true) {
            let found = engine.query_all(&doc, &candidate.fragment, parent).unwrap();
            assert!(found.contains(&target), "{} misses the target", candidate.fragment);
            if candidate.fragment.contains("nth=") {
                assert_eq!(found, vec![target], "{}", candidate.fragment);
            }
        }
    }

    #[test]
    fn test_weights() {
        assert_eq!(attribute_weight("data-testid"), Some(100));
        assert_eq!(attribute_weight("data-form"), Some(DATA_ATTRIBUTE_WEIGHT));
        assert_eq!(attribute_weight("class"), None);
        assert_eq!(attribute_weight("style"), None);
    }
}
