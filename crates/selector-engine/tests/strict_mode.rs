use dom_snapshot::parse_html;
use pretty_assertions::assert_eq;
use selector_engine::{QueryError, SelectorEngine};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Duplicates</title></head>
<body>
  <main id="main">
    <section><div id="shared" class="card">First</div></section>
    <section><div id="shared" class="card">Second</div></section>
    <aside><div id="shared" class="card" data-testid="third">Third</div></aside>
  </main>
</body>
</html>"#;

#[test]
fn strict_violation_reports_unique_selectors_for_each_match() {
    let doc = parse_html(PAGE).unwrap();
    let engine = SelectorEngine::new();

    let err = engine.query_strict(&doc, "#shared", doc.root()).unwrap_err();
    assert!(err.is_ambiguity());

    let QueryError::StrictModeViolation { count, matches, message, selector } = err else {
        panic!("expected a strict mode violation");
    };
    assert_eq!(selector, "#shared");
    assert_eq!(count, 3);
    assert_eq!(matches.len(), 3);
    assert!(message.starts_with("strict mode violation: \"#shared\" resolved to 3 elements:"));
    assert!(!message.contains("..."));

    let all = engine.query_all(&doc, "#shared", doc.root()).unwrap();
    for (index, info) in matches.iter().enumerate() {
        let resolved = engine.query_all(&doc, &info.selector, doc.root()).unwrap();
        assert_eq!(resolved, vec![all[index]], "selector {} is not unique", info.selector);
        assert!(message.contains(&format!("{}) {}", index + 1, info.preview)));
    }
    assert_eq!(matches[2].selector, "data-testid=third");
    assert_eq!(matches[0].preview, r#"<div id="shared" class="card">First</div>"#);
}

#[test]
fn strict_resolution_of_a_unique_selector() {
    let doc = parse_html(PAGE).unwrap();
    let engine = SelectorEngine::new();

    let found = engine
        .query_strict(&doc, "text=Second >> visible = true", doc.root())
        .unwrap()
        .expect("one element");
    assert_eq!(doc.text_content(found), "Second");
}

#[test]
fn unknown_engine_is_reported_with_the_selector() {
    let doc = parse_html(PAGE).unwrap();
    let err = SelectorEngine::new()
        .query_all(&doc, "main >> bogus=1", doc.root())
        .unwrap_err();
    assert!(err.is_parse_error());
    assert_eq!(
        err.to_string(),
        "Unknown engine \"bogus\" while parsing selector main >> bogus=1"
    );
}

#[test]
fn parsed_selectors_stringify_back_to_equivalent_queries() {
    let doc = parse_html(PAGE).unwrap();
    let engine = SelectorEngine::new();

    for selector in [
        "main >> section >> div.card",
        "xpath=//aside/div",
        "\"Third\"",
        "role=generic >> nth=0",
        "section >> has=\"text=Second\"",
    ] {
        let parsed = engine.parse(selector).unwrap();
        let reparsed = engine.parse(&parsed.to_string()).unwrap();
        assert_eq!(parsed, reparsed, "{selector}");
        assert_eq!(
            engine.query_all_parsed(&doc, &parsed, doc.root()).unwrap(),
            engine.query_all(&doc, selector, doc.root()).unwrap()
        );
    }
}
