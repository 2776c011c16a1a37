//! Layout engines: `left-of`, `right-of`, `above`, `below`, `near`

use dom_snapshot::{Document, NodeId, Rect};
use serde::{Deserialize, Serialize};

/// Default `near` radius in pixels.
pub const NEAR_THRESHOLD: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    LeftOf,
    RightOf,
    Above,
    Below,
    Near,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 5] = [
        LayoutKind::LeftOf,
        LayoutKind::RightOf,
        LayoutKind::Above,
        LayoutKind::Below,
        LayoutKind::Near,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::LeftOf => "left-of",
            LayoutKind::RightOf => "right-of",
            LayoutKind::Above => "above",
            LayoutKind::Below => "below",
            LayoutKind::Near => "near",
        }
    }

    /// Score of `element` relative to `anchor`; `None` when out of position
    /// or beyond `max_distance`. Lower is closer.
    pub fn score(self, element: &Rect, anchor: &Rect, max_distance: Option<f64>) -> Option<f64> {
        let within = |distance: f64| distance >= 0.0 && max_distance.map_or(true, |max| distance <= max);
        match self {
            LayoutKind::RightOf => {
                let distance = element.left() - anchor.right();
                within(distance).then(|| {
                    distance
                        + (anchor.bottom() - element.bottom()).max(0.0)
                        + (element.top() - anchor.top()).max(0.0)
                })
            }
            LayoutKind::LeftOf => {
                let distance = anchor.left() - element.right();
                within(distance).then(|| {
                    distance
                        + (anchor.bottom() - element.bottom()).max(0.0)
                        + (element.top() - anchor.top()).max(0.0)
                })
            }
            LayoutKind::Above => {
                let distance = anchor.top() - element.bottom();
                within(distance).then(|| {
                    distance
                        + (element.left() - anchor.left()).max(0.0)
                        + (anchor.right() - element.right()).max(0.0)
                })
            }
            LayoutKind::Below => {
                let distance = element.top() - anchor.bottom();
                within(distance).then(|| {
                    distance
                        + (element.left() - anchor.left()).max(0.0)
                        + (anchor.right() - element.right()).max(0.0)
                })
            }
            LayoutKind::Near => {
                let threshold = max_distance.unwrap_or(NEAR_THRESHOLD);
                let gaps = [
                    element.left() - anchor.right(),
                    anchor.left() - element.right(),
                    anchor.top() - element.bottom(),
                    element.top() - anchor.bottom(),
                ];
                let score: f64 = gaps.into_iter().filter(|gap| *gap >= 0.0).sum();
                (score <= threshold).then_some(score)
            }
        }
    }
}

/// Best (lowest) score of `element` against any anchor other than itself.
/// Elements without a layout box never score.
pub fn best_score(
    doc: &Document,
    kind: LayoutKind,
    element: NodeId,
    anchors: &[NodeId],
    max_distance: Option<f64>,
) -> Option<f64> {
    let rect = doc.rect(element)?;
    anchors
        .iter()
        .filter(|anchor| **anchor != element)
        .filter_map(|anchor| doc.rect(*anchor))
        .filter_map(|anchor| kind.score(rect, anchor, max_distance))
        .min_by(f64::total_cmp)
}

/// Keep scoring elements, sorted by ascending score (stable for ties).
pub fn filter_and_sort(
    doc: &Document,
    kind: LayoutKind,
    elements: &[NodeId],
    anchors: &[NodeId],
    max_distance: Option<f64>,
) -> Vec<NodeId> {
    let mut scored: Vec<(NodeId, f64)> = elements
        .iter()
        .filter_map(|element| {
            best_score(doc, kind, *element, anchors, max_distance).map(|score| (*element, score))
        })
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.into_iter().map(|(element, _)| element).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::parse_html;

    #[test]
    fn test_directional_scores() {
        let anchor = Rect::new(100.0, 100.0, 50.0, 20.0);
        let right = Rect::new(160.0, 100.0, 30.0, 20.0);
        let below = Rect::new(100.0, 130.0, 50.0, 20.0);

        assert_eq!(LayoutKind::RightOf.score(&right, &anchor, None), Some(10.0));
        assert_eq!(LayoutKind::LeftOf.score(&right, &anchor, None), None);
        assert_eq!(LayoutKind::Below.score(&below, &anchor, None), Some(10.0));
        assert_eq!(LayoutKind::Above.score(&below, &anchor, None), None);
        assert_eq!(LayoutKind::RightOf.score(&right, &anchor, Some(5.0)), None);
    }

    #[test]
    fn test_near_threshold() {
        let anchor = Rect::new(0.0, 0.0, 10.0, 10.0);
        let close = Rect::new(40.0, 0.0, 10.0, 10.0);
        let far = Rect::new(100.0, 0.0, 10.0, 10.0);
        assert_eq!(LayoutKind::Near.score(&close, &anchor, None), Some(30.0));
        assert_eq!(LayoutKind::Near.score(&far, &anchor, None), None);
        assert_eq!(LayoutKind::Near.score(&far, &anchor, Some(100.0)), Some(90.0));
    }

    #[test]
    fn test_filter_and_sort_orders_by_distance() {
        let doc = parse_html(
            r#"<label id="l" data-rect="0,0,50,20">Name</label>
               <input id="far" data-rect="200,0,50,20">
               <input id="close" data-rect="60,0,50,20">
               <input id="nobox">"#,
        )
        .unwrap();
        let anchor = doc.get_element_by_id("l").unwrap();
        let far = doc.get_element_by_id("far").unwrap();
        let close = doc.get_element_by_id("close").unwrap();
        let nobox = doc.get_element_by_id("nobox").unwrap();

        let sorted = filter_and_sort(&doc, LayoutKind::RightOf, &[far, close, nobox], &[anchor], None);
        assert_eq!(sorted, vec![close, far]);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in LayoutKind::ALL {
            assert_eq!(LayoutKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(LayoutKind::from_name("between"), None);
    }
}
