use std::collections::HashMap;

use crate::dom::{Document, NodeId};
use crate::selector;
use crate::transform;

/// Outcome of a completed drag gesture, addressed by selector so the
/// receiver needs no access to the live element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DragReport {
    pub selector: String,
    pub transform: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Hovering(NodeId),
    Dragging {
        target: NodeId,
        /// Translation decoded from the target's transform at press time.
        origin: (f64, f64),
        /// Pointer position at press time.
        start: (f64, f64),
    },
}

/// Structural and interactive tags are never drag targets.
const INELIGIBLE_TAGS: &[&str] = &[
    "html", "body", "script", "style", "a", "button", "input", "textarea", "select",
];

/// Tracks one pointer's hover/drag lifecycle over a parsed document.
///
/// Live feedback and committed results are written into a caller-owned
/// override map keyed by node, the analog of per-element inline styles. The
/// caller resets that map (and this engine) whenever the document changes.
pub struct DragEngine {
    state: DragState,
}

impl DragEngine {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn hovered(&self) -> Option<NodeId> {
        match self.state {
            DragState::Hovering(target) => Some(target),
            _ => None,
        }
    }

    pub fn drag_target(&self) -> Option<NodeId> {
        match self.state {
            DragState::Dragging { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn is_draggable(doc: &Document, node: NodeId) -> bool {
        matches!(doc.tag(node), Some(tag) if !INELIGIBLE_TAGS.contains(&tag))
    }

    /// Pointer moved onto `target`.
    pub fn hover_in(&mut self, doc: &Document, target: NodeId) {
        if self.state == DragState::Idle && Self::is_draggable(doc, target) {
            self.state = DragState::Hovering(target);
        }
    }

    /// Pointer left `target`. A notification for any other node is stale and
    /// ignored.
    pub fn hover_out(&mut self, target: NodeId) {
        if self.state == DragState::Hovering(target) {
            self.state = DragState::Idle;
        }
    }

    /// Primary press at `(x, y)`. Starts a drag only over the currently
    /// hovered element.
    pub fn press(
        &mut self,
        overrides: &HashMap<NodeId, String>,
        target: NodeId,
        x: f64,
        y: f64,
    ) -> bool {
        match self.state {
            DragState::Hovering(hovered) if hovered == target => {
                let current = overrides.get(&target).map(String::as_str).unwrap_or("");
                let origin = transform::decode_translation(current);
                self.state = DragState::Dragging {
                    target,
                    origin,
                    start: (x, y),
                };
                true
            }
            _ => false,
        }
    }

    /// Pointer moved to `(x, y)` with the button held. Applies live feedback
    /// at full precision.
    pub fn pointer_moved(&mut self, overrides: &mut HashMap<NodeId, String>, x: f64, y: f64) {
        if let DragState::Dragging {
            target,
            origin,
            start,
        } = self.state
        {
            let live_x = origin.0 + (x - start.0);
            let live_y = origin.1 + (y - start.1);
            overrides.insert(target, transform::encode_translation(live_x, live_y));
        }
    }

    /// Pointer released at `(x, y)`. Emits a report only when the gesture
    /// moved more than one pixel on some axis; sub-pixel wiggles stay local.
    /// The live override is normalized either way: a non-zero net translation
    /// is kept in rounded form, a zero one is removed entirely so it cannot
    /// mask a stylesheet rule.
    pub fn release(
        &mut self,
        doc: &Document,
        overrides: &mut HashMap<NodeId, String>,
        x: f64,
        y: f64,
    ) -> Option<DragReport> {
        let (target, origin, start) = match self.state {
            DragState::Dragging {
                target,
                origin,
                start,
            } => (target, origin, start),
            _ => return None,
        };
        self.state = DragState::Idle;
        let delta = (x - start.0, y - start.1);
        let net = (origin.0 + delta.0, origin.1 + delta.1);
        if net == (0.0, 0.0) {
            overrides.remove(&target);
        } else {
            overrides.insert(target, transform::encode_translation_rounded(net.0, net.1));
        }
        if delta.0.abs() > 1.0 || delta.1.abs() > 1.0 {
            let selector = selector::synthesize(doc, target);
            if !selector.is_empty() {
                return Some(DragReport {
                    selector,
                    transform: transform::encode_translation_rounded(net.0, net.1),
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Document {
        Document::parse(
            "<html><body><div id=\"hero\">drag me</div><button>no</button>text</body></html>",
        )
    }

    fn hero(doc: &Document) -> NodeId {
        doc.find_first("div").unwrap()
    }

    #[test]
    fn test_hover_lifecycle() {
        let doc = sample_doc();
        let target = hero(&doc);
        let mut engine = DragEngine::new();
        engine.hover_in(&doc, target);
        assert_eq!(engine.hovered(), Some(target));
        engine.hover_out(target);
        assert_eq!(engine.state(), DragState::Idle);
    }

    #[test]
    fn test_stale_hover_out_ignored() {
        let doc = sample_doc();
        let target = hero(&doc);
        let other = doc.find_first("button").unwrap();
        let mut engine = DragEngine::new();
        engine.hover_in(&doc, target);
        engine.hover_out(other);
        assert_eq!(engine.hovered(), Some(target));
    }

    #[test]
    fn test_interactive_and_structural_tags_not_draggable() {
        let doc = sample_doc();
        let mut engine = DragEngine::new();
        engine.hover_in(&doc, doc.find_first("button").unwrap());
        assert_eq!(engine.state(), DragState::Idle);
        engine.hover_in(&doc, doc.body());
        assert_eq!(engine.state(), DragState::Idle);
        let text = *doc.children(doc.body()).last().unwrap();
        assert!(!doc.is_element(text));
        engine.hover_in(&doc, text);
        assert_eq!(engine.state(), DragState::Idle);
    }

    #[test]
    fn test_press_requires_hover() {
        let doc = sample_doc();
        let target = hero(&doc);
        let mut engine = DragEngine::new();
        let overrides = HashMap::new();
        assert!(!engine.press(&overrides, target, 4.0, 4.0));
        assert_eq!(engine.state(), DragState::Idle);
    }

    #[test]
    fn test_live_feedback_during_drag() {
        let doc = sample_doc();
        let target = hero(&doc);
        let mut engine = DragEngine::new();
        let mut overrides = HashMap::new();
        engine.hover_in(&doc, target);
        assert!(engine.press(&overrides, target, 10.0, 10.0));
        engine.pointer_moved(&mut overrides, 13.5, 8.0);
        assert_eq!(
            overrides.get(&target).map(String::as_str),
            Some("translate(3.5px, -2px)")
        );
    }

    #[test]
    fn test_one_pixel_wiggle_reports_nothing() {
        let doc = sample_doc();
        let target = hero(&doc);
        let mut engine = DragEngine::new();
        let mut overrides = HashMap::new();
        engine.hover_in(&doc, target);
        engine.press(&overrides, target, 0.0, 0.0);
        let report = engine.release(&doc, &mut overrides, 1.0, 1.0);
        assert_eq!(report, None);
        assert_eq!(engine.state(), DragState::Idle);
        assert_eq!(
            overrides.get(&target).map(String::as_str),
            Some("translate(1.00px, 1.00px)")
        );
    }

    #[test]
    fn test_two_pixel_drag_reports() {
        let doc = sample_doc();
        let target = hero(&doc);
        let mut engine = DragEngine::new();
        let mut overrides = HashMap::new();
        engine.hover_in(&doc, target);
        engine.press(&overrides, target, 0.0, 0.0);
        let report = engine.release(&doc, &mut overrides, 2.0, 0.0).unwrap();
        assert_eq!(report.selector, "div#hero");
        assert_eq!(report.transform, "translate(2.00px, 0.00px)");
    }

    #[test]
    fn test_origin_accumulates_across_drags() {
        let doc = sample_doc();
        let target = hero(&doc);
        let mut engine = DragEngine::new();
        let mut overrides = HashMap::new();
        overrides.insert(target, "translate(5.00px, 0.00px)".to_string());
        engine.hover_in(&doc, target);
        engine.press(&overrides, target, 0.0, 0.0);
        let report = engine.release(&doc, &mut overrides, 2.0, 3.0).unwrap();
        assert_eq!(report.transform, "translate(7.00px, 3.00px)");
    }

    #[test]
    fn test_zero_net_translation_clears_override() {
        let doc = sample_doc();
        let target = hero(&doc);
        let mut engine = DragEngine::new();
        let mut overrides = HashMap::new();
        engine.hover_in(&doc, target);
        engine.press(&overrides, target, 5.0, 5.0);
        engine.pointer_moved(&mut overrides, 9.0, 9.0);
        assert!(overrides.contains_key(&target));
        let report = engine.release(&doc, &mut overrides, 5.0, 5.0);
        assert_eq!(report, None);
        assert!(!overrides.contains_key(&target));
    }

    #[test]
    fn test_hover_ignored_while_dragging() {
        let doc = sample_doc();
        let target = hero(&doc);
        let mut engine = DragEngine::new();
        let mut overrides = HashMap::new();
        engine.hover_in(&doc, target);
        engine.press(&overrides, target, 0.0, 0.0);
        engine.hover_out(target);
        assert!(engine.is_dragging());
        engine.pointer_moved(&mut overrides, 4.0, 0.0);
        assert!(engine.release(&doc, &mut overrides, 4.0, 0.0).is_some());
    }
}
