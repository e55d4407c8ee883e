use std::collections::HashMap;

use ratatui::layout::{Position, Rect};

use crate::compose;
use crate::dom::{Document, Element, NodeId};
use crate::drag::{DragEngine, DragReport};
use crate::project::{FileNode, ResponsiveMode};
use crate::transform;

/// Terminal-cell width of the mobile viewport, the wireframe stand-in for a
/// 375px device.
pub const MOBILE_VIEWPORT_COLS: u16 = 47;

/// Nesting levels drawn as boxes. Anything deeper is summarized into its
/// ancestor's content text.
const MAX_BOX_DEPTH: u16 = 4;

/// Elements with no visual box of their own.
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "meta", "link", "title", "base"];

#[derive(Debug, Clone)]
pub struct PreviewBox {
    pub node: NodeId,
    /// Layout-space position: relative to the panel origin, before scroll
    /// and drag offsets.
    pub rect: Rect,
    pub label: String,
    /// Content snippet shown inside leaf boxes.
    pub text: String,
    pub depth: u16,
}

/// Wireframe rendering of the composed document.
///
/// `sync` recomposes the file set and rebuilds the element tree and layout
/// only when the composed markup, viewport, or responsive target actually
/// changed; the composed string doubles as the cache key. A markup change
/// also resets the drag engine and its inline overrides, the equivalent of
/// remounting the document.
pub struct Preview {
    key: String,
    pub document: Document,
    pub boxes: Vec<PreviewBox>,
    pub engine: DragEngine,
    pub overrides: HashMap<NodeId, String>,
    pub scroll: u16,
    total_rows: u16,
    viewport: Rect,
    mode: ResponsiveMode,
}

impl Preview {
    pub fn new() -> Self {
        Self {
            key: String::new(),
            document: Document::parse(""),
            boxes: Vec::new(),
            engine: DragEngine::new(),
            overrides: HashMap::new(),
            scroll: 0,
            total_rows: 0,
            viewport: Rect::default(),
            mode: ResponsiveMode::Desktop,
        }
    }

    pub fn sync(&mut self, files: &[FileNode], mode: ResponsiveMode, area: Rect) {
        let composed = compose::compose(files, true);
        if self.key == composed && self.mode == mode && self.viewport == area {
            return;
        }
        if self.key != composed {
            self.document = Document::parse(&composed);
            self.engine = DragEngine::new();
            self.overrides.clear();
            self.scroll = 0;
        }
        self.key = composed;
        self.mode = mode;
        self.viewport = area;
        self.layout();
    }

    fn layout(&mut self) {
        self.boxes.clear();
        let width = match self.mode {
            ResponsiveMode::Mobile => MOBILE_VIEWPORT_COLS.min(self.viewport.width),
            ResponsiveMode::Desktop => self.viewport.width,
        };
        if width < 4 || self.viewport.height == 0 {
            self.total_rows = 0;
            return;
        }
        let left = (self.viewport.width - width) / 2;
        let body = self.document.body();
        let children: Vec<NodeId> = self.document.children(body).to_vec();
        let mut row = 0;
        for child in children {
            row = self.place(child, left, row, width, 0);
        }
        self.total_rows = row;
        let max_scroll = self.total_rows.saturating_sub(self.viewport.height);
        self.scroll = self.scroll.min(max_scroll);
    }

    /// Lays out `node` as a block starting at `row` and returns the next
    /// free row. Children stack vertically inside their parent's border.
    fn place(&mut self, node: NodeId, x: u16, row: u16, width: u16, depth: u16) -> u16 {
        let label = match self.document.element(node) {
            Some(element) => {
                if SKIPPED_TAGS.contains(&element.tag.as_str()) {
                    return row;
                }
                box_label(element)
            }
            None => return row,
        };

        let index = self.boxes.len();
        self.boxes.push(PreviewBox {
            node,
            rect: Rect::new(x, row, width, 0),
            label,
            text: String::new(),
            depth,
        });

        // Saturating row math: a pathologically large document clamps at the
        // bottom instead of overflowing.
        let mut inner_row = row.saturating_add(1);
        if depth + 1 < MAX_BOX_DEPTH && width > 4 {
            let children: Vec<NodeId> = self.document.children(node).to_vec();
            for child in children {
                inner_row = self.place(child, x + 1, inner_row, width - 2, depth + 1);
            }
        }

        let height = if inner_row == row.saturating_add(1) {
            // Leaf box: one content row between the borders.
            let text = self.document.text_content(node);
            self.boxes[index].text = truncate_text(&text, width.saturating_sub(2) as usize);
            3
        } else {
            (inner_row - row).saturating_add(1)
        };
        self.boxes[index].rect = Rect::new(x, row, width, height);
        row.saturating_add(height)
    }

    /// Where a box lands on screen once scroll and any drag translation are
    /// applied, clipped to the panel. `None` when fully outside.
    pub fn rendered_rect(&self, preview_box: &PreviewBox) -> Option<Rect> {
        let (dx, dy) = match self.overrides.get(&preview_box.node) {
            Some(value) => transform::decode_translation(value),
            None => (0.0, 0.0),
        };
        let area = self.viewport;
        let x = i32::from(area.x) + i32::from(preview_box.rect.x) + dx.round() as i32;
        let y = i32::from(area.y) + i32::from(preview_box.rect.y) - i32::from(self.scroll)
            + dy.round() as i32;
        let x0 = x.max(i32::from(area.x));
        let y0 = y.max(i32::from(area.y));
        let x1 = (x + i32::from(preview_box.rect.width)).min(i32::from(area.right()));
        let y1 = (y + i32::from(preview_box.rect.height)).min(i32::from(area.bottom()));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(
            x0 as u16,
            y0 as u16,
            (x1 - x0) as u16,
            (y1 - y0) as u16,
        ))
    }

    /// Topmost box under the given screen cell. Boxes are stored in paint
    /// order, so the last hit is the visually topmost one.
    pub fn hit_test(&self, x: u16, y: u16) -> Option<NodeId> {
        for preview_box in self.boxes.iter().rev() {
            if let Some(rect) = self.rendered_rect(preview_box) {
                if rect.contains(Position::new(x, y)) {
                    return Some(preview_box.node);
                }
            }
        }
        None
    }

    /// Pointer moved with no button held: update hover highlighting.
    pub fn hover(&mut self, x: u16, y: u16) {
        let target = self.hit_test(x, y);
        if let Some(current) = self.engine.hovered() {
            if target != Some(current) {
                self.engine.hover_out(current);
            }
        }
        if let Some(target) = target {
            self.engine.hover_in(&self.document, target);
        }
    }

    /// Primary button pressed. Returns true when a drag started.
    pub fn press(&mut self, x: u16, y: u16) -> bool {
        self.hover(x, y);
        match self.hit_test(x, y) {
            Some(target) => self
                .engine
                .press(&self.overrides, target, f64::from(x), f64::from(y)),
            None => false,
        }
    }

    /// Pointer moved with the button held.
    pub fn drag_to(&mut self, x: u16, y: u16) {
        if self.engine.is_dragging() {
            self.engine
                .pointer_moved(&mut self.overrides, f64::from(x), f64::from(y));
        } else {
            self.hover(x, y);
        }
    }

    /// Primary button released. Returns a report when the gesture qualified.
    pub fn release(&mut self, x: u16, y: u16) -> Option<DragReport> {
        self.engine
            .release(&self.document, &mut self.overrides, f64::from(x), f64::from(y))
    }

    pub fn scroll_down(&mut self, amount: u16) {
        let max_scroll = self.total_rows.saturating_sub(self.viewport.height);
        self.scroll = self.scroll.saturating_add(amount).min(max_scroll);
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll = self.scroll.saturating_sub(amount);
    }

    pub fn total_rows(&self) -> u16 {
        self.total_rows
    }
}

fn box_label(element: &Element) -> String {
    let mut label = element.tag.clone();
    if let Some(id) = &element.id {
        label.push('#');
        label.push_str(id);
    }
    for class in &element.classes {
        label.push('.');
        label.push_str(class);
    }
    label
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
