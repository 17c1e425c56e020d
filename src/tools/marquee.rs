//! Selection gestures: marquee (rectangle/ellipse bounds from a drag,
//! optional square/circle constraint) and lasso (freeform polygon).
//!
//! Both REPLACE any existing selection. Additive/subtractive combination
//! via shift/alt exists in the event contract but has no defined
//! semantics yet; holding those modifiers merely skips the upfront clear.

use image::Rgba;

use crate::context::EditorCtx;
use crate::selection::Bounds;
use crate::surface::Surface;
use crate::tools::shape::drag_bounds;
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarqueeShape {
    Rectangle,
    Ellipse,
}

pub struct MarqueeTool {
    shape: MarqueeShape,
    gesture: Gesture,
    preview: Option<Bounds>,
}

impl MarqueeTool {
    pub fn new() -> Self {
        Self {
            shape: MarqueeShape::Rectangle,
            gesture: Gesture::default(),
            preview: None,
        }
    }
}

impl Default for MarqueeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for MarqueeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Marquee
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        // TODO: additive/subtractive combination when shift/alt is held;
        // for now the modifiers only skip this clear and the new shape
        // replaces the selection at pointer-up.
        if !input.modifiers.shift && !input.modifiers.alt {
            ctx.selection.clear();
            ctx.events.emit(&crate::events::Event::SelectionClear);
        }
        self.preview = None;
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        self.gesture.update(input.x, input.y);
        let (x, y, w, h) = drag_bounds(
            self.gesture.start,
            self.gesture.current,
            input.modifiers.shift,
        );
        self.preview = Some(Bounds::new(x, y, w, h));
        ctx.request_render();
    }

    fn pointer_up(&mut self, ctx: &mut EditorCtx, _input: &PointerInput) {
        if self.gesture.dragging {
            if let Some(bounds) = self.preview {
                // Degenerate drags leave the selection cleared.
                if bounds.width > 1.0 && bounds.height > 1.0 {
                    match self.shape {
                        MarqueeShape::Rectangle => ctx.selection.set_rectangle(bounds),
                        MarqueeShape::Ellipse => ctx.selection.set_ellipse(bounds),
                    }
                    ctx.events.emit(&crate::events::Event::SelectionCreate);
                }
            }
        }
        self.preview = None;
        self.gesture.end();
        ctx.request_render();
    }

    fn cancel(&mut self, ctx: &mut EditorCtx) {
        self.preview = None;
        self.gesture.end();
        ctx.request_render();
    }

    fn render_overlay(&self, _ctx: &EditorCtx, overlay: &mut Surface) {
        if let Some(b) = self.preview {
            let color = Rgba([0, 0, 0, 255]);
            match self.shape {
                MarqueeShape::Rectangle => {
                    crate::raster::stroke_rect(overlay, b.x, b.y, b.width, b.height, 1.0, color)
                }
                MarqueeShape::Ellipse => {
                    crate::raster::stroke_ellipse(overlay, b.x, b.y, b.width, b.height, 1.0, color)
                }
            }
        }
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    fn options(&self) -> Vec<ToolOption> {
        vec![ToolOption {
            key: "shape",
            label: "Shape",
            control: ControlKind::Select { choices: &["rectangle", "ellipse"] },
            value: OptionValue::Choice(match self.shape {
                MarqueeShape::Rectangle => "rectangle",
                MarqueeShape::Ellipse => "ellipse",
            }),
        }]
    }

    fn set_option(&mut self, _ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("shape", OptionValue::Choice("rectangle")) => self.shape = MarqueeShape::Rectangle,
            ("shape", OptionValue::Choice("ellipse")) => self.shape = MarqueeShape::Ellipse,
            _ => return false,
        }
        true
    }
}

/// Freeform polygon selection. The path collects while dragging and is
/// closed implicitly at pointer-up.
pub struct LassoTool {
    gesture: Gesture,
    path: Vec<(f32, f32)>,
}

impl LassoTool {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::default(),
            path: Vec::new(),
        }
    }
}

impl Default for LassoTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for LassoTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Lasso
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        if !input.modifiers.shift && !input.modifiers.alt {
            ctx.selection.clear();
            ctx.events.emit(&crate::events::Event::SelectionClear);
        }
        self.path = vec![(input.x, input.y)];
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        self.gesture.update(input.x, input.y);
        self.path.push((input.x, input.y));
        ctx.request_render();
    }

    fn pointer_up(&mut self, ctx: &mut EditorCtx, _input: &PointerInput) {
        if self.gesture.dragging && self.path.len() >= 3 {
            ctx.selection.set_polygon(std::mem::take(&mut self.path));
            if ctx.selection.is_active() {
                ctx.events.emit(&crate::events::Event::SelectionCreate);
            }
        }
        self.path.clear();
        self.gesture.end();
        ctx.request_render();
    }

    fn cancel(&mut self, ctx: &mut EditorCtx) {
        self.path.clear();
        self.gesture.end();
        ctx.request_render();
    }

    fn render_overlay(&self, _ctx: &EditorCtx, overlay: &mut Surface) {
        if self.path.len() >= 2 {
            crate::raster::stroke_polygon(overlay, &self.path, 1.0, Rgba([0, 0, 0, 255]));
        }
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }
}
