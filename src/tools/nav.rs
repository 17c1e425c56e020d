//! Viewport navigation tools. Hand pans by view-space deltas; Zoom steps
//! the zoom table at the clicked anchor (alt inverts the direction).
//! Neither touches the document, so neither pushes history.

use crate::context::EditorCtx;
use crate::events::Event;
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

pub struct HandTool {
    gesture: Gesture,
    last_view: (f32, f32),
}

impl HandTool {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::default(),
            last_view: (0.0, 0.0),
        }
    }
}

impl Default for HandTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for HandTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Hand
    }

    fn pointer_down(&mut self, _ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        self.last_view = (input.view_x, input.view_y);
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        let dx = input.view_x - self.last_view.0;
        let dy = input.view_y - self.last_view.1;
        self.last_view = (input.view_x, input.view_y);
        ctx.viewport.pan_by(dx, dy);
        ctx.events.emit(&Event::CanvasPan {
            pan_x: ctx.viewport.pan_x,
            pan_y: ctx.viewport.pan_y,
        });
        ctx.request_render();
    }

    fn pointer_up(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {
        self.gesture.end();
    }

    fn cancel(&mut self, _ctx: &mut EditorCtx) {
        self.gesture.end();
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }
}

pub struct ZoomTool {
    zoom_in: bool,
    gesture: Gesture,
}

impl ZoomTool {
    pub fn new() -> Self {
        Self {
            zoom_in: true,
            gesture: Gesture::default(),
        }
    }
}

impl Default for ZoomTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ZoomTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Zoom
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        let anchor = Some((input.view_x, input.view_y));
        let inward = self.zoom_in != input.modifiers.alt;
        if inward {
            ctx.viewport.zoom_in(anchor);
        } else {
            ctx.viewport.zoom_out(anchor);
        }
        ctx.events.emit(&Event::CanvasZoom {
            zoom: ctx.viewport.zoom,
        });
        ctx.request_render();
    }

    fn pointer_move(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {}

    fn pointer_up(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {
        self.gesture.end();
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    fn options(&self) -> Vec<ToolOption> {
        vec![ToolOption {
            key: "zoomIn",
            label: "Zoom In",
            control: ControlKind::Checkbox,
            value: OptionValue::Bool(self.zoom_in),
        }]
    }

    fn set_option(&mut self, _ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("zoomIn", OptionValue::Bool(b)) => self.zoom_in = b,
            _ => return false,
        }
        true
    }
}
