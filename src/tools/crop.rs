//! Crop: a rectangle starting at the full canvas, adjusted by dragging a
//! fresh rect, grabbing one of the 8 handles, or picking an aspect-ratio
//! preset. `apply` re-slices every layer and resizes the canvas; `cancel`
//! reverts to full-canvas bounds without touching any layer.

use image::Rgba;

use crate::context::EditorCtx;
use crate::selection::Bounds;
use crate::surface::Surface;
use crate::tools::{
    hit_test_handles, ControlKind, Gesture, Handle, OptionValue, PointerInput, Tool, ToolKind,
    ToolOption,
};

/// Smallest crop edge, in document units.
const MIN_CROP: f32 = 10.0;
/// Handle grab distance in document units.
const HANDLE_THRESHOLD: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AspectRatio {
    Free,
    Square,
    FourThree,
    ThreeFour,
    SixteenNine,
    NineSixteen,
    Original,
}

impl AspectRatio {
    fn ratio(&self, canvas_w: u32, canvas_h: u32) -> Option<f32> {
        match self {
            AspectRatio::Free => None,
            AspectRatio::Square => Some(1.0),
            AspectRatio::FourThree => Some(4.0 / 3.0),
            AspectRatio::ThreeFour => Some(3.0 / 4.0),
            AspectRatio::SixteenNine => Some(16.0 / 9.0),
            AspectRatio::NineSixteen => Some(9.0 / 16.0),
            AspectRatio::Original => Some(canvas_w as f32 / canvas_h as f32),
        }
    }

    fn key(&self) -> &'static str {
        match self {
            AspectRatio::Free => "free",
            AspectRatio::Square => "1:1",
            AspectRatio::FourThree => "4:3",
            AspectRatio::ThreeFour => "3:4",
            AspectRatio::SixteenNine => "16:9",
            AspectRatio::NineSixteen => "9:16",
            AspectRatio::Original => "original",
        }
    }
}

pub struct CropTool {
    bounds: Option<Bounds>,
    aspect: AspectRatio,
    active_handle: Option<Handle>,
    gesture: Gesture,
}

impl CropTool {
    pub fn new() -> Self {
        Self {
            bounds: None,
            aspect: AspectRatio::Free,
            active_handle: None,
            gesture: Gesture::default(),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    fn full_canvas(ctx: &EditorCtx) -> Bounds {
        Bounds::new(0.0, 0.0, ctx.doc.width() as f32, ctx.doc.height() as f32)
    }

    /// New crop rect from a drag, aspect-constrained and clamped inside
    /// the canvas.
    fn drag_rect(&self, ctx: &EditorCtx, start: (f32, f32), end: (f32, f32)) -> Bounds {
        let mut x = start.0.min(end.0);
        let mut y = start.1.min(end.1);
        let mut w = (end.0 - start.0).abs();
        let mut h = (end.1 - start.1).abs();

        if let Some(ratio) = self.aspect.ratio(ctx.doc.width(), ctx.doc.height()) {
            if h > 0.0 && w / h > ratio {
                w = h * ratio;
            } else {
                h = w / ratio;
            }
        }

        let canvas_w = ctx.doc.width() as f32;
        let canvas_h = ctx.doc.height() as f32;
        x = x.clamp(0.0, (canvas_w - w).max(0.0));
        y = y.clamp(0.0, (canvas_h - h).max(0.0));
        w = w.min(canvas_w - x);
        h = h.min(canvas_h - y);
        Bounds::new(x, y, w, h)
    }

    /// Resize the current rect by dragging a handle to `point`.
    fn resize_with_handle(bounds: Bounds, handle: Handle, point: (f32, f32)) -> Bounds {
        let (px, py) = point;
        let mut x = bounds.x;
        let mut y = bounds.y;
        let mut w = bounds.width;
        let mut h = bounds.height;
        let right = bounds.x + bounds.width;
        let bottom = bounds.y + bounds.height;

        match handle {
            Handle::NorthWest => {
                x = px;
                y = py;
                w = right - px;
                h = bottom - py;
            }
            Handle::North => {
                y = py;
                h = bottom - py;
            }
            Handle::NorthEast => {
                y = py;
                w = px - bounds.x;
                h = bottom - py;
            }
            Handle::East => w = px - bounds.x,
            Handle::SouthEast => {
                w = px - bounds.x;
                h = py - bounds.y;
            }
            Handle::South => h = py - bounds.y,
            Handle::SouthWest => {
                x = px;
                w = right - px;
                h = py - bounds.y;
            }
            Handle::West => {
                x = px;
                w = right - px;
            }
        }

        if w < MIN_CROP {
            w = MIN_CROP;
        }
        if h < MIN_CROP {
            h = MIN_CROP;
        }
        Bounds::new(x, y, w, h)
    }

    /// Commit the crop: re-slice layers, resize the canvas, push history.
    pub fn apply(&mut self, ctx: &mut EditorCtx) {
        let Some(b) = self.bounds else {
            return;
        };
        if b.width < 1.0 || b.height < 1.0 {
            return;
        }
        let (x, y) = (b.x.round() as i32, b.y.round() as i32);
        let (w, h) = (b.width.round() as u32, b.height.round() as u32);
        match ctx.doc.crop_to(x, y, w, h, ctx.events) {
            Ok(()) => {
                ctx.push_history("Crop");
                self.bounds = Some(Self::full_canvas(&*ctx));
                ctx.request_render();
            }
            Err(e) => log_warn!("crop rejected: {}", e),
        }
    }

    /// Drop any adjustment and go back to full-canvas bounds. Layers are
    /// untouched.
    pub fn cancel_crop(&mut self, ctx: &mut EditorCtx) {
        self.bounds = Some(Self::full_canvas(&*ctx));
        ctx.request_render();
    }
}

impl Default for CropTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CropTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Crop
    }

    fn activate(&mut self, ctx: &mut EditorCtx) {
        self.bounds = Some(Self::full_canvas(&*ctx));
        ctx.request_render();
    }

    fn deactivate(&mut self, _ctx: &mut EditorCtx) {
        self.bounds = None;
        self.active_handle = None;
    }

    fn pointer_down(&mut self, _ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        self.active_handle = self
            .bounds
            .and_then(|b| hit_test_handles(b, input.x, input.y, HANDLE_THRESHOLD));
        if self.active_handle.is_none() {
            // Start a fresh rect from the press point.
            self.bounds = Some(Bounds::new(input.x, input.y, 0.0, 0.0));
        }
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        self.gesture.update(input.x, input.y);
        match (self.active_handle, self.bounds) {
            (Some(handle), Some(bounds)) => {
                self.bounds = Some(Self::resize_with_handle(bounds, handle, (input.x, input.y)));
            }
            _ => {
                self.bounds =
                    Some(self.drag_rect(&*ctx, self.gesture.start, self.gesture.current));
            }
        }
        ctx.request_render();
    }

    fn pointer_up(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {
        self.active_handle = None;
        self.gesture.end();
    }

    /// Pointer-cancel mid-adjustment reverts to full-canvas bounds; the
    /// document is untouched because crop only commits via `apply`.
    fn cancel(&mut self, ctx: &mut EditorCtx) {
        self.gesture.end();
        self.active_handle = None;
        self.cancel_crop(ctx);
    }

    fn render_overlay(&self, _ctx: &EditorCtx, overlay: &mut Surface) {
        if let Some(b) = self.bounds {
            crate::raster::stroke_rect(
                overlay,
                b.x,
                b.y,
                b.width,
                b.height,
                1.0,
                Rgba([255, 255, 255, 255]),
            );
            for handle in Handle::all() {
                let (hx, hy) = handle.anchor(b);
                crate::raster::fill_rounded_rect(
                    overlay,
                    hx - 4.0,
                    hy - 4.0,
                    8.0,
                    8.0,
                    0.0,
                    Rgba([255, 255, 255, 255]),
                );
            }
        }
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    fn options(&self) -> Vec<ToolOption> {
        vec![
            ToolOption {
                key: "aspectRatio",
                label: "Aspect Ratio",
                control: ControlKind::Select {
                    choices: &["free", "1:1", "4:3", "3:4", "16:9", "9:16", "original"],
                },
                value: OptionValue::Choice(self.aspect.key()),
            },
            ToolOption {
                key: "apply",
                label: "Apply Crop",
                control: ControlKind::Button,
                value: OptionValue::Trigger,
            },
            ToolOption {
                key: "cancel",
                label: "Cancel",
                control: ControlKind::Button,
                value: OptionValue::Trigger,
            },
        ]
    }

    fn set_option(&mut self, ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("aspectRatio", OptionValue::Choice(choice)) => {
                self.aspect = match choice {
                    "free" => AspectRatio::Free,
                    "1:1" => AspectRatio::Square,
                    "4:3" => AspectRatio::FourThree,
                    "3:4" => AspectRatio::ThreeFour,
                    "16:9" => AspectRatio::SixteenNine,
                    "9:16" => AspectRatio::NineSixteen,
                    "original" => AspectRatio::Original,
                    _ => return false,
                };
                // Re-constrain an existing rect to the new ratio.
                if let (Some(b), Some(ratio)) = (
                    self.bounds,
                    self.aspect.ratio(ctx.doc.width(), ctx.doc.height()),
                ) {
                    if b.width > 0.0 {
                        let new_h =
                            (b.width / ratio).min(ctx.doc.height() as f32 - b.y);
                        self.bounds = Some(Bounds::new(b.x, b.y, b.width, new_h));
                        ctx.request_render();
                    }
                }
            }
            ("apply", _) => self.apply(ctx),
            ("cancel", _) => self.cancel_crop(ctx),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_resize_moves_matching_edges() {
        let b = Bounds::new(10.0, 10.0, 80.0, 60.0);
        let se = CropTool::resize_with_handle(b, Handle::SouthEast, (70.0, 50.0));
        assert_eq!((se.x, se.y, se.width, se.height), (10.0, 10.0, 60.0, 40.0));

        let nw = CropTool::resize_with_handle(b, Handle::NorthWest, (20.0, 20.0));
        assert_eq!((nw.x, nw.y, nw.width, nw.height), (20.0, 20.0, 70.0, 50.0));

        let e = CropTool::resize_with_handle(b, Handle::East, (100.0, 999.0));
        assert_eq!((e.width, e.height), (90.0, 60.0));
    }

    #[test]
    fn handle_resize_enforces_minimum() {
        let b = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let tiny = CropTool::resize_with_handle(b, Handle::SouthEast, (2.0, 3.0));
        assert_eq!(tiny.width, MIN_CROP);
        assert_eq!(tiny.height, MIN_CROP);
    }
}
