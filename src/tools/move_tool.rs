//! Move/transform: drags the active layer's position, or resizes it
//! through the 8 bounding-box handles.
//!
//! Handle resizes are non-destructive: the layer's pixel buffer is
//! captured ONCE at gesture start and every intermediate size resamples
//! from that original — never from an already-resized buffer, which would
//! compound resampling loss.

use image::Rgba;

use crate::context::EditorCtx;
use crate::selection::Bounds;
use crate::surface::{Interpolation, Surface};
use crate::tools::{
    hit_test_handles, ControlKind, Gesture, Handle, OptionValue, PointerInput, Tool, ToolKind,
    ToolOption,
};

/// Smallest layer edge a handle-drag can produce.
const MIN_DIMENSION: f32 = 10.0;
/// Snap distance in document units.
const SNAP_THRESHOLD: f32 = 8.0;

#[derive(Debug)]
enum DragMode {
    Moving,
    Resizing { handle: Handle },
}

/// Everything captured at gesture start so both resize-from-original and
/// cancel can restore it.
struct GestureOrigin {
    position: (f32, f32),
    /// Original pixels + bounds; present only for raster layers.
    surface: Option<Surface>,
    bounds: Bounds,
}

pub struct MoveTool {
    snap: bool,
    show_handles: bool,
    gesture: Gesture,
    mode: Option<DragMode>,
    origin: Option<GestureOrigin>,
}

impl MoveTool {
    pub fn new() -> Self {
        Self {
            snap: false,
            show_handles: true,
            gesture: Gesture::default(),
            mode: None,
            origin: None,
        }
    }

    /// Snap a layer's edges/centers to the canvas edges/centers when
    /// within the threshold.
    fn snap_position(
        position: (f32, f32),
        size: (f32, f32),
        canvas: (f32, f32),
    ) -> (f32, f32) {
        let snap_axis = |pos: f32, len: f32, canvas_len: f32| -> f32 {
            let candidates = [
                (pos, 0.0),                                    // left/top edge to canvas edge
                (pos + len, canvas_len),                       // right/bottom edge
                (pos + len / 2.0, canvas_len / 2.0),           // centers
            ];
            for (edge, target) in candidates {
                if (edge - target).abs() <= SNAP_THRESHOLD {
                    return pos + (target - edge);
                }
            }
            pos
        };
        (
            snap_axis(position.0, size.0, canvas.0),
            snap_axis(position.1, size.1, canvas.1),
        )
    }

    /// New bounds from the captured origin, the grabbed handle, and the
    /// total drag delta.
    fn resized_bounds(origin: Bounds, handle: Handle, dx: f32, dy: f32) -> Bounds {
        let mut x = origin.x;
        let mut y = origin.y;
        let mut w = origin.width;
        let mut h = origin.height;

        match handle {
            Handle::NorthWest => {
                x += dx;
                y += dy;
                w -= dx;
                h -= dy;
            }
            Handle::North => {
                y += dy;
                h -= dy;
            }
            Handle::NorthEast => {
                y += dy;
                w += dx;
                h -= dy;
            }
            Handle::East => w += dx,
            Handle::SouthEast => {
                w += dx;
                h += dy;
            }
            Handle::South => h += dy,
            Handle::SouthWest => {
                x += dx;
                w -= dx;
                h += dy;
            }
            Handle::West => {
                x += dx;
                w -= dx;
            }
        }

        // Enforce the minimum by pulling the dragged edge back.
        if w < MIN_DIMENSION {
            if matches!(handle, Handle::NorthWest | Handle::SouthWest | Handle::West) {
                x = origin.x + origin.width - MIN_DIMENSION;
            }
            w = MIN_DIMENSION;
        }
        if h < MIN_DIMENSION {
            if matches!(handle, Handle::NorthWest | Handle::North | Handle::NorthEast) {
                y = origin.y + origin.height - MIN_DIMENSION;
            }
            h = MIN_DIMENSION;
        }
        Bounds::new(x, y, w, h)
    }
}

impl Default for MoveTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for MoveTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Move
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        let layer_id = ctx.doc.active_layer_id();
        if ctx.doc.active_layer().locked {
            return;
        }
        let Some(bounds) = ctx.doc.layer_bounds(layer_id, ctx.fonts) else {
            return;
        };
        self.gesture.begin(input.x, input.y);

        // Handle grab distance shrinks as the view zooms in.
        let threshold = (8.0 / ctx.viewport.scale()).max(2.0);
        let handle = if self.show_handles {
            hit_test_handles(bounds, input.x, input.y, threshold)
        } else {
            None
        };

        let layer = ctx.doc.active_layer();
        self.origin = Some(GestureOrigin {
            position: layer.position,
            surface: layer.as_surface().cloned(),
            bounds,
        });
        self.mode = Some(match handle {
            Some(handle) => DragMode::Resizing { handle },
            None => DragMode::Moving,
        });
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        let (dx, dy) = self.gesture.update(input.x, input.y);
        let total_dx = self.gesture.current.0 - self.gesture.start.0;
        let total_dy = self.gesture.current.1 - self.gesture.start.1;

        let Some(origin) = &self.origin else {
            return;
        };
        let canvas = (ctx.doc.width() as f32, ctx.doc.height() as f32);
        let snap = self.snap;

        match self.mode {
            Some(DragMode::Moving) => {
                let layer = ctx.doc.active_layer_mut();
                if layer.locked {
                    return;
                }
                layer.position.0 += dx;
                layer.position.1 += dy;
                if snap {
                    let size = (origin.bounds.width, origin.bounds.height);
                    layer.position = Self::snap_position(layer.position, size, canvas);
                }
                ctx.request_render();
            }
            Some(DragMode::Resizing { handle }) => {
                let new_bounds = Self::resized_bounds(origin.bounds, handle, total_dx, total_dy);
                let Some(original) = &origin.surface else {
                    return; // only raster layers resize through handles
                };
                let resampled = original.resized(
                    new_bounds.width.round().max(1.0) as u32,
                    new_bounds.height.round().max(1.0) as u32,
                    Interpolation::Bilinear,
                );
                let layer = ctx.doc.active_layer_mut();
                if layer.locked {
                    return;
                }
                layer.position = (new_bounds.x, new_bounds.y);
                if let Some(surface) = layer.as_surface_mut() {
                    *surface = resampled;
                }
                ctx.request_render();
            }
            None => {}
        }
    }

    fn pointer_up(&mut self, ctx: &mut EditorCtx, _input: &PointerInput) {
        if self.gesture.dragging && self.mode.is_some() {
            let moved = self.gesture.current != self.gesture.start;
            if moved {
                match self.mode {
                    Some(DragMode::Resizing { .. }) => ctx.push_history("Transform Layer"),
                    _ => ctx.push_history("Move Layer"),
                }
            }
        }
        self.gesture.end();
        self.mode = None;
        self.origin = None;
    }

    /// Put the layer back exactly as it was at drag start: position, and
    /// for a resize the original un-resampled pixels.
    fn cancel(&mut self, ctx: &mut EditorCtx) {
        if let Some(origin) = self.origin.take() {
            let layer = ctx.doc.active_layer_mut();
            layer.position = origin.position;
            if let (Some(original), Some(surface)) = (origin.surface, layer.as_surface_mut()) {
                *surface = original;
            }
            ctx.request_render();
        }
        self.gesture.end();
        self.mode = None;
    }

    fn render_overlay(&self, ctx: &EditorCtx, overlay: &mut Surface) {
        if !self.show_handles {
            return;
        }
        let id = ctx.doc.active_layer_id();
        if let Some(b) = ctx.doc.layer_bounds(id, ctx.fonts) {
            crate::raster::stroke_rect(
                overlay,
                b.x,
                b.y,
                b.width,
                b.height,
                1.0,
                Rgba([0, 102, 255, 255]),
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
                key: "snap",
                label: "Snap to Canvas",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.snap),
            },
            ToolOption {
                key: "showTransform",
                label: "Show Transform Controls",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.show_handles),
            },
        ]
    }

    fn set_option(&mut self, _ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("snap", OptionValue::Bool(b)) => self.snap = b,
            ("showTransform", OptionValue::Bool(b)) => self.show_handles = b,
            _ => return false,
        }
        true
    }
}
