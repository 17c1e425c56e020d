//! Gradient fills spanning the drag vector: linear (projection), radial
//! (distance over drag length) and angular (conic sweep anchored at the
//! drag start, base angle = atan2 of the drag vector).

use std::f32::consts::TAU;

use image::Rgba;

use crate::context::EditorCtx;
use crate::surface::Surface;
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
    Angle,
}

#[derive(Clone, Debug)]
pub struct GradientOptions {
    pub kind: GradientKind,
    /// 0–100.
    pub opacity: f32,
    /// Swap foreground/background endpoints.
    pub reverse: bool,
}

impl Default for GradientOptions {
    fn default() -> Self {
        Self {
            kind: GradientKind::Linear,
            opacity: 100.0,
            reverse: false,
        }
    }
}

fn lerp_color(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    Rgba([
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t).round() as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t).round() as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t).round() as u8,
        255,
    ])
}

/// Gradient parameter at a point for a drag from `start` to `end`.
pub fn gradient_t(kind: GradientKind, start: (f32, f32), end: (f32, f32), x: f32, y: f32) -> f32 {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len_sq = dx * dx + dy * dy;
    match kind {
        GradientKind::Linear => {
            if len_sq == 0.0 {
                return 0.0;
            }
            (((x - start.0) * dx + (y - start.1) * dy) / len_sq).clamp(0.0, 1.0)
        }
        GradientKind::Radial => {
            let len = len_sq.sqrt();
            if len == 0.0 {
                return 0.0;
            }
            (((x - start.0).powi(2) + (y - start.1).powi(2)).sqrt() / len).clamp(0.0, 1.0)
        }
        GradientKind::Angle => {
            let base = dy.atan2(dx);
            let angle = (y - start.1).atan2(x - start.0);
            let mut sweep = angle - base;
            if sweep < 0.0 {
                sweep += TAU;
            }
            sweep / TAU
        }
    }
}

/// Paint a gradient across an entire surface (layer-local), with the drag
/// endpoints given in document space and the layer position to subtract.
pub fn paint_gradient(
    surface: &mut Surface,
    layer_pos: (f32, f32),
    kind: GradientKind,
    start: (f32, f32),
    end: (f32, f32),
    from: Rgba<u8>,
    to: Rgba<u8>,
    opacity: f32,
) {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    for y in 0..surface.height() as i32 {
        for x in 0..surface.width() as i32 {
            let doc_x = x as f32 + layer_pos.0 + 0.5;
            let doc_y = y as f32 + layer_pos.1 + 0.5;
            let t = gradient_t(kind, start, end, doc_x, doc_y);
            let mut color = lerp_color(from, to, t);
            color[3] = alpha;
            surface.paint_pixel(x, y, color);
        }
    }
}

pub struct GradientTool {
    options: GradientOptions,
    gesture: Gesture,
}

impl GradientTool {
    pub fn new() -> Self {
        Self {
            options: GradientOptions::default(),
            gesture: Gesture::default(),
        }
    }
}

impl Default for GradientTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for GradientTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Gradient
    }

    fn pointer_down(&mut self, _ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if self.gesture.dragging {
            self.gesture.update(input.x, input.y);
            // Preview is overlay-only; nothing is committed until
            // pointer-up.
            ctx.request_render();
        }
    }

    fn pointer_up(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        self.gesture.update(input.x, input.y);
        let start = self.gesture.start;
        let end = self.gesture.current;
        self.gesture.end();

        let (mut from, mut to) = (ctx.colors.foreground, ctx.colors.background);
        if self.options.reverse {
            std::mem::swap(&mut from, &mut to);
        }
        let kind = self.options.kind;
        let opacity = self.options.opacity / 100.0;

        let layer = ctx.doc.active_layer_mut();
        if layer.locked {
            return;
        }
        let pos = layer.position;
        let Some(surface) = layer.as_surface_mut() else {
            return;
        };
        paint_gradient(surface, pos, kind, start, end, from, to, opacity);
        ctx.push_history("Gradient");
        ctx.request_render();
    }

    /// The gradient only commits at pointer-up, so cancel leaves the
    /// document untouched.
    fn cancel(&mut self, _ctx: &mut EditorCtx) {
        self.gesture.end();
    }

    fn render_overlay(&self, _ctx: &EditorCtx, overlay: &mut Surface) {
        if self.gesture.dragging {
            let (sx, sy) = self.gesture.start;
            let (cx, cy) = self.gesture.current;
            crate::raster::draw_line(overlay, sx, sy, cx, cy, 1.0, Rgba([0, 0, 0, 255]));
        }
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    fn options(&self) -> Vec<ToolOption> {
        vec![
            ToolOption {
                key: "type",
                label: "Type",
                control: ControlKind::Select { choices: &["linear", "radial", "angle"] },
                value: OptionValue::Choice(match self.options.kind {
                    GradientKind::Linear => "linear",
                    GradientKind::Radial => "radial",
                    GradientKind::Angle => "angle",
                }),
            },
            ToolOption {
                key: "opacity",
                label: "Opacity",
                control: ControlKind::Slider { min: 1.0, max: 100.0, unit: "%" },
                value: OptionValue::Number(self.options.opacity),
            },
            ToolOption {
                key: "reverse",
                label: "Reverse",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.options.reverse),
            },
        ]
    }

    fn set_option(&mut self, _ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("type", OptionValue::Choice("linear")) => self.options.kind = GradientKind::Linear,
            ("type", OptionValue::Choice("radial")) => self.options.kind = GradientKind::Radial,
            ("type", OptionValue::Choice("angle")) => self.options.kind = GradientKind::Angle,
            ("opacity", OptionValue::Number(n)) => self.options.opacity = n.clamp(1.0, 100.0),
            ("reverse", OptionValue::Bool(b)) => self.options.reverse = b,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn linear_t_projects_onto_drag_vector() {
        let start = (0.0, 0.0);
        let end = (100.0, 0.0);
        assert_eq!(gradient_t(GradientKind::Linear, start, end, 0.0, 50.0), 0.0);
        assert_eq!(gradient_t(GradientKind::Linear, start, end, 100.0, -20.0), 1.0);
        let mid = gradient_t(GradientKind::Linear, start, end, 50.0, 7.0);
        assert!((mid - 0.5).abs() < 1e-4);
        // Beyond the end clamps.
        assert_eq!(gradient_t(GradientKind::Linear, start, end, 150.0, 0.0), 1.0);
    }

    #[test]
    fn radial_t_is_distance_over_drag_length() {
        let start = (50.0, 50.0);
        let end = (50.0, 90.0); // radius 40
        assert_eq!(gradient_t(GradientKind::Radial, start, end, 50.0, 50.0), 0.0);
        let t = gradient_t(GradientKind::Radial, start, end, 70.0, 50.0);
        assert!((t - 0.5).abs() < 1e-4);
        assert_eq!(gradient_t(GradientKind::Radial, start, end, 50.0, 150.0), 1.0);
    }

    #[test]
    fn angular_t_sweeps_from_drag_angle() {
        let start = (0.0, 0.0);
        let end = (10.0, 0.0); // base angle 0
        assert!(gradient_t(GradientKind::Angle, start, end, 10.0, 0.001) < 0.01);
        let quarter = gradient_t(GradientKind::Angle, start, end, 0.0, 10.0);
        assert!((quarter - 0.25).abs() < 0.01);
        let half = gradient_t(GradientKind::Angle, start, end, -10.0, 0.0);
        assert!((half - 0.5).abs() < 0.01);
    }

    #[test]
    fn painted_gradient_hits_both_endpoints() {
        let mut surface = Surface::new(11, 1);
        paint_gradient(
            &mut surface,
            (0.0, 0.0),
            GradientKind::Linear,
            (0.0, 0.0),
            (11.0, 0.0),
            BLACK,
            WHITE,
            1.0,
        );
        assert!(surface.get_pixel(0, 0)[0] < 20);
        assert!(surface.get_pixel(10, 0)[0] > 235);
        // Monotone along the drag axis.
        let mut previous = -1i32;
        for x in 0..11 {
            let v = surface.get_pixel(x, 0)[0] as i32;
            assert!(v >= previous);
            previous = v;
        }
    }
}
