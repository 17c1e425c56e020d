//! Eraser: the brush's dab interpolation, but composited as
//! "subtract from alpha" instead of painting over. A `block` mode stamps
//! a hard square instead of the round tip.

use crate::context::EditorCtx;
use crate::surface::Surface;
use crate::tools::brush::{dab_positions, BrushTip};
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EraserMode {
    Brush,
    Block,
}

#[derive(Clone, Debug)]
pub struct EraserOptions {
    pub size: f32,
    pub hardness: f32,
    pub opacity: f32,
    pub mode: EraserMode,
}

impl Default for EraserOptions {
    fn default() -> Self {
        Self {
            size: 20.0,
            hardness: 100.0,
            opacity: 100.0,
            mode: EraserMode::Brush,
        }
    }
}

/// Knock alpha out of a surface under the tip at a document-space center:
/// `alpha *= 1 - coverage * strength`.
fn erase_dab(
    surface: &mut Surface,
    layer_pos: (f32, f32),
    tip: &BrushTip,
    center: (f32, f32),
    size: f32,
    strength: f32,
    block: bool,
) {
    let half = size / 2.0;
    let x0 = (center.0 - layer_pos.0 - half).floor() as i32;
    let y0 = (center.1 - layer_pos.1 - half).floor() as i32;
    let span = size.ceil() as i32 + 1;
    for py in 0..span {
        for px in 0..span {
            let coverage = if block {
                let u = (px as f32 + 0.5) / size;
                let v = (py as f32 + 0.5) / size;
                if (0.0..1.0).contains(&u) && (0.0..1.0).contains(&v) {
                    1.0
                } else {
                    0.0
                }
            } else {
                tip.sample((px as f32 + 0.5) / size, (py as f32 + 0.5) / size)
            };
            if coverage <= 0.0 {
                continue;
            }
            let (x, y) = (x0 + px, y0 + py);
            let mut pixel = surface.get_pixel(x, y);
            if pixel[3] == 0 {
                continue;
            }
            let keep = 1.0 - coverage * strength;
            pixel[3] = (pixel[3] as f32 * keep).round().clamp(0.0, 255.0) as u8;
            surface.put_pixel(x, y, pixel);
        }
    }
}

pub struct EraserTool {
    options: EraserOptions,
    tip: BrushTip,
    gesture: Gesture,
    erased: bool,
}

impl EraserTool {
    pub fn new() -> Self {
        let options = EraserOptions::default();
        let tip = BrushTip::generate(options.size, options.hardness);
        Self {
            options,
            tip,
            gesture: Gesture::default(),
            erased: false,
        }
    }

    fn regenerate_tip(&mut self) {
        self.tip = BrushTip::generate(self.options.size, self.options.hardness);
    }

    fn erase_segment(&mut self, ctx: &mut EditorCtx, from: (f32, f32), to: (f32, f32)) {
        let strength = (self.options.opacity / 100.0).clamp(0.0, 1.0);
        let spacing = (self.options.size / 4.0).max(1.0);
        let block = self.options.mode == EraserMode::Block;
        let size = self.options.size;

        let layer = ctx.doc.active_layer_mut();
        if layer.locked {
            return;
        }
        let pos = layer.position;
        let Some(surface) = layer.as_surface_mut() else {
            return;
        };
        for dab in dab_positions(from, to, spacing) {
            erase_dab(surface, pos, &self.tip, dab, size, strength, block);
        }
        self.erased = true;
        ctx.request_render();
    }
}

impl Default for EraserTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for EraserTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eraser
    }

    fn activate(&mut self, _ctx: &mut EditorCtx) {
        self.regenerate_tip();
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        self.erased = false;
        let p = (input.x, input.y);
        self.erase_segment(ctx, p, p);
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        let from = self.gesture.current;
        self.gesture.update(input.x, input.y);
        self.erase_segment(ctx, from, (input.x, input.y));
    }

    fn pointer_up(&mut self, ctx: &mut EditorCtx, _input: &PointerInput) {
        if self.gesture.dragging && self.erased {
            ctx.push_history("Erase");
        }
        self.gesture.end();
        self.erased = false;
    }

    /// Like the brush, erased pixels stay erased on cancel.
    fn cancel(&mut self, _ctx: &mut EditorCtx) {
        self.gesture.end();
        self.erased = false;
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    fn options(&self) -> Vec<ToolOption> {
        vec![
            ToolOption {
                key: "size",
                label: "Size",
                control: ControlKind::Slider { min: 1.0, max: 500.0, unit: "px" },
                value: OptionValue::Number(self.options.size),
            },
            ToolOption {
                key: "hardness",
                label: "Hardness",
                control: ControlKind::Slider { min: 0.0, max: 100.0, unit: "%" },
                value: OptionValue::Number(self.options.hardness),
            },
            ToolOption {
                key: "opacity",
                label: "Opacity",
                control: ControlKind::Slider { min: 1.0, max: 100.0, unit: "%" },
                value: OptionValue::Number(self.options.opacity),
            },
            ToolOption {
                key: "mode",
                label: "Mode",
                control: ControlKind::Select { choices: &["brush", "block"] },
                value: OptionValue::Choice(match self.options.mode {
                    EraserMode::Brush => "brush",
                    EraserMode::Block => "block",
                }),
            },
        ]
    }

    fn set_option(&mut self, _ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("size", OptionValue::Number(n)) => {
                self.options.size = n.clamp(1.0, 500.0);
                self.regenerate_tip();
            }
            ("hardness", OptionValue::Number(n)) => {
                self.options.hardness = n.clamp(0.0, 100.0);
                self.regenerate_tip();
            }
            ("opacity", OptionValue::Number(n)) => self.options.opacity = n.clamp(1.0, 100.0),
            ("mode", OptionValue::Choice("brush")) => self.options.mode = EraserMode::Brush,
            ("mode", OptionValue::Choice("block")) => self.options.mode = EraserMode::Block,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn erase_dab_zeroes_alpha_under_tip() {
        let mut surface = Surface::new_filled(20, 20, Rgba([10, 20, 30, 255]));
        let tip = BrushTip::generate(8.0, 100.0);
        erase_dab(&mut surface, (0.0, 0.0), &tip, (10.0, 10.0), 8.0, 1.0, false);
        assert_eq!(surface.get_pixel(10, 10)[3], 0);
        // RGB is untouched; only alpha is knocked out.
        let p = surface.get_pixel(10, 10);
        assert_eq!([p[0], p[1], p[2]], [10, 20, 30]);
        assert_eq!(surface.get_pixel(1, 1)[3], 255);
    }

    #[test]
    fn partial_strength_scales_alpha() {
        let mut surface = Surface::new_filled(20, 20, Rgba([0, 0, 0, 200]));
        let tip = BrushTip::generate(8.0, 100.0);
        erase_dab(&mut surface, (0.0, 0.0), &tip, (10.0, 10.0), 8.0, 0.5, false);
        assert_eq!(surface.get_pixel(10, 10)[3], 100);
    }

    #[test]
    fn block_mode_erases_square_corners() {
        let mut surface = Surface::new_filled(20, 20, Rgba([0, 0, 0, 255]));
        let tip = BrushTip::generate(8.0, 100.0);
        erase_dab(&mut surface, (0.0, 0.0), &tip, (10.0, 10.0), 8.0, 1.0, true);
        // A round tip would leave the square's corners; block must not.
        assert_eq!(surface.get_pixel(7, 7)[3], 0);
        assert_eq!(surface.get_pixel(13, 13)[3], 0);
        assert_eq!(surface.get_pixel(5, 5)[3], 255);
    }
}
