//! Freehand painting.
//!
//! The brush keeps a circular tip bitmap that is regenerated whenever size
//! or hardness changes: full coverage out to `hardness * 0.9` of the
//! radius, then a linear falloff to the rim (a solid disc at hardness
//! 100). Between two input points dabs are stamped every
//! `size * spacing% / 100` units, endpoints included.

use image::Rgba;

use crate::context::EditorCtx;
use crate::surface::Surface;
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

#[derive(Clone, Debug)]
pub struct BrushOptions {
    pub size: f32,
    /// 0–100; 100 = hard-edged disc.
    pub hardness: f32,
    /// 0–100.
    pub opacity: f32,
    /// 0–100; multiplies opacity per dab.
    pub flow: f32,
    /// Dab spacing as a percentage of size.
    pub spacing: f32,
    pub pressure_size: bool,
    pub pressure_opacity: bool,
}

impl Default for BrushOptions {
    fn default() -> Self {
        Self {
            size: 20.0,
            hardness: 100.0,
            opacity: 100.0,
            flow: 100.0,
            spacing: 25.0,
            pressure_size: true,
            pressure_opacity: false,
        }
    }
}

/// The precomputed circular tip: per-pixel coverage in [0, 1] at the
/// brush's base size.
#[derive(Clone, Debug)]
pub struct BrushTip {
    coverage: Vec<f32>,
    dim: u32,
}

impl BrushTip {
    pub fn generate(size: f32, hardness: f32) -> Self {
        let dim = (size.ceil() as u32).max(1);
        let radius = size / 2.0;
        let center = dim as f32 / 2.0;
        let hardness = (hardness / 100.0).clamp(0.0, 1.0);
        // The flat core ends at this fraction of the radius.
        let core = if hardness >= 1.0 { 1.0 } else { hardness * 0.9 };

        let mut coverage = vec![0.0f32; (dim * dim) as usize];
        for y in 0..dim {
            for x in 0..dim {
                let dx = x as f32 + 0.5 - center;
                let dy = y as f32 + 0.5 - center;
                let dist = (dx * dx + dy * dy).sqrt() / radius.max(0.5);
                coverage[(y * dim + x) as usize] = if dist > 1.0 {
                    0.0
                } else if dist <= core {
                    1.0
                } else {
                    // Linear falloff from the core edge to the rim.
                    1.0 - (dist - core) / (1.0 - core)
                };
            }
        }
        Self { coverage, dim }
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// Coverage sampled in normalized tip coordinates ([0,1]²).
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return 0.0;
        }
        let x = ((u * self.dim as f32) as u32).min(self.dim - 1);
        let y = ((v * self.dim as f32) as u32).min(self.dim - 1);
        self.coverage[(y * self.dim + x) as usize]
    }
}

/// Interpolated dab centers between two stroke points, endpoints
/// included: `ceil(distance / spacing)` steps.
pub fn dab_positions(from: (f32, f32), to: (f32, f32), spacing: f32) -> Vec<(f32, f32)> {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let dist = (dx * dx + dy * dy).sqrt();
    let spacing = spacing.max(1.0);
    let steps = (dist / spacing).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            (from.0 + dx * t, from.1 + dy * t)
        })
        .collect()
}

/// Stamp one dab of `color` at a document-space center onto a surface
/// whose origin sits at `layer_pos`.
pub fn stamp_dab(
    surface: &mut Surface,
    layer_pos: (f32, f32),
    tip: &BrushTip,
    center: (f32, f32),
    size: f32,
    color: Rgba<u8>,
    alpha: f32,
) {
    let size = size.max(1.0);
    let half = size / 2.0;
    let x0 = (center.0 - layer_pos.0 - half).floor() as i32;
    let y0 = (center.1 - layer_pos.1 - half).floor() as i32;
    let span = size.ceil() as i32 + 1;
    for py in 0..span {
        for px in 0..span {
            let u = (px as f32 + 0.5) / size;
            let v = (py as f32 + 0.5) / size;
            let coverage = tip.sample(u, v);
            if coverage <= 0.0 {
                continue;
            }
            let a = (coverage * alpha * 255.0).round().clamp(0.0, 255.0) as u8;
            if a == 0 {
                continue;
            }
            surface.paint_pixel(x0 + px, y0 + py, Rgba([color[0], color[1], color[2], a]));
        }
    }
}

pub struct BrushTool {
    options: BrushOptions,
    tip: BrushTip,
    gesture: Gesture,
    painted: bool,
}

impl BrushTool {
    pub fn new() -> Self {
        let options = BrushOptions::default();
        let tip = BrushTip::generate(options.size, options.hardness);
        Self {
            options,
            tip,
            gesture: Gesture::default(),
            painted: false,
        }
    }

    pub fn options_struct(&self) -> &BrushOptions {
        &self.options
    }

    fn regenerate_tip(&mut self) {
        self.tip = BrushTip::generate(self.options.size, self.options.hardness);
    }

    fn dab_size(&self, pressure: f32) -> f32 {
        if self.options.pressure_size {
            (self.options.size * pressure).max(1.0)
        } else {
            self.options.size
        }
    }

    fn dab_alpha(&self, pressure: f32) -> f32 {
        let opacity = if self.options.pressure_opacity {
            self.options.opacity / 100.0 * pressure
        } else {
            self.options.opacity / 100.0
        };
        (opacity * self.options.flow / 100.0).clamp(0.0, 1.0)
    }

    fn paint_segment(&mut self, ctx: &mut EditorCtx, from: (f32, f32), to: (f32, f32), input: &PointerInput) {
        let color = ctx.colors.foreground;
        let size = self.dab_size(input.pressure);
        let alpha = self.dab_alpha(input.pressure);
        let spacing = (self.options.size * self.options.spacing / 100.0).max(1.0);

        let layer = ctx.doc.active_layer_mut();
        if layer.locked {
            return;
        }
        let pos = layer.position;
        let Some(surface) = layer.as_surface_mut() else {
            return;
        };
        for dab in dab_positions(from, to, spacing) {
            stamp_dab(surface, pos, &self.tip, dab, size, color, alpha);
        }
        self.painted = true;
        ctx.request_render();
    }
}

impl Default for BrushTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for BrushTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Brush
    }

    fn activate(&mut self, _ctx: &mut EditorCtx) {
        self.regenerate_tip();
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        self.painted = false;
        let p = (input.x, input.y);
        self.paint_segment(ctx, p, p, input);
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        let from = self.gesture.current;
        self.gesture.update(input.x, input.y);
        self.paint_segment(ctx, from, (input.x, input.y), input);
    }

    fn pointer_up(&mut self, ctx: &mut EditorCtx, _input: &PointerInput) {
        if self.gesture.dragging && self.painted {
            ctx.push_history("Brush Stroke");
        }
        self.gesture.end();
        self.painted = false;
    }

    /// Pixels stamped during the drag stay committed; only the gesture
    /// state is dropped (no history entry is pushed).
    fn cancel(&mut self, _ctx: &mut EditorCtx) {
        self.gesture.end();
        self.painted = false;
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
                key: "flow",
                label: "Flow",
                control: ControlKind::Slider { min: 1.0, max: 100.0, unit: "%" },
                value: OptionValue::Number(self.options.flow),
            },
            ToolOption {
                key: "spacing",
                label: "Spacing",
                control: ControlKind::Slider { min: 1.0, max: 100.0, unit: "%" },
                value: OptionValue::Number(self.options.spacing),
            },
            ToolOption {
                key: "pressureSize",
                label: "Pressure affects Size",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.options.pressure_size),
            },
            ToolOption {
                key: "pressureOpacity",
                label: "Pressure affects Opacity",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.options.pressure_opacity),
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
            ("flow", OptionValue::Number(n)) => self.options.flow = n.clamp(1.0, 100.0),
            ("spacing", OptionValue::Number(n)) => self.options.spacing = n.clamp(1.0, 100.0),
            ("pressureSize", OptionValue::Bool(b)) => self.options.pressure_size = b,
            ("pressureOpacity", OptionValue::Bool(b)) => self.options.pressure_opacity = b,
            _ => return false,
        }
        true
    }
}
