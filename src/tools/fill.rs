//! Paint bucket: iterative 4-connected flood fill.
//!
//! A pixel joins the region when each of its R/G/B/A channel differences
//! from the seed pixel is within the tolerance. The fill writes the
//! foreground color at an alpha derived from the tool opacity. The scan is
//! stack-based — recursion would overflow on large regions.

use image::Rgba;

use crate::context::EditorCtx;
use crate::surface::Surface;
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

#[derive(Clone, Debug)]
pub struct FillOptions {
    /// 0–255 per-channel tolerance.
    pub tolerance: u8,
    /// 0–100.
    pub opacity: f32,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            tolerance: 32,
            opacity: 100.0,
        }
    }
}

fn channels_match(a: Rgba<u8>, b: Rgba<u8>, tolerance: u8) -> bool {
    (0..4).all(|c| (a[c] as i16 - b[c] as i16).unsigned_abs() <= tolerance as u16)
}

/// Flood-fill `surface` from a seed point, writing `fill` into every
/// reachable pixel matching the seed within `tolerance`. Returns the
/// number of filled pixels; 0 when the seed is out of bounds.
pub fn flood_fill(surface: &mut Surface, seed_x: i32, seed_y: i32, fill: Rgba<u8>, tolerance: u8) -> usize {
    let width = surface.width() as i32;
    let height = surface.height() as i32;
    if seed_x < 0 || seed_y < 0 || seed_x >= width || seed_y >= height {
        return 0;
    }

    let target = surface.get_pixel(seed_x, seed_y);
    let mut visited = vec![false; (width * height) as usize];
    let mut stack = vec![(seed_x, seed_y)];
    let mut filled = 0usize;

    while let Some((x, y)) = stack.pop() {
        if x < 0 || y < 0 || x >= width || y >= height {
            continue;
        }
        let index = (y * width + x) as usize;
        if visited[index] {
            continue;
        }
        if !channels_match(target, surface.get_pixel(x, y), tolerance) {
            continue;
        }
        visited[index] = true;
        surface.put_pixel(x, y, fill);
        filled += 1;
        stack.push((x + 1, y));
        stack.push((x - 1, y));
        stack.push((x, y + 1));
        stack.push((x, y - 1));
    }
    filled
}

pub struct FillTool {
    options: FillOptions,
    gesture: Gesture,
}

impl FillTool {
    pub fn new() -> Self {
        Self {
            options: FillOptions::default(),
            gesture: Gesture::default(),
        }
    }
}

impl Default for FillTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for FillTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Fill
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);

        let fill = {
            let fg = ctx.colors.foreground;
            let alpha = (self.options.opacity / 100.0 * 255.0).round() as u8;
            Rgba([fg[0], fg[1], fg[2], alpha])
        };
        let tolerance = self.options.tolerance;

        let layer = ctx.doc.active_layer_mut();
        if layer.locked {
            return;
        }
        let (px, py) = layer.position;
        let Some(surface) = layer.as_surface_mut() else {
            return;
        };
        let seed_x = (input.x - px).floor() as i32;
        let seed_y = (input.y - py).floor() as i32;
        // Out-of-bounds click: no effect, not an error.
        if flood_fill(surface, seed_x, seed_y, fill, tolerance) > 0 {
            ctx.push_history("Fill");
            ctx.request_render();
        }
    }

    fn pointer_move(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {}

    fn pointer_up(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {
        self.gesture.end();
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    fn options(&self) -> Vec<ToolOption> {
        vec![
            ToolOption {
                key: "tolerance",
                label: "Tolerance",
                control: ControlKind::Slider { min: 0.0, max: 255.0, unit: "" },
                value: OptionValue::Number(self.options.tolerance as f32),
            },
            ToolOption {
                key: "opacity",
                label: "Opacity",
                control: ControlKind::Slider { min: 1.0, max: 100.0, unit: "%" },
                value: OptionValue::Number(self.options.opacity),
            },
        ]
    }

    fn set_option(&mut self, _ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("tolerance", OptionValue::Number(n)) => {
                self.options.tolerance = n.clamp(0.0, 255.0) as u8
            }
            ("opacity", OptionValue::Number(n)) => self.options.opacity = n.clamp(1.0, 100.0),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);
    const FILL: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn uniform_region_fills_completely() {
        let mut surface = Surface::new_filled(10, 10, GREY);
        assert_eq!(flood_fill(&mut surface, 5, 5, FILL, 0), 100);
        assert_eq!(surface.get_pixel(0, 0), FILL);
        assert_eq!(surface.get_pixel(9, 9), FILL);
    }

    #[test]
    fn odd_pixel_excluded_at_zero_tolerance() {
        let mut surface = Surface::new_filled(10, 10, GREY);
        let odd = Rgba([128, 128, 138, 255]); // Δblue = 10
        surface.put_pixel(4, 4, odd);
        assert_eq!(flood_fill(&mut surface, 0, 0, FILL, 0), 99);
        assert_eq!(surface.get_pixel(4, 4), odd);
    }

    #[test]
    fn tolerance_at_delta_includes_odd_pixel() {
        let mut surface = Surface::new_filled(10, 10, GREY);
        surface.put_pixel(4, 4, Rgba([128, 128, 138, 255]));
        assert_eq!(flood_fill(&mut surface, 0, 0, FILL, 10), 100);
        assert_eq!(surface.get_pixel(4, 4), FILL);
    }

    #[test]
    fn fill_stops_at_region_border() {
        let mut surface = Surface::new_filled(10, 10, GREY);
        // Vertical wall splits the canvas.
        for y in 0..10 {
            surface.put_pixel(5, y, Rgba([0, 0, 0, 255]));
        }
        let filled = flood_fill(&mut surface, 2, 2, FILL, 0);
        assert_eq!(filled, 50); // left half only
        assert_eq!(surface.get_pixel(7, 2), GREY);
    }

    #[test]
    fn alpha_difference_blocks_fill() {
        let mut surface = Surface::new_filled(4, 4, Rgba([10, 10, 10, 255]));
        surface.put_pixel(1, 0, Rgba([10, 10, 10, 100]));
        let filled = flood_fill(&mut surface, 0, 0, FILL, 0);
        assert!(filled < 16);
        assert_eq!(surface.get_pixel(1, 0), Rgba([10, 10, 10, 100]));
    }

    #[test]
    fn out_of_bounds_seed_is_no_effect() {
        let mut surface = Surface::new_filled(4, 4, GREY);
        assert_eq!(flood_fill(&mut surface, -1, 0, FILL, 0), 0);
        assert_eq!(flood_fill(&mut surface, 4, 4, FILL, 0), 0);
        assert_eq!(surface.get_pixel(0, 0), GREY);
    }

    #[test]
    fn large_region_does_not_overflow_stack() {
        let mut surface = Surface::new_filled(512, 512, GREY);
        assert_eq!(flood_fill(&mut surface, 256, 256, FILL, 0), 512 * 512);
    }
}
