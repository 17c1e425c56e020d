//! Eyedropper: samples a point, 3×3 or 5×5 average from the active layer
//! or the full composite, writing the result to the foreground color (or
//! background with alt held).

use image::Rgba;

use crate::color::to_hex;
use crate::context::EditorCtx;
use crate::events::Event;
use crate::surface::Surface;
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleSize {
    Point,
    Average3,
    Average5,
}

impl SampleSize {
    fn window(&self) -> i32 {
        match self {
            SampleSize::Point => 1,
            SampleSize::Average3 => 3,
            SampleSize::Average5 => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleSource {
    CurrentLayer,
    Composite,
}

/// Average the RGB of a sample window centered on `(x, y)`, ignoring
/// pixels outside the surface. `None` when the center is out of bounds.
pub fn sample_average(surface: &Surface, x: i32, y: i32, window: i32) -> Option<Rgba<u8>> {
    if x < 0 || y < 0 || x >= surface.width() as i32 || y >= surface.height() as i32 {
        return None;
    }
    let half = window / 2;
    let (mut r, mut g, mut b, mut count) = (0u32, 0u32, 0u32, 0u32);
    for sy in -half..=half {
        for sx in -half..=half {
            let px = x + sx;
            let py = y + sy;
            if px < 0 || py < 0 || px >= surface.width() as i32 || py >= surface.height() as i32 {
                continue;
            }
            let pixel = surface.get_pixel(px, py);
            r += pixel[0] as u32;
            g += pixel[1] as u32;
            b += pixel[2] as u32;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    Some(Rgba([
        (r as f32 / count as f32).round() as u8,
        (g as f32 / count as f32).round() as u8,
        (b as f32 / count as f32).round() as u8,
        255,
    ]))
}

pub struct EyedropperTool {
    sample_size: SampleSize,
    source: SampleSource,
    gesture: Gesture,
}

impl EyedropperTool {
    pub fn new() -> Self {
        Self {
            sample_size: SampleSize::Point,
            source: SampleSource::CurrentLayer,
            gesture: Gesture::default(),
        }
    }

    fn pick(&self, ctx: &mut EditorCtx, input: &PointerInput) {
        let window = self.sample_size.window();
        let color = match self.source {
            SampleSource::CurrentLayer => {
                let layer = ctx.doc.active_layer();
                let (px, py) = layer.position;
                let Some(surface) = layer.as_surface() else {
                    return;
                };
                sample_average(
                    surface,
                    (input.x - px).floor() as i32,
                    (input.y - py).floor() as i32,
                    window,
                )
            }
            SampleSource::Composite => {
                let composite = ctx.doc.composite(ctx.fonts);
                sample_average(
                    &composite,
                    input.x.floor() as i32,
                    input.y.floor() as i32,
                    window,
                )
            }
        };
        let Some(color) = color else {
            return; // out-of-bounds sample: no effect
        };
        log_info!("eyedropper picked {}", to_hex(color));
        if input.modifiers.alt {
            ctx.colors.background = color;
            ctx.events.emit(&Event::ColorBackground);
        } else {
            ctx.colors.foreground = color;
            ctx.events.emit(&Event::ColorForeground);
        }
    }
}

impl Default for EyedropperTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for EyedropperTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eyedropper
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        self.pick(ctx, input);
    }

    /// Keeps sampling while the pointer is dragged, like a scrubbing
    /// color picker.
    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if self.gesture.dragging {
            self.gesture.update(input.x, input.y);
            self.pick(ctx, input);
        }
    }

    fn pointer_up(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {
        self.gesture.end();
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    fn options(&self) -> Vec<ToolOption> {
        vec![
            ToolOption {
                key: "sampleSize",
                label: "Sample Size",
                control: ControlKind::Select { choices: &["point", "3x3", "5x5"] },
                value: OptionValue::Choice(match self.sample_size {
                    SampleSize::Point => "point",
                    SampleSize::Average3 => "3x3",
                    SampleSize::Average5 => "5x5",
                }),
            },
            ToolOption {
                key: "sampleLayers",
                label: "Sample",
                control: ControlKind::Select { choices: &["current", "all"] },
                value: OptionValue::Choice(match self.source {
                    SampleSource::CurrentLayer => "current",
                    SampleSource::Composite => "all",
                }),
            },
        ]
    }

    fn set_option(&mut self, _ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("sampleSize", OptionValue::Choice("point")) => self.sample_size = SampleSize::Point,
            ("sampleSize", OptionValue::Choice("3x3")) => self.sample_size = SampleSize::Average3,
            ("sampleSize", OptionValue::Choice("5x5")) => self.sample_size = SampleSize::Average5,
            ("sampleLayers", OptionValue::Choice("current")) => {
                self.source = SampleSource::CurrentLayer
            }
            ("sampleLayers", OptionValue::Choice("all")) => self.source = SampleSource::Composite,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_sample_reads_exact_pixel() {
        let mut surface = Surface::new(4, 4);
        surface.put_pixel(2, 1, Rgba([10, 20, 30, 255]));
        assert_eq!(
            sample_average(&surface, 2, 1, 1),
            Some(Rgba([10, 20, 30, 255]))
        );
    }

    #[test]
    fn averaged_sample_mixes_neighbors() {
        let mut surface = Surface::new_filled(5, 5, Rgba([0, 0, 0, 255]));
        // A white cross around the center: 5 of the 9 sampled pixels.
        for &(x, y) in &[(2, 2), (1, 2), (3, 2), (2, 1), (2, 3)] {
            surface.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        }
        let avg = sample_average(&surface, 2, 2, 3).unwrap();
        assert_eq!(avg[0], ((5.0 * 255.0) / 9.0_f32).round() as u8);
    }

    #[test]
    fn edge_sample_ignores_out_of_bounds() {
        let surface = Surface::new_filled(3, 3, Rgba([100, 100, 100, 255]));
        // Corner 3x3 window only covers 4 in-bounds pixels, still averages.
        assert_eq!(
            sample_average(&surface, 0, 0, 3),
            Some(Rgba([100, 100, 100, 255]))
        );
    }

    #[test]
    fn out_of_bounds_center_is_none() {
        let surface = Surface::new(3, 3);
        assert_eq!(sample_average(&surface, -1, 0, 1), None);
        assert_eq!(sample_average(&surface, 3, 3, 1), None);
    }
}
