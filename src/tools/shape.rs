//! Shape tool: rectangle / ellipse / line from a drag, with shift
//! constraining to square/circle (or snapping lines to 45° multiples).
//! Commits either a new dedicated shape layer or paints directly onto the
//! active raster layer.

use std::f32::consts::FRAC_PI_4;

use image::Rgba;

use crate::canvas::{rasterize_shape, Layer, ShapeData};
use crate::context::EditorCtx;
use crate::surface::Surface;
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Line,
}

#[derive(Clone, Debug)]
pub struct ShapeOptions {
    pub shape: ShapeKind,
    pub filled: bool,
    pub fill_color: Rgba<u8>,
    pub stroked: bool,
    pub stroke_color: Rgba<u8>,
    pub stroke_width: f32,
    pub corner_radius: f32,
    pub create_new_layer: bool,
}

impl Default for ShapeOptions {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Rectangle,
            filled: true,
            fill_color: Rgba([0, 0, 0, 255]),
            stroked: false,
            stroke_color: Rgba([0, 0, 0, 255]),
            stroke_width: 2.0,
            corner_radius: 0.0,
            create_new_layer: true,
        }
    }
}

/// Drag rectangle with optional square constraint, anchored so the start
/// corner stays put when the drag goes up/left.
pub fn drag_bounds(start: (f32, f32), end: (f32, f32), constrain: bool) -> (f32, f32, f32, f32) {
    let mut x = start.0.min(end.0);
    let mut y = start.1.min(end.1);
    let mut w = (end.0 - start.0).abs();
    let mut h = (end.1 - start.1).abs();
    if constrain {
        let size = w.max(h);
        w = size;
        h = size;
        if end.0 < start.0 {
            x = start.0 - size;
        }
        if end.1 < start.1 {
            y = start.1 - size;
        }
    }
    (x, y, w, h)
}

/// Snap the drag angle to the nearest π/4 multiple, keeping length.
pub fn constrain_line(start: (f32, f32), end: (f32, f32)) -> (f32, f32) {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let length = (dx * dx + dy * dy).sqrt();
    let snapped = (dy.atan2(dx) / FRAC_PI_4).round() * FRAC_PI_4;
    (
        start.0 + snapped.cos() * length,
        start.1 + snapped.sin() * length,
    )
}

pub struct ShapeTool {
    options: ShapeOptions,
    gesture: Gesture,
    preview: Option<ShapeData>,
}

impl ShapeTool {
    pub fn new() -> Self {
        Self {
            options: ShapeOptions::default(),
            gesture: Gesture::default(),
            preview: None,
        }
    }

    fn build_shape(&self, start: (f32, f32), end: (f32, f32), constrain: bool) -> ShapeData {
        match self.options.shape {
            ShapeKind::Line => {
                let end = if constrain { constrain_line(start, end) } else { end };
                ShapeData::Line {
                    x1: start.0,
                    y1: start.1,
                    x2: end.0,
                    y2: end.1,
                }
            }
            ShapeKind::Rectangle => {
                let (x, y, width, height) = drag_bounds(start, end, constrain);
                ShapeData::Rectangle {
                    x,
                    y,
                    width,
                    height,
                    corner_radius: self.options.corner_radius,
                }
            }
            ShapeKind::Ellipse => {
                let (x, y, width, height) = drag_bounds(start, end, constrain);
                ShapeData::Ellipse { x, y, width, height }
            }
        }
    }

    fn fill(&self) -> Option<Rgba<u8>> {
        self.options.filled.then_some(self.options.fill_color)
    }

    fn stroke(&self) -> Option<Rgba<u8>> {
        self.options.stroked.then_some(self.options.stroke_color)
    }

    fn shape_name(&self) -> &'static str {
        match self.options.shape {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Line => "line",
        }
    }
}

impl Default for ShapeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ShapeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Shape
    }

    fn pointer_down(&mut self, _ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);
        self.preview = None;
    }

    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        self.gesture.update(input.x, input.y);
        self.preview = Some(self.build_shape(
            self.gesture.start,
            self.gesture.current,
            input.modifiers.shift,
        ));
        ctx.request_render();
    }

    fn pointer_up(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if !self.gesture.dragging {
            return;
        }
        self.gesture.update(input.x, input.y);
        let shape = self.build_shape(
            self.gesture.start,
            self.gesture.current,
            input.modifiers.shift,
        );
        self.gesture.end();
        self.preview = None;

        if self.options.create_new_layer {
            let layer = Layer::new_shape(
                format!("{} layer", self.shape_name()),
                shape,
                self.fill(),
                self.stroke(),
                self.options.stroke_width,
            );
            ctx.doc.add_layer(layer, None, ctx.events);
        } else {
            let fill = self.fill();
            let stroke = self.stroke();
            let stroke_width = self.options.stroke_width;
            let layer = ctx.doc.active_layer_mut();
            if layer.locked {
                return;
            }
            let (px, py) = layer.position;
            let Some(surface) = layer.as_surface_mut() else {
                return;
            };
            // Shift into layer-local space before rasterizing.
            let local = offset_shape(&shape, -px, -py);
            rasterize_shape(surface, &local, fill, stroke, stroke_width);
        }
        ctx.push_history(&format!("Draw {}", self.shape_name()));
        ctx.request_render();
    }

    /// Commit happens at pointer-up only; cancel drops the preview.
    fn cancel(&mut self, _ctx: &mut EditorCtx) {
        self.gesture.end();
        self.preview = None;
    }

    fn render_overlay(&self, _ctx: &EditorCtx, overlay: &mut Surface) {
        if let Some(shape) = &self.preview {
            rasterize_shape(
                overlay,
                shape,
                self.fill(),
                self.stroke().or(Some(Rgba([0, 102, 255, 255]))),
                self.options.stroke_width.max(1.0),
            );
        }
    }

    fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    fn options(&self) -> Vec<ToolOption> {
        vec![
            ToolOption {
                key: "shape",
                label: "Shape",
                control: ControlKind::Select { choices: &["rectangle", "ellipse", "line"] },
                value: OptionValue::Choice(self.shape_name()),
            },
            ToolOption {
                key: "filled",
                label: "Fill",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.options.filled),
            },
            ToolOption {
                key: "fillColor",
                label: "Fill Color",
                control: ControlKind::Color,
                value: OptionValue::Color(self.options.fill_color),
            },
            ToolOption {
                key: "stroked",
                label: "Stroke",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.options.stroked),
            },
            ToolOption {
                key: "strokeColor",
                label: "Stroke Color",
                control: ControlKind::Color,
                value: OptionValue::Color(self.options.stroke_color),
            },
            ToolOption {
                key: "strokeWidth",
                label: "Stroke Width",
                control: ControlKind::Slider { min: 1.0, max: 50.0, unit: "px" },
                value: OptionValue::Number(self.options.stroke_width),
            },
            ToolOption {
                key: "cornerRadius",
                label: "Corner Radius",
                control: ControlKind::Slider { min: 0.0, max: 100.0, unit: "px" },
                value: OptionValue::Number(self.options.corner_radius),
            },
            ToolOption {
                key: "createNewLayer",
                label: "Create Shape Layer",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.options.create_new_layer),
            },
        ]
    }

    fn set_option(&mut self, _ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("shape", OptionValue::Choice("rectangle")) => self.options.shape = ShapeKind::Rectangle,
            ("shape", OptionValue::Choice("ellipse")) => self.options.shape = ShapeKind::Ellipse,
            ("shape", OptionValue::Choice("line")) => self.options.shape = ShapeKind::Line,
            ("filled", OptionValue::Bool(b)) => self.options.filled = b,
            ("fillColor", OptionValue::Color(c)) => self.options.fill_color = c,
            ("stroked", OptionValue::Bool(b)) => self.options.stroked = b,
            ("strokeColor", OptionValue::Color(c)) => self.options.stroke_color = c,
            ("strokeWidth", OptionValue::Number(n)) => self.options.stroke_width = n.clamp(1.0, 50.0),
            ("cornerRadius", OptionValue::Number(n)) => {
                self.options.corner_radius = n.clamp(0.0, 100.0)
            }
            ("createNewLayer", OptionValue::Bool(b)) => self.options.create_new_layer = b,
            _ => return false,
        }
        true
    }
}

fn offset_shape(shape: &ShapeData, dx: f32, dy: f32) -> ShapeData {
    match shape {
        ShapeData::Rectangle {
            x,
            y,
            width,
            height,
            corner_radius,
        } => ShapeData::Rectangle {
            x: x + dx,
            y: y + dy,
            width: *width,
            height: *height,
            corner_radius: *corner_radius,
        },
        ShapeData::Ellipse { x, y, width, height } => ShapeData::Ellipse {
            x: x + dx,
            y: y + dy,
            width: *width,
            height: *height,
        },
        ShapeData::Line { x1, y1, x2, y2 } => ShapeData::Line {
            x1: x1 + dx,
            y1: y1 + dy,
            x2: x2 + dx,
            y2: y2 + dy,
        },
        ShapeData::Polygon { points } => ShapeData::Polygon {
            points: points.iter().map(|(x, y)| (x + dx, y + dy)).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_bounds_normalize_direction() {
        let (x, y, w, h) = drag_bounds((10.0, 10.0), (4.0, 2.0), false);
        assert_eq!((x, y, w, h), (4.0, 2.0, 6.0, 8.0));
    }

    #[test]
    fn constrained_bounds_are_square_and_anchored() {
        // Dragging up-left with shift: square grows away from the start.
        let (x, y, w, h) = drag_bounds((10.0, 10.0), (6.0, 2.0), true);
        assert_eq!(w, 8.0);
        assert_eq!(h, 8.0);
        assert_eq!((x, y), (2.0, 2.0));
    }

    #[test]
    fn line_snaps_to_45_degrees() {
        // 50° from horizontal snaps to 45°.
        let end = constrain_line((0.0, 0.0), (10.0, 11.9));
        let angle = end.1.atan2(end.0);
        assert!((angle - FRAC_PI_4).abs() < 1e-4);
        // Nearly horizontal snaps flat.
        let flat = constrain_line((0.0, 0.0), (10.0, 0.5));
        assert!(flat.1.abs() < 1e-3);
    }
}
