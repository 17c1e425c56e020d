//! Text tool.
//!
//! Clicking inside an existing text layer's measured bounds re-enters
//! editing on it; clicking elsewhere commits any open edit and starts a
//! new empty text layer at the point. Character input mutates the layer's
//! content in place. Committing discards the layer when its trimmed
//! content is empty.

use uuid::Uuid;

use crate::canvas::{Layer, LayerKind};
use crate::context::EditorCtx;
use crate::surface::Surface;
use crate::text::{measure_text, FontStyle, FontWeight, TextAlign, TextStyle};
use crate::tools::{
    ControlKind, Gesture, OptionValue, PointerInput, Tool, ToolKind, ToolOption,
};

/// Families offered in the options dropdown; free-form values still work
/// through [`TextStyle`] directly.
const FONT_FAMILIES: &[&str] = &[
    "Arial",
    "Helvetica",
    "Times New Roman",
    "Georgia",
    "Verdana",
    "Courier New",
];

pub struct TextTool {
    style: TextStyle,
    editing: Option<Uuid>,
    gesture: Gesture,
}

impl TextTool {
    pub fn new() -> Self {
        Self {
            style: TextStyle::default(),
            editing: None,
            gesture: Gesture::default(),
        }
    }

    pub fn editing_layer(&self) -> Option<Uuid> {
        self.editing
    }

    /// Topmost visible text layer whose measured bounds contain the point.
    fn find_text_layer_at(ctx: &EditorCtx, x: f32, y: f32) -> Option<Uuid> {
        for layer in ctx.doc.layers().iter().rev() {
            if !layer.visible {
                continue;
            }
            if let LayerKind::Text { content, style } = &layer.kind {
                let bounds =
                    measure_text(ctx.fonts, content, style, layer.position.0, layer.position.1);
                if bounds.contains(x, y) {
                    return Some(layer.id);
                }
            }
        }
        None
    }

    /// Finish the current edit: drop the layer if it ended up empty,
    /// otherwise record the result in history.
    pub fn commit(&mut self, ctx: &mut EditorCtx) {
        let Some(id) = self.editing.take() else {
            return;
        };
        let empty = match ctx.doc.layer(id) {
            Some(Layer {
                kind: LayerKind::Text { content, .. },
                ..
            }) => content.trim().is_empty(),
            _ => return,
        };
        if empty {
            if let Err(e) = ctx.doc.remove_layer(id, ctx.events) {
                log_warn!("could not discard empty text layer: {}", e);
            }
        } else {
            ctx.push_history("Add Text");
        }
        ctx.request_render();
    }

    fn edit_content(&mut self, ctx: &mut EditorCtx, edit: impl FnOnce(&mut String)) {
        let Some(id) = self.editing else {
            return;
        };
        let mut changed = false;
        if let Some(layer) = ctx.doc.layer_mut(id) {
            if let LayerKind::Text { content, .. } = &mut layer.kind {
                edit(content);
                changed = true;
            }
        }
        if changed {
            ctx.request_render();
        }
    }
}

impl Default for TextTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for TextTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Text
    }

    fn deactivate(&mut self, ctx: &mut EditorCtx) {
        self.commit(ctx);
    }

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        self.gesture.begin(input.x, input.y);

        if let Some(existing) = Self::find_text_layer_at(&*ctx, input.x, input.y) {
            if self.editing != Some(existing) {
                self.commit(ctx);
                self.editing = Some(existing);
                let _ = ctx.doc.set_active_layer(existing, ctx.events);
            }
            return;
        }

        self.commit(ctx);
        let mut style = self.style.clone();
        style.color = ctx.colors.foreground;
        let mut layer = Layer::new_text("Text Layer", "", style);
        layer.position = (input.x, input.y);
        let id = ctx.doc.add_layer(layer, None, ctx.events);
        self.editing = Some(id);
        ctx.request_render();
    }

    fn pointer_move(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {}

    fn pointer_up(&mut self, _ctx: &mut EditorCtx, _input: &PointerInput) {
        self.gesture.end();
    }

    fn text_input(&mut self, ctx: &mut EditorCtx, ch: char) {
        self.edit_content(ctx, |content| content.push(ch));
    }

    fn text_backspace(&mut self, ctx: &mut EditorCtx) {
        self.edit_content(ctx, |content| {
            content.pop();
        });
    }

    fn text_commit(&mut self, ctx: &mut EditorCtx) {
        self.commit(ctx);
    }

    /// Escape-equivalent: commits the edit (which discards an empty
    /// layer) rather than leaving a dangling editing state.
    fn cancel(&mut self, ctx: &mut EditorCtx) {
        self.commit(ctx);
        self.gesture.end();
    }

    fn render_overlay(&self, ctx: &EditorCtx, overlay: &mut Surface) {
        let Some(id) = self.editing else {
            return;
        };
        if let Some(layer) = ctx.doc.layer(id) {
            if let LayerKind::Text { content, style } = &layer.kind {
                let b =
                    measure_text(ctx.fonts, content, style, layer.position.0, layer.position.1);
                crate::raster::stroke_rect(
                    overlay,
                    b.x - 4.0,
                    b.y - 4.0,
                    b.width + 8.0,
                    b.height + 8.0,
                    1.0,
                    image::Rgba([59, 130, 246, 255]),
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
                key: "fontFamily",
                label: "Font",
                control: ControlKind::Select { choices: FONT_FAMILIES },
                value: OptionValue::Choice(
                    FONT_FAMILIES
                        .iter()
                        .find(|f| **f == self.style.font_family)
                        .copied()
                        .unwrap_or(FONT_FAMILIES[0]),
                ),
            },
            ToolOption {
                key: "fontSize",
                label: "Size",
                control: ControlKind::Slider { min: 8.0, max: 200.0, unit: "px" },
                value: OptionValue::Number(self.style.font_size),
            },
            ToolOption {
                key: "bold",
                label: "Bold",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.style.font_weight == FontWeight::Bold),
            },
            ToolOption {
                key: "italic",
                label: "Italic",
                control: ControlKind::Checkbox,
                value: OptionValue::Bool(self.style.font_style == FontStyle::Italic),
            },
            ToolOption {
                key: "align",
                label: "Align",
                control: ControlKind::Select { choices: &["left", "center", "right"] },
                value: OptionValue::Choice(match self.style.text_align {
                    TextAlign::Left => "left",
                    TextAlign::Center => "center",
                    TextAlign::Right => "right",
                }),
            },
            ToolOption {
                key: "lineHeight",
                label: "Line Height",
                control: ControlKind::Slider { min: 0.5, max: 3.0, unit: "×" },
                value: OptionValue::Number(self.style.line_height),
            },
        ]
    }

    fn set_option(&mut self, ctx: &mut EditorCtx, key: &str, value: OptionValue) -> bool {
        let changed = match (key, &value) {
            ("fontFamily", OptionValue::Choice(family)) => {
                self.style.font_family = family.to_string();
                true
            }
            ("fontSize", OptionValue::Number(n)) => {
                self.style.font_size = n.clamp(8.0, 200.0);
                true
            }
            ("bold", OptionValue::Bool(b)) => {
                self.style.font_weight = if *b { FontWeight::Bold } else { FontWeight::Normal };
                true
            }
            ("italic", OptionValue::Bool(b)) => {
                self.style.font_style = if *b { FontStyle::Italic } else { FontStyle::Normal };
                true
            }
            ("align", OptionValue::Choice(align)) => match *align {
                "left" => {
                    self.style.text_align = TextAlign::Left;
                    true
                }
                "center" => {
                    self.style.text_align = TextAlign::Center;
                    true
                }
                "right" => {
                    self.style.text_align = TextAlign::Right;
                    true
                }
                _ => false,
            },
            ("lineHeight", OptionValue::Number(n)) => {
                self.style.line_height = n.clamp(0.5, 3.0);
                true
            }
            _ => false,
        };
        // Editing an option restyles the layer currently being edited.
        if changed {
            if let Some(id) = self.editing {
                let mut restyled = false;
                if let Some(layer) = ctx.doc.layer_mut(id) {
                    if let LayerKind::Text { style, .. } = &mut layer.kind {
                        let color = style.color;
                        *style = self.style.clone();
                        style.color = color;
                        restyled = true;
                    }
                }
                if restyled {
                    ctx.request_render();
                }
            }
        }
        changed
    }
}

