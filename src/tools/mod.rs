//! The tool framework: the shared tool contract, pointer-gesture state,
//! the declarative options schema external UIs render, and the manager
//! that owns the current / temporary tool pair.
//!
//! Tools are a closed set of kinds dispatched through one trait — no
//! inheritance chains. Exactly one tool can be in the Dragging state at a
//! time because only the manager's current tool receives pointer events.

pub mod brush;
pub mod crop;
pub mod eraser;
pub mod eyedropper;
pub mod fill;
pub mod gradient;
pub mod marquee;
pub mod move_tool;
pub mod nav;
pub mod shape;
pub mod text_tool;

use image::Rgba;

use crate::context::EditorCtx;
use crate::events::Event;
use crate::surface::Surface;

/// Every tool the editor ships.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Move,
    Marquee,
    Lasso,
    Brush,
    Eraser,
    Fill,
    Gradient,
    Shape,
    Text,
    Crop,
    Eyedropper,
    Hand,
    Zoom,
}

impl ToolKind {
    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Move,
            ToolKind::Marquee,
            ToolKind::Lasso,
            ToolKind::Brush,
            ToolKind::Eraser,
            ToolKind::Fill,
            ToolKind::Gradient,
            ToolKind::Shape,
            ToolKind::Text,
            ToolKind::Crop,
            ToolKind::Eyedropper,
            ToolKind::Hand,
            ToolKind::Zoom,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Move => "Move",
            ToolKind::Marquee => "Marquee",
            ToolKind::Lasso => "Lasso",
            ToolKind::Brush => "Brush",
            ToolKind::Eraser => "Eraser",
            ToolKind::Fill => "Fill",
            ToolKind::Gradient => "Gradient",
            ToolKind::Shape => "Shape",
            ToolKind::Text => "Text",
            ToolKind::Crop => "Crop",
            ToolKind::Eyedropper => "Eyedropper",
            ToolKind::Hand => "Hand",
            ToolKind::Zoom => "Zoom",
        }
    }

    /// The tool's keyboard shortcut, for the embedding UI to wire up.
    pub fn shortcut(&self) -> char {
        match self {
            ToolKind::Move => 'v',
            ToolKind::Marquee => 'm',
            ToolKind::Lasso => 'l',
            ToolKind::Brush => 'b',
            ToolKind::Eraser => 'e',
            ToolKind::Fill => 'g',
            ToolKind::Gradient => 'g',
            ToolKind::Shape => 'u',
            ToolKind::Text => 't',
            ToolKind::Crop => 'c',
            ToolKind::Eyedropper => 'i',
            ToolKind::Hand => 'h',
            ToolKind::Zoom => 'z',
        }
    }
}

/// Modifier keys accompanying a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
}

/// One pointer event, already run through the viewport transform.
#[derive(Clone, Copy, Debug)]
pub struct PointerInput {
    /// Document-space position.
    pub x: f32,
    pub y: f32,
    /// View-space position (viewport tools pan/zoom in view space).
    pub view_x: f32,
    pub view_y: f32,
    /// Stylus pressure in [0, 1]; mice report 1.0.
    pub pressure: f32,
    pub modifiers: Modifiers,
}

impl PointerInput {
    /// A plain full-pressure event at a document point (view == doc).
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            view_x: x,
            view_y: y,
            pressure: 1.0,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.modifiers.alt = true;
        self
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = pressure;
        self
    }
}

/// Shared per-gesture pointer bookkeeping: start / last / current point
/// while the pointer is down.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gesture {
    pub dragging: bool,
    pub start: (f32, f32),
    pub last: (f32, f32),
    pub current: (f32, f32),
}

impl Gesture {
    pub fn begin(&mut self, x: f32, y: f32) {
        self.dragging = true;
        self.start = (x, y);
        self.last = (x, y);
        self.current = (x, y);
    }

    /// Record a move; returns the delta from the previous point.
    pub fn update(&mut self, x: f32, y: f32) -> (f32, f32) {
        self.last = self.current;
        self.current = (x, y);
        (x - self.last.0, y - self.last.1)
    }

    pub fn end(&mut self) {
        self.dragging = false;
    }
}

/// One of the eight resize handles around a bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
}

impl Handle {
    pub fn all() -> &'static [Handle] {
        &[
            Handle::NorthWest,
            Handle::North,
            Handle::NorthEast,
            Handle::East,
            Handle::SouthEast,
            Handle::South,
            Handle::SouthWest,
            Handle::West,
        ]
    }

    /// The handle's anchor point on a bounding box.
    pub fn anchor(&self, b: crate::selection::Bounds) -> (f32, f32) {
        match self {
            Handle::NorthWest => (b.x, b.y),
            Handle::North => (b.x + b.width / 2.0, b.y),
            Handle::NorthEast => (b.x + b.width, b.y),
            Handle::East => (b.x + b.width, b.y + b.height / 2.0),
            Handle::SouthEast => (b.x + b.width, b.y + b.height),
            Handle::South => (b.x + b.width / 2.0, b.y + b.height),
            Handle::SouthWest => (b.x, b.y + b.height),
            Handle::West => (b.x, b.y + b.height / 2.0),
        }
    }
}

/// Which of the eight handles (if any) a point grabs, within a square
/// threshold.
pub fn hit_test_handles(
    bounds: crate::selection::Bounds,
    x: f32,
    y: f32,
    threshold: f32,
) -> Option<Handle> {
    Handle::all().iter().copied().find(|handle| {
        let (hx, hy) = handle.anchor(bounds);
        (x - hx).abs() < threshold && (y - hy).abs() < threshold
    })
}

/// Widget class of one tool option, for external UIs to render.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlKind {
    Slider {
        min: f32,
        max: f32,
        unit: &'static str,
    },
    Checkbox,
    Select {
        choices: &'static [&'static str],
    },
    Color,
    /// Fire-and-forget action (crop apply/cancel). Triggered through
    /// [`Tool::set_option`] with any value.
    Button,
}

/// Current value of a tool option.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Number(f32),
    Bool(bool),
    Choice(&'static str),
    Color(Rgba<u8>),
    /// Button press.
    Trigger,
}

impl OptionValue {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            OptionValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            OptionValue::Choice(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgba<u8>> {
        match self {
            OptionValue::Color(c) => Some(*c),
            _ => None,
        }
    }
}

/// One row of a tool's options schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOption {
    pub key: &'static str,
    pub label: &'static str,
    pub control: ControlKind,
    pub value: OptionValue,
}

/// The contract every tool implements.
///
/// State machine per tool: Inactive → Active (on selection) → Dragging (on
/// pointer-down) → Active (on pointer-up, typically pushing a history
/// entry) → Inactive (on switching away).
pub trait Tool: Send {
    fn kind(&self) -> ToolKind;

    fn activate(&mut self, _ctx: &mut EditorCtx) {}
    fn deactivate(&mut self, _ctx: &mut EditorCtx) {}

    fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput);
    fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput);
    fn pointer_up(&mut self, ctx: &mut EditorCtx, input: &PointerInput);

    /// Abort an in-flight gesture. Geometry tools drop their preview and
    /// leave the document exactly as at drag start; paint tools keep
    /// pixels already committed during the drag (intentional asymmetry —
    /// they paint continuously, geometry tools commit at pointer-up).
    fn cancel(&mut self, _ctx: &mut EditorCtx) {}

    /// Paint transient feedback (previews, handles) into the overlay.
    fn render_overlay(&self, _ctx: &EditorCtx, _overlay: &mut Surface) {}

    fn is_dragging(&self) -> bool;

    /// Declarative options schema for external UI.
    fn options(&self) -> Vec<ToolOption> {
        Vec::new()
    }

    /// Write an option back; returns false for unknown keys/values.
    fn set_option(&mut self, _ctx: &mut EditorCtx, _key: &str, _value: OptionValue) -> bool {
        false
    }

    /// Keyboard text routed to the active tool; only the text tool reacts.
    fn text_input(&mut self, _ctx: &mut EditorCtx, _ch: char) {}
    fn text_backspace(&mut self, _ctx: &mut EditorCtx) {}
    fn text_commit(&mut self, _ctx: &mut EditorCtx) {}
}

/// Owns all tool instances plus the current / temporary selection.
pub struct ToolManager {
    tools: Vec<Box<dyn Tool>>,
    current: ToolKind,
    previous: Option<ToolKind>,
    /// The tool pushed aside by a temporary (modifier-held) substitution,
    /// restored on release. Its configuration is kept intact.
    suspended: Option<ToolKind>,
}

impl ToolManager {
    pub fn new() -> Self {
        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(move_tool::MoveTool::new()),
            Box::new(marquee::MarqueeTool::new()),
            Box::new(marquee::LassoTool::new()),
            Box::new(brush::BrushTool::new()),
            Box::new(eraser::EraserTool::new()),
            Box::new(fill::FillTool::new()),
            Box::new(gradient::GradientTool::new()),
            Box::new(shape::ShapeTool::new()),
            Box::new(text_tool::TextTool::new()),
            Box::new(crop::CropTool::new()),
            Box::new(eyedropper::EyedropperTool::new()),
            Box::new(nav::HandTool::new()),
            Box::new(nav::ZoomTool::new()),
        ];
        Self {
            tools,
            current: ToolKind::Move,
            previous: None,
            suspended: None,
        }
    }

    pub fn current_kind(&self) -> ToolKind {
        self.current
    }

    pub fn current_tool(&self) -> &dyn Tool {
        self.tool(self.current).expect("current tool registered")
    }

    pub fn tool(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.kind() == kind).map(|t| &**t)
    }

    fn index_of(&self, kind: ToolKind) -> Option<usize> {
        self.tools.iter().position(|t| t.kind() == kind)
    }

    /// Switch tools, deactivating the old one (which cancels any gesture).
    pub fn set_tool(&mut self, ctx: &mut EditorCtx, kind: ToolKind) {
        let Some(new_index) = self.index_of(kind) else {
            log_warn!("unknown tool {:?}", kind);
            return;
        };
        if kind == self.current {
            return;
        }
        if let Some(old_index) = self.index_of(self.current) {
            if self.tools[old_index].is_dragging() {
                self.tools[old_index].cancel(ctx);
            }
            self.tools[old_index].deactivate(ctx);
            self.previous = Some(self.current);
        }
        self.current = kind;
        self.tools[new_index].activate(ctx);
        ctx.events.emit(&Event::ToolSelect { tool: kind });
    }

    /// Temporarily substitute another tool (e.g. Hand while space is
    /// held) without discarding the current tool's configuration.
    pub fn activate_temporary(&mut self, ctx: &mut EditorCtx, kind: ToolKind) {
        if self.suspended.is_some() || kind == self.current {
            return;
        }
        let Some(new_index) = self.index_of(kind) else {
            return;
        };
        if let Some(old_index) = self.index_of(self.current) {
            self.tools[old_index].deactivate(ctx);
        }
        self.suspended = Some(self.current);
        self.current = kind;
        self.tools[new_index].activate(ctx);
    }

    /// Restore the tool suspended by [`activate_temporary`].
    pub fn release_temporary(&mut self, ctx: &mut EditorCtx) {
        let Some(saved) = self.suspended.take() else {
            return;
        };
        if let Some(tmp_index) = self.index_of(self.current) {
            if self.tools[tmp_index].is_dragging() {
                self.tools[tmp_index].cancel(ctx);
            }
            self.tools[tmp_index].deactivate(ctx);
        }
        self.current = saved;
        if let Some(index) = self.index_of(saved) {
            self.tools[index].activate(ctx);
        }
    }

    /// Switch back to the previously selected (non-temporary) tool.
    pub fn switch_to_previous(&mut self, ctx: &mut EditorCtx) {
        if let Some(previous) = self.previous {
            self.set_tool(ctx, previous);
        }
    }

    pub fn pointer_down(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if let Some(index) = self.index_of(self.current) {
            self.tools[index].pointer_down(ctx, input);
        }
    }

    pub fn pointer_move(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if let Some(index) = self.index_of(self.current) {
            self.tools[index].pointer_move(ctx, input);
        }
    }

    pub fn pointer_up(&mut self, ctx: &mut EditorCtx, input: &PointerInput) {
        if let Some(index) = self.index_of(self.current) {
            self.tools[index].pointer_up(ctx, input);
        }
    }

    /// Abort the current tool's gesture (Escape-equivalent).
    pub fn cancel(&mut self, ctx: &mut EditorCtx) {
        if let Some(index) = self.index_of(self.current) {
            self.tools[index].cancel(ctx);
        }
    }

    pub fn text_input(&mut self, ctx: &mut EditorCtx, ch: char) {
        if let Some(index) = self.index_of(self.current) {
            self.tools[index].text_input(ctx, ch);
        }
    }

    pub fn text_backspace(&mut self, ctx: &mut EditorCtx) {
        if let Some(index) = self.index_of(self.current) {
            self.tools[index].text_backspace(ctx);
        }
    }

    pub fn text_commit(&mut self, ctx: &mut EditorCtx) {
        if let Some(index) = self.index_of(self.current) {
            self.tools[index].text_commit(ctx);
        }
    }

    pub fn render_overlay(&self, ctx: &EditorCtx, overlay: &mut Surface) {
        if let Some(tool) = self.tool(self.current) {
            tool.render_overlay(ctx, overlay);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.tool(self.current).is_some_and(|t| t.is_dragging())
    }

    pub fn options(&self, kind: ToolKind) -> Vec<ToolOption> {
        self.tool(kind).map(|t| t.options()).unwrap_or_default()
    }

    /// Write one option value back into a tool.
    pub fn set_option(
        &mut self,
        ctx: &mut EditorCtx,
        kind: ToolKind,
        key: &'static str,
        value: OptionValue,
    ) -> bool {
        let Some(index) = self.index_of(kind) else {
            return false;
        };
        let changed = self.tools[index].set_option(ctx, key, value);
        if changed {
            ctx.events.emit(&Event::ToolOptionChange { tool: kind, option: key });
        }
        changed
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolManager")
            .field("current", &self.current)
            .field("suspended", &self.suspended)
            .finish()
    }
}
