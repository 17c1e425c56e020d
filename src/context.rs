//! The editor context: one struct owning every core subsystem, threaded
//! explicitly through tools and operations instead of an ambient global.
//!
//! [`Editor`] is the embedding application's entry point. Pointer input
//! arrives in view coordinates, goes through the viewport transform once,
//! and is dispatched to the active tool; mutations raise the coalesced
//! "needs render" flag which the embedder drains once per frame tick.

use image::Rgba;
use uuid::Uuid;

use crate::blend::BlendMode;
use crate::canvas::{Document, Layer};
use crate::color::ColorState;
use crate::error::EditorError;
use crate::events::{Event, EventBus};
use crate::history::History;
use crate::selection::Selection;
use crate::surface::{Interpolation, Surface};
use crate::text::FontStore;
use crate::tools::{Modifiers, OptionValue, PointerInput, ToolKind, ToolManager, ToolOption};
use crate::viewport::Viewport;

/// Construction parameters for a new editor session.
#[derive(Clone, Debug)]
pub struct EditorConfig {
    pub width: u32,
    pub height: u32,
    pub max_history: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            max_history: crate::history::DEFAULT_MAX_STATES,
        }
    }
}

/// Borrowed view of everything a tool may touch. The tool manager itself
/// stays outside so tools can be dispatched while holding this.
pub struct EditorCtx<'a> {
    pub doc: &'a mut Document,
    pub selection: &'a mut Selection,
    pub viewport: &'a mut Viewport,
    pub history: &'a mut History,
    pub events: &'a EventBus,
    pub colors: &'a mut ColorState,
    pub fonts: &'a FontStore,
    pub needs_render: &'a mut bool,
}

impl EditorCtx<'_> {
    /// Mark the document dirty; the next frame tick recomposites once no
    /// matter how many mutations happened in between.
    pub fn request_render(&mut self) {
        *self.needs_render = true;
    }

    /// Capture and push a history entry. Capture failures are logged and
    /// swallowed — a failed snapshot must not abort the gesture that
    /// triggered it.
    pub fn push_history(&mut self, label: &str) {
        if let Err(e) = self
            .history
            .push_state(label, self.doc, self.viewport, self.events)
        {
            log_err!("failed to capture history snapshot {:?}: {}", label, e);
        }
    }
}

/// The assembled editor core.
#[derive(Debug)]
pub struct Editor {
    doc: Document,
    selection: Selection,
    viewport: Viewport,
    history: History,
    events: EventBus,
    colors: ColorState,
    fonts: FontStore,
    tools: ToolManager,
    needs_render: bool,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let doc = Document::new(config.width, config.height);
        let mut editor = Self {
            doc,
            selection: Selection::default(),
            viewport: Viewport::default(),
            history: History::new(config.max_history),
            events: EventBus::new(),
            colors: ColorState::default(),
            fonts: FontStore::new(),
            tools: ToolManager::new(),
            needs_render: true,
        };
        editor.events.emit(&Event::DocumentNew {
            width: editor.doc.width(),
            height: editor.doc.height(),
        });
        // The baseline entry every later undo lands on.
        if let Err(e) =
            editor
                .history
                .push_state("New Document", &editor.doc, &editor.viewport, &editor.events)
        {
            log_err!("failed to capture initial history state: {}", e);
        }
        editor
    }

    fn split(&mut self) -> (&mut ToolManager, EditorCtx<'_>) {
        (
            &mut self.tools,
            EditorCtx {
                doc: &mut self.doc,
                selection: &mut self.selection,
                viewport: &mut self.viewport,
                history: &mut self.history,
                events: &self.events,
                colors: &mut self.colors,
                fonts: &self.fonts,
                needs_render: &mut self.needs_render,
            },
        )
    }

    // ------------------------------------------------------------------
    //  Accessors
    // ------------------------------------------------------------------

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Direct mutable document access for embedders; remember to call
    /// [`request_render`](Self::request_render) after edits.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn colors(&self) -> &ColorState {
        &self.colors
    }

    pub fn colors_mut(&mut self) -> &mut ColorState {
        &mut self.colors
    }

    pub fn fonts(&self) -> &FontStore {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontStore {
        &mut self.fonts
    }

    // ------------------------------------------------------------------
    //  Pointer input & tools
    // ------------------------------------------------------------------

    fn make_input(&self, view_x: f32, view_y: f32, pressure: f32, modifiers: Modifiers) -> PointerInput {
        let (x, y) = self.viewport.view_to_doc(view_x, view_y);
        PointerInput {
            x,
            y,
            view_x,
            view_y,
            pressure,
            modifiers,
        }
    }

    pub fn pointer_down(&mut self, view_x: f32, view_y: f32, pressure: f32, modifiers: Modifiers) {
        let input = self.make_input(view_x, view_y, pressure, modifiers);
        let (tools, mut ctx) = self.split();
        tools.pointer_down(&mut ctx, &input);
    }

    pub fn pointer_move(&mut self, view_x: f32, view_y: f32, pressure: f32, modifiers: Modifiers) {
        let input = self.make_input(view_x, view_y, pressure, modifiers);
        let (tools, mut ctx) = self.split();
        tools.pointer_move(&mut ctx, &input);
    }

    pub fn pointer_up(&mut self, view_x: f32, view_y: f32, pressure: f32, modifiers: Modifiers) {
        let input = self.make_input(view_x, view_y, pressure, modifiers);
        let (tools, mut ctx) = self.split();
        tools.pointer_up(&mut ctx, &input);
    }

    /// Abort the in-flight gesture (Escape-equivalent).
    pub fn cancel_gesture(&mut self) {
        let (tools, mut ctx) = self.split();
        tools.cancel(&mut ctx);
    }

    pub fn set_tool(&mut self, kind: ToolKind) {
        let (tools, mut ctx) = self.split();
        tools.set_tool(&mut ctx, kind);
    }

    pub fn current_tool(&self) -> ToolKind {
        self.tools.current_kind()
    }

    pub fn is_dragging(&self) -> bool {
        self.tools.is_dragging()
    }

    /// Temporarily substitute a tool while a modifier is held (e.g. Hand
    /// on space); the replaced tool keeps its configuration.
    pub fn activate_temporary_tool(&mut self, kind: ToolKind) {
        let (tools, mut ctx) = self.split();
        tools.activate_temporary(&mut ctx, kind);
    }

    pub fn release_temporary_tool(&mut self) {
        let (tools, mut ctx) = self.split();
        tools.release_temporary(&mut ctx);
    }

    pub fn tool_options(&self, kind: ToolKind) -> Vec<ToolOption> {
        self.tools.options(kind)
    }

    pub fn set_tool_option(&mut self, kind: ToolKind, key: &'static str, value: OptionValue) -> bool {
        let (tools, mut ctx) = self.split();
        tools.set_option(&mut ctx, kind, key, value)
    }

    /// Text editing passthrough (the text tool owns the editing state).
    pub fn text_input(&mut self, ch: char) {
        let (tools, mut ctx) = self.split();
        tools.text_input(&mut ctx, ch);
    }

    pub fn text_backspace(&mut self) {
        let (tools, mut ctx) = self.split();
        tools.text_backspace(&mut ctx);
    }

    pub fn text_commit(&mut self) {
        let (tools, mut ctx) = self.split();
        tools.text_commit(&mut ctx);
    }

    // ------------------------------------------------------------------
    //  Rendering
    // ------------------------------------------------------------------

    pub fn request_render(&mut self) {
        self.needs_render = true;
    }

    /// Drain the coalesced render request. Call once per frame tick and
    /// recomposite only when this returns true.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.needs_render)
    }

    /// Composite the full document.
    pub fn composite(&self) -> Surface {
        self.doc.composite(&self.fonts)
    }

    /// Composite plus the active tool's overlay (previews, handles).
    pub fn composite_with_overlay(&mut self) -> Surface {
        let mut out = self.doc.composite(&self.fonts);
        let (tools, ctx) = self.split();
        tools.render_overlay(&ctx, &mut out);
        self.events.emit(&Event::CanvasRender);
        out
    }

    // ------------------------------------------------------------------
    //  History
    // ------------------------------------------------------------------

    pub fn push_history(&mut self, label: &str) {
        if let Err(e) = self
            .history
            .push_state(label, &self.doc, &self.viewport, &self.events)
        {
            log_err!("failed to capture history snapshot {:?}: {}", label, e);
        }
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let changed = self
            .history
            .undo(&mut self.doc, &mut self.viewport, &self.events)?;
        if changed {
            self.needs_render = true;
        }
        Ok(changed)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let changed = self
            .history
            .redo(&mut self.doc, &mut self.viewport, &self.events)?;
        if changed {
            self.needs_render = true;
        }
        Ok(changed)
    }

    pub fn go_to_state(&mut self, index: usize) -> Result<bool, EditorError> {
        let changed =
            self.history
                .go_to_state(index, &mut self.doc, &mut self.viewport, &self.events)?;
        if changed {
            self.needs_render = true;
        }
        Ok(changed)
    }

    // ------------------------------------------------------------------
    //  Layer operations
    // ------------------------------------------------------------------

    pub fn add_layer(&mut self, layer: Layer) -> Uuid {
        let id = self.doc.add_layer(layer, None, &self.events);
        self.needs_render = true;
        id
    }

    pub fn remove_layer(&mut self, id: Uuid) -> Result<Layer, EditorError> {
        let removed = self.doc.remove_layer(id, &self.events)?;
        self.needs_render = true;
        Ok(removed)
    }

    pub fn duplicate_layer(&mut self, id: Uuid) -> Result<Uuid, EditorError> {
        let dup = self.doc.duplicate_layer(id, &self.events)?;
        self.needs_render = true;
        Ok(dup)
    }

    pub fn set_active_layer(&mut self, id: Uuid) -> Result<(), EditorError> {
        self.doc.set_active_layer(id, &self.events)
    }

    pub fn set_layer_opacity(&mut self, id: Uuid, opacity: u8) -> Result<(), EditorError> {
        self.doc.set_layer_opacity(id, opacity, &self.events)?;
        self.needs_render = true;
        Ok(())
    }

    pub fn set_layer_blend_mode(&mut self, id: Uuid, mode: BlendMode) -> Result<(), EditorError> {
        self.doc.set_layer_blend_mode(id, mode, &self.events)?;
        self.needs_render = true;
        Ok(())
    }

    pub fn set_layer_visibility(&mut self, id: Uuid, visible: bool) -> Result<(), EditorError> {
        self.doc.set_layer_visibility(id, visible, &self.events)?;
        self.needs_render = true;
        Ok(())
    }

    pub fn merge_down(&mut self, id: Uuid) -> Result<(), EditorError> {
        self.doc.merge_down(id, &self.fonts, &self.events)?;
        self.push_history("Merge Down");
        self.needs_render = true;
        Ok(())
    }

    pub fn merge_visible(&mut self) -> Result<Uuid, EditorError> {
        let merged = self.doc.merge_visible(&self.fonts, &self.events)?;
        self.push_history("Merge Visible");
        self.needs_render = true;
        Ok(merged)
    }

    pub fn flatten(&mut self) -> Uuid {
        let flat = self.doc.flatten(&self.fonts, &self.events);
        self.push_history("Flatten Image");
        self.needs_render = true;
        flat
    }

    pub fn resize_canvas(
        &mut self,
        width: u32,
        height: u32,
        scale_content: bool,
        interp: Interpolation,
    ) -> Result<(), EditorError> {
        self.doc
            .resize(width, height, scale_content, interp, &self.events)?;
        self.push_history("Resize Canvas");
        self.needs_render = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Selection operations
    // ------------------------------------------------------------------

    pub fn select_all(&mut self) {
        self.selection.select_all(self.doc.width(), self.doc.height());
        self.events.emit(&Event::SelectionCreate);
        self.needs_render = true;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.events.emit(&Event::SelectionClear);
        self.needs_render = true;
    }

    /// Delete selected pixels on the active layer (whole layer when no
    /// selection is active).
    pub fn delete_selection(&mut self) -> Result<(), EditorError> {
        self.doc.delete_selected_pixels(&self.selection)?;
        self.push_history("Delete");
        self.needs_render = true;
        Ok(())
    }

    /// Fill selected pixels with the foreground color.
    pub fn fill_selection(&mut self) -> Result<(), EditorError> {
        let color = self.colors.foreground;
        self.fill_selection_with(color)
    }

    pub fn fill_selection_with(&mut self, color: Rgba<u8>) -> Result<(), EditorError> {
        self.doc.fill_selected_pixels(&self.selection, color)?;
        self.push_history("Fill");
        self.needs_render = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        Editor::new(EditorConfig {
            width: 32,
            height: 32,
            max_history: 20,
        })
    }

    #[test]
    fn new_editor_pushes_baseline_history() {
        let e = editor();
        assert_eq!(e.history().len(), 1);
        assert!(!e.history().can_undo());
    }

    #[test]
    fn render_requests_coalesce() {
        let mut e = editor();
        assert!(e.take_render_request());
        assert!(!e.take_render_request());
        e.request_render();
        e.request_render();
        assert!(e.take_render_request());
        assert!(!e.take_render_request());
    }

    #[test]
    fn temporary_tool_round_trip() {
        let mut e = editor();
        e.set_tool(ToolKind::Brush);
        // Tune an option, then substitute the hand tool and release it.
        assert!(e.set_tool_option(ToolKind::Brush, "size", OptionValue::Number(42.0)));
        e.activate_temporary_tool(ToolKind::Hand);
        assert_eq!(e.current_tool(), ToolKind::Hand);
        e.release_temporary_tool();
        assert_eq!(e.current_tool(), ToolKind::Brush);
        // Configuration survived the substitution.
        let size = e
            .tool_options(ToolKind::Brush)
            .into_iter()
            .find(|o| o.key == "size")
            .unwrap();
        assert_eq!(size.value.as_number(), Some(42.0));
    }

    #[test]
    fn select_all_and_clear() {
        let mut e = editor();
        e.select_all();
        assert!(e.selection().is_active());
        e.clear_selection();
        assert!(!e.selection().is_active());
    }
}
