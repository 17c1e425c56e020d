//! The document model: layers, the layer stack, and the compositor.
//!
//! A document always holds at least one layer. Layers are ordered bottom →
//! top and that order IS the z-order: `render_stack` walks it front to
//! back, so later layers paint over earlier ones through their own blend
//! mode. The compositor only reads layer surfaces and writes to a separate
//! output surface — it never mutates a layer.

use image::Rgba;
use rayon::prelude::*;
use uuid::Uuid;

use crate::blend::{blend_pixel, BlendMode};
use crate::error::EditorError;
use crate::events::{Event, EventBus};
use crate::raster;
use crate::selection::{Bounds, Selection};
use crate::surface::{Interpolation, Surface};
use crate::text::{measure_text, rasterize_text, FontStore, TextStyle};

/// Geometry payload of a shape layer. Coordinates are document-space,
/// offset by the layer position at composite time.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeData {
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        corner_radius: f32,
    },
    Ellipse {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Polygon {
        points: Vec<(f32, f32)>,
    },
}

impl ShapeData {
    /// Tight bounding box of the geometry (before layer positioning).
    pub fn bounds(&self) -> Bounds {
        match self {
            ShapeData::Rectangle { x, y, width, height, .. }
            | ShapeData::Ellipse { x, y, width, height } => Bounds::new(*x, *y, *width, *height),
            ShapeData::Line { x1, y1, x2, y2 } => Bounds::new(
                x1.min(*x2),
                y1.min(*y2),
                (x1 - x2).abs(),
                (y1 - y2).abs(),
            ),
            ShapeData::Polygon { points } => {
                Bounds::of_points(points).unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0))
            }
        }
    }
}

/// Kind-specific layer payload.
#[derive(Clone, Debug)]
pub enum LayerKind {
    Raster {
        surface: Surface,
    },
    Text {
        content: String,
        style: TextStyle,
    },
    Shape {
        shape: ShapeData,
        fill: Option<Rgba<u8>>,
        stroke: Option<Rgba<u8>>,
        stroke_width: f32,
    },
}

impl LayerKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            LayerKind::Raster { .. } => "raster",
            LayerKind::Text { .. } => "text",
            LayerKind::Shape { .. } => "shape",
        }
    }
}

/// One layer of the document.
pub struct Layer {
    /// Stable identity, assigned at creation and never reused.
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    /// 0–100; 100 = opaque.
    pub opacity: u8,
    pub blend_mode: BlendMode,
    /// Offset in document space. May be negative or exceed the canvas —
    /// content is clipped at composite time.
    pub position: (f32, f32),
    pub kind: LayerKind,
}

impl Layer {
    pub fn new_raster(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::with_kind(
            name,
            LayerKind::Raster {
                surface: Surface::new(width, height),
            },
        )
    }

    pub fn new_raster_filled(
        name: impl Into<String>,
        width: u32,
        height: u32,
        color: Rgba<u8>,
    ) -> Self {
        Self::with_kind(
            name,
            LayerKind::Raster {
                surface: Surface::new_filled(width, height, color),
            },
        )
    }

    pub fn new_text(name: impl Into<String>, content: impl Into<String>, style: TextStyle) -> Self {
        Self::with_kind(
            name,
            LayerKind::Text {
                content: content.into(),
                style,
            },
        )
    }

    pub fn new_shape(
        name: impl Into<String>,
        shape: ShapeData,
        fill: Option<Rgba<u8>>,
        stroke: Option<Rgba<u8>>,
        stroke_width: f32,
    ) -> Self {
        Self::with_kind(
            name,
            LayerKind::Shape {
                shape,
                fill,
                stroke,
                stroke_width,
            },
        )
    }

    pub fn with_kind(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 100,
            blend_mode: BlendMode::Normal,
            position: (0.0, 0.0),
            kind,
        }
    }

    pub fn opacity_factor(&self) -> f32 {
        self.opacity as f32 / 100.0
    }

    pub fn as_surface(&self) -> Option<&Surface> {
        match &self.kind {
            LayerKind::Raster { surface } => Some(surface),
            _ => None,
        }
    }

    pub fn as_surface_mut(&mut self) -> Option<&mut Surface> {
        match &mut self.kind {
            LayerKind::Raster { surface } => Some(surface),
            _ => None,
        }
    }

    /// A deep copy under a fresh id, named "<name> copy".
    pub fn duplicate(&self) -> Layer {
        Layer {
            id: Uuid::new_v4(),
            name: format!("{} copy", self.name),
            visible: self.visible,
            locked: self.locked,
            opacity: self.opacity,
            blend_mode: self.blend_mode,
            position: self.position,
            kind: self.kind.clone(),
        }
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind.type_name())
            .field("visible", &self.visible)
            .field("locked", &self.locked)
            .field("opacity", &self.opacity)
            .field("blend_mode", &self.blend_mode)
            .field("position", &self.position)
            .finish()
    }
}

/// The open document: canvas dimensions plus the ordered layer stack.
#[derive(Debug)]
pub struct Document {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    active_layer: Uuid,
}

impl Document {
    /// A new document with a white background layer.
    pub fn new(width: u32, height: u32) -> Self {
        let background = Layer::new_raster_filled(
            "Background",
            width.max(1),
            height.max(1),
            Rgba([255, 255, 255, 255]),
        );
        let active = background.id;
        Self {
            width: width.max(1),
            height: height.max(1),
            layers: vec![background],
            active_layer: active,
        }
    }

    /// Rebuild a document from restored parts (history / project load).
    /// Falls back to a fresh document if `layers` is empty.
    pub fn from_parts(width: u32, height: u32, layers: Vec<Layer>, active_layer: Uuid) -> Self {
        if layers.is_empty() {
            return Self::new(width, height);
        }
        let active = if layers.iter().any(|l| l.id == active_layer) {
            active_layer
        } else {
            layers[layers.len() - 1].id
        };
        Self {
            width: width.max(1),
            height: height.max(1),
            layers,
            active_layer: active,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn layer(&self, id: Uuid) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: Uuid) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn active_layer_id(&self) -> Uuid {
        self.active_layer
    }

    pub fn active_layer(&self) -> &Layer {
        // The active id always points at a live layer.
        self.layer(self.active_layer).expect("active layer exists")
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        let id = self.active_layer;
        self.layer_mut(id).expect("active layer exists")
    }

    pub fn set_active_layer(&mut self, id: Uuid, bus: &EventBus) -> Result<(), EditorError> {
        if self.layer(id).is_none() {
            return Err(EditorError::UnknownLayer(id));
        }
        self.active_layer = id;
        bus.emit(&Event::LayerSelect { id });
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Layer management
    // ------------------------------------------------------------------

    /// Insert a layer at `index` (or on top) and make it active.
    pub fn add_layer(&mut self, layer: Layer, index: Option<usize>, bus: &EventBus) -> Uuid {
        let id = layer.id;
        let index = index.unwrap_or(self.layers.len()).min(self.layers.len());
        self.layers.insert(index, layer);
        self.active_layer = id;
        bus.emit(&Event::LayerAdd { id, index });
        id
    }

    /// Remove a layer. The last remaining layer can never be removed.
    pub fn remove_layer(&mut self, id: Uuid, bus: &EventBus) -> Result<Layer, EditorError> {
        let index = self.index_of(id).ok_or(EditorError::UnknownLayer(id))?;
        if self.layers.len() == 1 {
            return Err(EditorError::InvalidOperation(
                "cannot remove the last layer".into(),
            ));
        }
        let removed = self.layers.remove(index);
        if self.active_layer == id {
            self.active_layer = self.layers[index.min(self.layers.len() - 1)].id;
        }
        bus.emit(&Event::LayerRemove { id, index });
        Ok(removed)
    }

    /// Duplicate a layer, inserting the copy directly above the original.
    pub fn duplicate_layer(&mut self, id: Uuid, bus: &EventBus) -> Result<Uuid, EditorError> {
        let index = self.index_of(id).ok_or(EditorError::UnknownLayer(id))?;
        let dup = self.layers[index].duplicate();
        let dup_id = dup.id;
        self.layers.insert(index + 1, dup);
        self.active_layer = dup_id;
        bus.emit(&Event::LayerDuplicate {
            source: id,
            duplicate: dup_id,
        });
        Ok(dup_id)
    }

    pub fn move_layer(
        &mut self,
        id: Uuid,
        new_index: usize,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        let old_index = self.index_of(id).ok_or(EditorError::UnknownLayer(id))?;
        let new_index = new_index.min(self.layers.len() - 1);
        if old_index == new_index {
            return Ok(());
        }
        let layer = self.layers.remove(old_index);
        self.layers.insert(new_index, layer);
        bus.emit(&Event::LayerReorder {
            id,
            old_index,
            new_index,
        });
        Ok(())
    }

    pub fn move_layer_up(&mut self, id: Uuid, bus: &EventBus) -> Result<(), EditorError> {
        let index = self.index_of(id).ok_or(EditorError::UnknownLayer(id))?;
        if index + 1 < self.layers.len() {
            self.move_layer(id, index + 1, bus)?;
        }
        Ok(())
    }

    pub fn move_layer_down(&mut self, id: Uuid, bus: &EventBus) -> Result<(), EditorError> {
        let index = self.index_of(id).ok_or(EditorError::UnknownLayer(id))?;
        if index > 0 {
            self.move_layer(id, index - 1, bus)?;
        }
        Ok(())
    }

    pub fn rename_layer(
        &mut self,
        id: Uuid,
        name: impl Into<String>,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        let layer = self.layer_mut(id).ok_or(EditorError::UnknownLayer(id))?;
        layer.name = name.into();
        let name = layer.name.clone();
        bus.emit(&Event::LayerRename { id, name });
        Ok(())
    }

    pub fn set_layer_visibility(
        &mut self,
        id: Uuid,
        visible: bool,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        let layer = self.layer_mut(id).ok_or(EditorError::UnknownLayer(id))?;
        layer.visible = visible;
        bus.emit(&Event::LayerVisibility { id, visible });
        Ok(())
    }

    pub fn set_layer_opacity(
        &mut self,
        id: Uuid,
        opacity: u8,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        let layer = self.layer_mut(id).ok_or(EditorError::UnknownLayer(id))?;
        layer.opacity = opacity.min(100);
        let opacity = layer.opacity;
        bus.emit(&Event::LayerOpacity { id, opacity });
        Ok(())
    }

    pub fn set_layer_blend_mode(
        &mut self,
        id: Uuid,
        blend_mode: BlendMode,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        let layer = self.layer_mut(id).ok_or(EditorError::UnknownLayer(id))?;
        layer.blend_mode = blend_mode;
        bus.emit(&Event::LayerBlendMode { id, blend_mode });
        Ok(())
    }

    pub fn set_layer_locked(
        &mut self,
        id: Uuid,
        locked: bool,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        let layer = self.layer_mut(id).ok_or(EditorError::UnknownLayer(id))?;
        layer.locked = locked;
        bus.emit(&Event::LayerLock { id, locked });
        Ok(())
    }

    /// Document-space bounding box of a layer's content.
    pub fn layer_bounds(&self, id: Uuid, fonts: &FontStore) -> Option<Bounds> {
        let layer = self.layer(id)?;
        let (px, py) = layer.position;
        Some(match &layer.kind {
            LayerKind::Raster { surface } => Bounds::new(
                px,
                py,
                surface.width() as f32,
                surface.height() as f32,
            ),
            LayerKind::Text { content, style } => measure_text(fonts, content, style, px, py),
            LayerKind::Shape { shape, .. } => {
                let b = shape.bounds();
                Bounds::new(b.x + px, b.y + py, b.width, b.height)
            }
        })
    }

    // ------------------------------------------------------------------
    //  Compositor
    // ------------------------------------------------------------------

    /// Composite the full stack into a fresh canvas-sized surface.
    pub fn composite(&self, fonts: &FontStore) -> Surface {
        let mut target = Surface::new(self.width, self.height);
        self.render_stack(&mut target, fonts);
        target
    }

    /// Render every visible layer, bottom to top, into `target`.
    pub fn render_stack(&self, target: &mut Surface, fonts: &FontStore) {
        for layer in &self.layers {
            self.render_layer(layer, target, fonts);
        }
    }

    /// Render a single layer into `target`, honoring visibility, opacity,
    /// blend mode and position.
    pub fn render_layer(&self, layer: &Layer, target: &mut Surface, fonts: &FontStore) {
        if !layer.visible || layer.opacity == 0 {
            return;
        }
        self.render_layer_content(layer, target, fonts);
    }

    /// The composite step without the visibility gate (flatten and
    /// merge-down paint hidden layers too).
    fn render_layer_content(&self, layer: &Layer, target: &mut Surface, fonts: &FontStore) {
        let (px, py) = (layer.position.0.round() as i32, layer.position.1.round() as i32);
        match &layer.kind {
            LayerKind::Raster { surface } => {
                blend_into(target, surface, px, py, layer.blend_mode, layer.opacity_factor());
            }
            LayerKind::Text { content, style } => {
                let Some(font) = fonts.resolve(style) else {
                    return;
                };
                if let Some((rendered, off_x, off_y)) = rasterize_text(&font, content, style) {
                    blend_into(
                        target,
                        &rendered,
                        px + off_x,
                        py + off_y,
                        layer.blend_mode,
                        layer.opacity_factor(),
                    );
                }
            }
            LayerKind::Shape {
                shape,
                fill,
                stroke,
                stroke_width,
            } => {
                let mut scratch = Surface::new(self.width, self.height);
                rasterize_shape(&mut scratch, shape, *fill, *stroke, *stroke_width);
                blend_into(target, &scratch, px, py, layer.blend_mode, layer.opacity_factor());
            }
        }
    }

    // ------------------------------------------------------------------
    //  Merge operations
    // ------------------------------------------------------------------

    /// Paint `id` onto the layer below it (with `id`'s own opacity and
    /// blend mode) and remove `id`. Both layers must be unlocked and the
    /// layer below must be a raster layer.
    pub fn merge_down(&mut self, id: Uuid, fonts: &FontStore, bus: &EventBus) -> Result<(), EditorError> {
        let index = self.index_of(id).ok_or(EditorError::UnknownLayer(id))?;
        if index == 0 {
            return Err(EditorError::InvalidOperation(
                "cannot merge the bottom layer down".into(),
            ));
        }
        if self.layers[index].locked || self.layers[index - 1].locked {
            return Err(EditorError::InvalidOperation(
                "cannot merge locked layers".into(),
            ));
        }
        if self.layers[index - 1].as_surface().is_none() {
            return Err(EditorError::InvalidOperation(
                "layer below is not a raster layer".into(),
            ));
        }

        // Render the doomed layer into a canvas-sized scratch, then blend
        // that into the receiving layer's local space. Visibility is not
        // consulted here — merge-down applies the layer regardless.
        let mut scratch = Surface::new(self.width, self.height);
        if self.layers[index].opacity > 0 {
            self.render_layer_content(&self.layers[index], &mut scratch, fonts);
        }

        let below = &mut self.layers[index - 1];
        let (bx, by) = (
            below.position.0.round() as i32,
            below.position.1.round() as i32,
        );
        let below_surface = below.as_surface_mut().expect("checked raster above");
        // The scratch already carries opacity + blend of the merged layer,
        // so it lands with Normal at full strength.
        blend_into(below_surface, &scratch, -bx, -by, BlendMode::Normal, 1.0);
        let below_id = below.id;

        let removed = self.layers.remove(index);
        if self.active_layer == removed.id {
            self.active_layer = below_id;
        }
        bus.emit(&Event::LayerMerge { into: below_id });
        Ok(())
    }

    /// Composite all visible layers into one new canvas-sized raster layer
    /// that replaces them (inserted at the top). Invisible layers are left
    /// untouched. Errors when nothing is visible.
    pub fn merge_visible(&mut self, fonts: &FontStore, bus: &EventBus) -> Result<Uuid, EditorError> {
        if !self.layers.iter().any(|l| l.visible) {
            return Err(EditorError::InvalidOperation(
                "no visible layers to merge".into(),
            ));
        }
        let mut merged_surface = Surface::new(self.width, self.height);
        for layer in &self.layers {
            self.render_layer(layer, &mut merged_surface, fonts);
        }
        let merged = Layer::with_kind(
            "Merged",
            LayerKind::Raster {
                surface: merged_surface,
            },
        );
        let merged_id = merged.id;

        self.layers.retain(|l| !l.visible);
        self.layers.push(merged);
        self.active_layer = merged_id;
        bus.emit(&Event::LayerMerge { into: merged_id });
        Ok(merged_id)
    }

    /// Composite ALL layers — visibility ignored — over an opaque white
    /// background into a single layer. Content loss is irreversible except
    /// through history.
    pub fn flatten(&mut self, fonts: &FontStore, bus: &EventBus) -> Uuid {
        let mut flat_surface =
            Surface::new_filled(self.width, self.height, Rgba([255, 255, 255, 255]));
        for layer in &self.layers {
            if layer.opacity > 0 {
                self.render_layer_content(layer, &mut flat_surface, fonts);
            }
        }
        let flat = Layer::with_kind(
            "Background",
            LayerKind::Raster {
                surface: flat_surface,
            },
        );
        let flat_id = flat.id;
        self.layers = vec![flat];
        self.active_layer = flat_id;
        bus.emit(&Event::LayerMerge { into: flat_id });
        flat_id
    }

    // ------------------------------------------------------------------
    //  Canvas geometry
    // ------------------------------------------------------------------

    /// Resize the canvas. With `scale_content`, raster layers are
    /// resampled to the new dimensions; otherwise their buffers are
    /// re-anchored at the origin.
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
        scale_content: bool,
        interp: Interpolation,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidOperation(
                "canvas dimensions must be positive".into(),
            ));
        }
        let sx = width as f32 / self.width as f32;
        let sy = height as f32 / self.height as f32;
        for layer in &mut self.layers {
            if let LayerKind::Raster { surface } = &mut layer.kind {
                if scale_content {
                    let w = ((surface.width() as f32 * sx).round() as u32).max(1);
                    let h = ((surface.height() as f32 * sy).round() as u32).max(1);
                    *surface = surface.resized(w, h, interp);
                    layer.position.0 *= sx;
                    layer.position.1 *= sy;
                } else {
                    surface.resize_canvas(width, height);
                }
            }
        }
        self.width = width;
        self.height = height;
        bus.emit(&Event::DocumentResize { width, height });
        Ok(())
    }

    /// Re-slice every layer to the crop rectangle and shrink the canvas to
    /// it. Raster content outside the rect is discarded and raster
    /// positions reset to the origin; text/shape layers keep their content
    /// and are shifted so it stays put relative to the new canvas.
    pub fn crop_to(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidOperation(
                "crop dimensions must be positive".into(),
            ));
        }
        for layer in &mut self.layers {
            match &mut layer.kind {
                LayerKind::Raster { surface } => {
                    let local_x = x - layer.position.0.round() as i32;
                    let local_y = y - layer.position.1.round() as i32;
                    *surface = surface.crop(local_x, local_y, width, height);
                    layer.position = (0.0, 0.0);
                }
                _ => {
                    layer.position.0 -= x as f32;
                    layer.position.1 -= y as f32;
                }
            }
        }
        self.width = width;
        self.height = height;
        bus.emit(&Event::DocumentResize { width, height });
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Selection-masked edits (active layer)
    // ------------------------------------------------------------------

    /// Zero the alpha of every selected pixel on the active layer. With no
    /// selection the whole layer is cleared.
    pub fn delete_selected_pixels(&mut self, selection: &Selection) -> Result<(), EditorError> {
        let layer = self.active_layer_mut();
        if layer.locked {
            return Err(EditorError::InvalidOperation("layer is locked".into()));
        }
        let (px, py) = layer.position;
        let surface = layer
            .as_surface_mut()
            .ok_or_else(|| EditorError::InvalidOperation("active layer is not raster".into()))?;
        if !selection.is_active() {
            surface.clear();
            return Ok(());
        }
        for y in 0..surface.height() as i32 {
            for x in 0..surface.width() as i32 {
                if selection.contains(x as f32 + px + 0.5, y as f32 + py + 0.5) {
                    let mut pixel = surface.get_pixel(x, y);
                    pixel[3] = 0;
                    surface.put_pixel(x, y, pixel);
                }
            }
        }
        Ok(())
    }

    /// Paint every selected pixel on the active layer with a solid color.
    pub fn fill_selected_pixels(
        &mut self,
        selection: &Selection,
        color: Rgba<u8>,
    ) -> Result<(), EditorError> {
        let layer = self.active_layer_mut();
        if layer.locked {
            return Err(EditorError::InvalidOperation("layer is locked".into()));
        }
        let (px, py) = layer.position;
        let surface = layer
            .as_surface_mut()
            .ok_or_else(|| EditorError::InvalidOperation("active layer is not raster".into()))?;
        for y in 0..surface.height() as i32 {
            for x in 0..surface.width() as i32 {
                if selection.contains(x as f32 + px + 0.5, y as f32 + py + 0.5) {
                    surface.paint_pixel(x, y, color);
                }
            }
        }
        Ok(())
    }
}

/// Rasterize a shape payload into a scratch surface (fill first, then
/// stroke, each only when enabled — matching paint order everywhere else).
pub fn rasterize_shape(
    target: &mut Surface,
    shape: &ShapeData,
    fill: Option<Rgba<u8>>,
    stroke: Option<Rgba<u8>>,
    stroke_width: f32,
) {
    match shape {
        ShapeData::Rectangle {
            x,
            y,
            width,
            height,
            corner_radius,
        } => {
            if let Some(color) = fill {
                raster::fill_rounded_rect(target, *x, *y, *width, *height, *corner_radius, color);
            }
            if let Some(color) = stroke {
                if stroke_width > 0.0 {
                    raster::stroke_rect(target, *x, *y, *width, *height, stroke_width, color);
                }
            }
        }
        ShapeData::Ellipse { x, y, width, height } => {
            if let Some(color) = fill {
                raster::fill_ellipse(target, *x, *y, *width, *height, color);
            }
            if let Some(color) = stroke {
                if stroke_width > 0.0 {
                    raster::stroke_ellipse(target, *x, *y, *width, *height, stroke_width, color);
                }
            }
        }
        ShapeData::Line { x1, y1, x2, y2 } => {
            if let Some(color) = stroke.or(fill) {
                raster::draw_line(target, *x1, *y1, *x2, *y2, stroke_width.max(1.0), color);
            }
        }
        ShapeData::Polygon { points } => {
            if let Some(color) = fill {
                raster::fill_polygon(target, points, color);
            }
            if let Some(color) = stroke {
                if stroke_width > 0.0 {
                    raster::stroke_polygon(target, points, stroke_width, color);
                }
            }
        }
    }
}

/// Blend `src` into `target` at a signed offset with the given mode and
/// opacity, row-parallel over the overlap.
pub fn blend_into(
    target: &mut Surface,
    src: &Surface,
    dx: i32,
    dy: i32,
    mode: BlendMode,
    opacity: f32,
) {
    let tw = target.width() as i32;
    let th = target.height() as i32;
    let sw = src.width() as i32;
    let sh = src.height() as i32;

    // Overlap in target coordinates.
    let x0 = dx.max(0);
    let y0 = dy.max(0);
    let x1 = (dx + sw).min(tw);
    let y1 = (dy + sh).min(th);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let src_img = src.as_image();
    let row_bytes = (tw * 4) as usize;
    let raw: &mut [u8] = target.as_image_mut();
    raw.par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0) as usize)
        .for_each(|(ty, row)| {
            let sy = ty as i32 - dy;
            for tx in x0..x1 {
                let sx = tx - dx;
                let blend = *src_img.get_pixel(sx as u32, sy as u32);
                if blend[3] == 0 {
                    continue;
                }
                let off = (tx * 4) as usize;
                let base = Rgba([row[off], row[off + 1], row[off + 2], row[off + 3]]);
                let out = blend_pixel(mode, base, blend, opacity);
                row[off] = out[0];
                row[off + 1] = out[1];
                row[off + 2] = out[2];
                row[off + 3] = out[3];
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> EventBus {
        EventBus::new()
    }

    fn fonts() -> FontStore {
        FontStore::new()
    }

    #[test]
    fn new_document_has_white_background() {
        let doc = Document::new(10, 10);
        assert_eq!(doc.layer_count(), 1);
        let out = doc.composite(&fonts());
        assert_eq!(out.get_pixel(5, 5), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn cannot_remove_last_layer() {
        let mut doc = Document::new(10, 10);
        let id = doc.active_layer_id();
        assert!(matches!(
            doc.remove_layer(id, &bus()),
            Err(EditorError::InvalidOperation(_))
        ));
        assert_eq!(doc.layer_count(), 1);
    }

    #[test]
    fn remove_layer_fixes_active_reference() {
        let mut doc = Document::new(10, 10);
        let top = doc.add_layer(Layer::new_raster("Top", 10, 10), None, &bus());
        assert_eq!(doc.active_layer_id(), top);
        doc.remove_layer(top, &bus()).unwrap();
        assert_eq!(doc.active_layer_id(), doc.layers()[0].id);
    }

    #[test]
    fn stack_order_is_z_order() {
        let mut doc = Document::new(4, 4);
        let mut red = Layer::new_raster_filled("red", 4, 4, Rgba([255, 0, 0, 255]));
        red.blend_mode = BlendMode::Normal;
        let mut green = Layer::new_raster_filled("green", 4, 4, Rgba([0, 255, 0, 255]));
        green.blend_mode = BlendMode::Normal;
        doc.add_layer(red, None, &bus());
        doc.add_layer(green, None, &bus());
        let out = doc.composite(&fonts());
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn zero_opacity_layers_reproduce_bottom_pixels() {
        let mut doc = Document::new(6, 6);
        let baseline = doc.composite(&fonts());
        let mut over1 = Layer::new_raster_filled("a", 6, 6, Rgba([255, 0, 0, 255]));
        over1.opacity = 0;
        let mut over2 = Layer::new_raster_filled("b", 6, 6, Rgba([0, 0, 255, 255]));
        over2.opacity = 0;
        doc.add_layer(over1, None, &bus());
        doc.add_layer(over2, None, &bus());
        let out = doc.composite(&fonts());
        assert_eq!(out, baseline);
    }

    #[test]
    fn layer_position_offsets_content() {
        let mut doc = Document::new(8, 8);
        let mut dot = Layer::new_raster_filled("dot", 2, 2, Rgba([0, 0, 255, 255]));
        dot.position = (3.0, 4.0);
        doc.add_layer(dot, None, &bus());
        let out = doc.composite(&fonts());
        assert_eq!(out.get_pixel(3, 4), Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(2, 4), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn negative_positions_clip() {
        let mut doc = Document::new(4, 4);
        let mut patch = Layer::new_raster_filled("patch", 4, 4, Rgba([0, 255, 255, 255]));
        patch.position = (-2.0, -2.0);
        doc.add_layer(patch, None, &bus());
        let out = doc.composite(&fonts());
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 255, 255, 255]));
        assert_eq!(out.get_pixel(1, 1), Rgba([0, 255, 255, 255]));
        assert_eq!(out.get_pixel(2, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn merge_down_respects_locks() {
        let mut doc = Document::new(4, 4);
        let top = doc.add_layer(Layer::new_raster("top", 4, 4), None, &bus());
        doc.layer_mut(top).unwrap().locked = true;
        assert!(doc.merge_down(top, &fonts(), &bus()).is_err());
        assert_eq!(doc.layer_count(), 2);
    }

    #[test]
    fn merge_down_applies_opacity_and_mode() {
        let mut doc = Document::new(2, 2);
        let mut top = Layer::new_raster_filled("top", 2, 2, Rgba([0, 0, 0, 255]));
        top.opacity = 50;
        let top_id = top.id;
        doc.add_layer(top, None, &bus());
        doc.merge_down(top_id, &fonts(), &bus()).unwrap();
        assert_eq!(doc.layer_count(), 1);
        let out = doc.composite(&fonts());
        // 50% black over white ≈ mid grey
        let p = out.get_pixel(0, 0);
        assert!((p[0] as i32 - 128).abs() <= 2, "{:?}", p);
    }

    #[test]
    fn merge_visible_preserves_hidden_layers() {
        let mut doc = Document::new(4, 4);
        let hidden = doc.add_layer(Layer::new_raster("hidden", 4, 4), None, &bus());
        doc.set_layer_visibility(hidden, false, &bus()).unwrap();
        doc.add_layer(
            Layer::new_raster_filled("red", 4, 4, Rgba([255, 0, 0, 255])),
            None,
            &bus(),
        );
        let merged = doc.merge_visible(&fonts(), &bus()).unwrap();
        assert_eq!(doc.layer_count(), 2);
        assert!(doc.layer(hidden).is_some());
        assert_eq!(doc.active_layer_id(), merged);
    }

    #[test]
    fn flatten_ignores_visibility_over_white() {
        let mut doc = Document::new(2, 2);
        let red = doc.add_layer(
            Layer::new_raster_filled("red", 2, 2, Rgba([255, 0, 0, 255])),
            None,
            &bus(),
        );
        doc.set_layer_visibility(red, false, &bus()).unwrap();
        doc.flatten(&fonts(), &bus());
        assert_eq!(doc.layer_count(), 1);
        let out = doc.composite(&fonts());
        // The invisible red layer still participates in flatten.
        assert_eq!(out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn resize_rejects_zero_dimensions() {
        let mut doc = Document::new(4, 4);
        assert!(doc
            .resize(0, 4, false, Interpolation::Bilinear, &bus())
            .is_err());
        assert_eq!(doc.width(), 4);
    }

    #[test]
    fn crop_reslices_raster_layers() {
        let mut doc = Document::new(8, 8);
        doc.active_layer_mut()
            .as_surface_mut()
            .unwrap()
            .fill_rect(2, 2, 2, 2, Rgba([0, 0, 0, 255]));
        doc.crop_to(2, 2, 4, 4, &bus()).unwrap();
        assert_eq!((doc.width(), doc.height()), (4, 4));
        let out = doc.composite(&fonts());
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(2, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn delete_selection_zeroes_alpha_inside_only() {
        let mut doc = Document::new(6, 6);
        let mut sel = Selection::default();
        sel.set_rectangle(Bounds::new(0.0, 0.0, 3.0, 3.0));
        doc.delete_selected_pixels(&sel).unwrap();
        let layer = doc.active_layer();
        let surface = layer.as_surface().unwrap();
        assert_eq!(surface.get_pixel(1, 1)[3], 0);
        assert_eq!(surface.get_pixel(4, 4)[3], 255);
    }

    #[test]
    fn delete_without_selection_clears_layer() {
        let mut doc = Document::new(4, 4);
        doc.delete_selected_pixels(&Selection::default()).unwrap();
        assert!(doc.active_layer().as_surface().unwrap().is_empty());
    }

    #[test]
    fn masked_edits_reject_locked_layer() {
        let mut doc = Document::new(4, 4);
        doc.active_layer_mut().locked = true;
        assert!(doc.delete_selected_pixels(&Selection::default()).is_err());
        assert!(doc
            .fill_selected_pixels(&Selection::default(), Rgba([0, 0, 0, 255]))
            .is_err());
    }

    #[test]
    fn shape_layer_composites_fill_and_stroke() {
        let mut doc = Document::new(20, 20);
        doc.add_layer(
            Layer::new_shape(
                "rect",
                ShapeData::Rectangle {
                    x: 4.0,
                    y: 4.0,
                    width: 12.0,
                    height: 12.0,
                    corner_radius: 0.0,
                },
                Some(Rgba([0, 0, 255, 255])),
                Some(Rgba([255, 0, 0, 255])),
                2.0,
            ),
            None,
            &bus(),
        );
        let out = doc.composite(&fonts());
        assert_eq!(out.get_pixel(10, 10), Rgba([0, 0, 255, 255])); // fill
        assert_eq!(out.get_pixel(4, 10), Rgba([255, 0, 0, 255])); // stroke edge
        assert_eq!(out.get_pixel(1, 1), Rgba([255, 255, 255, 255])); // outside
    }
}
