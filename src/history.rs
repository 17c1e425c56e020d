//! Snapshot-based undo/redo.
//!
//! Entries form one linear sequence with a current-index pointer. Pushing
//! always truncates everything after the pointer — there is no redo-branch
//! preservation (a deliberate simplification over editors that keep
//! branches). When the list outgrows `max_states` the OLDEST entry is
//! evicted and the pointer is NOT advanced, which together approximate a
//! bounded ring.
//!
//! Snapshots are deep: raster content is encoded to PNG at capture time,
//! so later mutation of the live surfaces can never alias into a stored
//! entry.

use std::time::{SystemTime, UNIX_EPOCH};

use image::Rgba;
use uuid::Uuid;

use crate::blend::BlendMode;
use crate::canvas::{Document, Layer, LayerKind, ShapeData};
use crate::error::EditorError;
use crate::events::{Event, EventBus};
use crate::surface::Surface;
use crate::text::TextStyle;

/// Immutable per-layer record inside a snapshot.
#[derive(Clone, Debug)]
pub struct LayerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub opacity: u8,
    pub blend_mode: BlendMode,
    pub position: (f32, f32),
    pub kind: LayerKindSnapshot,
}

#[derive(Clone, Debug)]
pub enum LayerKindSnapshot {
    /// Raster content as base64 PNG.
    Raster { image_data: String },
    Text { content: String, style: TextStyle },
    Shape {
        shape: ShapeData,
        fill: Option<Rgba<u8>>,
        stroke: Option<Rgba<u8>>,
        stroke_width: f32,
    },
}

/// A complete, self-contained copy of document + view state.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    pub width: u32,
    pub height: u32,
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    pub active_layer: Uuid,
    pub layers: Vec<LayerSnapshot>,
}

impl DocumentSnapshot {
    /// Deep-capture the document and viewport.
    pub fn capture(doc: &Document, viewport: &crate::viewport::Viewport) -> Result<Self, EditorError> {
        let mut layers = Vec::with_capacity(doc.layer_count());
        for layer in doc.layers() {
            let kind = match &layer.kind {
                LayerKind::Raster { surface } => LayerKindSnapshot::Raster {
                    image_data: surface.to_base64_png()?,
                },
                LayerKind::Text { content, style } => LayerKindSnapshot::Text {
                    content: content.clone(),
                    style: style.clone(),
                },
                LayerKind::Shape {
                    shape,
                    fill,
                    stroke,
                    stroke_width,
                } => LayerKindSnapshot::Shape {
                    shape: shape.clone(),
                    fill: *fill,
                    stroke: *stroke,
                    stroke_width: *stroke_width,
                },
            };
            layers.push(LayerSnapshot {
                id: layer.id,
                name: layer.name.clone(),
                visible: layer.visible,
                locked: layer.locked,
                opacity: layer.opacity,
                blend_mode: layer.blend_mode,
                position: layer.position,
                kind,
            });
        }
        Ok(Self {
            width: doc.width(),
            height: doc.height(),
            zoom: viewport.zoom,
            pan_x: viewport.pan_x,
            pan_y: viewport.pan_y,
            active_layer: doc.active_layer_id(),
            layers,
        })
    }

    /// Rebuild the document and viewport from this snapshot.
    ///
    /// All decoding happens before anything is replaced, so a corrupt
    /// snapshot leaves the live document untouched.
    pub fn restore_into(
        &self,
        doc: &mut Document,
        viewport: &mut crate::viewport::Viewport,
    ) -> Result<(), EditorError> {
        let mut layers = Vec::with_capacity(self.layers.len());
        for snap in &self.layers {
            let kind = match &snap.kind {
                LayerKindSnapshot::Raster { image_data } => LayerKind::Raster {
                    surface: Surface::from_base64_png(image_data)
                        .map_err(|e| EditorError::CorruptSnapshot(e.to_string()))?,
                },
                LayerKindSnapshot::Text { content, style } => LayerKind::Text {
                    content: content.clone(),
                    style: style.clone(),
                },
                LayerKindSnapshot::Shape {
                    shape,
                    fill,
                    stroke,
                    stroke_width,
                } => LayerKind::Shape {
                    shape: shape.clone(),
                    fill: *fill,
                    stroke: *stroke,
                    stroke_width: *stroke_width,
                },
            };
            let mut layer = Layer::with_kind(snap.name.clone(), kind);
            // Restored layers keep their recorded identity.
            layer.id = snap.id;
            layer.visible = snap.visible;
            layer.locked = snap.locked;
            layer.opacity = snap.opacity;
            layer.blend_mode = snap.blend_mode;
            layer.position = snap.position;
            layers.push(layer);
        }
        *doc = Document::from_parts(self.width, self.height, layers, self.active_layer);
        viewport.zoom = self.zoom;
        viewport.pan_x = self.pan_x;
        viewport.pan_y = self.pan_y;
        Ok(())
    }
}

/// One history step.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub label: String,
    pub timestamp_ms: u64,
    pub snapshot: DocumentSnapshot,
}

/// Listing row for history panels.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryState {
    pub index: usize,
    pub label: String,
    pub timestamp_ms: u64,
    pub is_current: bool,
}

pub const DEFAULT_MAX_STATES: usize = 50;

/// The undo engine.
pub struct History {
    entries: Vec<HistoryEntry>,
    /// Index of the entry matching the live document; -1 before the first
    /// push.
    current_index: isize,
    /// Re-entrancy guard: pushes are ignored while a restore runs.
    restoring: bool,
    max_states: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STATES)
    }
}

impl History {
    pub fn new(max_states: usize) -> Self {
        Self {
            entries: Vec::new(),
            current_index: -1,
            restoring: false,
            max_states: max_states.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        usize::try_from(self.current_index).ok()
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index < self.entries.len() as isize - 1
    }

    /// Capture the current state and append it, discarding any redo
    /// branch. No-op while a restore is in progress.
    pub fn push_state(
        &mut self,
        label: impl Into<String>,
        doc: &Document,
        viewport: &crate::viewport::Viewport,
        bus: &EventBus,
    ) -> Result<(), EditorError> {
        if self.restoring {
            return Ok(());
        }
        let snapshot = DocumentSnapshot::capture(doc, viewport)?;
        self.push_snapshot(label, snapshot, bus);
        Ok(())
    }

    /// Append a pre-captured snapshot. Same truncation/eviction rules as
    /// [`push_state`].
    pub fn push_snapshot(
        &mut self,
        label: impl Into<String>,
        snapshot: DocumentSnapshot,
        bus: &EventBus,
    ) {
        if self.restoring {
            return;
        }

        // Drop the redo branch.
        let keep = (self.current_index + 1).max(0) as usize;
        self.entries.truncate(keep);

        let label = label.into();
        self.entries.push(HistoryEntry {
            label: label.clone(),
            timestamp_ms: now_ms(),
            snapshot,
        });

        // Evicting the oldest entry shifts every index down by one, which
        // cancels the advance — so the pointer only moves while capacity
        // allows.
        if self.entries.len() > self.max_states {
            self.entries.remove(0);
        } else {
            self.current_index += 1;
        }

        bus.emit(&Event::HistoryPush {
            label,
            index: self.current_index as usize,
            total: self.entries.len(),
        });
    }

    /// Step back one entry and restore it. Returns false when already at
    /// the first entry.
    pub fn undo(
        &mut self,
        doc: &mut Document,
        viewport: &mut crate::viewport::Viewport,
        bus: &EventBus,
    ) -> Result<bool, EditorError> {
        if !self.can_undo() {
            return Ok(false);
        }
        self.current_index -= 1;
        let index = self.current_index as usize;
        self.restore_current(doc, viewport)?;
        bus.emit(&Event::HistoryUndo {
            label: self.entries[index].label.clone(),
            index,
        });
        Ok(true)
    }

    /// Step forward one entry and restore it. Returns false at the end.
    pub fn redo(
        &mut self,
        doc: &mut Document,
        viewport: &mut crate::viewport::Viewport,
        bus: &EventBus,
    ) -> Result<bool, EditorError> {
        if !self.can_redo() {
            return Ok(false);
        }
        self.current_index += 1;
        let index = self.current_index as usize;
        self.restore_current(doc, viewport)?;
        bus.emit(&Event::HistoryRedo {
            label: self.entries[index].label.clone(),
            index,
        });
        Ok(true)
    }

    /// Jump straight to an arbitrary entry.
    pub fn go_to_state(
        &mut self,
        index: usize,
        doc: &mut Document,
        viewport: &mut crate::viewport::Viewport,
        bus: &EventBus,
    ) -> Result<bool, EditorError> {
        if index >= self.entries.len() {
            return Ok(false);
        }
        self.current_index = index as isize;
        self.restore_current(doc, viewport)?;
        bus.emit(&Event::HistoryUndo {
            label: self.entries[index].label.clone(),
            index,
        });
        Ok(true)
    }

    /// Restore the entry at the current index under the re-entrancy
    /// guard. The guard is released on every path — a failed restore
    /// leaves the engine usable.
    fn restore_current(
        &mut self,
        doc: &mut Document,
        viewport: &mut crate::viewport::Viewport,
    ) -> Result<(), EditorError> {
        let snapshot = self.entries[self.current_index as usize].snapshot.clone();
        self.restoring = true;
        let result = snapshot.restore_into(doc, viewport);
        self.restoring = false;
        if let Err(ref e) = result {
            log_err!("history restore failed: {}", e);
        }
        result
    }

    /// Listing of all entries for history panels.
    pub fn states(&self) -> Vec<HistoryState> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| HistoryState {
                index,
                label: entry.label.clone(),
                timestamp_ms: entry.timestamp_ms,
                is_current: index as isize == self.current_index,
            })
            .collect()
    }

    pub fn clear(&mut self, bus: &EventBus) {
        self.entries.clear();
        self.current_index = -1;
        bus.emit(&Event::HistoryClear);
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries.len())
            .field("current_index", &self.current_index)
            .field("restoring", &self.restoring)
            .finish()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::Viewport;

    fn setup() -> (Document, Viewport, EventBus) {
        (Document::new(8, 8), Viewport::default(), EventBus::new())
    }

    fn paint_active(doc: &mut Document, color: Rgba<u8>) {
        doc.active_layer_mut().as_surface_mut().unwrap().fill(color);
    }

    #[test]
    fn undo_redo_restore_exact_pixels() {
        let (mut doc, mut vp, bus) = setup();
        let mut history = History::new(10);

        history.push_state("Initial", &doc, &vp, &bus).unwrap();
        paint_active(&mut doc, Rgba([255, 0, 0, 255]));
        history.push_state("Red", &doc, &vp, &bus).unwrap();

        assert!(history.undo(&mut doc, &mut vp, &bus).unwrap());
        let white = doc.composite(&crate::text::FontStore::new());
        assert_eq!(white.get_pixel(0, 0), Rgba([255, 255, 255, 255]));

        assert!(history.redo(&mut doc, &mut vp, &bus).unwrap());
        let red = doc.composite(&crate::text::FontStore::new());
        assert_eq!(red.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn undo_restores_layer_attributes_and_ids() {
        let (mut doc, mut vp, bus) = setup();
        let mut history = History::new(10);
        let extra = doc.add_layer(Layer::new_raster("Extra", 8, 8), None, &bus);
        doc.set_layer_opacity(extra, 40, &bus).unwrap();
        doc.set_layer_blend_mode(extra, BlendMode::Multiply, &bus).unwrap();
        history.push_state("Setup", &doc, &vp, &bus).unwrap();

        doc.set_layer_opacity(extra, 90, &bus).unwrap();
        doc.remove_layer(extra, &bus).unwrap();
        history.push_state("Removed", &doc, &vp, &bus).unwrap();

        history.undo(&mut doc, &mut vp, &bus).unwrap();
        let restored = doc.layer(extra).expect("layer id survives restore");
        assert_eq!(restored.opacity, 40);
        assert_eq!(restored.blend_mode, BlendMode::Multiply);
        assert_eq!(doc.active_layer_id(), extra);
    }

    #[test]
    fn undo_at_first_entry_is_a_no_op() {
        let (mut doc, mut vp, bus) = setup();
        let mut history = History::new(10);
        history.push_state("Initial", &doc, &vp, &bus).unwrap();
        assert!(!history.undo(&mut doc, &mut vp, &bus).unwrap());
        assert_eq!(history.current_index(), Some(0));
    }

    #[test]
    fn push_truncates_redo_branch() {
        let (mut doc, mut vp, bus) = setup();
        let mut history = History::new(10);
        history.push_state("A", &doc, &vp, &bus).unwrap();
        paint_active(&mut doc, Rgba([1, 1, 1, 255]));
        history.push_state("B", &doc, &vp, &bus).unwrap();
        paint_active(&mut doc, Rgba([2, 2, 2, 255]));
        history.push_state("C", &doc, &vp, &bus).unwrap();

        history.undo(&mut doc, &mut vp, &bus).unwrap(); // at B
        history.undo(&mut doc, &mut vp, &bus).unwrap(); // at A
        paint_active(&mut doc, Rgba([3, 3, 3, 255]));
        history.push_state("D", &doc, &vp, &bus).unwrap();

        let labels: Vec<_> = history.states().iter().map(|s| s.label.clone()).collect();
        assert_eq!(labels, ["A", "D"]);
        assert!(!history.can_redo());
        assert_eq!(history.current_index(), Some(1));
    }

    #[test]
    fn capacity_boundary_keeps_pointer_on_latest() {
        let (mut doc, mut vp, bus) = setup();
        let max = 3;
        let mut history = History::new(max);
        for i in 0..=max {
            paint_active(&mut doc, Rgba([i as u8, 0, 0, 255]));
            history.push_state(format!("S{}", i), &doc, &vp, &bus).unwrap();
        }
        // max+1 pushes: oldest evicted, len stays at max
        assert_eq!(history.len(), max);
        let labels: Vec<_> = history.states().iter().map(|s| s.label.clone()).collect();
        assert_eq!(labels, ["S1", "S2", "S3"]);
        // Pointer still names the latest entry
        assert_eq!(history.current_index(), Some(max - 1));
        assert!(history.states().last().unwrap().is_current);
        assert!(!history.can_redo());
        // And undo still walks backwards correctly from there.
        assert!(history.undo(&mut doc, &mut vp, &bus).unwrap());
        let out = doc.composite(&crate::text::FontStore::new());
        assert_eq!(out.get_pixel(0, 0), Rgba([2, 0, 0, 255]));
    }

    #[test]
    fn push_during_restore_is_ignored() {
        let (mut doc, mut vp, bus) = setup();
        let mut history = History::new(10);
        history.push_state("A", &doc, &vp, &bus).unwrap();
        history.restoring = true;
        history.push_state("ghost", &doc, &vp, &bus).unwrap();
        assert_eq!(history.len(), 1);
        history.restoring = false;
    }

    #[test]
    fn corrupt_snapshot_fails_but_releases_guard() {
        let (mut doc, mut vp, bus) = setup();
        let mut history = History::new(10);
        history.push_state("A", &doc, &vp, &bus).unwrap();
        paint_active(&mut doc, Rgba([9, 9, 9, 255]));
        history.push_state("B", &doc, &vp, &bus).unwrap();

        // Sabotage entry A's raster payload.
        if let LayerKindSnapshot::Raster { image_data } =
            &mut history.entries[0].snapshot.layers[0].kind
        {
            *image_data = "@@@not-base64@@@".into();
        }

        assert!(history.undo(&mut doc, &mut vp, &bus).is_err());
        assert!(!history.restoring);
        // The live document was not corrupted by the failed restore.
        let out = doc.composite(&crate::text::FontStore::new());
        assert_eq!(out.get_pixel(0, 0), Rgba([9, 9, 9, 255]));
        // The engine remains usable.
        history.push_snapshot(
            "C",
            DocumentSnapshot::capture(&doc, &vp).unwrap(),
            &bus,
        );
    }

    #[test]
    fn snapshot_is_immune_to_later_mutation() {
        let (mut doc, mut vp, bus) = setup();
        let mut history = History::new(10);
        history.push_state("white", &doc, &vp, &bus).unwrap();
        paint_active(&mut doc, Rgba([0, 0, 0, 255]));
        history.push_state("black", &doc, &vp, &bus).unwrap();
        // Mutate live pixels again without pushing.
        paint_active(&mut doc, Rgba([77, 77, 77, 255]));

        history.go_to_state(0, &mut doc, &mut vp, &bus).unwrap();
        let out = doc.composite(&crate::text::FontStore::new());
        assert_eq!(out.get_pixel(3, 3), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn restore_brings_back_zoom_and_pan() {
        let (mut doc, mut vp, bus) = setup();
        let mut history = History::new(10);
        vp.zoom = 200.0;
        vp.pan_x = 15.0;
        history.push_state("zoomed", &doc, &vp, &bus).unwrap();
        vp.zoom = 50.0;
        vp.pan_x = -3.0;
        history.push_state("changed", &doc, &vp, &bus).unwrap();
        history.undo(&mut doc, &mut vp, &bus).unwrap();
        assert_eq!(vp.zoom, 200.0);
        assert_eq!(vp.pan_x, 15.0);
    }
}
