//! Typed publish/subscribe bus for notifying embedding UIs of core state
//! changes.
//!
//! Delivery is fire-and-forget with no guarantees. A listener that panics
//! is caught and logged; the remaining listeners still receive the event
//! and the emitting operation is never aborted.

use std::panic::{catch_unwind, AssertUnwindSafe};

use uuid::Uuid;

use crate::blend::BlendMode;
use crate::tools::ToolKind;

/// Everything the core announces to the outside world.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    DocumentNew { width: u32, height: u32 },
    DocumentResize { width: u32, height: u32 },

    LayerAdd { id: Uuid, index: usize },
    LayerRemove { id: Uuid, index: usize },
    LayerSelect { id: Uuid },
    LayerReorder { id: Uuid, old_index: usize, new_index: usize },
    LayerRename { id: Uuid, name: String },
    LayerVisibility { id: Uuid, visible: bool },
    LayerOpacity { id: Uuid, opacity: u8 },
    LayerBlendMode { id: Uuid, blend_mode: BlendMode },
    LayerLock { id: Uuid, locked: bool },
    LayerMerge { into: Uuid },
    LayerDuplicate { source: Uuid, duplicate: Uuid },

    ToolSelect { tool: ToolKind },
    ToolOptionChange { tool: ToolKind, option: &'static str },

    SelectionCreate,
    SelectionClear,

    HistoryPush { label: String, index: usize, total: usize },
    HistoryUndo { label: String, index: usize },
    HistoryRedo { label: String, index: usize },
    HistoryClear,

    CanvasRender,
    CanvasZoom { zoom: f32 },
    CanvasPan { pan_x: f32, pan_y: f32 },

    ColorForeground,
    ColorBackground,

    /// Non-fatal warning surfaced instead of an error (e.g. a rejected
    /// invalid operation the embedder may want to toast).
    Warning { message: String },
}

type Listener = Box<dyn Fn(&Event) + Send>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriberId(u64);

pub struct EventBus {
    listeners: Vec<(SubscriberId, Listener)>,
    /// Wildcard observer receiving every event — a debugging tap, not part
    /// of the normal notification contract.
    debug_tap: Option<Listener>,
    next_id: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            debug_tap: None,
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, listener: impl Fn(&Event) + Send + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    /// Install the wildcard debug tap (replaces any previous one).
    pub fn set_debug_tap(&mut self, listener: impl Fn(&Event) + Send + 'static) {
        self.debug_tap = Some(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver an event to every listener. Panicking listeners are isolated.
    pub fn emit(&self, event: &Event) {
        for (id, listener) in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                log_err!("event listener {:?} panicked on {:?}", id, event);
            }
        }
        if let Some(tap) = &self.debug_tap {
            if catch_unwind(AssertUnwindSafe(|| tap(event))).is_err() {
                log_err!("debug tap panicked on {:?}", event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("debug_tap", &self.debug_tap.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn emit_reaches_all_listeners() {
        let mut bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            bus.subscribe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        bus.emit(&Event::SelectionClear);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = bus.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(&Event::SelectionClear);
        bus.unsubscribe(id);
        bus.emit(&Event::SelectionClear);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let mut bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(|_| panic!("bad listener"));
        let c = Arc::clone(&count);
        bus.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        // Must not propagate the panic and must still reach listener 2.
        bus.emit(&Event::CanvasRender);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_tap_sees_every_event() {
        let mut bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.set_debug_tap(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(&Event::CanvasRender);
        bus.emit(&Event::SelectionClear);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
