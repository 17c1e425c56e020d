//! Viewport math: zoom, pan and the single canonical document↔view
//! coordinate transform every tool shares.

/// Zoom presets stepped through by zoom-in/zoom-out, in percent.
pub const ZOOM_STEPS: &[f32] = &[
    1.0, 2.0, 3.0, 4.0, 5.0, 6.25, 8.33, 12.5, 16.67, 25.0, 33.33, 50.0, 66.67, 100.0, 150.0,
    200.0, 300.0, 400.0, 500.0, 600.0, 800.0, 1200.0, 1600.0, 2400.0, 3200.0,
];

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 3200.0;

/// Current view transform: `view = doc * (zoom/100) + pan`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Zoom percentage (100 = 1:1).
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 100.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn scale(&self) -> f32 {
        self.zoom / 100.0
    }

    /// Set the zoom level, optionally keeping a view-space anchor point
    /// fixed on screen (zoom toward the cursor).
    pub fn set_zoom(&mut self, zoom: f32, anchor: Option<(f32, f32)>) {
        let old_zoom = self.zoom;
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if let Some((ax, ay)) = anchor {
            let scale = self.zoom / old_zoom;
            self.pan_x = ax - (ax - self.pan_x) * scale;
            self.pan_y = ay - (ay - self.pan_y) * scale;
        }
    }

    /// Step up to the next zoom preset above the current level.
    pub fn zoom_in(&mut self, anchor: Option<(f32, f32)>) {
        let next = ZOOM_STEPS
            .iter()
            .copied()
            .find(|&z| z > self.zoom)
            .unwrap_or(MAX_ZOOM);
        self.set_zoom(next, anchor);
    }

    /// Step down to the nearest zoom preset below the current level.
    pub fn zoom_out(&mut self, anchor: Option<(f32, f32)>) {
        let prev = ZOOM_STEPS
            .iter()
            .rev()
            .copied()
            .find(|&z| z < self.zoom)
            .unwrap_or(MIN_ZOOM);
        self.set_zoom(prev, anchor);
    }

    /// Fit a document inside a view rectangle with uniform padding,
    /// centering it.
    pub fn fit_to_screen(&mut self, doc_w: u32, doc_h: u32, view_w: f32, view_h: f32, padding: f32) {
        if doc_w == 0 || doc_h == 0 {
            return;
        }
        let avail_w = (view_w - padding * 2.0).max(1.0);
        let avail_h = (view_h - padding * 2.0).max(1.0);
        let scale = (avail_w / doc_w as f32).min(avail_h / doc_h as f32);
        self.zoom = (scale * 100.0).round().clamp(MIN_ZOOM, MAX_ZOOM);
        let scale = self.scale();
        self.pan_x = (view_w - doc_w as f32 * scale) / 2.0;
        self.pan_y = (view_h - doc_h as f32 * scale) / 2.0;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// View-space point to document-space.
    pub fn view_to_doc(&self, vx: f32, vy: f32) -> (f32, f32) {
        let scale = self.scale();
        ((vx - self.pan_x) / scale, (vy - self.pan_y) / scale)
    }

    /// Document-space point to view-space.
    pub fn doc_to_view(&self, dx: f32, dy: f32) -> (f32, f32) {
        let scale = self.scale();
        (dx * scale + self.pan_x, dy * scale + self.pan_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_round_trip() {
        let vp = Viewport {
            zoom: 250.0,
            pan_x: 37.0,
            pan_y: -12.5,
        };
        let (dx, dy) = vp.view_to_doc(100.0, 200.0);
        let (vx, vy) = vp.doc_to_view(dx, dy);
        assert!((vx - 100.0).abs() < 1e-3);
        assert!((vy - 200.0).abs() < 1e-3);
    }

    #[test]
    fn zoom_steps_walk_the_table() {
        let mut vp = Viewport::default();
        vp.zoom_in(None);
        assert_eq!(vp.zoom, 150.0);
        vp.zoom_out(None);
        vp.zoom_out(None);
        assert_eq!(vp.zoom, 66.67);
    }

    #[test]
    fn zoom_clamps_at_extremes() {
        let mut vp = Viewport::default();
        vp.set_zoom(999_999.0, None);
        assert_eq!(vp.zoom, MAX_ZOOM);
        vp.zoom_in(None);
        assert_eq!(vp.zoom, MAX_ZOOM);
        vp.set_zoom(0.0, None);
        assert_eq!(vp.zoom, MIN_ZOOM);
        vp.zoom_out(None);
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn anchored_zoom_keeps_point_fixed() {
        let mut vp = Viewport::default();
        // Doc point under the view anchor before zooming...
        let anchor = (320.0, 240.0);
        let before = vp.view_to_doc(anchor.0, anchor.1);
        vp.set_zoom(200.0, Some(anchor));
        let after = vp.view_to_doc(anchor.0, anchor.1);
        assert!((before.0 - after.0).abs() < 1e-3);
        assert!((before.1 - after.1).abs() < 1e-3);
    }

    #[test]
    fn fit_to_screen_centers_document() {
        let mut vp = Viewport::default();
        vp.fit_to_screen(100, 50, 840.0, 440.0, 20.0);
        // 800x400 available; scale limited by width -> 8x = 800%
        assert_eq!(vp.zoom, 800.0);
        assert!((vp.pan_x - 20.0).abs() < 1e-3);
        assert!((vp.pan_y - 20.0).abs() < 1e-3);
    }
}
