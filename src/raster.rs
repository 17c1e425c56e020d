//! Scanline rasterization helpers shared by the shape tool, shape layers
//! and tool overlays. Hard-edged (no anti-aliasing) so results are exact
//! and deterministic; pixel centers decide coverage.

use image::Rgba;

use crate::surface::Surface;

/// Fill an axis-aligned rectangle, optionally with rounded corners.
/// `radius` is clamped to half the shorter side; 0 gives square corners
/// (the corner curve matches a quadratic corner path).
pub fn fill_rounded_rect(
    target: &mut Surface,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    radius: f32,
    color: Rgba<u8>,
) {
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let r = radius.clamp(0.0, (w / 2.0).min(h / 2.0));
    let (x0, y0, x1, y1) = pixel_span(x, y, w, h);
    for py in y0..y1 {
        for px in x0..x1 {
            let cx = px as f32 + 0.5;
            let cy = py as f32 + 0.5;
            if in_rounded_rect(cx, cy, x, y, w, h, r) {
                target.paint_pixel(px, py, color);
            }
        }
    }
}

/// Stroke a rectangle outline of the given width (drawn inward).
pub fn stroke_rect(
    target: &mut Surface,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    stroke_width: f32,
    color: Rgba<u8>,
) {
    if w <= 0.0 || h <= 0.0 || stroke_width <= 0.0 {
        return;
    }
    let sw = stroke_width.min(w / 2.0).min(h / 2.0);
    let (x0, y0, x1, y1) = pixel_span(x, y, w, h);
    for py in y0..y1 {
        for px in x0..x1 {
            let cx = px as f32 + 0.5;
            let cy = py as f32 + 0.5;
            let inside = cx >= x && cx < x + w && cy >= y && cy < y + h;
            let in_core = cx >= x + sw && cx < x + w - sw && cy >= y + sw && cy < y + h - sw;
            if inside && !in_core {
                target.paint_pixel(px, py, color);
            }
        }
    }
}

/// Fill the ellipse inscribed in the given bounds.
pub fn fill_ellipse(target: &mut Surface, x: f32, y: f32, w: f32, h: f32, color: Rgba<u8>) {
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let rx = w / 2.0;
    let ry = h / 2.0;
    let (cx0, cy0) = (x + rx, y + ry);
    let (x0, y0, x1, y1) = pixel_span(x, y, w, h);
    for py in y0..y1 {
        for px in x0..x1 {
            let dx = (px as f32 + 0.5 - cx0) / rx;
            let dy = (py as f32 + 0.5 - cy0) / ry;
            if dx * dx + dy * dy <= 1.0 {
                target.paint_pixel(px, py, color);
            }
        }
    }
}

/// Stroke the ellipse outline (ring of `stroke_width`, drawn inward).
pub fn stroke_ellipse(
    target: &mut Surface,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    stroke_width: f32,
    color: Rgba<u8>,
) {
    if w <= 0.0 || h <= 0.0 || stroke_width <= 0.0 {
        return;
    }
    let rx = w / 2.0;
    let ry = h / 2.0;
    let irx = (rx - stroke_width).max(0.0);
    let iry = (ry - stroke_width).max(0.0);
    let (cx0, cy0) = (x + rx, y + ry);
    let (x0, y0, x1, y1) = pixel_span(x, y, w, h);
    for py in y0..y1 {
        for px in x0..x1 {
            let fx = px as f32 + 0.5 - cx0;
            let fy = py as f32 + 0.5 - cy0;
            let outer = (fx / rx).powi(2) + (fy / ry).powi(2) <= 1.0;
            let inner = irx > 0.0 && iry > 0.0 && (fx / irx).powi(2) + (fy / iry).powi(2) <= 1.0;
            if outer && !inner {
                target.paint_pixel(px, py, color);
            }
        }
    }
}

/// Draw a line segment with the given stroke width (round caps).
pub fn draw_line(
    target: &mut Surface,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    stroke_width: f32,
    color: Rgba<u8>,
) {
    let half = (stroke_width / 2.0).max(0.5);
    let min_x = (x1.min(x2) - half).floor() as i32;
    let min_y = (y1.min(y2) - half).floor() as i32;
    let max_x = (x1.max(x2) + half).ceil() as i32;
    let max_y = (y1.max(y2) + half).ceil() as i32;
    for py in min_y..=max_y {
        for px in min_x..=max_x {
            let cx = px as f32 + 0.5;
            let cy = py as f32 + 0.5;
            if dist_to_segment(cx, cy, x1, y1, x2, y2) <= half {
                target.paint_pixel(px, py, color);
            }
        }
    }
}

/// Fill a closed polygon by the even-odd rule.
pub fn fill_polygon(target: &mut Surface, points: &[(f32, f32)], color: Rgba<u8>) {
    if points.len() < 3 {
        return;
    }
    let min_x = points.iter().map(|p| p.0).fold(f32::MAX, f32::min).floor() as i32;
    let min_y = points.iter().map(|p| p.1).fold(f32::MAX, f32::min).floor() as i32;
    let max_x = points.iter().map(|p| p.0).fold(f32::MIN, f32::max).ceil() as i32;
    let max_y = points.iter().map(|p| p.1).fold(f32::MIN, f32::max).ceil() as i32;
    for py in min_y..max_y {
        for px in min_x..max_x {
            if crate::selection::point_in_polygon(px as f32 + 0.5, py as f32 + 0.5, points) {
                target.paint_pixel(px, py, color);
            }
        }
    }
}

/// Stroke a polygon outline segment by segment, closing the path.
pub fn stroke_polygon(
    target: &mut Surface,
    points: &[(f32, f32)],
    stroke_width: f32,
    color: Rgba<u8>,
) {
    if points.len() < 2 {
        return;
    }
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        draw_line(target, x1, y1, x2, y2, stroke_width, color);
    }
}

fn pixel_span(x: f32, y: f32, w: f32, h: f32) -> (i32, i32, i32, i32) {
    (
        x.floor() as i32,
        y.floor() as i32,
        (x + w).ceil() as i32,
        (y + h).ceil() as i32,
    )
}

fn in_rounded_rect(cx: f32, cy: f32, x: f32, y: f32, w: f32, h: f32, r: f32) -> bool {
    if cx < x || cx >= x + w || cy < y || cy >= y + h {
        return false;
    }
    if r <= 0.0 {
        return true;
    }
    // A point is outside only when it sits in one of the four corner boxes
    // AND beyond that corner's arc.
    let in_left = cx < x + r;
    let in_right = cx > x + w - r;
    let in_top = cy < y + r;
    let in_bottom = cy > y + h - r;
    if (in_left || in_right) && (in_top || in_bottom) {
        let ccx = if in_left { x + r } else { x + w - r };
        let ccy = if in_top { y + r } else { y + h - r };
        let dx = cx - ccx;
        let dy = cy - ccy;
        return dx * dx + dy * dy <= r * r;
    }
    true
}

fn dist_to_segment(px: f32, py: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((px - x1) * dx + (py - y1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let nx = x1 + t * dx;
    let ny = y1 + t * dy;
    ((px - nx).powi(2) + (py - ny).powi(2)).sqrt()
}
