//! The pixel buffer every layer and every tool operates on.
//!
//! `Surface` is the only place raw pixel arithmetic happens; higher layers
//! (compositor, tools, history, io) go through it. RGBA, 8 bits per channel,
//! straight (non-premultiplied) alpha.

use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{imageops, ImageEncoder, Rgba, RgbaImage};

use crate::error::EditorError;

/// Interpolation method for resize/resample operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl Interpolation {
    pub fn all() -> &'static [Interpolation] {
        &[
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Bicubic,
            Interpolation::Lanczos3,
        ]
    }

    pub fn to_filter(self) -> imageops::FilterType {
        match self {
            Interpolation::Nearest => imageops::FilterType::Nearest,
            Interpolation::Bilinear => imageops::FilterType::Triangle,
            Interpolation::Bicubic => imageops::FilterType::CatmullRom,
            Interpolation::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

/// An addressable RGBA8 pixel buffer.
///
/// Out-of-bounds reads return transparent black; out-of-bounds writes are
/// dropped. Tools rely on this so they never have to bounds-check their own
/// geometry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Allocate a transparent surface. Dimensions are clamped to at least 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    /// Allocate a surface filled with a solid color.
    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let mut surface = Self::new(width, height);
        surface.fill(color);
        surface
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Rgba<u8> {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return Rgba([0, 0, 0, 0]);
        }
        *self.pixels.get_pixel(x as u32, y as u32)
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, pixel: Rgba<u8>) {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return;
        }
        self.pixels.put_pixel(x as u32, y as u32, pixel);
    }

    /// Source-over paint of a single pixel (straight alpha).
    pub fn paint_pixel(&mut self, x: i32, y: i32, src: Rgba<u8>) {
        if src[3] == 0 {
            return;
        }
        let dst = self.get_pixel(x, y);
        self.put_pixel(x, y, over(src, dst));
    }

    /// Read a rectangular region as a row-major pixel array. The requested
    /// rect is clamped to the surface; the returned dimensions reflect the
    /// clamp.
    pub fn get_region(&self, x: u32, y: u32, w: u32, h: u32) -> (Vec<Rgba<u8>>, u32, u32) {
        let x1 = (x + w).min(self.width());
        let y1 = (y + h).min(self.height());
        let x0 = x.min(x1);
        let y0 = y.min(y1);
        let (rw, rh) = (x1 - x0, y1 - y0);

        let mut out = Vec::with_capacity((rw * rh) as usize);
        for py in y0..y1 {
            for px in x0..x1 {
                out.push(*self.pixels.get_pixel(px, py));
            }
        }
        (out, rw, rh)
    }

    /// Write a row-major pixel array back at (x, y); pixels falling outside
    /// the surface are dropped.
    pub fn put_region(&mut self, x: i32, y: i32, w: u32, data: &[Rgba<u8>]) {
        for (i, &pixel) in data.iter().enumerate() {
            let px = x + (i as u32 % w.max(1)) as i32;
            let py = y + (i as u32 / w.max(1)) as i32;
            self.put_pixel(px, py, pixel);
        }
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    /// Source-over fill of an axis-aligned rect (signed coords, clipped).
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgba<u8>) {
        for py in y..y + h as i32 {
            for px in x..x + w as i32 {
                self.paint_pixel(px, py, color);
            }
        }
    }

    /// Source-over draw of another surface at a signed offset, clipped.
    pub fn draw_surface(&mut self, src: &Surface, dx: i32, dy: i32) {
        for (sx, sy, &pixel) in src.pixels.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            self.paint_pixel(dx + sx as i32, dy + sy as i32, pixel);
        }
    }

    /// Draw another surface scaled to `(w, h)` at a signed offset.
    pub fn draw_surface_scaled(
        &mut self,
        src: &Surface,
        dx: i32,
        dy: i32,
        w: u32,
        h: u32,
        interp: Interpolation,
    ) {
        if w == 0 || h == 0 {
            return;
        }
        let scaled = src.resized(w, h, interp);
        self.draw_surface(&scaled, dx, dy);
    }

    /// Return a copy resampled to new dimensions.
    pub fn resized(&self, w: u32, h: u32, interp: Interpolation) -> Surface {
        Surface {
            pixels: imageops::resize(&self.pixels, w.max(1), h.max(1), interp.to_filter()),
        }
    }

    /// Extract a sub-rectangle as a new surface. The rect may extend past
    /// the surface; uncovered pixels come out transparent.
    pub fn crop(&self, x: i32, y: i32, w: u32, h: u32) -> Surface {
        let mut out = Surface::new(w, h);
        for py in 0..h as i32 {
            for px in 0..w as i32 {
                let pixel = self.get_pixel(x + px, y + py);
                if pixel[3] != 0 {
                    out.put_pixel(px, py, pixel);
                }
            }
        }
        out
    }

    /// Reallocate the buffer to new dimensions, keeping existing content
    /// anchored at the origin (no scaling).
    pub fn resize_canvas(&mut self, w: u32, h: u32) {
        let mut out = Surface::new(w, h);
        out.put_region_raw(&self.pixels);
        self.pixels = out.pixels;
    }

    fn put_region_raw(&mut self, src: &RgbaImage) {
        let w = src.width().min(self.width());
        let h = src.height().min(self.height());
        for y in 0..h {
            for x in 0..w {
                self.pixels.put_pixel(x, y, *src.get_pixel(x, y));
            }
        }
    }

    /// True if every pixel is fully transparent.
    pub fn is_empty(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    // ------------------------------------------------------------------
    //  Snapshot codec — lossless PNG, used by history and the project file
    // ------------------------------------------------------------------

    pub fn encode_png(&self) -> Result<Vec<u8>, EditorError> {
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(
                self.pixels.as_raw(),
                self.width(),
                self.height(),
                image::ColorType::Rgba8,
            )
            .map_err(|e| EditorError::Codec(e.to_string()))?;
        Ok(buf)
    }

    pub fn to_base64_png(&self) -> Result<String, EditorError> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.encode_png()?))
    }

    pub fn from_base64_png(data: &str) -> Result<Surface, EditorError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| EditorError::Codec(e.to_string()))?;
        let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
            .map_err(|e| EditorError::Codec(e.to_string()))?;
        Ok(Surface::from_image(img.to_rgba8()))
    }
}

/// Straight-alpha source-over of one pixel.
fn over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let sc = src[c] as f32 / 255.0;
        let dc = dst[c] as f32 / 255.0;
        out[c] = (((sc * sa + dc * da * (1.0 - sa)) / out_a) * 255.0).round() as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn out_of_bounds_access_is_harmless() {
        let mut s = Surface::new(4, 4);
        assert_eq!(s.get_pixel(-1, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(s.get_pixel(4, 4), Rgba([0, 0, 0, 0]));
        s.put_pixel(-1, 2, Rgba([255, 0, 0, 255]));
        s.put_pixel(9, 9, Rgba([255, 0, 0, 255]));
        assert!(s.is_empty());
    }

    #[test]
    fn region_round_trip() {
        let mut s = Surface::new(8, 8);
        s.fill_rect(2, 2, 3, 3, Rgba([9, 8, 7, 255]));
        let (data, w, h) = s.get_region(2, 2, 3, 3);
        assert_eq!((w, h), (3, 3));
        assert!(data.iter().all(|&p| p == Rgba([9, 8, 7, 255])));

        let mut t = Surface::new(8, 8);
        t.put_region(2, 2, w, &data);
        assert_eq!(s, t);
    }

    #[test]
    fn region_clamps_to_surface() {
        let s = Surface::new_filled(4, 4, Rgba([1, 2, 3, 255]));
        let (data, w, h) = s.get_region(2, 2, 10, 10);
        assert_eq!((w, h), (2, 2));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn draw_surface_clips_at_edges() {
        let mut dst = Surface::new(4, 4);
        let src = Surface::new_filled(3, 3, Rgba([0, 255, 0, 255]));
        dst.draw_surface(&src, 2, 2);
        assert_eq!(dst.get_pixel(2, 2), Rgba([0, 255, 0, 255]));
        assert_eq!(dst.get_pixel(3, 3), Rgba([0, 255, 0, 255]));
        assert_eq!(dst.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn source_over_on_transparent_keeps_color() {
        let mut s = Surface::new(1, 1);
        s.paint_pixel(0, 0, Rgba([200, 100, 50, 128]));
        let p = s.get_pixel(0, 0);
        assert_eq!([p[0], p[1], p[2], p[3]], [200, 100, 50, 128]);
    }

    #[test]
    fn crop_beyond_bounds_pads_transparent() {
        let s = Surface::new_filled(4, 4, Rgba([5, 5, 5, 255]));
        let c = s.crop(2, 2, 4, 4);
        assert_eq!(c.get_pixel(0, 0), Rgba([5, 5, 5, 255]));
        assert_eq!(c.get_pixel(3, 3), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn resize_canvas_keeps_origin_content() {
        let mut s = Surface::new_filled(4, 4, Rgba([7, 7, 7, 255]));
        s.resize_canvas(6, 2);
        assert_eq!((s.width(), s.height()), (6, 2));
        assert_eq!(s.get_pixel(3, 1), Rgba([7, 7, 7, 255]));
        assert_eq!(s.get_pixel(5, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn png_base64_round_trip_is_lossless() {
        let mut s = Surface::new(5, 3);
        s.put_pixel(0, 0, Rgba([1, 2, 3, 4]));
        s.put_pixel(4, 2, Rgba([250, 128, 9, 200]));
        let encoded = s.to_base64_png().unwrap();
        let decoded = Surface::from_base64_png(&encoded).unwrap();
        assert_eq!(s, decoded);
    }

    #[test]
    fn decode_garbage_is_an_error() {
        assert!(Surface::from_base64_png("not base64 at all!").is_err());
        let valid_b64 = base64::engine::general_purpose::STANDARD.encode(b"not a png");
        assert!(Surface::from_base64_png(&valid_b64).is_err());
    }
}
