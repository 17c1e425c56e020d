//! Text layer rasterization.
//!
//! Line placement is deliberately simple: each `\n`-separated line is laid
//! out independently and placed at `y = line_index * font_size * line_height`
//! below the layer position, with the glyph baseline at the line's ascent.
//! No shaping beyond kerning pairs.

use std::collections::HashMap;
use std::sync::Mutex;

use ab_glyph::{point, Font, FontArc, Glyph, ScaleFont};
use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::color::hex_rgba;
use crate::selection::Bounds;
use crate::surface::Surface;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Style carried by every text layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub text_align: TextAlign,
    #[serde(with = "hex_rgba")]
    pub color: Rgba<u8>,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 48.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            text_align: TextAlign::Left,
            color: Rgba([0, 0, 0, 255]),
            line_height: 1.2,
        }
    }
}

/// Resolves style font families to loaded fonts.
///
/// Families registered through [`register`](FontStore::register) win;
/// unknown families fall back to a system lookup via `font-kit`. Lookup
/// results (including misses) are cached so a missing font warns once
/// instead of hitting the system on every composite.
#[derive(Default)]
pub struct FontStore {
    registered: HashMap<String, FontArc>,
    system_cache: Mutex<HashMap<String, Option<FontArc>>>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register font bytes under a family name. Returns false if the bytes
    /// are not a parseable font.
    pub fn register(&mut self, family: &str, bytes: Vec<u8>) -> bool {
        match FontArc::try_from_vec(bytes) {
            Ok(font) => {
                self.registered.insert(family.to_string(), font);
                true
            }
            Err(e) => {
                log_warn!("failed to parse font for family {:?}: {}", family, e);
                false
            }
        }
    }

    /// Resolve a style to a font, or `None` when nothing matches (the text
    /// layer then renders nothing).
    pub fn resolve(&self, style: &TextStyle) -> Option<FontArc> {
        if let Some(font) = self.registered.get(&style.font_family) {
            return Some(font.clone());
        }
        let key = format!(
            "{}|{:?}|{:?}",
            style.font_family, style.font_weight, style.font_style
        );
        let mut cache = self.system_cache.lock().ok()?;
        if let Some(cached) = cache.get(&key) {
            return cached.clone();
        }
        let loaded = load_system_font(
            &style.font_family,
            style.font_weight,
            style.font_style,
        );
        if loaded.is_none() {
            log_warn!("no font found for family {:?}", style.font_family);
        }
        cache.insert(key, loaded.clone());
        loaded
    }
}

impl std::fmt::Debug for FontStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontStore")
            .field("registered", &self.registered.len())
            .finish()
    }
}

/// Look up a family in the system font sources.
fn load_system_font(family: &str, weight: FontWeight, style: FontStyle) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Style, Weight};
    use font_kit::source::SystemSource;

    let mut properties = Properties::new();
    properties.weight = match weight {
        FontWeight::Normal => Weight::NORMAL,
        FontWeight::Bold => Weight::BOLD,
    };
    properties.style = match style {
        FontStyle::Normal => Style::Normal,
        FontStyle::Italic => Style::Italic,
    };

    let handle = SystemSource::new()
        .select_best_match(&[FamilyName::Title(family.to_string())], &properties)
        .ok()?;
    let font = handle.load().ok()?;
    let bytes = font.copy_font_data()?;
    FontArc::try_from_vec((*bytes).clone()).ok()
}

/// One line laid out left-aligned at x = 0: glyphs with their advances.
fn layout_line(font: &FontArc, line: &str, font_size: f32) -> (Vec<(Glyph, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last = None;
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor_x += scaled.kern(prev, id);
        }
        glyphs.push((id.with_scale(font_size), cursor_x));
        cursor_x += scaled.h_advance(id);
        last = Some(id);
    }
    (glyphs, cursor_x)
}

/// Width of each line of `content` at the given size, without rasterizing.
pub fn line_widths(font: &FontArc, content: &str, font_size: f32) -> Vec<f32> {
    content
        .split('\n')
        .map(|line| layout_line(font, line, font_size).1)
        .collect()
}

/// Measured bounding box of a text layer placed at `(x, y)`, used by the
/// text tool for click hit-testing. Width has a 100-unit floor so empty
/// layers stay clickable; falls back to a size-based estimate when no font
/// resolves.
pub fn measure_text(
    fonts: &FontStore,
    content: &str,
    style: &TextStyle,
    x: f32,
    y: f32,
) -> Bounds {
    let lines = content.split('\n').count().max(1);
    let height = lines as f32 * style.font_size * style.line_height;
    let width = match fonts.resolve(style) {
        Some(font) => line_widths(&font, content, style.font_size)
            .into_iter()
            .fold(0.0f32, f32::max),
        None => content
            .split('\n')
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as f32
            * style.font_size
            * 0.5,
    };
    let offset = align_offset(style.text_align, width);
    Bounds::new(x + offset, y, width.max(100.0), height)
}

fn align_offset(align: TextAlign, line_width: f32) -> f32 {
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => -line_width / 2.0,
        TextAlign::Right => -line_width,
    }
}

/// Rasterize text into a surface.
///
/// Returns the surface plus its offset relative to the layer position
/// (alignment can push glyphs left of the anchor), or `None` when there is
/// nothing to draw.
pub fn rasterize_text(
    font: &FontArc,
    content: &str,
    style: &TextStyle,
) -> Option<(Surface, i32, i32)> {
    let scaled = font.as_scaled(style.font_size);
    let ascent = scaled.ascent();
    let line_step = style.font_size * style.line_height;

    // Lay out all lines, collecting positioned glyphs in layer-local space.
    let mut positioned: Vec<Glyph> = Vec::new();
    for (line_idx, line) in content.split('\n').enumerate() {
        let (glyphs, line_width) = layout_line(font, line, style.font_size);
        let x_off = align_offset(style.text_align, line_width);
        let baseline = line_idx as f32 * line_step + ascent;
        for (mut glyph, gx) in glyphs {
            glyph.position = point(gx + x_off, baseline);
            positioned.push(glyph);
        }
    }

    // Bounding box over the outlined glyphs.
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let outlined: Vec<_> = positioned
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    for outline in &outlined {
        let bounds = outline.px_bounds();
        min_x = min_x.min(bounds.min.x);
        min_y = min_y.min(bounds.min.y);
        max_x = max_x.max(bounds.max.x);
        max_y = max_y.max(bounds.max.y);
    }
    if outlined.is_empty() || min_x >= max_x || min_y >= max_y {
        return None;
    }

    let off_x = min_x.floor() as i32;
    let off_y = min_y.floor() as i32;
    let w = (max_x.ceil() as i32 - off_x).max(1) as u32;
    let h = (max_y.ceil() as i32 - off_y).max(1) as u32;
    let mut surface = Surface::new(w, h);

    let color = style.color;
    for outline in &outlined {
        let bounds = outline.px_bounds();
        outline.draw(|gx, gy, coverage| {
            if coverage <= 0.0 {
                return;
            }
            let px = bounds.min.x as i32 + gx as i32 - off_x;
            let py = bounds.min.y as i32 + gy as i32 - off_y;
            let alpha = (coverage * color[3] as f32).round().min(255.0) as u8;
            surface.paint_pixel(px, py, Rgba([color[0], color[1], color[2], alpha]));
        });
    }

    Some((surface, off_x, off_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_without_font_uses_line_count() {
        let fonts = FontStore::new();
        let style = TextStyle {
            font_family: "no-such-font-family-zzz".into(),
            ..TextStyle::default()
        };
        let b = measure_text(&fonts, "one\ntwo\nthree", &style, 10.0, 20.0);
        assert_eq!(b.y, 20.0);
        assert!((b.height - 3.0 * 48.0 * 1.2).abs() < 1e-3);
        assert!(b.width >= 100.0);
    }

    #[test]
    fn measure_empty_text_keeps_min_width() {
        let fonts = FontStore::new();
        let style = TextStyle {
            font_family: "no-such-font-family-zzz".into(),
            ..TextStyle::default()
        };
        let b = measure_text(&fonts, "", &style, 0.0, 0.0);
        assert_eq!(b.width, 100.0);
        assert!((b.height - 48.0 * 1.2).abs() < 1e-3);
    }

    #[test]
    fn register_rejects_garbage_bytes() {
        let mut fonts = FontStore::new();
        assert!(!fonts.register("bogus", vec![1, 2, 3, 4]));
    }

    #[test]
    fn style_serializes_camel_case() {
        let style = TextStyle::default();
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(json["fontFamily"], "Arial");
        assert_eq!(json["textAlign"], "left");
        assert_eq!(json["lineHeight"], 1.2);
        assert_eq!(json["color"], "#000000");
    }
}
