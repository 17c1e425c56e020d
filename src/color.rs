//! Color math shared across the crate: RGB↔HSL conversion, the hex codec
//! used by the project file, and the foreground/background color pair.

use image::Rgba;
use serde::{Deserialize, Serialize};

/// Convert 0–255 RGB channels to HSL, all components in [0, 1].
///
/// Standard max/min-channel formulas; the hue sector is picked by whichever
/// channel is the maximum.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if max == r {
        ((g - b) / d + if g < b { 6.0 } else { 0.0 }) / 6.0
    } else if max == g {
        ((b - r) / d + 2.0) / 6.0
    } else {
        ((r - g) / d + 4.0) / 6.0
    };

    (h, s, l)
}

/// Convert HSL (all in [0, 1]) back to 0–255 RGB channels.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    fn hue_to_channel(p: f32, q: f32, mut t: f32) -> f32 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        (hue_to_channel(p, q, h + 1.0 / 3.0) * 255.0).round() as u8,
        (hue_to_channel(p, q, h) * 255.0).round() as u8,
        (hue_to_channel(p, q, h - 1.0 / 3.0) * 255.0).round() as u8,
    )
}

/// Parse `#rrggbb` or `rrggbb` into an opaque pixel. Returns `None` for
/// anything malformed.
pub fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let val = u32::from_str_radix(hex, 16).ok()?;
    Some(Rgba([
        ((val >> 16) & 0xff) as u8,
        ((val >> 8) & 0xff) as u8,
        (val & 0xff) as u8,
        255,
    ]))
}

/// Format a pixel's RGB channels as `#rrggbb` (alpha is dropped).
pub fn to_hex(color: Rgba<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// The editor's foreground/background color pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorState {
    #[serde(with = "hex_rgba")]
    pub foreground: Rgba<u8>,
    #[serde(with = "hex_rgba")]
    pub background: Rgba<u8>,
}

impl Default for ColorState {
    fn default() -> Self {
        Self {
            foreground: Rgba([0, 0, 0, 255]),
            background: Rgba([255, 255, 255, 255]),
        }
    }
}

impl ColorState {
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.foreground, &mut self.background);
    }

    /// Reset to the defaults: black over white.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Serde adapter storing an `Rgba<u8>` as a `#rrggbb` hex string, the form
/// the project file uses for every color attribute.
pub mod hex_rgba {
    use super::{parse_hex, to_hex};
    use image::Rgba;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Rgba<u8>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&to_hex(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Rgba<u8>, D::Error> {
        let s = String::deserialize(de)?;
        parse_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("bad hex color {:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_round_trip_primaries() {
        for &(r, g, b) in &[
            (255u8, 0u8, 0u8),
            (0, 255, 0),
            (0, 0, 255),
            (255, 255, 0),
            (128, 64, 200),
            (0, 0, 0),
            (255, 255, 255),
        ] {
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let (r2, g2, b2) = hsl_to_rgb(h, s, l);
            assert!(
                (r as i16 - r2 as i16).abs() <= 1
                    && (g as i16 - g2 as i16).abs() <= 1
                    && (b as i16 - b2 as i16).abs() <= 1,
                "({},{},{}) -> ({},{},{})",
                r, g, b, r2, g2, b2
            );
        }
    }

    #[test]
    fn grey_has_no_hue_or_saturation() {
        let (h, s, l) = rgb_to_hsl(100, 100, 100);
        assert_eq!(h, 0.0);
        assert_eq!(s, 0.0);
        assert!((l - 100.0 / 255.0).abs() < 1e-4);
    }

    #[test]
    fn hex_codec() {
        assert_eq!(parse_hex("#ff8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(parse_hex("ff8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(parse_hex("#ff80"), None);
        assert_eq!(parse_hex("#gg8000"), None);
        assert_eq!(to_hex(Rgba([255, 128, 0, 42])), "#ff8000");
    }

    #[test]
    fn color_state_swap() {
        let mut colors = ColorState::default();
        colors.swap();
        assert_eq!(colors.foreground, Rgba([255, 255, 255, 255]));
        assert_eq!(colors.background, Rgba([0, 0, 0, 255]));
    }
}
