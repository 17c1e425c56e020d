//! Blend-mode math.
//!
//! The separable modes apply a per-channel function on normalized [0, 1]
//! values; the component modes (hue/saturation/color/luminosity) route
//! through HSL. [`blend_pixel`] combines two pixels with a layer opacity:
//!
//! ```text
//! out_rgb   = lerp(base_rgb, f(base_rgb, blend_rgb), effective_alpha)
//! out_alpha = min(255, base_alpha + blend_alpha * opacity)
//! ```
//!
//! where `effective_alpha = (blend_alpha / 255) * opacity`. The alpha rule is
//! a deliberate approximation kept for behavioral fidelity: output alpha
//! never drops below the base alpha, which avoids the cost of full
//! Porter-Duff "over" composition. It is NOT standard alpha compositing.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::color::{hsl_to_rgb, rgb_to_hsl};

/// Layer blend modes, in the order UIs present them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendMode {
    #[default]
    Normal,
    // Darken group
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    // Lighten group
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    // Contrast group
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    // Inversion group
    Difference,
    Exclusion,
    Subtract,
    Divide,
    // Component group (HSL)
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// All blend modes, grouped order.
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Darken,
            BlendMode::Multiply,
            BlendMode::ColorBurn,
            BlendMode::LinearBurn,
            BlendMode::Lighten,
            BlendMode::Screen,
            BlendMode::ColorDodge,
            BlendMode::LinearDodge,
            BlendMode::Overlay,
            BlendMode::SoftLight,
            BlendMode::HardLight,
            BlendMode::VividLight,
            BlendMode::LinearLight,
            BlendMode::PinLight,
            BlendMode::HardMix,
            BlendMode::Difference,
            BlendMode::Exclusion,
            BlendMode::Subtract,
            BlendMode::Divide,
            BlendMode::Hue,
            BlendMode::Saturation,
            BlendMode::Color,
            BlendMode::Luminosity,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Darken => "Darken",
            BlendMode::Multiply => "Multiply",
            BlendMode::ColorBurn => "Color Burn",
            BlendMode::LinearBurn => "Linear Burn",
            BlendMode::Lighten => "Lighten",
            BlendMode::Screen => "Screen",
            BlendMode::ColorDodge => "Color Dodge",
            BlendMode::LinearDodge => "Linear Dodge (Add)",
            BlendMode::Overlay => "Overlay",
            BlendMode::SoftLight => "Soft Light",
            BlendMode::HardLight => "Hard Light",
            BlendMode::VividLight => "Vivid Light",
            BlendMode::LinearLight => "Linear Light",
            BlendMode::PinLight => "Pin Light",
            BlendMode::HardMix => "Hard Mix",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
            BlendMode::Subtract => "Subtract",
            BlendMode::Divide => "Divide",
            BlendMode::Hue => "Hue",
            BlendMode::Saturation => "Saturation",
            BlendMode::Color => "Color",
            BlendMode::Luminosity => "Luminosity",
        }
    }

    /// Mode groups in menu order, for UI consumption.
    pub fn groups() -> &'static [(&'static str, &'static [BlendMode])] {
        &[
            ("Normal", &[BlendMode::Normal]),
            (
                "Darken",
                &[
                    BlendMode::Darken,
                    BlendMode::Multiply,
                    BlendMode::ColorBurn,
                    BlendMode::LinearBurn,
                ],
            ),
            (
                "Lighten",
                &[
                    BlendMode::Lighten,
                    BlendMode::Screen,
                    BlendMode::ColorDodge,
                    BlendMode::LinearDodge,
                ],
            ),
            (
                "Contrast",
                &[
                    BlendMode::Overlay,
                    BlendMode::SoftLight,
                    BlendMode::HardLight,
                    BlendMode::VividLight,
                    BlendMode::LinearLight,
                    BlendMode::PinLight,
                    BlendMode::HardMix,
                ],
            ),
            (
                "Inversion",
                &[
                    BlendMode::Difference,
                    BlendMode::Exclusion,
                    BlendMode::Subtract,
                    BlendMode::Divide,
                ],
            ),
            (
                "Component",
                &[
                    BlendMode::Hue,
                    BlendMode::Saturation,
                    BlendMode::Color,
                    BlendMode::Luminosity,
                ],
            ),
        ]
    }

    /// True for the four HSL component modes.
    pub fn is_component(&self) -> bool {
        matches!(
            self,
            BlendMode::Hue | BlendMode::Saturation | BlendMode::Color | BlendMode::Luminosity
        )
    }
}

/// Apply a separable blend mode to one channel pair, both in [0, 1].
///
/// Division-by-zero boundaries return the documented limit value instead of
/// NaN/∞: colorBurn(·, 0) = 0, colorDodge(·, 1) = 1, divide(·, 0) = 1.
/// Component modes fall through to Normal here; callers route them to
/// [`blend_pixel`]'s HSL path.
pub fn blend_channel(mode: BlendMode, base: f32, blend: f32) -> f32 {
    match mode {
        BlendMode::Normal => blend,
        BlendMode::Darken => base.min(blend),
        BlendMode::Multiply => base * blend,
        BlendMode::ColorBurn => color_burn(base, blend),
        BlendMode::LinearBurn => (base + blend - 1.0).max(0.0),
        BlendMode::Lighten => base.max(blend),
        BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - blend),
        BlendMode::ColorDodge => color_dodge(base, blend),
        BlendMode::LinearDodge => (base + blend).min(1.0),
        BlendMode::Overlay => overlay(base, blend),
        BlendMode::SoftLight => soft_light(base, blend),
        BlendMode::HardLight => overlay(blend, base),
        BlendMode::VividLight => vivid_light(base, blend),
        BlendMode::LinearLight => (base + 2.0 * blend - 1.0).clamp(0.0, 1.0),
        BlendMode::PinLight => pin_light(base, blend),
        BlendMode::HardMix => {
            if base + blend >= 1.0 {
                1.0
            } else {
                0.0
            }
        }
        BlendMode::Difference => (base - blend).abs(),
        BlendMode::Exclusion => base + blend - 2.0 * base * blend,
        BlendMode::Subtract => (base - blend).max(0.0),
        BlendMode::Divide => divide(base, blend),
        // Component modes are not separable; treated as Normal per channel.
        BlendMode::Hue | BlendMode::Saturation | BlendMode::Color | BlendMode::Luminosity => blend,
    }
}

fn overlay(base: f32, blend: f32) -> f32 {
    if base < 0.5 {
        2.0 * base * blend
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - blend)
    }
}

fn color_burn(base: f32, blend: f32) -> f32 {
    if blend == 0.0 {
        0.0
    } else {
        (1.0 - (1.0 - base) / blend).max(0.0)
    }
}

fn color_dodge(base: f32, blend: f32) -> f32 {
    if blend >= 1.0 {
        1.0
    } else {
        (base / (1.0 - blend)).min(1.0)
    }
}

/// W3C Soft Light formula.
fn soft_light(base: f32, blend: f32) -> f32 {
    if blend < 0.5 {
        base - (1.0 - 2.0 * blend) * base * (1.0 - base)
    } else {
        let d = if base <= 0.25 {
            ((16.0 * base - 12.0) * base + 4.0) * base
        } else {
            base.sqrt()
        };
        base + (2.0 * blend - 1.0) * (d - base)
    }
}

fn vivid_light(base: f32, blend: f32) -> f32 {
    if blend < 0.5 {
        // Color Burn against 2*blend
        if blend == 0.0 {
            0.0
        } else {
            (1.0 - (1.0 - base) / (2.0 * blend)).max(0.0)
        }
    } else {
        // Color Dodge against 2*(blend - 0.5)
        if blend >= 1.0 {
            1.0
        } else {
            (base / (2.0 * (1.0 - blend))).min(1.0)
        }
    }
}

fn pin_light(base: f32, blend: f32) -> f32 {
    if blend < 0.5 {
        base.min(2.0 * blend)
    } else {
        base.max(2.0 * blend - 1.0)
    }
}

fn divide(base: f32, blend: f32) -> f32 {
    if blend == 0.0 {
        1.0
    } else {
        (base / blend).min(1.0)
    }
}

/// Combine a blend pixel over a base pixel with a layer opacity in [0, 1].
/// See the module docs for the exact (non-Porter-Duff) alpha rule.
pub fn blend_pixel(mode: BlendMode, base: Rgba<u8>, blend: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let opacity = opacity.clamp(0.0, 1.0);
    let effective_alpha = (blend[3] as f32 / 255.0) * opacity;

    // Fast path: nothing to contribute.
    if effective_alpha == 0.0 {
        return base;
    }

    let out_alpha = (base[3] as f32 + blend[3] as f32 * opacity).min(255.0).round() as u8;

    if mode.is_component() {
        let (bh, bs, bl) = rgb_to_hsl(base[0], base[1], base[2]);
        let (th, ts, tl) = rgb_to_hsl(blend[0], blend[1], blend[2]);
        let (h, s, l) = match mode {
            BlendMode::Hue => (th, bs, bl),
            BlendMode::Saturation => (bh, ts, bl),
            BlendMode::Color => (th, ts, bl),
            BlendMode::Luminosity => (bh, bs, tl),
            _ => unreachable!(),
        };
        let (r, g, b) = hsl_to_rgb(h, s, l);
        return Rgba([
            mix(base[0], r, effective_alpha),
            mix(base[1], g, effective_alpha),
            mix(base[2], b, effective_alpha),
            out_alpha,
        ]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let base_val = base[c] as f32 / 255.0;
        let blend_val = blend[c] as f32 / 255.0;
        let blended = blend_channel(mode, base_val, blend_val);
        let mixed = base_val * (1.0 - effective_alpha) + blended * effective_alpha;
        out[c] = (mixed * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = out_alpha;
    Rgba(out)
}

fn mix(base: u8, blended: u8, t: f32) -> u8 {
    (base as f32 * (1.0 - t) + blended as f32 * t).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn identity_spot_checks() {
        for x in [0.0f32, 0.25, 0.5, 0.75, 1.0] {
            assert!((blend_channel(BlendMode::Screen, x, 0.0) - x).abs() < EPS);
            assert!((blend_channel(BlendMode::Multiply, x, 1.0) - x).abs() < EPS);
            assert!((blend_channel(BlendMode::Darken, x, x) - x).abs() < EPS);
            assert!((blend_channel(BlendMode::Lighten, x, x) - x).abs() < EPS);
            assert!((blend_channel(BlendMode::LinearDodge, x, 0.0) - x).abs() < EPS);
            assert!((blend_channel(BlendMode::Subtract, x, 0.0) - x).abs() < EPS);
            assert!((blend_channel(BlendMode::Difference, x, 0.0) - x).abs() < EPS);
        }
        // overlay with mid-grey blend leaves black and white fixed
        assert!((blend_channel(BlendMode::Overlay, 0.0, 0.5)).abs() < EPS);
        assert!((blend_channel(BlendMode::Overlay, 1.0, 0.5) - 1.0).abs() < EPS);
    }

    #[test]
    fn division_guards_are_finite() {
        for x in [0.0f32, 0.3, 1.0] {
            assert_eq!(blend_channel(BlendMode::ColorBurn, x, 0.0), 0.0);
            assert_eq!(blend_channel(BlendMode::ColorDodge, x, 1.0), 1.0);
            assert_eq!(blend_channel(BlendMode::Divide, x, 0.0), 1.0);
            assert!(blend_channel(BlendMode::VividLight, x, 0.0).is_finite());
            assert!(blend_channel(BlendMode::VividLight, x, 1.0).is_finite());
        }
    }

    #[test]
    fn hard_mix_threshold() {
        assert_eq!(blend_channel(BlendMode::HardMix, 0.5, 0.5), 1.0);
        assert_eq!(blend_channel(BlendMode::HardMix, 0.49, 0.5), 0.0);
    }

    #[test]
    fn transparent_blend_pixel_is_identity() {
        let base = Rgba([10, 20, 30, 200]);
        let blend = Rgba([255, 0, 0, 0]);
        for &mode in BlendMode::all() {
            assert_eq!(blend_pixel(mode, base, blend, 1.0), base, "{:?}", mode);
        }
    }

    #[test]
    fn normal_full_opacity_replaces_rgb() {
        let base = Rgba([10, 20, 30, 100]);
        let blend = Rgba([200, 150, 50, 255]);
        let out = blend_pixel(BlendMode::Normal, base, blend, 1.0);
        assert_eq!([out[0], out[1], out[2]], [200, 150, 50]);
        assert_eq!(out[3], 255); // min(255, 100 + 255)
    }

    #[test]
    fn alpha_never_drops_below_base() {
        let base = Rgba([0, 0, 0, 180]);
        let blend = Rgba([255, 255, 255, 40]);
        let out = blend_pixel(BlendMode::Normal, base, blend, 0.5);
        assert!(out[3] >= 180);
        assert_eq!(out[3], 200); // 180 + 40*0.5
    }

    #[test]
    fn component_mode_mapping() {
        // Pure red base (h=0), pure green blend (h=1/3), both fully saturated.
        let base = Rgba([255, 0, 0, 255]);
        let blend = Rgba([0, 255, 0, 255]);

        // Hue takes H from blend, keeps base S/L: red becomes green.
        let hue = blend_pixel(BlendMode::Hue, base, blend, 1.0);
        assert_eq!([hue[0], hue[1], hue[2]], [0, 255, 0]);

        // Luminosity keeps base H/S, takes blend L (same 0.5 here): stays red.
        let lum = blend_pixel(BlendMode::Luminosity, base, blend, 1.0);
        assert_eq!([lum[0], lum[1], lum[2]], [255, 0, 0]);

        // Saturation of a grey blend desaturates the base.
        let grey = Rgba([128, 128, 128, 255]);
        let sat = blend_pixel(BlendMode::Saturation, base, grey, 1.0);
        assert_eq!(sat[0], sat[1]);
        assert_eq!(sat[1], sat[2]);
    }

    #[test]
    fn blend_mode_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&BlendMode::ColorBurn).unwrap(),
            "\"colorBurn\""
        );
        assert_eq!(
            serde_json::from_str::<BlendMode>("\"linearDodge\"").unwrap(),
            BlendMode::LinearDodge
        );
    }
}
