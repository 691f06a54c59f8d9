//! HSL color primitives and the four-role palette.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Normalize a hue into `[0, 360)`. Non-finite hues become 0.
pub fn normalize_hue(hue: f32) -> f32 {
    if !hue.is_finite() {
        return 0.0;
    }
    let wrapped = hue.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped + 0.0
    }
}

/// Signed shortest angular distance from `from` to `to`, in `(-180, 180]`
pub fn shortest_delta(from: f32, to: f32) -> f32 {
    let diff = normalize_hue(to) - normalize_hue(from);
    if diff > 180.0 {
        diff - 360.0
    } else if diff <= -180.0 {
        diff + 360.0
    } else {
        diff
    }
}

/// A color in hue/saturation/lightness space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    /// Hue in degrees, `[0, 360)`
    pub h: f32,
    /// Saturation, `[0, 1]`
    pub s: f32,
    /// Lightness, `[0, 1]`
    pub l: f32,
}

impl Hsl {
    /// Create a color, normalizing the hue and clamping S/L
    pub fn new(h: f32, s: f32, l: f32) -> Self {
        Self {
            h: normalize_hue(h),
            s: crate::context::sanitize_unit(s, 0.0),
            l: crate::context::sanitize_unit(l, 0.0),
        }
    }

    /// Pure red
    pub fn red() -> Self {
        Self::new(0.0, 1.0, 0.5)
    }

    /// Pure white
    pub fn white() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// Copy with the hue rotated by `degrees`
    pub fn rotated(self, degrees: f32) -> Self {
        Self::new(self.h + degrees, self.s, self.l)
    }

    /// Total order over (h, s, l), used to break priority ties deterministically
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.h
            .total_cmp(&other.h)
            .then(self.s.total_cmp(&other.s))
            .then(self.l.total_cmp(&other.l))
    }

    /// Convert to 8-bit RGB
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        let c = (1.0 - (2.0 * self.l - 1.0).abs()) * self.s;
        let hp = self.h / 60.0;
        let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = self.l - c / 2.0;
        let to_u8 = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        (to_u8(r1), to_u8(g1), to_u8(b1))
    }

    /// Whether every component is finite
    pub fn is_finite(&self) -> bool {
        self.h.is_finite() && self.s.is_finite() && self.l.is_finite()
    }
}

impl Default for Hsl {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.5)
    }
}

/// Harmony strategy used to derive secondary colors from the primary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonyStrategy {
    /// Neighbouring hues
    #[default]
    Analogous,
    /// Three evenly spaced hues
    Triadic,
    /// Opposite hues
    Complementary,
}

impl HarmonyStrategy {
    /// Hue offsets from the primary for (secondary, accent, ambient)
    pub fn offsets(self) -> (f32, f32, f32) {
        match self {
            HarmonyStrategy::Analogous => (30.0, -30.0, 15.0),
            HarmonyStrategy::Triadic => (120.0, 240.0, 60.0),
            HarmonyStrategy::Complementary => (180.0, 150.0, 210.0),
        }
    }
}

/// Palette slot referenced by zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteRole {
    /// Main color
    Primary,
    /// Supporting color
    Secondary,
    /// Highlight color
    Accent,
    /// Background wash
    Ambient,
}

/// Four-color palette for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    /// Main color
    pub primary: Hsl,
    /// Supporting color
    pub secondary: Hsl,
    /// Highlight color
    pub accent: Hsl,
    /// Background wash
    pub ambient: Hsl,
    /// Strategy the palette was derived with
    pub strategy: HarmonyStrategy,
}

impl ColorPalette {
    /// Color for a palette role
    pub fn role(&self, role: PaletteRole) -> Hsl {
        match role {
            PaletteRole::Primary => self.primary,
            PaletteRole::Secondary => self.secondary,
            PaletteRole::Accent => self.accent,
            PaletteRole::Ambient => self.ambient,
        }
    }

    /// All four colors in role order
    pub fn colors(&self) -> [Hsl; 4] {
        [self.primary, self.secondary, self.accent, self.ambient]
    }
}
