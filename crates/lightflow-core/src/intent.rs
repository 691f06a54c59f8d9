//! Lighting intent - the hardware-agnostic per-frame output

use crate::color::{ColorPalette, PaletteRole};
use crate::effects::{EffectCategory, EffectHandle};
use crate::movement::MovementIntent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixture group addressed by the intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Front wash, bass driven
    Front,
    /// Back wash, mid driven
    Back,
    /// Moving heads, high driven
    Movers,
    /// Room ambience
    Ambient,
}

impl Zone {
    /// All zones in output order
    pub const ALL: [Zone; 4] = [Zone::Front, Zone::Back, Zone::Movers, Zone::Ambient];
}

/// Intensity and color role of one zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneIntent {
    /// Zone intensity (0.0 - 1.0)
    pub intensity: f32,
    /// Palette color the zone uses
    pub palette_role: PaletteRole,
}

/// Beam optics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Optics {
    /// Beam angle, 0 = narrowest (0.0 - 1.0)
    pub zoom: f32,
    /// Focus (0.0 - 1.0)
    pub focus: f32,
    /// Iris opening (0.0 - 1.0)
    pub iris: f32,
}

impl Optics {
    /// Create optics settings
    pub const fn new(zoom: f32, focus: f32, iris: f32) -> Self {
        Self { zoom, focus, iris }
    }

    /// Copy with every field clamped to `[0, 1]`
    pub fn clamped(self) -> Self {
        use crate::context::sanitize_unit;
        Self {
            zoom: sanitize_unit(self.zoom, 0.5),
            focus: sanitize_unit(self.focus, 0.5),
            iris: sanitize_unit(self.iris, 1.0),
        }
    }
}

impl Default for Optics {
    fn default() -> Self {
        Self::new(0.5, 0.5, 1.0)
    }
}

/// Summary of one live effect instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffectSummary {
    /// Instance handle
    pub handle: EffectHandle,
    /// Registered effect type
    pub effect_type: String,
    /// Effect category
    pub category: EffectCategory,
    /// Priority used for color arbitration
    pub priority: u8,
    /// Shield applied intensity/rate caps
    pub degraded: bool,
}

/// Complete lighting decision for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingIntent {
    /// Four-color palette
    pub palette: ColorPalette,
    /// Master intensity (0.0 - 1.0)
    pub master_intensity: f32,
    /// Per-zone intensity and color role
    pub zones: BTreeMap<Zone, ZoneIntent>,
    /// Moving-head trajectory sample
    pub movement: MovementIntent,
    /// Live effect instances
    pub effects: Vec<ActiveEffectSummary>,
    /// Beam optics
    pub optics: Optics,
    /// Strobe rate in Hz, `None` when not strobing
    pub strobe_rate: Option<f32>,
    /// White channel level, if an effect drives it
    pub white: Option<f32>,
    /// Amber channel level, if an effect drives it
    pub amber: Option<f32>,
    /// Engine clock (ms)
    pub timestamp_ms: f64,
}

impl LightingIntent {
    /// Intensity of a zone, 0 when absent
    pub fn zone_intensity(&self, zone: Zone) -> f32 {
        self.zones.get(&zone).map(|z| z.intensity).unwrap_or(0.0)
    }

    /// Whether every numeric field is finite
    pub fn is_finite(&self) -> bool {
        let opt_finite = |v: Option<f32>| v.map_or(true, f32::is_finite);
        self.palette.colors().iter().all(|c| c.is_finite())
            && self.master_intensity.is_finite()
            && self.zones.values().all(|z| z.intensity.is_finite())
            && self.movement.is_finite()
            && self.optics.zoom.is_finite()
            && self.optics.focus.is_finite()
            && self.optics.iris.is_finite()
            && opt_finite(self.strobe_rate)
            && opt_finite(self.white)
            && opt_finite(self.amber)
            && self.timestamp_ms.is_finite()
    }
}
