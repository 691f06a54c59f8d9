//! Constitutions - per-profile constraint tables
//!
//! A constitution governs everything a profile may express: which hues are forbidden and
//! how to escape them, saturation/lightness/dimming bounds, the atmospheric color bias,
//! strobe policy, permitted effect categories, movement presets and optics defaults.

mod presets;
mod registry;

pub use registry::{ConstitutionRegistry, ProfileFile};

use crate::color::{normalize_hue, shortest_delta};
use crate::effects::EffectCategory;
use crate::intent::Optics;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Color temperature at or below which the atmosphere pulls toward the warm pole (K)
pub const WARM_TEMPERATURE_K: f32 = 5000.0;
/// Color temperature at or above which the atmosphere pulls toward the cold pole (K)
pub const COLD_TEMPERATURE_K: f32 = 7000.0;
/// Hue of the warm pole
pub const WARM_POLE_HUE: f32 = 35.0;
/// Hue of the cold pole
pub const COLD_POLE_HUE: f32 = 215.0;

/// Inclusive hue interval; wraps through 0 when `start > end`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueRange {
    /// First hue in the range
    pub start: f32,
    /// Last hue in the range
    pub end: f32,
}

impl HueRange {
    /// Create a range from normalized endpoints
    pub fn new(start: f32, end: f32) -> Self {
        Self {
            start: normalize_hue(start),
            end: normalize_hue(end),
        }
    }

    /// Whether the (normalized) hue lies inside
    pub fn contains(&self, hue: f32) -> bool {
        let hue = normalize_hue(hue);
        if self.start <= self.end {
            hue >= self.start && hue <= self.end
        } else {
            hue >= self.start || hue <= self.end
        }
    }
}

/// Hard remap of a forbidden region onto a single hue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueRemap {
    /// Region that triggers the rule
    pub from: HueRange,
    /// Replacement hue
    pub to: f32,
}

/// Closed `[min, max]` interval within `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
}

impl Bounds {
    /// Create bounds
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp a value into the bounds; non-finite values map to `min`
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.min
        }
    }

    /// Interpolate from `min` to `max`; `t` is clamped to `[0, 1]`
    pub fn lerp(&self, t: f32) -> f32 {
        let t = crate::context::sanitize_unit(t, 0.0);
        self.clamp(self.min + (self.max - self.min) * t)
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min >= 0.0
            && self.max <= 1.0
            && self.min <= self.max
    }
}

/// Whether and how strobing is permitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrobePolicy {
    /// No strobe-based effects
    Forbidden,
    /// Strobe allowed, capped at `max_strobe_rate`
    Limited,
    /// Strobe unrestricted
    Free,
}

/// How the accent color is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccentBehavior {
    /// Accent hue from the harmony strategy offset
    Hue,
    /// Primary hue at maximum lightness
    Brighten,
    /// Primary hue, minimum saturation, maximum lightness
    White,
}

/// Pole the atmosphere pulls hues toward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmosphericPole {
    /// Orange/amber
    Warm,
    /// Blue
    Cold,
}

impl AtmosphericPole {
    /// Target hue of the pole
    pub fn hue(self) -> f32 {
        match self {
            AtmosphericPole::Warm => WARM_POLE_HUE,
            AtmosphericPole::Cold => COLD_POLE_HUE,
        }
    }
}

/// Motor physics preset handed to the hardware layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementPhysics {
    /// Normalized acceleration (0.0 - 1.0)
    pub acceleration: f32,
    /// Velocity cap (DMX units per second)
    pub max_velocity: f32,
    /// Normalized friction / damping (0.0 - 1.0)
    pub friction: f32,
}

/// Movement preset of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementProfile {
    /// Pattern rotation, one per musical phrase
    pub patterns: Vec<String>,
    /// Pattern used when energy falls below the adaptive floor
    pub calm_pattern: String,
    /// Amplitude multiplier
    pub amplitude_scale: f32,
    /// Extra amplitude at full energy
    pub energy_boost: f32,
    /// Motor physics preset
    pub physics: MovementPhysics,
}

/// Constraint record of one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constitution {
    /// Profile id, e.g. "techno-club"
    pub id: String,
    /// Display name
    pub name: String,
    /// Hues the palette must never contain
    pub forbidden_ranges: Vec<HueRange>,
    /// If non-empty, hues outside these ranges snap to the nearest edge
    pub allowed_ranges: Vec<HueRange>,
    /// Hard remap rules tried before elastic rotation
    pub remap_rules: Vec<HueRemap>,
    /// Rotation step used to escape forbidden ranges (degrees)
    pub elastic_rotation_step: f32,
    /// Saturation bounds
    pub saturation: Bounds,
    /// Lightness bounds
    pub lightness: Bounds,
    /// Atmospheric color temperature (K)
    pub atmospheric_temperature_k: f32,
    /// How strongly hues are pulled toward the atmospheric pole (0.0 - 1.0)
    pub gravity_strength: f32,
    /// Strobe policy
    pub strobe_policy: StrobePolicy,
    /// Accent derivation
    pub accent_behavior: AccentBehavior,
    /// Ambient = secondary + 180
    pub mirror_ambient: bool,
    /// Master intensity floor/ceiling
    pub dimming: Bounds,
    /// Effect categories this profile permits
    pub allowed_effects: Vec<EffectCategory>,
    /// Whether dynamic (fast, attention-grabbing) effects are permitted
    pub allow_dynamic_effects: bool,
    /// Strobe rate cap (Hz)
    pub max_strobe_rate: f32,
    /// Effect intensity cap (0.0 - 1.0)
    pub max_effect_intensity: f32,
    /// Effect type fired when a drop starts
    pub drop_effect: Option<String>,
    /// Movement preset
    pub movement: MovementProfile,
    /// Optics defaults
    pub optics: Optics,
}

impl Default for Constitution {
    fn default() -> Self {
        presets::default_profile()
    }
}

impl Constitution {
    /// Whether the hue falls inside any forbidden range
    pub fn is_forbidden(&self, hue: f32) -> bool {
        self.forbidden_ranges.iter().any(|r| r.contains(hue))
    }

    /// Whether the hue is inside the allowed ranges (always true when none are set)
    pub fn is_allowed(&self, hue: f32) -> bool {
        self.allowed_ranges.is_empty() || self.allowed_ranges.iter().any(|r| r.contains(hue))
    }

    fn snap_to_allowed(&self, hue: f32) -> f32 {
        if self.is_allowed(hue) {
            return hue;
        }
        let mut best = hue;
        let mut best_distance = f32::INFINITY;
        for range in &self.allowed_ranges {
            for edge in [range.start, range.end] {
                let distance = shortest_delta(hue, edge).abs();
                if distance < best_distance {
                    best_distance = distance;
                    best = edge;
                }
            }
        }
        best
    }

    /// Move a hue out of forbidden territory.
    ///
    /// Remap rules are tried first, then elastic rotation in fixed steps; if neither
    /// escapes, the pre-rotation hue is returned.
    pub fn constrain_hue(&self, hue: f32) -> f32 {
        let hue = self.snap_to_allowed(normalize_hue(hue));
        if !self.is_forbidden(hue) {
            return hue;
        }

        for rule in &self.remap_rules {
            if rule.from.contains(hue) {
                let target = normalize_hue(rule.to);
                if !self.is_forbidden(target) {
                    return target;
                }
            }
        }

        let step = self.elastic_rotation_step;
        if step.is_finite() && step > 0.0 {
            let iterations = (360.0 / step).ceil() as usize;
            let mut candidate = hue;
            for _ in 0..iterations {
                candidate = normalize_hue(candidate + step);
                if !self.is_forbidden(candidate) && self.is_allowed(candidate) {
                    return candidate;
                }
            }
        }

        hue
    }

    /// Clamp saturation into the profile bounds
    pub fn clamp_saturation(&self, s: f32) -> f32 {
        self.saturation.clamp(s)
    }

    /// Clamp lightness into the profile bounds
    pub fn clamp_lightness(&self, l: f32) -> f32 {
        self.lightness.clamp(l)
    }

    /// Atmospheric pole implied by the color temperature, if any
    pub fn atmospheric_pole(&self) -> Option<AtmosphericPole> {
        let k = self.atmospheric_temperature_k;
        if !k.is_finite() {
            None
        } else if k <= WARM_TEMPERATURE_K {
            Some(AtmosphericPole::Warm)
        } else if k >= COLD_TEMPERATURE_K {
            Some(AtmosphericPole::Cold)
        } else {
            None
        }
    }

    /// Whether the category appears in the allowed effect list
    pub fn allows_category(&self, category: EffectCategory) -> bool {
        self.allowed_effects.contains(&category)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(CoreError::InvalidConstitution {
                id: self.id.clone(),
                reason: reason.to_string(),
            })
        };

        if self.id.trim().is_empty() {
            return fail("empty id");
        }
        if !self.saturation.is_valid() {
            return fail("saturation bounds out of order or outside [0, 1]");
        }
        if !self.lightness.is_valid() {
            return fail("lightness bounds out of order or outside [0, 1]");
        }
        if !self.dimming.is_valid() {
            return fail("dimming bounds out of order or outside [0, 1]");
        }
        if !(self.elastic_rotation_step.is_finite()
            && self.elastic_rotation_step > 0.0
            && self.elastic_rotation_step < 360.0)
        {
            return fail("elastic rotation step must be in (0, 360)");
        }
        if !(0.0..=1.0).contains(&self.gravity_strength) {
            return fail("gravity strength must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.max_effect_intensity) {
            return fail("max effect intensity must be in [0, 1]");
        }
        if !(self.max_strobe_rate.is_finite() && self.max_strobe_rate >= 0.0) {
            return fail("max strobe rate must be non-negative");
        }
        for rule in &self.remap_rules {
            if self.is_forbidden(rule.to) {
                return fail("remap target lies in a forbidden range");
            }
            if !self.is_allowed(rule.to) {
                return fail("remap target lies outside the allowed ranges");
            }
        }
        if self.movement.patterns.is_empty() {
            return fail("movement pattern list is empty");
        }
        let known = |id: &String| crate::movement::patterns::get(id).is_some();
        if !self.movement.patterns.iter().all(known) || !known(&self.movement.calm_pattern) {
            return fail("unknown movement pattern");
        }
        if !(self.movement.physics.max_velocity.is_finite()
            && self.movement.physics.max_velocity > 0.0)
        {
            return fail("movement max velocity must be positive");
        }
        // At least one hue must survive the rules
        let step = self.elastic_rotation_step;
        let escapable = (0..(360.0 / step).ceil() as usize)
            .map(|i| normalize_hue(i as f32 * step))
            .any(|h| !self.is_forbidden(h) && self.is_allowed(h));
        if !escapable {
            return fail("forbidden ranges cover every reachable hue");
        }
        Ok(())
    }
}
