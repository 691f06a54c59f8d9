//! Procedural palette generation under a constitution.
//!
//! Stabilized musical state goes in, a four-role palette comes out:
//!
//! 1. key -> base hue on the circle of fifths (30 degrees per step)
//! 2. mood shifts the hue (bright +15, dark -20)
//! 3. thermal gravity pulls toward the constitution's atmospheric pole
//! 4. forbidden ranges are escaped (remap, then elastic rotation)
//! 5. smoothed energy drives saturation and lightness, never hue
//! 6. derived roles come from the harmony strategy offsets

use crate::color::{normalize_hue, shortest_delta, ColorPalette, Hsl};
use crate::constitution::{AccentBehavior, AtmosphericPole, Constitution};
use crate::context::sanitize_unit;
use crate::stabilizer::{Emotion, PitchClass, StabilizedState};

/// Base hue used while no key is stable
pub const NO_KEY_HUE: f32 = 210.0;

/// Degrees per step on the circle of fifths
pub const FIFTHS_STEP_DEGREES: f32 = 30.0;

/// Hue shift for a bright mood
pub const BRIGHT_HUE_SHIFT: f32 = 15.0;

/// Hue shift for a dark mood
pub const DARK_HUE_SHIFT: f32 = -20.0;

/// Stateless palette generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorEngine;

impl ColorEngine {
    /// Base hue for a key
    pub fn key_hue(key: Option<PitchClass>) -> f32 {
        match key {
            Some(pc) => pc.fifths_position() as f32 * FIFTHS_STEP_DEGREES,
            None => NO_KEY_HUE,
        }
    }

    /// Hue shift for an emotion
    pub fn mood_shift(emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Bright => BRIGHT_HUE_SHIFT,
            Emotion::Dark => DARK_HUE_SHIFT,
            Emotion::Neutral => 0.0,
        }
    }

    /// Pull `hue` toward the constitution's atmospheric pole along the shortest arc
    pub fn apply_gravity(hue: f32, thermal_temperature: f32, constitution: &Constitution) -> f32 {
        let Some(pole) = constitution.atmospheric_pole() else {
            return normalize_hue(hue);
        };
        let thermal = sanitize_unit(thermal_temperature, 0.5);
        let affinity = match pole {
            AtmosphericPole::Warm => thermal,
            AtmosphericPole::Cold => 1.0 - thermal,
        };
        let strength = sanitize_unit(constitution.gravity_strength, 0.0);
        let pull = strength * (0.5 + 0.5 * affinity);
        normalize_hue(hue + shortest_delta(hue, pole.hue()) * pull)
    }

    /// Primary hue before constitution constraints
    pub fn raw_primary_hue(state: &StabilizedState, constitution: &Constitution) -> f32 {
        let hue = Self::key_hue(state.stable_key) + Self::mood_shift(state.stable_emotion);
        Self::apply_gravity(normalize_hue(hue), state.thermal_temperature, constitution)
    }

    fn color(constitution: &Constitution, hue: f32, s: f32, l: f32) -> Hsl {
        Hsl::new(
            constitution.constrain_hue(hue),
            constitution.clamp_saturation(s),
            constitution.clamp_lightness(l),
        )
    }

    /// Generate the palette for one frame
    pub fn generate(state: &StabilizedState, constitution: &Constitution) -> ColorPalette {
        let energy = sanitize_unit(state.smoothed_energy, 0.5);
        let sat = constitution.saturation;
        let light = constitution.lightness;

        let primary_hue = constitution.constrain_hue(Self::raw_primary_hue(state, constitution));
        let primary = Self::color(constitution, primary_hue, sat.lerp(energy), light.lerp(energy));

        let (secondary_offset, accent_offset, ambient_offset) = state.stable_strategy.offsets();

        let secondary = Self::color(
            constitution,
            primary_hue + secondary_offset,
            sat.lerp(energy),
            light.lerp(energy),
        );

        let accent = match constitution.accent_behavior {
            AccentBehavior::Hue => Self::color(
                constitution,
                primary_hue + accent_offset,
                sat.lerp(energy),
                light.lerp(energy + 0.25),
            ),
            AccentBehavior::Brighten => Self::color(constitution, primary_hue, primary.s, light.max),
            AccentBehavior::White => Self::color(constitution, primary_hue, sat.min, light.max),
        };

        let ambient_hue = if constitution.mirror_ambient {
            secondary.h + 180.0
        } else {
            primary_hue + ambient_offset
        };
        let ambient = Self::color(
            constitution,
            ambient_hue,
            sat.lerp(energy * 0.5),
            light.lerp(energy * 0.5),
        );

        ColorPalette {
            primary,
            secondary,
            accent,
            ambient,
            strategy: state.stable_strategy,
        }
    }
}
