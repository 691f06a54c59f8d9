//! Velocity governor ("Gearbox").
//!
//! Budget and request are both expressed in DMX units per pattern cycle:
//!
//! - budget = min(hardware speed, profile max velocity) x seconds per beat x period
//! - request = travel per cycle x amplitude x 127.5
//!
//! When the request exceeds the budget the amplitude is scaled down by their ratio.

use super::patterns::PatternSpec;
use super::MovementConfig;
use crate::constitution::MovementProfile;
use crate::context::sanitize_unit;

/// DMX units per normalized unit of travel (half of the 0-255 range)
pub const DMX_UNITS_PER_NORMALIZED: f32 = 127.5;

/// Result of governing one pattern cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Governed {
    /// Amplitude after reduction (0.0 - 1.0)
    pub amplitude: f32,
    /// Scale factor applied to the requested amplitude (0.0 - 1.0)
    pub reduction: f32,
    /// Normalized motor speed (0.0 - 1.0)
    pub speed: f32,
    /// Travel the hardware can cover in one cycle (DMX units)
    pub budget: f32,
    /// Travel the pattern asked for (DMX units)
    pub requested: f32,
}

/// Tempo validation and velocity budgeting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gearbox {
    hardware_max_speed: f32,
    fallback_bpm: f32,
    min_bpm: f32,
    max_bpm: f32,
}

impl Default for Gearbox {
    fn default() -> Self {
        Self::new(&MovementConfig::default())
    }
}

impl Gearbox {
    /// Create a gearbox from movement tuning
    pub fn new(config: &MovementConfig) -> Self {
        let defaults = (
            super::DEFAULT_HARDWARE_MAX_SPEED,
            super::FALLBACK_BPM,
            super::MIN_BPM,
            super::MAX_BPM,
        );
        let positive = |v: f32, fallback: f32| if v.is_finite() && v > 0.0 { v } else { fallback };
        let min_bpm = positive(config.min_bpm, defaults.2);
        let max_bpm = positive(config.max_bpm, defaults.3).max(min_bpm);
        Self {
            hardware_max_speed: positive(config.hardware_max_speed, defaults.0),
            fallback_bpm: positive(config.fallback_bpm, defaults.1).clamp(min_bpm, max_bpm),
            min_bpm,
            max_bpm,
        }
    }

    /// Hardware speed ceiling (DMX units per second)
    pub fn hardware_max_speed(&self) -> f32 {
        self.hardware_max_speed
    }

    /// Whether a raw BPM can drive the clock at all
    pub fn is_valid_bpm(bpm: f32) -> bool {
        bpm.is_finite() && bpm > 0.0
    }

    /// Tempo actually planned for: fallback when invalid, otherwise clamped
    pub fn effective_bpm(&self, bpm: f32) -> f32 {
        if Self::is_valid_bpm(bpm) {
            bpm.clamp(self.min_bpm, self.max_bpm)
        } else {
            self.fallback_bpm
        }
    }

    /// Seconds per beat, validated before dividing
    pub fn seconds_per_beat(&self, bpm: f32) -> f32 {
        60.0 / self.effective_bpm(bpm)
    }

    /// Whether a beat duration is usable for planning
    pub fn is_valid_beat_duration(&self, seconds_per_beat: f32) -> bool {
        seconds_per_beat.is_finite()
            && seconds_per_beat >= 60.0 / self.max_bpm
            && seconds_per_beat <= 60.0 / self.min_bpm
    }

    /// Travel budget in DMX units for one cycle of `period_beats`
    pub fn budget(&self, seconds_per_beat: f32, period_beats: f32, profile_max_velocity: f32) -> f32 {
        self.effective_velocity(profile_max_velocity) * seconds_per_beat * period_beats
    }

    fn effective_velocity(&self, profile_max_velocity: f32) -> f32 {
        if profile_max_velocity.is_finite() && profile_max_velocity > 0.0 {
            profile_max_velocity.min(self.hardware_max_speed)
        } else {
            self.hardware_max_speed
        }
    }

    /// Scale a pattern's amplitude so one cycle stays within the budget
    pub fn govern(
        &self,
        spec: &PatternSpec,
        profile: &MovementProfile,
        energy: f32,
        seconds_per_beat: f32,
    ) -> Governed {
        let energy = sanitize_unit(energy, 0.5);
        let scale = if profile.amplitude_scale.is_finite() {
            profile.amplitude_scale.max(0.0)
        } else {
            1.0
        };
        let boost = if profile.energy_boost.is_finite() {
            profile.energy_boost.max(0.0)
        } else {
            0.0
        };
        let amplitude = spec.base_amplitude * scale * (1.0 + boost * energy);

        let budget = self.budget(seconds_per_beat, spec.period_beats, profile.physics.max_velocity);
        let requested = spec.travel_per_cycle * amplitude * DMX_UNITS_PER_NORMALIZED;
        let reduction = if requested > budget && requested > 0.0 {
            (budget / requested).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let velocity = self.effective_velocity(profile.physics.max_velocity);
        Governed {
            amplitude: (amplitude * reduction).clamp(0.0, 1.0),
            reduction,
            speed: ((velocity / self.hardware_max_speed).min(1.0) * reduction).clamp(0.0, 1.0),
            budget,
            requested,
        }
    }
}
