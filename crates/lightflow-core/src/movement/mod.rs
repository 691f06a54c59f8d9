//! Movement - tempo-synchronized trajectories for moving heads
//!
//! The choreographer owns a beat clock, picks a pattern per musical phrase and hands
//! the pattern's requested travel to the [`Gearbox`], which scales amplitude down so a
//! cycle never asks the motors for more than the hardware velocity budget.

pub mod choreographer;
pub mod governor;
pub mod patterns;

pub use choreographer::{Choreographer, MovementInput};
pub use governor::{Gearbox, Governed, DMX_UNITS_PER_NORMALIZED};
pub use patterns::PatternSpec;

use crate::constitution::MovementPhysics;
use serde::{Deserialize, Serialize};

/// Hardware pan/tilt speed ceiling (DMX units per second)
pub const DEFAULT_HARDWARE_MAX_SPEED: f32 = 250.0;
/// Tempo assumed when the BPM is unusable
pub const FALLBACK_BPM: f32 = 120.0;
/// Slowest tempo the gearbox plans for
pub const MIN_BPM: f32 = 40.0;
/// Fastest tempo the gearbox plans for
pub const MAX_BPM: f32 = 240.0;

/// How per-fixture offsets are applied downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    /// Offsets already baked into the pattern
    Linear,
    /// Offsets applied as phase rotation around the center
    Polar,
}

/// Movement tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Hardware pan/tilt speed ceiling (DMX units per second)
    pub hardware_max_speed: f32,
    /// Tempo used when the BPM is non-positive or non-finite
    pub fallback_bpm: f32,
    /// Lower tempo clamp
    pub min_bpm: f32,
    /// Upper tempo clamp
    pub max_bpm: f32,
    /// Window of the adaptive calm floor (seconds)
    pub calm_window_secs: f32,
    /// Calm floor = ratio x rolling mean energy
    pub calm_floor_ratio: f32,
    /// Lower clamp of the calm floor
    pub calm_floor_min: f32,
    /// Upper clamp of the calm floor
    pub calm_floor_max: f32,
    /// Fixture the intent is sampled for
    pub fixture_index: usize,
    /// Fixtures in the group
    pub fixture_count: usize,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            hardware_max_speed: DEFAULT_HARDWARE_MAX_SPEED,
            fallback_bpm: FALLBACK_BPM,
            min_bpm: MIN_BPM,
            max_bpm: MAX_BPM,
            calm_window_secs: 4.0,
            calm_floor_ratio: 0.6,
            calm_floor_min: 0.12,
            calm_floor_max: 0.35,
            fixture_index: 0,
            fixture_count: 1,
        }
    }
}

/// Trajectory sample for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementIntent {
    /// Pattern id
    pub pattern: String,
    /// Horizontal offset (-1.0 - 1.0)
    pub x: f32,
    /// Vertical offset (-1.0 - 1.0)
    pub y: f32,
    /// Motor speed (0.0 - 1.0)
    pub speed: f32,
    /// Governed amplitude (0.0 - 1.0)
    pub amplitude: f32,
    /// Pattern center, horizontal (0.0 - 1.0)
    pub center_x: f32,
    /// Pattern center, vertical (0.0 - 1.0)
    pub center_y: f32,
    /// Trajectory is locked to the beat clock
    pub beat_sync: bool,
    /// How per-fixture offsets are applied
    pub phase_type: PhaseType,
    /// Motor physics preset
    pub physics: MovementPhysics,
}

impl MovementIntent {
    /// Centered, motionless intent used when timing is unusable
    pub fn emergency_brake(physics: MovementPhysics) -> Self {
        Self {
            pattern: "brake".to_string(),
            x: 0.0,
            y: 0.0,
            speed: 0.0,
            amplitude: 0.0,
            center_x: 0.5,
            center_y: 0.5,
            beat_sync: false,
            phase_type: PhaseType::Polar,
            physics,
        }
    }

    /// Whether every numeric field is finite
    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.speed,
            self.amplitude,
            self.center_x,
            self.center_y,
            self.physics.acceleration,
            self.physics.max_velocity,
            self.physics.friction,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
