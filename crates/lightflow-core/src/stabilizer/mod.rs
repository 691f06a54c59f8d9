//! Stabilizers - anti-flicker smoothing of noisy per-frame musical signals
//!
//! Raw key, mood and syncopation detection is too noisy per frame to drive strobe-capable
//! hardware. Each stabilizer owns a multi-second rolling window plus a lock timer:
//!
//! - **EnergyStabilizer**: ~2 s rolling mean, relative drop/breakdown detection
//! - **KeyStabilizer**: ~12 s weighted key vote, ~10 s lock, hysteresis margin
//! - **MoodArbiter**: ~10 s bright/dark/neutral vote, ~5 s lock, thermal temperature
//! - **StrategyArbiter**: ~15 s weighted syncopation, hysteresis bands, ~30 s commitment
//!
//! Stabilizers are updated in that order each frame: key weighting reads smoothed energy,
//! mood reads the stable key.

pub mod energy;
pub mod key;
pub mod mood;
pub mod strategy;
pub mod window;

pub use energy::{EnergyConfig, EnergyReading, EnergyStabilizer};
pub use key::{KeyConfig, KeyInput, KeyReading, KeyStabilizer, PitchClass};
pub use mood::{Emotion, MoodArbiter, MoodConfig, MoodInput, MoodReading};
pub use strategy::{StrategyArbiter, StrategyConfig, StrategyReading};
pub use window::RollingWindow;

use crate::color::HarmonyStrategy;
use crate::context::NEUTRAL_ENERGY;
use serde::{Deserialize, Serialize};

/// Snapshot of every stabilized signal for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilizedState {
    /// Locked key, `None` until one is elected
    pub stable_key: Option<PitchClass>,
    /// Locked emotion
    pub stable_emotion: Emotion,
    /// Committed harmony strategy
    pub stable_strategy: HarmonyStrategy,
    /// Instantaneous energy
    pub raw_energy: f32,
    /// Rolling mean energy
    pub smoothed_energy: f32,
    /// A drop is in progress
    pub is_drop_active: bool,
    /// A breakdown is in progress
    pub is_breakdown: bool,
    /// 0 = cold, 1 = warm
    pub thermal_temperature: f32,
}

impl Default for StabilizedState {
    fn default() -> Self {
        Self {
            stable_key: None,
            stable_emotion: Emotion::Neutral,
            stable_strategy: HarmonyStrategy::Analogous,
            raw_energy: NEUTRAL_ENERGY,
            smoothed_energy: NEUTRAL_ENERGY,
            is_drop_active: false,
            is_breakdown: false,
            thermal_temperature: 0.5,
        }
    }
}
