//! Harmony strategy arbitration driven by long-term syncopation.
//!
//! The strategy only changes on time: once it changes, a commitment timer must run out
//! before the next change. Samples keep flowing into the window while committed.

use super::window::{frames_for, RollingWindow};
use crate::color::HarmonyStrategy;
use crate::context::{sanitize_delta_ms, sanitize_unit};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy arbiter tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Syncopation window (seconds)
    pub buffer_secs: f32,
    /// Minimum time a strategy is held after a change (ms)
    pub commitment_ms: f64,
    /// Boundary between analogous and triadic
    pub low_threshold: f32,
    /// Boundary between triadic and complementary
    pub high_threshold: f32,
    /// Distance past a boundary required to leave the current zone
    pub hysteresis: f32,
    /// Value the window is seeded with
    pub seed_syncopation: f32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            buffer_secs: 15.0,
            commitment_ms: 30_000.0,
            low_threshold: 0.40,
            high_threshold: 0.65,
            hysteresis: 0.05,
            seed_syncopation: 0.3,
        }
    }
}

/// Output of one strategy update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyReading {
    /// Current strategy
    pub strategy: HarmonyStrategy,
    /// Strategy held before this frame
    pub previous: HarmonyStrategy,
    /// Strategy changed this frame
    pub changed: bool,
    /// Weighted rolling syncopation
    pub weighted_syncopation: f32,
}

/// Syncopation-zone classifier under a long commitment timer
#[derive(Debug, Clone)]
pub struct StrategyArbiter {
    config: StrategyConfig,
    window: RollingWindow<f32>,
    stable: HarmonyStrategy,
    commitment_remaining_ms: f64,
}

impl StrategyArbiter {
    /// Create an arbiter with a window sized for `frame_rate`
    pub fn new(config: StrategyConfig, frame_rate: f32) -> Self {
        let seed = sanitize_unit(config.seed_syncopation, 0.3);
        let window = RollingWindow::new(frames_for(config.buffer_secs, frame_rate), seed);
        let stable = Self::zone(&config, seed);
        Self {
            config,
            window,
            stable,
            commitment_remaining_ms: 0.0,
        }
    }

    fn zone(config: &StrategyConfig, value: f32) -> HarmonyStrategy {
        if value < config.low_threshold {
            HarmonyStrategy::Analogous
        } else if value <= config.high_threshold {
            HarmonyStrategy::Triadic
        } else {
            HarmonyStrategy::Complementary
        }
    }

    /// Zone for `value`, keeping `current` while inside its hysteresis-widened band
    pub fn classify(&self, value: f32, current: HarmonyStrategy) -> HarmonyStrategy {
        let h = self.config.hysteresis;
        let low = self.config.low_threshold;
        let high = self.config.high_threshold;
        let inside_current = match current {
            HarmonyStrategy::Analogous => value < low + h,
            HarmonyStrategy::Triadic => value >= low - h && value <= high + h,
            HarmonyStrategy::Complementary => value > high - h,
        };
        if inside_current {
            current
        } else {
            Self::zone(&self.config, value)
        }
    }

    /// Absorb one syncopation sample
    pub fn update(&mut self, syncopation: f32, delta_ms: f64) -> StrategyReading {
        let dt = sanitize_delta_ms(delta_ms);
        self.commitment_remaining_ms = (self.commitment_remaining_ms - dt).max(0.0);

        let sample = sanitize_unit(syncopation, self.config.seed_syncopation);
        self.window.push(sample);
        let weighted = self.window.weighted_mean();

        let previous = self.stable;
        let target = self.classify(weighted, self.stable);
        if target != self.stable && self.commitment_remaining_ms <= 0.0 {
            debug!(
                "Harmony strategy {:?} -> {:?} (syncopation {:.3})",
                self.stable, target, weighted
            );
            self.stable = target;
            self.commitment_remaining_ms = self.config.commitment_ms;
        }

        StrategyReading {
            strategy: self.stable,
            previous,
            changed: previous != self.stable,
            weighted_syncopation: weighted,
        }
    }

    /// Current strategy
    pub fn strategy(&self) -> HarmonyStrategy {
        self.stable
    }

    /// Remaining commitment time (ms)
    pub fn commitment_remaining_ms(&self) -> f64 {
        self.commitment_remaining_ms
    }

    /// Re-seed the window and clear the commitment
    pub fn reset(&mut self) {
        self.window.reset();
        let seed = sanitize_unit(self.config.seed_syncopation, 0.3);
        self.stable = Self::zone(&self.config, seed);
        self.commitment_remaining_ms = 0.0;
    }
}
