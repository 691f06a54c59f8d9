//! Energy smoothing plus drop and breakdown detection.

use super::window::{frames_for, RollingWindow};
use crate::context::{sanitize_delta_ms, sanitize_unit, NEUTRAL_ENERGY};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Energy stabilizer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Smoothing window (seconds)
    pub window_secs: f32,
    /// Baseline window used by the drop detector (seconds)
    pub baseline_secs: f32,
    /// How far above the baseline raw energy must jump to start a drop
    pub drop_delta: f32,
    /// Absolute minimum raw energy for a drop
    pub drop_floor: f32,
    /// Raw energy below which an active drop may end
    pub drop_exit: f32,
    /// Minimum drop duration (ms)
    pub drop_min_ms: f64,
    /// Quiet period after a drop ends (ms)
    pub drop_cooldown_ms: f64,
    /// How far below the baseline raw energy must fall to flag a breakdown
    pub breakdown_delta: f32,
    /// Baseline required before a breakdown can be flagged
    pub breakdown_min_baseline: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            window_secs: 2.0,
            baseline_secs: 8.0,
            drop_delta: 0.25,
            drop_floor: 0.6,
            drop_exit: 0.45,
            drop_min_ms: 2000.0,
            drop_cooldown_ms: 1500.0,
            breakdown_delta: 0.25,
            breakdown_min_baseline: 0.3,
        }
    }
}

/// Output of one energy update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyReading {
    /// Sanitized instantaneous energy
    pub raw_energy: f32,
    /// Rolling mean over the smoothing window
    pub smoothed_energy: f32,
    /// Long-window baseline the frame was compared against
    pub baseline: f32,
    /// A drop is in progress
    pub is_drop_active: bool,
    /// The drop started this frame
    pub drop_started: bool,
    /// The drop ended this frame
    pub drop_ended: bool,
    /// Energy collapsed well below the baseline
    pub is_breakdown: bool,
}

impl Default for EnergyReading {
    fn default() -> Self {
        Self {
            raw_energy: NEUTRAL_ENERGY,
            smoothed_energy: NEUTRAL_ENERGY,
            baseline: NEUTRAL_ENERGY,
            is_drop_active: false,
            drop_started: false,
            drop_ended: false,
            is_breakdown: false,
        }
    }
}

/// Rolling energy average with relative drop/breakdown detection
#[derive(Debug, Clone)]
pub struct EnergyStabilizer {
    config: EnergyConfig,
    short: RollingWindow<f32>,
    long: RollingWindow<f32>,
    drop_active: bool,
    drop_elapsed_ms: f64,
    cooldown_ms: f64,
    breakdown: bool,
    last: EnergyReading,
}

impl EnergyStabilizer {
    /// Create a stabilizer with windows sized for `frame_rate`
    pub fn new(config: EnergyConfig, frame_rate: f32) -> Self {
        let short = RollingWindow::new(frames_for(config.window_secs, frame_rate), NEUTRAL_ENERGY);
        let long = RollingWindow::new(frames_for(config.baseline_secs, frame_rate), NEUTRAL_ENERGY);
        Self {
            config,
            short,
            long,
            drop_active: false,
            drop_elapsed_ms: 0.0,
            cooldown_ms: 0.0,
            breakdown: false,
            last: EnergyReading::default(),
        }
    }

    /// Absorb one raw energy sample
    pub fn update(&mut self, raw_energy: f32, force_drop: bool, delta_ms: f64) -> EnergyReading {
        let raw = sanitize_unit(raw_energy, NEUTRAL_ENERGY);
        let dt = sanitize_delta_ms(delta_ms);

        // Baseline excludes the current sample
        let baseline = self.long.mean();
        self.short.push(raw);
        self.long.push(raw);
        let smoothed = self.short.mean();

        let mut drop_started = false;
        let mut drop_ended = false;

        if self.drop_active {
            self.drop_elapsed_ms += dt;
            if !force_drop
                && self.drop_elapsed_ms >= self.config.drop_min_ms
                && raw < self.config.drop_exit
            {
                self.drop_active = false;
                self.cooldown_ms = self.config.drop_cooldown_ms;
                drop_ended = true;
                debug!(
                    "Drop ended after {:.0} ms (raw={:.2})",
                    self.drop_elapsed_ms, raw
                );
            }
        } else {
            self.cooldown_ms = (self.cooldown_ms - dt).max(0.0);
            let relative_jump =
                raw >= baseline + self.config.drop_delta && raw >= self.config.drop_floor;
            if force_drop || (relative_jump && self.cooldown_ms <= 0.0) {
                self.drop_active = true;
                self.drop_elapsed_ms = 0.0;
                drop_started = true;
                debug!(
                    "Drop started (raw={:.2}, baseline={:.2}, forced={})",
                    raw, baseline, force_drop
                );
            }
        }

        let breakdown_threshold = baseline - self.config.breakdown_delta;
        if self.breakdown {
            if raw >= baseline - self.config.breakdown_delta / 2.0
                || baseline < self.config.breakdown_min_baseline
                || self.drop_active
            {
                self.breakdown = false;
            }
        } else if baseline >= self.config.breakdown_min_baseline
            && raw <= breakdown_threshold
            && !self.drop_active
        {
            self.breakdown = true;
        }

        self.last = EnergyReading {
            raw_energy: raw,
            smoothed_energy: smoothed,
            baseline,
            is_drop_active: self.drop_active,
            drop_started,
            drop_ended,
            is_breakdown: self.breakdown,
        };
        self.last
    }

    /// Last reading
    pub fn reading(&self) -> EnergyReading {
        self.last
    }

    /// Re-seed buffers and clear drop/breakdown state
    pub fn reset(&mut self) {
        self.short.reset();
        self.long.reset();
        self.drop_active = false;
        self.drop_elapsed_ms = 0.0;
        self.cooldown_ms = 0.0;
        self.breakdown = false;
        self.last = EnergyReading::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn stabilizer() -> EnergyStabilizer {
        EnergyStabilizer::new(EnergyConfig::default(), 60.0)
    }

    #[test]
    fn test_smoothing_starts_neutral() {
        let mut s = stabilizer();
        let reading = s.update(1.0, false, FRAME_MS);
        assert_eq!(reading.raw_energy, 1.0);
        // One sample out of 120 moves the mean only slightly
        assert!(reading.smoothed_energy > 0.5 && reading.smoothed_energy < 0.51);
    }

    #[test]
    fn test_smoothed_converges() {
        let mut s = stabilizer();
        let mut reading = EnergyReading::default();
        for _ in 0..200 {
            reading = s.update(0.9, false, FRAME_MS);
        }
        assert!((reading.smoothed_energy - 0.9).abs() < 1e-4);
    }

    #[test]
    fn test_drop_detection_and_minimum_hold() {
        let mut s = stabilizer();
        for _ in 0..600 {
            s.update(0.3, false, FRAME_MS);
        }
        let reading = s.update(0.9, false, FRAME_MS);
        assert!(reading.drop_started);
        assert!(reading.is_drop_active);

        // Energy collapses immediately but the drop holds for the minimum duration
        let reading = s.update(0.1, false, FRAME_MS);
        assert!(reading.is_drop_active);
        let mut ended = false;
        for _ in 0..150 {
            if s.update(0.1, false, FRAME_MS).drop_ended {
                ended = true;
                break;
            }
        }
        assert!(ended);
    }

    #[test]
    fn test_cooldown_blocks_retrigger() {
        let mut s = stabilizer();
        for _ in 0..600 {
            s.update(0.2, false, FRAME_MS);
        }
        s.update(0.9, false, FRAME_MS);
        for _ in 0..130 {
            s.update(0.2, false, FRAME_MS);
        }
        assert!(!s.reading().is_drop_active);
        // Inside the cooldown window a new jump does not start a drop
        let reading = s.update(0.95, false, FRAME_MS);
        assert!(!reading.drop_started);
    }

    #[test]
    fn test_force_drop() {
        let mut s = stabilizer();
        let reading = s.update(0.1, true, FRAME_MS);
        assert!(reading.drop_started);
    }

    #[test]
    fn test_breakdown_flag_with_hysteresis() {
        let mut s = stabilizer();
        for _ in 0..600 {
            s.update(0.7, false, FRAME_MS);
        }
        let reading = s.update(0.3, false, FRAME_MS);
        assert!(reading.is_breakdown);
        // Slightly under the exit level: still a breakdown
        let baseline = s.reading().baseline;
        let reading = s.update(baseline - 0.2, false, FRAME_MS);
        assert!(reading.is_breakdown);
    }

    #[test]
    fn test_nan_input_is_neutral() {
        let mut s = stabilizer();
        let reading = s.update(f32::NAN, false, f64::NAN);
        assert_eq!(reading.raw_energy, NEUTRAL_ENERGY);
        assert!(reading.smoothed_energy.is_finite());
    }

    #[test]
    fn test_reset() {
        let mut s = stabilizer();
        for _ in 0..100 {
            s.update(1.0, true, FRAME_MS);
        }
        s.reset();
        let reading = s.reading();
        assert!(!reading.is_drop_active);
        assert_eq!(reading.smoothed_energy, NEUTRAL_ENERGY);
    }
}
