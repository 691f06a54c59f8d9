//! Beat clock, pattern selection and governed trajectory sampling.

use super::governor::Gearbox;
use super::patterns::{self, PatternSpec};
use super::{MovementConfig, MovementIntent};
use crate::constitution::MovementProfile;
use crate::context::{sanitize_delta_ms, sanitize_unit, AudioMetrics, NEUTRAL_ENERGY};
use crate::stabilizer::window::{frames_for, RollingWindow};
use std::f64::consts::TAU;
use tracing::{debug, warn};

/// Beats per bar
pub const BEATS_PER_BAR: f64 = 4.0;
/// Bars per phrase; the pattern rotates once per phrase
pub const BARS_PER_PHRASE: u64 = 8;

/// Pattern used when a profile names an unknown one
const FALLBACK_PATTERN: &str = "circle";

/// One frame of movement input
#[derive(Debug, Clone, Copy)]
pub struct MovementInput<'a> {
    /// Raw tempo (manual override already applied)
    pub bpm: f32,
    /// Instantaneous energy, drives the calm veto
    pub energy: f32,
    /// Smoothed energy, drives the amplitude boost
    pub smoothed_energy: f32,
    /// Spectral metrics handed to pattern functions
    pub metrics: &'a AudioMetrics,
    /// Frame delta (ms)
    pub delta_ms: f64,
}

/// Tempo-synchronized pattern planner
#[derive(Debug, Clone)]
pub struct Choreographer {
    config: MovementConfig,
    gearbox: Gearbox,
    elapsed_s: f64,
    beats: f64,
    energy_window: RollingWindow<f32>,
    current_pattern: Option<&'static str>,
}

impl Choreographer {
    /// Create a choreographer with its calm-floor window sized for `frame_rate`
    pub fn new(config: MovementConfig, frame_rate: f32) -> Self {
        let energy_window =
            RollingWindow::new(frames_for(config.calm_window_secs, frame_rate), NEUTRAL_ENERGY);
        Self {
            gearbox: Gearbox::new(&config),
            config,
            elapsed_s: 0.0,
            beats: 0.0,
            energy_window,
            current_pattern: None,
        }
    }

    /// The velocity governor
    pub fn gearbox(&self) -> &Gearbox {
        &self.gearbox
    }

    /// Total beats elapsed
    pub fn beats(&self) -> f64 {
        self.beats
    }

    /// Whole bars elapsed
    pub fn bar_count(&self) -> u64 {
        (self.beats / BEATS_PER_BAR).floor() as u64
    }

    /// Current phrase index
    pub fn phrase_index(&self) -> u64 {
        self.bar_count() / BARS_PER_PHRASE
    }

    /// Adaptive low-energy floor below which the calm pattern is used
    pub fn calm_floor(&self) -> f32 {
        let floor = self.config.calm_floor_ratio * self.energy_window.mean();
        if floor.is_finite() {
            floor.clamp(self.config.calm_floor_min, self.config.calm_floor_max)
        } else {
            self.config.calm_floor_min
        }
    }

    fn select(&self, profile: &MovementProfile, energy: f32) -> &'static PatternSpec {
        let id = if energy < self.calm_floor() || profile.patterns.is_empty() {
            profile.calm_pattern.as_str()
        } else {
            let slot = (self.phrase_index() % profile.patterns.len() as u64) as usize;
            profile.patterns[slot].as_str()
        };
        match patterns::get(id) {
            Some(spec) => spec,
            None => {
                warn!("Unknown movement pattern '{}', using {}", id, FALLBACK_PATTERN);
                &patterns::PATTERNS[0]
            }
        }
    }

    /// Advance the clock and sample the trajectory for this frame
    pub fn update(&mut self, input: MovementInput<'_>, profile: &MovementProfile) -> MovementIntent {
        if !Gearbox::is_valid_bpm(input.bpm) {
            return MovementIntent::emergency_brake(profile.physics);
        }
        let spb = self.gearbox.seconds_per_beat(input.bpm);
        if !self.gearbox.is_valid_beat_duration(spb) {
            return MovementIntent::emergency_brake(profile.physics);
        }

        let dt_s = sanitize_delta_ms(input.delta_ms) / 1000.0;
        self.elapsed_s += dt_s;
        self.beats += dt_s / spb as f64;

        let energy = sanitize_unit(input.energy, NEUTRAL_ENERGY);
        self.energy_window.push(energy);

        let spec = self.select(profile, energy);
        if self.current_pattern != Some(spec.id) {
            debug!(
                "Movement pattern {:?} -> {} (phrase {})",
                self.current_pattern,
                spec.id,
                self.phrase_index()
            );
            self.current_pattern = Some(spec.id);
        }

        let cycle = (self.beats / spec.period_beats as f64).fract();
        let theta = (cycle * TAU) as f32;
        let point = spec.sample(
            self.elapsed_s as f32,
            theta,
            input.metrics,
            self.config.fixture_index,
            self.config.fixture_count.max(1),
        );
        let governed = self
            .gearbox
            .govern(spec, profile, input.smoothed_energy, spb);

        MovementIntent {
            pattern: spec.id.to_string(),
            x: (point.x * governed.amplitude).clamp(-1.0, 1.0),
            y: (point.y * governed.amplitude).clamp(-1.0, 1.0),
            speed: governed.speed,
            amplitude: governed.amplitude,
            center_x: 0.5,
            center_y: 0.5,
            beat_sync: true,
            phase_type: spec.phase_type,
            physics: profile.physics,
        }
    }

    /// Zero the clock and re-seed the energy window
    pub fn reset(&mut self) {
        self.elapsed_s = 0.0;
        self.beats = 0.0;
        self.energy_window.reset();
        self.current_pattern = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constitution::Constitution;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn input(bpm: f32, energy: f32, metrics: &AudioMetrics) -> MovementInput<'_> {
        MovementInput {
            bpm,
            energy,
            smoothed_energy: energy,
            metrics,
            delta_ms: FRAME_MS,
        }
    }

    #[test]
    fn test_zero_bpm_brakes_without_advancing() {
        let profile = Constitution::default().movement;
        let metrics = AudioMetrics::default();
        let mut c = Choreographer::new(MovementConfig::default(), 60.0);
        let intent = c.update(input(0.0, 0.8, &metrics), &profile);
        assert_eq!(intent.x, 0.0);
        assert_eq!(intent.amplitude, 0.0);
        assert!(!intent.beat_sync);
        assert_eq!(c.beats(), 0.0);

        let intent = c.update(input(f32::NAN, 0.8, &metrics), &profile);
        assert!(intent.is_finite());
        assert_eq!(intent.speed, 0.0);
    }

    #[test]
    fn test_beat_clock_advances() {
        let profile = Constitution::default().movement;
        let metrics = AudioMetrics::default();
        let mut c = Choreographer::new(MovementConfig::default(), 60.0);
        // 120 BPM: 2 beats per second
        for _ in 0..150 {
            c.update(input(120.0, 0.8, &metrics), &profile);
        }
        assert!((c.beats() - 5.0).abs() < 1e-6);
        assert_eq!(c.bar_count(), 1);
    }

    #[test]
    fn test_pattern_rotates_per_phrase() {
        let profile = Constitution::default().movement;
        let metrics = AudioMetrics::default();
        let mut c = Choreographer::new(MovementConfig::default(), 60.0);
        let first = c.update(input(120.0, 0.8, &metrics), &profile);
        assert_eq!(first.pattern, "circle");
        // One phrase = 32 beats = 16 s at 120 BPM
        let mut last = first;
        for _ in 0..(16 * 60) {
            last = c.update(input(120.0, 0.8, &metrics), &profile);
        }
        assert_eq!(c.phrase_index(), 1);
        assert_eq!(last.pattern, "figure8");
    }

    #[test]
    fn test_low_energy_uses_calm_pattern() {
        let profile = Constitution::default().movement;
        let metrics = AudioMetrics::default();
        let mut c = Choreographer::new(MovementConfig::default(), 60.0);
        let intent = c.update(input(120.0, 0.05, &metrics), &profile);
        assert_eq!(intent.pattern, "drift");
    }

    #[test]
    fn test_output_within_unit_square() {
        let profile = Constitution::default().movement;
        let metrics = AudioMetrics {
            high: 1.0,
            ..AudioMetrics::default()
        };
        let mut c = Choreographer::new(MovementConfig::default(), 60.0);
        for frame in 0..2000 {
            let bpm = 60.0 + (frame % 140) as f32;
            let intent = c.update(input(bpm, 1.0, &metrics), &profile);
            assert!(intent.x.abs() <= 1.0 && intent.y.abs() <= 1.0);
            assert!((0.0..=1.0).contains(&intent.speed));
        }
    }

    #[test]
    fn test_reset() {
        let profile = Constitution::default().movement;
        let metrics = AudioMetrics::default();
        let mut c = Choreographer::new(MovementConfig::default(), 60.0);
        for _ in 0..100 {
            c.update(input(128.0, 0.7, &metrics), &profile);
        }
        c.reset();
        assert_eq!(c.beats(), 0.0);
        assert_eq!(c.bar_count(), 0);
    }
}
