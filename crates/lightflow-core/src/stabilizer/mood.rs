//! Mood arbitration (bright / dark / neutral) and thermal temperature.

use super::key::PitchClass;
use super::window::{frames_for, RollingWindow};
use crate::context::{sanitize_delta_ms, sanitize_unit, Mode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Nominal frame duration the thermal rate is expressed against (ms)
const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

/// Emotional color of the music
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    /// Uplifting
    Bright,
    /// Brooding
    Dark,
    /// Neither
    #[default]
    Neutral,
}

impl Emotion {
    fn slot(self) -> usize {
        match self {
            Emotion::Bright => 0,
            Emotion::Dark => 1,
            Emotion::Neutral => 2,
        }
    }

    const ALL: [Emotion; 3] = [Emotion::Bright, Emotion::Dark, Emotion::Neutral];
}

/// Mood arbiter tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    /// Classification window (seconds)
    pub buffer_secs: f32,
    /// Minimum time an emotion is held (ms)
    pub lock_ms: f64,
    /// Score above which a frame is bright
    pub bright_threshold: f32,
    /// Score below which a frame is dark
    pub dark_threshold: f32,
    /// Share of the window a challenger needs
    pub dominance: f32,
    /// Thermal EMA coefficient per nominal 60 fps frame
    pub thermal_rate: f32,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            buffer_secs: 10.0,
            lock_ms: 5_000.0,
            bright_threshold: 0.25,
            dark_threshold: -0.25,
            dominance: 0.45,
            thermal_rate: 0.02,
        }
    }
}

/// One frame of mood evidence
#[derive(Debug, Clone, Copy)]
pub struct MoodInput {
    /// Detected mode
    pub mode: Mode,
    /// Smoothed energy
    pub energy: f32,
    /// Stable key from the key stabilizer
    pub stable_key: Option<PitchClass>,
    /// Frame delta (ms)
    pub delta_ms: f64,
}

/// Output of one mood update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodReading {
    /// Current stable emotion
    pub emotion: Emotion,
    /// Emotion held before this frame
    pub previous: Emotion,
    /// Stable emotion changed this frame
    pub changed: bool,
    /// Instantaneous mood score
    pub score: f32,
    /// Thermal temperature, 0 = cold, 1 = warm
    pub thermal_temperature: f32,
}

/// Brightness contribution of each mode
pub fn mode_brightness(mode: Mode) -> f32 {
    match mode {
        Mode::Lydian => 0.7,
        Mode::Major => 0.6,
        Mode::Mixolydian => 0.3,
        Mode::Unknown => 0.0,
        Mode::Dorian => -0.2,
        Mode::Minor => -0.6,
        Mode::Phrygian => -0.7,
        Mode::Locrian => -0.8,
    }
}

/// Brightness contribution of a key: sharp side of the circle of fifths is brighter
pub fn key_brightness(key: Option<PitchClass>) -> f32 {
    match key.map(|k| k.fifths_position()) {
        None | Some(0) => 0.0,
        Some(p) if p <= 6 => 0.1 * p as f32 / 6.0,
        Some(p) => -0.1 * (12 - p) as f32 / 6.0,
    }
}

/// Majority-vote mood classification with a post-change lock
#[derive(Debug, Clone)]
pub struct MoodArbiter {
    config: MoodConfig,
    window: RollingWindow<Emotion>,
    stable: Emotion,
    lock_remaining_ms: f64,
    thermal: f32,
}

impl MoodArbiter {
    /// Create an arbiter with a window sized for `frame_rate`
    pub fn new(config: MoodConfig, frame_rate: f32) -> Self {
        let window = RollingWindow::new(frames_for(config.buffer_secs, frame_rate), Emotion::Neutral);
        Self {
            config,
            window,
            stable: Emotion::Neutral,
            lock_remaining_ms: 0.0,
            thermal: 0.5,
        }
    }

    /// Score a frame: positive is bright, negative is dark
    pub fn score(&self, input: &MoodInput) -> f32 {
        let energy = sanitize_unit(input.energy, 0.5);
        mode_brightness(input.mode) + (energy - 0.5) * 0.6 + key_brightness(input.stable_key)
    }

    fn classify(&self, score: f32) -> Emotion {
        if score > self.config.bright_threshold {
            Emotion::Bright
        } else if score < self.config.dark_threshold {
            Emotion::Dark
        } else {
            Emotion::Neutral
        }
    }

    /// Absorb one frame of mood evidence
    pub fn update(&mut self, input: MoodInput) -> MoodReading {
        let dt = sanitize_delta_ms(input.delta_ms);
        self.lock_remaining_ms = (self.lock_remaining_ms - dt).max(0.0);

        let score = self.score(&input);
        self.window.push(self.classify(score));

        let mut counts = [0usize; 3];
        for emotion in self.window.iter() {
            counts[emotion.slot()] += 1;
        }

        let mut candidate = self.stable;
        for emotion in Emotion::ALL {
            if counts[emotion.slot()] > counts[candidate.slot()] {
                candidate = emotion;
            }
        }

        let previous = self.stable;
        if candidate != self.stable && self.lock_remaining_ms <= 0.0 {
            let capacity = self.window.capacity() as f32;
            let share = counts[candidate.slot()] as f32 / capacity;
            if share >= self.config.dominance {
                debug!("Stable emotion {:?} -> {:?} (share {:.2})", self.stable, candidate, share);
                self.stable = candidate;
                self.lock_remaining_ms = self.config.lock_ms;
            }
        }

        let target = ((score + 1.0) / 2.0).clamp(0.0, 1.0);
        let alpha = (self.config.thermal_rate as f64 * dt / NOMINAL_FRAME_MS).clamp(0.0, 1.0) as f32;
        self.thermal = (self.thermal + (target - self.thermal) * alpha).clamp(0.0, 1.0);

        MoodReading {
            emotion: self.stable,
            previous,
            changed: previous != self.stable,
            score,
            thermal_temperature: self.thermal,
        }
    }

    /// Current stable emotion
    pub fn emotion(&self) -> Emotion {
        self.stable
    }

    /// Current thermal temperature
    pub fn thermal_temperature(&self) -> f32 {
        self.thermal
    }

    /// Re-seed the window, clear the lock, return to neutral
    pub fn reset(&mut self) {
        self.window.reset();
        self.stable = Emotion::Neutral;
        self.lock_remaining_ms = 0.0;
        self.thermal = 0.5;
    }
}
