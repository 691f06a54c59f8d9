//! Key stabilization: weighted voting over a long window with lock and hysteresis.

use super::window::{frames_for, RollingWindow};
use crate::context::{sanitize_delta_ms, sanitize_unit};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One of the twelve pitch classes, 0 = C ... 11 = B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PitchClass(u8);

impl PitchClass {
    /// Pitch class from a semitone index (wrapped modulo 12)
    pub fn new(index: u8) -> Self {
        Self(index % 12)
    }

    /// Semitone index, 0 = C
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Position on the circle of fifths, 0 = C, 1 = G, 2 = D ...
    pub fn fifths_position(self) -> u8 {
        (self.0 * 7) % 12
    }

    /// Sharp-spelled name
    pub fn name(self) -> &'static str {
        SHARP_NAMES[self.index()]
    }

    /// Parse a key label such as "A", "c#", "Bb", "F#m", "Eb minor".
    /// The minor/major marker is accepted and ignored; mode is reported separately.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let mut chars = label.chars();
        let base: i32 = match chars.next()?.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };

        let mut rest = chars.as_str();
        let mut offset = 0i32;
        for _ in 0..2 {
            if let Some(stripped) = rest.strip_prefix('#').or_else(|| rest.strip_prefix('♯')) {
                offset += 1;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix('b').or_else(|| rest.strip_prefix('♭'))
            {
                offset -= 1;
                rest = stripped;
            } else {
                break;
            }
        }

        match rest.trim().to_ascii_lowercase().as_str() {
            "" | "m" | "min" | "minor" | "maj" | "major" => {
                Some(Self(((base + offset).rem_euclid(12)) as u8))
            }
            _ => None,
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key stabilizer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Voting window (seconds)
    pub buffer_secs: f32,
    /// Minimum time a chosen key is held (ms)
    pub lock_ms: f64,
    /// Relative margin a challenger must exceed the incumbent by
    pub hysteresis_margin: f32,
    /// Votes below this confidence count as silence
    pub min_confidence: f32,
    /// How strongly smoothed energy amplifies a vote
    pub energy_weight: f32,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            buffer_secs: 12.0,
            lock_ms: 10_000.0,
            hysteresis_margin: 0.2,
            min_confidence: 0.3,
            energy_weight: 1.0,
        }
    }
}

/// One frame of key evidence
#[derive(Debug, Clone, Copy)]
pub struct KeyInput<'a> {
    /// Detected key label
    pub key: Option<&'a str>,
    /// Detector confidence
    pub confidence: f32,
    /// Smoothed energy from the energy stabilizer
    pub smoothed_energy: f32,
    /// Frame delta (ms)
    pub delta_ms: f64,
}

/// Output of one key update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyReading {
    /// Current stable key
    pub stable_key: Option<PitchClass>,
    /// Key held before this frame
    pub previous: Option<PitchClass>,
    /// Stable key changed this frame
    pub changed: bool,
}

/// Weighted key vote with a post-change lock
#[derive(Debug, Clone)]
pub struct KeyStabilizer {
    config: KeyConfig,
    votes: RollingWindow<Option<(PitchClass, f32)>>,
    stable: Option<PitchClass>,
    lock_remaining_ms: f64,
}

impl KeyStabilizer {
    /// Create a stabilizer with a window sized for `frame_rate`
    pub fn new(config: KeyConfig, frame_rate: f32) -> Self {
        let votes = RollingWindow::new(frames_for(config.buffer_secs, frame_rate), None);
        Self {
            config,
            votes,
            stable: None,
            lock_remaining_ms: 0.0,
        }
    }

    /// Absorb one frame of key evidence
    pub fn update(&mut self, input: KeyInput<'_>) -> KeyReading {
        let dt = sanitize_delta_ms(input.delta_ms);
        self.lock_remaining_ms = (self.lock_remaining_ms - dt).max(0.0);

        let confidence = sanitize_unit(input.confidence, 0.0);
        let energy = sanitize_unit(input.smoothed_energy, 0.0);
        let vote = input
            .key
            .and_then(PitchClass::parse)
            .filter(|_| confidence >= self.config.min_confidence)
            .map(|pc| (pc, confidence * (1.0 + self.config.energy_weight * energy)));
        self.votes.push(vote);

        let totals = self.tally();
        let previous = self.stable;
        let dominant = self.dominant(&totals);

        match (self.stable, dominant) {
            (None, Some(candidate)) => {
                self.adopt(candidate);
            }
            (Some(incumbent), Some(candidate)) if candidate != incumbent => {
                let margin = 1.0 + self.config.hysteresis_margin;
                if self.lock_remaining_ms <= 0.0
                    && totals[candidate.index()] > totals[incumbent.index()] * margin
                {
                    self.adopt(candidate);
                }
            }
            _ => {}
        }

        KeyReading {
            stable_key: self.stable,
            previous,
            changed: previous != self.stable,
        }
    }

    fn tally(&self) -> [f32; 12] {
        let mut totals = [0.0f32; 12];
        for (pc, weight) in self.votes.iter().flatten() {
            totals[pc.index()] += *weight;
        }
        totals
    }

    fn dominant(&self, totals: &[f32; 12]) -> Option<PitchClass> {
        let mut best: Option<usize> = None;
        for (idx, total) in totals.iter().enumerate() {
            if *total <= 0.0 {
                continue;
            }
            match best {
                Some(b) if *total <= totals[b] => {}
                _ => best = Some(idx),
            }
        }
        let best = best?;
        // Ties resolve in favour of the incumbent
        if let Some(incumbent) = self.stable {
            if totals[incumbent.index()] >= totals[best] {
                return Some(incumbent);
            }
        }
        Some(PitchClass::new(best as u8))
    }

    fn adopt(&mut self, key: PitchClass) {
        debug!("Stable key {:?} -> {}", self.stable.map(|k| k.name()), key);
        self.stable = Some(key);
        self.lock_remaining_ms = self.config.lock_ms;
    }

    /// Current stable key
    pub fn stable_key(&self) -> Option<PitchClass> {
        self.stable
    }

    /// Remaining lock time (ms)
    pub fn lock_remaining_ms(&self) -> f64 {
        self.lock_remaining_ms
    }

    /// Clear votes, key and lock
    pub fn reset(&mut self) {
        self.votes.reset();
        self.stable = None;
        self.lock_remaining_ms = 0.0;
    }
}
