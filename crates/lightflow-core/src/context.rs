//! Per-frame inputs produced upstream by the audio analysis subsystem.
//!
//! Inputs are accepted as-is and sanitized by each stage: non-finite values are replaced
//! with neutral defaults, unit-range values are clamped to `[0, 1]`.

use serde::{Deserialize, Serialize};

/// Neutral energy used to seed buffers and replace non-finite samples
pub const NEUTRAL_ENERGY: f32 = 0.5;

/// Largest frame delta the pipeline will integrate in one step (ms)
pub const MAX_FRAME_DELTA_MS: f64 = 1000.0;

/// Musical mode reported by the key detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Ionian
    Major,
    /// Aeolian
    Minor,
    /// Dorian
    Dorian,
    /// Phrygian
    Phrygian,
    /// Lydian
    Lydian,
    /// Mixolydian
    Mixolydian,
    /// Locrian
    Locrian,
    /// Not detected
    #[default]
    Unknown,
}

/// Song section tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Intro
    Intro,
    /// Verse
    Verse,
    /// Chorus
    Chorus,
    /// Build-up
    Build,
    /// Drop
    Drop,
    /// Breakdown
    Breakdown,
    /// Outro
    Outro,
    /// Not detected
    #[default]
    Unknown,
}

/// Analyzed musical context for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicalContext {
    /// Tempo in beats per minute
    pub bpm: f32,
    /// Position inside the current beat (0.0 - 1.0)
    pub beat_phase: f32,
    /// Overall energy (0.0 - 1.0)
    pub energy: f32,
    /// Detected key, e.g. "A", "C#", "Bb", "F#m"
    pub key: Option<String>,
    /// Detected mode
    pub mode: Mode,
    /// Key detection confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Rhythmic syncopation (0.0 - 1.0)
    pub syncopation: f32,
    /// Song section tag
    pub section: Section,
    /// Genre tag
    pub genre: Option<String>,
    /// Active profile id
    pub profile_id: String,
}

impl Default for MusicalContext {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beat_phase: 0.0,
            energy: NEUTRAL_ENERGY,
            key: None,
            mode: Mode::Unknown,
            confidence: 0.0,
            syncopation: 0.3,
            section: Section::Unknown,
            genre: None,
            profile_id: "default".to_string(),
        }
    }
}

impl MusicalContext {
    /// Create a neutral context for the given profile
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            ..Default::default()
        }
    }
}

/// Raw spectral metrics for one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMetrics {
    /// Bass band level (0.0 - 1.0)
    pub bass: f32,
    /// Mid band level (0.0 - 1.0)
    pub mid: f32,
    /// High band level (0.0 - 1.0)
    pub high: f32,
    /// Broadband energy (0.0 - 1.0)
    pub energy: f32,
    /// Beat detected this frame
    pub is_beat: bool,
    /// Position inside the current beat (0.0 - 1.0)
    pub beat_phase: f32,
    /// Spectral centroid, normalized (optional)
    pub spectral_centroid: Option<f32>,
    /// Spectral flux, normalized (optional)
    pub spectral_flux: Option<f32>,
}

impl AudioMetrics {
    /// Copy with every field clamped to its valid range
    pub fn sanitized(&self) -> Self {
        Self {
            bass: sanitize_unit(self.bass, 0.0),
            mid: sanitize_unit(self.mid, 0.0),
            high: sanitize_unit(self.high, 0.0),
            energy: sanitize_unit(self.energy, 0.0),
            is_beat: self.is_beat,
            beat_phase: sanitize_unit(self.beat_phase, 0.0),
            spectral_centroid: self.spectral_centroid.map(|v| sanitize_unit(v, 0.0)),
            spectral_flux: self.spectral_flux.map(|v| sanitize_unit(v, 0.0)),
        }
    }
}

/// Typed operator annotations passed alongside the musical context
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameOverrides {
    /// Manual tempo (tap tempo), replaces `MusicalContext::bpm`
    pub bpm: Option<f32>,
    /// Force the drop state on
    pub force_drop: bool,
    /// Operator blackout
    pub blackout: bool,
    /// Operator master fader, narrows the final master intensity
    pub master_cap: Option<f32>,
}

/// Clamp to `[0, 1]`, substituting `fallback` for non-finite values
pub fn sanitize_unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        // `+ 0.0` folds negative zero into positive zero
        value.clamp(0.0, 1.0) + 0.0
    } else {
        fallback
    }
}

/// Frame delta in ms, zero for invalid values and capped at `MAX_FRAME_DELTA_MS`
pub fn sanitize_delta_ms(delta_ms: f64) -> f64 {
    if delta_ms.is_finite() && delta_ms > 0.0 {
        delta_ms.min(MAX_FRAME_DELTA_MS)
    } else {
        0.0
    }
}
