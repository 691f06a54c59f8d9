//! Effects - transient lighting effects under a permission policy
//!
//! Effects are registered by string id and created through factories, so new types
//! never touch the arbiter. Every trigger passes the [`Shield`] first, which may block
//! the effect or degrade it (rate/intensity caps) according to the active constitution.
//! Live instances are blended with HTP (highest takes precedence) semantics.

pub mod arbiter;
pub mod combine;
pub mod library;
pub mod shield;

pub use arbiter::{EffectArbiter, TriggerOutcome};
pub use combine::{combine, CombinedEffectOutput};
pub use library::{EffectFactory, EffectRegistry};
pub use shield::{Shield, ShieldVerdict};

use crate::color::Hsl;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Effect errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// No factory registered under this id
    #[error("Unknown effect type: {0}")]
    UnknownType(String),
}

/// Permission class of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCategory {
    /// Rapid on/off flashing
    Strobe,
    /// Single full-rig hit
    Flash,
    /// Running light
    Chase,
    /// Slow breathing
    Pulse,
    /// Everything off
    Blackout,
    /// Warm background glow
    Ambient,
}

impl EffectCategory {
    /// Every category
    pub const ALL: [EffectCategory; 6] = [
        EffectCategory::Strobe,
        EffectCategory::Flash,
        EffectCategory::Chase,
        EffectCategory::Pulse,
        EffectCategory::Blackout,
        EffectCategory::Ambient,
    ];

    /// Fast, attention-grabbing effects
    pub fn is_dynamic(self) -> bool {
        matches!(
            self,
            EffectCategory::Strobe | EffectCategory::Flash | EffectCategory::Chase
        )
    }

    /// Effects that strobe
    pub fn requires_strobe(self) -> bool {
        matches!(self, EffectCategory::Strobe)
    }
}

/// Identifier of a live effect instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectHandle(pub u64);

impl fmt::Display for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trigger request for one effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Registered effect id, e.g. "strobe"
    pub effect_type: String,
    /// Intensity (0.0 - 1.0)
    pub intensity: f32,
    /// Lifetime in ms; `None` uses the effect's default
    pub duration_ms: Option<f64>,
    /// Rate in Hz for periodic effects
    pub rate_hz: Option<f32>,
    /// Color the effect paints, if any
    pub color: Option<Hsl>,
    /// Overrides the effect's default priority
    pub priority: Option<u8>,
    /// Abort live instances of the same type first
    pub replace_existing: bool,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            effect_type: String::new(),
            intensity: 1.0,
            duration_ms: None,
            rate_hz: None,
            color: None,
            priority: None,
            replace_existing: false,
        }
    }
}

impl EffectConfig {
    /// Full-intensity request for `effect_type`
    pub fn new(effect_type: impl Into<String>) -> Self {
        Self {
            effect_type: effect_type.into(),
            ..Default::default()
        }
    }

    /// Set intensity
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Set lifetime
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Set rate
    pub fn with_rate(mut self, rate_hz: f32) -> Self {
        self.rate_hz = Some(rate_hz);
        self
    }

    /// Set color
    pub fn with_color(mut self, color: Hsl) -> Self {
        self.color = Some(color);
        self
    }

    /// Set priority
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replace live instances of the same type
    pub fn replacing(mut self) -> Self {
        self.replace_existing = true;
        self
    }
}

/// One instance's output for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectFrame {
    /// Dimmer level
    pub dimmer: Option<f32>,
    /// White channel level
    pub white: Option<f32>,
    /// Amber channel level
    pub amber: Option<f32>,
    /// Strobe rate (Hz)
    pub strobe_rate: Option<f32>,
    /// Color override
    pub color: Option<Hsl>,
    /// Priority for color and override arbitration
    pub priority: u8,
    /// Takes over every zone and the master
    pub global_override: bool,
}

/// Caps imposed by the shield on a degraded effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectConstraints {
    /// Strobe rate cap (Hz)
    pub max_strobe_rate: Option<f32>,
    /// Intensity cap (0.0 - 1.0)
    pub max_intensity: f32,
}

impl Default for EffectConstraints {
    fn default() -> Self {
        Self {
            max_strobe_rate: None,
            max_intensity: 1.0,
        }
    }
}

impl EffectConstraints {
    /// Apply the caps to a frame
    pub fn apply(&self, frame: &mut EffectFrame) {
        let cap = |v: Option<f32>| v.map(|v| v.min(self.max_intensity));
        frame.dimmer = cap(frame.dimmer);
        frame.white = cap(frame.white);
        frame.amber = cap(frame.amber);
        if let (Some(rate), Some(max)) = (frame.strobe_rate, self.max_strobe_rate) {
            frame.strobe_rate = Some(rate.min(max));
        }
    }
}

/// Per-category intensity multipliers folded in from advisory input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectGains {
    /// Multiplier for strobe effects
    pub strobe: f32,
    /// Multiplier for flash effects
    pub flash: f32,
}

impl Default for EffectGains {
    fn default() -> Self {
        Self {
            strobe: 1.0,
            flash: 1.0,
        }
    }
}

impl EffectGains {
    /// Multiplier for a category
    pub fn for_category(&self, category: EffectCategory) -> f32 {
        match category {
            EffectCategory::Strobe => self.strobe,
            EffectCategory::Flash => self.flash,
            _ => 1.0,
        }
    }
}

/// Capability of effects that accept shield constraints
pub trait Constrainable {
    /// Install intensity/rate caps
    fn set_constraints(&mut self, constraints: &EffectConstraints);
}

/// A transient lighting effect
pub trait LightEffect: Send {
    /// Start from a trigger request
    fn trigger(&mut self, config: &EffectConfig);

    /// Advance by `delta_ms`
    fn update(&mut self, delta_ms: f64);

    /// The effect has run its course
    fn is_finished(&self) -> bool;

    /// Stop immediately
    fn abort(&mut self);

    /// Output for the current frame, `None` when silent
    fn output(&self) -> Option<EffectFrame>;

    /// Priority for color and override arbitration
    fn priority(&self) -> u8;

    /// Permission class
    fn category(&self) -> EffectCategory;

    /// Constraint capability, if supported
    fn as_constrainable(&mut self) -> Option<&mut dyn Constrainable> {
        None
    }
}
