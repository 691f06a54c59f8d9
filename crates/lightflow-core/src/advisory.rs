//! Advisory seam.
//!
//! An external advisor may nudge color and effect intensity, and may suggest an effect.
//! Its influence is narrow: modifiers are clamped to `[0.8, 1.2]`, gated by confidence,
//! and anything that touches strobe/flash is vetoed at very high energy.

use crate::effects::{EffectConfig, EffectGains};
use crate::stabilizer::StabilizedState;
use serde::{Deserialize, Serialize};

/// Smallest modifier an advisor can apply
pub const MIN_MODIFIER: f32 = 0.8;
/// Largest modifier an advisor can apply
pub const MAX_MODIFIER: f32 = 1.2;

/// Suggestion returned by an advisor for one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Advice {
    /// Palette saturation multiplier
    pub saturation_mod: Option<f32>,
    /// Master/zone brightness multiplier
    pub brightness_mod: Option<f32>,
    /// Strobe intensity multiplier
    pub strobe_intensity_mod: Option<f32>,
    /// Flash intensity multiplier
    pub flash_intensity_mod: Option<f32>,
    /// Advisor confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Effect the advisor would like to see
    pub suggested_effect: Option<EffectConfig>,
}

/// External advisory capability consulted once per frame
pub trait Advisor: Send {
    /// Advice for the current state, `None` to abstain
    fn consult(&mut self, state: &StabilizedState) -> Option<Advice>;
}

/// Advisory gating thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Confidence needed for color modifiers
    pub color_confidence: f32,
    /// Confidence needed for effect modifiers and suggestions
    pub effect_confidence: f32,
    /// Smoothed energy at which strobe/flash advice is vetoed
    pub veto_energy: f32,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            color_confidence: 0.5,
            effect_confidence: 0.6,
            veto_energy: 0.85,
        }
    }
}

/// Advice after gating, clamping and veto
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedAdvice {
    /// Saturation multiplier
    pub saturation: f32,
    /// Brightness multiplier
    pub brightness: f32,
    /// Per-category effect gains
    pub gains: EffectGains,
    /// Suggestion that survived gating
    pub suggested_effect: Option<EffectConfig>,
    /// Some advice was vetoed by the energy guard
    pub vetoed: bool,
}

impl Default for AppliedAdvice {
    fn default() -> Self {
        Self {
            saturation: 1.0,
            brightness: 1.0,
            gains: EffectGains::default(),
            suggested_effect: None,
            vetoed: false,
        }
    }
}

fn modifier(value: Option<f32>) -> f32 {
    match value {
        Some(v) if v.is_finite() => v.clamp(MIN_MODIFIER, MAX_MODIFIER),
        _ => 1.0,
    }
}

/// Gate advice against the current state
pub fn fold_advice(
    advice: Option<&Advice>,
    state: &StabilizedState,
    config: &AdvisoryConfig,
) -> AppliedAdvice {
    let mut applied = AppliedAdvice::default();
    let Some(advice) = advice else {
        return applied;
    };
    if !advice.confidence.is_finite() {
        return applied;
    }

    if advice.confidence >= config.color_confidence {
        applied.saturation = modifier(advice.saturation_mod);
        applied.brightness = modifier(advice.brightness_mod);
    }

    if advice.confidence >= config.effect_confidence {
        let physics_advice = advice.strobe_intensity_mod.is_some()
            || advice.flash_intensity_mod.is_some()
            || advice.suggested_effect.is_some();
        if state.smoothed_energy >= config.veto_energy {
            applied.vetoed = physics_advice;
        } else {
            applied.gains = EffectGains {
                strobe: modifier(advice.strobe_intensity_mod),
                flash: modifier(advice.flash_intensity_mod),
            };
            applied.suggested_effect = advice.suggested_effect.clone();
        }
    }

    applied
}

/// Advisor that always returns the same advice
#[derive(Debug, Clone, Default)]
pub struct StaticAdvisor {
    advice: Option<Advice>,
}

impl StaticAdvisor {
    /// Advisor returning `advice` every frame
    pub fn new(advice: Advice) -> Self {
        Self {
            advice: Some(advice),
        }
    }

    /// Advisor that always abstains
    pub fn silent() -> Self {
        Self::default()
    }
}

impl Advisor for StaticAdvisor {
    fn consult(&mut self, _state: &StabilizedState) -> Option<Advice> {
        self.advice.clone()
    }
}
