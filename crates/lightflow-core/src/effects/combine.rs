//! HTP blending of effect frames.
//!
//! Every rule here is commutative, so the result never depends on trigger order:
//! levels take the maximum, the color comes from the highest priority (ties broken by
//! the total order on HSL), and a global override takes the intensity of the
//! highest-priority overriding frame (ties: the lowest intensity).

use super::EffectFrame;
use crate::color::Hsl;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Blended output of every live effect
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinedEffectOutput {
    /// Highest dimmer level
    pub dimmer: Option<f32>,
    /// Highest white level
    pub white: Option<f32>,
    /// Highest amber level
    pub amber: Option<f32>,
    /// Fastest strobe rate (Hz)
    pub strobe_rate: Option<f32>,
    /// Color of the highest-priority colored frame
    pub color_override: Option<Hsl>,
    /// Some frame takes over the whole rig
    pub global_override: bool,
    /// Intensity forced by the global override
    pub override_intensity: f32,
}

impl CombinedEffectOutput {
    /// Whether no effect contributes anything
    pub fn is_empty(&self) -> bool {
        self.dimmer.is_none()
            && self.white.is_none()
            && self.amber.is_none()
            && self.strobe_rate.is_none()
            && self.color_override.is_none()
            && !self.global_override
    }
}

fn htp(current: Option<f32>, candidate: Option<f32>) -> Option<f32> {
    match (current, candidate.filter(|v| v.is_finite())) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Blend frames; the result is independent of their order
pub fn combine(frames: &[EffectFrame]) -> CombinedEffectOutput {
    let mut out = CombinedEffectOutput::default();
    let mut color: Option<(u8, Hsl)> = None;
    let mut overriding: Option<(u8, f32)> = None;

    for frame in frames {
        out.dimmer = htp(out.dimmer, frame.dimmer);
        out.white = htp(out.white, frame.white);
        out.amber = htp(out.amber, frame.amber);
        out.strobe_rate = htp(out.strobe_rate, frame.strobe_rate);

        if let Some(c) = frame.color.filter(Hsl::is_finite) {
            let wins = match color {
                None => true,
                Some((p, current)) => match frame.priority.cmp(&p) {
                    Ordering::Greater => true,
                    Ordering::Equal => c.total_cmp(&current) == Ordering::Greater,
                    Ordering::Less => false,
                },
            };
            if wins {
                color = Some((frame.priority, c));
            }
        }

        if frame.global_override {
            let level = frame.dimmer.filter(|v| v.is_finite()).unwrap_or(0.0);
            let wins = match overriding {
                None => true,
                Some((p, current)) => match frame.priority.cmp(&p) {
                    Ordering::Greater => true,
                    Ordering::Equal => level.total_cmp(&current) == Ordering::Less,
                    Ordering::Less => false,
                },
            };
            if wins {
                overriding = Some((frame.priority, level));
            }
        }
    }

    out.color_override = color.map(|(_, c)| c);
    if let Some((_, level)) = overriding {
        out.global_override = true;
        out.override_intensity = level.clamp(0.0, 1.0);
    }
    out
}
