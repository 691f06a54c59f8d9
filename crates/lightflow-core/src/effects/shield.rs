//! Shield - effect permission policy.
//!
//! Rule order, first match wins:
//!
//! 1. explicit policy table entry for (profile id, category)
//! 2. category missing from the constitution's allowed effects -> blocked
//! 3. dynamic category while dynamic effects are disabled -> blocked
//! 4. strobe category under a forbidden strobe policy -> blocked
//! 5. limited strobe policy or an intensity cap below 1 -> degraded
//! 6. allowed

use super::{EffectCategory, EffectConstraints};
use crate::constitution::{Constitution, StrobePolicy};
use std::collections::HashMap;

/// Outcome of a permission check
#[derive(Debug, Clone, PartialEq)]
pub enum ShieldVerdict {
    /// The effect must not run
    Blocked(String),
    /// The effect may run under these caps
    Degraded(EffectConstraints),
    /// The effect may run unrestricted
    Allowed,
}

impl ShieldVerdict {
    /// Whether the verdict blocks the effect
    pub fn is_blocked(&self) -> bool {
        matches!(self, ShieldVerdict::Blocked(_))
    }
}

/// Permission policy with optional per-profile overrides
#[derive(Debug, Clone, Default)]
pub struct Shield {
    rules: HashMap<String, HashMap<EffectCategory, ShieldVerdict>>,
}

impl Shield {
    /// Shield with no explicit rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the verdict for `category` under `profile_id`
    pub fn set_rule(
        &mut self,
        profile_id: impl Into<String>,
        category: EffectCategory,
        verdict: ShieldVerdict,
    ) {
        self.rules
            .entry(profile_id.into())
            .or_default()
            .insert(category, verdict);
    }

    /// Builder form of [`Shield::set_rule`]
    pub fn with_rule(
        mut self,
        profile_id: impl Into<String>,
        category: EffectCategory,
        verdict: ShieldVerdict,
    ) -> Self {
        self.set_rule(profile_id, category, verdict);
        self
    }

    /// Decide whether `category` may run under `constitution`
    pub fn evaluate(&self, category: EffectCategory, constitution: &Constitution) -> ShieldVerdict {
        if let Some(verdict) = self
            .rules
            .get(&constitution.id)
            .and_then(|table| table.get(&category))
        {
            return verdict.clone();
        }

        if !constitution.allows_category(category) {
            return ShieldVerdict::Blocked(format!(
                "{:?} is not permitted by profile '{}'",
                category, constitution.id
            ));
        }

        if category.is_dynamic() && !constitution.allow_dynamic_effects {
            return ShieldVerdict::Blocked(format!(
                "profile '{}' forbids dynamic effects",
                constitution.id
            ));
        }

        if category.requires_strobe() && constitution.strobe_policy == StrobePolicy::Forbidden {
            return ShieldVerdict::Blocked(format!(
                "profile '{}' forbids strobing",
                constitution.id
            ));
        }

        let max_strobe_rate = (category.requires_strobe()
            && constitution.strobe_policy == StrobePolicy::Limited)
            .then(|| constitution.max_strobe_rate.max(0.0));
        let max_intensity = constitution.max_effect_intensity.clamp(0.0, 1.0);

        if max_strobe_rate.is_some() || max_intensity < 1.0 {
            ShieldVerdict::Degraded(EffectConstraints {
                max_strobe_rate,
                max_intensity,
            })
        } else {
            ShieldVerdict::Allowed
        }
    }
}
