//! Effect arbiter - trigger validation, lifecycle and blending

use super::combine::{combine, CombinedEffectOutput};
use super::library::EffectRegistry;
use super::shield::{Shield, ShieldVerdict};
use super::{
    EffectCategory, EffectConfig, EffectConstraints, EffectError, EffectGains, EffectHandle,
    LightEffect,
};
use crate::constitution::Constitution;
use crate::context::sanitize_unit;
use crate::events::EngineEvent;
use crate::intent::ActiveEffectSummary;
use tracing::debug;

/// Result of a permitted-or-refused trigger
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// The effect is running under this handle
    Active(EffectHandle),
    /// The shield refused the effect
    Blocked(String),
}

impl TriggerOutcome {
    /// Handle of the running instance, if any
    pub fn handle(&self) -> Option<EffectHandle> {
        match self {
            TriggerOutcome::Active(handle) => Some(*handle),
            TriggerOutcome::Blocked(_) => None,
        }
    }
}

struct EffectInstance {
    handle: EffectHandle,
    effect_type: String,
    category: EffectCategory,
    effect: Box<dyn LightEffect>,
    constraints: Option<EffectConstraints>,
}

/// Owner of every live effect instance
pub struct EffectArbiter {
    registry: EffectRegistry,
    shield: Shield,
    instances: Vec<EffectInstance>,
    next_handle: u64,
    events: Vec<EngineEvent>,
}

impl std::fmt::Debug for EffectArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectArbiter")
            .field("registry", &self.registry)
            .field("shield", &self.shield)
            .field("active", &self.active_count())
            .field("next_handle", &self.next_handle)
            .finish()
    }
}

impl Default for EffectArbiter {
    fn default() -> Self {
        Self::new(EffectRegistry::with_builtins(), Shield::new())
    }
}

impl EffectArbiter {
    /// Create an arbiter
    pub fn new(registry: EffectRegistry, shield: Shield) -> Self {
        Self {
            registry,
            shield,
            instances: Vec::new(),
            next_handle: 1,
            events: Vec::new(),
        }
    }

    /// Effect type registry
    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    /// Mutable registry, for adding types
    pub fn registry_mut(&mut self) -> &mut EffectRegistry {
        &mut self.registry
    }

    /// Permission policy
    pub fn shield(&self) -> &Shield {
        &self.shield
    }

    /// Mutable permission policy
    pub fn shield_mut(&mut self) -> &mut Shield {
        &mut self.shield
    }

    /// Validate and start an effect.
    ///
    /// Unknown types are an error; shield refusals are an `Ok(Blocked)` outcome and leave
    /// the live set untouched.
    pub fn trigger(
        &mut self,
        config: &EffectConfig,
        constitution: &Constitution,
    ) -> Result<TriggerOutcome, EffectError> {
        let mut effect = self
            .registry
            .create(&config.effect_type)
            .ok_or_else(|| EffectError::UnknownType(config.effect_type.clone()))?;
        let category = effect.category();

        let constraints = match self.shield.evaluate(category, constitution) {
            ShieldVerdict::Blocked(reason) => {
                debug!("Effect '{}' blocked: {}", config.effect_type, reason);
                self.events.push(EngineEvent::EffectBlocked {
                    effect_type: config.effect_type.clone(),
                    reason: reason.clone(),
                });
                return Ok(TriggerOutcome::Blocked(reason));
            }
            ShieldVerdict::Degraded(constraints) => Some(constraints),
            ShieldVerdict::Allowed => None,
        };

        if config.replace_existing {
            let existing: Vec<EffectHandle> = self
                .instances
                .iter()
                .filter(|i| i.effect_type == config.effect_type)
                .map(|i| i.handle)
                .collect();
            for handle in existing {
                self.abort(handle);
            }
        }

        effect.trigger(config);
        if let (Some(c), Some(target)) = (constraints.as_ref(), effect.as_constrainable()) {
            target.set_constraints(c);
        }

        let handle = EffectHandle(self.next_handle);
        self.next_handle += 1;
        debug!("Effect '{}' triggered as {}", config.effect_type, handle);
        self.events.push(EngineEvent::EffectTriggered {
            handle,
            effect_type: config.effect_type.clone(),
        });
        if constraints.is_some() {
            self.events.push(EngineEvent::EffectDegraded {
                handle,
                effect_type: config.effect_type.clone(),
            });
        }

        self.instances.push(EffectInstance {
            handle,
            effect_type: config.effect_type.clone(),
            category,
            effect,
            constraints,
        });
        Ok(TriggerOutcome::Active(handle))
    }

    /// Advance every instance and retire the finished ones
    pub fn update(&mut self, delta_ms: f64) {
        for instance in &mut self.instances {
            instance.effect.update(delta_ms);
        }
        let events = &mut self.events;
        self.instances.retain(|instance| {
            if instance.effect.is_finished() {
                debug!("Effect '{}' {} finished", instance.effect_type, instance.handle);
                events.push(EngineEvent::EffectFinished {
                    handle: instance.handle,
                    effect_type: instance.effect_type.clone(),
                });
                false
            } else {
                true
            }
        });
    }

    /// Stop one instance; false if the handle is not live
    pub fn abort(&mut self, handle: EffectHandle) -> bool {
        let Some(pos) = self.instances.iter().position(|i| i.handle == handle) else {
            return false;
        };
        let mut instance = self.instances.remove(pos);
        instance.effect.abort();
        debug!("Effect '{}' {} aborted", instance.effect_type, handle);
        self.events.push(EngineEvent::EffectAborted {
            handle,
            effect_type: instance.effect_type,
        });
        true
    }

    /// Stop every instance
    pub fn abort_all(&mut self) {
        let handles: Vec<EffectHandle> = self.instances.iter().map(|i| i.handle).collect();
        for handle in handles {
            self.abort(handle);
        }
    }

    /// Drop every instance and pending event without emitting anything
    pub fn reset(&mut self) {
        self.instances.clear();
        self.events.clear();
    }

    /// Number of live instances
    pub fn active_count(&self) -> usize {
        self.instances.len()
    }

    /// Whether `handle` is live
    pub fn is_active(&self, handle: EffectHandle) -> bool {
        self.instances.iter().any(|i| i.handle == handle)
    }

    /// Whether any instance of `effect_type` is live
    pub fn is_type_active(&self, effect_type: &str) -> bool {
        self.instances.iter().any(|i| i.effect_type == effect_type)
    }

    /// Summaries of the live instances in trigger order
    pub fn summaries(&self) -> Vec<ActiveEffectSummary> {
        self.instances
            .iter()
            .map(|i| ActiveEffectSummary {
                handle: i.handle,
                effect_type: i.effect_type.clone(),
                category: i.category,
                priority: i.effect.priority(),
                degraded: i.constraints.is_some(),
            })
            .collect()
    }

    /// Take the events accumulated since the last call
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Blend the live instances: gains first, then shield caps, then a `[0, 1]` clamp
    pub fn combined_output(&self, gains: &EffectGains) -> CombinedEffectOutput {
        let frames: Vec<_> = self
            .instances
            .iter()
            .filter_map(|instance| {
                let mut frame = instance.effect.output()?;
                let gain = gains.for_category(instance.category);
                let gain = if gain.is_finite() { gain.max(0.0) } else { 1.0 };
                let scale = |v: Option<f32>| v.map(|v| v * gain);
                frame.dimmer = scale(frame.dimmer);
                frame.white = scale(frame.white);
                frame.amber = scale(frame.amber);
                if let Some(constraints) = &instance.constraints {
                    constraints.apply(&mut frame);
                }
                let clamp = |v: Option<f32>| v.map(|v| sanitize_unit(v, 0.0));
                frame.dimmer = clamp(frame.dimmer);
                frame.white = clamp(frame.white);
                frame.amber = clamp(frame.amber);
                frame.strobe_rate = frame
                    .strobe_rate
                    .map(|r| if r.is_finite() { r.max(0.0) } else { 0.0 });
                Some(frame)
            })
            .collect();
        combine(&frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Hsl;
    use crate::constitution::ConstitutionRegistry;

    #[test]
    fn test_unknown_type_is_error() {
        let mut arbiter = EffectArbiter::default();
        let profile = Constitution::default();
        assert_eq!(
            arbiter.trigger(&EffectConfig::new("laser"), &profile),
            Err(EffectError::UnknownType("laser".to_string()))
        );
        assert_eq!(arbiter.active_count(), 0);
    }

    #[test]
    fn test_blocked_trigger_leaves_no_instance() {
        let registry = ConstitutionRegistry::with_builtins();
        let mut arbiter = EffectArbiter::default();
        let outcome = arbiter
            .trigger(&EffectConfig::new("strobe"), registry.resolve("chill-lounge"))
            .unwrap();
        assert!(outcome.handle().is_none());
        assert_eq!(arbiter.active_count(), 0);
        assert!(matches!(
            arbiter.drain_events().as_slice(),
            [EngineEvent::EffectBlocked { .. }]
        ));
    }

    #[test]
    fn test_lifecycle_events() {
        let profile = ConstitutionRegistry::with_builtins()
            .resolve("techno-club")
            .clone();
        let mut arbiter = EffectArbiter::default();
        let handle = arbiter
            .trigger(&EffectConfig::new("flash"), &profile)
            .unwrap()
            .handle()
            .unwrap();
        assert!(arbiter.is_active(handle));
        arbiter.update(400.0);
        assert!(!arbiter.is_active(handle));
        let events = arbiter.drain_events();
        assert_eq!(
            events,
            vec![
                EngineEvent::EffectTriggered {
                    handle,
                    effect_type: "flash".to_string()
                },
                EngineEvent::EffectFinished {
                    handle,
                    effect_type: "flash".to_string()
                },
            ]
        );
        assert!(arbiter.drain_events().is_empty());
    }

    #[test]
    fn test_abort_is_idempotent() {
        let mut arbiter = EffectArbiter::default();
        let profile = Constitution::default();
        let handle = arbiter
            .trigger(&EffectConfig::new("blackout"), &profile)
            .unwrap()
            .handle()
            .unwrap();
        assert!(arbiter.abort(handle));
        assert!(!arbiter.abort(handle));
        assert_eq!(arbiter.active_count(), 0);
    }

    #[test]
    fn test_replace_existing() {
        let mut arbiter = EffectArbiter::default();
        let profile = Constitution::default();
        let first = arbiter
            .trigger(&EffectConfig::new("amber_glow"), &profile)
            .unwrap()
            .handle()
            .unwrap();
        let second = arbiter
            .trigger(&EffectConfig::new("amber_glow").replacing(), &profile)
            .unwrap()
            .handle()
            .unwrap();
        assert_ne!(first, second);
        assert!(!arbiter.is_active(first));
        assert_eq!(arbiter.active_count(), 1);
    }

    #[test]
    fn test_degraded_strobe_is_capped() {
        let mut arbiter = EffectArbiter::default();
        let profile = Constitution::default();
        arbiter
            .trigger(&EffectConfig::new("strobe").with_rate(30.0), &profile)
            .unwrap();
        let out = arbiter.combined_output(&EffectGains::default());
        assert_eq!(out.strobe_rate, Some(profile.max_strobe_rate));
        assert!(arbiter.summaries()[0].degraded);
    }

    #[test]
    fn test_gains_scale_category() {
        let registry = ConstitutionRegistry::with_builtins();
        let mut arbiter = EffectArbiter::default();
        arbiter
            .trigger(
                &EffectConfig::new("strobe").with_intensity(0.5),
                registry.resolve("techno-club"),
            )
            .unwrap();
        let gains = EffectGains {
            strobe: 1.2,
            flash: 1.0,
        };
        let out = arbiter.combined_output(&gains);
        assert!((out.dimmer.unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_scenario_priority_color() {
        let profile = Constitution::default();
        let a = EffectConfig::new("color_pulse")
            .with_intensity(0.4)
            .with_priority(1);
        let b = EffectConfig::new("color_pulse")
            .with_intensity(0.9)
            .with_priority(2)
            .with_color(Hsl::red());
        for order in [[&a, &b], [&b, &a]] {
            let mut arbiter = EffectArbiter::default();
            for config in order {
                arbiter.trigger(config, &profile).unwrap();
            }
            let out = arbiter.combined_output(&EffectGains::default());
            assert_eq!(out.dimmer, Some(0.9));
            assert_eq!(out.color_override, Some(Hsl::red()));
        }
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut arbiter = EffectArbiter::default();
        let profile = Constitution::default();
        arbiter.trigger(&EffectConfig::new("blackout"), &profile).unwrap();
        arbiter.reset();
        assert_eq!(arbiter.active_count(), 0);
        assert!(arbiter.drain_events().is_empty());
    }
}
