use lightflow_core::effects::{combine, EffectGains};
use lightflow_core::{
    AudioMetrics, ConstitutionRegistry, EffectArbiter, EffectCategory, EffectConfig, EffectFrame,
    Engine, EngineEvent, Hsl, LightEffect, MusicalContext, Shield, ShieldVerdict, TriggerOutcome,
};
use proptest::prelude::*;

const FRAME_MS: f64 = 1000.0 / 60.0;

/// Holds a fixed dimmer/color until aborted
#[derive(Default)]
struct HoldEffect {
    frame: EffectFrame,
    finished: bool,
}

impl LightEffect for HoldEffect {
    fn trigger(&mut self, config: &EffectConfig) {
        self.frame = EffectFrame {
            dimmer: Some(config.intensity),
            color: config.color,
            priority: config.priority.unwrap_or(0),
            ..EffectFrame::default()
        };
    }

    fn update(&mut self, _delta_ms: f64) {}

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn abort(&mut self) {
        self.finished = true;
    }

    fn output(&self) -> Option<EffectFrame> {
        (!self.finished).then_some(self.frame)
    }

    fn priority(&self) -> u8 {
        self.frame.priority
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Pulse
    }
}

fn arbiter_with_hold() -> EffectArbiter {
    let mut arbiter = EffectArbiter::default();
    arbiter
        .registry_mut()
        .register("hold", || Box::new(HoldEffect::default()));
    arbiter
}

#[test]
fn test_scenario_b_chill_lounge_blocks_dynamic_effects() {
    let mut engine = Engine::default();
    engine.update(
        &MusicalContext::new("chill-lounge"),
        &AudioMetrics::default(),
        FRAME_MS,
    );
    let before = engine.context().effects().active_count();

    for effect_type in ["strobe", "flash", "chase"] {
        let outcome = engine.trigger_effect(&EffectConfig::new(effect_type)).unwrap();
        assert!(matches!(outcome, TriggerOutcome::Blocked(_)));
        assert_eq!(outcome.handle(), None);
        assert_eq!(engine.context().effects().active_count(), before);
    }

    let out = engine.update(
        &MusicalContext::new("chill-lounge"),
        &AudioMetrics::default(),
        FRAME_MS,
    );
    let blocked = out
        .events
        .iter()
        .filter(|e| matches!(e, EngineEvent::EffectBlocked { .. }))
        .count();
    assert_eq!(blocked, 3);
    assert!(out.intent.effects.is_empty());
    assert_eq!(out.intent.strobe_rate, None);
}

#[test]
fn test_chill_lounge_still_allows_pulse() {
    let registry = ConstitutionRegistry::with_builtins();
    let chill = registry.resolve("chill-lounge");
    let mut arbiter = EffectArbiter::default();

    let outcome = arbiter
        .trigger(&EffectConfig::new("color_pulse"), chill)
        .unwrap();
    assert!(outcome.handle().is_some());
    arbiter.update(FRAME_MS);
    // Capped by the profile's effect intensity ceiling
    let dimmer = arbiter.combined_output(&EffectGains::default()).dimmer.unwrap();
    assert!(dimmer <= chill.max_effect_intensity + 1e-6);
}

#[test]
fn test_scenario_d_priority_and_htp_are_order_independent() {
    let registry = ConstitutionRegistry::with_builtins();
    let profile = registry.resolve("default");
    let a = EffectConfig::new("hold")
        .with_intensity(0.4)
        .with_priority(1);
    let b = EffectConfig::new("hold")
        .with_intensity(0.9)
        .with_priority(2)
        .with_color(Hsl::red());

    for order in [[&a, &b], [&b, &a]] {
        let mut arbiter = arbiter_with_hold();
        for config in order {
            assert!(arbiter.trigger(config, profile).unwrap().handle().is_some());
        }
        let combined = arbiter.combined_output(&EffectGains::default());
        assert_eq!(combined.dimmer, Some(0.9));
        assert_eq!(combined.color_override, Some(Hsl::red()));
    }
}

#[test]
fn test_shield_policy_table_overrides_profile() {
    let registry = ConstitutionRegistry::with_builtins();
    let techno = registry.resolve("techno-club");
    let shield = Shield::new().with_rule(
        "techno-club",
        EffectCategory::Flash,
        ShieldVerdict::Blocked("house rule".to_string()),
    );
    let mut arbiter = EffectArbiter::new(lightflow_core::EffectRegistry::with_builtins(), shield);

    let flash = arbiter.trigger(&EffectConfig::new("flash"), techno).unwrap();
    assert_eq!(flash, TriggerOutcome::Blocked("house rule".to_string()));
    let strobe = arbiter.trigger(&EffectConfig::new("strobe"), techno).unwrap();
    assert!(strobe.handle().is_some());
    assert_eq!(arbiter.active_count(), 1);
}

#[test]
fn test_limited_strobe_is_rate_capped() {
    let registry = ConstitutionRegistry::with_builtins();
    let pop = registry.resolve("pop-rock");
    let mut arbiter = EffectArbiter::default();
    arbiter
        .trigger(&EffectConfig::new("strobe").with_rate(30.0), pop)
        .unwrap();
    arbiter.update(FRAME_MS);

    let combined = arbiter.combined_output(&EffectGains::default());
    assert!(combined.strobe_rate.unwrap() <= pop.max_strobe_rate);
    assert!(arbiter
        .drain_events()
        .iter()
        .any(|e| matches!(e, EngineEvent::EffectDegraded { .. })));
}

#[test]
fn test_abort_is_idempotent() {
    let registry = ConstitutionRegistry::with_builtins();
    let mut arbiter = EffectArbiter::default();
    let handle = arbiter
        .trigger(&EffectConfig::new("amber_glow"), registry.resolve("default"))
        .unwrap()
        .handle()
        .unwrap();

    assert!(arbiter.abort(handle));
    assert!(!arbiter.abort(handle));
    assert_eq!(arbiter.active_count(), 0);
    let aborted = arbiter
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::EffectAborted { .. }))
        .count();
    assert_eq!(aborted, 1);
}

#[test]
fn test_profile_change_aborts_effects() {
    let mut engine = Engine::default();
    let metrics = AudioMetrics::default();
    engine.update(&MusicalContext::new("techno-club"), &metrics, FRAME_MS);
    engine
        .trigger_effect(&EffectConfig::new("amber_glow"))
        .unwrap();
    assert_eq!(engine.context().effects().active_count(), 1);

    let out = engine.update(&MusicalContext::new("latino-fiesta"), &metrics, FRAME_MS);
    assert_eq!(engine.context().effects().active_count(), 0);
    assert!(out.events.contains(&EngineEvent::ProfileChanged {
        from: Some("techno-club".to_string()),
        to: "latino-fiesta".to_string(),
    }));
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, EngineEvent::EffectAborted { .. })));
}

fn unit() -> impl Strategy<Value = Option<f32>> {
    proptest::option::of(0.0f32..=1.0)
}

prop_compose! {
    fn effect_frame()(
        dimmer in unit(),
        white in unit(),
        amber in unit(),
        strobe_rate in proptest::option::of(0.0f32..25.0),
        hue in proptest::option::of(0.0f32..360.0),
        priority in 0u8..4,
        global_override in proptest::bool::weighted(0.2),
    ) -> EffectFrame {
        EffectFrame {
            dimmer,
            white,
            amber,
            strobe_rate,
            color: hue.map(|h| Hsl::new(h, 1.0, 0.5)),
            priority,
            global_override,
        }
    }
}

proptest! {
    #[test]
    fn combine_is_order_independent(
        frames in proptest::collection::vec(effect_frame(), 0..6),
        seed in any::<u64>(),
    ) {
        let expected = combine(&frames);

        let mut reversed = frames.clone();
        reversed.reverse();
        prop_assert_eq!(combine(&reversed), expected);

        // Deterministic shuffle driven by the seed
        let mut shuffled = frames.clone();
        let mut state = seed;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }
        prop_assert_eq!(combine(&shuffled), expected);
    }

    #[test]
    fn combined_dimmer_is_the_highest(frames in proptest::collection::vec(effect_frame(), 1..6)) {
        let highest = frames.iter().filter_map(|f| f.dimmer).fold(None, |acc: Option<f32>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        });
        prop_assert_eq!(combine(&frames).dimmer, highest);
    }
}
