use lightflow_core::advisory::StaticAdvisor;
use lightflow_core::{
    Advice, AudioMetrics, ConstitutionRegistry, EffectConfig, Engine, EngineConfig, EngineContext,
    EngineEvent, FrameOutput, FrameOverrides, Mode, MusicalContext, Section, Zone,
};
use std::io::Write;

const FRAME_MS: f64 = 1000.0 / 60.0;

/// Synthetic song: verse, build, drop, breakdown
fn song_frame(i: usize, profile: &str) -> (MusicalContext, AudioMetrics) {
    let t = i as f32 / 60.0;
    let (energy, section) = match i {
        0..=599 => (0.4 + 0.05 * (t * 2.0).sin(), Section::Verse),
        600..=899 => (0.4 + 0.4 * ((i - 600) as f32 / 300.0), Section::Build),
        900..=1499 => (0.95, Section::Drop),
        _ => (0.15, Section::Breakdown),
    };
    let key = if i % 7 == 0 { "E" } else { "C#m" };
    let context = MusicalContext {
        bpm: 126.0,
        beat_phase: (t * 126.0 / 60.0).fract(),
        energy,
        key: Some(key.to_string()),
        mode: Mode::Minor,
        confidence: 0.8,
        syncopation: 0.3 + 0.2 * (t * 0.1).sin(),
        section,
        ..MusicalContext::new(profile)
    };
    let metrics = AudioMetrics {
        bass: energy,
        mid: 0.5 * energy,
        high: (0.3 + 0.3 * (t * 5.0).sin()).max(0.0),
        energy,
        is_beat: i % 28 == 0,
        beat_phase: context.beat_phase,
        ..AudioMetrics::default()
    };
    (context, metrics)
}

fn run_song(engine: &mut Engine, profile: &str, frames: usize) -> Vec<FrameOutput> {
    (0..frames)
        .map(|i| {
            let (context, metrics) = song_frame(i, profile);
            engine.update(&context, &metrics, FRAME_MS)
        })
        .collect()
}

#[test]
fn test_identical_inputs_give_identical_outputs() {
    for profile in ["default", "techno-club", "chill-lounge", "pop-rock", "latino-fiesta"] {
        let a = run_song(&mut Engine::default(), profile, 1800);
        let b = run_song(&mut Engine::default(), profile, 1800);
        assert_eq!(a, b, "{} diverged", profile);

        let json_a = serde_json::to_string(&a).unwrap();
        let json_b = serde_json::to_string(&b).unwrap();
        assert_eq!(json_a, json_b);
    }
}

#[test]
fn test_reset_replays_identically() {
    let mut engine = Engine::default();
    let first = run_song(&mut engine, "techno-club", 1000);
    engine.reset();
    let second = run_song(&mut engine, "techno-club", 1000);
    assert_eq!(first, second);
}

#[test]
fn test_engines_are_independent() {
    let mut a = Engine::default();
    let mut b = Engine::default();
    let baseline = run_song(&mut Engine::default(), "pop-rock", 300);

    // Interleave a second engine on another profile
    let mut outputs = Vec::new();
    for i in 0..300 {
        let (context, metrics) = song_frame(i, "pop-rock");
        outputs.push(a.update(&context, &metrics, FRAME_MS));
        let (context, metrics) = song_frame(i, "chill-lounge");
        b.update(&context, &metrics, FRAME_MS);
        b.trigger_effect(&EffectConfig::new("amber_glow")).unwrap();
    }
    assert_eq!(outputs, baseline);
}

#[test]
fn test_song_reaches_drop_and_breakdown() {
    let outputs = run_song(&mut Engine::default(), "techno-club", 1800);
    let events: Vec<&EngineEvent> = outputs.iter().flat_map(|o| o.events.iter()).collect();
    assert!(events.contains(&&EngineEvent::DropStarted));
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::EffectTriggered { effect_type, .. } if effect_type == "strobe"
    )));
    // Strobes while the drop effect runs
    assert!(outputs.iter().any(|o| o.intent.strobe_rate.is_some()));
}

#[test]
fn test_garbage_inputs_stay_finite() {
    let mut engine = Engine::default();
    let garbage = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, -1.0, 42.0];
    for (i, value) in garbage.iter().cycle().take(200).enumerate() {
        let context = MusicalContext {
            bpm: *value,
            beat_phase: *value,
            energy: *value,
            key: Some(if i % 3 == 0 { "H#" } else { "" }.to_string()),
            confidence: *value,
            syncopation: *value,
            ..MusicalContext::new("latino-fiesta")
        };
        let metrics = AudioMetrics {
            bass: *value,
            mid: *value,
            high: *value,
            energy: *value,
            beat_phase: *value,
            spectral_centroid: Some(*value),
            spectral_flux: Some(*value),
            ..AudioMetrics::default()
        };
        let delta = [f64::NAN, -5.0, f64::INFINITY, 1e9, FRAME_MS][i % 5];
        let out = engine.update(&context, &metrics, delta);
        assert!(out.intent.is_finite(), "frame {} produced non-finite output", i);
        assert!((0.0..=1.0).contains(&out.intent.master_intensity));
        assert!(out.intent.timestamp_ms.is_finite());
    }
}

#[test]
fn test_clock_caps_long_gaps() {
    let mut engine = Engine::default();
    let (context, metrics) = song_frame(0, "default");
    engine.update(&context, &metrics, 60_000.0);
    assert_eq!(engine.clock_ms(), 1000.0);
}

#[test]
fn test_operator_blackout_beats_effects() {
    let mut engine = Engine::default();
    let (context, metrics) = song_frame(0, "default");
    engine.update(&context, &metrics, FRAME_MS);
    engine.trigger_effect(&EffectConfig::new("strobe")).unwrap();

    let blackout = FrameOverrides {
        blackout: true,
        ..FrameOverrides::default()
    };
    let out = engine.update_with_overrides(&context, &metrics, &blackout, FRAME_MS);
    assert_eq!(out.intent.master_intensity, 0.0);
    for zone in Zone::ALL {
        assert_eq!(out.intent.zone_intensity(zone), 0.0);
    }
    assert_eq!(out.intent.strobe_rate, None);
    assert_eq!(out.intent.white, Some(0.0));
}

#[test]
fn test_blackout_effect_overrides_everything() {
    let mut engine = Engine::default();
    let (context, metrics) = song_frame(950, "pop-rock");
    engine.update(&context, &metrics, FRAME_MS);
    engine.trigger_effect(&EffectConfig::new("flash")).unwrap();
    engine.trigger_effect(&EffectConfig::new("blackout")).unwrap();

    let out = engine.update(&context, &metrics, FRAME_MS);
    assert_eq!(out.intent.master_intensity, 0.0);
    assert!(out.intent.zones.values().all(|z| z.intensity == 0.0));
}

#[test]
fn test_master_cap_limits_master_and_zones() {
    let mut engine = Engine::default();
    let cap = FrameOverrides {
        master_cap: Some(0.3),
        ..FrameOverrides::default()
    };
    for i in 0..300 {
        let (context, metrics) = song_frame(900 + i, "techno-club");
        let out = engine.update_with_overrides(&context, &metrics, &cap, FRAME_MS);
        assert!(out.intent.master_intensity <= 0.3);
        assert!(out.intent.zones.values().all(|z| z.intensity <= 0.3));
    }
}

#[test]
fn test_zone_mix_follows_bands() {
    let mut engine = Engine::default();
    let context = MusicalContext {
        bpm: 120.0,
        energy: 0.5,
        ..MusicalContext::new("default")
    };
    let bass_heavy = AudioMetrics {
        bass: 1.0,
        energy: 0.5,
        ..AudioMetrics::default()
    };
    let out = engine.update(&context, &bass_heavy, FRAME_MS);
    let front = out.intent.zone_intensity(Zone::Front);
    let back = out.intent.zone_intensity(Zone::Back);
    let movers = out.intent.zone_intensity(Zone::Movers);
    assert!((front - 0.6).abs() < 1e-5);
    assert!(front > back && back > movers);
}

#[test]
fn test_advisory_modifiers_and_veto() {
    let advice = Advice {
        brightness_mod: Some(0.8),
        confidence: 0.9,
        suggested_effect: Some(EffectConfig::new("strobe")),
        ..Advice::default()
    };

    // Calm music: the suggestion goes through
    let ctx = EngineContext::default().with_advisor(Box::new(StaticAdvisor::new(advice.clone())));
    let mut engine = Engine::new(ctx);
    let calm = MusicalContext {
        bpm: 120.0,
        energy: 0.3,
        ..MusicalContext::new("techno-club")
    };
    let out = engine.update(&calm, &AudioMetrics::default(), FRAME_MS);
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, EngineEvent::EffectTriggered { effect_type, .. } if effect_type == "strobe")));

    // Sustained high energy: the physics advice is vetoed
    let ctx = EngineContext::default().with_advisor(Box::new(StaticAdvisor::new(advice)));
    let mut engine = Engine::new(ctx);
    let loud = MusicalContext {
        bpm: 120.0,
        energy: 1.0,
        ..MusicalContext::new("techno-club")
    };
    let metrics = AudioMetrics {
        energy: 1.0,
        ..AudioMetrics::default()
    };
    let mut strobes = 0;
    for i in 0..400 {
        let out = engine.update(&loud, &metrics, FRAME_MS);
        if i >= 200 {
            strobes += out
                .events
                .iter()
                .filter(|e| matches!(e, EngineEvent::EffectTriggered { .. }))
                .count();
        }
    }
    assert!(engine.stabilized_state().smoothed_energy >= 0.85);
    assert_eq!(strobes, 0);
}

#[test]
fn test_advisory_dims_master() {
    let dim = Advice {
        brightness_mod: Some(0.5),
        confidence: 1.0,
        ..Advice::default()
    };
    let mut plain = Engine::default();
    let mut advised =
        Engine::new(EngineContext::default().with_advisor(Box::new(StaticAdvisor::new(dim))));
    let (context, metrics) = song_frame(0, "pop-rock");
    let a = plain.update(&context, &metrics, FRAME_MS);
    let b = advised.update(&context, &metrics, FRAME_MS);
    assert!(b.intent.master_intensity < a.intent.master_intensity);
    // Clamped to 0.8, not 0.5
    assert!(b.intent.master_intensity > 0.5 * a.intent.master_intensity);
}

#[test]
fn test_custom_profiles_load_into_engine() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        br#"
[[profiles]]
id = "museum"
name = "Museum"
elastic_rotation_step = 30.0
forbidden_ranges = [{ start = 0.0, end = 180.0 }]
dimming = { min = 0.0, max = 0.2 }
allowed_effects = ["ambient"]
allow_dynamic_effects = false
drop_effect = "amber_glow"
"#,
    )
    .unwrap();

    let mut registry = ConstitutionRegistry::with_builtins();
    assert_eq!(registry.load_profiles(file.path()).unwrap(), 1);

    let mut engine =
        Engine::new(EngineContext::new(EngineConfig::default()).unwrap().with_constitutions(registry));
    let context = MusicalContext {
        bpm: 100.0,
        key: Some("G".to_string()),
        energy: 1.0,
        ..MusicalContext::new("museum")
    };
    let metrics = AudioMetrics {
        bass: 1.0,
        mid: 1.0,
        high: 1.0,
        energy: 1.0,
        ..AudioMetrics::default()
    };
    let out = engine.update(&context, &metrics, FRAME_MS);
    assert_eq!(engine.active_profile(), Some("museum"));
    assert!(out.intent.master_intensity <= 0.2);
    for color in out.intent.palette.colors() {
        assert!(color.h > 180.0);
    }
    assert!(engine
        .trigger_effect(&EffectConfig::new("strobe"))
        .unwrap()
        .handle()
        .is_none());
}
