use lightflow_core::movement::patterns::{self, PATTERNS};
use lightflow_core::movement::{MovementConfig, MovementInput, DMX_UNITS_PER_NORMALIZED};
use lightflow_core::{
    AudioMetrics, Choreographer, ConstitutionRegistry, Engine, Gearbox, MusicalContext,
};
use std::f32::consts::TAU;

const FRAME_MS: f64 = 1000.0 / 60.0;

/// Path length of one cycle in DMX units, sampled finely
fn cycle_path_dmx(spec: &patterns::PatternSpec, amplitude: f32, metrics: &AudioMetrics) -> f32 {
    const STEPS: usize = 2048;
    let mut length = 0.0;
    let mut last = spec.sample(0.0, 0.0, metrics, 0, 1) * amplitude;
    for step in 1..=STEPS {
        let theta = TAU * step as f32 / STEPS as f32;
        let point = spec.sample(0.0, theta, metrics, 0, 1) * amplitude;
        length += point.distance(last);
        last = point;
    }
    length * DMX_UNITS_PER_NORMALIZED
}

#[test]
fn test_gearbox_never_exceeds_budget() {
    let gearbox = Gearbox::default();
    let registry = ConstitutionRegistry::with_builtins();
    let metrics = AudioMetrics {
        high: 1.0,
        ..AudioMetrics::default()
    };

    for id in registry.ids() {
        let profile = &registry.resolve(id).movement;
        for bpm in 60..=200 {
            let spb = gearbox.seconds_per_beat(bpm as f32);
            for spec in PATTERNS.iter() {
                for energy in [0.0, 0.5, 1.0] {
                    let governed = gearbox.govern(spec, profile, energy, spb);
                    let velocity = profile.physics.max_velocity.min(gearbox.hardware_max_speed());
                    let budget = velocity * spb * spec.period_beats;

                    assert!(governed.amplitude >= 0.0 && governed.amplitude <= 1.0);
                    assert!(governed.speed >= 0.0 && governed.speed <= 1.0);
                    assert!(
                        spec.travel_per_cycle * governed.amplitude * DMX_UNITS_PER_NORMALIZED
                            <= budget * 1.0001,
                        "{} / {} at {} BPM exceeds budget",
                        id,
                        spec.id,
                        bpm
                    );
                    let path = cycle_path_dmx(spec, governed.amplitude, &metrics);
                    assert!(
                        path <= budget * 1.001,
                        "{} / {} at {} BPM travels {:.1} > {:.1}",
                        id,
                        spec.id,
                        bpm,
                        path,
                        budget
                    );
                }
            }
        }
    }
}

#[test]
fn test_slow_hardware_shrinks_amplitude() {
    let fast = Gearbox::default();
    let slow = Gearbox::new(&MovementConfig {
        hardware_max_speed: 60.0,
        ..MovementConfig::default()
    });
    let registry = ConstitutionRegistry::with_builtins();
    let profile = &registry.resolve("techno-club").movement;
    let spec = patterns::get("ballyhoo").unwrap();

    let spb = fast.seconds_per_beat(180.0);
    let a = fast.govern(spec, profile, 1.0, spb);
    let b = slow.govern(spec, profile, 1.0, spb);
    assert!(b.amplitude < a.amplitude);
    assert!(b.reduction < 1.0);
}

#[test]
fn test_scenario_c_zero_bpm_brakes() {
    let mut engine = Engine::default();
    let metrics = AudioMetrics {
        bass: 0.5,
        mid: 0.5,
        high: 0.5,
        energy: 0.5,
        ..AudioMetrics::default()
    };

    for bpm in [0.0, -120.0, f32::NAN, f32::INFINITY] {
        let context = MusicalContext {
            bpm,
            energy: 0.7,
            ..MusicalContext::new("pop-rock")
        };
        let out = engine.update(&context, &metrics, FRAME_MS);
        let movement = &out.intent.movement;
        assert!(out.intent.is_finite(), "non-finite output at bpm {}", bpm);
        assert_eq!(movement.x, 0.0);
        assert_eq!(movement.y, 0.0);
        assert_eq!(movement.amplitude, 0.0);
        assert_eq!(movement.speed, 0.0);
        assert!(!movement.beat_sync);
        assert_eq!(engine.context().choreographer().beats(), 0.0);

        let json: serde_json::Value = serde_json::to_value(&out.intent).unwrap();
        assert_eq!(json["movement"]["pattern"], "brake");
    }

    // Recovers as soon as a usable tempo arrives
    let context = MusicalContext {
        bpm: 128.0,
        energy: 0.7,
        ..MusicalContext::new("pop-rock")
    };
    let out = engine.update(&context, &metrics, FRAME_MS);
    assert!(out.intent.movement.beat_sync);
    assert!(engine.context().choreographer().beats() > 0.0);
}

#[test]
fn test_pattern_rotates_per_phrase() {
    let registry = ConstitutionRegistry::with_builtins();
    let profile = &registry.resolve("default").movement;
    let mut choreographer = Choreographer::new(MovementConfig::default(), 60.0);
    let metrics = AudioMetrics::default();

    let mut seen = Vec::new();
    // 120 BPM: one phrase of 8 bars lasts 16 s
    for _ in 0..(60 * 50) {
        let intent = choreographer.update(
            MovementInput {
                bpm: 120.0,
                energy: 0.8,
                smoothed_energy: 0.8,
                metrics: &metrics,
                delta_ms: FRAME_MS,
            },
            profile,
        );
        if seen.last() != Some(&intent.pattern) {
            seen.push(intent.pattern.clone());
        }
    }
    assert_eq!(seen, vec!["circle", "figure8", "sweep", "circle"]);
}

#[test]
fn test_quiet_music_uses_calm_pattern() {
    let registry = ConstitutionRegistry::with_builtins();
    let profile = &registry.resolve("techno-club").movement;
    let mut choreographer = Choreographer::new(MovementConfig::default(), 60.0);
    let metrics = AudioMetrics::default();

    let mut last = None;
    for _ in 0..300 {
        last = Some(choreographer.update(
            MovementInput {
                bpm: 125.0,
                energy: 0.05,
                smoothed_energy: 0.05,
                metrics: &metrics,
                delta_ms: FRAME_MS,
            },
            profile,
        ));
    }
    let intent = last.unwrap();
    assert_eq!(intent.pattern, profile.calm_pattern);
    assert!(intent.x.abs() <= 1.0 && intent.y.abs() <= 1.0);
}
