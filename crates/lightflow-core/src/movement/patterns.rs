//! Pattern library.
//!
//! Every pattern is a pure function of the cycle phase angle returning a point in
//! `[-1, 1]^2` at amplitude 1. `travel_per_cycle` is an upper bound on the path length
//! of one full cycle at amplitude 1; the gearbox budgets against it.

use super::PhaseType;
use crate::context::AudioMetrics;
use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Pattern evaluator: `(elapsed_s, phase_angle, metrics, fixture_index, fixture_total)`
pub type PatternFn = fn(f32, f32, &AudioMetrics, usize, usize) -> Vec2;

/// Static description of one pattern
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    /// Pattern id
    pub id: &'static str,
    /// Beats per cycle
    pub period_beats: f32,
    /// Amplitude before profile scaling
    pub base_amplitude: f32,
    /// Upper bound on normalized path length per cycle at amplitude 1
    pub travel_per_cycle: f32,
    /// How per-fixture offsets are applied
    pub phase_type: PhaseType,
    /// Evaluator
    pub eval: PatternFn,
}

impl PatternSpec {
    /// Evaluate at a phase angle, clamped to the unit square
    pub fn sample(
        &self,
        elapsed_s: f32,
        phase_angle: f32,
        metrics: &AudioMetrics,
        fixture_index: usize,
        fixture_total: usize,
    ) -> Vec2 {
        let p = (self.eval)(elapsed_s, phase_angle, metrics, fixture_index, fixture_total);
        if p.is_finite() {
            p.clamp(Vec2::splat(-1.0), Vec2::splat(1.0))
        } else {
            Vec2::ZERO
        }
    }
}

fn circle(_elapsed: f32, theta: f32, _m: &AudioMetrics, _i: usize, _n: usize) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

fn figure8(_elapsed: f32, theta: f32, _m: &AudioMetrics, _i: usize, _n: usize) -> Vec2 {
    Vec2::new(theta.sin(), 0.5 * (2.0 * theta).sin())
}

fn sweep(_elapsed: f32, theta: f32, _m: &AudioMetrics, _i: usize, _n: usize) -> Vec2 {
    Vec2::new(theta.sin(), 0.0)
}

fn nod(_elapsed: f32, theta: f32, _m: &AudioMetrics, _i: usize, _n: usize) -> Vec2 {
    Vec2::new(0.0, theta.sin())
}

// Vertical excursion opens up with the high band, never beyond half amplitude
fn ballyhoo(_elapsed: f32, theta: f32, m: &AudioMetrics, _i: usize, _n: usize) -> Vec2 {
    let lift = 0.5 * (0.5 + 0.5 * crate::context::sanitize_unit(m.high, 0.0));
    Vec2::new(theta.sin(), lift * (3.0 * theta).sin())
}

fn wave(_elapsed: f32, theta: f32, _m: &AudioMetrics, index: usize, total: usize) -> Vec2 {
    let offset = if total > 1 {
        PI * index as f32 / total as f32
    } else {
        0.0
    };
    Vec2::new(
        (theta + offset).sin(),
        0.3 * (2.0 * (theta + offset)).sin(),
    )
}

fn drift(_elapsed: f32, theta: f32, _m: &AudioMetrics, _i: usize, _n: usize) -> Vec2 {
    Vec2::new(theta.cos(), 0.5 * theta.sin())
}

/// Every built-in pattern
pub static PATTERNS: [PatternSpec; 7] = [
    PatternSpec {
        id: "circle",
        period_beats: 4.0,
        base_amplitude: 0.8,
        travel_per_cycle: TAU,
        phase_type: PhaseType::Polar,
        eval: circle,
    },
    PatternSpec {
        id: "figure8",
        period_beats: 4.0,
        base_amplitude: 0.8,
        travel_per_cycle: 8.0,
        phase_type: PhaseType::Polar,
        eval: figure8,
    },
    PatternSpec {
        id: "sweep",
        period_beats: 2.0,
        base_amplitude: 0.9,
        travel_per_cycle: 4.0,
        phase_type: PhaseType::Polar,
        eval: sweep,
    },
    PatternSpec {
        id: "nod",
        period_beats: 1.0,
        base_amplitude: 0.5,
        travel_per_cycle: 4.0,
        phase_type: PhaseType::Polar,
        eval: nod,
    },
    PatternSpec {
        id: "ballyhoo",
        period_beats: 4.0,
        base_amplitude: 0.9,
        travel_per_cycle: 10.0,
        phase_type: PhaseType::Polar,
        eval: ballyhoo,
    },
    PatternSpec {
        id: "wave",
        period_beats: 2.0,
        base_amplitude: 0.7,
        travel_per_cycle: 6.4,
        phase_type: PhaseType::Linear,
        eval: wave,
    },
    PatternSpec {
        id: "drift",
        period_beats: 4.0,
        base_amplitude: 0.4,
        travel_per_cycle: 6.0,
        phase_type: PhaseType::Polar,
        eval: drift,
    },
];

/// Pattern by id
pub fn get(id: &str) -> Option<&'static PatternSpec> {
    PATTERNS.iter().find(|p| p.id == id)
}

/// Ids of every built-in pattern
pub fn ids() -> impl Iterator<Item = &'static str> {
    PATTERNS.iter().map(|p| p.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_length(spec: &PatternSpec, metrics: &AudioMetrics, index: usize, total: usize) -> f32 {
        const STEPS: usize = 4096;
        let mut length = 0.0;
        let mut prev = spec.sample(0.0, 0.0, metrics, index, total);
        for step in 1..=STEPS {
            let theta = TAU * step as f32 / STEPS as f32;
            let p = spec.sample(0.0, theta, metrics, index, total);
            length += p.distance(prev);
            prev = p;
        }
        length
    }

    #[test]
    fn test_travel_bounds_hold() {
        let loud = AudioMetrics {
            high: 1.0,
            ..AudioMetrics::default()
        };
        for spec in PATTERNS.iter() {
            for metrics in [AudioMetrics::default(), loud.clone()] {
                for (index, total) in [(0, 1), (3, 8)] {
                    let length = path_length(spec, &metrics, index, total);
                    assert!(
                        length <= spec.travel_per_cycle * 1.001,
                        "{}: {} > {}",
                        spec.id,
                        length,
                        spec.travel_per_cycle
                    );
                }
            }
        }
    }

    #[test]
    fn test_points_in_unit_square() {
        let metrics = AudioMetrics::default();
        for spec in PATTERNS.iter() {
            for step in 0..64 {
                let p = spec.sample(1.0, step as f32 * 0.1, &metrics, 0, 1);
                assert!(p.x.abs() <= 1.0 && p.y.abs() <= 1.0, "{}", spec.id);
            }
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(get("figure8").unwrap().period_beats, 4.0);
        assert_eq!(get("nod").unwrap().period_beats, 1.0);
        assert!(get("spiral").is_none());
        assert_eq!(ids().count(), PATTERNS.len());
    }
}
