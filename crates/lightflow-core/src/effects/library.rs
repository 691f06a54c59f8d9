//! Built-in effects and the factory registry

use super::{
    Constrainable, EffectCategory, EffectConfig, EffectConstraints, EffectFrame, LightEffect,
};
use crate::color::Hsl;
use crate::context::sanitize_unit;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::fmt;

/// Creates a fresh effect instance
pub type EffectFactory = Box<dyn Fn() -> Box<dyn LightEffect> + Send + Sync>;

/// Effect type id to factory
pub struct EffectRegistry {
    factories: BTreeMap<String, EffectFactory>,
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl EffectRegistry {
    /// Registry with no types
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every built-in type
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("strobe", || Box::new(StrobeEffect::default()));
        registry.register("flash", || Box::new(FlashEffect::default()));
        registry.register("blackout", || Box::new(BlackoutEffect::default()));
        registry.register("color_pulse", || Box::new(ColorPulseEffect::default()));
        registry.register("chase", || Box::new(ChaseEffect::default()));
        registry.register("amber_glow", || Box::new(AmberGlowEffect::default()));
        registry
    }

    /// Register or replace a factory
    pub fn register<F>(&mut self, effect_type: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn LightEffect> + Send + Sync + 'static,
    {
        self.factories.insert(effect_type.into(), Box::new(factory));
    }

    /// Create an instance of `effect_type`
    pub fn create(&self, effect_type: &str) -> Option<Box<dyn LightEffect>> {
        self.factories.get(effect_type).map(|factory| factory())
    }

    /// Whether `effect_type` is registered
    pub fn contains(&self, effect_type: &str) -> bool {
        self.factories.contains_key(effect_type)
    }

    /// Registered type ids in sorted order
    pub fn types(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }
}

/// Lifetime and level bookkeeping shared by the built-ins
#[derive(Debug, Clone, Copy)]
struct Envelope {
    elapsed_ms: f64,
    duration_ms: Option<f64>,
    intensity: f32,
    priority: u8,
    finished: bool,
    constraints: EffectConstraints,
}

impl Envelope {
    fn new(priority: u8, duration_ms: Option<f64>) -> Self {
        Self {
            elapsed_ms: 0.0,
            duration_ms,
            intensity: 1.0,
            priority,
            finished: false,
            constraints: EffectConstraints::default(),
        }
    }

    fn trigger(&mut self, config: &EffectConfig) {
        self.elapsed_ms = 0.0;
        self.finished = false;
        self.intensity = sanitize_unit(config.intensity, 1.0);
        if let Some(priority) = config.priority {
            self.priority = priority;
        }
        if let Some(duration) = config.duration_ms {
            self.duration_ms = (duration.is_finite() && duration > 0.0).then_some(duration);
        }
    }

    fn advance(&mut self, delta_ms: f64) {
        if self.finished {
            return;
        }
        self.elapsed_ms += crate::context::sanitize_delta_ms(delta_ms);
        if let Some(duration) = self.duration_ms {
            if self.elapsed_ms >= duration {
                self.finished = true;
            }
        }
    }

    fn level(&self) -> f32 {
        self.intensity.min(self.constraints.max_intensity)
    }

    /// Fraction of the lifetime elapsed, 0 for open-ended effects
    fn progress(&self) -> f32 {
        match self.duration_ms {
            Some(d) if d > 0.0 => (self.elapsed_ms / d).clamp(0.0, 1.0) as f32,
            _ => 0.0,
        }
    }
}

fn rate_or(config: &EffectConfig, default: f32) -> f32 {
    config
        .rate_hz
        .filter(|r| r.is_finite() && *r >= 0.0)
        .unwrap_or(default)
}

/// Rapid white flashing
#[derive(Debug, Clone)]
pub struct StrobeEffect {
    env: Envelope,
    rate_hz: f32,
}

impl Default for StrobeEffect {
    fn default() -> Self {
        Self {
            env: Envelope::new(50, Some(2000.0)),
            rate_hz: 10.0,
        }
    }
}

impl LightEffect for StrobeEffect {
    fn trigger(&mut self, config: &EffectConfig) {
        self.env.trigger(config);
        self.rate_hz = rate_or(config, 10.0);
    }

    fn update(&mut self, delta_ms: f64) {
        self.env.advance(delta_ms);
    }

    fn is_finished(&self) -> bool {
        self.env.finished
    }

    fn abort(&mut self) {
        self.env.finished = true;
    }

    fn output(&self) -> Option<EffectFrame> {
        if self.env.finished {
            return None;
        }
        let rate = match self.env.constraints.max_strobe_rate {
            Some(max) => self.rate_hz.min(max),
            None => self.rate_hz,
        };
        Some(EffectFrame {
            dimmer: Some(self.env.level()),
            white: Some(self.env.level()),
            strobe_rate: Some(rate),
            priority: self.env.priority,
            ..Default::default()
        })
    }

    fn priority(&self) -> u8 {
        self.env.priority
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Strobe
    }

    fn as_constrainable(&mut self) -> Option<&mut dyn Constrainable> {
        Some(self)
    }
}

impl Constrainable for StrobeEffect {
    fn set_constraints(&mut self, constraints: &EffectConstraints) {
        self.env.constraints = *constraints;
    }
}

/// Full-rig hit that decays linearly
#[derive(Debug, Clone)]
pub struct FlashEffect {
    env: Envelope,
}

impl Default for FlashEffect {
    fn default() -> Self {
        Self {
            env: Envelope::new(60, Some(300.0)),
        }
    }
}

impl LightEffect for FlashEffect {
    fn trigger(&mut self, config: &EffectConfig) {
        self.env.trigger(config);
    }

    fn update(&mut self, delta_ms: f64) {
        self.env.advance(delta_ms);
    }

    fn is_finished(&self) -> bool {
        self.env.finished
    }

    fn abort(&mut self) {
        self.env.finished = true;
    }

    fn output(&self) -> Option<EffectFrame> {
        if self.env.finished {
            return None;
        }
        let level = self.env.level() * (1.0 - self.env.progress());
        Some(EffectFrame {
            dimmer: Some(level),
            white: Some(level),
            priority: self.env.priority,
            global_override: true,
            ..Default::default()
        })
    }

    fn priority(&self) -> u8 {
        self.env.priority
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Flash
    }

    fn as_constrainable(&mut self) -> Option<&mut dyn Constrainable> {
        Some(self)
    }
}

impl Constrainable for FlashEffect {
    fn set_constraints(&mut self, constraints: &EffectConstraints) {
        self.env.constraints = *constraints;
    }
}

/// Everything dark until aborted or the duration runs out
#[derive(Debug, Clone)]
pub struct BlackoutEffect {
    env: Envelope,
}

impl Default for BlackoutEffect {
    fn default() -> Self {
        Self {
            env: Envelope::new(255, None),
        }
    }
}

impl LightEffect for BlackoutEffect {
    fn trigger(&mut self, config: &EffectConfig) {
        self.env.trigger(config);
    }

    fn update(&mut self, delta_ms: f64) {
        self.env.advance(delta_ms);
    }

    fn is_finished(&self) -> bool {
        self.env.finished
    }

    fn abort(&mut self) {
        self.env.finished = true;
    }

    fn output(&self) -> Option<EffectFrame> {
        (!self.env.finished).then(|| EffectFrame {
            dimmer: Some(0.0),
            priority: self.env.priority,
            global_override: true,
            ..Default::default()
        })
    }

    fn priority(&self) -> u8 {
        self.env.priority
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Blackout
    }
}

/// Breathing dimmer in an optional color
#[derive(Debug, Clone)]
pub struct ColorPulseEffect {
    env: Envelope,
    rate_hz: f32,
    color: Option<Hsl>,
}

impl Default for ColorPulseEffect {
    fn default() -> Self {
        Self {
            env: Envelope::new(30, Some(4000.0)),
            rate_hz: 2.0,
            color: None,
        }
    }
}

impl LightEffect for ColorPulseEffect {
    fn trigger(&mut self, config: &EffectConfig) {
        self.env.trigger(config);
        self.rate_hz = rate_or(config, 2.0);
        self.color = config.color.filter(Hsl::is_finite);
    }

    fn update(&mut self, delta_ms: f64) {
        self.env.advance(delta_ms);
    }

    fn is_finished(&self) -> bool {
        self.env.finished
    }

    fn abort(&mut self) {
        self.env.finished = true;
    }

    fn output(&self) -> Option<EffectFrame> {
        if self.env.finished {
            return None;
        }
        // Full level at t = 0, breathing down to half
        let phase = TAU * self.rate_hz as f64 * self.env.elapsed_ms / 1000.0;
        let breath = 0.75 + 0.25 * phase.cos() as f32;
        Some(EffectFrame {
            dimmer: Some(self.env.level() * breath),
            color: self.color,
            priority: self.env.priority,
            ..Default::default()
        })
    }

    fn priority(&self) -> u8 {
        self.env.priority
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Pulse
    }

    fn as_constrainable(&mut self) -> Option<&mut dyn Constrainable> {
        Some(self)
    }
}

impl Constrainable for ColorPulseEffect {
    fn set_constraints(&mut self, constraints: &EffectConstraints) {
        self.env.constraints = *constraints;
    }
}

/// Stepped running light
#[derive(Debug, Clone)]
pub struct ChaseEffect {
    env: Envelope,
    rate_hz: f32,
}

impl Default for ChaseEffect {
    fn default() -> Self {
        Self {
            env: Envelope::new(40, Some(4000.0)),
            rate_hz: 4.0,
        }
    }
}

impl LightEffect for ChaseEffect {
    fn trigger(&mut self, config: &EffectConfig) {
        self.env.trigger(config);
        self.rate_hz = rate_or(config, 4.0);
    }

    fn update(&mut self, delta_ms: f64) {
        self.env.advance(delta_ms);
    }

    fn is_finished(&self) -> bool {
        self.env.finished
    }

    fn abort(&mut self) {
        self.env.finished = true;
    }

    fn output(&self) -> Option<EffectFrame> {
        if self.env.finished {
            return None;
        }
        let step = (self.env.elapsed_ms * self.rate_hz as f64 / 1000.0).floor() as u64;
        let level = if step % 2 == 0 { 1.0 } else { 0.3 };
        Some(EffectFrame {
            dimmer: Some(self.env.level() * level),
            priority: self.env.priority,
            ..Default::default()
        })
    }

    fn priority(&self) -> u8 {
        self.env.priority
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Chase
    }

    fn as_constrainable(&mut self) -> Option<&mut dyn Constrainable> {
        Some(self)
    }
}

impl Constrainable for ChaseEffect {
    fn set_constraints(&mut self, constraints: &EffectConstraints) {
        self.env.constraints = *constraints;
    }
}

/// Amber channel glow fading in over half a second
#[derive(Debug, Clone)]
pub struct AmberGlowEffect {
    env: Envelope,
}

const AMBER_FADE_IN_MS: f64 = 500.0;

impl Default for AmberGlowEffect {
    fn default() -> Self {
        Self {
            env: Envelope::new(10, None),
        }
    }
}

impl LightEffect for AmberGlowEffect {
    fn trigger(&mut self, config: &EffectConfig) {
        self.env.trigger(config);
    }

    fn update(&mut self, delta_ms: f64) {
        self.env.advance(delta_ms);
    }

    fn is_finished(&self) -> bool {
        self.env.finished
    }

    fn abort(&mut self) {
        self.env.finished = true;
    }

    fn output(&self) -> Option<EffectFrame> {
        if self.env.finished {
            return None;
        }
        let fade = (self.env.elapsed_ms / AMBER_FADE_IN_MS).clamp(0.0, 1.0) as f32;
        Some(EffectFrame {
            amber: Some(self.env.level() * fade),
            priority: self.env.priority,
            ..Default::default()
        })
    }

    fn priority(&self) -> u8 {
        self.env.priority
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Ambient
    }

    fn as_constrainable(&mut self) -> Option<&mut dyn Constrainable> {
        Some(self)
    }
}

impl Constrainable for AmberGlowEffect {
    fn set_constraints(&mut self, constraints: &EffectConstraints) {
        self.env.constraints = *constraints;
    }
}
