//! Orchestrator - one frame of musical context in, one `LightingIntent` out
//!
//! Frame sequence:
//!
//! 1. resolve the profile (a change resets stabilizers and aborts effects)
//! 2. stabilizers: energy, key, mood, strategy
//! 3. color engine
//! 4. zone mix from the spectral bands
//! 5. movement choreographer
//! 6. effects: drop trigger, advisory suggestion, update, blend
//! 7. advisory color/brightness modifiers
//! 8. master intensity
//! 9. effect overrides, operator blackout and master cap
//!
//! Precedence is effects over advisory over base physics. All state lives in an
//! [`EngineContext`]; engines are independent of each other.

use crate::advisory::{fold_advice, Advisor, AppliedAdvice};
use crate::color::{ColorPalette, Hsl, PaletteRole};
use crate::color_engine::ColorEngine;
use crate::config::EngineConfig;
use crate::constitution::{Constitution, ConstitutionRegistry};
use crate::context::{
    sanitize_delta_ms, sanitize_unit, AudioMetrics, FrameOverrides, MusicalContext,
};
use crate::effects::{
    CombinedEffectOutput, EffectArbiter, EffectConfig, EffectError, EffectHandle, TriggerOutcome,
};
use crate::events::EngineEvent;
use crate::intent::{LightingIntent, Optics, Zone, ZoneIntent};
use crate::movement::{Choreographer, MovementInput};
use crate::stabilizer::{
    EnergyStabilizer, KeyInput, KeyStabilizer, MoodArbiter, MoodInput, StabilizedState,
    StrategyArbiter,
};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, trace, warn};

/// Profile used when a frame names an unknown one
pub const DEFAULT_PROFILE: &str = "default";

/// Zoom multiplier while a drop is active
const DROP_ZOOM: f32 = 0.6;
/// Zoom multiplier during a breakdown
const BREAKDOWN_ZOOM: f32 = 1.3;

/// Result of one engine frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    /// Lighting decision
    pub intent: LightingIntent,
    /// Events raised while producing it
    pub events: Vec<EngineEvent>,
}

/// Everything an engine owns
pub struct EngineContext {
    config: EngineConfig,
    constitutions: ConstitutionRegistry,
    effects: EffectArbiter,
    energy: EnergyStabilizer,
    key: KeyStabilizer,
    mood: MoodArbiter,
    strategy: StrategyArbiter,
    choreographer: Choreographer,
    advisor: Option<Box<dyn Advisor>>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .field("profiles", &self.constitutions.ids().collect::<Vec<_>>())
            .field("effects", &self.effects)
            .field("advisor", &self.advisor.is_some())
            .finish()
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

impl EngineContext {
    /// Validate `config` and build fresh components from it
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let fps = config.frame_rate;
        Self {
            energy: EnergyStabilizer::new(config.energy.clone(), fps),
            key: KeyStabilizer::new(config.key.clone(), fps),
            mood: MoodArbiter::new(config.mood.clone(), fps),
            strategy: StrategyArbiter::new(config.strategy.clone(), fps),
            choreographer: Choreographer::new(config.movement.clone(), fps),
            constitutions: ConstitutionRegistry::with_builtins(),
            effects: EffectArbiter::default(),
            advisor: None,
            config,
        }
    }

    /// Replace the profile registry
    pub fn with_constitutions(mut self, constitutions: ConstitutionRegistry) -> Self {
        self.constitutions = constitutions;
        self
    }

    /// Replace the effect arbiter
    pub fn with_effects(mut self, effects: EffectArbiter) -> Self {
        self.effects = effects;
        self
    }

    /// Install an advisor
    pub fn with_advisor(mut self, advisor: Box<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Profile registry
    pub fn constitutions(&self) -> &ConstitutionRegistry {
        &self.constitutions
    }

    /// Mutable profile registry
    pub fn constitutions_mut(&mut self) -> &mut ConstitutionRegistry {
        &mut self.constitutions
    }

    /// Effect arbiter
    pub fn effects(&self) -> &EffectArbiter {
        &self.effects
    }

    /// Mutable effect arbiter
    pub fn effects_mut(&mut self) -> &mut EffectArbiter {
        &mut self.effects
    }

    /// Movement choreographer
    pub fn choreographer(&self) -> &Choreographer {
        &self.choreographer
    }

    fn reset_pipeline(&mut self) {
        self.energy.reset();
        self.key.reset();
        self.mood.reset();
        self.strategy.reset();
        self.choreographer.reset();
    }
}

/// Per-frame lighting decision pipeline
#[derive(Debug)]
pub struct Engine {
    ctx: EngineContext,
    active_profile: Option<String>,
    reported_unknown: BTreeSet<String>,
    clock_ms: f64,
    state: StabilizedState,
    pending: Vec<EngineEvent>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineContext::default())
    }
}

impl Engine {
    /// Create an engine around a context
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            active_profile: None,
            reported_unknown: BTreeSet::new(),
            clock_ms: 0.0,
            state: StabilizedState::default(),
            pending: Vec::new(),
        }
    }

    /// Create an engine from a configuration, validating it
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        Ok(Self::new(EngineContext::new(config)?))
    }

    /// Owned context
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Mutable owned context
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    /// Profile in use, `None` before the first frame
    pub fn active_profile(&self) -> Option<&str> {
        self.active_profile.as_deref()
    }

    /// Engine clock (ms)
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Stabilized state of the last frame
    pub fn stabilized_state(&self) -> StabilizedState {
        self.state
    }

    fn active_constitution(&self) -> &Constitution {
        self.ctx
            .constitutions
            .resolve(self.active_profile.as_deref().unwrap_or(DEFAULT_PROFILE))
    }

    /// Trigger an effect under the active profile.
    ///
    /// Lifecycle events are reported with the next frame.
    pub fn trigger_effect(
        &mut self,
        config: &EffectConfig,
    ) -> std::result::Result<TriggerOutcome, EffectError> {
        let profile_id = self
            .active_profile
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let constitution = self.ctx.constitutions.resolve(&profile_id);
        let result = self.ctx.effects.trigger(config, constitution);
        if let Err(EffectError::UnknownType(effect_type)) = &result {
            warn!("Unknown effect type '{}'", effect_type);
            self.pending.push(EngineEvent::UnknownEffectType {
                effect_type: effect_type.clone(),
            });
        }
        result
    }

    /// Abort an effect; false if the handle is not live
    pub fn abort_effect(&mut self, handle: EffectHandle) -> bool {
        self.ctx.effects.abort(handle)
    }

    /// Return to the initial state, keeping configuration and profiles
    pub fn reset(&mut self) {
        self.ctx.reset_pipeline();
        self.ctx.effects.reset();
        self.active_profile = None;
        self.reported_unknown.clear();
        self.clock_ms = 0.0;
        self.state = StabilizedState::default();
        self.pending.clear();
    }

    /// Run one frame without operator overrides
    pub fn update(
        &mut self,
        context: &MusicalContext,
        metrics: &AudioMetrics,
        delta_ms: f64,
    ) -> FrameOutput {
        self.update_with_overrides(context, metrics, &FrameOverrides::default(), delta_ms)
    }

    /// Run one frame
    pub fn update_with_overrides(
        &mut self,
        context: &MusicalContext,
        metrics: &AudioMetrics,
        overrides: &FrameOverrides,
        delta_ms: f64,
    ) -> FrameOutput {
        let dt = sanitize_delta_ms(delta_ms);
        self.clock_ms += dt;
        let metrics = metrics.sanitized();
        let mut events = std::mem::take(&mut self.pending);

        self.resolve_profile(&context.profile_id, &mut events);

        let ctx = &mut self.ctx;
        let profile_id = self
            .active_profile
            .as_deref()
            .unwrap_or(DEFAULT_PROFILE);
        let constitution = ctx.constitutions.resolve(profile_id);

        // Stabilizers
        let energy = ctx
            .energy
            .update(context.energy, overrides.force_drop, dt);
        if energy.drop_started {
            info!("Drop started at {:.0} ms", self.clock_ms);
            events.push(EngineEvent::DropStarted);
        }
        if energy.drop_ended {
            info!("Drop ended at {:.0} ms", self.clock_ms);
            events.push(EngineEvent::DropEnded);
        }

        let key = ctx.key.update(KeyInput {
            key: context.key.as_deref(),
            confidence: context.confidence,
            smoothed_energy: energy.smoothed_energy,
            delta_ms: dt,
        });
        if key.changed {
            events.push(EngineEvent::KeyChanged {
                from: key.previous,
                to: key.stable_key,
            });
        }

        let mood = ctx.mood.update(MoodInput {
            mode: context.mode,
            energy: energy.smoothed_energy,
            stable_key: key.stable_key,
            delta_ms: dt,
        });
        if mood.changed {
            events.push(EngineEvent::EmotionChanged {
                from: mood.previous,
                to: mood.emotion,
            });
        }

        let strategy = ctx.strategy.update(context.syncopation, dt);
        if strategy.changed {
            events.push(EngineEvent::StrategyChanged {
                from: strategy.previous,
                to: strategy.strategy,
            });
        }

        let state = StabilizedState {
            stable_key: key.stable_key,
            stable_emotion: mood.emotion,
            stable_strategy: strategy.strategy,
            raw_energy: energy.raw_energy,
            smoothed_energy: energy.smoothed_energy,
            is_drop_active: energy.is_drop_active,
            is_breakdown: energy.is_breakdown,
            thermal_temperature: mood.thermal_temperature,
        };
        self.state = state;

        // Color
        let mut palette = ColorEngine::generate(&state, constitution);

        let advice = ctx
            .advisor
            .as_mut()
            .and_then(|advisor| advisor.consult(&state));
        let applied = fold_advice(advice.as_ref(), &state, &ctx.config.advisory);
        if applied.vetoed {
            debug!(
                "Advisory effect modifiers vetoed at energy {:.2}",
                state.smoothed_energy
            );
        }

        // Zones
        let base_zones = zone_mix(&metrics, state.smoothed_energy);

        // Movement
        let bpm = overrides.bpm.unwrap_or(context.bpm);
        let movement = ctx.choreographer.update(
            MovementInput {
                bpm,
                energy: state.raw_energy,
                smoothed_energy: state.smoothed_energy,
                metrics: &metrics,
                delta_ms: dt,
            },
            &constitution.movement,
        );

        // Effects
        if energy.drop_started {
            if let Some(effect_type) = &constitution.drop_effect {
                let request = EffectConfig::new(effect_type.clone()).replacing();
                trigger_logged(&mut ctx.effects, &request, constitution, &mut events);
            }
        }
        if let Some(request) = &applied.suggested_effect {
            // A standing suggestion does not stack instances
            if !ctx.effects.is_type_active(&request.effect_type) {
                trigger_logged(&mut ctx.effects, request, constitution, &mut events);
            }
        }
        ctx.effects.update(dt);
        let combined = ctx.effects.combined_output(&applied.gains);

        apply_saturation(&mut palette, &applied, constitution);

        // Master
        let dimming = constitution.dimming;
        let drive = (0.6 * state.smoothed_energy + 0.4 * state.raw_energy) * applied.brightness;
        let mut master = dimming.clamp(dimming.min + (dimming.max - dimming.min) * drive);
        let mut zones: BTreeMap<Zone, ZoneIntent> = base_zones
            .into_iter()
            .map(|(zone, level, role)| {
                let intensity = dimming.clamp(level * applied.brightness);
                (
                    zone,
                    ZoneIntent {
                        intensity,
                        palette_role: role,
                    },
                )
            })
            .collect();

        let (strobe_rate, white, amber) = merge_effects(
            &combined,
            overrides.blackout,
            &mut master,
            &mut zones,
            &mut palette,
            constitution,
        );

        if let Some(cap) = overrides.master_cap {
            let cap = sanitize_unit(cap, 1.0);
            master = master.min(cap);
            for zone in zones.values_mut() {
                zone.intensity = zone.intensity.min(cap);
            }
        }

        let optics = frame_optics(constitution.optics, &state);

        events.extend(ctx.effects.drain_events());

        let intent = LightingIntent {
            palette,
            master_intensity: sanitize_unit(master, 0.0),
            zones,
            movement,
            effects: ctx.effects.summaries(),
            optics,
            strobe_rate,
            white,
            amber,
            timestamp_ms: self.clock_ms,
        };

        trace!(
            "frame t={:.1} master={:.3} primary={:.1} pattern={} effects={}",
            intent.timestamp_ms,
            intent.master_intensity,
            intent.palette.primary.h,
            intent.movement.pattern,
            intent.effects.len()
        );

        FrameOutput { intent, events }
    }

    fn resolve_profile(&mut self, requested: &str, events: &mut Vec<EngineEvent>) {
        let resolved = if self.ctx.constitutions.contains(requested) {
            requested.to_string()
        } else {
            if self.reported_unknown.insert(requested.to_string()) {
                warn!(
                    "Unknown profile '{}', using '{}'",
                    requested, DEFAULT_PROFILE
                );
                events.push(EngineEvent::UnknownProfile {
                    profile_id: requested.to_string(),
                });
            }
            self.ctx.constitutions.resolve(requested).id.clone()
        };

        if self.active_profile.as_deref() == Some(resolved.as_str()) {
            return;
        }

        let previous = self.active_profile.take();
        if previous.is_some() {
            self.ctx.reset_pipeline();
            self.ctx.effects.abort_all();
        }
        info!(
            "Profile {} -> {}",
            previous.as_deref().unwrap_or("<none>"),
            resolved
        );
        events.push(EngineEvent::ProfileChanged {
            from: previous,
            to: resolved.clone(),
        });
        self.active_profile = Some(resolved);
    }
}

fn trigger_logged(
    effects: &mut EffectArbiter,
    request: &EffectConfig,
    constitution: &Constitution,
    events: &mut Vec<EngineEvent>,
) {
    if let Err(EffectError::UnknownType(effect_type)) = effects.trigger(request, constitution) {
        warn!("Unknown effect type '{}'", effect_type);
        events.push(EngineEvent::UnknownEffectType { effect_type });
    }
}

/// Zone levels from the spectral bands: (zone, level, palette role)
fn zone_mix(metrics: &AudioMetrics, smoothed_energy: f32) -> [(Zone, f32, PaletteRole); 4] {
    let m = metrics;
    [
        (
            Zone::Front,
            0.6 * m.bass + 0.3 * m.mid + 0.1 * m.high,
            PaletteRole::Primary,
        ),
        (
            Zone::Back,
            0.2 * m.bass + 0.6 * m.mid + 0.2 * m.high,
            PaletteRole::Secondary,
        ),
        (
            Zone::Movers,
            0.1 * m.bass + 0.3 * m.mid + 0.6 * m.high,
            PaletteRole::Accent,
        ),
        (Zone::Ambient, smoothed_energy, PaletteRole::Ambient),
    ]
}

fn apply_saturation(palette: &mut ColorPalette, applied: &AppliedAdvice, constitution: &Constitution) {
    if applied.saturation == 1.0 {
        return;
    }
    for color in [
        &mut palette.primary,
        &mut palette.secondary,
        &mut palette.accent,
        &mut palette.ambient,
    ] {
        color.s = constitution.clamp_saturation(color.s * applied.saturation);
    }
}

/// Fold blended effects into the frame; returns (strobe rate, white, amber)
fn merge_effects(
    combined: &CombinedEffectOutput,
    blackout: bool,
    master: &mut f32,
    zones: &mut BTreeMap<Zone, ZoneIntent>,
    palette: &mut ColorPalette,
    constitution: &Constitution,
) -> (Option<f32>, Option<f32>, Option<f32>) {
    if let Some(color) = combined.color_override {
        palette.primary = Hsl::new(
            constitution.constrain_hue(color.h),
            constitution.clamp_saturation(color.s),
            constitution.clamp_lightness(color.l),
        );
    }

    if blackout || combined.global_override {
        let level = if blackout {
            0.0
        } else {
            combined.override_intensity
        };
        *master = level;
        for zone in zones.values_mut() {
            zone.intensity = level;
        }
        let cap = |v: Option<f32>| v.map(|v| v.min(level));
        let strobe = combined.strobe_rate.filter(|_| level > 0.0);
        return (strobe, cap(combined.white), cap(combined.amber));
    }

    if let Some(dimmer) = combined.dimmer {
        *master = master.max(dimmer);
        for zone in zones.values_mut() {
            zone.intensity = zone.intensity.max(dimmer);
        }
    }
    (combined.strobe_rate, combined.white, combined.amber)
}

fn frame_optics(base: Optics, state: &StabilizedState) -> Optics {
    let mut optics = base;
    if state.is_drop_active {
        optics.zoom *= DROP_ZOOM;
        optics.iris = 1.0;
    } else if state.is_breakdown {
        optics.zoom *= BREAKDOWN_ZOOM;
    }
    optics.clamped()
}
