//! Scenario files: scripted input sequences replayed through the engine.
//!
//! A scenario is a list of segments. Each segment repeats one musical context for a
//! number of frames, optionally cycling key labels, ramping energy and firing effects at
//! given frames. Files load as `.json`, `.ron` or `.toml`.

use anyhow::{bail, Context, Result};
use lightflow_core::config::{load_document, MAX_CONFIG_FILE_SIZE};
use lightflow_core::{
    AudioMetrics, Constitution, ConstitutionRegistry, EffectConfig, Engine, EngineConfig,
    EngineContext, EngineEvent, FrameOutput, FrameOverrides, MusicalContext,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

fn default_delta_ms() -> f64 {
    1000.0 / 60.0
}

fn default_profile() -> String {
    "default".to_string()
}

/// Effect fired at a frame offset inside a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedTrigger {
    /// Frame offset from the segment start
    pub frame: usize,
    /// Trigger request
    pub effect: EffectConfig,
}

/// Energy interpolated across a segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyRamp {
    /// Energy on the first frame
    pub from: f32,
    /// Energy on the last frame
    pub to: f32,
}

impl EnergyRamp {
    fn at(&self, frame: usize, frames: usize) -> f32 {
        let t = if frames > 1 {
            frame as f32 / (frames - 1) as f32
        } else {
            0.0
        };
        self.from + (self.to - self.from) * t
    }
}

/// A run of frames sharing one context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Segment {
    /// Number of frames
    pub frames: usize,
    /// Profile for this segment; the scenario profile when absent
    pub profile: Option<String>,
    /// Context repeated every frame
    pub context: MusicalContext,
    /// Spectral metrics repeated every frame
    pub metrics: AudioMetrics,
    /// Operator overrides for every frame
    pub overrides: FrameOverrides,
    /// Key labels cycled one per frame
    pub key_cycle: Vec<String>,
    /// Energy ramp applied to context and metrics
    pub energy_ramp: Option<EnergyRamp>,
    /// Effects fired during the segment
    pub triggers: Vec<TimedTrigger>,
}

impl Default for Segment {
    fn default() -> Self {
        Self {
            frames: 60,
            profile: None,
            context: MusicalContext::new(default_profile()),
            metrics: AudioMetrics::default(),
            overrides: FrameOverrides::default(),
            key_cycle: Vec::new(),
            energy_ramp: None,
            triggers: Vec::new(),
        }
    }
}

/// A scripted engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Display name
    pub name: String,
    /// Profile used by segments that do not name one
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Frame delta (ms)
    #[serde(default = "default_delta_ms")]
    pub delta_ms: f64,
    /// Engine tuning; defaults when absent
    #[serde(default)]
    pub config: Option<EngineConfig>,
    /// Extra profiles registered next to the built-ins
    #[serde(default)]
    pub profiles: Vec<Constitution>,
    /// Frames to play
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Totals of a finished run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Frames produced
    pub frames: usize,
    /// Events raised
    pub events: usize,
    /// Drops detected
    pub drops: usize,
    /// Triggers the shield refused
    pub blocked_effects: usize,
    /// Engine clock at the end (ms)
    pub clock_ms: f64,
}

impl Scenario {
    /// Load a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let scenario: Scenario = load_document(path, MAX_CONFIG_FILE_SIZE)
            .with_context(|| format!("Failed to load scenario {:?}", path))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reject scenarios that cannot produce a frame
    pub fn validate(&self) -> Result<()> {
        if !(self.delta_ms.is_finite() && self.delta_ms > 0.0) {
            bail!("Scenario '{}': delta_ms must be positive", self.name);
        }
        if self.total_frames() == 0 {
            bail!("Scenario '{}' has no frames", self.name);
        }
        for (index, segment) in self.segments.iter().enumerate() {
            if let Some(trigger) = segment.triggers.iter().find(|t| t.frame >= segment.frames) {
                bail!(
                    "Scenario '{}': segment {} fires '{}' at frame {} but only has {} frames",
                    self.name,
                    index,
                    trigger.effect.effect_type,
                    trigger.frame,
                    segment.frames
                );
            }
        }
        Ok(())
    }

    /// Frames across all segments
    pub fn total_frames(&self) -> usize {
        self.segments.iter().map(|s| s.frames).sum()
    }

    /// Build an engine with the scenario's config and profiles.
    ///
    /// `config` replaces the scenario's own configuration when given.
    pub fn build_engine(&self, config: Option<EngineConfig>) -> Result<Engine> {
        let config = config.or_else(|| self.config.clone()).unwrap_or_default();
        let mut registry = ConstitutionRegistry::with_builtins();
        for profile in &self.profiles {
            registry
                .register(profile.clone())
                .with_context(|| format!("Invalid profile '{}'", profile.id))?;
        }
        let ctx = EngineContext::new(config)
            .context("Invalid engine configuration")?
            .with_constitutions(registry);
        Ok(Engine::new(ctx))
    }

    /// Play every frame through `engine`, handing each output to `sink`
    pub fn run<F>(&self, engine: &mut Engine, mut sink: F) -> Result<RunSummary>
    where
        F: FnMut(usize, &FrameOutput) -> Result<()>,
    {
        info!(
            "Running scenario '{}' ({} frames)",
            self.name,
            self.total_frames()
        );
        let mut summary = RunSummary::default();

        for (index, segment) in self.segments.iter().enumerate() {
            debug!("Segment {} ({} frames)", index, segment.frames);
            let profile = segment.profile.as_deref().unwrap_or(&self.profile);

            for frame in 0..segment.frames {
                for trigger in segment.triggers.iter().filter(|t| t.frame == frame) {
                    if let Err(e) = engine.trigger_effect(&trigger.effect) {
                        warn!("Scenario trigger skipped: {}", e);
                    }
                }

                let (context, metrics) = segment.frame_inputs(frame, profile);
                let output =
                    engine.update_with_overrides(&context, &metrics, &segment.overrides, self.delta_ms);

                summary.events += output.events.len();
                for event in &output.events {
                    match event {
                        EngineEvent::DropStarted => summary.drops += 1,
                        EngineEvent::EffectBlocked { .. } => summary.blocked_effects += 1,
                        _ => {}
                    }
                }
                sink(summary.frames, &output)?;
                summary.frames += 1;
            }
        }

        summary.clock_ms = engine.clock_ms();
        info!(
            "Scenario '{}' finished: {} frames, {} drops, {} blocked effects",
            self.name, summary.frames, summary.drops, summary.blocked_effects
        );
        Ok(summary)
    }
}

impl Segment {
    /// Inputs for one frame of the segment
    pub fn frame_inputs(&self, frame: usize, profile: &str) -> (MusicalContext, AudioMetrics) {
        let mut context = self.context.clone();
        let mut metrics = self.metrics.clone();
        context.profile_id = profile.to_string();

        if !self.key_cycle.is_empty() {
            context.key = Some(self.key_cycle[frame % self.key_cycle.len()].clone());
        }
        if let Some(ramp) = &self.energy_ramp {
            let energy = ramp.at(frame, self.frames);
            context.energy = energy;
            metrics.energy = energy;
        }
        (context, metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        tmp
    }

    const FLICKER: &str = r#"(
    name: "flicker",
    profile: "techno-club",
    segments: [
        (
            frames: 120,
            context: (bpm: 200.0, energy: 0.6, confidence: 0.9, mode: minor),
            key_cycle: ["A", "C"],
        ),
        (
            frames: 30,
            profile: Some("chill-lounge"),
            triggers: [(frame: 5, effect: (effect_type: "strobe"))],
        ),
    ],
)"#;

    #[test]
    fn test_load_ron_scenario() {
        let tmp = write_temp(".ron", FLICKER);
        let scenario = Scenario::load(tmp.path()).unwrap();
        assert_eq!(scenario.name, "flicker");
        assert_eq!(scenario.total_frames(), 150);
        assert_eq!(scenario.delta_ms, default_delta_ms());
        assert_eq!(scenario.segments[0].key_cycle, vec!["A", "C"]);
    }

    #[test]
    fn test_run_reports_every_frame() {
        let tmp = write_temp(".ron", FLICKER);
        let scenario = Scenario::load(tmp.path()).unwrap();
        let mut engine = scenario.build_engine(None).unwrap();

        let mut seen = Vec::new();
        let summary = scenario
            .run(&mut engine, |frame, output| {
                seen.push((frame, output.intent.timestamp_ms));
                Ok(())
            })
            .unwrap();

        assert_eq!(summary.frames, 150);
        assert_eq!(seen.len(), 150);
        assert_eq!(seen[149].0, 149);
        // Chill lounge refuses the strobe
        assert_eq!(summary.blocked_effects, 1);
        assert_eq!(engine.active_profile(), Some("chill-lounge"));
    }

    #[test]
    fn test_energy_ramp() {
        let segment = Segment {
            frames: 5,
            energy_ramp: Some(EnergyRamp { from: 0.2, to: 1.0 }),
            ..Segment::default()
        };
        let (first, _) = segment.frame_inputs(0, "default");
        let (last, metrics) = segment.frame_inputs(4, "default");
        assert_eq!(first.energy, 0.2);
        assert_eq!(last.energy, 1.0);
        assert_eq!(metrics.energy, 1.0);
    }

    #[test]
    fn test_trigger_beyond_segment_rejected() {
        let tmp = write_temp(
            ".json",
            r#"{"name": "bad", "segments": [{"frames": 10, "triggers": [{"frame": 10, "effect": {"effect_type": "flash"}}]}]}"#,
        );
        let err = Scenario::load(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("only has 10 frames"));
    }

    #[test]
    fn test_shipped_scenarios_run() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios");
        for name in ["techno_drop.ron", "chill_lounge.toml", "key_flicker.json"] {
            let scenario = Scenario::load(&dir.join(name)).unwrap();
            let mut engine = scenario.build_engine(None).unwrap();
            let summary = scenario
                .run(&mut engine, |_, output| {
                    assert!(output.intent.is_finite());
                    Ok(())
                })
                .unwrap();
            assert_eq!(summary.frames, scenario.total_frames(), "{}", name);
        }
    }

    #[test]
    fn test_extra_profiles_and_config_override() {
        let tmp = write_temp(
            ".toml",
            r#"
name = "custom"
profile = "stage"

[[profiles]]
id = "stage"
name = "Stage"

[[segments]]
frames = 3
"#,
        );
        let scenario = Scenario::load(tmp.path()).unwrap();
        let config = EngineConfig {
            frame_rate: 30.0,
            ..EngineConfig::default()
        };
        let mut engine = scenario.build_engine(Some(config)).unwrap();
        assert_eq!(engine.context().config().frame_rate, 30.0);

        scenario.run(&mut engine, |_, _| Ok(())).unwrap();
        assert_eq!(engine.active_profile(), Some("stage"));
    }
}
