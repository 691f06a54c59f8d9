//! Engine configuration and file loading.
//!
//! Every tunable lives here with a serde default, so partial files are valid. Files load
//! by extension: `.json`, `.ron` or `.toml`.

use crate::advisory::AdvisoryConfig;
use crate::movement::MovementConfig;
use crate::stabilizer::{EnergyConfig, KeyConfig, MoodConfig, StrategyConfig};
use crate::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum size of a configuration, profile or scenario file (4 MiB)
pub const MAX_CONFIG_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// Nominal frame rate the stabilizer windows are sized for
pub const DEFAULT_FRAME_RATE: f32 = 60.0;

/// Deserialize a document, dispatching on the file extension
pub fn load_document<T: DeserializeOwned>(path: &Path, limit: u64) -> Result<T> {
    let size = std::fs::metadata(path)?.len();
    if size > limit {
        return Err(CoreError::FileTooLarge { size, limit });
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let content = std::fs::read_to_string(path)?;
    match extension.as_str() {
        "json" => Ok(serde_json::from_str(&content)?),
        "ron" => Ok(ron::from_str(&content)?),
        "toml" => Ok(toml::from_str(&content)?),
        _ => Err(CoreError::UnsupportedFormat(extension)),
    }
}

/// Complete engine tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nominal frame rate used to size rolling windows
    pub frame_rate: f32,
    /// Energy stabilizer
    pub energy: EnergyConfig,
    /// Key stabilizer
    pub key: KeyConfig,
    /// Mood arbiter
    pub mood: MoodConfig,
    /// Strategy arbiter
    pub strategy: StrategyConfig,
    /// Movement and gearbox
    pub movement: MovementConfig,
    /// Advisory gating
    pub advisory: AdvisoryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            energy: EnergyConfig::default(),
            key: KeyConfig::default(),
            mood: MoodConfig::default(),
            strategy: StrategyConfig::default(),
            movement: MovementConfig::default(),
            advisory: AdvisoryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let config: EngineConfig = load_document(path, MAX_CONFIG_FILE_SIZE)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and orderings
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, message: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(CoreError::InvalidConfig(message.to_string()))
            }
        }
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let non_negative_ms = |v: f64| v.is_finite() && v >= 0.0;
        let unit = |v: f32| (0.0..=1.0).contains(&v);

        check(
            positive(self.frame_rate) && self.frame_rate <= 1000.0,
            "frame_rate must be in (0, 1000]",
        )?;

        let e = &self.energy;
        check(
            positive(e.window_secs) && positive(e.baseline_secs),
            "energy windows must be positive",
        )?;
        check(
            unit(e.drop_floor) && unit(e.drop_exit) && e.drop_exit <= e.drop_floor,
            "energy drop_exit must not exceed drop_floor",
        )?;
        check(
            non_negative_ms(e.drop_min_ms) && non_negative_ms(e.drop_cooldown_ms),
            "energy drop timers must be non-negative",
        )?;

        let k = &self.key;
        check(positive(k.buffer_secs), "key buffer_secs must be positive")?;
        check(non_negative_ms(k.lock_ms), "key lock_ms must be non-negative")?;
        check(
            k.hysteresis_margin.is_finite() && k.hysteresis_margin >= 0.0,
            "key hysteresis_margin must be non-negative",
        )?;
        check(unit(k.min_confidence), "key min_confidence must be in [0, 1]")?;

        let m = &self.mood;
        check(positive(m.buffer_secs), "mood buffer_secs must be positive")?;
        check(non_negative_ms(m.lock_ms), "mood lock_ms must be non-negative")?;
        check(
            m.dark_threshold < m.bright_threshold,
            "mood dark_threshold must be below bright_threshold",
        )?;
        check(unit(m.dominance), "mood dominance must be in [0, 1]")?;
        check(unit(m.thermal_rate), "mood thermal_rate must be in [0, 1]")?;

        let s = &self.strategy;
        check(positive(s.buffer_secs), "strategy buffer_secs must be positive")?;
        check(
            non_negative_ms(s.commitment_ms),
            "strategy commitment_ms must be non-negative",
        )?;
        check(
            unit(s.low_threshold) && unit(s.high_threshold) && s.low_threshold < s.high_threshold,
            "strategy thresholds must be ordered within [0, 1]",
        )?;

        let mv = &self.movement;
        check(
            positive(mv.hardware_max_speed),
            "movement hardware_max_speed must be positive",
        )?;
        check(
            positive(mv.min_bpm) && mv.min_bpm < mv.max_bpm,
            "movement bpm clamp must be ordered and positive",
        )?;
        check(
            positive(mv.fallback_bpm),
            "movement fallback_bpm must be positive",
        )?;
        check(
            mv.calm_floor_min <= mv.calm_floor_max,
            "movement calm floor bounds must be ordered",
        )?;
        check(
            mv.fixture_count > 0 && mv.fixture_index < mv.fixture_count,
            "movement fixture_index must be below fixture_count",
        )?;

        let a = &self.advisory;
        check(
            unit(a.color_confidence) && unit(a.effect_confidence) && unit(a.veto_energy),
            "advisory thresholds must be in [0, 1]",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut tmp = Builder::new().suffix(suffix).tempfile().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        tmp
    }

    #[test]
    fn test_default_validates() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_load_toml_partial() {
        let tmp = write_temp(
            ".toml",
            r#"
frame_rate = 50.0

[key]
lock_ms = 8000.0

[movement]
hardware_max_speed = 180.0
"#,
        );
        let config = EngineConfig::load(tmp.path()).unwrap();
        assert_eq!(config.frame_rate, 50.0);
        assert_eq!(config.key.lock_ms, 8000.0);
        assert_eq!(config.key.buffer_secs, KeyConfig::default().buffer_secs);
        assert_eq!(config.movement.hardware_max_speed, 180.0);
    }

    #[test]
    fn test_load_ron_and_json() {
        let ron_file = write_temp(".ron", "(frame_rate: 30.0, mood: (lock_ms: 2500.0))");
        let config = EngineConfig::load(ron_file.path()).unwrap();
        assert_eq!(config.frame_rate, 30.0);
        assert_eq!(config.mood.lock_ms, 2500.0);

        let json_file = write_temp(".json", r#"{"strategy": {"commitment_ms": 1000.0}}"#);
        let config = EngineConfig::load(json_file.path()).unwrap();
        assert_eq!(config.strategy.commitment_ms, 1000.0);
    }

    #[test]
    fn test_unsupported_extension() {
        let tmp = write_temp(".yaml", "frame_rate: 60");
        assert!(matches!(
            EngineConfig::load(tmp.path()),
            Err(CoreError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
    }

    #[test]
    fn test_file_too_large() {
        let tmp = write_temp(".json", "{}");
        let result: Result<EngineConfig> = load_document(tmp.path(), 1);
        assert!(matches!(
            result,
            Err(CoreError::FileTooLarge { size: 2, limit: 1 })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = EngineConfig::default();
        config.strategy.low_threshold = 0.8;
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.frame_rate = f32::NAN;
        assert!(config.validate().is_err());
    }
}
