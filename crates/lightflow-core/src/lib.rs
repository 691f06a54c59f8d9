//! LightFlow Core - Musical Context to Lighting Intent
//!
//! This crate contains the per-frame decision pipeline of LightFlow, including:
//! - Stabilizers (energy, key, mood, harmony strategy)
//! - Constitutions (per-profile color and effect rule sets)
//! - Procedural color engine
//! - Movement choreographer and velocity governor ("Gearbox")
//! - Effect arbiter with its permission policy ("Shield")
//! - The orchestrator that turns one frame of musical context into a `LightingIntent`
//!
//! The pipeline is synchronous and deterministic: identical input sequences produce
//! identical output sequences. Hardware drivers live downstream of `LightingIntent`.

#![warn(missing_docs)]

use thiserror::Error;

pub mod advisory;
pub mod color;
pub mod color_engine;
pub mod config;
pub mod constitution;
pub mod context;
pub mod effects;
pub mod engine;
pub mod events;
pub mod intent;
pub mod logging;
pub mod movement;
pub mod stabilizer;

// --- Re-exports grouped by category ---

// Inputs
pub use context::{AudioMetrics, FrameOverrides, Mode, MusicalContext, Section};

// Stabilizers
pub use stabilizer::{
    Emotion, EnergyStabilizer, KeyStabilizer, MoodArbiter, PitchClass, StabilizedState,
    StrategyArbiter,
};

// Color
pub use color::{ColorPalette, HarmonyStrategy, Hsl, PaletteRole};
pub use color_engine::ColorEngine;
pub use constitution::{
    Bounds, Constitution, ConstitutionRegistry, HueRange, HueRemap, MovementPhysics,
    MovementProfile, StrobePolicy,
};

// Movement
pub use movement::{Choreographer, Gearbox, MovementIntent, PhaseType};

// Effects
pub use effects::{
    CombinedEffectOutput, EffectArbiter, EffectCategory, EffectConfig, EffectError, EffectFrame,
    EffectHandle, EffectRegistry, LightEffect, Shield, ShieldVerdict, TriggerOutcome,
};

// Orchestration
pub use advisory::{Advice, Advisor};
pub use config::EngineConfig;
pub use engine::{Engine, EngineContext, FrameOutput};
pub use events::EngineEvent;
pub use intent::{LightingIntent, Optics, Zone, ZoneIntent};

// Logging
pub use logging::LogConfig;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O error while reading a configuration or profile file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON deserialization error
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// File extension not recognised
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the load limit
    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge {
        /// Actual size in bytes
        size: u64,
        /// Allowed size in bytes
        limit: u64,
    },

    /// A constitution failed validation
    #[error("Invalid constitution '{id}': {reason}")]
    InvalidConstitution {
        /// Profile id
        id: String,
        /// What is wrong with it
        reason: String,
    },

    /// Engine configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
