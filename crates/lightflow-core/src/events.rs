//! Engine events, returned with each frame

use crate::color::HarmonyStrategy;
use crate::effects::EffectHandle;
use crate::stabilizer::{Emotion, PitchClass};
use serde::{Deserialize, Serialize};

/// Something noteworthy that happened during a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// An effect instance started
    EffectTriggered {
        /// Instance handle
        handle: EffectHandle,
        /// Effect type
        effect_type: String,
    },
    /// The shield refused an effect
    EffectBlocked {
        /// Effect type
        effect_type: String,
        /// Why it was refused
        reason: String,
    },
    /// The shield capped an effect
    EffectDegraded {
        /// Instance handle
        handle: EffectHandle,
        /// Effect type
        effect_type: String,
    },
    /// An effect ran its course
    EffectFinished {
        /// Instance handle
        handle: EffectHandle,
        /// Effect type
        effect_type: String,
    },
    /// An effect was stopped early
    EffectAborted {
        /// Instance handle
        handle: EffectHandle,
        /// Effect type
        effect_type: String,
    },
    /// A trigger named an unregistered effect type
    UnknownEffectType {
        /// Effect type
        effect_type: String,
    },
    /// The active profile changed
    ProfileChanged {
        /// Previous profile, `None` on the first frame
        from: Option<String>,
        /// New profile
        to: String,
    },
    /// A frame named an unregistered profile; `default` is used instead
    UnknownProfile {
        /// Requested profile
        profile_id: String,
    },
    /// A drop started
    DropStarted,
    /// A drop ended
    DropEnded,
    /// The stable key changed
    KeyChanged {
        /// Previous key
        from: Option<PitchClass>,
        /// New key
        to: Option<PitchClass>,
    },
    /// The stable emotion changed
    EmotionChanged {
        /// Previous emotion
        from: Emotion,
        /// New emotion
        to: Emotion,
    },
    /// The harmony strategy changed
    StrategyChanged {
        /// Previous strategy
        from: HarmonyStrategy,
        /// New strategy
        to: HarmonyStrategy,
    },
}

impl EngineEvent {
    /// Effect handle the event refers to, if any
    pub fn handle(&self) -> Option<EffectHandle> {
        match self {
            EngineEvent::EffectTriggered { handle, .. }
            | EngineEvent::EffectDegraded { handle, .. }
            | EngineEvent::EffectFinished { handle, .. }
            | EngineEvent::EffectAborted { handle, .. } => Some(*handle),
            _ => None,
        }
    }
}
