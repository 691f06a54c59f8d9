//! Built-in constitution presets

use super::{
    AccentBehavior, Bounds, Constitution, HueRange, HueRemap, MovementPhysics, MovementProfile,
    StrobePolicy,
};
use crate::effects::EffectCategory;
use crate::intent::Optics;

/// Ids of every built-in preset
pub const BUILTIN_IDS: [&str; 5] = [
    "default",
    "techno-club",
    "chill-lounge",
    "pop-rock",
    "latino-fiesta",
];

fn patterns(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// Built-in preset by id
pub fn builtin(id: &str) -> Option<Constitution> {
    match id {
        "default" => Some(default_profile()),
        "techno-club" => Some(techno_club()),
        "chill-lounge" => Some(chill_lounge()),
        "pop-rock" => Some(pop_rock()),
        "latino-fiesta" => Some(latino_fiesta()),
        _ => None,
    }
}

/// Neutral profile, permits everything except unlimited strobing
pub fn default_profile() -> Constitution {
    Constitution {
        id: "default".to_string(),
        name: "Default".to_string(),
        forbidden_ranges: Vec::new(),
        allowed_ranges: Vec::new(),
        remap_rules: Vec::new(),
        elastic_rotation_step: 15.0,
        saturation: Bounds::new(0.5, 1.0),
        lightness: Bounds::new(0.35, 0.6),
        atmospheric_temperature_k: 6500.0,
        gravity_strength: 0.0,
        strobe_policy: StrobePolicy::Limited,
        accent_behavior: AccentBehavior::Hue,
        mirror_ambient: false,
        dimming: Bounds::new(0.05, 1.0),
        allowed_effects: EffectCategory::ALL.to_vec(),
        allow_dynamic_effects: true,
        max_strobe_rate: 10.0,
        max_effect_intensity: 1.0,
        drop_effect: Some("flash".to_string()),
        movement: MovementProfile {
            patterns: patterns(&["circle", "figure8", "sweep"]),
            calm_pattern: "drift".to_string(),
            amplitude_scale: 1.0,
            energy_boost: 0.3,
            physics: MovementPhysics {
                acceleration: 0.5,
                max_velocity: 250.0,
                friction: 0.3,
            },
        },
        optics: Optics::new(0.5, 0.5, 1.0),
    }
}

/// Cold, saturated, strobe-heavy club profile; no yellows or oranges
pub fn techno_club() -> Constitution {
    Constitution {
        id: "techno-club".to_string(),
        name: "Techno Club".to_string(),
        forbidden_ranges: vec![HueRange::new(30.0, 80.0)],
        allowed_ranges: Vec::new(),
        remap_rules: vec![HueRemap {
            from: HueRange::new(30.0, 55.0),
            to: 300.0,
        }],
        elastic_rotation_step: 15.0,
        saturation: Bounds::new(0.8, 1.0),
        lightness: Bounds::new(0.35, 0.55),
        atmospheric_temperature_k: 9000.0,
        gravity_strength: 0.35,
        strobe_policy: StrobePolicy::Free,
        accent_behavior: AccentBehavior::White,
        mirror_ambient: false,
        dimming: Bounds::new(0.0, 1.0),
        allowed_effects: EffectCategory::ALL.to_vec(),
        allow_dynamic_effects: true,
        max_strobe_rate: 20.0,
        max_effect_intensity: 1.0,
        drop_effect: Some("strobe".to_string()),
        movement: MovementProfile {
            patterns: patterns(&["sweep", "ballyhoo", "wave", "circle"]),
            calm_pattern: "drift".to_string(),
            amplitude_scale: 1.0,
            energy_boost: 0.5,
            physics: MovementPhysics {
                acceleration: 0.9,
                max_velocity: 250.0,
                friction: 0.1,
            },
        },
        optics: Optics::new(0.3, 0.6, 1.0),
    }
}

/// Warm, dim, slow profile; no reds, no dynamic effects
pub fn chill_lounge() -> Constitution {
    Constitution {
        id: "chill-lounge".to_string(),
        name: "Chill Lounge".to_string(),
        forbidden_ranges: vec![HueRange::new(340.0, 20.0)],
        allowed_ranges: Vec::new(),
        remap_rules: vec![HueRemap {
            from: HueRange::new(340.0, 359.99),
            to: 320.0,
        }],
        elastic_rotation_step: 10.0,
        saturation: Bounds::new(0.3, 0.6),
        lightness: Bounds::new(0.25, 0.45),
        atmospheric_temperature_k: 3200.0,
        gravity_strength: 0.5,
        strobe_policy: StrobePolicy::Forbidden,
        accent_behavior: AccentBehavior::Brighten,
        mirror_ambient: true,
        dimming: Bounds::new(0.1, 0.7),
        allowed_effects: vec![
            EffectCategory::Pulse,
            EffectCategory::Ambient,
            EffectCategory::Blackout,
        ],
        allow_dynamic_effects: false,
        max_strobe_rate: 0.0,
        max_effect_intensity: 0.7,
        drop_effect: None,
        movement: MovementProfile {
            patterns: patterns(&["drift", "circle"]),
            calm_pattern: "drift".to_string(),
            amplitude_scale: 0.6,
            energy_boost: 0.1,
            physics: MovementPhysics {
                acceleration: 0.2,
                max_velocity: 80.0,
                friction: 0.7,
            },
        },
        optics: Optics::new(0.8, 0.4, 0.7),
    }
}

/// Stage profile with moderate strobing; avoids sickly yellows
pub fn pop_rock() -> Constitution {
    Constitution {
        id: "pop-rock".to_string(),
        name: "Pop Rock".to_string(),
        forbidden_ranges: vec![HueRange::new(50.0, 70.0)],
        allowed_ranges: Vec::new(),
        remap_rules: Vec::new(),
        elastic_rotation_step: 12.0,
        saturation: Bounds::new(0.6, 1.0),
        lightness: Bounds::new(0.4, 0.6),
        atmospheric_temperature_k: 6000.0,
        gravity_strength: 0.0,
        strobe_policy: StrobePolicy::Limited,
        accent_behavior: AccentBehavior::Hue,
        mirror_ambient: false,
        dimming: Bounds::new(0.05, 1.0),
        allowed_effects: EffectCategory::ALL.to_vec(),
        allow_dynamic_effects: true,
        max_strobe_rate: 12.0,
        max_effect_intensity: 0.9,
        drop_effect: Some("flash".to_string()),
        movement: MovementProfile {
            patterns: patterns(&["circle", "nod", "figure8", "sweep"]),
            calm_pattern: "drift".to_string(),
            amplitude_scale: 0.9,
            energy_boost: 0.4,
            physics: MovementPhysics {
                acceleration: 0.7,
                max_velocity: 200.0,
                friction: 0.3,
            },
        },
        optics: Optics::new(0.5, 0.5, 1.0),
    }
}

/// Warm festive profile; cold blues are pushed to teal
pub fn latino_fiesta() -> Constitution {
    Constitution {
        id: "latino-fiesta".to_string(),
        name: "Latino Fiesta".to_string(),
        forbidden_ranges: vec![HueRange::new(190.0, 250.0)],
        allowed_ranges: Vec::new(),
        remap_rules: vec![HueRemap {
            from: HueRange::new(190.0, 250.0),
            to: 170.0,
        }],
        elastic_rotation_step: 20.0,
        saturation: Bounds::new(0.7, 1.0),
        lightness: Bounds::new(0.4, 0.6),
        atmospheric_temperature_k: 4200.0,
        gravity_strength: 0.3,
        strobe_policy: StrobePolicy::Limited,
        accent_behavior: AccentBehavior::Hue,
        mirror_ambient: false,
        dimming: Bounds::new(0.1, 1.0),
        allowed_effects: EffectCategory::ALL.to_vec(),
        allow_dynamic_effects: true,
        max_strobe_rate: 8.0,
        max_effect_intensity: 1.0,
        drop_effect: Some("color_pulse".to_string()),
        movement: MovementProfile {
            patterns: patterns(&["figure8", "ballyhoo", "circle"]),
            calm_pattern: "drift".to_string(),
            amplitude_scale: 1.0,
            energy_boost: 0.4,
            physics: MovementPhysics {
                acceleration: 0.6,
                max_velocity: 220.0,
                friction: 0.3,
            },
        },
        optics: Optics::new(0.6, 0.5, 1.0),
    }
}
