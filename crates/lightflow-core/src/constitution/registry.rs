//! Registry of constitutions keyed by profile id

use super::presets::{self, BUILTIN_IDS};
use super::Constitution;
use crate::config::{load_document, MAX_CONFIG_FILE_SIZE};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// On-disk collection of extra profiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFile {
    /// Profiles to register, later entries replace earlier ones with the same id
    pub profiles: Vec<Constitution>,
}

/// Profile id to constitution map, always containing `default`
#[derive(Debug, Clone)]
pub struct ConstitutionRegistry {
    profiles: BTreeMap<String, Constitution>,
    fallback: Constitution,
}

impl Default for ConstitutionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ConstitutionRegistry {
    /// Registry pre-populated with the built-in presets
    pub fn with_builtins() -> Self {
        let profiles = BUILTIN_IDS
            .iter()
            .filter_map(|id| presets::builtin(id))
            .map(|c| (c.id.clone(), c))
            .collect();
        Self {
            profiles,
            fallback: presets::default_profile(),
        }
    }

    /// Validate and insert a constitution, replacing any profile with the same id.
    ///
    /// Registering `default` also replaces the fallback used for unknown ids.
    pub fn register(&mut self, constitution: Constitution) -> Result<()> {
        constitution.validate()?;
        debug!("Registering constitution '{}'", constitution.id);
        if constitution.id == "default" {
            self.fallback = constitution.clone();
        }
        self.profiles.insert(constitution.id.clone(), constitution);
        Ok(())
    }

    /// Constitution for `id`, if registered
    pub fn get(&self, id: &str) -> Option<&Constitution> {
        self.profiles.get(id)
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    /// Constitution for `id`, falling back to `default`
    pub fn resolve(&self, id: &str) -> &Constitution {
        self.profiles.get(id).unwrap_or(&self.fallback)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.profiles.keys().map(String::as_str)
    }

    /// Number of registered profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always false: the registry holds at least the built-ins
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Load extra profiles from a JSON, RON or TOML file.
    ///
    /// Every profile is validated before any is registered, so a bad file leaves the
    /// registry untouched. Returns the number of profiles loaded.
    pub fn load_profiles(&mut self, path: &Path) -> Result<usize> {
        let file: ProfileFile = load_document(path, MAX_CONFIG_FILE_SIZE)?;
        for profile in &file.profiles {
            profile.validate()?;
        }
        let count = file.profiles.len();
        for profile in file.profiles {
            self.register(profile)?;
        }
        info!("Loaded {} profile(s) from {}", count, path.display());
        Ok(count)
    }
}
