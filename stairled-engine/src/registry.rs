//! C8 — Animation Registry: the named, addressable set of animations
//! sensors and external callers reference by name (§4.8).

use std::collections::BTreeMap;

use parking_lot::RwLock;

use stairled_types::NamedAnimationConfig;

use crate::error::{Error, Result};

pub struct AnimationRegistry {
    animations: RwLock<BTreeMap<String, NamedAnimationConfig>>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self {
            animations: RwLock::new(BTreeMap::new()),
        }
    }

    /// Replaces the map atomically from an externally-loaded set of named
    /// animations (e.g. `CoreConfig::animations`); invalid entries reject
    /// the whole load with the first validation failure encountered (§4.8).
    pub fn load_from(animations: BTreeMap<String, NamedAnimationConfig>) -> Result<Self> {
        for (name, config) in &animations {
            config
                .validate()
                .map_err(|e| Error::ConfigInvalid {
                    field: format!("animations.{name}"),
                    reason: e.to_string(),
                })?;
        }
        Ok(Self {
            animations: RwLock::new(animations),
        })
    }

    pub fn get(&self, name: &str) -> Option<NamedAnimationConfig> {
        self.animations.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.animations.read().keys().cloned().collect()
    }

    /// Validates before insertion; an invalid update leaves the previous
    /// entry (if any) untouched (§4.8).
    pub fn upsert(&self, animation: NamedAnimationConfig) -> Result<()> {
        animation
            .validate()
            .map_err(|e| Error::ConfigInvalid {
                field: format!("animations.{}", animation.name),
                reason: e.to_string(),
            })?;
        self.animations
            .write()
            .insert(animation.name.clone(), animation);
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.animations
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound { name: name.to_string() })
    }
}

impl Default for AnimationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
