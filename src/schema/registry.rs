//! # Profile Registry
//!
//! Directory-backed collection of profiles keyed by id.

use super::profile::{load_profile, Profile};
use crate::import::sanitize_asset_name;
use crate::{config, ForgeError, ForgeResult};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// All known profiles, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
    directory: Option<PathBuf>,
}

impl ProfileRegistry {
    /// Creates an empty registry with no backing directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` profile found in `dir`.
    ///
    /// Unreadable or malformed files are logged and skipped. A missing
    /// directory yields an empty registry bound to that directory.
    pub fn load_dir(dir: &Path) -> ForgeResult<Self> {
        let mut registry = Self {
            profiles: BTreeMap::new(),
            directory: Some(dir.to_path_buf()),
        };

        if !dir.exists() {
            warn!("Profile directory {} does not exist", dir.display());
            return Ok(registry);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().and_then(|e| e.to_str()) == Some(config::ASSET_EXTENSION)
            })
            .collect();
        paths.sort();

        for path in paths {
            match load_profile(&path) {
                Ok(profile) => {
                    if registry.profiles.contains_key(&profile.id) {
                        warn!(
                            "Duplicate profile id '{}' in {}, keeping the first",
                            profile.id,
                            path.display()
                        );
                        continue;
                    }
                    registry.profiles.insert(profile.id.clone(), profile);
                }
                Err(e) => warn!("Skipping profile {}: {}", path.display(), e),
            }
        }

        info!(
            "Loaded {} profile(s) from {}",
            registry.profiles.len(),
            dir.display()
        );
        Ok(registry)
    }

    /// Adds or replaces a profile in memory.
    pub fn insert(&mut self, profile: Profile) -> Option<Profile> {
        self.profiles.insert(profile.id.clone(), profile)
    }

    /// Looks up a profile by id.
    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    /// Looks up a profile by id, failing if unknown.
    pub fn require(&self, id: &str) -> ForgeResult<&Profile> {
        self.get(id)
            .ok_or_else(|| ForgeError::ProfileNotFound(id.to_string()))
    }

    /// The profile flagged `isDefault` for an item type, if any.
    pub fn default_for(&self, item_type_name: &str) -> Option<&Profile> {
        self.profiles
            .values()
            .find(|p| p.is_default && p.item_type_name == item_type_name)
    }

    /// All profile ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Writes a profile to the backing directory as `{id}.json` and registers it.
    ///
    /// The file stem is the sanitized id, so it always lands inside the directory.
    pub fn save(&mut self, profile: Profile) -> ForgeResult<PathBuf> {
        let dir = self.directory.clone().ok_or_else(|| {
            ForgeError::Persistence("profile registry has no backing directory".to_string())
        })?;

        let path = dir.join(format!(
            "{}.{}",
            sanitize_asset_name(&profile.id),
            config::ASSET_EXTENSION
        ));
        profile.save(&path)?;
        self.insert(profile);
        Ok(path)
    }
}
