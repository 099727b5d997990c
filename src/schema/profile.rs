//! # Profile
//!
//! A profile is the runtime type definition for a family of generated items.
//!
//! Profiles are authored by hand, stored as one JSON file per profile keyed by
//! `id`, and treated as read-only by the import pipeline.

use super::{is_identity_field, FieldSchema, FieldType, IDENTITY_FIELDS, RARITY_TIERS};
use crate::{ForgeError, ForgeResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Reference balance values for the player, read-only to the import core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSettings {
    pub max_hunger: i32,
    pub max_thirst: i32,
    pub max_health: i32,
    pub max_stamina: i32,
    pub max_weight: i32,
    pub max_energy: i32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            max_hunger: 100,
            max_thirst: 100,
            max_health: 100,
            max_stamina: 100,
            max_weight: 50,
            max_energy: 100,
        }
    }
}

/// Ordered field schemas plus identity metadata for one item family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Unique id, also the file stem
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Item type the generator produces for this profile
    #[serde(default)]
    pub item_type_name: String,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default)]
    pub is_default: bool,
    /// Free text passed to the generator
    #[serde(default)]
    pub custom_context: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    #[serde(default)]
    pub player_settings: PlayerSettings,
}

fn default_version() -> i32 {
    1
}

impl Profile {
    /// Creates a profile containing only the identity fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use itemforge::Profile;
    ///
    /// let profile = Profile::new("survival_food", "Survival Food", "Food");
    /// assert_eq!(profile.fields.len(), 5);
    /// assert!(profile.field("id").unwrap().is_required);
    /// ```
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        item_type_name: impl Into<String>,
    ) -> Self {
        let mut profile = Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            item_type_name: item_type_name.into(),
            version: default_version(),
            is_default: false,
            custom_context: String::new(),
            fields: Vec::new(),
            player_settings: PlayerSettings::default(),
        };
        profile.ensure_identity_fields();
        profile
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields sorted by display order, ties kept in declaration order.
    pub fn ordered_fields(&self) -> Vec<&FieldSchema> {
        let mut fields: Vec<&FieldSchema> = self.fields.iter().collect();
        fields.sort_by_key(|field| field.display_order);
        fields
    }

    /// Appends a field, rejecting duplicate names.
    pub fn add_field(&mut self, field: FieldSchema) -> ForgeResult<()> {
        if field.name.trim().is_empty() {
            return Err(ForgeError::InvalidProfile(
                "field name must not be empty".to_string(),
            ));
        }
        if self.field(&field.name).is_some() {
            return Err(ForgeError::InvalidProfile(format!(
                "profile '{}' already has a field named '{}'",
                self.id, field.name
            )));
        }

        self.fields.push(field);
        Ok(())
    }

    /// Removes a non-identity field and returns it.
    pub fn remove_field(&mut self, name: &str) -> ForgeResult<FieldSchema> {
        if is_identity_field(name) {
            return Err(ForgeError::InvalidProfile(format!(
                "identity field '{}' cannot be removed",
                name
            )));
        }

        let index = self
            .fields
            .iter()
            .position(|field| field.name == name)
            .ok_or_else(|| {
                ForgeError::InvalidProfile(format!(
                    "profile '{}' has no field named '{}'",
                    self.id, name
                ))
            })?;

        Ok(self.fields.remove(index))
    }

    /// Inserts any missing identity field at the front of the field list.
    ///
    /// Returns the names of the fields that were synthesized.
    pub fn ensure_identity_fields(&mut self) -> Vec<&'static str> {
        let missing: Vec<&'static str> = IDENTITY_FIELDS
            .iter()
            .copied()
            .filter(|name| self.field(name).is_none())
            .collect();

        for (offset, name) in missing.iter().enumerate() {
            self.fields.insert(offset, identity_field(name));
        }

        missing
    }

    /// Converts legacy zero bounds on every field, returning the affected names.
    pub fn migrate_zero_bounds(&mut self) -> Vec<String> {
        self.fields
            .iter_mut()
            .filter_map(|field| field.migrate_zero_bounds().then(|| field.name.clone()))
            .collect()
    }

    /// Checks profile-wide invariants, returning one message per violation.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.id.trim().is_empty() {
            problems.push("profile id must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                problems.push(format!("duplicate field name '{}'", field.name));
            }
            problems.extend(field.check_invariants());
        }

        for name in IDENTITY_FIELDS {
            if self.field(name).is_none() {
                problems.push(format!("identity field '{}' is missing", name));
            }
        }

        for field in &self.fields {
            for constraint in &field.relationship_constraints {
                let target = &constraint.target_field_name;
                if target != &field.name && self.field(target).is_none() {
                    problems.push(format!(
                        "field '{}' relates to unknown field '{}'",
                        field.name, target
                    ));
                }
            }
        }

        problems
    }

    /// Parses a profile from JSON text and normalizes it.
    ///
    /// Normalization synthesizes missing identity fields and migrates zero
    /// bounds, logging both.
    pub fn from_json_str(text: &str) -> ForgeResult<Self> {
        let mut profile: Profile = serde_json::from_str(text)?;

        if profile.id.trim().is_empty() {
            return Err(ForgeError::InvalidProfile(
                "profile id must not be empty".to_string(),
            ));
        }

        let synthesized = profile.ensure_identity_fields();
        if !synthesized.is_empty() {
            debug!(
                "Profile '{}': synthesized identity fields {:?}",
                profile.id, synthesized
            );
        }

        for name in profile.migrate_zero_bounds() {
            warn!(
                "Profile '{}': field '{}' had zero-valued bounds, treating them as unbounded",
                profile.id, name
            );
        }

        Ok(profile)
    }

    /// Serializes the profile as pretty-printed JSON.
    pub fn to_json_string(&self) -> ForgeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the profile to `path`.
    pub fn save(&self, path: &Path) -> ForgeResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

/// Loads a profile file, failing with a typed error.
pub fn load_profile(path: &Path) -> ForgeResult<Profile> {
    if !path.exists() {
        return Err(ForgeError::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    Profile::from_json_str(&text)
}

/// Loads a profile file, logging and returning `None` on any failure.
pub fn load_profile_from_json(path: &Path) -> Option<Profile> {
    match load_profile(path) {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!("Could not load profile from {}: {}", path.display(), e);
            None
        }
    }
}

fn identity_field(name: &'static str) -> FieldSchema {
    let field = FieldSchema::new(name, FieldType::String).with_order(-1);

    match name {
        "id" => FieldSchema {
            display_name: "ID".to_string(),
            description: "Unique identifier, used as the asset name".to_string(),
            ..field.required()
        },
        "displayName" => FieldSchema {
            display_name: "Display Name".to_string(),
            ..field.required()
        },
        "rarity" => FieldSchema {
            display_name: "Rarity".to_string(),
            default_value: RARITY_TIERS[0].to_string(),
            ..field.with_allowed_values(RARITY_TIERS)
        },
        "category" => FieldSchema {
            display_name: "Category".to_string(),
            ..field
        },
        _ => FieldSchema {
            display_name: "Description".to_string(),
            ..field
        },
    }
}
