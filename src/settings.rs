//! # Pipeline Settings
//!
//! User configuration for the generation and import pipeline, stored as a
//! small JSON file. Every field has a default so partial files are valid.

use crate::import::{ImportOptions, ValidationMode};
use crate::{config, ForgeResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration shared by every pipeline operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// External generator executable
    pub generator_path: PathBuf,
    /// Arguments passed to the generator before the request flags
    pub generator_args: Vec<String>,
    /// Model requested from the generator
    pub default_model: String,
    /// Items requested per generation batch
    pub default_count: u32,
    /// Directory holding profile files
    pub profiles_dir: PathBuf,
    /// Root directory for imported assets
    pub output_root: PathBuf,
    /// Field validation applied during import
    pub validation: ValidationMode,
}

impl PipelineSettings {
    /// Loads settings from `path`, falling back to defaults if it is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use itemforge::PipelineSettings;
    /// use std::path::Path;
    ///
    /// let settings = PipelineSettings::load(Path::new("does-not-exist.json")).unwrap();
    /// assert_eq!(settings, PipelineSettings::default());
    /// ```
    pub fn load(path: &Path) -> ForgeResult<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes settings to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> ForgeResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Settings rooted in a scratch directory, for tests.
    pub fn for_testing(root: &Path) -> Self {
        Self {
            profiles_dir: root.join(config::DEFAULT_PROFILES_DIR),
            output_root: root.join(config::DEFAULT_OUTPUT_ROOT),
            validation: ValidationMode::Strict,
            ..Self::default()
        }
    }

    /// Import options derived from these settings.
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            validation: self.validation,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            generator_path: PathBuf::from(config::DEFAULT_GENERATOR_PATH),
            generator_args: Vec::new(),
            default_model: config::DEFAULT_MODEL.to_string(),
            default_count: config::DEFAULT_ITEM_COUNT,
            profiles_dir: PathBuf::from(config::DEFAULT_PROFILES_DIR),
            output_root: PathBuf::from(config::DEFAULT_OUTPUT_ROOT),
            validation: ValidationMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itemforge.json");
        std::fs::write(&path, r#"{ "defaultModel": "llama3", "validation": "strict" }"#).unwrap();

        let settings = PipelineSettings::load(&path).unwrap();
        assert_eq!(settings.default_model, "llama3");
        assert_eq!(settings.validation, ValidationMode::Strict);
        assert_eq!(settings.default_count, config::DEFAULT_ITEM_COUNT);
        assert_eq!(settings.import_options().validation, ValidationMode::Strict);
    }

    #[test]
    fn test_malformed_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itemforge.json");
        std::fs::write(&path, "{ nope").unwrap();

        assert!(PipelineSettings::load(&path).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itemforge.json");
        let settings = PipelineSettings::for_testing(dir.path());

        settings.save(&path).unwrap();
        assert_eq!(PipelineSettings::load(&path).unwrap(), settings);
    }
}
