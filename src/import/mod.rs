//! # Import Module
//!
//! Turns a generator output file into persisted records.
//!
//! The pipeline is single-pass and synchronous: read the file, split it into
//! object fragments, parse and build one record per fragment, optionally
//! validate it against its profile, stage it in the asset store and flush the
//! store once at the end. A bad fragment is skipped and reported; it never
//! aborts the rest of the batch. Only persistence failures stop an import.

pub mod store;

pub use store::*;

use crate::record::{DynamicRecord, ItemIdentity};
use crate::schema::{Profile, ProfileRegistry};
use crate::tokenizer::{
    check_fragment_balance, parse_object_fragment, split_top_level_objects, FragmentError,
};
use crate::validation::{validate_record, validate_record_identity, FieldIssue};
use crate::{ForgeError, ForgeResult};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// How field validation affects an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Only the `id` gate applies
    Off,
    /// Issues are logged and reported, records are still imported
    #[default]
    Warn,
    /// Records with issues are skipped
    Strict,
}

/// Options for a single import run.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub validation: ValidationMode,
}

/// Why a fragment did not become a persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    DuplicateId(String),
    Malformed(FragmentError),
    Invalid(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingId => write!(f, "missing id"),
            SkipReason::DuplicateId(id) => write!(f, "duplicate id '{}' in batch", id),
            SkipReason::Malformed(e) => write!(f, "malformed fragment: {}", e),
            SkipReason::Invalid(message) => write!(f, "failed validation: {}", message),
        }
    }
}

/// A fragment that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Position of the fragment in the batch
    pub index: usize,
    pub id: Option<String>,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "#{} '{}': {}", self.index, id, self.reason),
            None => write!(f, "#{}: {}", self.index, self.reason),
        }
    }
}

/// A validation issue found on an imported record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIssue {
    pub id: String,
    pub issue: FieldIssue,
}

/// Outcome of one import batch.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub batch_id: Uuid,
    pub profile_id: String,
    pub item_type_name: String,
    /// Ids persisted by this batch, in source order
    pub imported_ids: Vec<String>,
    pub skipped: Vec<SkippedItem>,
    /// Issues on records imported in warn mode
    pub issues: Vec<RecordIssue>,
}

impl ImportReport {
    fn new(profile_id: &str, item_type_name: &str) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            profile_id: profile_id.to_string(),
            item_type_name: item_type_name.to_string(),
            imported_ids: Vec::new(),
            skipped: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Number of records persisted.
    pub fn imported_count(&self) -> usize {
        self.imported_ids.len()
    }

    fn skip(&mut self, index: usize, id: Option<String>, reason: SkipReason) {
        warn!(
            "[{}] Skipping {} item #{}{}: {}",
            self.batch_id,
            self.item_type_name,
            index,
            id.as_deref()
                .map(|id| format!(" '{}'", id))
                .unwrap_or_default(),
            reason
        );
        self.skipped.push(SkippedItem { index, id, reason });
    }
}

/// Imports generator output into an asset store.
///
/// Profiles are only read. The store receives one flush per batch.
pub struct Importer<'a, S: AssetStore> {
    profiles: &'a ProfileRegistry,
    store: &'a mut S,
    options: ImportOptions,
}

impl<'a, S: AssetStore> Importer<'a, S> {
    pub fn new(profiles: &'a ProfileRegistry, store: &'a mut S, options: ImportOptions) -> Self {
        Self {
            profiles,
            store,
            options,
        }
    }

    /// Imports the JSON array file at `json_path`.
    ///
    /// Fails with [`ForgeError::FileNotFound`] if the file does not exist and
    /// with [`ForgeError::Persistence`] if records cannot be written. Every
    /// other problem is reported per item in the returned [`ImportReport`].
    pub fn import_from_json(
        &mut self,
        json_path: &Path,
        profile_id: &str,
        item_type_name: &str,
    ) -> ForgeResult<ImportReport> {
        if !json_path.is_file() {
            return Err(ForgeError::FileNotFound(json_path.to_path_buf()));
        }

        let text = std::fs::read_to_string(json_path)?;
        debug!("Read {} bytes from {}", text.len(), json_path.display());
        self.import_from_str(&text, profile_id, item_type_name)
    }

    /// Imports generator output already held in memory.
    pub fn import_from_str(
        &mut self,
        text: &str,
        profile_id: &str,
        item_type_name: &str,
    ) -> ForgeResult<ImportReport> {
        let profiles = self.profiles;
        let profile = profiles.get(profile_id);
        let item_type_name = match (item_type_name.trim(), profile) {
            ("", Some(profile)) => profile.item_type_name.as_str(),
            (name, _) => name,
        };

        let mut report = ImportReport::new(profile_id, item_type_name);

        let fragments = split_top_level_objects(text);
        if fragments.is_empty() {
            warn!(
                "[{}] No items found for {}",
                report.batch_id, item_type_name
            );
            return Ok(report);
        }

        if profile.is_none() && self.options.validation != ValidationMode::Off {
            warn!(
                "[{}] Profile '{}' not found, checking identity fields only",
                report.batch_id, profile_id
            );
        }

        self.store.ensure_location(item_type_name)?;

        let mut seen = HashSet::new();
        for (index, fragment) in fragments.iter().enumerate() {
            let record = match self.prepare(fragment, profile, profile_id, item_type_name) {
                Ok((record, issues)) => {
                    let id = record.id();
                    report
                        .issues
                        .extend(issues.into_iter().map(|issue| RecordIssue {
                            id: id.clone(),
                            issue,
                        }));
                    record
                }
                Err((id, reason)) => {
                    report.skip(index, id, reason);
                    continue;
                }
            };

            // Ids that sanitize to the same asset name would overwrite each other
            let id = record.id();
            if !seen.insert(sanitize_asset_name(&id)) {
                report.skip(index, Some(id.clone()), SkipReason::DuplicateId(id));
                continue;
            }

            self.store.write_record(item_type_name, &id, &record)?;
            debug!("[{}] Staged {}", report.batch_id, record.label());
            report.imported_ids.push(id);
        }

        self.store.flush()?;

        info!(
            "[{}] Imported {} {} item(s), skipped {}",
            report.batch_id,
            report.imported_count(),
            item_type_name,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Parses, builds and validates one fragment.
    fn prepare(
        &self,
        fragment: &str,
        profile: Option<&Profile>,
        profile_id: &str,
        item_type_name: &str,
    ) -> Result<(DynamicRecord, Vec<FieldIssue>), (Option<String>, SkipReason)> {
        let fields = parse_object_fragment(fragment);
        let id = fields
            .get("id")
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        if let Err(e) = check_fragment_balance(fragment) {
            return Err((id, SkipReason::Malformed(e)));
        }

        let record = DynamicRecord::build(fields, profile_id, item_type_name)
            .map_err(|_| (None, SkipReason::MissingId))?;

        let issues = self.check(&record, profile);
        if self.options.validation == ValidationMode::Strict {
            if let Some(first) = issues.first() {
                return Err((id, SkipReason::Invalid(first.to_string())));
            }
        }
        for issue in &issues {
            warn!("Item '{}': {}", record.id(), issue);
        }

        Ok((record, issues))
    }

    fn check(&self, record: &DynamicRecord, profile: Option<&Profile>) -> Vec<FieldIssue> {
        match (self.options.validation, profile) {
            (ValidationMode::Off, _) => Vec::new(),
            (_, Some(profile)) => validate_record(profile, record),
            (_, None) => {
                let result = validate_record_identity(record);
                if result.is_valid {
                    Vec::new()
                } else {
                    vec![FieldIssue {
                        field: "identity".to_string(),
                        result,
                    }]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, FieldType};

    fn food_registry() -> ProfileRegistry {
        let mut profile = Profile::new("survival_food", "Survival Food", "Food");
        profile
            .add_field(FieldSchema::new("hungerRestore", FieldType::Integer).with_range(0.0, 100.0))
            .unwrap();

        let mut registry = ProfileRegistry::new();
        registry.insert(profile);
        registry
    }

    fn import(
        text: &str,
        registry: &ProfileRegistry,
        store: &mut InMemoryAssetStore,
        validation: ValidationMode,
    ) -> ImportReport {
        Importer::new(registry, store, ImportOptions { validation })
            .import_from_str(text, "survival_food", "Food")
            .unwrap()
    }

    #[test]
    fn test_import_two_items() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();
        let report = import(
            r#"[{"id":"food_1","displayName":"Apple","hungerRestore":"10"},{"id":"food_2","displayName":"Bread","hungerRestore":"20"}]"#,
            &registry,
            &mut store,
            ValidationMode::Warn,
        );

        assert_eq!(report.imported_count(), 2);
        assert!(report.skipped.is_empty());
        assert!(report.issues.is_empty());
        assert_eq!(store.flush_count(), 1);
        assert_eq!(
            store.get("Food", "food_2").unwrap().get_int("hungerRestore", 0),
            20
        );
    }

    #[test]
    fn test_missing_id_is_skipped() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();
        let report = import(
            r#"[{"displayName":"NoId"}]"#,
            &registry,
            &mut store,
            ValidationMode::Warn,
        );

        assert_eq!(report.imported_count(), 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::MissingId);
        assert_eq!(report.skipped[0].to_string(), "#0: missing id");
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();

        for text in ["", "[]", "  \n"] {
            let report = import(text, &registry, &mut store, ValidationMode::Warn);
            assert_eq!(report.imported_count(), 0);
            assert!(report.skipped.is_empty());
        }
        assert_eq!(store.flush_count(), 0);
        assert!(!store.has_location("Food"));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();
        let report = import(
            r#"[{"id":"a","displayName":"First"},{"id":"a","displayName":"Second"}]"#,
            &registry,
            &mut store,
            ValidationMode::Off,
        );

        assert_eq!(report.imported_ids, vec!["a"]);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::DuplicateId("a".to_string())
        );
        assert_eq!(
            store.get("Food", "a").unwrap().get_string("displayName", ""),
            "First"
        );
    }

    #[test]
    fn test_ids_with_the_same_asset_name_are_duplicates() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();
        let report = import(
            r#"[{"id":"a/b","displayName":"One"},{"id":"a_b","displayName":"Two"},{"id":" c ","displayName":"Three"},{"id":"c","displayName":"Four"}]"#,
            &registry,
            &mut store,
            ValidationMode::Off,
        );

        assert_eq!(report.imported_ids, vec!["a/b", " c "]);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::DuplicateId("a_b".to_string())
        );
        assert_eq!(report.skipped[1].index, 3);
        assert_eq!(store.len(), report.imported_count());
        assert_eq!(
            store.get("Food", "c").unwrap().get_string("displayName", ""),
            "Three"
        );
    }

    #[test]
    fn test_warn_mode_imports_with_issues() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();
        let report = import(
            r#"[{"id":"a","displayName":"Feast","hungerRestore":"250"}]"#,
            &registry,
            &mut store,
            ValidationMode::Warn,
        );

        assert_eq!(report.imported_count(), 1);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].id, "a");
        assert_eq!(report.issues[0].issue.field, "hungerRestore");
    }

    #[test]
    fn test_strict_mode_skips_invalid_records() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();
        let report = import(
            r#"[{"id":"a","displayName":"Feast","hungerRestore":"250"},{"id":"b","displayName":"Snack","hungerRestore":"5"}]"#,
            &registry,
            &mut store,
            ValidationMode::Strict,
        );

        assert_eq!(report.imported_ids, vec!["b"]);
        assert_eq!(report.skipped[0].id.as_deref(), Some("a"));
        assert!(matches!(report.skipped[0].reason, SkipReason::Invalid(ref m) if m.contains("maximum of 100")));
    }

    #[test]
    fn test_unknown_profile_checks_identity_only() {
        let registry = ProfileRegistry::new();
        let mut store = InMemoryAssetStore::new();
        let report = Importer::new(
            &registry,
            &mut store,
            ImportOptions {
                validation: ValidationMode::Strict,
            },
        )
        .import_from_str(
            r#"[{"id":"a","displayName":"A","hungerRestore":"999"},{"id":"b"}]"#,
            "missing_profile",
            "Food",
        )
        .unwrap();

        assert_eq!(report.imported_ids, vec!["a"]);
        assert!(matches!(report.skipped[0].reason, SkipReason::Invalid(ref m) if m.contains("displayName")));
    }

    #[test]
    fn test_empty_item_type_falls_back_to_profile() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();
        let report = Importer::new(&registry, &mut store, ImportOptions::default())
            .import_from_str(r#"[{"id":"a","displayName":"A"}]"#, "survival_food", "")
            .unwrap();

        assert_eq!(report.item_type_name, "Food");
        assert!(store.get("Food", "a").is_some());
    }

    #[test]
    fn test_missing_file() {
        let registry = food_registry();
        let mut store = InMemoryAssetStore::new();
        let result = Importer::new(&registry, &mut store, ImportOptions::default())
            .import_from_json(Path::new("/definitely/not/here.json"), "survival_food", "Food");

        assert!(matches!(result, Err(ForgeError::FileNotFound(_))));
    }
}
