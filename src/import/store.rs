//! # Asset Stores
//!
//! Destinations for imported records.
//!
//! Stores stage writes and commit them in one [`AssetStore::flush`] per batch.
//! Writing a record whose name already exists in a location overwrites it, so
//! re-importing a batch is idempotent.

use crate::record::DynamicRecord;
use crate::{config, ForgeError, ForgeResult};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Create-or-overwrite persistence for named, type-tagged records.
pub trait AssetStore {
    /// Makes sure the output location exists.
    fn ensure_location(&mut self, location: &str) -> ForgeResult<()>;

    /// Stages `record` as `{location}/{name}`, replacing any existing asset.
    fn write_record(&mut self, location: &str, name: &str, record: &DynamicRecord)
        -> ForgeResult<()>;

    /// Commits every staged write.
    fn flush(&mut self) -> ForgeResult<()>;

    /// Committed records in a location, ordered by name.
    fn records(&self, location: &str) -> ForgeResult<Vec<DynamicRecord>>;
}

/// Turns an arbitrary id into a safe asset or directory name.
///
/// # Examples
///
/// ```
/// use itemforge::sanitize_asset_name;
///
/// assert_eq!(sanitize_asset_name("food_1"), "food_1");
/// assert_eq!(sanitize_asset_name("../etc/passwd"), "_.._etc_passwd");
/// assert_eq!(sanitize_asset_name("  "), "_");
/// ```
pub fn sanitize_asset_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// Stores each record as a pretty-printed JSON file under a root directory.
#[derive(Debug)]
pub struct FileAssetStore {
    root: PathBuf,
    pending: BTreeMap<PathBuf, String>,
}

impl FileAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pending: BTreeMap::new(),
        }
    }

    /// Number of staged writes waiting for a flush.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Path an asset is written to.
    pub fn asset_path(&self, location: &str, name: &str) -> PathBuf {
        self.root
            .join(sanitize_asset_name(location))
            .join(format!("{}.{}", sanitize_asset_name(name), config::ASSET_EXTENSION))
    }

    fn commit(path: &Path, contents: &str) -> std::io::Result<()> {
        let staging = path.with_extension(format!("{}.tmp", config::ASSET_EXTENSION));
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, path)
    }
}

impl AssetStore for FileAssetStore {
    fn ensure_location(&mut self, location: &str) -> ForgeResult<()> {
        let dir = self.root.join(sanitize_asset_name(location));
        std::fs::create_dir_all(&dir).map_err(|e| {
            ForgeError::Persistence(format!("cannot create {}: {}", dir.display(), e))
        })
    }

    fn write_record(
        &mut self,
        location: &str,
        name: &str,
        record: &DynamicRecord,
    ) -> ForgeResult<()> {
        let path = self.asset_path(location, name);
        let contents = serde_json::to_string_pretty(record)?;
        self.pending.insert(path, contents);
        Ok(())
    }

    fn flush(&mut self) -> ForgeResult<()> {
        let pending = std::mem::take(&mut self.pending);
        debug!("Flushing {} asset(s) to {}", pending.len(), self.root.display());

        for (path, contents) in pending {
            Self::commit(&path, &contents).map_err(|e| {
                ForgeError::Persistence(format!("cannot write {}: {}", path.display(), e))
            })?;
        }

        Ok(())
    }

    fn records(&self, location: &str) -> ForgeResult<Vec<DynamicRecord>> {
        let dir = self.root.join(sanitize_asset_name(location));
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().and_then(|e| e.to_str()) == Some(config::ASSET_EXTENSION)
            })
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let text = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<DynamicRecord>(&text) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable asset {}: {}", path.display(), e),
            }
        }

        Ok(records)
    }
}

/// Keeps records in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    locations: BTreeSet<String>,
    pending: BTreeMap<(String, String), DynamicRecord>,
    committed: BTreeMap<(String, String), DynamicRecord>,
    flushes: usize,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total committed records across all locations.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn get(&self, location: &str, name: &str) -> Option<&DynamicRecord> {
        self.committed
            .get(&(sanitize_asset_name(location), sanitize_asset_name(name)))
    }

    /// How many times the store has been flushed.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn has_location(&self, location: &str) -> bool {
        self.locations.contains(&sanitize_asset_name(location))
    }
}

impl AssetStore for InMemoryAssetStore {
    fn ensure_location(&mut self, location: &str) -> ForgeResult<()> {
        self.locations.insert(sanitize_asset_name(location));
        Ok(())
    }

    fn write_record(
        &mut self,
        location: &str,
        name: &str,
        record: &DynamicRecord,
    ) -> ForgeResult<()> {
        let location = sanitize_asset_name(location);
        if !self.locations.contains(&location) {
            return Err(ForgeError::Persistence(format!(
                "location '{}' does not exist",
                location
            )));
        }

        self.pending
            .insert((location, sanitize_asset_name(name)), record.clone());
        Ok(())
    }

    fn flush(&mut self) -> ForgeResult<()> {
        self.committed.append(&mut self.pending);
        self.flushes += 1;
        Ok(())
    }

    fn records(&self, location: &str) -> ForgeResult<Vec<DynamicRecord>> {
        let location = sanitize_asset_name(location);
        Ok(self
            .committed
            .iter()
            .filter(|((loc, _), _)| *loc == location)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
