//! # Pipeline Context
//!
//! Explicitly constructed owner of everything an import run needs: settings,
//! the profile registry and the asset store. Operations borrow from it rather
//! than reaching for process-wide state.

use crate::generator::{GenerationRequest, GeneratorProcess};
use crate::import::{AssetStore, FileAssetStore, ImportReport, Importer};
use crate::record::ItemRecord;
use crate::schema::ProfileRegistry;
use crate::settings::PipelineSettings;
use crate::{config, ForgeResult};
use log::info;
use std::future::Future;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory under the output root that receives raw generator output.
const BATCH_DIR: &str = ".batches";

pub struct PipelineContext<S: AssetStore> {
    pub settings: PipelineSettings,
    pub profiles: ProfileRegistry,
    pub store: S,
}

impl PipelineContext<FileAssetStore> {
    /// Loads profiles and opens a file store as configured by `settings`.
    pub fn from_settings(settings: PipelineSettings) -> ForgeResult<Self> {
        let profiles = ProfileRegistry::load_dir(&settings.profiles_dir)?;
        info!(
            "Loaded {} profile(s) from {}",
            profiles.len(),
            settings.profiles_dir.display()
        );
        let store = FileAssetStore::new(&settings.output_root);
        Ok(Self::new(settings, profiles, store))
    }
}

impl<S: AssetStore> PipelineContext<S> {
    pub fn new(settings: PipelineSettings, profiles: ProfileRegistry, store: S) -> Self {
        Self {
            settings,
            profiles,
            store,
        }
    }

    /// An importer over this context's profiles and store.
    pub fn importer(&mut self) -> Importer<'_, S> {
        let options = self.settings.import_options();
        Importer::new(&self.profiles, &mut self.store, options)
    }

    pub fn import_from_json(
        &mut self,
        json_path: &Path,
        profile_id: &str,
        item_type_name: &str,
    ) -> ForgeResult<ImportReport> {
        self.importer()
            .import_from_json(json_path, profile_id, item_type_name)
    }

    /// Every stored item of one type, resolved to its concrete kind.
    pub fn list_items(&self, item_type_name: &str) -> ForgeResult<Vec<ItemRecord>> {
        Ok(self
            .store
            .records(item_type_name)?
            .into_iter()
            .map(ItemRecord::from_dynamic)
            .collect())
    }

    /// Builds a generation request with defaults from settings.
    ///
    /// Raw output lands in a per-batch file under the output root.
    pub fn generation_request(
        &self,
        item_type_name: &str,
        profile_id: &str,
        count: Option<u32>,
        model: Option<&str>,
    ) -> GenerationRequest {
        GenerationRequest {
            item_type_name: item_type_name.to_string(),
            count: count.unwrap_or(self.settings.default_count),
            model: model
                .unwrap_or(self.settings.default_model.as_str())
                .to_string(),
            profile_id: profile_id.to_string(),
            output_path: self.batch_output_path(item_type_name),
        }
    }

    fn batch_output_path(&self, item_type_name: &str) -> PathBuf {
        self.settings.output_root.join(BATCH_DIR).join(format!(
            "{}_{}.{}",
            crate::import::sanitize_asset_name(item_type_name),
            Uuid::new_v4().simple(),
            config::ASSET_EXTENSION
        ))
    }

    /// Runs the generator for `request`, then imports what it wrote.
    ///
    /// Completing `cancel` kills the generator before anything is imported.
    pub async fn generate_and_import<F>(
        &mut self,
        request: &GenerationRequest,
        cancel: F,
    ) -> ForgeResult<ImportReport>
    where
        F: Future<Output = ()>,
    {
        let generator = GeneratorProcess::new(&self.settings.generator_path)
            .with_base_args(self.settings.generator_args.iter().cloned());
        let outcome = generator.run_until(request, cancel).await?;
        self.import_from_json(
            &outcome.output_path,
            &request.profile_id,
            &request.item_type_name,
        )
    }
}
