// rust/datasets-core/src/store.rs

//! The `DatasetStore` entry point.
//!
//! # Example
//!
//! ```no_run
//! use datasets_core::dataset::{Dataset, FeatureKind, Field, ImageValue, Schema, Value};
//! use datasets_core::DatasetStore;
//!
//! let store = DatasetStore::new().unwrap();
//!
//! let schema = Schema::new(vec![
//!     Field::new("image", FeatureKind::Image { decode: true }),
//!     Field::new("label", FeatureKind::Int64),
//! ])
//! .unwrap();
//! let ds = Dataset::from_rows(
//!     schema,
//!     vec![vec![Value::from(ImageValue::from_path("images/00000.png")), Value::from(3i64)]],
//! )
//! .unwrap();
//!
//! // Writes train-00000-of-00001-<token>.parquet and dataset_info.json
//! let report = store.save("mnist_parquet", &ds, None).unwrap();
//! println!("wrote {} shards", report.num_shards());
//!
//! let dict = store.load("mnist_parquet").unwrap();
//! assert_eq!(dict["train"].num_rows(), 1);
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::config::DatasetsConfig;
use crate::dataset::{Dataset, DatasetDict};
use crate::error::Result;
use crate::load::{load_dataset, DirectoryLoader, GenericLoader};
use crate::save::{save_to_parquet, SaveOptions, SaveReport, SaveSource};
use crate::storage::{LocalStorage, StorageBackend};

/// Saves and loads sharded parquet dataset directories.
///
/// The store owns the configuration and the storage backend; relative
/// directories resolve against `storage.base_path`.
pub struct DatasetStore {
    config: DatasetsConfig,
    storage: Arc<dyn StorageBackend>,
}

impl DatasetStore {
    /// Creates a store with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::from_config(DatasetsConfig::default())
    }

    /// Creates a store from a TOML configuration file.
    ///
    /// Environment variable overrides are applied after loading the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = DatasetsConfig::from_file(path)?.with_env_overrides();
        Self::from_config(config)
    }

    /// Creates a store from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the storage
    /// backend cannot be initialized.
    pub fn from_config(config: DatasetsConfig) -> Result<Self> {
        config.validate()?;
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config.storage)?);
        Ok(Self { config, storage })
    }

    /// Creates a store over an existing storage backend.
    pub fn with_storage(config: DatasetsConfig, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, storage })
    }

    /// Saves one dataset as a split of `dir`.
    ///
    /// `split` defaults to `save.default_split`.
    pub fn save(
        &self,
        dir: impl AsRef<Path>,
        dataset: &Dataset,
        split: Option<&str>,
    ) -> Result<SaveReport> {
        let split = split.unwrap_or(&self.config.save.default_split);
        self.save_with(dir, SaveSource::Split(dataset, split), &self.save_options())
    }

    /// Saves every split of `dict` into `dir`.
    pub fn save_dict(&self, dir: impl AsRef<Path>, dict: &DatasetDict) -> Result<SaveReport> {
        self.save_with(dir, SaveSource::Dict(dict), &self.save_options())
    }

    /// Saves with options other than the configured ones.
    pub fn save_with(
        &self,
        dir: impl AsRef<Path>,
        source: SaveSource<'_>,
        options: &SaveOptions,
    ) -> Result<SaveReport> {
        save_to_parquet(&self.storage, dir.as_ref(), source, options)
    }

    /// Loads `dir`, falling back to [`DirectoryLoader`] for directories
    /// that aren't shard sets.
    pub fn load(&self, dir: impl AsRef<Path>) -> Result<DatasetDict> {
        self.load_with(dir, &DirectoryLoader::new(self.config.load.batch_size))
    }

    /// Loads `dir`, falling back to `generic` for directories that aren't
    /// shard sets.
    pub fn load_with(
        &self,
        dir: impl AsRef<Path>,
        generic: &dyn GenericLoader,
    ) -> Result<DatasetDict> {
        load_dataset(self.storage.as_ref(), dir.as_ref(), generic, &self.config.load)
    }

    /// The save options derived from the configuration.
    pub fn save_options(&self) -> SaveOptions {
        SaveOptions::from(&self.config.save)
    }

    pub fn config(&self) -> &DatasetsConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }
}
