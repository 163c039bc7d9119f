// rust/datasets-core/src/load.rs

//! Loading dataset directories.
//!
//! A directory is loaded from its parquet shards only when both hold:
//!
//! 1. it directly contains at least one `.parquet` file, and
//! 2. its `dataset_info.json` names `parquet` as the builder.
//!
//! Anything else is handed to a [`GenericLoader`]. Shard files alone never
//! decide the format; a foreign use of the extension must not be read as a
//! shard set.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{debug, info, warn};

use crate::config::LoadConfig;
use crate::dataset::{Dataset, DatasetDict, Schema};
use crate::error::{DatasetError, Result};
use crate::info::{read_info, DatasetInfo};
use crate::shards::{files_for_split, has_shard_files, is_shard_file_name};
use crate::storage::StorageBackend;

/// How a directory will be loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStrategy {
    /// Not a shard set written by this crate.
    GenericDelegate,
    /// Shard files per split, sorted by name, plus the descriptor.
    ShardBacked {
        info: DatasetInfo,
        data_files: BTreeMap<String, Vec<PathBuf>>,
    },
}

/// Decides how `dir` should be loaded.
///
/// # Errors
///
/// Returns `NotFound` if `dir` doesn't exist and `FormatMismatch` if the
/// descriptor exists but is malformed.
pub fn resolve_strategy(storage: &dyn StorageBackend, dir: &Path) -> Result<LoadStrategy> {
    if !has_shard_files(storage, dir)? {
        debug!(dir = %dir.display(), "no shard files, using generic loader");
        return Ok(LoadStrategy::GenericDelegate);
    }

    let info = match read_info(storage, dir) {
        Ok(info) => info,
        Err(e) if e.is_not_found() => {
            info!(dir = %dir.display(), "shard files without descriptor, using generic loader");
            return Ok(LoadStrategy::GenericDelegate);
        }
        Err(e) => return Err(e),
    };

    if !info.is_shard_backed() {
        info!(
            dir = %dir.display(),
            builder = ?info.builder_name,
            "descriptor is not shard-backed, using generic loader"
        );
        return Ok(LoadStrategy::GenericDelegate);
    }

    let mut data_files = BTreeMap::new();
    for split in info.splits.keys() {
        let files = files_for_split(storage, dir, split)?;
        if files.is_empty() {
            warn!(dir = %dir.display(), split = %split, "no shard files for split");
        }
        data_files.insert(split.clone(), files);
    }

    Ok(LoadStrategy::ShardBacked { info, data_files })
}

/// Fallback loader for directories that aren't shard sets.
pub trait GenericLoader {
    fn load(&self, storage: &dyn StorageBackend, dir: &Path) -> Result<DatasetDict>;
}

/// Loads a directory, from its shards if it's a shard set and through
/// `generic` otherwise.
pub fn load_dataset(
    storage: &dyn StorageBackend,
    dir: &Path,
    generic: &dyn GenericLoader,
    config: &LoadConfig,
) -> Result<DatasetDict> {
    match resolve_strategy(storage, dir)? {
        LoadStrategy::GenericDelegate => generic.load(storage, dir),
        LoadStrategy::ShardBacked { info, data_files } => {
            let loader = ParquetLoader::new(config.batch_size);
            let dict = loader.load_data_files(storage, &data_files, info.features.as_ref())?;
            Ok(attach_split_info(dict, &info))
        }
    }
}

// Names datasets after their descriptor and flags row counts that disagree
// with it, which happens when stale shards of an earlier save are present.
fn attach_split_info(dict: DatasetDict, info: &DatasetInfo) -> DatasetDict {
    dict.into_inner()
        .into_iter()
        .map(|(split, dataset)| {
            let Some(split_info) = info.splits.get(&split) else {
                return (split, dataset);
            };
            if split_info.num_examples != dataset.num_rows() as u64 {
                warn!(
                    split = %split,
                    expected = split_info.num_examples,
                    found = dataset.num_rows(),
                    "row count differs from descriptor"
                );
            }
            let name = split_info.dataset_name.as_ref().or(info.dataset_name.as_ref());
            let dataset = match name {
                Some(name) => dataset.with_name(name.clone()),
                None => dataset,
            };
            (split, dataset)
        })
        .collect()
}

/// Reads parquet files into datasets.
#[derive(Debug, Clone, Copy)]
pub struct ParquetLoader {
    batch_size: usize,
}

impl Default for ParquetLoader {
    fn default() -> Self {
        Self::new(LoadConfig::default().batch_size)
    }
}

impl ParquetLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Loads each split from its files, concatenated in the given order.
    ///
    /// The schema is `features` if given, else inferred from the first file
    /// of each split.
    pub fn load_data_files(
        &self,
        storage: &dyn StorageBackend,
        data_files: &BTreeMap<String, Vec<PathBuf>>,
        features: Option<&Schema>,
    ) -> Result<DatasetDict> {
        data_files
            .iter()
            .map(|(split, files)| {
                let dataset = self.load_split(storage, files, features).map_err(|e| match e {
                    DatasetError::Schema { message } => {
                        DatasetError::schema(format!("split '{split}': {message}"))
                    }
                    other => other,
                })?;
                Ok((split.clone(), dataset))
            })
            .collect()
    }

    fn load_split(
        &self,
        storage: &dyn StorageBackend,
        files: &[PathBuf],
        features: Option<&Schema>,
    ) -> Result<Dataset> {
        let mut batches = Vec::new();
        let mut arrow_schema = None;
        for path in files {
            let (schema, mut file_batches) = self.read_file(storage, path)?;
            arrow_schema.get_or_insert(schema);
            batches.append(&mut file_batches);
        }

        let Some(arrow_schema) = arrow_schema else {
            return match features {
                Some(schema) => Ok(Dataset::empty(schema.clone())),
                None => Err(DatasetError::schema(
                    "no data files and no features to build an empty dataset from",
                )),
            };
        };

        let schema = match features {
            Some(schema) => schema.clone(),
            None => Schema::from_arrow(&arrow_schema)?,
        };
        let batch = concat_batches(&arrow_schema, &batches)?;
        debug!(files = files.len(), rows = batch.num_rows(), "loaded split");
        Dataset::from_batch(schema, batch)
    }

    fn read_file(
        &self,
        storage: &dyn StorageBackend,
        path: &Path,
    ) -> Result<(arrow::datatypes::SchemaRef, Vec<RecordBatch>)> {
        let data = Bytes::from(storage.open_read(path)?.read_all()?);
        let builder = ParquetRecordBatchReaderBuilder::try_new(data).map_err(|e| {
            DatasetError::columnar_with_source(format!("failed to open {}", path.display()), e)
        })?;
        let schema = builder.schema().clone();
        let batches = builder
            .with_batch_size(self.batch_size)
            .build()?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok((schema, batches))
    }
}

/// Loads every parquet file directly inside a directory.
///
/// Files are grouped into splits by the leading word of their name:
/// `train`, `test`, and `validation` (also spelled `valid`, `val` or
/// `dev`). Files with any other name belong to `train`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryLoader {
    parquet: ParquetLoader,
}

impl DirectoryLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            parquet: ParquetLoader::new(batch_size),
        }
    }
}

impl GenericLoader for DirectoryLoader {
    fn load(&self, storage: &dyn StorageBackend, dir: &Path) -> Result<DatasetDict> {
        let mut data_files: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for name in storage.list(dir)? {
            if is_shard_file_name(&name) {
                data_files
                    .entry(split_of(&name).to_string())
                    .or_default()
                    .push(dir.join(&name));
            }
        }

        if data_files.is_empty() {
            return Err(DatasetError::not_found(dir, "no data files to load"));
        }
        self.parquet.load_data_files(storage, &data_files, None)
    }
}

fn split_of(file_name: &str) -> &'static str {
    let word = file_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match word.as_str() {
        "test" => "test",
        "validation" | "valid" | "val" | "dev" => "validation",
        _ => "train",
    }
}
