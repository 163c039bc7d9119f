// rust/datasets-core/src/save.rs

//! Saving datasets as sharded parquet directories.
//!
//! For every split: plan contiguous shards, embed externally referenced
//! payloads, write each shard under a content-derived name and record a
//! [`SplitInfo`]. The split descriptors are then merged into a fresh
//! [`DatasetInfo`] and written as `dataset_info.json`.
//!
//! A failed save leaves whatever shards were already written in place and
//! may leave no descriptor; the directory should be treated as invalid
//! until a save returns successfully.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SaveConfig;
use crate::dataset::{Dataset, DatasetDict, Schema};
use crate::error::{DatasetError, Result};
use crate::info::{merge_split_infos, write_info, DatasetInfo, SplitInfo};
use crate::shards::{embed_external_files, plan_shards, ShardWriter, ShardWriterOptions, ShardingParams};
use crate::storage::StorageBackend;

/// Options for one save call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub sharding: ShardingParams,
    /// Inline referenced files into decodable columns.
    pub embed_external_files: bool,
    /// Rows per embedding window.
    pub embed_batch_size: usize,
    pub writer: ShardWriterOptions,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::from(&SaveConfig::default())
    }
}

impl From<&SaveConfig> for SaveOptions {
    fn from(config: &SaveConfig) -> Self {
        Self {
            sharding: ShardingParams {
                num_shards: config.num_shards,
                max_shard_size: Some(config.max_shard_size),
            },
            embed_external_files: config.embed_external_files,
            embed_batch_size: config.embed_batch_size,
            writer: ShardWriterOptions::from(config),
        }
    }
}

impl SaveOptions {
    /// Uses exactly `num_shards` shards per split.
    #[must_use]
    pub fn with_num_shards(mut self, num_shards: u32) -> Self {
        self.sharding.num_shards = Some(num_shards);
        self
    }

    /// Sizes shards by byte budget instead of a fixed count.
    #[must_use]
    pub fn with_max_shard_size(mut self, max_shard_size: u64) -> Self {
        self.sharding = ShardingParams::max_shard_size(max_shard_size);
        self
    }

    #[must_use]
    pub fn with_embed_external_files(mut self, embed: bool) -> Self {
        self.embed_external_files = embed;
        self
    }
}

/// What to save.
#[derive(Debug, Clone, Copy)]
pub enum SaveSource<'a> {
    /// A single dataset stored under the given split name.
    Split(&'a Dataset, &'a str),
    /// Every split of a dictionary.
    Dict(&'a DatasetDict),
}

impl<'a> SaveSource<'a> {
    fn splits(&self) -> Vec<(&'a str, &'a Dataset)> {
        match *self {
            SaveSource::Split(dataset, split) => vec![(split, dataset)],
            SaveSource::Dict(dict) => dict.iter().collect(),
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone)]
pub struct SaveReport {
    /// The descriptor written to `dataset_info.json`.
    pub info: DatasetInfo,
    /// Shard files of each split, relative to the output directory, in
    /// index order.
    pub shard_files: BTreeMap<String, Vec<PathBuf>>,
}

impl SaveReport {
    pub fn num_shards(&self) -> usize {
        self.shard_files.values().map(Vec::len).sum()
    }
}

/// Saves `source` into `dir` as parquet shards plus a dataset descriptor.
///
/// `dir` is created if missing. Splits are processed one after another and
/// nothing is visible in the descriptor until every split is written.
///
/// # Errors
///
/// * `Config` if sharding parameters are insufficient or a split name can't
///   be used in a file name.
/// * `NotFound` or `Storage` if a referenced file can't be read or a write
///   fails.
/// * `Columnar` if parquet encoding fails.
pub fn save_to_parquet(
    storage: &Arc<dyn StorageBackend>,
    dir: &Path,
    source: SaveSource<'_>,
    options: &SaveOptions,
) -> Result<SaveReport> {
    let splits = source.splits();
    for (split, _) in &splits {
        validate_split_name(split)?;
    }

    storage.create_dir_all(dir)?;
    let writer = ShardWriter::new(Arc::clone(storage), options.writer);

    let mut split_infos = BTreeMap::new();
    for (split, dataset) in &splits {
        let split_info = save_split(storage.as_ref(), &writer, dir, split, dataset, options)?;
        split_infos.insert(split.to_string(), split_info);
    }

    let features = common_schema(&splits);
    let dataset_name = splits.iter().find_map(|(_, ds)| ds.name());
    let info = merge_split_infos(&split_infos, features, dataset_name);
    write_info(storage.as_ref(), dir, &info, options.writer.atomic_writes)?;

    info!(
        dir = %dir.display(),
        splits = split_infos.len(),
        examples = info.num_examples(),
        "saved dataset as parquet shards"
    );

    let shard_files = split_infos
        .into_iter()
        .map(|(name, split)| (name, split.files))
        .collect();
    Ok(SaveReport { info, shard_files })
}

fn save_split(
    storage: &dyn StorageBackend,
    writer: &ShardWriter,
    dir: &Path,
    split: &str,
    dataset: &Dataset,
    options: &SaveOptions,
) -> Result<SplitInfo> {
    let estimated_bytes = dataset.estimate_nbytes(storage);
    let plan = plan_shards(dataset.num_rows(), estimated_bytes, &options.sharding)?;

    let decodable_columns = if options.embed_external_files {
        dataset.schema().decodable_columns()
    } else {
        Vec::new()
    };

    info!(
        split,
        rows = dataset.num_rows(),
        num_shards = plan.len(),
        estimated_bytes = ?estimated_bytes,
        "planned shards"
    );

    let mut files = Vec::with_capacity(plan.len());
    let mut shard_lengths = Vec::with_capacity(plan.len());
    let mut files_bytes = 0;
    for range in &plan {
        let shard = dataset.select(range.rows())?;
        let batch = if decodable_columns.is_empty() {
            shard.batch().clone()
        } else {
            embed_external_files(
                storage,
                shard.batch(),
                &decodable_columns,
                options.embed_batch_size,
            )?
        };

        let written = writer.write_shard(dir, split, range, &batch)?;
        debug!(split, index = range.index, path = %written.path.display(), "shard done");

        shard_lengths.push(written.num_rows as u64);
        files_bytes += written.num_bytes;
        files.push(written.path);
    }

    Ok(SplitInfo {
        name: split.to_string(),
        num_bytes: estimated_bytes,
        num_examples: dataset.num_rows() as u64,
        dataset_name: dataset.name().map(str::to_string),
        shard_lengths,
        files,
        files_bytes,
    })
}

fn validate_split_name(split: &str) -> Result<()> {
    if split.is_empty() || split.starts_with('.') || split.contains(|c: char| c == '/' || c == '\\') {
        return Err(DatasetError::config(format!(
            "invalid split name '{split}': must be a non-empty file name prefix"
        )));
    }
    Ok(())
}

// Features are recorded only when every split agrees on them.
fn common_schema<'a>(splits: &[(&str, &'a Dataset)]) -> Option<&'a Schema> {
    let first: &'a Dataset = splits.first()?.1;
    let schema = first.schema();
    if splits.iter().all(|(_, ds)| ds.schema() == schema) {
        Some(schema)
    } else {
        warn!("splits have different schemas; features are not recorded");
        None
    }
}
