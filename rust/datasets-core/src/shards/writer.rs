// rust/datasets-core/src/shards/writer.rs

//! Shard naming and persistence.

use std::hash::Hasher;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use tracing::debug;
use twox_hash::XxHash64;

use crate::config::{SaveConfig, ShardCompression};
use crate::error::{DatasetError, Result};
use crate::storage::StorageBackend;

use super::inspect::SHARD_EXTENSION;
use super::planner::ShardRange;

/// Builds the file name of a shard.
///
/// `token` distinguishes shards with different content that share the same
/// split, index and total.
pub fn shard_file_name(split: &str, index: u32, total: u32, token: &str) -> String {
    format!("{split}-{index:05}-of-{total:05}-{token}.{SHARD_EXTENSION}")
}

/// Content fingerprint used as the uniqueness token of a shard.
pub fn content_token(data: &[u8]) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    format!("{:016x}", hasher.finish())
}

/// Encoding and persistence options for shard files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardWriterOptions {
    pub compression: ShardCompression,
    /// Only used by `Zstd`.
    pub compression_level: i32,
    /// Write to a hidden temp file and rename it into place.
    pub atomic_writes: bool,
}

impl Default for ShardWriterOptions {
    fn default() -> Self {
        Self::from(&SaveConfig::default())
    }
}

impl From<&SaveConfig> for ShardWriterOptions {
    fn from(config: &SaveConfig) -> Self {
        Self {
            compression: config.compression,
            compression_level: config.compression_level,
            atomic_writes: config.atomic_writes,
        }
    }
}

/// A shard persisted to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenShard {
    /// File name, relative to the output directory.
    pub path: PathBuf,
    pub num_rows: usize,
    /// Size of the encoded shard file.
    pub num_bytes: u64,
}

/// Encodes shards as parquet files and writes them through a storage backend.
pub struct ShardWriter {
    storage: Arc<dyn StorageBackend>,
    options: ShardWriterOptions,
}

impl ShardWriter {
    pub fn new(storage: Arc<dyn StorageBackend>, options: ShardWriterOptions) -> Self {
        Self { storage, options }
    }

    /// Encodes `batch` and writes it to `dir` under its shard name.
    ///
    /// The file is only visible under its final name once fully written
    /// when atomic writes are enabled; a failed atomic write removes its temp
    /// file. Shards written earlier are left in place.
    pub fn write_shard(
        &self,
        dir: &Path,
        split: &str,
        range: &ShardRange,
        batch: &RecordBatch,
    ) -> Result<WrittenShard> {
        let data = self.encode(batch)?;
        let token = content_token(&data);
        let file_name = shard_file_name(split, range.index, range.total, &token);
        let final_path = dir.join(&file_name);

        if self.options.atomic_writes {
            let temp_path = dir.join(format!(".{file_name}.tmp"));
            let written = self
                .write_to_path(&temp_path, &data)
                .and_then(|()| self.storage.rename(&temp_path, &final_path));
            if let Err(err) = written {
                if let Err(cleanup) = self.storage.delete(&temp_path) {
                    debug!(path = %temp_path.display(), error = %cleanup, "temp shard not removed");
                }
                return Err(err);
            }
        } else {
            self.write_to_path(&final_path, &data)?;
        }

        debug!(
            path = %final_path.display(),
            rows = batch.num_rows(),
            bytes = data.len(),
            "wrote shard"
        );

        Ok(WrittenShard {
            path: PathBuf::from(file_name),
            num_rows: batch.num_rows(),
            num_bytes: data.len() as u64,
        })
    }

    /// Encodes a batch as a complete parquet file in memory.
    pub fn encode(&self, batch: &RecordBatch) -> Result<Vec<u8>> {
        let props = WriterProperties::builder()
            .set_compression(self.compression()?)
            .build();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
        // An empty shard still gets a valid file carrying the schema.
        if batch.num_rows() > 0 {
            writer.write(batch)?;
        }
        writer.close()?;
        Ok(buffer)
    }

    fn compression(&self) -> Result<Compression> {
        Ok(match self.options.compression {
            ShardCompression::None => Compression::UNCOMPRESSED,
            ShardCompression::Snappy => Compression::SNAPPY,
            ShardCompression::Zstd => {
                let level = ZstdLevel::try_new(self.options.compression_level).map_err(|e| {
                    DatasetError::config_with_source(
                        format!("invalid zstd level {}", self.options.compression_level),
                        e,
                    )
                })?;
                Compression::ZSTD(level)
            }
        })
    }

    fn write_to_path(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut writer = self.storage.open_write(path)?;
        writer
            .write_all(data)
            .map_err(|e| DatasetError::storage_with_source(path, "failed to write shard", e))?;
        writer.finish()
    }
}
