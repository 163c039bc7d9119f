// rust/datasets-core/src/config.rs

//! Configuration management for saving and loading sharded datasets.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{DatasetError, Result};

/// Default upper bound for a single shard when no shard count is given.
pub const DEFAULT_MAX_SHARD_SIZE: u64 = 500 * 1024 * 1024;

// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetsConfig {
    pub storage: StorageConfig,
    pub save: SaveConfig,
    pub load: LoadConfig,
}

// Storage configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    // Base path that relative dataset directories are resolved against.
    pub base_path: PathBuf,
    // Buffer size in bytes for I/O operations.
    pub buffer_size: usize,
    // Whether to memory-map large reads.
    pub use_mmap: bool,
    // File size threshold (bytes) above which to use mmap.
    pub mmap_threshold: u64,
}

/// Compression codec applied to parquet shards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardCompression {
    /// Uncompressed pages.
    None,
    /// Snappy, the parquet default.
    #[default]
    Snappy,
    /// Zstandard at `save.compression_level`.
    Zstd,
}

impl FromStr for ShardCompression {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            other => Err(DatasetError::config(format!(
                "save.compression must be one of: none, snappy, zstd (got '{other}')"
            ))),
        }
    }
}

/// Options controlling how datasets are sharded and written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Fixed number of shards per split. Takes precedence over `max_shard_size`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_shards: Option<u32>,
    /// Byte budget per shard, as an integer or a string such as `"500MB"`.
    #[serde(deserialize_with = "deserialize_size")]
    pub max_shard_size: u64,
    /// Whether to inline the bytes of externally referenced files.
    pub embed_external_files: bool,
    /// Rows per batch when embedding external files.
    pub embed_batch_size: usize,
    /// Parquet compression codec.
    pub compression: ShardCompression,
    /// Level used by codecs that take one (zstd).
    pub compression_level: i32,
    /// Write to a hidden temp file then rename into place.
    pub atomic_writes: bool,
    /// Split name used when saving a single dataset.
    pub default_split: String,
}

/// Options controlling how sharded directories are read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    // Rows per record batch when decoding parquet.
    pub batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            buffer_size: 64 * 1024, // 64 KB
            use_mmap: true,
            mmap_threshold: 1024 * 1024, // 1 MB
        }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            num_shards: None,
            max_shard_size: DEFAULT_MAX_SHARD_SIZE,
            embed_external_files: true,
            embed_batch_size: 1000,
            compression: ShardCompression::Snappy,
            compression_level: 3,
            atomic_writes: true,
            default_split: "train".to_string(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self { batch_size: 1024 }
    }
}

/// Parses a human readable size such as `"500MB"`, `"1GiB"` or `"4096"`.
///
/// Decimal suffixes (`KB`, `MB`, `GB`, `TB`, `PB`) are powers of 1000, binary
/// suffixes (`KiB`, `MiB`, ...) powers of 1024. A lowercase trailing `b`
/// (`"8Mb"`) denotes bits.
pub fn parse_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if let Ok(bytes) = trimmed.parse::<u64>() {
        return Ok(bytes);
    }

    let bits = trimmed.ends_with('b') && !trimmed.ends_with("ib") && !trimmed.ends_with("iB");
    let upper = trimmed.to_uppercase();

    const UNITS: [(&str, u64); 10] = [
        ("PIB", 1 << 50),
        ("TIB", 1 << 40),
        ("GIB", 1 << 30),
        ("MIB", 1 << 20),
        ("KIB", 1 << 10),
        ("PB", 1_000_000_000_000_000),
        ("TB", 1_000_000_000_000),
        ("GB", 1_000_000_000),
        ("MB", 1_000_000),
        ("KB", 1_000),
    ];

    for (suffix, factor) in UNITS {
        if let Some(number) = upper.strip_suffix(suffix) {
            let value: u64 = number.trim().parse().map_err(|e| {
                DatasetError::config_with_source(format!("invalid size '{input}'"), e)
            })?;
            let bytes = value.saturating_mul(factor);
            return Ok(if bits { bytes / 8 } else { bytes });
        }
    }

    Err(DatasetError::config(format!(
        "invalid size '{input}': expected an integer or a value like '500MB'"
    )))
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeRepr {
        Bytes(u64),
        Text(String),
    }

    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Bytes(bytes) => Ok(bytes),
        SizeRepr::Text(text) => parse_size(&text).map_err(serde::de::Error::custom),
    }
}

impl FromStr for DatasetsConfig {
    type Err = DatasetError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| DatasetError::config_with_source("failed to parse TOML config", e))
    }
}

impl DatasetsConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatasetError::storage_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `DSC_` and use underscores
    // to separate nested fields. For example:
    // - `DSC_STORAGE_BASE_PATH` overrides `storage.base_path`
    // - `DSC_SAVE_NUM_SHARDS` overrides `save.num_shards`
    // - `DSC_SAVE_MAX_SHARD_SIZE` overrides `save.max_shard_size` ("500MB" works)
    // - `DSC_SAVE_COMPRESSION` overrides `save.compression`
    // - `DSC_LOAD_BATCH_SIZE` overrides `load.batch_size`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Storage overrides
        if let Ok(val) = std::env::var("DSC_STORAGE_BASE_PATH") {
            self.storage.base_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("DSC_STORAGE_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.storage.buffer_size = v;
            }
        }
        if let Ok(val) = std::env::var("DSC_STORAGE_USE_MMAP") {
            if let Ok(v) = val.parse() {
                self.storage.use_mmap = v;
            }
        }
        if let Ok(val) = std::env::var("DSC_STORAGE_MMAP_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.storage.mmap_threshold = v;
            }
        }

        // Save overrides
        if let Ok(val) = std::env::var("DSC_SAVE_NUM_SHARDS") {
            if let Ok(v) = val.parse() {
                self.save.num_shards = Some(v);
            }
        }
        if let Ok(val) = std::env::var("DSC_SAVE_MAX_SHARD_SIZE") {
            if let Ok(v) = parse_size(&val) {
                self.save.max_shard_size = v;
            }
        }
        if let Ok(val) = std::env::var("DSC_SAVE_EMBED_EXTERNAL_FILES") {
            if let Ok(v) = val.parse() {
                self.save.embed_external_files = v;
            }
        }
        if let Ok(val) = std::env::var("DSC_SAVE_EMBED_BATCH_SIZE") {
            if let Ok(v) = val.parse() {
                self.save.embed_batch_size = v;
            }
        }
        if let Ok(val) = std::env::var("DSC_SAVE_COMPRESSION") {
            if let Ok(v) = val.parse() {
                self.save.compression = v;
            }
        }
        if let Ok(val) = std::env::var("DSC_SAVE_COMPRESSION_LEVEL") {
            if let Ok(v) = val.parse() {
                self.save.compression_level = v;
            }
        }
        if let Ok(val) = std::env::var("DSC_SAVE_ATOMIC_WRITES") {
            if let Ok(v) = val.parse() {
                self.save.atomic_writes = v;
            }
        }
        if let Ok(val) = std::env::var("DSC_SAVE_DEFAULT_SPLIT") {
            self.save.default_split = val;
        }

        // Load overrides
        if let Ok(val) = std::env::var("DSC_LOAD_BATCH_SIZE") {
            if let Ok(v) = val.parse() {
                self.load.batch_size = v;
            }
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.buffer_size == 0 {
            return Err(DatasetError::config(
                "storage.buffer_size must be greater than 0",
            ));
        }

        if self.save.num_shards == Some(0) {
            return Err(DatasetError::config(
                "save.num_shards must be greater than 0",
            ));
        }
        if self.save.max_shard_size == 0 {
            return Err(DatasetError::config(
                "save.max_shard_size must be greater than 0",
            ));
        }
        if self.save.embed_batch_size == 0 {
            return Err(DatasetError::config(
                "save.embed_batch_size must be greater than 0",
            ));
        }
        if self.save.default_split.is_empty() || self.save.default_split.contains('/') {
            return Err(DatasetError::config(
                "save.default_split must be a non-empty name without '/'",
            ));
        }

        if self.load.batch_size == 0 {
            return Err(DatasetError::config(
                "load.batch_size must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = DatasetsConfig::default();

        assert_eq!(config.storage.base_path, PathBuf::from("."));
        assert_eq!(config.storage.buffer_size, 64 * 1024);
        assert!(config.storage.use_mmap);

        assert!(config.save.num_shards.is_none());
        assert_eq!(config.save.max_shard_size, 500 * 1024 * 1024);
        assert!(config.save.embed_external_files);
        assert_eq!(config.save.embed_batch_size, 1000);
        assert_eq!(config.save.compression, ShardCompression::Snappy);
        assert!(config.save.atomic_writes);
        assert_eq!(config.save.default_split, "train");

        assert_eq!(config.load.batch_size, 1024);
    }

    #[test]
    fn test_default_validates() {
        assert!(DatasetsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_str_empty() {
        let config: DatasetsConfig = "".parse().unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_full() {
        let toml = r#"
            [storage]
            base_path = "/data/datasets"
            buffer_size = 131072
            use_mmap = false

            [save]
            num_shards = 8
            max_shard_size = "256MB"
            embed_external_files = false
            embed_batch_size = 64
            compression = "zstd"
            compression_level = 5
            atomic_writes = false
            default_split = "test"

            [load]
            batch_size = 4096
        "#;

        let config: DatasetsConfig = toml.parse().unwrap();

        assert_eq!(config.storage.base_path, PathBuf::from("/data/datasets"));
        assert_eq!(config.storage.buffer_size, 131072);
        assert!(!config.storage.use_mmap);

        assert_eq!(config.save.num_shards, Some(8));
        assert_eq!(config.save.max_shard_size, 256_000_000);
        assert!(!config.save.embed_external_files);
        assert_eq!(config.save.embed_batch_size, 64);
        assert_eq!(config.save.compression, ShardCompression::Zstd);
        assert_eq!(config.save.compression_level, 5);
        assert!(!config.save.atomic_writes);
        assert_eq!(config.save.default_split, "test");

        assert_eq!(config.load.batch_size, 4096);
    }

    #[test]
    fn test_max_shard_size_as_integer() {
        let config: DatasetsConfig = "[save]\nmax_shard_size = 1024\n".parse().unwrap();
        assert_eq!(config.save.max_shard_size, 1024);
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result: std::result::Result<DatasetsConfig, _> = "invalid = [".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_str_invalid_compression() {
        let result: std::result::Result<DatasetsConfig, _> =
            "[save]\ncompression = \"gzip\"\n".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [save]
            num_shards = 2
            "#
        )
        .unwrap();

        let config = DatasetsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.save.num_shards, Some(2));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = DatasetsConfig::from_file("/nonexistent/datasets.toml");
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_from_file_rejects_zero_shards() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[save]\nnum_shards = 0").unwrap();

        let result = DatasetsConfig::from_file(file.path());
        assert!(matches!(result, Err(DatasetError::Config { .. })));
    }

    #[test]
    fn test_validate_invalid_values() {
        let mut config = DatasetsConfig::default();
        config.storage.buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = DatasetsConfig::default();
        config.save.max_shard_size = 0;
        assert!(config.validate().is_err());

        let mut config = DatasetsConfig::default();
        config.save.embed_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = DatasetsConfig::default();
        config.save.default_split = "a/b".to_string();
        assert!(config.validate().is_err());

        let mut config = DatasetsConfig::default();
        config.load.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("500MB").unwrap(), 500_000_000);
        assert_eq!(parse_size("1GiB").unwrap(), 1 << 30);
        assert_eq!(parse_size("2 KiB").unwrap(), 2048);
        assert_eq!(parse_size("8Mb").unwrap(), 1_000_000 / 8);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("MB").is_err());
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!("ZSTD".parse::<ShardCompression>().unwrap(), ShardCompression::Zstd);
        assert_eq!("none".parse::<ShardCompression>().unwrap(), ShardCompression::None);
        assert!("brotli".parse::<ShardCompression>().is_err());
    }

    // Helper to clear all DSC_ environment variables for test isolation
    fn clear_dsc_env_vars() {
        for (key, _) in std::env::vars() {
            if key.starts_with("DSC_") {
                std::env::remove_var(&key);
            }
        }
    }

    // Environment variable tests are combined into a single test to avoid
    // races between parallel tests, since env vars are global state.
    #[test]
    fn test_env_overrides() {
        clear_dsc_env_vars();

        std::env::set_var("DSC_STORAGE_BASE_PATH", "/env/path");
        std::env::set_var("DSC_SAVE_NUM_SHARDS", "4");
        std::env::set_var("DSC_SAVE_MAX_SHARD_SIZE", "1MiB");
        std::env::set_var("DSC_SAVE_COMPRESSION", "zstd");
        std::env::set_var("DSC_LOAD_BATCH_SIZE", "16");

        let config = DatasetsConfig::default().with_env_overrides();

        assert_eq!(config.storage.base_path, PathBuf::from("/env/path"));
        assert_eq!(config.save.num_shards, Some(4));
        assert_eq!(config.save.max_shard_size, 1 << 20);
        assert_eq!(config.save.compression, ShardCompression::Zstd);
        assert_eq!(config.load.batch_size, 16);

        clear_dsc_env_vars();

        // Invalid values are ignored
        std::env::set_var("DSC_SAVE_NUM_SHARDS", "many");
        std::env::set_var("DSC_SAVE_COMPRESSION", "gzip");

        let config = DatasetsConfig::default().with_env_overrides();
        assert!(config.save.num_shards.is_none());
        assert_eq!(config.save.compression, ShardCompression::Snappy);

        clear_dsc_env_vars();
    }

    #[test]
    fn test_serialize_roundtrip() {
        let original = DatasetsConfig::default();
        let toml_str = toml::to_string(&original).unwrap();
        let parsed: DatasetsConfig = toml_str.parse().unwrap();

        assert_eq!(original.save.max_shard_size, parsed.save.max_shard_size);
        assert_eq!(original.save.compression, parsed.save.compression);
        assert_eq!(original.storage.base_path, parsed.storage.base_path);
    }
}
