// rust/datasets-core/src/lib.rs

//! Sharded parquet datasets - Core Library
//!
//! Saves in-memory datasets (optionally split into named subsets such as
//! `train` and `test`) as directories of parquet shards with a merged
//! `dataset_info.json`, and loads such directories back, falling back to a
//! generic loader for directories that aren't shard sets.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::DatasetsConfig;
pub use error::{DatasetError, Result};
pub use storage::{LocalStorage, ObjectMeta, StorageBackend, StorageReader, StorageWriter};

pub mod dataset;
pub use dataset::{Dataset, DatasetDict, FeatureKind, Field, ImageValue, Schema, Value};

pub mod info;
pub use info::{DatasetInfo, SplitInfo};

pub mod shards;

pub mod save;
pub use save::{save_to_parquet, SaveOptions, SaveReport, SaveSource};

pub mod load;
pub use load::{load_dataset, DirectoryLoader, GenericLoader, LoadStrategy, ParquetLoader};

pub mod store;
pub use store::DatasetStore;
