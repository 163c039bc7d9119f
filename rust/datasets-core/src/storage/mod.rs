// rust/datasets-core/src/storage/mod.rs

//! Storage abstraction for dataset directories.
//!
//! Everything that touches the filesystem (listing a dataset directory,
//! writing shards, replacing the descriptor, reading referenced payload
//! files) goes through [`StorageBackend`], so the save and load protocols
//! can be exercised against failing or in-memory backends in tests.
//!
//! # Example
//!
//! ```no_run
//! use datasets_core::config::StorageConfig;
//! use datasets_core::storage::{LocalStorage, StorageBackend};
//! use std::io::Write;
//! use std::path::Path;
//!
//! let config = StorageConfig::default();
//! let storage = LocalStorage::new(&config).unwrap();
//!
//! let mut writer = storage.open_write(Path::new("out/notes.txt")).unwrap();
//! writer.write_all(b"hello").unwrap();
//! writer.finish().unwrap();
//!
//! let names = storage.list(Path::new("out")).unwrap();
//! assert_eq!(names, vec!["notes.txt".to_string()]);
//! ```

mod local;
mod traits;

pub use local::LocalStorage;
pub use traits::{ObjectMeta, StorageBackend, StorageReader, StorageWriter};
