// rust/datasets-core/src/shards/mod.rs

//! Shard files: discovery, planning, payload embedding and writing.
//!
//! A split is stored as `num_shards` parquet files directly inside the
//! dataset directory, named
//! `<split>-<index:05>-of-<total:05>-<token>.parquet`. The token is a
//! fingerprint of the encoded file so different content never reuses a
//! name.

mod embed;
mod inspect;
mod planner;
mod writer;

pub use embed::embed_external_files;
pub use inspect::{files_for_split, has_shard_files, is_shard_file_name, SHARD_EXTENSION};
pub use planner::{plan_shards, resolve_num_shards, ShardRange, ShardingParams};
pub use writer::{
    content_token, shard_file_name, ShardWriter, ShardWriterOptions, WrittenShard,
};
