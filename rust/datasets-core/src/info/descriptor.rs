// rust/datasets-core/src/info/descriptor.rs

//! Split and dataset descriptors as persisted in `dataset_info.json`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::dataset::Schema;

/// Builder name marking a directory as written by the shard save path.
pub const PARQUET_BUILDER_NAME: &str = "parquet";

/// Well-known name of the dataset descriptor file.
pub const DESCRIPTOR_FILE: &str = "dataset_info.json";

/// Metadata about one split, derived after its shards are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Estimated in-memory size of the split, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_bytes: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_examples: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    /// Rows per shard, in shard index order.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub shard_lengths: Vec<u64>,
    /// Shard files relative to the dataset directory.
    ///
    /// Never persisted: on load, shard membership comes from the directory
    /// listing.
    #[serde(skip)]
    pub files: Vec<PathBuf>,
    /// Total encoded size of the split's shard files.
    #[serde(skip)]
    pub files_bytes: u64,
}

/// Directory-level descriptor merging every split of a save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    /// Column schema. Unrecognized feature descriptions read as `None`.
    #[serde(
        default,
        deserialize_with = "lenient_features",
        skip_serializing_if = "Option::is_none"
    )]
    pub features: Option<Schema>,
    /// Total size of the shard files on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_size: Option<u64>,
    /// Sum of the split sizes, absent if any split size is unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub splits: BTreeMap<String, SplitInfo>,
}

impl DatasetInfo {
    /// True if the directory was written by the shard save path.
    pub fn is_shard_backed(&self) -> bool {
        self.builder_name.as_deref() == Some(PARQUET_BUILDER_NAME)
    }

    /// Total example count across splits.
    pub fn num_examples(&self) -> u64 {
        self.splits.values().map(|s| s.num_examples).sum()
    }

    pub fn split_names(&self) -> Vec<&str> {
        self.splits.keys().map(String::as_str).collect()
    }
}

// Other tools write `null` for fields they leave unset.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Descriptors written by other tools may carry feature types this crate
// doesn't model; the rest of the descriptor is still usable.
fn lenient_features<'de, D>(deserializer: D) -> std::result::Result<Option<Schema>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{FeatureKind, Field};

    #[test]
    fn test_shard_backed_marker() {
        let mut info = DatasetInfo::default();
        assert!(!info.is_shard_backed());

        info.builder_name = Some("json".to_string());
        assert!(!info.is_shard_backed());

        info.builder_name = Some(PARQUET_BUILDER_NAME.to_string());
        assert!(info.is_shard_backed());
    }

    #[test]
    fn test_files_are_not_persisted() {
        let split = SplitInfo {
            name: "train".to_string(),
            num_bytes: Some(10),
            num_examples: 3,
            dataset_name: None,
            shard_lengths: vec![1, 2],
            files: vec![PathBuf::from("train-00000-of-00002-aa.parquet")],
            files_bytes: 99,
        };

        let json = serde_json::to_value(&split).unwrap();
        assert!(json.get("files").is_none());
        assert!(json.get("files_bytes").is_none());
        assert_eq!(json["num_examples"], 3);
        assert_eq!(json["shard_lengths"], serde_json::json!([1, 2]));

        let back: SplitInfo = serde_json::from_value(json).unwrap();
        assert!(back.files.is_empty());
        assert_eq!(back.num_examples, 3);
    }

    #[test]
    fn test_reads_foreign_descriptor() {
        let json = r#"{
            "builder_name": "imagefolder",
            "features": {"image": {"_type": "Audio"}},
            "splits": {"train": {"name": "train", "num_bytes": 12, "num_examples": 4}},
            "citation": ""
        }"#;

        let info: DatasetInfo = serde_json::from_str(json).unwrap();
        assert!(!info.is_shard_backed());
        assert!(info.features.is_none());
        assert_eq!(info.splits["train"].num_bytes, Some(12));
        assert_eq!(info.num_examples(), 4);
    }

    #[test]
    fn test_reads_descriptor_with_null_fields() {
        let json = r#"{
            "builder_name": "json",
            "dataset_name": null,
            "features": null,
            "download_size": null,
            "splits": {
                "train": {
                    "name": "train",
                    "num_bytes": 120,
                    "num_examples": 3,
                    "shard_lengths": null,
                    "dataset_name": null
                },
                "test": {"name": null, "num_examples": null}
            }
        }"#;

        let info: DatasetInfo = serde_json::from_str(json).unwrap();
        assert!(!info.is_shard_backed());
        assert!(info.splits["train"].shard_lengths.is_empty());
        assert_eq!(info.splits["train"].num_examples, 3);
        assert_eq!(info.splits["test"].num_examples, 0);
        assert!(info.splits["test"].name.is_empty());

        let empty: DatasetInfo = serde_json::from_str(r#"{"splits": null}"#).unwrap();
        assert!(empty.splits.is_empty());
    }

    #[test]
    fn test_features_round_trip() {
        let schema = Schema::new(vec![
            Field::new("image", FeatureKind::Image { decode: true }),
            Field::new("label", FeatureKind::Int64),
        ])
        .unwrap();
        let info = DatasetInfo {
            builder_name: Some(PARQUET_BUILDER_NAME.to_string()),
            features: Some(schema.clone()),
            ..Default::default()
        };

        let back: DatasetInfo =
            serde_json::from_str(&serde_json::to_string(&info).unwrap()).unwrap();
        assert_eq!(back.features, Some(schema));
        assert_eq!(back, info);
    }
}
