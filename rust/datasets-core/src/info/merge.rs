// rust/datasets-core/src/info/merge.rs

use std::collections::BTreeMap;

use crate::dataset::Schema;

use super::descriptor::{DatasetInfo, SplitInfo, PARQUET_BUILDER_NAME};

/// Combines per-split descriptors into a fresh dataset descriptor.
///
/// Sizes are summed only when every split reports one; a single unknown
/// split size makes `dataset_size` and `size_in_bytes` unknown. The merged
/// splits drop their shard file lists. Inputs are left untouched.
pub fn merge_split_infos(
    splits: &BTreeMap<String, SplitInfo>,
    features: Option<&Schema>,
    dataset_name: Option<&str>,
) -> DatasetInfo {
    let dataset_size = splits
        .values()
        .map(|s| s.num_bytes)
        .sum::<Option<u64>>();
    let download_size = splits.values().map(|s| s.files_bytes).sum::<u64>();

    let merged = splits
        .iter()
        .map(|(name, split)| {
            let split = SplitInfo {
                name: name.clone(),
                files: Vec::new(),
                files_bytes: 0,
                ..split.clone()
            };
            (name.clone(), split)
        })
        .collect();

    DatasetInfo {
        builder_name: Some(PARQUET_BUILDER_NAME.to_string()),
        dataset_name: dataset_name.map(str::to_string),
        features: features.cloned(),
        download_size: Some(download_size),
        dataset_size,
        size_in_bytes: dataset_size.map(|size| size + download_size),
        splits: merged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn split(name: &str, num_examples: u64, num_bytes: Option<u64>) -> SplitInfo {
        SplitInfo {
            name: name.to_string(),
            num_bytes,
            num_examples,
            dataset_name: Some("demo".to_string()),
            shard_lengths: vec![num_examples],
            files: vec![PathBuf::from(format!("{name}-00000-of-00001-aa.parquet"))],
            files_bytes: 100,
        }
    }

    fn splits(items: Vec<SplitInfo>) -> BTreeMap<String, SplitInfo> {
        items.into_iter().map(|s| (s.name.clone(), s)).collect()
    }

    #[test]
    fn test_merge_sums_known_sizes() {
        let input = splits(vec![split("train", 80, Some(800)), split("test", 20, Some(200))]);

        let info = merge_split_infos(&input, None, Some("demo"));

        assert!(info.is_shard_backed());
        assert_eq!(info.dataset_name.as_deref(), Some("demo"));
        assert_eq!(info.dataset_size, Some(1000));
        assert_eq!(info.download_size, Some(200));
        assert_eq!(info.size_in_bytes, Some(1200));
        assert_eq!(info.num_examples(), 100);
        assert_eq!(info.split_names(), vec!["test", "train"]);
    }

    #[test]
    fn test_unknown_split_size_is_not_zeroed() {
        let input = splits(vec![split("train", 80, Some(800)), split("test", 20, None)]);

        let info = merge_split_infos(&input, None, None);

        assert_eq!(info.dataset_size, None);
        assert_eq!(info.size_in_bytes, None);
        assert_eq!(info.download_size, Some(200));
        assert_eq!(info.splits["train"].num_bytes, Some(800));
    }

    #[test]
    fn test_merged_splits_drop_file_lists_and_inputs_untouched() {
        let input = splits(vec![split("train", 5, Some(50))]);
        let before = input.clone();

        let info = merge_split_infos(&input, None, None);

        assert!(info.splits["train"].files.is_empty());
        assert_eq!(info.splits["train"].shard_lengths, vec![5]);
        assert_eq!(input, before);
    }

    #[test]
    fn test_merge_no_splits() {
        let info = merge_split_infos(&BTreeMap::new(), None, None);

        assert!(info.is_shard_backed());
        assert!(info.splits.is_empty());
        assert_eq!(info.dataset_size, Some(0));
    }
}
