// rust/datasets-core/src/shards/inspect.rs

//! Read-only inspection of a dataset directory's shard files.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::storage::StorageBackend;

/// File extension of shard files.
pub const SHARD_EXTENSION: &str = "parquet";

/// Whether a directory entry name looks like a shard file.
///
/// Hidden entries are skipped so that in-flight temp files never count.
pub fn is_shard_file_name(name: &str) -> bool {
    !name.starts_with('.')
        && Path::new(name)
            .extension()
            .is_some_and(|ext| ext == SHARD_EXTENSION)
}

/// Returns true iff `dir` directly contains at least one shard file.
///
/// # Errors
///
/// Returns `NotFound` if the directory doesn't exist.
pub fn has_shard_files(storage: &dyn StorageBackend, dir: &Path) -> Result<bool> {
    Ok(storage
        .list(dir)?
        .iter()
        .any(|name| is_shard_file_name(name)))
}

/// Returns the shard files of `split`, sorted by file name.
///
/// A file belongs to a split only when its whole name is
/// `<split>-<index>-of-<total>-<token>.parquet`, so `train` picks up neither
/// `train_extra-…` nor `train-extra-00000-of-00001-….parquet`.
pub fn files_for_split(
    storage: &dyn StorageBackend,
    dir: &Path,
    split: &str,
) -> Result<Vec<PathBuf>> {
    // `list` is already sorted by name.
    Ok(storage
        .list(dir)?
        .into_iter()
        .filter(|name| is_shard_file_name(name) && shard_split_matches(name, split))
        .map(|name| dir.join(name))
        .collect())
}

fn shard_split_matches(name: &str, split: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(split)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(SHARD_EXTENSION))
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return false;
    };

    let is_counter = |part: &str| part.len() >= 5 && part.bytes().all(|b| b.is_ascii_digit());
    let mut parts = rest.splitn(4, '-');
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(index), Some("of"), Some(total), Some(token))
            if is_counter(index)
                && is_counter(total)
                && !token.is_empty()
                && token.bytes().all(|b| b.is_ascii_alphanumeric())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (LocalStorage, TempDir) {
        let temp = TempDir::new().unwrap();
        for name in files {
            std::fs::write(temp.path().join(name), b"x").unwrap();
        }
        let storage = LocalStorage::new(&StorageConfig {
            base_path: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        (storage, temp)
    }

    #[test]
    fn test_has_shard_files() {
        let (storage, temp) = setup(&["dataset_info.json", "train-00000-of-00001-ab.parquet"]);
        assert!(has_shard_files(&storage, temp.path()).unwrap());

        let (storage, temp) = setup(&["dataset_info.json", "notes.txt", "data.parquet.bak"]);
        assert!(!has_shard_files(&storage, temp.path()).unwrap());
    }

    #[test]
    fn test_hidden_temp_files_ignored() {
        let (storage, temp) = setup(&[".train-00000-of-00001-ab.parquet.tmp", ".x.parquet"]);
        assert!(!has_shard_files(&storage, temp.path()).unwrap());
    }

    #[test]
    fn test_subdirectories_are_not_scanned() {
        let (storage, temp) = setup(&[]);
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("nested/train-00000.parquet"), b"x").unwrap();

        assert!(!has_shard_files(&storage, temp.path()).unwrap());
    }

    #[test]
    fn test_files_for_split_sorted_and_prefixed() {
        let (storage, temp) = setup(&[
            "train-00001-of-00002-bb.parquet",
            "test-00000-of-00001-cc.parquet",
            "train-00000-of-00002-aa.parquet",
            "train_extra-00000-of-00001-dd.parquet",
            "train-notes.txt",
        ]);

        let files = files_for_split(&storage, temp.path(), "train").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["train-00000-of-00002-aa.parquet", "train-00001-of-00002-bb.parquet"]
        );
        assert!(files.iter().all(|p| p.starts_with(temp.path())));

        assert!(files_for_split(&storage, temp.path(), "validation").unwrap().is_empty());
    }

    #[test]
    fn test_files_for_split_ignores_dash_suffixed_sibling() {
        let (storage, temp) = setup(&[
            "train-00000-of-00001-aa.parquet",
            "train-extra-00000-of-00001-bb.parquet",
            "train-00000-of-00001.parquet",
            "train-00000-of-00001-c-d.parquet",
        ]);

        let train = files_for_split(&storage, temp.path(), "train").unwrap();
        assert_eq!(train, vec![temp.path().join("train-00000-of-00001-aa.parquet")]);

        let extra = files_for_split(&storage, temp.path(), "train-extra").unwrap();
        assert_eq!(extra, vec![temp.path().join("train-extra-00000-of-00001-bb.parquet")]);
    }

    #[test]
    fn test_missing_directory() {
        let (storage, temp) = setup(&[]);
        let missing = temp.path().join("nope");

        assert!(has_shard_files(&storage, &missing).unwrap_err().is_not_found());
        assert!(files_for_split(&storage, &missing, "train").unwrap_err().is_not_found());
    }
}
