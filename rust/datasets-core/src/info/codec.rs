// rust/datasets-core/src/info/codec.rs

//! Reading and writing `dataset_info.json`.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{DatasetError, Result};
use crate::storage::StorageBackend;

use super::descriptor::{DatasetInfo, DESCRIPTOR_FILE};

/// Reads the dataset descriptor of `dir`.
///
/// # Errors
///
/// Returns `NotFound` if the descriptor is absent and `FormatMismatch` if
/// it is not a valid descriptor.
pub fn read_info(storage: &dyn StorageBackend, dir: &Path) -> Result<DatasetInfo> {
    let path = dir.join(DESCRIPTOR_FILE);
    let data = storage.open_read(&path)?.read_all()?;

    let mut info: DatasetInfo = serde_json::from_slice(&data)
        .map_err(|e| DatasetError::format_mismatch(&path, e.to_string()))?;

    // Descriptors keyed by split name may omit the name inside each entry.
    for (name, split) in info.splits.iter_mut() {
        if split.name.is_empty() {
            split.name = name.clone();
        }
    }
    Ok(info)
}

/// Writes the dataset descriptor of `dir`, replacing any existing one.
///
/// With `atomic` set the JSON goes to a hidden temp file first and is
/// renamed over the descriptor, so readers never see a partial file.
pub fn write_info(
    storage: &dyn StorageBackend,
    dir: &Path,
    info: &DatasetInfo,
    atomic: bool,
) -> Result<()> {
    let path = dir.join(DESCRIPTOR_FILE);
    let data = serde_json::to_vec_pretty(info).map_err(|e| {
        DatasetError::storage(&path, format!("failed to serialize dataset descriptor: {e}"))
    })?;

    if atomic {
        let temp_path = dir.join(format!(".{DESCRIPTOR_FILE}.tmp"));
        write_to_path(storage, &temp_path, &data)?;
        storage.rename(&temp_path, &path)?;
    } else {
        write_to_path(storage, &path, &data)?;
    }

    debug!(path = %path.display(), splits = info.splits.len(), "wrote dataset descriptor");
    Ok(())
}

fn write_to_path(storage: &dyn StorageBackend, path: &Path, data: &[u8]) -> Result<()> {
    let mut writer = storage.open_write(path)?;
    writer
        .write_all(data)
        .map_err(|e| DatasetError::storage_with_source(path, "failed to write descriptor", e))?;
    writer.finish()
}
