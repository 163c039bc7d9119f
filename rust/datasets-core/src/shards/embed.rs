// rust/datasets-core/src/shards/embed.rs

//! Inlining of externally referenced payloads.
//!
//! Image columns may reference files by path. Before a shard is written,
//! the referenced bytes are read and stored in the column's `bytes` child
//! so the shard is self-contained; `path` keeps only the file name.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BinaryArray, BinaryBuilder, StringArray, StringBuilder, StructArray};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::dataset::image_array;
use crate::error::{DatasetError, Result};
use crate::storage::StorageBackend;

/// Returns a copy of `batch` whose decodable columns carry inline bytes.
///
/// Rows are processed in windows of `batch_size` and concatenated back in
/// order. Rows that already hold bytes and null cells are left unchanged,
/// as is every column not named in `decodable_columns`.
///
/// # Errors
///
/// Fails if a referenced file cannot be read or a named column is not an
/// image column.
pub fn embed_external_files(
    storage: &dyn StorageBackend,
    batch: &RecordBatch,
    decodable_columns: &[String],
    batch_size: usize,
) -> Result<RecordBatch> {
    if decodable_columns.is_empty() || batch.num_rows() == 0 {
        return Ok(batch.clone());
    }

    let schema = batch.schema();
    let indices = decodable_columns
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .map_err(|_| DatasetError::schema(format!("no column named '{name}'")))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_size = batch_size.max(1);
    let mut windows = Vec::with_capacity(batch.num_rows().div_ceil(batch_size));
    let mut offset = 0;
    while offset < batch.num_rows() {
        let len = batch_size.min(batch.num_rows() - offset);
        let window = batch.slice(offset, len);

        let mut columns = window.columns().to_vec();
        for &idx in &indices {
            columns[idx] = embed_column(storage, &columns[idx], schema.field(idx).name())?;
        }
        windows.push(RecordBatch::try_new(Arc::clone(&schema), columns)?);
        offset += len;
    }

    debug!(
        rows = batch.num_rows(),
        windows = windows.len(),
        columns = ?decodable_columns,
        "embedded external files"
    );

    Ok(concat_batches(&schema, &windows)?)
}

fn embed_column(storage: &dyn StorageBackend, array: &ArrayRef, name: &str) -> Result<ArrayRef> {
    let images = array
        .as_any()
        .downcast_ref::<StructArray>()
        .ok_or_else(|| DatasetError::schema(format!("column '{name}' is not an image column")))?;
    let bytes = images
        .column(0)
        .as_any()
        .downcast_ref::<BinaryArray>()
        .ok_or_else(|| DatasetError::schema(format!("column '{name}' has no binary bytes")))?;
    let paths = images
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DatasetError::schema(format!("column '{name}' has no string paths")))?;

    let mut new_bytes = BinaryBuilder::new();
    let mut new_paths = StringBuilder::new();
    let mut validity = Vec::with_capacity(images.len());

    for row in 0..images.len() {
        if images.is_null(row) {
            new_bytes.append_null();
            new_paths.append_null();
            validity.push(false);
            continue;
        }

        let path = paths.is_valid(row).then(|| paths.value(row));
        if bytes.is_valid(row) {
            new_bytes.append_value(bytes.value(row));
        } else if let Some(path) = path {
            let content = storage.open_read(Path::new(path))?.read_all()?;
            new_bytes.append_value(content);
        } else {
            new_bytes.append_null();
        }
        new_paths.append_option(path.map(file_name));
        validity.push(true);
    }

    Ok(Arc::new(image_array(
        new_bytes.finish(),
        new_paths.finish(),
        validity,
    )?))
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}
