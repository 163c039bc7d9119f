// rust/datasets-core/src/dataset/table.rs

//! In-memory datasets backed by arrow record batches.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BinaryBuilder, BooleanArray, BooleanBuilder, Float64Array,
    Float64Builder, Int64Array, Int64Builder, StringArray, StringBuilder, StructArray,
};
use arrow::buffer::NullBuffer;
use arrow::record_batch::RecordBatch;

use crate::error::{DatasetError, Result};
use crate::storage::StorageBackend;

use super::schema::{image_struct_fields, FeatureKind, Schema};
use super::value::{ImageValue, Value};

/// An ordered, finite collection of rows with an explicit schema.
///
/// Cloning is cheap: the underlying arrow buffers are reference counted, and
/// [`Dataset::select`] produces zero-copy views.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: Option<String>,
    schema: Arc<Schema>,
    batch: RecordBatch,
    size_estimate: bool,
}

impl Dataset {
    /// Wraps a record batch, checking it against `schema`.
    pub fn from_batch(schema: Schema, batch: RecordBatch) -> Result<Self> {
        schema.check_arrow(batch.schema().as_ref())?;
        Ok(Self {
            name: None,
            schema: Arc::new(schema),
            batch,
            size_estimate: true,
        })
    }

    /// Builds a dataset from rows of values in schema column order.
    pub fn from_rows(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(DatasetError::schema(format!(
                    "row {i} has {} values, schema has {} columns",
                    row.len(),
                    schema.len()
                )));
            }
        }

        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(col, field)| {
                build_column(&field.kind, rows.iter().map(|row| &row[col])).map_err(|e| {
                    DatasetError::schema(format!("column '{}': {e}", field.name))
                })
            })
            .collect::<Result<Vec<ArrayRef>>>()?;

        let batch = if columns.is_empty() {
            RecordBatch::try_new_with_options(
                schema.to_arrow(),
                columns,
                &arrow::record_batch::RecordBatchOptions::new().with_row_count(Some(rows.len())),
            )?
        } else {
            RecordBatch::try_new(schema.to_arrow(), columns)?
        };
        Self::from_batch(schema, batch)
    }

    /// An empty dataset with the given schema.
    pub fn empty(schema: Schema) -> Self {
        let batch = RecordBatch::new_empty(schema.to_arrow());
        Self {
            name: None,
            schema: Arc::new(schema),
            batch,
            size_estimate: true,
        }
    }

    /// Attaches a dataset name, recorded in split descriptors.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the dataset as having no usable size estimate.
    ///
    /// Saving such a dataset requires an explicit shard count.
    #[must_use]
    pub fn without_size_estimate(mut self) -> Self {
        self.size_estimate = false;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// A zero-copy view of a contiguous row range.
    pub fn select(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.num_rows() {
            return Err(DatasetError::schema(format!(
                "row range {}..{} out of bounds for {} rows",
                range.start,
                range.end,
                self.num_rows()
            )));
        }
        Ok(Self {
            name: self.name.clone(),
            schema: Arc::clone(&self.schema),
            batch: self.batch.slice(range.start, range.end - range.start),
            size_estimate: self.size_estimate,
        })
    }

    /// Replaces the record batch, keeping name and schema.
    pub fn with_batch(&self, batch: RecordBatch) -> Result<Self> {
        self.schema.check_arrow(batch.schema().as_ref())?;
        Ok(Self {
            name: self.name.clone(),
            schema: Arc::clone(&self.schema),
            batch,
            size_estimate: self.size_estimate,
        })
    }

    /// Reads one row as values.
    pub fn row(&self, index: usize) -> Result<Vec<Value>> {
        if index >= self.num_rows() {
            return Err(DatasetError::schema(format!(
                "row {index} out of bounds for {} rows",
                self.num_rows()
            )));
        }
        self.schema
            .fields()
            .iter()
            .zip(self.batch.columns())
            .map(|(field, array)| value_at(&field.kind, array, index))
            .collect()
    }

    /// Reads every value of one column.
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| DatasetError::schema(format!("no column named '{name}'")))?;
        let kind = self.schema.fields()[idx].kind;
        let array = self.batch.column(idx);
        (0..self.num_rows())
            .map(|row| value_at(&kind, array, row))
            .collect()
    }

    /// Estimates the size of the dataset once every payload is inline.
    ///
    /// This is the arrow size of this dataset's own rows plus, for decodable
    /// columns, the on-disk size of each file that is referenced but not yet
    /// embedded. A [`Dataset::select`] view counts only the rows it covers,
    /// not the buffers it shares with its parent. Returns `None` when the
    /// dataset opted out of estimation or a referenced file cannot be
    /// inspected.
    pub fn estimate_nbytes(&self, storage: &dyn StorageBackend) -> Option<u64> {
        if !self.size_estimate {
            return None;
        }

        let mut total = 0u64;
        for column in self.batch.columns() {
            total += column.to_data().get_slice_memory_size().ok()? as u64;
        }
        for column in self.schema.decodable_columns() {
            let values = self.column_values(&column).ok()?;
            for value in values {
                if let Some(image) = value.as_image().filter(|image| image.is_external()) {
                    let path = image.path.as_deref()?;
                    total += storage.metadata(Path::new(path)).ok()?.size;
                }
            }
        }
        Some(total)
    }
}

/// Named splits of a dataset, ordered by split name.
#[derive(Debug, Clone, Default)]
pub struct DatasetDict {
    splits: BTreeMap<String, Dataset>,
}

impl DatasetDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a split.
    pub fn insert(&mut self, split: impl Into<String>, dataset: Dataset) -> Option<Dataset> {
        self.splits.insert(split.into(), dataset)
    }

    pub fn get(&self, split: &str) -> Option<&Dataset> {
        self.splits.get(split)
    }

    pub fn split_names(&self) -> Vec<&str> {
        self.splits.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.splits.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> BTreeMap<String, Dataset> {
        self.splits
    }
}

impl std::ops::Index<&str> for DatasetDict {
    type Output = Dataset;

    fn index(&self, split: &str) -> &Dataset {
        &self.splits[split]
    }
}

impl FromIterator<(String, Dataset)> for DatasetDict {
    fn from_iter<I: IntoIterator<Item = (String, Dataset)>>(iter: I) -> Self {
        Self {
            splits: iter.into_iter().collect(),
        }
    }
}

// Every value is checked with `Value::fits` first, so the builders below
// only ever see their own variant or `Null`.
fn build_column<'a>(
    kind: &FeatureKind,
    values: impl Iterator<Item = &'a Value> + Clone,
) -> Result<ArrayRef> {
    if let Some(value) = values.clone().find(|value| !value.fits(kind)) {
        return Err(DatasetError::schema(format!(
            "expected {kind} value, got {value:?}"
        )));
    }

    let array: ArrayRef = match kind {
        FeatureKind::Bool => {
            let mut builder = BooleanBuilder::new();
            for value in values {
                match value {
                    Value::Bool(v) => builder.append_value(*v),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        FeatureKind::Int64 => {
            let mut builder = Int64Builder::new();
            for value in values {
                match value {
                    Value::Int64(v) => builder.append_value(*v),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        FeatureKind::Float64 => {
            let mut builder = Float64Builder::new();
            for value in values {
                match value {
                    Value::Float64(v) => builder.append_value(*v),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        FeatureKind::String => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    Value::String(v) => builder.append_value(v),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        FeatureKind::Binary => {
            let mut builder = BinaryBuilder::new();
            for value in values {
                match value {
                    Value::Binary(v) => builder.append_value(v),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        FeatureKind::Image { .. } => {
            let mut bytes = BinaryBuilder::new();
            let mut paths = StringBuilder::new();
            let mut validity = Vec::new();
            for value in values {
                match value {
                    Value::Image(image) => {
                        bytes.append_option(image.bytes.as_deref());
                        paths.append_option(image.path.as_deref());
                        validity.push(true);
                    }
                    _ => {
                        bytes.append_null();
                        paths.append_null();
                        validity.push(false);
                    }
                }
            }
            Arc::new(image_array(bytes.finish(), paths.finish(), validity)?)
        }
    };
    Ok(array)
}

/// Assembles an image column from its children and row validity.
pub(crate) fn image_array(
    bytes: BinaryArray,
    paths: StringArray,
    validity: Vec<bool>,
) -> Result<StructArray> {
    let nulls = if validity.iter().all(|valid| *valid) {
        None
    } else {
        Some(NullBuffer::from(validity))
    };
    Ok(StructArray::try_new(
        image_struct_fields(),
        vec![Arc::new(bytes) as ArrayRef, Arc::new(paths) as ArrayRef],
        nulls,
    )?)
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, kind: &FeatureKind) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| DatasetError::schema(format!("column is not stored as {kind}")))
}

fn value_at(kind: &FeatureKind, array: &ArrayRef, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match kind {
        FeatureKind::Bool => Value::Bool(downcast::<BooleanArray>(array, kind)?.value(row)),
        FeatureKind::Int64 => Value::Int64(downcast::<Int64Array>(array, kind)?.value(row)),
        FeatureKind::Float64 => Value::Float64(downcast::<Float64Array>(array, kind)?.value(row)),
        FeatureKind::String => {
            Value::String(downcast::<StringArray>(array, kind)?.value(row).to_string())
        }
        FeatureKind::Binary => {
            Value::Binary(downcast::<BinaryArray>(array, kind)?.value(row).to_vec())
        }
        FeatureKind::Image { .. } => {
            let image = downcast::<StructArray>(array, kind)?;
            let bytes = image
                .column(0)
                .as_any()
                .downcast_ref::<BinaryArray>()
                .ok_or_else(|| DatasetError::schema("image bytes are not binary"))?;
            let paths = image
                .column(1)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| DatasetError::schema("image paths are not strings"))?;
            Value::Image(ImageValue {
                bytes: bytes.is_valid(row).then(|| bytes.value(row).to_vec()),
                path: paths.is_valid(row).then(|| paths.value(row).to_string()),
            })
        }
    };
    Ok(value)
}
