// rust/datasets-core/src/dataset/mod.rs

//! The in-memory data model: schemas, row values and datasets.
//!
//! # Example
//!
//! ```
//! use datasets_core::dataset::{Dataset, FeatureKind, Field, ImageValue, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("image", FeatureKind::Image { decode: true }),
//!     Field::new("label", FeatureKind::Int64),
//! ])
//! .unwrap();
//!
//! let ds = Dataset::from_rows(
//!     schema,
//!     vec![vec![Value::from(ImageValue::from_path("images/00000.png")), Value::from(7i64)]],
//! )
//! .unwrap();
//!
//! assert_eq!(ds.num_rows(), 1);
//! assert_eq!(ds.schema().decodable_columns(), vec!["image".to_string()]);
//! ```

mod schema;
mod table;
mod value;

pub(crate) use table::image_array;

pub use schema::{
    image_struct_fields, FeatureKind, Field, Schema, IMAGE_BYTES_FIELD, IMAGE_PATH_FIELD,
};
pub use table::{Dataset, DatasetDict};
pub use value::{ImageValue, Value};
