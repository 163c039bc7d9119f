// rust/datasets-core/src/dataset/value.rs

//! Row values.

use std::path::Path;

use image::DynamicImage;

use crate::error::{DatasetError, Result};
use crate::storage::StorageBackend;

use super::schema::FeatureKind;

/// An image cell: inline bytes, a reference to a file, or both.
///
/// Before saving, images usually only carry a `path`. After the save path
/// embeds external files, `bytes` holds the file content and `path` keeps
/// only the original file name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageValue {
    pub bytes: Option<Vec<u8>>,
    pub path: Option<String>,
}

impl ImageValue {
    /// An image referenced by file path.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            bytes: None,
            path: Some(path.into()),
        }
    }

    /// An image held inline.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            path: None,
        }
    }

    /// True when the payload lives outside the dataset.
    pub fn is_external(&self) -> bool {
        self.bytes.is_none() && self.path.is_some()
    }

    /// Returns the encoded payload, reading the referenced file if needed.
    pub fn load_bytes(&self, storage: &dyn StorageBackend) -> Result<Vec<u8>> {
        if let Some(bytes) = &self.bytes {
            return Ok(bytes.clone());
        }
        match &self.path {
            Some(path) => storage.open_read(Path::new(path))?.read_all(),
            None => Err(DatasetError::decode("image has neither bytes nor path")),
        }
    }

    /// Decodes the payload into pixels.
    pub fn decode(&self, storage: &dyn StorageBackend) -> Result<DynamicImage> {
        let bytes = self.load_bytes(storage)?;
        image::load_from_memory(&bytes).map_err(|e| {
            DatasetError::decode(format!(
                "failed to decode image {}: {e}",
                self.path.as_deref().unwrap_or("<inline>")
            ))
        })
    }
}

/// A single cell of a dataset row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Binary(Vec<u8>),
    Image(ImageValue),
}

impl Value {
    /// Whether this value may be stored in a column of `kind`.
    pub fn fits(&self, kind: &FeatureKind) -> bool {
        matches!(
            (self, kind),
            (Value::Null, _)
                | (Value::Bool(_), FeatureKind::Bool)
                | (Value::Int64(_), FeatureKind::Int64)
                | (Value::Float64(_), FeatureKind::Float64)
                | (Value::String(_), FeatureKind::String)
                | (Value::Binary(_), FeatureKind::Binary)
                | (Value::Image(_), FeatureKind::Image { .. })
        )
    }

    pub fn as_image(&self) -> Option<&ImageValue> {
        match self {
            Value::Image(image) => Some(image),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<ImageValue> for Value {
    fn from(v: ImageValue) -> Self {
        Value::Image(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::storage::LocalStorage;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 7]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(&StorageConfig {
            base_path: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_value_fits_kind() {
        assert!(Value::Null.fits(&FeatureKind::Int64));
        assert!(Value::from(3i64).fits(&FeatureKind::Int64));
        assert!(!Value::from(3i64).fits(&FeatureKind::Float64));
        assert!(Value::from(ImageValue::from_path("a.png")).fits(&FeatureKind::Image { decode: false }));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_load_bytes_prefers_inline() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        let image = ImageValue {
            bytes: Some(vec![1, 2, 3]),
            path: Some("does-not-exist.png".to_string()),
        };
        assert_eq!(image.load_bytes(&storage).unwrap(), vec![1, 2, 3]);
        assert!(!image.is_external());
    }

    #[test]
    fn test_decode_from_path_and_bytes_match() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let bytes = png_bytes();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, &bytes).unwrap();

        let external = ImageValue::from_path(path.to_string_lossy());
        let inline = ImageValue::from_bytes(bytes);
        assert!(external.is_external());

        let a = external.decode(&storage).unwrap().to_rgb8();
        let b = inline.decode(&storage).unwrap().to_rgb8();
        assert_eq!(a.dimensions(), (4, 3));
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_decode_garbage_fails() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        let err = ImageValue::from_bytes(vec![0u8; 16]).decode(&storage).unwrap_err();
        assert!(matches!(err, DatasetError::Decode { .. }));
    }

    #[test]
    fn test_missing_reference_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        let err = ImageValue::from_path("missing.png").load_bytes(&storage).unwrap_err();
        assert!(err.is_not_found());
        assert!(ImageValue::default().load_bytes(&storage).is_err());
    }
}
