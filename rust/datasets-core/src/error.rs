// rust/datasets-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Not found at '{path}': {message}")]
    NotFound {
        path: PathBuf,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Malformed dataset descriptor at '{path}': {message}")]
    FormatMismatch {
        path: PathBuf,
        message: String,
    },

    #[error("Schema error: {message}")]
    Schema {
        message: String,
    },

    #[error("Columnar format error: {message}")]
    Columnar {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Decode error: {message}")]
    Decode {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, DatasetError>;

// Convenience constructors
impl DatasetError {
    pub fn not_found(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an I/O error, promoting `NotFound` kinds to [`DatasetError::NotFound`].
    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        let path = path.into();
        let message = message.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound {
                path,
                message: format!("{message}: {source}"),
            };
        }
        Self::Storage {
            path,
            message,
            source: Some(source),
        }
    }

    pub fn format_mismatch(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FormatMismatch {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn columnar(message: impl Into<String>) -> Self {
        Self::Columnar {
            message: message.into(),
            source: None,
        }
    }

    pub fn columnar_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Columnar {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<arrow::error::ArrowError> for DatasetError {
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::columnar_with_source("arrow operation failed", err)
    }
}

impl From<parquet::errors::ParquetError> for DatasetError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Self::columnar_with_source("parquet operation failed", err)
    }
}
