// rust/datasets-core/src/dataset/schema.rs

//! Explicit dataset schemas.
//!
//! A [`Schema`] is an ordered list of named, typed columns known before any
//! row is read. Columns whose values need a decode step (image references)
//! are identified here, never by inspecting row contents.
//!
//! Schemas serialize to the `features` object of `dataset_info.json`:
//!
//! ```text
//! {
//!   "label": { "dtype": "int64", "_type": "Value" },
//!   "image": { "decode": true, "_type": "Image" }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field as ArrowField, Fields, Schema as ArrowSchema, SchemaRef};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DatasetError, Result};

/// Name of the child column holding inline payload bytes.
pub const IMAGE_BYTES_FIELD: &str = "bytes";
/// Name of the child column holding the payload's file path.
pub const IMAGE_PATH_FIELD: &str = "path";

/// The logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Bool,
    Int64,
    Float64,
    String,
    Binary,
    /// An image stored as `{bytes, path}`: inline bytes, a file reference, or both.
    Image {
        /// Whether readers should decode the image when accessing it.
        decode: bool,
    },
}

impl FeatureKind {
    /// Whether values of this kind need a decode step before use.
    ///
    /// The `decode` attribute of an image is ignored: even a column that is
    /// not decoded on access still references external content.
    pub fn requires_decoding(&self) -> bool {
        matches!(self, FeatureKind::Image { .. })
    }

    /// The arrow type used to store values of this kind.
    pub fn arrow_type(&self) -> DataType {
        match self {
            FeatureKind::Bool => DataType::Boolean,
            FeatureKind::Int64 => DataType::Int64,
            FeatureKind::Float64 => DataType::Float64,
            FeatureKind::String => DataType::Utf8,
            FeatureKind::Binary => DataType::Binary,
            FeatureKind::Image { .. } => DataType::Struct(image_struct_fields()),
        }
    }

    /// Infers a kind from an arrow type, if the type is supported.
    pub fn from_arrow_type(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Boolean => Some(FeatureKind::Bool),
            DataType::Int64 => Some(FeatureKind::Int64),
            DataType::Float64 => Some(FeatureKind::Float64),
            DataType::Utf8 => Some(FeatureKind::String),
            DataType::Binary => Some(FeatureKind::Binary),
            DataType::Struct(fields) if is_image_struct(fields) => {
                Some(FeatureKind::Image { decode: true })
            }
            _ => None,
        }
    }

    fn dtype_name(&self) -> Option<&'static str> {
        match self {
            FeatureKind::Bool => Some("bool"),
            FeatureKind::Int64 => Some("int64"),
            FeatureKind::Float64 => Some("float64"),
            FeatureKind::String => Some("string"),
            FeatureKind::Binary => Some("binary"),
            FeatureKind::Image { .. } => None,
        }
    }

    fn from_dtype_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(FeatureKind::Bool),
            "int64" => Some(FeatureKind::Int64),
            "float64" | "double" => Some(FeatureKind::Float64),
            "string" | "large_string" => Some(FeatureKind::String),
            "binary" | "large_binary" => Some(FeatureKind::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dtype_name() {
            Some(name) => f.write_str(name),
            None => f.write_str("image"),
        }
    }
}

/// The arrow child fields of an image column.
pub fn image_struct_fields() -> Fields {
    Fields::from(vec![
        ArrowField::new(IMAGE_BYTES_FIELD, DataType::Binary, true),
        ArrowField::new(IMAGE_PATH_FIELD, DataType::Utf8, true),
    ])
}

fn is_image_struct(fields: &Fields) -> bool {
    fields.len() == 2
        && fields[0].name() == IMAGE_BYTES_FIELD
        && fields[0].data_type() == &DataType::Binary
        && fields[1].name() == IMAGE_PATH_FIELD
        && fields[1].data_type() == &DataType::Utf8
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FeatureKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// An ordered list of uniquely named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Builds a schema, rejecting empty or duplicate column names.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        for (i, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(DatasetError::schema("column names must not be empty"));
            }
            if fields[..i].iter().any(|other| other.name == field.name) {
                return Err(DatasetError::schema(format!(
                    "duplicate column '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Names of the columns whose values require decoding, in schema order.
    pub fn decodable_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.kind.requires_decoding())
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn to_arrow(&self) -> SchemaRef {
        let fields: Vec<ArrowField> = self
            .fields
            .iter()
            .map(|f| ArrowField::new(&f.name, f.kind.arrow_type(), true))
            .collect();
        Arc::new(ArrowSchema::new(fields))
    }

    /// Recovers a schema from an arrow schema.
    ///
    /// # Errors
    ///
    /// Returns a schema error for arrow types with no matching feature kind.
    pub fn from_arrow(schema: &ArrowSchema) -> Result<Self> {
        let fields = schema
            .fields()
            .iter()
            .map(|f| {
                FeatureKind::from_arrow_type(f.data_type())
                    .map(|kind| Field::new(f.name().as_str(), kind))
                    .ok_or_else(|| {
                        DatasetError::schema(format!(
                            "column '{}' has unsupported type {}",
                            f.name(),
                            f.data_type()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields)
    }

    /// Checks that an arrow schema stores exactly these columns.
    pub fn check_arrow(&self, schema: &ArrowSchema) -> Result<()> {
        if schema.fields().len() != self.fields.len() {
            return Err(DatasetError::schema(format!(
                "expected {} columns, found {}",
                self.fields.len(),
                schema.fields().len()
            )));
        }
        for (expected, actual) in self.fields.iter().zip(schema.fields().iter()) {
            if expected.name != *actual.name() {
                return Err(DatasetError::schema(format!(
                    "expected column '{}', found '{}'",
                    expected.name,
                    actual.name()
                )));
            }
            if FeatureKind::from_arrow_type(actual.data_type()).map(|k| k.arrow_type())
                != Some(expected.kind.arrow_type())
            {
                return Err(DatasetError::schema(format!(
                    "column '{}' should be {}, found {}",
                    expected.name,
                    expected.kind,
                    actual.data_type()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct FeatureRepr {
    #[serde(rename = "_type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decode: Option<bool>,
}

impl From<&FeatureKind> for FeatureRepr {
    fn from(kind: &FeatureKind) -> Self {
        match kind {
            FeatureKind::Image { decode } => FeatureRepr {
                type_name: "Image".to_string(),
                dtype: None,
                decode: Some(*decode),
            },
            other => FeatureRepr {
                type_name: "Value".to_string(),
                dtype: other.dtype_name().map(str::to_string),
                decode: None,
            },
        }
    }
}

impl FeatureRepr {
    fn into_kind(self) -> std::result::Result<FeatureKind, String> {
        match self.type_name.as_str() {
            "Image" => Ok(FeatureKind::Image {
                decode: self.decode.unwrap_or(true),
            }),
            "Value" => {
                let dtype = self.dtype.ok_or("Value feature without dtype")?;
                FeatureKind::from_dtype_name(&dtype)
                    .ok_or_else(|| format!("unsupported dtype '{dtype}'"))
            }
            other => Err(format!("unsupported feature type '{other}'")),
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &FeatureRepr::from(&field.kind))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = Schema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to feature")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Schema, A::Error> {
                let mut fields = Vec::new();
                while let Some((name, repr)) = access.next_entry::<String, FeatureRepr>()? {
                    let kind = repr.into_kind().map_err(serde::de::Error::custom)?;
                    fields.push(Field::new(name, kind));
                }
                Schema::new(fields).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}
