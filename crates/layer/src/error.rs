use thiserror::Error;

use crate::schema::FieldType;

/// Result type for layer operations
pub type Result<T> = std::result::Result<T, LayerError>;

/// Errors raised by attribute-table operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    /// A field with this name already exists on the layer
    #[error("Duplicate field '{field}' on layer '{layer}'")]
    DuplicateField { layer: String, field: String },

    /// The named field does not exist on the layer
    #[error("Unknown field '{field}' on layer '{layer}'")]
    UnknownField { layer: String, field: String },

    /// A value or field handle does not match the declared field type
    #[error("Type mismatch for field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: String,
    },

    /// A join key value occurs more than once on one side of a join
    #[error("Ambiguous join on layer '{layer}': key '{key}' value {value} is not unique")]
    AmbiguousJoin {
        layer: String,
        key: String,
        value: i64,
    },

    /// A feature carries no usable value in the key field
    #[error("Feature {feature} of layer '{layer}' has no integer value for key '{key}'")]
    MissingKey {
        layer: String,
        key: String,
        feature: usize,
    },

    /// A record carries a different number of values than the schema has fields
    #[error("Record has {found} values but layer '{layer}' declares {expected} fields")]
    ArityMismatch {
        layer: String,
        expected: usize,
        found: usize,
    },

    /// Feature identifier is out of range
    #[error("Feature {feature} does not exist on layer '{layer}'")]
    NoSuchFeature { layer: String, feature: usize },
}

impl LayerError {
    pub fn duplicate_field(layer: impl Into<String>, field: impl Into<String>) -> Self {
        Self::DuplicateField {
            layer: layer.into(),
            field: field.into(),
        }
    }

    pub fn unknown_field(layer: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            layer: layer.into(),
            field: field.into(),
        }
    }
}
