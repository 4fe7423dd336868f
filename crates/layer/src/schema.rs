use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};

/// Storage type of an attribute field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Double,
    Text,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// A single attribute value. `Null` is valid for every field type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
        }
    }

    /// Coerce the value into `ty`, widening integers into double fields.
    pub(crate) fn coerce(self, field: &str, ty: FieldType) -> Result<Self> {
        match (ty, self) {
            (_, Self::Null) => Ok(Self::Null),
            (FieldType::Integer, v @ Self::Integer(_)) => Ok(v),
            (FieldType::Double, v @ Self::Double(_)) => Ok(v),
            (FieldType::Double, Self::Integer(v)) => Ok(Self::Double(v as f64)),
            (FieldType::Text, v @ Self::Text(_)) => Ok(v),
            (expected, other) => Err(LayerError::TypeMismatch {
                field: field.to_string(),
                expected,
                found: other.kind().to_string(),
            }),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Named, typed attribute column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Resolved handle to a field: its column position and declared type.
///
/// Handles are obtained once from [`Schema::field`] and then used for every
/// per-feature read or write, so name lookups are not repeated per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndex {
    pub(crate) position: usize,
    pub(crate) ty: FieldType,
    pub(crate) name: String,
}

impl FieldIndex {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> FieldType {
        self.ty
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// Ordered list of attribute fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema, rejecting repeated names
    pub fn from_fields(layer: &str, fields: Vec<FieldDef>) -> Result<Self> {
        let mut schema = Self::new();
        for def in fields {
            schema.push(layer, def)?;
        }
        Ok(schema)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<FieldIndex> {
        self.position(name).map(|position| FieldIndex {
            position,
            ty: self.fields[position].ty,
            name: name.to_string(),
        })
    }

    /// Resolve a field handle, failing with `UnknownField` if absent
    pub fn field(&self, layer: &str, name: &str) -> Result<FieldIndex> {
        self.get(name)
            .ok_or_else(|| LayerError::unknown_field(layer, name))
    }

    /// Fields of `self` followed by the fields of `other`. Names from `other`
    /// that clash get a numeric suffix (`_1`, `_2`, ...).
    pub fn overlay(&self, other: &Schema) -> Schema {
        let mut fields = self.fields.clone();
        for def in &other.fields {
            let mut name = def.name.clone();
            let mut n = 1;
            while fields.iter().any(|f| f.name == name) {
                name = format!("{}_{n}", def.name);
                n += 1;
            }
            fields.push(FieldDef::new(name, def.ty));
        }
        Schema { fields }
    }

    pub(crate) fn push(&mut self, layer: &str, def: FieldDef) -> Result<FieldIndex> {
        if self.contains(&def.name) {
            return Err(LayerError::duplicate_field(layer, def.name));
        }
        let index = FieldIndex {
            position: self.fields.len(),
            ty: def.ty,
            name: def.name.clone(),
        };
        self.fields.push(def);
        Ok(index)
    }
}
