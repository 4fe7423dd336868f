use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};
use crate::schema::{FieldDef, FieldIndex, FieldType, FieldValue, Schema};

/// Join key carried by every parcel-derived feature
pub const MATCH_ID: &str = "match_id";

/// Position of a feature within its layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub usize);

/// A geometry with one value per schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature<G> {
    pub geometry: G,
    values: Vec<FieldValue>,
}

impl<G> Feature<G> {
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn value(&self, field: &FieldIndex) -> &FieldValue {
        self.values
            .get(field.position)
            .unwrap_or(&FieldValue::Null)
    }

    pub fn into_parts(self) -> (G, Vec<FieldValue>) {
        (self.geometry, self.values)
    }
}

/// Loose input row: a geometry and named attributes, validated when the
/// layer is constructed with [`Layer::from_records`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<G> {
    pub geometry: G,
    #[serde(default)]
    pub attributes: BTreeMap<String, FieldValue>,
}

/// A named set of features sharing one attribute schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer<G> {
    name: String,
    schema: Schema,
    features: Vec<Feature<G>>,
}

impl<G> Layer<G> {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            features: Vec::new(),
        }
    }

    /// Layer with no attribute fields
    pub fn from_geometries(name: impl Into<String>, geometries: impl IntoIterator<Item = G>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(),
            features: geometries
                .into_iter()
                .map(|geometry| Feature {
                    geometry,
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    /// Build a layer from loosely-typed records, validating every value
    /// against `fields` once. Missing attributes become null.
    pub fn from_records(
        name: impl Into<String>,
        fields: Vec<FieldDef>,
        records: impl IntoIterator<Item = Record<G>>,
    ) -> Result<Self> {
        let name = name.into();
        let schema = Schema::from_fields(&name, fields)?;
        let mut layer = Self::new(name, schema);

        for record in records {
            if let Some(unknown) = record
                .attributes
                .keys()
                .find(|key| !layer.schema.contains(key))
            {
                return Err(LayerError::unknown_field(&layer.name, unknown.as_str()));
            }
            let mut attributes = record.attributes;
            let values = layer
                .schema
                .fields()
                .iter()
                .map(|def| attributes.remove(&def.name).unwrap_or_default())
                .collect();
            layer.push(record.geometry, values)?;
        }

        Ok(layer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature<G>] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Feature<G>)> {
        self.features
            .iter()
            .enumerate()
            .map(|(idx, feature)| (FeatureId(idx), feature))
    }

    pub fn geometries(&self) -> impl Iterator<Item = &G> {
        self.features.iter().map(|f| &f.geometry)
    }

    pub fn into_features(self) -> Vec<Feature<G>> {
        self.features
    }

    pub fn feature(&self, id: FeatureId) -> Result<&Feature<G>> {
        self.features.get(id.0).ok_or_else(|| LayerError::NoSuchFeature {
            layer: self.name.clone(),
            feature: id.0,
        })
    }

    /// Resolve a field handle on this layer
    pub fn field(&self, name: &str) -> Result<FieldIndex> {
        self.schema.field(&self.name, name)
    }

    /// Append a feature. Values are coerced to the schema's field types.
    pub fn push(&mut self, geometry: G, values: Vec<FieldValue>) -> Result<FeatureId> {
        if values.len() != self.schema.len() {
            return Err(LayerError::ArityMismatch {
                layer: self.name.clone(),
                expected: self.schema.len(),
                found: values.len(),
            });
        }
        let values = values
            .into_iter()
            .zip(self.schema.fields())
            .map(|(value, def)| value.coerce(&def.name, def.ty))
            .collect::<Result<Vec<_>>>()?;

        self.features.push(Feature { geometry, values });
        Ok(FeatureId(self.features.len() - 1))
    }

    /// Add a new field, null for every existing feature
    pub fn add_field(&mut self, name: &str, ty: FieldType) -> Result<FieldIndex> {
        let index = self.schema.push(&self.name, FieldDef::new(name, ty))?;
        for feature in &mut self.features {
            feature.values.push(FieldValue::Null);
        }
        Ok(index)
    }

    /// Return the existing field if its type matches, otherwise add it
    pub fn ensure_field(&mut self, name: &str, ty: FieldType) -> Result<FieldIndex> {
        match self.schema.get(name) {
            Some(index) if index.ty == ty => Ok(index),
            Some(index) => Err(LayerError::TypeMismatch {
                field: name.to_string(),
                expected: ty,
                found: index.ty.to_string(),
            }),
            None => self.add_field(name, ty),
        }
    }

    fn check_handle(&self, field: &FieldIndex) -> Result<()> {
        match self.schema.fields().get(field.position) {
            Some(def) if def.name == field.name && def.ty == field.ty => Ok(()),
            _ => Err(LayerError::unknown_field(&self.name, field.name.as_str())),
        }
    }

    pub fn value(&self, id: FeatureId, field: &FieldIndex) -> Result<&FieldValue> {
        self.check_handle(field)?;
        Ok(self.feature(id)?.value(field))
    }

    pub fn set_field(
        &mut self,
        id: FeatureId,
        field: &FieldIndex,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        self.check_handle(field)?;
        let value = value.into().coerce(&field.name, field.ty)?;
        let layer = &self.name;
        let feature = self
            .features
            .get_mut(id.0)
            .ok_or_else(|| LayerError::NoSuchFeature {
                layer: layer.clone(),
                feature: id.0,
            })?;
        feature.values[field.position] = value;
        Ok(())
    }

    pub fn set_field_by_name(
        &mut self,
        id: FeatureId,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        let field = self.field(name)?;
        self.set_field(id, &field, value)
    }

    /// Features for which `predicate` holds, in original order
    pub fn filter(&self, mut predicate: impl FnMut(&Feature<G>) -> bool) -> Self
    where
        G: Clone,
    {
        Self {
            name: self.name.clone(),
            schema: self.schema.clone(),
            features: self
                .features
                .iter()
                .filter(|f| predicate(f))
                .cloned()
                .collect(),
        }
    }

    /// Transform every geometry, keeping attributes. Features mapped to
    /// `None` are dropped.
    pub fn filter_map_geometries<H>(self, mut f: impl FnMut(G) -> Option<H>) -> Layer<H> {
        Layer {
            name: self.name,
            schema: self.schema,
            features: self
                .features
                .into_iter()
                .filter_map(|feature| {
                    f(feature.geometry).map(|geometry| Feature {
                        geometry,
                        values: feature.values,
                    })
                })
                .collect(),
        }
    }

    /// Copy of the layer keeping only the named fields, in the given order
    pub fn select(&self, names: &[&str]) -> Result<Self>
    where
        G: Clone,
    {
        let handles = names
            .iter()
            .map(|name| self.field(name))
            .collect::<Result<Vec<_>>>()?;
        let fields = handles
            .iter()
            .map(|h| FieldDef::new(h.name(), h.ty()))
            .collect();
        let schema = Schema::from_fields(&self.name, fields)?;
        let features = self
            .features
            .iter()
            .map(|feature| Feature {
                geometry: feature.geometry.clone(),
                values: handles.iter().map(|h| feature.value(h).clone()).collect(),
            })
            .collect();
        Ok(Self {
            name: self.name.clone(),
            schema,
            features,
        })
    }

    /// Integer key value of a feature
    pub fn key_of(&self, id: FeatureId, key: &FieldIndex) -> Result<i64> {
        self.value(id, key)?
            .as_i64()
            .ok_or_else(|| LayerError::MissingKey {
                layer: self.name.clone(),
                key: key.name.clone(),
                feature: id.0,
            })
    }

    /// Map each key value to its feature, failing on repeated values
    pub fn index_by(&self, key: &str) -> Result<HashMap<i64, FeatureId>> {
        let field = self.field(key)?;
        let mut index = HashMap::with_capacity(self.features.len());
        for (id, _) in self.iter() {
            let value = self.key_of(id, &field)?;
            if index.insert(value, id).is_some() {
                return Err(LayerError::AmbiguousJoin {
                    layer: self.name.clone(),
                    key: key.to_string(),
                    value,
                });
            }
        }
        Ok(index)
    }
}

/// Add an integer field numbering features from 1 in layer order
pub fn assign_sequence<G>(layer: &mut Layer<G>, name: &str) -> Result<FieldIndex> {
    let field = layer.add_field(name, FieldType::Integer)?;
    for idx in 0..layer.len() {
        layer.set_field(FeatureId(idx), &field, (idx as i64) + 1)?;
    }
    Ok(field)
}

/// Add the `match_id` field: feature index + 1, assigned once and never recomputed
pub fn assign_match_ids<G>(layer: &mut Layer<G>) -> Result<FieldIndex> {
    assign_sequence(layer, MATCH_ID)
}
