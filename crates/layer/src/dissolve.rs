use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};
use crate::layer::{FeatureId, Layer};
use crate::schema::{FieldDef, FieldType, FieldValue, Schema};

/// Aggregation applied to a field while dissolving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatisticKind {
    Sum,
    First,
}

/// A field aggregation written to `sum_<field>` or `first_<field>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    pub field: String,
    pub kind: StatisticKind,
}

impl Statistic {
    pub fn sum(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: StatisticKind::Sum,
        }
    }

    pub fn first(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: StatisticKind::First,
        }
    }

    pub fn output_name(&self) -> String {
        match self.kind {
            StatisticKind::Sum => format!("sum_{}", self.field),
            StatisticKind::First => format!("first_{}", self.field),
        }
    }
}

impl<G> Layer<G> {
    /// Group features by an integer key and aggregate them into one feature
    /// per key, in order of first appearance. `combine` merges the group's
    /// geometries. The output schema is the key followed by one field per
    /// statistic.
    pub fn dissolve(
        self,
        key: &str,
        stats: &[Statistic],
        mut combine: impl FnMut(Vec<G>) -> G,
    ) -> Result<Layer<G>> {
        let key_field = self.field(key)?;

        let mut fields = vec![FieldDef::new(key, FieldType::Integer)];
        let mut sources = Vec::with_capacity(stats.len());
        for stat in stats {
            let source = self.field(&stat.field)?;
            let ty = match (stat.kind, source.ty()) {
                (StatisticKind::Sum, FieldType::Text) => {
                    return Err(LayerError::TypeMismatch {
                        field: stat.field.clone(),
                        expected: FieldType::Double,
                        found: FieldType::Text.to_string(),
                    })
                }
                (StatisticKind::Sum, _) => FieldType::Double,
                (StatisticKind::First, ty) => ty,
            };
            fields.push(FieldDef::new(stat.output_name(), ty));
            sources.push(source);
        }
        let schema = Schema::from_fields(self.name(), fields)?;

        let mut order: Vec<i64> = Vec::new();
        let mut groups: HashMap<i64, (Vec<G>, Vec<FieldValue>)> = HashMap::new();
        let keys = (0..self.len())
            .map(|idx| self.key_of(FeatureId(idx), &key_field))
            .collect::<Result<Vec<_>>>()?;
        let name = self.name().to_string();

        for (feature, key_value) in self.into_features().into_iter().zip(keys) {
            let (geometry, values) = feature.into_parts();
            let group = groups.entry(key_value).or_insert_with(|| {
                order.push(key_value);
                (Vec::new(), vec![FieldValue::Null; stats.len()])
            });
            group.0.push(geometry);

            for ((stat, source), acc) in stats.iter().zip(&sources).zip(group.1.iter_mut()) {
                let value = &values[source.position()];
                match stat.kind {
                    StatisticKind::Sum => {
                        if let Some(v) = value.as_f64() {
                            let total = acc.as_f64().unwrap_or(0.0) + v;
                            *acc = FieldValue::Double(total);
                        }
                    }
                    StatisticKind::First => {
                        if acc.is_null() {
                            *acc = value.clone();
                        }
                    }
                }
            }
        }

        let mut dissolved = Layer::new(name, schema);
        for key_value in order {
            if let Some((geometries, aggregates)) = groups.remove(&key_value) {
                let mut values = Vec::with_capacity(aggregates.len() + 1);
                values.push(FieldValue::Integer(key_value));
                values.extend(aggregates);
                dissolved.push(combine(geometries), values)?;
            }
        }
        Ok(dissolved)
    }

    /// Append `other` to this layer. The schema is the union of both inputs;
    /// a field present on both must have the same type.
    pub fn merge(self, other: Layer<G>, name: impl Into<String>) -> Result<Layer<G>> {
        let name = name.into();
        let mut fields = self.schema().fields().to_vec();
        for def in other.schema().fields() {
            match fields.iter().find(|f| f.name == def.name) {
                Some(existing) if existing.ty != def.ty => {
                    return Err(LayerError::TypeMismatch {
                        field: def.name.clone(),
                        expected: existing.ty,
                        found: def.ty.to_string(),
                    })
                }
                Some(_) => {}
                None => fields.push(def.clone()),
            }
        }
        let schema = Schema::from_fields(&name, fields)?;
        let mut merged = Layer::new(name, schema);

        for layer in [self, other] {
            let positions: Vec<Option<usize>> = merged
                .schema()
                .fields()
                .iter()
                .map(|def| layer.schema().position(&def.name))
                .collect();
            for feature in layer.into_features() {
                let (geometry, values) = feature.into_parts();
                let mapped = positions
                    .iter()
                    .map(|pos| pos.map(|p| values[p].clone()).unwrap_or_default())
                    .collect();
                merged.push(geometry, mapped)?;
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::MATCH_ID;
    use pretty_assertions::assert_eq;

    fn pieces() -> Layer<u32> {
        let schema = Schema::from_fields(
            "pieces",
            vec![
                FieldDef::new(MATCH_ID, FieldType::Integer),
                FieldDef::new("length", FieldType::Double),
            ],
        )
        .unwrap();
        let mut layer = Layer::new("pieces", schema);
        for (id, geom, length) in [(2, 1u32, 1.5), (1, 2, 4.0), (2, 3, 2.5), (1, 4, 1.0)] {
            layer
                .push(geom, vec![FieldValue::Integer(id), FieldValue::Double(length)])
                .unwrap();
        }
        layer
    }

    #[test]
    fn dissolve_sums_per_key_in_first_seen_order() {
        let dissolved = pieces()
            .dissolve(MATCH_ID, &[Statistic::sum("length")], |g| g.into_iter().sum())
            .unwrap();
        let sum = dissolved.field("sum_length").unwrap();
        let rows: Vec<(u32, f64)> = dissolved
            .features()
            .iter()
            .map(|f| (f.geometry, f.value(&sum).as_f64().unwrap()))
            .collect();
        assert_eq!(rows, vec![(4, 4.0), (6, 5.0)]);
    }

    #[test]
    fn dissolve_first_keeps_earliest_value() {
        let dissolved = pieces()
            .dissolve(MATCH_ID, &[Statistic::first("length")], |g| g[0])
            .unwrap();
        let first = dissolved.field("first_length").unwrap();
        assert_eq!(dissolved.features()[0].value(&first), &FieldValue::Double(1.5));
        assert_eq!(dissolved.features()[1].value(&first), &FieldValue::Double(4.0));
    }

    #[test]
    fn merge_unions_schemas() {
        let mut a = Layer::from_geometries("a", [1u32]);
        let score = a.add_field("score", FieldType::Integer).unwrap();
        a.set_field(FeatureId(0), &score, 5i64).unwrap();
        let mut b = Layer::from_geometries("b", [2u32]);
        b.add_field("score", FieldType::Integer).unwrap();
        b.add_field("note", FieldType::Text).unwrap();

        let merged = a.merge(b, "merged").unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.schema().len(), 2);
        let score = merged.field("score").unwrap();
        assert_eq!(merged.features()[0].value(&score), &FieldValue::Integer(5));
        assert!(merged.features()[1].value(&score).is_null());
    }

    #[test]
    fn merge_rejects_conflicting_types() {
        let mut a = Layer::from_geometries("a", [1u32]);
        a.add_field("score", FieldType::Integer).unwrap();
        let mut b = Layer::from_geometries("b", [2u32]);
        b.add_field("score", FieldType::Text).unwrap();
        assert!(a.merge(b, "merged").is_err());
    }
}
