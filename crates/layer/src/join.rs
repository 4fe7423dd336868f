use crate::error::{LayerError, Result};
use crate::layer::{FeatureId, Layer};
use crate::schema::{FieldDef, FieldValue, Schema};

/// How unmatched rows of the left layer are treated by [`Layer::join`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Drop left rows with no match
    Inner,
    /// Keep every left row; unmatched rows get null right-hand values
    Left,
}

impl<G: Clone> Layer<G> {
    /// One-to-one attribute join on an integer key.
    ///
    /// The result keeps this layer's geometries and order. Its schema is this
    /// layer's fields followed by every field of `other` except `key`. The key
    /// must be unique on both sides.
    pub fn join<H>(&self, other: &Layer<H>, key: &str, kind: JoinKind) -> Result<Layer<G>> {
        let left_key = self.field(key)?;
        // Uniqueness is checked on both sides even though only the right index is used for lookup.
        self.index_by(key)?;
        let right_index = other.index_by(key)?;

        let carried: Vec<&FieldDef> = other
            .schema()
            .fields()
            .iter()
            .filter(|def| def.name != key)
            .collect();

        let mut fields = self.schema().fields().to_vec();
        for def in &carried {
            if self.schema().contains(&def.name) {
                return Err(LayerError::duplicate_field(self.name(), def.name.as_str()));
            }
            fields.push((*def).clone());
        }
        let schema = Schema::from_fields(self.name(), fields)?;
        let carried_positions: Vec<usize> = carried
            .iter()
            .filter_map(|def| other.schema().position(&def.name))
            .collect();

        let mut joined = Layer::new(self.name(), schema);
        for (id, feature) in self.iter() {
            let key_value = self.key_of(id, &left_key)?;
            let right_values: Vec<FieldValue> = match right_index.get(&key_value) {
                Some(&right_id) => {
                    let right = other.feature(right_id)?;
                    carried_positions
                        .iter()
                        .map(|&pos| right.values()[pos].clone())
                        .collect()
                }
                None if kind == JoinKind::Inner => continue,
                None => vec![FieldValue::Null; carried_positions.len()],
            };

            let mut values = feature.values().to_vec();
            values.extend(right_values);
            joined.push(feature.geometry.clone(), values)?;
        }

        log::debug!(
            "joined '{}' ({} rows) with '{}' ({} rows) on {}: {} rows",
            self.name(),
            self.len(),
            other.name(),
            other.len(),
            key,
            joined.len()
        );

        Ok(joined)
    }

    /// Copy one field's values from `source` into `target_field` of this
    /// layer, matching rows on `key`. Rows without a match receive null.
    pub fn copy_field_from<H>(
        &mut self,
        source: &Layer<H>,
        key: &str,
        source_field: &str,
        target_field: &str,
    ) -> Result<()> {
        let left_key = self.field(key)?;
        let target = self.field(target_field)?;
        let source_index = source.index_by(key)?;
        let source_handle = source.field(source_field)?;

        for idx in 0..self.len() {
            let id = FeatureId(idx);
            let key_value = self.key_of(id, &left_key)?;
            let value = match source_index.get(&key_value) {
                Some(&sid) => source.value(sid, &source_handle)?.clone(),
                None => FieldValue::Null,
            };
            self.set_field(id, &target, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{assign_match_ids, MATCH_ID};
    use crate::schema::FieldType;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn keyed(name: &str, ids: &[i64], field: &str, values: &[f64]) -> Layer<()> {
        let mut layer = Layer::new(
            name,
            Schema::from_fields(
                name,
                vec![
                    FieldDef::new(MATCH_ID, FieldType::Integer),
                    FieldDef::new(field, FieldType::Double),
                ],
            )
            .unwrap(),
        );
        for (id, value) in ids.iter().zip(values) {
            layer
                .push((), vec![FieldValue::Integer(*id), FieldValue::Double(*value)])
                .unwrap();
        }
        layer
    }

    #[test]
    fn inner_join_drops_unmatched_rows() {
        let left = keyed("boundary", &[1, 2, 3], "length", &[10.0, 20.0, 30.0]);
        let right = keyed("overlap", &[3, 1], "sum_overlap", &[3.0, 1.0]);
        let joined = left.join(&right, MATCH_ID, JoinKind::Inner).unwrap();
        let overlap = joined.field("sum_overlap").unwrap();
        let values: Vec<f64> = joined
            .features()
            .iter()
            .map(|f| f.value(&overlap).as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![1.0, 3.0]);
    }

    #[test]
    fn left_join_fills_nulls() {
        let left = keyed("boundary", &[1, 2], "length", &[10.0, 20.0]);
        let right = keyed("overlap", &[2], "sum_overlap", &[5.0]);
        let joined = left.join(&right, MATCH_ID, JoinKind::Left).unwrap();
        let overlap = joined.field("sum_overlap").unwrap();
        assert!(joined.features()[0].value(&overlap).is_null());
        assert_eq!(joined.features()[1].value(&overlap), &FieldValue::Double(5.0));
    }

    #[test]
    fn join_rejects_non_unique_right_keys() {
        let left = keyed("boundary", &[1, 2], "length", &[10.0, 20.0]);
        let right = keyed("overlap", &[2, 2], "sum_overlap", &[5.0, 6.0]);
        let err = left.join(&right, MATCH_ID, JoinKind::Left).unwrap_err();
        assert_eq!(
            err,
            LayerError::AmbiguousJoin {
                layer: "overlap".to_string(),
                key: MATCH_ID.to_string(),
                value: 2,
            }
        );
    }

    #[test]
    fn join_rejects_clashing_field_names() {
        let left = keyed("boundary", &[1], "length", &[10.0]);
        let right = keyed("other", &[1], "length", &[5.0]);
        let err = left.join(&right, MATCH_ID, JoinKind::Inner).unwrap_err();
        assert!(matches!(err, LayerError::DuplicateField { .. }));
    }

    #[test]
    fn copy_field_from_keys_on_match_id() {
        let mut target = keyed("parcels", &[1, 2, 3], "pct", &[0.0, 0.0, 0.0]);
        let source = keyed("ring", &[3, 1], "raw", &[30.0, 10.0]);
        target.copy_field_from(&source, MATCH_ID, "raw", "pct").unwrap();
        let pct = target.field("pct").unwrap();
        let values: Vec<FieldValue> = target.features().iter().map(|f| f.value(&pct).clone()).collect();
        assert_eq!(
            values,
            vec![FieldValue::Double(10.0), FieldValue::Null, FieldValue::Double(30.0)]
        );
    }

    proptest! {
        #[test]
        fn left_join_preserves_match_id_bijection(n in 1usize..40, keep in proptest::collection::vec(any::<bool>(), 40)) {
            let mut left = Layer::from_geometries("parcels", vec![(); n]);
            assign_match_ids(&mut left).unwrap();

            let ids: Vec<i64> = (1..=n as i64).rev().filter(|id| keep[(*id as usize) - 1]).collect();
            let values: Vec<f64> = ids.iter().map(|id| *id as f64).collect();
            let right = keyed("derived", &ids, "metric", &values);

            let joined = left.join(&right, MATCH_ID, JoinKind::Left).unwrap();
            prop_assert_eq!(joined.len(), n);
            let index = joined.index_by(MATCH_ID).unwrap();
            prop_assert_eq!(index.len(), n);

            let metric = joined.field("metric").unwrap();
            let key = joined.field(MATCH_ID).unwrap();
            for (id, feature) in joined.iter() {
                let match_id = joined.key_of(id, &key).unwrap();
                prop_assert_eq!(match_id, id.0 as i64 + 1);
                match feature.value(&metric).as_f64() {
                    Some(v) => prop_assert_eq!(v, match_id as f64),
                    None => prop_assert!(!keep[id.0]),
                }
            }
        }
    }
}
