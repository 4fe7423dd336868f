use std::collections::HashMap;

use pcat_layer::{FeatureId, FieldIndex, FieldType, Layer, MATCH_ID};

use crate::error::{AnalysisError, Result};

/// `part / whole * 100`, unclamped
pub fn percentage(part: f64, whole: f64) -> f64 {
    part / whole * 100.0
}

/// Total and protected quantity of one parcel, in layer units
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Coverage {
    pub total: f64,
    pub protected: f64,
}

impl Coverage {
    pub fn percent(&self) -> f64 {
        percentage(self.protected, self.total)
    }
}

/// Add a double field holding `measure` of every feature's geometry
pub(crate) fn measure_into<G>(
    layer: &mut Layer<G>,
    name: &str,
    measure: impl Fn(&G) -> f64,
) -> Result<FieldIndex> {
    let field = layer.add_field(name, FieldType::Double)?;
    let sizes: Vec<f64> = layer.geometries().map(measure).collect();
    for (idx, size) in sizes.into_iter().enumerate() {
        layer.set_field(FeatureId(idx), &field, size)?;
    }
    Ok(field)
}

/// Read per-parcel totals from a layer joined on `match_id`.
/// A null protected value means nothing overlapped.
pub(crate) fn coverage_by_parcel<G>(
    joined: &Layer<G>,
    total: &str,
    protected: &str,
) -> Result<HashMap<i64, Coverage>> {
    let key = joined.field(MATCH_ID)?;
    let total = joined.field(total)?;
    let protected = joined.field(protected)?;

    let mut coverage = HashMap::with_capacity(joined.len());
    for (id, feature) in joined.iter() {
        let match_id = joined.key_of(id, &key)?;
        coverage.insert(
            match_id,
            Coverage {
                total: feature.value(&total).as_f64().unwrap_or(0.0),
                protected: feature.value(&protected).as_f64().unwrap_or(0.0),
            },
        );
    }
    Ok(coverage)
}

/// Pair every parcel with its coverage. A parcel with no entry or a
/// non-positive total has no denominator and is degenerate.
pub(crate) fn require_coverage<G>(
    parcels: &Layer<G>,
    coverage: &HashMap<i64, Coverage>,
    measured: &str,
) -> Result<Vec<(FeatureId, Coverage)>> {
    let key = parcels.field(MATCH_ID)?;
    let mut rows = Vec::with_capacity(parcels.len());
    for (id, _) in parcels.iter() {
        let match_id = parcels.key_of(id, &key)?;
        match coverage.get(&match_id) {
            Some(c) if c.total > 0.0 && c.total.is_finite() => rows.push((id, *c)),
            Some(c) => {
                return Err(AnalysisError::degenerate(
                    match_id,
                    format!("{measured} is {} after exclusions", c.total),
                ))
            }
            None => {
                return Err(AnalysisError::degenerate(
                    match_id,
                    format!("{measured} vanished after exclusions"),
                ))
            }
        }
    }
    Ok(rows)
}
