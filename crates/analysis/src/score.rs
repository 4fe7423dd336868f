use pcat_engine::PolygonLayer;
use pcat_layer::{FeatureId, FieldIndex, FieldType, MATCH_ID};

use crate::config::PcatConfig;
use crate::error::{AnalysisError, Result};

/// Weighted input of the composite score
struct Term {
    field: FieldIndex,
    weight: f64,
    /// Null reads as zero instead of failing
    optional: bool,
}

/// Write the composite score: the weighted perimeter and ring percentages
/// plus the weighted connectivity score. The percentage weights are used as
/// given and the connectivity weight is added on top without normalising.
pub fn composite_score(parcels: &PolygonLayer, config: &PcatConfig) -> Result<PolygonLayer> {
    let mut out = parcels.clone();

    let mut terms = vec![Term {
        field: out.field(&config.perimeter.fields.percent)?,
        weight: config.perimeter.weight,
        optional: false,
    }];
    for ring in &config.rings {
        terms.push(Term {
            field: out.field(&ring.fields.percent)?,
            weight: ring.weight,
            optional: false,
        });
    }
    terms.push(Term {
        field: out.field(&config.connectivity.field)?,
        weight: config.connectivity.weight,
        optional: true,
    });

    let key = out.field(MATCH_ID)?;
    let score = out.ensure_field(&config.score_field, FieldType::Double)?;

    for idx in 0..out.len() {
        let id = FeatureId(idx);
        let mut total = 0.0;
        for term in &terms {
            let value = match out.value(id, &term.field)?.as_f64() {
                Some(v) => v,
                None if term.optional => 0.0,
                None => {
                    return Err(AnalysisError::MissingValue {
                        field: term.field.name().to_string(),
                        match_id: out.key_of(id, &key)?,
                    })
                }
            };
            total += term.weight * value;
        }
        out.set_field(id, &score, total)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcat_layer::{assign_match_ids, FieldValue, Layer};
    use pretty_assertions::assert_eq;

    fn layer_with(config: &PcatConfig, values: &[(&str, FieldValue)]) -> PolygonLayer {
        let mut layer = Layer::from_geometries("parcels", [geo::MultiPolygon(Vec::new())]);
        assign_match_ids(&mut layer).unwrap();
        let mut names = vec![config.perimeter.fields.percent.as_str()];
        names.extend(config.rings.iter().map(|r| r.fields.percent.as_str()));
        names.push(&config.connectivity.field);
        for name in names {
            layer.add_field(name, FieldType::Double).unwrap();
        }
        for (name, value) in values {
            layer.set_field_by_name(FeatureId(0), name, value.clone()).unwrap();
        }
        layer
    }

    fn score(layer: &PolygonLayer) -> f64 {
        let field = layer.field("pcat_score").unwrap();
        layer.value(FeatureId(0), &field).unwrap().as_f64().unwrap()
    }

    #[test]
    fn default_weights() {
        let config = PcatConfig::default();
        let layer = layer_with(
            &config,
            &[
                ("perimeter_pct", FieldValue::Double(50.0)),
                ("qmi_pct", FieldValue::Double(40.0)),
                ("hmi_pct", FieldValue::Double(30.0)),
                ("mi1_pct", FieldValue::Double(20.0)),
                ("mi2_pct", FieldValue::Double(10.0)),
                ("connectivity_score", FieldValue::Double(5.0)),
            ],
        );
        let out = composite_score(&layer, &config).unwrap();
        let expected = 0.2 * 50.0 + 0.35 * 40.0 + 0.25 * 30.0 + 0.15 * 20.0 + 0.05 * 10.0 + 0.3 * 5.0;
        assert!((score(&out) - expected).abs() < 1e-9);
    }

    #[test]
    fn null_connectivity_counts_as_zero() {
        let config = PcatConfig::default();
        let layer = layer_with(
            &config,
            &[
                ("perimeter_pct", FieldValue::Double(100.0)),
                ("qmi_pct", FieldValue::Double(0.0)),
                ("hmi_pct", FieldValue::Double(0.0)),
                ("mi1_pct", FieldValue::Double(0.0)),
                ("mi2_pct", FieldValue::Double(0.0)),
            ],
        );
        let out = composite_score(&layer, &config).unwrap();
        assert!((score(&out) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn missing_percentage_fails() {
        let config = PcatConfig::default();
        let layer = layer_with(&config, &[("perimeter_pct", FieldValue::Double(100.0))]);
        let err = composite_score(&layer, &config).unwrap_err();
        match err {
            AnalysisError::MissingValue { field, match_id } => {
                assert_eq!(field, "qmi_pct");
                assert_eq!(match_id, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
