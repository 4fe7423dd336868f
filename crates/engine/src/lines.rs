use geo::{BooleanOps, MultiLineString, MultiPolygon};

/// Portions of `lines` inside `polygons`, or outside them when `outside` is set
pub(crate) fn clip_lines(
    polygons: &MultiPolygon<f64>,
    lines: &MultiLineString<f64>,
    outside: bool,
) -> MultiLineString<f64> {
    if polygons.0.is_empty() {
        return if outside {
            lines.clone()
        } else {
            MultiLineString(Vec::new())
        };
    }
    polygons.clip(lines, outside)
}
