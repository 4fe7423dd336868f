use geo::{Area, EuclideanLength, LineString, MultiLineString, MultiPolygon, Polygon};

/// Planar size of a geometry: area for polygons, length for lines
pub trait Measure {
    fn measure(&self) -> f64;
}

impl Measure for MultiPolygon<f64> {
    fn measure(&self) -> f64 {
        self.unsigned_area()
    }
}

impl Measure for MultiLineString<f64> {
    fn measure(&self) -> f64 {
        self.euclidean_length()
    }
}

/// Drop zero-area parts left behind by clipping
pub(crate) fn prune_polygons(geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon(
        geometry
            .0
            .into_iter()
            .filter(|p: &Polygon<f64>| p.unsigned_area() > 0.0)
            .collect(),
    )
}

/// Drop zero-length pieces left behind by clipping
pub(crate) fn prune_lines(geometry: MultiLineString<f64>) -> MultiLineString<f64> {
    MultiLineString(
        geometry
            .0
            .into_iter()
            .filter(|l: &LineString<f64>| l.euclidean_length() > 0.0)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    #[test]
    fn measures_area_and_length() {
        let square = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]]);
        assert!((square.measure() - 100.0).abs() < 1e-9);

        let line = MultiLineString(vec![line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)]]);
        assert!((line.measure() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn pruning_drops_empty_parts() {
        let lines = MultiLineString(vec![
            line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)],
            line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0)],
        ]);
        assert_eq!(prune_lines(lines).0.len(), 1);
    }
}
