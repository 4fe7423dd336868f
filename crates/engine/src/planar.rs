use geo::orient::Direction;
use geo::{Area, ConvexHull, CoordsIter, Intersects, MultiLineString, MultiPoint, MultiPolygon, Orient, Point, Rect};
use geo_clipper::{Clipper, EndType, JoinType};
use pcat_layer::{FieldDef, FieldType, FieldValue, Layer, Schema, Statistic};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::index::{bbox, BoxIndex};
use crate::lines::clip_lines;
use crate::measure::{prune_lines, prune_polygons, Measure};
use crate::{BufferSide, GeometryEngine, JoinMatch, LineLayer, PolygonLayer, JOIN_COUNT};

/// [`GeometryEngine`] over `f64` planar coordinates.
///
/// Polygon boolean operations and offsets run through Clipper on integer
/// coordinates scaled by [`EngineConfig::precision`]; line clipping, hulls and
/// measurements use `geo` directly.
#[derive(Debug, Clone)]
pub struct PlanarEngine {
    config: EngineConfig,
}

impl Default for PlanarEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

fn oriented(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.orient(Direction::Default)
}

fn rects_overlap(a: Option<Rect<f64>>, b: Option<Rect<f64>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => false,
    }
}

fn polygons_intersect(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.0.iter().any(|pa| b.0.iter().any(|pb| pa.intersects(pb)))
}

impl PlanarEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(EngineError::InvalidParameter)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn union(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if a.0.is_empty() {
            return b.clone();
        }
        if b.0.is_empty() {
            return a.clone();
        }
        prune_polygons(oriented(a).union(&oriented(b), self.config.precision))
    }

    fn union_all<'a>(&self, parts: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> MultiPolygon<f64> {
        parts
            .into_iter()
            .fold(MultiPolygon(Vec::new()), |acc, part| self.union(&acc, part))
    }

    fn difference(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if b.0.is_empty() {
            return a.clone();
        }
        prune_polygons(oriented(a).difference(&oriented(b), self.config.precision))
    }

    fn intersection(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if !rects_overlap(bbox(a), bbox(b)) {
            return MultiPolygon(Vec::new());
        }
        prune_polygons(oriented(a).intersection(&oriented(b), self.config.precision))
    }

    /// Polygons grown by the snap tolerance, so that line work running along
    /// a boundary is treated as inside
    fn snapped(&self, polygons: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if self.config.snap_tolerance <= 0.0 || polygons.0.is_empty() {
            return polygons.clone();
        }
        self.offset(polygons, self.config.snap_tolerance)
    }

    /// Grow (positive) or shrink (negative) a geometry with round joins
    fn offset(&self, geometry: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
        prune_polygons(oriented(geometry).offset(
            distance,
            JoinType::Round(self.config.arc_tolerance),
            EndType::ClosedPolygon,
            self.config.precision,
        ))
    }
}

impl GeometryEngine for PlanarEngine {
    fn buffer(&self, layer: &PolygonLayer, distance: f64, side: BufferSide) -> Result<PolygonLayer> {
        if !distance.is_finite() || distance == 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "buffer distance must be finite and non-zero (got {distance})"
            )));
        }
        if side == BufferSide::OutsideOnly && distance < 0.0 {
            return Err(EngineError::InvalidParameter(
                "outside-only buffers need a positive distance".to_string(),
            ));
        }

        let mut out = Layer::new(format!("{}_buffer", layer.name()), layer.schema().clone());
        for (id, feature) in layer.iter() {
            let mut grown = self.offset(&feature.geometry, distance);
            if side == BufferSide::OutsideOnly {
                grown = self.difference(&grown, &feature.geometry);
            }
            if grown.0.is_empty() {
                log::warn!(
                    "buffer of feature {} in '{}' by {distance} collapsed to an empty geometry; dropped",
                    id.0,
                    layer.name()
                );
                continue;
            }
            out.push(grown, feature.values().to_vec())?;
        }
        Ok(out)
    }

    fn erase(&self, layer: &PolygonLayer, eraser: &PolygonLayer) -> Result<PolygonLayer> {
        let eraser_union = self.union_all(eraser.geometries());
        let eraser_box = bbox(&eraser_union);

        let mut out = Layer::new(format!("{}_erase", layer.name()), layer.schema().clone());
        for (id, feature) in layer.iter() {
            let remaining = if rects_overlap(bbox(&feature.geometry), eraser_box) {
                self.difference(&feature.geometry, &eraser_union)
            } else {
                feature.geometry.clone()
            };
            if remaining.0.is_empty() {
                log::warn!("feature {} in '{}' fully erased; dropped", id.0, layer.name());
                continue;
            }
            out.push(remaining, feature.values().to_vec())?;
        }
        Ok(out)
    }

    fn erase_lines(&self, layer: &LineLayer, eraser: &PolygonLayer) -> Result<LineLayer> {
        let eraser_union = self.snapped(&self.union_all(eraser.geometries()));

        let mut out = Layer::new(format!("{}_erase", layer.name()), layer.schema().clone());
        for (id, feature) in layer.iter() {
            let remaining = prune_lines(clip_lines(&eraser_union, &feature.geometry, true));
            if remaining.0.is_empty() {
                log::warn!("line feature {} in '{}' fully erased; dropped", id.0, layer.name());
                continue;
            }
            out.push(remaining, feature.values().to_vec())?;
        }
        Ok(out)
    }

    fn intersect(&self, layer: &PolygonLayer, overlay: &PolygonLayer) -> Result<PolygonLayer> {
        let index = BoxIndex::build(overlay.geometries());
        let schema = layer.schema().overlay(overlay.schema());
        let mut out = Layer::new(format!("{}_intersect", layer.name()), schema);

        for feature in layer.features() {
            let Some(rect) = bbox(&feature.geometry) else {
                continue;
            };
            for j in index.candidates(rect) {
                let other = &overlay.features()[j];
                let piece = self.intersection(&feature.geometry, &other.geometry);
                if piece.0.is_empty() {
                    continue;
                }
                let mut values = feature.values().to_vec();
                values.extend_from_slice(other.values());
                out.push(piece, values)?;
            }
        }
        Ok(out)
    }

    fn intersect_lines(&self, layer: &LineLayer, overlay: &PolygonLayer) -> Result<LineLayer> {
        let index = BoxIndex::build(overlay.geometries());
        let schema = layer.schema().overlay(overlay.schema());
        let mut out = Layer::new(format!("{}_intersect", layer.name()), schema);

        for feature in layer.features() {
            let Some(rect) = bbox(&feature.geometry) else {
                continue;
            };
            for j in index.candidates(rect) {
                let other = &overlay.features()[j];
                let window = self.snapped(&other.geometry);
                let piece = prune_lines(clip_lines(&window, &feature.geometry, false));
                if piece.0.is_empty() {
                    continue;
                }
                let mut values = feature.values().to_vec();
                values.extend_from_slice(other.values());
                out.push(piece, values)?;
            }
        }
        Ok(out)
    }

    fn clip(&self, layer: &PolygonLayer, clipper: &PolygonLayer) -> Result<PolygonLayer> {
        let clip_union = self.union_all(clipper.geometries());

        let mut out = Layer::new(format!("{}_clip", layer.name()), layer.schema().clone());
        for (id, feature) in layer.iter() {
            let kept = self.intersection(&feature.geometry, &clip_union);
            if kept.0.is_empty() {
                log::debug!("feature {} in '{}' lies outside the clip extent", id.0, layer.name());
                continue;
            }
            out.push(kept, feature.values().to_vec())?;
        }
        Ok(out)
    }

    fn dissolve(&self, layer: PolygonLayer, key: &str, stats: &[Statistic]) -> Result<PolygonLayer> {
        Ok(layer.dissolve(key, stats, |parts| self.union_all(parts.iter()))?)
    }

    fn dissolve_lines(&self, layer: LineLayer, key: &str, stats: &[Statistic]) -> Result<LineLayer> {
        Ok(layer.dissolve(key, stats, |parts| {
            MultiLineString(parts.into_iter().flat_map(|part| part.0).collect())
        })?)
    }

    fn dissolve_all(&self, layer: &PolygonLayer) -> Result<PolygonLayer> {
        let merged = self.union_all(layer.geometries());
        let name = format!("{}_dissolve", layer.name());
        if merged.0.is_empty() {
            return Ok(Layer::new(name, Schema::new()));
        }
        Ok(Layer::from_geometries(name, [merged]))
    }

    fn polygon_to_line(&self, layer: &PolygonLayer) -> Result<LineLayer> {
        let mut out = Layer::new(format!("{}_line", layer.name()), layer.schema().clone());
        for feature in layer.features() {
            let rings = feature
                .geometry
                .0
                .iter()
                .flat_map(|polygon| {
                    std::iter::once(polygon.exterior().clone()).chain(polygon.interiors().iter().cloned())
                })
                .collect();
            out.push(MultiLineString(rings), feature.values().to_vec())?;
        }
        Ok(out)
    }

    fn convex_hull(&self, layer: &PolygonLayer) -> Result<PolygonLayer> {
        let points: Vec<Point<f64>> = layer
            .geometries()
            .flat_map(|geometry| geometry.coords_iter().map(Point::from))
            .collect();
        if points.is_empty() {
            return Err(EngineError::EmptyInput(layer.name().to_string()));
        }
        let hull = MultiPoint(points).convex_hull();
        if hull.unsigned_area() <= 0.0 {
            return Err(EngineError::InvalidGeometry(format!(
                "convex hull of '{}' has no area",
                layer.name()
            )));
        }
        Ok(Layer::from_geometries(
            format!("{}_hull", layer.name()),
            [MultiPolygon(vec![hull])],
        ))
    }

    fn spatial_join(
        &self,
        target: &PolygonLayer,
        join: &PolygonLayer,
        matching: JoinMatch,
    ) -> Result<PolygonLayer> {
        if let JoinMatch::WithinDistance(distance) = matching {
            if !(distance.is_finite() && distance > 0.0) {
                return Err(EngineError::InvalidParameter(format!(
                    "spatial join search distance must be > 0 (got {distance})"
                )));
            }
        }
        let index = BoxIndex::build(join.geometries());
        let count = Schema::from_fields(target.name(), vec![FieldDef::new(JOIN_COUNT, FieldType::Integer)])?;
        let schema = target.schema().overlay(&count).overlay(join.schema());
        let mut out = Layer::new(format!("{}_spatial_join", target.name()), schema);

        for feature in target.features() {
            let probe = match matching {
                JoinMatch::Intersect => feature.geometry.clone(),
                JoinMatch::WithinDistance(distance) => self.offset(&feature.geometry, distance),
            };
            let matches: Vec<usize> = match bbox(&probe) {
                Some(rect) => index
                    .candidates(rect)
                    .into_iter()
                    .filter(|&j| polygons_intersect(&probe, &join.features()[j].geometry))
                    .collect(),
                None => Vec::new(),
            };

            let mut values = feature.values().to_vec();
            values.push(FieldValue::Integer(matches.len() as i64));
            match matches.first() {
                Some(&first) => values.extend_from_slice(join.features()[first].values()),
                None => values.extend(std::iter::repeat(FieldValue::Null).take(join.schema().len())),
            }
            out.push(feature.geometry.clone(), values)?;
        }
        Ok(out)
    }

    fn explode(&self, layer: PolygonLayer) -> Result<PolygonLayer> {
        let mut out = Layer::new(layer.name().to_string(), layer.schema().clone());
        for feature in layer.into_features() {
            let (geometry, values) = feature.into_parts();
            for part in geometry.0 {
                out.push(MultiPolygon(vec![part]), values.clone())?;
            }
        }
        Ok(out)
    }

    fn area(&self, geometry: &MultiPolygon<f64>) -> f64 {
        geometry.measure()
    }

    fn length(&self, geometry: &MultiLineString<f64>) -> f64 {
        geometry.measure()
    }
}
