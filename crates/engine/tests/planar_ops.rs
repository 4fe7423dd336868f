use geo::{polygon, MultiPolygon};
use pcat_engine::{BufferSide, GeometryEngine, JoinMatch, PlanarEngine, PolygonLayer, JOIN_COUNT};
use pcat_layer::{assign_match_ids, FieldType, FieldValue, Layer, Statistic, MATCH_ID};

fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x + size, y: y + size),
        (x: x, y: y + size),
    ]])
}

fn parcels(squares: &[(f64, f64, f64)]) -> PolygonLayer {
    let mut layer = Layer::from_geometries(
        "parcels",
        squares.iter().map(|&(x, y, s)| square(x, y, s)),
    );
    assign_match_ids(&mut layer).unwrap();
    layer
}

fn close(a: f64, b: f64, rel: f64) -> bool {
    (a - b).abs() <= rel * b.abs().max(1.0)
}

#[test]
fn outside_only_buffer_is_a_ring() {
    let engine = PlanarEngine::default();
    let layer = parcels(&[(0.0, 0.0, 100.0)]);
    let ring = engine.buffer(&layer, 10.0, BufferSide::OutsideOnly).unwrap();

    assert_eq!(ring.len(), 1);
    let expected = 4.0 * 100.0 * 10.0 + std::f64::consts::PI * 100.0;
    let area = engine.area(&ring.features()[0].geometry);
    assert!(close(area, expected, 0.01), "ring area {area}, expected {expected}");

    let match_id = ring.field(MATCH_ID).unwrap();
    assert_eq!(ring.features()[0].value(&match_id), &FieldValue::Integer(1));
}

#[test]
fn erosion_drops_collapsed_features() {
    let engine = PlanarEngine::default();
    let layer = parcels(&[(0.0, 0.0, 20.0), (100.0, 0.0, 200.0)]);
    let eroded = engine.buffer(&layer, -15.0, BufferSide::Full).unwrap();

    assert_eq!(eroded.len(), 1);
    let match_id = eroded.field(MATCH_ID).unwrap();
    assert_eq!(eroded.features()[0].value(&match_id), &FieldValue::Integer(2));
    let area = engine.area(&eroded.features()[0].geometry);
    assert!(close(area, 170.0 * 170.0, 0.001));
}

#[test]
fn outside_only_rejects_negative_distance() {
    let engine = PlanarEngine::default();
    let layer = parcels(&[(0.0, 0.0, 20.0)]);
    assert!(engine.buffer(&layer, -1.0, BufferSide::OutsideOnly).is_err());
}

#[test]
fn erase_and_intersect_polygons() {
    let engine = PlanarEngine::default();
    let layer = parcels(&[(0.0, 0.0, 10.0)]);
    let eraser = Layer::from_geometries("exclusion", [square(5.0, 0.0, 10.0)]);

    let erased = engine.erase(&layer, &eraser).unwrap();
    assert!(close(engine.area(&erased.features()[0].geometry), 50.0, 1e-6));

    let mut context = Layer::from_geometries("context", [square(0.0, 0.0, 2.0), square(0.0, 8.0, 2.0)]);
    context.add_field("owner", FieldType::Text).unwrap();
    let pieces = engine.intersect(&erased, &context).unwrap();
    assert_eq!(pieces.len(), 2);
    assert!(pieces.schema().contains("owner"));
    let total: f64 = pieces.geometries().map(|g| engine.area(g)).sum();
    assert!(close(total, 8.0, 1e-6));
}

#[test]
fn boundary_lines_clip_and_dissolve() {
    let engine = PlanarEngine::default();
    let layer = parcels(&[(0.0, 0.0, 10.0)]);
    let boundary = engine.polygon_to_line(&layer).unwrap();
    assert!(close(engine.length(&boundary.features()[0].geometry), 40.0, 1e-9));

    // Exclusion covers one unit of boundary either side of the origin corner.
    let exclusion = Layer::from_geometries("exclusion", [square(-1.0, -1.0, 2.0)]);
    let erased = engine.erase_lines(&boundary, &exclusion).unwrap();
    assert!(close(engine.length(&erased.features()[0].geometry), 38.0, 1e-4));

    let context = Layer::from_geometries("context", [square(5.0, -5.0, 20.0), square(6.0, -5.0, 20.0)]);
    let overlap = engine.intersect_lines(&erased, &context).unwrap();
    assert_eq!(overlap.len(), 2);

    let mut measured = overlap;
    let len_field = measured.add_field("overlap", FieldType::Double).unwrap();
    let lengths: Vec<f64> = measured.geometries().map(|g| engine.length(g)).collect();
    for (idx, len) in lengths.into_iter().enumerate() {
        measured
            .set_field(pcat_layer::FeatureId(idx), &len_field, len)
            .unwrap();
    }
    let dissolved = engine
        .dissolve_lines(measured, MATCH_ID, &[Statistic::sum("overlap")])
        .unwrap();
    assert_eq!(dissolved.len(), 1);
    let sum = dissolved.field("sum_overlap").unwrap();
    // Bottom, right and top edge pieces inside each context square, give or
    // take the snap tolerance at each crossing.
    let expected = (5.0 + 10.0 + 5.0) + (4.0 + 10.0 + 4.0);
    let got = dissolved.features()[0].value(&sum).as_f64().unwrap();
    assert!(close(got, expected, 1e-4), "got {got}, expected {expected}");
}

#[test]
fn shared_edge_is_inside_for_line_clipping() {
    let engine = PlanarEngine::default();
    let boundary = engine.polygon_to_line(&parcels(&[(0.0, 0.0, 10.0)])).unwrap();
    let neighbour = Layer::from_geometries("context", [square(-10.0, 0.0, 10.0)]);

    let overlap = engine.intersect_lines(&boundary, &neighbour).unwrap();
    assert_eq!(overlap.len(), 1);
    assert!(close(engine.length(&overlap.features()[0].geometry), 10.0, 1e-3));

    let erased = engine.erase_lines(&boundary, &neighbour).unwrap();
    assert!(close(engine.length(&erased.features()[0].geometry), 30.0, 1e-3));
}

#[test]
fn spatial_join_takes_first_match_and_keeps_all() {
    let engine = PlanarEngine::default();
    let targets = parcels(&[(0.0, 0.0, 10.0), (100.0, 100.0, 10.0)]);

    let mut scores = Layer::from_geometries("scores", [square(5.0, 5.0, 10.0), square(-5.0, -5.0, 10.0)]);
    let score = scores.add_field("score", FieldType::Integer).unwrap();
    scores.set_field(pcat_layer::FeatureId(0), &score, 5i64).unwrap();
    scores.set_field(pcat_layer::FeatureId(1), &score, 1i64).unwrap();

    let joined = engine.spatial_join(&targets, &scores, JoinMatch::Intersect).unwrap();
    assert_eq!(joined.len(), 2);
    let score = joined.field("score").unwrap();
    let count = joined.field(JOIN_COUNT).unwrap();
    assert_eq!(joined.features()[0].value(&score), &FieldValue::Integer(5));
    assert_eq!(joined.features()[0].value(&count), &FieldValue::Integer(2));
    assert!(joined.features()[1].value(&score).is_null());
    assert_eq!(joined.features()[1].value(&count), &FieldValue::Integer(0));
}

#[test]
fn convex_hull_and_clip() {
    let engine = PlanarEngine::default();
    let context = Layer::from_geometries("context", [square(0.0, 0.0, 10.0), square(20.0, 0.0, 10.0)]);
    let hull = engine.convex_hull(&context).unwrap();
    assert_eq!(hull.len(), 1);
    assert!(close(engine.area(&hull.features()[0].geometry), 300.0, 1e-9));

    let wide = Layer::from_geometries("wide", [square(-10.0, -10.0, 100.0)]);
    let clipped = engine.clip(&wide, &hull).unwrap();
    assert!(close(engine.area(&clipped.features()[0].geometry), 300.0, 1e-6));

    let empty: PolygonLayer = Layer::from_geometries("none", Vec::<MultiPolygon<f64>>::new());
    assert!(engine.convex_hull(&empty).is_err());
}

#[test]
fn explode_splits_parts() {
    let engine = PlanarEngine::default();
    let mut two = square(0.0, 0.0, 1.0);
    two.0.extend(square(5.0, 5.0, 1.0).0);
    let layer = Layer::from_geometries("corridors", [two]);
    let exploded = engine.explode(layer).unwrap();
    assert_eq!(exploded.len(), 2);
}
