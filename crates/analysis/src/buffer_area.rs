use std::path::Path;

use pcat_engine::{BufferSide, GeometryEngine, PolygonLayer, Scratch};
use pcat_layer::{FieldType, JoinKind, Statistic, MATCH_ID};

use crate::config::{AreaUnit, RingConfig};
use crate::error::Result;
use crate::metrics::{coverage_by_parcel, measure_into, require_coverage};

const RING_AREA: &str = "ring_area";
const PROTECTED_AREA: &str = "protected_area";

/// Share of the ring around every parcel that is already protected.
///
/// The ring is the outside-only buffer of the parcel at `ring.distance`, with
/// exclusions removed. Context polygons are intersected one by one and summed
/// per parcel, so overlapping context is counted twice and the percentage can
/// exceed 100.
///
/// Returns a copy of `parcels` with the ring's three fields populated. Areas
/// are converted to `unit`; the percentage is a plain ratio.
pub fn buffer_area_conservation<E: GeometryEngine + ?Sized>(
    engine: &E,
    parcels: &PolygonLayer,
    context: &PolygonLayer,
    exclusion: &PolygonLayer,
    ring: &RingConfig,
    unit: AreaUnit,
    workspace: Option<&Path>,
) -> Result<PolygonLayer> {
    let mut scratch = Scratch::new(format!("ring_{}", ring.name), workspace);
    let keyed = parcels.select(&[MATCH_ID])?;

    log::info!(" ... buffering parcels by {} ({})", ring.distance, ring.name);
    let buffered = engine.buffer(&keyed, ring.distance, BufferSide::OutsideOnly)?;
    scratch.keep("buffer", &buffered)?;

    log::info!(" ... erasing exclusion from buffer");
    let mut buffered = engine.erase(&buffered, exclusion)?;
    measure_into(&mut buffered, RING_AREA, |g| engine.area(g))?;
    scratch.keep("buffer_erase", &buffered)?;

    log::info!(" ... intersecting buffer with context");
    let overlap = engine.intersect(&buffered.select(&[MATCH_ID])?, context)?;
    let mut overlap = overlap.select(&[MATCH_ID])?;
    measure_into(&mut overlap, PROTECTED_AREA, |g| engine.area(g))?;
    scratch.keep("buffer_context", &overlap)?;

    log::info!(" ... dissolving protected area by {MATCH_ID}");
    let sum = Statistic::sum(PROTECTED_AREA);
    let overlap = engine.dissolve(overlap, MATCH_ID, std::slice::from_ref(&sum))?;
    scratch.keep("buffer_context_dissolve", &overlap)?;

    log::info!(" ... joining protected area to parcels");
    let joined = buffered.join(&overlap, MATCH_ID, JoinKind::Left)?;
    let coverage = coverage_by_parcel(&joined, RING_AREA, &sum.output_name())?;

    let mut out = parcels.clone();
    let rows = require_coverage(&out, &coverage, "buffer area")?;
    let area = out.ensure_field(&ring.fields.area, FieldType::Double)?;
    let protected = out.ensure_field(&ring.fields.protected_area, FieldType::Double)?;
    let percent = out.ensure_field(&ring.fields.percent, FieldType::Double)?;
    for (id, c) in rows {
        out.set_field(id, &area, unit.convert(c.total))?;
        out.set_field(id, &protected, unit.convert(c.protected))?;
        out.set_field(id, &percent, c.percent())?;
    }

    Ok(out)
}
