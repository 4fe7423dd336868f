use std::path::Path;

use pcat_engine::{GeometryEngine, PolygonLayer, Scratch};
use pcat_layer::{FieldType, JoinKind, Statistic, MATCH_ID};

use crate::config::PerimeterFields;
use crate::error::Result;
use crate::metrics::{coverage_by_parcel, measure_into, require_coverage};

const BOUNDARY_LENGTH: &str = "boundary_length";
const OVERLAP_LENGTH: &str = "overlap_length";

/// Share of every parcel's boundary that runs along protected land.
///
/// Each parcel's rings are traced on their own, so a shared edge between two
/// parcels counts once for each. Excluded land is cut from the boundary before
/// anything is measured. Context is unioned first, which keeps the protected
/// length from exceeding the boundary length where context polygons overlap.
///
/// Returns a copy of `parcels` with `fields.length` (post-exclusion boundary
/// length) and `fields.percent` populated.
pub fn perimeter_conservation<E: GeometryEngine + ?Sized>(
    engine: &E,
    parcels: &PolygonLayer,
    context: &PolygonLayer,
    exclusion: &PolygonLayer,
    fields: &PerimeterFields,
    workspace: Option<&Path>,
) -> Result<PolygonLayer> {
    let mut scratch = Scratch::new("perimeter", workspace);
    let keyed = parcels.select(&[MATCH_ID])?;

    log::info!(" ... converting polygon to line");
    let boundary = engine.polygon_to_line(&keyed)?;
    scratch.keep("boundary", &boundary)?;

    log::info!(" ... erasing exclusion from boundary");
    let mut boundary = engine.erase_lines(&boundary, exclusion)?;
    measure_into(&mut boundary, BOUNDARY_LENGTH, |g| engine.length(g))?;
    scratch.keep("boundary_erase", &boundary)?;

    log::info!(" ... intersecting boundary with context");
    let protected = engine.dissolve_all(context)?;
    let overlap = engine.intersect_lines(&boundary.select(&[MATCH_ID])?, &protected)?;
    let mut overlap = overlap.select(&[MATCH_ID])?;
    measure_into(&mut overlap, OVERLAP_LENGTH, |g| engine.length(g))?;
    scratch.keep("boundary_context", &overlap)?;

    log::info!(" ... dissolving overlap by {MATCH_ID}");
    let sum = Statistic::sum(OVERLAP_LENGTH);
    let overlap = engine.dissolve_lines(overlap, MATCH_ID, std::slice::from_ref(&sum))?;
    scratch.keep("boundary_context_dissolve", &overlap)?;

    log::info!(" ... joining perimeter overlap to parcels");
    let joined = boundary.join(&overlap, MATCH_ID, JoinKind::Left)?;
    let coverage = coverage_by_parcel(&joined, BOUNDARY_LENGTH, &sum.output_name())?;

    let mut out = parcels.clone();
    let rows = require_coverage(&out, &coverage, "boundary length")?;
    let length = out.ensure_field(&fields.length, FieldType::Double)?;
    let percent = out.ensure_field(&fields.percent, FieldType::Double)?;
    for (id, c) in rows {
        out.set_field(id, &length, c.total)?;
        out.set_field(id, &percent, c.percent())?;
    }

    Ok(out)
}
