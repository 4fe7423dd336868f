//! Narrow-corridor detection.
//!
//! Negative space is everything inside the (expanded) study area that is not
//! protected. Opening it with a disc of radius `w` (erode by `w`, dilate by
//! `w`) restores every region at least `2w` wide; what the opening fails to
//! restore is a corridor.
//!
//! ```text
//! context ─> hull ─> hull + margin ─> − context ─> negative space ─┐
//!                                                                  │
//!            negative − dilate(erode(negative, w), w) <────────────┘
//!                          │
//!                     clip to hull ─> explode ─> drop slivers ─> corridors
//! ```

use std::path::Path;
use std::time::Instant;

use pcat_engine::{BufferSide, GeometryEngine, JoinMatch, PolygonLayer, Scratch, JOIN_COUNT};
use pcat_layer::{assign_sequence, FeatureId, FieldType, Statistic, MATCH_ID};

use crate::config::ConnectivityConfig;
use crate::error::Result;

const CORRIDOR_ID: &str = "corridor_id";
const SCORE: &str = "score";

/// Connectivity result for a parcel layer
#[derive(Debug, Clone)]
pub struct ConnectivityOutcome {
    /// Copy of the parcels with the connectivity field populated
    pub parcels: PolygonLayer,
    /// Number of corridor features found in the study area
    pub corridors: usize,
}

/// Single-part corridors of unprotected land narrower than twice the
/// configured half-width, restricted to the convex hull of `context`.
pub fn find_narrow_corridors<E: GeometryEngine + ?Sized>(
    engine: &E,
    context: &PolygonLayer,
    config: &ConnectivityConfig,
) -> Result<PolygonLayer> {
    let mut scratch = Scratch::new("corridors", None);
    narrow_corridors(engine, context, config, &mut scratch)
}

fn narrow_corridors<E: GeometryEngine + ?Sized>(
    engine: &E,
    context: &PolygonLayer,
    config: &ConnectivityConfig,
    scratch: &mut Scratch,
) -> Result<PolygonLayer> {
    let width = config.corridor_half_width;

    log::info!(" ... computing convex hull of context");
    let hull = engine.convex_hull(context)?;
    scratch.keep("hull", &hull)?;

    log::info!(" ... expanding study area by {}", config.study_area_margin);
    let study_area = engine.buffer(&hull, config.study_area_margin, BufferSide::Full)?;
    scratch.keep("study_area", &study_area)?;

    log::info!(" ... erasing context from study area");
    let negative = engine.erase(&study_area, context)?;
    scratch.keep("negative_space", &negative)?;
    if negative.is_empty() {
        log::info!(" ... study area is fully protected; no corridors");
        return Ok(negative.renamed("corridors"));
    }

    // Erosion collapsing parts of the negative space is expected; the engine
    // drops them.
    log::info!(" ... eroding negative space by {width}");
    let eroded = engine.buffer(&negative, -width, BufferSide::Full)?;
    scratch.keep("eroded", &eroded)?;

    let narrow = if eroded.is_empty() {
        log::info!(" ... all negative space is narrower than {}", 2.0 * width);
        negative
    } else {
        log::info!(" ... regrowing eroded space by {width}");
        let regrown = engine.buffer(&eroded, width + config.regrow_tolerance, BufferSide::Full)?;
        scratch.keep("regrown", &regrown)?;
        engine.erase(&negative, &regrown)?
    };
    scratch.keep("narrow", &narrow)?;

    log::info!(" ... clipping narrow areas to the study hull");
    let clipped = engine.clip(&narrow, &hull)?;
    let parts = engine.explode(clipped)?;
    let before = parts.len();
    let corridors = parts
        .filter(|f| engine.area(&f.geometry) >= config.min_corridor_area)
        .renamed("corridors");
    if corridors.len() < before {
        log::debug!(
            "dropped {} corridor slivers under {}",
            before - corridors.len(),
            config.min_corridor_area
        );
    }
    scratch.keep("corridors", &corridors)?;

    Ok(corridors)
}

/// Score every parcel by its contact with narrow corridors.
///
/// Parcels intersecting a corridor get `connected_score`; parcels reaching
/// only the halo within one half-width of a corridor get `near_score`;
/// everything else gets 0.
pub fn connectivity_scores<E: GeometryEngine + ?Sized>(
    engine: &E,
    parcels: &PolygonLayer,
    context: &PolygonLayer,
    config: &ConnectivityConfig,
    workspace: Option<&Path>,
) -> Result<ConnectivityOutcome> {
    let started = Instant::now();
    let mut scratch = Scratch::new("connectivity", workspace);

    let corridors = narrow_corridors(engine, context, config, &mut scratch)?;
    let corridor_count = corridors.len();
    log::info!(" ... found {corridor_count} narrow corridors");

    let mut out = parcels.clone();
    let field = out.ensure_field(&config.field, FieldType::Double)?;

    if !corridors.is_empty() {
        let mut scored = corridors;
        let score = scored.add_field(SCORE, FieldType::Double)?;
        for idx in 0..scored.len() {
            scored.set_field(FeatureId(idx), &score, config.connected_score)?;
        }

        log::info!(" ... buffering corridors by {}", config.corridor_half_width);
        let mut halo = engine.buffer(&scored, config.corridor_half_width, BufferSide::OutsideOnly)?;
        for idx in 0..halo.len() {
            halo.set_field(FeatureId(idx), &score, config.near_score)?;
        }
        scratch.keep("halo", &halo)?;

        // Corridors precede halos so the spatial join prefers the higher score.
        log::info!(" ... merging corridors and halos");
        let mut merged = scored.merge(halo, "connectivity")?;
        assign_sequence(&mut merged, CORRIDOR_ID)?;
        scratch.keep("merged", &merged)?;

        log::info!(" ... dissolving connectivity score");
        let first = Statistic::first(SCORE);
        let first_score = first.output_name();
        let measure = engine.dissolve(merged, CORRIDOR_ID, std::slice::from_ref(&first))?;
        scratch.keep("measure", &measure)?;

        log::info!(" ... joining connectivity to parcels");
        let joined = engine.spatial_join(&parcels.select(&[MATCH_ID])?, &measure, JoinMatch::Intersect)?;
        let joined = joined.select(&[MATCH_ID, JOIN_COUNT, first_score.as_str()])?;
        scratch.keep("parcel_join", &joined)?;

        out.copy_field_from(&joined, MATCH_ID, &first_score, &config.field)?;
    }

    // Parcels away from every corridor score zero.
    for idx in 0..out.len() {
        let id = FeatureId(idx);
        if out.value(id, &field)?.is_null() {
            out.set_field(id, &field, 0.0)?;
        }
    }

    log::info!(
        "elapsed time for connectivity calculation: {:.2}s",
        started.elapsed().as_secs_f64()
    );

    Ok(ConnectivityOutcome {
        parcels: out,
        corridors: corridor_count,
    })
}
