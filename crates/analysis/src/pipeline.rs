use std::time::{Duration, Instant};

use pcat_engine::{GeometryEngine, PolygonLayer};
use pcat_layer::{assign_match_ids, FeatureId, FieldType};

use crate::buffer_area::buffer_area_conservation;
use crate::config::PcatConfig;
use crate::connectivity::connectivity_scores;
use crate::error::{AnalysisError, PipelineError, Stage};
use crate::perimeter::perimeter_conservation;
use crate::score::composite_score;

/// Wall-clock time spent in one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Parcels in the output layer
    pub parcels: usize,
    /// Narrow corridors found in the study area
    pub corridors: usize,
    pub timings: Vec<StageTiming>,
}

/// The scored parcel layer and a summary of the run that produced it
#[derive(Debug, Clone)]
pub struct AnnotatedLayer {
    pub layer: PolygonLayer,
    pub summary: RunSummary,
}

type StageResult<T> = std::result::Result<T, PipelineError>;

struct Timer<'a> {
    timings: &'a mut Vec<StageTiming>,
}

impl Timer<'_> {
    /// Run one stage, recording its duration and attributing any failure to it
    fn stage<T>(
        &mut self,
        stage: Stage,
        f: impl FnOnce() -> crate::error::Result<T>,
    ) -> StageResult<T> {
        log::info!("running {stage} stage");
        let started = Instant::now();
        let result = f();
        let elapsed = started.elapsed();
        log::debug!("{stage} finished in {:.2}s", elapsed.as_secs_f64());
        self.timings.push(StageTiming {
            stage: stage.clone(),
            elapsed,
        });
        result.map_err(|err| PipelineError::new(stage, err))
    }
}

/// Annotate every analysis parcel with its conservation metrics and
/// composite score.
///
/// Stages run in order: setup, site area, perimeter, each ring in
/// configuration order, connectivity, score. The first failing stage aborts
/// the run; no partially scored layer is returned.
pub fn run<E: GeometryEngine + ?Sized>(
    engine: &E,
    context: &PolygonLayer,
    analysis: &PolygonLayer,
    exclusion: &PolygonLayer,
    config: &PcatConfig,
) -> StageResult<AnnotatedLayer> {
    let mut summary = RunSummary::default();
    let mut timer = Timer {
        timings: &mut summary.timings,
    };
    let workspace = config.workspace.as_deref();

    let parcels = timer.stage(Stage::Setup, || {
        config.validate()?;
        if context.is_empty() {
            return Err(AnalysisError::EmptyLayer(context.name().to_string()));
        }
        if analysis.is_empty() {
            return Err(AnalysisError::EmptyLayer(analysis.name().to_string()));
        }

        let mut parcels = analysis.clone().renamed(format!("{}_pcat", analysis.name()));
        assign_match_ids(&mut parcels)?;
        for name in config.output_fields() {
            parcels.add_field(name, FieldType::Double)?;
        }
        log::info!(
            "scoring {} parcels against {} context and {} exclusion features",
            parcels.len(),
            context.len(),
            exclusion.len()
        );
        Ok(parcels)
    })?;

    let parcels = timer.stage(Stage::SiteArea, || {
        let mut parcels = parcels;
        let field = parcels.field(&config.site_area_field)?;
        let areas: Vec<f64> = parcels.geometries().map(|g| engine.area(g)).collect();
        for (idx, area) in areas.into_iter().enumerate() {
            parcels.set_field(FeatureId(idx), &field, config.area_unit.convert(area))?;
        }
        Ok(parcels)
    })?;

    let mut parcels = timer.stage(Stage::Perimeter, || {
        perimeter_conservation(
            engine,
            &parcels,
            context,
            exclusion,
            &config.perimeter.fields,
            workspace,
        )
    })?;

    for ring in &config.rings {
        parcels = timer.stage(Stage::BufferRing(ring.name.clone()), || {
            buffer_area_conservation(
                engine,
                &parcels,
                context,
                exclusion,
                ring,
                config.area_unit,
                workspace,
            )
        })?;
    }

    let outcome = timer.stage(Stage::Connectivity, || {
        connectivity_scores(engine, &parcels, context, &config.connectivity, workspace)
    })?;

    let layer = timer.stage(Stage::Score, || composite_score(&outcome.parcels, config))?;

    summary.parcels = layer.len();
    summary.corridors = outcome.corridors;
    log::info!("scored {} parcels", summary.parcels);

    Ok(AnnotatedLayer { layer, summary })
}
