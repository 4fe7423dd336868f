//! # PCAT Analysis
//!
//! Conservation scoring of candidate parcels against protected ("context")
//! land, net of excluded land.
//!
//! ## Pipeline
//!
//! ```text
//! analysis ──> setup (match_id, output fields)
//!                │
//!                ├─> site area
//!                ├─> perimeter        boundary ∩ context, as a share of boundary length
//!                ├─> buffer ring × N  ring ∩ context, as a share of ring area
//!                ├─> connectivity     narrow corridors between context polygons
//!                └─> score            weighted sum ──> AnnotatedLayer
//! ```
//!
//! Every calculator takes the running parcel layer by reference and returns a
//! new layer with its fields filled in. Intermediate layers live in a
//! [`pcat_engine::Scratch`] scoped to the calculator call.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pcat_analysis::{run, PcatConfig};
//! use pcat_engine::{PlanarEngine, PolygonLayer};
//!
//! # fn load(_: &str) -> PolygonLayer { unimplemented!() }
//! let config = PcatConfig::default();
//! let engine = PlanarEngine::new(config.engine.clone())?;
//! let scored = run(&engine, &load("context"), &load("parcels"), &load("exclusion"), &config)?;
//! println!("{} parcels, {} corridors", scored.summary.parcels, scored.summary.corridors);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod buffer_area;
mod config;
mod connectivity;
mod error;
mod metrics;
mod perimeter;
mod pipeline;
mod score;

pub use buffer_area::buffer_area_conservation;
pub use config::{
    AreaUnit, ConnectivityConfig, PcatConfig, PerimeterConfig, PerimeterFields, RingConfig, RingFields,
};
pub use connectivity::{connectivity_scores, find_narrow_corridors, ConnectivityOutcome};
pub use error::{AnalysisError, PipelineError, Result, Stage};
pub use metrics::percentage;
pub use perimeter::perimeter_conservation;
pub use pipeline::{run, AnnotatedLayer, RunSummary, StageTiming};
pub use score::composite_score;
