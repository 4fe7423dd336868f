//! # PCAT Engine
//!
//! The geometry capability the parcel analysis is written against.
//!
//! ## Architecture
//!
//! ```text
//! GeometryEngine (trait)
//!     │
//!     └──> PlanarEngine
//!            ├─ geo-clipper: union / difference / intersection / offset
//!            ├─ geo:         line clipping, convex hull, area, length
//!            └─ rstar:       bounding-box candidate search
//!
//! Scratch ── scoped store for a calculator's intermediate layers
//! ```
//!
//! Every operation takes layers and returns a new layer; inputs are never
//! modified. Features whose geometry becomes empty are dropped with a warning.

mod config;
mod error;
mod index;
mod lines;
mod measure;
mod planar;
mod scratch;

use geo::{MultiLineString, MultiPolygon};
use pcat_layer::{Layer, Statistic};

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use measure::Measure;
pub use planar::PlanarEngine;
pub use scratch::Scratch;

/// Layer of (multi-)polygon features
pub type PolygonLayer = Layer<MultiPolygon<f64>>;

/// Layer of (multi-)line features
pub type LineLayer = Layer<MultiLineString<f64>>;

/// Field added by [`GeometryEngine::spatial_join`] holding the match count
pub const JOIN_COUNT: &str = "join_count";

/// Which part of a buffer to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSide {
    /// The whole buffered polygon; negative distances shrink it
    Full,
    /// Only the ring outside the original polygon
    OutsideOnly,
}

/// Match predicate for [`GeometryEngine::spatial_join`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinMatch {
    Intersect,
    WithinDistance(f64),
}

/// Planar geometry operations over feature layers.
///
/// Attribute handling follows the usual overlay conventions: single-input
/// operations carry each feature's values through unchanged, pairwise
/// operations concatenate both inputs' values (see [`pcat_layer::Schema::overlay`]).
pub trait GeometryEngine {
    /// Buffer every feature by `distance`
    fn buffer(&self, layer: &PolygonLayer, distance: f64, side: BufferSide) -> Result<PolygonLayer>;

    /// Remove the union of `eraser` from every feature
    fn erase(&self, layer: &PolygonLayer, eraser: &PolygonLayer) -> Result<PolygonLayer>;

    /// Remove the parts of every line feature that fall inside `eraser`
    fn erase_lines(&self, layer: &LineLayer, eraser: &PolygonLayer) -> Result<LineLayer>;

    /// Pairwise polygon intersection, one output feature per overlapping pair
    fn intersect(&self, layer: &PolygonLayer, overlay: &PolygonLayer) -> Result<PolygonLayer>;

    /// Pairwise line-in-polygon intersection with line output
    fn intersect_lines(&self, layer: &LineLayer, overlay: &PolygonLayer) -> Result<LineLayer>;

    /// Cut every feature to the union of `clipper`
    fn clip(&self, layer: &PolygonLayer, clipper: &PolygonLayer) -> Result<PolygonLayer>;

    /// Merge features sharing `key` into multi-part features
    fn dissolve(&self, layer: PolygonLayer, key: &str, stats: &[Statistic]) -> Result<PolygonLayer>;

    fn dissolve_lines(&self, layer: LineLayer, key: &str, stats: &[Statistic]) -> Result<LineLayer>;

    /// Union every feature into one attribute-less feature (none if empty)
    fn dissolve_all(&self, layer: &PolygonLayer) -> Result<PolygonLayer>;

    /// Boundary rings of each polygon feature, without merging shared edges
    /// between neighbouring features
    fn polygon_to_line(&self, layer: &PolygonLayer) -> Result<LineLayer>;

    /// Single-feature convex hull of the whole layer
    fn convex_hull(&self, layer: &PolygonLayer) -> Result<PolygonLayer>;

    /// One-to-one spatial join keeping every target feature. The first
    /// matching `join` feature, in layer order, supplies the joined values.
    fn spatial_join(&self, target: &PolygonLayer, join: &PolygonLayer, matching: JoinMatch)
        -> Result<PolygonLayer>;

    /// Split multi-part features into single-part features
    fn explode(&self, layer: PolygonLayer) -> Result<PolygonLayer>;

    fn area(&self, geometry: &MultiPolygon<f64>) -> f64;

    fn length(&self, geometry: &MultiLineString<f64>) -> f64;
}
