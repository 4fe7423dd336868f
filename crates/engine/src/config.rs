use serde::{Deserialize, Serialize};

/// Numeric settings of the planar engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scale factor applied before integer clipping (1000 = millimetres for metre data)
    pub precision: f64,

    /// Maximum distance between a round join's true arc and its chords
    pub arc_tolerance: f64,

    /// Lines within this distance of a polygon boundary count as lying on it
    /// when lines are clipped by polygons. Zero disables snapping.
    pub snap_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: 1000.0,
            arc_tolerance: 0.05,
            snap_tolerance: 0.001,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(format!("engine.precision must be > 0 (got {})", self.precision));
        }
        if !(self.arc_tolerance.is_finite() && self.arc_tolerance > 0.0) {
            return Err(format!(
                "engine.arc_tolerance must be > 0 (got {})",
                self.arc_tolerance
            ));
        }
        if !(self.snap_tolerance.is_finite() && self.snap_tolerance >= 0.0) {
            return Err(format!(
                "engine.snap_tolerance must be >= 0 (got {})",
                self.snap_tolerance
            ));
        }
        Ok(())
    }
}
