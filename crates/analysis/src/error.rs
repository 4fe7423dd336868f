use std::fmt;

use pcat_engine::EngineError;
use pcat_layer::LayerError;
use thiserror::Error;

/// Result type for analysis stages
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while computing parcel metrics
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A zero-length or zero-area denominator, or a feature that vanished
    /// where a result was required
    #[error("Degenerate geometry for match_id {match_id}: {detail}")]
    DegenerateGeometry { match_id: i64, detail: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Layer '{0}' has no features")]
    EmptyLayer(String),

    /// A metric the score depends on was never populated
    #[error("Field '{field}' is null for match_id {match_id}")]
    MissingValue { field: String, match_id: i64 },

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AnalysisError {
    pub fn degenerate(match_id: i64, detail: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            match_id,
            detail: detail.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// Pipeline stage, used to attribute failures and timings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Setup,
    SiteArea,
    Perimeter,
    BufferRing(String),
    Connectivity,
    Score,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => f.write_str("setup"),
            Self::SiteArea => f.write_str("site area"),
            Self::Perimeter => f.write_str("perimeter"),
            Self::BufferRing(name) => write!(f, "buffer ring '{name}'"),
            Self::Connectivity => f.write_str("connectivity"),
            Self::Score => f.write_str("score"),
        }
    }
}

/// Failure of a whole run: the stage that failed and why
#[derive(Error, Debug)]
#[error("{stage} stage failed")]
pub struct PipelineError {
    pub stage: Stage,
    pub source: AnalysisError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: impl Into<AnalysisError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}
