use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pcat_engine::EngineConfig;
use pcat_layer::{LayerError, MATCH_ID};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

const SQUARE_METERS_PER_ACRE: f64 = 4_046.856_422_4;
const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Unit raw areas are reported in. Input coordinates are assumed to be metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    SquareMeters,
    #[default]
    Acres,
    Hectares,
}

impl AreaUnit {
    pub fn convert(self, area: f64) -> f64 {
        match self {
            Self::SquareMeters => area,
            Self::Acres => area / SQUARE_METERS_PER_ACRE,
            Self::Hectares => area / SQUARE_METERS_PER_HECTARE,
        }
    }
}

/// Output fields written by the perimeter calculator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerimeterFields {
    /// Boundary length after exclusions
    pub length: String,
    /// Share of that boundary lying on protected land
    pub percent: String,
}

impl Default for PerimeterFields {
    fn default() -> Self {
        Self {
            length: "perimeter_length".to_string(),
            percent: "perimeter_pct".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerimeterConfig {
    /// Composite-score weight of the perimeter percentage
    pub weight: f64,
    pub fields: PerimeterFields,
}

impl Default for PerimeterConfig {
    fn default() -> Self {
        Self {
            weight: 0.20,
            fields: PerimeterFields::default(),
        }
    }
}

/// Output fields written for one buffer ring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingFields {
    /// Ring area after exclusions
    pub area: String,
    /// Protected area inside the ring
    pub protected_area: String,
    pub percent: String,
}

impl RingFields {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            area: format!("{prefix}_area"),
            protected_area: format!("{prefix}_protected_area"),
            percent: format!("{prefix}_pct"),
        }
    }
}

/// One buffer ring around every parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingConfig {
    pub name: String,
    /// Outward buffer distance in layer units
    pub distance: f64,
    /// Composite-score weight of this ring's percentage
    pub weight: f64,
    pub fields: RingFields,
}

impl RingConfig {
    pub fn new(name: &str, distance: f64, weight: f64, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            distance,
            weight,
            fields: RingFields::with_prefix(prefix),
        }
    }

    /// Quarter, half, one and two mile rings
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("quarter_mile", 402.33, 0.35, "qmi"),
            Self::new("half_mile", 804.672, 0.25, "hmi"),
            Self::new("one_mile", 1609.34, 0.15, "mi1"),
            Self::new("two_mile", 3218.69, 0.05, "mi2"),
        ]
    }
}

/// Narrow-corridor detection and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Erosion/dilation distance; gaps narrower than twice this are corridors
    pub corridor_half_width: f64,

    /// Margin added around the context hull before finding negative space
    pub study_area_margin: f64,

    /// Score of a parcel touching a corridor
    pub connected_score: f64,

    /// Score of a parcel within one half-width of a corridor
    pub near_score: f64,

    /// Composite-score weight, added on top of the percentage weights
    pub weight: f64,

    pub field: String,

    /// Corridor parts smaller than this area are discarded as slivers
    pub min_corridor_area: f64,

    /// Extra dilation distance absorbing arc approximation error
    pub regrow_tolerance: f64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            corridor_half_width: 25.0,
            study_area_margin: 402.33,
            connected_score: 5.0,
            near_score: 1.0,
            weight: 0.3,
            field: "connectivity_score".to_string(),
            min_corridor_area: 1.0,
            regrow_tolerance: 0.1,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcatConfig {
    /// Parcel area field written during setup
    pub site_area_field: String,

    /// Composite score field
    pub score_field: String,

    pub area_unit: AreaUnit,

    /// Directory for intermediate layers; kept in memory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,

    pub perimeter: PerimeterConfig,

    pub connectivity: ConnectivityConfig,

    pub engine: EngineConfig,

    /// Buffer rings, evaluated in order
    pub rings: Vec<RingConfig>,
}

impl Default for PcatConfig {
    fn default() -> Self {
        Self {
            site_area_field: "site_area".to_string(),
            score_field: "pcat_score".to_string(),
            area_unit: AreaUnit::default(),
            workspace: None,
            perimeter: PerimeterConfig::default(),
            connectivity: ConnectivityConfig::default(),
            engine: EngineConfig::default(),
            rings: RingConfig::defaults(),
        }
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_config(format!("{name} must be > 0 (got {value})")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_config(format!("{name} must be >= 0 (got {value})")))
    }
}

impl PcatConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AnalysisError::invalid_config(e.to_string()))
    }

    /// Every field the pipeline adds to the parcel layer, in creation order
    pub fn output_fields(&self) -> Vec<&str> {
        let mut names = vec![
            self.site_area_field.as_str(),
            self.perimeter.fields.length.as_str(),
            self.perimeter.fields.percent.as_str(),
        ];
        for ring in &self.rings {
            names.push(&ring.fields.area);
            names.push(&ring.fields.protected_area);
            names.push(&ring.fields.percent);
        }
        names.push(&self.connectivity.field);
        names.push(&self.score_field);
        names
    }

    pub fn validate(&self) -> Result<()> {
        if self.rings.is_empty() {
            return Err(AnalysisError::invalid_config("at least one buffer ring is required"));
        }
        for ring in &self.rings {
            if ring.name.trim().is_empty() {
                return Err(AnalysisError::invalid_config("ring names must not be empty"));
            }
            positive(&format!("rings['{}'].distance", ring.name), ring.distance)?;
            non_negative(&format!("rings['{}'].weight", ring.name), ring.weight)?;
        }
        non_negative("perimeter.weight", self.perimeter.weight)?;

        let c = &self.connectivity;
        positive("connectivity.corridor_half_width", c.corridor_half_width)?;
        positive("connectivity.study_area_margin", c.study_area_margin)?;
        non_negative("connectivity.connected_score", c.connected_score)?;
        non_negative("connectivity.near_score", c.near_score)?;
        non_negative("connectivity.weight", c.weight)?;
        non_negative("connectivity.min_corridor_area", c.min_corridor_area)?;
        non_negative("connectivity.regrow_tolerance", c.regrow_tolerance)?;

        self.engine
            .validate()
            .map_err(AnalysisError::InvalidConfiguration)?;

        let mut seen = HashSet::new();
        seen.insert(MATCH_ID);
        for name in self.output_fields() {
            if name.trim().is_empty() {
                return Err(AnalysisError::invalid_config("output field names must not be empty"));
            }
            if !seen.insert(name) {
                return Err(LayerError::duplicate_field("config", name).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        let config = PcatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rings.len(), 4);
        let weights: f64 = config.perimeter.weight + config.rings.iter().map(|r| r.weight).sum::<f64>();
        assert!((weights - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rings_rejected() {
        let config = PcatConfig {
            rings: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_non_positive_distances_rejected() {
        let mut config = PcatConfig::default();
        config.rings[1].distance = 0.0;
        assert!(config.validate().is_err());

        let mut config = PcatConfig::default();
        config.connectivity.corridor_half_width = -5.0;
        assert!(config.validate().is_err());

        let mut config = PcatConfig::default();
        config.connectivity.study_area_margin = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = PcatConfig::default();
        config.connectivity.weight = -0.3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_output_field_rejected() {
        let mut config = PcatConfig::default();
        config.rings[1].fields.percent = config.rings[0].fields.percent.clone();
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::Layer(LayerError::DuplicateField { .. }))
        ));

        let mut config = PcatConfig::default();
        config.score_field = MATCH_ID.to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let config = PcatConfig::from_toml_str(
            r#"
            area_unit = "hectares"

            [connectivity]
            corridor_half_width = 40.0

            [[rings]]
            name = "near"
            distance = 100.0
            weight = 0.8
            fields = { area = "near_area", protected_area = "near_prot", percent = "near_pct" }
            "#,
        )
        .unwrap();
        assert_eq!(config.area_unit, AreaUnit::Hectares);
        assert_eq!(config.connectivity.corridor_half_width, 40.0);
        assert_eq!(config.connectivity.near_score, 1.0);
        assert_eq!(config.rings.len(), 1);
        assert_eq!(config.rings[0].fields.percent, "near_pct");
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = PcatConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(PcatConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_area_units() {
        assert_eq!(AreaUnit::SquareMeters.convert(5.0), 5.0);
        assert!((AreaUnit::Acres.convert(SQUARE_METERS_PER_ACRE) - 1.0).abs() < 1e-12);
        assert_eq!(AreaUnit::Hectares.convert(25_000.0), 2.5);
    }
}
