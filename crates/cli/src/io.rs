use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::MultiPolygon;
use pcat_engine::PolygonLayer;
use pcat_layer::{FieldDef, Layer, Record};
use serde::{Deserialize, Serialize};

/// On-disk form of a polygon layer
#[derive(Debug, Serialize, Deserialize)]
pub struct LayerDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    pub features: Vec<Record<MultiPolygon<f64>>>,
}

impl LayerDocument {
    pub fn from_layer(layer: &PolygonLayer) -> Self {
        let fields = layer.schema().fields().to_vec();
        let features = layer
            .features()
            .iter()
            .map(|feature| Record {
                geometry: feature.geometry.clone(),
                attributes: fields
                    .iter()
                    .map(|def| def.name.clone())
                    .zip(feature.values().iter().cloned())
                    .collect(),
            })
            .collect();
        Self {
            name: layer.name().to_string(),
            fields,
            features,
        }
    }

    pub fn into_layer(self) -> Result<PolygonLayer> {
        let name = self.name.clone();
        Layer::from_records(self.name, self.fields, self.features)
            .with_context(|| format!("Invalid attributes in layer '{name}'"))
    }
}

pub fn read_layer(path: &Path) -> Result<PolygonLayer> {
    let file = File::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document: LayerDocument = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse layer {}", path.display()))?;
    let layer = document.into_layer()?;
    log::debug!("loaded '{}' ({} features) from {}", layer.name(), layer.len(), path.display());
    Ok(layer)
}

pub fn write_layer(path: &Path, layer: &PolygonLayer) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to write {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &LayerDocument::from_layer(layer))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use pcat_layer::{FieldType, FieldValue};

    #[test]
    fn document_preserves_attributes_and_geometry() {
        let json = r#"{
            "name": "parcels",
            "fields": [{ "name": "owner", "type": "text" }, { "name": "value", "type": "double" }],
            "features": [{
                "geometry": [{
                    "exterior": [{"x": 0, "y": 0}, {"x": 10, "y": 0}, {"x": 10, "y": 10}, {"x": 0, "y": 0}],
                    "interiors": []
                }],
                "attributes": { "owner": "state", "value": 3 }
            }]
        }"#;
        let document: LayerDocument = serde_json::from_str(json).unwrap();
        let layer = document.into_layer().unwrap();

        let value = layer.field("value").unwrap();
        assert_eq!(value.ty(), FieldType::Double);
        assert_eq!(layer.features()[0].value(&value), &FieldValue::Double(3.0));

        let expected = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
        ]]);
        assert_eq!(layer.features()[0].geometry, expected);

        let written = serde_json::to_string(&LayerDocument::from_layer(&layer)).unwrap();
        let reread: LayerDocument = serde_json::from_str(&written).unwrap();
        assert_eq!(reread.into_layer().unwrap(), layer);
    }

    #[test]
    fn unknown_attribute_is_reported() {
        let json = r#"{
            "name": "parcels",
            "features": [{ "geometry": [], "attributes": { "owner": "state" } }]
        }"#;
        let document: LayerDocument = serde_json::from_str(json).unwrap();
        let err = document.into_layer().unwrap_err();
        assert!(format!("{err:#}").contains("owner"));
    }
}
