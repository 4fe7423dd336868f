//! # PCAT Layer
//!
//! In-memory feature layers with typed attribute tables: the common currency
//! passed between every stage of the parcel analysis pipeline.
//!
//! ## Model
//!
//! ```text
//! Layer<G>
//!   ├─ name
//!   ├─ Schema ── FieldDef { name, type } ...
//!   └─ Feature<G>[]
//!        ├─ geometry: G
//!        └─ values[]  (one per schema field, positional)
//! ```
//!
//! Field names are resolved once into [`FieldIndex`] handles; reads and writes
//! then go through the handle. Derived layers are related back to the parcels
//! they came from through the integer [`MATCH_ID`] key.
//!
//! ## Example
//!
//! ```rust
//! use pcat_layer::{assign_match_ids, FieldType, JoinKind, Layer, MATCH_ID};
//!
//! let mut parcels = Layer::from_geometries("parcels", ["a", "b"]);
//! assign_match_ids(&mut parcels).unwrap();
//!
//! let mut metrics = parcels.clone().renamed("metrics");
//! let pct = metrics.add_field("pct", FieldType::Double).unwrap();
//! let first = metrics.iter().next().map(|(id, _)| id).unwrap();
//! metrics.set_field(first, &pct, 50.0).unwrap();
//! let metrics = metrics.filter(|f| f.geometry == "a");
//!
//! let joined = parcels.join(&metrics, MATCH_ID, JoinKind::Left).unwrap();
//! assert_eq!(joined.len(), 2);
//! assert_eq!(joined.schema().len(), 2);
//! ```

mod dissolve;
mod error;
mod join;
mod layer;
mod schema;

pub use dissolve::{Statistic, StatisticKind};
pub use error::{LayerError, Result};
pub use join::JoinKind;
pub use layer::{assign_match_ids, assign_sequence, Feature, FeatureId, Layer, Record, MATCH_ID};
pub use schema::{FieldDef, FieldIndex, FieldType, FieldValue, Schema};
