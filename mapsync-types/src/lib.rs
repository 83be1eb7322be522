//! Plain data types describing what a map should show: sources, layers, filter expressions,
//! terrain and camera.
//!
//! The types follow the declarative style model of web map engines. They can be decoded from and
//! encoded into the JSON form used by map styles, but unlike raw JSON each descriptor is checked
//! when it is created, so a [`SourceDescriptor`] or [`LayerDescriptor`] always carries the fields
//! its type requires.

pub mod camera;
pub mod error;
pub mod filter;
pub mod layer;
mod lnglat;
pub mod source;
mod terrain;

pub use camera::Camera;
pub use error::DescriptorError;
pub use filter::{FeatureProperties, FilterExpression, FilterValue};
pub use layer::{LayerDescriptor, LayerKind, PropertyMap, Visibility};
pub use lnglat::LngLat;
pub use source::{GeoJsonData, SourceDescriptor, SourceKind, TileEndpoint};
pub use terrain::Terrain;
