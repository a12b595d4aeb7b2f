//! trailslope-export: Pure format serializers (sans-IO)
//!
//! Converts analyzer output into GeoJSON feature collections and an SVG
//! preview, and reads trail geometry from GeoJSON text.

pub mod geojson;
pub mod input;
pub mod svg;

pub use crate::geojson::{collection_to_string, labels_to_geojson, lines_to_geojson};
pub use crate::input::{TrailInput, parse_trails};
pub use crate::svg::{SvgMetadata, slope_color, to_svg};

/// Errors from reading or writing GeoJSON.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JSON could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Feature properties did not serialize to a JSON object.
    #[error("feature properties must serialize to a JSON object")]
    PropertiesNotObject,

    /// The input is valid JSON but not GeoJSON this reader understands.
    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(String),
}
