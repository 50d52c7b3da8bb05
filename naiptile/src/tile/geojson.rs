//! GeoJSON tile set loading.
//!
//! A persisted tile set is a GeoJSON FeatureCollection in which every
//! feature pairs a Polygon footprint with a `"location"` property holding
//! the blob path of the raster asset:
//!
//! ```json
//! {
//!   "type": "FeatureCollection",
//!   "features": [
//!     {
//!       "type": "Feature",
//!       "properties": { "location": "v002/al/2011/.../m_3008503_ne_16_1_20110815.tif" },
//!       "geometry": { "type": "Polygon", "coordinates": [[[-88.0, 30.0], ...]] }
//!     }
//!   ]
//! }
//! ```
//!
//! Loading is synchronous and happens once, before the index is built;
//! failures are fatal to construction and carry the offending feature's
//! position in the collection.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use geo_types::Polygon;
use geojson::{GeoJson, Value};

use super::index::ConstructionError;
use super::record::TileRecord;

/// Property holding the asset's blob path.
const LOCATION_PROPERTY: &str = "location";

/// Error loading a tile set.
#[derive(Debug, thiserror::Error)]
pub enum TileSetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("Tile set must be a GeoJSON FeatureCollection")]
    NotACollection,
    #[error("Feature {feature} has no geometry")]
    MissingGeometry { feature: usize },
    #[error("Feature {feature} has unsupported geometry type {kind}, expected Polygon")]
    UnsupportedGeometry { feature: usize, kind: String },
    #[error("Feature {feature} has no string \"location\" property")]
    MissingLocation { feature: usize },
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

/// Read tile records from a GeoJSON tile set.
///
/// Every feature must carry a Polygon geometry and a string `"location"`
/// property; anything else fails the whole load rather than silently
/// shrinking the tile set.
pub fn read_tile_set<R: Read>(mut reader: R) -> Result<Vec<TileRecord>, TileSetError> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;

    let collection = match raw.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => return Err(TileSetError::NotACollection),
    };

    let mut records = Vec::with_capacity(collection.features.len());
    for (position, feature) in collection.features.into_iter().enumerate() {
        let location = feature
            .property(LOCATION_PROPERTY)
            .and_then(|value| value.as_str())
            .ok_or(TileSetError::MissingLocation { feature: position })?
            .to_string();

        let geometry = feature
            .geometry
            .as_ref()
            .ok_or(TileSetError::MissingGeometry { feature: position })?;

        let footprint = match &geometry.value {
            Value::Polygon(_) => Polygon::<f64>::try_from(geometry.value.clone())?,
            other => {
                return Err(TileSetError::UnsupportedGeometry {
                    feature: position,
                    kind: other.type_name().to_string(),
                })
            }
        };

        records.push(TileRecord::new(location, footprint));
    }

    tracing::debug!(tiles = records.len(), "Read tile set");

    Ok(records)
}

/// Read tile records from a GeoJSON tile set file.
pub fn read_tile_set_path<P: AsRef<Path>>(path: P) -> Result<Vec<TileRecord>, TileSetError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let records = read_tile_set(BufReader::new(file))?;

    tracing::info!(tiles = records.len(), path = %path.display(), "Loaded tile set");

    Ok(records)
}
