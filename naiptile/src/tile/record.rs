//! Tile records pairing a raster asset with its geographic footprint.

use geo::{Area, BoundingRect};
use geo_types::{Polygon, Rect};

/// An immutable pair of asset identifier and geographic footprint.
///
/// The identifier is an opaque reference to the underlying raster asset,
/// typically a blob storage path such as
/// `v002/al/2011/al_100cm_2011/30085/m_3008503_ne_16_1_20110815.tif`.
/// The footprint is a closed polygon in geographic (longitude, latitude)
/// coordinates describing the tile's coverage area.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    identifier: String,
    footprint: Polygon<f64>,
}

impl TileRecord {
    /// Create a tile record from an identifier and a footprint polygon.
    pub fn new(identifier: impl Into<String>, footprint: Polygon<f64>) -> Self {
        Self {
            identifier: identifier.into(),
            footprint,
        }
    }

    /// Returns the asset identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the footprint polygon.
    pub fn footprint(&self) -> &Polygon<f64> {
        &self.footprint
    }

    /// Returns the smallest axis-aligned rectangle enclosing the footprint.
    ///
    /// Returns `None` for an empty footprint. Every point inside the
    /// footprint is inside this rectangle, which is what makes it usable
    /// as a candidate filter in front of exact containment tests.
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.footprint.bounding_rect()
    }

    /// Whether the footprint has no interior.
    ///
    /// Covers both the empty polygon and polygons collapsed to a point or
    /// a line. Such records cannot answer containment queries and are
    /// rejected at index construction.
    pub(crate) fn is_degenerate(&self) -> bool {
        self.footprint.unsigned_area() == 0.0
    }
}
