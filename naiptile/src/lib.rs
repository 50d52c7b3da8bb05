//! NAIPTile - Spatial lookup and archival naming for aerial imagery tiles
//!
//! This library provides the in-memory machinery for working with archives of
//! NAIP (National Agriculture Imagery Program) raster tiles: a spatial index
//! that maps a longitude/latitude coordinate to the tiles covering that
//! location, a formal grammar for the blob storage paths the imagery is
//! published under, and a loader for persisted tile sets.
//!
//! # High-Level API
//!
//! ```ignore
//! use naiptile::tile::TileIndex;
//!
//! // Load a persisted tile set and build the index once at startup
//! let index = TileIndex::from_geojson_path("naip_tiles.geojson")?;
//!
//! // Which tiles cover downtown Mobile, AL?
//! let tiles = index.lookup(-88.04, 30.69)?;
//!
//! // Restrict to the 2011 and 2013 survey years
//! let tiles = index.lookup_in_years(-88.04, 30.69, &[2011, 2013])?;
//! ```
//!
//! The index is immutable after construction and safe to share between
//! threads for concurrent read-only queries.

pub mod logging;
pub mod tile;

/// Version of the NAIPTile library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
