//! Tile footprints, spatial lookup, and archival naming.
//!
//! This module is organized around three collaborating pieces:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      GeoJSON tile set                   │
//! │        (footprint polygons + "location" blob paths)     │
//! └─────────────────────────────────────────────────────────┘
//!                              │ read_tile_set
//!                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Vec<TileRecord>                     │
//! └─────────────────────────────────────────────────────────┘
//!                              │ TileIndex::build
//!                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                        TileIndex                        │
//! │     R-tree over bounding boxes + exact containment      │
//! │            lookup(lon, lat) -> identifiers              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are NAIP blob storage paths; [`parse_blob_path`] gives them
//! a formal grammar ([`BlobPath`]) and derives the flat archive filenames
//! used when tiles are re-uploaded for long-term storage.

mod geojson;
mod index;
mod naming;
mod record;

pub use geojson::{read_tile_set, read_tile_set_path, TileSetError};
pub use index::{ConstructionError, IndexInconsistency, TileIndex};
pub use naming::{parse_blob_path, BlobPath, ParseError};
pub use record::TileRecord;
