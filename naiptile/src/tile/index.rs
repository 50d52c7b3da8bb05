//! Spatial index for tile lookups by location.
//!
//! The index answers "which tiles cover this longitude/latitude" in two
//! passes: an R-tree over footprint bounding boxes produces a candidate
//! superset, then an exact point-in-polygon test against each candidate's
//! true footprint decides membership. The bounding-box pass only bounds
//! the number of exact geometric tests per query; correctness rests on
//! the exact pass, since real tile footprints are almost never axis-aligned
//! rectangles.

use std::io::Read;
use std::path::Path;
use std::slice;

use geo::Contains;
use geo_types::Point;
use rstar::{RTree, RTreeObject, AABB};

use super::geojson::{read_tile_set, read_tile_set_path, TileSetError};
use super::naming::parse_blob_path;
use super::record::TileRecord;

/// Error building a tile index.
///
/// Construction failures are fatal and not retried: the tile set is
/// presumed static and externally sourced, so the caller must fix or
/// refresh the source before trying again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    /// The input tile set was empty
    #[error("cannot build a tile index from an empty tile set")]
    EmptyTileSet,
    /// A record's footprint has no interior
    #[error("tile '{identifier}' has a degenerate footprint")]
    DegenerateFootprint { identifier: String },
}

/// A query found bounding-box candidates but no footprint contains the point.
///
/// This is distinct from the empty result: bounding boxes overlapping a
/// point that no exact footprint contains indicates a stale or corrupted
/// tile set, not a legitimate geographic gap. The query itself is pure and
/// in-memory, so retrying changes nothing; the remedy is rebuilding the
/// index from a fresher source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "tile index inconsistency at ({lon}, {lat}): {candidates} bounding-box candidate(s) but no footprint contains the point"
)]
pub struct IndexInconsistency {
    /// Queried longitude
    pub lon: f64,
    /// Queried latitude
    pub lat: f64,
    /// Number of bounding-box candidates that failed the exact test
    pub candidates: usize,
}

/// A record's bounding box, stored in the R-tree with the record's position
/// in the backing sequence.
#[derive(Debug, Clone, Copy)]
struct IndexedBounds {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index mapping a longitude/latitude coordinate to the tiles
/// covering that location.
///
/// Built once from a fixed tile set and read-only thereafter. Because no
/// method takes `&mut self` and `rstar::RTree` permits concurrent reads,
/// a `TileIndex` can be shared across threads (e.g. behind an `Arc`)
/// without locking.
#[derive(Debug)]
pub struct TileIndex {
    tree: RTree<IndexedBounds>,
    records: Vec<TileRecord>,
}

impl TileIndex {
    /// Build a tile index from a sequence of records.
    ///
    /// Computes each record's bounding box and bulk-loads them into the
    /// R-tree; the full records are kept for the exact containment tests
    /// at query time.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] if `records` is empty or any record
    /// has a degenerate (empty) footprint.
    pub fn build(records: Vec<TileRecord>) -> Result<Self, ConstructionError> {
        if records.is_empty() {
            return Err(ConstructionError::EmptyTileSet);
        }

        let mut bounds = Vec::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let bbox = match record.bounding_box() {
                Some(bbox) if !record.is_degenerate() => bbox,
                _ => {
                    return Err(ConstructionError::DegenerateFootprint {
                        identifier: record.identifier().to_string(),
                    })
                }
            };
            bounds.push(IndexedBounds {
                position,
                envelope: AABB::from_corners(
                    [bbox.min().x, bbox.min().y],
                    [bbox.max().x, bbox.max().y],
                ),
            });
        }

        let tree = RTree::bulk_load(bounds);
        tracing::debug!(tiles = records.len(), "Built tile index");

        Ok(Self { tree, records })
    }

    /// Build a tile index from a GeoJSON tile set file.
    pub fn from_geojson_path<P: AsRef<Path>>(path: P) -> Result<Self, TileSetError> {
        let records = read_tile_set_path(path)?;
        Ok(Self::build(records)?)
    }

    /// Build a tile index from a GeoJSON tile set reader.
    pub fn from_geojson_reader<R: Read>(reader: R) -> Result<Self, TileSetError> {
        let records = read_tile_set(reader)?;
        Ok(Self::build(records)?)
    }

    /// Return the identifiers of all tiles containing the given point.
    ///
    /// The result is a set: duplicate-free and sorted lexicographically,
    /// so repeated queries order matches deterministically. An empty
    /// result means no tile covers the location, a normal outcome for
    /// points outside the archive's coverage (e.g. over open ocean).
    /// Multiple tiles legitimately containing the point, such as the same
    /// quadrangle flown in different survey years, are all returned.
    ///
    /// # Errors
    ///
    /// Returns [`IndexInconsistency`] when bounding boxes overlap the point
    /// but no footprint contains it, which distinguishes a data-quality
    /// problem in the tile set from a genuine coverage gap.
    pub fn lookup(&self, lon: f64, lat: f64) -> Result<Vec<String>, IndexInconsistency> {
        let point = Point::new(lon, lat);
        let query = AABB::from_point([lon, lat]);

        let mut candidates = 0usize;
        let mut matches: Vec<String> = Vec::new();
        for hit in self.tree.locate_in_envelope_intersecting(&query) {
            candidates += 1;
            let record = &self.records[hit.position];
            if record.footprint().contains(&point) {
                matches.push(record.identifier().to_string());
            }
        }

        if matches.is_empty() {
            if candidates > 0 {
                tracing::warn!(
                    lon,
                    lat,
                    candidates,
                    "Bounding boxes overlap the point but no footprint contains it"
                );
                return Err(IndexInconsistency {
                    lon,
                    lat,
                    candidates,
                });
            }
            tracing::debug!(lon, lat, "No tile covers the point");
            return Ok(Vec::new());
        }

        matches.sort_unstable();
        matches.dedup();
        Ok(matches)
    }

    /// Like [`lookup`](Self::lookup), restricted to the given survey years.
    ///
    /// NAIP re-flies each state on a multi-year cadence, so a point is
    /// usually covered by one tile per survey year. Identifiers are
    /// matched to years through their blob path; identifiers that don't
    /// parse as NAIP blob paths carry no year and are dropped with a
    /// logged warning.
    pub fn lookup_in_years(
        &self,
        lon: f64,
        lat: f64,
        years: &[u16],
    ) -> Result<Vec<String>, IndexInconsistency> {
        let matches = self.lookup(lon, lat)?;
        Ok(matches
            .into_iter()
            .filter(|identifier| match parse_blob_path(identifier) {
                Ok(path) => years.contains(&path.year),
                Err(error) => {
                    tracing::warn!(
                        identifier = %identifier,
                        error = %error,
                        "Skipping identifier without a parseable survey year"
                    );
                    false
                }
            })
            .collect())
    }

    /// Returns the number of tiles in the index.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the index holds no tiles.
    ///
    /// Always false for an index built through [`build`](Self::build),
    /// which rejects empty tile sets.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns an iterator over all tile records.
    pub fn iter(&self) -> slice::Iter<'_, TileRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Coord, LineString, Polygon, Rect};

    fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
        Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        )
        .to_polygon()
    }

    fn triangle() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (0.0, 0.0)]),
            vec![],
        )
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn test_build_empty_tile_set_fails() {
        let result = TileIndex::build(vec![]);
        assert_eq!(result.unwrap_err(), ConstructionError::EmptyTileSet);
    }

    #[test]
    fn test_build_degenerate_footprint_fails() {
        let records = vec![
            TileRecord::new("good", square(0.0, 0.0, 1.0, 1.0)),
            TileRecord::new("empty", Polygon::new(LineString::new(vec![]), vec![])),
        ];
        let result = TileIndex::build(records);
        assert_eq!(
            result.unwrap_err(),
            ConstructionError::DegenerateFootprint {
                identifier: "empty".to_string()
            }
        );
    }

    #[test]
    fn test_build_counts_records() {
        let index = TileIndex::build(vec![
            TileRecord::new("a", square(0.0, 0.0, 1.0, 1.0)),
            TileRecord::new("b", square(1.0, 0.0, 2.0, 1.0)),
        ])
        .unwrap();

        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
        assert_eq!(index.iter().count(), 2);
    }

    // =========================================================================
    // Lookup: adjacent, disjoint, and uncovered points
    // =========================================================================

    #[test]
    fn test_lookup_adjacent_squares() {
        let index = TileIndex::build(vec![
            TileRecord::new("A", square(0.0, 0.0, 1.0, 1.0)),
            TileRecord::new("B", square(1.0, 0.0, 2.0, 1.0)),
        ])
        .unwrap();

        assert_eq!(index.lookup(0.5, 0.5).unwrap(), vec!["A"]);
        assert_eq!(index.lookup(1.5, 0.5).unwrap(), vec!["B"]);
        assert_eq!(index.lookup(5.0, 5.0).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_lookup_point_inside_every_footprint_is_found() {
        // Soundness: interior points of each record must surface that record
        let index = TileIndex::build(vec![
            TileRecord::new("west", square(-10.0, -10.0, 0.0, 0.0)),
            TileRecord::new("east", square(0.0, 0.0, 10.0, 10.0)),
        ])
        .unwrap();

        assert_eq!(index.lookup(-5.0, -5.0).unwrap(), vec!["west"]);
        assert_eq!(index.lookup(5.0, 5.0).unwrap(), vec!["east"]);
    }

    #[test]
    fn test_lookup_overlapping_tiles_returns_all() {
        let index = TileIndex::build(vec![
            TileRecord::new("C", square(0.0, 0.0, 1.0, 1.0)),
            TileRecord::new("D", square(0.25, 0.25, 1.25, 1.25)),
        ])
        .unwrap();

        assert_eq!(index.lookup(0.5, 0.5).unwrap(), vec!["C", "D"]);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let index = TileIndex::build(vec![
            TileRecord::new("C", square(0.0, 0.0, 1.0, 1.0)),
            TileRecord::new("D", square(0.25, 0.25, 1.25, 1.25)),
        ])
        .unwrap();

        let first = index.lookup(0.5, 0.5).unwrap();
        let second = index.lookup(0.5, 0.5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lookup_results_are_sorted() {
        let index = TileIndex::build(vec![
            TileRecord::new("zulu", square(0.0, 0.0, 1.0, 1.0)),
            TileRecord::new("alpha", square(0.0, 0.0, 1.0, 1.0)),
            TileRecord::new("mike", square(0.0, 0.0, 1.0, 1.0)),
        ])
        .unwrap();

        assert_eq!(index.lookup(0.5, 0.5).unwrap(), vec!["alpha", "mike", "zulu"]);
    }

    // =========================================================================
    // Inconsistency detection
    // =========================================================================

    #[test]
    fn test_lookup_inconsistency_when_only_bounding_box_matches() {
        // The triangle's bounding box spans [0,2]x[0,2] but the hypotenuse
        // cuts off the far corner, so (1.8, 1.8) hits the box and misses
        // the footprint
        let index = TileIndex::build(vec![TileRecord::new("tri", triangle())]).unwrap();

        let result = index.lookup(1.8, 1.8);
        assert_eq!(
            result.unwrap_err(),
            IndexInconsistency {
                lon: 1.8,
                lat: 1.8,
                candidates: 1,
            }
        );
    }

    #[test]
    fn test_lookup_outside_bounding_box_is_empty_not_inconsistent() {
        let index = TileIndex::build(vec![TileRecord::new("tri", triangle())]).unwrap();
        assert_eq!(index.lookup(3.0, 3.0).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_lookup_inconsistency_not_raised_when_another_tile_contains() {
        // A second footprint that does contain the point keeps the query
        // from being treated as inconsistent
        let index = TileIndex::build(vec![
            TileRecord::new("tri", triangle()),
            TileRecord::new("sq", square(1.0, 1.0, 2.0, 2.0)),
        ])
        .unwrap();

        assert_eq!(index.lookup(1.8, 1.8).unwrap(), vec!["sq"]);
    }

    // =========================================================================
    // Year filtering
    // =========================================================================

    const AL_2011: &str = "v002/al/2011/al_100cm_2011/30085/m_3008503_ne_16_1_20110815.tif";
    const AL_2013: &str = "v002/al/2013/al_100cm_2013/30085/m_3008503_ne_16_1_20130720.tif";
    const AL_2015: &str = "v002/al/2015/al_100cm_2015/30085/m_3008503_ne_16_1_20150610.tif";

    #[test]
    fn test_lookup_in_years_filters_matches() {
        let footprint = square(-88.0, 30.0, -87.9, 30.1);
        let index = TileIndex::build(vec![
            TileRecord::new(AL_2011, footprint.clone()),
            TileRecord::new(AL_2013, footprint.clone()),
            TileRecord::new(AL_2015, footprint),
        ])
        .unwrap();

        let matches = index.lookup_in_years(-87.95, 30.05, &[2011, 2015]).unwrap();
        assert_eq!(matches, vec![AL_2011, AL_2015]);
    }

    #[test]
    fn test_lookup_in_years_drops_unparseable_identifiers() {
        let footprint = square(-88.0, 30.0, -87.9, 30.1);
        let index = TileIndex::build(vec![
            TileRecord::new(AL_2013, footprint.clone()),
            TileRecord::new("sentinel2/mosaic_2013.tif", footprint),
        ])
        .unwrap();

        let matches = index.lookup_in_years(-87.95, 30.05, &[2013]).unwrap();
        assert_eq!(matches, vec![AL_2013]);
    }

    #[test]
    fn test_lookup_in_years_no_matching_year_is_empty() {
        let index = TileIndex::build(vec![TileRecord::new(
            AL_2011,
            square(-88.0, 30.0, -87.9, 30.1),
        )])
        .unwrap();

        let matches = index.lookup_in_years(-87.95, 30.05, &[2019]).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_lookup_in_years_propagates_inconsistency() {
        let index = TileIndex::build(vec![TileRecord::new("tri", triangle())]).unwrap();
        assert!(index.lookup_in_years(1.8, 1.8, &[2011]).is_err());
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    #[test]
    fn test_concurrent_lookups_agree_with_single_threaded_answer() {
        use std::sync::Arc;
        use std::thread;

        let records: Vec<TileRecord> = (0..50)
            .map(|i| {
                let x = f64::from(i);
                TileRecord::new(format!("tile_{i:02}"), square(x, 0.0, x + 1.0, 1.0))
            })
            .collect();
        let index = Arc::new(TileIndex::build(records).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for i in 0..50 {
                        let expected = format!("tile_{i:02}");
                        let matches = index.lookup(f64::from(i) + 0.5, 0.5).unwrap();
                        assert_eq!(matches, vec![expected]);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("reader thread panicked");
        }
    }
}
