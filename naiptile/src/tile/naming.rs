//! NAIP blob path parsing and archival filename derivation.
//!
//! Parses blob storage paths like
//! `v002/al/2011/al_100cm_2011/30085/m_3008503_ne_16_1_20110815.tif`
//! into their named fields:
//! - Archive version: v002
//! - Two-letter state code: al
//! - Four-digit survey year: 2011
//! - Resolution folder: al_100cm_2011 (resolution "100cm")
//! - USGS quadrangle identifier: 30085 (a 7.5 x 7.5 minute area)
//! - Filename: m_{quadrangle}{quadid}_{quarterquad}_{utmzone}_{res}_{capture}.tif
//!
//! A revised image carries a second date in the filename; the first is the
//! capture date, the second the release date of the correction, e.g.
//! `v002/nc/2018/nc_060cm_2018/36077/m_3607744_se_18_060_20180903_20190210.tif`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// UTM zones are numbered 1 through 60.
const MAX_UTM_ZONE: u8 = 60;

/// Parsed NAIP blob storage path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPath {
    /// Archive version (e.g. "v002")
    pub version: String,
    /// Two-letter state code (e.g. "al")
    pub state: String,
    /// Four-digit survey year
    pub year: u16,
    /// Image resolution from the folder name (e.g. "100cm", "060cm")
    pub resolution: String,
    /// USGS quadrangle identifier (e.g. "30085")
    pub quadrangle: String,
    /// Quadrangle sub-division from the filename (e.g. "03")
    pub quad_id: String,
    /// Quarter-quad position (e.g. "ne", "sw")
    pub quarter_quad: String,
    /// UTM zone (1-60)
    pub utm_zone: u8,
    /// Resolution token as it appears in the filename (e.g. "1", "060")
    pub resolution_code: String,
    /// Capture date, eight digits YYYYMMDD
    pub capture_date: String,
    /// Release date of a corrected version, when present
    pub revision_date: Option<String>,
}

/// Error parsing a NAIP blob path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Path doesn't match the expected structure at all
    #[error("path does not match the NAIP naming structure: {0}")]
    InvalidPattern(String),
    /// Directory year and resolution folder year disagree
    #[error("survey year mismatch: directory says {directory}, resolution folder says {folder}")]
    YearMismatch { directory: String, folder: String },
    /// Directory state and resolution folder state disagree
    #[error("state mismatch: directory says {directory}, resolution folder says {folder}")]
    StateMismatch { directory: String, folder: String },
    /// Quadrangle directory and filename quadrangle disagree
    #[error("quadrangle mismatch: directory says {directory}, filename says {filename}")]
    QuadrangleMismatch { directory: String, filename: String },
    /// Survey year is not a valid number
    #[error("invalid survey year: {0}")]
    InvalidYear(String),
    /// UTM zone outside 1-60
    #[error("invalid UTM zone: {0}")]
    InvalidZone(String),
}

/// Get the blob path regex.
///
/// Structure: `{version}/{state}/{year}/{state}_{res}_{year}/{quadrangle}/{filename}`
/// with `{filename}` being
/// `m_{quadrangle}{quadid}_{quarterquad}_{utmzone}_{res}_{capture}[_{revision}].tif`.
///
/// The state, year, and quadrangle each appear twice in a path; the
/// duplicates are captured separately and cross-checked after the match so
/// an inconsistent path is reported as a mismatch of the specific field
/// rather than a generic pattern failure.
fn blob_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Capture groups:
        //  1 version        (v + 3 digits)
        //  2 state          (2 lowercase letters)
        //  3 year           (4 digits)
        //  4 folder state   (2 lowercase letters)
        //  5 resolution     (e.g. "100cm")
        //  6 folder year    (4 digits)
        //  7 quadrangle     (5 digits)
        //  8 file quadrangle(5 digits)
        //  9 quad id        (2 digits)
        // 10 quarter quad   (2 lowercase letters)
        // 11 utm zone       (1-2 digits)
        // 12 resolution code(filename token, e.g. "1" or "060")
        // 13 capture date   (8 digits)
        // 14 revision date  (8 digits, optional)
        Regex::new(
            r"^(v\d{3})/([a-z]{2})/(\d{4})/([a-z]{2})_([0-9a-z]+)_(\d{4})/(\d{5})/m_(\d{5})(\d{2})_([a-z]{2})_(\d{1,2})_([0-9a-z]+)_(\d{8})(?:_(\d{8}))?\.tif$",
        )
        .expect("blob path pattern is valid")
    })
}

/// Parse a NAIP blob storage path into its named fields.
///
/// # Arguments
///
/// * `path` - Blob path relative to the archive root, e.g.
///   `v002/al/2011/al_100cm_2011/30085/m_3008503_ne_16_1_20110815.tif`
///
/// # Examples
///
/// ```
/// use naiptile::tile::parse_blob_path;
///
/// let parsed =
///     parse_blob_path("v002/al/2011/al_100cm_2011/30085/m_3008503_ne_16_1_20110815.tif")
///         .unwrap();
/// assert_eq!(parsed.state, "al");
/// assert_eq!(parsed.year, 2011);
/// assert_eq!(parsed.quadrangle, "30085");
/// ```
pub fn parse_blob_path(path: &str) -> Result<BlobPath, ParseError> {
    let captures = blob_path_pattern()
        .captures(path)
        .ok_or_else(|| ParseError::InvalidPattern(path.to_string()))?;

    let group = |i: usize| captures.get(i).map(|m| m.as_str()).unwrap_or_default();

    let state = group(2);
    let folder_state = group(4);
    if state != folder_state {
        return Err(ParseError::StateMismatch {
            directory: state.to_string(),
            folder: folder_state.to_string(),
        });
    }

    let year_str = group(3);
    let folder_year = group(6);
    if year_str != folder_year {
        return Err(ParseError::YearMismatch {
            directory: year_str.to_string(),
            folder: folder_year.to_string(),
        });
    }

    let quadrangle = group(7);
    let file_quadrangle = group(8);
    if quadrangle != file_quadrangle {
        return Err(ParseError::QuadrangleMismatch {
            directory: quadrangle.to_string(),
            filename: file_quadrangle.to_string(),
        });
    }

    let year = year_str
        .parse::<u16>()
        .map_err(|_| ParseError::InvalidYear(year_str.to_string()))?;

    let zone_str = group(11);
    let utm_zone = zone_str
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidZone(zone_str.to_string()))?;
    if utm_zone == 0 || utm_zone > MAX_UTM_ZONE {
        return Err(ParseError::InvalidZone(zone_str.to_string()));
    }

    Ok(BlobPath {
        version: group(1).to_string(),
        state: state.to_string(),
        year,
        resolution: group(5).to_string(),
        quadrangle: quadrangle.to_string(),
        quad_id: group(9).to_string(),
        quarter_quad: group(10).to_string(),
        utm_zone,
        resolution_code: group(12).to_string(),
        capture_date: group(13).to_string(),
        revision_date: captures.get(14).map(|m| m.as_str().to_string()),
    })
}

impl BlobPath {
    /// Derive the flat, unique archive filename for this tile.
    ///
    /// Different survey years of the same quadrangle share everything but
    /// the year, so the year must be part of the name for the flat archive
    /// namespace to stay collision-free.
    ///
    /// # Examples
    ///
    /// ```
    /// use naiptile::tile::parse_blob_path;
    ///
    /// let parsed =
    ///     parse_blob_path("v002/al/2011/al_100cm_2011/30085/m_3008503_ne_16_1_20110815.tif")
    ///         .unwrap();
    /// assert_eq!(parsed.archive_name(), "NAIP_2011_100cm_al_30085_ne_03.tif");
    /// ```
    pub fn archive_name(&self) -> String {
        format!(
            "NAIP_{}_{}_{}_{}_{}_{}.tif",
            self.year, self.resolution, self.state, self.quadrangle, self.quarter_quad, self.quad_id
        )
    }
}

impl fmt::Display for BlobPath {
    /// Reconstructs the original blob path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}_{}_{}/{}/m_{}{}_{}_{}_{}_{}",
            self.version,
            self.state,
            self.year,
            self.state,
            self.resolution,
            self.year,
            self.quadrangle,
            self.quadrangle,
            self.quad_id,
            self.quarter_quad,
            self.utm_zone,
            self.resolution_code,
            self.capture_date,
        )?;
        if let Some(revision) = &self.revision_date {
            write!(f, "_{}", revision)?;
        }
        write!(f, ".tif")
    }
}

impl FromStr for BlobPath {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_blob_path(s)
    }
}
