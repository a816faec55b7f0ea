use geo::Rect;
use log::debug;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use types::{
    validate_level, validate_threshold, CoverageError, CoverageResult, LevelClassification,
    Result,
};
use util::{candidate_geohashes, decode_bbox};

use crate::target::{CoverageTarget, RATIO_EPSILON};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileClass {
    /// Covered at or above the threshold.
    Covering,
    /// Shares some area with the geometry, below the threshold.
    Partial,
    Outside,
}

impl TileClass {
    /// Classification at the finest level of a run.
    pub fn from_ratio(ratio: f64, threshold: f64) -> Self {
        Self::with_floor(ratio, threshold, RATIO_EPSILON)
    }

    /// Ratios at or below `floor` count as no overlap.
    pub fn with_floor(ratio: f64, threshold: f64, floor: f64) -> Self {
        if ratio <= floor {
            TileClass::Outside
        } else if ratio + RATIO_EPSILON >= threshold {
            TileClass::Covering
        } else {
            TileClass::Partial
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileRatio {
    pub hash: String,
    pub bbox: Rect,
    pub ratio: f64,
}

/// Decodes each geohash and measures how much of it the target covers.
/// Order of `hashes` is preserved.
pub fn measure_tiles<T>(target: &T, hashes: Vec<String>) -> Result<Vec<TileRatio>>
where
    T: CoverageTarget + ?Sized,
{
    hashes
        .into_par_iter()
        .map(|hash| {
            let bbox = decode_bbox(&hash)?;
            let ratio = target.coverage_ratio(&bbox);
            Ok(TileRatio { hash, bbox, ratio })
        })
        .collect()
}

pub(crate) fn check_target<T>(target: &T) -> Result<()>
where
    T: CoverageTarget + ?Sized,
{
    if target.is_valid() {
        Ok(())
    } else {
        Err(CoverageError::InvalidGeometry(
            "coordinates must be finite longitudes/latitudes in degrees".to_string(),
        ))
    }
}

/// Seed tiles at `level` for the target, empty for zero-area geometries.
pub(crate) fn seed_candidates<T>(target: &T, level: usize) -> Result<Vec<String>>
where
    T: CoverageTarget + ?Sized,
{
    match target.bounding_box() {
        Some(bbox) if target.area() > 0.0 => candidate_geohashes(&bbox, level),
        _ => Ok(Vec::new()),
    }
}

/// Splits the tiles of one level into covering and partial ones.
///
/// Tiles that only touch the geometry along an edge or at a corner have a
/// zero ratio and appear in neither set.
pub fn classify_level<T>(target: &T, level: usize, threshold: f64) -> Result<LevelClassification>
where
    T: CoverageTarget + ?Sized,
{
    validate_level(level)?;
    validate_threshold(threshold)?;
    check_target(target)?;

    let mut classification = LevelClassification {
        level,
        ..Default::default()
    };
    let candidates = seed_candidates(target, level)?;
    let candidate_count = candidates.len();

    for tile in measure_tiles(target, candidates)? {
        match TileClass::from_ratio(tile.ratio, threshold) {
            TileClass::Covering => {
                classification.covering.insert(tile.hash);
            }
            TileClass::Partial => {
                classification.partial.insert(tile.hash);
            }
            TileClass::Outside => {}
        }
    }

    debug!(
        "level {}: {} candidates, {} covering, {} partial",
        level,
        candidate_count,
        classification.covering.len(),
        classification.partial.len()
    );
    Ok(classification)
}

/// Geohashes at a single `level` covering at least `threshold` of their area.
/// No refinement happens; partial tiles are dropped.
pub fn coverage_for_target<T>(target: &T, level: usize, threshold: f64) -> Result<CoverageResult>
where
    T: CoverageTarget + ?Sized,
{
    classify_level(target, level, threshold).map(CoverageResult::from)
}
