mod clip;
mod fill_polygon;
mod single_level;
mod target;
mod tile_geometry;

use geo::Geometry;
use types::{
    validate_level, validate_level_range, validate_threshold, CoverageOptions, CoverageResult,
    CoverageTile, LevelClassification, Result,
};

pub use clip::{tile_overlap, TileOverlap};
pub use fill_polygon::{adaptive_coverage_for_target, refine_level, FrontierTile, LevelOutcome};
pub use single_level::{
    classify_level, coverage_for_target, measure_tiles, TileClass, TileRatio,
};
pub use target::{overlap_floor, CoverageTarget, TargetGeometry, TilePiece, RATIO_EPSILON};
pub use tile_geometry::{boxes_to_shape, geohashes_to_boxes, geohashes_to_shape, union_all};

/// Geohashes at `level` whose tiles are covered at least `options.threshold`
/// by `geometry`.
pub fn geohash_coverage(
    geometry: impl Into<Geometry>,
    level: usize,
    options: &CoverageOptions,
) -> Result<CoverageResult> {
    validate_level(level)?;
    validate_threshold(options.threshold)?;
    let target = TargetGeometry::new(geometry, options.use_index)?;
    coverage_for_target(&target, level, options.threshold)
}

/// Like [`geohash_coverage`], but also reports the tiles that overlap the
/// geometry without reaching the threshold.
pub fn geohash_coverage_debug(
    geometry: impl Into<Geometry>,
    level: usize,
    options: &CoverageOptions,
) -> Result<LevelClassification> {
    validate_level(level)?;
    validate_threshold(options.threshold)?;
    let target = TargetGeometry::new(geometry, options.use_index)?;
    classify_level(&target, level, options.threshold)
}

/// Multi-level coverage: coarse tiles that cover enough are kept, tiles on
/// the boundary are refined until `max_level`.
pub fn adaptive_geohash_coverage(
    geometry: impl Into<Geometry>,
    min_level: usize,
    max_level: usize,
    options: &CoverageOptions,
) -> Result<(CoverageResult, Vec<CoverageTile>)> {
    validate_level_range(min_level, max_level)?;
    validate_threshold(options.threshold)?;
    let target = TargetGeometry::new(geometry, options.use_index)?;
    adaptive_coverage_for_target(&target, min_level, max_level, options.threshold)
}
