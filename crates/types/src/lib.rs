mod config;
mod error;

use std::collections::{BTreeMap, BTreeSet};

use geo::{Area, Geometry, MultiPolygon, Polygon, Rect};
use serde::{Deserialize, Serialize};

pub use config::{
    validate_level, validate_level_range, validate_threshold, CoverageConfig, CoverageOptions,
    DEFAULT_THRESHOLD, MAX_GEOHASH_LEVEL,
};
pub use error::{CoverageError, Result};

/// Accepted geohashes grouped by level.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageResult {
    levels: BTreeMap<usize, BTreeSet<String>>,
}

impl CoverageResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `level` is present even if nothing gets accepted there.
    pub fn ensure_level(&mut self, level: usize) -> &mut BTreeSet<String> {
        self.levels.entry(level).or_default()
    }

    pub fn insert(&mut self, level: usize, hash: String) -> bool {
        self.ensure_level(level).insert(hash)
    }

    pub fn get(&self, level: usize) -> Option<&BTreeSet<String>> {
        self.levels.get(&level)
    }

    pub fn contains(&self, level: usize, hash: &str) -> bool {
        self.levels
            .get(&level)
            .is_some_and(|hashes| hashes.contains(hash))
    }

    pub fn levels(&self) -> impl Iterator<Item = (usize, &BTreeSet<String>)> {
        self.levels.iter().map(|(level, hashes)| (*level, hashes))
    }

    /// All accepted geohashes, coarsest level first.
    pub fn geohashes(&self) -> impl Iterator<Item = &str> {
        self.levels.values().flatten().map(String::as_str)
    }

    pub fn total_tiles(&self) -> usize {
        self.levels.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_tiles() == 0
    }

    pub fn into_inner(self) -> BTreeMap<usize, BTreeSet<String>> {
        self.levels
    }
}

impl From<BTreeMap<usize, BTreeSet<String>>> for CoverageResult {
    fn from(levels: BTreeMap<usize, BTreeSet<String>>) -> Self {
        CoverageResult { levels }
    }
}

/// Keeps the covering tiles; the level key is present even when none cover.
impl From<LevelClassification> for CoverageResult {
    fn from(classification: LevelClassification) -> Self {
        let mut result = CoverageResult::new();
        result
            .ensure_level(classification.level)
            .extend(classification.covering);
        result
    }
}

/// One accepted tile of an adaptive run, tagged with the level it was accepted at.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageTile {
    pub hash: String,
    pub level: usize,
    pub bbox: Rect,
}

impl CoverageTile {
    pub fn to_polygon(&self) -> Polygon {
        self.bbox.to_polygon()
    }
}

/// Tiles of a single level split by their coverage ratio.
///
/// `partial` only holds tiles sharing a strictly positive area with the
/// geometry; edge or corner contact is not enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelClassification {
    pub level: usize,
    pub covering: BTreeSet<String>,
    pub partial: BTreeSet<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LevelCount {
    pub level: usize,
    pub tiles: usize,
    pub share: f64,
}

/// Tile counts per level of a coverage result.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LevelStats {
    pub total: usize,
    pub levels: Vec<LevelCount>,
}

impl LevelStats {
    pub fn from_result(result: &CoverageResult) -> Self {
        let total = result.total_tiles();
        let levels = result
            .levels()
            .map(|(level, hashes)| LevelCount {
                level,
                tiles: hashes.len(),
                share: if total == 0 {
                    0.0
                } else {
                    hashes.len() as f64 / total as f64
                },
            })
            .collect();

        LevelStats { total, levels }
    }
}

/// Polygonal output of the tile converter.
///
/// A dissolve that ends up with one part is reported as `Polygon`, but both
/// variants expose the same part-oriented API.
#[derive(Debug, Clone, PartialEq)]
pub enum TileShape {
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl TileShape {
    /// Collapses single-part multipolygons into a plain polygon.
    pub fn from_parts(mut parts: Vec<Polygon>) -> Self {
        if parts.len() == 1 {
            if let Some(polygon) = parts.pop() {
                return TileShape::Polygon(polygon);
            }
        }
        TileShape::MultiPolygon(MultiPolygon::new(parts))
    }

    pub fn parts(&self) -> &[Polygon] {
        match self {
            TileShape::Polygon(polygon) => std::slice::from_ref(polygon),
            TileShape::MultiPolygon(multi_polygon) => &multi_polygon.0,
        }
    }

    pub fn num_parts(&self) -> usize {
        self.parts().len()
    }

    pub fn area(&self) -> f64 {
        match self {
            TileShape::Polygon(polygon) => polygon.unsigned_area(),
            TileShape::MultiPolygon(multi_polygon) => multi_polygon.unsigned_area(),
        }
    }

    pub fn to_multi_polygon(&self) -> MultiPolygon {
        MultiPolygon::new(self.parts().to_vec())
    }

    pub fn into_multi_polygon(self) -> MultiPolygon {
        match self {
            TileShape::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
            TileShape::MultiPolygon(multi_polygon) => multi_polygon,
        }
    }
}

impl From<TileShape> for Geometry {
    fn from(shape: TileShape) -> Self {
        match shape {
            TileShape::Polygon(polygon) => Geometry::Polygon(polygon),
            TileShape::MultiPolygon(multi_polygon) => Geometry::MultiPolygon(multi_polygon),
        }
    }
}
