use geo::{Area, BoundingRect, Geometry, MultiPolygon, Polygon, Rect};
use types::{CoverageError, Result};
use util::SpatialIndex;

use crate::clip::tile_overlap;

/// A ratio within this of the threshold still counts as covering. At the
/// finest level, ratios at or below it count as no overlap; coarser levels
/// scale it down, see [`overlap_floor`].
pub const RATIO_EPSILON: f64 = 1e-9;

/// Smallest ratio at `level` that still counts as overlap when refinement
/// goes down to `finest_level`.
///
/// A tile's area shrinks 32-fold per level, so the floor does too: a
/// feature that would be visible at `finest_level` is never pruned earlier.
pub fn overlap_floor(level: usize, finest_level: usize) -> f64 {
    let levels_below = finest_level.saturating_sub(level) as i32;
    RATIO_EPSILON * 32f64.powi(-levels_below)
}

/// What the coverage engines need from the geometry being tiled.
///
/// Areas are planar, in squared degrees.
pub trait CoverageTarget: Sync {
    fn bounding_box(&self) -> Option<Rect>;

    fn area(&self) -> f64;

    /// Area of the part of `tile` lying inside the geometry.
    fn intersection_area(&self, tile: &Rect) -> f64;

    fn is_valid(&self) -> bool;

    /// The geometry restricted to `tile`, used to measure the tile's
    /// descendants. `None` makes them go through the full target again.
    fn clip(&self, _tile: &Rect) -> Option<TilePiece> {
        None
    }

    /// Share of `tile` covered by the geometry, in [0, 1].
    fn coverage_ratio(&self, tile: &Rect) -> f64 {
        ratio(self.intersection_area(tile), tile)
    }
}

fn ratio(area: f64, tile: &Rect) -> f64 {
    let tile_area = tile.unsigned_area();
    if tile_area <= 0.0 {
        return 0.0;
    }
    (area / tile_area).clamp(0.0, 1.0)
}

/// Part of a target clipped to one tile.
///
/// Only valid for tiles inside the one it was clipped to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePiece {
    parts: Vec<Polygon>,
}

impl TilePiece {
    pub fn parts(&self) -> &[Polygon] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn intersection_area(&self, tile: &Rect) -> f64 {
        self.parts
            .iter()
            .map(|part| tile_overlap(part, tile).area(tile))
            .sum()
    }

    pub fn coverage_ratio(&self, tile: &Rect) -> f64 {
        ratio(self.intersection_area(tile), tile)
    }

    /// Narrows the piece down to a sub-tile.
    pub fn clip(&self, tile: &Rect) -> TilePiece {
        clip_parts(self.parts.iter(), tile)
    }
}

fn clip_parts<'a>(parts: impl Iterator<Item = &'a Polygon>, tile: &Rect) -> TilePiece {
    TilePiece {
        parts: parts
            .filter_map(|part| tile_overlap(part, tile).into_polygon(tile))
            .collect(),
    }
}

/// A polygon or multipolygon prepared for repeated tile queries.
///
/// Parts are kept separately behind a bounding-box index so a tile is only
/// clipped against the parts it can reach. The geometry is never repaired:
/// overlapping or self-intersecting parts give meaningless ratios.
pub struct TargetGeometry {
    parts: Vec<Polygon>,
    index: SpatialIndex,
    bbox: Option<Rect>,
    area: f64,
}

impl TargetGeometry {
    pub fn new(geometry: impl Into<Geometry>, use_index: bool) -> Result<Self> {
        let parts = match geometry.into() {
            Geometry::Polygon(polygon) => vec![polygon],
            Geometry::MultiPolygon(multi_polygon) => multi_polygon.0,
            Geometry::Rect(rect) => vec![rect.to_polygon()],
            Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
            other => {
                return Err(CoverageError::InvalidGeometry(format!(
                    "expected Polygon or MultiPolygon, got {}",
                    geometry_name(&other)
                )));
            }
        };
        Self::from_parts(parts, use_index)
    }

    pub fn from_parts(parts: Vec<Polygon>, use_index: bool) -> Result<Self> {
        let parts: Vec<Polygon> = parts
            .into_iter()
            .filter(|part| !part.exterior().0.is_empty())
            .collect();
        if parts.is_empty() {
            return Err(CoverageError::InvalidGeometry(
                "geometry has no polygon parts".to_string(),
            ));
        }
        if !coordinates_in_range(&parts) {
            return Err(CoverageError::InvalidGeometry(
                "coordinates must be finite longitudes/latitudes in degrees".to_string(),
            ));
        }

        let multi_polygon = MultiPolygon::new(parts);
        let bbox = multi_polygon.bounding_rect();
        let area = multi_polygon.unsigned_area();
        let parts = multi_polygon.0;
        let index = SpatialIndex::new(&parts, use_index);

        Ok(TargetGeometry {
            parts,
            index,
            bbox,
            area,
        })
    }

    pub fn parts(&self) -> &[Polygon] {
        &self.parts
    }

    pub fn uses_index(&self) -> bool {
        matches!(self.index, SpatialIndex::RTree(_))
    }
}

impl CoverageTarget for TargetGeometry {
    fn bounding_box(&self) -> Option<Rect> {
        self.bbox
    }

    fn area(&self) -> f64 {
        self.area
    }

    fn intersection_area(&self, tile: &Rect) -> f64 {
        self.index
            .query(tile)
            .into_iter()
            .map(|i| tile_overlap(&self.parts[i], tile).area(tile))
            .sum()
    }

    fn is_valid(&self) -> bool {
        coordinates_in_range(&self.parts)
    }

    fn clip(&self, tile: &Rect) -> Option<TilePiece> {
        let hits = self.index.query(tile);
        Some(clip_parts(hits.iter().map(|&i| &self.parts[i]), tile))
    }
}

fn coordinates_in_range(parts: &[Polygon]) -> bool {
    parts.iter().all(|part| {
        std::iter::once(part.exterior())
            .chain(part.interiors())
            .flat_map(|ring| ring.0.iter())
            .all(|c| (-180.0..=180.0).contains(&c.x) && (-90.0..=90.0).contains(&c.y))
    })
}

fn geometry_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
