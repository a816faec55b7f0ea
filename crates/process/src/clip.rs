use geo::{Area, Contains, Coord, LineString, Point, Polygon, Rect};

/// How a polygon sits relative to one tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOverlap {
    /// The tile lies inside the polygon, boundary contact allowed.
    Covered,
    /// No shared area; edge or corner contact ends up here.
    Disjoint,
    /// The polygon restricted to the tile.
    Clipped(Polygon),
}

impl TileOverlap {
    pub fn area(&self, tile: &Rect) -> f64 {
        match self {
            TileOverlap::Covered => tile.unsigned_area(),
            TileOverlap::Disjoint => 0.0,
            TileOverlap::Clipped(polygon) => polygon.unsigned_area(),
        }
    }

    pub fn into_polygon(self, tile: &Rect) -> Option<Polygon> {
        match self {
            TileOverlap::Covered => Some(tile.to_polygon()),
            TileOverlap::Disjoint => None,
            TileOverlap::Clipped(polygon) => Some(polygon),
        }
    }
}

/// Relates `polygon` to `tile`.
///
/// When no ring edge enters the open tile, the tile is either fully inside
/// or fully outside and its centre decides. Otherwise every ring is clipped
/// to the tile.
pub fn tile_overlap(polygon: &Polygon, tile: &Rect) -> TileOverlap {
    if !rings_enter(polygon, tile) {
        return if polygon.contains(&Point::from(tile.center())) {
            TileOverlap::Covered
        } else {
            TileOverlap::Disjoint
        };
    }

    let Some(exterior) = clip_ring(polygon.exterior(), tile) else {
        return TileOverlap::Disjoint;
    };
    let interiors = polygon
        .interiors()
        .iter()
        .filter_map(|ring| clip_ring(ring, tile))
        .collect();
    TileOverlap::Clipped(Polygon::new(exterior, interiors))
}

fn rings_enter(polygon: &Polygon, tile: &Rect) -> bool {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|ring| ring.lines())
        .any(|line| segment_enters(line.start, line.end, tile))
}

/// Whether the segment has a point strictly inside `tile`.
fn segment_enters(start: Coord, end: Coord, tile: &Rect) -> bool {
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, d, lo, hi) in [
        (start.x, end.x - start.x, tile.min().x, tile.max().x),
        (start.y, end.y - start.y, tile.min().y, tile.max().y),
    ] {
        if d == 0.0 {
            if p <= lo || p >= hi {
                return false;
            }
        } else {
            let (a, b) = ((lo - p) / d, (hi - p) / d);
            t0 = t0.max(a.min(b));
            t1 = t1.min(a.max(b));
        }
    }
    t0 < t1
}

/// Sutherland-Hodgman against the four tile edges.
///
/// Concave rings may come back with zero-width bridges along the tile
/// boundary; their shoelace area is still the clipped area.
fn clip_ring(ring: &LineString, tile: &Rect) -> Option<LineString> {
    let (min, max) = (tile.min(), tile.max());
    let mut coords = ring.0.clone();

    coords = clip_against_edge(&coords, |c| c.x >= min.x, |a, b| {
        let t = (min.x - a.x) / (b.x - a.x);
        Coord { x: min.x, y: a.y + t * (b.y - a.y) }
    });
    coords = clip_against_edge(&coords, |c| c.x <= max.x, |a, b| {
        let t = (max.x - a.x) / (b.x - a.x);
        Coord { x: max.x, y: a.y + t * (b.y - a.y) }
    });
    coords = clip_against_edge(&coords, |c| c.y >= min.y, |a, b| {
        let t = (min.y - a.y) / (b.y - a.y);
        Coord { x: a.x + t * (b.x - a.x), y: min.y }
    });
    coords = clip_against_edge(&coords, |c| c.y <= max.y, |a, b| {
        let t = (max.y - a.y) / (b.y - a.y);
        Coord { x: a.x + t * (b.x - a.x), y: max.y }
    });

    coords.dedup();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }
    coords.push(coords[0]);
    Some(LineString::new(coords))
}

fn clip_against_edge<F, I>(coords: &[Coord], inside: F, intersect: I) -> Vec<Coord>
where
    F: Fn(&Coord) -> bool,
    I: Fn(&Coord, &Coord) -> Coord,
{
    let mut output = Vec::with_capacity(coords.len() + 4);
    for (i, current) in coords.iter().enumerate() {
        let next = &coords[(i + 1) % coords.len()];
        match (inside(current), inside(next)) {
            (true, true) => output.push(*current),
            (true, false) => {
                output.push(*current);
                output.push(intersect(current, next));
            }
            (false, true) => output.push(intersect(current, next)),
            (false, false) => {}
        }
    }
    output
}
