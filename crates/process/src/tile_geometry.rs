use std::collections::BTreeMap;

use geo::{BooleanOps, MultiPolygon, Polygon};
use types::{Result, TileShape};
use util::geohash_to_polygon;

/// Box polygon of every geohash, keyed by geohash.
pub fn geohashes_to_boxes<I, S>(hashes: I) -> Result<BTreeMap<String, Polygon>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hashes
        .into_iter()
        .map(|hash| {
            let hash = hash.as_ref();
            Ok((hash.to_owned(), geohash_to_polygon(hash)?))
        })
        .collect()
}

/// Planar union of `polygons`.
///
/// Touching or overlapping polygons merge into one part, disjoint ones stay
/// separate. Halves are merged recursively to keep intermediate results small.
pub fn union_all(polygons: &[Polygon]) -> MultiPolygon {
    match polygons {
        [] => MultiPolygon::new(vec![]),
        [single] => MultiPolygon::new(vec![single.clone()]),
        _ => {
            let (left, right) = polygons.split_at(polygons.len() / 2);
            union_all(left).union(&union_all(right))
        }
    }
}

/// Combines tile boxes into one shape.
///
/// Without `dissolve` the result is a multipolygon with one part per box.
/// With `dissolve` adjacent boxes are merged, and a single resulting part
/// is returned as a polygon.
pub fn boxes_to_shape(boxes: Vec<Polygon>, dissolve: bool) -> TileShape {
    if dissolve {
        TileShape::from_parts(union_all(&boxes).0)
    } else {
        TileShape::MultiPolygon(MultiPolygon::new(boxes))
    }
}

pub fn geohashes_to_shape<I, S>(hashes: I, dissolve: bool) -> Result<TileShape>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let boxes = hashes
        .into_iter()
        .map(|hash| geohash_to_polygon(hash.as_ref()))
        .collect::<Result<Vec<Polygon>>>()?;
    Ok(boxes_to_shape(boxes, dissolve))
}
