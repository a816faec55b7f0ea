use geo::{BoundingRect, Rect};
use rstar::{RTree, RTreeObject, AABB};

#[derive(Debug, Clone)]
pub struct IndexedEnvelope {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_aabb(rect: &Rect) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Coarse bounding-box filter over a list of geometries.
///
/// Answers which geometries *may* intersect a box; exact predicates are left
/// to the caller. The `Scan` variant checks every envelope and returns the
/// same indices as the R-tree.
#[derive(Debug, Clone)]
pub enum SpatialIndex {
    RTree(RTree<IndexedEnvelope>),
    Scan(Vec<(usize, Rect)>),
}

impl SpatialIndex {
    /// Bulk loads an R-tree over the bounding boxes of `geometries`.
    /// Geometries without a bounding box (empty ones) are never returned.
    pub fn build<'a, G>(geometries: impl IntoIterator<Item = &'a G>) -> Self
    where
        G: BoundingRect<f64, Output = Option<Rect>> + 'a,
    {
        let entries = envelopes(geometries)
            .into_iter()
            .map(|(index, rect)| IndexedEnvelope {
                index,
                envelope: to_aabb(&rect),
            })
            .collect();
        SpatialIndex::RTree(RTree::bulk_load(entries))
    }

    pub fn scan<'a, G>(geometries: impl IntoIterator<Item = &'a G>) -> Self
    where
        G: BoundingRect<f64, Output = Option<Rect>> + 'a,
    {
        SpatialIndex::Scan(envelopes(geometries))
    }

    pub fn new<'a, G>(geometries: impl IntoIterator<Item = &'a G>, use_index: bool) -> Self
    where
        G: BoundingRect<f64, Output = Option<Rect>> + 'a,
    {
        if use_index {
            Self::build(geometries)
        } else {
            Self::scan(geometries)
        }
    }

    /// Indices of geometries whose bounding box intersects `bbox`, ascending.
    /// Boxes that only share an edge count as intersecting.
    pub fn query(&self, bbox: &Rect) -> Vec<usize> {
        let mut hits: Vec<usize> = match self {
            SpatialIndex::RTree(tree) => tree
                .locate_in_envelope_intersecting(&to_aabb(bbox))
                .map(|entry| entry.index)
                .collect(),
            SpatialIndex::Scan(entries) => entries
                .iter()
                .filter(|(_, rect)| boxes_intersect(rect, bbox))
                .map(|(index, _)| *index)
                .collect(),
        };
        hits.sort_unstable();
        hits
    }

    pub fn len(&self) -> usize {
        match self {
            SpatialIndex::RTree(tree) => tree.size(),
            SpatialIndex::Scan(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn envelopes<'a, G>(geometries: impl IntoIterator<Item = &'a G>) -> Vec<(usize, Rect)>
where
    G: BoundingRect<f64, Output = Option<Rect>> + 'a,
{
    geometries
        .into_iter()
        .enumerate()
        .filter_map(|(index, geometry)| geometry.bounding_rect().map(|rect| (index, rect)))
        .collect()
}

fn boxes_intersect(a: &Rect, b: &Rect) -> bool {
    a.min().x <= b.max().x
        && b.min().x <= a.max().x
        && a.min().y <= b.max().y
        && b.min().y <= a.max().y
}
