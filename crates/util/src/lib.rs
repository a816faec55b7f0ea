mod candidates;
mod geohash_helper;
mod spatial_index;

pub use candidates::candidate_geohashes;
pub use geohash_helper::{
    axis_bits, base32_index, bbox_of_geohashes, children, decode_bbox, encode,
    geohash_to_polygon, tile_size, validate_geohash, BASE32,
};
pub use spatial_index::{IndexedEnvelope, SpatialIndex};
