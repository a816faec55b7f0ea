mod read_geojson;
mod write_geojson;

pub use read_geojson::{build_single_multipolygon, geojson_to_shape, read_geometry};
pub use write_geojson::{coverage_to_geojson, shape_to_geojson, write_feature_collection};
