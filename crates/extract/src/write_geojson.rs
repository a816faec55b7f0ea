use anyhow::Result;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use log::info;
use types::{CoverageTile, TileShape};

/// One feature for the whole shape, or one polygon feature per part when
/// `split_multipolygons` is set.
pub fn shape_to_geojson(shape: &TileShape, split_multipolygons: bool) -> FeatureCollection {
    let geometries: Vec<Value> = match shape {
        TileShape::MultiPolygon(multi_polygon) if split_multipolygons => {
            multi_polygon.0.iter().map(Value::from).collect()
        }
        TileShape::MultiPolygon(multi_polygon) => vec![Value::from(multi_polygon)],
        TileShape::Polygon(polygon) => vec![Value::from(polygon)],
    };

    collection(
        geometries
            .into_iter()
            .map(|value| feature(value, None))
            .collect(),
    )
}

/// Accepted tiles as polygon features carrying `geohash` and `level`.
pub fn coverage_to_geojson(tiles: &[CoverageTile]) -> FeatureCollection {
    collection(
        tiles
            .iter()
            .map(|tile| {
                let mut properties = JsonObject::new();
                properties.insert("geohash".to_string(), tile.hash.clone().into());
                properties.insert("level".to_string(), tile.level.into());
                feature(Value::from(&tile.to_polygon()), Some(properties))
            })
            .collect(),
    )
}

pub fn write_feature_collection(path: &str, collection: &FeatureCollection) -> Result<()> {
    std::fs::write(path, collection.to_string())?;
    info!("wrote {} features to {}", collection.features.len(), path);
    Ok(())
}

fn feature(value: Value, properties: Option<JsonObject>) -> Feature {
    Feature {
        id: None,
        properties,
        geometry: Some(Geometry::new(value)),
        foreign_members: None,
        bbox: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
