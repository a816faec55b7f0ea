use std::fs::read_to_string;

use anyhow::{anyhow, bail, Result};
use geo::{MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, Geometry, Value};
use log::debug;
use process::union_all;
use types::TileShape;

/// Reads a GeoJSON file into a single polygonal shape.
pub fn read_geometry(path: &str, merge_features: bool) -> Result<TileShape> {
    let geojson_str = read_to_string(path)?;
    let geojson: GeoJson = geojson_str.parse()?;
    geojson_to_shape(&geojson, merge_features)
}

/// Converts a FeatureCollection, Feature or bare Geometry into a shape.
///
/// With `merge_features` all polygons are unioned, otherwise they are only
/// flattened into one multipolygon. A single resulting part comes back as a
/// polygon.
pub fn geojson_to_shape(geojson: &GeoJson, merge_features: bool) -> Result<TileShape> {
    let polygons = match geojson {
        GeoJson::FeatureCollection(collection) => {
            if collection.features.is_empty() {
                bail!("GeoJSON has no features");
            }
            let mut polygons = Vec::new();
            for feature in &collection.features {
                polygons.extend(feature_polygons(feature)?);
            }
            polygons
        }
        GeoJson::Feature(feature) => feature_polygons(feature)?,
        GeoJson::Geometry(geometry) => geometry_polygons(geometry)?,
    };
    debug!("read {} polygon parts", polygons.len());

    if merge_features {
        Ok(TileShape::from_parts(build_single_multipolygon(polygons)?.0))
    } else {
        Ok(TileShape::from_parts(polygons))
    }
}

/// Unions arbitrary polygon parts into one multipolygon.
pub fn build_single_multipolygon(polygons: Vec<Polygon>) -> Result<MultiPolygon> {
    if polygons.is_empty() {
        bail!("no polygonal geometry to build a multipolygon from");
    }
    Ok(union_all(&polygons))
}

fn feature_polygons(feature: &Feature) -> Result<Vec<Polygon>> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| anyhow!("feature must be Polygon or MultiPolygon, got no geometry"))?;
    geometry_polygons(geometry)
}

fn geometry_polygons(geometry: &Geometry) -> Result<Vec<Polygon>> {
    match &geometry.value {
        Value::Polygon(_) => {
            let polygon: Polygon<f64> = Polygon::try_from(geometry.clone())?;
            Ok(vec![polygon])
        }
        Value::MultiPolygon(_) => {
            let multi_polygon: MultiPolygon<f64> = MultiPolygon::try_from(geometry.clone())?;
            Ok(multi_polygon.0)
        }
        other => bail!(
            "feature must be Polygon or MultiPolygon, got {}",
            value_name(other)
        ),
    }
}

fn value_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use serde_json::json;

    fn collection(geometries: Vec<serde_json::Value>) -> GeoJson {
        let features: Vec<serde_json::Value> = geometries
            .into_iter()
            .map(|geometry| json!({"type": "Feature", "properties": {}, "geometry": geometry}))
            .collect();
        GeoJson::from_json_value(json!({"type": "FeatureCollection", "features": features}))
            .unwrap()
    }

    fn square(x: f64, y: f64, size: f64) -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]]
        })
    }

    #[test]
    fn single_polygon() {
        let shape = geojson_to_shape(&collection(vec![square(0.0, 0.0, 1.0)]), true).unwrap();
        assert!(matches!(shape, TileShape::Polygon(_)));
        assert_eq!(shape.area(), 1.0);
    }

    #[test]
    fn polygon_hole_is_kept() {
        let geojson = collection(vec![json!({
            "type": "Polygon",
            "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[2, 2], [8, 2], [8, 8], [2, 8], [2, 2]]
            ]
        })]);
        let shape = geojson_to_shape(&geojson, false).unwrap();
        match shape {
            TileShape::Polygon(polygon) => {
                assert_eq!(polygon.interiors().len(), 1);
                assert_eq!(polygon.unsigned_area(), 64.0);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn separate_polygons_stay_apart_when_merged() {
        let geojson = collection(vec![square(0.0, 0.0, 1.0), square(3.0, 3.0, 1.0)]);
        let shape = geojson_to_shape(&geojson, true).unwrap();
        assert!(matches!(shape, TileShape::MultiPolygon(_)));
        assert_eq!(shape.num_parts(), 2);
    }

    #[test]
    fn touching_polygons_merge() {
        let geojson = collection(vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)]);
        let shape = geojson_to_shape(&geojson, true).unwrap();
        assert!(matches!(shape, TileShape::Polygon(_)));
        assert!((shape.area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_polygons_merge() {
        let geojson = collection(vec![square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)]);
        let shape = geojson_to_shape(&geojson, true).unwrap();
        assert_eq!(shape.num_parts(), 1);
        assert!((shape.area() - 7.0).abs() < 1e-3);
    }

    #[test]
    fn unmerged_parts_are_flattened() {
        let geojson = collection(vec![
            square(0.0, 0.0, 1.0),
            json!({
                "type": "MultiPolygon",
                "coordinates": [
                    [[[3, 3], [4, 3], [4, 4], [3, 4], [3, 3]]],
                    [[[5, 5], [6, 5], [6, 6], [5, 6], [5, 5]]]
                ]
            }),
        ]);
        let shape = geojson_to_shape(&geojson, false).unwrap();
        assert!(matches!(shape, TileShape::MultiPolygon(_)));
        assert_eq!(shape.num_parts(), 3);
    }

    #[test]
    fn bare_geometry_and_feature() {
        let geometry = GeoJson::from_json_value(square(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(geojson_to_shape(&geometry, false).unwrap().num_parts(), 1);

        let feature = GeoJson::from_json_value(
            json!({"type": "Feature", "properties": {}, "geometry": square(0.0, 0.0, 1.0)}),
        )
        .unwrap();
        assert_eq!(geojson_to_shape(&feature, true).unwrap().num_parts(), 1);
    }

    #[test]
    fn empty_collection_fails() {
        let err = geojson_to_shape(&collection(vec![]), true).unwrap_err();
        assert!(err.to_string().contains("GeoJSON has no features"));
    }

    #[test]
    fn non_polygonal_feature_fails() {
        let geojson = collection(vec![json!({"type": "Point", "coordinates": [0, 0]})]);
        let err = geojson_to_shape(&geojson, true).unwrap_err();
        assert!(err
            .to_string()
            .contains("feature must be Polygon or MultiPolygon"));
    }

    #[test]
    fn missing_features_key_fails_to_parse() {
        assert!(GeoJson::from_json_value(json!({"type": "FeatureCollection"})).is_err());
    }

    #[test]
    fn building_from_nothing_fails() {
        assert!(build_single_multipolygon(vec![]).is_err());
    }
}
