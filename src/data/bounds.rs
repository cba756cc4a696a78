use geojson::{Feature, GeoJson, Geometry, Position, Value};

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    fn around(lon: f64, lat: f64) -> BoundingBox {
        BoundingBox {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }
}

/// Collects the envelope of every position in a document, whatever its nesting.
#[derive(Default)]
struct BoundsCollector {
    bbox: Option<BoundingBox>,
}

impl BoundsCollector {
    fn visit_geojson(&mut self, geojson: &GeoJson) {
        match geojson {
            GeoJson::FeatureCollection(collection) => {
                for feature in &collection.features {
                    self.visit_feature(feature);
                }
            }
            GeoJson::Feature(feature) => self.visit_feature(feature),
            GeoJson::Geometry(geometry) => self.visit_geometry(geometry),
        }
    }

    fn visit_feature(&mut self, feature: &Feature) {
        if let Some(geometry) = &feature.geometry {
            self.visit_geometry(geometry);
        }
    }

    fn visit_geometry(&mut self, geometry: &Geometry) {
        match &geometry.value {
            Value::Point(position) => self.visit_position(position),
            Value::MultiPoint(positions) | Value::LineString(positions) => {
                positions.iter().for_each(|p| self.visit_position(p));
            }
            Value::MultiLineString(lines) | Value::Polygon(lines) => {
                lines.iter().flatten().for_each(|p| self.visit_position(p));
            }
            Value::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().for_each(|p| self.visit_position(p));
            }
            Value::GeometryCollection(geometries) => {
                for geometry in geometries {
                    self.visit_geometry(geometry);
                }
            }
        }
    }

    fn visit_position(&mut self, position: &Position) {
        // Positions without both ordinates carry no location.
        let (lon, lat) = match position.as_slice() {
            [lon, lat, ..] => (*lon, *lat),
            _ => return,
        };
        match &mut self.bbox {
            Some(bbox) => bbox.extend(lon, lat),
            None => self.bbox = Some(BoundingBox::around(lon, lat)),
        }
    }
}

pub fn bbox_from_geojson(geojson: &GeoJson) -> Result<BoundingBox> {
    let mut collector = BoundsCollector::default();
    collector.visit_geojson(geojson);
    collector.bbox
        .ok_or_else(|| "region contains no coordinates".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(json: &str) -> Result<BoundingBox> {
        bbox_from_geojson(&json.parse().unwrap())
    }

    #[test]
    fn polygon_envelope() {
        let b = bbox(r#"{"type":"Polygon","coordinates":[[[2.5,50.7],[3.4,51.4],[2.9,50.9],[2.5,50.7]]]}"#)
            .unwrap();
        assert_eq!(b, BoundingBox {
            min_lon: 2.5,
            min_lat: 50.7,
            max_lon: 3.4,
            max_lat: 51.4,
        });
    }

    #[test]
    fn nested_collections() {
        let b = bbox(r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"GeometryCollection","geometries":[
                {"type":"Point","coordinates":[-1.0,-2.0]},
                {"type":"MultiPolygon","coordinates":[[[[5.0,6.0],[5.5,6.5],[5.0,6.0]]]]}
            ]}},
            {"type":"Feature","properties":{},"geometry":null},
            {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0.0,7.0],[1.0,1.0]]}}
        ]}"#).unwrap();
        assert_eq!(b, BoundingBox {
            min_lon: -1.0,
            min_lat: -2.0,
            max_lon: 5.5,
            max_lat: 7.0,
        });
    }

    #[test]
    fn single_feature_is_walked() {
        let b = bbox(r#"{"type":"Feature","properties":null,"geometry":{"type":"Point","coordinates":[4.0,8.0,12.0]}}"#)
            .unwrap();
        assert_eq!(b, BoundingBox::around(4.0, 8.0));
    }

    #[test]
    fn empty_region_is_an_error() {
        let err = bbox(r#"{"type":"FeatureCollection","features":[]}"#).unwrap_err();
        assert!(err.message.contains("no coordinates"));
    }
}
