use geojson::{Feature, GeoJson, Geometry, JsonObject, JsonValue, PolygonType, Position, Value};

use crate::errors::Result;

/// Property keys checked, in order, for a feature's display name.
const NAME_KEYS: [&str; 3] = ["name", "NAME", "Name"];

/// Flattens any GeoJSON document into a list of features. A bare geometry becomes a single
/// feature without properties.
pub fn load_features(geojson: GeoJson) -> Vec<Feature> {
    match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: Some(JsonObject::new()),
            foreign_members: None,
        }],
    }
}

pub fn feature_name(feature: &Feature) -> Option<String> {
    let properties = feature.properties.as_ref()?;
    NAME_KEYS.iter()
        .filter_map(|key| properties.get(*key))
        .find_map(name_value)
}

/// Empty strings, zero, `false`, `null` and empty containers count as no name. Anything else
/// is rendered as text.
fn name_value(value: &JsonValue) -> Option<String> {
    let present = match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64() != Some(0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    };
    if !present {
        return None;
    }
    Some(match value {
        JsonValue::String(s) => s.clone(),
        other => literal(other),
    })
}

/// Literal form of a property value: `True`, `None`, `1.5`, `['a', 1]`, `{'k': 'v'}`.
fn literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "None".to_string(),
        JsonValue::Bool(true) => "True".to_string(),
        JsonValue::Bool(false) => "False".to_string(),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => float_literal(f),
            _ => n.to_string(),
        },
        JsonValue::String(s) => quoted(s),
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", items.join(", "))
        }
        JsonValue::Object(map) => {
            let entries: Vec<String> = map.iter()
                .map(|(key, value)| format!("{}: {}", quoted(key), literal(value)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Shortest round-trip digits; scientific notation outside 1e-4..1e16.
fn float_literal(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    if value != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }
    let plain = value.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

/// Single quotes unless the text holds a single quote and no double quote.
fn quoted(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

pub fn is_polygonal(geometry: &Geometry) -> bool {
    matches!(geometry.value, Value::Polygon(_) | Value::MultiPolygon(_))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

impl TryFrom<&Position> for Coord {
    type Error = crate::errors::Error;

    fn try_from(position: &Position) -> Result<Self> {
        match position.as_slice() {
            [lon, lat, ..] => Ok(Coord { lon: *lon, lat: *lat }),
            _ => Err(format!("position {:?} needs at least two ordinates", position).into()),
        }
    }
}

pub type Ring = Vec<Coord>;

/// The raw rings of one polygon, straight from the GeoJSON coordinates.
pub struct PolygonRings<'a> {
    pub outer: &'a [Position],
    pub inners: &'a [Vec<Position>],
}

/// Yields the rings of every non-empty polygon in a Polygon or MultiPolygon. Any other
/// geometry yields nothing.
pub fn iter_polygons(value: &Value) -> impl Iterator<Item = PolygonRings<'_>> {
    let polygons: &[PolygonType] = match value {
        Value::Polygon(polygon) => std::slice::from_ref(polygon),
        Value::MultiPolygon(polygons) => polygons.as_slice(),
        _ => &[],
    };
    polygons.iter()
        .filter_map(|polygon| polygon.split_first())
        .map(|(outer, inners)| PolygonRings { outer, inners })
}

pub fn to_ring(positions: &[Position]) -> Result<Ring> {
    positions.iter().map(Coord::try_from).collect()
}

pub fn close_ring(mut ring: Ring) -> Ring {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

/// Orientation test used to pick the winding of outer and inner rings. Note that this sums
/// (x2 - x1) * (y2 - y1) instead of the shoelace cross product; output depends on it, so it
/// stays as is.
pub fn ring_is_ccw(ring: &[Coord]) -> bool {
    let sum: f64 = ring.windows(2)
        .map(|pair| (pair[1].lon - pair[0].lon) * (pair[1].lat - pair[0].lat))
        .sum();
    sum < 0.0
}

fn reversed(mut ring: Ring) -> Ring {
    ring.reverse();
    close_ring(ring)
}

/// Closes an outer ring and forces it counter-clockwise.
pub fn normalize_outer(ring: Ring) -> Ring {
    let ring = close_ring(ring);
    if !ring.is_empty() && !ring_is_ccw(&ring) {
        reversed(ring)
    } else {
        ring
    }
}

/// Closes an inner ring and forces it clockwise.
pub fn normalize_inner(ring: Ring) -> Ring {
    let ring = close_ring(ring);
    if !ring.is_empty() && ring_is_ccw(&ring) {
        reversed(ring)
    } else {
        ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Ring {
        points.iter().map(|&(lon, lat)| Coord { lon, lat }).collect()
    }

    fn parse(json: &str) -> GeoJson {
        json.parse().unwrap()
    }

    #[test]
    fn bare_geometry_becomes_one_feature() {
        let features = load_features(parse(r#"{"type":"Polygon","coordinates":[]}"#));
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].properties, Some(JsonObject::new()));
        assert!(features[0].geometry.is_some());
    }

    #[test]
    fn collection_keeps_every_feature() {
        let features = load_features(parse(r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":null},
            {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[1,2]}}
        ]}"#));
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn name_lookup_order() {
        let features = load_features(parse(r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"Name":"c","NAME":"b"},"geometry":null},
            {"type":"Feature","properties":{"name":"","Name":"c"},"geometry":null},
            {"type":"Feature","properties":{"name":null,"NAME":0,"Name":false},"geometry":null},
            {"type":"Feature","properties":{"NAME":42},"geometry":null},
            {"type":"Feature","properties":{"name":[],"NAME":{}},"geometry":null}
        ]}"#));
        let names: Vec<_> = features.iter().map(feature_name).collect();
        assert_eq!(names, vec![
            Some("b".to_string()),
            Some("c".to_string()),
            None,
            Some("42".to_string()),
            None,
        ]);
    }

    #[test]
    fn non_string_names_are_rendered_as_literals() {
        let name = |json: &str| {
            let features = load_features(parse(&format!(
                r#"{{"type":"Feature","properties":{{"name":{}}},"geometry":null}}"#, json)));
            feature_name(&features[0])
        };
        assert_eq!(name("true"), Some("True".to_string()));
        assert_eq!(name("2.5"), Some("2.5".to_string()));
        assert_eq!(name("1e20"), Some("1e+20".to_string()));
        assert_eq!(name("0.00001"), Some("1e-05".to_string()));
        assert_eq!(name("3.0"), Some("3.0".to_string()));
        assert_eq!(name(r#"["De Haan", 2, null, false]"#), Some("['De Haan', 2, None, False]".to_string()));
        assert_eq!(name(r#"{"nl": "Brugge"}"#), Some("{'nl': 'Brugge'}".to_string()));
        assert_eq!(name(r#"["l'Ecluse"]"#), Some(r#"["l'Ecluse"]"#.to_string()));
    }

    #[test]
    fn polygon_yields_outer_and_holes() {
        let value = Value::Polygon(vec![
            vec![vec![0.0, 0.0], vec![4.0, 0.0], vec![4.0, 4.0]],
            vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![2.0, 2.0]],
        ]);
        let polygons: Vec<_> = iter_polygons(&value).collect();
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].outer.len(), 3);
        assert_eq!(polygons[0].inners.len(), 1);
    }

    #[test]
    fn empty_polygons_are_skipped() {
        assert_eq!(iter_polygons(&Value::Polygon(vec![])).count(), 0);
        let multi = Value::MultiPolygon(vec![
            vec![],
            vec![vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0]]],
        ]);
        assert_eq!(iter_polygons(&multi).count(), 1);
        assert_eq!(iter_polygons(&Value::Point(vec![0.0, 0.0])).count(), 0);
    }

    #[test]
    fn position_with_altitude_is_accepted() {
        let coords = to_ring(&[vec![1.0, 2.0, 30.0]]).unwrap();
        assert_eq!(coords, ring(&[(1.0, 2.0)]));
        assert!(to_ring(&[vec![1.0]]).is_err());
    }

    #[test]
    fn close_ring_appends_first_point() {
        let open = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let closed = close_ring(open);
        assert_eq!(closed.len(), 4);
        assert_eq!(closed.first(), closed.last());

        assert_eq!(close_ring(closed.clone()), closed);
        assert!(close_ring(Vec::new()).is_empty());
    }

    #[test]
    fn winding_follows_the_product_sum() {
        // Steps (+1,+1) and (+1,-1) cancel out, (-2,0) adds nothing: not ccw.
        assert!(!ring_is_ccw(&ring(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0), (0.0, 0.0)])));
        // Single step (+1,-1): negative sum.
        assert!(ring_is_ccw(&ring(&[(0.0, 1.0), (1.0, 0.0)])));
    }

    #[test]
    fn outer_ring_is_reversed_when_not_ccw() {
        // Edge products: 1, 0, 0.
        let outer = ring(&[(0.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        assert!(!ring_is_ccw(&outer));
        let normalized = normalize_outer(outer.clone());
        let mut expected = outer;
        expected.reverse();
        assert_eq!(normalized, expected);
    }

    #[test]
    fn inner_ring_is_reversed_when_ccw() {
        let inner = ring(&[(0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(ring_is_ccw(&inner));
        let normalized = normalize_inner(inner.clone());
        let mut expected = inner;
        expected.reverse();
        assert_eq!(normalized, expected);
    }

    #[test]
    fn product_sum_ignores_direction() {
        let forward = ring(&[(0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(ring_is_ccw(&forward), ring_is_ccw(&backward));
    }

    #[test]
    fn normalized_rings_are_left_alone() {
        let outer = ring(&[(0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert_eq!(normalize_outer(outer.clone()), outer);

        let inner = ring(&[(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0), (1.0, 1.0)]);
        assert_eq!(normalize_inner(inner.clone()), inner);
    }
}
