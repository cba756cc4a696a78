use std::f64::consts::PI;
use std::fmt;
use std::ops::RangeInclusive;

use regex::Regex;

use crate::data::bounds::BoundingBox;
use crate::errors::Result;

/// Latitude limit of the web-mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.05112878;
pub const MAX_ZOOM: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z={} x={} y={}", self.z, self.x, self.y)
    }
}

/// Slippy-map tile containing a WGS84 position. Out of range positions are clamped onto the
/// edge tiles.
pub fn lonlat_to_tilexy(lon: f64, lat: f64, zoom: u8) -> (u32, u32) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let n = 2f64.powi(zoom as i32);
    let max_index = (1i64 << zoom) - 1;

    let x = ((lon + 180.0) / 360.0 * n) as i64;
    let lat_rad = lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n) as i64;

    (x.clamp(0, max_index) as u32, y.clamp(0, max_index) as u32)
}

/// Rectangle of tiles at one zoom level, both index ranges inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub x: RangeInclusive<u32>,
    pub y: RangeInclusive<u32>,
}

impl TileRange {
    pub fn covering(bbox: &BoundingBox, zoom: u8) -> TileRange {
        let (x0, y1) = lonlat_to_tilexy(bbox.min_lon, bbox.max_lat, zoom);
        let (x1, y0) = lonlat_to_tilexy(bbox.max_lon, bbox.min_lat, zoom);
        TileRange {
            zoom,
            x: x0.min(x1)..=x0.max(x1),
            y: y0.min(y1)..=y0.max(y1),
        }
    }

    pub fn tile_count(&self) -> usize {
        let width = (self.x.end() - self.x.start()) as usize + 1;
        let height = (self.y.end() - self.y.start()) as usize + 1;
        width * height
    }

    /// Tiles column by column: x outer, y inner.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> {
        let zoom = self.zoom;
        let ys = self.y.clone();
        self.x.clone().flat_map(move |x| {
            ys.clone().map(move |y| TileCoord { z: zoom, x, y })
        })
    }
}

impl fmt::Display for TileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z={} x[{}..{}] y[{}..{}]",
            self.zoom, self.x.start(), self.x.end(), self.y.start(), self.y.end())
    }
}

/// A tile URL with `{z}`, `{x}` and `{y}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<UrlTemplate> {
        let placeholder = Regex::new(r"\{([^{}]*)\}")?;
        let mut seen = [false; 3];
        for captures in placeholder.captures_iter(template) {
            match &captures[1] {
                "z" => seen[0] = true,
                "x" => seen[1] = true,
                "y" => seen[2] = true,
                other => {
                    return Err(format!("unknown placeholder {{{}}} in URL template {}", other, template).into())
                }
            }
        }
        if seen.contains(&false) {
            return Err(format!("URL template {} must contain {{z}}, {{x}} and {{y}}", template).into());
        }
        Ok(UrlTemplate {
            template: template.to_string(),
        })
    }

    pub fn url(&self, tile: &TileCoord) -> String {
        self.template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_of_zoom_one() {
        assert_eq!(lonlat_to_tilexy(0.0, 0.0, 1), (1, 1));
    }

    #[test]
    fn known_tile() {
        // Bruges, Belgium.
        assert_eq!(lonlat_to_tilexy(3.2247, 51.2093, 12), (2084, 1367));
    }

    #[test]
    fn clamps_to_grid() {
        assert_eq!(lonlat_to_tilexy(180.0, -90.0, 3), (7, 7));
        assert_eq!(lonlat_to_tilexy(-180.0, 90.0, 3), (0, 0));
        assert_eq!(lonlat_to_tilexy(-250.0, 0.0, 3), (0, 4));
        assert_eq!(lonlat_to_tilexy(10.0, 10.0, 0), (0, 0));
    }

    #[test]
    fn range_covers_bbox_in_column_order() {
        let bbox = BoundingBox {
            min_lon: -1.0,
            min_lat: -1.0,
            max_lon: 1.0,
            max_lat: 1.0,
        };
        let range = TileRange::covering(&bbox, 2);
        assert_eq!(range.x, 1..=2);
        assert_eq!(range.y, 1..=2);
        assert_eq!(range.tile_count(), 4);

        let tiles: Vec<_> = range.tiles().map(|t| (t.x, t.y)).collect();
        assert_eq!(tiles, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
    }

    #[test]
    fn url_template_substitution() {
        let template = UrlTemplate::parse("https://tiles.example.com/{z}/{x}/{y}.pbf").unwrap();
        let tile = TileCoord { z: 12, x: 2084, y: 1367 };
        assert_eq!(template.url(&tile), "https://tiles.example.com/12/2084/1367.pbf");
    }

    #[test]
    fn url_template_validation() {
        assert!(UrlTemplate::parse("https://tiles.example.com/{z}/{x}.pbf").is_err());
        assert!(UrlTemplate::parse("https://{s}.example.com/{z}/{x}/{y}.pbf").is_err());
    }
}
