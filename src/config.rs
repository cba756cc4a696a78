use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::data::tile::{UrlTemplate, MAX_ZOOM};
use crate::errors::{Error, Result};

pub const DEFAULT_ZOOM: u8 = 12;
pub const DEFAULT_LAYER: &str = "squadratinhos";
pub const DEFAULT_OUTPUT: &str = "squadratinhos.gpkg";
pub const DEFAULT_OGR2OGR: &str = "ogr2ogr";
pub const DEFAULT_INDEX_TAG: &str = "landuse=meadow";

/// Settings of the `fetch-tiles` command. Field names double as the keys of a JSON config
/// file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetchTilesConfig {
    pub base_url: String,
    pub region_geojson: PathBuf,
    #[serde(default = "default_zoom")]
    pub z_fetch: u8,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(default = "default_output")]
    pub out: PathBuf,
    #[serde(default)]
    pub promote_multi: bool,
    #[serde(default = "default_ogr2ogr")]
    pub ogr2ogr: String,
}

impl FetchTilesConfig {
    pub fn validate(&self) -> Result<UrlTemplate> {
        if self.z_fetch > MAX_ZOOM {
            return Err(format!("zoom {} is above the maximum of {}", self.z_fetch, MAX_ZOOM).into());
        }
        if self.layer.trim().is_empty() {
            return Err("layer name must not be empty".into());
        }
        UrlTemplate::parse(&self.base_url)
    }
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_layer() -> String {
    DEFAULT_LAYER.to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_ogr2ogr() -> String {
    DEFAULT_OGR2OGR.to_string()
}

/// Settings of the `geojson2osm` command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Geojson2OsmConfig {
    #[serde(rename = "in")]
    pub input: PathBuf,
    #[serde(rename = "out")]
    pub output: PathBuf,
    #[serde(default)]
    pub add_index_tag: Vec<String>,
    #[serde(default)]
    pub no_default_index_tag: bool,
    #[serde(default)]
    pub duplicate_outer_tags: bool,
}

impl Geojson2OsmConfig {
    /// Extra tags as `(key, value)` pairs: the default tag unless disabled, then the user's.
    /// Entries with an empty key are dropped.
    pub fn index_tags(&self) -> Vec<(String, String)> {
        let default_tag = (!self.no_default_index_tag).then_some(DEFAULT_INDEX_TAG);
        default_tag.into_iter()
            .chain(self.add_index_tag.iter().map(String::as_str))
            .map(parse_kv)
            .filter(|(key, _)| !key.is_empty())
            .collect()
    }
}

/// `key=value` or a bare `key`, which means `key=yes`.
pub fn parse_kv(s: &str) -> (String, String) {
    match s.split_once('=') {
        Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
        None => (s.trim().to_string(), "yes".to_string()),
    }
}

pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let context = format!("could not load config {}", path.display());
    let file = File::open(path).map_err(|err| Error::from(err).context(&context))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| Error::from(err).context(&context))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_config(tags: &[&str], no_default: bool) -> Geojson2OsmConfig {
        Geojson2OsmConfig {
            input: PathBuf::from("in.geojson"),
            output: PathBuf::from("out.osm"),
            add_index_tag: tags.iter().map(|t| t.to_string()).collect(),
            no_default_index_tag: no_default,
            duplicate_outer_tags: false,
        }
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn parse_kv_forms() {
        assert_eq!(parse_kv("landuse=squadratinhos"), pair("landuse", "squadratinhos"));
        assert_eq!(parse_kv(" squadratinhos "), pair("squadratinhos", "yes"));
        assert_eq!(parse_kv("note = a=b "), pair("note", "a=b"));
    }

    #[test]
    fn index_tags_default_first() {
        assert_eq!(
            convert_config(&["squadratinhos", "=orphan"], false).index_tags(),
            vec![pair("landuse", "meadow"), pair("squadratinhos", "yes")],
        );
        assert_eq!(
            convert_config(&["landuse=squadratinhos"], true).index_tags(),
            vec![pair("landuse", "squadratinhos")],
        );
    }

    #[test]
    fn fetch_config_defaults() {
        let config: FetchTilesConfig = serde_json::from_str(
            r#"{"base_url": "https://t.example.com/{z}/{x}/{y}.pbf", "region_geojson": "wf.geojson"}"#,
        ).unwrap();
        assert_eq!(config.z_fetch, 12);
        assert_eq!(config.layer, "squadratinhos");
        assert_eq!(config.out, PathBuf::from("squadratinhos.gpkg"));
        assert!(!config.promote_multi);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn fetch_config_validation() {
        let mut config: FetchTilesConfig = serde_json::from_str(
            r#"{"base_url": "https://t.example.com/{z}/{x}.pbf", "region_geojson": "wf.geojson"}"#,
        ).unwrap();
        assert!(config.validate().is_err());

        config.base_url = "https://t.example.com/{z}/{x}/{y}.pbf".to_string();
        config.z_fetch = 31;
        assert!(config.validate().is_err());
    }

    #[test]
    fn convert_config_keys() {
        let config: Geojson2OsmConfig = serde_json::from_str(
            r#"{"in": "a.geojson", "out": "a.osm", "add_index_tag": ["x=y"], "duplicate_outer_tags": true}"#,
        ).unwrap();
        assert_eq!(config.input, PathBuf::from("a.geojson"));
        assert!(config.duplicate_outer_tags);
        assert!(!config.no_default_index_tag);
    }
}
