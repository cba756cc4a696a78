//! Two small geodata tools: a vector tile fetcher that appends one MVT layer over a region
//! into a GeoPackage through `ogr2ogr`, and a converter from GeoJSON polygons to OSM XML
//! multipolygon relations.

pub mod config;
pub mod data;
pub mod errors;
pub mod etl;
pub mod ogr;
