use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use geojson::{Feature, GeoJson};
use log::info;

use crate::config::Geojson2OsmConfig;
use crate::data::features::{self, Coord, Ring};
use crate::data::osm::{FixedCoord, Member, MemberType, Node, OsmId, Relation, Role, Tags, Way};
use crate::data::OsmMapData;
use crate::errors::{Error, Result};

use super::{osm_xml, Etl};

pub const ETL_NAME: &str = "geojson_to_osm";

/// Accumulates the nodes, ways and relations of one conversion. Each element kind gets its own
/// id sequence starting at 1.
#[derive(Default)]
pub struct OsmBuilder {
    data: OsmMapData,
    node_ids: HashMap<(FixedCoord, FixedCoord), OsmId>,
}

impl OsmBuilder {
    pub fn new() -> OsmBuilder {
        OsmBuilder::default()
    }

    /// Coordinates that agree to 7 decimals map to the same node.
    pub fn add_node(&mut self, lon: f64, lat: f64) -> Result<OsmId> {
        let key = (FixedCoord::round(lon)?, FixedCoord::round(lat)?);
        if let Some(id) = self.node_ids.get(&key) {
            return Ok(*id);
        }
        let id = self.data.nodes.len() as OsmId + 1;
        self.data.nodes.push(Node {
            id,
            lon: key.0,
            lat: key.1,
        });
        self.node_ids.insert(key, id);
        Ok(id)
    }

    pub fn add_way(&mut self, ring: &[Coord], tags: Tags) -> Result<OsmId> {
        let nodes = ring.iter()
            .map(|coord| self.add_node(coord.lon, coord.lat))
            .collect::<Result<Vec<_>>>()?;
        let id = self.data.ways.len() as OsmId + 1;
        self.data.ways.push(Way { id, nodes, tags });
        Ok(id)
    }

    pub fn add_relation(&mut self, members: Vec<Member>, tags: Tags) -> OsmId {
        let id = self.data.relations.len() as OsmId + 1;
        self.data.relations.push(Relation { id, members, tags });
        id
    }

    pub fn build(self) -> OsmMapData {
        self.data
    }
}

/// Turns polygon features into multipolygon relations.
pub struct MultipolygonBuilder<'a> {
    index_tags: &'a [(String, String)],
    duplicate_outer_tags: bool,
    osm: OsmBuilder,
}

impl<'a> MultipolygonBuilder<'a> {
    pub fn new(index_tags: &'a [(String, String)], duplicate_outer_tags: bool) -> MultipolygonBuilder<'a> {
        MultipolygonBuilder {
            index_tags,
            duplicate_outer_tags,
            osm: OsmBuilder::new(),
        }
    }

    fn outer_way_tags(&self, name: Option<&str>) -> Tags {
        let mut tags = Tags::default();
        if self.duplicate_outer_tags {
            for (key, value) in self.index_tags {
                tags.insert(key, value);
            }
            if let Some(name) = name {
                tags.insert("name", name);
            }
        }
        tags
    }

    fn relation_tags(&self, name: Option<&str>) -> Tags {
        let mut tags = Tags::default();
        tags.insert("type", "multipolygon");
        if let Some(name) = name {
            tags.insert("name", name);
        }
        for (key, value) in self.index_tags {
            tags.insert_if_absent(key, value);
        }
        tags
    }

    /// Adds one feature; non-polygonal features are ignored. Returns the relation id, if any.
    pub fn add_feature(&mut self, feature: &Feature) -> Result<Option<OsmId>> {
        let geometry = match &feature.geometry {
            Some(geometry) if features::is_polygonal(geometry) => geometry,
            _ => return Ok(None),
        };
        let name = features::feature_name(feature);

        let mut members = Vec::new();
        for polygon in features::iter_polygons(&geometry.value) {
            let outer = features::normalize_outer(checked_ring(polygon.outer)?);
            let outer_tags = self.outer_way_tags(name.as_deref());
            let outer_id = self.osm.add_way(&outer, outer_tags)?;
            members.push(Member {
                member_type: MemberType::Way,
                member_ref: outer_id,
                role: Role::Outer,
            });

            for inner in polygon.inners {
                let inner = features::normalize_inner(checked_ring(inner)?);
                let inner_id = self.osm.add_way(&inner, Tags::default())?;
                members.push(Member {
                    member_type: MemberType::Way,
                    member_ref: inner_id,
                    role: Role::Inner,
                });
            }
        }

        if members.is_empty() {
            return Ok(None);
        }
        let tags = self.relation_tags(name.as_deref());
        Ok(Some(self.osm.add_relation(members, tags)))
    }

    pub fn build(self) -> OsmMapData {
        self.osm.build()
    }
}

fn checked_ring(positions: &[geojson::Position]) -> Result<Ring> {
    if positions.is_empty() {
        return Err("polygon ring has no coordinates".into());
    }
    features::to_ring(positions)
}

/// Converts every polygon feature of a parsed document.
pub fn convert(
    features: &[Feature],
    index_tags: &[(String, String)],
    duplicate_outer_tags: bool,
) -> Result<OsmMapData> {
    let mut builder = MultipolygonBuilder::new(index_tags, duplicate_outer_tags);
    for (idx, feature) in features.iter().enumerate() {
        builder.add_feature(feature)
            .map_err(|err| err.context(&format!("feature {}", idx)))?;
    }
    Ok(builder.build())
}

pub struct GeojsonToOsmEtl<'a> {
    config: &'a Geojson2OsmConfig,
}

impl GeojsonToOsmEtl<'_> {
    pub fn new(config: &Geojson2OsmConfig) -> GeojsonToOsmEtl<'_> {
        GeojsonToOsmEtl {
            config
        }
    }

    fn output_path(&self) -> PathBuf {
        self.config.output.clone()
    }
}

impl Etl for GeojsonToOsmEtl<'_> {
    type Input = Vec<Feature>;
    type Output = OsmMapData;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self) -> Result<bool> {
        // The output is always rewritten.
        Ok(false)
    }

    fn extract(&mut self) -> Result<Self::Input> {
        let context = format!("could not read {}", self.config.input.display());
        let text = fs::read_to_string(&self.config.input)
            .map_err(|err| Error::from(err).context(&context))?;
        let geojson = text.parse::<GeoJson>()
            .map_err(|err| Error::from(err).context(&context))?;
        Ok(features::load_features(geojson))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        convert(&input, &self.config.index_tags(), self.config.duplicate_outer_tags)
    }

    fn load(&mut self, output: Self::Output) -> Result<()> {
        let path = self.output_path();
        let file = File::create(&path)?;
        osm_xml::write_osm_xml(BufWriter::new(file), &output)?;
        info!(
            path = path.display().to_string().as_str(),
            nodes = output.nodes.len(),
            ways = output.ways.len(),
            relations = output.relations.len();
            "Wrote OSM XML"
        );
        Ok(())
    }
}
