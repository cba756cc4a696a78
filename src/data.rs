use self::osm::{Node, Relation, Way};

pub mod bounds;
pub mod features;
pub mod osm;
pub mod tile;

/// Map data produced by one conversion, each element kind in creation order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OsmMapData {
    pub nodes: Vec<Node>,
    pub ways: Vec<Way>,
    pub relations: Vec<Relation>,
}
