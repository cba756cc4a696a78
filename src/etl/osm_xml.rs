use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::data::osm::{Node, Relation, Tags, Way};
use crate::data::OsmMapData;
use crate::errors::Result;

pub const OSM_VERSION: &str = "0.6";
pub const GENERATOR: &str = "geojson2osm";

/// Writes nodes, then ways, then relations, each in creation order. Attribute values are
/// escaped by the writer.
pub fn write_osm_xml<W: Write>(out: W, data: &OsmMapData) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let osm = BytesStart::new("osm")
        .with_attributes([("version", OSM_VERSION), ("generator", GENERATOR)]);
    writer.write_event(Event::Start(osm))?;
    for node in &data.nodes {
        write_node(&mut writer, node)?;
    }
    for way in &data.ways {
        write_way(&mut writer, way)?;
    }
    for relation in &data.relations {
        write_relation(&mut writer, relation)?;
    }
    writer.write_event(Event::End(BytesEnd::new("osm")))?;

    let out = writer.get_mut();
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &Node) -> Result<()> {
    let id = node.id.to_string();
    let lon = node.lon.to_string();
    let lat = node.lat.to_string();
    let element = BytesStart::new("node")
        .with_attributes([("id", id.as_str()), ("lon", lon.as_str()), ("lat", lat.as_str())]);
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn write_way<W: Write>(writer: &mut Writer<W>, way: &Way) -> Result<()> {
    let id = way.id.to_string();
    writer.write_event(Event::Start(BytesStart::new("way").with_attributes([("id", id.as_str())])))?;
    for node_ref in &way.nodes {
        let node_ref = node_ref.to_string();
        let nd = BytesStart::new("nd").with_attributes([("ref", node_ref.as_str())]);
        writer.write_event(Event::Empty(nd))?;
    }
    write_tags(writer, &way.tags)?;
    writer.write_event(Event::End(BytesEnd::new("way")))?;
    Ok(())
}

fn write_relation<W: Write>(writer: &mut Writer<W>, relation: &Relation) -> Result<()> {
    let id = relation.id.to_string();
    writer.write_event(Event::Start(BytesStart::new("relation").with_attributes([("id", id.as_str())])))?;
    for member in &relation.members {
        let member_ref = member.member_ref.to_string();
        let element = BytesStart::new("member").with_attributes([
            ("type", member.member_type.as_str()),
            ("ref", member_ref.as_str()),
            ("role", member.role.as_str()),
        ]);
        writer.write_event(Event::Empty(element))?;
    }
    write_tags(writer, &relation.tags)?;
    writer.write_event(Event::End(BytesEnd::new("relation")))?;
    Ok(())
}

fn write_tags<W: Write>(writer: &mut Writer<W>, tags: &Tags) -> Result<()> {
    for (key, value) in tags.iter() {
        let tag = BytesStart::new("tag").with_attributes([("k", key), ("v", value)]);
        writer.write_event(Event::Empty(tag))?;
    }
    Ok(())
}
