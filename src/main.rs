use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use structured_logger::json::new_writer;
use structured_logger::Builder;

use squadrats::config::{
    self, FetchTilesConfig, Geojson2OsmConfig, DEFAULT_LAYER, DEFAULT_OGR2OGR, DEFAULT_OUTPUT,
    DEFAULT_ZOOM,
};
use squadrats::errors::Result;
use squadrats::etl::fetch_tiles::fetch_tiles;
use squadrats::etl::geojson_to_osm::GeojsonToOsmEtl;
use squadrats::etl::Etl;
use squadrats::ogr::Ogr2Ogr;

#[derive(Parser)]
#[command(name = "squadrats", about = "Fetch vector tiles over a region, or turn GeoJSON polygons into OSM XML")]
struct Cli {
    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the MVT tiles intersecting a region and append one layer into a GeoPackage
    FetchTiles(FetchTilesArgs),
    /// Convert GeoJSON polygons into OSM XML multipolygon relations
    #[command(name = "geojson2osm")]
    Geojson2Osm(Geojson2OsmArgs),
}

#[derive(Args)]
struct FetchTilesArgs {
    /// JSON file with the settings below; replaces the flags
    #[arg(long, conflicts_with_all = ["base_url", "region_geojson"])]
    config: Option<PathBuf>,
    /// Tile URL template like .../{z}/{x}/{y}.pbf
    #[arg(long, required_unless_present = "config")]
    base_url: Option<String>,
    /// Region boundary in WGS84, e.g. west_flanders.geojson
    #[arg(long, required_unless_present = "config")]
    region_geojson: Option<PathBuf>,
    /// Zoom level to fetch, usually the server's max zoom
    #[arg(long, default_value_t = DEFAULT_ZOOM)]
    z_fetch: u8,
    /// Layer to extract from the tiles, also used as the output layer name
    #[arg(long, default_value = DEFAULT_LAYER)]
    layer: String,
    /// Output GeoPackage
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    out: PathBuf,
    /// Promote single geometries to multi geometries when appending
    #[arg(long)]
    promote_multi: bool,
    /// ogr2ogr binary to run
    #[arg(long, default_value = DEFAULT_OGR2OGR)]
    ogr2ogr: String,
}

impl FetchTilesArgs {
    fn into_config(self) -> Result<FetchTilesConfig> {
        if let Some(path) = &self.config {
            return config::load_config(path);
        }
        Ok(FetchTilesConfig {
            base_url: self.base_url.ok_or("--base-url is required")?,
            region_geojson: self.region_geojson.ok_or("--region-geojson is required")?,
            z_fetch: self.z_fetch,
            layer: self.layer,
            out: self.out,
            promote_multi: self.promote_multi,
            ogr2ogr: self.ogr2ogr,
        })
    }
}

#[derive(Args)]
struct Geojson2OsmArgs {
    /// JSON file with the settings below; replaces the flags
    #[arg(long, conflicts_with_all = ["input", "output"])]
    config: Option<PathBuf>,
    /// Input GeoJSON (WGS84)
    #[arg(long = "in", required_unless_present = "config")]
    input: Option<PathBuf>,
    /// Output OSM XML
    #[arg(long = "out", required_unless_present = "config")]
    output: Option<PathBuf>,
    /// Extra index tag, e.g. landuse=squadratinhos. Can be repeated
    #[arg(long)]
    add_index_tag: Vec<String>,
    /// Do not add the default landuse=meadow tag
    #[arg(long)]
    no_default_index_tag: bool,
    /// Copy the index tags and name onto the outer ways as well
    #[arg(long)]
    duplicate_outer_tags: bool,
}

impl Geojson2OsmArgs {
    fn into_config(self) -> Result<Geojson2OsmConfig> {
        if let Some(path) = &self.config {
            return config::load_config(path);
        }
        Ok(Geojson2OsmConfig {
            input: self.input.ok_or("--in is required")?,
            output: self.output.ok_or("--out is required")?,
            add_index_tag: self.add_index_tag,
            no_default_index_tag: self.no_default_index_tag,
            duplicate_outer_tags: self.duplicate_outer_tags,
        })
    }
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Command::FetchTiles(args) => {
            let config = args.into_config()?;
            let mut tool = Ogr2Ogr::new(&config.ogr2ogr);
            fetch_tiles(&config, &mut tool)?;
        }
        Command::Geojson2Osm(args) => {
            let config = args.into_config()?;
            GeojsonToOsmEtl::new(&config).process()?;
        }
    }
    Ok(())
}
