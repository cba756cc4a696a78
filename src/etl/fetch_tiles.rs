use std::fs;
use std::path::PathBuf;

use geojson::GeoJson;
use log::{info, warn};

use crate::config::FetchTilesConfig;
use crate::data::bounds::bbox_from_geojson;
use crate::data::tile::{TileCoord, TileRange, UrlTemplate};
use crate::errors::{Error, Result};
use crate::ogr::{AppendRequest, GeoTool, TileOutcome};

use super::reproject_region::ReprojectRegionEtl;
use super::Etl;

pub const ETL_NAME: &str = "fetch_tiles";
const PROGRESS_EVERY: usize = 50;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub appended: usize,
    pub skipped: usize,
}

fn progress_due(appended: usize) -> bool {
    appended > 0 && appended % PROGRESS_EVERY == 0
}

/// Appends every tile of the region's tile range into the output container. Tiles the tool
/// refuses are logged and skipped; nothing is retried.
pub struct FetchTilesEtl<'a, T: GeoTool> {
    config: &'a FetchTilesConfig,
    template: UrlTemplate,
    clip_region: PathBuf,
    tool: &'a mut T,
    summary: FetchSummary,
}

impl<'a, T: GeoTool> FetchTilesEtl<'a, T> {
    pub fn new(
        config: &'a FetchTilesConfig,
        template: UrlTemplate,
        clip_region: PathBuf,
        tool: &'a mut T,
    ) -> FetchTilesEtl<'a, T> {
        FetchTilesEtl {
            config,
            template,
            clip_region,
            tool,
            summary: FetchSummary::default(),
        }
    }

    pub fn summary(&self) -> &FetchSummary {
        &self.summary
    }

    fn request(&self, tile: TileCoord) -> AppendRequest {
        AppendRequest {
            tile,
            url: self.template.url(&tile),
            layer: self.config.layer.clone(),
            output: self.config.out.clone(),
            clip_region: self.clip_region.clone(),
            promote_multi: self.config.promote_multi,
        }
    }
}

impl<T: GeoTool> Etl for FetchTilesEtl<'_, T> {
    type Input = GeoJson;
    type Output = TileRange;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self) -> Result<bool> {
        // Appending is cumulative, so every run fetches again.
        Ok(false)
    }

    fn extract(&mut self) -> Result<Self::Input> {
        let region = &self.config.region_geojson;
        let context = format!("could not read region {}", region.display());
        let text = fs::read_to_string(region)
            .map_err(|err| Error::from(err).context(&context))?;
        text.parse::<GeoJson>()
            .map_err(|err| Error::from(err).context(&context))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let bbox = bbox_from_geojson(&input)?;
        let range = TileRange::covering(&bbox, self.config.z_fetch);
        info!(
            range = range.to_string().as_str(),
            tiles = range.tile_count();
            "Fetching tiles"
        );
        Ok(range)
    }

    fn load(&mut self, output: Self::Output) -> Result<()> {
        let out = self.config.out.display().to_string();
        if self.config.out.try_exists()? {
            info!(out = out.as_str(); "Appending into existing output");
        } else {
            info!(out = out.as_str(); "Creating output");
        }

        let tiles: Vec<TileCoord> = output.tiles().collect();
        for tile in tqdm::tqdm(tiles.into_iter()) {
            let request = self.request(tile);
            match self.tool.fetch_and_append(&request)? {
                TileOutcome::Appended => {
                    self.summary.appended += 1;
                    if progress_due(self.summary.appended) {
                        info!(appended = self.summary.appended; "Appended tiles");
                    }
                }
                TileOutcome::Skipped(reason) => {
                    self.summary.skipped += 1;
                    warn!(
                        z = tile.z,
                        x = tile.x,
                        y = tile.y,
                        reason = reason.as_str();
                        "Skipping tile"
                    );
                }
            }
        }

        info!(
            out = out.as_str(),
            clip_region = self.clip_region.display().to_string().as_str(),
            appended = self.summary.appended,
            skipped = self.summary.skipped;
            "Done"
        );
        Ok(())
    }
}

/// Reprojects the region for clipping unless a copy is already on disk, then fetches every
/// tile over it.
pub fn fetch_tiles<T: GeoTool>(config: &FetchTilesConfig, tool: &mut T) -> Result<FetchSummary> {
    let template = config.validate()?;

    let mut reproject = ReprojectRegionEtl::new(tool, &config.region_geojson);
    reproject.process()?;
    let clip_region = reproject.target().to_path_buf();

    let mut etl = FetchTilesEtl::new(config, template, clip_region, tool);
    etl.process()?;
    Ok(etl.summary().clone())
}
