use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use crate::data::tile::TileCoord;
use crate::errors::{Error, Result};

pub const WEB_MERCATOR: &str = "EPSG:3857";

/// Everything needed to pull one tile's layer into the output container.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendRequest {
    pub tile: TileCoord,
    pub url: String,
    pub layer: String,
    pub output: PathBuf,
    pub clip_region: PathBuf,
    pub promote_multi: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileOutcome {
    Appended,
    /// The tool refused the tile, usually because it is empty or missing on the server. Carries
    /// the last line the tool printed.
    Skipped(String),
}

/// The external geodata tool. `Err` is reserved for failures that should stop the run.
pub trait GeoTool {
    fn reproject(&mut self, source: &Path, target: &Path) -> Result<()>;
    fn fetch_and_append(&mut self, request: &AppendRequest) -> Result<TileOutcome>;
}

/// Drives GDAL's `ogr2ogr` binary.
pub struct Ogr2Ogr {
    program: String,
}

impl Ogr2Ogr {
    pub fn new(program: &str) -> Ogr2Ogr {
        Ogr2Ogr {
            program: program.to_string(),
        }
    }

    fn spawn_error(&self, err: std::io::Error) -> Error {
        Error::from(err).context(&format!("could not run {}", self.program))
    }
}

pub fn reproject_args(source: &Path, target: &Path) -> Vec<String> {
    vec![
        "-t_srs".to_string(),
        WEB_MERCATOR.to_string(),
        target.display().to_string(),
        source.display().to_string(),
    ]
}

pub fn append_args(request: &AppendRequest) -> Vec<String> {
    let tile = &request.tile;
    let mut args: Vec<String> = vec![
        "-f".into(), "GPKG".into(),
        request.output.display().to_string(),
        format!("MVT:{}", request.url),
        "-update".into(), "-append".into(),
        "-nln".into(), request.layer.clone(),
        "-dialect".into(), "OGRSQL".into(),
        "-sql".into(), format!("SELECT * FROM {}", request.layer),
        "-oo".into(), format!("Z={}", tile.z),
        "-oo".into(), format!("X={}", tile.x),
        "-oo".into(), format!("Y={}", tile.y),
        "-t_srs".into(), WEB_MERCATOR.into(),
        "-clipsrc".into(), request.clip_region.display().to_string(),
    ];
    if request.promote_multi {
        args.extend(["-nlt".to_string(), "PROMOTE_TO_MULTI".to_string()]);
    }
    args
}

/// Last non-empty line of the tool's diagnostics, or "error" when it printed nothing.
pub fn last_diagnostic_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("error")
        .to_string()
}

impl GeoTool for Ogr2Ogr {
    fn reproject(&mut self, source: &Path, target: &Path) -> Result<()> {
        let args = reproject_args(source, target);
        debug!(program = self.program.as_str(), args = args.join(" ").as_str(); "Reprojecting region");
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|err| self.spawn_error(err))?;
        if !status.success() {
            return Err(format!("Failed to reproject region to {} ({})", WEB_MERCATOR, status).into());
        }
        Ok(())
    }

    fn fetch_and_append(&mut self, request: &AppendRequest) -> Result<TileOutcome> {
        let args = append_args(request);
        debug!(program = self.program.as_str(), args = args.join(" ").as_str(); "Fetching tile");
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| self.spawn_error(err))?;
        if output.status.success() {
            Ok(TileOutcome::Appended)
        } else {
            Ok(TileOutcome::Skipped(last_diagnostic_line(&output.stderr)))
        }
    }
}
