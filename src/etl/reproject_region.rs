use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::ogr::GeoTool;

use super::Etl;

pub const ETL_NAME: &str = "reproject_region";
const REPROJECTED_SUFFIX: &str = "_3857.geojson";

/// `regions/west_flanders.geojson` -> `regions/west_flanders_3857.geojson`
pub fn reprojected_path(region: &Path) -> PathBuf {
    let stem = region.file_stem().unwrap_or(region.as_os_str()).to_string_lossy();
    region.with_file_name(format!("{}{}", stem, REPROJECTED_SUFFIX))
}

/// Writes a web-mercator copy of the region for clipping. Kept between runs.
pub struct ReprojectRegionEtl<'a, T: GeoTool> {
    tool: &'a mut T,
    region: PathBuf,
    target: PathBuf,
}

impl<'a, T: GeoTool> ReprojectRegionEtl<'a, T> {
    pub fn new(tool: &'a mut T, region: &Path) -> ReprojectRegionEtl<'a, T> {
        ReprojectRegionEtl {
            tool,
            region: region.to_path_buf(),
            target: reprojected_path(region),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl<T: GeoTool> Etl for ReprojectRegionEtl<'_, T> {
    type Input = ();
    type Output = ();

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self) -> Result<bool> {
        Ok(self.target.try_exists()?)
    }

    fn extract(&mut self) -> Result<Self::Input> {
        if !self.region.try_exists()? {
            return Err(format!("region file {} does not exist", self.region.display()).into());
        }
        Ok(())
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        Ok(input)
    }

    fn load(&mut self, _output: Self::Output) -> Result<()> {
        self.tool.reproject(&self.region, &self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reprojected_file_sits_next_to_region() {
        assert_eq!(
            reprojected_path(Path::new("regions/west_flanders.geojson")),
            PathBuf::from("regions/west_flanders_3857.geojson"),
        );
        assert_eq!(reprojected_path(Path::new("boundary")), PathBuf::from("boundary_3857.geojson"));
    }
}
