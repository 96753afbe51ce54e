//! Grayscale raster persistence, one byte per cell.

use std::path::Path;

use image::{ColorType, ImageResult};

use super::map::GridData;
use crate::error::{MapError, Result};

pub(super) fn write_raster(raster: &GridData<u8>, path: &Path) -> Result<()> {
    let geometry = || MapError::InvalidGeometry {
        width: raster.width(),
        height: raster.height(),
    };
    let width = u32::try_from(raster.width()).map_err(|_| geometry())?;
    let height = u32::try_from(raster.height()).map_err(|_| geometry())?;

    image::save_buffer(path, raster.as_slice(), width, height, ColorType::L8)?;
    Ok(())
}

pub(super) fn read_raster(path: &Path) -> ImageResult<GridData<u8>> {
    let image = image::open(path)?.into_luma8();
    let (width, height) = image.dimensions();

    Ok(GridData::from_raw(
        width as usize,
        height as usize,
        image.into_raw(),
    ))
}
