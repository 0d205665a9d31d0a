use std::io::Cursor;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use image::ImageFormat;

use crate::error::{LinelessError, LinelessResult};
use crate::grid::PixelGrid;

/// Decode any format `image` understands into a straight-alpha RGBA grid.
pub fn decode(bytes: &[u8]) -> LinelessResult<PixelGrid> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| LinelessError::decode(format!("unable to decode image: {e}")))?;
    grid_from_dynamic(img)
}

fn grid_from_dynamic(img: image::DynamicImage) -> LinelessResult<PixelGrid> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(LinelessError::decode(format!(
            "image has no pixels ({width}x{height})"
        )));
    }
    Ok(PixelGrid::from_image(&rgba))
}

pub fn encode_png(grid: &PixelGrid) -> LinelessResult<Vec<u8>> {
    let mut buf = Vec::new();
    grid.to_image()
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| LinelessError::encode(format!("PNG encode error: {e}")))?;
    Ok(buf)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn open(path: &Path) -> LinelessResult<PixelGrid> {
    let img = image::open(path)
        .map_err(|e| LinelessError::decode(format!("{}: {e}", path.display())))?;
    grid_from_dynamic(img)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn save_png(path: &Path, grid: &PixelGrid) -> LinelessResult<()> {
    let png = encode_png(grid)?;
    std::fs::write(path, png)?;
    Ok(())
}
