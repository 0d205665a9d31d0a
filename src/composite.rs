use palette::Srgb;

use crate::error::{LinelessError, LinelessResult};
use crate::grid::{Pixel, PixelGrid};

/// Alpha-mask paste: each output pixel is the overlay pixel where the overlay
/// has any alpha, otherwise the base pixel.
pub fn composite(base: &PixelGrid, overlay: &PixelGrid) -> LinelessResult<PixelGrid> {
    if !base.dimensions_match(overlay) {
        return Err(LinelessError::SizeMismatch {
            base_width: base.width(),
            base_height: base.height(),
            overlay_width: overlay.width(),
            overlay_height: overlay.height(),
        });
    }

    Ok(paste_over(base, overlay))
}

/// [`composite`] for grids already known to share dimensions.
pub(crate) fn paste_over(base: &PixelGrid, overlay: &PixelGrid) -> PixelGrid {
    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().iter_mut().zip(overlay.pixels()) {
        if src.a > 0 {
            *dst = *src;
        }
    }
    out
}

/// Paste `image` onto an opaque canvas of `background`.
///
/// Pixels with any alpha keep their color and become opaque; fully
/// transparent pixels show the background.
pub fn flatten_on_color(image: &PixelGrid, background: Srgb<u8>) -> PixelGrid {
    let canvas = Pixel::new(background.red, background.green, background.blue, 255);
    let mut out = PixelGrid::filled(image.width(), image.height(), canvas);
    for (dst, src) in out.pixels_mut().iter_mut().zip(image.pixels()) {
        if src.a > 0 {
            *dst = Pixel { a: 255, ..*src };
        }
    }
    out
}

/// Parse `#rrggbb`, `rrggbb` or `#rgb`.
pub fn parse_background(s: &str) -> LinelessResult<Srgb<u8>> {
    let trimmed = s.trim();
    trimmed
        .parse::<Srgb<u8>>()
        .map_err(|e| LinelessError::invalid_color(format!("{trimmed:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: u32, pixels: &[Pixel]) -> PixelGrid {
        let raw = pixels.iter().flat_map(|&p| <[u8; 4]>::from(p)).collect();
        PixelGrid::from_rgba(width, pixels.len() as u32 / width, raw).unwrap()
    }

    #[test]
    fn overlay_wins_wherever_it_has_alpha() {
        let base = grid(
            2,
            &[
                Pixel::new(1, 1, 1, 255),
                Pixel::new(2, 2, 2, 255),
                Pixel::new(3, 3, 3, 0),
                Pixel::new(4, 4, 4, 10),
            ],
        );
        let overlay = grid(
            2,
            &[
                Pixel::new(9, 0, 0, 255),
                Pixel::new(9, 0, 0, 0),
                Pixel::new(9, 0, 0, 1),
                Pixel::new(9, 0, 0, 0),
            ],
        );
        let out = composite(&base, &overlay).unwrap();
        for (i, (o, (b, v))) in out
            .pixels()
            .iter()
            .zip(base.pixels().iter().zip(overlay.pixels()))
            .enumerate()
        {
            let expected = if v.a > 0 { v } else { b };
            assert_eq!(o, expected, "pixel {i}");
        }
    }

    #[test]
    fn composite_rejects_mismatched_sizes() {
        let err = composite(&PixelGrid::new(2, 2), &PixelGrid::new(2, 3)).unwrap_err();
        assert!(matches!(
            err,
            LinelessError::SizeMismatch {
                base_width: 2,
                base_height: 2,
                overlay_width: 2,
                overlay_height: 3,
            }
        ));
    }

    #[test]
    fn flatten_fills_transparent_pixels_with_background() {
        let image = grid(2, &[Pixel::new(10, 20, 30, 0), Pixel::new(10, 20, 30, 128)]);
        let out = flatten_on_color(&image, Srgb::new(0x2c, 0x44, 0x64));
        assert_eq!(out[(0, 0)], Pixel::new(0x2c, 0x44, 0x64, 255));
        assert_eq!(out[(0, 1)], Pixel::new(10, 20, 30, 255));
    }

    #[test]
    fn parse_background_accepts_hex_forms() {
        assert_eq!(parse_background("#2c4464").unwrap(), Srgb::new(0x2c, 0x44, 0x64));
        assert_eq!(parse_background("FFFFFF").unwrap(), Srgb::new(255, 255, 255));
        assert_eq!(parse_background(" #f00 ").unwrap(), Srgb::new(255, 0, 0));
    }

    #[test]
    fn parse_background_rejects_garbage() {
        let err = parse_background("#zz0000").unwrap_err();
        assert!(matches!(err, LinelessError::InvalidColor(_)));
    }
}
