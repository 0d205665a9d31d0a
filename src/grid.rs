use std::ops::{Index, IndexMut};

use image::{Rgba, RgbaImage};

use crate::error::{LinelessError, LinelessResult};

/// One straight (non-premultiplied) 8-bit RGBA pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Take the color channels of `other`; alpha stays as it is.
    #[inline]
    pub fn inherit_color(&mut self, other: Pixel) {
        self.r = other.r;
        self.g = other.g;
        self.b = other.b;
    }
}

impl From<[u8; 4]> for Pixel {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Pixel> for [u8; 4] {
    fn from(p: Pixel) -> Self {
        [p.r, p.g, p.b, p.a]
    }
}

/// Row-major rectangle of pixels. Dimensions are fixed at construction;
/// only channel values change afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl PixelGrid {
    /// Fully transparent grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Pixel::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; width as usize * height as usize],
        }
    }

    /// Build a grid from a flat RGBA8 buffer (`width * height * 4` bytes, no premultiplication).
    pub fn from_rgba(width: u32, height: u32, raw: Vec<u8>) -> LinelessResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| LinelessError::decode(format!("{width}x{height} is too large")))?;
        if raw.len() != expected {
            return Err(LinelessError::decode(format!(
                "expected {expected} bytes for a {width}x{height} rgba8 buffer, got {}",
                raw.len()
            )));
        }

        let pixels = raw
            .chunks_exact(4)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_image(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image.pixels().map(|p| Pixel::from(p.0)).collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Flat RGBA8 buffer in row-major order; inverse of [`PixelGrid::from_rgba`].
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            raw.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }
        raw
    }

    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba(self[(y as usize, x as usize)].into())
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// True when both grids have the same width and the same height.
    pub fn dimensions_match(&self, other: &PixelGrid) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.height as usize && col < self.width as usize)
            .then(|| row * self.width as usize + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Pixel> {
        self.offset(row, col).map(|i| &self.pixels[i])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Pixel> {
        self.offset(row, col).map(|i| &mut self.pixels[i])
    }

    pub fn row(&self, row: usize) -> &[Pixel] {
        let w = self.width as usize;
        &self.pixels[row * w..(row + 1) * w]
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }
}

impl Index<(usize, usize)> for PixelGrid {
    type Output = Pixel;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &Pixel {
        match self.offset(row, col) {
            Some(i) => &self.pixels[i],
            None => out_of_bounds(row, col, self.width, self.height),
        }
    }
}

impl IndexMut<(usize, usize)> for PixelGrid {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Pixel {
        match self.offset(row, col) {
            Some(i) => &mut self.pixels[i],
            None => out_of_bounds(row, col, self.width, self.height),
        }
    }
}

#[cold]
#[track_caller]
fn out_of_bounds(row: usize, col: usize, width: u32, height: u32) -> ! {
    panic!("pixel (row {row}, col {col}) is out of bounds for a {width}x{height} grid")
}
