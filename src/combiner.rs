use crate::composite::paste_over;
use crate::error::{LinelessError, LinelessResult};
use crate::grid::{Pixel, PixelGrid};
use crate::search::{DEFAULT_SEARCH_BUDGET, NearestSearch};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pixels with alpha at or above this are treated as paint.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 35;

/// Stroke alpha below this becomes 0 after recoloring, anything else 255.
pub const BINARIZE_CUTOFF: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombineOptions {
    /// Applied to both layers: a pixel is paintable when `alpha >= alpha_threshold`.
    pub alpha_threshold: u8,
    /// Maximum queue pops per nearest-color search.
    pub search_budget: usize,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            search_budget: DEFAULT_SEARCH_BUDGET,
        }
    }
}

impl CombineOptions {
    pub fn with_alpha_threshold(mut self, alpha_threshold: u8) -> Self {
        self.alpha_threshold = alpha_threshold;
        self
    }

    pub fn with_search_budget(mut self, search_budget: usize) -> Self {
        self.search_budget = search_budget;
        self
    }
}

#[inline]
pub fn binarize_alpha(alpha: u8) -> u8 {
    if alpha < BINARIZE_CUTOFF { 0 } else { 255 }
}

/// Counters from one recolor pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecolorStats {
    pub pixels: usize,
    /// Stroke pixels at or above the alpha threshold.
    pub searched: usize,
    /// Searched pixels that took a color from the color layer.
    pub recolored: usize,
    /// Searched pixels whose search ran out of budget or grid.
    pub exhausted: usize,
}

impl RecolorStats {
    fn merge(self, other: Self) -> Self {
        Self {
            pixels: self.pixels + other.pixels,
            searched: self.searched + other.searched,
            recolored: self.recolored + other.recolored,
            exhausted: self.exhausted + other.exhausted,
        }
    }
}

/// Owns a stroke layer and a color layer of identical size for one recolor pass.
///
/// `recolor` consumes the combiner: running the pass twice would binarize
/// already-binarized alpha and change which pixels get searched.
#[derive(Debug)]
pub struct StrokeColorCombiner {
    stroke: PixelGrid,
    color: PixelGrid,
    options: CombineOptions,
}

impl StrokeColorCombiner {
    pub fn new(
        stroke: PixelGrid,
        color: PixelGrid,
        options: CombineOptions,
    ) -> LinelessResult<Self> {
        if !stroke.dimensions_match(&color) {
            return Err(LinelessError::DimensionMismatch {
                stroke_width: stroke.width(),
                stroke_height: stroke.height(),
                color_width: color.width(),
                color_height: color.height(),
            });
        }
        if stroke.is_empty() {
            return Err(LinelessError::EmptyGrid);
        }
        Ok(Self {
            stroke,
            color,
            options,
        })
    }

    pub fn options(&self) -> &CombineOptions {
        &self.options
    }

    pub fn recolor(self) -> Recolored {
        self.recolor_with_progress(|_: usize| {})
    }

    /// Run the pass, calling `on_row` with each stroke row index once that row
    /// is finished. Rows may finish out of order when the `parallel` feature is on.
    #[tracing::instrument(
        skip_all,
        fields(
            width = self.stroke.width(),
            height = self.stroke.height(),
            alpha_threshold = self.options.alpha_threshold,
            search_budget = self.options.search_budget,
        )
    )]
    pub fn recolor_with_progress<F>(self, on_row: F) -> Recolored
    where
        F: Fn(usize) + Sync,
    {
        let Self {
            mut stroke,
            color,
            options,
        } = self;

        #[cfg(feature = "parallel")]
        let stats = recolor_parallel(&mut stroke, &color, &options, &on_row);
        #[cfg(not(feature = "parallel"))]
        let stats = recolor_sequential(&mut stroke, &color, &options, &on_row);

        tracing::debug!(?stats, "recolor pass finished");
        Recolored {
            stroke,
            color,
            stats,
        }
    }
}

#[cfg_attr(feature = "parallel", allow(dead_code))]
fn recolor_sequential<F>(
    stroke: &mut PixelGrid,
    color: &PixelGrid,
    options: &CombineOptions,
    on_row: &F,
) -> RecolorStats
where
    F: Fn(usize),
{
    let width = stroke.width() as usize;
    let mut search = NearestSearch::for_grid(color);
    let mut stats = RecolorStats::default();
    for (row, pixels) in stroke.pixels_mut().chunks_mut(width).enumerate() {
        stats = stats.merge(recolor_row(row, pixels, color, options, &mut search));
        on_row(row);
    }
    stats
}

#[cfg(feature = "parallel")]
fn recolor_parallel<F>(
    stroke: &mut PixelGrid,
    color: &PixelGrid,
    options: &CombineOptions,
    on_row: &F,
) -> RecolorStats
where
    F: Fn(usize) + Sync,
{
    let width = stroke.width() as usize;
    stroke
        .pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .map_init(
            || NearestSearch::for_grid(color),
            |search, (row, pixels)| {
                let stats = recolor_row(row, pixels, color, options, search);
                on_row(row);
                stats
            },
        )
        .reduce(RecolorStats::default, RecolorStats::merge)
}

fn recolor_row(
    row: usize,
    pixels: &mut [Pixel],
    color: &PixelGrid,
    options: &CombineOptions,
    search: &mut NearestSearch,
) -> RecolorStats {
    let threshold = options.alpha_threshold;
    let paintable = |p: &Pixel| p.a >= threshold;

    let mut stats = RecolorStats {
        pixels: pixels.len(),
        ..RecolorStats::default()
    };
    for (col, pixel) in pixels.iter_mut().enumerate() {
        // Binarization reads the alpha as decoded, before any write.
        let original_alpha = pixel.a;
        if paintable(&*pixel) {
            stats.searched += 1;
            match search
                .find(color, (row, col), &paintable, options.search_budget)
                .found
            {
                Some(at) => {
                    pixel.inherit_color(color[at]);
                    stats.recolored += 1;
                }
                None => stats.exhausted += 1,
            }
        }
        pixel.a = binarize_alpha(original_alpha);
    }
    stats
}

/// Result of a recolor pass: the recolored stroke next to the untouched color layer.
#[derive(Clone, Debug)]
pub struct Recolored {
    stroke: PixelGrid,
    color: PixelGrid,
    stats: RecolorStats,
}

impl Recolored {
    pub fn stroke(&self) -> &PixelGrid {
        &self.stroke
    }

    pub fn color(&self) -> &PixelGrid {
        &self.color
    }

    pub fn stats(&self) -> RecolorStats {
        self.stats
    }

    /// Color layer with the recolored stroke pasted on top.
    pub fn composite(&self) -> PixelGrid {
        paste_over(&self.color, &self.stroke)
    }

    pub fn stroke_and_composite(self) -> (PixelGrid, PixelGrid) {
        let composite = self.composite();
        (self.stroke, composite)
    }

    /// Color layer pasted over the recolored stroke on a transparent canvas.
    pub fn fill_over_stroke(&self) -> PixelGrid {
        let canvas = PixelGrid::new(self.stroke.width(), self.stroke.height());
        paste_over(&paste_over(&canvas, &self.stroke), &self.color)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const BLACK: Pixel = Pixel::new(0, 0, 0, 255);
    const RED: Pixel = Pixel::new(255, 0, 0, 255);

    fn recolor(stroke: PixelGrid, color: PixelGrid) -> Recolored {
        StrokeColorCombiner::new(stroke, color, CombineOptions::default())
            .unwrap()
            .recolor()
    }

    #[test]
    fn mismatched_layers_are_rejected_up_front() {
        for (sw, sh, cw, ch) in [(2, 2, 2, 3), (2, 2, 3, 2), (1, 5, 5, 1)] {
            let err = StrokeColorCombiner::new(
                PixelGrid::new(sw, sh),
                PixelGrid::new(cw, ch),
                CombineOptions::default(),
            )
            .unwrap_err();
            assert!(matches!(err, LinelessError::DimensionMismatch { .. }));
        }
    }

    #[test]
    fn empty_layers_are_rejected() {
        let err = StrokeColorCombiner::new(
            PixelGrid::new(0, 3),
            PixelGrid::new(0, 3),
            CombineOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LinelessError::EmptyGrid));
    }

    #[test]
    fn opaque_stroke_takes_color_from_opaque_fill() {
        let out = recolor(PixelGrid::filled(2, 2, BLACK), PixelGrid::filled(2, 2, RED));
        assert!(out.stroke().pixels().iter().all(|&p| p == RED));
        assert_eq!(
            out.stats(),
            RecolorStats {
                pixels: 4,
                searched: 4,
                recolored: 4,
                exhausted: 0
            }
        );
    }

    #[test]
    fn transparent_fill_leaves_stroke_color_alone() {
        let out = recolor(PixelGrid::filled(2, 2, BLACK), PixelGrid::new(2, 2));
        assert!(out.stroke().pixels().iter().all(|&p| p == BLACK));
        assert_eq!(out.stats().exhausted, 4);
    }

    #[test]
    fn faint_pixels_are_searched_only_above_threshold() {
        let mut stroke = PixelGrid::new(2, 1);
        stroke[(0, 0)] = Pixel::new(0, 0, 0, 50);
        stroke[(0, 1)] = Pixel::new(7, 8, 9, 10);
        let out = recolor(stroke, PixelGrid::filled(2, 1, RED));

        assert_eq!(out.stroke()[(0, 0)], Pixel::new(255, 0, 0, 0));
        assert_eq!(out.stroke()[(0, 1)], Pixel::new(7, 8, 9, 0));
        assert_eq!(out.stats().searched, 1);
    }

    #[test]
    fn below_threshold_rgb_is_untouched_for_any_threshold() {
        let mut stroke = PixelGrid::new(4, 1);
        for (col, a) in [0u8, 20, 34, 99].into_iter().enumerate() {
            stroke[(0, col)] = Pixel::new(col as u8, 2, 3, a);
        }
        let options = CombineOptions::default().with_alpha_threshold(100);
        let out = StrokeColorCombiner::new(stroke.clone(), PixelGrid::filled(4, 1, RED), options)
            .unwrap()
            .recolor();
        for col in 0..4 {
            let before = stroke[(0, col)];
            let after = out.stroke()[(0, col)];
            assert_eq!((after.r, after.g, after.b), (before.r, before.g, before.b));
            assert_eq!(after.a, 0);
        }
    }

    #[test]
    fn color_threshold_matches_stroke_threshold() {
        // The fill pixel under the stroke is too faint; the next one is not.
        let mut color = PixelGrid::new(2, 1);
        color[(0, 0)] = Pixel::new(0, 255, 0, 34);
        color[(0, 1)] = Pixel::new(0, 0, 255, 35);
        let mut stroke = PixelGrid::new(2, 1);
        stroke[(0, 0)] = BLACK;
        let out = recolor(stroke, color);
        assert_eq!(out.stroke()[(0, 0)], Pixel::new(0, 0, 255, 255));
    }

    #[test]
    fn tiny_budget_counts_as_exhausted() {
        let mut color = PixelGrid::new(3, 1);
        color[(0, 2)] = RED;
        let mut stroke = PixelGrid::new(3, 1);
        stroke[(0, 0)] = BLACK;
        let options = CombineOptions::default().with_search_budget(1);
        let out = StrokeColorCombiner::new(stroke, color, options)
            .unwrap()
            .recolor();
        assert_eq!(out.stroke()[(0, 0)], BLACK);
        assert_eq!(out.stats().exhausted, 1);
    }

    #[test]
    fn binarized_alpha_is_stable() {
        for a in 0..=255u8 {
            let once = binarize_alpha(a);
            assert!(once == 0 || once == 255);
            assert_eq!(binarize_alpha(once), once);
        }
        assert_eq!(binarize_alpha(99), 0);
        assert_eq!(binarize_alpha(100), 255);
    }

    #[test]
    fn composite_puts_stroke_over_fill() {
        let mut stroke = PixelGrid::new(2, 1);
        stroke[(0, 0)] = BLACK;
        let mut color = PixelGrid::new(2, 1);
        color[(0, 0)] = Pixel::new(0, 0, 255, 255);
        color[(0, 1)] = Pixel::new(0, 255, 0, 255);
        let (stroke, composite) = recolor(stroke, color).stroke_and_composite();

        assert_eq!(stroke[(0, 0)], Pixel::new(0, 0, 255, 255));
        assert_eq!(composite[(0, 0)], Pixel::new(0, 0, 255, 255));
        assert_eq!(composite[(0, 1)], Pixel::new(0, 255, 0, 255));
    }

    #[test]
    fn fill_over_stroke_keeps_stroke_only_where_fill_is_empty() {
        let stroke = PixelGrid::filled(3, 1, BLACK);
        let mut color = PixelGrid::new(3, 1);
        color[(0, 0)] = RED;
        let out = recolor(stroke, color);
        let fill = out.fill_over_stroke();
        assert!(fill.pixels().iter().all(|&p| p == RED));

        let mut stroke = PixelGrid::new(2, 1);
        stroke[(0, 0)] = Pixel::new(1, 2, 3, 20);
        let out = recolor(stroke, PixelGrid::new(2, 1));
        assert_eq!(out.fill_over_stroke()[(0, 0)], Pixel::TRANSPARENT);
    }

    #[test]
    fn progress_sees_every_row_once() {
        let rows = AtomicUsize::new(0);
        let combiner = StrokeColorCombiner::new(
            PixelGrid::filled(3, 7, BLACK),
            PixelGrid::filled(3, 7, RED),
            CombineOptions::default(),
        )
        .unwrap();
        combiner.recolor_with_progress(|_| {
            rows.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(rows.load(Ordering::Relaxed), 7);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_pass_matches_sequential_pass() {
        let (w, h) = (23, 17);
        let mut stroke = PixelGrid::new(w, h);
        let mut color = PixelGrid::new(w, h);
        for row in 0..h as usize {
            for col in 0..w as usize {
                let seed = (row * 31 + col * 17) % 256;
                stroke[(row, col)] = Pixel::new(0, 0, 0, ((seed * 7) % 256) as u8);
                if seed % 5 == 0 {
                    color[(row, col)] = Pixel::new(seed as u8, 255 - seed as u8, 9, 255);
                }
            }
        }
        let options = CombineOptions::default().with_search_budget(200);

        let mut expected = stroke.clone();
        let stats = recolor_sequential(&mut expected, &color, &options, &|_: usize| {});
        let out = StrokeColorCombiner::new(stroke, color, options)
            .unwrap()
            .recolor();

        assert_eq!(out.stroke(), &expected);
        assert_eq!(out.stats(), stats);
    }
}
