//! Lineless art: recolor every line-art pixel with the nearest fill color,
//! harden its alpha, and paste the result back over the fill layer.

use js_sys::{Object, Reflect, Uint8Array};
use palette::Srgb;
use wasm_bindgen::prelude::*;

pub mod codec;
pub mod combiner;
pub mod composite;
pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod export;
pub mod grid;
pub mod search;

pub use combiner::{
    BINARIZE_CUTOFF, CombineOptions, DEFAULT_ALPHA_THRESHOLD, RecolorStats, Recolored,
    StrokeColorCombiner, binarize_alpha,
};
pub use composite::{composite, flatten_on_color, parse_background};
pub use error::{LinelessError, LinelessResult};
pub use grid::{Pixel, PixelGrid};
pub use search::{DEFAULT_SEARCH_BUDGET, NearestSearch, SearchOutcome, find_nearest};

/// The three images one run produces.
#[derive(Clone, Debug)]
pub struct Artifacts {
    /// Recolored stroke layer with binarized alpha.
    pub stroke: PixelGrid,
    /// Fill layer pasted over the recolored stroke on a transparent canvas.
    pub fill: PixelGrid,
    /// Recolored stroke pasted over the fill layer, flattened onto the
    /// background color when one was given.
    pub lineless: PixelGrid,
    pub stats: RecolorStats,
}

impl Artifacts {
    pub fn from_recolored(recolored: Recolored, background: Option<Srgb<u8>>) -> Self {
        let stats = recolored.stats();
        let fill = recolored.fill_over_stroke();
        let (stroke, composite) = recolored.stroke_and_composite();
        let lineless = match background {
            Some(bg) => flatten_on_color(&composite, bg),
            None => composite,
        };
        Self {
            stroke,
            fill,
            lineless,
            stats,
        }
    }
}

// ------------------------------------------------------------
// Pipeline
// ------------------------------------------------------------

/// Run the whole transform on decoded layers.
#[tracing::instrument(skip(stroke, color), fields(width = stroke.width(), height = stroke.height()))]
pub fn render_lineless(
    stroke: PixelGrid,
    color: PixelGrid,
    options: CombineOptions,
    background: Option<Srgb<u8>>,
) -> LinelessResult<Artifacts> {
    let recolored = StrokeColorCombiner::new(stroke, color, options)?.recolor();
    let stats = recolored.stats();
    tracing::info!(
        searched = stats.searched,
        recolored = stats.recolored,
        exhausted = stats.exhausted,
        "stroke recolored"
    );

    Ok(Artifacts::from_recolored(recolored, background))
}

/// PNG-encoded [`Artifacts`].
#[derive(Clone, Debug)]
pub struct LinelessPngs {
    pub stroke: Vec<u8>,
    pub fill: Vec<u8>,
    pub lineless: Vec<u8>,
    pub stats: RecolorStats,
}

/// Decode both layers from encoded image bytes, run the transform and
/// PNG-encode the three results.
pub fn make_lineless_bytes(
    stroke: &[u8],
    color: &[u8],
    options: CombineOptions,
    background: Option<Srgb<u8>>,
) -> LinelessResult<LinelessPngs> {
    let stroke = codec::decode(stroke)?;
    let color = codec::decode(color)?;
    let artifacts = render_lineless(stroke, color, options, background)?;

    Ok(LinelessPngs {
        stroke: codec::encode_png(&artifacts.stroke)?,
        fill: codec::encode_png(&artifacts.fill)?,
        lineless: codec::encode_png(&artifacts.lineless)?,
        stats: artifacts.stats,
    })
}

// ------------------------------------------------------------
// JavaScript entry point
// ------------------------------------------------------------

fn js_error(e: LinelessError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Build lineless art from a stroke image and a color image (any format the
/// `image` crate decodes).
///
/// Returns `{ stroke, fill, lineless, stats }` where the first three are
/// PNG-encoded `Uint8Array`s and `stats` holds the recolor counters.
#[wasm_bindgen]
pub fn make_lineless(
    stroke: Vec<u8>,
    color: Vec<u8>,
    alpha_threshold: Option<u8>,
    search_budget: Option<u32>,
    background: Option<String>,
) -> Result<Object, JsValue> {
    let mut options = CombineOptions::default();
    if let Some(threshold) = alpha_threshold {
        options = options.with_alpha_threshold(threshold);
    }
    if let Some(budget) = search_budget {
        options = options.with_search_budget(budget as usize);
    }
    let background = background
        .as_deref()
        .map(parse_background)
        .transpose()
        .map_err(js_error)?;

    let pngs = make_lineless_bytes(&stroke, &color, options, background).map_err(js_error)?;

    let stats = Object::new();
    for (key, value) in [
        ("pixels", pngs.stats.pixels),
        ("searched", pngs.stats.searched),
        ("recolored", pngs.stats.recolored),
        ("exhausted", pngs.stats.exhausted),
    ] {
        Reflect::set(&stats, &JsValue::from_str(key), &JsValue::from_f64(value as f64))?;
    }

    let result = Object::new();
    Reflect::set(
        &result,
        &JsValue::from_str("stroke"),
        &Uint8Array::from(pngs.stroke.as_slice()),
    )?;
    Reflect::set(
        &result,
        &JsValue::from_str("fill"),
        &Uint8Array::from(pngs.fill.as_slice()),
    )?;
    Reflect::set(
        &result,
        &JsValue::from_str("lineless"),
        &Uint8Array::from(pngs.lineless.as_slice()),
    )?;
    Reflect::set(&result, &JsValue::from_str("stats"), &stats)?;

    Ok(result)
}
