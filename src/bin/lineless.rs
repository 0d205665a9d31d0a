use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use lineless::export::ExportPlan;
use lineless::{
    Artifacts, CombineOptions, DEFAULT_ALPHA_THRESHOLD, DEFAULT_SEARCH_BUDGET,
    StrokeColorCombiner, codec, parse_background,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Recolor line art with the nearest fill color and write lineless art.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Stroke (line-art) layer
    stroke: PathBuf,

    /// Color (fill) layer, same size as the stroke layer
    color: PathBuf,

    /// Minimum alpha for a pixel to count as paint, on both layers
    #[arg(short, long, default_value_t = DEFAULT_ALPHA_THRESHOLD)]
    alpha_threshold: u8,

    /// Maximum queue pops per nearest-color search
    #[arg(short = 'b', long, default_value_t = DEFAULT_SEARCH_BUDGET)]
    search_budget: usize,

    /// Output directory, created if missing
    #[arg(short = 'd', long, default_value = "export")]
    out_dir: PathBuf,

    /// Output file prefix: <prefix>ST.png, <prefix>FC.png, <prefix>.png
    #[arg(short, long, default_value = "export")]
    prefix: String,

    /// Flatten the final image onto this hex color (e.g. #2c4464)
    #[arg(long)]
    background: Option<String>,

    /// Worker threads for the recolor pass (defaults to one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Print a JSON run summary on stdout
    #[arg(long)]
    json: bool,
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool> {
    if threads == Some(0) {
        bail!("--threads must be >= 1 when set");
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().context("failed to build rayon thread pool")
}

fn secs(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lineless=info,lineless_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let background = args
        .background
        .as_deref()
        .map(parse_background)
        .transpose()?;
    let options = CombineOptions::default()
        .with_alpha_threshold(args.alpha_threshold)
        .with_search_budget(args.search_budget);
    let pool = build_thread_pool(args.threads)?;
    let total = Instant::now();

    let started = Instant::now();
    let stroke = codec::open(&args.stroke).context("loading stroke layer")?;
    let color = codec::open(&args.color).context("loading color layer")?;
    let (width, height) = stroke.dimensions();
    let load_secs = secs(started);
    tracing::info!(width, height, seconds = load_secs, "layers loaded");

    let combiner = StrokeColorCombiner::new(stroke, color, options).context("combining layers")?;

    let started = Instant::now();
    let rows_done = AtomicUsize::new(0);
    let recolored = pool.install(|| {
        combiner.recolor_with_progress(|_| {
            let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
            if done % 64 == 0 || done == height as usize {
                tracing::debug!(done, height, "rows recolored");
            }
        })
    });
    let stats = recolored.stats();
    let recolor_secs = secs(started);
    tracing::info!(
        searched = stats.searched,
        recolored = stats.recolored,
        exhausted = stats.exhausted,
        seconds = recolor_secs,
        "stroke recolored"
    );

    let started = Instant::now();
    let artifacts = Artifacts::from_recolored(recolored, background);
    let composite_secs = secs(started);
    tracing::info!(seconds = composite_secs, "layers composited");

    let started = Instant::now();
    let plan = ExportPlan {
        out_dir: args.out_dir.clone(),
        prefix: args.prefix.clone(),
    };
    let written = plan.write(&artifacts).context("writing artifacts")?;
    let export_secs = secs(started);
    tracing::info!(seconds = export_secs, total = secs(total), "done");

    if args.json {
        let summary = serde_json::json!({
            "width": width,
            "height": height,
            "alpha_threshold": options.alpha_threshold,
            "search_budget": options.search_budget,
            "stats": {
                "pixels": stats.pixels,
                "searched": stats.searched,
                "recolored": stats.recolored,
                "exhausted": stats.exhausted,
            },
            "outputs": {
                "stroke": written.stroke.display().to_string(),
                "fill": written.fill.display().to_string(),
                "lineless": written.lineless.display().to_string(),
            },
            "seconds": {
                "load": load_secs,
                "recolor": recolor_secs,
                "composite": composite_secs,
                "export": export_secs,
            },
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Saved → {}", written.lineless.display());
    }

    Ok(())
}
