//! Score a recorded clip of still frames with the dynamic sign model.
//!
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::TimestampPrecision;
use image::RgbImage;
use sign_server::{
    clip::{ClipPreprocessor, DEFAULT_CLIP_LEN, DEFAULT_CLIP_SIZE},
    labels::LabelVocab,
    nn::{DynamicRunner, DEFAULT_MIN_FRAMES, DEFAULT_TOP_K},
    utils::ensure_weights,
};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Path to the ONNX weights of the dynamic sign model
    #[clap(long, default_value = "models/sign_dynamic.onnx")]
    weights: PathBuf,

    /// Optional URL to fetch the weights from when missing
    #[clap(long)]
    weights_url: Option<String>,

    /// Path to the class label list (one "<index> <label>" per line)
    #[clap(long, default_value = "models/sign_class_list.txt")]
    labels: PathBuf,

    /// Restrict the vocabulary to indices below this cutoff
    #[clap(long)]
    num_classes: Option<usize>,

    /// Directory holding the clip's frames as image files
    #[clap(long)]
    frames_dir: PathBuf,

    /// How many ranked predictions to print
    #[clap(long, default_value_t = DEFAULT_TOP_K)]
    topk: usize,

    /// Reject clips with fewer frames than this
    #[clap(long, default_value_t = DEFAULT_MIN_FRAMES)]
    min_frames: usize,

    /// Number of frames fed to the model after temporal shaping
    #[clap(long, default_value_t = DEFAULT_CLIP_LEN)]
    clip_len: usize,

    /// Optional allowlist of labels to score against
    #[clap(long)]
    allow: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    ensure_weights(&args.weights, args.weights_url.as_deref()).await?;

    let vocab = LabelVocab::load(&args.labels, args.num_classes)?;
    log::info!("Vocabulary holds {} classes", vocab.len());

    let preproc = ClipPreprocessor::new(DEFAULT_CLIP_SIZE, args.clip_len);
    let runner = DynamicRunner::load(&args.weights, vocab, preproc, args.min_frames, args.topk)?;

    let frames = load_frames(&args.frames_dir)?;
    log::info!("Scoring {} frames from {}", frames.len(), args.frames_dir.display());

    let allow = (!args.allow.is_empty()).then_some(args.allow.as_slice());
    let ranked = runner.predict(&frames, allow)?;

    println!(
        "Used {} of {} recorded frames",
        ranked.used_frames, ranked.raw_frames
    );
    for (rank, scored) in ranked.top.iter().enumerate() {
        println!("{:>2}. {} ({:.2})", rank + 1, scored.label, scored.score);
    }

    Ok(())
}

/// Read every image in the directory, sorted by filename, as RGB.
fn load_frames(dir: &Path) -> Result<Vec<RgbImage>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading frames dir {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        match image::open(&path) {
            Ok(img) => frames.push(img.to_rgb8()),
            Err(e) => log::warn!("Skipping {}: {e}", path.display()),
        }
    }

    if frames.is_empty() {
        bail!("no readable frames in {}", dir.display());
    }
    Ok(frames)
}
