//! Main Program for Stepreveal
//! Run with `--help` for more instruction

// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stepreveal::collab::{FileImageLoader, FixedSteps, ImageLoader, PngWallpaperSink, WallpaperSink};
use stepreveal::cycle::{CycleConfig, CycleOutcome, UpdateCycle};
use stepreveal::photo::StaticPhotoSource;
use stepreveal::store::JsonFileStore;
use stepreveal::RevealEngine;

#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one revealed image
    Reveal(RevealArgs),
    /// Run the daily fetch and step check against a state file
    Cycle(CycleArgs),
    /// Print the reveal order of a seed
    Order(OrderArgs),
}

#[derive(Args, Debug)]
struct MaskArgs {
    /// Mask width in cells
    #[arg(long, default_value_t = 144)]
    mask_width: usize,

    /// Mask height in cells
    #[arg(long, default_value_t = 256)]
    mask_height: usize,
}

impl MaskArgs {
    fn engine(&self) -> Result<RevealEngine, Error> {
        Ok(RevealEngine::builder()
            .mask_size(self.mask_width, self.mask_height)
            .build()?)
    }
}

#[derive(Args, Debug)]
struct RevealArgs {
    /// Input file
    input: PathBuf,

    /// Progress, clamped to 0..=1
    #[arg(short = 'p', long, allow_negative_numbers = true)]
    progress: f32,

    /// Random seed
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    seed: i64,

    #[command(flatten)]
    mask: MaskArgs,

    /// Output file
    #[arg(short = 'o', long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct CycleArgs {
    /// State file
    #[arg(long)]
    state: PathBuf,

    /// Candidate image paths or file:// URLs for new days
    #[arg(long = "image-url", required = true)]
    image_urls: Vec<String>,

    /// Raw since-boot step counter
    #[arg(long, conflicts_with = "steps_today")]
    raw_steps: Option<f64>,

    /// Steps already counted today
    #[arg(long)]
    steps_today: Option<u64>,

    /// JSON cycle config; the flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Steps for a full reveal [default: 10000]
    #[arg(long)]
    goal: Option<u64>,

    /// Step change needed before re-rendering [default: 100]
    #[arg(long)]
    min_delta: Option<u64>,

    /// Local offset from UTC in minutes [default: 0]
    #[arg(long, allow_negative_numbers = true)]
    utc_offset: Option<i32>,

    /// Current time in Unix milliseconds (defaults to now)
    #[arg(long)]
    now_ms: Option<i64>,

    /// Render even if steps barely moved
    #[arg(long)]
    force: bool,

    #[command(flatten)]
    mask: MaskArgs,

    /// Wallpaper output file
    #[arg(short = 'o', long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct OrderArgs {
    /// Random seed
    #[arg(long, allow_negative_numbers = true)]
    seed: i64,

    /// Number of cells to print
    #[arg(long, default_value_t = 16)]
    limit: usize,

    #[command(flatten)]
    mask: MaskArgs,
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().cmd {
        Command::Reveal(args) => cmd_reveal(args),
        Command::Cycle(args) => cmd_cycle(args),
        Command::Order(args) => cmd_order(args),
    }
}

fn cmd_reveal(args: RevealArgs) -> Result<(), Error> {
    let engine = args.mask.engine()?;

    let input = args
        .input
        .to_str()
        .with_context(|| format!("non-utf8 path '{}'", args.input.display()))?;
    let im = FileImageLoader.load(input)?;

    let out = engine.generate_revealed_image(&im, args.progress, args.seed)?;
    PngWallpaperSink::new(&args.output).set_wallpaper(&out)?;

    eprintln!("wrote {}", args.output.display());
    Ok(())
}

fn cmd_cycle(args: CycleArgs) -> Result<(), Error> {
    let engine = args.mask.engine()?;
    let store = JsonFileStore::new(args.state);
    let mut config = match &args.config {
        Some(path) => CycleConfig::from_json_file(path)?,
        None => CycleConfig::default(),
    };
    if let Some(goal) = args.goal {
        config.step_goal = goal;
    }
    if let Some(delta) = args.min_delta {
        config.min_step_delta = delta;
    }
    if let Some(offset) = args.utc_offset {
        config.utc_offset_minutes = offset;
    }

    let steps = match (args.raw_steps, args.steps_today) {
        (Some(raw), _) => FixedSteps::Raw(raw),
        (None, Some(n)) => FixedSteps::Today(n),
        (None, None) => FixedSteps::Unavailable,
    };
    let photos = StaticPhotoSource::new(args.image_urls);
    let now_ms = args
        .now_ms
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    let outcome = UpdateCycle::new(&engine, &store, config).run(
        now_ms,
        &photos,
        &steps,
        &FileImageLoader,
        &PngWallpaperSink::new(args.output),
        args.force,
    );

    match outcome {
        CycleOutcome::Updated { steps } => eprintln!("wallpaper updated at {steps} steps"),
        CycleOutcome::NewDay => eprintln!("new day started"),
        CycleOutcome::Skipped(why) => eprintln!("skipped: {why}"),
        CycleOutcome::Retry(why) => anyhow::bail!("retry later: {why}"),
        CycleOutcome::Failed(why) => anyhow::bail!("failed: {why}"),
    }
    Ok(())
}

fn cmd_order(args: OrderArgs) -> Result<(), Error> {
    let engine = args.mask.engine()?;
    for (i, (x, y)) in engine.shuffled_order(args.seed).iter().take(args.limit).enumerate() {
        println!("{i}\t{x}\t{y}");
    }
    Ok(())
}
