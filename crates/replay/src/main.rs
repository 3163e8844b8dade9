//! Sleep Detection Replay - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dms::{DmsConfig, SleepDetector};
use dms_replay::{init_logging, run_replay, ReplayOptions};
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "dms-replay",
    version,
    about = "Replay recorded face landmarks through the sleep detector"
)]
struct Cli {
    /// JSON-lines landmark recording, `-` for stdin
    input: String,

    /// Detector config file (TOML, YAML or JSON); `DMS__*` env vars override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Suppress per-frame status lines
    #[arg(long)]
    quiet: bool,

    /// Session queue capacity
    #[arg(long, default_value_t = 64)]
    queue: usize,

    /// Recording frame rate, used only to report the threshold as a duration
    #[arg(long)]
    fps: Option<f32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    info!("=== Sleep Detection Replay v{} ===", env!("CARGO_PKG_VERSION"));

    let config = DmsConfig::load(cli.config.as_deref())?;
    if let Some(duration) = cli.fps.and_then(|fps| config.threshold_duration_at(fps)) {
        info!(
            "Sleep threshold of {} frames spans {:.2}s at {} fps",
            config.threshold_frames,
            duration.as_secs_f32(),
            cli.fps.unwrap_or_default()
        );
    }
    let detector = SleepDetector::new(config)?;

    let options = ReplayOptions {
        queue_capacity: cli.queue,
        echo: !cli.quiet,
    };

    let (summary, _) = if cli.input == "-" {
        run_replay(BufReader::new(tokio::io::stdin()), detector, &options).await?
    } else {
        let file = tokio::fs::File::open(&cli.input)
            .await
            .with_context(|| format!("Failed to open {}", cli.input))?;
        run_replay(BufReader::new(file), detector, &options).await?
    };

    info!(
        "Replayed {} frames: {} open, {} closed, {} sleeping",
        summary.frames, summary.eye_open, summary.eye_close, summary.sleep
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
