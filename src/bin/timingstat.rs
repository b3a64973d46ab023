//! Offline statistics for a saved timing file.
//!
//! Replays the recorded gaps through the same running statistics as the live
//! measurement and adds distribution figures that only make sense once the
//! whole run is known.

use anyhow::{Context, Result};
use clap::Parser;
use mjpeg_jitter::stats::RunningStats;
use mjpeg_jitter::timing;
use mjpeg_jitter::JitterError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarize a frame timing file", long_about = None)]
struct Args {
    /// Timing file written by mjpeg-jitter --timing-file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Print the summary as a single JSON line
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    let gaps = timing::read_timing_file(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let mut stats = RunningStats::new();
    for gap in &gaps {
        stats.record(*gap, 0);
    }

    let summary = match stats.summary() {
        Ok(s) => s,
        Err(e @ (JitterError::NoFramesObserved | JitterError::NoElapsedTime(_))) => {
            println!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    let mut sorted = gaps.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mean = stats.mean_gap().unwrap_or_default();
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;

    println!("{}", summary);
    println!("Statistics ({} gaps, {:.3}s total):", gaps.len(), summary.duration_secs);
    println!("  Min gap:    {:.4} s", sorted[0]);
    println!("  Max gap:    {:.4} s", sorted[sorted.len() - 1]);
    println!("  Median gap: {:.4} s", sorted[sorted.len() / 2]);
    println!("  Mean gap:   {:.4} s", mean);
    println!("  Std dev:    {:.4} s", variance.sqrt());

    Ok(())
}
