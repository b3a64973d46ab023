use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info};
use mjpeg_jitter::analyzer::{Analyzer, RunOutcome};
use mjpeg_jitter::clock::MonotonicClock;
use mjpeg_jitter::config::{self, Config};
use mjpeg_jitter::demux::Demultiplexer;
use mjpeg_jitter::feed::{self, FrameFeed};
use mjpeg_jitter::{http, multipart};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Measure fps and jitter of an MJPEG-Stream", long_about = None)]
struct Args {
    /// The http(s) url to read the mjpeg-stream from
    url: String,

    /// Save timings in a file which can be used to replay the mjpeg-stream
    #[arg(short, long, value_name = "FILE")]
    timing_file: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long)]
    verbose: bool,

    /// Also print the final summary as a single JSON line
    #[arg(long)]
    json: bool,

    /// Seconds to wait for the connection to be established
    #[arg(long, value_name = "SECS", default_value_t = config::DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            url: args.url,
            timing_file: args.timing_file,
            verbose: args.verbose,
            json: args.json,
            connect_timeout_secs: args.connect_timeout,
        }
    }
}

fn main() -> Result<()> {
    let config = Config::from(Args::parse());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();
    debug!("effective config: {}", serde_json::to_string(&config)?);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down...");
        r.store(false, Ordering::SeqCst);
    })?;

    let response = http::open_stream(&config)?;
    let boundary = match multipart::negotiate_boundary(&response.content_type) {
        Ok(b) => b,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let demux = Demultiplexer::new(BufReader::new(response.body), boundary);
    let source = FrameFeed::spawn(demux, feed::DEFAULT_POLL_INTERVAL)
        .context("failed to start the frame reader")?;
    let mut analyzer = Analyzer::new(source, MonotonicClock::new());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match analyzer.run(&running, &mut out) {
        Ok(RunOutcome::Cancelled) => {}
        Ok(RunOutcome::StreamEnded) => {
            info!("Exiting.");
            return Ok(());
        }
        Err(e) => {
            error!("{}", e);
            return Err(e).context("stream processing aborted");
        }
    }

    let summary = analyzer
        .finalize(&mut out, config.timing_file.as_deref())
        .context("failed to finish the final report")?;

    if config.json {
        if let Some(summary) = summary {
            writeln!(out, "{}", serde_json::to_string(&summary)?)?;
        }
    }

    info!("Exiting.");
    Ok(())
}
