use crate::demux::Frame;
use crate::error::{JitterError, Result};
use crate::stats::{FrameReport, RunningStats, Summary};
use crate::timing;
use crate::traits::{Clock, FrameSource, Pulled};
use log::{debug, info, warn};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    AwaitingFirstBoundary,
    Streaming { prev_stamp: Duration, prev_size: usize },
}

/// Outcome of one pull from the frame source.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// First frame: timing origin set, nothing recorded.
    Anchored,
    Report(FrameReport),
    /// The source had no frame ready yet.
    Pending,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The running flag was cleared; the caller should finalize.
    Cancelled,
    /// The source ended cleanly. No final report is due.
    StreamEnded,
}

/// Pulls frames from a [`FrameSource`] and keeps running jitter statistics.
pub struct Analyzer<S, C>
where
    S: FrameSource,
    C: Clock,
{
    source: S,
    clock: C,
    stats: RunningStats,
    phase: Phase,
}

impl<S, C> Analyzer<S, C>
where
    S: FrameSource,
    C: Clock,
{
    pub fn new(source: S, clock: C) -> Self {
        Analyzer {
            source,
            clock,
            stats: RunningStats::new(),
            phase: Phase::AwaitingFirstBoundary,
        }
    }

    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    /// Pull one frame and account it.
    pub fn step(&mut self) -> Result<Step> {
        let frame = match self.source.pull()? {
            Pulled::Frame(frame) => frame,
            Pulled::Pending => return Ok(Step::Pending),
            Pulled::Ended => return Ok(Step::EndOfStream),
        };
        let now = self.clock.now();
        Ok(self.on_frame(frame, now))
    }

    fn on_frame(&mut self, frame: Frame, now: Duration) -> Step {
        match self.phase {
            Phase::AwaitingFirstBoundary => {
                // Nothing precedes the first frame, so its overread is dropped.
                debug!(
                    "first frame anchors timing, dropping {} leading bytes",
                    frame.overread_bytes
                );
                self.phase = Phase::Streaming {
                    prev_stamp: now,
                    prev_size: frame.size(),
                };
                Step::Anchored
            }
            Phase::Streaming {
                prev_stamp,
                prev_size,
            } => {
                let gap = now.saturating_sub(prev_stamp).as_secs_f64();
                let size = (prev_size + frame.overread_bytes) as u64;
                let report = self.stats.record(gap, size);

                self.phase = Phase::Streaming {
                    prev_stamp: now,
                    prev_size: frame.size(),
                };
                Step::Report(report)
            }
        }
    }

    /// Process frames until `running` is cleared or the stream ends, writing
    /// one report line per frame to `out`.
    ///
    /// `running` is checked before every pull. With a polling source such as
    /// [`FrameFeed`](crate::feed::FrameFeed) a stalled stream yields
    /// `Pending` pulls, so cancellation is seen within one poll interval.
    pub fn run<W: Write>(&mut self, running: &AtomicBool, out: &mut W) -> Result<RunOutcome> {
        debug!("start parsing stream");

        while running.load(Ordering::SeqCst) {
            match self.step()? {
                Step::Anchored | Step::Pending => {}
                Step::Report(report) => {
                    writeln!(out, "{}", report)?;
                    out.flush()?;
                }
                Step::EndOfStream => {
                    warn!(
                        "stream ended after {} frames",
                        self.stats.frame_count()
                    );
                    return Ok(RunOutcome::StreamEnded);
                }
            }
        }

        info!("stopping after {} frames", self.stats.frame_count());
        Ok(RunOutcome::Cancelled)
    }

    /// Print the final report and write the timing file if one is configured.
    ///
    /// Returns `None` when no frame was completed; that case prints
    /// "no frames observed" instead of numbers.
    pub fn finalize<W: Write>(&self, out: &mut W, timing_file: Option<&Path>) -> Result<Option<Summary>> {
        writeln!(out)?;
        writeln!(out, "final report:")?;

        let summary = match self.stats.summary() {
            Ok(summary) => {
                writeln!(out, "  {}", summary)?;
                writeln!(
                    out,
                    "  {} frames, {} bytes total ({:.0} bytes/frame avg)",
                    summary.frame_count, summary.total_bytes, summary.avg_frame_size
                )?;
                Some(summary)
            }
            Err(JitterError::NoFramesObserved) => {
                writeln!(out, "  no frames observed")?;
                None
            }
            Err(e @ JitterError::NoElapsedTime(_)) => {
                writeln!(out, "  {}", e)?;
                None
            }
            Err(e) => return Err(e),
        };
        out.flush()?;

        if let Some(path) = timing_file {
            timing::write_timing_file(path, self.stats.frame_gaps())?;
        }

        Ok(summary)
    }
}
