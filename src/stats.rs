use crate::error::{JitterError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Neumaier compensated summation. Keeps the running gap sum exact to within
/// a few ulps even after millions of small additions.
#[derive(Debug, Clone, Copy, Default)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Running aggregates over all frames seen so far.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    frame_count: u64,
    size_sum: u64,
    gap_sum: CompensatedSum,
    abs_jitter_sum: CompensatedSum,
    frame_gaps: Vec<f64>,
}

/// Figures for one completed frame, as printed on the console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame_count: u64,
    pub gap: f64,
    pub mean_gap: f64,
    pub size: u64,
    pub avg_framerate: f64,
    pub jitter: f64,
    pub jitter_pct: f64,
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mean_gap <= 0.0 {
            return write!(
                f,
                "framerate undefined, frame #{} arrived without measurable gap",
                self.frame_count
            );
        }
        write!(
            f,
            "framerate averages to {:.2}, frame #{} jitters by {:+.4}s ({:.1}%)",
            self.avg_framerate, self.frame_count, self.jitter, self.jitter_pct
        )
    }
}

/// Final averages of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub frame_count: u64,
    pub avg_framerate: f64,
    pub avg_jitter: f64,
    pub avg_jitter_pct: f64,
    pub total_bytes: u64,
    pub avg_frame_size: f64,
    /// Sum of all gaps, i.e. the measured span in seconds.
    pub duration_secs: f64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avg framerate was {:.2}, avg. absolute jitter was {:.4}s ({:.1}%)",
            self.avg_framerate, self.avg_jitter, self.avg_jitter_pct
        )
    }
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one frame: `gap_secs` since the previous one, `size` bytes.
    pub fn record(&mut self, gap_secs: f64, size: u64) -> FrameReport {
        self.frame_count += 1;
        self.size_sum += size;
        self.gap_sum.add(gap_secs);
        self.frame_gaps.push(gap_secs);

        let mean_gap = self.gap_sum.value() / self.frame_count as f64;
        let jitter = gap_secs - mean_gap;
        self.abs_jitter_sum.add(jitter.abs());

        debug!(
            "frame #{}: gap={:.6}s size={} mean_gap={:.6}s",
            self.frame_count, gap_secs, size, mean_gap
        );

        // A coarse clock can deliver all-zero gaps; rates are undefined then.
        let (avg_framerate, jitter_pct) = if mean_gap > 0.0 {
            (1.0 / mean_gap, jitter / mean_gap * 100.0)
        } else {
            (0.0, 0.0)
        };

        FrameReport {
            frame_count: self.frame_count,
            gap: gap_secs,
            mean_gap,
            size,
            avg_framerate,
            jitter,
            jitter_pct,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn size_sum(&self) -> u64 {
        self.size_sum
    }

    pub fn gap_sum(&self) -> f64 {
        self.gap_sum.value()
    }

    pub fn abs_jitter_sum(&self) -> f64 {
        self.abs_jitter_sum.value()
    }

    pub fn frame_gaps(&self) -> &[f64] {
        &self.frame_gaps
    }

    pub fn mean_gap(&self) -> Option<f64> {
        (self.frame_count > 0).then(|| self.gap_sum.value() / self.frame_count as f64)
    }

    /// Final averages. `NoFramesObserved` when nothing was recorded,
    /// `NoElapsedTime` when frames were recorded but their gaps sum to zero.
    pub fn summary(&self) -> Result<Summary> {
        let mean_gap = self.mean_gap().ok_or(JitterError::NoFramesObserved)?;
        if mean_gap <= 0.0 {
            return Err(JitterError::NoElapsedTime(self.frame_count));
        }
        let count = self.frame_count as f64;
        let avg_jitter = self.abs_jitter_sum.value() / count;

        Ok(Summary {
            frame_count: self.frame_count,
            avg_framerate: 1.0 / mean_gap,
            avg_jitter,
            avg_jitter_pct: avg_jitter / mean_gap * 100.0,
            total_bytes: self.size_sum,
            avg_frame_size: self.size_sum as f64 / count,
            duration_secs: self.gap_sum.value(),
        })
    }
}
