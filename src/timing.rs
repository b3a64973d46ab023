//! Timing artifact: one inter-frame gap per line, seconds with 10 decimals.
//!
//! Replay tools consume this layout as-is, so the format must not change.
//!
//! ```text
//! 0.0999873512
//! 0.1000412201
//! ```

use crate::error::{JitterError, Result};
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub fn write_timings<W: Write>(mut w: W, gaps: &[f64]) -> Result<()> {
    for gap in gaps {
        writeln!(w, "{:.10}", gap)?;
    }
    Ok(())
}

/// Write `gaps` to `path`, replacing any existing file.
pub fn write_timing_file(path: &Path, gaps: &[f64]) -> Result<()> {
    info!("writing frame-times to {}", path.display());

    let mut writer = BufWriter::new(File::create(path)?);
    write_timings(&mut writer, gaps)?;
    writer.flush()?;

    info!("wrote {} lines", gaps.len());
    Ok(())
}

pub fn read_timings<R: BufRead>(r: R) -> Result<Vec<f64>> {
    let mut gaps = Vec::new();
    for (idx, line) in r.lines().enumerate() {
        let line = line?;
        let value = line.trim();
        if value.is_empty() {
            continue;
        }
        let gap = value.parse::<f64>().map_err(|_| JitterError::InvalidTiming {
            line: idx + 1,
            value: value.to_string(),
        })?;
        gaps.push(gap);
    }
    Ok(gaps)
}

pub fn read_timing_file(path: &Path) -> Result<Vec<f64>> {
    read_timings(BufReader::new(File::open(path)?))
}
