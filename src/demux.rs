//! Incremental demultiplexer for `multipart/x-mixed-replace` bodies.
//!
//! The body is never buffered whole: each pull reads lines until the next
//! boundary, then the part headers, then exactly `Content-Length` payload
//! bytes.
//!
//! ```text
//! [stray bytes]            <- counted as overread
//! --boundary CRLF
//! Content-Type: image/jpeg CRLF
//! Content-Length: N CRLF
//! CRLF
//! <N payload bytes>
//! ```

use crate::error::{JitterError, Result};
use crate::traits::{FrameSource, Pulled};
use log::{debug, warn};
use std::collections::HashMap;
use std::io::{BufRead, Read};

const FRAME_CONTENT_TYPE: &str = "image/jpeg";

/// Upper bound for the up-front payload allocation; a bogus length must not
/// reserve gigabytes before the bytes actually arrive.
const MAX_PREALLOC: usize = 1 << 20;

/// One multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header names lower-cased, values trimmed.
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
    /// Stray bytes read while scanning for this frame's boundary. They belong
    /// to the previous frame's size.
    pub overread_bytes: usize,
}

impl Frame {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

pub struct Demultiplexer<R> {
    reader: R,
    boundary: Vec<u8>,
    line: Vec<u8>,
    done: bool,
}

impl<R: BufRead> Demultiplexer<R> {
    pub fn new(reader: R, boundary: impl Into<String>) -> Self {
        Demultiplexer {
            reader,
            boundary: boundary.into().into_bytes(),
            line: Vec::with_capacity(128),
            done: false,
        }
    }

    /// Pull the next frame.
    ///
    /// `Ok(None)` means the stream ended cleanly between frames. After the
    /// first `Ok(None)` or error every further call returns `Ok(None)`.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.done {
            return Ok(None);
        }
        match self.read_frame() {
            Ok(Some(frame)) => Ok(Some(frame)),
            other => {
                self.done = true;
                other
            }
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut overread = 0;

        loop {
            debug!("looking for boundary-line");
            let Some(skipped) = self.scan_boundary()? else {
                debug!("stream ended after {} stray bytes", overread);
                return Ok(None);
            };
            debug!("found boundary-line after {} bytes", skipped);
            overread += skipped;

            let headers = self.read_headers()?;
            debug!("received frame-headers: {:?}", headers);

            match headers.get("content-type") {
                None => warn!("no frame content-type provided"),
                Some(ctype) if !ctype.eq_ignore_ascii_case(FRAME_CONTENT_TYPE) => {
                    warn!("frame content-type is {}, not '{}'", ctype, FRAME_CONTENT_TYPE)
                }
                Some(_) => {}
            }

            let raw_length = headers
                .get("content-length")
                .ok_or(JitterError::MissingFrameLength)?;
            let length: i64 = raw_length
                .parse()
                .map_err(|_| JitterError::InvalidFrameLength(raw_length.clone()))?;

            if length < 1 {
                warn!("invalid frame content-length {} provided, skipping frame", length);
                continue;
            }
            let length = usize::try_from(length)
                .map_err(|_| JitterError::InvalidFrameLength(raw_length.clone()))?;

            let payload = self.read_payload(length)?;
            debug!("read {} bytes of frame-data", payload.len());

            return Ok(Some(Frame {
                headers,
                payload,
                overread_bytes: overread,
            }));
        }
    }

    fn read_line(&mut self) -> Result<usize> {
        self.line.clear();
        Ok(self.reader.read_until(b'\n', &mut self.line)?)
    }

    /// Returns the number of bytes skipped before the boundary line, or
    /// `None` at end of stream or on the closing `--token--` delimiter.
    fn scan_boundary(&mut self) -> Result<Option<usize>> {
        let mut skipped = 0;
        loop {
            let n = self.read_line()?;
            if n == 0 {
                return Ok(None);
            }
            match match_boundary(&self.line, &self.boundary) {
                Some(Delimiter::Part) => return Ok(Some(skipped)),
                Some(Delimiter::Close) => {
                    debug!("found closing boundary-line after {} bytes", skipped);
                    return Ok(None);
                }
                None => skipped += n,
            }
        }
    }

    fn read_headers(&mut self) -> Result<HashMap<String, String>> {
        let mut headers = HashMap::new();
        loop {
            if self.read_line()? == 0 {
                return Err(JitterError::TruncatedStream(
                    "inside frame headers".to_string(),
                ));
            }
            let line = String::from_utf8_lossy(&self.line);
            let line = line.trim_end();
            if line.is_empty() {
                return Ok(headers);
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.trim().to_lowercase(), value.trim().to_string());
                }
                None => warn!("ignoring malformed frame-header line {:?}", line),
            }
        }
    }

    fn read_payload(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(length.min(MAX_PREALLOC));
        (&mut self.reader)
            .take(length as u64)
            .read_to_end(&mut payload)?;

        if payload.len() < length {
            return Err(JitterError::TruncatedStream(format!(
                "after {} of {} payload bytes",
                payload.len(),
                length
            )));
        }
        Ok(payload)
    }
}

impl<R: BufRead> FrameSource for Demultiplexer<R> {
    fn pull(&mut self) -> Result<Pulled> {
        Ok(match self.next_frame()? {
            Some(frame) => Pulled::Frame(frame),
            None => Pulled::Ended,
        })
    }
}

impl<R: BufRead> Iterator for Demultiplexer<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Starts the next part.
    Part,
    /// `--token--`: the sender finished the multipart body.
    Close,
}

/// Classify a line as boundary delimiter. A boundary line starts with the
/// token, with or without the leading `--`; a trailing `--` right after the
/// token marks the close delimiter. Compared case-insensitively since
/// negotiation lower-cases the token.
pub fn match_boundary(line: &[u8], boundary: &[u8]) -> Option<Delimiter> {
    let rest = strip_prefix_ignore_case(line, boundary).or_else(|| {
        line.strip_prefix(b"--")
            .and_then(|rest| strip_prefix_ignore_case(rest, boundary))
    })?;

    if rest.starts_with(b"--") {
        Some(Delimiter::Close)
    } else {
        Some(Delimiter::Part)
    }
}

pub fn is_boundary_line(line: &[u8], boundary: &[u8]) -> bool {
    match_boundary(line, boundary).is_some()
}

fn strip_prefix_ignore_case<'a>(haystack: &'a [u8], prefix: &[u8]) -> Option<&'a [u8]> {
    if haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&haystack[prefix.len()..])
    } else {
        None
    }
}
