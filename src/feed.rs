//! Background frame reader.
//!
//! Network reads block for as long as the camera stalls. The demultiplexer
//! runs on its own thread and hands complete frames over a bounded channel,
//! so the analyzer can wake up every poll interval and notice cancellation
//! without giving up the statistics it has collected.

use crate::demux::{Demultiplexer, Frame};
use crate::error::{JitterError, Result};
use crate::traits::{FrameSource, Pulled};
use kanal::{ReceiveErrorTimeout, Receiver, Sender};
use log::{debug, warn};
use std::io::BufRead;
use std::thread;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Frames buffered between reader and analyzer before the reader waits.
const FEED_DEPTH: usize = 16;

/// `Ok(None)` is the end-of-stream marker; the reader stops after it or
/// after an error.
type Message = Result<Option<Frame>>;

pub struct FrameFeed {
    rx: Receiver<Message>,
    poll_interval: Duration,
    finished: bool,
}

impl FrameFeed {
    /// Move `demux` onto a reader thread. The thread is detached: if the
    /// stream stalls forever it stays blocked until the process exits.
    pub fn spawn<R>(demux: Demultiplexer<R>, poll_interval: Duration) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = kanal::bounded(FEED_DEPTH);

        thread::Builder::new()
            .name("mjpeg-reader".to_string())
            .spawn(move || read_loop(demux, &tx))?;

        Ok(FrameFeed {
            rx,
            poll_interval,
            finished: false,
        })
    }
}

fn read_loop<R: BufRead>(mut demux: Demultiplexer<R>, tx: &Sender<Message>) {
    loop {
        let msg = demux.next_frame();
        let last = !matches!(msg, Ok(Some(_)));
        if tx.send(msg).is_err() {
            debug!("frame consumer gone, stopping reader");
            return;
        }
        if last {
            return;
        }
    }
}

impl FrameSource for FrameFeed {
    fn pull(&mut self) -> Result<Pulled> {
        if self.finished {
            return Ok(Pulled::Ended);
        }

        match self.rx.recv_timeout(self.poll_interval) {
            Ok(Ok(Some(frame))) => Ok(Pulled::Frame(frame)),
            Ok(Ok(None)) => {
                self.finished = true;
                Ok(Pulled::Ended)
            }
            Ok(Err(e)) => {
                self.finished = true;
                Err(e)
            }
            Err(ReceiveErrorTimeout::Timeout) => Ok(Pulled::Pending),
            Err(e) => {
                // only reachable if the reader thread died without a message
                self.finished = true;
                warn!("frame reader stopped unexpectedly: {:?}", e);
                Err(JitterError::TruncatedStream(
                    "after the frame reader stopped".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Read};

    const BOUNDARY: &str = "feedboundary_000000001";

    fn jpeg_part(body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            BOUNDARY,
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out.extend_from_slice(b"\r\n");
        out
    }

    /// Serves `data`, then blocks until `release` fires or is dropped, then
    /// reports end of stream.
    struct StallingReader {
        data: Cursor<Vec<u8>>,
        release: kanal::Receiver<()>,
    }

    impl Read for StallingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.data.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            let _ = self.release.recv();
            Ok(0)
        }
    }

    fn pull_skipping_pending(feed: &mut FrameFeed) -> Result<Pulled> {
        loop {
            match feed.pull()? {
                Pulled::Pending => continue,
                other => return Ok(other),
            }
        }
    }

    #[test]
    fn test_feed_forwards_frames_and_end() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut data = jpeg_part(b"one");
        data.extend(jpeg_part(b"two"));
        let demux = Demultiplexer::new(Cursor::new(data), BOUNDARY);
        let mut feed = FrameFeed::spawn(demux, Duration::from_millis(20)).unwrap();

        match pull_skipping_pending(&mut feed).unwrap() {
            Pulled::Frame(f) => assert_eq!(f.payload, b"one"),
            other => panic!("unexpected pull {:?}", other),
        }
        match pull_skipping_pending(&mut feed).unwrap() {
            Pulled::Frame(f) => assert_eq!(f.payload, b"two"),
            other => panic!("unexpected pull {:?}", other),
        }
        assert_eq!(pull_skipping_pending(&mut feed).unwrap(), Pulled::Ended);
        assert_eq!(feed.pull().unwrap(), Pulled::Ended);
    }

    #[test]
    fn test_stalled_stream_reports_pending() {
        let (release_tx, release_rx) = kanal::bounded(1);
        let reader = StallingReader {
            data: Cursor::new(jpeg_part(b"frame")),
            release: release_rx,
        };
        let demux = Demultiplexer::new(BufReader::new(reader), BOUNDARY);
        let mut feed = FrameFeed::spawn(demux, Duration::from_millis(20)).unwrap();

        assert!(matches!(pull_skipping_pending(&mut feed).unwrap(), Pulled::Frame(_)));
        // the reader is now blocked inside the stalled read
        for _ in 0..3 {
            assert_eq!(feed.pull().unwrap(), Pulled::Pending);
        }

        drop(release_tx);
        assert_eq!(pull_skipping_pending(&mut feed).unwrap(), Pulled::Ended);
    }

    #[test]
    fn test_reader_error_is_forwarded() {
        let mut data = jpeg_part(b"ok");
        data.extend_from_slice(format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", BOUNDARY).as_bytes());
        let demux = Demultiplexer::new(Cursor::new(data), BOUNDARY);
        let mut feed = FrameFeed::spawn(demux, Duration::from_millis(20)).unwrap();

        assert!(matches!(pull_skipping_pending(&mut feed).unwrap(), Pulled::Frame(_)));
        let err = pull_skipping_pending(&mut feed).unwrap_err();
        assert!(matches!(err, JitterError::MissingFrameLength));
        assert_eq!(feed.pull().unwrap(), Pulled::Ended);
    }
}
