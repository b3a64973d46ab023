use crate::demux::Frame;
use crate::error::Result;
use std::time::Duration;

/// Result of one pull from a [`FrameSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pulled {
    Frame(Frame),
    /// No complete frame yet; the caller may re-check for cancellation and
    /// pull again.
    Pending,
    /// The stream ended cleanly between frames.
    Ended,
}

#[cfg_attr(test, mockall::automock)]
pub trait FrameSource {
    /// Pull the next complete frame. Blocking sources never return
    /// `Pulled::Pending`; polling sources return it when nothing arrived
    /// within their poll interval.
    fn pull(&mut self) -> Result<Pulled>;
}

#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    /// Monotonic reading relative to an arbitrary fixed origin.
    fn now(&self) -> Duration;
}
