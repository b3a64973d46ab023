pub mod error;
pub mod multipart;
pub mod demux;
pub mod feed;
pub mod traits;
pub mod clock;
pub mod stats;
pub mod analyzer;
pub mod timing;
pub mod config;
pub mod http;

pub use error::{JitterError, Result};
