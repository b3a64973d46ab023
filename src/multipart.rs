//! Content-Type negotiation for `multipart/x-mixed-replace` streams.

use crate::error::{JitterError, Result};
use log::{debug, info, warn};
use std::collections::HashMap;

pub const MIXED_REPLACE: &str = "multipart/x-mixed-replace";

/// Boundaries shorter than this are suspicious: a short token is more likely
/// to show up by accident inside payload bytes.
pub const MIN_BOUNDARY_LEN: usize = 16;

/// Parsed `Content-Type` header of a mixed-replace response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeParams {
    pub media_type: String,
    /// Parameter names and values, both trimmed and lower-cased.
    pub params: HashMap<String, String>,
}

impl ContentTypeParams {
    pub fn parse(content_type: &str) -> Result<Self> {
        let mut segments = content_type.split(';');
        let media_type = segments.next().unwrap_or_default().trim();

        if !media_type.starts_with(MIXED_REPLACE) {
            return Err(JitterError::UnsupportedMediaType(content_type.to_string()));
        }

        let mut params = HashMap::new();
        for segment in segments {
            // Values stay quoted if the sender quoted them.
            match segment.split_once('=') {
                Some((name, value)) => {
                    params.insert(name.trim().to_lowercase(), value.trim().to_lowercase());
                }
                None if segment.trim().is_empty() => {}
                None => debug!("ignoring content-type segment without '=': {:?}", segment),
            }
        }

        debug!("parsed content-type params: {:?}", params);

        Ok(ContentTypeParams {
            media_type: media_type.to_string(),
            params,
        })
    }

    pub fn boundary(&self) -> Option<&str> {
        self.params
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    /// True when a boundary is declared but shorter than [`MIN_BOUNDARY_LEN`].
    /// Short tokens are more likely to collide with payload bytes.
    pub fn has_short_boundary(&self) -> bool {
        self.boundary().map_or(false, |b| b.len() < MIN_BOUNDARY_LEN)
    }
}

/// Extract the boundary token from a response `Content-Type`.
///
/// Fails with `UnsupportedMediaType` or `MissingBoundary`. A boundary shorter
/// than [`MIN_BOUNDARY_LEN`] only produces a warning.
pub fn negotiate_boundary(content_type: &str) -> Result<String> {
    let ctype = ContentTypeParams::parse(content_type)?;
    let boundary = ctype
        .boundary()
        .ok_or_else(|| JitterError::MissingBoundary(content_type.to_string()))?;

    if ctype.has_short_boundary() {
        warn!(
            "boundary is a little short (only {} characters)",
            boundary.len()
        );
    }

    info!("boundary parsed: {}", boundary);
    Ok(boundary.to_string())
}
