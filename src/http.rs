use crate::config::Config;
use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// An open MJPEG response: negotiated headers plus the unread body.
pub struct MjpegResponse {
    /// Raw `Content-Type` value, empty if the server sent none.
    pub content_type: String,
    pub body: Response,
}

/// Issue the GET request and return once the response headers are in.
///
/// The client has no overall timeout since a live stream never finishes;
/// only connecting is bounded.
pub fn open_stream(config: &Config) -> Result<MjpegResponse> {
    info!("reading mjpeg-stream from {}", config.url);

    let client = Client::builder()
        .timeout(None)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(&config.url)
        .send()
        .with_context(|| format!("request to {} failed", config.url))?;
    debug!("received status {} headers: {:?}", response.status(), response.headers());

    let response = response
        .error_for_status()
        .with_context(|| format!("server rejected request to {}", config.url))?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Ok(MjpegResponse {
        content_type,
        body: response,
    })
}
