use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Runtime settings of a measurement run, filled from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// http(s) URL of the MJPEG stream.
    pub url: String,
    /// Where to save the recorded frame gaps on exit, if anywhere.
    pub timing_file: Option<PathBuf>,
    pub verbose: bool,
    /// Print the final summary as a JSON line as well.
    pub json: bool,
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url: String::new(),
            timing_file: None,
            verbose: false,
            json: false,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Default `env_logger` filter; `RUST_LOG` still takes precedence.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connect_timeout_secs, 10);
        assert!(config.timing_file.is_none());
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_verbose_enables_debug() {
        let config = Config {
            verbose: true,
            ..Config::default()
        };
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = Config {
            url: "http://cam.local:8080/video.mjpg".to_string(),
            timing_file: Some(PathBuf::from("/tmp/timings.txt")),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"timing_file\":\"/tmp/timings.txt\""));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
