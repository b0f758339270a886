//! Configuration System using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults ([`CaptureConfig::default`])
//! 2. `config/capture.toml` (optional)
//! 3. Environment variables prefixed with `M64_CAPTURE_`, nested keys split on
//!    a double underscore
//!
//! # Example
//! ```no_run
//! use m64_capture::config::CaptureConfig;
//!
//! let config = CaptureConfig::load()?;
//! println!("Writing movies to {}", config.movie.output_dir.display());
//! # Ok::<(), m64_capture::error::CaptureError>(())
//! ```
//!
//! ```toml
//! [application]
//! log_level = "debug"
//! log_format = "json"
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//!
//! [movie]
//! output_dir = "movies"
//! base_name = "capture"
//! frame_count_patch = "corrected"
//!
//! [movie.header]
//! rom_name = "SUPER MARIO 64"
//! author = "someone"
//! ```

use crate::error::{AppResult, CaptureError};
use crate::logging::OutputFormat;
use crate::movie::{FrameCountPatch, MovieHeader};
use crate::namer::DEFAULT_MOVIE_DIR;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/capture.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Serial connection settings
    pub serial: SerialConfig,
    /// Movie output settings
    pub movie: MovieConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: OutputFormat,
}

/// Serial connection configuration
///
/// Line speed and poll cadence are fixed by the adapter protocol and are not
/// configurable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port: Option<String>,
}

/// Movie output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieConfig {
    /// Directory movies are written to
    pub output_dir: PathBuf,
    /// File name stem; a numeric suffix is appended per session
    pub base_name: String,
    /// Whether the frame count is patched at close
    pub frame_count_patch: FrameCountPatch,
    /// Header metadata
    pub header: MovieHeader,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: OutputFormat::default(),
        }
    }
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_MOVIE_DIR),
            base_name: "capture".to_string(),
            frame_count_patch: FrameCountPatch::default(),
            header: MovieHeader::default(),
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl CaptureConfig {
    /// Load configuration from `config/capture.toml` and environment variables
    ///
    /// Environment variables override the file, e.g.
    /// `M64_CAPTURE_SERIAL__PORT=COM3` or `M64_CAPTURE_MOVIE__BASE_NAME=run`.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path. A missing file is not an
    /// error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("M64_CAPTURE_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let level = self.application.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(CaptureError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        let base = self.movie.base_name.trim();
        if base.is_empty() {
            return Err(CaptureError::Configuration(
                "movie.base_name must not be empty".to_string(),
            ));
        }
        if base.contains(['/', '\\']) {
            return Err(CaptureError::Configuration(format!(
                "movie.base_name '{base}' must not contain path separators"
            )));
        }

        if self.movie.header.fps == 0 {
            return Err(CaptureError::Configuration(
                "movie.header.fps must be greater than zero".to_string(),
            ));
        }

        if let Some(port) = &self.serial.port {
            if port.trim().is_empty() {
                return Err(CaptureError::Configuration(
                    "serial.port must not be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}
