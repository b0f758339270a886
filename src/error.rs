//! Custom error types for the capture pipeline.
//!
//! `CaptureError` is the single error type shared by the framer, the movie
//! writer, the session namer and the configuration loader. It is built with
//! `thiserror`, and `#[from]` conversions let the `?` operator lift I/O,
//! configuration and serial-port errors into it.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps `figment` errors raised while layering the TOML file and
//!   environment overrides.
//! - **`Configuration`**: Semantic problems in an otherwise well-formed
//!   configuration (unknown log level, empty base name, ...).
//! - **`Io`**: Output-file failures. These are fatal to a recording session.
//! - **`Serial`**: The serial port could not be opened.
//! - **`InvalidState`**: A programming-contract violation, such as appending to a
//!   movie that has already been closed.
//! - **`MovieFormat`**: A file handed to the reader is not a valid movie.
//!
//! Connection-level read failures are deliberately *not* represented here: the
//! framer reports them as a disconnect outcome rather than an error.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, CaptureError>;

/// Errors raised by the capture pipeline.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The configuration sources could not be merged or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// A loaded configuration value is out of range.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Reading or writing a movie file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened.
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Recording was requested from a build without serial support.
    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    /// An operation was called in a lifecycle state that does not allow it.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// What the caller tried to do
        operation: &'static str,
        /// State the component was in
        state: &'static str,
    },

    /// A file handed to the reader is not a valid movie.
    #[error("Invalid movie file: {0}")]
    MovieFormat(String),
}

impl CaptureError {
    /// Returns true for errors that indicate a caller bug rather than a
    /// transient or environmental failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, CaptureError::InvalidState { .. })
    }
}
