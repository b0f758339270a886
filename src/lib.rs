//! # m64_capture
//!
//! Records controller input captured by a serial controller adapter into
//! `.m64` movie files.
//!
//! ## Crate Structure
//!
//! - **`hardware`**: The [`hardware::SampleSource`] abstraction over the serial
//!   connection, with a `serialport` implementation and an in-memory mock.
//! - **`framer`**: [`framer::PacketFramer`] turns the byte stream into 4-byte
//!   samples, preferring the freshest sample over backlog.
//! - **`translate`**: Pure expansion of a raw sample into the 32-slot
//!   [`sample::ControllerState`].
//! - **`movie`**: The fixed 1024-byte header, the append-only
//!   [`movie::MovieWriter`] and a reader for recorded files.
//! - **`namer`**: Non-colliding output paths under the movie directory.
//! - **`session`**: [`session::CaptureSession`], the periodic tick composing
//!   framer, translator and writer.
//! - **`config`**: Layered configuration loaded with `figment`.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`error`**: The crate-wide [`error::CaptureError`].

pub mod config;
pub mod error;
pub mod framer;
pub mod hardware;
pub mod logging;
pub mod movie;
pub mod namer;
pub mod sample;
pub mod session;
pub mod translate;

pub use error::{AppResult, CaptureError};
pub use sample::{ControllerState, RawSample};
