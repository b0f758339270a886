//! Hardware Adapters
//!
//! Byte-level access to the controller adapter. The framer only needs three
//! operations from a connection, captured by [`SampleSource`]:
//!
//! - how many bytes are currently buffered,
//! - read exactly N bytes,
//! - throw away whatever is still buffered.
//!
//! `SerialSampleSource` talks to a real port through the `serialport` crate and
//! is only compiled with the `instrument_serial` feature. `MockSampleSource`
//! simulates the line in memory for tests.

use std::io;

pub mod mock;
pub use mock::{MockLineHandle, MockSampleSource};

#[cfg(feature = "instrument_serial")]
pub mod serial;
#[cfg(feature = "instrument_serial")]
pub use serial::SerialSampleSource;

/// A byte stream the framer can poll without blocking.
///
/// Any `Err` returned by these methods is treated by the framer as a
/// connection-level failure (the device went away).
pub trait SampleSource {
    /// Number of bytes received and not yet read.
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Fill `buf` completely from the received bytes.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Drop every byte still waiting in the receive buffer and return how
    /// many were dropped.
    fn discard_input(&mut self) -> io::Result<usize>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        (**self).bytes_to_read()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_exact(buf)
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        (**self).discard_input()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
